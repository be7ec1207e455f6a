//! User identity as seen by the order core.
//!
//! Authentication happens elsewhere; this module only resolves an already
//! identified user id into a profile and the principal acting on requests.

use async_trait::async_trait;
use common::UserId;
use document_store::{Document, DocumentId, DocumentStore, DocumentStoreExt, WriteOptions};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Collection holding user profiles.
pub const USERS_COLLECTION: &str = "users";

/// Role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular buyer or producer.
    #[default]
    User,

    /// Administrator, allowed to modify any resource.
    Admin,
}

impl Role {
    /// Returns the role name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The identity acting on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: UserId,
    pub role: Role,
}

impl Principal {
    /// Creates a regular user principal.
    pub fn user(id: UserId) -> Self {
        Self { id, role: Role::User }
    }

    /// Creates an admin principal.
    pub fn admin(id: UserId) -> Self {
        Self {
            id,
            role: Role::Admin,
        }
    }

    /// Returns true if the principal has the admin role.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Returns true if the principal is the given owner.
    pub fn owns(&self, owner_id: UserId) -> bool {
        self.id == owner_id
    }
}

/// Contact details and role of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub phone_no: String,
    #[serde(default)]
    pub role: Role,
}

impl UserProfile {
    /// Creates a profile with a fresh id and the `user` role.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        phone_no: impl Into<String>,
    ) -> Self {
        Self {
            id: UserId::new(),
            username: username.into(),
            email: email.into(),
            phone_no: phone_no.into(),
            role: Role::User,
        }
    }

    /// Sets the role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Returns the principal this user acts as.
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            role: self.role,
        }
    }
}

/// Lookup of user profiles by id.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Returns the profile, or None if the user does not exist.
    async fn get_user(&self, id: UserId) -> Result<Option<UserProfile>, DomainError>;

    /// Resolves the principal for a user id, failing if the user is unknown.
    async fn principal(&self, id: UserId) -> Result<Principal, DomainError> {
        self.get_user(id)
            .await?
            .map(|profile| profile.principal())
            .ok_or(DomainError::UserNotFound(id))
    }
}

/// User directory backed by the `users` collection of a document store.
#[derive(Clone)]
pub struct DocumentUserDirectory<S> {
    store: S,
}

impl<S: DocumentStore> DocumentUserDirectory<S> {
    /// Creates a directory over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Inserts the profile, or replaces it if the id is already known.
    #[tracing::instrument(skip(self, profile), fields(user_id = %profile.id))]
    pub async fn upsert_user(&self, profile: &UserProfile) -> Result<UserProfile, DomainError> {
        let id = DocumentId::from_uuid(profile.id.as_uuid());
        if self.store.exists(USERS_COLLECTION, id).await? {
            self.store
                .replace(
                    USERS_COLLECTION,
                    id,
                    serde_json::to_value(profile).map_err(document_store::StoreError::from)?,
                    WriteOptions::new(),
                )
                .await?;
        } else {
            self.store
                .insert(Document::encode(USERS_COLLECTION, id, profile)?)
                .await?;
        }
        Ok(profile.clone())
    }
}

#[async_trait]
impl<S: DocumentStore> UserDirectory for DocumentUserDirectory<S> {
    async fn get_user(&self, id: UserId) -> Result<Option<UserProfile>, DomainError> {
        let profile = self
            .store
            .get_as::<UserProfile>(USERS_COLLECTION, DocumentId::from_uuid(id.as_uuid()))
            .await?;
        Ok(profile.map(|(profile, _)| profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use document_store::InMemoryDocumentStore;

    #[test]
    fn role_defaults_to_user() {
        let json = r#"{"id":"6f1c1b8e-8f6a-4f55-9a59-0d6f3c1f4e21","username":"wanjiru","email":"w@example.com","phone_no":"0700000000"}"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.role, Role::User);
        assert!(!profile.principal().is_admin());
    }

    #[test]
    fn principal_ownership() {
        let owner = UserId::new();
        assert!(Principal::user(owner).owns(owner));
        assert!(!Principal::user(UserId::new()).owns(owner));
        assert!(Principal::admin(UserId::new()).is_admin());
    }

    #[tokio::test]
    async fn directory_resolves_principals() {
        let directory = DocumentUserDirectory::new(InMemoryDocumentStore::new());
        let admin = UserProfile::new("root", "root@example.com", "0711111111").with_role(Role::Admin);
        directory.upsert_user(&admin).await.unwrap();

        let principal = directory.principal(admin.id).await.unwrap();
        assert!(principal.is_admin());

        let unknown = UserId::new();
        let err = directory.principal(unknown).await.unwrap_err();
        assert!(matches!(err, DomainError::UserNotFound(id) if id == unknown));
    }

    #[tokio::test]
    async fn upsert_replaces_existing_profile() {
        let directory = DocumentUserDirectory::new(InMemoryDocumentStore::new());
        let mut profile = UserProfile::new("kamau", "k@example.com", "0722222222");
        directory.upsert_user(&profile).await.unwrap();

        profile.phone_no = "0733333333".to_string();
        directory.upsert_user(&profile).await.unwrap();

        let loaded = directory.get_user(profile.id).await.unwrap().unwrap();
        assert_eq!(loaded.phone_no, "0733333333");
    }
}
