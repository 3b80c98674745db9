//! Read and edit the signed-in user's profile

use crate::auth::error::AuthError;
use crate::auth::service::UserResponse;
use crate::store::{User, UserStore};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Partial profile update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub picture: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl UpdateUserRequest {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.full_name.is_none()
            && self.picture.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
    }

    fn apply(self, user: &mut User) {
        if let Some(email) = self.email {
            user.email = email;
        }
        if self.full_name.is_some() {
            user.full_name = self.full_name;
        }
        if self.picture.is_some() {
            user.picture = self.picture;
        }
        if self.first_name.is_some() {
            user.first_name = self.first_name;
        }
        if self.last_name.is_some() {
            user.last_name = self.last_name;
        }
    }
}

/// Outcome of a profile update. `user` is the stored profile after the
/// change, absent when nothing was written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserResponse {
    pub id: Uuid,
    pub updated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserResponse>,
}

pub struct ProfileService {
    users: Arc<dyn UserStore>,
}

impl ProfileService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    pub async fn get_user(&self, id: Uuid) -> Result<UserResponse, AuthError> {
        let user = self.load(id).await?;
        Ok(UserResponse::from(&user))
    }

    /// Apply the present fields of `request` to the user.
    /// An empty request is answered without touching the store.
    pub async fn update_user(
        &self,
        id: Uuid,
        request: UpdateUserRequest,
    ) -> Result<UpdateUserResponse, AuthError> {
        if id.is_nil() {
            return Err(AuthError::InvalidUserId);
        }
        if request.is_empty() {
            return Ok(UpdateUserResponse {
                id,
                updated: false,
                user: None,
            });
        }

        let mut user = self.load(id).await?;
        request.apply(&mut user);
        user.updated_at = Utc::now();

        let found = self
            .users
            .update(&user)
            .await
            .map_err(AuthError::UpdateUser)?;
        if !found {
            return Err(AuthError::UserNotFound);
        }

        Ok(UpdateUserResponse {
            id,
            updated: true,
            user: Some(UserResponse::from(&user)),
        })
    }

    pub async fn update_picture(
        &self,
        id: Uuid,
        picture: String,
    ) -> Result<UpdateUserResponse, AuthError> {
        let mut user = self.load(id).await?;
        user.picture = Some(picture);
        user.updated_at = Utc::now();

        let found = self
            .users
            .update(&user)
            .await
            .map_err(AuthError::UpdateUserPicture)?;
        if !found {
            return Err(AuthError::UserNotFound);
        }

        Ok(UpdateUserResponse {
            id,
            updated: true,
            user: Some(UserResponse::from(&user)),
        })
    }

    async fn load(&self, id: Uuid) -> Result<User, AuthError> {
        if id.is_nil() {
            return Err(AuthError::InvalidUserId);
        }
        self.users
            .get_by_id(id)
            .await
            .map_err(AuthError::GetUser)?
            .ok_or(AuthError::UserNotFound)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mock::{FailingStore, StoreOp};
    use crate::store::InMemoryStore;
    use crate::test_helpers::test_user;

    async fn seeded() -> (Arc<InMemoryStore>, ProfileService, User) {
        let store = Arc::new(InMemoryStore::new());
        let user = test_user("sub-1", "alice@example.com");
        UserStore::create(store.as_ref(), &user).await.unwrap();
        let service = ProfileService::new(store.clone());
        (store, service, user)
    }

    #[tokio::test]
    async fn test_get_user() {
        let (_, service, user) = seeded().await;

        let found = service.get_user(user.id).await.unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.email, "alice@example.com");

        assert!(matches!(
            service.get_user(Uuid::nil()).await.unwrap_err(),
            AuthError::InvalidUserId
        ));
        assert!(matches!(
            service.get_user(Uuid::new_v4()).await.unwrap_err(),
            AuthError::UserNotFound
        ));
    }

    #[tokio::test]
    async fn test_update_user_partial() {
        let (store, service, user) = seeded().await;

        let resp = service
            .update_user(
                user.id,
                UpdateUserRequest {
                    full_name: Some("Alice Cooper".to_string()),
                    last_name: Some("Cooper".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(resp.updated);
        let updated = resp.user.unwrap();
        assert_eq!(updated.full_name.as_deref(), Some("Alice Cooper"));
        assert_eq!(updated.first_name.as_deref(), Some("Test"));
        assert_eq!(updated.email, "alice@example.com");
        assert!(updated.updated_at >= user.updated_at);

        let stored = store.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.last_name.as_deref(), Some("Cooper"));
    }

    #[tokio::test]
    async fn test_empty_update_skips_store() {
        let store = Arc::new(FailingStore::new());
        store.fail_on(StoreOp::UserGetById);
        store.fail_on(StoreOp::UserUpdate);
        let service = ProfileService::new(store);

        let id = Uuid::new_v4();
        let resp = service
            .update_user(id, UpdateUserRequest::default())
            .await
            .unwrap();
        assert_eq!(resp.id, id);
        assert!(!resp.updated);
        assert!(resp.user.is_none());
    }

    #[tokio::test]
    async fn test_update_user_errors() {
        let store = Arc::new(FailingStore::new());
        let user = test_user("sub-1", "alice@example.com");
        UserStore::create(&store.inner, &user).await.unwrap();
        let service = ProfileService::new(store.clone());
        let request = UpdateUserRequest {
            email: Some("new@example.com".to_string()),
            ..Default::default()
        };

        assert!(matches!(
            service
                .update_user(Uuid::nil(), request.clone())
                .await
                .unwrap_err(),
            AuthError::InvalidUserId
        ));
        assert!(matches!(
            service
                .update_user(Uuid::new_v4(), request.clone())
                .await
                .unwrap_err(),
            AuthError::UserNotFound
        ));

        store.fail_on(StoreOp::UserUpdate);
        assert!(matches!(
            service.update_user(user.id, request.clone()).await.unwrap_err(),
            AuthError::UpdateUser(_)
        ));
        assert!(matches!(
            service
                .update_picture(user.id, "https://example.com/p.png".to_string())
                .await
                .unwrap_err(),
            AuthError::UpdateUserPicture(_)
        ));

        store.heal();
        store.fail_on(StoreOp::UserGetById);
        assert!(matches!(
            service.update_user(user.id, request).await.unwrap_err(),
            AuthError::GetUser(_)
        ));
    }

    #[tokio::test]
    async fn test_update_picture() {
        let (store, service, user) = seeded().await;

        let resp = service
            .update_picture(user.id, "https://example.com/new.png".to_string())
            .await
            .unwrap();
        assert!(resp.updated);
        assert_eq!(
            resp.user.unwrap().picture.as_deref(),
            Some("https://example.com/new.png")
        );
        let stored = store.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.picture.as_deref(), Some("https://example.com/new.png"));

        assert!(matches!(
            service
                .update_picture(Uuid::nil(), "x".to_string())
                .await
                .unwrap_err(),
            AuthError::InvalidUserId
        ));
    }
}
