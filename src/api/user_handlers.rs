//! Profile handlers for the authenticated user (all behind `require_auth`)

use crate::api::handlers::{AppError, AppState};
use crate::auth::extractor::AuthUser;
use crate::auth::service::UserResponse;
use crate::profile::{UpdateUserRequest, UpdateUserResponse};
use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::info;

/// Request body for PUT /user/me/picture
#[derive(Debug, Deserialize)]
pub struct UpdatePictureRequest {
    pub picture: String,
}

/// GET /user/me
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    let resp = state.profile.get_user(user.user_id).await?;
    Ok(Json(resp))
}

/// PATCH /user/me
pub async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<UpdateUserResponse>, AppError> {
    let resp = state.profile.update_user(user.user_id, body).await?;
    if resp.updated {
        info!(user_id = %user.user_id, "User profile updated");
    }
    Ok(Json(resp))
}

/// PUT /user/me/picture
pub async fn update_me_picture(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<UpdatePictureRequest>,
) -> Result<Json<UpdateUserResponse>, AppError> {
    let resp = state
        .profile
        .update_picture(user.user_id, body.picture)
        .await?;
    info!(user_id = %user.user_id, "User picture updated");
    Ok(Json(resp))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use crate::api::routes::create_router;
    use crate::test_helpers::{mock_app_state, test_claims};
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt; // oneshot

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = HttpRequest::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    /// Router plus the access token of a freshly signed-in user
    async fn signed_in_app() -> (Router, String) {
        let (state, _, verifier) = mock_app_state();
        verifier.accept("good", test_claims("s1", "a@b.com"));
        let app = create_router(state);
        let (_, body) = send(
            &app,
            "POST",
            "/auth/google",
            None,
            Some(json!({"id_token": "good"})),
        )
        .await;
        let token = body["access_token"].as_str().unwrap().to_string();
        (app, token)
    }

    #[tokio::test]
    async fn test_get_me_requires_auth() {
        let (app, _) = signed_in_app().await;
        let (status, _) = send(&app, "GET", "/user/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_get_me() {
        let (app, token) = signed_in_app().await;
        let (status, body) = send(&app, "GET", "/user/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "a@b.com");
        assert_eq!(body["google_sub"], "s1");
    }

    #[tokio::test]
    async fn test_patch_me() {
        let (app, token) = signed_in_app().await;

        let (status, body) = send(
            &app,
            "PATCH",
            "/user/me",
            Some(&token),
            Some(json!({"full_name": "Ada Lovelace", "first_name": "Ada"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["updated"], true);
        assert_eq!(body["user"]["full_name"], "Ada Lovelace");

        let (status, body) = send(&app, "PATCH", "/user/me", Some(&token), Some(json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["updated"], false);
        assert!(body.get("user").is_none());

        let (_, me) = send(&app, "GET", "/user/me", Some(&token), None).await;
        assert_eq!(me["first_name"], "Ada");
    }

    #[tokio::test]
    async fn test_put_picture() {
        let (app, token) = signed_in_app().await;
        let (status, body) = send(
            &app,
            "PUT",
            "/user/me/picture",
            Some(&token),
            Some(json!({"picture": "https://example.com/me.jpg"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["picture"], "https://example.com/me.jpg");
    }

    #[tokio::test]
    async fn test_token_for_deleted_user_is_not_found() {
        let (state, _, _) = mock_app_state();
        let token = state
            .auth
            .codec()
            .issue_access_token(uuid::Uuid::new_v4())
            .unwrap();
        let app = create_router(state);

        let (status, body) = send(&app, "GET", "/user/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "user not found");
    }
}
