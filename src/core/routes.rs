// HTTP routes configuration

use crate::core::error::{panic_response, timeout_error};
use crate::core::state::AppState;
use crate::handlers::{fallback, health, users};
use axum::{error_handling::HandleErrorLayer, routing::get, BoxError, Router};
use std::sync::Arc;
use std::time::Duration;
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub const USERS_URL: &str = "/users";
pub const USER_URL: &str = "/users/{id}";

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            USERS_URL,
            get(users::list_users_handler).post(users::create_user_handler),
        )
        .route(
            USER_URL,
            get(users::get_user_handler)
                .put(users::update_user_handler)
                .patch(users::partially_update_user_handler)
                .delete(users::delete_user_handler),
        )
        .route("/health", get(health::health_handler))

        // JSON 404 for all unmatched routes, JSON 405 for known paths with the wrong verb
        .fallback(fallback::fallback_handler)
        .method_not_allowed_fallback(fallback::method_not_allowed_handler)

        .with_state(state)
}

/// Router wrapped in request tracing, the request timeout and panic recovery
pub fn build_app(state: Arc<AppState>, request_timeout: Duration) -> Router {
    build_router(state).layer(
        ServiceBuilder::new()
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                    .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
            )
            .layer(HandleErrorLayer::new(move |err: BoxError| async move {
                timeout_error(request_timeout, err)
            }))
            .layer(TimeoutLayer::new(request_timeout))
            .layer(CatchPanicLayer::custom(panic_response)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::api::ErrorResponse;
    use crate::models::user::{User, UserPatch};
    use crate::stores::memory::MemoryUserStorage;
    use crate::stores::{StorageError, UserStorage};
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn create_test_app() -> Router {
        let state = AppState::new(Arc::new(MemoryUserStorage::new()));
        build_app(Arc::new(state), Duration::from_secs(15))
    }

    /// Storage whose every call outlives any reasonable request timeout
    struct StalledStorage;

    #[async_trait]
    impl UserStorage for StalledStorage {
        async fn create(&self, _user: User) -> Result<String, StorageError> {
            std::future::pending().await
        }

        async fn find_one(&self, _id: &str) -> Result<User, StorageError> {
            std::future::pending().await
        }

        async fn find_all(&self) -> Result<Vec<User>, StorageError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Vec::new())
        }

        async fn update(&self, _user: User) -> Result<(), StorageError> {
            std::future::pending().await
        }

        async fn partially_update(&self, _id: &str, _patch: UserPatch) -> Result<(), StorageError> {
            std::future::pending().await
        }

        async fn delete(&self, _id: &str) -> Result<(), StorageError> {
            std::future::pending().await
        }
    }

    async fn error_body(response: Response) -> ErrorResponse {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<&str>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        app.clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    async fn body_bytes(response: Response) -> axum::body::Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_create_get_delete_lifecycle() {
        let app = create_test_app();

        let response = send(
            &app,
            Method::POST,
            "/users",
            Some(r#"{"username":"a","email":"a@x.com","passwordHash":"h"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let location = response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let created: User = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert!(!created.id.is_empty());
        assert_eq!(location, format!("/users/{}", created.id));

        let uri = format!("/users/{}", created.id);
        let response = send(&app, Method::GET, &uri, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let fetched: User = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(fetched.username, "a");
        assert_eq!(fetched.email, "a@x.com");
        assert_eq!(fetched.password_hash, "h");
        assert_eq!(fetched.id, created.id);

        let response = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(&app, Method::GET, &uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let error: ErrorResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(error.code, "US-000003");
    }

    #[tokio::test]
    async fn test_list_starts_empty() {
        let app = create_test_app();

        let response = send(&app, Method::GET, "/users", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let users: Vec<User> = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert!(users.is_empty());
    }

    #[tokio::test]
    async fn test_put_and_patch() {
        let app = create_test_app();

        let response = send(
            &app,
            Method::POST,
            "/users",
            Some(r#"{"username":"a","email":"a@x.com","passwordHash":"h"}"#),
        )
        .await;
        let created: User = serde_json::from_slice(&body_bytes(response).await).unwrap();
        let uri = format!("/users/{}", created.id);

        let response = send(
            &app,
            Method::PUT,
            &uri,
            Some(r#"{"id":"ffffffffffffffffffffffff","username":"b","email":"b@x.com","passwordHash":"h2"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(&app, Method::PATCH, &uri, Some(r#"{"email":"c@x.com"}"#)).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(&app, Method::GET, &uri, None).await;
        let fetched: User = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.username, "b");
        assert_eq!(fetched.password_hash, "h2");
        assert_eq!(fetched.email, "c@x.com");

        let response = send(&app, Method::GET, "/users/ffffffffffffffffffffffff", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_id_is_bad_request() {
        let app = create_test_app();

        let response = send(&app, Method::GET, "/users/not-an-id", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let error: ErrorResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(error.code, "US-000004");
        assert!(error.developer_message.contains("not-an-id"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let app = create_test_app();

        let response = send(&app, Method::POST, "/users", Some(r#"{"username":"#)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&app, Method::POST, "/users", Some(r#"{"username":"a"}"#)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_unknown_is_not_found() {
        let app = create_test_app();

        let response = send(&app, Method::DELETE, "/users/65f1c0ffee0123456789abcd", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_not_found() {
        let app = create_test_app();

        let response = send(&app, Method::GET, "/nope", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let error: ErrorResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(error.message, "not found");
    }

    #[tokio::test]
    async fn test_health_route() {
        let app = create_test_app();

        let response = send(&app, Method::GET, "/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_undecodable_path_id_is_json_bad_request() {
        let app = create_test_app();

        let response = send(&app, Method::GET, "/users/%FF", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let error = error_body(response).await;
        assert_eq!(error.code, "US-000004");
        assert_eq!(error.message, "invalid request");
    }

    #[tokio::test]
    async fn test_wrong_method_is_json_method_not_allowed() {
        let app = create_test_app();

        let response = send(&app, Method::DELETE, "/users", None).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(error_body(response).await.code, "US-000005");

        let response = send(&app, Method::POST, "/users/65f1c0ffee0123456789abcd", None).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(error_body(response).await.code, "US-000005");
    }

    #[tokio::test]
    async fn test_slow_storage_times_out_with_json_body() {
        let state = AppState::new(Arc::new(StalledStorage));
        let app = build_app(Arc::new(state), Duration::from_millis(50));

        let response = send(&app, Method::GET, "/users", None).await;
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

        let error = error_body(response).await;
        assert_eq!(error.code, "US-000006");
        assert_eq!(error.message, "request timed out");
    }
}
