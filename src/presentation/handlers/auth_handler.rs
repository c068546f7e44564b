use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{
    domain::{
        error::DomainError,
        models::{account::Role, verification::VerificationRequest},
        repositories::credential_repository::CredentialRepository,
        services::password_service::PasswordHasher,
    },
    usecase::{
        authorize_usecase::{ADMIN_PANEL, LOGIN, authorize_result},
        verify_usecase::VerifyUsecase,
    },
};

// Request

/// json for login and admin requests
///
/// Missing fields are treated as empty, which the verifier reports as a
/// malformed request.
#[derive(Serialize, Deserialize, Default)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl From<CredentialsRequest> for VerificationRequest {
    fn from(request: CredentialsRequest) -> Self {
        VerificationRequest::new(
            request.username.unwrap_or_default(),
            request.password.unwrap_or_default(),
        )
    }
}

// Response

/// json for login response
#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub role: Role,
    pub last_login: Option<DateTime<Utc>>,
}

/// json for admin response
#[derive(Serialize, Deserialize)]
pub struct AdminResponse {
    pub message: String,
    pub users: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: &str) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Map a gate error to a response; credential failures all look the same
fn rejection(error: DomainError) -> axum::response::Response {
    match error {
        DomainError::MalformedRequest => {
            error_response(StatusCode::BAD_REQUEST, "Username and password required")
        }
        DomainError::Forbidden => error_response(StatusCode::FORBIDDEN, "Admin access required"),
        DomainError::Repository(e) => {
            error!(error = %e, "credential store failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
        _ => error_response(StatusCode::UNAUTHORIZED, "Invalid credentials"),
    }
}

/* Router Function and Handler Function */

/// function return Router object
/// Suppose to be nested by main router
pub fn create_auth_router<
    C: CredentialRepository + 'static,
    P: PasswordHasher + 'static,
>(
    verify_service: VerifyUsecase<C, P>,
) -> Router {
    let state = AppState {
        verify_service: Arc::new(verify_service),
    };

    Router::new()
        .route("/login", post(login::<C, P>))
        .route("/admin", post(admin::<C, P>))
        .with_state(state)
}

pub struct AppState<C: CredentialRepository, P: PasswordHasher> {
    pub verify_service: Arc<VerifyUsecase<C, P>>,
}

impl<C: CredentialRepository, P: PasswordHasher> Clone for AppState<C, P> {
    fn clone(&self) -> Self {
        Self {
            verify_service: Arc::clone(&self.verify_service),
        }
    }
}

// handler function

/// handler function for login
async fn login<C: CredentialRepository + 'static, P: PasswordHasher + 'static>(
    State(state): State<AppState<C, P>>,
    Json(payload): Json<CredentialsRequest>,
) -> impl IntoResponse {
    let result = state
        .verify_service
        .verify_to_completion(payload.into())
        .await;

    match authorize_result(&result, &LOGIN) {
        Ok(account) => {
            info!(
                account_id = %account.id().as_uuid(),
                username = account.username(),
                role = %account.role(),
                "login succeeded"
            );
            let response = LoginResponse {
                message: "Login successful".to_string(),
                role: account.role(),
                last_login: account.last_login(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => rejection(e),
    }
}

/// handler function for the admin-only panel
async fn admin<C: CredentialRepository + 'static, P: PasswordHasher + 'static>(
    State(state): State<AppState<C, P>>,
    Json(payload): Json<CredentialsRequest>,
) -> impl IntoResponse {
    let result = state
        .verify_service
        .verify_to_completion(payload.into())
        .await;

    if let Err(e) = authorize_result(&result, &ADMIN_PANEL) {
        return rejection(e);
    }

    match state.verify_service.registered_usernames().await {
        Ok(users) => {
            let response = AdminResponse {
                message: "Welcome admin!".to_string(),
                users,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => rejection(e),
    }
}
