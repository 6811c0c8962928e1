//! Registration, login and identity handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use encore_common::{
    auth::{self, SessionIdentity},
    db::Repository,
    errors::{AppError, Result},
    metrics,
    ratings::{canonical_email, resolve_person},
};

/// Request to register a new person
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    pub display_name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Issued session token
#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Public view of a person
#[derive(Serialize)]
pub struct PersonResponse {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
}

/// Register a new person
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PersonResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let email = canonical_email(&request.email, state.config.auth.normalize_emails);
    let password_hash = auth::hash_password(&request.password)?;

    let repo = Repository::new(state.db.clone());
    let person = repo
        .create_person(email, request.display_name.trim().to_string(), password_hash)
        .await?;

    metrics::record_person_registered();

    tracing::info!(person_id = %person.id, "Person registered");

    Ok((
        StatusCode::CREATED,
        Json(PersonResponse {
            id: person.id,
            email: person.email,
            display_name: person.display_name,
        }),
    ))
}

/// Exchange credentials for a session token
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    let email = canonical_email(&request.email, state.config.auth.normalize_emails);

    let repo = Repository::new(state.db.clone());

    // Same response for unknown email and wrong password
    let person = repo
        .find_person_by_email(&email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !auth::verify_password(&request.password, &person.password_hash) {
        return Err(AppError::InvalidCredentials);
    }

    let jwt = &state.auth.0;
    let access_token = jwt.generate_token(person.id, &person.email)?;

    tracing::info!(person_id = %person.id, "Session token issued");

    Ok(Json(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: jwt.expiration_secs(),
    }))
}

/// Who am I - resolves the calling session identity to a person
pub async fn me(
    State(state): State<AppState>,
    identity: SessionIdentity,
) -> Result<Json<PersonResponse>> {
    let repo = Repository::new(state.db.clone());

    let person = resolve_person(&repo, &identity, state.config.auth.normalize_emails).await?;

    Ok(Json(PersonResponse {
        id: person.id,
        email: person.email,
        display_name: person.display_name,
    }))
}
