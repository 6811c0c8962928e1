//! Rating handlers
//!
//! The calling person is resolved from the request's session identity;
//! both endpoints answer 401 when no usable identity is attached.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use encore_common::{
    auth::SessionIdentity,
    db::Repository,
    errors::{AppError, Result},
    metrics, RatingService,
};

/// Request to rate an artist
#[derive(Debug, Deserialize, Validate)]
pub struct RateArtistRequest {
    /// Rating value on the 0-5 scale
    #[validate(range(min = 0.0, max = 5.0))]
    pub value: f64,
}

/// The calling person's rating for an artist
#[derive(Serialize)]
pub struct RatingResponse {
    pub artist_id: Uuid,
    pub value: f64,
}

fn rating_service(state: &AppState) -> RatingService<Repository> {
    RatingService::new(
        Repository::new(state.db.clone()),
        state.config.auth.normalize_emails,
    )
}

/// Record or overwrite the calling person's rating for an artist
pub async fn rate_artist(
    State(state): State<AppState>,
    identity: SessionIdentity,
    Path(artist_id): Path<Uuid>,
    Json(request): Json<RateArtistRequest>,
) -> Result<StatusCode> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("value".to_string()),
    })?;

    let outcome = rating_service(&state)
        .rate_artist(artist_id, &identity, request.value)
        .await?;

    metrics::record_rating(outcome.as_str(), request.value);

    tracing::info!(
        artist_id = %artist_id,
        outcome = outcome.as_str(),
        request_id = %identity.request_id,
        "Artist rated"
    );

    Ok(StatusCode::CREATED)
}

/// Get the calling person's rating for an artist
pub async fn get_rating(
    State(state): State<AppState>,
    identity: SessionIdentity,
    Path(artist_id): Path<Uuid>,
) -> Result<Json<RatingResponse>> {
    let view = rating_service(&state)
        .find_rating(artist_id, &identity)
        .await?;

    Ok(Json(RatingResponse {
        artist_id: view.artist_id,
        value: view.value,
    }))
}
