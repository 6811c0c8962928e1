//! Artist catalog handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use encore_common::{
    db::models::Artist,
    db::Repository,
    errors::{AppError, Result},
    metrics,
    ratings::classification,
};

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;

/// Request to create a new artist
#[derive(Debug, Deserialize, Validate)]
pub struct CreateArtistRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 5000))]
    pub bio: String,

    /// Base64-encoded profile photo payload
    pub profile_photo: Option<String>,
}

/// Request to update an artist; replaces name and bio
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateArtistRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 5000))]
    pub bio: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListArtistsQuery {
    #[serde(default)]
    pub offset: u64,
    pub limit: Option<u64>,
}

/// Response for a single artist
#[derive(Serialize)]
pub struct ArtistResponse {
    pub id: Uuid,
    pub name: String,
    pub bio: String,
    pub profile_photo: Option<String>,
    /// Mean of all ratings, 0 when the artist has none. Derived fresh on
    /// every read; never stored.
    pub classification: f64,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct ArtistListResponse {
    pub artists: Vec<ArtistResponse>,
    pub total: u64,
}

async fn to_response(repo: &Repository, artist: Artist) -> Result<ArtistResponse> {
    let ratings = repo.ratings_for_artist(artist.id).await?;

    Ok(ArtistResponse {
        id: artist.id,
        name: artist.name,
        bio: artist.bio,
        profile_photo: artist.profile_photo,
        classification: classification(&ratings),
        created_at: artist.created_at.to_rfc3339(),
    })
}

/// List artists with pagination
pub async fn list_artists(
    State(state): State<AppState>,
    Query(query): Query<ListArtistsQuery>,
) -> Result<Json<ArtistListResponse>> {
    let repo = Repository::new(state.db.clone());

    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let (artists, total) = repo.list_artists(query.offset, limit).await?;

    let mut responses = Vec::with_capacity(artists.len());
    for artist in artists {
        responses.push(to_response(&repo, artist).await?);
    }

    Ok(Json(ArtistListResponse {
        artists: responses,
        total,
    }))
}

/// Get an artist by ID
pub async fn get_artist(
    State(state): State<AppState>,
    Path(artist_id): Path<Uuid>,
) -> Result<Json<ArtistResponse>> {
    let repo = Repository::new(state.db.clone());

    let artist = repo
        .find_artist_by_id(artist_id)
        .await?
        .ok_or_else(|| AppError::ArtistNotFound {
            id: artist_id.to_string(),
        })?;

    Ok(Json(to_response(&repo, artist).await?))
}

/// Get an artist by name, ignoring case
pub async fn get_artist_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ArtistResponse>> {
    let repo = Repository::new(state.db.clone());

    let artist = repo
        .find_artist_by_name(&name)
        .await?
        .ok_or_else(|| AppError::ArtistNotFound { id: name })?;

    Ok(Json(to_response(&repo, artist).await?))
}

/// Create a new artist
pub async fn create_artist(
    State(state): State<AppState>,
    Json(request): Json<CreateArtistRequest>,
) -> Result<(StatusCode, Json<ArtistResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let name = request.name.trim().to_string();

    let profile_photo = match request.profile_photo.as_deref() {
        Some(payload) if !payload.is_empty() => {
            Some(state.photos.save_profile_photo(&name, payload).await?)
        }
        _ => None,
    };

    let repo = Repository::new(state.db.clone());
    let artist = repo.create_artist(name, request.bio, profile_photo).await?;

    metrics::record_artist_created();

    tracing::info!(
        artist_id = %artist.id,
        name = %artist.name,
        "Artist created"
    );

    Ok((StatusCode::CREATED, Json(to_response(&repo, artist).await?)))
}

/// Update an artist's name and bio
pub async fn update_artist(
    State(state): State<AppState>,
    Path(artist_id): Path<Uuid>,
    Json(request): Json<UpdateArtistRequest>,
) -> Result<Json<ArtistResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let repo = Repository::new(state.db.clone());
    let artist = repo
        .update_artist(artist_id, request.name.trim().to_string(), request.bio)
        .await?;

    tracing::info!(artist_id = %artist_id, "Artist updated");

    Ok(Json(to_response(&repo, artist).await?))
}

/// Delete an artist; its ratings go with it
pub async fn delete_artist(
    State(state): State<AppState>,
    Path(artist_id): Path<Uuid>,
) -> Result<StatusCode> {
    let repo = Repository::new(state.db.clone());

    let deleted = repo.delete_artist(artist_id).await?;
    if !deleted {
        return Err(AppError::ArtistNotFound {
            id: artist_id.to_string(),
        });
    }

    tracing::info!(artist_id = %artist_id, "Artist deleted");

    Ok(StatusCode::NO_CONTENT)
}
