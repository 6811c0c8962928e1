//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr, Statement,
};
use uuid::Uuid;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Artist Operations
    // ========================================================================

    /// Create a new artist
    pub async fn create_artist(
        &self,
        name: String,
        bio: String,
        profile_photo: Option<String>,
    ) -> Result<Artist> {
        let artist_id = Uuid::new_v4();
        let now = chrono::Utc::now();

        let artist = ArtistActiveModel {
            id: Set(artist_id),
            name: Set(name),
            bio: Set(bio),
            profile_photo: Set(profile_photo),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        artist.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Find artist by ID
    pub async fn find_artist_by_id(&self, id: Uuid) -> Result<Option<Artist>> {
        ArtistEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find artist by name, ignoring case
    pub async fn find_artist_by_name(&self, name: &str) -> Result<Option<Artist>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"SELECT * FROM artists WHERE LOWER(name) = LOWER($1) LIMIT 1"#,
            vec![name.into()],
        );

        ArtistEntity::find()
            .from_raw_sql(stmt)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// List artists with pagination
    pub async fn list_artists(&self, offset: u64, limit: u64) -> Result<(Vec<Artist>, u64)> {
        let paginator = ArtistEntity::find()
            .order_by_asc(ArtistColumn::Name)
            .paginate(self.read_conn(), limit);

        let total = paginator.num_items().await?;
        let artists = paginator.fetch_page(offset / limit).await?;

        Ok((artists, total))
    }

    /// Update an artist's name and bio
    pub async fn update_artist(&self, id: Uuid, name: String, bio: String) -> Result<Artist> {
        let now = chrono::Utc::now();

        let mut artist: ArtistActiveModel = ArtistEntity::find_by_id(id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::ArtistNotFound { id: id.to_string() })?
            .into();

        artist.name = Set(name);
        artist.bio = Set(bio);
        artist.updated_at = Set(now.into());

        artist.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Delete artist by ID; owned ratings go with it via the FK cascade
    pub async fn delete_artist(&self, id: Uuid) -> Result<bool> {
        let result = ArtistEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Person Operations
    // ========================================================================

    /// Create a new person with pre-hashed credentials
    pub async fn create_person(
        &self,
        email: String,
        display_name: String,
        password_hash: String,
    ) -> Result<Person> {
        let person_id = Uuid::new_v4();
        let now = chrono::Utc::now();

        let person = PersonActiveModel {
            id: Set(person_id),
            email: Set(email.clone()),
            display_name: Set(display_name),
            password_hash: Set(password_hash),
            created_at: Set(now.into()),
        };

        person.insert(self.write_conn()).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateEmail { email }
            } else {
                e.into()
            }
        })
    }

    /// Find person by ID
    pub async fn find_person_by_id(&self, id: Uuid) -> Result<Option<Person>> {
        PersonEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find person by exact email match. Callers canonicalize first.
    pub async fn find_person_by_email(&self, email: &str) -> Result<Option<Person>> {
        PersonEntity::find()
            .filter(PersonColumn::Email.eq(email))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Rating Operations
    // ========================================================================

    /// All ratings owned by an artist
    pub async fn ratings_for_artist(&self, artist_id: Uuid) -> Result<Vec<Rating>> {
        RatingEntity::find()
            .filter(RatingColumn::ArtistId.eq(artist_id))
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find the single rating for an (artist, person) pair
    pub async fn find_rating(&self, artist_id: Uuid, person_id: Uuid) -> Result<Option<Rating>> {
        RatingEntity::find_by_id((artist_id, person_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Insert a new rating. A concurrent insert of the same pair surfaces as
    /// `Duplicate` via the composite primary key.
    pub async fn insert_rating(
        &self,
        artist_id: Uuid,
        person_id: Uuid,
        value: f64,
    ) -> Result<Rating> {
        let now = chrono::Utc::now();

        let rating = RatingActiveModel {
            artist_id: Set(artist_id),
            person_id: Set(person_id),
            value: Set(value),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        rating.insert(self.write_conn()).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Duplicate {
                    message: format!(
                        "rating already exists for artist {} by person {}",
                        artist_id, person_id
                    ),
                }
            } else {
                e.into()
            }
        })
    }

    /// Overwrite the value of an existing rating in place.
    /// Returns the number of rows affected (0 when the row vanished).
    pub async fn update_rating(
        &self,
        artist_id: Uuid,
        person_id: Uuid,
        value: f64,
    ) -> Result<u64> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "UPDATE ratings SET value = $1, updated_at = NOW() WHERE artist_id = $2 AND person_id = $3",
            vec![value.into(), artist_id.into(), person_id.into()],
        );

        use sea_orm::ConnectionTrait;
        let result = self.write_conn().execute(stmt).await?;
        Ok(result.rows_affected())
    }
}

/// Production binding of the rating domain's persistence seam
#[async_trait::async_trait]
impl crate::ratings::CatalogStore for Repository {
    async fn artist_by_id(&self, id: Uuid) -> Result<Option<Artist>> {
        self.find_artist_by_id(id).await
    }

    async fn person_by_email(&self, email: &str) -> Result<Option<Person>> {
        self.find_person_by_email(email).await
    }

    async fn ratings_for_artist(&self, artist_id: Uuid) -> Result<Vec<Rating>> {
        Repository::ratings_for_artist(self, artist_id).await
    }

    async fn rating_for(&self, artist_id: Uuid, person_id: Uuid) -> Result<Option<Rating>> {
        self.find_rating(artist_id, person_id).await
    }

    async fn insert_rating(&self, artist_id: Uuid, person_id: Uuid, value: f64) -> Result<Rating> {
        Repository::insert_rating(self, artist_id, person_id, value).await
    }

    async fn update_rating(&self, artist_id: Uuid, person_id: Uuid, value: f64) -> Result<u64> {
        Repository::update_rating(self, artist_id, person_id, value).await
    }
}
