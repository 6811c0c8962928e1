//! Per-person artist rating domain
//!
//! The rating subsystem records one numeric rating per (artist, person) pair
//! and derives each artist's classification as the mean of its ratings.
//! Identity is always an explicit argument; nothing in this module reads
//! ambient session state, and nothing here logs.

pub mod identity;

use crate::auth::SessionIdentity;
use crate::db::models::{Artist, Person, Rating};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use uuid::Uuid;

pub use identity::{canonical_email, resolve_person};

/// Persistence seam consumed by the rating domain.
///
/// Implemented by the sea-orm `Repository` for production and by an
/// in-memory double in tests.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn artist_by_id(&self, id: Uuid) -> Result<Option<Artist>>;

    async fn person_by_email(&self, email: &str) -> Result<Option<Person>>;

    async fn ratings_for_artist(&self, artist_id: Uuid) -> Result<Vec<Rating>>;

    async fn rating_for(&self, artist_id: Uuid, person_id: Uuid) -> Result<Option<Rating>>;

    /// Insert a new rating; a concurrent insert of the same pair must surface
    /// as `AppError::Duplicate`.
    async fn insert_rating(&self, artist_id: Uuid, person_id: Uuid, value: f64) -> Result<Rating>;

    /// Overwrite an existing rating's value, returning rows affected.
    async fn update_rating(&self, artist_id: Uuid, person_id: Uuid, value: f64) -> Result<u64>;
}

/// Which path an upsert took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingOutcome {
    /// First rating by this person for this artist
    Created,
    /// Existing rating overwritten in place
    Updated,
}

impl RatingOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RatingOutcome::Created => "created",
            RatingOutcome::Updated => "updated",
        }
    }
}

/// A person's rating of an artist, as returned to callers
#[derive(Debug, Clone, PartialEq)]
pub struct RatingView {
    pub artist_id: Uuid,
    pub value: f64,
}

/// Arithmetic mean of an artist's rating values; `0.0` when it has none.
///
/// Recomputed on every read. Never cached, never persisted: ratings mutate
/// independently of artist edits.
pub fn classification(ratings: &[Rating]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    ratings.iter().map(|r| r.value).sum::<f64>() / ratings.len() as f64
}

/// Rating upsert engine and query service over a [`CatalogStore`].
pub struct RatingService<S> {
    store: S,
    normalize_emails: bool,
}

impl<S: CatalogStore> RatingService<S> {
    pub fn new(store: S, normalize_emails: bool) -> Self {
        Self {
            store,
            normalize_emails,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Record or overwrite the calling person's rating for an artist.
    ///
    /// The identity precondition is checked before any artist or rating
    /// lookup: an unresolvable identity fails with `Unauthenticated` and
    /// nothing is read or mutated. The at-most-one-rating invariant is
    /// backed by the store's uniqueness guarantee on the pair; the two
    /// read-modify-write races are each retried exactly once:
    /// a lost insert falls back to update, a lost update to insert.
    pub async fn rate_artist(
        &self,
        artist_id: Uuid,
        identity: &SessionIdentity,
        value: f64,
    ) -> Result<RatingOutcome> {
        let person = resolve_person(&self.store, identity, self.normalize_emails).await?;

        let artist = self
            .store
            .artist_by_id(artist_id)
            .await?
            .ok_or_else(|| AppError::ArtistNotFound {
                id: artist_id.to_string(),
            })?;

        if self.store.rating_for(artist.id, person.id).await?.is_some() {
            let affected = self.store.update_rating(artist.id, person.id, value).await?;
            if affected == 0 {
                // Row vanished between read and write; take the insert path.
                self.store.insert_rating(artist.id, person.id, value).await?;
            }
            return Ok(RatingOutcome::Updated);
        }

        match self.store.insert_rating(artist.id, person.id, value).await {
            Ok(_) => Ok(RatingOutcome::Created),
            Err(AppError::Duplicate { .. }) => {
                // A concurrent insert won the race; overwrite it.
                self.store.update_rating(artist.id, person.id, value).await?;
                Ok(RatingOutcome::Updated)
            }
            Err(e) => Err(e),
        }
    }

    /// The calling person's rating for an artist.
    ///
    /// `ArtistNotFound` and `RatingNotFound` stay distinct signals: the
    /// former means a bad id, the latter that the artist exists but this
    /// person has not rated it.
    pub async fn find_rating(
        &self,
        artist_id: Uuid,
        identity: &SessionIdentity,
    ) -> Result<RatingView> {
        let person = resolve_person(&self.store, identity, self.normalize_emails).await?;

        let artist = self
            .store
            .artist_by_id(artist_id)
            .await?
            .ok_or_else(|| AppError::ArtistNotFound {
                id: artist_id.to_string(),
            })?;

        let rating = self
            .store
            .rating_for(artist.id, person.id)
            .await?
            .ok_or_else(|| AppError::RatingNotFound {
                artist_id: artist_id.to_string(),
            })?;

        Ok(RatingView {
            artist_id: rating.artist_id,
            value: rating.value,
        })
    }

    /// Fresh classification for an artist's current ratings
    pub async fn classification_for(&self, artist_id: Uuid) -> Result<f64> {
        let ratings = self.store.ratings_for_artist(artist_id).await?;
        Ok(classification(&ratings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory CatalogStore double with race-injection knobs
    #[derive(Default)]
    struct MemStore {
        artists: Mutex<Vec<Artist>>,
        persons: Mutex<Vec<Person>>,
        ratings: Mutex<Vec<Rating>>,
        artist_lookups: AtomicUsize,
        // When set, the next insert is beaten by a simulated concurrent
        // writer: a competing row appears and the insert reports Duplicate.
        lose_insert_race: AtomicBool,
        // When set, the next update finds its row deleted underneath it.
        lose_update_race: AtomicBool,
    }

    fn mk_rating(artist_id: Uuid, person_id: Uuid, value: f64) -> Rating {
        let now = chrono::Utc::now();
        Rating {
            artist_id,
            person_id,
            value,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    impl MemStore {
        fn add_artist(&self, name: &str) -> Uuid {
            let now = chrono::Utc::now();
            let id = Uuid::new_v4();
            self.artists.lock().unwrap().push(Artist {
                id,
                name: name.to_string(),
                bio: String::new(),
                profile_photo: None,
                created_at: now.into(),
                updated_at: now.into(),
            });
            id
        }

        fn add_person(&self, email: &str) -> Uuid {
            let now = chrono::Utc::now();
            let id = Uuid::new_v4();
            self.persons.lock().unwrap().push(Person {
                id,
                email: email.to_string(),
                display_name: email.to_string(),
                password_hash: String::new(),
                created_at: now.into(),
            });
            id
        }

        fn rating_values(&self, artist_id: Uuid) -> Vec<(Uuid, f64)> {
            self.ratings
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.artist_id == artist_id)
                .map(|r| (r.person_id, r.value))
                .collect()
        }
    }

    #[async_trait]
    impl CatalogStore for MemStore {
        async fn artist_by_id(&self, id: Uuid) -> Result<Option<Artist>> {
            self.artist_lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.artists.lock().unwrap().iter().find(|a| a.id == id).cloned())
        }

        async fn person_by_email(&self, email: &str) -> Result<Option<Person>> {
            Ok(self
                .persons
                .lock()
                .unwrap()
                .iter()
                .find(|p| p.email == email)
                .cloned())
        }

        async fn ratings_for_artist(&self, artist_id: Uuid) -> Result<Vec<Rating>> {
            Ok(self
                .ratings
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.artist_id == artist_id)
                .cloned()
                .collect())
        }

        async fn rating_for(&self, artist_id: Uuid, person_id: Uuid) -> Result<Option<Rating>> {
            Ok(self
                .ratings
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.artist_id == artist_id && r.person_id == person_id)
                .cloned())
        }

        async fn insert_rating(
            &self,
            artist_id: Uuid,
            person_id: Uuid,
            value: f64,
        ) -> Result<Rating> {
            let mut ratings = self.ratings.lock().unwrap();

            if self.lose_insert_race.swap(false, Ordering::SeqCst) {
                ratings.push(mk_rating(artist_id, person_id, -1.0));
                return Err(AppError::Duplicate {
                    message: "concurrent insert".into(),
                });
            }

            if ratings
                .iter()
                .any(|r| r.artist_id == artist_id && r.person_id == person_id)
            {
                return Err(AppError::Duplicate {
                    message: "pair exists".into(),
                });
            }

            let rating = mk_rating(artist_id, person_id, value);
            ratings.push(rating.clone());
            Ok(rating)
        }

        async fn update_rating(
            &self,
            artist_id: Uuid,
            person_id: Uuid,
            value: f64,
        ) -> Result<u64> {
            let mut ratings = self.ratings.lock().unwrap();

            if self.lose_update_race.swap(false, Ordering::SeqCst) {
                ratings.retain(|r| !(r.artist_id == artist_id && r.person_id == person_id));
                return Ok(0);
            }

            match ratings
                .iter_mut()
                .find(|r| r.artist_id == artist_id && r.person_id == person_id)
            {
                Some(r) => {
                    r.value = value;
                    Ok(1)
                }
                None => Ok(0),
            }
        }
    }

    fn identity_for(email: &str) -> SessionIdentity {
        SessionIdentity {
            person_id: None,
            email: Some(email.to_string()),
            request_id: "test".to_string(),
        }
    }

    fn service(store: MemStore) -> RatingService<MemStore> {
        RatingService::new(store, true)
    }

    #[tokio::test]
    async fn first_rating_takes_insert_path() {
        let store = MemStore::default();
        let artist = store.add_artist("Nina Simone");
        store.add_person("fan@example.com");
        let svc = service(store);

        let outcome = svc
            .rate_artist(artist, &identity_for("fan@example.com"), 4.0)
            .await
            .unwrap();

        assert_eq!(outcome, RatingOutcome::Created);
        assert_eq!(svc.store().rating_values(artist).len(), 1);
        assert_eq!(svc.classification_for(artist).await.unwrap(), 4.0);
    }

    #[tokio::test]
    async fn rerating_overwrites_in_place() {
        let store = MemStore::default();
        let artist = store.add_artist("Nina Simone");
        store.add_person("fan@example.com");
        let svc = service(store);
        let identity = identity_for("fan@example.com");

        for value in [4.0, 2.5, 1.0] {
            svc.rate_artist(artist, &identity, value).await.unwrap();
        }

        let values = svc.store().rating_values(artist);
        assert_eq!(values.len(), 1, "exactly one rating per pair");
        assert_eq!(values[0].1, 1.0, "last value wins");
    }

    #[tokio::test]
    async fn repeat_call_is_idempotent() {
        let store = MemStore::default();
        let artist = store.add_artist("Nina Simone");
        store.add_person("fan@example.com");
        let svc = service(store);
        let identity = identity_for("fan@example.com");

        svc.rate_artist(artist, &identity, 3.0).await.unwrap();
        let before = svc.store().rating_values(artist);

        let outcome = svc.rate_artist(artist, &identity, 3.0).await.unwrap();
        assert_eq!(outcome, RatingOutcome::Updated);
        assert_eq!(svc.store().rating_values(artist), before);
    }

    #[tokio::test]
    async fn ratings_are_isolated_across_persons() {
        let store = MemStore::default();
        let artist = store.add_artist("Nina Simone");
        let p1 = store.add_person("p1@example.com");
        let p2 = store.add_person("p2@example.com");
        let svc = service(store);

        svc.rate_artist(artist, &identity_for("p1@example.com"), 4.0)
            .await
            .unwrap();
        svc.rate_artist(artist, &identity_for("p2@example.com"), 2.0)
            .await
            .unwrap();
        svc.rate_artist(artist, &identity_for("p1@example.com"), 0.0)
            .await
            .unwrap();

        let values = svc.store().rating_values(artist);
        assert_eq!(values.len(), 2);
        assert_eq!(values.iter().find(|(p, _)| *p == p1).unwrap().1, 0.0);
        assert_eq!(values.iter().find(|(p, _)| *p == p2).unwrap().1, 2.0);
    }

    #[tokio::test]
    async fn classification_follows_the_rating_sequence() {
        let store = MemStore::default();
        let artist = store.add_artist("Nina Simone");
        store.add_person("p1@example.com");
        store.add_person("p2@example.com");
        let svc = service(store);

        assert_eq!(svc.classification_for(artist).await.unwrap(), 0.0);

        svc.rate_artist(artist, &identity_for("p1@example.com"), 4.0)
            .await
            .unwrap();
        assert_eq!(svc.classification_for(artist).await.unwrap(), 4.0);

        svc.rate_artist(artist, &identity_for("p2@example.com"), 2.0)
            .await
            .unwrap();
        assert_eq!(svc.classification_for(artist).await.unwrap(), 3.0);

        svc.rate_artist(artist, &identity_for("p1@example.com"), 0.0)
            .await
            .unwrap();
        assert_eq!(svc.classification_for(artist).await.unwrap(), 1.0);
    }

    #[tokio::test]
    async fn query_distinguishes_missing_artist_from_missing_rating() {
        let store = MemStore::default();
        let artist = store.add_artist("Nina Simone");
        store.add_person("p1@example.com");
        store.add_person("p2@example.com");
        let svc = service(store);

        svc.rate_artist(artist, &identity_for("p2@example.com"), 2.0)
            .await
            .unwrap();

        let view = svc
            .find_rating(artist, &identity_for("p2@example.com"))
            .await
            .unwrap();
        assert_eq!(view.artist_id, artist);
        assert_eq!(view.value, 2.0);

        let err = svc
            .find_rating(artist, &identity_for("p1@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RatingNotFound { .. }));

        let err = svc
            .find_rating(Uuid::new_v4(), &identity_for("p2@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ArtistNotFound { .. }));
    }

    #[tokio::test]
    async fn unauthenticated_fails_before_any_artist_lookup() {
        let store = MemStore::default();
        let artist = store.add_artist("Nina Simone");
        let svc = service(store);

        let anonymous = SessionIdentity::anonymous("test");
        let err = svc.rate_artist(artist, &anonymous, 4.0).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated { .. }));

        // Unknown email is the same signal as no session
        let err = svc
            .rate_artist(artist, &identity_for("nobody@example.com"), 4.0)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated { .. }));

        assert_eq!(
            svc.store().artist_lookups.load(Ordering::SeqCst),
            0,
            "identity precondition must run before artist resolution"
        );
        assert!(svc.store().rating_values(artist).is_empty());
    }

    #[tokio::test]
    async fn lost_insert_race_falls_back_to_update() {
        let store = MemStore::default();
        let artist = store.add_artist("Nina Simone");
        store.add_person("fan@example.com");
        store.lose_insert_race.store(true, Ordering::SeqCst);
        let svc = service(store);

        let outcome = svc
            .rate_artist(artist, &identity_for("fan@example.com"), 4.5)
            .await
            .unwrap();

        assert_eq!(outcome, RatingOutcome::Updated);
        let values = svc.store().rating_values(artist);
        assert_eq!(values.len(), 1, "invariant holds after the race");
        assert_eq!(values[0].1, 4.5, "last write wins");
    }

    #[tokio::test]
    async fn lost_update_race_falls_back_to_insert() {
        let store = MemStore::default();
        let artist = store.add_artist("Nina Simone");
        store.add_person("fan@example.com");
        let svc = service(store);
        let identity = identity_for("fan@example.com");

        svc.rate_artist(artist, &identity, 3.0).await.unwrap();
        svc.store().lose_update_race.store(true, Ordering::SeqCst);

        svc.rate_artist(artist, &identity, 1.5).await.unwrap();

        let values = svc.store().rating_values(artist);
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].1, 1.5);
    }

    #[test]
    fn classification_of_empty_collection_is_zero() {
        assert_eq!(classification(&[]), 0.0);
    }

    #[test]
    fn classification_is_the_mean() {
        let a = Uuid::new_v4();
        let ratings = vec![
            mk_rating(a, Uuid::new_v4(), 4.0),
            mk_rating(a, Uuid::new_v4(), 2.0),
        ];
        assert_eq!(classification(&ratings), 3.0);
    }
}
