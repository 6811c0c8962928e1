//! Profile photo storage
//!
//! Artist creation carries the photo as a base64 payload; it is decoded,
//! written under the media root with a timestamped name, and the artist
//! record keeps only the public path.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use encore_common::errors::{AppError, Result};
use std::path::PathBuf;

#[derive(Clone)]
pub struct PhotoStore {
    root: PathBuf,
    public_base: String,
}

impl PhotoStore {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into(),
        }
    }

    /// Decode and persist a profile photo, returning its public path
    pub async fn save_profile_photo(&self, artist_name: &str, payload: &str) -> Result<String> {
        let bytes = BASE64.decode(payload.trim()).map_err(|e| AppError::InvalidFormat {
            message: format!("profile photo is not valid base64: {}", e),
        })?;

        let file_name = format!(
            "{}.{}.jpg",
            chrono::Utc::now().format("%d%m%Y%H%M%S"),
            slug(artist_name)
        );

        let path = self.root.join(&file_name);
        tokio::fs::write(&path, &bytes).await?;

        Ok(format!(
            "{}/{}",
            self.public_base.trim_end_matches('/'),
            file_name
        ))
    }
}

/// Filesystem-safe rendition of an artist name
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_dash = true;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }

    let out = out.trim_end_matches('-').to_string();
    if out.is_empty() {
        "artist".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug() {
        assert_eq!(slug("Nina Simone"), "nina-simone");
        assert_eq!(slug("  AC/DC  "), "ac-dc");
        assert_eq!(slug("Sigur Rós"), "sigur-r-s");
        assert_eq!(slug("!!!"), "artist");
    }

    #[tokio::test]
    async fn test_save_profile_photo_roundtrip() {
        let dir = std::env::temp_dir().join(format!("encore-photos-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();

        let store = PhotoStore::new(&dir, "/photos");
        let payload = BASE64.encode(b"jpeg bytes");

        let public_path = store.save_profile_photo("Nina Simone", &payload).await.unwrap();
        assert!(public_path.starts_with("/photos/"));
        assert!(public_path.ends_with(".nina-simone.jpg"));

        let file_name = public_path.strip_prefix("/photos/").unwrap();
        let written = tokio::fs::read(dir.join(file_name)).await.unwrap();
        assert_eq!(written, b"jpeg bytes");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_base64_is_rejected() {
        let store = PhotoStore::new(std::env::temp_dir(), "/photos");
        let err = store
            .save_profile_photo("Nina Simone", "not base64 at all!")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidFormat { .. }));
    }
}
