//! Image storage for confirmation proofs and profile pictures.
//!
//! Uploaded bytes are written as-is under a generated `<field>-<uuid>.<ext>`
//! name; that file name is the reference stored on the owning record.

use std::path::{Path, PathBuf};

use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result};

pub const PROOF_FIELD: &str = "proofImage";
pub const PROFILE_FIELD: &str = "profileImage";

const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Lower-cased extension of `file_name` if it is an accepted image type.
    fn accepted_extension(file_name: &str) -> Option<String> {
        let ext = Path::new(file_name)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
    }

    /// Check an upload's name and size before anything touches the disk.
    pub fn validate(&self, field: &str, file_name: Option<&str>, len: usize) -> Result<String> {
        let ext = file_name
            .and_then(Self::accepted_extension)
            .ok_or_else(|| AppError::invalid(field, "Only image files are allowed"))?;
        if len == 0 {
            return Err(AppError::invalid(field, "File is empty"));
        }
        if len > self.max_bytes {
            return Err(AppError::invalid(
                field,
                format!("File exceeds the {} byte limit", self.max_bytes),
            ));
        }
        Ok(ext)
    }

    /// Persist one image uploaded under `field` and return its reference.
    pub async fn store(&self, field: &str, file_name: Option<&str>, bytes: &[u8]) -> Result<String> {
        let ext = self.validate(field, file_name, bytes.len())?;
        let reference = format!("{field}-{}.{ext}", Uuid::new_v4());

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&reference), bytes).await?;
        info!("Stored {field} {reference} ({} bytes)", bytes.len());
        Ok(reference)
    }

    /// True when `reference` has the shape of a name `store` hands out for `field`.
    fn is_generated_name(field: &str, reference: &str) -> bool {
        let Some(rest) = reference
            .strip_prefix(field)
            .and_then(|r| r.strip_prefix('-'))
        else {
            return false;
        };
        let Some((stem, ext)) = rest.rsplit_once('.') else {
            return false;
        };
        ALLOWED_EXTENSIONS.contains(&ext)
            && Uuid::parse_str(stem).is_ok_and(|id| id.hyphenated().to_string() == stem)
    }

    /// Accept a client-supplied reference only if it names a stored upload.
    pub async fn check_reference(&self, field: &str, reference: &str) -> Result<()> {
        let known = Self::is_generated_name(field, reference)
            && tokio::fs::try_exists(self.dir.join(reference)).await?;
        if known {
            Ok(())
        } else {
            Err(AppError::invalid(field, "Unknown image reference"))
        }
    }

    /// Best-effort removal of an upload whose owning write failed.
    pub async fn discard(&self, reference: &str) {
        if let Err(e) = tokio::fs::remove_file(self.dir.join(reference)).await {
            warn!("Could not remove orphaned upload {reference}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_images_under_generated_names() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::new(tmp.path().join("images"), 1024);

        let reference = store
            .store(PROOF_FIELD, Some("Receipt.PNG"), b"\x89PNG")
            .await
            .unwrap();
        assert!(reference.starts_with("proofImage-"));
        assert!(reference.ends_with(".png"));

        let written = tokio::fs::read(tmp.path().join("images").join(&reference))
            .await
            .unwrap();
        assert_eq!(written, b"\x89PNG");

        let other = store
            .store(PROFILE_FIELD, Some("me.jpg"), b"x")
            .await
            .unwrap();
        assert!(other.starts_with("profileImage-"));
    }

    #[tokio::test]
    async fn rejects_other_types_and_oversized_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::new(tmp.path(), 4);

        for name in [Some("notes.pdf"), Some("noext"), None] {
            assert!(matches!(
                store.store(PROOF_FIELD, name, b"abc").await,
                Err(AppError::Validation(_))
            ));
        }
        assert!(matches!(
            store.store(PROOF_FIELD, Some("big.jpg"), b"abcde").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            store.store(PROOF_FIELD, Some("empty.gif"), b"").await,
            Err(AppError::Validation(_))
        ));
        assert!(store.store(PROOF_FIELD, Some("ok.jpeg"), b"abcd").await.is_ok());
    }

    #[tokio::test]
    async fn only_stored_references_are_accepted() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::new(tmp.path(), 1024);
        let reference = store
            .store(PROOF_FIELD, Some("receipt.png"), b"png")
            .await
            .unwrap();

        store.check_reference(PROOF_FIELD, &reference).await.unwrap();

        let unknown = format!("proofImage-{}.png", Uuid::new_v4());
        for forged in [
            "../../etc/passwd",
            "proofImage-../../etc/passwd.png",
            "receipt.png",
            unknown.as_str(),
        ] {
            assert!(
                matches!(
                    store.check_reference(PROOF_FIELD, forged).await,
                    Err(AppError::Validation(_))
                ),
                "{forged} was accepted"
            );
        }
        // Right file, wrong field.
        assert!(store
            .check_reference(PROFILE_FIELD, &reference)
            .await
            .is_err());

        store.discard(&reference).await;
        assert!(store.check_reference(PROOF_FIELD, &reference).await.is_err());
    }
}
