//! Rendered cards and uploaded photos on local disk.

use std::path::{Path, PathBuf};

use rand::distr::{Alphanumeric, SampleString};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::constants::ALLOWED_UPLOAD_EXTENSIONS;
use crate::error::CardError;

const MAX_STEM_CHARS: usize = 40;
const SUFFIX_CHARS: usize = 6;

/// One stored card, as listed in the gallery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GalleryEntry {
    /// File name inside the cards directory
    pub filename: String,
    /// Size in bytes
    pub size: u64,
}

/// The cards and uploads directories.
#[derive(Clone, Debug)]
pub struct CardStore {
    cards_dir: PathBuf,
    uploads_dir: PathBuf,
}

impl CardStore {
    /// Store over two directories; see [CardStore::ensure_dirs].
    pub fn new(cards_dir: impl Into<PathBuf>, uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            cards_dir: cards_dir.into(),
            uploads_dir: uploads_dir.into(),
        }
    }

    /// Where cards are written.
    pub fn cards_dir(&self) -> &Path {
        &self.cards_dir
    }

    /// Where uploads are written.
    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Creates both directories if they are missing.
    pub async fn ensure_dirs(&self) -> Result<(), CardError> {
        tokio::fs::create_dir_all(&self.cards_dir).await?;
        tokio::fs::create_dir_all(&self.uploads_dir).await?;
        Ok(())
    }

    /// Writes a finished card under `filename`. Never overwrites, and a card
    /// is either fully present or absent.
    pub async fn write_card(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, CardError> {
        if !is_safe_filename(filename) {
            return Err(CardError::Storage(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("refusing unsafe card filename {filename:?}"),
            )));
        }
        write_atomic(&self.cards_dir, filename, bytes).await
    }

    /// Saves the source photo under a fresh name with its original extension.
    /// Returns the stored file name.
    pub async fn save_upload(&self, original_name: &str, bytes: &[u8]) -> Result<String, CardError> {
        let extension = allowed_extension(original_name)
            .ok_or_else(|| CardError::UnsupportedFileType(original_name.to_string()))?;
        let stem = Path::new(original_name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default();
        let filename = unique_filename(stem, &extension);
        write_atomic(&self.uploads_dir, &filename, bytes).await?;
        debug!("Stored upload {:?} as {}", original_name, filename);
        Ok(filename)
    }

    /// A fresh `<stem>_<unix_ts>_<suffix>.png` for a card.
    pub fn unique_card_filename(&self, stem: &str) -> String {
        unique_filename(stem, "png")
    }

    /// Full path of a stored card, or `None` for unsafe or unknown names.
    pub fn card_path(&self, filename: &str) -> Option<PathBuf> {
        if !is_safe_filename(filename) {
            return None;
        }
        let path = self.cards_dir.join(filename);
        path.is_file().then_some(path)
    }

    /// Every stored card image, sorted by file name.
    pub async fn list_cards(&self) -> Result<Vec<GalleryEntry>, CardError> {
        let mut entries = match tokio::fs::read_dir(&self.cards_dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut cards = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Some(filename) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let is_image = Path::new(&filename)
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
                .unwrap_or(false);
            if !is_image || !is_safe_filename(&filename) {
                continue;
            }
            let metadata = entry.metadata().await?;
            if metadata.is_file() {
                cards.push(GalleryEntry {
                    filename,
                    size: metadata.len(),
                });
            }
        }
        cards.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(cards)
    }
}

/// Writes to a hidden temp file in `dir`, syncs it, then hard-links it into
/// place. Linking fails with `AlreadyExists` instead of replacing a file, so
/// an existing card is never overwritten. The temp file is always removed.
async fn write_atomic(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf, CardError> {
    let target = dir.join(filename);
    let suffix = Alphanumeric.sample_string(&mut rand::rng(), 8);
    let temp = dir.join(format!(".{filename}.{suffix}.tmp"));
    let result = async {
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp)
            .await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::hard_link(&temp, &target).await
    }
    .await;

    if let Err(cleanup) = tokio::fs::remove_file(&temp).await
        && cleanup.kind() != std::io::ErrorKind::NotFound
    {
        warn!("Failed to remove temp file {}: {}", temp.display(), cleanup);
    }
    result?;
    Ok(target)
}

fn unique_filename(stem: &str, extension: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let suffix = Alphanumeric.sample_string(&mut rand::rng(), SUFFIX_CHARS);
    format!("{}_{}_{}.{}", safe_stem(stem), timestamp, suffix, extension)
}

/// ASCII letters, digits and `_`; anything else becomes `_`. At most 40
/// characters, `card` if nothing is left.
pub fn safe_stem(stem: &str) -> String {
    let cleaned: String = stem
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(MAX_STEM_CHARS)
        .collect();
    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        "card".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Plain file names only: `[A-Za-z0-9_.-]`, no leading dot, no `..`.
pub fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.starts_with('.')
        && !filename.contains("..")
        && filename
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// Lowercased extension, if it is one we accept for uploads.
pub fn allowed_extension(filename: &str) -> Option<String> {
    let extension = Path::new(filename)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    ALLOWED_UPLOAD_EXTENSIONS
        .contains(&extension.as_str())
        .then_some(extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> CardStore {
        CardStore::new(dir.path().join("cards"), dir.path().join("uploads"))
    }

    fn dir_names(path: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(path)
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn stems_are_sanitised() {
        assert_eq!(safe_stem("Buffer Betty!"), "Buffer_Betty");
        assert_eq!(safe_stem("../../etc/passwd"), "etc_passwd");
        assert_eq!(safe_stem("   "), "card");
        assert_eq!(safe_stem("ü"), "card");
        assert_eq!(safe_stem(&"a".repeat(100)).len(), MAX_STEM_CHARS);
    }

    #[test]
    fn unsafe_filenames_are_rejected() {
        assert!(is_safe_filename("Buffer_Betty_1700000000_aB3dE9.png"));
        assert!(!is_safe_filename("../secret.png"));
        assert!(!is_safe_filename("a/b.png"));
        assert!(!is_safe_filename("a\\b.png"));
        assert!(!is_safe_filename(".hidden.png"));
        assert!(!is_safe_filename("a..png"));
        assert!(!is_safe_filename(""));
        assert!(!is_safe_filename("caf\u{e9}.png"));
    }

    #[test]
    fn extensions_are_checked() {
        assert_eq!(allowed_extension("me.JPG").as_deref(), Some("jpg"));
        assert_eq!(allowed_extension("me.bmp").as_deref(), Some("bmp"));
        assert_eq!(allowed_extension("me.webp"), None);
        assert_eq!(allowed_extension("noextension"), None);
    }

    #[test]
    fn card_filenames_are_unique_and_shaped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir);
        let first = store.unique_card_filename("Buffer Betty");
        let second = store.unique_card_filename("Buffer Betty");
        assert_ne!(first, second);
        assert!(first.starts_with("Buffer_Betty_"));
        assert!(first.ends_with(".png"));
        assert!(is_safe_filename(&first));
        let parts: Vec<&str> = first.trim_end_matches(".png").rsplitn(3, '_').collect();
        assert_eq!(parts[0].len(), SUFFIX_CHARS);
        assert!(parts[1].parse::<i64>().is_ok());
    }

    #[tokio::test]
    async fn write_card_is_atomic_and_never_overwrites() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir);
        store.ensure_dirs().await.expect("dirs");

        let path = store.write_card("a_1_abcdef.png", b"first").await.expect("write");
        assert_eq!(std::fs::read(&path).expect("read"), b"first");
        assert_eq!(dir_names(store.cards_dir()), vec!["a_1_abcdef.png"]);

        let err = store
            .write_card("a_1_abcdef.png", b"second")
            .await
            .expect_err("no overwrite");
        assert!(
            matches!(&err, CardError::Storage(io) if io.kind() == std::io::ErrorKind::AlreadyExists),
            "{err:?}"
        );
        assert_eq!(std::fs::read(&path).expect("read"), b"first");
        assert_eq!(dir_names(store.cards_dir()), vec!["a_1_abcdef.png"]);

        assert!(store.write_card("../escape.png", b"x").await.is_err());
    }

    #[tokio::test]
    async fn failed_write_leaves_nothing_behind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir);
        // cards dir never created
        assert!(store.write_card("lost_1_abcdef.png", b"x").await.is_err());
        assert!(!store.cards_dir().exists());
    }

    #[tokio::test]
    async fn uploads_keep_their_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir);
        store.ensure_dirs().await.expect("dirs");

        let name = store.save_upload("My Selfie.JPEG", b"jpeg").await.expect("save");
        assert!(name.starts_with("My_Selfie_"));
        assert!(name.ends_with(".jpeg"));
        assert!(store.uploads_dir().join(&name).is_file());

        let err = store.save_upload("notes.txt", b"hi").await.expect_err("bad type");
        assert!(matches!(err, CardError::UnsupportedFileType(_)));
    }

    #[tokio::test]
    async fn lists_cards_sorted_and_resolves_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir);
        assert!(store.list_cards().await.expect("missing dir").is_empty());
        store.ensure_dirs().await.expect("dirs");

        store.write_card("b_2_bbbbbb.png", b"bb").await.expect("write");
        store.write_card("a_1_aaaaaa.png", b"a").await.expect("write");
        std::fs::write(store.cards_dir().join("notes.txt"), b"skip").expect("write txt");

        let cards = store.list_cards().await.expect("list");
        assert_eq!(
            cards,
            vec![
                GalleryEntry {
                    filename: "a_1_aaaaaa.png".to_string(),
                    size: 1
                },
                GalleryEntry {
                    filename: "b_2_bbbbbb.png".to_string(),
                    size: 2
                },
            ]
        );
        assert!(store.card_path("a_1_aaaaaa.png").is_some());
        assert!(store.card_path("missing.png").is_none());
        assert!(store.card_path("../cards/a_1_aaaaaa.png").is_none());
    }
}
