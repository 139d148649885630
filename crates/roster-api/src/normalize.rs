//! Document normalizer: persists accepted uploads into the public directory.
//!
//! Images are decoded, scaled to cover a [`NORMALIZED_SIZE`] square and
//! centre-cropped to it (aspect ratio preserved, overflow cut evenly from
//! both sides), then re-encoded as JPEG at [`JPEG_QUALITY`]. Passthrough
//! documents are written byte for byte.
//!
//! Files of one request are processed concurrently. Either every file is
//! persisted or, on the first failure, the ones already written are removed
//! again and no filename is handed back.

use std::path::{Path, PathBuf};

use futures::future::join_all;
use image::{ExtendedColorType, ImageError, codecs::jpeg::JpegEncoder, imageops::FilterType};
use roster_core::{
  UserId,
  slot::{
    JPEG_QUALITY, NORMALIZED_SIZE, Processing, Slot, document_filename,
    passthrough_extension,
  },
};
use thiserror::Error;

use crate::upload::ReceivedFile;

#[derive(Debug, Error)]
pub enum NormalizeError {
  #[error("could not decode `{slot}` as an image: {source}")]
  Decode {
    slot:   Slot,
    #[source]
    source: ImageError,
  },

  #[error("could not encode `{slot}`: {source}")]
  Encode {
    slot:   Slot,
    #[source]
    source: ImageError,
  },

  #[error("could not write `{slot}` to {path:?}: {source}")]
  Write {
    slot:   Slot,
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("image worker failed: {0}")]
  Worker(#[from] tokio::task::JoinError),
}

/// A file that now exists in the public directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
  pub slot:     Slot,
  pub filename: String,
}

/// The public, client-readable directory documents are written to.
#[derive(Debug, Clone)]
pub struct DocumentStore {
  root: PathBuf,
}

impl DocumentStore {
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

  /// Persist every `(file, processing)` pair for `owner`, naming each
  /// `user-<owner>-<stamp_ms>-<slot>.<ext>`.
  ///
  /// An empty input is a no-op and returns no documents.
  pub async fn persist_all(
    &self,
    owner: UserId,
    stamp_ms: i64,
    files: Vec<(ReceivedFile, Processing)>,
  ) -> Result<Vec<StoredDocument>, NormalizeError> {
    if files.is_empty() {
      return Ok(Vec::new());
    }

    let results = join_all(
      files
        .into_iter()
        .map(|(file, processing)| self.persist_one(owner, stamp_ms, file, processing)),
    )
    .await;

    let (stored, failures): (Vec<_>, Vec<_>) =
      results.into_iter().partition(Result::is_ok);
    let stored: Vec<StoredDocument> = stored.into_iter().filter_map(Result::ok).collect();

    match failures.into_iter().find_map(Result::err) {
      None => Ok(stored),
      Some(err) => {
        self.remove_all(&stored).await;
        Err(err)
      }
    }
  }

  /// Delete previously stored documents. Failures are logged, not returned.
  pub async fn remove_all(&self, docs: &[StoredDocument]) {
    for doc in docs {
      let path = self.root.join(&doc.filename);
      if let Err(e) = tokio::fs::remove_file(&path).await {
        tracing::warn!(?path, error = %e, "failed to remove stored document");
      }
    }
  }

  async fn persist_one(
    &self,
    owner: UserId,
    stamp_ms: i64,
    file: ReceivedFile,
    processing: Processing,
  ) -> Result<StoredDocument, NormalizeError> {
    let slot = file.slot;
    let (bytes, extension) = match processing {
      Processing::NormalizeImage => {
        let input = file.bytes;
        let jpeg =
          tokio::task::spawn_blocking(move || normalize_image(slot, &input)).await??;
        (jpeg, "jpeg")
      }
      Processing::Passthrough => (
        file.bytes.to_vec(),
        passthrough_extension(file.content_type.as_deref()),
      ),
    };

    let filename = document_filename(owner, stamp_ms, slot, extension);
    let path = self.root.join(&filename);
    write_atomic(&path, &bytes)
      .await
      .map_err(|source| NormalizeError::Write {
        slot,
        path: path.clone(),
        source,
      })?;

    tracing::debug!(%slot, %filename, bytes = bytes.len(), "stored document");
    Ok(StoredDocument { slot, filename })
  }
}

/// Decode `data`, cover-resize it to the canonical square and encode it as
/// JPEG.
pub fn normalize_image(slot: Slot, data: &[u8]) -> Result<Vec<u8>, NormalizeError> {
  let decoded = image::load_from_memory(data)
    .map_err(|source| NormalizeError::Decode { slot, source })?;

  let rgb = decoded
    .resize_to_fill(NORMALIZED_SIZE, NORMALIZED_SIZE, FilterType::Lanczos3)
    .to_rgb8();

  let mut out = Vec::new();
  JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
    .encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
    .map_err(|source| NormalizeError::Encode { slot, source })?;
  Ok(out)
}

/// Write to a sibling temp file and rename it into place, so readers of the
/// public directory never observe a half-written document.
async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
  if let Some(parent) = path.parent() {
    tokio::fs::create_dir_all(parent).await?;
  }
  let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
  if let Err(e) = tokio::fs::write(&tmp_path, bytes).await {
    let _ = tokio::fs::remove_file(&tmp_path).await;
    return Err(e);
  }
  if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
    let _ = tokio::fs::remove_file(&tmp_path).await;
    return Err(e);
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use std::io::Cursor;

  use bytes::Bytes;
  use image::{ImageFormat, Rgb, RgbImage};

  use super::*;

  fn png(width: u32, height: u32) -> Bytes {
    let img = RgbImage::from_fn(width, height, |x, y| {
      Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    Bytes::from(out.into_inner())
  }

  fn received(slot: Slot, content_type: &str, bytes: Bytes) -> ReceivedFile {
    ReceivedFile {
      slot,
      content_type: Some(content_type.into()),
      bytes,
    }
  }

  #[test]
  fn normalised_image_is_a_square_jpeg() {
    let jpeg = normalize_image(Slot::Photo, &png(800, 300)).unwrap();
    assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
    let decoded = image::load_from_memory(&jpeg).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (NORMALIZED_SIZE, NORMALIZED_SIZE));
  }

  #[test]
  fn small_images_are_scaled_up() {
    let jpeg = normalize_image(Slot::Photo, &png(10, 20)).unwrap();
    let decoded = image::load_from_memory(&jpeg).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (NORMALIZED_SIZE, NORMALIZED_SIZE));
  }

  #[test]
  fn garbage_fails_to_decode() {
    let err = normalize_image(Slot::Photo, b"definitely not an image").unwrap_err();
    assert!(matches!(err, NormalizeError::Decode { slot: Slot::Photo, .. }));
  }

  #[tokio::test]
  async fn persists_with_deterministic_names() {
    let dir = tempfile::tempdir().unwrap();
    let store = DocumentStore::new(dir.path());

    let docs = store
      .persist_all(UserId(42), 1_234, vec![
        (received(Slot::Photo, "image/png", png(64, 64)), Processing::NormalizeImage),
        (
          received(Slot::Cv, "application/pdf", Bytes::from_static(b"%PDF-1.7 fake")),
          Processing::Passthrough,
        ),
      ])
      .await
      .unwrap();

    let names: Vec<&str> = docs.iter().map(|d| d.filename.as_str()).collect();
    assert!(names.contains(&"user-42-1234-photo.jpeg"));
    assert!(names.contains(&"user-42-1234-cv.pdf"));

    let cv = std::fs::read(dir.path().join("user-42-1234-cv.pdf")).unwrap();
    assert_eq!(cv, b"%PDF-1.7 fake");
    let photo = std::fs::read(dir.path().join("user-42-1234-photo.jpeg")).unwrap();
    assert_eq!(image::guess_format(&photo).unwrap(), ImageFormat::Jpeg);

    // No temp files left behind.
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
  }

  #[tokio::test]
  async fn one_failure_leaves_no_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = DocumentStore::new(dir.path());

    let err = store
      .persist_all(UserId(1), 99, vec![
        (received(Slot::Photo, "image/png", png(32, 32)), Processing::NormalizeImage),
        (
          received(Slot::LicensedId, "image/png", Bytes::from_static(b"broken")),
          Processing::NormalizeImage,
        ),
      ])
      .await
      .unwrap_err();

    assert!(matches!(err, NormalizeError::Decode { slot: Slot::LicensedId, .. }));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
  }

  #[tokio::test]
  async fn nothing_to_store_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let store = DocumentStore::new(dir.path().join("never-created"));
    let docs = store.persist_all(UserId(1), 1, Vec::new()).await.unwrap();
    assert!(docs.is_empty());
    assert!(!dir.path().join("never-created").exists());
  }
}
