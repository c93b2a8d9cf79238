//! Short-lived storage for uploaded PDFs.
//!
//! Each upload lands at `<dir>/<sha256>-<uuid>.pdf` and lives only while it is being indexed;
//! [`UploadStore::discard`] removes it afterwards. The per-upload suffix keeps concurrent
//! uploads of identical bytes from deleting each other's file.

use super::types::{StoredUpload, UploadError};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use uuid::Uuid;

const PDF_SIGNATURE: &[u8] = b"%PDF-";
const PDF_MIME: &str = "application/pdf";
const GENERIC_MIMES: [&str; 2] = ["application/octet-stream", "binary/octet-stream"];

/// File received from a client.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// File name supplied by the client.
    pub file_name: String,
    /// Declared MIME type, if any.
    pub content_type: Option<String>,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

/// Writes uploads into a staging directory until they are indexed.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    /// Store uploads below `dir`, creating it lazily.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Validate and persist an upload, returning where it was written.
    pub async fn persist(&self, file: &UploadedFile) -> Result<StoredUpload, UploadError> {
        validate(file)?;

        let content_hash = compute_content_hash(&file.bytes);
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self
            .dir
            .join(format!("{content_hash}-{}.pdf", Uuid::new_v4().simple()));
        if let Err(error) = tokio::fs::write(&path, &file.bytes).await {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(error.into());
        }

        tracing::info!(
            file_name = %file.file_name,
            content_hash = %content_hash,
            bytes = file.bytes.len(),
            "Upload stored"
        );

        Ok(StoredUpload {
            path,
            content_hash,
            file_name: file.file_name.clone(),
            size: file.bytes.len(),
        })
    }

    /// Delete a stored upload once it is no longer needed.
    ///
    /// Failures are logged; the indexes built from the file are unaffected.
    pub async fn discard(&self, stored: &StoredUpload) {
        match tokio::fs::remove_file(&stored.path).await {
            Ok(()) => tracing::debug!(path = %stored.path.display(), "Upload discarded"),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => tracing::warn!(
                path = %stored.path.display(),
                error = %error,
                "Failed to delete stored upload"
            ),
        }
    }
}

/// Hex-encoded SHA-256 digest of the upload bytes.
pub fn compute_content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn validate(file: &UploadedFile) -> Result<(), UploadError> {
    if file.bytes.is_empty() {
        return Err(UploadError::Empty);
    }

    let has_pdf_name = file.file_name.to_lowercase().ends_with(".pdf");
    let declared = file
        .content_type
        .as_deref()
        .map(|value| value.split(';').next().unwrap_or("").trim().to_lowercase());
    let accepted = match declared.as_deref() {
        Some(PDF_MIME) => true,
        Some(mime) if GENERIC_MIMES.contains(&mime) => has_pdf_name,
        Some("") | None => has_pdf_name,
        Some(_) => false,
    };
    if !accepted {
        let label = declared
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| file.file_name.clone());
        return Err(UploadError::UnsupportedType(label));
    }

    if !file.bytes.starts_with(PDF_SIGNATURE) {
        return Err(UploadError::NotPdf);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf_upload(name: &str, body: &[u8]) -> UploadedFile {
        let mut bytes = PDF_SIGNATURE.to_vec();
        bytes.extend_from_slice(body);
        UploadedFile {
            file_name: name.into(),
            content_type: Some(PDF_MIME.into()),
            bytes,
        }
    }

    fn stored_files(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn upload_is_stored_under_content_hash() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = UploadStore::new(dir.path());
        let upload = pdf_upload("paper.pdf", b"1.4 body");

        let stored = store.persist(&upload).await.expect("stored");

        assert_eq!(stored.content_hash, compute_content_hash(&upload.bytes));
        let name = stored.path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(&format!("{}-", stored.content_hash)), "{name}");
        assert!(name.ends_with(".pdf"));
        assert_eq!(stored.path.parent(), Some(dir.path()));
        assert_eq!(stored.file_name, "paper.pdf");
        assert_eq!(stored.size, upload.bytes.len());
        let written = tokio::fs::read(&stored.path).await.expect("read back");
        assert_eq!(written, upload.bytes);
    }

    #[tokio::test]
    async fn identical_uploads_get_separate_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = UploadStore::new(dir.path());

        let first = store.persist(&pdf_upload("a.pdf", b"same")).await.unwrap();
        let second = store.persist(&pdf_upload("b.pdf", b"same")).await.unwrap();

        assert_eq!(first.content_hash, second.content_hash);
        assert_ne!(first.path, second.path);
        store.discard(&first).await;
        assert!(second.path.exists());
    }

    #[tokio::test]
    async fn discarded_uploads_leave_the_directory_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = UploadStore::new(dir.path());

        for body in [b"one".as_slice(), b"two", b"three"] {
            let stored = store.persist(&pdf_upload("paper.pdf", body)).await.unwrap();
            assert_eq!(stored_files(dir.path()), 1);
            store.discard(&stored).await;
        }

        assert_eq!(stored_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn discarding_twice_is_harmless() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = UploadStore::new(dir.path());
        let stored = store.persist(&pdf_upload("a.pdf", b"once")).await.unwrap();

        store.discard(&stored).await;
        store.discard(&stored).await;
        assert!(!stored.path.exists());
    }

    #[tokio::test]
    async fn empty_upload_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = UploadStore::new(dir.path());
        let upload = UploadedFile {
            file_name: "empty.pdf".into(),
            content_type: Some(PDF_MIME.into()),
            bytes: Vec::new(),
        };
        assert!(matches!(
            store.persist(&upload).await,
            Err(UploadError::Empty)
        ));
    }

    #[test]
    fn non_pdf_types_are_rejected() {
        let upload = UploadedFile {
            file_name: "notes.txt".into(),
            content_type: Some("text/plain".into()),
            bytes: b"%PDF-1.4".to_vec(),
        };
        assert!(matches!(
            validate(&upload),
            Err(UploadError::UnsupportedType(ref mime)) if mime == "text/plain"
        ));
    }

    #[test]
    fn generic_type_requires_pdf_name() {
        let mut upload = pdf_upload("paper.PDF", b"1.7");
        upload.content_type = Some("application/octet-stream".into());
        assert!(validate(&upload).is_ok());

        upload.file_name = "paper.bin".into();
        assert!(matches!(
            validate(&upload),
            Err(UploadError::UnsupportedType(_))
        ));
    }

    #[test]
    fn renamed_non_pdf_is_rejected() {
        let upload = UploadedFile {
            file_name: "image.pdf".into(),
            content_type: Some(PDF_MIME.into()),
            bytes: b"\x89PNG\r\n".to_vec(),
        };
        assert!(matches!(validate(&upload), Err(UploadError::NotPdf)));
    }

    #[test]
    fn content_hash_is_hex_sha256() {
        let hash = compute_content_hash(b"abc");
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
