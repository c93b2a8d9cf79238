//! Upload storage, PDF loading, and document splitting.

pub mod loader;
pub mod splitter;
pub mod types;
pub mod upload;

pub use loader::{DocumentLoader, PdfLoader};
pub use splitter::{TextSplitter, TokenCounter};
pub use types::{ChunkingError, Document, LoadError, Node, StoredUpload, UploadError};
pub use upload::{UploadStore, UploadedFile, compute_content_hash};
