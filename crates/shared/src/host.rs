//! Collaborator interfaces provided by the hosting application.
//!
//! The chat core never touches the host's document database, PDF viewers,
//! or preference storage directly; it sees them only through these traits.
//! Each capability is a named method rather than duck-typed probing, so
//! extraction strategies can report explicit success or failure.

use std::path::PathBuf;

use anyhow::Result;

/// Opaque handle to a resolved document in the host's library.
#[derive(Debug, Clone)]
pub struct DocumentHandle {
    pub document_id: String,
    /// Best-effort on-disk location of the primary attachment, when the
    /// host knows one.
    pub path: Option<PathBuf>,
}

/// A live viewer instance that has the document open and decoded.
#[derive(Debug, Clone)]
pub struct ViewerHandle {
    pub document_id: String,
    pub page_count: u32,
}

/// The host's document library.
pub trait HostDocumentStore: Send + Sync {
    fn resolve(&self, document_id: &str) -> Result<DocumentHandle>;

    /// Display title for banners and error markers. Falls back to the id
    /// when the host has no better answer.
    fn title(&self, document_id: &str) -> String;

    fn is_pdf_like(&self, handle: &DocumentHandle) -> bool;

    fn attachments(&self, handle: &DocumentHandle) -> Vec<String>;

    /// Read the host's previously-indexed full-text cache artifact, if
    /// the index has an entry for this document.
    fn fulltext_cache(&self, document_id: &str) -> Result<Option<String>>;

    /// Ask the host to index the document (non-forced). Returns once the
    /// request is queued; callers re-read the cache afterwards.
    fn request_index(&self, document_id: &str) -> Result<()>;
}

/// Bridge to the host's document viewers.
pub trait ViewerBridge: Send + Sync {
    /// A viewer that already has this document open, if any.
    fn open_viewer(&self, document_id: &str) -> Option<ViewerHandle>;

    /// Best-effort text per page, in page order. Individual pages may
    /// fail; callers skip those.
    fn read_pages_text(&self, viewer: &ViewerHandle) -> Vec<Result<String>>;

    /// Scroll a viewer to the page. Returns false when no viewer could be
    /// driven (including out-of-range pages).
    fn navigate(&self, document_id: &str, page: u32) -> bool;

    /// Open the document at the page in an external application.
    fn open_externally(&self, document_id: &str, page: u32) -> Result<()>;
}

/// Small durable key-value blobs: credential, model choice, history.
/// All values are strings; structured values are JSON-encoded.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn clear(&self, key: &str) -> Result<()>;
}
