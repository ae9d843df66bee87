//! Media references recorded while walking the document.
//!
//! A reference is keyed by the temporary id of the Image block it belongs
//! to, created during the tree walk, resolved to bytes before upload, and
//! consumed once the server-side block has its media attached.

use super::BlockId;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Where an image's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MediaSource {
    /// Absolute http(s) URL, fetched during the upload phase.
    Url(String),
    /// Filesystem path, already resolved against the configured base dir.
    Path(PathBuf),
    /// Bytes decoded or rendered during the walk (data URLs, diagrams).
    Bytes { data: Vec<u8>, filename: String },
}

/// Side table of unresolved media, keyed by owning Image block id.
pub type MediaTable = HashMap<BlockId, MediaSource>;
