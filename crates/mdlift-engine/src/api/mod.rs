//! Contracts for the remote rich-document service.
//!
//! [`DocumentApi`] is the seam between the conversion pipeline and the
//! network: the real [`client::DocsClient`] implements it over HTTP, tests
//! implement it in memory. Every failure carries enough context (method,
//! URL, remote code and message) to tell configuration mistakes apart from
//! transient server issues and permanent rejections.

pub mod client;
pub mod wire;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use wire::BlockPayload;

/// App credentials used to obtain access tokens.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub app_id: String,
    pub app_secret: String,
}

/// Machine-readable classification of a remote error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    InvalidParameter,
    TooManyBlocks,
    TooManyChildren,
    RateLimited,
    PermissionDenied,
    Network,
    Other,
}

/// A failed call against the service, with full diagnostic context.
#[derive(Debug, Error)]
#[error("{method} {url} failed (http {status:?}, code {code:?}): {message}")]
pub struct ApiFailure {
    pub method: &'static str,
    pub url: String,
    pub status: Option<u16>,
    pub code: Option<i64>,
    pub message: String,
    pub kind: ApiErrorKind,
    /// Server-supplied rate-limit reset hint, when present.
    pub retry_after: Option<Duration>,
}

impl ApiFailure {
    pub fn is_rate_limited(&self) -> bool {
        self.kind == ApiErrorKind::RateLimited
    }

    pub(crate) fn network(method: &'static str, url: String, source: &reqwest::Error) -> Self {
        Self {
            method,
            url,
            status: source.status().map(|status| status.as_u16()),
            code: None,
            message: source.to_string(),
            kind: ApiErrorKind::Network,
            retry_after: None,
        }
    }
}

/// Remote error codes the service documents.
pub(crate) mod codes {
    pub const INVALID_PARAMETER: i64 = 400_001;
    pub const TOO_MANY_BLOCKS: i64 = 400_002;
    pub const TOO_MANY_CHILDREN: i64 = 400_003;
    pub const PERMISSION_DENIED: i64 = 403_001;
    pub const RATE_LIMITED: i64 = 429_001;
}

pub(crate) fn classify(status: Option<u16>, code: Option<i64>) -> ApiErrorKind {
    match code {
        Some(codes::INVALID_PARAMETER) => ApiErrorKind::InvalidParameter,
        Some(codes::TOO_MANY_BLOCKS) => ApiErrorKind::TooManyBlocks,
        Some(codes::TOO_MANY_CHILDREN) => ApiErrorKind::TooManyChildren,
        Some(codes::PERMISSION_DENIED) => ApiErrorKind::PermissionDenied,
        Some(codes::RATE_LIMITED) => ApiErrorKind::RateLimited,
        _ => match status {
            Some(429) => ApiErrorKind::RateLimited,
            Some(403) => ApiErrorKind::PermissionDenied,
            _ => ApiErrorKind::Other,
        },
    }
}

/// A document as returned by the creation endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentInfo {
    pub document_id: String,
    pub revision_id: i64,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedBlock {
    pub block_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// Relation from a client temporary id to the server-assigned id.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockIdRelation {
    pub temporary_block_id: String,
    pub block_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBlocksData {
    #[serde(default)]
    pub children: Vec<CreatedBlock>,
    pub revision_id: i64,
    #[serde(default)]
    pub block_id_relations: Vec<BlockIdRelation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListChildrenData {
    #[serde(default)]
    pub items: Vec<CreatedBlock>,
    #[serde(default)]
    pub page_token: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

/// One entry of the post-upload batch update that attaches media tokens.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateBlockRequest {
    pub block_id: String,
    pub replace_image: ReplaceImage,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplaceImage {
    pub token: String,
}

/// The consumed surface of the remote service.
pub trait DocumentApi {
    fn create_document(
        &self,
        title: Option<&str>,
        folder: Option<&str>,
    ) -> Result<DocumentInfo, ApiFailure>;

    /// Create blocks under `anchor_id`: `children_ids` are attached in
    /// order, `descendants` carries the payload of every block in the
    /// request. Returns created blocks (order not guaranteed) and the
    /// temp-to-real id relations.
    fn create_blocks(
        &self,
        document_id: &str,
        anchor_id: &str,
        children_ids: &[String],
        descendants: &[BlockPayload],
    ) -> Result<CreateBlocksData, ApiFailure>;

    /// Upload media scoped to its owning block; returns the media token.
    fn upload_media(
        &self,
        owner_block_id: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ApiFailure>;

    fn batch_update(
        &self,
        document_id: &str,
        requests: &[UpdateBlockRequest],
    ) -> Result<(), ApiFailure>;

    fn delete_block(&self, document_id: &str, block_id: &str) -> Result<(), ApiFailure>;

    fn list_children(
        &self,
        document_id: &str,
        block_id: &str,
        page_token: Option<&str>,
    ) -> Result<ListChildrenData, ApiFailure>;

    fn transfer_ownership(&self, document_id: &str, target_user: &str) -> Result<(), ApiFailure>;

    /// Browser URL of a document.
    fn document_url(&self, document_id: &str) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_to_kinds() {
        assert_eq!(
            classify(None, Some(codes::RATE_LIMITED)),
            ApiErrorKind::RateLimited
        );
        assert_eq!(
            classify(None, Some(codes::PERMISSION_DENIED)),
            ApiErrorKind::PermissionDenied
        );
        assert_eq!(
            classify(None, Some(codes::TOO_MANY_BLOCKS)),
            ApiErrorKind::TooManyBlocks
        );
        assert_eq!(classify(None, Some(1)), ApiErrorKind::Other);
    }

    #[test]
    fn http_status_classifies_without_code() {
        assert_eq!(classify(Some(429), None), ApiErrorKind::RateLimited);
        assert_eq!(classify(Some(403), None), ApiErrorKind::PermissionDenied);
        assert_eq!(classify(Some(500), None), ApiErrorKind::Other);
    }
}
