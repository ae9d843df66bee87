//! Core engine for mdlift: converts Markdown into a forest of content
//! blocks, plans the forest into size-bounded creation requests, and uploads
//! the requests to a remote rich-document service.

pub mod api;
pub mod convert;
pub mod diagram;
pub mod error;
pub mod media;
pub mod models;
pub mod parsing;
pub mod planning;
pub mod retry;
pub mod upload;

// Re-export key types for easier usage
pub use api::client::DocsClient;
pub use api::{ApiErrorKind, ApiFailure, Credentials, DocumentApi};
pub use convert::{ConversionResult, ConvertOptions, Converter, parse_only};
pub use diagram::{DiagramOptions, DiagramRenderer, MermaidCli, RenderError};
pub use error::ConvertError;
pub use media::{MediaError, MediaFetcher, classify_source};
pub use models::{
    BlockForest, BlockId, BlockKind, ContentBlock, MediaSource, MediaTable, StyledTextRun,
    TextStyle,
};
pub use parsing::{WalkOptions, WalkOutput, walk_markdown};
pub use planning::{Anchor, UploadUnit, plan_units};
pub use retry::{RetryPolicy, retry_with_backoff};
pub use upload::UploadCoordinator;
