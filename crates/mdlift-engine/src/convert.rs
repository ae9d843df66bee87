//! Conversion entry points: create, append, replace, and offline parse.

use crate::api::DocumentApi;
use crate::diagram::{DiagramOptions, DiagramRenderer, MermaidCli};
use crate::error::ConvertError;
use crate::media::MediaFetcher;
use crate::parsing::{WalkOptions, WalkOutput, walk_markdown};
use crate::planning::plan_units;
use crate::retry::RetryPolicy;
use crate::upload::UploadCoordinator;
use std::path::PathBuf;

/// Default per-request node ceiling imposed by the service.
pub const DEFAULT_MAX_BLOCKS_PER_REQUEST: usize = 1000;

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub title: Option<String>,
    pub destination_folder: Option<String>,
    pub image_base_dir: Option<PathBuf>,
    pub download_remote_images: bool,
    pub diagram: DiagramOptions,
    pub max_blocks_per_request: usize,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            title: None,
            destination_folder: None,
            image_base_dir: None,
            download_remote_images: true,
            diagram: DiagramOptions::default(),
            max_blocks_per_request: DEFAULT_MAX_BLOCKS_PER_REQUEST,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub document_id: String,
    pub url: String,
    pub revision_id: i64,
}

/// Drives one conversion at a time against a document service.
pub struct Converter<'a> {
    api: &'a dyn DocumentApi,
    options: ConvertOptions,
    fetcher: MediaFetcher,
    retry: RetryPolicy,
}

impl<'a> Converter<'a> {
    pub fn new(api: &'a dyn DocumentApi, options: ConvertOptions) -> Result<Self, ConvertError> {
        let fetcher = MediaFetcher::new(options.download_remote_images).map_err(|err| {
            ConvertError::Configuration(format!("failed to build http client: {err}"))
        })?;
        Ok(Self {
            api,
            options,
            fetcher,
            retry: RetryPolicy::default(),
        })
    }

    /// Create a new document and upload the converted Markdown into it.
    pub fn convert(&self, markdown: &str) -> Result<ConversionResult, ConvertError> {
        let document = self
            .api
            .create_document(
                self.options.title.as_deref(),
                self.options.destination_folder.as_deref(),
            )
            .map_err(ConvertError::Api)?;
        if document.document_id.is_empty() {
            return Err(ConvertError::Transform(
                "document creation returned no document id".to_string(),
            ));
        }
        self.upload_into(markdown, &document.document_id, document.revision_id)
    }

    /// Append the converted Markdown to the end of an existing document.
    pub fn append(&self, markdown: &str, document_id: &str) -> Result<ConversionResult, ConvertError> {
        self.upload_into(markdown, document_id, 0)
    }

    /// Delete every top-level block of an existing document, then append.
    pub fn replace(&self, markdown: &str, document_id: &str) -> Result<ConversionResult, ConvertError> {
        let mut existing = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self
                .api
                .list_children(document_id, document_id, page_token.as_deref())
                .map_err(ConvertError::Api)?;
            existing.extend(page.items.into_iter().map(|block| block.block_id));
            if !page.has_more {
                break;
            }
            match page.page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        for block_id in existing {
            self.api
                .delete_block(document_id, &block_id)
                .map_err(ConvertError::Api)?;
        }
        self.upload_into(markdown, document_id, 0)
    }

    fn upload_into(
        &self,
        markdown: &str,
        document_id: &str,
        initial_revision: i64,
    ) -> Result<ConversionResult, ConvertError> {
        // Scratch space for diagram rendering, created before parsing and
        // removed on every exit path when dropped.
        let scratch = tempfile::tempdir().map_err(|err| {
            ConvertError::Transform(format!("failed to create scratch directory: {err}"))
        })?;
        let renderer = self
            .options
            .diagram
            .enabled
            .then(|| MermaidCli::new(self.options.diagram.clone(), scratch.path()));

        let walk_options = WalkOptions {
            image_base_dir: self.options.image_base_dir.clone(),
        };
        let output = walk_markdown(
            markdown,
            &walk_options,
            renderer.as_ref().map(|cli| cli as &dyn DiagramRenderer),
        );

        // An empty forest is "nothing to upload", not an error.
        let units = plan_units(&output.forest, self.options.max_blocks_per_request);
        let mut coordinator =
            UploadCoordinator::new(self.api, document_id, initial_revision, self.retry.clone());
        let revision_id =
            coordinator.upload(&output.forest, &units, &output.media, &self.fetcher)?;

        Ok(ConversionResult {
            document_id: document_id.to_string(),
            url: self.api.document_url(document_id),
            revision_id,
        })
    }
}

/// Parse Markdown into a block forest without touching the network.
/// Diagram rendering is skipped; mermaid fences stay code blocks.
pub fn parse_only(markdown: &str, options: &ConvertOptions) -> WalkOutput {
    let walk_options = WalkOptions {
        image_base_dir: options.image_base_dir.clone(),
    };
    walk_markdown(markdown, &walk_options, None)
}
