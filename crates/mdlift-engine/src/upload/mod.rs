//! Upload coordination: submits planned units in order, reconciles
//! server-assigned block ids, and attaches media in a second pass.
//!
//! Units are submitted strictly sequentially; a later unit may anchor on a
//! block created by an earlier one, so no reordering is safe. The id
//! mapping and revision accumulator live only for the duration of one
//! conversion call.

use crate::api::{
    ApiFailure, DocumentApi, ReplaceImage, UpdateBlockRequest, wire,
};
use crate::error::ConvertError;
use crate::media::MediaFetcher;
use crate::models::{BlockForest, BlockKind, MediaTable};
use crate::planning::{Anchor, UploadUnit};
use crate::retry::{RetryPolicy, retry_with_backoff};
use std::collections::HashMap;

pub struct UploadCoordinator<'a> {
    api: &'a dyn DocumentApi,
    document_id: String,
    /// The block all document-root units attach under. The service uses
    /// the document id itself as its root block id.
    root_block_id: String,
    retry: RetryPolicy,
    /// Temporary id string -> server-assigned id, append-only.
    id_map: HashMap<String, String>,
    revision: i64,
}

impl<'a> UploadCoordinator<'a> {
    pub fn new(
        api: &'a dyn DocumentApi,
        document_id: impl Into<String>,
        initial_revision: i64,
        retry: RetryPolicy,
    ) -> Self {
        let document_id = document_id.into();
        Self {
            api,
            root_block_id: document_id.clone(),
            document_id,
            retry,
            id_map: HashMap::new(),
            revision: initial_revision,
        }
    }

    /// Submit every unit, then resolve and attach media. Returns the final
    /// revision id (the latest the server reported, or the initial one if
    /// nothing was uploaded).
    pub fn upload(
        &mut self,
        forest: &BlockForest,
        units: &[UploadUnit],
        media: &MediaTable,
        fetcher: &MediaFetcher,
    ) -> Result<i64, ConvertError> {
        for unit in units {
            self.submit_unit(forest, unit)?;
        }

        let updates = self.media_updates(forest, media, fetcher);
        if !updates.is_empty() {
            self.call_with_retry(|| self.api.batch_update(&self.document_id, &updates))?;
        }
        Ok(self.revision)
    }

    pub fn server_id(&self, temporary_id: &str) -> Option<&str> {
        self.id_map.get(temporary_id).map(String::as_str)
    }

    fn submit_unit(&mut self, forest: &BlockForest, unit: &UploadUnit) -> Result<(), ConvertError> {
        let anchor_id = match &unit.anchor {
            Anchor::DocumentRoot => self.root_block_id.clone(),
            Anchor::Block(id) => {
                let temp = id.to_string();
                self.id_map.get(&temp).cloned().ok_or_else(|| {
                    ConvertError::Transform(format!(
                        "no server id recorded for anchor block {temp}"
                    ))
                })?
            }
        };

        let (children_ids, descendants) = wire::unit_payloads(forest, unit);
        let data = self.call_with_retry(|| {
            self.api
                .create_blocks(&self.document_id, &anchor_id, &children_ids, &descendants)
        })?;

        // Relations arrive in no particular order; record them all before
        // moving on so later units can resolve their anchors.
        for relation in data.block_id_relations {
            self.id_map
                .insert(relation.temporary_block_id, relation.block_id);
        }
        self.revision = data.revision_id;
        Ok(())
    }

    /// Resolve and upload every image's media, collecting the token
    /// updates. Failures are isolated per image: they are logged and the
    /// image stays imageless.
    fn media_updates(
        &self,
        forest: &BlockForest,
        media: &MediaTable,
        fetcher: &MediaFetcher,
    ) -> Vec<UpdateBlockRequest> {
        let mut updates = Vec::new();
        for block in forest.iter() {
            if !matches!(block.kind, BlockKind::Image) {
                continue;
            }
            let Some(source) = media.get(&block.id) else {
                continue;
            };
            let temporary_id = block.id.to_string();
            let Some(server_id) = self.id_map.get(&temporary_id) else {
                log::warn!(
                    "no server id returned for image block {temporary_id}, skipping media upload"
                );
                continue;
            };
            let resolved = match fetcher.resolve(source) {
                Ok(resolved) => resolved,
                Err(err) => {
                    log::warn!("dropping image for block {server_id}: {err}");
                    continue;
                }
            };
            let upload = self.call_with_retry(|| {
                self.api
                    .upload_media(server_id, &resolved.filename, resolved.bytes.clone())
            });
            match upload {
                Ok(token) => updates.push(UpdateBlockRequest {
                    block_id: server_id.clone(),
                    replace_image: ReplaceImage { token },
                }),
                Err(err) => log::warn!("media upload failed for block {server_id}: {err}"),
            }
        }
        updates
    }

    /// Rate-limited calls retry with backoff, honoring the server's reset
    /// hint; all other failures surface immediately.
    fn call_with_retry<T>(
        &self,
        operation: impl FnMut() -> Result<T, ApiFailure>,
    ) -> Result<T, ConvertError> {
        retry_with_backoff(
            &self.retry,
            ApiFailure::is_rate_limited,
            |failure| failure.retry_after,
            operation,
        )
        .map_err(ConvertError::Api)
    }
}
