//! Media resolution: turns logical image references into bytes ready for
//! upload.
//!
//! Sources are classified during the tree walk; the fetcher resolves every
//! source to in-memory bytes before the upload phase, so nothing downstream
//! has to handle filesystem paths or deferred URLs.

use crate::models::MediaSource;
use base64::Engine as _;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Upper bound on a fetched remote image.
pub const MAX_FETCH_BYTES: u64 = 50 * 1024 * 1024;
const FETCH_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_FILENAME: &str = "image.png";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        source: reqwest::Error,
    },
    #[error("remote image {url} exceeds the {limit} byte limit")]
    TooLarge { url: String, limit: u64 },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("remote image downloads are disabled")]
    RemoteDisabled,
}

/// Classify a raw image source string from the document.
///
/// Data URLs decode to bytes immediately, absolute http(s) URLs defer to
/// the fetch phase, anything else is a filesystem path resolved against
/// `base_dir` when relative. Returns `None` for sources that cannot carry
/// image data (malformed data URLs, unsupported schemes).
pub fn classify_source(raw: &str, base_dir: Option<&Path>) -> Option<MediaSource> {
    if let Some(rest) = raw.strip_prefix("data:") {
        return decode_data_url(rest);
    }
    if let Ok(url) = Url::parse(raw) {
        return match url.scheme() {
            "http" | "https" => Some(MediaSource::Url(raw.to_string())),
            "file" => url.to_file_path().ok().map(MediaSource::Path),
            // Windows drive letters parse as single-letter schemes; treat
            // everything else as unsupported.
            _ => None,
        };
    }
    let path = PathBuf::from(raw);
    let path = if path.is_relative() {
        match base_dir {
            Some(base) => base.join(&path),
            None => path,
        }
    } else {
        path
    };
    Some(MediaSource::Path(path))
}

fn decode_data_url(rest: &str) -> Option<MediaSource> {
    // data:[<mediatype>][;base64],<data>
    let (meta, data) = rest.split_once(',')?;
    let data = if meta.ends_with(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(data.trim())
            .ok()?
    } else {
        data.as_bytes().to_vec()
    };
    let filename = match meta.split(';').next().unwrap_or_default() {
        "" | "image/png" => "image.png",
        "image/jpeg" | "image/jpg" => "image.jpg",
        "image/gif" => "image.gif",
        "image/svg+xml" => "image.svg",
        "image/webp" => "image.webp",
        _ => "image.bin",
    };
    Some(MediaSource::Bytes {
        data,
        filename: filename.to_string(),
    })
}

/// An image resolved to bytes, ready for the media endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedia {
    pub bytes: Vec<u8>,
    pub filename: String,
}

/// Resolves any [`MediaSource`] to bytes. Remote fetches are size-capped
/// and timeout-bound.
pub struct MediaFetcher {
    http: reqwest::blocking::Client,
    download_remote: bool,
}

impl MediaFetcher {
    pub fn new(download_remote: bool) -> Result<Self, reqwest::Error> {
        let http = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            download_remote,
        })
    }

    pub fn resolve(&self, source: &MediaSource) -> Result<ResolvedMedia, MediaError> {
        match source {
            MediaSource::Bytes { data, filename } => Ok(ResolvedMedia {
                bytes: data.clone(),
                filename: filename.clone(),
            }),
            MediaSource::Path(path) => {
                let bytes = std::fs::read(path).map_err(|source| MediaError::Read {
                    path: path.clone(),
                    source,
                })?;
                let filename = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| DEFAULT_FILENAME.to_string());
                Ok(ResolvedMedia { bytes, filename })
            }
            MediaSource::Url(_) if !self.download_remote => Err(MediaError::RemoteDisabled),
            MediaSource::Url(url) => self.fetch(url),
        }
    }

    fn fetch(&self, url: &str) -> Result<ResolvedMedia, MediaError> {
        let response = self
            .http
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|source| MediaError::Fetch {
                url: url.to_string(),
                source,
            })?;
        if let Some(length) = response.content_length()
            && length > MAX_FETCH_BYTES
        {
            return Err(MediaError::TooLarge {
                url: url.to_string(),
                limit: MAX_FETCH_BYTES,
            });
        }
        let bytes = response.bytes().map_err(|source| MediaError::Fetch {
            url: url.to_string(),
            source,
        })?;
        if bytes.len() as u64 > MAX_FETCH_BYTES {
            return Err(MediaError::TooLarge {
                url: url.to_string(),
                limit: MAX_FETCH_BYTES,
            });
        }
        Ok(ResolvedMedia {
            bytes: bytes.to_vec(),
            filename: filename_from_url(url),
        })
    }
}

fn filename_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}
