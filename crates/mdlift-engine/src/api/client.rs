//! Blocking HTTP client for the rich-document service.

use super::wire::BlockPayload;
use super::{
    ApiErrorKind, ApiFailure, CreateBlocksData, Credentials, DocumentApi, DocumentInfo,
    ListChildrenData, UpdateBlockRequest, classify,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Mutex;
use std::time::{Duration, Instant};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// Tokens are refreshed this long before the server-reported expiry.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Every response wraps its payload in `{ code, msg, data }`; `code` zero
/// means success.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TokenData {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct CreateDocumentData {
    document: DocumentInfo,
}

#[derive(Debug, Deserialize)]
struct UploadMediaData {
    file_token: String,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// One client session: holds the http connection pool and the cached app
/// access token with its expiry. Nothing here outlives the session.
pub struct DocsClient {
    http: reqwest::blocking::Client,
    base_url: String,
    web_base_url: String,
    credentials: Credentials,
    token: Mutex<Option<CachedToken>>,
}

impl DocsClient {
    pub fn new(
        base_url: impl Into<String>,
        web_base_url: Option<String>,
        credentials: Credentials,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let web_base_url = web_base_url
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| base_url.clone());
        Ok(Self {
            http,
            base_url,
            web_base_url,
            credentials,
            token: Mutex::new(None),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn access_token(&self) -> Result<String, ApiFailure> {
        {
            let guard = lock_token(&self.token);
            if let Some(cached) = guard.as_ref()
                && Instant::now() + TOKEN_REFRESH_MARGIN < cached.expires_at
            {
                return Ok(cached.value.clone());
            }
        }

        let url = self.endpoint("auth/v1/app_token");
        let body = json!({
            "app_id": self.credentials.app_id,
            "app_secret": self.credentials.app_secret,
        });
        let data: TokenData = self.call("POST", url, Some(body), false)?;

        let mut guard = lock_token(&self.token);
        *guard = Some(CachedToken {
            value: data.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(data.expires_in),
        });
        Ok(data.access_token)
    }

    fn send(
        &self,
        method: &'static str,
        url: &str,
        body: Option<Value>,
        auth: bool,
    ) -> Result<reqwest::blocking::Response, ApiFailure> {
        let mut request = match method {
            "GET" => self.http.get(url),
            "POST" => self.http.post(url),
            "PATCH" => self.http.patch(url),
            "DELETE" => self.http.delete(url),
            other => {
                return Err(ApiFailure {
                    method,
                    url: url.to_string(),
                    status: None,
                    code: None,
                    message: format!("unsupported http method {other}"),
                    kind: ApiErrorKind::Other,
                    retry_after: None,
                });
            }
        };
        if auth {
            request = request.bearer_auth(self.access_token()?);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        request
            .send()
            .map_err(|err| ApiFailure::network(method, url.to_string(), &err))
    }

    /// Decode an envelope, turning http errors and non-zero codes into
    /// [`ApiFailure`] with the rate-limit reset hint attached when present.
    fn decode<T: serde::de::DeserializeOwned>(
        method: &'static str,
        url: String,
        response: reqwest::blocking::Response,
    ) -> Result<Envelope<T>, ApiFailure> {
        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let text = response
            .text()
            .map_err(|err| ApiFailure::network(method, url.clone(), &err))?;

        let envelope: Envelope<T> = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(err) => {
                return Err(ApiFailure {
                    method,
                    url,
                    status: Some(status.as_u16()),
                    code: None,
                    message: format!("unparseable response: {err}"),
                    kind: classify(Some(status.as_u16()), None),
                    retry_after,
                });
            }
        };

        if !status.is_success() || envelope.code != 0 {
            let kind = classify(Some(status.as_u16()), Some(envelope.code));
            log::error!("{method} {url} failed with code {}: {}", envelope.code, envelope.msg);
            return Err(ApiFailure {
                method,
                url,
                status: Some(status.as_u16()),
                code: Some(envelope.code),
                message: envelope.msg,
                kind,
                retry_after,
            });
        }
        Ok(envelope)
    }

    fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &'static str,
        url: String,
        body: Option<Value>,
        auth: bool,
    ) -> Result<T, ApiFailure> {
        let response = self.send(method, &url, body, auth)?;
        let envelope = Self::decode::<T>(method, url.clone(), response)?;
        envelope.data.ok_or_else(|| ApiFailure {
            method,
            url,
            status: None,
            code: None,
            message: "response missing data".to_string(),
            kind: ApiErrorKind::Other,
            retry_after: None,
        })
    }

    fn call_unit(
        &self,
        method: &'static str,
        url: String,
        body: Option<Value>,
    ) -> Result<(), ApiFailure> {
        let response = self.send(method, &url, body, true)?;
        Self::decode::<Value>(method, url, response).map(|_| ())
    }
}

impl DocumentApi for DocsClient {
    fn create_document(
        &self,
        title: Option<&str>,
        folder: Option<&str>,
    ) -> Result<DocumentInfo, ApiFailure> {
        let url = self.endpoint("documents/v1/documents");
        let mut body = serde_json::Map::new();
        if let Some(title) = title {
            body.insert("title".to_string(), Value::String(title.to_string()));
        }
        if let Some(folder) = folder {
            body.insert("folder_token".to_string(), Value::String(folder.to_string()));
        }
        let data: CreateDocumentData = self.call("POST", url, Some(Value::Object(body)), true)?;
        Ok(data.document)
    }

    fn create_blocks(
        &self,
        document_id: &str,
        anchor_id: &str,
        children_ids: &[String],
        descendants: &[BlockPayload],
    ) -> Result<CreateBlocksData, ApiFailure> {
        let url = self.endpoint(&format!(
            "documents/v1/documents/{document_id}/blocks/{anchor_id}/descendant"
        ));
        let body = json!({
            "children_id": children_ids,
            "descendants": descendants,
        });
        self.call("POST", url, Some(body), true)
    }

    fn upload_media(
        &self,
        owner_block_id: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ApiFailure> {
        let url = self.endpoint("medias/v1/medias/upload_all");
        let token = self.access_token()?;
        let size = bytes.len();
        let part = reqwest::blocking::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::blocking::multipart::Form::new()
            .text("parent_node", owner_block_id.to_string())
            .text("size", size.to_string())
            .part("file", part);
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .map_err(|err| ApiFailure::network("POST", url.clone(), &err))?;
        let envelope = Self::decode::<UploadMediaData>("POST", url.clone(), response)?;
        envelope
            .data
            .map(|data| data.file_token)
            .ok_or_else(|| ApiFailure {
                method: "POST",
                url,
                status: None,
                code: None,
                message: "response missing data".to_string(),
                kind: ApiErrorKind::Other,
                retry_after: None,
            })
    }

    fn batch_update(
        &self,
        document_id: &str,
        requests: &[UpdateBlockRequest],
    ) -> Result<(), ApiFailure> {
        let url = self.endpoint(&format!(
            "documents/v1/documents/{document_id}/blocks/batch_update"
        ));
        let body = json!({ "requests": requests });
        self.call_unit("PATCH", url, Some(body))
    }

    fn delete_block(&self, document_id: &str, block_id: &str) -> Result<(), ApiFailure> {
        let url = self.endpoint(&format!(
            "documents/v1/documents/{document_id}/blocks/{block_id}"
        ));
        self.call_unit("DELETE", url, None)
    }

    fn list_children(
        &self,
        document_id: &str,
        block_id: &str,
        page_token: Option<&str>,
    ) -> Result<ListChildrenData, ApiFailure> {
        let mut url = self.endpoint(&format!(
            "documents/v1/documents/{document_id}/blocks/{block_id}/children"
        ));
        if let Some(token) = page_token {
            url.push_str("?page_token=");
            url.push_str(token);
        }
        self.call("GET", url, None, true)
    }

    fn transfer_ownership(&self, document_id: &str, target_user: &str) -> Result<(), ApiFailure> {
        let url = self.endpoint(&format!(
            "documents/v1/documents/{document_id}/transfer_owner"
        ));
        let body = json!({ "target_user": target_user });
        self.call_unit("POST", url, Some(body))
    }

    fn document_url(&self, document_id: &str) -> String {
        format!("{}/docs/{document_id}", self.web_base_url)
    }
}

fn lock_token(token: &Mutex<Option<CachedToken>>) -> std::sync::MutexGuard<'_, Option<CachedToken>> {
    match token.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
