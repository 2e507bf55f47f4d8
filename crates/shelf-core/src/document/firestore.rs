//! Remote product collection over the Firestore REST API.

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::codec::{self, Document};
use super::REMOTE_STORE;
use crate::config::RemoteConfig;
use crate::error::{Result, StoreError, StoreResult};
use crate::models::{Product, ProductKey};
use crate::store::ProductStore;
use crate::util::compact_text;

/// Document store client for one collection
#[derive(Clone)]
pub struct FirestoreStore {
    collection_url: String,
    auth_token: Option<String>,
    page_size: u32,
    client: reqwest::Client,
}

impl std::fmt::Debug for FirestoreStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("FirestoreStore")
            .field("collection_url", &self.collection_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<Document>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
    status: Option<String>,
}

impl FirestoreStore {
    /// Build a client for the configured collection
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let collection_url = config.collection_url()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|error| StoreError::unavailable(REMOTE_STORE, error))?;

        Ok(Self {
            collection_url,
            auth_token: config.auth_token.clone(),
            page_size: config.page_size,
            client,
        })
    }

    /// URL of the collection this store reads and writes
    pub fn collection_url(&self) -> &str {
        &self.collection_url
    }

    fn document_url(&self, key: &ProductKey) -> String {
        format!(
            "{}/{}",
            self.collection_url,
            urlencoding::encode(key.as_str())
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("Accept", "application/json");
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> StoreResult<Response> {
        self.authorize(request).send().await.map_err(transport_error)
    }

    async fn list_page(&self, page_token: Option<&str>) -> StoreResult<ListDocumentsResponse> {
        let mut request = self
            .client
            .get(&self.collection_url)
            .query(&[("pageSize", self.page_size.to_string())]);
        if let Some(page_token) = page_token {
            request = request.query(&[("pageToken", page_token)]);
        }

        let response = self.send(request).await?;
        let response = check_status(response).await?;
        response.json().await.map_err(transport_error)
    }
}

impl ProductStore for FirestoreStore {
    fn name(&self) -> &str {
        REMOTE_STORE
    }

    async fn enumerate(&self) -> StoreResult<Vec<Product>> {
        let mut products = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.list_page(page_token.as_deref()).await?;
            for document in &page.documents {
                let id = document.id().ok_or_else(|| {
                    StoreError::malformed("listed document has no resource name")
                })?;
                products.push(codec::decode(&id, &document.fields)?);
            }

            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        tracing::debug!(
            "Listed {} documents from {}",
            products.len(),
            self.collection_url
        );
        Ok(products)
    }

    async fn get(&self, key: &ProductKey) -> StoreResult<Option<Product>> {
        let response = self
            .send(self.client.get(self.document_url(key)))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = check_status(response).await?;
        let document: Document = response.json().await.map_err(transport_error)?;
        codec::decode(key.as_str(), &document.fields).map(Some)
    }

    async fn upsert(&self, product: &Product) -> StoreResult<()> {
        product.validate()?;

        // PATCH without an update mask replaces the whole document, creating it if absent
        let body = json!({ "fields": codec::encode(product) });
        let response = self
            .send(self.client.patch(self.document_url(&product.key)).json(&body))
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: Response) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

fn status_error(status: StatusCode, body: &str) -> StoreError {
    let message = parse_api_error(status, body);
    match status {
        StatusCode::BAD_REQUEST
        | StatusCode::FORBIDDEN
        | StatusCode::CONFLICT
        | StatusCode::PRECONDITION_FAILED
        | StatusCode::PAYLOAD_TOO_LARGE
        | StatusCode::UNPROCESSABLE_ENTITY => StoreError::validation(message),
        _ => StoreError::unavailable(REMOTE_STORE, message),
    }
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(detail) = payload.error {
            if let Some(message) = detail.message.or(detail.status) {
                return format!("{} ({})", compact_text(&message), status.as_u16());
            }
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn transport_error(error: reqwest::Error) -> StoreError {
    if error.is_decode() {
        StoreError::malformed(format!("undecodable response: {error}"))
    } else {
        StoreError::unavailable(REMOTE_STORE, error)
    }
}
