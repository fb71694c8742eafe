use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response};
use shared::{
    domain::{Category, CategoryKey},
    error::{ApiError, ApiException},
    protocol::{CreateCategoryRequest, ServerEvent, UpdateCategoryRequest},
};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

const EVENT_BUFFER: usize = 64;

/// Remote category store the sortable list reads from and writes ordinals to.
///
/// Both calls are remote: latency is unspecified and each may fail on its own.
#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<Category>>;
    async fn update_category_sort_order(&self, key: &CategoryKey, sort_order: i64)
        -> Result<()>;
}

pub struct MissingCategoryStore;

#[async_trait]
impl CategoryStore for MissingCategoryStore {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        Err(anyhow!("category store is unavailable"))
    }

    async fn update_category_sort_order(
        &self,
        key: &CategoryKey,
        _sort_order: i64,
    ) -> Result<()> {
        Err(anyhow!("category store is unavailable; cannot update '{key}'"))
    }
}

pub struct HttpCategoryStore {
    http: Client,
    base_url: Url,
}

impl HttpCategoryStore {
    pub fn new(server_url: &str) -> Result<Self> {
        let base_url =
            Url::parse(server_url).with_context(|| format!("invalid server url: {server_url}"))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(anyhow!("server_url must start with http:// or https://"));
        }
        Ok(Self {
            http: Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("server url cannot carry a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn create_category(&self, request: &CreateCategoryRequest) -> Result<Category> {
        let response = self
            .http
            .post(self.endpoint(&["categories"])?)
            .json(request)
            .send()
            .await?;
        let category = check_status(response).await?.json().await?;
        Ok(category)
    }

    pub async fn delete_category(&self, key: &CategoryKey) -> Result<()> {
        let response = self
            .http
            .delete(self.endpoint(&["categories", key.as_str()])?)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    /// Streams server events over the `/ws` endpoint until the receiver is dropped
    /// or the connection closes.
    pub async fn subscribe_events(&self) -> Result<mpsc::Receiver<ServerEvent>> {
        let mut ws_url = self.endpoint(&["ws"])?;
        let scheme = if ws_url.scheme() == "https" { "wss" } else { "ws" };
        ws_url
            .set_scheme(scheme)
            .map_err(|_| anyhow!("cannot derive websocket url from {}", self.base_url))?;

        let (ws_stream, _) = connect_async(ws_url.as_str())
            .await
            .with_context(|| format!("failed to connect websocket: {ws_url}"))?;
        let (_, mut ws_reader) = ws_stream.split();
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);

        tokio::spawn(async move {
            while let Some(msg) = ws_reader.next().await {
                match msg {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ServerEvent>(&text) {
                        Ok(event) => {
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(error) => warn!(%error, "ignoring malformed server event"),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(error) => {
                        warn!(%error, "category event stream failed");
                        break;
                    }
                }
            }
            debug!("category event stream closed");
        });

        info!(url = %ws_url, "subscribed to category events");
        Ok(rx)
    }
}

#[async_trait]
impl CategoryStore for HttpCategoryStore {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        let response = self
            .http
            .get(self.endpoint(&["categories"])?)
            .send()
            .await
            .context("failed to reach category service")?;
        let categories = check_status(response).await?.json().await?;
        Ok(categories)
    }

    async fn update_category_sort_order(
        &self,
        key: &CategoryKey,
        sort_order: i64,
    ) -> Result<()> {
        let response = self
            .http
            .patch(self.endpoint(&["categories", key.as_str()])?)
            .json(&UpdateCategoryRequest::sort_order(sort_order))
            .send()
            .await
            .with_context(|| format!("failed to send sort order update for '{key}'"))?;
        check_status(response).await?;
        Ok(())
    }
}

/// Turns a non-success response into an error, preferring the server's `ApiError` body.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ApiError>(&body) {
        Ok(api_error) => Err(anyhow::Error::new(ApiException::from(api_error))
            .context(format!("category service returned {status}"))),
        Err(_) => Err(anyhow!("category service returned {status}: {body}")),
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
