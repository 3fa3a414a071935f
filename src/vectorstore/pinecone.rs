use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::{DocumentMetadata, ScoredDocument, VectorRecord, VectorStore};
use crate::config::VectorStoreConfig;
use crate::error::{BotError, Result};

const SERVICE: &str = "pinecone";
const READY_POLL_ATTEMPTS: u32 = 30;
const READY_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexDescription>,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    name: String,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    status: Option<IndexStatus>,
}

#[derive(Debug, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<DocumentMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
}

/// Pinecone serverless index accessed over its REST API.
pub struct PineconeStore {
    client: Client,
    api_key: String,
    controller_url: String,
    index_name: String,
    cloud: String,
    region: String,
    api_version: String,
    batch_size: usize,
    host: OnceCell<String>,
}

impl PineconeStore {
    pub fn new(config: &VectorStoreConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let host = OnceCell::new();
        if let Some(configured) = &config.index_host {
            // Cannot fail on a fresh cell
            let _ = host.set(normalize_host(configured));
        }

        Ok(Self {
            client,
            api_key: api_key.into(),
            controller_url: config.controller_url.trim_end_matches('/').to_string(),
            index_name: config.index_name.clone(),
            cloud: config.cloud.clone(),
            region: config.region.clone(),
            api_version: config.api_version.clone(),
            batch_size: config.upsert_batch_size.max(1),
            host,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", &self.api_version)
    }

    async fn list_indexes(&self) -> Result<Vec<IndexDescription>> {
        let response = self
            .authorized(self.client.get(format!("{}/indexes", self.controller_url)))
            .send()
            .await?;
        let list: IndexList = parse(check(response).await?).await?;
        Ok(list.indexes)
    }

    async fn describe_index(&self) -> Result<IndexDescription> {
        let response = self
            .authorized(
                self.client
                    .get(format!("{}/indexes/{}", self.controller_url, self.index_name)),
            )
            .send()
            .await?;
        parse(check(response).await?).await
    }

    async fn create_index(&self, dimension: usize, metric: &str) -> Result<()> {
        let body = json!({
            "name": self.index_name,
            "dimension": dimension,
            "metric": metric,
            "spec": {
                "serverless": {
                    "cloud": self.cloud,
                    "region": self.region,
                }
            }
        });
        let response = self
            .authorized(self.client.post(format!("{}/indexes", self.controller_url)))
            .json(&body)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn wait_until_ready(&self) -> Result<()> {
        for attempt in 1..=READY_POLL_ATTEMPTS {
            let description = self.describe_index().await?;
            if description.status.as_ref().is_some_and(|s| s.ready) {
                return Ok(());
            }
            debug!("Index {} not ready yet (attempt {})", self.index_name, attempt);
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
        Err(BotError::VectorStore(format!(
            "index {} did not become ready",
            self.index_name
        )))
    }

    /// Data plane base URL, resolved once from the control plane.
    async fn host(&self) -> Result<&str> {
        let host = self
            .host
            .get_or_try_init(|| async {
                let description = self.describe_index().await?;
                description
                    .host
                    .map(|h| normalize_host(&h))
                    .ok_or_else(|| BotError::InvalidResponse {
                        service: SERVICE,
                        message: format!("index {} has no host", description.name),
                    })
            })
            .await?;
        Ok(host.as_str())
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(BotError::Upstream {
            service: SERVICE,
            status: status.as_u16(),
            body,
        })
    }
}

async fn parse<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    response.json::<T>().await.map_err(|e| BotError::InvalidResponse {
        service: SERVICE,
        message: e.to_string(),
    })
}

#[async_trait]
impl VectorStore for PineconeStore {
    async fn ensure_index(&self, dimension: usize, metric: &str) -> Result<()> {
        let existing = self.list_indexes().await?;
        if existing.iter().any(|index| index.name == self.index_name) {
            info!("Index already exists: {}", self.index_name);
            return Ok(());
        }

        self.create_index(dimension, metric).await?;
        info!("Created index: {} (dimension {}, {})", self.index_name, dimension, metric);
        self.wait_until_ready().await
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let host = self.host().await?;
        let mut total = 0;

        for batch in records.chunks(self.batch_size) {
            let response = self
                .authorized(self.client.post(format!("{}/vectors/upsert", host)))
                .json(&json!({ "vectors": batch }))
                .send()
                .await?;
            let upserted: UpsertResponse = parse(check(response).await?).await?;
            if upserted.upserted_count != batch.len() {
                warn!(
                    "Pinecone acknowledged {} of {} vectors",
                    upserted.upserted_count,
                    batch.len()
                );
            }
            total += upserted.upserted_count;
        }

        Ok(total)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredDocument>> {
        let host = self.host().await?;
        let response = self
            .authorized(self.client.post(format!("{}/query", host)))
            .json(&QueryRequest {
                vector,
                top_k,
                include_metadata: true,
            })
            .send()
            .await?;
        let result: QueryResponse = parse(check(response).await?).await?;

        Ok(result
            .matches
            .into_iter()
            .map(|m| {
                let metadata = m.metadata.unwrap_or_default();
                ScoredDocument {
                    id: m.id,
                    title: metadata.title,
                    content: metadata.content,
                    score: m.score,
                }
            })
            .collect())
    }
}
