//! Pinecone vector index client (REST data plane).

use super::{validate_top_k, IndexedVector, Metadata, SearchMatch, VectorIndex};
use crate::error::{Result, WayfindError};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

/// Maximum vectors per upsert request.
const UPSERT_BATCH_SIZE: usize = 100;

/// Maximum ids per delete request.
const DELETE_BATCH_SIZE: usize = 1000;

const API_KEY_HEADER: &str = "Api-Key";

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [IndexedVector],
    namespace: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    namespace: &'a str,
    vector: &'a [f32],
    top_k: usize,
    include_values: bool,
    include_metadata: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Metadata>,
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    ids: &'a [String],
    namespace: &'a str,
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    vectors: Vec<ListedVector>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Deserialize)]
struct ListedVector {
    id: String,
}

#[derive(Deserialize)]
struct Pagination {
    next: Option<String>,
}

#[derive(Deserialize)]
struct IndexStats {
    #[serde(default)]
    namespaces: HashMap<String, NamespaceStats>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceStats {
    #[serde(default)]
    vector_count: usize,
}

/// A Pinecone index addressed by its data-plane host.
pub struct PineconeIndex {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl PineconeIndex {
    /// Create a client for the index served at `host`.
    ///
    /// `host` may omit the scheme, in which case HTTPS is assumed.
    pub fn new(host: &str, api_key: impl Into<String>) -> Result<Self> {
        Self::with_timeout(host, api_key, Duration::from_secs(30))
    }

    pub fn with_timeout(host: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: Self::normalize_host(host)?,
            api_key: api_key.into(),
        })
    }

    fn normalize_host(host: &str) -> Result<Url> {
        let host = host.trim();
        if host.is_empty() {
            return Err(WayfindError::Config("Pinecone host is empty".to_string()));
        }

        let with_scheme = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };

        // Trailing slash so that `join` appends instead of replacing the last segment
        let normalized = format!("{}/", with_scheme.trim_end_matches('/'));
        Ok(Url::parse(&normalized)?)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Response> {
        let response = self
            .client
            .post(self.endpoint(path)?)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await?;
        Self::check(path, response).await
    }

    async fn check(path: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(WayfindError::Index(format!(
            "Pinecone {} failed with {}: {}",
            path, status, body
        )))
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    #[instrument(skip(self, vectors), fields(count = vectors.len()))]
    async fn upsert(&self, namespace: &str, vectors: &[IndexedVector]) -> Result<usize> {
        let mut upserted = 0;

        for batch in vectors.chunks(UPSERT_BATCH_SIZE) {
            let response: UpsertResponse = self
                .post(
                    "vectors/upsert",
                    &UpsertRequest {
                        vectors: batch,
                        namespace,
                    },
                )
                .await?
                .json()
                .await?;
            upserted += response.upserted_count;
        }

        info!("Upserted {} vectors into {}", upserted, namespace);
        Ok(upserted)
    }

    #[instrument(skip(self, vector))]
    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<SearchMatch>> {
        validate_top_k(top_k)?;

        let response: QueryResponse = self
            .post(
                "query",
                &QueryRequest {
                    namespace,
                    vector,
                    top_k,
                    include_values: false,
                    include_metadata,
                },
            )
            .await?
            .json()
            .await?;

        debug!("Pinecone returned {} matches", response.matches.len());
        Ok(response
            .matches
            .into_iter()
            .map(|m| SearchMatch {
                id: m.id,
                score: m.score,
                metadata: m.metadata.unwrap_or_default(),
            })
            .collect())
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn delete(&self, namespace: &str, ids: &[String]) -> Result<usize> {
        for batch in ids.chunks(DELETE_BATCH_SIZE) {
            self.post("vectors/delete", &DeleteRequest { ids: batch, namespace })
                .await?;
        }
        Ok(ids.len())
    }

    async fn list_ids(&self, namespace: &str, prefix: &str) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let mut url = self.endpoint("vectors/list")?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("namespace", namespace);
                if !prefix.is_empty() {
                    query.append_pair("prefix", prefix);
                }
                if let Some(token) = &token {
                    query.append_pair("paginationToken", token);
                }
            }

            let response = self
                .client
                .get(url)
                .header(API_KEY_HEADER, &self.api_key)
                .send()
                .await?;
            let page: ListResponse = Self::check("vectors/list", response).await?.json().await?;

            ids.extend(page.vectors.into_iter().map(|v| v.id));
            token = page.pagination.and_then(|p| p.next);
            if token.is_none() {
                break;
            }
        }

        Ok(ids)
    }

    async fn count(&self, namespace: &str) -> Result<usize> {
        let stats: IndexStats = self
            .post("describe_index_stats", &serde_json::json!({}))
            .await?
            .json()
            .await?;

        Ok(stats
            .namespaces
            .get(namespace)
            .map_or(0, |ns| ns.vector_count))
    }
}
