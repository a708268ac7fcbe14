//! Archive backend JSON API.
//!
//! `GET /api/{archive}/random` and `GET /api/{archive}/search?q=..&limit=..`.
//! [`ArchiveApi`] is async and runs on both native and wasm32 (reqwest maps
//! to `fetch` in the browser).

use serde::Deserialize;
use url::Url;

use crate::config::SearchLimit;
use crate::error::ApiError;

/// Response of the random-entry endpoint. An empty `path` means "nothing".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RandomEntry {
    pub title: String,
    pub path: String,
}

/// One search hit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchHit {
    pub title: String,
    pub path: String,
}

impl SearchHit {
    pub fn new(title: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            path: path.into(),
        }
    }
}

/// Response of the search endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
    pub count: usize,
}

impl SearchResponse {
    pub fn new(query: &str, results: Vec<SearchHit>) -> Self {
        Self {
            query: query.to_string(),
            count: results.len(),
            results,
        }
    }
}

pub fn random_endpoint(base: &Url, archive: &str) -> Result<Url, ApiError> {
    Ok(base.join(&format!("/api/{}/random", urlencoding::encode(archive)))?)
}

pub fn search_endpoint(
    base: &Url,
    archive: &str,
    query: &str,
    limit: SearchLimit,
) -> Result<Url, ApiError> {
    let mut url = base.join(&format!("/api/{}/search", urlencoding::encode(archive)))?;
    url.query_pairs_mut()
        .append_pair("q", query)
        .append_pair("limit", &limit.as_param().to_string());
    Ok(url)
}

pub fn parse_random(body: &str) -> Result<RandomEntry, ApiError> {
    Ok(serde_json::from_str(body)?)
}

pub fn parse_search(body: &str) -> Result<SearchResponse, ApiError> {
    Ok(serde_json::from_str(body)?)
}

/// Async client bound to one archive.
#[derive(Debug, Clone)]
pub struct ArchiveApi {
    base: Url,
    archive: String,
    client: reqwest::Client,
}

impl ArchiveApi {
    /// `base` is the server origin the API routes hang off.
    pub fn new(base: Url, archive: &str) -> Self {
        Self {
            base,
            archive: archive.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub async fn random(&self) -> Result<RandomEntry, ApiError> {
        let url = random_endpoint(&self.base, &self.archive)?;
        let body = self.get_text(url).await?;
        parse_random(&body)
    }

    pub async fn search(&self, query: &str, limit: SearchLimit) -> Result<SearchResponse, ApiError> {
        let url = search_endpoint(&self.base, &self.archive, query, limit)?;
        let body = self.get_text(url).await?;
        parse_search(&body)
    }

    async fn get_text(&self, url: Url) -> Result<String, ApiError> {
        log::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }
}
