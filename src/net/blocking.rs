use url::Url;

use super::api::{
    parse_random, parse_search, random_endpoint, search_endpoint, RandomEntry, SearchResponse,
};
use crate::config::SearchLimit;
use crate::error::ApiError;

/// Blocking client for the archive API (native only; used by the CLI).
pub struct BlockingArchiveApi {
    base: Url,
    archive: String,
    client: reqwest::blocking::Client,
}

impl BlockingArchiveApi {
    pub fn new(server: &str, archive: &str) -> Result<Self, ApiError> {
        // Accept bare host:port like the address bar does
        let server = if !server.starts_with("http://") && !server.starts_with("https://") {
            format!("http://{}", server)
        } else {
            server.to_string()
        };
        let base = Url::parse(&server)?;

        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("archive-viewer/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            base,
            archive: archive.to_string(),
            client,
        })
    }

    /// Fetch a random entry of the archive.
    pub fn random(&self) -> Result<RandomEntry, ApiError> {
        let url = random_endpoint(&self.base, &self.archive)?;
        parse_random(&self.get_text(url)?)
    }

    /// Run a title search.
    pub fn search(&self, query: &str, limit: SearchLimit) -> Result<SearchResponse, ApiError> {
        let url = search_endpoint(&self.base, &self.archive, query, limit)?;
        parse_search(&self.get_text(url)?)
    }

    fn get_text(&self, url: Url) -> Result<String, ApiError> {
        log::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()?
            .error_for_status()?;
        Ok(response.text()?)
    }
}
