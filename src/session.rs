use std::path::Path;

use log::{debug, info};
use reqwest::{Client, StatusCode};

use crate::error::Result;

pub mod cache;

use cache::PageCache;

pub const CATE_HOST: &str = "https://cate.doc.ic.ac.uk/";

/// An authenticated CATe session. CATe uses plain HTTP Basic Auth, so
/// the session is nothing more than a reqwest client, the credentials
/// and an injected page cache.
pub struct CateSession {
    username: String,
    password: String,
    client: Client,
    cache: Box<dyn PageCache + Send + Sync>,
}

impl CateSession {
    pub fn new(
        username: String,
        password: String,
        cache: Box<dyn PageCache + Send + Sync>,
    ) -> Result<Self> {
        // Use custom User-Agent
        let user_agent = format!("catextor/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder().user_agent(user_agent).build()?;

        Ok(Self {
            username,
            password,
            client,
            cache,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn set_password(&mut self, password: String) {
        self.password = password;
    }

    /// Probe the portal with a HEAD request to check a password without
    /// fetching anything
    pub async fn password_correct(&self, password: &str) -> Result<bool> {
        let response = self
            .client
            .head(CATE_HOST)
            .basic_auth(&self.username, Some(password))
            .send()
            .await?;

        Ok(response.status() != StatusCode::UNAUTHORIZED)
    }

    /// Fetch a page, going through the cache first
    pub async fn fetch(&self, url: &str) -> Result<String> {
        if let Some(page) = self.cache.load(url) {
            debug!("cache hit for {url}");
            return Ok(page);
        }

        info!("GET {url}");
        let body = self
            .client
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        self.cache.store(url, &body);
        Ok(body)
    }

    /// Download a file to `dest`, bypassing the cache
    pub async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        info!("GET {url} -> {}", dest.display());
        let bytes = self
            .client
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        std::fs::write(dest, &bytes)?;
        Ok(())
    }
}
