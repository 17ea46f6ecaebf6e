use anyhow::Context;
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::GithubConfig;

const USER_AGENT: &str = concat!("devconnector/", env!("CARGO_PKG_VERSION"));

/// Best-effort repository listing; `None` means "no GitHub profile found".
#[async_trait]
pub trait RepoLister: Send + Sync {
    async fn list_repos(&self, username: &str) -> Option<Vec<Value>>;
}

pub struct GithubClient {
    client: Client,
    api_base: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(cfg: &GithubConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(cfg.timeout())
            .user_agent(USER_AGENT)
            .build()
            .context("build github http client")?;

        Ok(Self {
            client,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            token: cfg.token.clone(),
        })
    }

    async fn fetch(&self, username: &str) -> anyhow::Result<Option<Vec<Value>>> {
        let url = format!("{}/users/{}/repos", self.api_base, username);
        let mut req = self
            .client
            .get(&url)
            .query(&[("per_page", "5"), ("sort", "created"), ("direction", "asc")])
            .header(header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let response = req.send().await.context("github request")?;
        if response.status() != StatusCode::OK {
            debug!(status = %response.status(), username, "github returned non-200");
            return Ok(None);
        }

        let repos = response
            .json::<Vec<Value>>()
            .await
            .context("decode github response")?;
        Ok(Some(repos))
    }
}

#[async_trait]
impl RepoLister for GithubClient {
    async fn list_repos(&self, username: &str) -> Option<Vec<Value>> {
        match self.fetch(username).await {
            Ok(repos) => repos,
            Err(e) => {
                warn!(error = %e, username, "github lookup failed");
                None
            }
        }
    }
}
