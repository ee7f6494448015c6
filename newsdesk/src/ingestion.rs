use anyhow::{Context, Result};
use common::{Category, NewsConfig};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info};

/// A headline record as returned by the news API.
#[derive(Debug, Clone, Deserialize)]
pub struct NewsArticle {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl NewsArticle {
    /// Headline exactly as received, if it has any non-whitespace content.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Text handed to the rewriter: content, else description, else nothing.
    pub fn body_text(&self) -> &str {
        [&self.content, &self.description]
            .into_iter()
            .filter_map(|s| s.as_deref())
            .find(|s| !s.trim().is_empty())
            .unwrap_or("")
    }

    pub fn source(&self) -> &str {
        self.source_id
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("Unknown")
    }
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    results: Option<Vec<NewsArticle>>,
}

/// Client for the headline API. One GET per category, no retries.
pub struct NewsClient {
    client: Client,
    api_url: String,
    api_key: String,
    language: String,
    country: String,
    limit: usize,
}

impl NewsClient {
    pub fn new(config: &NewsConfig, api_key: impl Into<String>) -> Result<Self> {
        let mut builder = Client::builder().user_agent("Newsdesk/0.1.0");
        if let Some(secs) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("failed to build reqwest client")?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: api_key.into(),
            language: config.language.clone(),
            country: config.country.clone(),
            limit: config.max_articles_per_category,
        })
    }

    /// Fetches the latest headlines for `category`.
    /// Failures are logged and reported as an empty list so the run can move on.
    pub async fn fetch_category(&self, category: Category) -> Vec<NewsArticle> {
        match self.try_fetch(category).await {
            Ok(articles) => {
                info!(%category, count = articles.len(), "fetched headlines");
                articles
            }
            Err(e) => {
                error!(%category, "failed to fetch news: {:#}", e);
                Vec::new()
            }
        }
    }

    async fn try_fetch(&self, category: Category) -> Result<Vec<NewsArticle>> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("apikey", self.api_key.as_str()),
                ("category", category.as_str()),
                ("language", self.language.as_str()),
                ("country", self.country.as_str()),
            ])
            .send()
            .await
            .context("network error during fetch")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("news API returned {}: {}", status, body);
        }

        let parsed: NewsResponse = response
            .json()
            .await
            .context("failed to parse news API response")?;

        Ok(select_articles(parsed.results.unwrap_or_default(), self.limit))
    }
}

/// Keeps the first `limit` records that carry a non-empty title.
pub fn select_articles(results: Vec<NewsArticle>, limit: usize) -> Vec<NewsArticle> {
    results
        .into_iter()
        .filter(|a| {
            let keep = a.title().is_some();
            if !keep {
                debug!("Skipping record without title");
            }
            keep
        })
        .take(limit)
        .collect()
}
