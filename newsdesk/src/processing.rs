use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use common::{Category, Config};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::ingestion::{NewsArticle, NewsClient};
use crate::llm::LlmProvider;
use crate::policy::ContentPolicy;
use crate::storage::{ArticleId, ArticleStore, RewrittenArticle};

/// Outcome of one pass over every configured category.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub categories: usize,
    pub fetched: usize,
    pub written: usize,
    pub failed: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Fetch → rewrite → content policy → store, one category after another.
pub struct Pipeline {
    categories: Vec<Category>,
    news: NewsClient,
    llm: Arc<dyn LlmProvider>,
    policy: ContentPolicy,
    store: ArticleStore,
}

impl Pipeline {
    pub fn new(
        categories: Vec<Category>,
        news: NewsClient,
        llm: Arc<dyn LlmProvider>,
        policy: ContentPolicy,
        store: ArticleStore,
    ) -> Self {
        Self {
            categories,
            news,
            llm,
            policy,
            store,
        }
    }

    /// Wire a pipeline from configuration with already resolved collaborators.
    pub fn from_config(config: &Config, news: NewsClient, llm: Arc<dyn LlmProvider>) -> Self {
        Self::new(
            config.news.categories.clone(),
            news,
            llm,
            ContentPolicy::from_config(&config.content_policy),
            ArticleStore::new(&config.storage.articles_dir),
        )
    }

    pub fn store(&self) -> &ArticleStore {
        &self.store
    }

    /// Runs every category once. Individual failures are logged and counted, never propagated.
    pub async fn run_once(&self) -> RunReport {
        let mut report = RunReport {
            started_at: Some(Utc::now()),
            ..RunReport::default()
        };

        if let Err(e) = self.store.ensure_dir().await {
            error!("{:#}", e);
        }

        for &category in &self.categories {
            info!(%category, "Fetching category");
            report.categories += 1;

            let articles = self.news.fetch_category(category).await;
            report.fetched += articles.len();

            for article in &articles {
                match self.process_article(category, article).await {
                    Ok(Some(_)) => report.written += 1,
                    Ok(None) => {}
                    Err(e) => {
                        report.failed += 1;
                        error!(%category, "Failed to process article: {:#}", e);
                    }
                }
            }
        }

        report.finished_at = Some(Utc::now());
        info!(
            categories = report.categories,
            fetched = report.fetched,
            written = report.written,
            failed = report.failed,
            "pipeline run complete"
        );
        report
    }

    /// Rewrites and stores a single headline. `Ok(None)` means the record was skipped.
    pub async fn process_article(
        &self,
        category: Category,
        article: &NewsArticle,
    ) -> Result<Option<ArticleId>> {
        let Some(title) = article.title() else {
            warn!(%category, "record without title, skipping");
            return Ok(None);
        };

        let body = self
            .llm
            .rewrite(title, article.body_text())
            .await
            .with_context(|| format!("rewrite failed for '{}'", title))?;

        let rewritten = RewrittenArticle {
            id: ArticleId::from_title(title),
            title: title.to_string(),
            category,
            body,
            published_at: Utc::now(),
            image_url: self.policy.filter_image(article.image_url.as_deref()),
            source: article.source().to_string(),
        };

        self.store.write(&rewritten).await?;
        Ok(Some(rewritten.id))
    }
}
