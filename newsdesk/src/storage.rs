use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use common::Category;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::templates;

const HTML_EXT: &str = "html";
const META_EXT: &str = "json";
const MAX_ID_LEN: usize = 64;

/// Opaque article key: lowercase hex SHA-256 of the original headline.
/// Only hex digits ever reach a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArticleId(String);

impl ArticleId {
    pub fn from_title(title: &str) -> Self {
        let digest = Sha256::digest(title.as_bytes());
        ArticleId(format!("{:x}", digest))
    }

    /// Validates an identifier coming from outside (URL path, file name).
    /// Only the lowercase form produced by `from_title` is accepted.
    pub fn parse(raw: &str) -> Option<Self> {
        let ok = !raw.is_empty()
            && raw.len() <= MAX_ID_LEN
            && raw.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        ok.then(|| ArticleId(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ArticleId {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        ArticleId::parse(&value).ok_or_else(|| format!("invalid article id: {}", value))
    }
}

impl From<ArticleId> for String {
    fn from(id: ArticleId) -> Self {
        id.0
    }
}

/// A headline after it went through the rewriter and the content policy.
#[derive(Debug, Clone)]
pub struct RewrittenArticle {
    pub id: ArticleId,
    pub title: String,
    pub category: Category,
    pub body: String,
    pub published_at: DateTime<Utc>,
    pub image_url: Option<String>,
    pub source: String,
}

/// Sidecar record written next to each rendered page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleMeta {
    pub id: ArticleId,
    pub title: String,
    pub category: Category,
    pub published_at: DateTime<Utc>,
    pub source: String,
    pub has_image: bool,
}

impl From<&RewrittenArticle> for ArticleMeta {
    fn from(a: &RewrittenArticle) -> Self {
        Self {
            id: a.id.clone(),
            title: a.title.clone(),
            category: a.category,
            published_at: a.published_at,
            source: a.source.clone(),
            has_image: a.image_url.is_some(),
        }
    }
}

/// One row of the index page.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleSummary {
    pub id: ArticleId,
    pub title: String,
    pub category: Category,
    pub published_at: Option<DateTime<Utc>>,
}

/// Directory of rendered articles. The directory listing is the index.
#[derive(Debug, Clone)]
pub struct ArticleStore {
    dir: PathBuf,
}

impl ArticleStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create articles directory: {}", self.dir.display()))
    }

    pub fn html_path(&self, id: &ArticleId) -> PathBuf {
        self.dir.join(format!("{}.{}", id, HTML_EXT))
    }

    fn meta_path(&self, id: &ArticleId) -> PathBuf {
        self.dir.join(format!("{}.{}", id, META_EXT))
    }

    /// Renders and stores an article, replacing any previous one with the same id.
    /// Returns the path of the HTML document.
    pub async fn write(&self, article: &RewrittenArticle) -> Result<PathBuf> {
        let meta = serde_json::to_vec_pretty(&ArticleMeta::from(article))
            .context("failed to serialize article metadata")?;
        let html = templates::render_article(article);

        // Sidecar first so a freshly visible page always has its metadata.
        self.write_atomic(&self.meta_path(&article.id), &meta).await?;
        let path = self.html_path(&article.id);
        self.write_atomic(&path, html.as_bytes()).await?;

        info!(id = %article.id, category = %article.category, path = %path.display(), "stored article");
        Ok(path)
    }

    async fn write_atomic(&self, target: &Path, bytes: &[u8]) -> Result<()> {
        let tmp = self.dir.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, bytes)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        if let Err(e) = tokio::fs::rename(&tmp, target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e).with_context(|| format!("failed to move article into {}", target.display()));
        }
        Ok(())
    }

    /// Raw stored document, or `None` when nothing is stored under `id`.
    pub async fn read(&self, id: &ArticleId) -> Result<Option<String>> {
        let path = self.html_path(id);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    /// Lists every stored article, newest first.
    /// Any unreadable or malformed entry fails the whole listing.
    pub async fn list(&self) -> Result<Vec<ArticleSummary>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to list {}", self.dir.display()))
            }
        };

        let mut articles = Vec::new();
        while let Some(entry) = entries.next_entry().await.context("failed to read directory entry")? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(HTML_EXT) {
                continue;
            }
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            if stem.starts_with('.') {
                continue;
            }
            let id = ArticleId::parse(stem)
                .with_context(|| format!("unexpected file in articles directory: {}", path.display()))?;
            articles.push(self.summarize(id, &path).await?);
        }

        articles.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        Ok(articles)
    }

    async fn summarize(&self, id: ArticleId, html_path: &Path) -> Result<ArticleSummary> {
        let meta_path = self.meta_path(&id);
        match tokio::fs::read(&meta_path).await {
            Ok(bytes) => {
                let meta: ArticleMeta = serde_json::from_slice(&bytes)
                    .with_context(|| format!("malformed article metadata: {}", meta_path.display()))?;
                Ok(ArticleSummary {
                    id,
                    title: meta.title,
                    category: meta.category,
                    published_at: Some(meta.published_at),
                })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %html_path.display(), "no sidecar, parsing document");
                let html = tokio::fs::read_to_string(html_path)
                    .await
                    .with_context(|| format!("failed to read {}", html_path.display()))?;
                summary_from_html(id, &html)
                    .with_context(|| format!("malformed article document: {}", html_path.display()))
            }
            Err(e) => Err(e).with_context(|| format!("failed to read {}", meta_path.display())),
        }
    }
}

/// Recovers index fields from a rendered document: first `h1` and `meta[name=category]`.
pub fn summary_from_html(id: ArticleId, html: &str) -> Result<ArticleSummary> {
    let document = Html::parse_document(html);
    let h1 = selector("h1")?;
    let category_meta = selector("meta[name=\"category\"]")?;
    let published_meta = selector("meta[name=\"published\"]")?;

    let title = document
        .select(&h1)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .context("document has no heading")?;
    let category = document
        .select(&category_meta)
        .next()
        .and_then(|el| el.value().attr("content"))
        .context("document has no category meta tag")?
        .parse::<Category>()?;
    let published_at = document
        .select(&published_meta)
        .next()
        .and_then(|el| el.value().attr("content"))
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc));

    Ok(ArticleSummary {
        id,
        title,
        category,
        published_at,
    })
}

fn selector(css: &'static str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow::anyhow!("invalid selector {}: {:?}", css, e))
}
