use std::sync::Arc;

use chrono::Utc;
use common::{Category, Config};
use newsdesk::server::{build_rocket, AppState};
use newsdesk::storage::{ArticleId, ArticleStore, RewrittenArticle};
use newsdesk::worker::WorkerControl;
use rocket::http::{ContentType, Status};
use rocket::local::asynchronous::Client;
use tempfile::TempDir;

async fn client_for(dir: &TempDir) -> (Client, WorkerControl) {
    let mut config = Config::default();
    config.storage.articles_dir = dir.path().to_string_lossy().to_string();
    let control = WorkerControl::default();
    let state = AppState::new(Arc::new(config), control.clone());
    let client = Client::tracked(build_rocket(state, rocket::Config::figment()))
        .await
        .expect("valid rocket instance");
    (client, control)
}

async fn store_article(dir: &TempDir, title: &str, category: Category) -> ArticleId {
    let article = RewrittenArticle {
        id: ArticleId::from_title(title),
        title: title.to_string(),
        category,
        body: format!("Rewritten story about {}.", title),
        published_at: Utc::now(),
        image_url: None,
        source: "Unknown".into(),
    };
    ArticleStore::new(dir.path()).write(&article).await.unwrap();
    article.id
}

#[tokio::test]
async fn index_is_empty_without_articles() {
    let dir = tempfile::tempdir().unwrap();
    let (client, _) = client_for(&dir).await;

    let response = client.get("/").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.content_type(), Some(ContentType::HTML));
    let body = response.into_string().await.unwrap();
    assert!(body.contains("No articles yet."));
    assert!(!body.contains("<li>"));
}

#[tokio::test]
async fn index_lists_stored_articles() {
    let dir = tempfile::tempdir().unwrap();
    let id = store_article(&dir, "AI Breakthrough", Category::Technology).await;
    store_article(&dir, "Markets Rally", Category::Economics).await;
    let (client, _) = client_for(&dir).await;

    let body = client.get("/").dispatch().await.into_string().await.unwrap();
    assert!(body.contains(&format!("href=\"/article/{}\"", id)));
    assert!(body.contains(">AI Breakthrough</a>"));
    assert!(body.contains(">Markets Rally</a>"));
    assert!(body.contains("technology"));
    assert!(body.contains("economics"));
}

#[tokio::test]
async fn article_is_served_verbatim_and_repeatably() {
    let dir = tempfile::tempdir().unwrap();
    let id = store_article(&dir, "AI Breakthrough", Category::Technology).await;
    let (client, _) = client_for(&dir).await;
    let on_disk = std::fs::read_to_string(dir.path().join(format!("{}.html", id))).unwrap();

    let uri = format!("/article/{}", id);
    let first = client.get(uri.clone()).dispatch().await;
    assert_eq!(first.status(), Status::Ok);
    let first = first.into_string().await.unwrap();
    let second = client.get(uri).dispatch().await.into_string().await.unwrap();

    assert_eq!(first, on_disk);
    assert_eq!(first, second);

    let with_ext = client.get(format!("/article/{}.html", id)).dispatch().await;
    assert_eq!(with_ext.status(), Status::Ok);
}

#[tokio::test]
async fn unknown_article_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let (client, _) = client_for(&dir).await;

    let response = client.get("/article/doesnotexist").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);

    let missing = ArticleId::from_title("never stored");
    let response = client.get(format!("/article/{}", missing)).dispatch().await;
    assert_eq!(response.status(), Status::NotFound);
}

#[tokio::test]
async fn traversal_attempts_are_not_found() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("secret.html"), "<h1>secret</h1>").unwrap();
    let (client, _) = client_for(&dir).await;

    for uri in ["/article/..%2Fsecret", "/article/secret", "/article/%2Fetc%2Fpasswd"] {
        let response = client.get(uri).dispatch().await;
        assert_eq!(response.status(), Status::NotFound, "{}", uri);
    }
}

#[tokio::test]
async fn malformed_stored_file_breaks_only_the_index() {
    let dir = tempfile::tempdir().unwrap();
    let good = store_article(&dir, "Fine", Category::World).await;
    let broken = ArticleId::from_title("Broken");
    std::fs::write(dir.path().join(format!("{}.html", broken)), "<p>no heading</p>").unwrap();
    let (client, _) = client_for(&dir).await;

    let response = client.get("/").dispatch().await;
    assert_eq!(response.status(), Status::InternalServerError);

    let response = client.get(format!("/article/{}", good)).dispatch().await;
    assert_eq!(response.status(), Status::Ok);
}

#[tokio::test]
async fn health_and_status() {
    let dir = tempfile::tempdir().unwrap();
    store_article(&dir, "One", Category::World).await;
    let (client, _) = client_for(&dir).await;

    let health = client.get("/health").dispatch().await;
    assert_eq!(health.status(), Status::Ok);
    assert_eq!(health.into_string().await.unwrap(), "OK");

    let status = client.get("/api/v1/status").dispatch().await;
    assert_eq!(status.status(), Status::Ok);
    let json: serde_json::Value = status.into_json().await.unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["article_count"], 1);
    assert_eq!(json["interval_minutes"], 60);
    assert_eq!(json["categories"], serde_json::json!(["world", "technology", "economics"]));
    assert!(json["last_run"].is_null());
}

#[tokio::test]
async fn refresh_signals_the_worker() {
    let dir = tempfile::tempdir().unwrap();
    let (client, control) = client_for(&dir).await;

    let response = client.post("/api/v1/refresh").dispatch().await;
    assert_eq!(response.status(), Status::Accepted);

    // The permit is stored until the worker waits for it.
    tokio::time::timeout(std::time::Duration::from_secs(1), control.refresh.notified())
        .await
        .expect("refresh was requested");
}
