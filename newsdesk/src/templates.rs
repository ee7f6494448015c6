// HTML rendering for stored articles and the index page.
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

use crate::storage::{ArticleSummary, RewrittenArticle};

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

const STYLE: &str = "body{font-family:Georgia,serif;max-width:46rem;margin:2rem auto;padding:0 1rem;line-height:1.6;color:#222}\
a{color:#1a4d8f}.meta{color:#666;font-size:.9rem}img{max-width:100%;height:auto}\
ul.articles{list-style:none;padding:0}ul.articles li{margin:.6rem 0}.category{text-transform:uppercase;font-size:.75rem;color:#888;margin-right:.5rem}";

/// Renders one rewritten article as a self-contained document.
/// The first `h1` carries the title and `meta[name=category]` the category.
pub fn render_article(article: &RewrittenArticle) -> String {
    let mut html = String::with_capacity(article.body.len() + 1024);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{}</title>\n", text(&article.title)));
    html.push_str(&format!(
        "<meta name=\"category\" content=\"{}\">\n",
        attr(article.category.as_str())
    ));
    html.push_str(&format!(
        "<meta name=\"published\" content=\"{}\">\n",
        attr(&article.published_at.to_rfc3339())
    ));
    html.push_str(&format!("<meta name=\"source\" content=\"{}\">\n", attr(&article.source)));
    html.push_str(&format!("<style>{}</style>\n</head>\n<body>\n<article>\n", STYLE));
    html.push_str(&format!("<h1>{}</h1>\n", text(&article.title)));
    html.push_str(&format!(
        "<p class=\"meta\"><span class=\"category\">{}</span>{} &middot; Source: {}</p>\n",
        text(article.category.as_str()),
        text(&article.published_at.format(DATE_FORMAT).to_string()),
        text(&article.source)
    ));
    if let Some(image) = &article.image_url {
        html.push_str(&format!(
            "<img src=\"{}\" alt=\"{}\">\n",
            attr(image),
            attr(&article.title)
        ));
    }
    for paragraph in paragraphs(&article.body) {
        html.push_str(&format!("<p>{}</p>\n", text(&paragraph)));
    }
    html.push_str("</article>\n<p><a href=\"/\">&larr; All articles</a></p>\n</body>\n</html>\n");
    html
}

/// Renders the listing page. An empty slice yields an empty list.
pub fn render_index(articles: &[ArticleSummary]) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Newsdesk</title>\n");
    html.push_str(&format!("<style>{}</style>\n</head>\n<body>\n<h1>Latest articles</h1>\n", STYLE));
    if articles.is_empty() {
        html.push_str("<p class=\"meta\">No articles yet.</p>\n");
    }
    html.push_str("<ul class=\"articles\">\n");
    for a in articles {
        html.push_str(&format!(
            "<li><span class=\"category\">{}</span><a href=\"/article/{}\">{}</a>",
            text(a.category.as_str()),
            attr(a.id.as_str()),
            text(&a.title)
        ));
        if let Some(published) = a.published_at {
            html.push_str(&format!(
                " <span class=\"meta\">{}</span>",
                text(&published.format(DATE_FORMAT).to_string())
            ));
        }
        html.push_str("</li>\n");
    }
    html.push_str("</ul>\n</body>\n</html>\n");
    html
}

/// Splits model output on blank lines; single newlines inside a paragraph are folded.
fn paragraphs(body: &str) -> Vec<String> {
    body.replace("\r\n", "\n")
        .split("\n\n")
        .map(|p| p.lines().map(str::trim).filter(|l| !l.is_empty()).collect::<Vec<_>>().join(" "))
        .filter(|p| !p.is_empty())
        .collect()
}
