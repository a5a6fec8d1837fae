//! Content extraction from learning-resource URLs.
//!
//! [`ContentExtractor`] is the boundary the ingestion pipeline consumes: give
//! it a URL, get back normalized [`ExtractedContent`] or a typed failure.
//! [`WebExtractor`] is the built-in implementation for web pages (tutorials,
//! articles, documentation). YouTube URLs are recognized but transcripts must
//! be supplied by the caller through `ingest`; the extractor reports them as
//! not extractable rather than guessing.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use crate::error::{Error, Result};
use crate::models::{ContentType, ExtractedContent};

/// Selectors tried in order to locate the main content region of a page.
const CONTENT_SELECTORS: [&str; 7] = [
    "main",
    "article",
    ".content",
    ".post-content",
    ".entry-content",
    "#content",
    ".tutorial-content",
];

/// Content-bearing elements whose text is collected within the main region.
const TEXT_ELEMENTS: &str = "p, h1, h2, h3, h4, h5, h6, li, pre, blockquote, td";

/// Boundary contract: fetch a URL and produce normalized content.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<ExtractedContent>;
}

/// Classify a URL by host: YouTube watch/share links vs. everything else.
pub fn classify_url(raw: &str) -> ContentType {
    if let Ok(parsed) = url::Url::parse(raw) {
        if let Some(host) = parsed.host_str() {
            let host = host.trim_start_matches("www.");
            if host == "youtube.com"
                || host.ends_with(".youtube.com")
                || host == "youtu.be"
            {
                return ContentType::Youtube;
            }
        }
    }
    ContentType::Web
}

/// Extract the video id from a YouTube URL (`watch?v=`, `youtu.be/`, `/embed/`).
pub fn youtube_video_id(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw).ok()?;
    let host = parsed.host_str()?.trim_start_matches("www.");

    if host == "youtu.be" {
        return parsed
            .path_segments()
            .and_then(|mut segments| segments.next())
            .filter(|s| !s.is_empty())
            .map(String::from);
    }

    if host == "youtube.com" || host.ends_with(".youtube.com") {
        if let Some((_, v)) = parsed.query_pairs().find(|(k, _)| k == "v") {
            if !v.is_empty() {
                return Some(v.into_owned());
            }
        }
        let mut segments = parsed.path_segments()?;
        if segments.next() == Some("embed") {
            return segments.next().filter(|s| !s.is_empty()).map(String::from);
        }
    }

    None
}

/// Web page extractor backed by reqwest and scraper.
pub struct WebExtractor {
    client: reqwest::Client,
}

impl WebExtractor {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| Error::Extraction(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ContentExtractor for WebExtractor {
    async fn extract(&self, url: &str) -> Result<ExtractedContent> {
        if classify_url(url) == ContentType::Youtube {
            return Err(Error::NotExtractable(format!(
                "{} is a YouTube URL; ingest its transcript directly with content type 'youtube'",
                url
            )));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Extraction(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Extraction(format!("{} returned {}", url, status)));
        }

        let html = response
            .text()
            .await
            .map_err(|e| Error::Extraction(format!("reading {} failed: {}", url, e)))?;

        let (title, text) = parse_page(&html);

        let minimum = ContentType::Web.min_text_len();
        if text.len() < minimum {
            return Err(Error::ContentTooShort {
                url: url.to_string(),
                length: text.len(),
                minimum,
            });
        }

        let domain = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(String::from))
            .unwrap_or_default();

        Ok(ExtractedContent {
            title,
            metadata: serde_json::json!({
                "domain": domain,
                "content_length": text.len(),
            }),
            text,
            url: url.to_string(),
            content_type: ContentType::Web,
        })
    }
}

/// Pull the title and main body text out of an HTML document.
///
/// Tries the content selectors in order, falling back to `<body>`, and
/// collects text from content-bearing elements only so script, style, and
/// navigation chrome never reach the chunker.
fn parse_page(html: &str) -> (String, String) {
    let doc = Html::parse_document(html);

    let title_sel = Selector::parse("title").expect("static selector");
    let title = doc
        .select(&title_sel)
        .next()
        .map(|t| normalize_whitespace(&t.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "No Title".to_string());

    let text_sel = Selector::parse(TEXT_ELEMENTS).expect("static selector");

    let mut text = String::new();
    for selector in CONTENT_SELECTORS {
        let sel = Selector::parse(selector).expect("static selector");
        if let Some(root) = doc.select(&sel).next() {
            text = collect_text(&root, &text_sel);
            if !text.is_empty() {
                break;
            }
        }
    }

    if text.is_empty() {
        let body_sel = Selector::parse("body").expect("static selector");
        if let Some(body) = doc.select(&body_sel).next() {
            text = collect_text(&body, &text_sel);
        }
    }

    (title, text)
}

fn collect_text(root: &ElementRef, text_sel: &Selector) -> String {
    let mut parts: Vec<String> = Vec::new();
    for el in root.select(text_sel) {
        let piece = normalize_whitespace(&el.text().collect::<Vec<_>>().join(" "));
        if !piece.is_empty() {
            parts.push(piece);
        }
    }
    normalize_whitespace(&parts.join(" "))
}

/// Collapse all whitespace runs to single spaces and trim.
fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_web_urls() {
        assert_eq!(classify_url("https://realpython.com/pandas/"), ContentType::Web);
        assert_eq!(classify_url("https://docs.rs/serde"), ContentType::Web);
        assert_eq!(classify_url("not a url at all"), ContentType::Web);
    }

    #[test]
    fn test_classify_youtube_urls() {
        assert_eq!(
            classify_url("https://www.youtube.com/watch?v=vmEHCJofslg"),
            ContentType::Youtube
        );
        assert_eq!(classify_url("https://youtu.be/vmEHCJofslg"), ContentType::Youtube);
        assert_eq!(
            classify_url("https://m.youtube.com/watch?v=abc"),
            ContentType::Youtube
        );
    }

    #[test]
    fn test_youtube_video_id_variants() {
        assert_eq!(
            youtube_video_id("https://www.youtube.com/watch?v=vmEHCJofslg"),
            Some("vmEHCJofslg".to_string())
        );
        assert_eq!(
            youtube_video_id("https://youtu.be/vmEHCJofslg"),
            Some("vmEHCJofslg".to_string())
        );
        assert_eq!(
            youtube_video_id("https://www.youtube.com/embed/vmEHCJofslg"),
            Some("vmEHCJofslg".to_string())
        );
        assert_eq!(youtube_video_id("https://example.com/watch?v=x"), None);
    }

    #[test]
    fn test_parse_page_prefers_content_region() {
        let html = r#"
            <html><head><title> My  Tutorial </title></head>
            <body>
              <nav><li>Home</li><li>About</li></nav>
              <article>
                <h1>Learning pandas</h1>
                <p>Dataframes hold tabular data.</p>
                <p>Series are single columns.</p>
              </article>
              <footer><p>copyright</p></footer>
            </body></html>
        "#;
        let (title, text) = parse_page(html);
        assert_eq!(title, "My Tutorial");
        assert!(text.contains("Learning pandas"));
        assert!(text.contains("Dataframes hold tabular data."));
        assert!(!text.contains("Home"));
        assert!(!text.contains("copyright"));
    }

    #[test]
    fn test_parse_page_falls_back_to_body() {
        let html = "<html><body><p>Just a paragraph of text.</p></body></html>";
        let (title, text) = parse_page(html);
        assert_eq!(title, "No Title");
        assert_eq!(text, "Just a paragraph of text.");
    }

    #[test]
    fn test_parse_page_ignores_scripts() {
        let html = r#"
            <html><body><main>
              <p>Visible text.</p>
              <script>var hidden = "should not appear";</script>
            </main></body></html>
        "#;
        let (_, text) = parse_page(html);
        assert!(text.contains("Visible text."));
        assert!(!text.contains("hidden"));
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n\t b   c  "), "a b c");
        assert_eq!(normalize_whitespace(""), "");
    }
}
