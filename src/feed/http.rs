//! Polling client for the MediaWiki recent-changes API.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::config::FeedConfig;
use crate::error::{ChangeLearnError, Result};
use crate::feed::ChangeFeed;
use crate::feed::record::RawChange;

/// Properties requested for every change.
const RC_PROPS: &str = "title|user|sizes|flags|parsedcomment";

/// Consecutive empty pages tolerated while a continuation token is offered.
pub const MAX_EMPTY_PAGES: usize = 10;

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    query: Option<QueryBlock>,
    #[serde(default, rename = "continue")]
    continuation: Option<Continuation>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct QueryBlock {
    #[serde(default)]
    recentchanges: Vec<RawChange>,
}

#[derive(Debug, Deserialize)]
struct Continuation {
    #[serde(default)]
    rccontinue: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    info: String,
}

/// One decoded page of recent changes.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentChangesPage {
    pub changes: Vec<RawChange>,
    /// Token for the next (older) page, if any.
    pub rccontinue: Option<String>,
}

/// Decode a recent-changes response body.
pub fn parse_response(body: &str) -> Result<RecentChangesPage> {
    let response: ApiResponse = serde_json::from_str(body)?;
    if let Some(error) = response.error {
        return Err(ChangeLearnError::feed(format!(
            "API error {}: {}",
            error.code, error.info
        )));
    }
    let query = response
        .query
        .ok_or_else(|| ChangeLearnError::feed("response has no query block"))?;
    Ok(RecentChangesPage {
        changes: query.recentchanges,
        rccontinue: response.continuation.and_then(|c| c.rccontinue),
    })
}

/// What the feed does after decoding a page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageStep {
    /// Hand these records to the consumer. An empty list ends the feed.
    Emit(Vec<RawChange>),
    /// The page was empty but offered a token; request the next one.
    Continue,
}

/// Paging state of the recent-changes walk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageCursor {
    rccontinue: Option<String>,
    exhausted: bool,
    empty_pages: usize,
}

impl PageCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token to send with the next request.
    pub fn token(&self) -> Option<&str> {
        self.rccontinue.as_deref()
    }

    /// True once a response came back without a continuation token.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Fold a decoded page into the cursor.
    ///
    /// [`MAX_EMPTY_PAGES`] empty pages in a row that all carry a
    /// token is a feed error, not the end of the feed.
    pub fn advance(&mut self, page: RecentChangesPage) -> Result<PageStep> {
        self.exhausted = page.rccontinue.is_none();
        self.rccontinue = page.rccontinue;
        if !page.changes.is_empty() || self.exhausted {
            self.empty_pages = 0;
            return Ok(PageStep::Emit(page.changes));
        }

        self.empty_pages += 1;
        if self.empty_pages >= MAX_EMPTY_PAGES {
            return Err(ChangeLearnError::feed(format!(
                "{} consecutive empty pages with a continuation token",
                self.empty_pages
            )));
        }
        log::warn!(
            "empty recent-changes page with a continuation token, requesting the next page"
        );
        Ok(PageStep::Continue)
    }
}

/// Blocking HTTP feed that pages through recent changes.
///
/// The first request reads the newest page. Each later request follows the
/// `rccontinue` token of the previous response, so no record is served
/// twice. A response without a token ends the feed.
pub struct HttpChangeFeed {
    client: Client,
    endpoint: String,
    batch_size: usize,
    cursor: PageCursor,
    requests: u64,
}

impl std::fmt::Debug for HttpChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChangeFeed")
            .field("endpoint", &self.endpoint)
            .field("batch_size", &self.batch_size)
            .field("cursor", &self.cursor)
            .field("requests", &self.requests)
            .finish()
    }
}

impl HttpChangeFeed {
    pub fn new(config: &FeedConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            batch_size: config.batch_size,
            cursor: PageCursor::new(),
            requests: 0,
        })
    }

    fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("action", "query".to_string()),
            ("list", "recentchanges".to_string()),
            ("rcprop", RC_PROPS.to_string()),
            ("rclimit", self.batch_size.to_string()),
            ("format", "json".to_string()),
            ("formatversion", "2".to_string()),
        ];
        if let Some(token) = self.cursor.token() {
            params.push(("rccontinue", token.to_string()));
        }
        params
    }

    fn fetch_page(&mut self) -> Result<RecentChangesPage> {
        let params = self.query_params();
        self.requests += 1;
        log::debug!(
            "request {} to {} (rccontinue {:?})",
            self.requests,
            self.endpoint,
            self.cursor.token()
        );
        let body = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .send()?
            .error_for_status()?
            .text()?;
        parse_response(&body)
    }
}

impl ChangeFeed for HttpChangeFeed {
    fn next_batch(&mut self) -> Result<Vec<RawChange>> {
        loop {
            if self.cursor.is_exhausted() {
                return Ok(Vec::new());
            }
            let page = self.fetch_page()?;
            if let PageStep::Emit(changes) = self.cursor.advance(page)? {
                return Ok(changes);
            }
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formatversion_2() {
        let body = r#"{
            "batchcomplete": true,
            "continue": {"rccontinue": "20260101000000|123", "continue": "-||"},
            "query": {"recentchanges": [
                {"type": "edit", "title": "Rust", "user": "Example", "bot": false,
                 "new": false, "minor": true, "oldlen": 100, "newlen": 120,
                 "parsedcomment": "typo"},
                {"type": "new", "title": "Draft", "user": "SomeBot", "bot": true,
                 "new": true, "minor": false, "oldlen": 0, "newlen": 900,
                 "parsedcomment": "Created page"}
            ]}
        }"#;
        let page = parse_response(body).unwrap();
        assert_eq!(page.changes.len(), 2);
        assert_eq!(page.rccontinue.as_deref(), Some("20260101000000|123"));
        assert!(page.changes[0].minor);
        assert!(page.changes[1].bot && page.changes[1].new);
        assert_eq!(page.changes[1].newlen, 900);
    }

    #[test]
    fn test_parse_legacy_format() {
        let body = r#"{"query": {"recentchanges": [
            {"type": "edit", "title": "A", "user": "B", "bot": "", "oldlen": 5, "newlen": 1,
             "parsedcomment": ""}
        ]}}"#;
        let page = parse_response(body).unwrap();
        assert!(page.rccontinue.is_none());
        assert!(page.changes[0].bot);
        assert!(!page.changes[0].minor);
    }

    #[test]
    fn test_api_error_is_fatal() {
        let body = r#"{"error": {"code": "badvalue", "info": "Unrecognized value"}}"#;
        let err = parse_response(body).unwrap_err();
        assert!(err.to_string().contains("badvalue"));
    }

    #[test]
    fn test_missing_query_block() {
        assert!(matches!(
            parse_response(r#"{"batchcomplete": true}"#),
            Err(ChangeLearnError::Feed(_))
        ));
        assert!(matches!(
            parse_response("not json"),
            Err(ChangeLearnError::Json(_))
        ));
    }

    fn page(titles: &[&str], token: Option<&str>) -> RecentChangesPage {
        RecentChangesPage {
            changes: titles
                .iter()
                .map(|title| RawChange {
                    title: title.to_string(),
                    ..Default::default()
                })
                .collect(),
            rccontinue: token.map(str::to_string),
        }
    }

    #[test]
    fn test_query_params_follow_continuation() {
        let mut feed = HttpChangeFeed::new(&FeedConfig::default()).unwrap();
        let params = feed.query_params();
        assert!(params.contains(&("rclimit", "100".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "rccontinue"));

        feed.cursor.advance(page(&["A"], Some("20260101000000|42"))).unwrap();
        let params = feed.query_params();
        assert!(params.contains(&("rccontinue", "20260101000000|42".to_string())));
    }

    #[test]
    fn test_cursor_follows_token() {
        let mut cursor = PageCursor::new();
        assert_eq!(cursor.token(), None);

        let step = cursor.advance(page(&["A", "B"], Some("tok1"))).unwrap();
        assert_eq!(step, PageStep::Emit(page(&["A", "B"], None).changes));
        assert_eq!(cursor.token(), Some("tok1"));
        assert!(!cursor.is_exhausted());

        cursor.advance(page(&["C"], Some("tok2"))).unwrap();
        assert_eq!(cursor.token(), Some("tok2"));
    }

    #[test]
    fn test_missing_token_ends_feed() {
        let mut cursor = PageCursor::new();
        cursor.advance(page(&["A"], Some("tok"))).unwrap();

        let step = cursor.advance(page(&["B"], None)).unwrap();
        assert_eq!(step, PageStep::Emit(page(&["B"], None).changes));
        assert!(cursor.is_exhausted());
        assert_eq!(cursor.token(), None);

        // An empty last page is also the end, not an error.
        let mut cursor = PageCursor::new();
        assert_eq!(cursor.advance(page(&[], None)).unwrap(), PageStep::Emit(Vec::new()));
        assert!(cursor.is_exhausted());
    }

    #[test]
    fn test_empty_pages_with_token_are_skipped() {
        let mut cursor = PageCursor::new();
        for _ in 0..3 {
            assert_eq!(cursor.advance(page(&[], Some("tok"))).unwrap(), PageStep::Continue);
            assert!(!cursor.is_exhausted());
        }
        // A page with records resets the run of empty pages.
        let step = cursor.advance(page(&["A"], Some("tok"))).unwrap();
        assert_eq!(step, PageStep::Emit(page(&["A"], None).changes));

        for _ in 0..MAX_EMPTY_PAGES - 1 {
            assert_eq!(cursor.advance(page(&[], Some("tok"))).unwrap(), PageStep::Continue);
        }
    }

    #[test]
    fn test_too_many_empty_pages_is_an_error() {
        let mut cursor = PageCursor::new();
        for _ in 0..MAX_EMPTY_PAGES - 1 {
            cursor.advance(page(&[], Some("tok"))).unwrap();
        }
        match cursor.advance(page(&[], Some("tok"))) {
            Err(ChangeLearnError::Feed(message)) => {
                assert!(message.contains("consecutive empty pages"));
            }
            other => panic!("expected feed error, got {other:?}"),
        }
        assert!(!cursor.is_exhausted());
    }
}
