//! HTTP client for the newsdata-style feed.

use crate::error::NewsError;
use serde::Deserialize;

/// One raw story record from the feed.
#[derive(Debug, Clone, Deserialize)]
pub struct RawStory {
    /// Headline text.
    pub title: String,
    /// Subtitle / lede, often absent.
    #[serde(default)]
    pub description: Option<String>,
    /// ISO-8601-ish publish timestamp.
    #[serde(rename = "pubDate")]
    pub pub_date: String,
    /// Lead image. Stories without one are rejected downstream.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Link to the article.
    #[serde(default)]
    pub link: Option<String>,
    /// Feed source id.
    #[serde(default)]
    pub source_id: Option<String>,
    /// Provider keywords.
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
    /// Language code.
    #[serde(default)]
    pub language: Option<String>,
    /// Country codes.
    #[serde(default)]
    pub country: Option<Vec<String>>,
}

/// One page of feed results.
#[derive(Debug)]
pub struct NewsPage {
    /// The stories on this page.
    pub results: Vec<RawStory>,
    /// Token for the next page, when more results exist.
    pub next_page: Option<String>,
    /// Total matching stories reported by the feed.
    pub total_results: Option<u64>,
}

/// Client for the news feed API.
pub struct NewsClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    country: String,
    language: String,
}

impl NewsClient {
    /// Create a client for the given endpoint.
    pub fn new(endpoint: String, api_key: String, country: String, language: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            country,
            language,
        }
    }

    /// Fetch a page of stories by category. `None` means no category
    /// filter — the wildcard slot used for diversity.
    pub async fn fetch_by_category(
        &self,
        category: Option<&str>,
        priority: bool,
        page: Option<&str>,
    ) -> Result<NewsPage, NewsError> {
        let mut params = self.base_params();
        if let Some(category) = category {
            params.push(("category", category.to_string()));
        }
        if priority {
            params.push(("prioritydomain", "top".to_string()));
        }
        if let Some(page) = page {
            params.push(("page", page.to_string()));
        }
        self.fetch(&params).await
    }

    /// Fetch a page of stories matching a search query.
    pub async fn fetch_by_query(
        &self,
        query: &str,
        priority: bool,
        page: Option<&str>,
    ) -> Result<NewsPage, NewsError> {
        let mut params = self.base_params();
        params.push(("q", query.to_string()));
        if priority {
            params.push(("prioritydomain", "top".to_string()));
        }
        if let Some(page) = page {
            params.push(("page", page.to_string()));
        }
        self.fetch(&params).await
    }

    fn base_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("apikey", self.api_key.clone()),
            ("country", self.country.clone()),
            ("language", self.language.clone()),
        ]
    }

    async fn fetch(&self, params: &[(&'static str, String)]) -> Result<NewsPage, NewsError> {
        let redacted: Vec<String> = params
            .iter()
            .map(|(k, v)| {
                if *k == "apikey" {
                    format!("{k}=xxx")
                } else {
                    format!("{k}={v}")
                }
            })
            .collect();
        tracing::debug!(query = %redacted.join("&"), "fetching stories");

        let body: serde_json::Value = self
            .client
            .get(&self.endpoint)
            .query(params)
            .send()
            .await?
            .json()
            .await?;

        let status = body["status"].as_str().unwrap_or_default().to_string();
        if status == "error" {
            return Err(NewsError::Api {
                code: body["results"]["code"].as_str().unwrap_or("unknown").to_string(),
                message: body["results"]["message"]
                    .as_str()
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }
        if status != "success" {
            return Err(NewsError::UnexpectedStatus { status });
        }

        let results: Vec<RawStory> = body
            .get("results")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| NewsError::UnexpectedStatus {
                status: format!("unparseable results: {e}"),
            })?
            .unwrap_or_default();

        Ok(NewsPage {
            results,
            next_page: body["nextPage"].as_str().map(ToString::to_string),
            total_results: body["totalResults"].as_u64(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> NewsClient {
        NewsClient::new(
            server.uri(),
            "test-key".into(),
            "us".into(),
            "en".into(),
        )
    }

    #[tokio::test]
    async fn fetch_by_category_sends_expected_params() {
        let server = MockServer::start().await;

        let body = serde_json::json!({
            "status": "success",
            "totalResults": 1,
            "results": [{
                "title": "Mars Rover Phones Home",
                "description": "NASA reports contact",
                "pubDate": "2024-01-01 09:00:00",
                "image_url": "https://example.com/rover.jpg",
                "link": "https://example.com/story",
                "source_id": "nasa",
                "language": "english",
                "country": ["united states of america"]
            }],
            "nextPage": "page-2"
        });

        Mock::given(method("GET"))
            .and(query_param("apikey", "test-key"))
            .and(query_param("country", "us"))
            .and(query_param("language", "en"))
            .and(query_param("category", "science"))
            .and(query_param("prioritydomain", "top"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let page = client_for(&server)
            .fetch_by_category(Some("science"), true, None)
            .await
            .expect("fetch");

        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].title, "Mars Rover Phones Home");
        assert_eq!(page.next_page.as_deref(), Some("page-2"));
        assert_eq!(page.total_results, Some(1));
    }

    #[tokio::test]
    async fn wildcard_fetch_omits_category_and_priority() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "results": []
            })))
            .mount(&server)
            .await;

        let page = client_for(&server)
            .fetch_by_category(None, false, None)
            .await
            .expect("fetch");
        assert!(page.results.is_empty());
        assert!(page.next_page.is_none());

        let requests = server.received_requests().await.unwrap();
        let query = requests[0].url.query().unwrap_or_default();
        assert!(!query.contains("category"));
        assert!(!query.contains("prioritydomain"));
    }

    #[tokio::test]
    async fn error_status_is_fatal() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "error",
                "results": {"code": "Unauthorized", "message": "invalid api key"}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_by_query("barack obama", true, None)
            .await
            .unwrap_err();

        match err {
            NewsError::Api { code, message } => {
                assert_eq!(code, "Unauthorized");
                assert_eq!(message, "invalid api key");
            }
            other => panic!("expected Api, got: {other}"),
        }
    }

    #[tokio::test]
    async fn unknown_status_is_fatal() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "maintenance"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_by_category(Some("top"), true, None)
            .await
            .unwrap_err();
        assert!(matches!(err, NewsError::UnexpectedStatus { .. }));
    }
}
