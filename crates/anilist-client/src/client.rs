//! AniList GraphQL client with request spacing, retries and error
//! classification.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde_json::{json, Map, Value};
use shared::config::AnilistConfig;
use shared::{AnimeEntry, PlanningMap};
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::error::ApiError;
use crate::query::{self, QueryDocument, UserSelector};
use crate::rate_limiter::RateLimiter;
use crate::response;

/// How far into a response body diagnostics will quote.
const BODY_SNIPPET_LEN: usize = 500;

/// Operations the crawl layers need from the API.
///
/// `execute` is the only required method; the fetch helpers compose the query
/// builders and decoders on top of it, so a test double only has to produce
/// raw response bodies.
#[async_trait]
pub trait AnilistApi: Send {
    /// Run one GraphQL document and return the raw response body.
    async fn execute(&mut self, doc: &QueryDocument) -> Result<Value, ApiError>;

    /// Completed lists for a homogeneous batch of numeric user ids.
    ///
    /// Users whose aliased payload came back `null` are absent from the
    /// result; the gap is logged where it is detected.
    async fn fetch_completed_by_ids(
        &mut self,
        user_ids: &[i64],
    ) -> Result<BTreeMap<i64, Vec<AnimeEntry>>, ApiError> {
        let doc = query::completed_list(&UserSelector::Ids(user_ids.to_vec()))?;
        let body = self.execute(&doc).await?;
        response::completed_by_ids(response::data_object(body)?, user_ids)
    }

    /// Completed lists for a homogeneous batch of usernames.
    async fn fetch_completed_by_names(
        &mut self,
        names: &[String],
    ) -> Result<BTreeMap<String, Vec<AnimeEntry>>, ApiError> {
        let doc = query::completed_list(&UserSelector::Names(names.to_vec()))?;
        let body = self.execute(&doc).await?;
        response::completed_by_names(response::data_object(body)?, names)
    }

    /// Planning list for one user, identified by exactly one of id or name.
    async fn fetch_planning(
        &mut self,
        user_id: Option<i64>,
        user_name: Option<&str>,
    ) -> Result<PlanningMap, ApiError> {
        let doc = query::planning_list(user_id, user_name)?;
        let body = self.execute(&doc).await?;
        response::planning(response::data_object(body)?)
    }
}

/// Live client for the AniList GraphQL endpoint.
pub struct AnilistClient {
    /// HTTP client
    http: reqwest::Client,
    /// GraphQL endpoint URL
    endpoint: String,
    /// Rate limiter
    rate_limiter: RateLimiter,
    /// Total attempts for a request before giving up
    max_attempts: u32,
    /// Base retry delay; the n-th failure waits n times this
    retry_backoff: Duration,
}

impl AnilistClient {
    /// Create a new AniList client
    pub fn new(config: &AnilistConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            rate_limiter: RateLimiter::new(Duration::from_millis(config.rate_limit.min_interval_ms)),
            max_attempts: config.max_attempts.max(1),
            retry_backoff: Duration::from_secs(config.retry_backoff_secs),
        })
    }

    /// Delay before the retry that follows the n-th failed attempt.
    ///
    /// Linear rather than exponential: the upstream's own penalty window for
    /// misbehaving clients is minutes long, so the schedule starts at a full
    /// backoff step and grows from there.
    fn backoff(&self, failed_attempts: u32) -> Duration {
        self.retry_backoff * failed_attempts
    }

    async fn attempt(&self, doc: &QueryDocument) -> Result<Value, Failure> {
        let response = match self
            .http
            .post(&self.endpoint)
            .json(&json!({ "query": doc.query, "variables": doc.variables }))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Err(Failure::Retryable(format!("transport error: {}", e))),
        };

        let status = response.status();
        let headers = response.headers().clone();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Err(Failure::Retryable(format!(
                    "failed to read response body: {}",
                    e
                )))
            }
        };

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| {
                Failure::Retryable(diagnostic(
                    &format!("malformed response body: {}", e),
                    status,
                    &body,
                    &headers,
                ))
            });
        }

        // A 404 carrying a GraphQL error body is how the API reports the two
        // data conditions that must not be retried.
        if status == StatusCode::NOT_FOUND {
            if let Some(terminal) = classify_not_found(&body, &doc.variables) {
                return Err(Failure::Terminal(terminal));
            }
        }

        Err(Failure::Retryable(diagnostic(
            "server returned an error status",
            status,
            &body,
            &headers,
        )))
    }
}

#[async_trait]
impl AnilistApi for AnilistClient {
    async fn execute(&mut self, doc: &QueryDocument) -> Result<Value, ApiError> {
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            self.rate_limiter.acquire().await;
            debug!(attempt, "Sending GraphQL request");

            match self.attempt(doc).await {
                Ok(body) => return Ok(body),
                Err(Failure::Terminal(err)) => {
                    warn!(error = %err, "Request classified as terminal, not retrying");
                    return Err(err);
                }
                Err(Failure::Retryable(detail)) => {
                    if attempt < self.max_attempts {
                        let delay = self.backoff(attempt);
                        warn!(
                            attempt,
                            retry_in_secs = delay.as_secs(),
                            diagnostic = %detail,
                            "Request failed, backing off before retry"
                        );
                        sleep(delay).await;
                    } else {
                        error!(attempt, diagnostic = %detail, "Request failed on final attempt");
                    }
                    last_error = detail;
                }
            }
        }

        Err(ApiError::Request {
            attempts: self.max_attempts,
            last_error,
        })
    }
}

enum Failure {
    /// Data condition; surfaces immediately, never retried
    Terminal(ApiError),
    /// Anything else, with the diagnostic to log before backing off
    Retryable(String),
}

/// Recognize the two data conditions AniList reports as a 404 with a GraphQL
/// error body. Anything else on a 404 stays retryable.
fn classify_not_found(body: &str, variables: &Map<String, Value>) -> Option<ApiError> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    let message = parsed.get("errors")?.get(0)?.get("message")?.as_str()?;

    match message {
        "Private User" => Some(ApiError::PrivateUser {
            users: batch_members(variables),
        }),
        "User not found" => Some(ApiError::UserNotFound {
            users: batch_members(variables),
        }),
        _ => None,
    }
}

/// The users a query was about, reconstructed from its variable bindings.
///
/// The upstream error never says which member of a batch tripped it, so
/// diagnostics name all of them.
fn batch_members(variables: &Map<String, Value>) -> Vec<String> {
    variables
        .iter()
        .filter(|(name, _)| name.starts_with("username") || name.starts_with("id"))
        .map(|(_, value)| match value {
            Value::String(name) => name.clone(),
            other => other.to_string(),
        })
        .collect()
}

fn diagnostic(detail: &str, status: StatusCode, body: &str, headers: &HeaderMap) -> String {
    let mut lines = vec![
        detail.to_string(),
        format!("status: {}", status),
        format!("body: {}", truncated(body, BODY_SNIPPET_LEN)),
        "headers:".to_string(),
    ];
    for (name, value) in headers {
        lines.push(format!("  {}: {}", name, value.to_str().unwrap_or("<binary>")));
    }
    lines.join("\n")
}

fn truncated(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::config::RateLimitConfig;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(endpoint: String, max_attempts: u32) -> AnilistConfig {
        AnilistConfig {
            endpoint,
            rate_limit: RateLimitConfig { min_interval_ms: 0 },
            max_attempts,
            retry_backoff_secs: 0,
            per_page: 50,
            pages_per_request: 5,
        }
    }

    #[tokio::test]
    async fn success_returns_the_decoded_entries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "u1": {"lists": [{"entries": [
                        {"mediaId": 1, "media": {"title": {"romaji": "A"}}, "score": 80},
                    ]}]},
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = AnilistClient::new(&test_config(server.uri(), 3)).unwrap();
        let result = client.fetch_completed_by_ids(&[42]).await.unwrap();

        assert_eq!(result[&42].len(), 1);
        assert_eq!(result[&42][0].title, "A");
        assert_eq!(result[&42][0].score, 80);
    }

    #[tokio::test]
    async fn private_user_short_circuits_and_names_the_whole_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "errors": [{"message": "Private User", "status": 404}],
                "data": null,
            })))
            .expect(1) // exactly one attempt: classification skips the retry loop
            .mount(&server)
            .await;

        let mut client = AnilistClient::new(&test_config(server.uri(), 5)).unwrap();
        let err = client
            .fetch_completed_by_names(&["alice".to_string(), "bob".to_string()])
            .await
            .unwrap_err();

        match err {
            ApiError::PrivateUser { users } => {
                assert_eq!(users, vec!["alice".to_string(), "bob".to_string()]);
            }
            other => panic!("expected PrivateUser, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn user_not_found_short_circuits() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "errors": [{"message": "User not found", "status": 404}],
                "data": null,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = AnilistClient::new(&test_config(server.uri(), 5)).unwrap();
        let err = client.fetch_completed_by_ids(&[7]).await.unwrap_err();

        match err {
            ApiError::UserNotFound { users } => assert_eq!(users, vec!["7".to_string()]),
            other => panic!("expected UserNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn server_errors_are_retried_until_the_attempt_budget_is_spent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .expect(3)
            .mount(&server)
            .await;

        let mut client = AnilistClient::new(&test_config(server.uri(), 3)).unwrap();
        let doc = query::completed_list(&UserSelector::Ids(vec![1])).unwrap();
        let err = client.execute(&doc).await.unwrap_err();

        match err {
            ApiError::Request { attempts, last_error } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("500"));
                assert!(last_error.contains("upstream exploded"));
            }
            other => panic!("expected Request, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn a_plain_404_without_classification_stays_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
            .expect(2)
            .mount(&server)
            .await;

        let mut client = AnilistClient::new(&test_config(server.uri(), 2)).unwrap();
        let doc = query::completed_list(&UserSelector::Ids(vec![1])).unwrap();
        let err = client.execute(&doc).await.unwrap_err();

        assert!(matches!(err, ApiError::Request { attempts: 2, .. }));
    }

    #[test]
    fn backoff_schedule_is_linear_in_failed_attempts() {
        let client = AnilistClient::new(&AnilistConfig {
            endpoint: "https://graphql.anilist.co".to_string(),
            rate_limit: RateLimitConfig { min_interval_ms: 1000 },
            max_attempts: 10,
            retry_backoff_secs: 60,
            per_page: 50,
            pages_per_request: 5,
        })
        .unwrap();

        assert_eq!(client.backoff(1), Duration::from_secs(60));
        assert_eq!(client.backoff(2), Duration::from_secs(120));
        assert_eq!(client.backoff(9), Duration::from_secs(540));
    }

    #[test]
    fn batch_members_collects_only_user_variables() {
        let doc = query::completer_pages(42, 1, 3, 50);
        assert!(batch_members(&doc.variables).is_empty());

        let doc = query::completed_list(&UserSelector::Ids(vec![5, 6])).unwrap();
        let mut members = batch_members(&doc.variables);
        members.sort();
        assert_eq!(members, vec!["5".to_string(), "6".to_string()]);
    }

    #[test]
    fn truncated_respects_char_boundaries() {
        assert_eq!(truncated("short", 500), "short");
        let long = "é".repeat(300); // 600 bytes
        let cut = truncated(&long, 501); // 501 is not a char boundary
        assert!(cut.ends_with("..."));
        assert!(cut.len() <= 504);
    }
}
