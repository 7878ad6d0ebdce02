//! HTTP client for the Twitter v2 API surface the relay consumes.

use std::time::Duration;

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    tracing::{debug, warn},
};

use birdwatch_relay::{
    Media, MediaKind, Post,
    ports::{PostSource, SourceError},
};

/// Timeline page size. The API accepts 5..=100; we only ever need the
/// most recent handful per pass.
pub const PAGE_SIZE: usize = 5;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Backoff before the single retry of a transient transport failure.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Bearer-token client for handle resolution and timeline fetches.
pub struct TwitterClient {
    client: reqwest::Client,
    bearer: Secret<String>,
    base_url: String,
}

impl TwitterClient {
    pub fn new(bearer: Secret<String>) -> Result<Self, SourceError> {
        Self::with_base_url(bearer, "https://api.twitter.com".to_string())
    }

    /// Point the client at a different API root (used by tests).
    pub fn with_base_url(bearer: Secret<String>, base_url: String) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SourceError::external("failed to build HTTP client", e))?;
        Ok(Self {
            client,
            bearer,
            base_url,
        })
    }

    /// Resolve a handle to the source-side account id.
    ///
    /// The API reports an unknown handle either as HTTP 404 or as a 200
    /// response carrying only an `errors` array; both map to
    /// [`SourceError::UnknownHandle`].
    pub async fn resolve_handle(&self, handle: &str) -> Result<String, SourceError> {
        let url = format!("{}/2/users/by/username/{handle}", self.base_url);
        let body = self.get_json(&url, &[], handle).await?;
        body["data"]["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| SourceError::unknown_handle(handle))
    }

    /// Fetch the most recent posts of an account, newest-first, with
    /// attachments resolved against the `includes.media` side-table.
    pub async fn user_posts(&self, user_id: &str, author: &str) -> Result<Vec<Post>, SourceError> {
        let url = format!("{}/2/users/{user_id}/tweets", self.base_url);
        let max_results = PAGE_SIZE.to_string();
        let query = [
            ("max_results", max_results.as_str()),
            ("expansions", "attachments.media_keys"),
            ("media.fields", "url,type"),
        ];
        let body = self.get_json(&url, &query, author).await?;
        let posts = parse_timeline(&body, author);
        debug!(author, count = posts.len(), "fetched timeline page");
        Ok(posts)
    }

    async fn get_json(
        &self,
        url: &str,
        query: &[(&str, &str)],
        handle: &str,
    ) -> Result<serde_json::Value, SourceError> {
        let mut retried = false;
        loop {
            let result = self
                .client
                .get(url)
                .query(query)
                .bearer_auth(self.bearer.expose_secret())
                .send()
                .await;

            let resp = match result {
                Ok(resp) => resp,
                // One bounded retry on transient transport failures; HTTP
                // error statuses are never retried.
                Err(err) if !retried && (err.is_timeout() || err.is_connect()) => {
                    retried = true;
                    warn!(handle, error = %err, "source request failed, retrying once");
                    tokio::time::sleep(RETRY_BACKOFF).await;
                    continue;
                },
                Err(err) => return Err(SourceError::external("source request failed", err)),
            };

            let status = resp.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(SourceError::RateLimited);
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(SourceError::unknown_handle(handle));
            }
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                warn!(handle, status = %status, body = %body, "source API error");
                return Err(SourceError::response(format!("HTTP {status}: {body}")));
            }

            return resp
                .json::<serde_json::Value>()
                .await
                .map_err(|e| SourceError::external("malformed source response", e));
        }
    }
}

#[async_trait]
impl PostSource for TwitterClient {
    async fn recent_posts(&self, handle: &str) -> Result<Vec<Post>, SourceError> {
        let user_id = self.resolve_handle(handle).await?;
        self.user_posts(&user_id, handle).await
    }
}

/// Map a timeline payload onto posts. An absent `data` array (empty
/// timeline) yields an empty page, not an error.
fn parse_timeline(body: &serde_json::Value, author: &str) -> Vec<Post> {
    let media_table = body["includes"]["media"]
        .as_array()
        .cloned()
        .unwrap_or_default();

    body["data"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let id = item["id"].as_str()?;
                    Some(Post {
                        id: id.to_string(),
                        author: author.to_string(),
                        text: item["text"].as_str().unwrap_or_default().to_string(),
                        media: resolve_media(item, &media_table),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Resolve a post's media keys against the side-table, preserving key
/// order. Entries without a URL are dropped.
fn resolve_media(item: &serde_json::Value, media_table: &[serde_json::Value]) -> Vec<Media> {
    let Some(keys) = item["attachments"]["media_keys"].as_array() else {
        return Vec::new();
    };
    keys.iter()
        .filter_map(|key| {
            let key = key.as_str()?;
            let entry = media_table
                .iter()
                .find(|m| m["media_key"].as_str() == Some(key))?;
            let url = entry["url"].as_str()?;
            Some(Media {
                url: url.to_string(),
                kind: MediaKind::from_api(entry["type"].as_str().unwrap_or_default()),
            })
        })
        .collect()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn make_client(server: &mockito::Server) -> TwitterClient {
        TwitterClient::with_base_url(Secret::new("bearer".into()), server.url()).unwrap()
    }

    #[tokio::test]
    async fn resolve_handle_returns_account_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/2/users/by/username/alice")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::json!({"data": {"id": "42", "username": "alice"}}).to_string())
            .create_async()
            .await;

        let client = make_client(&server);
        let id = client.resolve_handle("alice").await.unwrap();

        assert_eq!(id, "42");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn resolve_handle_unknown_maps_errors_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/2/users/by/username/ghost")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::json!({"errors": [{"title": "Not Found Error"}]}).to_string())
            .create_async()
            .await;

        let client = make_client(&server);
        let err = client.resolve_handle("ghost").await.unwrap_err();

        assert!(matches!(err, SourceError::UnknownHandle { ref handle } if handle == "ghost"));
    }

    #[tokio::test]
    async fn resolve_handle_unknown_maps_404() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/2/users/by/username/ghost")
            .with_status(404)
            .with_body("not found")
            .create_async()
            .await;

        let client = make_client(&server);
        let err = client.resolve_handle("ghost").await.unwrap_err();

        assert!(matches!(err, SourceError::UnknownHandle { .. }));
    }

    #[tokio::test]
    async fn rate_limit_status_is_distinguished() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/2/users/by/username/alice")
            .with_status(429)
            .with_body("Too Many Requests")
            .create_async()
            .await;

        let client = make_client(&server);
        let err = client.resolve_handle("alice").await.unwrap_err();

        assert!(matches!(err, SourceError::RateLimited));
    }

    #[tokio::test]
    async fn server_error_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/2/users/by/username/alice")
            .with_status(500)
            .with_body("oops")
            .expect(1)
            .create_async()
            .await;

        let client = make_client(&server);
        let err = client.resolve_handle("alice").await.unwrap_err();

        assert!(err.to_string().contains("500"), "error: {err}");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn user_posts_resolves_photo_media_in_key_order() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/2/users/42/tweets")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "data": [
                        {
                            "id": "101",
                            "text": "two pics",
                            "attachments": {"media_keys": ["k2", "k1", "k3"]}
                        },
                        {"id": "100", "text": "plain"}
                    ],
                    "includes": {
                        "media": [
                            {"media_key": "k1", "type": "photo", "url": "https://img/1.jpg"},
                            {"media_key": "k2", "type": "photo", "url": "https://img/2.jpg"},
                            {"media_key": "k3", "type": "video"}
                        ]
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = make_client(&server);
        let posts = client.user_posts("42", "alice").await.unwrap();

        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, "101");
        assert_eq!(posts[0].author, "alice");
        // Key order preserved; the video entry has no URL and is dropped.
        assert_eq!(
            posts[0].media,
            vec![
                Media {
                    url: "https://img/2.jpg".into(),
                    kind: MediaKind::Photo
                },
                Media {
                    url: "https://img/1.jpg".into(),
                    kind: MediaKind::Photo
                },
            ]
        );
        assert_eq!(posts[1].id, "100");
        assert!(posts[1].media.is_empty());
    }

    #[tokio::test]
    async fn empty_timeline_yields_empty_page() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/2/users/42/tweets")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::json!({"meta": {"result_count": 0}}).to_string())
            .create_async()
            .await;

        let client = make_client(&server);
        let posts = client.user_posts("42", "bob").await.unwrap();

        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn recent_posts_resolves_then_fetches() {
        let mut server = mockito::Server::new_async().await;
        let _user = server
            .mock("GET", "/2/users/by/username/alice")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::json!({"data": {"id": "42"}}).to_string())
            .create_async()
            .await;
        let _tweets = server
            .mock("GET", "/2/users/42/tweets")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::json!({"data": [{"id": "100", "text": "hello"}]}).to_string())
            .create_async()
            .await;

        let client = make_client(&server);
        let posts = client.recent_posts("alice").await.unwrap();

        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, "100");
        assert_eq!(posts[0].text, "hello");
    }
}
