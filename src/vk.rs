use crate::error_utils::{create_http_client_with_context, parse_http_response_json};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

pub const VK_API_BASE: &str = "https://api.vk.com/method";
pub const VK_API_VERSION: &str = "5.131";

/// Album that holds a user's profile pictures
const PROFILE_ALBUM: &str = "profile";

/// Failures reported by the VK photo source
#[derive(Debug, Error)]
pub enum VkError {
    #[error("User not found: {identifier} ({reason})")]
    UserNotFound { identifier: String, reason: String },

    #[error("Failed to fetch photos of user {user_id}: {reason}")]
    FetchFailed { user_id: u64, reason: String },
}

/// Error object VK returns in place of `response`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error_code: i64,
    pub error_msg: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    response: Option<T>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ResolvedUser {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct PhotoList {
    items: Option<Vec<Photo>>,
}

/// One resolution a photo is available in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeVariant {
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    pub url: String,
    /// Size-class tag such as "s", "m", "x", "w"
    #[serde(rename = "type")]
    pub size_type: String,
}

impl SizeVariant {
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Likes {
    #[serde(default)]
    pub count: u64,
}

/// A profile photo as listed by `photos.get` with `extended=1`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Photo {
    pub id: Option<i64>,
    pub owner_id: Option<i64>,
    #[serde(default)]
    pub sizes: Vec<SizeVariant>,
    pub likes: Option<Likes>,
}

impl Photo {
    /// Number of likes, zero when VK did not report any
    pub fn like_count(&self) -> u64 {
        self.likes.as_ref().map_or(0, |likes| likes.count)
    }

    /// The variant with the largest area; the first one wins ties
    pub fn largest_size(&self) -> Option<&SizeVariant> {
        self.sizes
            .iter()
            .reduce(|best, size| if size.area() > best.area() { size } else { best })
    }
}

/// Extract the part of user input that `users.get` understands.
///
/// Accepts numeric IDs, `id123`, `@handle`, bare handles and profile URLs,
/// with or without a scheme (`vk.com/durov`).
pub fn parse_user_identifier(input: &str) -> Result<String> {
    let input = input.trim();
    if input.is_empty() {
        bail!("User identifier cannot be empty");
    }

    let schemeless_profile = Regex::new(r"^(?:(?:m|www)\.)?vk\.com/|^vk\.ru/")
        .context("Failed to compile profile URL regex")?;
    let url_input = if schemeless_profile.is_match(input) {
        format!("https://{input}")
    } else {
        input.to_string()
    };

    let candidate = match Url::parse(&url_input) {
        Ok(parsed_url) => {
            if !parsed_url
                .host_str()
                .is_some_and(|h| h == "vk.com" || h.ends_with(".vk.com") || h == "vk.ru")
            {
                bail!("Not a VK profile URL: {input}");
            }
            parsed_url
                .path_segments()
                .and_then(|mut segments| segments.find(|s| !s.is_empty()))
                .map(str::to_string)
                .with_context(|| format!("No user handle in URL: {input}"))?
        }
        Err(_) => input.trim_start_matches('@').to_string(),
    };

    let numeric_id = Regex::new(r"^id(\d+)$").context("Failed to compile user ID regex")?;
    if let Some(captures) = numeric_id.captures(&candidate) {
        return Ok(captures[1].to_string());
    }

    let handle = Regex::new(r"^[A-Za-z0-9_.]+$").context("Failed to compile handle regex")?;
    if !handle.is_match(&candidate) {
        bail!("Invalid user handle: {candidate}");
    }

    Ok(candidate)
}

/// Source of profile photos
#[async_trait]
pub trait PhotoSource: Send + Sync {
    /// Resolve a handle or numeric ID to the numeric user ID
    async fn resolve_user_id(&self, handle_or_id: &str) -> Result<u64, VkError>;

    /// List up to `limit` photos of the user's profile album, with like counts
    async fn fetch_profile_photos(&self, user_id: u64, limit: u32) -> Result<Vec<Photo>, VkError>;
}

/// VK API client authenticated with a user access token
pub struct VkClient {
    client: Client,
    access_token: String,
    api_base: String,
}

impl VkClient {
    /// Create a client talking to `api_base`, normally [`VK_API_BASE`]
    pub fn with_base_url(access_token: &str, api_base: &str) -> Result<Self> {
        let client = create_http_client_with_context()?;

        Ok(Self {
            client,
            access_token: access_token.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Call a VK API method and decode the response envelope
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<Envelope<T>> {
        let url = format!("{base}/{method}", base = self.api_base);
        debug!(%method, ?params, "Making request to VK API");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("access_token", self.access_token.as_str()),
                ("v", VK_API_VERSION),
            ])
            .query(params)
            .send()
            .await
            .with_context(|| format!("Failed to send {method} request to VK API"))?;

        debug!(
            "Received VK API response for {method} with status {status}",
            status = response.status()
        );

        parse_http_response_json(response, method).await
    }
}

fn describe_api_error(error: Option<ApiError>, fallback: &str) -> String {
    match error {
        Some(error) => format!(
            "VK API error {code}: {message}",
            code = error.error_code,
            message = error.error_msg
        ),
        None => fallback.to_string(),
    }
}

#[async_trait]
impl PhotoSource for VkClient {
    async fn resolve_user_id(&self, handle_or_id: &str) -> Result<u64, VkError> {
        let not_found = |reason: String| VkError::UserNotFound {
            identifier: handle_or_id.to_string(),
            reason,
        };

        let envelope: Envelope<Vec<ResolvedUser>> = self
            .call("users.get", &[("user_ids", handle_or_id.to_string())])
            .await
            .map_err(|e| not_found(format!("{e:#}")))?;

        let user = match envelope.response {
            Some(users) => users.into_iter().next(),
            None => None,
        };

        match user {
            Some(user) => {
                info!("Resolved {handle_or_id} to user ID {id}", id = user.id);
                Ok(user.id)
            }
            None => Err(not_found(describe_api_error(
                envelope.error,
                "lookup returned no users",
            ))),
        }
    }

    async fn fetch_profile_photos(&self, user_id: u64, limit: u32) -> Result<Vec<Photo>, VkError> {
        let failed = |reason: String| VkError::FetchFailed { user_id, reason };

        let params = [
            ("owner_id", user_id.to_string()),
            ("album_id", PROFILE_ALBUM.to_string()),
            ("photo_sizes", "1".to_string()),
            ("count", limit.to_string()),
            ("extended", "1".to_string()),
        ];

        let envelope: Envelope<PhotoList> = self
            .call("photos.get", &params)
            .await
            .map_err(|e| failed(format!("{e:#}")))?;

        match envelope.response.and_then(|list| list.items) {
            Some(items) => {
                info!(
                    "Fetched {count} profile photos of user {user_id}",
                    count = items.len()
                );
                Ok(items)
            }
            None => Err(failed(describe_api_error(
                envelope.error,
                "response has no photo items",
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn size(width: u32, height: u32, size_type: &str) -> SizeVariant {
        SizeVariant {
            width,
            height,
            url: format!("https://sun.userapi.com/{size_type}.jpg"),
            size_type: size_type.to_string(),
        }
    }

    #[test]
    fn test_parse_user_identifier() {
        assert_eq!(parse_user_identifier("123").unwrap(), "123");
        assert_eq!(parse_user_identifier("id123").unwrap(), "123");
        assert_eq!(parse_user_identifier("  durov \n").unwrap(), "durov");
        assert_eq!(parse_user_identifier("@durov").unwrap(), "durov");
        assert_eq!(parse_user_identifier("https://vk.com/durov").unwrap(), "durov");
        assert_eq!(parse_user_identifier("https://m.vk.com/id1").unwrap(), "1");
        assert_eq!(parse_user_identifier("vk.com/durov").unwrap(), "durov");
        assert_eq!(parse_user_identifier("m.vk.com/id1").unwrap(), "1");
        assert_eq!(parse_user_identifier("www.vk.com/durov?w=wall1").unwrap(), "durov");
        assert_eq!(parse_user_identifier("vk.ru/durov/").unwrap(), "durov");
        assert_eq!(parse_user_identifier("some.name_1").unwrap(), "some.name_1");

        assert!(parse_user_identifier("").is_err());
        assert!(parse_user_identifier("   ").is_err());
        assert!(parse_user_identifier("https://example.com/durov").is_err());
        assert!(parse_user_identifier("https://vk.com/").is_err());
        assert!(parse_user_identifier("two words").is_err());
        assert!(parse_user_identifier("vk.com/").is_err());
        assert!(parse_user_identifier("example.com/durov").is_err());
    }

    #[test]
    fn test_largest_size_uses_area() {
        let photo = Photo {
            id: Some(1),
            owner_id: Some(123),
            sizes: vec![size(100, 100, "m"), size(604, 403, "x"), size(300, 300, "q")],
            likes: None,
        };

        assert_eq!(photo.largest_size().unwrap().size_type, "x");
    }

    #[test]
    fn test_largest_size_first_max_wins() {
        let photo = Photo {
            id: None,
            owner_id: None,
            sizes: vec![size(200, 100, "a"), size(100, 200, "b")],
            likes: None,
        };

        assert_eq!(photo.largest_size().unwrap().size_type, "a");
    }

    #[test]
    fn test_photo_without_sizes_or_likes() {
        let photo: Photo = serde_json::from_value(serde_json::json!({"id": 7})).unwrap();

        assert!(photo.largest_size().is_none());
        assert_eq!(photo.like_count(), 0);
    }

    #[test]
    fn test_parse_photo_json() {
        let photo: Photo = serde_json::from_value(serde_json::json!({
            "id": 457239017,
            "owner_id": 1,
            "sizes": [
                {"height": 130, "width": 87, "type": "m", "url": "https://sun.userapi.com/m.jpg"},
                {"height": 1080, "width": 720, "type": "w", "url": "https://sun.userapi.com/w.jpg"}
            ],
            "likes": {"count": 42, "user_likes": 0}
        }))
        .unwrap();

        assert_eq!(photo.like_count(), 42);
        let largest = photo.largest_size().unwrap();
        assert_eq!(largest.size_type, "w");
        assert_eq!(largest.area(), 777_600);
    }

    #[tokio::test]
    async fn test_resolve_user_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/users.get")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("user_ids".into(), "durov".into()),
                Matcher::UrlEncoded("access_token".into(), "vk-token".into()),
                Matcher::UrlEncoded("v".into(), VK_API_VERSION.into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"response":[{"id":1,"first_name":"Pavel","last_name":"Durov"}]}"#)
            .create_async()
            .await;

        let client = VkClient::with_base_url("vk-token", &server.url()).unwrap();
        let user_id = client.resolve_user_id("durov").await.unwrap();

        assert_eq!(user_id, 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_resolve_user_id_reports_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/users.get")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"error":{"error_code":5,"error_msg":"User authorization failed"}}"#)
            .create_async()
            .await;

        let client = VkClient::with_base_url("bad-token", &server.url()).unwrap();
        let err = client.resolve_user_id("durov").await.unwrap_err();

        match err {
            VkError::UserNotFound { identifier, reason } => {
                assert_eq!(identifier, "durov");
                assert!(reason.contains("User authorization failed"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_resolve_user_id_empty_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/users.get")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"response":[]}"#)
            .create_async()
            .await;

        let client = VkClient::with_base_url("vk-token", &server.url()).unwrap();
        let result = client.resolve_user_id("nobody_here").await;

        assert!(matches!(result, Err(VkError::UserNotFound { .. })));
    }

    #[tokio::test]
    async fn test_fetch_profile_photos() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/photos.get")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("owner_id".into(), "123".into()),
                Matcher::UrlEncoded("album_id".into(), "profile".into()),
                Matcher::UrlEncoded("photo_sizes".into(), "1".into()),
                Matcher::UrlEncoded("count".into(), "5".into()),
                Matcher::UrlEncoded("extended".into(), "1".into()),
            ]))
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "response": {
                        "count": 1,
                        "items": [{
                            "id": 10,
                            "owner_id": 123,
                            "sizes": [{"width": 50, "height": 50, "type": "s", "url": "https://cdn/s.jpg"}],
                            "likes": {"count": 3}
                        }]
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = VkClient::with_base_url("vk-token", &server.url()).unwrap();
        let photos = client.fetch_profile_photos(123, 5).await.unwrap();

        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0].like_count(), 3);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_profile_photos_private_profile() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/photos.get")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"error":{"error_code":30,"error_msg":"This profile is private"}}"#)
            .create_async()
            .await;

        let client = VkClient::with_base_url("vk-token", &server.url()).unwrap();
        let err = client.fetch_profile_photos(123, 5).await.unwrap_err();

        match err {
            VkError::FetchFailed { user_id, reason } => {
                assert_eq!(user_id, 123);
                assert!(reason.contains("30"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_profile_photos_non_json_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/photos.get")
            .match_query(Matcher::Any)
            .with_status(502)
            .with_body("Bad Gateway")
            .create_async()
            .await;

        let client = VkClient::with_base_url("vk-token", &server.url()).unwrap();
        let result = client.fetch_profile_photos(123, 5).await;

        assert!(matches!(result, Err(VkError::FetchFailed { .. })));
    }
}
