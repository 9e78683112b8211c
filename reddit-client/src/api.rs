use indexmap::IndexMap;
use meme_core::{CoreError, RedditApiError};
use reqwest::{Client, Method, Response};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, error, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    #[serde(default = "Vec::new")]
    pub children: Vec<RedditListingChild<T>>,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub dist: Option<u32>,
}

impl<T> Default for RedditListingData<T> {
    fn default() -> Self {
        Self {
            children: Vec::new(),
            after: None,
            before: None,
            dist: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    #[serde(default)]
    pub kind: String,
    pub data: T,
}

impl<T> RedditListing<T> {
    pub fn posts(&self) -> impl Iterator<Item = &T> {
        self.data.children.iter().map(|child| &child.data)
    }
}

/// The subset of a link post that image selection looks at.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RedditPostData {
    pub id: Option<String>,
    pub title: Option<String>,
    pub permalink: Option<String>,
    pub url: Option<String>,
    pub url_overridden_by_dest: Option<String>,
    pub post_hint: Option<String>,
    pub domain: Option<String>,
    #[serde(deserialize_with = "null_as_false")]
    pub over_18: bool,
    #[serde(deserialize_with = "null_as_false")]
    pub stickied: bool,
    #[serde(deserialize_with = "null_as_false")]
    pub is_gallery: bool,
    /// Gallery items keyed by media id, in the order Reddit sent them.
    pub media_metadata: Option<IndexMap<String, MediaItem>>,
    pub preview: Option<PostPreview>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaItem {
    pub status: Option<String>,
    /// Full-size source.
    pub s: Option<MediaSource>,
    /// Resized variants, smallest first.
    pub p: Option<Vec<MediaSource>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaSource {
    pub u: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PostPreview {
    #[serde(deserialize_with = "null_as_empty")]
    pub images: Vec<PreviewImage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewImage {
    pub source: Option<PreviewSource>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewSource {
    pub url: Option<String>,
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    api_base: String,
    user_agent: String,
}

impl RedditApiClient {
    pub fn new(
        http_client: Client,
        api_base: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            user_agent: user_agent.into(),
        }
    }

    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.api_base, endpoint)
    }

    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        query_params: Option<&[(&str, &str)]>,
    ) -> Result<Response, CoreError> {
        let url = self.endpoint_url(endpoint);

        let mut request_builder = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(access_token)
            .header("User-Agent", &self.user_agent);

        if let Some(params) = query_params {
            request_builder = request_builder.query(params);
        }

        info!("Making Reddit API request: {} {}", method, endpoint);
        let response = match request_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for {} {}: {}", method, endpoint, e);
                if e.is_timeout() {
                    return Err(CoreError::RedditApi(RedditApiError::RequestTimeout));
                }
                return Err(CoreError::Network(e));
            }
        };

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("-")
            .to_string();
        info!("HTTP {} {}", status.as_u16(), content_type);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                "Request failed with status: {} for {}: {}",
                status, endpoint, body
            );
            return Err(CoreError::RedditApi(RedditApiError::ListingRejected {
                status: status.as_u16(),
                body,
            }));
        }

        debug!("Request successful: {} {}", status, endpoint);
        Ok(response)
    }

    /// `GET /r/{subreddit}/top?t={window}&limit={limit}&raw_json=1`
    pub async fn get_top_posts(
        &self,
        access_token: &str,
        subreddit: &str,
        time_window: &str,
        limit: u32,
    ) -> Result<RedditListing<RedditPostData>, CoreError> {
        let endpoint = format!("/r/{}/top", subreddit);
        let limit_str = limit.to_string();
        let params = [
            ("t", time_window),
            ("limit", limit_str.as_str()),
            ("raw_json", "1"),
        ];

        let response = self
            .make_request(Method::GET, &endpoint, access_token, Some(&params[..]))
            .await?;

        let listing: RedditListing<RedditPostData> = response.json().await.map_err(|e| {
            error!("Failed to parse subreddit posts: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse top posts for r/{}: {}", subreddit, e),
            })
        })?;

        info!(
            "Retrieved {} posts from r/{}",
            listing.data.children.len(),
            subreddit
        );
        Ok(listing)
    }
}
