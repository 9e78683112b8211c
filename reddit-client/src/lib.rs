pub mod api;
pub mod auth;
pub mod selector;

#[cfg(test)]
mod tests;

pub use api::{RedditApiClient, RedditListing, RedditPostData};
pub use auth::TokenAcquirer;
pub use selector::{first_gallery_image, select_image_post, ImageRule, Selection};

use meme_core::{AppConfig, CoreError, JobSettings};
use reqwest::Client;
use tracing::info;

/// A source of today's ranked posts, reached with a short-lived token.
pub trait PostFeed {
    async fn acquire_token(&self) -> Result<String, CoreError>;

    async fn fetch_listing(
        &self,
        access_token: &str,
    ) -> Result<RedditListing<RedditPostData>, CoreError>;

    async fn fetch_top_listing(&self) -> Result<RedditListing<RedditPostData>, CoreError> {
        let access_token = self.acquire_token().await?;
        self.fetch_listing(&access_token).await
    }
}

/// App-only Reddit access: one token request, then one listing request.
pub struct RedditClient {
    auth: TokenAcquirer,
    api: RedditApiClient,
    subreddit: String,
    time_window: String,
    listing_limit: u32,
}

impl RedditClient {
    pub fn new(config: &AppConfig) -> Result<Self, CoreError> {
        let settings: &JobSettings = &config.settings;
        let http_client = Client::builder().user_agent(&settings.user_agent).build()?;

        let auth = TokenAcquirer::new(
            http_client.clone(),
            &config.credentials,
            &settings.token_url,
        )?;
        let api = RedditApiClient::new(http_client, &settings.api_base, &settings.user_agent);

        Ok(Self {
            auth,
            api,
            subreddit: settings.subreddit.clone(),
            time_window: settings.time_window.clone(),
            listing_limit: settings.listing_limit,
        })
    }

    pub fn subreddit(&self) -> &str {
        &self.subreddit
    }
}

impl PostFeed for RedditClient {
    async fn acquire_token(&self) -> Result<String, CoreError> {
        self.auth.acquire_token().await
    }

    async fn fetch_listing(
        &self,
        access_token: &str,
    ) -> Result<RedditListing<RedditPostData>, CoreError> {
        info!(
            "Fetching top posts of the {} from r/{}",
            self.time_window, self.subreddit
        );
        self.api
            .get_top_posts(
                access_token,
                &self.subreddit,
                &self.time_window,
                self.listing_limit,
            )
            .await
    }
}
