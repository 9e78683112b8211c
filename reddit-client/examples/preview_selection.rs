//! Runs the token, listing and selection steps and prints what would be
//! injected into the README, without touching any file.
//!
//! ```text
//! REDDIT_CLIENT_ID=... REDDIT_SECRET=... cargo run -p reddit-client --example preview_selection
//! ```

use meme_core::AppConfig;
use reddit_client::{select_image_post, PostFeed, RedditClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    let client = RedditClient::new(&config)?;

    println!("=== Top image post of the day: r/{} ===\n", client.subreddit());

    let listing = client.fetch_top_listing().await?;
    println!("Listing contains {} posts", listing.data.children.len());

    match select_image_post(&listing) {
        Some(selection) => {
            println!("Matched rule: {}", selection.rule);
            println!("Title:        {}", selection.post.title);
            println!("Permalink:    {}", selection.post.permalink);
            println!("Image:        {}", selection.post.image_url);
        }
        None => println!("No suitable image post today."),
    }

    Ok(())
}
