//! Picks the first usable image post out of a ranked listing.
//!
//! Posts are visited in listing order. Adult and pinned posts are skipped;
//! every other post is checked against the image rules in priority order
//! before moving on, so the highest-ranked post with any usable image wins.

use crate::api::{MediaItem, RedditListing, RedditPostData};
use indexmap::IndexMap;
use meme_core::SelectedPost;
use std::fmt;

const REDDIT_WEB_BASE: &str = "https://www.reddit.com";
const IMAGE_EXTENSIONS: [&str; 4] = [".png", ".jpg", ".jpeg", ".gif"];

/// Which rule produced the image URL, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRule {
    /// Destination URL already points at an image file.
    DirectLink,
    /// Reddit classified the post as an image.
    HintedImage,
    /// First valid item of a gallery.
    Gallery,
    /// Reddit's own preview rendition.
    Preview,
    /// Extensionless imgur link, coerced to `.jpg`.
    Imgur,
}

impl fmt::Display for ImageRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageRule::DirectLink => "direct link",
            ImageRule::HintedImage => "image hint",
            ImageRule::Gallery => "gallery",
            ImageRule::Preview => "preview",
            ImageRule::Imgur => "imgur",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub post: SelectedPost,
    pub rule: ImageRule,
}

/// Returns `None` when no post in the listing has a usable image.
pub fn select_image_post(listing: &RedditListing<RedditPostData>) -> Option<Selection> {
    listing
        .posts()
        .filter(|post| !post.over_18 && !post.stickied)
        .find_map(|post| {
            let (rule, image_url) = resolve_image(post)?;
            Some(Selection {
                post: SelectedPost::new(post.display_title(), post.absolute_permalink(), image_url),
                rule,
            })
        })
}

fn resolve_image(post: &RedditPostData) -> Option<(ImageRule, String)> {
    let link = post.destination();

    if has_image_extension(link) {
        return Some((ImageRule::DirectLink, link.to_string()));
    }

    if post.post_hint.as_deref() == Some("image") && !link.is_empty() {
        return Some((ImageRule::HintedImage, link.to_string()));
    }

    if post.looks_like_gallery() {
        if let Some(image) = post.media_metadata.as_ref().and_then(first_gallery_image) {
            return Some((ImageRule::Gallery, image));
        }
    }

    if let Some(source) = post.preview_source() {
        return Some((ImageRule::Preview, unescape_amp(source)));
    }

    if link.contains("imgur.com") {
        let image = if link.ends_with(".jpg") {
            link.to_string()
        } else {
            format!("{}.jpg", link)
        };
        return Some((ImageRule::Imgur, image));
    }

    None
}

/// First image of a gallery, skipping items whose status is not `valid`.
///
/// An item's full-size source wins over its resized variants; without a
/// source, the last (largest) variant is used. Empty URLs count as absent.
pub fn first_gallery_image(media: &IndexMap<String, MediaItem>) -> Option<String> {
    media
        .values()
        .filter(|item| item.status.as_deref() == Some("valid"))
        .find_map(|item| {
            let source = item.s.as_ref().and_then(|s| non_empty(&s.u));
            let largest_variant = item
                .p
                .as_ref()
                .and_then(|variants| variants.last())
                .and_then(|variant| non_empty(&variant.u));
            source.or(largest_variant).map(unescape_amp)
        })
}

fn has_image_extension(link: &str) -> bool {
    let lower = link.to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

fn unescape_amp(url: &str) -> String {
    url.replace("&amp;", "&")
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl RedditPostData {
    pub fn display_title(&self) -> &str {
        non_empty(&self.title).unwrap_or("(no title)")
    }

    pub fn absolute_permalink(&self) -> String {
        format!(
            "{}{}",
            REDDIT_WEB_BASE,
            non_empty(&self.permalink).unwrap_or("#")
        )
    }

    /// Where the post points: the overridden destination, then `url`.
    pub fn destination(&self) -> &str {
        non_empty(&self.url_overridden_by_dest)
            .or_else(|| non_empty(&self.url))
            .unwrap_or("")
    }

    pub fn looks_like_gallery(&self) -> bool {
        self.is_gallery
            || (self.domain.as_deref() == Some("reddit.com")
                && self.url.as_deref().is_some_and(|url| url.contains("gallery")))
    }

    pub fn preview_source(&self) -> Option<&str> {
        self.preview
            .as_ref()
            .and_then(|preview| preview.images.first())
            .and_then(|image| image.source.as_ref())
            .and_then(|source| non_empty(&source.url))
    }
}
