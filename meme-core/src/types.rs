/// The post chosen for today's block: the only data carried into the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedPost {
    pub title: String,
    /// Absolute link to the post's comment page.
    pub permalink: String,
    pub image_url: String,
}

impl SelectedPost {
    pub fn new(
        title: impl Into<String>,
        permalink: impl Into<String>,
        image_url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            permalink: permalink.into(),
            image_url: image_url.into(),
        }
    }
}
