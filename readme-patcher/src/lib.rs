use meme_core::{ConfigError, CoreError, DocumentError, JobSettings, SelectedPost};
use regex::{NoExpand, Regex};
use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};


/// The fixed layout of the block written between the markers.
#[derive(Debug, Clone)]
pub struct BlockTemplate {
    pub start_marker: String,
    pub end_marker: String,
    pub lead_in: String,
    pub image_alt: String,
}

impl BlockTemplate {
    pub fn from_settings(settings: &JobSettings) -> Self {
        Self {
            start_marker: settings.start_marker.clone(),
            end_marker: settings.end_marker.clone(),
            lead_in: settings.lead_in.clone(),
            image_alt: settings.image_alt.clone(),
        }
    }

    pub fn render(&self, post: &SelectedPost) -> String {
        [
            self.start_marker.clone(),
            self.lead_in.clone(),
            String::new(),
            format!("[*{}*]({})", post.title, post.permalink),
            String::new(),
            format!("![{}]({})", self.image_alt, post.image_url),
            self.end_marker.clone(),
        ]
        .join("\n")
    }
}

impl Default for BlockTemplate {
    fn default() -> Self {
        Self::from_settings(&JobSettings::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    DocumentMissing,
    MarkersMissing,
    Unchanged,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::DocumentMissing => "document not found",
            SkipReason::MarkersMissing => "markers not found",
            SkipReason::Unchanged => "no visible change",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Performed,
    NotPerformed(SkipReason),
}

/// Rewrites the marker-delimited region of a single document.
#[derive(Debug, Clone)]
pub struct ReadmePatcher {
    path: PathBuf,
    template: BlockTemplate,
    region: Regex,
}

impl ReadmePatcher {
    pub fn new(path: impl Into<PathBuf>, template: BlockTemplate) -> Result<Self, CoreError> {
        let pattern = format!(
            "(?s){}.*?{}",
            regex::escape(&template.start_marker),
            regex::escape(&template.end_marker)
        );
        let region = Regex::new(&pattern).map_err(|e| ConfigError::InvalidValue {
            field: "start_marker/end_marker".to_string(),
            value: e.to_string(),
        })?;

        Ok(Self {
            path: path.into(),
            template,
            region,
        })
    }

    pub fn from_settings(settings: &JobSettings) -> Result<Self, CoreError> {
        Self::new(
            settings.readme_path.clone(),
            BlockTemplate::from_settings(settings),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the first marker region of `content`; `None` if there is none.
    pub fn replace_block(&self, content: &str, post: &SelectedPost) -> Option<String> {
        let mut regions = self.region.find_iter(content);
        regions.next()?;
        if regions.next().is_some() {
            warn!(
                "{} contains more than one marker region; only the first is updated",
                self.path.display()
            );
        }

        let block = self.template.render(post);
        Some(
            self.region
                .replacen(content, 1, NoExpand(&block))
                .into_owned(),
        )
    }

    pub fn patch(&self, post: &SelectedPost) -> Result<PatchOutcome, CoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("{} not found; aborting.", self.path.display());
                return Ok(PatchOutcome::NotPerformed(SkipReason::DocumentMissing));
            }
            Err(e) => return Err(e.into()),
        };

        let Some(updated) = self.replace_block(&content, post) else {
            info!(
                "Markers not found; leaving {} unchanged.",
                self.path.display()
            );
            return Ok(PatchOutcome::NotPerformed(SkipReason::MarkersMissing));
        };

        if updated == content {
            info!("No visible change.");
            return Ok(PatchOutcome::NotPerformed(SkipReason::Unchanged));
        }

        write_atomically(&self.path, &updated)?;
        info!("{} updated.", self.path.display());
        Ok(PatchOutcome::Performed)
    }
}

/// Writes through a sibling temp file and renames it over `path`, so readers
/// only ever see the old or the new document.
fn write_atomically(path: &Path, content: &str) -> Result<(), CoreError> {
    let write_failed = |reason: String| DocumentError::WriteFailed {
        path: path.display().to_string(),
        reason,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let permissions = fs::metadata(path)?.permissions();

    let mut file = NamedTempFile::new_in(dir).map_err(|e| write_failed(e.to_string()))?;
    file.write_all(content.as_bytes())
        .and_then(|_| file.as_file().sync_all())
        .and_then(|_| file.as_file().set_permissions(permissions))
        .map_err(|e| write_failed(e.to_string()))?;
    file.persist(path)
        .map_err(|e| write_failed(e.error.to_string()))?;

    debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}
