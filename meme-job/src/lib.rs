use meme_core::{AppConfig, CoreError, ErrorReporter};
use readme_patcher::{PatchOutcome, ReadmePatcher, SkipReason};
use reddit_client::{select_image_post, PostFeed, RedditClient};
use std::fmt;
use std::process::ExitCode;
use tracing::{error, info, info_span, Instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Startup,
    AcquiringToken,
    FetchingListing,
    Selecting,
    Patching,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            JobStage::Startup => "startup",
            JobStage::AcquiringToken => "acquiring token",
            JobStage::FetchingListing => "fetching listing",
            JobStage::Selecting => "selecting",
            JobStage::Patching => "patching",
        };
        f.write_str(stage)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipCause {
    NoEligiblePost,
    Patch(SkipReason),
}

#[derive(Debug)]
pub enum RunOutcome {
    Updated,
    Skipped(SkipCause),
    Failed { stage: JobStage, error: CoreError },
}

impl RunOutcome {
    /// Every outcome maps to success, failures included.
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::SUCCESS
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RunOutcome::Failed { .. })
    }
}

pub struct MemeJob<F> {
    feed: F,
    patcher: ReadmePatcher,
    reporter: ErrorReporter,
}

impl MemeJob<RedditClient> {
    pub fn from_config(config: &AppConfig) -> Result<Self, CoreError> {
        let feed = RedditClient::new(config)?;
        let patcher = ReadmePatcher::from_settings(&config.settings)?;
        Ok(Self::new(feed, patcher))
    }
}

impl<F: PostFeed> MemeJob<F> {
    pub fn new(feed: F, patcher: ReadmePatcher) -> Self {
        Self {
            feed,
            patcher,
            reporter: ErrorReporter::new(),
        }
    }

    /// Runs token → listing → selection → patch once. Never returns an error;
    /// failures are logged and reported as `RunOutcome::Failed`.
    pub async fn run(&self) -> RunOutcome {
        match self.execute().await {
            Ok(outcome) => outcome,
            Err((stage, error)) => fail(&self.reporter, stage, error),
        }
    }

    async fn execute(&self) -> Result<RunOutcome, (JobStage, CoreError)> {
        let at = |stage: JobStage| move |error: CoreError| (stage, error);

        info!("Stage: {}", JobStage::AcquiringToken);
        let access_token = self
            .feed
            .acquire_token()
            .await
            .map_err(at(JobStage::AcquiringToken))?;

        info!("Stage: {}", JobStage::FetchingListing);
        let listing = self
            .feed
            .fetch_listing(&access_token)
            .await
            .map_err(at(JobStage::FetchingListing))?;

        info!("Stage: {}", JobStage::Selecting);
        let Some(selection) = select_image_post(&listing) else {
            info!("No suitable image found; keeping existing content.");
            return Ok(RunOutcome::Skipped(SkipCause::NoEligiblePost));
        };
        info!(
            "Selected \"{}\" via {} rule: {}",
            selection.post.title, selection.rule, selection.post.image_url
        );

        info!("Stage: {}", JobStage::Patching);
        let outcome = match self
            .patcher
            .patch(&selection.post)
            .map_err(at(JobStage::Patching))?
        {
            PatchOutcome::Performed => RunOutcome::Updated,
            PatchOutcome::NotPerformed(reason) => {
                info!("Document not modified: {}", reason);
                RunOutcome::Skipped(SkipCause::Patch(reason))
            }
        };

        info!("Done");
        Ok(outcome)
    }
}

fn fail(reporter: &ErrorReporter, stage: JobStage, error: CoreError) -> RunOutcome {
    error!("crashed while {}: {}", stage, error);
    reporter.report_error(&error);
    RunOutcome::Failed { stage, error }
}

/// Entry point for the scheduled run: reads configuration from the process
/// environment and runs inside the `updater` span.
pub async fn run_scheduled() -> RunOutcome {
    run_with_lookup(|name| std::env::var(name).ok())
        .instrument(info_span!("updater"))
        .await
}

/// Loads configuration through `lookup`, builds the Reddit-backed job and
/// runs it. Startup failures are reported like any other stage failure.
pub async fn run_with_lookup<L>(lookup: L) -> RunOutcome
where
    L: Fn(&str) -> Option<String>,
{
    let reporter = ErrorReporter::new();
    let config = match AppConfig::from_lookup(lookup) {
        Ok(config) => config,
        Err(e) => return fail(&reporter, JobStage::Startup, e.into()),
    };
    let job = match MemeJob::from_config(&config) {
        Ok(job) => job,
        Err(e) => return fail(&reporter, JobStage::Startup, e),
    };
    job.run().await
}
