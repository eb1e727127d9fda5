use log::warn;
use serde::{Deserialize, Serialize};

use crate::store::{Build, BuildResult, BuildStore, Job};

/// Display status of a pipeline node.
///
/// The first six states mirror a real build. `Pending` and `Manual` only ever
/// describe a node whose build does not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStatus {
    Building,
    Success,
    Unstable,
    Failure,
    NotBuilt,
    Aborted,
    Pending,
    Manual,
}

impl PipelineStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Building => "BUILDING",
            Self::Success => "SUCCESS",
            Self::Unstable => "UNSTABLE",
            Self::Failure => "FAILURE",
            Self::NotBuilt => "NOT_BUILT",
            Self::Aborted => "ABORTED",
            Self::Pending => "PENDING",
            Self::Manual => "MANUAL",
        }
    }

    /// Status of an existing build.
    pub fn of_build(build: &Build) -> Self {
        match build.result() {
            _ if build.building => Self::Building,
            None => Self::Building,
            Some(result) => result.into(),
        }
    }
}

impl From<BuildResult> for PipelineStatus {
    fn from(result: BuildResult) -> Self {
        match result {
            BuildResult::Success => Self::Success,
            BuildResult::Unstable => Self::Unstable,
            BuildResult::Failure => Self::Failure,
            BuildResult::NotBuilt => Self::NotBuilt,
            BuildResult::Aborted => Self::Aborted,
        }
    }
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a node knows about the node directly upstream of it.
#[derive(Debug, Clone, Copy)]
pub struct Upstream<'a> {
    pub job: &'a Job,
    pub build: Option<&'a Build>,
    pub status: PipelineStatus,
}

/// Derives the display status of a node for `job`.
///
/// An existing build reports its own state. A missing build is `Manual` only when
/// its upstream build exists, succeeded, and the edge between the two jobs needs
/// manual promotion; otherwise it is `Pending`. The upstream status is taken as
/// already derived, so the chain of upstream nodes is evaluated once per traversal.
///
/// A failed manual-edge lookup counts as an automatic edge.
pub fn derive_status<S: BuildStore + ?Sized>(
    store: &S,
    job: &Job,
    build: Option<&Build>,
    upstream: Option<&Upstream<'_>>,
) -> PipelineStatus {
    if let Some(build) = build {
        return PipelineStatus::of_build(build);
    }

    let Some(upstream) = upstream else {
        return PipelineStatus::Pending;
    };

    if upstream.build.is_none() || upstream.status != PipelineStatus::Success {
        return PipelineStatus::Pending;
    }

    match store.is_manual_edge(upstream.job, job) {
        Ok(true) => PipelineStatus::Manual,
        Ok(false) => PipelineStatus::Pending,
        Err(e) => {
            warn!(
                "Cannot read trigger edge {} -> {}: {e}",
                upstream.job.name, job.name
            );
            PipelineStatus::Pending
        }
    }
}

/// Percent complete of a running build, capped at 100.
///
/// A build with no usable estimate, or one that has run past its estimate, reports 100.
pub fn progress_percent(elapsed_ms: i64, estimated_duration_ms: Option<i64>) -> u8 {
    let Some(estimate) = estimated_duration_ms.filter(|&estimate| estimate > 0) else {
        return 100;
    };

    let elapsed = elapsed_ms.max(0);
    if elapsed >= estimate {
        return 100;
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let percent = (100.0 * elapsed as f64 / estimate as f64).round() as u8;
    percent.min(100)
}
