use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

const MASKED_VALUE: &str = "********";

/// A named, buildable unit in the CI server.
///
/// Holds the declared downstream dependency edges in declaration order, plus the
/// subset of those edges that require manual promotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Job {
    /// Unique job name
    pub name: String,
    /// Immediate downstream job names, in declaration order
    #[serde(default)]
    pub downstream: Vec<String>,
    /// Downstream job names whose edge must be triggered by hand
    #[serde(default)]
    pub manual: Vec<String>,
}

impl Job {
    #[cfg(test)]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            downstream: Vec::new(),
            manual: Vec::new(),
        }
    }

    /// Whether the edge from this job to `downstream` is configured as manual.
    ///
    /// Names are compared case-insensitively after trimming, the same way the
    /// trigger configuration lists them. Case folding covers non-ASCII names too.
    pub fn is_manual_edge_to(&self, downstream: &str) -> bool {
        let downstream = downstream.trim().to_lowercase();
        self.manual
            .iter()
            .any(|name| name.trim().to_lowercase() == downstream)
    }
}

/// Final outcome of a finished build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildResult {
    Success,
    Unstable,
    Failure,
    NotBuilt,
    Aborted,
}

/// The upstream build recorded as having triggered a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Causation {
    pub upstream_job: String,
    pub upstream_build: u32,
}

/// One numbered execution of a job, frozen at snapshot time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Build {
    /// Owning job name
    pub job: String,
    /// Build number, unique per job and starting at 1
    pub number: u32,
    /// Outcome once finished; absent while running
    #[serde(default)]
    pub result: Option<BuildResult>,
    /// Whether the build is still in progress
    #[serde(default)]
    pub building: bool,
    /// Upstream build that triggered this one, if any
    #[serde(default)]
    pub cause: Option<Causation>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_ms: Option<i64>,
    #[serde(default)]
    pub estimated_duration_ms: Option<i64>,
    #[serde(default)]
    pub parameters: IndexMap<String, String>,
    /// Parameter names whose values must never be displayed
    #[serde(default)]
    pub sensitive: Vec<String>,
}

impl Build {
    #[cfg(test)]
    pub fn new(job: impl Into<String>, number: u32) -> Self {
        Self {
            job: job.into(),
            number,
            result: None,
            building: false,
            cause: None,
            started_at: None,
            duration_ms: None,
            estimated_duration_ms: None,
            parameters: IndexMap::new(),
            sensitive: Vec::new(),
        }
    }

    pub fn job(&self) -> &str {
        &self.job
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn result(&self) -> Option<BuildResult> {
        self.result
    }

    /// A build without a recorded result has not finished yet.
    pub fn is_running(&self) -> bool {
        self.building || self.result.is_none()
    }

    pub fn causation(&self) -> Option<&Causation> {
        self.cause.as_ref()
    }

    /// Whether this build's causation record names exactly `upstream`.
    pub fn was_caused_by(&self, upstream: &Build) -> bool {
        self.cause.as_ref().is_some_and(|cause| {
            cause.upstream_job == upstream.job && cause.upstream_build == upstream.number
        })
    }

    /// Build parameters with every sensitive value masked.
    pub fn unsensitive_parameters(&self) -> IndexMap<String, String> {
        self.parameters
            .iter()
            .map(|(name, value)| {
                let shown = if self.sensitive.iter().any(|s| s == name) {
                    MASKED_VALUE.to_string()
                } else {
                    value.clone()
                };
                (name.clone(), shown)
            })
            .collect()
    }

    /// Milliseconds since the build started, as of `now`.
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> Option<i64> {
        self.started_at
            .map(|started| (now - started).num_milliseconds().max(0))
    }
}

impl std::fmt::Display for Build {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} #{}", self.job, self.number)
    }
}
