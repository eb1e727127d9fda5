use log::{debug, warn};

use crate::error::{PipelensError, Result};
use crate::store::{Build, BuildStore, Job};

/// Matches builds across jobs by their recorded trigger causation.
pub struct BuildCausalityResolver<'s, S: BuildStore + ?Sized> {
    store: &'s S,
    max_scan_depth: Option<usize>,
}

impl<'s, S: BuildStore + ?Sized> BuildCausalityResolver<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            max_scan_depth: None,
        }
    }

    /// Limits how many of a downstream job's newest builds are scanned.
    ///
    /// A pipeline that was stopped early never produces a matching downstream build,
    /// so an unbounded scan reads the whole history every time. `None` scans it all.
    #[must_use]
    pub fn with_max_scan_depth(mut self, depth: Option<usize>) -> Self {
        self.max_scan_depth = depth;
        self
    }

    /// Finds the build of `downstream_job` triggered by exactly `upstream_build`.
    ///
    /// Returns `Ok(None)` when no build matches, meaning the downstream job has not
    /// run yet for this pipeline instance. If the history contains several matching
    /// builds the first one returned by the store wins.
    ///
    /// # Errors
    ///
    /// Returns [`PipelensError::LookupFailed`] if the downstream history cannot be read.
    pub fn resolve_downstream_build(
        &self,
        upstream_build: &Build,
        downstream_job: &Job,
    ) -> Result<Option<Build>> {
        let history = self.store.builds_of(downstream_job)?;
        let depth = self.max_scan_depth.unwrap_or(usize::MAX);

        let found = history
            .into_iter()
            .take(depth)
            .find(|candidate| candidate.was_caused_by(upstream_build));

        match &found {
            Some(build) => debug!("{upstream_build} triggered {build}"),
            None => debug!(
                "No build of {} triggered by {upstream_build}",
                downstream_job.name
            ),
        }

        Ok(found)
    }

    /// Lists `top_build` followed by every build it transitively caused.
    ///
    /// The list is pre-order and depth-first, visiting downstream jobs in declaration
    /// order. Jobs whose history cannot be read are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`PipelensError::Configuration`] if the causation records loop back to
    /// a build already on the current path.
    pub fn resolve_full_downstream_chain(&self, top_build: &Build) -> Result<Vec<Build>> {
        let mut chain = Vec::new();
        let mut path = Vec::new();
        self.collect_chain(top_build, &mut path, &mut chain)?;
        Ok(chain)
    }

    fn collect_chain(
        &self,
        build: &Build,
        path: &mut Vec<(String, u32)>,
        chain: &mut Vec<Build>,
    ) -> Result<()> {
        let key = (build.job.clone(), build.number);
        if path.contains(&key) {
            return Err(PipelensError::Configuration(format!(
                "causation cycle through {build}"
            )));
        }

        chain.push(build.clone());
        path.push(key);

        let downstream_jobs = self
            .store
            .job(&build.job)
            .and_then(|job| self.store.downstream_jobs_of(&job))
            .unwrap_or_else(|e| {
                warn!("Cannot list downstream jobs of {}: {e}", build.job);
                Vec::new()
            });

        for downstream_job in &downstream_jobs {
            match self.resolve_downstream_build(build, downstream_job) {
                Ok(Some(downstream_build)) => {
                    self.collect_chain(&downstream_build, path, chain)?;
                }
                Ok(None) => {}
                Err(e) => warn!(
                    "Skipping {} while resolving chain of {build}: {e}",
                    downstream_job.name
                ),
            }
        }

        path.pop();
        Ok(())
    }
}
