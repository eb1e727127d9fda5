use log::{debug, warn};
use serde::Serialize;

use super::status::PipelineStatus;
use crate::store::{BuildResult, BuildStore, Job};

/// A job in the static pipeline definition, with a summary of its latest builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectNode {
    pub name: String,
    /// Status of the newest build, `Pending` if the job never ran
    pub status: PipelineStatus,
    pub last_build: Option<u32>,
    pub last_successful_build: Option<u32>,
    pub downstream: Vec<ProjectNode>,
}

/// Builds the job tree rooted at `root`.
///
/// A downstream job that already appears on the path from the root is left out of
/// that branch instead of being expanded again. Lookup failures leave the affected
/// job without build information or children.
pub fn build_project_tree<S: BuildStore + ?Sized>(store: &S, root: &Job) -> ProjectNode {
    let mut path = vec![root.name.clone()];
    project_node(store, root, &mut path)
}

fn project_node<S: BuildStore + ?Sized>(
    store: &S,
    job: &Job,
    path: &mut Vec<String>,
) -> ProjectNode {
    let builds = store.builds_of(job).unwrap_or_else(|e| {
        warn!("Cannot read build history of {}: {e}", job.name);
        Vec::new()
    });

    let last = builds.first();
    let status = last.map_or(PipelineStatus::Pending, PipelineStatus::of_build);
    let last_successful_build = builds
        .iter()
        .find(|b| !b.building && b.result == Some(BuildResult::Success))
        .map(|b| b.number);

    let downstream_jobs = store.downstream_jobs_of(job).unwrap_or_else(|e| {
        warn!("Cannot list downstream jobs of {}: {e}", job.name);
        Vec::new()
    });

    let mut downstream = Vec::with_capacity(downstream_jobs.len());
    for dependency in &downstream_jobs {
        if path.contains(&dependency.name) {
            debug!(
                "Not expanding {} below {}: already on the path",
                dependency.name, job.name
            );
            continue;
        }
        path.push(dependency.name.clone());
        downstream.push(project_node(store, dependency, path));
        path.pop();
    }

    ProjectNode {
        name: job.name.clone(),
        status,
        last_build: last.map(|b| b.number),
        last_successful_build,
        downstream,
    }
}
