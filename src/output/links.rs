use url::Url;

use crate::pipeline::PipelineNode;

/// Web URL of a build, e.g. <https://ci.example.com/job/deploy/12/>.
///
/// Path segments are percent-encoded, so job names may contain spaces.
pub fn build_url(base_url: &Url, job: &str, number: u32) -> String {
    with_segments(base_url, &["job", job, &number.to_string()])
}

/// Web URL of a job, e.g. <https://ci.example.com/job/deploy/>.
pub fn job_url(base_url: &Url, job: &str) -> String {
    with_segments(base_url, &["job", job])
}

/// Links a node to its build, or to its job while the build is pending.
pub fn node_url(base_url: &Url, node: &PipelineNode) -> String {
    match node.build_number() {
        Some(number) => build_url(base_url, node.job_name(), number),
        None => job_url(base_url, node.job_name()),
    }
}

fn with_segments(base_url: &Url, segments: &[&str]) -> String {
    let mut url = base_url.clone();
    // Cannot-be-a-base URLs such as `mailto:` are returned unchanged
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments).push("");
    }
    url.to_string()
}
