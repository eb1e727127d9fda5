use std::collections::HashSet;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::types::{Build, Job};
use super::BuildStore;
use crate::error::{PipelensError, Result};

/// On-disk layout of a snapshot file.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SnapshotFile {
    #[serde(default)]
    jobs: Vec<Job>,
    #[serde(default)]
    builds: Vec<Build>,
}

/// Frozen snapshot of jobs and builds.
///
/// The job index is built once at load time and never changes afterwards, so every
/// traversal over the same store sees the same graph. Builds are kept per job,
/// newest first.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    jobs: IndexMap<String, Job>,
    builds: IndexMap<String, Vec<Build>>,
}

impl SnapshotStore {
    /// Loads a snapshot from a JSON, YAML or TOML file.
    ///
    /// The format is picked from the file extension. Unknown extensions are tried as
    /// TOML, then JSON, then YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the job graph it
    /// describes is malformed (see [`SnapshotStore::from_parts`]).
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        let file: SnapshotFile = match extension {
            "json" => serde_json::from_str(&contents)?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)?,
            "toml" => toml::from_str(&contents)?,
            _ => match toml::from_str(&contents) {
                Ok(file) => file,
                Err(_) => match serde_json::from_str(&contents) {
                    Ok(file) => file,
                    Err(_) => serde_yaml::from_str(&contents)?,
                },
            },
        };

        debug!("Parsed snapshot from: {}", path.display());

        let store = Self::from_parts(file.jobs, file.builds)?;

        info!(
            "Loaded snapshot with {} jobs and {} builds",
            store.jobs.len(),
            store.builds.values().map(Vec::len).sum::<usize>()
        );

        Ok(store)
    }

    /// Builds a store from already-parsed jobs and builds.
    ///
    /// # Errors
    ///
    /// Returns [`PipelensError::Configuration`] if a job name is declared twice, a
    /// job lists an unknown downstream job, or a build belongs to an unknown job.
    pub fn from_parts(jobs: Vec<Job>, builds: Vec<Build>) -> Result<Self> {
        let mut index: IndexMap<String, Job> = IndexMap::with_capacity(jobs.len());

        for job in jobs {
            if index.contains_key(&job.name) {
                return Err(PipelensError::Configuration(format!(
                    "job '{}' is declared more than once",
                    job.name
                )));
            }
            index.insert(job.name.clone(), job);
        }

        for job in index.values() {
            let mut seen = HashSet::new();
            for downstream in &job.downstream {
                if !index.contains_key(downstream) {
                    return Err(PipelensError::Configuration(format!(
                        "job '{}' declares unknown downstream job '{downstream}'",
                        job.name
                    )));
                }
                if !seen.insert(downstream.as_str()) {
                    return Err(PipelensError::Configuration(format!(
                        "job '{}' declares downstream job '{downstream}' more than once",
                        job.name
                    )));
                }
            }
        }

        let mut by_job: IndexMap<String, Vec<Build>> =
            index.keys().map(|name| (name.clone(), Vec::new())).collect();

        for build in builds {
            let Some(history) = by_job.get_mut(&build.job) else {
                return Err(PipelensError::Configuration(format!(
                    "build #{} belongs to unknown job '{}'",
                    build.number, build.job
                )));
            };
            history.push(build);
        }

        // Stable sort keeps file order among duplicate numbers
        for history in by_job.values_mut() {
            history.sort_by(|a, b| b.number.cmp(&a.number));
        }

        Ok(Self {
            jobs: index,
            builds: by_job,
        })
    }
}

impl BuildStore for SnapshotStore {
    fn job(&self, name: &str) -> Result<Job> {
        self.jobs
            .get(name)
            .cloned()
            .ok_or_else(|| PipelensError::UnknownJob(name.to_string()))
    }

    fn jobs(&self) -> Vec<Job> {
        self.jobs.values().cloned().collect()
    }

    fn downstream_jobs_of(&self, job: &Job) -> Result<Vec<Job>> {
        let job = self.jobs.get(&job.name).ok_or_else(|| PipelensError::LookupFailed {
            job: job.name.clone(),
            reason: "job is not part of the snapshot".to_string(),
        })?;

        job.downstream.iter().map(|name| self.job(name)).collect()
    }

    fn is_manual_edge(&self, upstream: &Job, downstream: &Job) -> Result<bool> {
        let upstream = self.jobs.get(&upstream.name).ok_or_else(|| PipelensError::LookupFailed {
            job: upstream.name.clone(),
            reason: "job is not part of the snapshot".to_string(),
        })?;

        Ok(upstream.is_manual_edge_to(&downstream.name))
    }

    fn builds_of(&self, job: &Job) -> Result<Vec<Build>> {
        self.builds
            .get(&job.name)
            .cloned()
            .ok_or_else(|| PipelensError::LookupFailed {
                job: job.name.clone(),
                reason: "job is not part of the snapshot".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{BuildResult, Causation};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_job(name: &str, downstream: &[&str]) -> Job {
        Job {
            name: name.to_string(),
            downstream: downstream.iter().map(ToString::to_string).collect(),
            manual: vec![],
        }
    }

    #[test]
    fn test_builds_are_newest_first() {
        let store = SnapshotStore::from_parts(
            vec![create_job("build", &[])],
            vec![
                Build::new("build", 1),
                Build::new("build", 3),
                Build::new("build", 2),
            ],
        )
        .unwrap();

        let job = store.job("build").unwrap();
        let numbers: Vec<u32> = store
            .builds_of(&job)
            .unwrap()
            .iter()
            .map(Build::number)
            .collect();
        assert_eq!(numbers, vec![3, 2, 1]);
    }

    #[test]
    fn test_downstream_keeps_declaration_order() {
        let store = SnapshotStore::from_parts(
            vec![
                create_job("build", &["test", "lint", "docs"]),
                create_job("test", &[]),
                create_job("lint", &[]),
                create_job("docs", &[]),
            ],
            vec![],
        )
        .unwrap();

        let build = store.job("build").unwrap();
        let names: Vec<String> = store
            .downstream_jobs_of(&build)
            .unwrap()
            .into_iter()
            .map(|job| job.name)
            .collect();
        assert_eq!(names, vec!["test", "lint", "docs"]);
    }

    #[test]
    fn test_unknown_downstream_is_configuration_error() {
        let result = SnapshotStore::from_parts(vec![create_job("build", &["missing"])], vec![]);
        assert!(matches!(result, Err(PipelensError::Configuration(_))));
    }

    #[test]
    fn test_duplicate_job_is_configuration_error() {
        let result = SnapshotStore::from_parts(
            vec![create_job("build", &[]), create_job("build", &[])],
            vec![],
        );
        assert!(matches!(result, Err(PipelensError::Configuration(_))));
    }

    #[test]
    fn test_build_for_unknown_job_is_configuration_error() {
        let result =
            SnapshotStore::from_parts(vec![create_job("build", &[])], vec![Build::new("x", 1)]);
        assert!(matches!(result, Err(PipelensError::Configuration(_))));
    }

    #[test]
    fn test_unknown_job_lookup() {
        let store = SnapshotStore::default();
        assert!(matches!(
            store.job("nope"),
            Err(PipelensError::UnknownJob(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_load_json_snapshot() {
        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        let json_content = r#"{
  "jobs": [
    { "name": "build", "downstream": ["deploy"], "manual": ["deploy"] },
    { "name": "deploy" }
  ],
  "builds": [
    { "job": "build", "number": 1, "result": "SUCCESS", "started-at": "2024-05-01T10:00:00Z" },
    { "job": "deploy", "number": 4, "building": true,
      "cause": { "upstream-job": "build", "upstream-build": 1 } }
  ]
}"#;
        write!(temp_file, "{json_content}").unwrap();

        let store = SnapshotStore::load(temp_file.path()).unwrap();
        let build = store.job("build").unwrap();
        let deploy = store.job("deploy").unwrap();

        assert!(store.is_manual_edge(&build, &deploy).unwrap());
        assert!(!store.is_manual_edge(&deploy, &build).unwrap());

        let builds = store.builds_of(&build).unwrap();
        assert_eq!(builds[0].result, Some(BuildResult::Success));
        assert!(builds[0].started_at.is_some());

        let deploys = store.builds_of(&deploy).unwrap();
        assert!(deploys[0].building);
        assert_eq!(
            deploys[0].cause,
            Some(Causation {
                upstream_job: "build".to_string(),
                upstream_build: 1,
            })
        );
    }

    #[test]
    fn test_load_yaml_snapshot() {
        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        let yaml_content = r"
jobs:
  - name: compile
    downstream: [package]
  - name: package
builds:
  - job: compile
    number: 2
    result: UNSTABLE
";
        write!(temp_file, "{yaml_content}").unwrap();

        let store = SnapshotStore::load(temp_file.path()).unwrap();
        assert_eq!(store.jobs().len(), 2);

        let compile = store.job("compile").unwrap();
        assert_eq!(
            store.builds_of(&compile).unwrap()[0].result,
            Some(BuildResult::Unstable)
        );
    }

    #[test]
    fn test_load_toml_snapshot_without_extension() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let toml_content = r#"
[[jobs]]
name = "compile"

[[builds]]
job = "compile"
number = 7
result = "FAILURE"
"#;
        write!(temp_file, "{toml_content}").unwrap();

        let store = SnapshotStore::load(temp_file.path()).unwrap();
        let compile = store.job("compile").unwrap();
        assert_eq!(store.builds_of(&compile).unwrap()[0].number, 7);
    }

    #[test]
    fn test_load_missing_file() {
        let result = SnapshotStore::load(Path::new("does-not-exist.json"));
        assert!(matches!(result, Err(PipelensError::Io(_))));
    }
}
