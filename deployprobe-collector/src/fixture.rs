//! File-backed director.
//!
//! Serves deployments from a JSON document instead of a live director, with
//! optional per-call latency and injected failures:
//!
//! ```json
//! {
//!   "deployments": [
//!     { "name": "cf", "latency_ms": 150, "fail": ["stemcells"], "errands": [{ "name": "smoke-tests" }] }
//!   ]
//! }
//! ```

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use deployprobe_proto::director::{ErrandRecord, InstanceInfo, ReleaseRecord, StemcellRecord};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    director::{Deployment, Director, DirectorError},
    facet::Facet,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentFixture {
    pub name: String,
    /// Delay applied to every director call for this deployment
    pub latency_ms: u64,
    /// Facets whose director call fails
    pub fail: Vec<Facet>,
    pub errands: Vec<ErrandRecord>,
    pub instances: Vec<InstanceInfo>,
    pub releases: Vec<ReleaseRecord>,
    pub stemcells: Vec<StemcellRecord>,
}

#[derive(Debug, Deserialize)]
struct FixtureFile {
    deployments: Vec<DeploymentFixture>,
}

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("failed to read fixture `{path}`: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid fixture: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate deployment `{0}` in fixture")]
    DuplicateDeployment(String),
}

#[derive(Debug, Clone, Default)]
pub struct StaticDirector {
    deployments: Vec<Arc<DeploymentFixture>>,
}

impl StaticDirector {
    pub fn new(
        deployments: impl IntoIterator<Item = DeploymentFixture>,
    ) -> Result<Self, FixtureError> {
        let mut seen = HashSet::new();
        let deployments = deployments
            .into_iter()
            .map(|fixture| {
                if seen.insert(fixture.name.clone()) {
                    Ok(Arc::new(fixture))
                } else {
                    Err(FixtureError::DuplicateDeployment(fixture.name))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { deployments })
    }

    pub fn from_json(json: &str) -> Result<Self, FixtureError> {
        let file: FixtureFile = serde_json::from_str(json)?;
        Self::new(file.deployments)
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| FixtureError::Io {
                path: path.to_owned(),
                source,
            })?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.deployments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deployments.is_empty()
    }
}

impl Director for StaticDirector {
    type Deployment = StaticDeployment;

    async fn deployments(&self) -> Result<Vec<StaticDeployment>, DirectorError> {
        Ok(self
            .deployments
            .iter()
            .cloned()
            .map(StaticDeployment::from_shared)
            .collect())
    }

    async fn find_deployment(&self, name: &str) -> Result<StaticDeployment, DirectorError> {
        self.deployments
            .iter()
            .find(|fixture| fixture.name == name)
            .cloned()
            .map(StaticDeployment::from_shared)
            .ok_or_else(|| DirectorError::DeploymentNotFound(name.to_owned()))
    }
}

/// Handle onto one fixture deployment. Records which facets were requested
/// through it.
#[derive(Debug, Clone)]
pub struct StaticDeployment {
    fixture: Arc<DeploymentFixture>,
    calls: Arc<Mutex<Vec<Facet>>>,
}

impl StaticDeployment {
    pub fn new(fixture: DeploymentFixture) -> Self {
        Self::from_shared(Arc::new(fixture))
    }

    fn from_shared(fixture: Arc<DeploymentFixture>) -> Self {
        Self {
            fixture,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Facets requested through this handle, in call order
    pub fn calls(&self) -> Vec<Facet> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn call<T: Clone + Sync>(
        &self,
        facet: Facet,
        records: &[T],
    ) -> Result<Vec<T>, DirectorError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(facet);

        if self.fixture.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.fixture.latency_ms)).await;
        }

        if self.fixture.fail.contains(&facet) {
            trace!(deployment = %self.fixture.name, %facet, "injecting failure");
            return Err(DirectorError::Request(format!(
                "simulated {facet} failure"
            )));
        }

        Ok(records.to_vec())
    }
}

impl Deployment for StaticDeployment {
    fn name(&self) -> &str {
        &self.fixture.name
    }

    async fn errands(&self) -> Result<Vec<ErrandRecord>, DirectorError> {
        self.call(Facet::Errands, &self.fixture.errands).await
    }

    async fn instance_infos(&self) -> Result<Vec<InstanceInfo>, DirectorError> {
        self.call(Facet::Instances, &self.fixture.instances).await
    }

    async fn releases(&self) -> Result<Vec<ReleaseRecord>, DirectorError> {
        self.call(Facet::Releases, &self.fixture.releases).await
    }

    async fn stemcells(&self) -> Result<Vec<StemcellRecord>, DirectorError> {
        self.call(Facet::Stemcells, &self.fixture.stemcells).await
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use deployprobe_proto::director::{InstanceInfo, ProcessRecord, StemcellRecord};

    use super::DeploymentFixture;

    pub fn sample_instance(job: &str, id: &str) -> InstanceInfo {
        InstanceInfo {
            agent_id: format!("agent-{id}"),
            job_name: job.to_owned(),
            id: id.to_owned(),
            index: Some(0),
            ips: vec!["10.0.16.5".to_owned()],
            az: "z1".to_owned(),
            vm_id: format!("vm-{id}"),
            vm_type: "small".to_owned(),
            process_state: "running".to_owned(),
            processes: vec![ProcessRecord {
                name: job.to_owned(),
                state: "running".to_owned(),
                uptime: Some(120),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    pub fn sample_deployment(name: &str) -> DeploymentFixture {
        DeploymentFixture {
            name: name.to_owned(),
            instances: vec![
                sample_instance("router", &format!("{name}-r-0")),
                sample_instance("api", &format!("{name}-a-0")),
            ],
            stemcells: vec![StemcellRecord {
                name: "bosh-warden-boshlite-ubuntu-jammy-go_agent".to_owned(),
                version: "1.423".into(),
                os_name: "ubuntu-jammy".to_owned(),
            }],
            ..Default::default()
        }
    }
}
