use serde::{Deserialize, Serialize};

pub mod director;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentSnapshot {
    pub name: String,
    pub errands: Vec<Errand>,
    pub instances: Vec<Instance>,
    pub releases: Vec<Release>,
    pub stemcells: Vec<Stemcell>,
}

impl DeploymentSnapshot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Errand {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stemcell {
    pub name: String,
    pub version: String,
    pub os_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub agent_id: String,
    /// Job name
    pub name: String,
    pub id: String,
    pub bootstrap: bool,
    pub ips: Vec<String>,
    pub az: String,
    pub vm_type: String,
    pub resource_pool: String,
    pub resurrection_paused: bool,
    pub healthy: bool,
    /// Decimal form of the instance index, `None` when the director reports none
    pub index: Option<String>,
    pub processes: Vec<Process>,
    pub vitals: Vitals,
}

/// Instance vitals, kept in the string form the director reports them in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    pub cpu: Cpu,
    pub mem: Mem,
    pub swap: Mem,
    pub uptime: Option<u64>,
    /// 1, 5 and 15 minute load averages
    pub load: Vec<String>,
    pub system_disk: Disk,
    pub ephemeral_disk: Disk,
    pub persistent_disk: Disk,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cpu {
    pub sys: String,
    pub user: String,
    pub wait: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mem {
    pub kb: String,
    pub percent: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disk {
    pub inode_percent: String,
    pub percent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    pub name: String,
    pub uptime: Option<u64>,
    pub healthy: bool,
    pub cpu: ProcessCpu,
    pub mem: ProcessMem,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessCpu {
    pub total: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessMem {
    pub kb: Option<u64>,
    pub percent: Option<f64>,
}

/// Snapshots gathered during one collection cycle. Iteration order is
/// unspecified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionResult(Vec<DeploymentSnapshot>);

impl CollectionResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub fn push(&mut self, snapshot: DeploymentSnapshot) {
        self.0.push(snapshot);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DeploymentSnapshot> {
        self.0.iter()
    }

    pub fn get(&self, name: &str) -> Option<&DeploymentSnapshot> {
        self.0.iter().find(|snapshot| snapshot.name == name)
    }

    pub fn instance_count(&self) -> usize {
        self.0.iter().map(|snapshot| snapshot.instances.len()).sum()
    }

    pub fn unhealthy_instance_count(&self) -> usize {
        self.0
            .iter()
            .flat_map(|snapshot| snapshot.instances.iter())
            .filter(|instance| !instance.healthy)
            .count()
    }

    /// Sorts snapshots by deployment name, for callers that need a stable order.
    pub fn sort_by_name(&mut self) {
        self.0.sort_by(|a, b| a.name.cmp(&b.name));
    }

    pub fn into_inner(self) -> Vec<DeploymentSnapshot> {
        self.0
    }
}

impl FromIterator<DeploymentSnapshot> for CollectionResult {
    fn from_iter<I: IntoIterator<Item = DeploymentSnapshot>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for CollectionResult {
    type Item = DeploymentSnapshot;
    type IntoIter = std::vec::IntoIter<DeploymentSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a CollectionResult {
    type Item = &'a DeploymentSnapshot;
    type IntoIter = std::slice::Iter<'a, DeploymentSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
