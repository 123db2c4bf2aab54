//! Records as the director reports them, before they are mapped into snapshots.

use std::{collections::HashMap, convert::Infallible, str::FromStr};

use serde::{Deserialize, Serialize};

const RUNNING_STATE: &str = "running";

pub const SYSTEM_DISK: &str = "system";
pub const EPHEMERAL_DISK: &str = "ephemeral";
pub const PERSISTENT_DISK: &str = "persistent";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrandRecord {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    pub name: String,
    pub version: Version,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StemcellRecord {
    pub name: String,
    pub version: Version,
    pub os_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceInfo {
    pub agent_id: String,
    pub job_name: String,
    pub id: String,
    pub index: Option<u32>,
    pub bootstrap: bool,
    pub ips: Vec<String>,
    pub az: String,
    /// Empty when no VM has been assigned to the instance slot
    pub vm_id: String,
    pub vm_type: String,
    pub resource_pool: String,
    pub resurrection_paused: bool,
    pub process_state: String,
    pub processes: Vec<ProcessRecord>,
    pub vitals: VitalsRecord,
}

impl InstanceInfo {
    pub fn has_vm(&self) -> bool {
        !self.vm_id.is_empty()
    }

    pub fn is_running(&self) -> bool {
        self.process_state == RUNNING_STATE
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessRecord {
    pub name: String,
    pub state: String,
    pub uptime: Option<u64>,
    pub cpu_total: Option<f64>,
    pub mem_kb: Option<u64>,
    pub mem_percent: Option<f64>,
}

impl ProcessRecord {
    pub fn is_running(&self) -> bool {
        self.state == RUNNING_STATE
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VitalsRecord {
    pub cpu: CpuRecord,
    pub mem: MemRecord,
    pub swap: MemRecord,
    pub uptime: Option<u64>,
    pub load: Vec<String>,
    /// Keyed by `system`, `ephemeral` and `persistent`
    pub disk: HashMap<String, DiskRecord>,
}

impl VitalsRecord {
    pub fn system_disk(&self) -> DiskRecord {
        self.disk_or_default(SYSTEM_DISK)
    }

    pub fn ephemeral_disk(&self) -> DiskRecord {
        self.disk_or_default(EPHEMERAL_DISK)
    }

    pub fn persistent_disk(&self) -> DiskRecord {
        self.disk_or_default(PERSISTENT_DISK)
    }

    fn disk_or_default(&self, key: &str) -> DiskRecord {
        self.disk.get(key).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuRecord {
    pub sys: String,
    pub user: String,
    pub wait: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemRecord {
    pub kb: String,
    pub percent: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskRecord {
    pub inode_percent: String,
    pub percent: String,
}

/// Release or stemcell version, e.g. `3586.25` or `1.2.0-dev.4`.
#[derive(PartialEq, Eq, Hash, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Version({})", self.0)
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Version {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Version(s.trim().to_owned()))
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Version(s.trim().to_owned())
    }
}
