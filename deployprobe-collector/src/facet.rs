//! Per-deployment facet readers. Each one issues a single director call and
//! maps the returned records into snapshot types.

use deployprobe_proto::{
    Cpu, DeploymentSnapshot, Disk, Errand, Instance, Mem, Process, ProcessCpu, ProcessMem,
    Release, Stemcell, Vitals,
    director::{DiskRecord, InstanceInfo, MemRecord, ProcessRecord, VitalsRecord},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    FetchError,
    director::{Deployment, DirectorError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facet {
    Errands,
    Instances,
    Releases,
    Stemcells,
}

impl std::fmt::Display for Facet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Facet::Errands => "Errands",
            Facet::Instances => "Instances",
            Facet::Releases => "Releases",
            Facet::Stemcells => "Stemcells",
        };
        f.write_str(name)
    }
}

/// Reads all four facets in order, stopping at the first failure.
pub async fn deployment_snapshot<D: Deployment>(
    deployment: &D,
) -> Result<DeploymentSnapshot, FetchError> {
    let mut snapshot = DeploymentSnapshot::new(deployment.name());
    snapshot.errands = errands(deployment).await?;
    snapshot.instances = instances(deployment).await?;
    snapshot.releases = releases(deployment).await?;
    snapshot.stemcells = stemcells(deployment).await?;
    Ok(snapshot)
}

pub async fn errands<D: Deployment>(deployment: &D) -> Result<Vec<Errand>, FetchError> {
    debug!("reading Errands for deployment `{}`", deployment.name());
    let errands = deployment
        .errands()
        .await
        .map_err(|source| facet_error(Facet::Errands, deployment, source))?;

    Ok(errands
        .into_iter()
        .map(|errand| Errand { name: errand.name })
        .collect())
}

pub async fn instances<D: Deployment>(deployment: &D) -> Result<Vec<Instance>, FetchError> {
    debug!("reading Instances for deployment `{}`", deployment.name());
    let instances = deployment
        .instance_infos()
        .await
        .map_err(|source| facet_error(Facet::Instances, deployment, source))?;

    // slots without a VM are placeholders, not instances
    Ok(instances
        .into_iter()
        .filter(InstanceInfo::has_vm)
        .map(map_instance)
        .collect())
}

pub async fn releases<D: Deployment>(deployment: &D) -> Result<Vec<Release>, FetchError> {
    debug!("reading Releases for deployment `{}`", deployment.name());
    let releases = deployment
        .releases()
        .await
        .map_err(|source| facet_error(Facet::Releases, deployment, source))?;

    Ok(releases
        .into_iter()
        .map(|release| Release {
            version: release.version.to_string(),
            name: release.name,
        })
        .collect())
}

pub async fn stemcells<D: Deployment>(deployment: &D) -> Result<Vec<Stemcell>, FetchError> {
    debug!("reading Stemcells for deployment `{}`", deployment.name());
    let stemcells = deployment
        .stemcells()
        .await
        .map_err(|source| facet_error(Facet::Stemcells, deployment, source))?;

    Ok(stemcells
        .into_iter()
        .map(|stemcell| Stemcell {
            version: stemcell.version.to_string(),
            name: stemcell.name,
            os_name: stemcell.os_name,
        })
        .collect())
}

fn facet_error<D: Deployment>(
    facet: Facet,
    deployment: &D,
    source: DirectorError,
) -> FetchError {
    FetchError::Facet {
        facet,
        deployment: deployment.name().to_owned(),
        source,
    }
}

fn map_instance(info: InstanceInfo) -> Instance {
    let healthy = info.is_running();
    let vitals = map_vitals(&info.vitals);

    Instance {
        agent_id: info.agent_id,
        name: info.job_name,
        id: info.id,
        bootstrap: info.bootstrap,
        ips: info.ips,
        az: info.az,
        vm_type: info.vm_type,
        resource_pool: info.resource_pool,
        resurrection_paused: info.resurrection_paused,
        healthy,
        index: info.index.map(|index| index.to_string()),
        processes: info.processes.into_iter().map(map_process).collect(),
        vitals,
    }
}

fn map_vitals(vitals: &VitalsRecord) -> Vitals {
    Vitals {
        cpu: Cpu {
            sys: vitals.cpu.sys.clone(),
            user: vitals.cpu.user.clone(),
            wait: vitals.cpu.wait.clone(),
        },
        mem: map_mem(&vitals.mem),
        swap: map_mem(&vitals.swap),
        uptime: vitals.uptime,
        load: vitals.load.clone(),
        system_disk: map_disk(vitals.system_disk()),
        ephemeral_disk: map_disk(vitals.ephemeral_disk()),
        persistent_disk: map_disk(vitals.persistent_disk()),
    }
}

fn map_mem(mem: &MemRecord) -> Mem {
    Mem {
        kb: mem.kb.clone(),
        percent: mem.percent.clone(),
    }
}

fn map_disk(disk: DiskRecord) -> Disk {
    Disk {
        inode_percent: disk.inode_percent,
        percent: disk.percent,
    }
}

fn map_process(process: ProcessRecord) -> Process {
    Process {
        healthy: process.is_running(),
        uptime: process.uptime,
        cpu: ProcessCpu {
            total: process.cpu_total,
        },
        mem: ProcessMem {
            kb: process.mem_kb,
            percent: process.mem_percent,
        },
        name: process.name,
    }
}
