//! Capabilities the collector needs from the director.
//!
//! Each method on [`Deployment`] is one remote round-trip. Implementations
//! own transport and authentication; the collector only sees records.

use std::future::Future;

use deployprobe_proto::director::{ErrandRecord, InstanceInfo, ReleaseRecord, StemcellRecord};

pub trait Deployment: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn errands(&self) -> impl Future<Output = Result<Vec<ErrandRecord>, DirectorError>> + Send;

    fn instance_infos(
        &self,
    ) -> impl Future<Output = Result<Vec<InstanceInfo>, DirectorError>> + Send;

    fn releases(&self) -> impl Future<Output = Result<Vec<ReleaseRecord>, DirectorError>> + Send;

    fn stemcells(
        &self,
    ) -> impl Future<Output = Result<Vec<StemcellRecord>, DirectorError>> + Send;
}

pub trait Director: Send + Sync {
    type Deployment: Deployment;

    /// Every deployment the director manages
    fn deployments(
        &self,
    ) -> impl Future<Output = Result<Vec<Self::Deployment>, DirectorError>> + Send;

    fn find_deployment(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Self::Deployment, DirectorError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectorError {
    #[error("deployment `{0}` not found")]
    DeploymentNotFound(String),
    #[error("director request failed: {0}")]
    Request(String),
}
