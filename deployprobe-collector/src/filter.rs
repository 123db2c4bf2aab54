use std::future::Future;

use tracing::debug;

use crate::director::{Deployment, Director, DirectorError};

/// Supplies the deployments eligible for a collection cycle.
pub trait DeploymentSource: Send + Sync {
    type Deployment: Deployment;

    fn get_deployments(
        &self,
    ) -> impl Future<Output = Result<Vec<Self::Deployment>, DirectorError>> + Send;
}

/// Restricts collection to a fixed set of deployment names. With no names
/// configured every deployment the director knows about is eligible.
#[derive(Debug, Clone)]
pub struct DeploymentsFilter<D> {
    director: D,
    names: Vec<String>,
}

impl<D: Director> DeploymentsFilter<D> {
    pub fn new<I, S>(director: D, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filtered: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if !name.is_empty() && !filtered.iter().any(|n| n == name) {
                filtered.push(name.to_owned());
            }
        }

        Self {
            director,
            names: filtered,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl<D: Director> DeploymentSource for DeploymentsFilter<D> {
    type Deployment = D::Deployment;

    async fn get_deployments(&self) -> Result<Vec<D::Deployment>, DirectorError> {
        if self.names.is_empty() {
            debug!("reading all deployments");
            return self.director.deployments().await;
        }

        let mut deployments = Vec::with_capacity(self.names.len());
        for name in &self.names {
            debug!("reading deployment `{name}`");
            deployments.push(self.director.find_deployment(name).await?);
        }
        Ok(deployments)
    }
}
