use crate::{director::DirectorError, facet::Facet};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Error while listing deployments: {0}")]
    Listing(#[source] DirectorError),
    #[error("Error while reading {facet} for deployment `{deployment}`: {source}")]
    Facet {
        facet: Facet,
        deployment: String,
        #[source]
        source: DirectorError,
    },
    #[error("Collection task for deployment `{deployment}` failed: {reason}")]
    Task { deployment: String, reason: String },
}

impl FetchError {
    /// Deployment the error originated from, if any
    pub fn deployment(&self) -> Option<&str> {
        match self {
            FetchError::Listing(_) => None,
            FetchError::Facet { deployment, .. } | FetchError::Task { deployment, .. } => {
                Some(deployment)
            }
        }
    }
}
