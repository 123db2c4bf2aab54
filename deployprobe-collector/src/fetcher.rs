//! Concurrent collection of deployment snapshots.
//!
//! Every deployment handle gets its own task. A task reads the four facets
//! of its deployment in sequence and yields a finished
//! [`DeploymentSnapshot`](deployprobe_proto::DeploymentSnapshot); snapshots
//! are merged by the caller's task as tasks are joined, so nothing is shared
//! between tasks.
//!
//! The first failing task decides the outcome. Remaining tasks are aborted
//! and the error is returned; success is only reported once every task has
//! been joined.

use std::collections::HashMap;

use deployprobe_proto::CollectionResult;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, debug_span};

use crate::{
    FetchError,
    director::Deployment,
    facet,
    filter::DeploymentSource,
};

#[derive(Debug, Clone)]
pub struct Fetcher<S> {
    source: S,
}

impl<S: DeploymentSource> Fetcher<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Lists the eligible deployments and collects a snapshot of each.
    pub async fn deployments(&self) -> Result<CollectionResult, FetchError> {
        let deployments = self
            .source
            .get_deployments()
            .await
            .map_err(FetchError::Listing)?;

        collect(deployments).await
    }
}

/// Collects a snapshot of every deployment concurrently.
///
/// Either all snapshots are returned or the first error observed. Snapshot
/// order is unspecified.
pub async fn collect<D, I>(deployments: I) -> Result<CollectionResult, FetchError>
where
    D: Deployment,
    I: IntoIterator<Item = D>,
{
    let mut tasks = JoinSet::new();
    let mut task_names = HashMap::new();

    for deployment in deployments {
        let name = deployment.name().to_owned();
        let span = debug_span!("deployment", name = %name);
        let handle = tasks.spawn(
            async move { facet::deployment_snapshot(&deployment).await }.instrument(span),
        );
        task_names.insert(handle.id(), name);
    }

    if tasks.is_empty() {
        return Ok(CollectionResult::new());
    }
    debug!("collecting {} deployments", tasks.len());

    let mut result = CollectionResult::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next_with_id().await {
        let err = match joined {
            Ok((_, Ok(snapshot))) => {
                result.push(snapshot);
                continue;
            }
            Ok((_, Err(err))) => err,
            Err(join_err) => FetchError::Task {
                deployment: task_names.remove(&join_err.id()).unwrap_or_default(),
                reason: join_err.to_string(),
            },
        };

        debug!(
            "aborting {} in-flight deployments after error: {err}",
            tasks.len()
        );
        tasks.abort_all();
        return Err(err);
    }

    Ok(result)
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use deployprobe_proto::director::{
        ErrandRecord, InstanceInfo, ReleaseRecord, StemcellRecord,
    };

    use super::*;
    use crate::{
        director::DirectorError,
        facet::Facet,
        filter::DeploymentsFilter,
        fixture::{
            DeploymentFixture, StaticDeployment, StaticDirector, test_util::sample_deployment,
        },
    };

    fn deployments(count: usize) -> Vec<StaticDeployment> {
        (0..count)
            .map(|i| StaticDeployment::new(sample_deployment(&format!("deployment-{i}"))))
            .collect()
    }

    #[tokio::test]
    async fn test_empty_input() {
        let result = collect(Vec::<StaticDeployment>::new()).await.unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_single_deployment() {
        let result = collect(deployments(1)).await.unwrap();

        assert_eq!(result.len(), 1);
        let snapshot = result.get("deployment-0").unwrap();
        assert_eq!(snapshot.instances.len(), 2);
        assert_eq!(snapshot.stemcells.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_many_deployments_in_parallel() {
        let handles: Vec<_> = (0..50)
            .map(|i| {
                StaticDeployment::new(DeploymentFixture {
                    latency_ms: 1 + (i % 7),
                    ..sample_deployment(&format!("deployment-{i}"))
                })
            })
            .collect();

        let result = collect(handles.clone()).await.unwrap();

        assert_eq!(result.len(), 50);
        assert_eq!(result.instance_count(), 100);
        for i in 0..50 {
            assert!(result.get(&format!("deployment-{i}")).is_some());
        }
        for handle in &handles {
            assert_eq!(handle.calls().len(), 4);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_instances_failure_fails_collection() {
        let mut handles = deployments(10);
        handles.push(StaticDeployment::new(DeploymentFixture {
            fail: vec![Facet::Instances],
            ..sample_deployment("broken")
        }));

        let err = collect(handles).await.unwrap_err();

        assert_eq!(err.deployment(), Some("broken"));
        let msg = err.to_string();
        assert!(msg.contains("Instances"), "{msg}");
        assert!(msg.contains("broken"), "{msg}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_does_not_wait_for_slow_deployments() {
        let slow = StaticDeployment::new(DeploymentFixture {
            latency_ms: 3_600_000,
            ..sample_deployment("slow")
        });
        let broken = StaticDeployment::new(DeploymentFixture {
            fail: vec![Facet::Errands],
            ..sample_deployment("broken")
        });

        let started = tokio::time::Instant::now();
        let err = collect([slow.clone(), broken]).await.unwrap_err();

        assert_eq!(err.deployment(), Some("broken"));
        assert!(started.elapsed() < Duration::from_secs(1));
        // the slow task was aborted while waiting on its first call
        assert_eq!(slow.calls(), [Facet::Errands]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_outcome_is_error_whenever_any_deployment_fails() {
        for _ in 0..20 {
            let mut handles = deployments(5);
            handles.push(StaticDeployment::new(DeploymentFixture {
                fail: vec![Facet::Stemcells],
                ..sample_deployment("last")
            }));

            assert!(collect(handles).await.is_err());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_collection_is_idempotent() {
        let director = StaticDirector::new((0..8).map(|i| DeploymentFixture {
            latency_ms: 8 - i,
            ..sample_deployment(&format!("deployment-{i}"))
        }))
        .unwrap();
        let fetcher = Fetcher::new(DeploymentsFilter::new(director, Vec::<String>::new()));

        let mut first = fetcher.deployments().await.unwrap();
        let mut second = fetcher.deployments().await.unwrap();
        first.sort_by_name();
        second.sort_by_name();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_listing_failure_spawns_nothing() {
        let director = StaticDirector::new([sample_deployment("cf")]).unwrap();
        let fetcher = Fetcher::new(DeploymentsFilter::new(director, ["cf", "kafka"]));

        let err = fetcher.deployments().await.unwrap_err();

        assert!(matches!(err, FetchError::Listing(_)));
        assert!(err.to_string().contains("kafka"));
    }

    #[tokio::test]
    async fn test_filtered_collection() {
        let director =
            StaticDirector::new(["cf", "redis", "mysql"].map(sample_deployment)).unwrap();
        let fetcher = Fetcher::new(DeploymentsFilter::new(director, ["redis"]));

        let result = fetcher.deployments().await.unwrap();

        assert_eq!(result.len(), 1);
        assert!(result.get("redis").is_some());
    }

    #[derive(Debug)]
    struct PanickingDeployment;

    impl Deployment for PanickingDeployment {
        fn name(&self) -> &str {
            "panicky"
        }

        async fn errands(
            &self,
        ) -> Result<Vec<ErrandRecord>, DirectorError> {
            panic!("director client bug")
        }

        async fn instance_infos(
            &self,
        ) -> Result<Vec<InstanceInfo>, DirectorError> {
            Ok(vec![])
        }

        async fn releases(
            &self,
        ) -> Result<Vec<ReleaseRecord>, DirectorError> {
            Ok(vec![])
        }

        async fn stemcells(
            &self,
        ) -> Result<Vec<StemcellRecord>, DirectorError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_panicking_task_is_reported() {
        let err = collect([PanickingDeployment]).await.unwrap_err();

        assert!(matches!(err, FetchError::Task { .. }));
        assert_eq!(err.deployment(), Some("panicky"));
    }
}
