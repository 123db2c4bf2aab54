use std::time::Duration;

use anyhow::anyhow;
use deployprobe_collector::{Fetcher, filter::DeploymentSource};
use deployprobe_proto::CollectionResult;
use tokio::time::{Instant, sleep_until, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Runs one collection cycle, abandoning it once `collect_timeout` elapses.
pub async fn collect_once<S: DeploymentSource>(
    fetcher: &Fetcher<S>,
    collect_timeout: Duration,
) -> anyhow::Result<CollectionResult> {
    let result = timeout(collect_timeout, fetcher.deployments())
        .await
        .map_err(|_| {
            anyhow!(
                "collection did not finish within {} seconds",
                collect_timeout.as_secs_f32()
            )
        })??;
    Ok(result)
}

pub async fn serve<S: DeploymentSource>(
    fetcher: &Fetcher<S>,
    scrape_interval: Duration,
    collect_timeout: Duration,
    shutdown: CancellationToken,
) {
    loop {
        let cycle_start = Instant::now();

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("shutting down");
                return;
            }
            res = collect_once(fetcher, collect_timeout) => {
                match res {
                    Ok(result) => info!(
                        deployments = result.len(),
                        instances = result.instance_count(),
                        unhealthy_instances = result.unhealthy_instance_count(),
                        elapsed_ms = cycle_start.elapsed().as_millis() as u64,
                        "collection cycle finished"
                    ),
                    // no partial snapshot is published for a failed cycle
                    Err(e) => warn!("collection cycle failed: {e:#}"),
                }
            }
        }

        // wait scrape interval or shutdown
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("shutting down");
                return;
            }
            _ = sleep_until(cycle_start + scrape_interval) => { /* continue */ }
        }
    }
}

#[cfg(test)]
mod test {
    use deployprobe_collector::{
        facet::Facet,
        filter::DeploymentsFilter,
        fixture::{DeploymentFixture, StaticDirector},
    };

    use super::*;

    fn fetcher(fixtures: Vec<DeploymentFixture>) -> Fetcher<DeploymentsFilter<StaticDirector>> {
        let director = StaticDirector::new(fixtures).unwrap();
        Fetcher::new(DeploymentsFilter::new(director, Vec::<String>::new()))
    }

    fn fixture(name: &str) -> DeploymentFixture {
        DeploymentFixture {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_collect_once() {
        let fetcher = fetcher(vec![fixture("cf"), fixture("redis")]);

        let result = collect_once(&fetcher, Duration::from_secs(5)).await.unwrap();

        assert_eq!(result.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_once_times_out() {
        let fetcher = fetcher(vec![DeploymentFixture {
            latency_ms: 120_000,
            ..fixture("cf")
        }]);

        let err = collect_once(&fetcher, Duration::from_secs(60))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("did not finish"), "{err}");
    }

    #[tokio::test]
    async fn test_collect_once_propagates_facet_error() {
        let fetcher = fetcher(vec![DeploymentFixture {
            fail: vec![Facet::Stemcells],
            ..fixture("cf")
        }]);

        let err = collect_once(&fetcher, Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Stemcells"), "{err}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_serve_stops_on_shutdown() {
        let fetcher = fetcher(vec![fixture("cf")]);
        let shutdown = CancellationToken::new();

        let canceller = tokio::spawn({
            let shutdown = shutdown.clone();
            async move {
                tokio::time::sleep(Duration::from_secs(95)).await;
                shutdown.cancel();
            }
        });

        serve(
            &fetcher,
            Duration::from_secs(30),
            Duration::from_secs(10),
            shutdown,
        )
        .await;
        canceller.await.unwrap();
    }
}
