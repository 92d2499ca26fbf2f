//! Active health checking.
//!
//! # Responsibilities
//! - Every interval, GET the health path on each registered instance
//! - Run one round's checks side by side so a hung instance costs one timeout
//! - Feed results into the per-instance hysteresis and the health gauge

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::observability::metrics;
use crate::registry::ServiceRegistry;

const USER_AGENT: &str = "hello-mesh-health";

type HealthClient = Client<HttpConnector, Body>;

pub struct HealthMonitor {
    registry: Arc<ServiceRegistry>,
    config: HealthCheckConfig,
    client: HealthClient,
}

impl HealthMonitor {
    pub fn new(registry: Arc<ServiceRegistry>, config: HealthCheckConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            registry,
            config,
            client,
        }
    }

    /// Check on every tick until the shutdown broadcast fires.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Health checks disabled, instances stay routable");
            return;
        }

        tracing::info!(
            interval_secs = self.config.interval_secs,
            path = %self.config.path,
            "Checking registered instances"
        );
        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));

        loop {
            tokio::select! {
                _ = ticker.tick() => self.check_all().await,
                _ = shutdown.recv() => break,
            }
        }
        tracing::info!("Health checks stopped");
    }

    /// Run one round: every instance of every service, concurrently.
    pub async fn check_all(&self) {
        let timeout = Duration::from_secs(self.config.timeout_secs);
        let mut round = JoinSet::new();

        for (service, instance) in self.registry.health_targets() {
            let client = self.client.clone();
            let uri = format!("http://{}{}", instance.addr, self.config.path);
            round.spawn(async move {
                let healthy = check_instance(&client, instance.addr, uri, timeout).await;
                (service, instance, healthy)
            });
        }

        while let Some(joined) = round.join_next().await {
            let (service, instance, healthy) = match joined {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(error = %e, "Health check task failed");
                    continue;
                }
            };

            if healthy {
                instance.mark_success(self.config.healthy_threshold as usize);
            } else {
                instance.mark_failure(self.config.unhealthy_threshold as usize);
            }
            metrics::record_instance_health(&service, instance.addr, instance.is_healthy());
        }
    }
}

/// One GET; only a 2xx inside the timeout counts as healthy.
async fn check_instance(client: &HealthClient, addr: SocketAddr, uri: String, timeout: Duration) -> bool {
    let request = match Request::get(uri)
        .header("user-agent", USER_AGENT)
        .body(Body::empty())
    {
        Ok(request) => request,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "Health check path does not form a URI");
            return false;
        }
    };

    match time::timeout(timeout, client.request(request)).await {
        Ok(Ok(response)) if response.status().is_success() => true,
        Ok(Ok(response)) => {
            tracing::debug!(addr = %addr, status = %response.status(), "Instance answered with an error status");
            false
        }
        Ok(Err(e)) => {
            tracing::debug!(addr = %addr, error = %e, "Instance unreachable");
            false
        }
        Err(_) => {
            tracing::debug!(addr = %addr, timeout_ms = timeout.as_millis() as u64, "Instance did not answer in time");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HealthState;
    use tokio::net::TcpListener;

    async fn refused_addr() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    }

    fn config() -> HealthCheckConfig {
        HealthCheckConfig {
            timeout_secs: 1,
            unhealthy_threshold: 1,
            healthy_threshold: 1,
            ..HealthCheckConfig::default()
        }
    }

    #[tokio::test]
    async fn test_round_runs_checks_side_by_side() {
        // Accepted by the kernel backlog but never answered.
        let mut silent = Vec::new();
        let mut addrs = Vec::new();
        for _ in 0..3 {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            addrs.push(listener.local_addr().unwrap());
            silent.push(listener);
        }
        let registry = Arc::new(ServiceRegistry::new());
        let service = registry.register("go-api-service", 8080, &addrs);

        let started = std::time::Instant::now();
        HealthMonitor::new(registry, config()).check_all().await;

        assert!(started.elapsed() < Duration::from_secs(2), "{:?}", started.elapsed());
        for instance in service.instances().iter() {
            assert_eq!(instance.state(), HealthState::Unhealthy);
        }
    }

    #[test]
    fn test_gauges_of_removed_instances_expire() {
        let recorder = metrics::exporter(Duration::from_millis(20)).build_recorder();
        let handle = recorder.handle();

        ::metrics::with_local_recorder(&recorder, || {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap()
                .block_on(async {
                    let kept = refused_addr().await;
                    let removed = refused_addr().await;
                    let registry = Arc::new(ServiceRegistry::new());
                    let service = registry.register("go-api-service", 8080, &[kept, removed]);
                    let monitor = HealthMonitor::new(registry, config());

                    monitor.check_all().await;
                    let scrape = handle.render();
                    let expected = format!(r#"service="go-api-service",address="{}""#, removed);
                    assert!(scrape.contains(&expected), "{}", scrape);

                    service.replace_instances(&[kept]);
                    time::sleep(Duration::from_millis(200)).await;
                    monitor.check_all().await;

                    let scrape = handle.render();
                    assert!(scrape.contains(&kept.to_string()), "{}", scrape);
                    assert!(!scrape.contains(&removed.to_string()), "{}", scrape);
                });
        });
    }
}
