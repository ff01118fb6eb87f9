use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::AppResult;

/// A single reachability check against the backend
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn check(&self) -> bool;
}

/// Probes a health endpoint over HTTP; any non-2xx answer or timeout is a miss
pub struct HttpProbe {
    client: Client,
    url: String,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait::async_trait]
impl LivenessProbe for HttpProbe {
    async fn check(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(url = %self.url, error = %e, "Liveness probe failed");
                false
            }
        }
    }
}

/// Tracks whether the backend is reachable by polling a [`LivenessProbe`]
///
/// Connectivity is assumed until a probe says otherwise.
#[derive(Clone)]
pub struct ConnectionMonitor {
    connected: Arc<AtomicBool>,
    initialized: Arc<AtomicBool>,
    probe: Arc<dyn LivenessProbe>,
    interval: Duration,
}

/// Running poll loop of a [`ConnectionMonitor`]
pub struct MonitorHandle {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    pub async fn stop(self) {
        let _ = self.stop_tx.send(());
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Connection monitor task panicked");
        }
    }
}

impl ConnectionMonitor {
    pub fn new(probe: Arc<dyn LivenessProbe>, interval: Duration) -> Self {
        Self {
            connected: Arc::new(AtomicBool::new(true)),
            initialized: Arc::new(AtomicBool::new(false)),
            probe,
            interval,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// True once the first probe has completed
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Runs one probe and records the result
    pub async fn poll_once(&self) -> bool {
        let reachable = self.probe.check().await;
        let was_connected = self.connected.swap(reachable, Ordering::SeqCst);

        match (was_connected, reachable) {
            (true, false) => tracing::warn!("Connection lost"),
            (false, true) => tracing::info!("Connection restored"),
            _ => {}
        }

        self.initialized.store(true, Ordering::SeqCst);
        reachable
    }

    /// Probes immediately and then on every interval tick until stopped
    pub fn start(&self) -> MonitorHandle {
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let monitor = self.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(monitor.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        monitor.poll_once().await;
                    }
                }
            }
            tracing::debug!("Connection monitor stopped");
        });

        MonitorHandle { stop_tx, task }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::Sequence;

    fn probe_answering(answers: &[bool]) -> MockLivenessProbe {
        let mut probe = MockLivenessProbe::new();
        let mut seq = Sequence::new();
        for answer in answers.iter().copied() {
            probe
                .expect_check()
                .times(1)
                .in_sequence(&mut seq)
                .returning(move || answer);
        }
        probe
    }

    #[tokio::test]
    async fn test_optimistic_before_first_probe() {
        let monitor = ConnectionMonitor::new(
            Arc::new(MockLivenessProbe::new()),
            Duration::from_secs(2),
        );
        assert!(monitor.is_connected());
        assert!(!monitor.is_initialized());
    }

    #[tokio::test]
    async fn test_lost_then_restored() {
        let monitor = ConnectionMonitor::new(
            Arc::new(probe_answering(&[false, false, true])),
            Duration::from_secs(2),
        );

        assert!(!monitor.poll_once().await);
        assert!(!monitor.is_connected());
        assert!(monitor.is_initialized());

        monitor.poll_once().await;
        assert!(!monitor.is_connected());

        assert!(monitor.poll_once().await);
        assert!(monitor.is_connected());
    }

    #[tokio::test]
    async fn test_started_monitor_probes_until_stopped() {
        let mut probe = MockLivenessProbe::new();
        probe.expect_check().returning(|| false);
        let monitor = ConnectionMonitor::new(Arc::new(probe), Duration::from_millis(10));

        let handle = monitor.start();
        tokio::time::timeout(Duration::from_secs(2), async {
            while !monitor.is_initialized() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        handle.stop().await;

        assert!(!monitor.is_connected());
    }

    #[tokio::test]
    async fn test_http_probe_unreachable_host() {
        let probe = HttpProbe::new("http://127.0.0.1:9/health", Duration::from_millis(500)).unwrap();
        assert!(!probe.check().await);
    }
}
