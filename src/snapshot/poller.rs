//! Periodic backend status polling
//!
//! Lower-priority companion to the live channel: pulls the incident list on
//! a fixed interval to report backend reachability. Results are handed to
//! the session, which union-merges them; the poller never writes state.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use super::{FetchError, SnapshotSource};
use crate::types::{BackendStatus, Incident};
use crate::utils::{now_utc, ShutdownSignal};

/// One completed poll
#[derive(Debug)]
pub struct PollOutcome {
    pub checked_at: DateTime<Utc>,
    pub result: Result<Vec<Incident>, FetchError>,
}

impl PollOutcome {
    /// Status derived from this poll. A failed poll keeps the previously
    /// known last detection.
    pub fn status(&self, previous: &BackendStatus) -> BackendStatus {
        match &self.result {
            Ok(incidents) => BackendStatus {
                reachable: true,
                last_detection: incidents.iter().map(|i| i.timestamp).max(),
                checked_at: self.checked_at,
            },
            Err(_) => BackendStatus {
                reachable: false,
                last_detection: previous.last_detection,
                checked_at: self.checked_at,
            },
        }
    }
}

/// Polls a snapshot source on a fixed interval until shutdown
pub struct BackendPoller {
    source: Arc<dyn SnapshotSource>,
    period: Duration,
}

impl BackendPoller {
    pub fn new(source: Arc<dyn SnapshotSource>, period: Duration) -> Self {
        Self { source, period }
    }

    /// Run until shutdown or until the receiving side goes away.
    /// The first poll happens immediately.
    pub async fn run(self, tx: mpsc::Sender<PollOutcome>, mut shutdown: ShutdownSignal) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ticker.tick() => {}
            }

            let result = tokio::select! {
                _ = shutdown.recv() => break,
                result = self.source.load() => result,
            };

            match &result {
                Ok(incidents) => debug!(count = incidents.len(), "backend poll succeeded"),
                Err(e) => warn!(error = %e, "backend poll failed"),
            }

            let outcome = PollOutcome {
                checked_at: now_utc(),
                result,
            };
            if tx.send(outcome).await.is_err() {
                break;
            }
        }

        debug!("backend poller stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::utils::shutdown_pair;

    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl SnapshotSource for CountingSource {
        async fn load(&self) -> Result<Vec<Incident>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FetchError::Status { status: 503 });
            }
            let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
            Ok(vec![
                Incident::new("1", "fight", 0.9, "cam-1", t0),
                Incident::new("2", "fight", 0.9, "cam-1", t0 + chrono::Duration::minutes(3)),
            ])
        }
    }

    #[test]
    fn test_status_from_success_uses_newest_timestamp() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let outcome = PollOutcome {
            checked_at: t0,
            result: Ok(vec![
                Incident::new("1", "x", 0.5, "c", t0 - chrono::Duration::minutes(5)),
                Incident::new("2", "x", 0.5, "c", t0 - chrono::Duration::minutes(1)),
            ]),
        };

        let status = outcome.status(&BackendStatus::unknown());
        assert!(status.reachable);
        assert_eq!(status.last_detection, Some(t0 - chrono::Duration::minutes(1)));
    }

    #[test]
    fn test_status_from_failure_keeps_last_detection() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let previous = BackendStatus {
            reachable: true,
            last_detection: Some(t0),
            checked_at: t0,
        };
        let outcome = PollOutcome {
            checked_at: t0 + chrono::Duration::seconds(10),
            result: Err(FetchError::Status { status: 500 }),
        };

        let status = outcome.status(&previous);
        assert!(!status.reachable);
        assert_eq!(status.last_detection, Some(t0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_runs_on_interval_until_shutdown() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let (tx, mut rx) = mpsc::channel(8);
        let (trigger, signal) = shutdown_pair();

        let poller = BackendPoller::new(source.clone(), Duration::from_secs(10));
        let handle = tokio::spawn(poller.run(tx, signal));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.result.unwrap().len(), 2);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(10)).await;
        rx.recv().await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);

        trigger.trigger();
        handle.await.unwrap();
        while rx.recv().await.is_some() {}
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_reports_failures() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let (tx, mut rx) = mpsc::channel(8);
        let (trigger, signal) = shutdown_pair();

        let handle = tokio::spawn(BackendPoller::new(source, Duration::from_secs(10)).run(tx, signal));

        let outcome = rx.recv().await.unwrap();
        assert!(matches!(outcome.result, Err(FetchError::Status { status: 503 })));

        trigger.trigger();
        handle.await.unwrap();
    }
}
