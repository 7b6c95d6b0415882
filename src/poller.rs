//! Poll loop and report publication
//!
//! Each poll runs the [`Doctor`] once. Results are published through a
//! `watch` channel as a whole `Arc<PublishedReport>`, so readers only ever
//! see complete reports. A failed poll republishes the last good report
//! marked stale. A poll that finishes after a newer one has already
//! published is dropped. The hub overview always reflects the latest poll:
//! present when its fetch succeeded, even if analysis failed.

use crate::doctor::{Diagnosis, Doctor, HubOverview};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// What readers see
#[derive(Debug, Clone)]
pub struct PublishedReport {
    /// Poll that produced this publication; 0 before the first poll
    pub generation: u64,
    /// Last successful diagnosis, if any
    pub diagnosis: Option<Arc<Diagnosis>>,
    /// True when `diagnosis` comes from an earlier poll than `generation`
    pub stale: bool,
    /// Hub overview from the latest poll, if its fetch succeeded
    pub overview: Option<Arc<HubOverview>>,
    /// Why the latest poll failed
    pub error: Option<String>,
    pub last_success: Option<DateTime<Utc>>,
    pub published_at: DateTime<Utc>,
}

impl PublishedReport {
    fn pending() -> Self {
        Self {
            generation: 0,
            diagnosis: None,
            stale: false,
            overview: None,
            error: Some("no poll has completed yet".to_string()),
            last_success: None,
            published_at: Utc::now(),
        }
    }

    /// Whether there is any report to show
    pub fn is_available(&self) -> bool {
        self.diagnosis.is_some()
    }

    /// Serializable envelope: publication metadata plus the diagnosis
    pub fn envelope(&self) -> ReportEnvelope<'_> {
        ReportEnvelope {
            generation: self.generation,
            stale: self.stale,
            error: self.error.as_deref(),
            last_success: self.last_success,
            published_at: self.published_at,
            diagnosis: self.diagnosis.as_deref(),
        }
    }
}

/// JSON shape served to callers
#[derive(Debug, Serialize)]
pub struct ReportEnvelope<'a> {
    pub generation: u64,
    pub stale: bool,
    pub error: Option<&'a str>,
    pub last_success: Option<DateTime<Utc>>,
    pub published_at: DateTime<Utc>,
    #[serde(flatten)]
    pub diagnosis: Option<&'a Diagnosis>,
}

/// Result of one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// New report published
    Fresh,
    /// Poll failed; previous report republished as stale
    StaleFallback,
    /// Poll failed and there is nothing to fall back to
    NoReport,
    /// A newer poll already published; result dropped
    Superseded,
}

/// Runs polls and publishes their results
pub struct ReportPublisher {
    doctor: Doctor,
    tx: watch::Sender<Arc<PublishedReport>>,
    next_generation: AtomicU64,
}

impl ReportPublisher {
    pub fn new(doctor: Doctor) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(PublishedReport::pending()));
        Self {
            doctor,
            tx,
            next_generation: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<PublishedReport>> {
        self.tx.subscribe()
    }

    /// Latest publication
    pub fn current(&self) -> Arc<PublishedReport> {
        self.tx.borrow().clone()
    }

    /// Run one poll and publish its result
    pub async fn poll_once(&self) -> PollOutcome {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation, "poll started");

        let (overview, result) = match self.doctor.examine().await {
            Ok(checkup) => (Some(Arc::new(checkup.overview.clone())), checkup.into_diagnosis()),
            Err(e) => (None, Err(e)),
        };
        let now = Utc::now();
        let mut outcome = PollOutcome::Superseded;

        self.tx.send_if_modified(|current| {
            if current.generation > generation {
                return false;
            }

            let next = match &result {
                Ok(diagnosis) => {
                    outcome = PollOutcome::Fresh;
                    PublishedReport {
                        generation,
                        diagnosis: Some(Arc::new(diagnosis.clone())),
                        stale: false,
                        overview,
                        error: None,
                        last_success: Some(now),
                        published_at: now,
                    }
                }
                Err(e) => {
                    outcome = if current.diagnosis.is_some() {
                        PollOutcome::StaleFallback
                    } else {
                        PollOutcome::NoReport
                    };
                    PublishedReport {
                        generation,
                        diagnosis: current.diagnosis.clone(),
                        stale: current.diagnosis.is_some(),
                        overview,
                        error: Some(e.to_string()),
                        last_success: current.last_success,
                        published_at: now,
                    }
                }
            };

            *current = Arc::new(next);
            true
        });

        match (&result, outcome) {
            (_, PollOutcome::Superseded) => debug!(generation, "poll superseded, result dropped"),
            (Ok(d), _) => info!(generation, status = d.report.status.as_str(), "report published"),
            (Err(e), outcome) => warn!(generation, error = %e, ?outcome, "poll failed"),
        }

        outcome
    }

    /// Poll forever at a fixed interval
    pub async fn run(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.poll_once().await;
        }
    }
}
