//! Run modes: a single pass, or a background poller on a fixed period.
//! Uses tokio::interval so the poller sleeps between passes.

use std::sync::Arc;
use std::time::Duration;

use rsvp_core::error::Result;
use rsvp_core::types::PassSummary;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::reconcile::Reconciler;

/// Reconciler shared between the poller and anyone who wants to trigger a
/// pass by hand. The mutex is the "pass in progress" guard.
pub type SharedReconciler = Arc<Mutex<Reconciler>>;

/// Shortest period the poller accepts.
const MIN_PERIOD: Duration = Duration::from_secs(1);

/// How the process should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// One pass, then exit.
    Once,
    /// A pass now, then one every `every`, forever.
    Continuous { every: Duration },
}

impl RunMode {
    /// `--once`, or a CI environment, selects one-shot mode.
    pub fn select(once_flag: bool, in_ci: bool, every: Duration) -> Self {
        if once_flag || in_ci {
            Self::Once
        } else {
            Self::Continuous { every }
        }
    }
}

/// Process exit code for a one-shot pass result.
pub fn exit_code(result: &Result<PassSummary>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

/// Run exactly one pass.
pub async fn run_once(reconciler: &mut Reconciler) -> Result<PassSummary> {
    tracing::info!("=== Starting RSVP email pass ===");
    let result = reconciler.run_pass().await;
    match &result {
        Ok(_) => tracing::info!("=== Check complete ==="),
        Err(e) => tracing::error!("=== Pass failed: {e} ==="),
    }
    result
}

/// Run a pass unless one is already in flight. `None` means the tick was
/// skipped.
pub async fn try_pass(reconciler: &SharedReconciler) -> Option<Result<PassSummary>> {
    let Ok(mut guard) = reconciler.try_lock() else {
        tracing::warn!("⏳ Previous pass still running, skipping this tick");
        return None;
    };
    Some(guard.run_pass().await)
}

/// Spawn the polling loop as a background tokio task. The first pass runs
/// immediately. Faults are logged and never stop the loop.
pub fn spawn_poller(reconciler: SharedReconciler, every: Duration) -> JoinHandle<()> {
    let every = every.max(MIN_PERIOD);
    tokio::spawn(async move {
        tracing::info!("⏰ Polling started (every {}s)", every.as_secs());

        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if let Some(Err(e)) = try_pass(&reconciler).await {
                tracing::warn!(
                    "⚠️ Pass failed, next attempt in {}s: {e}",
                    every.as_secs()
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeMail, FakeSheet, HEADER, reconciler};
    use std::sync::atomic::Ordering;

    #[test]
    fn test_mode_selection() {
        let every = Duration::from_secs(60);
        assert_eq!(RunMode::select(true, false, every), RunMode::Once);
        assert_eq!(RunMode::select(false, true, every), RunMode::Once);
        assert_eq!(
            RunMode::select(false, false, every),
            RunMode::Continuous { every }
        );
    }

    #[test]
    fn test_exit_codes() {
        use rsvp_core::error::RsvpError;
        assert_eq!(exit_code(&Ok(PassSummary::default())), 0);
        let fault = Err(RsvpError::SourceUnavailable {
            attempts: 3,
            cause: "404".into(),
        });
        assert_eq!(exit_code(&fault), 1);
    }

    #[tokio::test]
    async fn test_run_once_reports_fault() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = FakeSheet::default();
        sheet.unavailable.store(true, Ordering::SeqCst);
        let mut rec = reconciler(dir.path(), &sheet, &FakeMail::default());
        assert_eq!(exit_code(&run_once(&mut rec).await), 1);
    }

    #[tokio::test]
    async fn test_try_pass_skips_while_locked() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = FakeSheet::with_rows(&[HEADER]);
        let shared = Arc::new(Mutex::new(reconciler(
            dir.path(),
            &sheet,
            &FakeMail::default(),
        )));

        let held = shared.lock().await;
        assert!(try_pass(&shared).await.is_none());
        drop(held);

        assert!(matches!(try_pass(&shared).await, Some(Ok(_))));
        assert_eq!(sheet.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_runs_immediately_and_survives_faults() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = FakeSheet::with_rows(&[HEADER, &["t", "Alice", "a@x.com", "Yes"]]);
        sheet.unavailable.store(true, Ordering::SeqCst);
        let mail = FakeMail::default();
        let shared = Arc::new(Mutex::new(reconciler(dir.path(), &sheet, &mail)));

        let handle = spawn_poller(shared.clone(), Duration::from_secs(10));

        // first pass fires right away and faults
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(sheet.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(mail.count(), 0);

        // nothing more until the period elapses
        tokio::time::sleep(Duration::from_secs(8)).await;
        assert_eq!(sheet.fetches.load(Ordering::SeqCst), 1);

        // the next tick still happens and succeeds
        sheet.unavailable.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(sheet.fetches.load(Ordering::SeqCst), 2);
        assert_eq!(mail.count(), 1);
        assert!(!handle.is_finished());

        handle.abort();
        assert_eq!(shared.lock().await.ledger().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_period_has_a_floor() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = FakeSheet::with_rows(&[HEADER]);
        let shared = Arc::new(Mutex::new(reconciler(
            dir.path(),
            &sheet,
            &FakeMail::default(),
        )));

        let handle = spawn_poller(shared, Duration::ZERO);
        tokio::time::sleep(Duration::from_millis(2500)).await;
        // ticks at 0s, 1s and 2s
        assert_eq!(sheet.fetches.load(Ordering::SeqCst), 3);
        handle.abort();
    }
}
