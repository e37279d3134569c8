//! Background refill of the sampling cache.
//!
//! At most one rescan runs at a time. Triggers that arrive while a rescan is
//! in flight are dropped; serving continues from the current pool until the
//! new one is published through [`SamplingCache::replace`]. Every successful
//! rescan is published, an empty one included.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::ScanError;
use crate::sampling::{Generation, SamplingCache};
use crate::scanner::InventoryScanner;

/// Why a refill was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefillReason {
    LowWatermark,
    Expired,
}

impl fmt::Display for RefillReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LowWatermark => f.write_str("low_watermark"),
            Self::Expired => f.write_str("expired"),
        }
    }
}

pub struct RefillCoordinator {
    cache: Arc<SamplingCache>,
    scanner: Arc<dyn InventoryScanner>,
    target: PathBuf,
    watermark: usize,
    in_flight: Arc<AtomicBool>,
}

impl fmt::Debug for RefillCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefillCoordinator")
            .field("target", &self.target)
            .field("watermark", &self.watermark)
            .field("in_flight", &self.is_refilling())
            .finish_non_exhaustive()
    }
}

/// Clears the in-flight flag when the refill task ends, including on panic.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RefillCoordinator {
    pub fn new(
        cache: Arc<SamplingCache>,
        scanner: Arc<dyn InventoryScanner>,
        target: impl Into<PathBuf>,
        watermark: usize,
    ) -> Self {
        Self {
            cache,
            scanner,
            target: target.into(),
            watermark,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn watermark(&self) -> usize {
        self.watermark
    }

    pub fn is_refilling(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Scan the target and publish the result. Used once at startup, where
    /// a failed or empty scan must stop the process.
    pub async fn initial_fill(&self) -> Result<Generation, ScanError> {
        let found = self.scanner.scan(&self.target).await?;
        if found.is_empty() {
            return Err(ScanError::Empty(self.target.clone()));
        }
        Ok(self.cache.replace(found))
    }

    /// Check the count observed after a serve cycle and start a refill when
    /// it is below the watermark.
    pub fn observe(&self, remaining: usize) -> Option<JoinHandle<()>> {
        if remaining >= self.watermark {
            return None;
        }
        debug!(remaining, watermark = self.watermark, "pool below watermark");
        self.trigger(RefillReason::LowWatermark)
    }

    /// Start a background rescan unless one is already running.
    ///
    /// Returns the spawned task's handle, or `None` when coalesced into the
    /// refill already in flight.
    pub fn trigger(&self, reason: RefillReason) -> Option<JoinHandle<()>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(%reason, "refill already in flight");
            return None;
        }

        let guard = InFlightGuard(Arc::clone(&self.in_flight));
        let cache = Arc::clone(&self.cache);
        let scanner = Arc::clone(&self.scanner);
        let target = self.target.clone();

        info!(%reason, target = %target.display(), "starting refill");
        Some(tokio::spawn(async move {
            let _guard = guard;
            match scanner.scan(&target).await {
                Ok(found) => {
                    let count = found.len();
                    if count == 0 {
                        warn!(%reason, target = %target.display(), "rescan found no images");
                    }
                    let generation = cache.replace(found);
                    info!(%reason, found = count, %generation, "refill published");
                }
                Err(err) => {
                    error!(%reason, error = %err, "refill scan failed");
                }
            }
        }))
    }

    /// Periodically trigger a refill once the current pool has outlived its
    /// TTL. Runs until the returned handle is aborted.
    pub fn spawn_expiry_watch(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if coordinator.cache.is_expired() {
                    coordinator.trigger(RefillReason::Expired);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    const TTL: Duration = Duration::from_secs(120);

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from(format!("/p/{n}.jpg"))).collect()
    }

    /// Returns queued results in order, then the last one forever.
    struct ScriptedScanner {
        results: Mutex<VecDeque<Result<Vec<PathBuf>, ScanError>>>,
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedScanner {
        fn new(results: Vec<Result<Vec<PathBuf>, ScanError>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
                calls: AtomicUsize::new(0),
                gate: None,
            }
        }

        fn gated(results: Vec<Result<Vec<PathBuf>, ScanError>>, gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new(results)
            }
        }
    }

    #[async_trait]
    impl InventoryScanner for ScriptedScanner {
        async fn scan(&self, _root: &Path) -> Result<Vec<PathBuf>, ScanError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let mut results = self.results.lock();
            match results.pop_front() {
                Some(result) if results.is_empty() => {
                    let again = match &result {
                        Ok(found) => Ok(found.clone()),
                        Err(_) => Err(ScanError::Join("scripted".into())),
                    };
                    results.push_back(again);
                    result
                }
                Some(result) => result,
                None => Ok(Vec::new()),
            }
        }
    }

    fn coordinator(
        initial: &[&str],
        scanner: ScriptedScanner,
        watermark: usize,
    ) -> (Arc<SamplingCache>, Arc<ScriptedScanner>, Arc<RefillCoordinator>) {
        let cache = Arc::new(SamplingCache::new(paths(initial), TTL));
        let scanner = Arc::new(scanner);
        let refill = Arc::new(RefillCoordinator::new(
            Arc::clone(&cache),
            scanner.clone(),
            "/p",
            watermark,
        ));
        (cache, scanner, refill)
    }

    #[tokio::test]
    async fn observe_above_watermark_does_nothing() {
        let (_, scanner, refill) = coordinator(&["a", "b", "c"], ScriptedScanner::new(vec![]), 2);

        assert!(refill.observe(2).is_none());
        assert_eq!(scanner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn refill_below_watermark_replaces_pool() {
        let (cache, _, refill) = coordinator(
            &["a"],
            ScriptedScanner::new(vec![Ok(paths(&["d", "e", "f"]))]),
            2,
        );

        let handle = refill.observe(1).expect("refill should start");
        handle.await.expect("refill task");

        assert_eq!(cache.remaining(), 3);
        assert_eq!(cache.generation(), Generation(1));
        assert!(!refill.is_refilling());
    }

    #[tokio::test]
    async fn concurrent_triggers_are_coalesced() {
        let gate = Arc::new(Notify::new());
        let (cache, scanner, refill) = coordinator(
            &["a"],
            ScriptedScanner::gated(vec![Ok(paths(&["x", "y"]))], Arc::clone(&gate)),
            5,
        );

        let first = refill.trigger(RefillReason::LowWatermark).expect("first refill starts");
        assert!(refill.is_refilling());
        assert!(refill.trigger(RefillReason::LowWatermark).is_none());
        assert!(refill.observe(0).is_none());

        // Draws still see the old pool while the scan is pending.
        assert_eq!(cache.remaining(), 1);

        gate.notify_one();
        first.await.expect("refill task");

        assert_eq!(scanner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.remaining(), 2);
        assert!(!refill.is_refilling());
    }

    #[tokio::test]
    async fn failed_refill_keeps_pool_and_allows_retry() {
        let (cache, scanner, refill) = coordinator(
            &["a"],
            ScriptedScanner::new(vec![
                Err(ScanError::Join("disk gone".into())),
                Ok(paths(&["m", "n"])),
            ]),
            5,
        );

        refill.observe(1).expect("first refill").await.expect("task");
        assert_eq!(cache.remaining(), 1);
        assert_eq!(cache.generation(), Generation(0));

        refill.observe(1).expect("second refill").await.expect("task");
        assert_eq!(scanner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.remaining(), 2);
    }

    #[tokio::test]
    async fn empty_rescan_replaces_stale_pool() {
        let (cache, _, refill) =
            coordinator(&["deleted"], ScriptedScanner::new(vec![Ok(vec![])]), 5);

        refill.observe(1).expect("refill starts").await.expect("task");

        assert_eq!(cache.remaining(), 0);
        assert_eq!(cache.generation(), Generation(1));
        assert!(cache.draw().is_none());
    }

    #[tokio::test]
    async fn initial_fill_rejects_empty_inventory() {
        let (_, _, refill) = coordinator(&[], ScriptedScanner::new(vec![Ok(vec![])]), 5);

        let result = refill.initial_fill().await;
        assert!(matches!(result, Err(ScanError::Empty(_))));
    }

    #[tokio::test]
    async fn initial_fill_publishes_scan() {
        let (cache, _, refill) =
            coordinator(&[], ScriptedScanner::new(vec![Ok(paths(&["a", "b"]))]), 5);

        let generation = refill.initial_fill().await.expect("initial fill");
        assert_eq!(generation, Generation(1));
        assert_eq!(cache.remaining(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_watch_refreshes_stale_pool() {
        let (cache, scanner, refill) =
            coordinator(&[], ScriptedScanner::new(vec![Ok(paths(&["fresh"]))]), 0);

        let watch = refill.spawn_expiry_watch(Duration::from_secs(15));

        // Not expired yet: ticks come and go without a scan.
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(scanner.calls.load(Ordering::SeqCst), 0);

        tokio::time::sleep(TTL).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert!(scanner.calls.load(Ordering::SeqCst) >= 1);
        assert_eq!(cache.remaining(), 1);
        watch.abort();
    }
}
