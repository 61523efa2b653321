//! Synthetic action source for demos and soak runs.
//!
//! Emits actions at a steady rate with periodic bursts, mimicking the uneven
//! cadence of real typing.

use crate::collector::types::{ActionEvent, ActionKind};
use crate::collector::{
    ActionSource, CollectorConfig, CollectorError, SourceCounters, CHANNEL_CAPACITY,
};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Longest uninterrupted sleep, which bounds how long `stop` waits.
const STOP_CHECK_INTERVAL: Duration = Duration::from_millis(50);

/// Back-off while the configured rate is zero.
const IDLE_INTERVAL: Duration = Duration::from_millis(100);

/// Shape of the generated action stream.
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Baseline rate outside bursts
    pub actions_per_minute: u32,
    /// Period between burst starts
    pub burst_every: Duration,
    /// How long each burst lasts
    pub burst_length: Duration,
    /// Rate multiplier during a burst
    pub burst_multiplier: u32,
    /// Every n-th action is a click (0 = never)
    pub click_every: u32,
    /// Stop after this many actions
    pub max_actions: Option<u64>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            actions_per_minute: 120,
            burst_every: Duration::from_secs(10),
            burst_length: Duration::from_secs(2),
            burst_multiplier: 3,
            click_every: 4,
            max_actions: None,
        }
    }
}

impl SyntheticConfig {
    /// Delay before the next action, given time since the source started.
    ///
    /// Returns `None` when the configured rate is zero.
    pub fn interval_at(&self, elapsed: Duration) -> Option<Duration> {
        let mut apm = u64::from(self.actions_per_minute);
        if apm == 0 {
            return None;
        }

        let period = self.burst_every.as_millis();
        if period > 0 && elapsed.as_millis() % period < self.burst_length.as_millis() {
            apm *= u64::from(self.burst_multiplier.max(1));
        }

        Some(Duration::from_micros(60_000_000 / apm))
    }

    /// Kind of the `n`-th generated action (zero-based).
    pub fn kind_for(&self, n: u64) -> ActionKind {
        if self.click_every > 0 && (n + 1) % u64::from(self.click_every) == 0 {
            ActionKind::Click
        } else {
            ActionKind::Key
        }
    }
}

/// Generates actions on a background thread.
pub struct SyntheticCollector {
    config: CollectorConfig,
    synthetic: SyntheticConfig,
    sender: Sender<ActionEvent>,
    receiver: Receiver<ActionEvent>,
    running: Arc<AtomicBool>,
    counters: Arc<SourceCounters>,
    thread_handle: Option<JoinHandle<()>>,
}

impl SyntheticCollector {
    pub fn new(config: CollectorConfig, synthetic: SyntheticConfig) -> Self {
        let (sender, receiver) = bounded(CHANNEL_CAPACITY);
        Self {
            config,
            synthetic,
            sender,
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(SourceCounters::default()),
            thread_handle: None,
        }
    }
}

impl ActionSource for SyntheticCollector {
    fn start(&mut self) -> Result<(), CollectorError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CollectorError::AlreadyRunning);
        }

        self.running.store(true, Ordering::SeqCst);

        let sender = self.sender.clone();
        let running = self.running.clone();
        let counters = self.counters.clone();
        let config = self.config.clone();
        let synthetic = self.synthetic.clone();
        let handle = thread::Builder::new()
            .name("apm-synthetic".to_string())
            .spawn(move || generate_loop(sender, running, counters, config, synthetic))
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                CollectorError::ThreadSpawnFailed(e.to_string())
            })?;

        self.thread_handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            // Wakes within STOP_CHECK_INTERVAL
            let _ = handle.join();
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn receiver(&self) -> &Receiver<ActionEvent> {
        &self.receiver
    }

    fn counters(&self) -> &SourceCounters {
        &self.counters
    }
}

impl Drop for SyntheticCollector {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sleep for `duration` in short slices. Returns `false` as soon as
/// `running` is cleared.
fn sleep_while_running(duration: Duration, running: &AtomicBool) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(STOP_CHECK_INTERVAL));
    }
}

fn generate_loop(
    sender: Sender<ActionEvent>,
    running: Arc<AtomicBool>,
    counters: Arc<SourceCounters>,
    config: CollectorConfig,
    synthetic: SyntheticConfig,
) {
    let started = Instant::now();
    let mut generated: u64 = 0;
    let mut emitted: u64 = 0;

    if !config.accepts_any() {
        tracing::warn!("all action sources disabled, synthetic source idle");
    }

    while running.load(Ordering::SeqCst) && config.accepts_any() {
        if synthetic.max_actions.is_some_and(|max| emitted >= max) {
            break;
        }

        let Some(interval) = synthetic.interval_at(started.elapsed()) else {
            sleep_while_running(IDLE_INTERVAL, &running);
            continue;
        };
        if !sleep_while_running(interval, &running) {
            break;
        }

        let kind = synthetic.kind_for(generated);
        generated += 1;
        if !config.accepts(kind) {
            counters.record_filtered();
            continue;
        }

        match sender.try_send(ActionEvent::new(kind)) {
            Ok(()) => emitted += 1,
            Err(TrySendError::Full(_)) => {
                counters.record_dropped();
                tracing::trace!("action channel full, event dropped");
            }
            Err(TrySendError::Disconnected(_)) => break,
        }
    }

    running.store(false, Ordering::SeqCst);
    tracing::debug!(
        emitted,
        filtered = counters.filtered(),
        dropped = counters.dropped(),
        "synthetic source finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_baseline_and_burst() {
        let synthetic = SyntheticConfig::default();

        // Inside the first 2s burst: 360 apm
        let burst = synthetic.interval_at(Duration::from_millis(500)).unwrap();
        assert_eq!(burst, Duration::from_micros(166_666));

        // Outside: 120 apm
        let base = synthetic.interval_at(Duration::from_secs(5)).unwrap();
        assert_eq!(base, Duration::from_millis(500));
    }

    #[test]
    fn test_zero_rate_is_idle() {
        let synthetic = SyntheticConfig {
            actions_per_minute: 0,
            ..Default::default()
        };
        assert_eq!(synthetic.interval_at(Duration::ZERO), None);
    }

    #[test]
    fn test_kind_selection() {
        let synthetic = SyntheticConfig::default();
        assert_eq!(synthetic.kind_for(0), ActionKind::Key);
        assert_eq!(synthetic.kind_for(3), ActionKind::Click);
        assert_eq!(synthetic.kind_for(7), ActionKind::Click);

        let keys_only = SyntheticConfig {
            click_every: 0,
            ..Default::default()
        };
        assert_eq!(keys_only.kind_for(3), ActionKind::Key);
    }

    #[test]
    fn test_filtered_kinds_are_counted() {
        let synthetic = SyntheticConfig {
            actions_per_minute: 60_000,
            max_actions: Some(2),
            ..Default::default()
        };
        let mouse_only = CollectorConfig {
            capture_keyboard: false,
            capture_mouse: true,
        };
        let mut collector = SyntheticCollector::new(mouse_only, synthetic);
        collector.start().unwrap();

        let kinds: Vec<ActionKind> = (0..2)
            .filter_map(|_| collector.receiver().recv_timeout(Duration::from_secs(5)).ok())
            .map(|e| e.kind)
            .collect();
        collector.stop();

        // Every fourth action is a click; the three keys before each are filtered
        assert_eq!(kinds, vec![ActionKind::Click, ActionKind::Click]);
        assert_eq!(collector.counters().filtered(), 6);
        assert_eq!(collector.counters().dropped(), 0);
    }

    #[test]
    fn test_all_sources_disabled_finishes() {
        let none = CollectorConfig {
            capture_keyboard: false,
            capture_mouse: false,
        };
        let mut collector = SyntheticCollector::new(none, SyntheticConfig::default());
        collector.start().unwrap();

        assert!(collector
            .receiver()
            .recv_timeout(Duration::from_millis(200))
            .is_err());
        collector.stop();
        assert!(!collector.is_running());
    }

    #[test]
    fn test_stop_is_prompt_at_low_rate() {
        // 6 apm: each wait is several seconds long
        let synthetic = SyntheticConfig {
            actions_per_minute: 6,
            ..Default::default()
        };
        let mut collector = SyntheticCollector::new(CollectorConfig::default(), synthetic);
        collector.start().unwrap();
        thread::sleep(Duration::from_millis(50));

        let stopping = Instant::now();
        collector.stop();

        assert!(stopping.elapsed() < Duration::from_millis(500));
        assert!(!collector.is_running());
        assert!(collector.receiver().try_recv().is_err());
    }

    #[test]
    fn test_emits_bounded_actions() {
        let synthetic = SyntheticConfig {
            actions_per_minute: 60_000,
            max_actions: Some(5),
            ..Default::default()
        };
        let mut collector = SyntheticCollector::new(CollectorConfig::default(), synthetic);
        collector.start().unwrap();

        let mut received = 0;
        while received < 5 {
            if collector
                .receiver()
                .recv_timeout(Duration::from_secs(5))
                .is_ok()
            {
                received += 1;
            } else {
                break;
            }
        }
        collector.stop();

        assert_eq!(received, 5);
        assert!(!collector.is_running());
    }
}
