//! Line-oriented action source.
//!
//! Each non-empty line read from the input is one action. This lets any
//! external capture tool (or a plain terminal) drive the tracker through a
//! pipe.

use crate::collector::types::{ActionEvent, ActionKind};
use crate::collector::{
    ActionSource, CollectorConfig, CollectorError, SourceCounters, CHANNEL_CAPACITY,
};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::io::{BufRead, BufReader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Reads actions from a line stream on a background thread.
pub struct ReaderCollector {
    config: CollectorConfig,
    input: Option<Box<dyn BufRead + Send>>,
    sender: Option<Sender<ActionEvent>>,
    receiver: Receiver<ActionEvent>,
    running: Arc<AtomicBool>,
    counters: Arc<SourceCounters>,
    thread_handle: Option<JoinHandle<()>>,
}

impl ReaderCollector {
    /// Create a collector over `input`.
    pub fn new(config: CollectorConfig, input: impl BufRead + Send + 'static) -> Self {
        let (sender, receiver) = bounded(CHANNEL_CAPACITY);
        Self {
            config,
            input: Some(Box::new(input)),
            sender: Some(sender),
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(SourceCounters::default()),
            thread_handle: None,
        }
    }

    /// Create a collector over standard input.
    pub fn from_stdin(config: CollectorConfig) -> Self {
        Self::new(config, BufReader::new(std::io::stdin()))
    }

    /// Try to receive an event without blocking.
    pub fn try_recv(&self) -> Option<ActionEvent> {
        self.receiver.try_recv().ok()
    }
}

impl ActionSource for ReaderCollector {
    fn start(&mut self) -> Result<(), CollectorError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CollectorError::AlreadyRunning);
        }

        let (input, sender) = match (self.input.take(), self.sender.take()) {
            (Some(input), Some(sender)) => (input, sender),
            _ => return Err(CollectorError::InputConsumed),
        };

        self.running.store(true, Ordering::SeqCst);

        let running = self.running.clone();
        let counters = self.counters.clone();
        let config = self.config.clone();
        let handle = thread::Builder::new()
            .name("apm-reader".to_string())
            .spawn(move || read_loop(input, sender, running, counters, config))
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                CollectorError::ThreadSpawnFailed(e.to_string())
            })?;

        self.thread_handle = Some(handle);
        Ok(())
    }

    /// Stop reading.
    ///
    /// A thread blocked waiting for input is detached rather than joined; it
    /// exits at its next line or at end of input.
    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            if handle.is_finished() {
                let _ = handle.join();
            }
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

impl Drop for ReaderCollector {
    fn drop(&mut self) {
        self.stop();
    }
}

fn read_loop(
    input: Box<dyn BufRead + Send>,
    sender: Sender<ActionEvent>,
    running: Arc<AtomicBool>,
    counters: Arc<SourceCounters>,
    config: CollectorConfig,
) {
    for line in input.lines() {
        if !running.load(Ordering::SeqCst) {
            break;
        }

        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read action input");
                break;
            }
        };

        let Some(kind) = ActionKind::from_line(&line) else {
            continue;
        };
        if !config.accepts(kind) {
            counters.record_filtered();
            continue;
        }

        match sender.try_send(ActionEvent::new(kind)) {
            Ok(()) => {}
            // Don't block the reader if the consumer falls behind
            Err(TrySendError::Full(_)) => {
                counters.record_dropped();
                tracing::trace!("action channel full, event dropped");
            }
            Err(TrySendError::Disconnected(_)) => break,
        }
    }

    running.store(false, Ordering::SeqCst);
    tracing::debug!(
        filtered = counters.filtered(),
        dropped = counters.dropped(),
        "action input finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reads_actions_until_eof() {
        let input = Cursor::new("a\nclick\n\nb\nmouse up\n");
        let mut collector = ReaderCollector::new(CollectorConfig::default(), input);
        collector.start().unwrap();

        let kinds: Vec<ActionKind> = collector.receiver().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ActionKind::Key,
                ActionKind::Click,
                ActionKind::Key,
                ActionKind::Click
            ]
        );
    }

    #[test]
    fn test_filters_disabled_sources() {
        let config = CollectorConfig {
            capture_keyboard: false,
            capture_mouse: true,
        };
        let input = Cursor::new("a\nclick\nb\n");
        let mut collector = ReaderCollector::new(config, input);
        collector.start().unwrap();

        let events: Vec<ActionEvent> = collector.receiver().iter().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ActionKind::Click);
        assert_eq!(collector.counters().filtered(), 2);
        assert_eq!(collector.counters().dropped(), 0);
    }

    #[test]
    fn test_full_channel_counts_drops() {
        let lines = "a\n".repeat(CHANNEL_CAPACITY + 25);
        let mut collector = ReaderCollector::new(CollectorConfig::default(), Cursor::new(lines));
        collector.start().unwrap();

        // Nothing is received until the reader hits end of input
        while collector.is_running() {
            thread::sleep(std::time::Duration::from_millis(5));
        }

        assert_eq!(collector.receiver().len(), CHANNEL_CAPACITY);
        assert_eq!(collector.counters().dropped(), 25);
        assert_eq!(collector.counters().filtered(), 0);
    }

    #[test]
    fn test_cannot_restart() {
        let mut collector = ReaderCollector::new(CollectorConfig::default(), Cursor::new(""));
        collector.start().unwrap();
        let _ = collector.receiver().iter().count();
        collector.stop();

        assert!(matches!(
            collector.start(),
            Err(CollectorError::InputConsumed)
        ));
    }
}
