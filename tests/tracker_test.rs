//! Integration tests for the rate tracker

use apm_tracker::core::{
    create_shared_tracker, Clock, ManualClock, RateTracker, ReportBuilder, TimestampRingBuffer,
    TrackerSettings, TrackerState,
};
use std::sync::Arc;
use std::thread;

fn settings_with_capacity(capacity: usize) -> TrackerSettings {
    TrackerSettings {
        capacity,
        ..Default::default()
    }
}

#[test]
fn test_snapshot_length_is_bounded_by_capacity() {
    for capacity in [1, 2, 7, 64] {
        let buffer = TimestampRingBuffer::new(capacity).unwrap();
        for calls in 0..(capacity * 3) {
            assert_eq!(buffer.snapshot().len(), calls.min(capacity));
            buffer.append(calls as i64);
        }
    }
}

#[test]
fn test_overflow_drops_exactly_the_oldest() {
    let capacity = 10;
    let buffer = TimestampRingBuffer::new(capacity).unwrap();
    let appended: Vec<i64> = (0..37).map(|i| i * 250).collect();
    for &ts in &appended {
        buffer.append(ts);
    }

    let expected = appended[appended.len() - capacity..].to_vec();
    assert_eq!(buffer.snapshot(), expected);
}

#[test]
fn test_current_rate_matches_filter_count() {
    let tracker = RateTracker::new(TrackerSettings::default(), 0).unwrap();
    // Irregular, bursty timestamps
    let mut timestamps = Vec::new();
    let mut t = 0;
    for i in 0..500 {
        t += if i % 17 == 0 { 3_000 } else { 37 + (i % 5) * 90 };
        timestamps.push(t);
        tracker.record_event(t);
    }

    let last = *timestamps.last().unwrap();
    for now in [last, last + 1, last + 30_000, last + 59_999, last + 60_000] {
        let expected = tracker
            .snapshot()
            .iter()
            .filter(|&&ts| now - 60_000 <= ts && ts <= now)
            .count() as u64;
        assert_eq!(tracker.current_rate(now), expected);
    }
}

#[test]
fn test_peak_is_max_of_observed_rates() {
    let tracker = RateTracker::new(TrackerSettings::default(), 0).unwrap();
    let mut observed = Vec::new();
    let mut last_peak = 0;

    for second in 0..300 {
        // Bursts every 40s
        let per_second = if (second / 20) % 2 == 0 { 1 } else { 4 };
        for k in 0..per_second {
            tracker.record_event(second * 1_000 + k * 200);
        }

        if second % 7 == 0 {
            observed.push(tracker.current_rate(second * 1_000 + 999));
            let peak = tracker.peak_rate();
            assert!(peak >= last_peak);
            last_peak = peak;
        }
    }

    assert_eq!(tracker.peak_rate(), *observed.iter().max().unwrap());
}

#[test]
fn test_scenario_capacity_five_evicts_first() {
    let tracker = RateTracker::new(settings_with_capacity(5), 0).unwrap();
    for ts in [0, 1000, 2000, 3000, 4000, 5000] {
        tracker.record_event(ts);
    }

    assert_eq!(tracker.snapshot(), vec![1000, 2000, 3000, 4000, 5000]);
}

#[test]
fn test_scenario_average_at_zero_elapsed() {
    let tracker = RateTracker::new(settings_with_capacity(3600), 0).unwrap();

    let avg = tracker.average_rate(0);
    assert_eq!(avg, 0.0);
    assert!(avg.is_finite());
    assert_eq!(tracker.try_average_rate(0), None);
}

#[test]
fn test_scenario_one_per_second_for_a_minute() {
    let tracker = RateTracker::new(TrackerSettings::default(), 0).unwrap();
    for i in 0..60 {
        tracker.record_event(i * 1_000);
    }

    assert_eq!(tracker.current_rate(60_000), 60);
}

#[test]
fn test_histogram_sum_matches_window() {
    let tracker = RateTracker::new(settings_with_capacity(50), 0).unwrap();
    for i in 0..200 {
        tracker.record_event(i * 700);
    }

    let now = 200 * 700;
    let histogram = tracker.histogram(now, 1_000, 30).unwrap();
    let in_window = tracker
        .snapshot()
        .iter()
        .filter(|&&ts| ts > now - 30_000 && ts <= now)
        .count() as u64;

    assert_eq!(histogram.len(), 30);
    assert_eq!(histogram.total(), in_window);
}

#[test]
fn test_concurrent_producer_and_pollers() {
    let clock = Arc::new(ManualClock::new(0));
    let tracker = create_shared_tracker(settings_with_capacity(1_000), 0).unwrap();
    let events = 20_000;

    let producer = {
        let tracker = tracker.clone();
        let clock = clock.clone();
        thread::spawn(move || {
            for _ in 0..events {
                tracker.record_event(clock.advance(1));
            }
        })
    };

    let pollers: Vec<_> = (0..3)
        .map(|_| {
            let tracker = tracker.clone();
            let clock = clock.clone();
            thread::spawn(move || {
                let mut max_seen = 0;
                for _ in 0..500 {
                    let snapshot = tracker.snapshot();
                    assert!(snapshot.len() <= 1_000);
                    assert!(snapshot.windows(2).all(|w| w[0] <= w[1]));

                    let rate = tracker.current_rate(clock.now_millis());
                    max_seen = max_seen.max(rate);
                    assert!(tracker.peak_rate() >= rate);
                }
                max_seen
            })
        })
        .collect();

    producer.join().unwrap();
    let max_seen = pollers
        .into_iter()
        .map(|p| p.join().unwrap())
        .max()
        .unwrap();

    assert_eq!(tracker.total_recorded(), events);
    assert_eq!(tracker.buffered_events(), 1_000);
    assert!(tracker.peak_rate() >= max_seen);
}

#[test]
fn test_concurrent_producers_share_a_clock() {
    let clock = Arc::new(ManualClock::new(0));
    let tracker = create_shared_tracker(settings_with_capacity(50_000), 0).unwrap();
    let producers = 4;
    let per_producer = 5_000;

    let handles: Vec<_> = (0..producers)
        .map(|_| {
            let tracker = tracker.clone();
            let clock = clock.clone();
            thread::spawn(move || {
                for _ in 0..per_producer {
                    // Reading the clock and appending are separate steps, so
                    // producers can append out of clock order.
                    tracker.record_event(clock.advance(1));
                }
            })
        })
        .collect();

    let poller = {
        let tracker = tracker.clone();
        thread::spawn(move || {
            for _ in 0..200 {
                let snapshot = tracker.snapshot();
                assert!(snapshot.windows(2).all(|w| w[0] <= w[1]));
            }
        })
    };

    for handle in handles {
        handle.join().unwrap();
    }
    poller.join().unwrap();

    let total = (producers * per_producer) as u64;
    let now = clock.now_millis();
    let snapshot = tracker.snapshot();

    assert_eq!(now, total as i64);
    assert_eq!(tracker.total_recorded(), total);
    assert_eq!(snapshot.len() as u64, total);
    assert!(snapshot.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(snapshot.last(), Some(&now));

    for at in [now, now + 30_000, now + 59_999, now + 65_000] {
        let expected = snapshot
            .iter()
            .filter(|&&ts| at - 60_000 <= ts && ts <= at)
            .count() as u64;
        assert_eq!(tracker.current_rate(at), expected);
    }
    assert_eq!(tracker.peak_rate(), total);
}

#[test]
fn test_stopped_tracker_still_reports() {
    let tracker = RateTracker::new(TrackerSettings::default(), 0).unwrap();
    for i in 0..30 {
        tracker.record_event(i * 2_000);
    }
    tracker.stop();
    tracker.record_event(60_000);

    let report = ReportBuilder::new().build(&tracker, 60_000);
    assert_eq!(report.state, TrackerState::Stopped);
    assert_eq!(report.current_rate, 30);
    assert_eq!(report.total_events, 30);
    assert_eq!(report.average_rate, Some(30.0));
}
