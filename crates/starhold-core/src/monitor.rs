//! Per-tick performance sampling with a bounded rolling history.
//!
//! The monitor is purely observational: it records how long each tick took
//! and how much memory the process holds, and warns when either crosses a
//! fixed threshold. It never throttles or reschedules anything.

use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Number of ticks retained in the rolling history.
pub const STATS_HISTORY_CAPACITY: usize = 100;

/// Tick duration above which a slow-tick warning is logged.
pub const SLOW_TICK_THRESHOLD: Duration = Duration::from_millis(100);

/// Resident memory above which a high-memory warning is logged (512 MiB).
pub const HIGH_MEMORY_THRESHOLD_BYTES: u64 = 512 * 1024 * 1024;

/// Statistics for a single tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickStatistics {
    /// The tick number.
    pub tick: u64,
    /// How long the tick took, in microseconds.
    pub duration_us: u64,
    /// Planets whose snapshot changed.
    pub planets_updated: u32,
    /// Buildings completed.
    pub buildings_completed: u32,
    /// Ships completed.
    pub ships_completed: u32,
    /// Ships that arrived.
    pub ships_arrived: u32,
    /// Sessions that received at least one message.
    pub sessions_notified: u32,
    /// Tick of the most recent successful save.
    pub last_save_tick: u64,
    /// Mean duration over the retained window, including this tick.
    pub average_duration_us: u64,
    /// Resident memory in bytes, when the platform exposes it.
    pub memory_bytes: Option<u64>,
}

/// Raw measurements handed to the monitor at the end of a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSample {
    /// The tick number.
    pub tick: u64,
    /// Elapsed wall-clock time.
    pub duration: Duration,
    /// Planets whose snapshot changed.
    pub planets_updated: u32,
    /// Buildings completed.
    pub buildings_completed: u32,
    /// Ships completed.
    pub ships_completed: u32,
    /// Ships that arrived.
    pub ships_arrived: u32,
    /// Sessions notified.
    pub sessions_notified: u32,
    /// Tick of the most recent successful save.
    pub last_save_tick: u64,
}

/// Function that samples the process's resident memory.
pub type MemoryProbe = fn() -> Option<u64>;

/// Rolling window of [`TickStatistics`].
#[derive(Debug, Clone)]
pub struct PerformanceMonitor {
    enabled: bool,
    history: VecDeque<TickStatistics>,
    memory_probe: MemoryProbe,
}

impl PerformanceMonitor {
    /// Create a monitor that samples memory from the operating system.
    pub fn new(enabled: bool) -> Self {
        Self::with_memory_probe(enabled, resident_memory_bytes)
    }

    /// Create a monitor with a custom memory probe.
    pub fn with_memory_probe(enabled: bool, memory_probe: MemoryProbe) -> Self {
        Self {
            enabled,
            history: VecDeque::with_capacity(STATS_HISTORY_CAPACITY),
            memory_probe,
        }
    }

    /// Whether sampling is enabled.
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record one tick.
    ///
    /// Returns the stored statistics, or `None` when monitoring is
    /// disabled. The oldest entry is evicted once the window is full.
    pub fn record(&mut self, sample: &TickSample) -> Option<TickStatistics> {
        if !self.enabled {
            return None;
        }

        let memory_bytes = (self.memory_probe)();
        let duration_us = u64::try_from(sample.duration.as_micros()).unwrap_or(u64::MAX);

        if self.history.len() >= STATS_HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(TickStatistics {
            tick: sample.tick,
            duration_us,
            planets_updated: sample.planets_updated,
            buildings_completed: sample.buildings_completed,
            ships_completed: sample.ships_completed,
            ships_arrived: sample.ships_arrived,
            sessions_notified: sample.sessions_notified,
            last_save_tick: sample.last_save_tick,
            average_duration_us: 0,
            memory_bytes,
        });

        let average = self.average_duration_us();
        let stats = self.history.back_mut()?;
        stats.average_duration_us = average;

        if sample.duration > SLOW_TICK_THRESHOLD {
            warn!(
                tick = sample.tick,
                duration_ms = sample.duration.as_millis(),
                threshold_ms = SLOW_TICK_THRESHOLD.as_millis(),
                "Slow tick"
            );
        }
        if let Some(bytes) = memory_bytes.filter(|b| *b > HIGH_MEMORY_THRESHOLD_BYTES) {
            warn!(
                tick = sample.tick,
                memory_bytes = bytes,
                threshold_bytes = HIGH_MEMORY_THRESHOLD_BYTES,
                "High memory usage"
            );
        }

        Some(stats.clone())
    }

    /// Arithmetic mean of the retained durations, in microseconds.
    ///
    /// Returns 0 for an empty window.
    pub fn average_duration_us(&self) -> u64 {
        let total: u128 = self
            .history
            .iter()
            .map(|s| u128::from(s.duration_us))
            .fold(0, u128::saturating_add);
        let count = u128::try_from(self.history.len()).unwrap_or(u128::MAX);
        total
            .checked_div(count)
            .and_then(|mean| u64::try_from(mean).ok())
            .unwrap_or(0)
    }

    /// The retained window, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &TickStatistics> {
        self.history.iter()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// The most recent entry.
    pub fn latest(&self) -> Option<&TickStatistics> {
        self.history.back()
    }
}

/// Read the process's resident set size.
///
/// Parses `VmRSS` from `/proc/self/status`; returns `None` on platforms
/// without procfs.
pub fn resident_memory_bytes() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kib: u64 = line
        .trim_start_matches("VmRSS:")
        .trim()
        .trim_end_matches("kB")
        .trim()
        .parse()
        .ok()?;
    kib.checked_mul(1024)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    const fn no_memory() -> Option<u64> {
        None
    }

    fn sample(tick: u64, millis: u64) -> TickSample {
        TickSample {
            tick,
            duration: Duration::from_millis(millis),
            ..TickSample::default()
        }
    }

    #[test]
    fn disabled_monitor_records_nothing() {
        let mut monitor = PerformanceMonitor::with_memory_probe(false, no_memory);
        assert!(monitor.record(&sample(1, 5)).is_none());
        assert!(monitor.is_empty());
    }

    #[test]
    fn history_is_bounded_and_fifo() {
        let mut monitor = PerformanceMonitor::with_memory_probe(true, no_memory);
        for tick in 1..=250 {
            let _ = monitor.record(&sample(tick, 1));
            assert!(monitor.len() <= STATS_HISTORY_CAPACITY);
        }
        assert_eq!(monitor.len(), STATS_HISTORY_CAPACITY);
        assert_eq!(monitor.history().next().unwrap().tick, 151);
        assert_eq!(monitor.latest().unwrap().tick, 250);
    }

    #[test]
    fn average_is_mean_of_retained_window() {
        let mut monitor = PerformanceMonitor::with_memory_probe(true, no_memory);
        // 150 ticks: the first 50 take 1000ms, the last 100 take 2ms.
        for tick in 1..=150 {
            let millis = if tick <= 50 { 1000 } else { 2 };
            let stats = monitor.record(&sample(tick, millis)).unwrap();

            let retained: Vec<u64> = monitor.history().map(|s| s.duration_us).collect();
            let expected = retained.iter().sum::<u64>() / u64::try_from(retained.len()).unwrap();
            assert_eq!(stats.average_duration_us, expected);
            assert_eq!(monitor.average_duration_us(), expected);
        }
        // Every slow tick has been evicted.
        assert_eq!(monitor.average_duration_us(), 2000);
    }

    #[test]
    fn statistics_carry_sample_counts() {
        let mut monitor = PerformanceMonitor::with_memory_probe(true, || Some(4096));
        let stats = monitor
            .record(&TickSample {
                tick: 9,
                duration: Duration::from_micros(1500),
                planets_updated: 3,
                buildings_completed: 1,
                ships_completed: 2,
                ships_arrived: 1,
                sessions_notified: 2,
                last_save_tick: 6,
            })
            .unwrap();
        assert_eq!(stats.tick, 9);
        assert_eq!(stats.duration_us, 1500);
        assert_eq!(stats.planets_updated, 3);
        assert_eq!(stats.sessions_notified, 2);
        assert_eq!(stats.last_save_tick, 6);
        assert_eq!(stats.memory_bytes, Some(4096));
    }

    #[test]
    fn empty_window_averages_to_zero() {
        let monitor = PerformanceMonitor::with_memory_probe(true, no_memory);
        assert_eq!(monitor.average_duration_us(), 0);
    }
}
