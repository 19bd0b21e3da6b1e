//! The tick scheduler: lifecycle, timer and per-tick orchestration.
//!
//! A [`TickScheduler`] is either idle or running. [`TickScheduler::start`]
//! spawns a timer task that fires every `tick_interval_ms`;
//! [`TickScheduler::stop`] disarms it, waits for any in-flight tick to
//! finish, and performs one final full save before returning.
//!
//! Each fire runs [`TickScheduler::tick`]:
//!
//! 1. increment the tick counter (every attempt counts, failed or not)
//! 2. run the phase pipeline into a fresh [`ChangeAccumulator`]
//! 3. broadcast when `tick % broadcast_interval == 0`
//! 4. save when `tick - last_save_tick >= save_interval`
//! 5. sample statistics when monitoring is enabled
//!
//! # Overlap policy
//!
//! Ticks never overlap. The timer task runs each tick inline and uses
//! [`MissedTickBehavior::Skip`], so while a tick overruns its interval the
//! missed fires collapse into a single catch-up fire as soon as it returns.
//! Overruns are logged and counted. Direct calls to [`TickScheduler::tick`]
//! are serialized with timer fires by the same lock.
//!
//! # Failure policy
//!
//! A failing tick is logged, published as [`SchedulerEvent::TickFailed`]
//! and returned to the caller. The running state and the timer are not
//! affected, so the next fire happens on schedule. Nothing is retried
//! explicitly; the next tick re-attempts whatever the world still needs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, Notify, broadcast};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::accumulator::ChangeAccumulator;
use crate::broadcast::broadcast_changes;
use crate::config::{ConfigError, SchedulerConfig};
use crate::events::{EventBus, SchedulerEvent};
use crate::monitor::{PerformanceMonitor, TickSample, TickStatistics};
use crate::persist::{FlushError, FlushReport, flush_all};
use crate::pipeline::{PipelineReport, run_phases};
use crate::source::{PersistenceSink, SessionRegistry, SourceError, World};

/// Errors that abort a tick after the pipeline ran.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TickError {
    /// Enumerating sessions for the broadcast failed.
    #[error("broadcast failed: {source}")]
    Broadcast {
        /// The underlying registry error.
        #[from]
        source: SourceError,
    },

    /// The periodic save failed.
    #[error("save failed: {source}")]
    Save {
        /// The underlying flush error.
        #[from]
        source: FlushError,
    },
}

/// Errors from scheduler construction and lifecycle calls.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The configuration is unusable.
    #[error("invalid scheduler configuration: {source}")]
    Config {
        /// The underlying validation error.
        #[from]
        source: ConfigError,
    },

    /// The final save on stop failed.
    #[error("final save failed: {source}")]
    FinalSave {
        /// The underlying flush error.
        #[from]
        source: FlushError,
    },

    /// The timer task panicked or was cancelled.
    #[error("timer task failed: {source}")]
    Join {
        /// The underlying join error.
        #[from]
        source: tokio::task::JoinError,
    },
}

/// Outcome of one successful tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// The tick number.
    pub tick: u64,
    /// Pipeline failures that were isolated.
    pub pipeline: PipelineReport,
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
    /// The save performed this tick, if one was due.
    pub saved: Option<FlushReport>,
    /// Wall-clock time the tick took.
    pub duration: Duration,
}

fn count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// True when `tick` falls on a multiple of `interval`.
const fn is_due(tick: u64, interval: u64) -> bool {
    matches!(tick.checked_rem(interval), Some(0))
}

struct TimerTask {
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
}

struct Shared<W, P, R> {
    config: SchedulerConfig,
    world: Arc<W>,
    sink: Arc<P>,
    registry: Arc<R>,
    running: AtomicBool,
    tick: AtomicU64,
    last_save_tick: AtomicU64,
    overruns: AtomicU64,
    tick_lock: Mutex<()>,
    monitor: Mutex<PerformanceMonitor>,
    events: EventBus,
}

impl<W, P, R> Shared<W, P, R>
where
    W: World + Send + Sync + 'static,
    P: PersistenceSink + Send + Sync + 'static,
    R: SessionRegistry + Send + Sync + 'static,
{
    async fn tick(&self) -> Result<TickReport, TickError> {
        let _serialized = self.tick_lock.lock().await;

        let tick = self.tick.fetch_add(1, Ordering::AcqRel).saturating_add(1);
        match self.run_tick(tick).await {
            Ok(report) => {
                self.events.emit(SchedulerEvent::Tick { tick });
                Ok(report)
            }
            Err(err) => {
                error!(tick, %err, "Tick failed");
                self.events.emit(SchedulerEvent::TickFailed {
                    tick,
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn run_tick(&self, tick: u64) -> Result<TickReport, TickError> {
        let started = Instant::now();
        let mut acc = ChangeAccumulator::new();

        let pipeline = run_phases(&*self.world, &mut acc, tick, self.config.tick_interval()).await;

        let sessions_notified = if is_due(tick, self.config.broadcast_interval_ticks) {
            broadcast_changes(&*self.registry, &acc, tick).await?
        } else {
            0
        };

        let last_save = self.last_save_tick.load(Ordering::Acquire);
        let saved = if tick.saturating_sub(last_save) >= self.config.save_interval_ticks {
            Some(self.persist(tick).await?)
        } else {
            None
        };

        let report = TickReport {
            tick,
            pipeline,
            planets_updated: count(acc.planets().len()),
            buildings_completed: count(acc.completed_buildings().len()),
            ships_completed: count(acc.completed_ships().len()),
            ships_arrived: count(acc.arrivals().len()),
            sessions_notified,
            saved,
            duration: started.elapsed(),
        };
        drop(acc);

        let sample = TickSample {
            tick,
            duration: report.duration,
            planets_updated: report.planets_updated,
            buildings_completed: report.buildings_completed,
            ships_completed: report.ships_completed,
            ships_arrived: report.ships_arrived,
            sessions_notified,
            last_save_tick: self.last_save_tick.load(Ordering::Acquire),
        };
        if let Some(statistics) = self.monitor.lock().await.record(&sample) {
            self.events.emit(SchedulerEvent::Stats { statistics });
        }

        debug!(
            tick,
            duration_us = u64::try_from(report.duration.as_micros()).unwrap_or(u64::MAX),
            sessions_notified,
            "Tick complete"
        );
        Ok(report)
    }

    /// Full save; advances `last_save_tick` on success.
    async fn persist(&self, tick: u64) -> Result<FlushReport, FlushError> {
        match flush_all(&*self.world, &*self.sink).await {
            Ok(report) => {
                self.last_save_tick.store(tick, Ordering::Release);
                let duration_ms = u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX);
                info!(
                    tick,
                    planets = report.planets,
                    ships = report.ships,
                    duration_ms,
                    "State saved"
                );
                self.events.emit(SchedulerEvent::StateSaved {
                    tick,
                    duration_ms,
                    planets: report.planets,
                    ships: report.ships,
                });
                Ok(report)
            }
            Err(err) => {
                error!(tick, %err, "Save failed");
                self.events.emit(SchedulerEvent::SaveFailed {
                    tick,
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn run_timer(self: Arc<Self>, shutdown: Arc<Notify>) {
        let period = self.config.tick_interval();
        let first = Instant::now().checked_add(period).unwrap_or_else(Instant::now);
        let mut interval = tokio::time::interval_at(first, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                () = shutdown.notified() => break,
                _ = interval.tick() => {
                    let started = Instant::now();
                    // Errors are logged and published inside tick().
                    let _ = self.tick().await;

                    let elapsed = started.elapsed();
                    if elapsed > period {
                        let overruns = self.overruns.fetch_add(1, Ordering::AcqRel).saturating_add(1);
                        warn!(
                            tick = self.tick.load(Ordering::Acquire),
                            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                            interval_ms = self.config.tick_interval_ms,
                            overruns,
                            "Tick overran its interval, coalescing missed fires"
                        );
                    }
                }
            }
        }
    }
}

/// Drives the world on a fixed cadence.
pub struct TickScheduler<W, P, R> {
    shared: Arc<Shared<W, P, R>>,
    timer: Mutex<Option<TimerTask>>,
}

impl<W, P, R> TickScheduler<W, P, R>
where
    W: World + Send + Sync + 'static,
    P: PersistenceSink + Send + Sync + 'static,
    R: SessionRegistry + Send + Sync + 'static,
{
    /// Create an idle scheduler.
    pub fn new(
        config: SchedulerConfig,
        world: Arc<W>,
        sink: Arc<P>,
        registry: Arc<R>,
    ) -> Result<Self, SchedulerError> {
        let monitor = PerformanceMonitor::new(config.performance_monitoring);
        Self::with_monitor(config, world, sink, registry, monitor)
    }

    /// Create an idle scheduler with a preconfigured performance monitor.
    pub fn with_monitor(
        config: SchedulerConfig,
        world: Arc<W>,
        sink: Arc<P>,
        registry: Arc<R>,
        monitor: PerformanceMonitor,
    ) -> Result<Self, SchedulerError> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                world,
                sink,
                registry,
                running: AtomicBool::new(false),
                tick: AtomicU64::new(0),
                last_save_tick: AtomicU64::new(0),
                overruns: AtomicU64::new(0),
                tick_lock: Mutex::new(()),
                monitor: Mutex::new(monitor),
                events: EventBus::new(),
            }),
            timer: Mutex::new(None),
        })
    }

    /// Arm the timer. Does nothing if already running.
    pub async fn start(&self) {
        let mut timer = self.timer.lock().await;
        if timer.is_some() {
            info!("Tick scheduler already running");
            return;
        }

        let shutdown = Arc::new(Notify::new());
        let handle = tokio::spawn(Arc::clone(&self.shared).run_timer(Arc::clone(&shutdown)));
        *timer = Some(TimerTask { shutdown, handle });
        self.shared.running.store(true, Ordering::Release);

        let tick_interval_ms = self.shared.config.tick_interval_ms;
        info!(
            tick_interval_ms,
            save_interval_ticks = self.shared.config.save_interval_ticks,
            broadcast_interval_ticks = self.shared.config.broadcast_interval_ticks,
            "Tick scheduler started"
        );
        self.shared
            .events
            .emit(SchedulerEvent::Started { tick_interval_ms });
    }

    /// Disarm the timer, wait for an in-flight tick, and save everything.
    ///
    /// Does nothing (and saves nothing) if the scheduler is idle.
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        let mut timer = self.timer.lock().await;
        let Some(task) = timer.take() else {
            debug!("Tick scheduler not running, stop ignored");
            return Ok(());
        };

        task.shutdown.notify_one();
        self.shared.running.store(false, Ordering::Release);
        let joined = task.handle.await;

        let tick = self.tick_count();
        let saved = {
            let _serialized = self.shared.tick_lock.lock().await;
            self.shared.persist(tick).await
        };

        info!(tick, "Tick scheduler stopped");
        self.shared.events.emit(SchedulerEvent::Stopped { tick });

        joined?;
        saved?;
        Ok(())
    }

    /// Run one tick now.
    ///
    /// The timer calls this on every fire; it can also be driven manually
    /// while idle.
    pub async fn tick(&self) -> Result<TickReport, TickError> {
        self.shared.tick().await
    }

    /// Whether the timer is armed.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Number of tick attempts so far.
    pub fn tick_count(&self) -> u64 {
        self.shared.tick.load(Ordering::Acquire)
    }

    /// Tick of the most recent successful save (0 if none).
    pub fn last_save_tick(&self) -> u64 {
        self.shared.last_save_tick.load(Ordering::Acquire)
    }

    /// Number of ticks that outlasted their interval.
    pub fn overruns(&self) -> u64 {
        self.shared.overruns.load(Ordering::Acquire)
    }

    /// The active configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    /// Subscribe to lifecycle and statistics events.
    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.shared.events.subscribe()
    }

    /// The retained statistics window, oldest first.
    pub async fn statistics(&self) -> Vec<TickStatistics> {
        self.shared.monitor.lock().await.history().cloned().collect()
    }
}
