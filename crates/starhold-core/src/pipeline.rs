//! The ordered phase pipeline run once per tick.
//!
//! 1. **Resource accrual**: every tracked planet gains its per-tick share of
//!    hourly production. Failures are isolated per planet.
//! 2. **Building completion**: every active construction queue advances by
//!    one tick; completed buildings are recorded and their planet is marked
//!    changed. A planet whose lookup fails is skipped and its queue is left
//!    untouched.
//! 3. **Ship completion**: every planet's shipyard queue advances by one
//!    tick; completed ships are recorded.
//! 4. **Movement**: every ship in transit advances by one tick; arrivals are
//!    recorded both as movement and as arrivals.
//!
//! Phases 2 to 4 are isolated per phase: an error aborts the rest of that
//! phase (work recorded before the error is kept) and the next phase still
//! runs. No phase retries. Work that failed this tick is attempted again by
//! the next tick simply because the world state still calls for it.

use std::fmt;
use std::time::Duration;

use rust_decimal::Decimal;
use starhold_types::{ChangeFlags, Resources, SECONDS_PER_HOUR};
use tracing::{debug, warn};

use crate::accumulator::ChangeAccumulator;
use crate::source::{SourceError, World};

/// One step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    /// Resource accrual.
    ResourceAccrual,
    /// Building completion.
    BuildingCompletion,
    /// Ship completion.
    ShipCompletion,
    /// Movement advancement.
    Movement,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ResourceAccrual => "resource_accrual",
            Self::BuildingCompletion => "building_completion",
            Self::ShipCompletion => "ship_completion",
            Self::Movement => "movement",
        };
        f.write_str(name)
    }
}

/// What went wrong during one pass of the pipeline.
///
/// Successful work is recorded in the [`ChangeAccumulator`]; this only
/// tracks failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Planets skipped by resource accrual.
    pub accrual_failures: u32,
    /// Phases that aborted early.
    pub failed_phases: Vec<Phase>,
}

impl PipelineReport {
    /// Whether every phase ran to completion for every entity.
    pub fn is_clean(&self) -> bool {
        self.accrual_failures == 0 && self.failed_phases.is_empty()
    }
}

/// Per-tick share of an hourly production rate.
///
/// `hourly / 3600 * seconds`, where `seconds` is the tick length. Returns
/// `None` on decimal overflow.
pub fn per_tick_delta(hourly: &Resources, tick_interval: Duration) -> Option<Resources> {
    let millis = i64::try_from(tick_interval.as_millis()).ok()?;
    let seconds = Decimal::from(millis).checked_div(Decimal::from(1000))?;
    hourly
        .checked_div(Decimal::from(SECONDS_PER_HOUR))?
        .checked_scale(seconds)
}

/// Run every phase in order against `world`, recording into `acc`.
pub async fn run_phases<W>(
    world: &W,
    acc: &mut ChangeAccumulator,
    tick: u64,
    tick_interval: Duration,
) -> PipelineReport
where
    W: World + Sync,
{
    let mut report = PipelineReport::default();

    // --- Phase 1: Resource accrual ---
    match phase_resource_accrual(world, acc, tick, tick_interval).await {
        Ok(failures) => report.accrual_failures = failures,
        Err(err) => fail_phase(&mut report, Phase::ResourceAccrual, tick, &err),
    }

    // --- Phase 2: Building completion ---
    if let Err(err) = phase_building_completion(world, acc).await {
        fail_phase(&mut report, Phase::BuildingCompletion, tick, &err);
    }

    // --- Phase 3: Ship completion ---
    if let Err(err) = phase_ship_completion(world, acc).await {
        fail_phase(&mut report, Phase::ShipCompletion, tick, &err);
    }

    // --- Phase 4: Movement ---
    if let Err(err) = phase_movement(world, acc).await {
        fail_phase(&mut report, Phase::Movement, tick, &err);
    }

    debug!(
        tick,
        planets = acc.planets().len(),
        ships_moved = acc.ships().len(),
        buildings_completed = acc.completed_buildings().len(),
        ships_completed = acc.completed_ships().len(),
        ships_arrived = acc.arrivals().len(),
        "Phases complete"
    );

    report
}

fn fail_phase(report: &mut PipelineReport, phase: Phase, tick: u64, err: &SourceError) {
    warn!(tick, %phase, %err, "Phase failed");
    report.failed_phases.push(phase);
}

/// Accrue production on every tracked planet.
///
/// Returns the number of planets skipped because of a per-planet error.
/// Only a failure to enumerate planets fails the phase as a whole.
pub async fn phase_resource_accrual<W>(
    world: &W,
    acc: &mut ChangeAccumulator,
    tick: u64,
    tick_interval: Duration,
) -> Result<u32, SourceError>
where
    W: World + Sync,
{
    let planets = world.planets().await?;
    let mut failures: u32 = 0;

    for planet in &planets {
        let result = async {
            let hourly = world.hourly_production(planet).await?;
            let delta = per_tick_delta(&hourly, tick_interval).ok_or_else(|| {
                SourceError::Backend {
                    operation: "per_tick_delta",
                    message: String::from("decimal overflow"),
                }
            })?;
            world.apply_resource_delta(planet.id, delta).await
        }
        .await;

        match result {
            Ok(Some(updated)) => acc.record_planet(updated, ChangeFlags::RESOURCES),
            Ok(None) => {}
            Err(err) => {
                warn!(tick, planet_id = %planet.id, %err, "Resource accrual failed for planet");
                failures = failures.saturating_add(1);
            }
        }
    }

    Ok(failures)
}

/// Advance every active building queue.
pub async fn phase_building_completion<W>(
    world: &W,
    acc: &mut ChangeAccumulator,
) -> Result<(), SourceError>
where
    W: World + Sync,
{
    for planet_id in world.active_queues().await? {
        // The owner is resolved before the queue is touched so a failed
        // lookup leaves the finished entries queued for the next tick.
        let owner = match world.planet(planet_id).await {
            Ok(planet) => planet.and_then(|p| p.owner),
            Err(e) => {
                warn!(
                    planet_id = %planet_id,
                    error = %e,
                    "Planet lookup failed, queue not advanced"
                );
                continue;
            }
        };

        let completed = world.advance_building_queue(planet_id).await?;
        if completed.is_empty() {
            continue;
        }
        for building in completed {
            acc.push_completed_building(planet_id, owner, building);
        }

        match world.planet(planet_id).await {
            Ok(Some(planet)) => acc.record_planet(planet, ChangeFlags::BUILDINGS),
            Ok(None) => {}
            Err(e) => {
                warn!(
                    planet_id = %planet_id,
                    error = %e,
                    "Planet snapshot unavailable after completion"
                );
            }
        }
    }
    Ok(())
}

/// Advance every planet's ship-construction queue.
pub async fn phase_ship_completion<W>(
    world: &W,
    acc: &mut ChangeAccumulator,
) -> Result<(), SourceError>
where
    W: World + Sync,
{
    for planet in world.planets().await? {
        for ship in world.advance_ship_queue(planet.id).await? {
            acc.push_completed_ship(planet.id, ship);
        }
    }
    Ok(())
}

/// Advance every ship in transit.
pub async fn phase_movement<W>(world: &W, acc: &mut ChangeAccumulator) -> Result<(), SourceError>
where
    W: World + Sync,
{
    for ship in world.ships_in_transit().await? {
        let outcome = world.advance_ship(ship.id).await?;
        if outcome.arrived {
            acc.push_arrival(outcome.voyage.destination, outcome.ship.clone());
        }
        acc.record_ship_movement(outcome.ship, outcome.voyage);
    }
    Ok(())
}
