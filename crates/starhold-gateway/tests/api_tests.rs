//! Integration tests for the gateway API and session registry.
//!
//! REST tests use Axum's `Router` directly via `tower::ServiceExt`
//! without starting a TCP server. The registry test drives a real tick
//! scheduler against the gateway's sessions.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value;
use starhold_core::events::SchedulerEvent;
use starhold_core::memory::{InMemorySink, InMemoryWorld};
use starhold_core::monitor::TickStatistics;
use starhold_core::{SchedulerConfig, TickScheduler};
use starhold_gateway::build_router;
use starhold_gateway::state::GatewayState;
use starhold_types::{Planet, PlanetId, PlayerId, Resources, ServerMessage};
use tower::ServiceExt;

fn stats(tick: u64) -> TickStatistics {
    TickStatistics {
        tick,
        duration_us: tick.saturating_mul(10),
        planets_updated: 1,
        buildings_completed: 0,
        ships_completed: 0,
        ships_arrived: 0,
        sessions_notified: 1,
        last_save_tick: 0,
        average_duration_us: tick.saturating_mul(5),
        memory_bytes: None,
    }
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(state: Arc<GatewayState>, uri: &str) -> (StatusCode, Value) {
    let response = build_router(state)
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

// =========================================================================
// REST
// =========================================================================

#[tokio::test]
async fn status_before_start() {
    let state = Arc::new(GatewayState::new());
    let (status, json) = get(state, "/api/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["running"], false);
    assert_eq!(json["last_tick"], 0);
    assert_eq!(json["sessions"], 0);
    assert!(json["last_save_tick"].is_null());
}

#[tokio::test]
async fn status_reflects_events_and_sessions() {
    let state = Arc::new(GatewayState::new());
    let (_id, _rx) = state.register(PlayerId::new()).await;
    state
        .record_event(&SchedulerEvent::Started {
            tick_interval_ms: 1000,
        })
        .await;
    state.record_event(&SchedulerEvent::Tick { tick: 42 }).await;
    state
        .record_event(&SchedulerEvent::StateSaved {
            tick: 40,
            duration_ms: 2,
            planets: 3,
            ships: 1,
        })
        .await;

    let (status, json) = get(state, "/api/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["running"], true);
    assert_eq!(json["tick_interval_ms"], 1000);
    assert_eq!(json["last_tick"], 42);
    assert_eq!(json["last_save_tick"], 40);
    assert_eq!(json["sessions"], 1);
}

#[tokio::test]
async fn stats_returns_most_recent_entries() {
    let state = Arc::new(GatewayState::new());
    for tick in 1..=5 {
        state
            .record_event(&SchedulerEvent::Stats {
                statistics: stats(tick),
            })
            .await;
    }

    let (status, json) = get(state, "/api/stats?limit=2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 2);
    assert_eq!(json["stats"][0]["tick"], 4);
    assert_eq!(json["stats"][1]["tick"], 5);
    assert_eq!(json["average_duration_us"], 25);
}

#[tokio::test]
async fn stats_history_is_bounded() {
    let state = Arc::new(GatewayState::new());
    for tick in 1..=150 {
        state
            .record_event(&SchedulerEvent::Stats {
                statistics: stats(tick),
            })
            .await;
    }

    let (_, json) = get(state, "/api/stats").await;
    assert_eq!(json["count"], 100);
    assert_eq!(json["stats"][0]["tick"], 51);
}

#[tokio::test]
async fn stats_rejects_out_of_range_limit() {
    let state = Arc::new(GatewayState::new());
    let (status, json) = get(Arc::clone(&state), "/api/stats?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);

    let (status, _) = get(state, "/api/stats?limit=101").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let state = Arc::new(GatewayState::new());
    let response = build_router(state)
        .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =========================================================================
// Registry
// =========================================================================

#[tokio::test]
async fn scheduler_delivers_to_gateway_sessions() {
    let owner = PlayerId::new();
    let world = Arc::new(InMemoryWorld::new());
    let planet = Planet {
        id: PlanetId::new(),
        name: String::from("Hoth"),
        owner: Some(owner),
        resources: Resources::ZERO,
        buildings: Vec::new(),
        updated_at: Utc::now(),
    };
    let planet_id = planet.id;
    world.insert_planet(planet).await;
    world
        .set_production(
            planet_id,
            Resources::new(Decimal::from(3600), Decimal::ZERO, Decimal::ZERO),
        )
        .await;

    let gateway = Arc::new(GatewayState::new());
    let (_owner_session, mut owner_rx) = gateway.register(owner).await;
    let (_other_session, mut other_rx) = gateway.register(PlayerId::new()).await;

    let scheduler = TickScheduler::new(
        SchedulerConfig::default(),
        world,
        Arc::new(InMemorySink::new()),
        Arc::clone(&gateway),
    )
    .unwrap();
    let report = scheduler.tick().await.unwrap();

    assert_eq!(report.sessions_notified, 1);
    match owner_rx.try_recv().unwrap() {
        ServerMessage::PlanetUpdated { planet, .. } => {
            assert_eq!(planet.id, planet_id);
            assert_eq!(planet.resources.minerals, Decimal::ONE);
        }
        other => panic!("unexpected message {other:?}"),
    }
    assert!(owner_rx.try_recv().is_err());
    assert!(other_rx.try_recv().is_err());
}
