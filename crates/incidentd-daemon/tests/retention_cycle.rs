//! End-to-end retention scenarios against a real store.

use std::sync::Arc;
use std::time::Duration;

use incidentd_core::clock::{Clock, FixedClock};
use incidentd_core::synth::TicketGenerator;
use incidentd_core::ticket::{
    Category, ErrorClass, NewTicket, Priority, TicketStatus,
};
use incidentd_daemon::{EngineError, LifecycleEngine, TicketStore};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::TempDir;

const FIVE_HOURS: Duration = Duration::from_secs(5 * 3_600);

fn engine_with_clock() -> (LifecycleEngine, Arc<FixedClock>) {
    let store = Arc::new(TicketStore::in_memory().expect("in-memory store"));
    let clock = Arc::new(FixedClock::new(0));
    (LifecycleEngine::new(store, clock.clone()), clock)
}

fn open_ticket(summary: &str) -> NewTicket {
    NewTicket {
        application: "InventorySystem".to_string(),
        server: "Server-21".to_string(),
        error_class: ErrorClass::Infrastructure,
        summary: summary.to_string(),
        priority: Priority::High,
        category: Category::Database,
        status: TicketStatus::Open,
    }
}

/// A and B created at t=0 and linked; six hours later a
/// five-hour cycle retires both, drops the edge, and empties the active set.
#[test]
fn linked_tickets_expire_together() {
    let (engine, clock) = engine_with_clock();

    let a = engine.create_ticket(&open_ticket("a")).expect("create a");
    let b = engine.create_ticket(&open_ticket("b")).expect("create b");
    engine.link_dependency(a, b).expect("link a -> b");

    clock.advance(Duration::from_secs(6 * 3_600));
    let report = engine.run_retention_cycle(FIVE_HOURS).expect("cycle");

    assert_eq!(report.scanned, 2);
    assert_eq!(report.archived, 2);
    assert!(report.is_complete());

    let store = engine.store();
    assert_eq!(store.active_count().expect("count"), 0);
    assert_eq!(store.edge_count().expect("count"), 0);
    assert_eq!(store.history_count().expect("count"), 2);

    let record = store.history_for_ticket(a).expect("query").expect("archived");
    assert_eq!(record.original_ticket_id, a);
    assert_eq!(record.archived_at_ns, clock.now_ns());
    assert!(store.history_for_ticket(b).expect("query").is_some());
}

/// C at t=0 and D at t=4h; at t=6h a five-hour window
/// retires only C.
#[test]
fn window_splits_old_from_recent() {
    let (engine, clock) = engine_with_clock();

    let c = engine.create_ticket(&open_ticket("c")).expect("create c");
    clock.advance(Duration::from_secs(4 * 3_600));
    let d = engine.create_ticket(&open_ticket("d")).expect("create d");
    clock.advance(Duration::from_secs(2 * 3_600));

    let report = engine.run_retention_cycle(FIVE_HOURS).expect("cycle");
    assert_eq!(report.archived, 1);

    let store = engine.store();
    assert!(store.get_ticket(c).expect("query").is_none());
    assert!(store.get_ticket(d).expect("query").is_some());
    assert!(store.history_for_ticket(c).expect("query").is_some());
    assert!(store.history_for_ticket(d).expect("query").is_none());
}

/// A self-link fails and inserts nothing.
#[test]
fn self_link_is_rejected() {
    let (engine, _clock) = engine_with_clock();
    let x = engine.create_ticket(&open_ticket("x")).expect("create");

    let err = engine.link_dependency(x, x).expect_err("self link");
    assert!(matches!(err, EngineError::SelfLink { .. }));
    assert_eq!(engine.store().edge_count().expect("count"), 0);
}

/// Tickets created while a cycle is due are never candidates for that
/// cycle: their timestamps sit at `now`, after the cutoff.
#[test]
fn fresh_tickets_survive_a_cycle_at_creation_time() {
    let (engine, clock) = engine_with_clock();

    engine.create_ticket(&open_ticket("old")).expect("create");
    clock.advance(Duration::from_secs(6 * 3_600));
    let fresh = engine.create_ticket(&open_ticket("fresh")).expect("create");

    let report = engine.run_retention_cycle(FIVE_HOURS).expect("cycle");
    assert_eq!(report.archived, 1);
    assert!(engine.store().get_ticket(fresh).expect("query").is_some());
}

/// Conservation: after any number of creations and cycles, every created
/// ticket is either still active or archived exactly once, and no edge
/// references a retired ticket.
#[test]
fn conservation_and_integrity_over_many_cycles() {
    let (engine, clock) = engine_with_clock();
    let mut generator = TicketGenerator::new(StdRng::seed_from_u64(2024));
    let mut created = 0u64;

    for round in 0u64..12 {
        let mut ids = Vec::new();
        for ticket in generator.batch(5) {
            ids.push(engine.create_ticket(&ticket).expect("create"));
            created += 1;
        }
        if let Some((parent, child)) = generator.pick_link(&ids) {
            engine.link_dependency(parent, child).expect("link");
        }

        // Uneven gaps so different rounds expire in different cycles.
        clock.advance(Duration::from_secs(3_600 * (1 + round % 3)));
        let report = engine.run_retention_cycle(FIVE_HOURS).expect("cycle");
        assert!(report.is_complete());

        let store = engine.store();
        let active = store.active_count().expect("count");
        let history = store.history_count().expect("count");
        assert_eq!(active + history, created);

        // No dangling edges at any observable point.
        for (_, parent, child) in store.edges().expect("edges") {
            assert!(store.get_ticket(parent).expect("query").is_some());
            assert!(store.get_ticket(child).expect("query").is_some());
        }
    }

    // Long quiet period: everything left active ages out.
    clock.advance(Duration::from_secs(24 * 3_600));
    let report = engine.run_retention_cycle(FIVE_HOURS).expect("cycle");
    assert!(report.is_complete());

    let store = engine.store();
    assert_eq!(store.active_count().expect("count"), 0);
    assert_eq!(store.history_count().expect("count"), created);
    assert_eq!(store.edge_count().expect("count"), 0);
}

/// Retention state survives process restarts: archived tickets stay
/// archived, pending tickets stay pending, and re-running schema setup on
/// every open never disturbs either.
#[test]
fn retention_state_survives_reopen() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("tickets.db");
    let clock = Arc::new(FixedClock::new(0));

    let (old_id, fresh_id) = {
        let store = Arc::new(TicketStore::open(&path).expect("open"));
        let engine = LifecycleEngine::new(store, clock.clone());
        let old_id = engine.create_ticket(&open_ticket("old")).expect("create");
        clock.advance(Duration::from_secs(6 * 3_600));
        let fresh_id = engine.create_ticket(&open_ticket("fresh")).expect("create");
        engine.run_retention_cycle(FIVE_HOURS).expect("cycle");
        (old_id, fresh_id)
    };

    let store = Arc::new(TicketStore::open(&path).expect("reopen"));
    let engine = LifecycleEngine::new(store, clock.clone());

    let store = engine.store();
    assert!(store.get_ticket(old_id).expect("query").is_none());
    assert!(store.history_for_ticket(old_id).expect("query").is_some());
    assert!(store.get_ticket(fresh_id).expect("query").is_some());

    // The survivor ages out after the restart.
    clock.advance(Duration::from_secs(6 * 3_600));
    let report = engine.run_retention_cycle(FIVE_HOURS).expect("cycle");
    assert_eq!(report.archived, 1);
    assert!(store.history_for_ticket(fresh_id).expect("query").is_some());
}

/// A cycle against an empty or fully-recent store is a no-op, repeatedly.
#[test]
fn idle_cycles_are_noops() {
    let (engine, clock) = engine_with_clock();

    for _ in 0..3 {
        let report = engine.run_retention_cycle(FIVE_HOURS).expect("cycle");
        assert_eq!(report.scanned, 0);
        clock.advance(Duration::from_secs(300));
    }

    engine.create_ticket(&open_ticket("recent")).expect("create");
    let report = engine.run_retention_cycle(FIVE_HOURS).expect("cycle");
    assert_eq!(report.scanned, 0);
    assert_eq!(engine.store().active_count().expect("count"), 1);
}
