//! Integration tests for worker lifecycle scenarios.

mod common;

use aegis_proto::{StatusReport, TaskRequirements};
use aegis_scheduler::{SchedulerError, WorkerStatus};
use common::{fixtures, fixtures::WorkerBuilder, TestScheduler};
use std::time::Duration;
use tokio::time::sleep;

#[tokio::test]
async fn worker_registration_through_to_first_assignment() {
    let scheduler = TestScheduler::new();

    let request = WorkerBuilder::new("worker-1")
        .with_address("127.0.0.1:9101")
        .build();
    scheduler.registry.register(&request).unwrap();

    // First heartbeat reports real readings
    scheduler
        .registry
        .update_heartbeat("worker-1", &fixtures::report(0, 0.2, 0.3))
        .unwrap();

    // Selector picks the worker and the ledger records the assignment
    let workers = scheduler.registry.list_all();
    let selected = scheduler
        .app_state
        .selector
        .select(&TaskRequirements::none(), &workers)
        .unwrap();
    assert_eq!(selected, "worker-1");

    scheduler.ledger.assign_task("task-1", &selected).unwrap();

    let node = scheduler.registry.get("worker-1").unwrap();
    assert_eq!(node.current_load, 1);
    assert_eq!(node.tasks_processed, 1);
    assert_eq!(scheduler.ledger.history_len(), 1);
}

#[tokio::test]
async fn reregistration_resets_load_but_keeps_the_slot() {
    let scheduler = TestScheduler::new();

    scheduler
        .registry
        .register(&WorkerBuilder::new("worker-1").build())
        .unwrap();
    scheduler.ledger.assign_task("task-1", "worker-1").unwrap();
    scheduler.ledger.assign_task("task-2", "worker-1").unwrap();
    assert_eq!(scheduler.registry.get("worker-1").unwrap().current_load, 2);

    // Worker restarts and re-registers with upgraded hardware
    let upgraded = WorkerBuilder::new("worker-1")
        .with_cpu_cores(8)
        .with_memory(16_000_000_000)
        .with_gpu(8_000_000_000)
        .build();
    scheduler.registry.register(&upgraded).unwrap();

    assert_eq!(scheduler.registry.len(), 1);
    let node = scheduler.registry.get("worker-1").unwrap();
    assert_eq!(node.current_load, 0);
    assert_eq!(node.status, WorkerStatus::Active);
    assert!(node.capabilities.has_gpu);
}

#[tokio::test]
async fn stale_worker_demoted_then_reactivated_by_heartbeat() {
    let scheduler = TestScheduler::with_fast_staleness();

    scheduler
        .registry
        .register(&WorkerBuilder::new("worker-1").build())
        .unwrap();

    // Let the heartbeat go overdue, then sweep
    sleep(Duration::from_millis(150)).await;
    let report = scheduler.sweep();
    assert_eq!(report.demoted, vec!["worker-1".to_string()]);
    assert!(report.evicted.is_empty());
    assert_eq!(
        scheduler.registry.get("worker-1").unwrap().status,
        WorkerStatus::Inactive
    );

    // A late heartbeat brings the worker back into rotation
    scheduler
        .registry
        .update_heartbeat("worker-1", &StatusReport::idle())
        .unwrap();
    assert_eq!(
        scheduler.registry.get("worker-1").unwrap().status,
        WorkerStatus::Active
    );
    assert_eq!(scheduler.registry.active_count(), 1);
}

#[tokio::test]
async fn silent_worker_eventually_evicted() {
    let scheduler = TestScheduler::with_fast_staleness();

    scheduler
        .registry
        .register(&WorkerBuilder::new("worker-1").build())
        .unwrap();

    // Past the eviction window the record is removed outright
    sleep(Duration::from_millis(450)).await;
    let report = scheduler.sweep();
    assert_eq!(report.evicted, vec!["worker-1".to_string()]);
    assert!(scheduler.registry.is_empty());

    // Once evicted, heartbeats are rejected; the worker must re-register
    let result = scheduler
        .registry
        .update_heartbeat("worker-1", &StatusReport::idle());
    assert!(matches!(result, Err(SchedulerError::WorkerNotFound(_))));
}

#[tokio::test]
async fn demoted_worker_is_skipped_until_it_heartbeats_again() {
    let scheduler = TestScheduler::with_fast_staleness();

    for request in fixtures::create_workers("worker", 2) {
        scheduler.registry.register(&request).unwrap();
    }

    // Only worker-1 keeps heartbeating
    sleep(Duration::from_millis(150)).await;
    scheduler
        .registry
        .update_heartbeat("worker-1", &StatusReport::idle())
        .unwrap();

    let report = scheduler.sweep();
    assert_eq!(report.demoted, vec!["worker-0".to_string()]);

    // Assignment skips the demoted worker even though its id sorts first
    let workers = scheduler.registry.list_all();
    let selected = scheduler
        .app_state
        .selector
        .select(&TaskRequirements::none(), &workers)
        .unwrap();
    assert_eq!(selected, "worker-1");
}

#[tokio::test]
async fn shutdown_notice_takes_worker_out_of_rotation() {
    let scheduler = TestScheduler::new();

    for request in fixtures::create_workers("worker", 2) {
        scheduler.registry.register(&request).unwrap();
    }
    scheduler.ledger.assign_task("task-1", "worker-0").unwrap();

    // worker-0 announces shutdown while still holding a task
    scheduler.registry.mark_inactive("worker-0").unwrap();

    let node = scheduler.registry.get("worker-0").unwrap();
    assert_eq!(node.status, WorkerStatus::Inactive);
    assert_eq!(node.current_load, 0);

    // Every subsequent assignment lands on the surviving worker
    for task in ["task-2", "task-3", "task-4"] {
        let workers = scheduler.registry.list_all();
        let selected = scheduler
            .app_state
            .selector
            .select(&TaskRequirements::none(), &workers)
            .unwrap();
        assert_eq!(selected, "worker-1");
        scheduler.ledger.assign_task(task, &selected).unwrap();
    }
    assert_eq!(scheduler.registry.get("worker-1").unwrap().current_load, 3);
}
