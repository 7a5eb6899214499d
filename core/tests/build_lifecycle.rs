//! End-to-end scenarios over the build service against the in-memory store
//! and a mock world-effect port, one case per scenario, matching the
//! teacher's integration-test placement convention.

use std::sync::Arc;

use buildtask_core::clock::FixedClock;
use buildtask_core::memory::MemoryStore;
use buildtask_core::world::{FailingWorldEffectPort, NoopWorldEffectPort};
use buildtask_core::{BoundingBox, BuildService, BuildStatus, LocationService, TaskType};
use chrono::Utc;
use serde_json::json;

fn fill_payload(x2: i64) -> serde_json::Value {
    json!({
        "x1": 0, "y1": 64, "z1": 0, "x2": x2, "y2": 64, "z2": 0,
        "block_type": "minecraft:stone",
    })
}

fn new_service() -> BuildService {
    BuildService::new(
        Arc::new(MemoryStore::new()),
        Arc::new(NoopWorldEffectPort),
        Arc::new(FixedClock::new(Utc::now(), 1_000)),
    )
}

#[tokio::test]
async fn append_then_read_round_trip() {
    let service = new_service();
    let build = service.create_build("Watchtower".to_string(), None, None).await.unwrap();
    let task = service
        .add_task(build.id, TaskType::BlockFill, fill_payload(3), None)
        .await
        .unwrap();

    let tasks = service.list_tasks(build.id).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, task.id);
    assert_eq!(tasks[0].task_order, 0);
}

#[tokio::test]
async fn insert_in_the_middle_renumbers_the_tail() {
    let service = new_service();
    let build = service.create_build("Watchtower".to_string(), None, None).await.unwrap();
    let first = service.add_task(build.id, TaskType::BlockFill, fill_payload(1), None).await.unwrap();
    let second = service.add_task(build.id, TaskType::BlockFill, fill_payload(2), None).await.unwrap();

    let inserted = service
        .insert_task_at(build.id, 1, TaskType::BlockFill, fill_payload(3), None)
        .await
        .unwrap();

    let tasks = service.list_tasks(build.id).await.unwrap();
    let ids: Vec<_> = tasks.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![first.id, inserted.id, second.id]);
}

#[tokio::test]
async fn delete_and_compact_leaves_dense_orders() {
    let service = new_service();
    let build = service.create_build("Watchtower".to_string(), None, None).await.unwrap();
    let t1 = service.add_task(build.id, TaskType::BlockFill, fill_payload(1), None).await.unwrap();
    let t2 = service.add_task(build.id, TaskType::BlockFill, fill_payload(2), None).await.unwrap();
    let _t3 = service.add_task(build.id, TaskType::BlockFill, fill_payload(3), None).await.unwrap();

    service.delete_task(build.id, t1.id).await.unwrap();

    let tasks = service.list_tasks(build.id).await.unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].id, t2.id);
    assert_eq!(tasks[0].task_order, 0);
    assert_eq!(tasks[1].task_order, 1);
}

#[tokio::test]
async fn partial_execute_preserves_progress_for_retry() {
    let service = BuildService::new(
        Arc::new(MemoryStore::new()),
        Arc::new(NoopWorldEffectPort),
        Arc::new(FixedClock::new(Utc::now(), 1_000)),
    );
    let build = service.create_build("Watchtower".to_string(), None, None).await.unwrap();
    service.add_task(build.id, TaskType::BlockFill, fill_payload(1), None).await.unwrap();
    // Malformed: missing block_type, so validation fails inside the executor.
    service
        .add_task(
            build.id,
            TaskType::BlockFill,
            json!({"x1": 0, "y1": 64, "z1": 0, "x2": 2, "y2": 64, "z2": 0}),
            None,
        )
        .await
        .unwrap();

    let summary = service.execute_build(build.id).await.unwrap();
    assert_eq!(summary.tasks_executed, 2);
    assert_eq!(summary.tasks_failed, 1);

    let build_after = service.get_build(build.id).await.unwrap();
    assert_eq!(build_after.status, BuildStatus::Failed);

    let tasks = service.list_tasks(build.id).await.unwrap();
    assert_eq!(tasks[0].status, buildtask_core::TaskStatus::Completed);
    assert_eq!(tasks[1].status, buildtask_core::TaskStatus::Failed);
}

#[tokio::test]
async fn location_query_returns_builds_in_chronological_order() {
    let store = Arc::new(MemoryStore::new());
    let service = BuildService::new(
        store.clone(),
        Arc::new(NoopWorldEffectPort),
        Arc::new(FixedClock::new(Utc::now(), 10_000)),
    );
    let location = LocationService::new(store);

    let earlier = service.create_build("B10".to_string(), None, None).await.unwrap();
    let bbox = json!({"x1": 1, "y1": 64, "z1": 1, "x2": 5, "y2": 68, "z2": 5});
    service.add_task(earlier.id, TaskType::BlockFill, bbox.clone(), None).await.unwrap();

    let later = service.create_build("B20".to_string(), None, None).await.unwrap();
    service.add_task(later.id, TaskType::BlockFill, bbox, None).await.unwrap();

    let result = location
        .query_by_location(
            buildtask_core::domain::DEFAULT_WORLD,
            BoundingBox::from_corners(1, 64, 1, 5, 68, 5),
            true,
        )
        .await
        .unwrap();

    assert_eq!(result.builds.len(), 2);
    assert_eq!(result.builds[0].build.id, earlier.id);
    assert_eq!(result.builds[1].build.id, later.id);
}

#[tokio::test]
async fn audit_warns_on_fill_overlapping_earlier_stairs() {
    let store = Arc::new(MemoryStore::new());
    let service = BuildService::new(
        store.clone(),
        Arc::new(NoopWorldEffectPort),
        Arc::new(FixedClock::new(Utc::now(), 1_000)),
    );
    let location = LocationService::new(store);

    let build = service.create_build("Watchtower".to_string(), None, None).await.unwrap();
    service
        .add_task(
            build.id,
            TaskType::PrefabStairs,
            json!({
                "start_x": 0, "start_y": 64, "start_z": 0,
                "end_x": 2, "end_y": 66, "end_z": 2,
                "block_type": "minecraft:stone",
                "stair_type": "minecraft:stone_stairs",
                "staircase_direction": "north",
            }),
            None,
        )
        .await
        .unwrap();
    for i in 1..=3 {
        service.add_task(build.id, TaskType::BlockFill, fill_payload(i), None).await.unwrap();
    }
    service
        .add_task(
            build.id,
            TaskType::BlockFill,
            json!({"x1": 1, "y1": 65, "z1": 1, "x2": 3, "y2": 65, "z2": 3, "block_type": "minecraft:dirt"}),
            None,
        )
        .await
        .unwrap();

    let report = location.audit_build(build.id).await.unwrap();
    assert!(report.issues.iter().any(|i| i.rule == "fill_overwrites_structure"));
    assert_eq!(report.warnings, report.issues.len());
}

#[tokio::test]
async fn re_execution_is_rejected_once_completed() {
    let service = new_service();
    let build = service.create_build("Watchtower".to_string(), None, None).await.unwrap();
    service.add_task(build.id, TaskType::BlockFill, fill_payload(1), None).await.unwrap();
    service.execute_build(build.id).await.unwrap();

    let err = service.execute_build(build.id).await.unwrap_err();
    assert!(matches!(err, buildtask_core::ServiceError::BuildCompleted(_)));
}

#[tokio::test]
async fn failing_port_marks_build_failed_but_allows_retry() {
    let store = Arc::new(MemoryStore::new());
    let service = BuildService::new(
        store,
        Arc::new(FailingWorldEffectPort { message: "world offline".to_string() }),
        Arc::new(FixedClock::new(Utc::now(), 1_000)),
    );
    let build = service.create_build("Watchtower".to_string(), None, None).await.unwrap();
    service.add_task(build.id, TaskType::BlockFill, fill_payload(1), None).await.unwrap();

    let summary = service.execute_build(build.id).await.unwrap();
    assert!(!summary.success);

    let retried = service.execute_build(build.id).await.unwrap();
    assert!(!retried.success);
}
