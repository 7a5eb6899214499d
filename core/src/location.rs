//! Location & audit service (C8).
//!
//! Both operations are pure reads over the persistence adapter: spatial
//! intersection queries across builds, and a fixed set of static lint
//! checks over a single build's pending queue. Neither touches the world.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::coordinate::BoundingBox;
use crate::domain::{Build, BuildStatus, Task, TaskType};
use crate::error::ServiceError;
use crate::repository::BuildRepository;

#[derive(Debug, Clone, Serialize)]
pub struct BuildWithTasks {
    pub build: Build,
    pub intersecting_tasks: Vec<Task>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationQueryResult {
    pub query_area: BoundingBox,
    pub build_count: usize,
    pub total_task_count: usize,
    pub builds: Vec<BuildWithTasks>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditIssue {
    pub severity: AuditSeverity,
    pub rule: &'static str,
    pub message: String,
    pub task_orders: Vec<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub build_id: Uuid,
    pub issues: Vec<AuditIssue>,
    pub warnings: usize,
    pub errors: usize,
}

pub struct LocationService {
    repo: Arc<dyn BuildRepository>,
}

impl LocationService {
    pub fn new(repo: Arc<dyn BuildRepository>) -> Self {
        Self { repo }
    }

    /// Finds builds whose tasks intersect `query` in `world`, ordered by
    /// `created_at` ascending (ties by `id`), each annotated with only the
    /// tasks that actually intersect the box.
    pub async fn query_by_location(
        &self,
        world: &str,
        query: BoundingBox,
        include_in_progress: bool,
    ) -> Result<LocationQueryResult, ServiceError> {
        let builds = self.repo.list_builds_intersecting(world, query).await?;
        let builds: Vec<Build> = builds
            .into_iter()
            .filter(|b| include_in_progress || b.status != BuildStatus::InProgress)
            .collect();

        let mut total_task_count = 0usize;
        let mut results = Vec::with_capacity(builds.len());
        for build in builds {
            let tasks = self.repo.get_tasks_ordered(build.id).await?;
            let intersecting: Vec<Task> = tasks
                .into_iter()
                .filter(|t| t.bounds.is_some_and(|bb| bb.intersects(&query)))
                .collect();
            total_task_count += intersecting.len();
            results.push(BuildWithTasks {
                build,
                intersecting_tasks: intersecting,
            });
        }

        Ok(LocationQueryResult {
            query_area: query,
            build_count: results.len(),
            total_task_count,
            builds: results,
        })
    }

    /// Runs the fixed set of static lint rules over a build's current queue.
    pub async fn audit_build(&self, build_id: Uuid) -> Result<AuditReport, ServiceError> {
        self.repo
            .get_build(build_id)
            .await?
            .ok_or(ServiceError::BuildNotFound(build_id))?;
        let tasks = self.repo.get_tasks_ordered(build_id).await?;

        let mut issues = Vec::new();
        issues.extend(stair_direction_mismatches(&tasks));
        issues.extend(fill_overwrites_earlier_structure(&tasks));

        let warnings = issues.iter().filter(|i| i.severity == AuditSeverity::Warning).count();
        let errors = issues.iter().filter(|i| i.severity == AuditSeverity::Error).count();

        Ok(AuditReport {
            build_id,
            issues,
            warnings,
            errors,
        })
    }
}

/// Warns when a staircase's rise-over-run slope exceeds 1 along its
/// declared direction of travel — i.e. it climbs steeper than a 45-degree
/// stair run should.
fn stair_direction_mismatches(tasks: &[Task]) -> Vec<AuditIssue> {
    let mut issues = Vec::new();

    for task in tasks {
        if task.task_type != TaskType::PrefabStairs {
            continue;
        }
        let Some(bounds) = task.bounds else { continue };
        let Some(direction) = task.task_data.get("staircase_direction").and_then(|v| v.as_str()) else {
            continue;
        };

        let x_span = bounds.x_span().max(1);
        let y_span = bounds.y_span();
        let z_span = bounds.z_span().max(1);

        let mismatch = match direction {
            "n" | "s" | "north" | "south" if x_span < z_span => Some(y_span as f64 / x_span as f64),
            "e" | "w" | "east" | "west" if z_span < x_span => Some(y_span as f64 / z_span as f64),
            _ => None,
        };

        if let Some(slope) = mismatch {
            if slope > 1.0 {
                issues.push(AuditIssue {
                    severity: AuditSeverity::Warning,
                    rule: "stair_direction_mismatch",
                    message: format!(
                        "stair run at order {} climbs steeper (slope {slope:.2}) than its declared direction {direction} implies",
                        task.task_order
                    ),
                    task_orders: vec![task.task_order],
                });
            }
        }
    }

    issues
}

/// Warns when a `BLOCK_FILL` overlaps an earlier, non-fill task's footprint.
/// Fill-vs-fill overlaps are treated as intentional (re-fills) and skipped.
fn fill_overwrites_earlier_structure(tasks: &[Task]) -> Vec<AuditIssue> {
    let mut issues = Vec::new();

    for (i, fill) in tasks.iter().enumerate() {
        if fill.task_type != TaskType::BlockFill {
            continue;
        }
        let Some(fill_bounds) = fill.bounds else { continue };

        for earlier in &tasks[..i] {
            if earlier.task_type == TaskType::BlockFill {
                continue;
            }
            if earlier.task_order >= fill.task_order {
                continue;
            }
            let Some(earlier_bounds) = earlier.bounds else { continue };

            if fill_bounds.intersects(&earlier_bounds) {
                issues.push(AuditIssue {
                    severity: AuditSeverity::Warning,
                    rule: "fill_overwrites_structure",
                    message: format!(
                        "fill at order {} overlaps earlier {} at order {}",
                        fill.task_order, earlier.task_type, earlier.task_order
                    ),
                    task_orders: vec![fill.task_order, earlier.task_order],
                });
            }
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use chrono::Utc;
    use serde_json::json;

    async fn seed_build(repo: &MemoryStore, created_at: chrono::DateTime<Utc>) -> Build {
        repo.create_build(Build::new("B".to_string(), None, None, created_at))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn location_query_orders_by_created_at_ascending() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let earlier = seed_build(&store, now).await;
        let later = seed_build(&store, now + chrono::Duration::seconds(10)).await;

        for build in [&later, &earlier] {
            let task = Task::new(
                build.id,
                0,
                TaskType::BlockFill,
                json!({}),
                None,
                Some(BoundingBox::from_corners(1, 64, 1, 5, 68, 5)),
            );
            store.add_task_to_end(task).await.unwrap();
        }

        let service = LocationService::new(store);
        let result = service
            .query_by_location(
                crate::domain::DEFAULT_WORLD,
                BoundingBox::from_corners(1, 64, 1, 5, 68, 5),
                true,
            )
            .await
            .unwrap();

        assert_eq!(result.build_count, 2);
        assert_eq!(result.builds[0].build.id, earlier.id);
        assert_eq!(result.builds[1].build.id, later.id);
    }

    #[tokio::test]
    async fn location_query_excludes_in_progress_when_requested() {
        let store = Arc::new(MemoryStore::new());
        let build = seed_build(&store, Utc::now()).await;
        let bounds = BoundingBox::from_corners(0, 0, 0, 1, 1, 1);
        let task = Task::new(build.id, 0, TaskType::BlockFill, json!({}), None, Some(bounds));
        store.add_task_to_end(task).await.unwrap();
        store
            .update_build_status(build.id, &[], BuildStatus::InProgress, None)
            .await
            .unwrap();

        let service = LocationService::new(store);
        let result = service
            .query_by_location(crate::domain::DEFAULT_WORLD, bounds, false)
            .await
            .unwrap();
        assert_eq!(result.build_count, 0);
    }

    #[tokio::test]
    async fn audit_flags_fill_overwriting_earlier_structure() {
        let store = Arc::new(MemoryStore::new());
        let build = seed_build(&store, Utc::now()).await;

        let stairs_bounds = BoundingBox::from_corners(0, 64, 0, 2, 66, 2);
        let stairs = Task::new(
            build.id,
            0,
            TaskType::PrefabStairs,
            json!({"staircase_direction": "north"}),
            None,
            Some(stairs_bounds),
        );
        store.add_task_to_end(stairs).await.unwrap();

        // pad orders so the fill lands at order 5 as in the illustrative scenario
        for _ in 0..4 {
            let filler = Task::new(build.id, 0, TaskType::BlockFill, json!({}), None, None);
            store.add_task_to_end(filler).await.unwrap();
        }

        let fill = Task::new(
            build.id,
            0,
            TaskType::BlockFill,
            json!({}),
            None,
            Some(BoundingBox::from_corners(1, 65, 1, 3, 65, 3)),
        );
        store.add_task_to_end(fill).await.unwrap();

        let service = LocationService::new(store);
        let report = service.audit_build(build.id).await.unwrap();

        let fill_warnings: Vec<&AuditIssue> = report
            .issues
            .iter()
            .filter(|i| i.rule == "fill_overwrites_structure")
            .collect();
        assert_eq!(fill_warnings.len(), 1);
        assert_eq!(fill_warnings[0].task_orders, vec![5, 0]);
    }

    #[tokio::test]
    async fn audit_flags_steep_stair_slope() {
        let store = Arc::new(MemoryStore::new());
        let build = seed_build(&store, Utc::now()).await;

        // direction "east" travels along x; z_span (1) < x_span (5) triggers
        // the mismatch arm, and slope = y_span/z_span = 5 > 1.
        let bounds = BoundingBox::from_corners(0, 64, 0, 5, 69, 1);
        let stairs = Task::new(
            build.id,
            0,
            TaskType::PrefabStairs,
            json!({"staircase_direction": "east"}),
            None,
            Some(bounds),
        );
        store.add_task_to_end(stairs).await.unwrap();

        let service = LocationService::new(store);
        let report = service.audit_build(build.id).await.unwrap();
        assert!(report.issues.iter().any(|i| i.rule == "stair_direction_mismatch"));
        assert_eq!(report.warnings, 1);
    }

    #[tokio::test]
    async fn audit_on_clean_queue_reports_no_issues() {
        let store = Arc::new(MemoryStore::new());
        let build = seed_build(&store, Utc::now()).await;
        let task = Task::new(
            build.id,
            0,
            TaskType::BlockFill,
            json!({}),
            None,
            Some(BoundingBox::from_corners(0, 0, 0, 1, 1, 1)),
        );
        store.add_task_to_end(task).await.unwrap();

        let service = LocationService::new(store);
        let report = service.audit_build(build.id).await.unwrap();
        assert!(report.issues.is_empty());
    }
}
