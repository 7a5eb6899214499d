//! Build-task orchestration core.
//!
//! Persists ordered sequences of voxel-world mutation tasks ("builds"),
//! executes them against a single-threaded world tick executor, and
//! answers spatial queries over prior work. See `SPEC_FULL.md` at the
//! workspace root for the full component breakdown (C1-C8).

pub mod clock;
pub mod coordinate;
pub mod domain;
pub mod error;
pub mod executor;
pub mod location;
pub mod repository;
pub mod service;
pub mod validate;
pub mod world;

#[cfg(feature = "postgres")]
pub mod db;

pub mod memory;

#[cfg(feature = "postgres")]
pub use db::{PgStore, StoreConfig};

pub use clock::{Clock, SystemClock};
pub use coordinate::BoundingBox;
pub use domain::{Build, BuildStatus, Task, TaskStatus, TaskType};
pub use error::{ServiceError, StoreError, ValidationError};
pub use executor::{TaskExecutionResult, TaskExecutor};
pub use location::{AuditIssue, AuditReport, AuditSeverity, BuildWithTasks, LocationQueryResult, LocationService};
pub use repository::BuildRepository;
pub use service::{BuildExecutionSummary, BuildService};
pub use world::WorldEffectPort;
