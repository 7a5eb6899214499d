use std::sync::Arc;

use buildtask_core::{BuildService, LocationService};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<BuildService>,
    pub location: Arc<LocationService>,
}
