mod build_routes;
mod location_routes;

pub use build_routes::create_build_router;
pub use location_routes::create_location_router;
