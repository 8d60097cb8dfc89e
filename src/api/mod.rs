//! NetRisk REST API Module
//! Serves analysis products over HTTP, wrapped in a common response envelope

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod types;

pub use middleware::start_cleanup_task;
pub use routes::create_router;
pub use types::*;
