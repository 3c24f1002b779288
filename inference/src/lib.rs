//! An HTTP service answering which known face a posted image shows.

pub mod config;
pub mod error;
pub mod preprocess;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::{Result, ServiceErr};
pub use routes::router;
pub use state::AppState;
