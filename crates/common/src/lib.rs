pub mod config;
pub mod error;
pub mod ids;
pub mod model;
pub mod sanitize;

pub use error::{CogneeError, Result};
pub use ids::*;
