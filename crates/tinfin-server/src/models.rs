//! API models for requests and responses

pub mod api;
pub mod payments;
pub mod tokens;

// Re-export commonly used types
pub use api::*;
pub use payments::*;
pub use tokens::*;
