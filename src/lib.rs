pub mod error;
pub mod models;
pub mod parsers;
pub mod sequences;
pub mod injection;
pub mod transport;
pub mod response_analysis;
pub mod persist;
pub mod stats;
pub mod engine;
pub mod reporting;

// Re-export commonly used items
pub use error::*;
pub use models::*;
pub use parsers::*;
pub use sequences::*;
pub use injection::*;
pub use transport::*;
pub use response_analysis::*;
pub use persist::*;
pub use stats::*;
pub use engine::*;
pub use reporting::*;
