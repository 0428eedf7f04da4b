pub mod error;
pub mod types;

pub mod frontier;
pub mod returns;

pub use error::FrontierError;
pub use types::*;

/// Standard result type for all frontier operations
pub type FrontierResult<T> = Result<T, FrontierError>;
