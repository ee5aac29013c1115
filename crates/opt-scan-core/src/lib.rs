pub mod chain;
pub mod error;
pub mod math;
pub mod pricing;
pub mod types;

#[cfg(feature = "strategies")]
pub mod strategies;

#[cfg(feature = "portfolio")]
pub mod portfolio;

pub use error::OptionScanError;
pub use types::*;

/// Standard result type for all option-scan operations
pub type OptionScanResult<T> = Result<T, OptionScanError>;
