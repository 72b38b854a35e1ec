//! Utility types and functions used throughout the runtime.

mod liveness;

pub(crate) mod measure;
pub(crate) mod time;

pub use self::liveness::Liveness;
