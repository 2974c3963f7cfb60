// Application layer: the bank's business rules on top of the store.
// Amount validation and insufficient-funds checks live here so the
// storage engine can change without touching them.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
