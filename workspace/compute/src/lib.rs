//! Business rules of the movie review service that do not depend on HTTP:
//! who may mutate what, and how review ratings roll up into movie statistics.

pub mod error;
pub mod permissions;
pub mod rating;

pub use error::{ComputeError, Result};
