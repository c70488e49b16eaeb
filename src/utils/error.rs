//! Error types and helpers, re-exported for convenient glob imports.

pub use crate::{arithmetic_err, state_err, validation_err, PlannerError, PlannerResult};
