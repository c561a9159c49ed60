//! Business logic services.
//!
//! Services own transaction boundaries and turn query results into typed
//! application errors. They are independent of the HTTP layer.

pub mod assignment;
pub mod cascade;
pub mod directory;
pub mod selection;
pub mod statistics;

pub use assignment::{AssignmentEngine, Reassignment};
pub use cascade::{deactivate_team_members, DeactivationResult};
pub use selection::ReviewerSelector;
