//! Multi-transaction plan execution.
//!
//! # Components
//! - plan.rs: intent/estimate pairing, validated up front
//! - runner.rs: sequential signing then sequential broadcast
//! - inclusion.rs: receipt polling with a deadline
//! - events.rs: progress updates for the UI

pub mod events;
pub mod inclusion;
pub mod plan;
pub mod runner;

pub use events::PlanEvent;
pub use inclusion::wait_for_inclusion;
pub use plan::TransactionPlan;
pub use runner::{PlanExecutor, PlanReport};
