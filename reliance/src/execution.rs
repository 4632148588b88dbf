//! Functionality for applying rules in an order guided by their reliances.

pub mod execution_parameters;
pub mod rule_execution;
pub mod scheduler;

pub use execution_parameters::{SchedulerMode, SchedulerParameters};
pub use rule_execution::RuleExecutor;
pub use scheduler::{RuleFiring, Scheduler, SchedulerError, SchedulerSummary};
