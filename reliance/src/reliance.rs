//! Module containing functionality for computing reliances between existential rules.
//!
//! A rule positively relies on another if applying the first may lead to a new application of the second.
//! A rule is restrained by another if applying the second may render the witnesses
//! introduced by an earlier application of the first redundant.
//! See <https://iccl.inf.tu-dresden.de/web/Inproceedings3338> for details.

pub mod assignment;
pub mod deadline;
pub mod graph;
pub mod graph_constructor;
pub mod groups;
pub mod strategy;
pub mod term_info;

mod common;
mod models;
mod positive;
mod restraint;
mod rule_hash;
mod self_restraint;

pub use deadline::Deadline;
pub use graph::{combine_graphs, SimpleGraph};
pub use graph_constructor::{
    compute_positive_reliances, compute_restraint_reliances, count_pruned_dependencies,
    LongestPair, RelianceComputationResult, RelianceGraphConstructor,
};
pub use groups::{
    compute_reliance_groups, is_core_stratified,
    is_positively_acyclic, shortest_restraint_cycle, CoreStratifiedResult, RelianceGroupResult,
};
pub use strategy::RelianceStrategy;

use serde::Serialize;
use strum_macros::{Display, EnumString};

/// Possible types of reliances.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum RelianceType {
    /// Positive reliance,
    /// i.e. the application of one rule may directly lead to the application of the other.
    Positive,
    /// Restraint reliance,
    /// i.e. the application of the second rule may make an earlier application of the first rule redundant.
    Restraint,
}
