//! Configuration of the reliance computation.

use serde::Serialize;

/// Set of optimizations used while computing reliances.
///
/// Each optimization corresponds to one bit of the numeric encoding
/// accepted by [`RelianceStrategy::from_bits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RelianceStrategy {
    /// Prune branches of the search that can never lead to a reliance.
    pub early_termination: bool,
    /// Only check pairs of rules that share a predicate
    /// and check each such pair only once.
    pub cut_pairs: bool,
    /// Memoize results for structurally identical pairs of rules.
    pub pair_hash: bool,
    /// Search incrementally over partial literal mappings
    /// instead of enumerating every total mapping.
    pub better_iterate: bool,
}

impl RelianceStrategy {
    /// Bit enabling [`RelianceStrategy::early_termination`]
    pub const EARLY_TERMINATION: u32 = 1;
    /// Bit enabling [`RelianceStrategy::cut_pairs`]
    pub const CUT_PAIRS: u32 = 2;
    /// Bit enabling [`RelianceStrategy::pair_hash`]
    pub const PAIR_HASH: u32 = 4;
    /// Bit enabling [`RelianceStrategy::better_iterate`]
    pub const BETTER_ITERATE: u32 = 8;
    /// All bits
    pub const FULL: u32 = 15;

    /// Strategy with every optimization disabled.
    pub fn naive() -> Self {
        Self::from_bits(0)
    }

    /// Strategy with every optimization enabled.
    pub fn full() -> Self {
        Self::from_bits(Self::FULL)
    }

    /// Decode a strategy from its bit representation.
    ///
    /// Unknown bits are ignored.
    pub fn from_bits(bits: u32) -> Self {
        Self {
            early_termination: bits & Self::EARLY_TERMINATION != 0,
            cut_pairs: bits & Self::CUT_PAIRS != 0,
            pair_hash: bits & Self::PAIR_HASH != 0,
            better_iterate: bits & Self::BETTER_ITERATE != 0,
        }
    }

    /// Encode this strategy into its bit representation.
    pub fn bits(&self) -> u32 {
        let mut result = 0;

        if self.early_termination {
            result |= Self::EARLY_TERMINATION;
        }
        if self.cut_pairs {
            result |= Self::CUT_PAIRS;
        }
        if self.pair_hash {
            result |= Self::PAIR_HASH;
        }
        if self.better_iterate {
            result |= Self::BETTER_ITERATE;
        }

        result
    }
}

impl Default for RelianceStrategy {
    fn default() -> Self {
        Self::full()
    }
}
