//! This module defines [SchedulerParameters].

use std::time::Duration;

use serde::Serialize;

use crate::reliance::RelianceStrategy;

/// Variants of the reliance-ordered rule scheduler.
///
/// Each flag corresponds to one bit of the numeric encoding
/// accepted by [`SchedulerMode::from_bits`]; zero selects
/// static selection of restrained groups and firing by positive groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct SchedulerMode {
    /// Replace every existential rule by its pieces before computing reliances
    pub piece_decomposed: bool,
    /// Recompute the restrained groups of the remaining rules before each selection
    pub dynamic: bool,
    /// Fire rules that are not restrained by any active rule before the others
    pub unrestrained_first: bool,
}

impl SchedulerMode {
    /// Bit enabling [`SchedulerMode::piece_decomposed`]
    pub const PIECE_DECOMPOSED: u32 = 1;
    /// Bit enabling [`SchedulerMode::dynamic`]
    pub const DYNAMIC: u32 = 2;
    /// Bit enabling [`SchedulerMode::unrestrained_first`]
    pub const UNRESTRAINED_FIRST: u32 = 4;

    /// Decode a mode from its bit representation.
    ///
    /// Unknown bits are ignored.
    pub fn from_bits(bits: u32) -> Self {
        Self {
            piece_decomposed: bits & Self::PIECE_DECOMPOSED != 0,
            dynamic: bits & Self::DYNAMIC != 0,
            unrestrained_first: bits & Self::UNRESTRAINED_FIRST != 0,
        }
    }

    /// Encode this mode into its bit representation.
    pub fn bits(&self) -> u32 {
        let mut result = 0;

        if self.piece_decomposed {
            result |= Self::PIECE_DECOMPOSED;
        }
        if self.dynamic {
            result |= Self::DYNAMIC;
        }
        if self.unrestrained_first {
            result |= Self::UNRESTRAINED_FIRST;
        }

        result
    }
}

/// External parameters affecting a scheduler run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchedulerParameters {
    /// Variant of the scheduler
    pub mode: SchedulerMode,
    /// Time after which the run is stopped; `None` means no limit
    pub timeout: Option<Duration>,
    /// Number passed to the executor with the first firing
    pub first_iteration: usize,
    /// Optimizations used while computing the reliance graphs
    pub reliance_strategy: RelianceStrategy,
}

impl Default for SchedulerParameters {
    fn default() -> Self {
        Self {
            mode: SchedulerMode::default(),
            timeout: None,
            first_iteration: 1,
            reliance_strategy: RelianceStrategy::default(),
        }
    }
}

impl SchedulerParameters {
    /// Set the [`SchedulerMode`].
    pub fn with_mode(mut self, mode: SchedulerMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}
