//! Hardfork activation table.

use crate::domain::hardfork::{self, Hardfork};
use crate::domain::{ChainError, ChainVersion, Timestamp};
use crate::ports::HardforkOracle;

/// Maps block time to the rule set in force.
///
/// Hardfork `n` activates at the `n`-th entry's time; entries must be
/// non-decreasing so the answer is monotonic.
#[derive(Debug, Clone, Default)]
pub struct ScheduledHardforks {
    activations: Vec<Timestamp>,
}

impl ScheduledHardforks {
    /// `activations[i]` is the activation time of hardfork `i + 1`.
    pub fn new(activations: Vec<Timestamp>) -> Result<Self, ChainError> {
        if activations.len() > usize::from(hardfork::LATEST) {
            return Err(ChainError::rule(format!(
                "{} hardforks scheduled, {} known",
                activations.len(),
                hardfork::LATEST
            )));
        }
        if let Some(pair) = activations.windows(2).find(|w| w[0] > w[1]) {
            return Err(ChainError::rule(format!(
                "hardfork activation {} scheduled before {}",
                pair[1], pair[0]
            )));
        }
        Ok(Self { activations })
    }

    /// Every known hardfork active from genesis.
    #[must_use]
    pub fn all_at_genesis() -> Self {
        Self::up_to(hardfork::LATEST)
    }

    /// Hardforks `1..=last` active from genesis, later ones never.
    #[must_use]
    pub fn up_to(last: Hardfork) -> Self {
        Self {
            activations: vec![Timestamp::MIN; usize::from(last.min(hardfork::LATEST))],
        }
    }

    /// Number of the last hardfork active at `time`.
    #[must_use]
    pub fn active_at(&self, time: Timestamp) -> Hardfork {
        let count = self.activations.partition_point(|at| *at <= time);
        // bounded by LATEST at construction
        Hardfork::try_from(count).unwrap_or(hardfork::LATEST)
    }
}

impl HardforkOracle for ScheduledHardforks {
    fn version_at(&self, _block_num: u32, time: Timestamp) -> ChainVersion {
        ChainVersion::hardfork(self.active_at(time))
    }
}
