//! Plain configuration structs in the `Options`/`ReadOptions`/`WriteOptions`
//! style: no builder machinery, just public fields and a `Default` impl
//! encoding each component's stated defaults.

use crate::sequence::{DEFAULT_FLUSH_INTERVAL, DEFAULT_SAFETY_MARGIN};

/// Governs `SequenceAllocator` checkpointing and crash-recovery behavior.
#[derive(Debug, Clone, Copy)]
pub struct SequenceOptions {
    /// Checkpoint every time the counter crosses a multiple of this value.
    pub flush_interval: u64,
    /// On reopen, resume at `persisted + safety_margin`.
    pub safety_margin: u64,
}

impl Default for SequenceOptions {
    fn default() -> Self {
        SequenceOptions {
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            safety_margin: DEFAULT_SAFETY_MARGIN,
        }
    }
}

/// Governs a single `materialize` call.
#[derive(Debug, Clone, Copy)]
pub struct ReasonOptions {
    /// Upper bound on derivations produced by a single round, across all
    /// rules, before the round is truncated and `DerivationLimitReached` is
    /// surfaced.
    pub max_derivations: usize,
}

pub const DEFAULT_MAX_DERIVATIONS: usize = 100_000;

impl Default for ReasonOptions {
    fn default() -> Self {
        ReasonOptions {
            max_derivations: DEFAULT_MAX_DERIVATIONS,
        }
    }
}

/// Top-level options bundle passed to `Driver::open`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreOptions {
    pub sequence: SequenceOptions,
    pub reason: ReasonOptions,
}
