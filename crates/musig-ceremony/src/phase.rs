//! Phase classification
//!
//! The phase is derived from counts alone, after our own key has been placed
//! in the participant set. Nothing records which participant contributed
//! which nonce or partial signature.

use std::fmt;

use crate::{Error, Result};

/// How a signer reaches the nonce phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joiner {
    /// Our key completes the set in this step; the nonce is generated now
    Last,
    /// Our key was relayed back to us; the secret nonce comes from the operator
    Returning,
}

/// Ceremony phase for one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Fewer than N keys known
    KeyGathering,
    /// All keys known, nonce set incomplete
    NonceGathering { joiner: Joiner },
    /// All keys and nonces known
    Signing,
}

/// Counts a step is classified from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    pub signer_count: usize,
    /// Keys after self-insertion
    pub keys: usize,
    pub nonces: usize,
    pub partials: usize,
    /// Whether our key was absent from the relayed keys
    pub self_inserted: bool,
}

impl Phase {
    /// Classify a step
    pub fn classify(counts: &Counts) -> Result<Phase> {
        let n = counts.signer_count;
        if n < 2 {
            return Err(Error::InvalidConfig(format!(
                "a ceremony needs at least 2 signers, got {}",
                n
            )));
        }
        if counts.keys > n {
            return Err(Error::InvalidConfig(format!(
                "{} keys relayed for a {}-signer ceremony",
                counts.keys, n
            )));
        }
        if counts.nonces > n {
            return Err(Error::InvalidConfig(format!(
                "{} nonces relayed for a {}-signer ceremony",
                counts.nonces, n
            )));
        }
        if counts.partials >= n {
            return Err(Error::InvalidConfig(format!(
                "{} partial signatures relayed for a {}-signer ceremony; nothing left to sign",
                counts.partials, n
            )));
        }

        let phase = if counts.keys < n {
            Phase::KeyGathering
        } else if counts.self_inserted {
            Phase::NonceGathering { joiner: Joiner::Last }
        } else if counts.nonces < n {
            Phase::NonceGathering {
                joiner: Joiner::Returning,
            }
        } else {
            Phase::Signing
        };
        Ok(phase)
    }

    /// Whether this step needs the operator's retained secret nonce
    pub fn needs_secret_nonce(&self) -> bool {
        matches!(
            self,
            Phase::Signing
                | Phase::NonceGathering {
                    joiner: Joiner::Returning
                }
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::KeyGathering => f.write_str("key gathering"),
            Phase::NonceGathering { joiner: Joiner::Last } => {
                f.write_str("nonce gathering (last joiner)")
            }
            Phase::NonceGathering {
                joiner: Joiner::Returning,
            } => f.write_str("nonce gathering (returning signer)"),
            Phase::Signing => f.write_str("signing"),
        }
    }
}
