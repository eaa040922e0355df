//! Participant set and key aggregation
//!
//! Keys are aggregated in arrival order. Two participants holding the same
//! keys in a different order compute different combined keys without any
//! error being raised, so the relayed order must never be rearranged.

use musig2::secp::Point;
use musig2::KeyAggContext;
use tracing::debug;

use crate::types::encode_point;
use crate::{Error, Result};

/// Ordered set of signer public keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantSet {
    keys: Vec<Point>,
}

impl ParticipantSet {
    /// Build the set from relayed keys plus our own
    ///
    /// Our key is appended if it is not already present. Returns the set and
    /// whether our key had to be inserted.
    pub fn join(relayed: Vec<Point>, own: Point, signer_count: usize) -> Result<(Self, bool)> {
        for (i, key) in relayed.iter().enumerate() {
            if relayed[..i].contains(key) {
                return Err(Error::Context(format!(
                    "duplicate public key {}",
                    encode_point(key)
                )));
            }
        }

        let mut keys = relayed;
        let inserted = !keys.contains(&own);
        if inserted {
            keys.push(own);
        }

        if keys.len() > signer_count {
            return Err(Error::InvalidConfig(format!(
                "participant set has {} keys but the ceremony expects {}",
                keys.len(),
                signer_count
            )));
        }

        Ok((Self { keys }, inserted))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[Point] {
        &self.keys
    }

    pub fn into_keys(self) -> Vec<Point> {
        self.keys
    }
}

/// Aggregation context for the current step
pub enum Aggregation {
    /// Not every key is known yet; nonces can be committed but nothing combined
    Deferred { known: usize, signer_count: usize },
    /// Every key is known
    Complete(CombinedKey),
}

impl Aggregation {
    /// Build the aggregation for a participant set
    pub fn new(set: &ParticipantSet, signer_count: usize) -> Result<Self> {
        if set.len() < signer_count {
            debug!(known = set.len(), signer_count, "Deferring key aggregation");
            return Ok(Aggregation::Deferred {
                known: set.len(),
                signer_count,
            });
        }
        Ok(Aggregation::Complete(CombinedKey::new(set)?))
    }
}

/// Key aggregation over the full, ordered participant set
#[derive(Clone)]
pub struct CombinedKey {
    ctx: KeyAggContext,
    point: Point,
}

impl CombinedKey {
    /// Aggregate every key of the set, in order
    pub fn new(set: &ParticipantSet) -> Result<Self> {
        let ctx = KeyAggContext::new(set.keys().iter().copied()).map_err(|e| {
            Error::Context(format!(
                "failed to combine keys (after {} signers): {}",
                set.len(),
                e
            ))
        })?;
        let point: Point = ctx.aggregated_pubkey();
        Ok(Self { ctx, point })
    }

    /// Combined key, compressed
    pub fn point(&self) -> Point {
        self.point
    }

    /// Combined key in the x-only form BIP-340 verifiers use
    pub fn xonly(&self) -> [u8; 32] {
        self.point.serialize_xonly()
    }

    pub(crate) fn context(&self) -> &KeyAggContext {
        &self.ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SignerKey;

    fn key(byte: u8) -> Point {
        SignerKey::from_slice(&[byte; 32]).unwrap().public_key()
    }

    #[test]
    fn test_join_inserts_self_once() {
        let (set, inserted) = ParticipantSet::join(vec![key(1)], key(2), 3).unwrap();
        assert!(inserted);
        assert_eq!(set.keys(), &[key(1), key(2)]);

        let (set, inserted) = ParticipantSet::join(vec![key(1), key(2)], key(2), 3).unwrap();
        assert!(!inserted);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_join_rejects_duplicates_and_overflow() {
        assert!(matches!(
            ParticipantSet::join(vec![key(1), key(1)], key(2), 3),
            Err(Error::Context(_))
        ));
        assert!(matches!(
            ParticipantSet::join(vec![key(1), key(3)], key(2), 2),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_aggregation_deferred_until_full() {
        let (set, _) = ParticipantSet::join(vec![key(1)], key(2), 3).unwrap();
        assert!(matches!(
            Aggregation::new(&set, 3).unwrap(),
            Aggregation::Deferred { known: 2, signer_count: 3 }
        ));
        assert!(matches!(Aggregation::new(&set, 2).unwrap(), Aggregation::Complete(_)));
    }

    #[test]
    fn test_combined_key_is_order_sensitive() {
        let (ab, _) = ParticipantSet::join(vec![key(1)], key(2), 2).unwrap();
        let (ba, _) = ParticipantSet::join(vec![key(2)], key(1), 2).unwrap();

        let ab = CombinedKey::new(&ab).unwrap();
        let ba = CombinedKey::new(&ba).unwrap();
        assert_ne!(ab.point(), ba.point());
        assert_eq!(ab.point(), CombinedKey::new(&ParticipantSet::join(vec![key(1), key(2)], key(1), 2).unwrap().0).unwrap().point());
    }
}
