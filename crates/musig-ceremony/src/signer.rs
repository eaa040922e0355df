//! Partial signing and final combination

use musig2::secp::Point;
use musig2::{
    aggregate_partial_signatures, sign_partial, verify_single, AggNonce, BinaryEncoding,
    LiftedSignature, PartialSignature,
};
use tracing::debug;

use crate::keyagg::CombinedKey;
use crate::nonce::NonceSession;
use crate::types::{Message, SignerKey, PARTIAL_SIGNATURE_SIZE, SIGNATURE_SIZE};
use crate::{Error, Result};

/// Our partial signature together with the context needed to combine
pub struct SigningRound {
    combined: CombinedKey,
    aggnonce: AggNonce,
    message: Message,
    own: PartialSignature,
}

impl SigningRound {
    /// Sign with a complete nonce session, consuming its secret nonce
    pub fn sign(
        signer: &SignerKey,
        combined: &CombinedKey,
        session: NonceSession,
        message: Message,
    ) -> Result<Self> {
        let (secnonce, aggnonce) = session.finish()?;
        let own: PartialSignature = sign_partial(
            combined.context(),
            signer.scalar()?,
            secnonce,
            &aggnonce,
            message,
        )
        .map_err(|e| Error::Signing(format!("failed to produce partial signature: {}", e)))?;

        Ok(Self {
            combined: combined.clone(),
            aggnonce,
            message,
            own,
        })
    }

    /// Our own contribution
    pub fn own_partial(&self) -> PartialSignature {
        self.own
    }

    /// Combine our contribution with every supplied one
    ///
    /// The supplied list must not contain our own partial signature. The
    /// result is checked against the combined key before it is returned.
    pub fn combine(&self, supplied: &[PartialSignature]) -> Result<[u8; SIGNATURE_SIZE]> {
        let partials = std::iter::once(self.own).chain(supplied.iter().copied());
        let signature: LiftedSignature =
            aggregate_partial_signatures(self.combined.context(), &self.aggnonce, partials, self.message)
                .map_err(|e| Error::Combine(format!("failed to combine partial signatures: {}", e)))?;

        let bytes = signature.to_bytes();
        verify_single(self.combined.point(), signature, self.message).map_err(|_| {
            Error::Combine(format!(
                "combined signature does not verify; one of the {} supplied partial signatures is invalid",
                supplied.len()
            ))
        })?;
        debug!(partials = supplied.len() + 1, "Combined partial signatures");

        Ok(bytes)
    }
}

/// Check a final signature against a combined key
pub fn verify(combined: Point, signature: &[u8; SIGNATURE_SIZE], message: &Message) -> Result<()> {
    let signature = LiftedSignature::from_bytes(signature)
        .map_err(|e| Error::Decode(format!("invalid signature: {}", e)))?;
    verify_single(combined, signature, message)
        .map_err(|e| Error::Combine(format!("signature does not verify: {}", e)))
}

/// Lowercase hex of a partial signature
pub fn encode_partial(partial: &PartialSignature) -> String {
    hex::encode(partial.serialize())
}

/// Parse a hex-encoded partial signature
pub fn decode_partial(hex_partial: &str) -> Result<PartialSignature> {
    let bytes = hex::decode(hex_partial.trim())?;
    if bytes.len() != PARTIAL_SIGNATURE_SIZE {
        return Err(Error::Decode(format!(
            "partial signature must be {} bytes, got {}",
            PARTIAL_SIGNATURE_SIZE,
            bytes.len()
        )));
    }
    PartialSignature::try_from(bytes.as_slice())
        .map_err(|e| Error::Decode(format!("invalid partial signature {}: {}", hex_partial, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyagg::ParticipantSet;

    const MESSAGE: Message = [0x5a; 32];

    fn signer(byte: u8) -> SignerKey {
        SignerKey::from_slice(&[byte; 32]).unwrap()
    }

    /// Two-party ceremony run in one process, returning both signing rounds
    fn two_rounds() -> (SigningRound, SigningRound) {
        let (alice, bob) = (signer(1), signer(2));
        let (set, _) = ParticipantSet::join(vec![alice.public_key()], bob.public_key(), 2).unwrap();
        let combined = CombinedKey::new(&set).unwrap();

        let mut a = NonceSession::generate(&alice, &combined, &MESSAGE, 2).unwrap();
        let mut b = NonceSession::generate(&bob, &combined, &MESSAGE, 2).unwrap();
        let (an, bn) = (a.public_nonce(), b.public_nonce());
        a.register_all(&[an, bn]).unwrap();
        b.register_all(&[an, bn]).unwrap();

        (
            SigningRound::sign(&alice, &combined, a, MESSAGE).unwrap(),
            SigningRound::sign(&bob, &combined, b, MESSAGE).unwrap(),
        )
    }

    #[test]
    fn test_combine_verifies() {
        let (a, b) = two_rounds();
        let signature = a.combine(&[b.own_partial()]).unwrap();

        verify(a.combined.point(), &signature, &MESSAGE).unwrap();
        assert_eq!(signature, b.combine(&[a.own_partial()]).unwrap());
    }

    #[test]
    fn test_combine_is_idempotent() {
        let (a, b) = two_rounds();
        assert_eq!(
            a.combine(&[b.own_partial()]).unwrap(),
            a.combine(&[b.own_partial()]).unwrap()
        );
    }

    #[test]
    fn test_combine_rejects_bad_partial() {
        let (a, _) = two_rounds();
        let bogus = decode_partial(&"01".repeat(PARTIAL_SIGNATURE_SIZE)).unwrap();

        assert!(matches!(a.combine(&[bogus]), Err(Error::Combine(_))));
    }

    #[test]
    fn test_partial_hex_roundtrip() {
        let (a, _) = two_rounds();
        let encoded = encode_partial(&a.own_partial());

        assert_eq!(encoded, encoded.to_lowercase());
        assert_eq!(decode_partial(&encoded).unwrap(), a.own_partial());
        assert!(matches!(decode_partial("abcd"), Err(Error::Decode(_))));
    }
}
