//! Input parsing
//!
//! Turns the textual fields of a ceremony step into typed values. Parsing
//! either succeeds for every field or fails as a whole.

use musig2::secp::Point;
use musig2::PartialSignature;

use crate::ceremony::CeremonyState;
use crate::event::UnsignedEvent;
use crate::nonce::SecretNonce;
use crate::signer::decode_partial;
use crate::types::{decode_point, PubNonceBytes, PUB_NONCE_SIZE};
use crate::{Error, Result};

/// Parse a hex public nonce, which must be exactly 66 bytes
pub fn decode_nonce(hex_nonce: &str) -> Result<PubNonceBytes> {
    let bytes = hex::decode(hex_nonce.trim())?;
    bytes.as_slice().try_into().map_err(|_| {
        Error::Decode(format!(
            "nonce is not {} bytes ({} given): {}",
            PUB_NONCE_SIZE,
            bytes.len(),
            hex_nonce
        ))
    })
}

/// Lowercase hex of a public nonce
pub fn encode_nonce(nonce: &PubNonceBytes) -> String {
    hex::encode(nonce)
}

/// Parse the relayed ceremony fields
pub fn parse_state<S: AsRef<str>>(
    signer_count: usize,
    event: UnsignedEvent,
    keys: &[S],
    nonces: &[S],
    partial_signatures: &[S],
) -> Result<CeremonyState> {
    let keys = keys
        .iter()
        .map(|k| decode_point(k.as_ref()))
        .collect::<Result<Vec<Point>>>()?;
    let nonces = nonces
        .iter()
        .map(|n| decode_nonce(n.as_ref()))
        .collect::<Result<Vec<PubNonceBytes>>>()?;
    let partial_signatures = partial_signatures
        .iter()
        .map(|p| decode_partial(p.as_ref()))
        .collect::<Result<Vec<PartialSignature>>>()?;

    Ok(CeremonyState {
        signer_count,
        event,
        keys,
        nonces,
        partial_signatures,
    })
}

/// Parse the optional private secret nonce argument
pub fn parse_secret_nonce(encoded: Option<&str>) -> Result<Option<SecretNonce>> {
    match encoded.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => SecretNonce::from_base64(value).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SignerKey;

    fn event() -> UnsignedEvent {
        UnsignedEvent::new(1, 1_700_000_000, "hi")
    }

    #[test]
    fn test_nonce_length_enforced() {
        assert!(decode_nonce(&"02".repeat(PUB_NONCE_SIZE)).is_ok());
        let err = decode_nonce(&"02".repeat(PUB_NONCE_SIZE - 1)).unwrap_err();
        assert!(matches!(err, Error::Decode(ref msg) if msg.contains("65 given")));
    }

    #[test]
    fn test_parse_state_all_or_nothing() {
        let key = hex::encode(SignerKey::from_slice(&[1u8; 32]).unwrap().public_key().serialize());
        let good_nonce = "02".repeat(PUB_NONCE_SIZE);

        let state = parse_state(2, event(), &[key.as_str()], &[good_nonce.as_str()], &[]).unwrap();
        assert_eq!(state.keys.len(), 1);
        assert_eq!(state.nonces.len(), 1);

        let bad = parse_state(2, event(), &[key.as_str()], &[good_nonce.as_str(), "00"], &[]);
        assert!(matches!(bad, Err(Error::Decode(_))));
        assert!(matches!(parse_state(2, event(), &["nothex"], &[], &[]), Err(Error::Decode(_))));
    }

    #[test]
    fn test_parse_secret_nonce_optional() {
        assert!(parse_secret_nonce(None).unwrap().is_none());
        assert!(parse_secret_nonce(Some("  ")).unwrap().is_none());
        assert!(matches!(parse_secret_nonce(Some("AAAA")), Err(Error::Decode(_))));
    }
}
