//! Core types shared by the ceremony components

use k256::elliptic_curve::sec1::ToEncodedPoint;
use musig2::secp::{Point, Scalar};
use std::fmt;

use crate::{Error, Result};

/// Compressed SEC1 public key length
pub const PUBLIC_KEY_SIZE: usize = 33;

/// Serialized public nonce pair length (`R1 || R2`, both compressed)
pub const PUB_NONCE_SIZE: usize = 66;

/// Serialized secret nonce length (`k1 || k2 || signer pubkey`)
pub const SEC_NONCE_SIZE: usize = 97;

/// Serialized partial signature length
pub const PARTIAL_SIGNATURE_SIZE: usize = 32;

/// BIP-340 signature length
pub const SIGNATURE_SIZE: usize = 64;

/// Message digest signed by the ceremony
pub type Message = [u8; 32];

/// Raw public nonce as relayed between participants
///
/// Only the length is checked on input; curve validity is checked when the
/// nonce is registered with a signing session.
pub type PubNonceBytes = [u8; PUB_NONCE_SIZE];

/// The local signer's secret key
///
/// Owned for the duration of a single step. The underlying `k256` key is
/// wiped on drop.
pub struct SignerKey {
    secret: k256::SecretKey,
    public: Point,
}

impl SignerKey {
    /// Parse a hex-encoded 32-byte secret key
    pub fn from_hex(hex_key: &str) -> Result<Self> {
        let bytes = zeroize::Zeroizing::new(hex::decode(hex_key.trim())?);
        Self::from_slice(&bytes)
    }

    /// Build a signer key from raw bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 32 {
            return Err(Error::Decode(format!(
                "secret key must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        let secret = k256::SecretKey::from_slice(bytes)
            .map_err(|_| Error::Decode("secret key is not a valid secp256k1 scalar".into()))?;
        let encoded = secret.public_key().to_encoded_point(true);
        let public = Point::try_from(encoded.as_bytes())
            .map_err(|e| Error::Decode(format!("invalid public key: {}", e)))?;
        Ok(Self { secret, public })
    }

    /// Our public key, as it appears in the participant set
    pub fn public_key(&self) -> Point {
        self.public
    }

    pub(crate) fn scalar(&self) -> Result<Scalar> {
        let mut bytes = zeroize::Zeroizing::new([0u8; 32]);
        bytes.copy_from_slice(&self.secret.to_bytes());
        Scalar::try_from(&bytes[..])
            .map_err(|e| Error::Decode(format!("invalid secret key: {}", e)))
    }
}

impl fmt::Debug for SignerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerKey")
            .field("public", &encode_point(&self.public))
            .finish_non_exhaustive()
    }
}

/// Lowercase hex of a compressed public key
pub fn encode_point(point: &Point) -> String {
    hex::encode(point.serialize())
}

/// Parse a hex-encoded SEC1 public key
pub fn decode_point(hex_point: &str) -> Result<Point> {
    let bytes = hex::decode(hex_point.trim())?;
    Point::try_from(bytes.as_slice())
        .map_err(|e| Error::Decode(format!("invalid public key {}: {}", hex_point, e)))
}
