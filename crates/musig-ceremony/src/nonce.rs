//! Nonce coordination
//!
//! A signer either generates its nonce pair in this step or recovers the
//! secret half it generated in an earlier step. Peer nonces are matched by
//! count only: the session is complete once it holds one nonce per signer,
//! whoever they came from.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use musig2::secp::Point;
use musig2::{AggNonce, BinaryEncoding, PubNonce, SecNonce};
use std::fmt;
use tracing::debug;
use zeroize::Zeroizing;

use crate::keyagg::CombinedKey;
use crate::types::{Message, PubNonceBytes, SignerKey, PUBLIC_KEY_SIZE, SEC_NONCE_SIZE};
use crate::{Error, Result};

const SECNONCE_SCALARS: usize = SEC_NONCE_SIZE - PUBLIC_KEY_SIZE;

/// Secret half of a nonce pair, as retained by the operator between steps
///
/// Layout is `k1 || k2 || signer pubkey`. Never part of a resume command.
pub struct SecretNonce {
    bytes: Zeroizing<[u8; SEC_NONCE_SIZE]>,
}

impl SecretNonce {
    /// Parse the base64 form handed back by the operator
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let decoded = Zeroizing::new(STANDARD.decode(encoded.trim())?);
        if decoded.len() != SEC_NONCE_SIZE {
            return Err(Error::Decode(format!(
                "secret nonce must be {} bytes, got {}",
                SEC_NONCE_SIZE,
                decoded.len()
            )));
        }
        let mut bytes = Zeroizing::new([0u8; SEC_NONCE_SIZE]);
        bytes.copy_from_slice(&decoded);
        Ok(Self { bytes })
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes[..])
    }

    fn new(secnonce: &SecNonce, signer: &Point) -> Self {
        let mut bytes = Zeroizing::new([0u8; SEC_NONCE_SIZE]);
        bytes[..SECNONCE_SCALARS].copy_from_slice(&secnonce.to_bytes());
        bytes[SECNONCE_SCALARS..].copy_from_slice(&signer.serialize());
        Self { bytes }
    }

    fn open(&self, signer: &Point) -> Result<SecNonce> {
        if self.bytes[SECNONCE_SCALARS..] != signer.serialize()[..] {
            return Err(Error::Decode(
                "secret nonce was generated for a different key".into(),
            ));
        }
        SecNonce::from_bytes(&self.bytes[..SECNONCE_SCALARS])
            .map_err(|e| Error::Decode(format!("invalid secret nonce: {}", e)))
    }
}

impl fmt::Debug for SecretNonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretNonce(<redacted>)")
    }
}

/// Nonce committed before every key is known
///
/// The secret half must go to the operator's private channel; only the
/// public half is relayed.
pub fn commit_early(signer: &SignerKey) -> Result<(SecretNonce, PubNonceBytes)> {
    let secnonce = SecNonce::build(rand::random::<[u8; 32]>())
        .with_seckey(signer.scalar()?)
        .build();
    let public = secnonce.public_nonce().to_bytes();
    Ok((SecretNonce::new(&secnonce, &signer.public_key()), public))
}

/// Our nonce plus every peer nonce registered so far
pub struct NonceSession {
    secnonce: SecNonce,
    own: PubNonceBytes,
    nonces: Vec<PubNonce>,
    signer_count: usize,
}

impl NonceSession {
    /// Generate the final nonce directly under the complete key context
    pub fn generate(
        signer: &SignerKey,
        combined: &CombinedKey,
        message: &Message,
        signer_count: usize,
    ) -> Result<Self> {
        let secnonce = SecNonce::build(rand::random::<[u8; 32]>())
            .with_seckey(signer.scalar()?)
            .with_aggregated_pubkey(combined.point())
            .with_message(message)
            .build();
        Ok(Self::with_secnonce(secnonce, signer_count))
    }

    /// Resume with a secret nonce generated in an earlier step
    pub fn resume(signer: &SignerKey, secret: &SecretNonce, signer_count: usize) -> Result<Self> {
        let secnonce = secret.open(&signer.public_key())?;
        Ok(Self::with_secnonce(secnonce, signer_count))
    }

    fn with_secnonce(secnonce: SecNonce, signer_count: usize) -> Self {
        let own = secnonce.public_nonce();
        Self {
            secnonce,
            own: own.to_bytes(),
            nonces: vec![own],
            signer_count,
        }
    }

    /// Our public nonce
    pub fn public_nonce(&self) -> PubNonceBytes {
        self.own
    }

    /// Register one relayed nonce, returning whether the set is now complete
    ///
    /// Our own nonce is skipped rather than counted twice.
    pub fn register(&mut self, raw: &PubNonceBytes) -> Result<bool> {
        if *raw == self.own {
            return Ok(self.is_complete());
        }
        if self.is_complete() {
            return Err(Error::NonceRegistration(format!(
                "already holding {} nonces, cannot register {}",
                self.signer_count,
                hex::encode(raw)
            )));
        }
        let nonce = PubNonce::from_bytes(&raw[..]).map_err(|e| {
            Error::NonceRegistration(format!("invalid nonce {}: {}", hex::encode(raw), e))
        })?;
        self.nonces.push(nonce);
        debug!(registered = self.nonces.len(), expected = self.signer_count, "Registered nonce");
        Ok(self.is_complete())
    }

    /// Register every relayed nonce; the set must be complete afterwards
    pub fn register_all(&mut self, relayed: &[PubNonceBytes]) -> Result<()> {
        let mut complete = self.is_complete();
        for raw in relayed {
            complete = self.register(raw)?;
        }
        if !complete {
            return Err(Error::NonceRegistration(format!(
                "registered every relayed nonce but hold only {} of {}",
                self.nonces.len(),
                self.signer_count
            )));
        }
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.nonces.len() == self.signer_count
    }

    /// Consume the session, handing out the secret nonce exactly once
    pub(crate) fn finish(self) -> Result<(SecNonce, AggNonce)> {
        if !self.is_complete() {
            return Err(Error::NonceRegistration("nonce set is incomplete".into()));
        }
        let aggnonce = AggNonce::sum(&self.nonces);
        Ok((self.secnonce, aggnonce))
    }
}
