//! Ceremony state and the single step operation
//!
//! Each participant runs [`advance`] once per turn. All progress travels in
//! the returned [`ResumeCommand`]; the only thing an operator keeps between
//! turns is the [`SecretNonce`] handed out during key gathering.
//!
//! Nonces and partial signatures are matched to signers by count, not by
//! identity. Relaying contributions in an order other than the one each
//! operator assumes is not detected until the final signature fails to
//! verify.

use musig2::secp::Point;
use musig2::PartialSignature;
use tracing::{info, instrument, warn};

use crate::event::{SignedEvent, UnsignedEvent};
use crate::keyagg::{Aggregation, ParticipantSet};
use crate::nonce::{commit_early, NonceSession, SecretNonce};
use crate::phase::{Counts, Phase};
use crate::resume::ResumeCommand;
use crate::signer::SigningRound;
use crate::types::{PubNonceBytes, SignerKey};
use crate::{Error, Result};

/// Everything known about a ceremony at one point in time
#[derive(Debug, Clone, PartialEq)]
pub struct CeremonyState {
    /// Number of signers, N
    pub signer_count: usize,
    pub event: UnsignedEvent,
    /// Public keys in arrival order
    pub keys: Vec<Point>,
    pub nonces: Vec<PubNonceBytes>,
    pub partial_signatures: Vec<PartialSignature>,
}

impl CeremonyState {
    /// A ceremony nobody has joined yet
    pub fn new(signer_count: usize, event: UnsignedEvent) -> Self {
        Self {
            signer_count,
            event,
            keys: Vec::new(),
            nonces: Vec::new(),
            partial_signatures: Vec::new(),
        }
    }

    /// Phase the next step would run in, for a signer whose key is
    /// (`is_member`) or is not yet in the relayed set
    pub fn phase_for(&self, is_member: bool) -> Result<Phase> {
        Phase::classify(&Counts {
            signer_count: self.signer_count,
            keys: self.keys.len() + usize::from(!is_member),
            nonces: self.nonces.len(),
            partials: self.partial_signatures.len(),
            self_inserted: !is_member,
        })
    }
}

/// The ceremony moved forward but is not finished
#[derive(Debug)]
pub struct Continuation {
    /// Phase this step ran in
    pub phase: Phase,
    /// Combined key, once every key is known
    pub combined_key: Option<Point>,
    /// Secret nonce the operator must keep for their next turn
    pub secret_nonce: Option<SecretNonce>,
    /// Our partial signature, already included in `resume`
    pub own_partial: Option<PartialSignature>,
    /// Command for the next participant
    pub resume: ResumeCommand,
}

/// The ceremony produced its final signature
#[derive(Debug)]
pub struct Completion {
    pub phase: Phase,
    pub combined_key: Point,
    pub event: SignedEvent,
}

/// Result of one step
#[derive(Debug)]
pub enum Outcome {
    Continue(Continuation),
    Complete(Completion),
}

impl Outcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, Outcome::Complete(_))
    }
}

/// Run one ceremony step for `signer`
///
/// Advances at most one phase, except that the signer whose key completes
/// the set also commits its nonce and signs in the same step.
#[instrument(skip_all, fields(signer_count = state.signer_count))]
pub fn advance(
    state: CeremonyState,
    signer: &SignerKey,
    secret_nonce: Option<SecretNonce>,
) -> Result<Outcome> {
    let CeremonyState {
        signer_count,
        event,
        keys,
        mut nonces,
        partial_signatures,
    } = state;
    event.check_tags()?;

    let (set, inserted) = ParticipantSet::join(keys, signer.public_key(), signer_count)?;
    let phase = Phase::classify(&Counts {
        signer_count,
        keys: set.len(),
        nonces: nonces.len(),
        partials: partial_signatures.len(),
        self_inserted: inserted,
    })?;
    info!(
        %phase,
        keys = set.len(),
        nonces = nonces.len(),
        partials = partial_signatures.len(),
        "Advancing ceremony"
    );

    let combined = match Aggregation::new(&set, signer_count)? {
        Aggregation::Deferred { known, .. } => {
            if !inserted {
                return Err(Error::InvalidConfig(format!(
                    "our key is already one of the {} known keys; hand this command to a signer who has not joined",
                    known
                )));
            }
            if secret_nonce.is_some() {
                warn!("Ignoring secret nonce while keys are still being gathered");
            }

            let (secret, public) = commit_early(signer)?;
            nonces.push(public);
            info!(keys = known, "Committed nonce before key set is complete");

            return Ok(Outcome::Continue(Continuation {
                phase,
                combined_key: None,
                secret_nonce: Some(secret),
                own_partial: None,
                resume: ResumeCommand {
                    state: CeremonyState {
                        signer_count,
                        event,
                        keys: set.into_keys(),
                        nonces,
                        partial_signatures,
                    },
                    requires_secret_nonce: false,
                },
            }));
        }
        Aggregation::Complete(combined) => combined,
    };
    let message = event.id(&combined.xonly())?;

    let mut session = if phase.needs_secret_nonce() {
        let secret = secret_nonce.as_ref().ok_or(Error::MissingSecretNonce)?;
        NonceSession::resume(signer, secret, signer_count)?
    } else {
        if secret_nonce.is_some() {
            warn!("Ignoring secret nonce; our key completes the set so a fresh nonce is used");
        }
        let session = NonceSession::generate(signer, &combined, &message, signer_count)?;
        nonces.push(session.public_nonce());
        session
    };
    session.register_all(&nonces)?;

    let round = SigningRound::sign(signer, &combined, session, message)?;
    let own_partial = round.own_partial();

    if partial_signatures.len() + 1 < signer_count {
        let mut relayed = partial_signatures;
        relayed.push(own_partial);
        info!(
            partials = relayed.len(),
            missing = signer_count - relayed.len(),
            "Partial signature produced"
        );

        return Ok(Outcome::Continue(Continuation {
            phase,
            combined_key: Some(combined.point()),
            secret_nonce: None,
            own_partial: Some(own_partial),
            resume: ResumeCommand {
                state: CeremonyState {
                    signer_count,
                    event,
                    keys: set.into_keys(),
                    nonces,
                    partial_signatures: relayed,
                },
                requires_secret_nonce: true,
            },
        }));
    }

    let signature = round.combine(&partial_signatures)?;
    let signed = event.to_signed(&combined.xonly(), &signature)?;
    info!(id = %signed.id, "Ceremony complete");

    Ok(Outcome::Complete(Completion {
        phase,
        combined_key: combined.point(),
        event: signed,
    }))
}
