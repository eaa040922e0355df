//! # MuSig2 Ceremony
//!
//! Resumable MuSig2 signing for participants who never share a live
//! session. Each step reads whatever keys, nonces and partial signatures
//! have been relayed so far, performs the one cryptographic action due, and
//! emits the complete command line the next participant runs.
//!
//! ## Ceremony Overview
//!
//! - Key gathering: each new signer appends its key and commits a nonce
//!   before the full key set is known.
//! - Nonce gathering: the signer whose key completes the set generates its
//!   nonce under the final context and signs immediately.
//! - Signing: the remaining signers return with their retained secret
//!   nonces; the last one combines the final BIP-340 signature.
//!
//! ## Example
//!
//! ```rust,ignore
//! use musig_ceremony::{advance, CeremonyState, Outcome, SignerKey, UnsignedEvent};
//!
//! let state = CeremonyState::new(2, UnsignedEvent::new(1, created_at, "gm"));
//! match advance(state, &SignerKey::from_hex(&sec)?, None)? {
//!     Outcome::Continue(step) => eprintln!("{}", step.resume),
//!     Outcome::Complete(done) => println!("{}", serde_json::to_string(&done.event)?),
//! }
//! ```

pub mod ceremony;
pub mod error;
pub mod event;
pub mod keyagg;
pub mod nonce;
pub mod parse;
pub mod phase;
pub mod resume;
pub mod signer;
pub mod types;

pub use ceremony::{advance, CeremonyState, Completion, Continuation, Outcome};
pub use error::{Error, Result};
pub use event::{SignedEvent, UnsignedEvent};
pub use nonce::SecretNonce;
pub use phase::{Joiner, Phase};
pub use resume::ResumeCommand;
pub use types::SignerKey;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
