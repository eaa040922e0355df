//! Target event model
//!
//! The ceremony signs a Nostr-style event. Its identifier, computed over the
//! combined public key, is the 32-byte message every participant signs.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::{Message, SIGNATURE_SIZE};
use crate::{Error, Result};

/// Event tag: a key followed by zero or more values
pub type Tag = Vec<String>;

/// Event fields agreed on before the ceremony starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedEvent {
    pub kind: u16,
    pub created_at: i64,
    pub content: String,
    pub tags: Vec<Tag>,
}

impl UnsignedEvent {
    /// Create an event without tags
    pub fn new(kind: u16, created_at: i64, content: impl Into<String>) -> Self {
        Self {
            kind,
            created_at,
            content: content.into(),
            tags: Vec::new(),
        }
    }

    /// Append a tag
    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    /// Every tag needs at least a key to survive a resume command
    pub fn check_tags(&self) -> Result<()> {
        match self.tags.iter().position(|t| t.is_empty()) {
            Some(i) => Err(Error::InvalidConfig(format!(
                "tag {} is empty and cannot be relayed",
                i
            ))),
            None => Ok(()),
        }
    }

    /// Event identifier under the given x-only author key
    pub fn id(&self, pubkey: &[u8; 32]) -> Result<Message> {
        let canonical = serde_json::to_string(&serde_json::json!([
            0,
            hex::encode(pubkey),
            self.created_at,
            self.kind,
            self.tags,
            self.content,
        ]))?;
        Ok(Sha256::digest(canonical.as_bytes()).into())
    }

    /// Produce the signed event, leaving `self` untouched
    pub fn to_signed(&self, pubkey: &[u8; 32], sig: &[u8; SIGNATURE_SIZE]) -> Result<SignedEvent> {
        Ok(SignedEvent {
            id: hex::encode(self.id(pubkey)?),
            pubkey: hex::encode(pubkey),
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags.clone(),
            content: self.content.clone(),
            sig: hex::encode(sig),
        })
    }
}

/// Fully signed event, ready to be published by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEvent {
    pub id: String,
    pub pubkey: String,
    pub created_at: i64,
    pub kind: u16,
    pub tags: Vec<Tag>,
    pub content: String,
    pub sig: String,
}

/// Parse `key`, `key=value` or `key=value,extra,...`
pub fn parse_tag(text: &str) -> Tag {
    match text.split_once('=') {
        Some((key, values)) => std::iter::once(key.to_string())
            .chain(values.split(',').map(str::to_string))
            .collect(),
        None => vec![text.to_string()],
    }
}

/// Inverse of [`parse_tag`]
///
/// An empty tag has no textual form; [`UnsignedEvent::check_tags`] keeps
/// such tags out of a ceremony.
pub fn format_tag(tag: &[String]) -> String {
    match tag.split_first() {
        Some((key, [])) => key.clone(),
        Some((key, values)) => format!("{}={}", key, values.join(",")),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_roundtrip() {
        for text in ["t", "p=abcd", "e=abcd,wss://relay.example,reply"] {
            assert_eq!(format_tag(&parse_tag(text)), text);
        }
        assert_eq!(parse_tag("e=a,b"), vec!["e", "a", "b"]);
    }

    #[test]
    fn test_empty_tag_rejected() {
        let event = UnsignedEvent::new(1, 0, "").with_tag(parse_tag(""));
        assert!(event.check_tags().is_ok());

        let event = event.with_tag(Vec::new());
        assert!(matches!(event.check_tags(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_id_depends_on_author() {
        let event = UnsignedEvent::new(1, 1_700_000_000, "hello").with_tag(parse_tag("t=musig"));

        assert_ne!(event.id(&[1u8; 32]).unwrap(), event.id(&[2u8; 32]).unwrap());
        assert_eq!(event.id(&[1u8; 32]).unwrap(), event.id(&[1u8; 32]).unwrap());
    }

    #[test]
    fn test_to_signed_keeps_fields() {
        let event = UnsignedEvent::new(1, 42, "gm").with_tag(vec!["t".into(), "x".into()]);
        let signed = event.to_signed(&[3u8; 32], &[4u8; SIGNATURE_SIZE]).unwrap();

        assert_eq!(signed.id, hex::encode(event.id(&[3u8; 32]).unwrap()));
        assert_eq!(signed.sig, "04".repeat(SIGNATURE_SIZE));
        assert_eq!(signed.tags, event.tags);
        assert_eq!(signed.content, "gm");
    }
}
