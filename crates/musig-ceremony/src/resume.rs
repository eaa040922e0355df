//! Resume command encoding
//!
//! A resume command is the complete invocation the next participant runs.
//! Encoding and decoding are pure: decoding an encoded command reproduces
//! byte-identical key, nonce and partial signature sequences.

use std::fmt;

use crate::ceremony::CeremonyState;
use crate::event::{format_tag, parse_tag, UnsignedEvent};
use crate::parse::{encode_nonce, parse_state};
use crate::signer::encode_partial;
use crate::types::encode_point;
use crate::{Error, Result};

/// Program and subcommand the next participant runs
pub const COMMAND: &str = "musig-party sign";

/// Stand-in for the next participant's secret key
pub const SECRET_KEY_PLACEHOLDER: &str = "<their-key>";

/// Stand-in for the next participant's retained secret nonce
pub const SECRET_NONCE_PLACEHOLDER: &str = "<their-nonce-secret>";

/// Ceremony state as relayed to the next participant
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeCommand {
    pub state: CeremonyState,
    /// Whether the next participant must pass `--musig2-nonce-secret`
    pub requires_secret_nonce: bool,
}

impl ResumeCommand {
    /// Render the command line
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Parse a command produced by [`ResumeCommand::encode`]
    ///
    /// Accepts both `--flag value` and `--flag=value`. A command carrying an
    /// actual secret nonce instead of the placeholder is rejected; relayed
    /// text must never hold one.
    pub fn decode(text: &str) -> Result<Self> {
        let words = shell_words::split(text)
            .map_err(|e| Error::Decode(format!("malformed resume command: {}", e)))?;
        let start = words
            .iter()
            .position(|w| w.starts_with('-'))
            .ok_or_else(|| Error::Decode("resume command has no flags".into()))?;

        let mut signer_count = None;
        let mut kind = None;
        let mut created_at = None;
        let mut content = String::new();
        let mut tags = Vec::new();
        let mut keys = Vec::new();
        let mut nonces = Vec::new();
        let mut partials = Vec::new();
        let mut requires_secret_nonce = false;

        let mut iter = words[start..].iter();
        while let Some(word) = iter.next() {
            let (flag, value) = match word.split_once('=') {
                Some((flag, value)) if flag.starts_with("--") => (flag, value),
                _ => {
                    let value = iter
                        .next()
                        .ok_or_else(|| Error::Decode(format!("flag {} has no value", word)))?;
                    (word.as_str(), value.as_str())
                }
            };
            match flag {
                "--sec" => {}
                "--musig2" => signer_count = Some(parse_number(flag, value)?),
                "-k" | "--kind" => kind = Some(parse_number(flag, value)?),
                "--created-at" => created_at = Some(parse_number(flag, value)?),
                "-c" | "--content" => content = value.to_string(),
                "-t" | "--tag" => tags.push(parse_tag(value)),
                "--musig2-pubkey" => keys.push(value),
                "--musig2-nonce" => nonces.push(value),
                "--musig2-partial" => partials.push(value),
                "--musig2-nonce-secret" if value == SECRET_NONCE_PLACEHOLDER => {
                    requires_secret_nonce = true
                }
                "--musig2-nonce-secret" => {
                    return Err(Error::Decode(
                        "resume command carries a secret nonce; it must never be relayed".into(),
                    ))
                }
                other => return Err(Error::Decode(format!("unknown flag {}", other))),
            }
        }

        let signer_count =
            signer_count.ok_or_else(|| Error::Decode("resume command lacks --musig2".into()))?;
        let event = UnsignedEvent {
            kind: kind.ok_or_else(|| Error::Decode("resume command lacks -k".into()))?,
            created_at: created_at
                .ok_or_else(|| Error::Decode("resume command lacks --created-at".into()))?,
            content,
            tags,
        };

        Ok(Self {
            state: parse_state(signer_count, event, &keys, &nonces, &partials)?,
            requires_secret_nonce,
        })
    }
}

/// Free-text values use the `--flag=value` form so a leading `-` is never
/// mistaken for another flag.
impl fmt::Display for ResumeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = &self.state;
        write!(
            f,
            "{} --sec {} --musig2 {} -k {} --created-at {} --content={}",
            COMMAND,
            SECRET_KEY_PLACEHOLDER,
            state.signer_count,
            state.event.kind,
            state.event.created_at,
            shell_words::quote(&state.event.content)
        )?;
        for tag in &state.event.tags {
            write!(f, " --tag={}", shell_words::quote(&format_tag(tag)))?;
        }
        for key in &state.keys {
            write!(f, " --musig2-pubkey {}", encode_point(key))?;
        }
        for nonce in &state.nonces {
            write!(f, " --musig2-nonce {}", encode_nonce(nonce))?;
        }
        for partial in &state.partial_signatures {
            write!(f, " --musig2-partial {}", encode_partial(partial))?;
        }
        if self.requires_secret_nonce {
            write!(
                f,
                " --musig2-nonce-secret {}",
                shell_words::quote(SECRET_NONCE_PLACEHOLDER)
            )?;
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T>
where
    T::Err: fmt::Display,
{
    value
        .parse()
        .map_err(|e| Error::Decode(format!("invalid {} value {}: {}", flag, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nonce::commit_early;
    use crate::SignerKey;

    fn sample_state() -> CeremonyState {
        let keys: Vec<_> = (1u8..=2)
            .map(|b| SignerKey::from_slice(&[b; 32]).unwrap().public_key())
            .collect();
        let nonces = (1u8..=2)
            .map(|b| commit_early(&SignerKey::from_slice(&[b; 32]).unwrap()).unwrap().1)
            .collect();
        let partials = vec![crate::signer::decode_partial(&"0a".repeat(32)).unwrap()];

        CeremonyState {
            signer_count: 3,
            event: UnsignedEvent::new(1, 1_700_000_000, "it's a 'quoted' \"note\"")
                .with_tag(parse_tag("t=musig"))
                .with_tag(parse_tag("e=abcd,wss://relay.example")),
            keys,
            nonces,
            partial_signatures: partials,
        }
    }

    #[test]
    fn test_resume_roundtrip() {
        let command = ResumeCommand {
            state: sample_state(),
            requires_secret_nonce: true,
        };
        let decoded = ResumeCommand::decode(&command.encode()).unwrap();

        assert_eq!(decoded, command);
        assert_eq!(decoded.encode(), command.encode());
    }

    #[test]
    fn test_resume_flag_counts() {
        let command = ResumeCommand {
            state: sample_state(),
            requires_secret_nonce: false,
        };
        let text = command.encode();

        assert!(text.starts_with("musig-party sign --sec <their-key> --musig2 3 "));
        assert_eq!(text.matches(" --musig2-pubkey ").count(), 2);
        assert_eq!(text.matches(" --musig2-nonce ").count(), 2);
        assert_eq!(text.matches(" --musig2-partial ").count(), 1);
        assert!(!text.contains("--musig2-nonce-secret"));
        assert!(!text.chars().any(|c| c.is_ascii_uppercase()));
    }

    #[test]
    fn test_decode_rejects_real_secret_nonce() {
        let text = format!(
            "{} --musig2 2 -k 1 --created-at 0 -c '' --musig2-nonce-secret AAAA",
            COMMAND
        );
        assert!(matches!(ResumeCommand::decode(&text), Err(Error::Decode(_))));
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(ResumeCommand::decode("musig-party sign"), Err(Error::Decode(_))));
        assert!(matches!(
            ResumeCommand::decode("musig-party sign -k 1 --created-at 0"),
            Err(Error::Decode(_))
        ));
        assert!(matches!(
            ResumeCommand::decode("musig-party sign --musig2 2 -k 1 --created-at 0 -c 'open"),
            Err(Error::Decode(_))
        ));
        assert!(matches!(
            ResumeCommand::decode("musig-party sign --musig2 2 -k 1 --created-at 0 --bogus x"),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn test_hyphenated_content_and_tags() {
        let mut state = sample_state();
        state.event.content = "-gm".into();
        state.event.tags = vec![parse_tag("-x=-1")];
        let command = ResumeCommand {
            state,
            requires_secret_nonce: false,
        };
        let text = command.encode();

        let words = shell_words::split(&text).unwrap();
        assert!(words.iter().any(|w| w == "--content=-gm"));
        assert!(words.iter().any(|w| w == "--tag=-x=-1"));
        assert_eq!(ResumeCommand::decode(&text).unwrap(), command);
    }

    #[test]
    fn test_shell_quoting_roundtrip() {
        for value in ["it's", "two words", "", "$HOME `x` \\ \"q\""] {
            let text = format!(
                "{} --musig2 2 -k 1 --created-at 0 --content={}",
                COMMAND,
                shell_words::quote(value)
            );
            assert_eq!(ResumeCommand::decode(&text).unwrap().state.event.content, value);
        }
    }
}
