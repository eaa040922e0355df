//! MuSig2 Party CLI
//!
//! Runs one step of a hand-relayed MuSig2 ceremony:
//! - Sign: contribute a key, nonce or partial signature and print the
//!   command for the next signer, or the signed event once complete
//! - Inspect: summarize a resume command without needing any secret
//!
//! During `sign`, everything meant only for the local operator goes to
//! stderr and stdout carries nothing but the final signed event.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use musig_ceremony::{
    advance, event::parse_tag, parse, types::encode_point, CeremonyState, Outcome, ResumeCommand,
    SignerKey, UnsignedEvent,
};
use tracing::{info, Level};

/// MuSig2 Party - hand-relayed signing ceremony
#[derive(Parser)]
#[command(name = "musig-party")]
#[command(about = "Jointly sign an event with MuSig2, relaying state by copy-paste")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one ceremony step
    Sign(SignArgs),

    /// Summarize a resume command
    Inspect {
        /// The full resume command, quoted as a single argument
        command: String,
    },
}

#[derive(clap::Args)]
struct SignArgs {
    /// Secret key (hex). There is no default.
    #[arg(long, env = "NOSTR_SECRET_KEY", hide_env_values = true)]
    sec: String,

    /// Number of signers in the ceremony
    #[arg(long = "musig2", value_name = "N")]
    signer_count: usize,

    /// Event kind
    #[arg(short, long, default_value_t = 1)]
    kind: u16,

    /// Event timestamp (unix seconds); defaults to now
    #[arg(long)]
    created_at: Option<i64>,

    /// Event content
    #[arg(short, long, default_value = "", allow_hyphen_values = true)]
    content: String,

    /// Event tag as key=value[,extra...]
    #[arg(short, long = "tag", allow_hyphen_values = true)]
    tags: Vec<String>,

    /// Public key of a signer, in arrival order
    #[arg(long = "musig2-pubkey")]
    pubkeys: Vec<String>,

    /// Public nonce relayed so far
    #[arg(long = "musig2-nonce")]
    nonces: Vec<String>,

    /// Partial signature relayed so far
    #[arg(long = "musig2-partial")]
    partials: Vec<String>,

    /// Secret nonce saved from your previous step (base64)
    #[arg(long = "musig2-nonce-secret")]
    nonce_secret: Option<String>,
}

fn main() -> Result<()> {
    // Logs share stderr with the private output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sign(ref args) => run_sign(args)?,
        Commands::Inspect { ref command } => show_inspect(command)?,
    }

    Ok(())
}

fn run_sign(args: &SignArgs) -> Result<()> {
    let signer = SignerKey::from_hex(&args.sec).context("invalid --sec")?;

    let mut event = UnsignedEvent::new(
        args.kind,
        args.created_at.unwrap_or_else(|| chrono::Utc::now().timestamp()),
        args.content.clone(),
    );
    event.tags = args.tags.iter().map(|t| parse_tag(t)).collect();

    let state: CeremonyState = parse::parse_state(
        args.signer_count,
        event,
        &args.pubkeys,
        &args.nonces,
        &args.partials,
    )?;
    let secret_nonce = parse::parse_secret_nonce(args.nonce_secret.as_deref())?;

    info!(
        pubkey = encode_point(&signer.public_key()),
        signer_count = args.signer_count,
        "Running ceremony step"
    );

    match advance(state, &signer, secret_nonce)? {
        Outcome::Continue(step) => {
            if let Some(combined) = step.combined_key {
                eprintln!("combined key: {}\n", encode_point(&combined));
            }
            if let Some(secret) = &step.secret_nonce {
                eprintln!("the following code should be saved secretly until the next step and included with --musig2-nonce-secret:");
                eprintln!("{}\n", secret.to_base64());
            }
            eprintln!("the next signer should call this on their side:");
            eprintln!("{}", step.resume);
        }
        Outcome::Complete(done) => {
            eprintln!("combined key: {}\n", encode_point(&done.combined_key));
            println!("{}", serde_json::to_string(&done.event)?);
        }
    }

    Ok(())
}

fn show_inspect(command: &str) -> Result<()> {
    let resume = ResumeCommand::decode(command)?;
    let state = &resume.state;

    println!("Ceremony:");
    println!("  Signers: {}", state.signer_count);
    println!("  Keys: {}", state.keys.len());
    println!("  Nonces: {}", state.nonces.len());
    println!("  Partial signatures: {}", state.partial_signatures.len());
    println!("  Needs secret nonce: {}", resume.requires_secret_nonce);
    for key in &state.keys {
        println!("  Signer: {}", encode_point(key));
    }
    match state.phase_for(false) {
        Ok(phase) => println!("  Next phase (new signer): {}", phase),
        Err(e) => println!("  Next phase (new signer): none ({})", e),
    }
    match state.phase_for(true) {
        Ok(phase) => println!("  Next phase (returning signer): {}", phase),
        Err(e) => println!("  Next phase (returning signer): none ({})", e),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use musig_ceremony::resume::SECRET_KEY_PLACEHOLDER;

    fn parse_resume(resume: &ResumeCommand) -> SignArgs {
        let text = resume
            .encode()
            .replace(SECRET_KEY_PLACEHOLDER, &"11".repeat(32));
        let words = shell_words::split(&text).unwrap();
        match Cli::try_parse_from(words).unwrap().command {
            Commands::Sign(args) => args,
            Commands::Inspect { .. } => panic!("resume command parsed as inspect"),
        }
    }

    #[test]
    fn test_resume_command_runs_through_cli() {
        let event = UnsignedEvent::new(7, 1_700_000_000, "-gm")
            .with_tag(parse_tag("-x=-1"))
            .with_tag(parse_tag("t=musig"));
        let signer = SignerKey::from_hex(&"22".repeat(32)).unwrap();

        let step = match advance(CeremonyState::new(2, event), &signer, None).unwrap() {
            Outcome::Continue(step) => step,
            Outcome::Complete(_) => panic!("ceremony completed early"),
        };
        let args = parse_resume(&step.resume);

        assert_eq!(args.signer_count, 2);
        assert_eq!(args.kind, 7);
        assert_eq!(args.created_at, Some(1_700_000_000));
        assert_eq!(args.content, "-gm");
        assert_eq!(args.tags, vec!["-x=-1", "t=musig"]);
        assert_eq!(args.pubkeys, vec![encode_point(&signer.public_key())]);
        assert_eq!(args.nonces.len(), 1);
        assert!(args.nonce_secret.is_none());
    }

    #[test]
    fn test_short_content_flag_accepts_hyphen() {
        let words = ["musig-party", "sign", "--sec", "00", "--musig2", "2", "-c", "-1", "-t", "-y"];
        match Cli::try_parse_from(words).unwrap().command {
            Commands::Sign(args) => {
                assert_eq!(args.content, "-1");
                assert_eq!(args.tags, vec!["-y"]);
            }
            Commands::Inspect { .. } => panic!("parsed as inspect"),
        }
    }
}
