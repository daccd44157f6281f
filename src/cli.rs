use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Offline tooling for drive API credentials: device keys and session signatures
#[derive(Parser, Debug)]
#[command(version, about = "Drive credential utility")]
pub struct Cli {
    /// Optional JSON config file (missing fields use built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate ephemeral secp256k1 device key pairs
    Keygen {
        /// Number of keypairs to generate
        #[arg(long, default_value = "1")]
        count: u32,

        /// Optional path to write JSON output (pretty-printed)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Deterministically sign a digest (or the SHA-256 of a message)
    Sign {
        /// Private key, 32 bytes hex (0x optional)
        #[arg(long)]
        key: String,

        /// Digest to sign, up to 32 bytes hex
        #[arg(long, conflicts_with = "message", required_unless_present = "message")]
        digest: Option<String>,

        /// Message whose SHA-256 is signed
        #[arg(long)]
        message: Option<String>,

        /// Format byte appended to r||s (hex, or "none"); defaults to the config value
        #[arg(long)]
        suffix: Option<String>,
    },

    /// Check a signature against an uncompressed or compressed public key
    Verify {
        /// Public key hex (04||X||Y or 02/03||X)
        #[arg(long)]
        public_key: String,

        #[arg(long, conflicts_with = "message", required_unless_present = "message")]
        digest: Option<String>,

        #[arg(long)]
        message: Option<String>,

        /// r||s hex, optionally followed by one format byte
        #[arg(long)]
        signature: String,
    },

    /// Build the public key + signature a device would register for a user
    SessionSignature {
        #[arg(long)]
        user_id: String,

        /// Reuse this private key instead of generating one
        #[arg(long)]
        key: Option<String>,
    },

    /// Print the effective configuration (file + environment overrides)
    Config,
}
