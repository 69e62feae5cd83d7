//! cask: content-addressed, end-to-end-encrypted chunk pipeline
//!
//! Commands:
//!   split [FILE]       - chunk, encrypt, and store a byte stream; keys to stdout
//!   join [FILE] [OUT]  - reassemble the stream named by a key list
//!   mv [FILE]          - copy chunks to the remote, skipping ones it has
//!   secret new         - generate a fresh secret
//!
//! Keys travel as newline-delimited base-64 text, so commands compose:
//!   cask split < backup.tar | cask mv | tee keys.txt

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use cask_chunks::StreamChunker;
use cask_core::{Key, KeyRead, KeyWrite, MemKeys, Secret, TextKeyReader, TextKeyWriter};
use cask_pipeline::{join, split, transfer, Config};

mod setup;

#[derive(Parser, Debug)]
#[command(
    name = "cask",
    version,
    about = "content-addressed, end-to-end-encrypted chunk pipeline",
    long_about = "cask: split byte streams into encrypted content-addressed chunks, \
                  reassemble them, and move them to a remote store"
)]
struct Cli {
    /// Path to the cask.toml configuration file
    #[arg(
        long,
        short = 'c',
        env = "CASK_CONFIG",
        default_value = "~/.config/cask/cask.toml"
    )]
    config: PathBuf,

    /// Base-64 secret (overrides the config file)
    #[arg(long, env = "CASK_SECRET", hide_env_values = true, global = true)]
    secret: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Split a byte stream into encrypted chunks in the local store
    ///
    /// Reads from FILE or stdin and writes one content key per line to
    /// stdout, in stream order. Chunks already present are not written
    /// again, which deduplicates data stored under the same secret.
    Split {
        /// Input file (default: stdin)
        input: Option<PathBuf>,
    },

    /// Reassemble the byte stream named by a key list
    ///
    /// Reads keys from FILE or stdin and writes chunk plaintexts to OUT or
    /// stdout in key order. Chunks are fetched from the local store first,
    /// then from the remote.
    Join {
        /// Key list file (default: stdin)
        input: Option<PathBuf>,
        /// Output file (default: stdout)
        output: Option<PathBuf>,
    },

    /// Copy the chunks named by a key list from the local store to the remote
    ///
    /// Writes the keys actually moved to stdout; keys the remote already
    /// held are skipped silently.
    #[command(name = "mv")]
    Move {
        /// Key list file (default: stdin)
        input: Option<PathBuf>,
        /// Skip the destination enumeration pre-step and push every chunk
        #[arg(long)]
        no_index: bool,
    },

    /// Secret management
    Secret {
        #[command(subcommand)]
        action: SecretAction,
    },
}

#[derive(Subcommand, Debug)]
enum SecretAction {
    /// Generate a fresh secret and print it base-64 encoded
    New,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // secret generation needs neither config nor an existing secret
    if let Commands::Secret {
        action: SecretAction::New,
    } = &cli.command
    {
        println!("{}", Secret::generate().encode());
        return Ok(());
    }

    let file = setup::load_file_config(&cli.config)?;
    setup::init_tracing(&file);
    let secret = setup::resolve_secret(cli.secret.as_deref(), &file)?;

    match cli.command {
        Commands::Split { input } => {
            let config = setup::build_config(&file, secret, false)?;
            run_split(input, &config).await
        }
        Commands::Join { input, output } => {
            let config = setup::build_config(&file, secret, false)?;
            run_join(input, output, &config).await
        }
        Commands::Move { input, no_index } => {
            let config = setup::build_config(&file, secret, !no_index)?;
            run_move(input, &config).await
        }
        Commands::Secret { .. } => unreachable!("handled above"),
    }
}

async fn run_split(input: Option<PathBuf>, config: &Config) -> Result<()> {
    let reader: Box<dyn Read> = match &input {
        Some(path) => Box::new(
            File::open(path).with_context(|| format!("opening input {}", path.display()))?,
        ),
        None => Box::new(std::io::stdin().lock()),
    };

    let mut chunker = StreamChunker::new(reader, &config.secret);
    let mut keys = TextKeyWriter::new(BufWriter::new(std::io::stdout().lock()));
    split(&mut chunker, &mut keys, config).await?;
    keys.flush()?;
    Ok(())
}

async fn run_join(input: Option<PathBuf>, output: Option<PathBuf>, config: &Config) -> Result<()> {
    let mut keys = open_key_reader(input)?;
    let mut out: BufWriter<Box<dyn Write>> = BufWriter::new(match &output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("creating output {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout().lock()),
    });

    join(keys.as_mut(), &mut out, config).await?;
    out.flush().context("flushing output")?;
    Ok(())
}

async fn run_move(input: Option<PathBuf>, config: &Config) -> Result<()> {
    let mut keys = open_key_reader(input)?;
    let mut moved = TextKeyWriter::new(BufWriter::new(std::io::stdout().lock()));
    transfer(keys.as_mut(), &mut moved, config).await?;
    moved.flush()?;
    Ok(())
}

/// A key reader over FILE (seekable, streamed) or stdin (buffered into
/// memory, since stdin cannot rewind).
fn open_key_reader(input: Option<PathBuf>) -> Result<Box<dyn KeyRead>> {
    match input {
        Some(path) => {
            let file =
                File::open(&path).with_context(|| format!("opening keys {}", path.display()))?;
            Ok(Box::new(TextKeyReader::new(BufReader::new(file))))
        }
        None => {
            let mut keys = MemKeys::new();
            for line in std::io::stdin().lock().lines() {
                let line = line.context("reading keys from stdin")?;
                let text = line.trim();
                if text.is_empty() {
                    continue;
                }
                keys.write_key(Key::decode(text)?)?;
            }
            Ok(Box::new(keys))
        }
    }
}
