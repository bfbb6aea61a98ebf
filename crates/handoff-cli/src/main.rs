use clap::{Parser, Subcommand};
use handoff_core::CoreConfig;
use handoff_token::keys::DEFAULT_KEY_BITS;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "handoff", version, about = "Handoff identity bridge")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// RSA key management
    Keys {
        #[command(subcommand)]
        cmd: KeysCommand,
    },

    /// Issue and inspect identity tokens
    Token {
        #[command(subcommand)]
        cmd: TokenCommand,
    },

    /// Run the HTTP bridge until Ctrl-C
    Serve {
        /// Config file (defaults to $HANDOFF_CONFIG, then ./handoff.yaml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum KeysCommand {
    /// Generate a new RSA keypair
    Generate {
        /// Directory to write private.pem and public.pem into; prints to stdout otherwise
        #[arg(long)]
        output: Option<PathBuf>,

        /// Modulus size in bits
        #[arg(long, default_value_t = DEFAULT_KEY_BITS)]
        bits: usize,
    },
}

#[derive(Subcommand, Debug)]
enum TokenCommand {
    /// Encode a subject into a token stamped with the current time
    Encode {
        #[arg(long)]
        subject: String,

        /// Public key PEM file or PEM text
        #[arg(long, env = "HANDOFF_PUBLIC_KEY")]
        key: Option<String>,
    },

    /// Decode a token and check its freshness window
    Decode {
        #[arg(long)]
        token: String,

        /// Private key PEM file or PEM text
        #[arg(long, env = "HANDOFF_PRIVATE_KEY")]
        key: Option<String>,

        /// Config file supplying the freshness window
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Keys { cmd } => match cmd {
            KeysCommand::Generate { output, bits } => commands::keys::generate(output, bits)?,
        },

        Command::Token { cmd } => match cmd {
            TokenCommand::Encode { subject, key } => {
                let token = commands::token::encode(key, &subject)?;
                println!("{token}");
            }
            TokenCommand::Decode { token, key, config } => {
                let config = CoreConfig::load(config.as_deref())?;
                let decoded = commands::token::decode(key, &token, &config.token)?;
                commands::token::print_decoded(&decoded);
            }
        },

        Command::Serve { config } => commands::serve::run(config.as_deref()).await?,
    }

    Ok(())
}
