mod demo;
mod keygen;
mod serve;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

/// Signet document execution engine.
#[derive(Parser)]
#[command(name = "signet", version, about = "Signet document execution engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP JSON API server
    Serve {
        /// Port to listen on
        #[arg(long, default_value_t = 7171)]
        port: u16,
        /// Path to a JSON file mapping document references to display
        /// names, used by the link-document operation
        #[arg(long)]
        directory: Option<PathBuf>,
    },

    /// Generate an Ed25519 countersigning keypair
    Keygen {
        /// Signature algorithm (only ed25519 is supported)
        #[arg(long, default_value = "ed25519")]
        algorithm: String,
        /// Output file prefix; writes <prefix>.secret and <prefix>.pub
        #[arg(long, default_value = "signet-key")]
        output_prefix: String,
    },

    /// Run a complete document lifecycle in memory and print the result
    Demo,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, directory } => {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("error: failed to create tokio runtime: {e}");
                    process::exit(1);
                }
            };
            if let Err(e) = rt.block_on(serve::start_server(port, directory)) {
                eprintln!("error: {e}");
                process::exit(1);
            }
        }
        Commands::Keygen {
            algorithm,
            output_prefix,
        } => {
            if let Err(e) = keygen::cmd_keygen(&algorithm, &output_prefix) {
                eprintln!("error: {e}");
                process::exit(1);
            }
        }
        Commands::Demo => {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("error: failed to create tokio runtime: {e}");
                    process::exit(1);
                }
            };
            if let Err(e) = rt.block_on(demo::run_demo()) {
                eprintln!("error: {e}");
                process::exit(1);
            }
        }
    }
}
