//! LodeKV CLI Client
//!
//! Command-line interface for interacting with LodeKV.

use clap::{Parser, Subcommand};
use lodekv::Client;

/// LodeKV CLI
#[derive(Parser, Debug)]
#[command(name = "lodekv-cli")]
#[command(about = "CLI for LodeKV key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Append values to a list
    Lpush {
        /// The list key
        key: String,

        /// Values to append, in order
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Print a whole list
    Lrange {
        /// The list key
        key: String,
    },

    /// Delete keys
    Del {
        /// Keys to delete
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Ping the server
    Ping,

    /// Send an arbitrary command
    Raw {
        /// Command name followed by its arguments
        #[arg(required = true)]
        args: Vec<String>,
    },
}

impl Commands {
    fn into_args(self) -> Vec<String> {
        match self {
            Commands::Get { key } => vec!["GET".into(), key],
            Commands::Set { key, value } => vec!["SET".into(), key, value],
            Commands::Lpush { key, values } => {
                let mut args = vec!["LPUSH".into(), key];
                args.extend(values);
                args
            }
            Commands::Lrange { key } => vec!["LRANGE".into(), key],
            Commands::Del { keys } => {
                let mut args = vec!["DEL".into()];
                args.extend(keys);
                args
            }
            Commands::Ping => vec!["PING".into()],
            Commands::Raw { args } => args,
        }
    }
}

fn main() {
    let args = Args::parse();

    let mut client = match Client::connect(&args.server) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Could not connect to {}: {}", args.server, e);
            std::process::exit(1);
        }
    };

    match client.call(&args.command.into_args()) {
        Ok(reply) => println!("{}", reply),
        Err(e) => {
            eprintln!("Request failed: {}", e);
            std::process::exit(1);
        }
    }
}
