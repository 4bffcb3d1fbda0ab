//! # keygate-client
//!
//! Command-line signing client for a keygate server. Every request (except
//! the health check) is HMAC-signed with the configured key/secret pair;
//! admin subcommands use the legacy `Admin` header format the admin gate
//! expects.
//!
//! ```text
//! keygate-client --url http://127.0.0.1:4000 --api-key k1 --api-secret s1 whoami
//! keygate-client graphql '{ shop }'
//! keygate-client keys list
//! keygate-client keys add k2 second-secret-second-secret-sec --name staging
//! ```

mod client;

use clap::{Parser, Subcommand};

use client::SignedClient;

/// Signing HTTP client for a keygate server.
#[derive(Parser)]
#[command(name = "keygate-client", version)]
struct Cli {
    /// Base URL of the keygate server.
    #[arg(long, env = "KEYGATE_URL", default_value = "http://127.0.0.1:4000")]
    url: String,
    /// API key used to sign requests.
    #[arg(long, env = "KEYGATE_API_KEY", default_value = "dev-key")]
    api_key: String,
    /// Shared signing secret for the API key.
    #[arg(
        long,
        env = "KEYGATE_API_SECRET",
        default_value = "dev-secret-0000000000000000000000000000"
    )]
    api_secret: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// `GET /api/health` (unsigned).
    Health,
    /// `GET /api/whoami` — show the identity the gate attaches.
    Whoami,
    /// `POST /graphql` with the given query string.
    Graphql { query: String },
    /// Key management (admin gate).
    Keys {
        #[command(subcommand)]
        action: KeyAction,
    },
}

#[derive(Subcommand)]
enum KeyAction {
    /// List registered keys, secrets redacted.
    List,
    /// Register a key (overwrites an existing record with the same key).
    Add {
        key: String,
        secret: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Enable a key.
    Enable { key: String },
    /// Disable a key; it stays listed but becomes invisible to lookups.
    Disable { key: String },
    /// Remove a key.
    Remove { key: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    let client = SignedClient::new(cli.url, cli.api_key, cli.api_secret);

    let result = match cli.command {
        Commands::Health => client.health().await,
        Commands::Whoami => client.whoami().await,
        Commands::Graphql { query } => client.graphql(&query).await,
        Commands::Keys { action } => match action {
            KeyAction::List => client.keys_list().await,
            KeyAction::Add { key, secret, name } => {
                client.keys_add(&key, &secret, name.as_deref()).await
            }
            KeyAction::Enable { key } => client.keys_enable(&key).await,
            KeyAction::Disable { key } => client.keys_disable(&key).await,
            KeyAction::Remove { key } => client.keys_remove(&key).await,
        },
    };

    match result {
        Ok(value) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&value).expect("response is valid JSON")
            );
        }
        Err(e) => {
            eprintln!("keygate-client: {e}");
            std::process::exit(1);
        }
    }
}
