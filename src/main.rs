//! Command-line front end for the provisioning adapter.
//!
//! ```text
//! airwatch-provisioning anchor decode <base64>
//! airwatch-provisioning anchor encode <uuid>
//! airwatch-provisioning --config airwatch.toml lookup --tenant main --kind group --key Sales
//! airwatch-provisioning --config airwatch.toml request --tenant main --method GET --path /system/info
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use reqwest::Method;
use serde_json::{json, Value};

use airwatch_provisioning::client::{ApiVersion, RequestExecutor, RequestSpec, ServiceClientRegistry};
use airwatch_provisioning::config::load_config;
use airwatch_provisioning::identity::{self, IdentityResolver, LookupIntent, ResourceKind};
use airwatch_provisioning::observability::logging::{init_tracing, DEFAULT_FILTER};

#[derive(Parser)]
#[command(name = "airwatch-provisioning")]
#[command(about = "Provisioning adapter for the device-management REST API", long_about = None)]
struct Cli {
    /// Adapter configuration file (TOML)
    #[arg(short, long, default_value = "airwatch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert between base64 anchors and platform UUIDs
    Anchor {
        #[command(subcommand)]
        direction: AnchorCommand,
    },
    /// Resolve an external key to platform identifiers
    Lookup {
        #[arg(long)]
        tenant: String,
        #[arg(long, value_enum)]
        kind: LookupKind,
        #[arg(long)]
        key: String,
        /// Passthrough Authorization value
        #[arg(long)]
        token: Option<String>,
    },
    /// Send one request through the failover executor
    Request {
        #[arg(long)]
        tenant: String,
        #[arg(long, default_value = "GET", value_parser = parse_method)]
        method: Method,
        /// Relative path or absolute URL
        #[arg(long)]
        path: String,
        /// JSON request body
        #[arg(long)]
        body: Option<String>,
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=2))]
        api_version: Option<u8>,
        /// Passthrough Authorization value
        #[arg(long)]
        token: Option<String>,
    },
}

#[derive(Subcommand)]
enum AnchorCommand {
    /// base64 anchor to hyphenated UUID
    Decode { anchor: String },
    /// hyphenated UUID to base64 anchor
    Encode { uuid: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum LookupKind {
    UserExternalId,
    UserName,
    Group,
}

impl From<LookupKind> for ResourceKind {
    fn from(kind: LookupKind) -> Self {
        match kind {
            LookupKind::UserExternalId => ResourceKind::UserByExternalId,
            LookupKind::UserName => ResourceKind::UserByUsername,
            LookupKind::Group => ResourceKind::Group,
        }
    }
}

fn parse_method(raw: &str) -> Result<Method, String> {
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes()).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() {
    init_tracing(DEFAULT_FILTER);

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Anchor { direction } => {
            let output = match direction {
                AnchorCommand::Decode { anchor } => identity::decode(&anchor)?,
                AnchorCommand::Encode { uuid } => identity::encode(&uuid)?,
            };
            println!("{}", output);
        }
        Commands::Lookup { tenant, kind, key, token } => {
            let executor = executor(&cli.config)?;
            let resolver = IdentityResolver::new(executor);
            let found = resolver
                .resolve_anchor(&tenant, kind.into(), &key, token.as_deref(), LookupIntent::Read)
                .await?;
            match found {
                Some(identity) => print_json(&serde_json::to_value(identity)?)?,
                None => {
                    eprintln!("Not found: {}", key);
                    std::process::exit(2);
                }
            }
        }
        Commands::Request {
            tenant,
            method,
            path,
            body,
            api_version,
            token,
        } => {
            let executor = executor(&cli.config)?;
            let mut spec = RequestSpec::new(method, path)
                .token(token.as_deref())
                .api_version(ApiVersion::from_number(api_version));
            if let Some(body) = body {
                spec = spec.body(serde_json::from_str::<Value>(&body)?);
            }

            let envelope = executor.execute(&tenant, spec).await?;
            print_json(&json!({
                "status": envelope.status,
                "statusMessage": envelope.status_message,
                "body": envelope.body.to_value(),
            }))?;
        }
    }

    Ok(())
}

fn executor(path: &std::path::Path) -> Result<RequestExecutor, Box<dyn std::error::Error>> {
    let config = load_config(path)?;
    let registry = Arc::new(ServiceClientRegistry::new(config));
    Ok(RequestExecutor::new(registry))
}

fn print_json(value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
