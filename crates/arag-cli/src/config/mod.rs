//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── log_format: LogFormat
//! └── command: Command
//!     ├── schema types|form   # Schema inspection
//!     ├── codec encode|decode # Config conversion
//!     └── pull                # Remote pipeline snapshot (ReqwestConfig)
//! ```
//!
//! Flags of the agent API can also be provided via environment variables.

use std::io;
use std::path::PathBuf;
use std::process;

use arag_reqwest::ReqwestConfig;
use arag_workflow::node::{NodeCategory, NodeType};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "arag")]
#[command(about = "Inspect and sync retrieval-agent workflows")]
#[command(version)]
pub struct Cli {
    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text, env = "LOG_FORMAT")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Top-level subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Inspect a schema document.
    #[command(subcommand)]
    Schema(SchemaCommand),
    /// Convert between UI configurations and backend agents.
    #[command(subcommand)]
    Codec(CodecCommand),
    /// Load the remote pipeline and print its graph snapshot.
    Pull(PullArgs),
}

/// Schema inspection subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum SchemaCommand {
    /// List the node types available in a category.
    Types {
        /// Path to the JSON schema document.
        #[arg(long)]
        schema: PathBuf,
        /// Pipeline category.
        #[arg(long)]
        category: NodeCategory,
    },
    /// Print the generated form of a node type.
    Form {
        /// Path to the JSON schema document.
        #[arg(long)]
        schema: PathBuf,
        #[command(flatten)]
        node: NodeArgs,
    },
}

/// Codec subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum CodecCommand {
    /// Encode a UI configuration into a backend agent.
    Encode(CodecArgs),
    /// Decode a backend agent into a UI configuration.
    Decode(CodecArgs),
}

/// Node type selection shared by several subcommands.
#[derive(Debug, Clone, Args)]
pub struct NodeArgs {
    /// Node type, e.g. `pre_conditional`.
    #[arg(long)]
    pub node_type: NodeType,
    /// Pipeline category, defaulting to the node type's own.
    #[arg(long)]
    pub category: Option<NodeCategory>,
}

impl NodeArgs {
    /// Returns the explicit category or the node type's own.
    pub fn category(&self) -> NodeCategory {
        self.category.unwrap_or(self.node_type.category())
    }
}

/// Arguments of `codec encode` and `codec decode`.
#[derive(Debug, Clone, Args)]
pub struct CodecArgs {
    #[command(flatten)]
    pub node: NodeArgs,
    /// JSON file holding the object to convert.
    #[arg(long)]
    pub input: PathBuf,
}

/// Arguments of `pull`.
#[derive(Debug, Clone, Args)]
pub struct PullArgs {
    #[command(flatten)]
    pub store: ReqwestConfig,
    /// Fail when a category cannot be fetched instead of treating it as empty.
    #[arg(long)]
    pub strict: bool,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Initializes tracing with environment-based filtering.
    ///
    /// Logs are written to stderr so command output stays parseable.
    pub fn init_tracing(&self) -> anyhow::Result<()> {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("info"))
            .map_err(|e| anyhow::anyhow!("Failed to create env filter: {e}"))?;
        let registry = tracing_subscriber::registry().with(filter);

        match self.log_format {
            LogFormat::Text => registry
                .with(fmt::layer().with_target(true).with_writer(io::stderr))
                .try_init(),
            LogFormat::Json => registry
                .with(fmt::layer().json().with_writer(io::stderr))
                .try_init(),
        }
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))
    }

    /// Logs build and configuration information at debug level.
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            features = ?Self::enabled_features(),
            "Build information"
        );

        if let Command::Pull(args) = &self.command {
            tracing::debug!(
                target: TRACING_TARGET_CONFIG,
                base_url = %args.store.base_url,
                has_api_key = args.store.api_key.is_some(),
                timeout_secs = args.store.effective_timeout().as_secs(),
                "Agent API configuration"
            );
        }
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}
