//! CLI argument definitions for Qernal.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Qernal - command-line client for the Qernal platform.
///
/// Start with `qernal auth login` to store a credential.
#[derive(Parser, Debug)]
#[command(name = "qernal")]
#[command(author, version, about = "Command-line client for the Qernal platform", long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(
        short = 'o',
        long = "output",
        global = true,
        default_value = "text",
        value_parser = ["text", "json"]
    )]
    pub output: String,

    /// Enable debug logging on stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Credential management
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// Project secrets
    Secrets {
        #[command(subcommand)]
        command: SecretsCommands,
    },

    /// Function operations
    #[command(alias = "func")]
    Functions {
        #[command(subcommand)]
        command: FunctionsCommands,
    },

    /// Show version and build information
    Version,
}

/// Auth subcommands
#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Store a credential in ~/.qernal/config.yaml
    ///
    /// Reads `clientid@clientsecret` from the terminal (masked) or from stdin
    /// when not interactive.
    Login {
        /// Skip the remote check before saving
        #[arg(long)]
        no_verify: bool,
    },

    /// Validate a credential against the platform
    Check {
        /// Credential to check instead of the resolved one
        #[arg(long)]
        token: Option<String>,
    },

    /// Remove the stored credential
    Logout,
}

/// Project selection shared by project-scoped commands
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct ProjectArgs {
    /// Project id
    #[arg(long = "project-id", short = 'p')]
    pub project_id: Option<String>,

    /// Project name (looked up through the API)
    #[arg(long = "project")]
    pub project: Option<String>,
}

/// Secrets subcommands
#[derive(Subcommand, Debug)]
pub enum SecretsCommands {
    /// Encrypt a value from stdin against the project's DEK
    Encrypt {
        #[command(flatten)]
        project: OptionalProjectArgs,

        /// Encrypt offline against this base64 public key instead
        #[arg(long = "public-key", conflicts_with_all = ["project_id", "project"])]
        public_key: Option<String>,

        /// Revision to report with --public-key
        #[arg(long, requires = "public_key")]
        revision: Option<i64>,
    },

    /// Create a secret; values are read from stdin
    Create {
        #[command(flatten)]
        project: ProjectArgs,

        /// Secret name (stored upper-cased)
        #[arg(long)]
        name: String,

        /// Secret type
        #[arg(long = "type", value_parser = ["environment", "registry", "certificate"])]
        secret_type: String,

        /// Registry host, required for registry secrets
        #[arg(long = "registry-url")]
        registry_url: Option<String>,

        /// Certificate file, required for certificate secrets
        #[arg(long = "public-key-file")]
        public_key_file: Option<PathBuf>,

        /// Private key file, required for certificate secrets
        #[arg(long = "private-key-file")]
        private_key_file: Option<PathBuf>,
    },
}

/// Project selection for commands that can also run offline
#[derive(Args, Debug, Clone)]
#[group(required = false, multiple = false)]
pub struct OptionalProjectArgs {
    /// Project id
    #[arg(long = "project-id", short = 'p')]
    pub project_id: Option<String>,

    /// Project name (looked up through the API)
    #[arg(long = "project")]
    pub project: Option<String>,
}

/// Functions subcommands
#[derive(Subcommand, Debug)]
pub enum FunctionsCommands {
    /// Show function logs
    Logs {
        /// Project id
        #[arg(long = "project-id", short = 'p')]
        project_id: String,

        /// Function id
        #[arg(long, short = 'f')]
        function: String,

        /// Keep polling and print new records until interrupted
        #[arg(long)]
        watch: bool,

        /// Poll interval in seconds for --watch
        #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
        interval: u64,
    },
}
