//! Qernal CLI - command-line client for the Qernal platform.

use std::process;
use std::time::Duration;

use clap::Parser;
use qernal::api::SecretType;
use qernal::cli::{AuthCommands, Cli, Commands, FunctionsCommands, SecretsCommands};
use qernal::commands::{self, CommandResult, ProjectRef, SecretInput};
use qernal::config::{OutputFormat, Settings};
use qernal::prompt::TerminalPrompter;
use qernal::{Error, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "QERNAL_LOG";

fn main() {
    let cli = Cli::parse();
    let format = OutputFormat::parse(&cli.output).unwrap_or_default();
    init_tracing(cli.debug);

    if let Err(e) = run_command(cli.command, format) {
        match format {
            OutputFormat::Text => eprintln!("Error: {}", e),
            OutputFormat::Json => eprintln!("{}", serde_json::json!({ "error": e.to_string() })),
        }
        process::exit(1);
    }
}

/// Log to stderr so stdout stays machine-readable.
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("qernal=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn run_command(command: Commands, format: OutputFormat) -> Result<()> {
    let settings = Settings::from_env()?;
    tracing::debug!(?settings, "loaded settings");
    let mut prompter = TerminalPrompter::new();

    match command {
        Commands::Auth { command } => match command {
            AuthCommands::Login { no_verify } => {
                let result = commands::auth::login(&settings, &mut prompter, !no_verify)?;
                output(&result, format);
            }
            AuthCommands::Check { token } => {
                let result = commands::auth::check(&settings, &mut prompter, token)?;
                output(&result, format);
            }
            AuthCommands::Logout => {
                output(&commands::auth::logout(&settings)?, format);
            }
        },

        Commands::Secrets { command } => {
            // Stdin carries the secret; a credential prompt must never read it
            let mut prompter = TerminalPrompter::terminal_only();
            match command {
                SecretsCommands::Encrypt {
                    project,
                    public_key,
                    revision,
                } => {
                    let result = match public_key {
                        Some(key) => {
                            let plaintext = read_stdin_value()?;
                            commands::secrets::encrypt_with_key(&key, revision, &plaintext)?
                        }
                        None => {
                            let project = project_ref(project.project_id, project.project)
                                .ok_or_else(|| {
                                    Error::InvalidInput(
                                        "one of --project-id, --project or --public-key is required"
                                            .to_string(),
                                    )
                                })?;
                            let plaintext = read_stdin_value()?;
                            let client = commands::connect(&settings, &mut prompter)?;
                            commands::secrets::encrypt(&client, &project, &plaintext)?
                        }
                    };
                    output(&result, format);
                }
                SecretsCommands::Create {
                    project,
                    name,
                    secret_type,
                    registry_url,
                    public_key_file,
                    private_key_file,
                } => {
                    let project =
                        project_ref(project.project_id, project.project).ok_or_else(|| {
                            Error::InvalidInput(
                                "one of --project-id or --project is required".to_string(),
                            )
                        })?;
                    let secret_type = SecretType::parse(&secret_type).ok_or_else(|| {
                        Error::InvalidInput(format!("unknown secret type: {}", secret_type))
                    })?;

                    // All secret material is read before the credential is resolved
                    let input = match secret_type {
                        SecretType::Environment => SecretInput::Environment {
                            value: read_stdin_value()?,
                        },
                        SecretType::Registry => {
                            let url = registry_url.ok_or_else(|| {
                                Error::InvalidInput(
                                    "--registry-url is required to create a registry secret"
                                        .to_string(),
                                )
                            })?;
                            SecretInput::Registry {
                                url,
                                value: read_stdin_value()?,
                            }
                        }
                        SecretType::Certificate => match (public_key_file, private_key_file) {
                            (Some(cert), Some(key)) => SecretInput::Certificate {
                                certificate: std::fs::read_to_string(&cert)?,
                                private_key: std::fs::read_to_string(&key)?,
                            },
                            _ => {
                                return Err(Error::InvalidInput(
                                    "both --public-key-file and --private-key-file are required \
                                     for certificate secrets"
                                        .to_string(),
                                ));
                            }
                        },
                    };

                    let client = commands::connect(&settings, &mut prompter)?;
                    let result = commands::secrets::create(&client, &project, &name, &input)?;
                    output(&result, format);
                }
            }
        }

        Commands::Functions { command } => match command {
            FunctionsCommands::Logs {
                project_id,
                function,
                watch,
                interval,
            } => {
                if watch && format == OutputFormat::Json {
                    return Err(Error::InvalidInput(
                        "--watch cannot be combined with --output json".to_string(),
                    ));
                }
                let client = commands::connect(&settings, &mut prompter)?;
                if watch {
                    let mut stdout = std::io::stdout().lock();
                    commands::functions::watch(
                        &client,
                        &project_id,
                        &function,
                        Duration::from_secs(interval),
                        &mut stdout,
                    )?;
                } else {
                    let result = commands::functions::logs(&client, &project_id, &function)?;
                    output(&result, format);
                }
            }
        },

        Commands::Version => output(&commands::version(), format),
    }

    Ok(())
}

fn project_ref(id: Option<String>, name: Option<String>) -> Option<ProjectRef> {
    match (id, name) {
        (Some(id), _) => Some(ProjectRef::Id(id)),
        (None, Some(name)) => Some(ProjectRef::Name(name)),
        (None, None) => None,
    }
}

fn read_stdin_value() -> Result<String> {
    commands::read_secret_value(&mut std::io::stdin().lock())
}

/// Print output in JSON or human-readable format.
fn output<T: CommandResult>(result: &T, format: OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", result.to_human()),
        OutputFormat::Json => println!("{}", result.to_json()),
    }
}
