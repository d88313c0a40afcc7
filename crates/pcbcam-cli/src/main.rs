//! PCB CAM CLI - call any procedure a PCB CAM server publishes.
//!
//! The command surface is generic: namespaces and procedures come from the
//! server's endpoint descriptor, so `pcbcam endpoints` shows what is callable.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pcbcam_client::ClientConfig;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

mod commands;
mod session;
mod store;

use commands::{auth, call, config as config_cmd, endpoints};
use session::CliSession;
use store::CredentialStore;

/// PCB CAM CLI - a generic front end for the PCB CAM procedure server.
///
/// Run `pcbcam endpoints` to list every procedure the server publishes.
#[derive(Parser, Debug)]
#[command(
    name = "pcbcam",
    author,
    version,
    about = "PCB CAM: call the procedures a PCB CAM server publishes",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Server site URL (overrides config and PCBCAM_SITE).
    #[arg(long, global = true)]
    site: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// List namespaces and procedures published by the server.
    Endpoints,

    /// Show a procedure's URL and metadata.
    Describe {
        /// Namespace name, e.g. ProjectsApi.
        namespace: String,
        /// Procedure name, e.g. index.
        procedure: String,
    },

    /// Call a procedure with JSON arguments.
    Call {
        /// Namespace name.
        namespace: String,
        /// Procedure name.
        procedure: String,

        /// Arguments as a JSON document.
        #[arg(short, long)]
        data: Option<String>,

        /// Individual arguments as key=value (can be specified multiple times).
        #[arg(short, long = "arg")]
        args: Vec<String>,
    },

    /// Upload a file to a procedure as a multipart form.
    Upload {
        /// Namespace name.
        namespace: String,
        /// Procedure name.
        procedure: String,

        /// File to upload.
        #[arg(short, long)]
        file: PathBuf,

        /// Extra form fields as key=value (can be specified multiple times).
        #[arg(long = "field")]
        fields: Vec<String>,
    },

    /// Print every item of a paginated procedure.
    Walk {
        /// Namespace name.
        namespace: String,
        /// Procedure name.
        procedure: String,

        /// Arguments as a JSON object.
        #[arg(short, long)]
        data: Option<String>,

        /// Individual arguments as key=value.
        #[arg(short, long = "arg")]
        args: Vec<String>,

        /// Stop after this many items (0 means no limit).
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Log in and store the returned API key.
    Login {
        /// Username.
        #[arg(short, long)]
        username: String,

        /// Password.
        #[arg(short, long, env = "PCBCAM_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored API key.
    Logout,

    /// Show the user the server associates with the current API key.
    Whoami,

    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration.
    Show,

    /// Set a configuration value.
    Set {
        /// Configuration key.
        key: String,
        /// Configuration value.
        value: String,
    },

    /// Get a configuration value.
    Get {
        /// Configuration key.
        key: String,
    },

    /// Reset configuration to defaults.
    Reset,

    /// Show path to config file.
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    let level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    let mut config = ClientConfig::load()?;
    if let Some(site) = cli.site {
        config.site = site;
    }

    let session = CliSession::new(CredentialStore::open_default()?);

    match cli.command {
        Commands::Endpoints => {
            endpoints::list(&config, &session).await?;
        }

        Commands::Describe {
            namespace,
            procedure,
        } => {
            endpoints::describe(&config, &session, &namespace, &procedure).await?;
        }

        Commands::Call {
            namespace,
            procedure,
            data,
            args,
        } => {
            let args = call::build_args(data.as_deref(), &args)?;
            call::execute(&config, &session, &namespace, &procedure, args).await?;
        }

        Commands::Upload {
            namespace,
            procedure,
            file,
            fields,
        } => {
            call::upload(&config, &session, &namespace, &procedure, &file, &fields).await?;
        }

        Commands::Walk {
            namespace,
            procedure,
            data,
            args,
            limit,
        } => {
            let args = call::build_args(data.as_deref(), &args)?;
            call::walk(&config, &session, &namespace, &procedure, args, limit).await?;
        }

        Commands::Login { username, password } => {
            auth::login(&config, &session, &username, &password).await?;
        }

        Commands::Logout => {
            auth::logout(&session)?;
        }

        Commands::Whoami => {
            endpoints::whoami(&config, &session).await?;
        }

        Commands::Config(config_cmd_inner) => match config_cmd_inner {
            ConfigCommands::Show => {
                config_cmd::show(&config, session.store())?;
            }
            ConfigCommands::Set { key, value } => {
                config_cmd::set(&mut config, &key, &value)?;
            }
            ConfigCommands::Get { key } => {
                config_cmd::get(&config, &key)?;
            }
            ConfigCommands::Reset => {
                config_cmd::reset()?;
            }
            ConfigCommands::Path => {
                if let Some(path) = ClientConfig::config_file_path() {
                    println!("{}", path.display());
                } else {
                    println!("(no config file path available)");
                }
            }
        },
    }

    Ok(())
}
