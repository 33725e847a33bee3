use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use repodoc::cli::Output;
use repodoc::cli::commands::generate::{GenerateOptions, Overrides};
use repodoc::{ErrorKind, RepoDocError};

#[derive(Parser)]
#[command(name = "repodoc")]
#[command(
    version,
    about = "Generate Markdown documentation for a remote repository"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(clap::Args, Clone, Default)]
struct CredentialArgs {
    #[arg(
        long,
        env = "REPODOC_TOKEN",
        hide_env_values = true,
        help = "Repository access token"
    )]
    token: Option<String>,
    #[arg(
        long,
        env = "REPODOC_API_KEY",
        hide_env_values = true,
        help = "Completion service API key"
    )]
    api_key: Option<String>,
    #[arg(long, help = "Completion service base URL")]
    base_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate documentation for a repository URL
    Generate {
        #[arg(help = "Repository URL, e.g. https://gitlab.example.com/group/project")]
        url: String,
        #[arg(long, short, help = "Output file (default: <output_dir>/<project>-docs.md)")]
        output: Option<PathBuf>,
        #[arg(long, conflicts_with = "output", help = "Print the document to stdout")]
        stdout: bool,
        #[arg(long = "static", help = "Skip completion endpoints and render static documentation")]
        static_only: bool,
        #[arg(long, help = "Maximum number of files to fetch")]
        max_files: Option<usize>,
        #[arg(long, help = "Maximum chunk size in bytes")]
        max_chunk_size: Option<usize>,
        #[arg(long, help = "Overall deadline in seconds")]
        deadline: Option<u64>,
        #[arg(long, help = "Do not verify the repository server certificate")]
        insecure: bool,
        #[command(flatten)]
        credentials: CredentialArgs,
    },

    /// Discover a working completion endpoint and print every attempt
    Probe {
        #[command(flatten)]
        credentials: CredentialArgs,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration (merged from all sources)
    Show {
        #[arg(long, help = "Print as JSON instead of TOML")]
        json: bool,
    },
    /// Show configuration file paths
    Path,
    /// Write a default configuration file
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

impl CredentialArgs {
    fn into_overrides(self) -> Overrides {
        Overrides {
            token: self.token,
            api_key: self.api_key,
            base_url: self.base_url,
            ..Overrides::default()
        }
    }
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n{}", style("━━━ PANIC ━━━").red().bold());
        eprintln!("{}", style("repodoc encountered an unexpected error:").red());
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "{}",
                style(format!(
                    "Location: {}:{}:{}",
                    location.file(),
                    location.line(),
                    location.column()
                ))
                .dim()
            );
        }
        eprintln!();

        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let (message, code) = match e.downcast_ref::<RepoDocError>() {
                Some(err) if err.kind() == ErrorKind::Cancelled => (err.with_hint(), 130),
                Some(err) => (err.with_hint(), 1),
                None => (format!("{:#}", e), 1),
            };
            eprintln!("{} {}", style("Error:").red().bold(), message);
            ExitCode::from(code)
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "repodoc=debug,info"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let out = Output::new(cli.quiet);

    match cli.command {
        Commands::Generate {
            url,
            output,
            stdout,
            static_only,
            max_files,
            max_chunk_size,
            deadline,
            insecure,
            credentials,
        } => {
            let options = GenerateOptions {
                url,
                output,
                stdout,
                static_only,
                overrides: Overrides {
                    max_files,
                    max_chunk_size,
                    deadline_secs: deadline,
                    insecure,
                    ..credentials.into_overrides()
                },
            };

            let rt = Runtime::new()?;
            rt.block_on(async move {
                let token = CancellationToken::new();
                let on_interrupt = token.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        on_interrupt.cancel();
                    }
                });
                repodoc::cli::commands::generate::run(options, out, token).await
            })?;
        }
        Commands::Probe { credentials } => {
            let rt = Runtime::new()?;
            rt.block_on(repodoc::cli::commands::probe::run(
                credentials.into_overrides(),
                out,
            ))?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { json } => repodoc::cli::commands::config::show(json, out)?,
            ConfigAction::Path => repodoc::cli::commands::config::path()?,
            ConfigAction::Init { global, force } => {
                repodoc::cli::commands::config::init(global, force, out)?
            }
        },
    }

    Ok(())
}
