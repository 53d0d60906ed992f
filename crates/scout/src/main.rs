//! Scout fetches secrets and configuration values from remote stores and
//! renders them as shell-consumable text, so processes can pick up their
//! environment at runtime instead of having secrets copied around.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod config;
mod output;
mod pipeline;

use config::Settings;

/// Fetch secrets and configuration values from remote services
#[derive(Parser, Debug)]
#[command(name = "scout")]
#[command(about = "Fetch secrets and configuration values from remote services")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    options: GlobalOptions,
}

/// Options shared by every subcommand, also settable via config file and
/// `SCOUT_*` environment variables (flags win).
#[derive(Args, Debug, Default)]
pub struct GlobalOptions {
    /// Config file (default is .scout.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Quiet output (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output
    #[arg(long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Debug output
    #[arg(long, global = true, conflicts_with = "quiet")]
    pub debug: bool,

    /// Surround each value with double quotes
    #[arg(long, global = true)]
    pub quote: bool,

    /// Set all variable names to lower case
    #[arg(long, global = true)]
    pub lower: bool,

    /// Set all variable names to upper case
    #[arg(long, global = true)]
    pub upper: bool,

    /// AWS region override
    #[arg(long, global = true, value_name = "REGION")]
    pub aws_region: Option<String>,

    /// AWS SSM parameter path; end with /* to fetch the whole subtree
    #[arg(long = "aws-param", global = true, value_name = "PATH")]
    pub aws_params: Vec<String>,

    /// AWS Secrets Manager secret name
    #[arg(long = "aws-secret", global = true, value_name = "NAME")]
    pub aws_secrets: Vec<String>,

    /// GCP Secret Manager secret (projects/P/secrets/S[/versions/V])
    #[arg(long = "gcp-secret", global = true, value_name = "PATH")]
    pub gcp_secrets: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch values and render them in env-file syntax
    Fetch {
        /// File to append the rendered values to (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        outfile: Option<PathBuf>,

        /// Permission bits for a newly created outfile, in octal
        #[arg(long, default_value = "0600", value_name = "MODE")]
        outfile_mode: String,
    },

    /// Fetch values and render them as shell export statements
    ///
    /// source <(scout export --aws-param /app/prod/*)
    Export,

    /// Print the version
    Version,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.options);

    match cli.command {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Fetch {
            outfile,
            outfile_mode,
        } => {
            let settings = Settings::resolve(&cli.options)?;
            run_fetch(&settings, outfile.as_deref(), &outfile_mode).await
        }
        Commands::Export => {
            let settings = Settings::resolve(&cli.options)?;
            run_export(&settings).await
        }
    }
}

async fn run_fetch(settings: &Settings, outfile: Option<&Path>, outfile_mode: &str) -> Result<()> {
    let case = settings.case_mode()?;
    // Validate the mode string before touching any remote store.
    let mode = outfile
        .map(|_| output::parse_file_mode(outfile_mode))
        .transpose()?;

    let variables = pipeline::fetch_variables(settings).await?;
    let rendered = scout_vars::format::as_env_file(&variables, settings.quote, case)?;

    if let (Some(path), Some(mode)) = (outfile, mode) {
        output::write_outfile(path, mode, &rendered)?;
        tracing::info!(path = %path.display(), "wrote values to file");
    } else {
        println!("{}", rendered);
    }

    Ok(())
}

async fn run_export(settings: &Settings) -> Result<()> {
    let case = settings.case_mode()?;
    let variables = pipeline::fetch_variables(settings).await?;
    let rendered = scout_vars::format::as_shell_export(&variables, case)?;
    println!("{}", rendered);
    Ok(())
}

/// Logs go to stderr so stdout carries nothing but the rendered values.
fn init_logging(options: &GlobalOptions) {
    let level = if options.quiet {
        "error"
    } else if options.debug {
        "trace"
    } else if options.verbose {
        "debug"
    } else {
        "info"
    };
    let directives = format!("scout={level},scout_sources={level},scout_vars={level}");

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives)),
        )
        .with_writer(std::io::stderr)
        .init();
}
