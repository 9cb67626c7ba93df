use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use run_db::{Configurator, CredentialPaths, DatabaseConfig, RunDbError};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Subcommand)]
enum Command {
    /// Check credential permissions and resolve credentials only
    Check {
        /// Database configuration file (TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Home directory holding .lsst/db-auth.toml (defaults to $HOME)
        #[arg(long)]
        home: Option<PathBuf>,
    },
    /// Resolve credentials and prepare the run database
    Setup {
        /// Database configuration file (TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Run identifier
        #[arg(short, long)]
        run_id: String,

        /// Home directory holding .lsst/db-auth.toml (defaults to $HOME)
        #[arg(long)]
        home: Option<PathBuf>,

        /// Print the database info as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Parser)]
#[command(name = "rundb")]
#[command(about = "Per-run database configuration tool")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

fn credential_paths(home: Option<&Path>) -> Result<CredentialPaths, RunDbError> {
    match home {
        Some(home) => Ok(CredentialPaths::from_home(home)),
        None => CredentialPaths::from_env(),
    }
}

fn check(config: &Path, home: Option<&Path>) -> Result<(), RunDbError> {
    let db_config = DatabaseConfig::from_file(config)?;
    let mut configurator =
        Configurator::mysql("check", db_config, credential_paths(home)?);

    configurator.check_configuration()?;

    println!("credentials ok");
    println!("  host url: {}", configurator.get_host_url()?);
    println!("  user:     {}", configurator.get_user()?);
    Ok(())
}

fn setup(config: &Path, run_id: &str, home: Option<&Path>, json: bool) -> Result<(), RunDbError> {
    let db_config = DatabaseConfig::from_file(config)?;
    let mut configurator = Configurator::mysql(run_id, db_config, credential_paths(home)?);

    configurator.setup()?;

    let info = configurator.get_db_info()?;
    if json {
        let rendered = serde_json::to_string_pretty(&info)
            .map_err(|e| RunDbError::config(format!("failed to render db info: {e}")))?;
        println!("{rendered}");
    } else {
        let context = configurator.run_context()?;
        println!("run database prepared");
        println!("  runid:      {}", info.runid);
        println!("  dbrun:      {}", info.dbrun);
        println!("  run url:    {}", context.run_url);
        println!("  global url: {}", context.global_url);
    }
    Ok(())
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rundb_cli=info,run_db=info"));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .with_env_filter(filter)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // --help and --version also land here
            let _ = e.print();
            std::process::exit(if e.use_stderr() { 2 } else { 0 });
        }
    };

    let result = match &args.command {
        Command::Check { config, home } => check(config, home.as_deref()),
        Command::Setup {
            config,
            run_id,
            home,
            json,
        } => setup(config, run_id, home.as_deref(), *json),
    };

    if let Err(e) = result {
        error!(error = %e, "run database setup failed");
        eprintln!("❌ {e}");
        std::process::exit(1);
    }
}
