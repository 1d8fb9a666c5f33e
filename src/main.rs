//! Brain deploy
use clap::{Parser, Subcommand};
use thiserror::Error;
use log::{debug, error, info};
use crate::environment::Environment;
use crate::values::{MkdocsConfig, Values};

mod config;
mod deploy;
mod environment;
mod ingress;
mod secrets;
mod values;

/// Render and deploy the brain Helm release.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory holding brain.toml; the chart path is resolved relative to it.
    #[arg(default_value = ".")]
    deploy_directory: String,

    /// Path to the configuration file.
    #[arg(long)]
    config: Option<String>,

    /// Target environment, e.g. `production` or `dev`.
    #[arg(long, env = "BRAIN_ENV")]
    environment: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the Helm values for the selected environment to standard output.
    Values {
        /// Do not fetch secrets; print a placeholder host key instead.
        #[arg(long)]
        redact: bool,
    },
    /// Print the mkdocs configuration embedded in the release.
    Mkdocs,
    /// Install or upgrade the Helm release.
    Deploy {
        /// Render the release without changing the cluster.
        #[arg(long)]
        dry_run: bool,

        /// Kubernetes context to deploy into. Overrides the configuration file.
        #[arg(long)]
        kube_context: Option<String>,

        /// Path to the kubeconfig file. Overrides the configuration file.
        #[arg(long)]
        kubeconfig: Option<String>,
    },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration file: {0}")]
    ConfigParse(#[from] config::file::Error),

    #[error("configuration: {0}")]
    Config(#[from] config::runtime::Error),

    #[error("environment: {0}")]
    Environment(#[from] environment::Error),

    #[error("secrets: {0}")]
    Secrets(#[from] secrets::Error),

    #[error("values: {0}")]
    Values(#[from] values::Error),

    #[error("deploy: {0}")]
    Deploy(#[from] deploy::Error),
}

const REDACTED: &str = "<redacted>";

/// Read configuration file from disk and merge it with the
/// `default.toml` [built-in config](../default.toml).
///
/// If a configuration file name is not set explicitly, this function will
/// detect whether a config file with the default file name exists on disk.
/// If it does, it is used implicitly. If not, we ignore any read errors.
fn read_config(args: &Cli) -> Result<config::file::File, Error> {
    const DEFAULT_CONFIG_FILE: &str = "brain.toml";

    let config_path = format!("{}/{}", args.deploy_directory, DEFAULT_CONFIG_FILE);

    let config_file = match &args.config {
        None => {
            if std::fs::metadata(&config_path)
                .map(|metadata| metadata.is_file())
                .unwrap_or(false)
            {
                debug!("Using configuration file {config_path}");
                Some(config_path)
            } else {
                None
            }
        }
        Some(c) => Some(c.clone()),
    };

    Ok(if let Some(config_file) = config_file {
        config::file::File::default_with_user_config_file(&config_file)?
    } else {
        config::file::File::default()
    })
}

/// `--environment`/`BRAIN_ENV` first, then the configuration file, then `dev`.
fn select_environment(args: &Cli, cfg_file: &config::file::File) -> Result<Environment, Error> {
    let name = args
        .environment
        .as_deref()
        .or(cfg_file.environment.as_deref())
        .unwrap_or("dev");
    Ok(name.parse::<Environment>()?)
}

async fn fetch_host_key(cfg_file: &config::file::File, environment: &Environment) -> Result<String, Error> {
    let client = secrets::Client::try_new_from_env(&cfg_file.secrets.api_url)?;
    let secrets = client
        .get_secrets(&cfg_file.secrets.project, environment.short_name())
        .await?;
    Ok(secrets.get(&cfg_file.secrets.host_key)?.to_string())
}

#[tokio::main]
async fn main() {
    match run().await {
        Ok(_) => std::process::exit(0),
        Err(err) => {
            error!("fatal: {}", err.to_string());
            std::process::exit(1)
        }
    }
}

async fn run() -> Result<(), Error> {
    env_logger::init();

    let args = Cli::parse();
    let cfg_file = read_config(&args)?;

    if let Commands::Mkdocs = args.command {
        print!("{}", MkdocsConfig::default().to_yaml()?);
        return Ok(());
    }

    let environment = select_environment(&args, &cfg_file)?;
    let cfg = config::runtime::Config::new(&cfg_file, environment, &args.deploy_directory, |key| {
        std::env::var(key).ok()
    })?;

    info!("Application: {}", &cfg.app);
    info!("Environment: {} ({} exposure)", &cfg.environment, &cfg.expose);
    info!("Release: {}", &cfg.release_name);
    info!("Image tag: {}", &cfg.image_tag);

    match args.command {
        Commands::Mkdocs => Ok(()),
        Commands::Values { redact } => {
            let host_key = if redact {
                REDACTED.to_string()
            } else {
                fetch_host_key(&cfg_file, &cfg.environment).await?
            };
            let values = Values::build(&cfg_file, &cfg, host_key)?;
            print!("{}", values.to_yaml()?);
            Ok(())
        }
        Commands::Deploy {
            dry_run,
            kube_context,
            kubeconfig,
        } => {
            let host_key = fetch_host_key(&cfg_file, &cfg.environment).await?;
            let release = deploy::Release {
                name: cfg.release_name.clone(),
                namespace: cfg.release_name.clone(),
                chart: cfg.chart.clone(),
                create_namespace: true,
                hostname: cfg.http_hostname.clone(),
                expose: cfg.expose,
                values: Values::build(&cfg_file, &cfg, host_key)?,
            };
            let provider = deploy::Provider {
                kubeconfig: kubeconfig.or(cfg_file.helm.kubeconfig.clone()),
                kube_context: kube_context.or(cfg_file.helm.kube_context.clone()),
            };
            let options = deploy::Options {
                wait: cfg_file.helm.wait,
                dry_run,
            };

            info!("Deploying {} from {}", &release.name, &release.chart);
            deploy::apply(&release, &provider, &options)?;
            info!("Release {} is up to date", &release.name);
            Ok(())
        }
    }
}
