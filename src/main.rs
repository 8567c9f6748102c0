use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing::{debug, error};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use runtime_installer::config::{
    BuildConfig, Endpoints, LAYERS_DIR_ENV, RUNTIME_VERSION_ENV, STACK_ID_ENV,
};
use runtime_installer::context::BuildContext;
use runtime_installer::error::InstallError;
use runtime_installer::install::Installer;
use runtime_installer::layer::{InstallLayer, LayerTypes};
use runtime_installer::runtime::{InstallableRuntime, os_for_stack};

#[derive(Parser)]
#[command(name = "runtime-installer")]
#[command(version, about = "Resolve and install language runtimes into buildpack layers")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Also write JSON logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// TOML file overriding the download base URLs
    #[arg(long, global = true)]
    endpoints: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct RuntimeArgs {
    /// Runtime to install, e.g. nodejs or openjdk
    #[arg(long)]
    runtime: InstallableRuntime,

    /// Version constraint; empty resolves the newest version
    #[arg(long = "version", env = RUNTIME_VERSION_ENV, default_value = "")]
    constraint: String,

    #[arg(long, env = STACK_ID_ENV)]
    stack: String,
}

#[derive(Args)]
struct LayerArgs {
    #[arg(long, env = LAYERS_DIR_ENV)]
    layers_dir: PathBuf,

    /// Layer name, defaults to the runtime id
    #[arg(long)]
    layer: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Install a runtime into a layer unless the layer already has it
    Install {
        #[command(flatten)]
        runtime: RuntimeArgs,
        #[command(flatten)]
        layer: LayerArgs,
    },
    /// Print the version a constraint resolves to
    Resolve {
        #[command(flatten)]
        runtime: RuntimeArgs,
    },
    /// Install the Dart SDK
    Dart {
        #[arg(long)]
        version: String,
        #[arg(long, env = STACK_ID_ENV)]
        stack: String,
        #[command(flatten)]
        layer: LayerArgs,
    },
    /// Install a Flutter SDK release
    Flutter {
        #[arg(long)]
        version: String,
        /// Release archive path within the Flutter storage bucket
        #[arg(long)]
        archive_path: String,
        #[arg(long, env = STACK_ID_ENV)]
        stack: String,
        #[command(flatten)]
        layer: LayerArgs,
    },
}

const INSTALL_LAYER: LayerTypes = LayerTypes {
    build: true,
    launch: true,
    cache: true,
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    let mut config = BuildConfig::from_env();
    if let Some(path) = &cli.endpoints {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading endpoints file {}", path.display()))?;
        let endpoints = Endpoints::from_toml_str(&content)
            .with_context(|| format!("parsing endpoints file {}", path.display()))?;
        config = config.with_endpoints(endpoints);
    }
    debug!("Build configuration: {:?}", config);

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(run(cli.command, config))
        .map_err(|e| {
            error!(kind = ?e.kind(), "{}", e);
            if let Some(hint) = e.hint() {
                error!("{}", hint);
            }
            e.into()
        })
}

async fn run(command: Command, config: BuildConfig) -> Result<(), InstallError> {
    let installer = Installer::new();

    match command {
        Command::Install { runtime, layer } => {
            let mut ctx = BuildContext::new(runtime.stack, config);
            let name = layer
                .layer
                .unwrap_or_else(|| runtime.runtime.as_str().to_string());
            let mut install_layer = InstallLayer::open(&layer.layers_dir, &name, INSTALL_LAYER)?;

            let cache_hit = installer
                .install_tarball_if_not_cached(
                    &mut ctx,
                    runtime.runtime,
                    &runtime.constraint,
                    &mut install_layer,
                )
                .await?;

            println!(
                "{:#}",
                json!({
                    "runtime": runtime.runtime.as_str(),
                    "version": ctx.installed_version(runtime.runtime.as_str()),
                    "cacheHit": cache_hit,
                    "layer": install_layer.path(),
                    "bom": ctx.bom(),
                })
            );
        }
        Command::Resolve { runtime } => {
            let os = os_for_stack(&runtime.stack);
            let ctx = BuildContext::new(runtime.stack, config);
            let version = installer
                .resolve_version(&ctx, runtime.runtime, &runtime.constraint, os)
                .await?;

            println!("{version}");
        }
        Command::Dart {
            version,
            stack,
            layer,
        } => {
            let mut ctx = BuildContext::new(stack, config);
            let name = layer.layer.unwrap_or_else(|| "dart".to_string());
            let mut install_layer = InstallLayer::open(&layer.layers_dir, &name, INSTALL_LAYER)?;

            installer
                .install_dart_sdk(&mut ctx, &mut install_layer, &version)
                .await?;

            println!("{:#}", json!({ "version": version, "layer": install_layer.path() }));
        }
        Command::Flutter {
            version,
            archive_path,
            stack,
            layer,
        } => {
            let mut ctx = BuildContext::new(stack, config);
            let name = layer.layer.unwrap_or_else(|| "flutter".to_string());
            let mut install_layer = InstallLayer::open(&layer.layers_dir, &name, INSTALL_LAYER)?;

            installer
                .install_flutter_sdk(&mut ctx, &mut install_layer, &version, &archive_path)
                .await?;

            println!("{:#}", json!({ "version": version, "layer": install_layer.path() }));
        }
    }
    Ok(())
}

/// Log to stderr, plus JSON lines to `log_file` when given. `RUST_LOG`
/// overrides the verbosity flag.
fn init_logging(verbose: u8, log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("runtime_installer=warn"),
        1 => EnvFilter::new("runtime_installer=info"),
        _ => EnvFilter::new("runtime_installer=debug"),
    });

    let stderr = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("log file {} has no file name", path.display()))?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
            (Some(fmt::layer().json().with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file_layer)
        .init();

    Ok(guard)
}
