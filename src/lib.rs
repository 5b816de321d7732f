mod cli;
pub mod core;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::core::auth::{LauncherProfile, PROFILE_FILE};
use crate::core::downloader::{Downloader, Transport};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::build_http_client;
use crate::core::instance::ManagedRoot;
use crate::core::java::RuntimeProvisioner;
use crate::core::progress::{ProgressEvent, ProgressSink};
use crate::core::state::{default_data_dir, instance_root, LauncherSettings, Orchestrator};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,packsync_lib=debug")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    tracing::info!("PackSync starting...");

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(execute(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("{}", e.status_message());
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> LauncherResult<()> {
    let data_dir = default_data_dir();
    let mut settings = LauncherSettings::load(&data_dir);
    if let Some(url) = cli.manifest_url {
        settings.manifest_url = url;
    }
    let root = cli
        .root
        .map(ManagedRoot::new)
        .unwrap_or_else(|| instance_root(&data_dir));

    let (progress, events) = ProgressSink::channel();
    let printer = tokio::spawn(print_progress(events));

    let client = build_http_client()
        .map_err(|e| LauncherError::Other(format!("Failed to build HTTP client: {e}")))?;
    let transport: Arc<dyn Transport> = Arc::new(Downloader::new(client, progress.clone()));

    let result = dispatch(cli.command, data_dir, root, transport, settings, progress).await;

    // All senders are dropped with the command, which ends the printer.
    let _ = printer.await;
    result
}

async fn dispatch(
    command: Commands,
    data_dir: PathBuf,
    root: ManagedRoot,
    transport: Arc<dyn Transport>,
    settings: LauncherSettings,
    progress: ProgressSink,
) -> LauncherResult<()> {
    match command {
        Commands::Sync => {
            let orchestrator = Orchestrator::new(root, transport, settings, progress);
            let manifest = orchestrator.sync().await?;
            println!(
                "Modpack v{} (Minecraft {}, {})",
                manifest.version, manifest.minecraft, manifest.loader
            );
        }
        Commands::Prepare(args) => {
            let profile_path = data_dir.join(PROFILE_FILE);
            let saved = LauncherProfile::load(&profile_path).await;
            let profile = LauncherProfile::resolve(saved, &args.username);
            tokio::fs::create_dir_all(&data_dir)
                .await
                .map_err(|e| LauncherError::io(&data_dir, e))?;
            if let Err(e) = profile.save(&profile_path).await {
                tracing::warn!("Could not remember profile: {}", e);
            }
            let orchestrator = Orchestrator::new(root, transport, settings, progress);
            let config = orchestrator.prepare_launch(profile).await?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Runtime(args) => {
            progress.status("Checking Java Runtime...");
            let java = RuntimeProvisioner::new(&root, transport)
                .ensure(args.major)
                .await?;
            println!("{}", java.display());
        }
    }
    Ok(())
}

/// Render byte progress on stderr. Status lines already go through tracing.
async fn print_progress(mut events: tokio::sync::mpsc::UnboundedReceiver<ProgressEvent>) {
    let mut last_percent = None;
    while let Some(event) = events.recv().await {
        if let ProgressEvent::Progress {
            task,
            total,
            current,
            ..
        } = event
        {
            if total == 0 {
                continue;
            }
            let percent = current.saturating_mul(100) / total;
            if last_percent != Some((task.clone(), percent)) {
                eprint!("\r{task}: {percent}%");
                if current >= total {
                    eprintln!();
                }
                last_percent = Some((task, percent));
            }
        }
    }
}
