// src/lib.rs

pub mod build;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;
pub mod watch;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::build::Builder;
use crate::cli::CliArgs;
use crate::config::{Settings, load_settings};
use crate::engine::{Runtime, RuntimeEvent};
use crate::errors::DevloopError;
use crate::exec::ProcessSupervisor;

/// Capacity of the watcher → controller channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - settings resolution (CLI > Devloop.toml > defaults)
/// - builder and process supervisor
/// - the controller runtime and its file watcher
/// - Ctrl-C / SIGTERM handling
pub async fn run(args: CliArgs) -> Result<()> {
    let settings = load_settings(&args)?;

    if args.dry_run {
        print_dry_run(&settings);
        return Ok(());
    }

    if args.once {
        return build_once(&settings).await;
    }

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(EVENT_CHANNEL_CAPACITY);

    spawn_signal_listener(rt_tx.clone());

    let builder = Builder::new(&settings);
    let supervisor = ProcessSupervisor::from_settings(&settings.server);

    let watch_settings = settings.clone();
    let watch_tx = rt_tx.clone();
    let runtime = Runtime::new(
        rt_rx,
        builder,
        supervisor,
        settings.root.clone(),
        settings.output.clone(),
        settings.watch.debounce,
    )
    .with_watcher(Box::new(move || {
        watch::subscribe_from_settings(&watch_settings, watch_tx)
    }));

    drop(rt_tx);

    info!(root = ?settings.root, "devloop starting");
    runtime.run().await?;
    Ok(())
}

/// Generate docs and build once, installing the binary on success.
async fn build_once(settings: &Settings) -> Result<()> {
    let builder = Builder::new(settings);

    match builder.ensure_docs(&settings.root).await {
        Ok(outcome) => debug!(?outcome, "docs step finished"),
        Err(err) => warn!(error = %err, "docs generation failed; building anyway"),
    }

    println!("[devloop] Building...");
    let result = builder.build(&settings.root, &settings.output).await;
    if let Some(err) = result.to_error() {
        return Err(err.into());
    }
    if let Some(warnings) = &result.diagnostics {
        eprintln!("{warnings}");
    }

    let artifact = result.artifact.ok_or_else(|| {
        DevloopError::BuildError("build produced no artifact".to_string())
    })?;
    builder.install(&artifact, &settings.output)?;
    println!("[devloop] Built {}", settings.output.display());
    Ok(())
}

/// Forward Ctrl-C (and SIGTERM on unix) to the runtime as a shutdown request.
fn spawn_signal_listener(tx: mpsc::Sender<RuntimeEvent>) {
    tokio::spawn(async move {
        if let Err(e) = wait_for_interrupt().await {
            eprintln!("failed to listen for shutdown signals: {e}");
            return;
        }
        debug!("interrupt received");
        let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
    });
}

#[cfg(unix)]
async fn wait_for_interrupt() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res,
        _ = term.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_interrupt() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Simple dry-run output: print the effective settings.
fn print_dry_run(settings: &Settings) {
    println!("devloop dry-run");
    println!("  root = {}", settings.root.display());
    println!("  entry = {}", settings.entry);
    println!("  output = {}", settings.output.display());
    println!();

    println!("build:");
    println!("  cmd: {:?}", settings.build.cmd);
    if let Some(limit) = settings.build.timeout {
        println!("  timeout: {}", humantime::format_duration(limit));
    }

    println!("docs:");
    println!("  mode: {}", settings.docs.mode);
    if settings.docs.mode != types::DocsMode::Never {
        println!("  cmd: {:?}", settings.docs.cmd);
        println!("  artifact: {}", settings.docs.artifact.display());
    }

    println!("watch:");
    println!("  extensions: {:?}", settings.watch.extensions);
    if !settings.watch.exclude.is_empty() {
        println!("  exclude: {:?}", settings.watch.exclude);
    }
    println!(
        "  debounce: {}",
        humantime::format_duration(settings.watch.debounce)
    );
    if settings.watch.use_hash {
        println!("  use_hash: true");
    }

    println!("server:");
    if !settings.server.args.is_empty() {
        println!("  args: {:?}", settings.server.args);
    }
    println!(
        "  stop_timeout: {}",
        humantime::format_duration(settings.server.stop_timeout)
    );

    debug!("dry-run complete (no execution)");
}
