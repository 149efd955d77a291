use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use latency_blip::chart::{ChartRenderer, TerminalRasterizer};
use latency_blip::cli::Cli;
use latency_blip::config::{AppConfig, ProbeMode};
use latency_blip::sampling::{HistoryStore, HttpProbe, Probe, Sampler, SimulatedProbe, Target};
use latency_blip::stream::StreamPublisher;
use latency_blip::{display, logging, server, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ─────────────────────────────────────────
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    cli.apply(&mut config);
    config.validate().context("invalid configuration")?;

    logging::setup_logging(&config.logging, config.display.enabled)?;

    info!(version = env!("CARGO_PKG_VERSION"), "latency-blip starting");
    if config.timeout_exceeds_interval() {
        warn!(
            timeout_ms = config.probe.timeout_ms,
            interval_ms = config.sampler.interval_ms,
            "probe timeout is not below the sampling interval; a hung target can delay rounds"
        );
    }

    // ── 2. Core components ───────────────────────────────────────
    let targets: Arc<[Target]> = config.targets.clone().into();
    for target in targets.iter() {
        info!(target = %target.id, url = %target.url, "target configured");
    }

    let store = Arc::new(HistoryStore::new(config.sampler.history_capacity));
    let publisher = Arc::new(StreamPublisher::new(config.stream.format, config.stream.buffer));

    let probe: Arc<dyn Probe> = match config.probe.mode {
        ProbeMode::Http => Arc::new(
            HttpProbe::new(config.probe_timeout(), config.probe.fail_on_http_error)
                .context("building HTTP probe")?,
        ),
        ProbeMode::Simulated => {
            info!(seed = config.probe.seed, "using simulated probe");
            Arc::new(SimulatedProbe::new(config.probe.seed, config.probe.failure_rate))
        }
    };

    let sampler = Arc::new(Sampler::new(
        targets.clone(),
        probe,
        config.interval(),
        store.clone(),
        publisher.clone(),
    ));

    let shutdown = CancellationToken::new();

    // ── 3. Bind before sampling starts; this is the only fatal step ──
    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;

    // ── 4. Background tasks ──────────────────────────────────────
    let sampler_task = tokio::spawn({
        let sampler = sampler.clone();
        let cancel = shutdown.clone();
        async move { sampler.run(cancel).await }
    });

    let display_task = config.display.enabled.then(|| {
        let renderer = ChartRenderer::new(
            store.clone(),
            targets.clone(),
            TerminalRasterizer::new(config.display.width, config.display.height),
        );
        let refresh = config.refresh();
        let cancel = shutdown.clone();
        tokio::task::spawn_blocking(move || display::run(renderer, refresh, cancel))
    });

    tokio::spawn({
        let cancel = shutdown.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "cannot listen for ctrl-c");
                return;
            }
            info!("ctrl-c received, shutting down");
            cancel.cancel();
        }
    });

    // ── 5. Serve until shutdown ──────────────────────────────────
    let state = Arc::new(AppState {
        targets,
        store,
        publisher,
        sampler,
        shutdown: shutdown.clone(),
    });
    let app = server::create_router(state);

    info!(bind = %config.server.bind, "viewer stream → ws://{}/ws", config.server.bind);

    let serve_result = axum::serve(listener, app)
        .with_graceful_shutdown({
            let cancel = shutdown.clone();
            async move { cancel.cancelled().await }
        })
        .await;

    // Whatever ended the server also ends sampling and the display
    shutdown.cancel();
    if let Err(e) = sampler_task.await {
        error!(error = %e, "sampler task panicked");
    }
    if let Some(task) = display_task {
        match task.await {
            Ok(Err(e)) => error!(error = %e, "terminal display error"),
            Err(e) => error!(error = %e, "terminal display task panicked"),
            Ok(Ok(())) => {}
        }
    }

    serve_result.context("server exited with error")?;
    info!("bye");
    Ok(())
}
