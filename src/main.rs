use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use remote_viewer::catalog::{CaptureSource, HttpSourceCatalog, SourceCatalog};
use remote_viewer::config::{LocalMediaMode, ViewerConfig};
use remote_viewer::events::{EventBus, ViewerEvent};
use remote_viewer::session::{Collaborators, SessionCoordinator, SessionOptions};
use remote_viewer::webrtc::{provider_for, HttpSignaling, RemoteStream, RtcTransportFactory};

/// Interval between remote stream statistics lines
const STATS_INTERVAL: Duration = Duration::from_secs(5);

/// Log level for the application
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Verbose,
    Debug,
    Trace,
}

/// remote-viewer command line arguments
#[derive(Parser, Debug)]
#[command(name = "remote-viewer")]
#[command(version, about = "View a remote screen over WebRTC", long_about = None)]
struct CliArgs {
    /// Config file path (TOML)
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Agent base URL (overrides config file and environment)
    #[arg(short = 's', long, value_name = "URL")]
    server: Option<String>,

    /// STUN server URL, may be repeated (replaces configured STUN servers)
    #[arg(long, value_name = "URL")]
    stun: Vec<String>,

    /// Log level (error, warn, info, verbose, debug, trace)
    #[arg(short = 'l', long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,

    /// Increase verbosity (-v for verbose, -vv for debug, -vvv for trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the capture sources offered by the agent
    Screens,
    /// Open a session and receive the remote stream until Ctrl-C
    View {
        /// Capture source index (default: the agent's first source)
        #[arg(long, value_name = "INDEX")]
        screen: Option<u32>,

        /// Attach a placeholder local video track to the offer
        #[arg(long)]
        local_media: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    init_logging(args.log_level, args.verbose);

    tracing::info!("Starting remote-viewer v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args).await?;
    tracing::info!("Agent: {}", config.base_url());

    let client = reqwest::Client::builder().build()?;
    let catalog = Arc::new(HttpSourceCatalog::new(client.clone(), config.base_url()));

    match args.command {
        Command::Screens => list_screens(catalog.as_ref()).await,
        Command::View {
            screen,
            local_media,
        } => {
            let mut config = config;
            if local_media {
                config.media.local_media = LocalMediaMode::Placeholder;
            }
            view(config, client, catalog, screen.map(CaptureSource)).await
        }
    }
}

/// Defaults, then config file, then environment, then command line
async fn load_config(args: &CliArgs) -> anyhow::Result<ViewerConfig> {
    let mut config = match &args.config {
        Some(path) => ViewerConfig::load(path).await?,
        None => ViewerConfig::default(),
    };
    config.apply_env();

    if let Some(server) = &args.server {
        config.server_url = server.clone();
    }
    if !args.stun.is_empty() {
        config.ice.stun_servers = args.stun.clone();
    }

    config.validate()?;
    Ok(config)
}

async fn list_screens(catalog: &dyn SourceCatalog) -> anyhow::Result<()> {
    let sources = catalog.list_sources().await?;
    if sources.is_empty() {
        println!("No capture sources available");
    }
    for source in sources {
        println!("{}\t{}", source.index(), source.label());
    }
    Ok(())
}

async fn view(
    config: ViewerConfig,
    client: reqwest::Client,
    catalog: Arc<HttpSourceCatalog>,
    screen: Option<CaptureSource>,
) -> anyhow::Result<()> {
    let events = Arc::new(EventBus::new());
    let shutdown = CancellationToken::new();
    let event_task = tokio::spawn(log_events(events.subscribe(), shutdown.clone()));

    let signaling =
        HttpSignaling::new(client, config.base_url()).with_timeout(config.timeouts.signaling());
    let coordinator = Arc::new(SessionCoordinator::new(
        SessionOptions::from_config(&config),
        Collaborators {
            catalog,
            transports: Arc::new(RtcTransportFactory),
            signaling: Arc::new(signaling),
            local_media: provider_for(config.media.local_media),
            presentation: events.clone(),
        },
    ));

    let result = run_session(&coordinator, screen).await;

    coordinator.teardown().await;
    shutdown.cancel();
    let _ = event_task.await;
    tracing::info!("Viewer stopped");
    result
}

/// Load the catalog, start the session and wait for Ctrl-C
async fn run_session(
    coordinator: &Arc<SessionCoordinator>,
    screen: Option<CaptureSource>,
) -> anyhow::Result<()> {
    let sources = coordinator.load_sources().await?;
    tracing::info!(
        "Agent offers {} capture source(s): {}",
        sources.len(),
        sources
            .iter()
            .map(|s| s.label())
            .collect::<Vec<_>>()
            .join(", ")
    );
    if let Some(source) = screen {
        coordinator.select_source(source);
    }

    // Negotiation runs in its own task so Ctrl-C can cancel it through
    // the coordinator instead of dropping it halfway.
    let mut start = tokio::spawn({
        let coordinator = coordinator.clone();
        async move { coordinator.start().await }
    });

    let info = tokio::select! {
        joined = &mut start => joined??,
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received during negotiation");
            coordinator.stop().await;
            let _ = start.await;
            return Ok(());
        }
    };

    tracing::info!(
        "Viewing {} (session {}), press Ctrl-C to stop",
        info.source.label(),
        info.session_id
    );
    shutdown_signal().await;
    tracing::info!("Shutdown signal received");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Log viewer events and follow remote streams until shutdown
async fn log_events(mut rx: broadcast::Receiver<ViewerEvent>, shutdown: CancellationToken) {
    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => break,
            event = rx.recv() => event,
        };
        match event {
            Ok(ViewerEvent::SessionStateChanged { state }) => {
                tracing::info!("Session state: {}", state);
            }
            Ok(ViewerEvent::RemoteStream { stream }) => {
                tracing::info!(
                    "Remote {} stream {} (track {})",
                    stream.kind,
                    stream.stream_id,
                    stream.track_id
                );
                tokio::spawn(follow_stream(stream, shutdown.child_token()));
            }
            Ok(ViewerEvent::Error { kind, message }) => {
                tracing::error!("{} error: {}", kind, message);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!("Event logger lagged, {} events dropped", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Drain a remote track, logging packet statistics periodically
async fn follow_stream(stream: RemoteStream, shutdown: CancellationToken) {
    let Some(track) = stream.track else {
        return;
    };

    let mut packets: u64 = 0;
    let mut bytes: u64 = 0;
    let mut ticker = tokio::time::interval(STATS_INTERVAL);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                tracing::info!(
                    "Remote {} stream: {} packets, {} KiB received",
                    stream.kind,
                    packets,
                    bytes / 1024
                );
            }
            read = track.read_rtp() => match read {
                Ok((packet, _)) => {
                    packets += 1;
                    bytes += packet.payload.len() as u64;
                }
                Err(e) => {
                    tracing::debug!("Remote track ended: {}", e);
                    break;
                }
            },
        }
    }
}

fn init_logging(level: LogLevel, verbose_count: u8) {
    // Verbose count overrides log level
    let effective_level = match verbose_count {
        0 => level,
        1 => LogLevel::Verbose,
        2 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };

    let filter = match effective_level {
        LogLevel::Error => "remote_viewer=error,webrtc=error",
        LogLevel::Warn => "remote_viewer=warn,webrtc=warn",
        LogLevel::Info => "remote_viewer=info,webrtc=warn",
        LogLevel::Verbose => "remote_viewer=debug,webrtc=warn",
        LogLevel::Debug => "remote_viewer=debug,webrtc=info",
        LogLevel::Trace => "remote_viewer=trace,webrtc=debug",
    };

    // Environment variable takes highest priority
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
    {
        eprintln!("failed to initialize tracing: {}", err);
    }
}
