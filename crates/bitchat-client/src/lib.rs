pub mod app;
pub mod commands;
pub mod config;
pub mod events;
pub mod input;
pub mod notifier;
pub mod render;
pub mod sequence;
pub mod state;
pub mod surface;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use bitchat_net::{HttpTransport, Transport};

use crate::app::AppContext;
use crate::config::{ClientConfig, OutputFormat};
use crate::events::AppEvent;
use crate::notifier::{Notifier, TerminalBell};
use crate::render::{HtmlRenderer, TerminalRenderer};
use crate::surface::StreamSurface;

/// Capacity of the application event queue.
const EVENT_QUEUE: usize = 256;

pub async fn run() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Tracing (RUST_LOG overrides); stdout belongs to the UI
    // -----------------------------------------------------------------------
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("bitchat_client=info,bitchat_net=info,warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting BitChat client v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Configuration
    // -----------------------------------------------------------------------
    let config = ClientConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Transport and event producers
    // -----------------------------------------------------------------------
    let transport: Arc<dyn Transport> =
        Arc::new(HttpTransport::new(&config.server_url, config.request_timeout)?);
    let (tx, rx) = mpsc::channel::<AppEvent>(EVENT_QUEUE);

    let push = app::build_push_channel(&config).spawn(tx.clone());
    let poller = app::spawn_poller(tx.clone(), config.poll_interval);
    let stdin = input::spawn_stdin_reader(tx.clone());

    // -----------------------------------------------------------------------
    // 4. Event loop (returns on /quit, stdin EOF or Ctrl+C)
    // -----------------------------------------------------------------------
    let notifier = Notifier::new(TerminalBell, config.notifications);
    let surface = StreamSurface::stdout(config.output, config.focus_idle);

    let event_loop = async {
        match config.output {
            OutputFormat::Terminal => {
                AppContext::new(transport, tx, TerminalRenderer::new(), surface, notifier)
                    .run(rx)
                    .await
            }
            OutputFormat::Html => {
                AppContext::new(transport, tx, HtmlRenderer::new(), surface, notifier)
                    .run(rx)
                    .await
            }
        }
    };

    tokio::select! {
        _ = event_loop => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    push.abort();
    poller.abort();
    stdin.abort();

    Ok(())
}
