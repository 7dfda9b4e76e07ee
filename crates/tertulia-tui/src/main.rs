use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tertulia_core::{
    ChatBackend, ChatSession, Config, Dispatcher, OfflineBackend, OllamaClient, ReplyOrigin,
};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

mod app;
mod handler;
#[cfg(test)]
mod test_support;
mod tui;
mod ui;

use app::App;

#[derive(Parser)]
#[command(name = "tertulia")]
#[command(about = "Terminal chat with local Ollama models", version)]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ollama server URL (overrides config and OLLAMA_HOST)
    #[arg(long)]
    ollama_url: Option<String>,

    /// Model to preselect
    #[arg(short, long)]
    model: Option<String>,

    /// Delay before each request is sent, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Run without a backend (no models are listed, so the chat stays blocked)
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Write debug logs to <config dir>/tertulia/logs
    #[arg(long, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the chat window (default)
    Chat,
    /// List models available on the backend
    Models,
    /// Send one message and print the reply
    Ask {
        /// Your message
        message: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Chat);
    let is_tui = matches!(command, Commands::Chat);

    let _log_guard = init_logging(&cli.log_level, cli.debug, is_tui)?;

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::get_config_path()?,
    };
    let mut config = Config::load(&config_path)?;
    if let Some(url) = cli.ollama_url {
        config.ollama_url = url;
    }
    if let Some(delay) = cli.delay_ms {
        config.dispatch_delay_ms = delay;
    }
    let preferred = cli.model.or_else(|| config.default_model.clone());

    let backend: Arc<dyn ChatBackend> = if cli.offline {
        Arc::new(OfflineBackend)
    } else {
        Arc::new(OllamaClient::new(&config.ollama_url))
    };
    info!(url = %config.ollama_url, offline = cli.offline, "backend configured");

    let dispatcher = Dispatcher::new(backend)
        .with_delay(config.dispatch_delay())
        .with_fallback(config.fallback());

    match command {
        Commands::Chat => run_tui(dispatcher, config_path, preferred.as_deref()).await,
        Commands::Models => list_models(dispatcher.backend()).await,
        Commands::Ask { message } => ask(dispatcher, &message, preferred.as_deref()).await,
    }
}

/// Console output is discarded in TUI mode so it cannot corrupt the screen.
/// With `--debug`, logs also go to a daily file; the returned guard flushes it.
fn init_logging(
    level: &str,
    debug: bool,
    is_tui: bool,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console = if is_tui {
        fmt::layer()
            .with_writer(std::io::sink)
            .with_target(false)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(console_filter)
            .boxed()
    };

    if !debug {
        tracing_subscriber::registry().with(console).init();
        return Ok(None);
    }

    let log_dir = Config::config_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let appender = tracing_appender::rolling::daily(&log_dir, "debug.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let file = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_ansi(false)
        .with_filter(EnvFilter::new("debug,hyper=info,reqwest=info"));

    tracing_subscriber::registry().with(console).with(file).init();
    Ok(Some(guard))
}

async fn run_tui(
    dispatcher: Dispatcher,
    config_path: PathBuf,
    preferred: Option<&str>,
) -> Result<()> {
    tui::claim_terminal();
    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut app = App::new(dispatcher, Some(config_path));
    let result = run_loop(&mut terminal, &mut app, preferred).await;

    tui::restore()?;
    result
}

async fn run_loop(
    terminal: &mut tui::Tui,
    app: &mut App,
    preferred: Option<&str>,
) -> Result<()> {
    // First frame shows the loading placeholder while models are fetched
    terminal.draw(|frame| ui::render(app, frame))?;
    app.load_models(preferred).await;

    let mut events = tui::EventHandler::new();
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }

    Ok(())
}

async fn list_models(backend: &dyn ChatBackend) -> Result<()> {
    let models = backend
        .get_models()
        .await
        .map_err(|e| {
            anyhow!(
                "Error connecting to Ollama: {}. Make sure Ollama is running: ollama serve",
                e
            )
        })?;

    if models.is_empty() {
        println!("No models found. Pull a model with: ollama pull llama3.2");
    } else {
        for model in models {
            println!("{}", model);
        }
    }
    Ok(())
}

/// One round trip through the same dispatcher the chat window uses.
async fn ask(dispatcher: Dispatcher, message: &str, preferred: Option<&str>) -> Result<()> {
    let mut session = ChatSession::new();
    session.bootstrap(dispatcher.backend(), preferred).await;
    if let Some(notice) = session.blocking_notice() {
        return Err(anyhow!("{}", notice));
    }

    session.composer_mut().insert_str(message);
    let reply = dispatcher
        .with_delay(Duration::ZERO)
        .submit(&mut session)
        .await
        .ok_or_else(|| anyhow!("Nothing to send: message is empty"))?;

    if reply.origin == ReplyOrigin::Fallback {
        info!("backend did not answer, printed fallback reply");
    }
    println!("{}", reply.content);
    Ok(())
}
