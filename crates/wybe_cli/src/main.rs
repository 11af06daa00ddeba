use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{oneshot, watch};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wybe_core::payload::{encode, InnerThought, Speech, TextInput};
use wybe_core::{
    ids, Injector, PersistedState, Scheduler, SelfState, SelfStateStore, Signal, SignalType,
    WybeConfig,
};
use wybe_engines::standard_engines;
use wybe_reasoning::{channel_from_config, BridgeHandle, ReflectionBridge, ThoughtBridge};

#[derive(Parser, Debug)]
#[command(name = "wybe", author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "wybe.toml", env = "WYBE_CONFIG")]
    config: PathBuf,

    /// Self-state snapshot to resume from and save to on exit
    #[arg(short, long, env = "WYBE_STATE")]
    state: Option<PathBuf>,

    /// Answer with the built-in mock instead of the reasoning service
    #[arg(long)]
    offline: bool,

    /// Stop after this many ticks
    #[arg(long)]
    ticks: Option<u64>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,

    /// Log as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(args: &Args) {
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    // stdout belongs to the conversation; logs go to stderr.
    if args.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Start from the saved snapshot when there is a valid one.
fn rehydrate(store: &mut SelfStateStore, path: &Path) {
    if !path.exists() {
        info!("No saved state at {}, starting fresh", path.display());
        return;
    }
    match PersistedState::load(path) {
        Ok(saved) => {
            if store.restore(saved.state).is_ok() {
                info!("Resumed state saved at {}", saved.saved_at);
            }
        }
        Err(e) => warn!("Ignoring saved state: {:#}", e),
    }
}

fn print_expression(signal: &Arc<Signal>) {
    match signal.kind {
        SignalType::Speech => {
            if let Some(speech) = signal.payload_as::<Speech>() {
                println!("wybe: {}", speech.text);
            }
        }
        SignalType::DefaultModeThought => {
            if let Some(thought) = signal.payload_as::<InnerThought>() {
                println!("      ({}) {}", thought.category, thought.thought);
            }
        }
        _ => {}
    }
}

/// What `/status` can see from outside the tick loop.
struct StatusView {
    state: watch::Receiver<Arc<SelfState>>,
    bridge: BridgeHandle,
}

impl StatusView {
    fn render(&self) -> String {
        let state = self.state.borrow().clone();
        format!(
            "feeling {} | v {:.2} a {:.2} e {:.2} | {} | {} history entries",
            state.describe(),
            state.valence,
            state.arousal,
            state.energy,
            if self.bridge.is_in_flight() {
                "thinking"
            } else {
                "not thinking"
            },
            self.bridge.history_len()
        )
    }
}

/// Feed stdin lines in as `text-input`. Sends on `quit` when the user is done.
///
/// With a tick limit, end of input does not stop the run.
fn spawn_stdin(
    injector: Injector,
    status: StatusView,
    run_to_limit: bool,
    quit: oneshot::Sender<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let text = line.trim();
                    match text {
                        "" => continue,
                        "/quit" | "/exit" => break,
                        "/status" => {
                            println!("{}", status.render());
                            continue;
                        }
                        _ => {}
                    }
                    let input = TextInput {
                        text: text.to_string(),
                    };
                    let signal = Signal::new(SignalType::TextInput, ids::WORLD, encode(&input));
                    if !injector.inject(signal) {
                        return;
                    }
                }
                Ok(None) => {
                    if run_to_limit {
                        // Dropping `quit` without sending leaves shutdown to the tick limit.
                        return;
                    }
                    break;
                }
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
        let _ = quit.send(());
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing(&args);

    let config = WybeConfig::load_or_default(&args.config);
    info!("Initializing Wybe...");

    let mut store = SelfStateStore::new(config.dynamics.clone());
    if let Some(path) = &args.state {
        rehydrate(&mut store, path);
    }
    let state_rx = store.subscribe();

    let mut sched = Scheduler::new(store);
    for engine in standard_engines(config.autonomy.clone()) {
        sched.register_boxed(engine)?;
    }

    let channel = channel_from_config(&config.bridge, args.offline)?;
    let thought_bridge = ThoughtBridge::new(
        Arc::clone(&channel),
        sched.injector(),
        config.bridge.history_cap,
    );
    let bridge = thought_bridge.handle();
    sched.register(thought_bridge)?;
    let injector = sched.injector();
    sched.register(ReflectionBridge::new(channel, injector))?;

    sched.observe(
        "console",
        [SignalType::Speech, SignalType::DefaultModeThought],
        Box::new(print_expression),
    )?;

    let (quit_tx, quit_rx) = oneshot::channel();
    let status = StatusView {
        state: state_rx,
        bridge: bridge.clone(),
    };
    let reader = spawn_stdin(sched.injector(), status, args.ticks.is_some(), quit_tx);

    println!("Wybe is awake. Say something, or /status, /quit.");
    let shutdown = async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Ctrl-C received"),
            sent = quit_rx => match sent {
                Ok(()) => info!("Input closed"),
                Err(_) => std::future::pending::<()>().await,
            },
        }
    };
    sched
        .run(config.scheduler.tick_interval(), args.ticks, shutdown)
        .await;
    reader.abort();

    for report in sched.reports() {
        info!(
            "{}: {} processed / {} idle ticks. {}",
            report.id, report.processed_ticks, report.idle_ticks, report.debug
        );
    }
    if bridge.dropped() > 0 {
        info!("{} thought triggers were dropped while busy", bridge.dropped());
    }

    let final_state = *sched.state().get();
    info!("Going to sleep feeling {}", final_state.describe());
    if let Some(path) = &args.state {
        PersistedState::now(final_state)
            .save(path)
            .with_context(|| format!("Failed to save state to {}", path.display()))?;
        info!("State saved to {}", path.display());
    }
    Ok(())
}
