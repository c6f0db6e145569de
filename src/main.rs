//! Application entry point — voxask.
//!
//! # Startup sequence
//!
//! 1. Load an optional `.env` file, then initialise logging.
//! 2. Read [`AppConfig`] from the environment (never fails; defaults apply).
//! 3. Select the transcription backend — degrades to a stub when the local
//!    model file is missing, so text questions still work.
//! 4. Build the retrieval-augmented answerer and warm its connection
//!    (non-fatal).
//! 5. Spawn the [`SessionRunner`] task with the terminal view attached.
//! 6. Read stdin lines and relay them as intents until EOF.
//!
//! # Terminal surface
//!
//! | Input | Intent |
//! |---|---|
//! | `/clear` | reset the conversation |
//! | `/auto on` / `/auto off` | toggle immediate audio processing |
//! | `/confirm` | process the recording parked while auto was off |
//! | path to an existing `.wav` file | submit it as a voice question |
//! | anything else | submit as a text question |

use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use voxask::{
    audio::QualityGate,
    config::AppConfig,
    rag::{Answerer, RagAnswerer},
    session::{new_shared_state, Intent, Message, RequestLifecycle, Role, SessionRunner},
    stt::select_backend,
    view::ConversationView,
};

// ---------------------------------------------------------------------------
// TerminalView
// ---------------------------------------------------------------------------

/// Line-oriented conversation rendering on stdout/stderr.
struct TerminalView;

impl ConversationView for TerminalView {
    fn render_message(&mut self, message: &Message) {
        match message.role {
            Role::User => println!("you ▸ {}", message.content),
            Role::Assistant => println!("assistant ▸ {}", message.content),
        }
    }

    fn render_typing(&mut self) {
        println!("assistant ▸ …");
    }

    fn render_error(&mut self, message: &str) {
        eprintln!("! {message}");
    }

    fn render_status(&mut self, note: &str) {
        println!("  · {note}");
    }

    fn conversation_cleared(&mut self) {
        println!("— conversation cleared —");
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment + logging
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("voxask starting up");

    // 2. Configuration
    let config = AppConfig::from_env();

    // 3. Transcription backend (degrades gracefully without a model file)
    let transcriber = select_backend(&config.stt);

    // 4. Answerer + connection warmup (best-effort)
    let answerer = RagAnswerer::from_config(&config);
    answerer.warmup();
    let answerer: Arc<dyn Answerer> = Arc::new(answerer);

    // 5. Session task
    let state = new_shared_state();
    let lifecycle = RequestLifecycle::new(
        QualityGate::from_config(&config.gate),
        transcriber,
        answerer,
    );
    let runner = SessionRunner::new(lifecycle, Arc::clone(&state), Box::new(TerminalView));

    let (intent_tx, intent_rx) = mpsc::channel::<Intent>(16);
    let runner_handle = tokio::spawn(runner.run(intent_rx));

    // 6. stdin command loop
    println!("Ask by typing a question, or give the path of a .wav recording.");
    println!("Commands: /clear  /auto on|off  /confirm   (Ctrl-D to quit)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let intent = match line {
            "/clear" => Intent::Clear,
            "/confirm" => Intent::ConfirmAudio,
            "/auto on" => Intent::SetAutoProcess(true),
            "/auto off" => Intent::SetAutoProcess(false),
            cmd if cmd.starts_with('/') => {
                eprintln!("! unknown command: {cmd} (try /clear, /auto on|off, /confirm)");
                continue;
            }
            path if path.ends_with(".wav") && Path::new(path).is_file() => {
                match tokio::fs::read(path).await {
                    Ok(blob) => Intent::SubmitAudio(blob),
                    Err(e) => {
                        eprintln!("! could not read {path}: {e}");
                        continue;
                    }
                }
            }
            text => Intent::SubmitText(text.to_string()),
        };

        if intent_tx.send(intent).await.is_err() {
            break;
        }
    }

    // Close the channel so the runner drains remaining work and exits.
    drop(intent_tx);
    runner_handle.await?;

    log::info!("voxask shut down cleanly");
    Ok(())
}
