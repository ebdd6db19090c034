use snafu::{ResultExt, Whatever};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use varsh::chat::{ChatSession, Command, Shell};
use varsh::settings::SettingsStore;

#[tokio::main]
async fn main() -> Result<(), Whatever> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();

    let settings_store = SettingsStore::load();
    let settings = settings_store.settings();
    tracing::info!(
        "loaded settings from {:?}, mode {}",
        settings_store.config_path(),
        settings.default_mode
    );

    let responder = varsh_llm::create_responder(&settings.responder_id, settings.simulated_config())
        .whatever_context("failed to create responder")?;
    let session = ChatSession::new(settings.build_store(), responder);
    let mut shell = Shell::new(session, settings.recent_chat_limit);
    tracing::info!(responder = shell.session().responder_id(), "session ready");

    let mode = settings.default_mode;
    println!("{} mode. {}", mode.label(), mode.placeholder());
    println!("type /help for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let streaming = shell.session().has_active_streams();
        tokio::select! {
            biased;
            Some(event) = shell.session_mut().next_event(), if streaming => {
                if let Some(event) = event {
                    for line in shell.render_event(&event) {
                        println!("{line}");
                    }
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.whatever_context("failed to read stdin")? else {
                    break;
                };
                let command = match Command::parse(&line) {
                    Some(Ok(command)) => command,
                    Some(Err(error)) => {
                        println!("{error}");
                        continue;
                    }
                    None => continue,
                };
                if command == Command::Quit {
                    break;
                }
                match shell.handle(command) {
                    Ok(output) => {
                        for line in output {
                            println!("{line}");
                        }
                    }
                    Err(error) => {
                        tracing::warn!("command failed: {}", error);
                        println!("error: {error}");
                    }
                }
            }
        }
    }

    tracing::info!("shutting down");
    Ok(())
}
