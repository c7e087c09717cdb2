use anyhow::Result;
use onec_map::config::load_settings;
use onec_map::pipeline::Pipeline;
use onec_map::storage::DictionaryStore;
use onec_map::watch::DictionaryWatcher;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays a clean event stream
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("onec_map=info")),
        )
        .with_target(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting onec-map");

    let settings = load_settings()?;
    tracing::info!(
        storage = ?settings.storage.base_path,
        watched = settings.watch.sources.len(),
        enrich_stdin = settings.enrich.stdin,
        "Configuration loaded"
    );

    let store = DictionaryStore::from_config(&settings.storage);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let watcher = if settings.watch.sources.is_empty() {
        tracing::info!("No dictionary files configured for watching");
        None
    } else {
        let watcher = DictionaryWatcher::new(
            store.clone(),
            settings.watch.sources.clone(),
            settings.watch.poll_interval(),
        );
        Some(tokio::spawn(watcher.run(shutdown_rx.clone())))
    };

    if settings.enrich.stdin {
        let pipeline = Pipeline::new(store);
        tokio::select! {
            result = enrich_stdin(&pipeline) => {
                tracing::info!("Input stream closed");
                result?;
            }
            signal_name = setup_shutdown_handler() => {
                tracing::info!(signal = %signal_name, "Received shutdown signal");
            }
        }
    } else if watcher.is_some() {
        let signal_name = setup_shutdown_handler().await;
        tracing::info!(signal = %signal_name, "Received shutdown signal");
    } else {
        tracing::warn!("Nothing to do: set ONEC_MAP_WATCH or ONEC_MAP_ENRICH_STDIN");
    }

    let _ = shutdown_tx.send(true);
    if let Some(handle) = watcher {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "Dictionary watcher task failed");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Enrich one JSON event per line from stdin, writing one line per event to stdout
async fn enrich_stdin(pipeline: &Pipeline) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut processed: u64 = 0;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let output = match serde_json::from_str::<Value>(&line) {
            Ok(Value::Object(event)) => {
                let event = pipeline.on_event(event).await;
                serde_json::to_string(&event)?
            }
            Ok(_) => {
                tracing::warn!("Input line is not a JSON object, passing through");
                line
            }
            Err(e) => {
                tracing::warn!(error = %e, "Input line is not valid JSON, passing through");
                line
            }
        };

        stdout.write_all(output.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
        processed += 1;
    }

    tracing::info!(events = processed, "Enrichment finished");
    Ok(())
}

/// Setup signal handlers for graceful shutdown
/// Handles SIGINT (Ctrl+C), SIGTERM, and SIGQUIT on Unix systems
async fn setup_shutdown_handler() -> String {
    #[cfg(unix)]
    {
        use signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt()).expect("Failed to setup SIGINT handler");
        let mut sigterm = signal(SignalKind::terminate()).expect("Failed to setup SIGTERM handler");
        let mut sigquit = signal(SignalKind::quit()).expect("Failed to setup SIGQUIT handler");

        tokio::select! {
            _ = sigint.recv() => {
                tracing::debug!("Caught SIGINT signal");
                "SIGINT (Ctrl+C)".to_string()
            }
            _ = sigterm.recv() => {
                tracing::debug!("Caught SIGTERM signal");
                "SIGTERM".to_string()
            }
            _ = sigquit.recv() => {
                tracing::debug!("Caught SIGQUIT signal");
                "SIGQUIT".to_string()
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
        tracing::debug!("Caught Ctrl+C signal");
        "Ctrl+C".to_string()
    }
}
