use burrow::{trace_init, AccessStage, Command, Fixtures, Navigator, Settings, Signal, Trek};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Reads commands from standard input, one per line, and runs them against the tree described by
/// the fixtures named in `Burrow.toml`.  Type `quit` to leave.
#[tokio::main]
async fn main() -> Trek<()> {
    trace_init();
    let settings = Settings::load("Burrow")?;
    let loader = match settings.fixtures() {
        Some(path) => Fixtures::from_path(path)?,
        None => {
            tracing::warn!("No fixtures configured, every load will fail.");
            Fixtures::new()
        }
    };
    let navigator = Navigator::new(&settings, Arc::new(loader), AccessStage::new());
    let mut signals = navigator.subscribe();
    let handle = navigator.spawn();

    tokio::spawn(async move {
        while let Ok(signal) = signals.recv().await {
            match signal {
                Signal::Failed(message) => tracing::warn!("Failed: {message}"),
                signal => tracing::info!("{signal:?}"),
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" {
            break;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(snag) => {
                tracing::warn!("{snag}");
                continue;
            }
        };
        if let Err(snag) = handle.submit(command).await {
            tracing::warn!("{snag}");
        }
        let snapshot = handle.snapshot().await?;
        let children = snapshot
            .children()
            .iter()
            .map(|child| format!("{} ({})", child.label(), child.id()))
            .collect::<Vec<String>>();
        tracing::info!(
            "{} [{}]: {}",
            snapshot.current().label(),
            snapshot.phase(),
            children.join(", ")
        );
    }
    handle.shutdown().await
}
