use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use nmea_replay::{FileReplayDriver, ReplayListener, ReplayMessage, ReplayOptions};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Prints every replayed sentence to stdout
struct StdoutListener;

#[async_trait]
impl ReplayListener for StdoutListener {
    async fn notify(&self, msg: ReplayMessage) {
        println!("[{}] {}", msg.msg_id, msg.sentence);
    }
}

fn usage() -> ! {
    eprintln!(
        "usage: nmea-replay <log-file> [--speed N] [--loop] [--delay MS] [--options FILE.json]"
    );
    std::process::exit(2);
}

fn parse_args() -> Result<(PathBuf, ReplayOptions)> {
    let mut args = std::env::args().skip(1);
    let mut path: Option<PathBuf> = None;
    let mut options = ReplayOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--speed" => {
                let value = args.next().unwrap_or_else(|| usage());
                options.speed = value
                    .parse()
                    .with_context(|| format!("invalid speed: {value}"))?;
            }
            "--loop" => options.loop_playback = true,
            "--delay" => {
                let value = args.next().unwrap_or_else(|| usage());
                options.initial_delay_ms = value
                    .parse()
                    .with_context(|| format!("invalid delay: {value}"))?;
            }
            "--options" => {
                let value = args.next().unwrap_or_else(|| usage());
                let text = std::fs::read_to_string(&value)
                    .with_context(|| format!("cannot read options file {value}"))?;
                options = serde_json::from_str(&text)
                    .with_context(|| format!("cannot parse options file {value}"))?;
            }
            "--help" | "-h" => usage(),
            _ if path.is_none() => path = Some(PathBuf::from(arg)),
            _ => usage(),
        }
    }

    match path {
        Some(path) => Ok((path, options)),
        None => usage(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let (path, options) = parse_args()?;

    let mut driver = FileReplayDriver::new(&path, options)
        .with_context(|| format!("failed to load {}", path.display()))?;
    driver.set_listener(Arc::new(StdoutListener));

    if let Err(e) = driver.start_replay() {
        bail!("failed to start replay: {e}");
    }
    info!("replaying {} sentences, Ctrl-C to stop", driver.sentence_count());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                driver.stop_replay().await;
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(200)) => {
                if !driver.is_replaying() {
                    break;
                }
            }
        }
    }

    Ok(())
}
