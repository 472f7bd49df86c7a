//! Interactive viewport search over a feature file
//!
//! Each stdin line `MINX MINY MAXX MAXY query text` starts a search that
//! supersedes the previous one; `stop` cancels the current search. Hits are
//! printed as JSON lines, flagged `stale` once a newer search was started.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use viewport_search::{Engine, EngineConfig, FeatureHit, FeatureIndex, SearchHit, Viewport};

#[derive(Debug, Parser)]
#[command(name = "viewport-search", version, about = "Search named features inside a viewport")]
struct Cli {
    /// JSON array of features: [{"id", "name", "x", "y"}, ...]
    #[arg(long)]
    index: PathBuf,

    /// Engine configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run each search on its own named thread instead of Tokio's blocking pool
    #[arg(long)]
    threads: bool,
}

#[derive(Debug, PartialEq)]
enum Command {
    Empty,
    Stop,
    Search { viewport: Viewport, text: String },
}

fn parse_command(line: &str) -> Result<Command> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }
    if line.eq_ignore_ascii_case("stop") {
        return Ok(Command::Stop);
    }

    let mut rest = line;
    let mut coords = [0.0_f64; 4];
    for slot in &mut coords {
        let (head, tail) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        *slot = head
            .parse()
            .with_context(|| format!("invalid coordinate {head:?}"))?;
        rest = tail.trim_start();
    }

    if rest.is_empty() {
        bail!("missing query text after viewport");
    }

    let viewport = Viewport::new(coords[0], coords[1], coords[2], coords[3])?;
    Ok(Command::Search {
        viewport,
        text: rest.to_string(),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    }
    .apply_env();

    let index = FeatureIndex::from_json_file(&cli.index)
        .with_context(|| format!("loading index {}", cli.index.display()))?;
    log::info!("Loaded {} features from {}", index.len(), cli.index.display());

    let wait = config.shutdown_wait();
    let mut builder = Engine::builder(Arc::new(index)).config(config);
    if cli.threads {
        builder = builder.thread_runner();
    }
    let engine = Arc::new(builder.build()?);

    let (hits_tx, mut hits_rx) = mpsc::unbounded_channel::<SearchHit<FeatureHit>>();
    let printer = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            while let Some(hit) = hits_rx.recv().await {
                let line = serde_json::json!({
                    "request": hit.request,
                    "stale": !engine.is_latest(hit.request),
                    "hit": hit.hit,
                });
                println!("{line}");
            }
        })
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        match parse_command(&line) {
            Ok(Command::Empty) => {}
            Ok(Command::Stop) => engine.stop_everything(),
            Ok(Command::Search { viewport, text }) => {
                let hits_tx = hits_tx.clone();
                engine.search(text, viewport, move |hit| {
                    let _ = hits_tx.send(hit);
                });
            }
            Err(e) => eprintln!("error: {e:#}"),
        }
    }
    drop(hits_tx);

    // Input is over: let the last search finish, then stop anything left
    let idle = tokio::task::spawn_blocking({
        let engine = Arc::clone(&engine);
        move || engine.wait_idle(wait) || engine.shutdown()
    })
    .await
    .context("waiting for searches")?;

    eprintln!("{}", serde_json::to_string(&engine.stats())?);

    if !idle {
        log::error!("Searches still running after {wait:?}, exiting");
        std::process::exit(1);
    }

    printer.await.context("printing results")?;
    Ok(())
}
