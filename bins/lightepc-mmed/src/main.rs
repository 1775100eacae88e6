//! lightepc MME Daemon
//!
//! Thin transport shim around the S1AP subscriber registry: reads
//! JSON-lines signalling records on stdin, feeds them to the registry,
//! and writes every derived registration notification as one JSON line on
//! stdout. Rejected events are logged and the feed keeps going.

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use lightepc_s1ap::S1apDb;

mod feed;

/// lightepc MME - S1AP registration tracker
#[derive(Parser, Debug)]
#[command(name = "lightepc-mmed")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "S1AP subscriber registration tracker")]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    log::info!("lightepc MME v{}", env!("CARGO_PKG_VERSION"));

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || {
            log::info!("received shutdown signal");
            running.store(false, Ordering::SeqCst);
        })?;
    }

    let mut db = S1apDb::new();
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for line in stdin.lock().lines() {
        if !running.load(Ordering::SeqCst) {
            break;
        }

        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match feed::ingest(&mut db, &line) {
            Ok(Some(notification)) => {
                serde_json::to_writer(&mut out, &notification)?;
                out.write_all(b"\n")?;
                out.flush()?;
            }
            Ok(None) => {}
            Err(err) => log::error!("event rejected: {err:#}"),
        }
    }

    log::info!(
        "feed closed, {} subscriber(s) still registered",
        db.subscriber_count()
    );
    Ok(())
}
