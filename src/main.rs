/*!
 * Copyright (c) 2026 The plunger authors
 *
 * This source code is licensed under the MIT License,
 * which is located in the LICENSE file in the source tree's root directory.
 *
 * File: main.rs
 */

mod config;
mod confirm;
mod error;
mod extractor;
mod imap_session;
mod links;
mod pipeline;
mod recorder;
mod requester;
mod scanner;
mod traits;

use clap::Parser;
use config::AppConfig;
use confirm::{ConsolePrompt, DeclineAll};
use imap_session::ImapMailbox;
use log::{info, warn};
use pipeline::RunOptions;
use requester::UnsubscribeRequester;
use rustls::crypto;
use std::io::Write;
use std::path::PathBuf;
use traits::DecisionSource;

struct MultiWriter {
    writers: Vec<Box<dyn Write + Send + 'static>>,
}

impl Write for MultiWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        for w in &mut self.writers {
            let _ = w.write(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        for w in &mut self.writers {
            let _ = w.flush();
        }
        Ok(())
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long)]
    config: Option<String>,

    /// Where to write the discovered links (defaults to links.txt)
    #[arg(short, long)]
    output: Option<String>,

    /// Scan and save links without asking or visiting any of them
    #[arg(long)]
    dry_run: bool,
}

fn initialize_logger(config: &AppConfig) -> anyhow::Result<()> {
    let mut builder = env_logger::Builder::new();

    if let Some(level) = &config.log_level {
        builder.parse_filters(level);
    } else if let Ok(env_level) = std::env::var("RUST_LOG") {
        builder.parse_filters(&env_level);
    } else {
        builder.filter_level(log::LevelFilter::Info);
    }

    if let Some(log_file) = &config.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .map_err(|e| anyhow::anyhow!("Failed to open log file {}: {}", log_file, e))?;

        if config.quiet {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        } else {
            let multi_writer = MultiWriter {
                writers: vec![Box::new(file), Box::new(std::io::stderr())],
            };
            builder.target(env_logger::Target::Pipe(Box::new(multi_writer)));
        }
    } else if config.quiet {
        builder.target(env_logger::Target::Pipe(Box::new(std::io::sink())));
    }

    builder.init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = crypto::ring::default_provider().install_default();

    // EMAIL_ADDRESS and PASSWORD usually live in a .env next to the binary
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to read .env file: {}", e);
        }
    }

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::new_from_file(path),
        None => AppConfig::new(),
    }
    .unwrap_or_else(|e| {
        eprintln!("Failed to load config: {:?}", e);
        if let Ok(path) = std::env::current_dir() {
            eprintln!("Current search path: {:?}", path);
        }
        eprintln!("Please create a `config.toml` or set PLUNGER_... environment variables, or specify a config file with --config.");
        std::process::exit(1);
    });

    if let Some(output) = args.output {
        config.output_path = output;
    }

    initialize_logger(&config)?;

    let requester = UnsubscribeRequester::new(&config.requester)?;
    if config.requester.allow_private_targets {
        warn!("Private and loopback link targets are allowed");
    }

    let mut mailbox = ImapMailbox::connect(&config.imap).await?;

    let mut decisions: Box<dyn DecisionSource> = if args.dry_run {
        info!("Dry run: links will be saved but not visited");
        Box::new(DeclineAll)
    } else {
        Box::new(ConsolePrompt::stdio())
    };

    let options = RunOptions {
        search_query: config.imap.search_query.clone(),
        output_path: PathBuf::from(&config.output_path),
        show_progress: !config.quiet,
    };

    let summary = pipeline::run(&mut mailbox, decisions.as_mut(), &requester, &options).await?;

    info!(
        "{} messages matched, {} unique links: {} visited, {} rejected, {} failed, {} declined",
        summary.matched,
        summary.links.len(),
        summary.visited,
        summary.rejected,
        summary.failed,
        summary.declined
    );
    if summary.faulted > 0 {
        warn!("{} messages could not be read and were skipped", summary.faulted);
    }
    println!("Links clicked: {}", summary.visited);
    println!(
        "The unsubscribe links have been saved to {}",
        options.output_path.display()
    );

    Ok(())
}
