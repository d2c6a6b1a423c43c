//! Card counter.
//!
//! Recognizes the cards in a directory of pack-opening screenshots and writes a
//! JSON report.

mod batch;
mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use recog::Recognizer;

use crate::config::Config;

/// Recognize the cards in pack-opening screenshots
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Directory of screenshots
	dir: PathBuf,

	/// Config file (default: platform config dir, cardcounter.json)
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Write the report here instead of stdout
	#[arg(short, long)]
	output: Option<PathBuf>,

	/// Template directory, overriding the config
	#[arg(short, long)]
	templates: Option<PathBuf>,

	/// Card database JSON for display names, overriding the config
	#[arg(short, long)]
	names: Option<PathBuf>,

	/// Worker threads (0 = automatic), overriding the config
	#[arg(short, long)]
	workers: Option<usize>,

	/// Write the effective configuration back to the config file
	#[arg(long, default_value_t = false)]
	save_config: bool,
}

fn main() -> Result<()> {
	// Structured logging. Use `RUST_LOG=recog=debug` etc.; defaults to info.
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
		)
		.with_writer(std::io::stderr)
		.init();

	let args = Args::parse();
	let mut config = Config::load_or_default(args.config.as_deref());
	if let Some(templates) = args.templates {
		config.template_dir = templates;
	}
	if let Some(names) = args.names {
		config.names_file = Some(names);
	}
	if let Some(workers) = args.workers {
		config.max_workers = workers;
	}
	if args.save_config {
		let path = match &args.config {
			Some(path) => path.clone(),
			None => Config::path()?,
		};
		config.save_to(&path)?;
		tracing::info!(path = %path.display(), "saved config");
	}

	let files = batch::scan(&args.dir)?;
	if files.is_empty() {
		anyhow::bail!("No image files found in {}", args.dir.display());
	}

	let recognizer = Recognizer::try_new(&config.template_dir, config.matching.clone(), config.layout.clone())
		.with_context(|| format!("Load card templates from {}", config.template_dir.display()))?;
	let recognizer = match load_names(&config) {
		Some(names) => recognizer.with_names(names),
		None => recognizer,
	};

	let report = batch::run(&recognizer, &args.dir, &files, config.worker_count())?;
	let json = serde_json::to_string_pretty(&report).context("Serialize report")?;
	match args.output {
		Some(path) => std::fs::write(&path, json).with_context(|| format!("Write report {}", path.display()))?,
		None => println!("{json}"),
	}
	Ok(())
}

/// Display names, if a card database is configured and readable.
fn load_names(config: &Config) -> Option<data::CardNames> {
	let loaded = match (&config.names_file, &config.names_url) {
		(Some(path), _) => data::CardNames::from_json(path),
		(None, Some(url)) => data::CardNames::fetch(url),
		(None, None) => return None,
	};
	match loaded {
		Ok(names) => {
			tracing::info!(cards = names.len(), "loaded card names");
			Some(names)
		}
		Err(err) => {
			tracing::warn!(error = %format!("{err:#}"), "card names unavailable; reporting raw codes");
			None
		}
	}
}
