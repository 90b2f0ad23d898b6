use std::fs::{self, File};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use lamp::cli::{Cli, OutputFormat};
use lamp::config::LampConfig;
use lamp::csv_output::CsvOutput;
use lamp::json_output::JsonOutput;
use lamp::{pipeline, text_output};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize tracing: stderr always, plus a DEBUG log file with --log-file
fn init_tracing(debug: bool, log_file: Option<&Path>) -> Result<()> {
    let stderr_filter = if std::env::var_os("RUST_LOG").is_some() {
        EnvFilter::from_default_env()
    } else if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(stderr_filter);

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(EnvFilter::new("lamp=debug")),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")
}

fn load_config(args: &Cli) -> Result<LampConfig> {
    let base = match &args.config {
        Some(path) => LampConfig::from_file(path)?,
        None => LampConfig::default(),
    };
    let config = args.apply_to(base);
    if let Err(message) = config.validate() {
        anyhow::bail!("Invalid configuration: {}", message);
    }
    Ok(config)
}

fn run_single(args: &Cli, config: &LampConfig, names: &[String]) -> Result<String> {
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    let report = pipeline::single_combination(&args.item_file, &args.value_file, config, &names)
        .context("Single-combination test failed")?;
    Ok(match args.format {
        OutputFormat::Text => text_output::render_single(&report),
        OutputFormat::Json => JsonOutput::from_single(&report).to_json()?,
        OutputFormat::Csv => CsvOutput::from_single(&report).to_csv(),
    })
}

fn run_fastwy(args: &Cli, config: &LampConfig, permutations: usize) -> Result<String> {
    let report = pipeline::run_fastwy(&args.item_file, &args.value_file, config, permutations)
        .context("FastWY run failed")?;
    if let Some(path) = &args.min_p_dist {
        let distribution =
            text_output::render_min_p_distribution(&report.permutations, &report.summary.columns);
        fs::write(path, distribution)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(match args.format {
        OutputFormat::Text => text_output::render_fastwy(&report),
        OutputFormat::Json => JsonOutput::from_fastwy(&report).to_json()?,
        OutputFormat::Csv => CsvOutput::from_fastwy(&report).to_csv(),
    })
}

fn run_lamp(args: &Cli, config: &LampConfig) -> Result<String> {
    let report = pipeline::run_lamp(&args.item_file, &args.value_file, config)
        .context("LAMP run failed")?;
    Ok(match args.format {
        OutputFormat::Text => text_output::render_lamp(&report),
        OutputFormat::Json => JsonOutput::from_lamp(&report).to_json()?,
        OutputFormat::Csv => CsvOutput::from_lamp(&report).to_csv(),
    })
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug, args.log_file.as_deref())?;
    let config = load_config(&args)?;

    let output = match (&args.combination, config.permutations) {
        (Some(names), _) => run_single(&args, &config, names)?,
        (None, Some(permutations)) => run_fastwy(&args, &config, permutations)?,
        (None, None) => run_lamp(&args, &config)?,
    };
    print!("{}", output);
    if args.format == OutputFormat::Json {
        println!();
    }
    Ok(())
}
