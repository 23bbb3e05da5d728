use anyhow::{Context, Result};
use clap::Parser;
use libsift::cli::{Cli, OutputFormat};
use libsift::config::SiftConfig;
use libsift::corpus::Corpus;
use libsift::decision_log::DecisionLog;
use libsift::pipeline::{self, PipelineOutput};
use libsift::report::{self, CollectionSummary, JsonReport};
use std::io::Write;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` enables everything down to TRACE
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<SiftConfig> {
    let mut config = match &cli.config {
        Some(path) => SiftConfig::from_toml(path)?,
        None => SiftConfig::default(),
    };
    cli.apply_overrides(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn print_outputs(cli: &Cli, outputs: &[PipelineOutput], corpus: &Corpus) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.format {
        OutputFormat::Json if cli.summary => {
            let summaries: Vec<CollectionSummary> = outputs
                .iter()
                .map(|o| CollectionSummary::compute(&o.clusters, corpus.artifacts()))
                .collect();
            match summaries.as_slice() {
                [single] => serde_json::to_writer_pretty(&mut out, single)?,
                all => serde_json::to_writer_pretty(&mut out, all)?,
            }
            writeln!(out)?;
        }
        OutputFormat::Json => {
            let mut reports = Vec::with_capacity(outputs.len());
            for output in outputs {
                reports.push(JsonReport::from_output(output, corpus)?);
            }
            match reports.as_slice() {
                [single] => writeln!(out, "{}", single.to_json()?)?,
                all => writeln!(out, "{}", serde_json::to_string_pretty(all)?)?,
            }
        }
        OutputFormat::Text => {
            for (i, output) in outputs.iter().enumerate() {
                if i > 0 {
                    writeln!(out)?;
                }
                if cli.summary {
                    report::write_summary(&mut out, output, corpus)?;
                } else {
                    report::write_text(&mut out, output, corpus)?;
                }
            }
        }
    }
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config = load_config(&cli)?;
    let mut corpus = Corpus::from_json_file(&cli.corpus)
        .with_context(|| format!("Failed to load corpus: {}", cli.corpus.display()))?;

    let mut log = if cli.decision_log.is_some() {
        DecisionLog::new()
    } else {
        DecisionLog::disabled()
    };

    let outputs = if cli.sweep {
        pipeline::run_sweep(&mut corpus, &config, &mut log)?
    } else {
        vec![pipeline::run(&mut corpus, &config, &mut log)?]
    };

    print_outputs(&cli, &outputs, &corpus)?;

    if let Some(path) = &cli.decision_log {
        log.save(path)?;
    }

    Ok(())
}
