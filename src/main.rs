use std::fs;
use std::str::FromStr;

use anyhow::{Context, Result};
use log::LevelFilter;

use gcode_post_processor::buffer::LayerBuffer;
use gcode_post_processor::config::Config;
use gcode_post_processor::notice::LogSink;
use gcode_post_processor::passes::{self, Pass, PassStatus};
use gcode_post_processor::settings::{self, SettingsFile};

fn main() -> Result<()> {
    let config = Config::from_args_and_env()?;

    let level = LevelFilter::from_str(&config.log_level)
        .with_context(|| format!("invalid log level '{}'", config.log_level))?;
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let settings = load_settings(&config)?;
    let passes = select_passes(&config)?;

    let text = fs::read_to_string(&config.input)
        .with_context(|| format!("failed to read {}", config.input.display()))?;
    let mut buffer = LayerBuffer::from_text(&text);
    log::info!(
        "loaded {} ({} blocks)",
        config.input.display(),
        buffer.len()
    );

    let mut sink = LogSink;
    let reports = passes::run_passes(&mut buffer, &passes, &settings, &mut sink);

    for report in &reports {
        match &report.status {
            PassStatus::Applied => log::info!("{}: applied", report.pass),
            PassStatus::AlreadyApplied => log::info!("{}: already applied", report.pass),
            PassStatus::Disabled => log::debug!("{}: disabled", report.pass),
            PassStatus::Skipped(reason) => log::info!("{}: skipped ({reason})", report.pass),
            PassStatus::Failed(error) => log::warn!("{}: failed ({error})", report.pass),
        }
    }

    // Failures leave the buffer in a known-good state, so the output is
    // always written.
    fs::write(&config.output, buffer.to_text())
        .with_context(|| format!("failed to write {}", config.output.display()))?;
    log::info!("wrote {}", config.output.display());

    Ok(())
}

/// First existing settings candidate, or the embedded default profile.
fn load_settings(config: &Config) -> Result<SettingsFile> {
    for candidate in &config.settings_candidates {
        if candidate.exists() {
            log::info!("using settings from {}", candidate.display());
            return settings::load(candidate)
                .with_context(|| format!("failed to load {}", candidate.display()));
        }
    }

    log::info!("no settings file found, using the embedded default profile");
    Ok(settings::embedded_default()?)
}

/// The built-in passes, restricted and ordered by the `--pass` filter.
fn select_passes(config: &Config) -> Result<Vec<Box<dyn Pass>>> {
    let mut available = passes::builtin_passes();
    if config.pass_filter.is_empty() {
        return Ok(available);
    }

    let mut selected = Vec::with_capacity(config.pass_filter.len());
    for name in &config.pass_filter {
        let index = available
            .iter()
            .position(|p| p.name().eq_ignore_ascii_case(name))
            .with_context(|| format!("unknown pass '{name}'"))?;
        selected.push(available.remove(index));
    }
    Ok(selected)
}
