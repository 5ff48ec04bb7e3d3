//! Configuration management for the post-processor binary.
//!
//! Handles:
//! - Command-line argument parsing
//! - Settings file discovery

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the G-code post-processor
#[derive(Debug, Parser)]
#[command(name = "gcode-post")]
#[command(about = "Applies post-processing passes to sliced G-code files")]
#[command(version)]
pub struct Args {
    /// G-code file to process
    pub input: PathBuf,

    /// Output file; the input is rewritten in place when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Settings file (TOML or JSON)
    #[arg(long, help = "Settings file with printer and pass sections")]
    pub settings: Option<PathBuf>,

    /// Run only the named passes, in pipeline order (repeatable)
    #[arg(long = "pass", help = "Pass name to run (repeat for several)")]
    pub passes: Vec<String>,

    /// Log level for the post-processor
    #[arg(
        long,
        default_value = "info",
        help = "Log level (trace, debug, info, warn, error)"
    )]
    pub log_level: String,
}

/// Combined configuration from all sources
#[derive(Debug, Clone)]
pub struct Config {
    /// Input G-code file
    pub input: PathBuf,
    /// Where the processed buffer is written
    pub output: PathBuf,
    /// Settings files to try, in priority order; the embedded default
    /// profile is the fallback when none of these exist
    pub settings_candidates: Vec<PathBuf>,
    /// Pass-name filter; empty means every built-in pass
    pub pass_filter: Vec<String>,
    /// Log level
    pub log_level: String,
}

impl Config {
    /// Create configuration from command-line arguments
    pub fn from_args_and_env() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    /// Create configuration from explicit arguments (useful for testing)
    pub fn from_args(args: Args) -> Result<Self> {
        let mut settings_candidates = Vec::new();

        // User-specified file first
        if let Some(explicit) = args.settings {
            settings_candidates.push(explicit);
        }

        // Then the default user config location
        if let Some(config_dir) = dirs::config_dir() {
            settings_candidates.push(config_dir.join("gcode-post").join("settings.toml"));
        }

        let output = args.output.unwrap_or_else(|| args.input.clone());

        Ok(Config {
            input: args.input,
            output,
            settings_candidates,
            pass_filter: args.passes,
            log_level: args.log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["gcode-post", "print.gcode"];
        argv.extend(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_output_defaults_to_input() {
        let config = Config::from_args(args(&[])).unwrap();
        assert_eq!(config.output, PathBuf::from("print.gcode"));
    }

    #[test]
    fn test_explicit_settings_file_has_priority() {
        let config = Config::from_args(args(&["--settings", "custom.toml"])).unwrap();
        assert_eq!(config.settings_candidates[0], PathBuf::from("custom.toml"));
    }

    #[test]
    fn test_pass_filter_collects_repeats() {
        let config =
            Config::from_args(args(&["--pass", "ZHop On Travel", "--pass", "Tool Change Macros"]))
                .unwrap();
        assert_eq!(config.pass_filter.len(), 2);
    }
}
