//! CLI command definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use pitfall_domain::parse_github_repository;
use std::path::PathBuf;

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Colored, human-readable report
    Human,
    /// Serialized report, for CI and other tools
    Json,
}

/// A planned tool given on the command line as `key[=github_url]` or as a
/// bare GitHub URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSpec {
    pub key: String,
    pub github_url: Option<String>,
}

fn is_bare_url(value: &str) -> bool {
    ["https://", "http://", "github.com/", "www.github.com/"]
        .iter()
        .any(|prefix| value.starts_with(prefix))
        || (!value.contains('=') && value.contains('/'))
}

/// Parse `key[=url]`, or a GitHub URL whose repository names the tool
pub fn parse_plan_spec(value: &str) -> Result<PlanSpec, String> {
    let value = value.trim();
    if is_bare_url(value) {
        let (_, repo) = parse_github_repository(value)
            .ok_or_else(|| format!("'{}' is not a GitHub repository URL", value))?;
        return Ok(PlanSpec {
            key: repo,
            github_url: Some(value.to_string()),
        });
    }

    let (key, url) = match value.split_once('=') {
        Some((key, url)) => (key.trim(), Some(url.trim())),
        None => (value, None),
    };
    if key.is_empty() {
        return Err(format!("'{}' has no tool name", value));
    }
    let github_url = match url {
        Some("") => return Err(format!("'{}' has an empty URL", value)),
        Some(url) => Some(url.to_string()),
        None => None,
    };
    Ok(PlanSpec {
        key: key.to_string(),
        github_url,
    })
}

/// CLI arguments for pitfall-detector
#[derive(Parser, Debug)]
#[command(name = "pitfall-detector")]
#[command(author, version, about = "Detect integration conflicts between AI tools before installing them")]
#[command(long_about = r#"
Pitfall Detector scans the current environment for AI tools, combines them
with the tools you plan to install, and reports conflicts: shared ports,
environment variables read with different meanings, incompatible
dependencies and overlapping frameworks.

Known conflicts come from a built-in pattern table. When an API key is
available, README excerpts of the involved tools are analyzed by an LLM and
merged with the static results.

Configuration files are loaded from (in priority order):
1. PITFALL_* environment variables
2. --config <path>     Explicit config file
3. ./pitfall.toml      Project-level config
4. ~/.config/pitfall-detector/config.toml   Global config

Example:
  pitfall-detector scan
  pitfall-detector analyze --plan gradio --plan crewai=https://github.com/crewAIInc/crewAI
  pitfall-detector analyze --static-only --format json --export report.json
  pitfall-detector plan add autogen
  pitfall-detector plan add https://github.com/microsoft/autogen
  pitfall-detector quick-analyze https://github.com/streamlit/streamlit https://github.com/gradio-app/gradio
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Detect AI tools in the current environment and remember them
    Scan(ScanArgs),

    /// Analyze detected and planned tools for conflicts
    Analyze(AnalyzeArgs),

    /// Analyze only the given tools, without scanning or touching saved state
    QuickAnalyze(QuickAnalyzeArgs),

    /// Manage the tools you plan to install
    Plan {
        #[command(subcommand)]
        action: PlanAction,
    },

    /// Inspect the conflict pattern table
    Patterns {
        #[command(subcommand)]
        action: PatternsAction,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Project directory to scan (default: current directory)
    #[arg(long, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Do not save the result for later analysis
    #[arg(long)]
    pub no_save: bool,

    /// Keep evidence from the previous saved scan alongside the new one
    #[arg(long)]
    pub merge: bool,
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Additional planned tool, as `name`, `name=github_url` or a GitHub URL (repeatable)
    #[arg(short, long = "plan", value_name = "TOOL[=URL]", value_parser = parse_plan_spec)]
    pub plan: Vec<PlanSpec>,

    /// Project directory to scan (default: current directory)
    #[arg(long, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    /// Reuse the last saved scan instead of scanning again
    #[arg(long)]
    pub no_scan: bool,

    /// Skip AI analysis and use the pattern table only
    #[arg(long)]
    pub static_only: bool,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Also write the JSON report to this file
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Hide conflicts below this confidence (0.0 - 1.0)
    #[arg(long, value_name = "SCORE")]
    pub min_confidence: Option<f64>,

    /// Replace the built-in pattern table
    #[arg(long, value_name = "PATH")]
    pub patterns: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct QuickAnalyzeArgs {
    /// Tools to analyze: GitHub URLs, `name` or `name=github_url` (at least two)
    #[arg(value_name = "TOOL", required = true, num_args = 2.., value_parser = parse_plan_spec)]
    pub tools: Vec<PlanSpec>,

    /// Skip AI analysis and use the pattern table only
    #[arg(long)]
    pub static_only: bool,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Also write the JSON report to this file
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Hide conflicts below this confidence (0.0 - 1.0)
    #[arg(long, value_name = "SCORE")]
    pub min_confidence: Option<f64>,

    /// Replace the built-in pattern table
    #[arg(long, value_name = "PATH")]
    pub patterns: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PlanAction {
    /// Add or update a planned tool
    Add {
        /// Tool name, as `name`, `name=github_url` or a GitHub URL
        #[arg(value_parser = parse_plan_spec)]
        tool: PlanSpec,

        /// Port this project will run the tool on
        #[arg(long)]
        port: Option<u16>,
    },
    /// Remove a planned tool
    Remove {
        /// Tool name
        tool: String,
    },
    /// List planned tools
    List,
    /// Remove all planned tools
    Clear,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PatternsAction {
    /// List tool profiles and conflict patterns
    Show {
        /// Pattern table file (default: built-in)
        #[arg(long, value_name = "PATH")]
        path: Option<PathBuf>,
    },
    /// Validate a pattern table file
    Validate {
        /// Pattern table file
        path: PathBuf,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print the merged configuration and where it was loaded from
    Show,
}
