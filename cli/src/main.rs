//! CLI entrypoint for pitfall-detector
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use pitfall_application::{
    AnalyzeError, AnalyzeInput, AnalyzeUseCase, DocumentationFetcher, LlmGateway, NoProgress,
    ProgressNotifier, ScanEnvironmentInput, ScanEnvironmentOutput, ScanEnvironmentUseCase,
    StoredTools, ToolStore,
};
use pitfall_domain::{DetectedTool, PatternTable, PlannedTool, Report, normalize_key};
use pitfall_infrastructure::{
    ConfigLoader, FileConfig, FileReportFormat, GitHubReadmeFetcher, HttpLlmGateway,
    JsonToolStore, PatternLoader, default_detectors,
};
use pitfall_presentation::{
    AnalyzeArgs, Cli, Command, ConfigAction, ConsoleFormatter, JsonFormatter, OutputFormat,
    PatternsAction, PlanAction, PlanSpec, ProgressReporter, QuickAnalyzeArgs, ScanArgs,
    SimpleProgress, set_color_enabled,
};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    info!("Starting pitfall-detector");

    // Load configuration
    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?
    };
    config.validate().context("Invalid configuration")?;

    match &cli.command {
        Command::Scan(args) => run_scan(&cli, &config, args).await,
        Command::Analyze(args) => run_analyze(&cli, &config, args).await,
        Command::QuickAnalyze(args) => run_quick_analyze(&cli, &config, args).await,
        Command::Plan { action } => run_plan(&config, action),
        Command::Patterns { action } => run_patterns(&config, action),
        Command::Config { action } => match action {
            ConfigAction::Show => {
                ConfigLoader::print_config_sources();
                println!();
                println!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
        },
    }
}

fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Cannot open log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(level))
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

fn open_store() -> Result<JsonToolStore> {
    let path = JsonToolStore::default_path()
        .context("No data directory available for the tool store")?;
    Ok(JsonToolStore::new(path))
}

fn load_patterns(config: &FileConfig, override_path: Option<&Path>) -> Result<Arc<PatternTable>> {
    let configured = config.patterns.path.as_deref().map(PathBuf::from);
    let path = override_path.or(configured.as_deref());
    let table = PatternLoader::load(path).context("Failed to load the pattern table")?;
    info!(
        "Pattern table {} ({} tools, {} patterns)",
        table.version(),
        table.tools().len(),
        table.patterns().len()
    );
    Ok(Arc::new(table))
}

/// Progress display: nothing when quiet, bars on a terminal, plain lines otherwise
fn progress_for(quiet: bool) -> Box<dyn ProgressNotifier> {
    if quiet {
        Box::new(NoProgress)
    } else if std::io::stderr().is_terminal() {
        Box::new(ProgressReporter::new())
    } else {
        Box::new(SimpleProgress)
    }
}

fn output_format(flag: Option<OutputFormat>, config: &FileConfig) -> OutputFormat {
    flag.unwrap_or(match config.report.format {
        FileReportFormat::Human => OutputFormat::Human,
        FileReportFormat::Json => OutputFormat::Json,
    })
}

/// Planned tool from a command-line spec, named after its profile when known
fn planned_from_spec(table: &PatternTable, spec: &PlanSpec, port: Option<u16>) -> PlannedTool {
    let mut tool = match table.resolve(&spec.key) {
        Some(profile) => {
            let mut tool = PlannedTool::new(profile.tool_key.clone())
                .with_display_name(table.display_name(&profile.tool_key).to_string());
            if let Some(url) = &profile.github_url {
                tool = tool.with_github_url(url.clone());
            }
            tool
        }
        None => PlannedTool::new(normalize_key(&spec.key)).with_display_name(spec.key.clone()),
    };
    if let Some(url) = &spec.github_url {
        tool = tool.with_github_url(url.clone());
    }
    if let Some(port) = port {
        tool = tool.with_port(port);
    }
    tool
}

async fn scan(
    config: &FileConfig,
    table: Arc<PatternTable>,
    project_dir: Option<&Path>,
    prior: Vec<DetectedTool>,
    progress: &dyn ProgressNotifier,
) -> ScanEnvironmentOutput {
    let mut context = config.scan_context();
    if let Some(dir) = project_dir {
        context.project_dir = dir.to_path_buf();
    }
    let detectors = default_detectors(table, &config.scan);
    let use_case = ScanEnvironmentUseCase::new(detectors).with_params(config.analysis_params());
    let input = ScanEnvironmentInput::new(context).with_prior(prior);
    use_case.execute_with_progress(input, progress).await
}

async fn run_scan(cli: &Cli, config: &FileConfig, args: &ScanArgs) -> Result<()> {
    let table = load_patterns(config, None)?;
    let store = open_store()?;
    let mut stored = load_stored(&store);

    let format = output_format(args.format, config);
    let progress = progress_for(cli.quiet || format == OutputFormat::Json);
    let prior = if args.merge {
        std::mem::take(&mut stored.detected)
    } else {
        Vec::new()
    };
    let output = scan(
        config,
        table,
        args.project_dir.as_deref(),
        prior,
        progress.as_ref(),
    )
    .await;

    if !args.no_save {
        persist_scan(&store, &mut stored, &output.tools)?;
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output.tools)?),
        OutputFormat::Human => {
            set_color_enabled(config.report.color);
            print!("{}", ConsoleFormatter::format_scan(&output.tools, &output.failures));
        }
    }
    Ok(())
}

/// Replace the remembered detection, keeping planned tools
fn persist_scan(store: &JsonToolStore, stored: &mut StoredTools, tools: &[DetectedTool]) -> Result<()> {
    stored.detected = tools.to_vec();
    store
        .save(stored)
        .with_context(|| format!("Failed to save scan to {}", store.path().display()))?;
    info!("Saved {} tools to {}", tools.len(), store.path().display());
    Ok(())
}

/// Stored state, or empty when the store cannot be read
fn load_stored(store: &JsonToolStore) -> StoredTools {
    match store.load() {
        Ok(stored) => stored,
        Err(e) => {
            warn!("Ignoring tool store {}: {}", store.path().display(), e);
            StoredTools::default()
        }
    }
}

fn confidence_threshold(flag: Option<f64>, config: &FileConfig) -> Result<f64> {
    let min_confidence = flag.unwrap_or(config.report.min_confidence);
    if !(0.0..=1.0).contains(&min_confidence) {
        bail!("--min-confidence must be between 0.0 and 1.0, got {}", min_confidence);
    }
    Ok(min_confidence)
}

/// Use case wired with whatever AI adapters the configuration allows.
/// Returns true alongside it when the analysis must stay static.
fn analyze_use_case(
    config: &FileConfig,
    table: Arc<PatternTable>,
    static_only: bool,
) -> (AnalyzeUseCase, bool) {
    let mut use_case = AnalyzeUseCase::new(table).with_params(config.analysis_params());
    if static_only || !config.llm.enabled {
        return (use_case, true);
    }

    match HttpLlmGateway::try_from_config(&config.llm) {
        Some(gateway) => {
            let gateway: Arc<dyn LlmGateway> = Arc::new(gateway);
            use_case = use_case.with_gateway(gateway);
        }
        None => info!("No model credentials, AI analysis will be skipped"),
    }
    if let Some(fetcher) = GitHubReadmeFetcher::try_from_config(&config.github) {
        let fetcher: Arc<dyn DocumentationFetcher> = Arc::new(fetcher);
        use_case = use_case.with_fetcher(fetcher);
    }
    (use_case, false)
}

fn emit_report(
    report: &Report,
    format: OutputFormat,
    export: Option<&Path>,
    min_confidence: f64,
) -> Result<()> {
    if let Some(path) = export {
        std::fs::write(path, JsonFormatter::format_report(report))
            .with_context(|| format!("Failed to export report to {}", path.display()))?;
        info!("Exported report to {}", path.display());
    }

    match format {
        OutputFormat::Json => println!("{}", JsonFormatter::format_report(report)),
        OutputFormat::Human => print!("{}", ConsoleFormatter::format_report(report, min_confidence)),
    }
    Ok(())
}

async fn run_analyze(cli: &Cli, config: &FileConfig, args: &AnalyzeArgs) -> Result<()> {
    let min_confidence = confidence_threshold(args.min_confidence, config)?;
    let table = load_patterns(config, args.patterns.as_deref())?;
    let store = open_store()?;
    let mut stored = load_stored(&store);

    let format = output_format(args.format, config);
    set_color_enabled(config.report.color && !args.no_color);
    let progress = progress_for(cli.quiet || format == OutputFormat::Json);

    // Planned tools: config, then the store, then the command line; later wins
    let mut planned = StoredTools::default();
    for tool in config.planned_tools() {
        planned.upsert_planned(tool);
    }
    for tool in &stored.planned {
        planned.upsert_planned(tool.clone());
    }
    for spec in &args.plan {
        planned.upsert_planned(planned_from_spec(&table, spec, None));
    }

    let (detected, degradations) = if args.no_scan {
        info!("Using {} tools from the last scan", stored.detected.len());
        (stored.detected.clone(), Vec::new())
    } else {
        let output = scan(
            config,
            Arc::clone(&table),
            args.project_dir.as_deref(),
            Vec::new(),
            progress.as_ref(),
        )
        .await;
        persist_scan(&store, &mut stored, &output.tools)?;
        let degradations = output.degradations();
        (output.tools, degradations)
    };

    let (use_case, static_only) = analyze_use_case(config, table, args.static_only);
    let mut input = AnalyzeInput::new(detected, planned.planned).with_degradations(degradations);
    if static_only {
        input = input.static_only();
    }

    let report = match use_case.execute_with_progress(input, progress.as_ref()).await {
        Ok(report) => report,
        Err(AnalyzeError::NoTools) => {
            bail!(
                "Nothing to analyze. Install or run some tools, or plan one with \
                 `pitfall-detector plan add <tool>` or `--plan <tool>`."
            )
        }
        Err(e) => return Err(e).context("Analysis failed"),
    };
    emit_report(&report, format, args.export.as_deref(), min_confidence)
}

/// Tools named on the command line; repeats of one tool collapse
fn quick_roster(table: &PatternTable, specs: &[PlanSpec]) -> Vec<PlannedTool> {
    let mut roster = StoredTools::default();
    for spec in specs {
        roster.upsert_planned(planned_from_spec(table, spec, None));
    }
    roster.planned
}

async fn run_quick_analyze(cli: &Cli, config: &FileConfig, args: &QuickAnalyzeArgs) -> Result<()> {
    let min_confidence = confidence_threshold(args.min_confidence, config)?;
    let table = load_patterns(config, args.patterns.as_deref())?;

    let planned = quick_roster(&table, &args.tools);
    if planned.len() < 2 {
        bail!("Need at least two different tools for a quick analysis");
    }
    info!("Quick analysis of {} tools", planned.len());

    let format = output_format(args.format, config);
    set_color_enabled(config.report.color && !args.no_color);
    let progress = progress_for(cli.quiet || format == OutputFormat::Json);

    let (use_case, static_only) = analyze_use_case(config, table, args.static_only);
    let mut input = AnalyzeInput::new(Vec::new(), planned);
    if static_only {
        input = input.static_only();
    }
    let report = use_case
        .execute_with_progress(input, progress.as_ref())
        .await
        .context("Quick analysis failed")?;
    emit_report(&report, format, args.export.as_deref(), min_confidence)
}

fn run_plan(config: &FileConfig, action: &PlanAction) -> Result<()> {
    let store = open_store()?;
    let mut stored = store
        .load()
        .with_context(|| format!("Failed to read {}", store.path().display()))?;
    set_color_enabled(config.report.color);

    match action {
        PlanAction::Add { tool, port } => {
            let table = load_patterns(config, None)?;
            let planned = planned_from_spec(&table, tool, *port);
            if table.profile(&planned.tool_key).is_none() {
                warn!(
                    "'{}' is not in the pattern table; only AI analysis can cover it",
                    planned.tool_key
                );
            }
            let name = planned.display_name.clone();
            let added = stored.upsert_planned(planned);
            save(&store, &stored)?;
            println!("{} {}", if added { "Planned" } else { "Updated" }, name);
        }
        PlanAction::Remove { tool } => {
            if !stored.remove_planned(&normalize_key(tool)) {
                bail!("'{}' is not planned", tool);
            }
            save(&store, &stored)?;
            println!("Removed {}", tool);
        }
        PlanAction::List => print!("{}", ConsoleFormatter::format_planned(&stored.planned)),
        PlanAction::Clear => {
            let count = stored.planned.len();
            stored.planned.clear();
            save(&store, &stored)?;
            println!("Removed {} planned tools", count);
        }
    }
    Ok(())
}

fn save(store: &JsonToolStore, stored: &StoredTools) -> Result<()> {
    store
        .save(stored)
        .with_context(|| format!("Failed to write {}", store.path().display()))
}

fn run_patterns(config: &FileConfig, action: &PatternsAction) -> Result<()> {
    match action {
        PatternsAction::Show { path } => {
            set_color_enabled(config.report.color);
            let table = load_patterns(config, path.as_deref())?;
            print!("{}", ConsoleFormatter::format_patterns(&table));
        }
        PatternsAction::Validate { path } => {
            let table = PatternLoader::load(Some(path))
                .with_context(|| format!("{} is not a valid pattern table", path.display()))?;
            println!(
                "{}: valid ({} tools, {} patterns, version {})",
                path.display(),
                table.tools().len(),
                table.patterns().len(),
                table.version()
            );
        }
    }
    Ok(())
}
