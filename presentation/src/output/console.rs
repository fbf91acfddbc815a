//! Console output formatter for reports and scans

use crate::output::formatter::ReportFormatter;
use colored::{ColoredString, Colorize};
use pitfall_application::DetectorFailure;
use pitfall_domain::{
    AnalysisMode, AnalyzedTool, Conflict, DetectedTool, PatternTable, PlannedTool, Report,
    Severity, ToolOrigin,
};

/// Enable or disable ANSI colors for everything this crate prints
pub fn set_color_enabled(enabled: bool) {
    if enabled {
        colored::control::unset_override();
    } else {
        colored::control::set_override(false);
    }
}

/// Formats reports for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format the complete report
    pub fn format_report(report: &Report, min_confidence: f64) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Pitfall Detector Report"));
        output.push('\n');
        output.push_str(&format!(
            "{} {}\n",
            "Generated:".cyan().bold(),
            report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        output.push_str(&format!(
            "{} {}\n",
            "Analysis:".cyan().bold(),
            Self::mode_label(report.analysis_mode)
        ));

        // Tools
        output.push_str(&Self::section_header(&format!(
            "Tools Analyzed ({})",
            report.tools_analyzed.len()
        )));
        for tool in &report.tools_analyzed {
            output.push_str(&Self::tool_line(tool));
        }

        // Conflicts
        let counts = report.severity_counts();
        let visible: Vec<&Conflict> = report.visible_conflicts(min_confidence).collect();
        output.push_str(&Self::section_header(&format!(
            "Conflicts ({} high, {} medium, {} low)",
            counts.high, counts.medium, counts.low
        )));
        if report.conflicts.is_empty() {
            output.push_str(&format!("\n{}\n", "No conflicts found.".green()));
        }
        for (index, conflict) in visible.iter().enumerate() {
            output.push_str(&Self::conflict_block(index + 1, conflict, report));
        }
        let hidden = report.conflicts.len() - visible.len();
        if hidden > 0 {
            output.push_str(&format!(
                "\n{}\n",
                format!(
                    "{} conflict(s) below confidence {:.2} hidden",
                    hidden, min_confidence
                )
                .dimmed()
            ));
        }

        // Installation order
        output.push_str(&Self::section_header("Recommended Installation Order"));
        for (index, key) in report.installation_order.iter().enumerate() {
            output.push_str(&format!("  {}. {}\n", index + 1, report.display_name(key)));
        }

        output.push_str(&Self::insights_sections(report));

        // Degradations
        if report.is_degraded() {
            output.push_str(&Self::section_header("Notes"));
            for degradation in &report.degradations {
                output.push_str(&format!("  {} {}\n", "!".yellow().bold(), degradation));
            }
        }

        output.push_str(&Self::footer());
        output
    }

    /// Format a scan result
    pub fn format_scan(tools: &[DetectedTool], failures: &[DetectorFailure]) -> String {
        let mut output = String::new();
        output.push_str(&Self::header("Environment Scan"));
        output.push('\n');

        if tools.is_empty() {
            output.push_str(&format!("\n{}\n", "No known AI tools detected.".yellow()));
        }
        for tool in tools {
            let mut line = format!(
                "\n{} {} {}",
                "*".cyan(),
                tool.display_name.bold(),
                format!("[{}]", tool.status).dimmed()
            );
            if let Some(version) = &tool.version {
                line.push_str(&format!(" v{}", version));
            }
            if let Some(port) = tool.port {
                line.push_str(&format!(" port {}", port));
            }
            line.push_str(&format!("  confidence {:.2}\n", tool.confidence));
            output.push_str(&line);
            for signal in &tool.signals {
                output.push_str(&format!(
                    "    {} {}\n",
                    format!("{}:", signal.source).dimmed(),
                    signal.evidence
                ));
            }
            if tool.has_version_conflict() {
                output.push_str(&format!(
                    "    {} versions disagree: {}\n",
                    "!".yellow().bold(),
                    tool.observed_versions.join(", ")
                ));
            }
        }

        if !failures.is_empty() {
            output.push_str(&Self::section_header("Skipped Detectors"));
            for failure in failures {
                output.push_str(&format!(
                    "  {} {}: {}\n",
                    "!".yellow().bold(),
                    failure.detector,
                    failure.error
                ));
            }
        }

        output.push_str(&Self::footer());
        output
    }

    /// Format the planned tool list
    pub fn format_planned(planned: &[PlannedTool]) -> String {
        if planned.is_empty() {
            return format!("{}\n", "No planned tools.".dimmed());
        }
        let mut output = format!("{}\n", "Planned tools:".cyan().bold());
        for tool in planned {
            let mut line = format!("  * {}", tool.tool_key.bold());
            if let Some(port) = tool.port {
                line.push_str(&format!(" (port {})", port));
            }
            if let Some(url) = &tool.github_url {
                line.push_str(&format!("  {}", url.dimmed()));
            }
            output.push_str(&line);
            output.push('\n');
        }
        output
    }

    /// Format the pattern table
    pub fn format_patterns(table: &PatternTable) -> String {
        let mut output = String::new();
        output.push_str(&Self::header(&format!("Pattern Table {}", table.version())));
        output.push('\n');

        output.push_str(&Self::section_header(&format!("Tools ({})", table.tools().len())));
        for profile in table.tools() {
            let mut line = format!("  {:<18} {}", profile.tool_key.bold(), profile.display_name);
            if !profile.default_ports.is_empty() {
                let ports: Vec<String> = profile.default_ports.iter().map(u16::to_string).collect();
                line.push_str(&format!("  ports {}", ports.join(",")));
            }
            if let Some(category) = &profile.category {
                line.push_str(&format!("  {}", category.dimmed()));
            }
            output.push_str(&line);
            output.push('\n');
        }

        output.push_str(&Self::section_header(&format!(
            "Patterns ({})",
            table.patterns().len()
        )));
        for pattern in table.patterns() {
            output.push_str(&format!(
                "\n{} {} {}\n    {}\n    {}\n",
                Self::severity_badge(pattern.severity),
                pattern.pattern_id.bold(),
                format!("({}: {})", pattern.kind, pattern.applies_to.join(", ")).dimmed(),
                pattern.rationale,
                pattern.mitigation_template.dimmed()
            ));
        }

        output.push_str(&Self::footer());
        output
    }

    fn tool_line(tool: &AnalyzedTool) -> String {
        let origin = match tool.origin {
            ToolOrigin::Detected => "detected",
            ToolOrigin::Planned => "planned",
            ToolOrigin::Both => "detected + planned",
        };
        let mut line = format!("  * {} {}", tool.display_name.bold(), format!("({})", origin).dimmed());
        if let Some(status) = tool.status {
            line.push_str(&format!(" {}", status));
        }
        if let Some(confidence) = tool.confidence {
            line.push_str(&format!(" confidence {:.2}", confidence));
        }
        if let Some(port) = tool.port {
            line.push_str(&format!(" port {}", port));
        }
        line.push('\n');
        line
    }

    fn conflict_block(index: usize, conflict: &Conflict, report: &Report) -> String {
        let tools: Vec<&str> = conflict
            .tools
            .iter()
            .map(|key| report.display_name(key))
            .collect();
        let sources: Vec<&str> = conflict.sources.iter().map(|s| s.as_str()).collect();

        let mut block = format!(
            "\n{}. {} {}\n",
            index,
            Self::severity_badge(conflict.severity),
            conflict.kind.title().bold()
        );
        block.push_str(&format!("   {} {}\n", "Tools:".cyan(), tools.join(", ")));
        block.push_str(&format!(
            "   {} {:.2} ({})\n",
            "Confidence:".cyan(),
            conflict.confidence,
            sources.join(" + ")
        ));
        block.push_str(&format!("   {} {}\n", "Issue:".cyan(), conflict.description));
        block.push_str(&format!("   {} {}\n", "Fix:".green(), conflict.mitigation));
        if let Some(id) = &conflict.pattern_id {
            block.push_str(&format!("   {}\n", format!("pattern {}", id).dimmed()));
        }
        block
    }

    /// Model commentary; nothing at all when the model added none
    fn insights_sections(report: &Report) -> String {
        let insights = &report.insights;
        let mut output = String::new();

        if !insights.compatible_combinations.is_empty() {
            output.push_str(&Self::section_header("Compatible Combinations"));
            for combination in &insights.compatible_combinations {
                let names: Vec<&str> = combination
                    .tools
                    .iter()
                    .map(|key| report.display_name(key))
                    .collect();
                output.push_str(&format!("  {} {}\n", "+".green().bold(), names.join(" + ")));
                if !combination.reason.is_empty() {
                    output.push_str(&format!("    {}\n", combination.reason));
                }
            }
        }

        if !insights.recommendations.is_empty() {
            output.push_str(&Self::section_header("Recommendations"));
            for (index, recommendation) in insights.recommendations.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", index + 1, recommendation));
            }
        }

        if let Some(assessment) = &insights.overall_assessment {
            output.push_str(&Self::section_header("Overall Assessment"));
            output.push_str(&format!("  {}\n", assessment));
        }
        output
    }

    fn severity_badge(severity: Severity) -> ColoredString {
        match severity {
            Severity::High => "[HIGH]".red().bold(),
            Severity::Medium => "[MEDIUM]".yellow().bold(),
            Severity::Low => "[LOW]".blue().bold(),
        }
    }

    fn mode_label(mode: AnalysisMode) -> ColoredString {
        match mode {
            AnalysisMode::Hybrid => "static rules + AI analysis".green(),
            AnalysisMode::StaticOnly => "static rules only".yellow(),
            AnalysisMode::StaticFallback => "static rules only (AI analysis failed)".yellow(),
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}

impl ReportFormatter for ConsoleFormatter {
    fn format(&self, report: &Report, min_confidence: f64) -> String {
        Self::format_report(report, min_confidence)
    }
}
