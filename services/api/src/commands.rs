use crate::infra::parse_as_of;
use chrono::{DateTime, Utc};
use clap::Args;
use crm_engagement::engagement::{
    evaluate_batch, ActivityStatus, EngagementFilter, PrincipalEngagement, ScoreBreakdown,
};
use crm_engagement::error::AppError;
use crm_engagement::report::{EngagementReport, DEFAULT_TOP_PRINCIPALS};
use crm_engagement::rollups::CsvRollupImporter;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Rollup export (principal_id, principal_name, total_interactions, ...)
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Evaluation time, RFC 3339 or YYYY-MM-DD (defaults to now)
    #[arg(long, value_parser = parse_as_of)]
    pub(crate) as_of: Option<DateTime<Utc>>,
    /// Only include these statuses (comma separated)
    #[arg(long, value_delimiter = ',', value_parser = parse_status)]
    pub(crate) status: Vec<ActivityStatus>,
    /// Minimum engagement score, inclusive
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub(crate) min_score: Option<u8>,
    /// Maximum number of principals to print
    #[arg(long)]
    pub(crate) limit: Option<usize>,
    /// Emit JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Rollup export (principal_id, principal_name, total_interactions, ...)
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Evaluation time, RFC 3339 or YYYY-MM-DD (defaults to now)
    #[arg(long, value_parser = parse_as_of)]
    pub(crate) as_of: Option<DateTime<Utc>>,
    /// Number of top principals to list
    #[arg(long, default_value_t = DEFAULT_TOP_PRINCIPALS)]
    pub(crate) top: usize,
    /// Emit JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

fn parse_status(raw: &str) -> Result<ActivityStatus, String> {
    raw.parse::<ActivityStatus>().map_err(|err| err.to_string())
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let ScoreArgs {
        csv,
        as_of,
        status,
        min_score,
        limit,
        json,
    } = args;

    let now = as_of.unwrap_or_else(Utc::now);
    let rollups = CsvRollupImporter::from_path(&csv)?;
    let filter = EngagementFilter {
        statuses: status,
        min_score,
        limit,
    };
    let ranked = filter.apply(evaluate_batch(&rollups, now));

    if json {
        print_json(&ranked)?;
    } else {
        println!("Principal engagement as of {}", now.to_rfc3339());
        render_rankings(&ranked);
    }
    Ok(())
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let ReportArgs {
        csv,
        as_of,
        top,
        json,
    } = args;

    let now = as_of.unwrap_or_else(Utc::now);
    let rollups = CsvRollupImporter::from_path(&csv)?;
    let report = EngagementReport::build(evaluate_batch(&rollups, now), now, top);

    if json {
        print_json(&report)?;
    } else {
        render_report(&report);
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    println!("{rendered}");
    Ok(())
}

pub(crate) fn render_rankings(ranked: &[PrincipalEngagement]) {
    if ranked.is_empty() {
        println!("No principals matched.");
        return;
    }

    for (position, evaluation) in ranked.iter().enumerate() {
        let last_seen = match evaluation.days_since_activity {
            Some(days) => format!("{days}d ago"),
            None => "never".to_string(),
        };
        println!(
            "{:>3}. {:<28} score {:>3} | {:<11} | last activity {}",
            position + 1,
            evaluation.principal_name,
            evaluation.score.value(),
            evaluation.status.label(),
            last_seen
        );
        println!("     {}", render_components(&evaluation.breakdown));
        for fault in &evaluation.integrity_faults {
            println!("     ! {}", fault.summary());
        }
    }
}

/// One-line `label score x weight = contribution` summary of a breakdown.
pub(crate) fn render_components(breakdown: &ScoreBreakdown) -> String {
    breakdown
        .components
        .iter()
        .map(|entry| {
            format!(
                "{} {} x{:.1} = {:.1}",
                entry.component.label(),
                entry.score,
                entry.weight,
                entry.contribution
            )
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

pub(crate) fn render_report(report: &EngagementReport) {
    println!("Principal engagement report");
    println!(
        "As of {} | {} principals | average score {:.1}",
        report.as_of.to_rfc3339(),
        report.principal_count,
        report.average_score
    );

    println!("\nActivity status");
    for entry in &report.status_breakdown {
        println!("- {}: {}", entry.status_label, entry.count);
    }

    println!("\nTop principals");
    if report.top_principals.is_empty() {
        println!("- none");
    }
    for view in &report.top_principals {
        println!(
            "- {} (score {}, {})",
            view.principal_name, view.score, view.status_label
        );
    }

    if report.needs_attention.is_empty() {
        println!("\nNeeds attention: none");
    } else {
        println!("\nNeeds attention");
        for view in &report.needs_attention {
            let detail = match view.days_since_activity {
                Some(days) => format!("quiet for {days} days"),
                None => "no recorded activity".to_string(),
            };
            println!("- {}: {}", view.principal_name, detail);
        }
    }

    if report.integrity_fault_count > 0 {
        println!(
            "\n{} rollup integrity fault(s) were clamped; check the upstream view.",
            report.integrity_fault_count
        );
    }
}
