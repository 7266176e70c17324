use crate::commands::{render_components, render_rankings, render_report};
use crate::infra::{demo_rollups, parse_as_of, InMemoryRollupSource};
use chrono::{DateTime, Utc};
use clap::Args;
use crm_engagement::engagement::{ActivityRollup, EngagementFilter};
use crm_engagement::error::AppError;
use crm_engagement::service::EngagementService;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Evaluation time, RFC 3339 or YYYY-MM-DD (defaults to now)
    #[arg(long, value_parser = parse_as_of)]
    pub(crate) as_of: Option<DateTime<Utc>>,
    /// Number of top principals in the report section
    #[arg(long, default_value_t = 3)]
    pub(crate) top: usize,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { as_of, top } = args;
    let now = as_of.unwrap_or_else(Utc::now);

    let source = Arc::new(InMemoryRollupSource::with_rollups(demo_rollups(now)));
    let service = EngagementService::new(source);

    println!("Principal engagement demo");
    println!("Evaluated {}", now.to_rfc3339());

    println!("\nRanked principals");
    let ranked = service.principals(&EngagementFilter::default(), now)?;
    render_rankings(&ranked);

    let refresh = service.refresh()?;
    println!(
        "\nRollup refresh: {} principals at {}",
        refresh.principals,
        refresh.refreshed_at.to_rfc3339()
    );

    println!();
    let report = service.report(now, top)?;
    render_report(&report);

    println!("\nAd hoc scoring (10 interactions, 3 opportunities, 2 products, 5 days ago)");
    let adhoc = service.score_rollup(
        ActivityRollup::new(10, 3, 2, Some(now - chrono::Duration::days(5))),
        now,
    );
    println!("- {}", render_components(&adhoc.breakdown));
    println!("- score {} ({})", adhoc.score, adhoc.status.label());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_runs_end_to_end() {
        let args = DemoArgs {
            as_of: parse_as_of("2025-09-01").ok(),
            top: 2,
        };
        run_demo(args).expect("demo succeeds");
    }
}
