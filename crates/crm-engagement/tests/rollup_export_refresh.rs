use chrono::{Duration, TimeZone, Utc};
use crm_engagement::engagement::{ActivityStatus, EngagementFilter, PrincipalId};
use crm_engagement::rollups::{CsvRollupSource, RollupSource, RollupSourceError};
use crm_engagement::service::{EngagementService, EngagementServiceError};
use std::sync::Arc;
use tempfile::NamedTempFile;

const HEADER: &str =
    "principal_id,principal_name,total_interactions,total_opportunities,product_count,last_activity_at\n";

fn write_export(file: &NamedTempFile, rows: &str) {
    std::fs::write(file.path(), format!("{HEADER}{rows}")).expect("write export");
}

#[test]
fn csv_source_serves_rollups_and_picks_up_refreshes() {
    let export = NamedTempFile::new().expect("temp export");
    write_export(
        &export,
        "p-1,Harbor Seafood,10,3,2,2025-05-27 09:00:00+00\np-2,Quiet Co,,,,\n",
    );

    let source = Arc::new(CsvRollupSource::open(export.path()).expect("export loads"));
    assert_eq!(source.fetch_all().expect("fetch all").len(), 2);

    let service = EngagementService::new(source.clone());
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();

    let harbor = service
        .principal(&PrincipalId::new("p-1"), now)
        .expect("principal evaluates");
    assert_eq!(harbor.score.value(), 36);
    assert_eq!(harbor.status, ActivityStatus::Active);

    write_export(
        &export,
        "p-1,Harbor Seafood,10,3,2,2025-05-27 09:00:00+00\np-2,Quiet Co,4,0,0,2025-05-31\np-3,New Brand,1,0,0,\n",
    );
    let summary = service.refresh().expect("refresh succeeds");
    assert_eq!(summary.principals, 3);

    let active = service
        .principals(
            &EngagementFilter {
                statuses: vec![ActivityStatus::Active],
                ..EngagementFilter::default()
            },
            now,
        )
        .expect("list evaluates");
    let ids: Vec<&str> = active
        .iter()
        .map(|evaluation| evaluation.principal_id.as_str())
        .collect();
    assert_eq!(ids, vec!["p-1", "p-2"]);
}

#[test]
fn failed_refresh_keeps_previous_snapshot() {
    let export = NamedTempFile::new().expect("temp export");
    write_export(&export, "p-1,Harbor Seafood,1,0,0,2025-05-01\n");
    let source = Arc::new(CsvRollupSource::open(export.path()).expect("export loads"));
    let service = EngagementService::new(source.clone());

    write_export(&export, "p-1,Harbor Seafood,1,0,0,not-a-date\n");
    let error = service.refresh().expect_err("refresh fails");
    assert!(matches!(
        error,
        EngagementServiceError::Source(RollupSourceError::InvalidTimestamp { .. })
    ));

    let record = source
        .fetch(&PrincipalId::new("p-1"))
        .expect("fetch works")
        .expect("record kept");
    assert_eq!(
        record.rollup.last_activity_at,
        Some(Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap())
    );
}

#[test]
fn report_over_export_flags_dormant_principals() {
    let export = NamedTempFile::new().expect("temp export");
    write_export(
        &export,
        "p-1,Harbor Seafood,50,10,5,2025-06-01\n\
p-2,Old Mill,3,1,0,2025-01-02\n\
p-3,Quiet Co,0,0,0,\n",
    );
    let source = Arc::new(CsvRollupSource::open(export.path()).expect("export loads"));
    let service = EngagementService::new(source);
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap() + Duration::hours(6);

    let report = service.report(now, 1).expect("report builds");
    assert_eq!(report.principal_count, 3);
    assert_eq!(report.top_principals.len(), 1);
    assert_eq!(report.top_principals[0].principal_id.as_str(), "p-1");
    let dormant: Vec<&str> = report
        .needs_attention
        .iter()
        .map(|view| view.principal_id.as_str())
        .collect();
    assert_eq!(dormant, vec!["p-3", "p-2"]);
}
