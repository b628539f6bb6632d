//! Plain-text rendering of analysis reports.

use std::fmt::Write;

use chrono::DateTime;
use insight_core::AnalysisReport;

fn format_time(epoch_secs: i64) -> String {
    DateTime::from_timestamp(epoch_secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%MZ").to_string())
        .unwrap_or_else(|| epoch_secs.to_string())
}

/// Summarize a report, listing at most `limit` rows per section.
pub fn render_report(report: &AnalysisReport, limit: usize) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Conflicts: {}", report.conflicts.len());
    for conflict in report.conflicts.iter().take(limit) {
        let _ = writeln!(
            out,
            "  {:<20} {:<8} sev {:.2}  {:.1} nm / {:.0} ft at {}",
            conflict.pair_key,
            format!("{:?}", conflict.severity_band).to_uppercase(),
            conflict.severity,
            conflict.min_horizontal_nm,
            conflict.min_vertical_ft,
            format_time(conflict.time),
        );
        match report
            .proposals
            .get(&conflict.pair_key)
            .and_then(|candidates| candidates.first())
        {
            Some(best) => {
                let _ = writeln!(out, "    recommended: {} (score {:.2})", best.summary, best.score);
            }
            None => {
                let _ = writeln!(out, "    no verified resolution");
            }
        }
    }

    let _ = writeln!(out, "Hotspots: {}", report.hotspots.len());
    for cell in report.hotspots.iter().take(limit) {
        let _ = writeln!(
            out,
            "  cell ({}, {}) {:<12} peak {} unique {} score {:.1}",
            cell.lat_bucket,
            cell.lon_bucket,
            cell.altitude_band.label,
            cell.peak_density,
            cell.unique_flights,
            cell.score,
        );
    }

    if !report.issues.is_empty() {
        let _ = writeln!(out, "Issues: {}", report.issues.len());
        for issue in &report.issues {
            let _ = writeln!(out, "  - {issue}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_renders_counts() {
        let text = render_report(&AnalysisReport::default(), 5);
        assert_eq!(text, "Conflicts: 0\nHotspots: 0\n");
    }

    #[test]
    fn issues_are_listed() {
        let report = AnalysisReport {
            issues: vec!["BAD1: malformed route: too short".into()],
            ..AnalysisReport::default()
        };
        let text = render_report(&report, 5);
        assert!(text.contains("Issues: 1\n  - BAD1: malformed route"));
    }

    #[test]
    fn times_are_utc() {
        assert_eq!(format_time(1_736_150_400), "2025-01-06 08:00Z");
    }
}
