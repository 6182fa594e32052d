// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use coursecheck_model::{Finding, ReportSummary, Severity, REPORT_SCHEMA_VERSION};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Sorted, without duplicates.
    pub findings: Vec<Finding>,
    pub summary: ReportSummary,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    schema_version: u64,
    summary: &'a ReportSummary,
    findings: &'a [Finding],
    fingerprint: String,
}

pub fn aggregate(mut findings: Vec<Finding>) -> Report {
    findings.sort();
    findings.dedup();
    let summary = ReportSummary::from_findings(&findings);
    Report { findings, summary }
}

pub fn render_text_summary(report: &Report) -> String {
    format!(
        "summary: errors={} warnings={} infos={}",
        report.summary.errors, report.summary.warnings, report.summary.infos
    )
}

fn render_finding(finding: &Finding) -> String {
    match &finding.location {
        Some(location) => format!(
            "  {} {} ({location}): {}",
            finding.rule, finding.subject, finding.message
        ),
        None => format!("  {} {}: {}", finding.rule, finding.subject, finding.message),
    }
}

/// Findings grouped by severity, errors first, then the summary line.
pub fn render_text(report: &Report) -> String {
    let mut lines = Vec::new();
    for (severity, heading) in [
        (Severity::Error, "errors"),
        (Severity::Warning, "warnings"),
        (Severity::Info, "infos"),
    ] {
        let rows = report
            .findings
            .iter()
            .filter(|finding| finding.severity == severity)
            .map(render_finding)
            .collect::<Vec<_>>();
        if rows.is_empty() {
            continue;
        }
        lines.push(format!("{heading} ({}):", rows.len()));
        lines.extend(rows);
    }
    lines.push(render_text_summary(report));
    lines.join("\n")
}

/// Hex SHA-256 of the text rendering; equal corpora give equal fingerprints.
pub fn fingerprint(report: &Report) -> String {
    let digest = Sha256::digest(render_text(report).as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

pub fn render_json(report: &Report) -> Result<String, String> {
    serde_json::to_string_pretty(&JsonReport {
        schema_version: REPORT_SCHEMA_VERSION,
        summary: &report.summary,
        findings: &report.findings,
        fingerprint: fingerprint(report),
    })
    .map_err(|err| err.to_string())
}

pub fn exit_code_for_report(report: &Report) -> i32 {
    if report.summary.errors > 0 {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursecheck_model::{Location, RuleId};

    fn sample() -> Report {
        aggregate(vec![
            Finding::info(
                RuleId::UnreferencedAsset,
                "book/_static/workflows/09_x.json",
                None,
                "workflow is not referenced by any document",
            ),
            Finding::error(
                RuleId::MissingReference,
                "book/01_a.ipynb",
                Some(Location::cell(2, 4)),
                "workflow asset `missing.json` does not exist",
            ),
            Finding::error(
                RuleId::MissingReference,
                "book/01_a.ipynb",
                Some(Location::cell(2, 4)),
                "workflow asset `missing.json` does not exist",
            ),
        ])
    }

    #[test]
    fn aggregate_sorts_and_dedupes() {
        let report = sample();
        assert_eq!(report.findings.len(), 2);
        assert_eq!(report.findings[0].severity, Severity::Error);
        assert_eq!(report.summary.errors, 1);
        assert_eq!(report.summary.warnings, 0);
        assert_eq!(report.summary.infos, 1);
        assert_eq!(exit_code_for_report(&report), 1);
        assert_eq!(exit_code_for_report(&aggregate(Vec::new())), 0);
    }

    #[test]
    fn text_rendering_is_golden() {
        let expected = "errors (1):\n  MissingReference book/01_a.ipynb (cell 2, line 4): workflow asset `missing.json` does not exist\ninfos (1):\n  UnreferencedAsset book/_static/workflows/09_x.json: workflow is not referenced by any document\nsummary: errors=1 warnings=0 infos=1";
        assert_eq!(render_text(&sample()), expected);
        assert_eq!(render_text(&aggregate(Vec::new())), "summary: errors=0 warnings=0 infos=0");
    }

    #[test]
    fn json_rendering_carries_summary_and_fingerprint() {
        let report = sample();
        let json: serde_json::Value =
            serde_json::from_str(&render_json(&report).expect("json")).expect("parse");
        assert_eq!(json["schema_version"], 1);
        assert_eq!(json["summary"]["errors"], 1);
        assert_eq!(json["findings"][0]["rule"], "MissingReference");
        let fp = json["fingerprint"].as_str().unwrap_or_default();
        assert_eq!(fp.len(), 64);
        assert_eq!(fp, fingerprint(&sample()));
    }
}
