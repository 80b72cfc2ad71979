//! Survival comparison of two patient groups
//!
//! The groups are defined by a two-valued column of the patient file, e.g. a
//! treatment arm. Prints both Kaplan-Meier curves and the log-rank test.

use std::{collections::BTreeMap, path::PathBuf};

use anyhow::bail;
use clap::{Args, ValueEnum};
use kmrank_analysis::{patient::Patient, result::CohortSummary};
use kmrank_stats::log_rank::LogRankTest;
use serde::Serialize;

use crate::{
    command::rank::PatientColumnArgs,
    io::patients::{self, PatientColumns},
    util::Output,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Args)]
pub(crate) struct CompareArg {
    /// Patient survival file (CSV, or TSV by extension)
    #[arg(long)]
    pub patients: PathBuf,

    /// Column whose two distinct values define the groups
    #[arg(long)]
    pub group_column: String,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,

    /// Output file for the JSON report (defaults to stdout)
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[clap(flatten)]
    pub columns: PatientColumnArgs,
}

#[derive(Debug, Serialize)]
struct GroupReport {
    label: String,
    #[serde(flatten)]
    summary: CohortSummary,
}

#[derive(Debug, Serialize)]
struct CompareReport {
    group_column: String,
    groups: [GroupReport; 2],
    log_rank: LogRankTest,
}

pub(crate) fn run(arg: &CompareArg) -> anyhow::Result<()> {
    let columns = PatientColumns::from(&arg.columns);
    let rows = patients::read_grouped_patients_file(&arg.patients, &columns, &arg.group_column)?;
    let report = compare_groups(&arg.group_column, &rows)?;

    match arg.format {
        OutputFormat::Text => print_report(&report),
        OutputFormat::Json => Output::save_json(&report, arg.output.clone())?,
    }
    Ok(())
}

fn compare_groups(group_column: &str, rows: &[(Patient, String)]) -> anyhow::Result<CompareReport> {
    let mut groups = BTreeMap::<&str, Vec<&Patient>>::new();
    for (patient, group) in rows {
        if group.is_empty() {
            tracing::debug!(patient = patient.id, "no group value, ignoring patient");
            continue;
        }
        groups.entry(group.as_str()).or_default().push(patient);
    }

    let labels = groups.keys().copied().collect::<Vec<_>>();
    let reports = groups
        .into_iter()
        .map(|(label, patients)| GroupReport {
            label: label.to_owned(),
            summary: CohortSummary::from_patients(&patients),
        })
        .collect::<Vec<_>>();
    let Ok([a, b]) = <[GroupReport; 2]>::try_from(reports) else {
        bail!(
            "Column '{group_column}' must have exactly two distinct values, found {}: {labels:?}",
            labels.len()
        );
    };
    let log_rank = LogRankTest::compute(&a.summary.curve, &b.summary.curve);

    Ok(CompareReport {
        group_column: group_column.to_owned(),
        groups: [a, b],
        log_rank,
    })
}

fn print_report(report: &CompareReport) {
    for group in &report.groups {
        let summary = &group.summary;
        println!(
            "{} = {} ({} patients, {} failures)",
            report.group_column, group.label, summary.size, summary.failures
        );
        println!("  {:>6} {:>8} {:>8} {:>10}", "time", "at_risk", "failing", "survival");
        for point in summary.curve.points() {
            println!(
                "  {:>6} {:>8} {:>8} {:>10.4}",
                point.time, point.at_risk, point.failing, point.survival_probability
            );
        }
        match summary.median_survival {
            Some(median) => println!("  median survival: {median:.2}"),
            None => println!("  median survival: not reached"),
        }
        println!();
    }

    let test = &report.log_rank;
    println!(
        "observed {} / {}, expected {:.3} / {:.3}",
        test.observed_a(),
        test.observed_b(),
        test.expected_a(),
        test.expected_b()
    );
    println!(
        "chi-square = {:.4}, p = {:.4e}",
        test.statistic(),
        test.p_value()
    );
}

#[cfg(test)]
mod tests {
    use kmrank_stats::survival::EventKind;

    use super::*;

    fn row(id: u32, event_time: u32, failure: bool, group: &str) -> (Patient, String) {
        let event_kind = if failure {
            EventKind::Failure
        } else {
            EventKind::Censored
        };
        let patient = Patient {
            id,
            event_time,
            event_kind,
        };
        (patient, group.to_owned())
    }

    #[test]
    fn test_compare_two_groups() {
        let rows = [
            row(1, 5, true, "treated"),
            row(2, 9, false, "control"),
            row(3, 2, true, "control"),
            row(4, 7, true, "treated"),
            row(5, 4, true, ""),
            row(6, 3, true, "control"),
        ];
        let report = compare_groups("arm", &rows).unwrap();
        assert_eq!(report.groups[0].label, "control");
        assert_eq!(report.groups[0].summary.size, 3);
        assert_eq!(report.groups[1].label, "treated");
        assert_eq!(report.groups[1].summary.size, 2);
        assert_eq!(report.log_rank.observed_a(), 2);
        assert_eq!(report.log_rank.observed_b(), 2);
        assert!((0.0..=1.0).contains(&report.log_rank.p_value()));
    }

    #[test]
    fn test_compare_requires_two_groups() {
        let one = [row(1, 5, true, "x"), row(2, 6, false, "x")];
        assert!(compare_groups("arm", &one).is_err());
        let three = [row(1, 5, true, "x"), row(2, 6, false, "y"), row(3, 1, true, "z")];
        assert!(compare_groups("arm", &three).is_err());
    }
}
