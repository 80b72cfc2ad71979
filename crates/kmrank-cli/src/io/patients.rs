//! Patient survival records from a delimited text file.
//!
//! The file has a header row; the id, event and time columns are looked up
//! by name, any other column is ignored.

use std::{fs::File, io, path::Path};

use anyhow::{Context, bail};
use kmrank_analysis::patient::{Patient, PatientId};
use kmrank_stats::survival::EventKind;

use crate::util;

/// Header names of the columns a patient is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientColumns {
    pub id: String,
    pub event: String,
    pub time: String,
}

impl Default for PatientColumns {
    fn default() -> Self {
        Self {
            id: "patient_id".to_owned(),
            event: "event".to_owned(),
            time: "time".to_owned(),
        }
    }
}

pub fn read_patients_file(path: &Path, columns: &PatientColumns) -> anyhow::Result<Vec<Patient>> {
    let rows = read_file(path, columns, None)?;
    Ok(rows.into_iter().map(|(patient, _)| patient).collect())
}

/// Reads patients together with the value of an extra grouping column.
pub fn read_grouped_patients_file(
    path: &Path,
    columns: &PatientColumns,
    group_column: &str,
) -> anyhow::Result<Vec<(Patient, String)>> {
    let rows = read_file(path, columns, Some(group_column))?;
    Ok(rows
        .into_iter()
        .map(|(patient, group)| (patient, group.unwrap_or_default()))
        .collect())
}

fn read_file(
    path: &Path,
    columns: &PatientColumns,
    group_column: Option<&str>,
) -> anyhow::Result<Vec<(Patient, Option<String>)>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open patients file: {}", path.display()))?;
    let rows = read_rows(file, util::delimiter_for(path), columns, group_column)
        .with_context(|| format!("Failed to read patients file: {}", path.display()))?;
    tracing::info!(count = rows.len(), path = %path.display(), "loaded patients");
    Ok(rows)
}

fn read_rows<R>(
    reader: R,
    delimiter: u8,
    columns: &PatientColumns,
    group_column: Option<&str>,
) -> anyhow::Result<Vec<(Patient, Option<String>)>>
where
    R: io::Read,
{
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers().context("Failed to read header row")?;
    let column_index = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("Missing column '{name}'"))
    };
    let id_index = column_index(&columns.id)?;
    let event_index = column_index(&columns.event)?;
    let time_index = column_index(&columns.time)?;
    let group_index = group_column.map(column_index).transpose()?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("Malformed patient row")?;
        let line = record.position().map_or(0, csv::Position::line);
        let field = |index: usize| record.get(index).unwrap_or_default();

        let id = field(id_index)
            .parse::<PatientId>()
            .with_context(|| format!("Invalid patient id at line {line}"))?;
        let event_kind = parse_event(field(event_index))
            .with_context(|| format!("Invalid event of patient {id} at line {line}"))?;
        let event_time = parse_time(field(time_index))
            .with_context(|| format!("Invalid time of patient {id} at line {line}"))?;
        let group = group_index.map(|index| field(index).to_owned());

        let patient = Patient {
            id,
            event_time,
            event_kind,
        };
        rows.push((patient, group));
    }
    Ok(rows)
}

/// Parses an event flag: failure is `1`, `death`, `failure` or `true`.
pub fn parse_event(value: &str) -> anyhow::Result<EventKind> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "death" | "failure" | "true" => Ok(EventKind::Failure),
        "0" | "censored" | "false" => Ok(EventKind::Censored),
        _ => bail!("unrecognized event '{value}'"),
    }
}

/// Parses a follow-up time, flooring fractional values.
#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_time(value: &str) -> anyhow::Result<u32> {
    let time = value
        .parse::<f64>()
        .with_context(|| format!("not a number: '{value}'"))?
        .floor();
    if !(0.0..=f64::from(u32::MAX)).contains(&time) {
        bail!("time out of range: '{value}'");
    }
    Ok(time as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_patients(
        data: &str,
        delimiter: u8,
        columns: &PatientColumns,
    ) -> anyhow::Result<Vec<Patient>> {
        let rows = read_rows(data.as_bytes(), delimiter, columns, None)?;
        Ok(rows.into_iter().map(|(patient, _)| patient).collect())
    }

    #[test]
    fn test_read_patients_by_column_name() {
        let data = "\
name,time,patient_id,event
a,12.7,3,1
b, 4 ,7,censored
c,0,9,Death
";
        let patients = read_patients(data, b',', &PatientColumns::default()).unwrap();
        assert_eq!(
            patients,
            [
                Patient {
                    id: 3,
                    event_time: 12,
                    event_kind: EventKind::Failure,
                },
                Patient {
                    id: 7,
                    event_time: 4,
                    event_kind: EventKind::Censored,
                },
                Patient {
                    id: 9,
                    event_time: 0,
                    event_kind: EventKind::Failure,
                },
            ]
        );
    }

    #[test]
    fn test_read_patients_custom_columns_tab_separated() {
        let data = "Patientnummer\tEFS_event\treg_t_fu_months\n1\tfalse\t30.2\n";
        let columns = PatientColumns {
            id: "Patientnummer".to_owned(),
            event: "EFS_event".to_owned(),
            time: "reg_t_fu_months".to_owned(),
        };
        let patients = read_patients(data, b'\t', &columns).unwrap();
        assert_eq!(patients.len(), 1);
        assert_eq!(patients[0].event_time, 30);
        assert_eq!(patients[0].event_kind, EventKind::Censored);
    }

    #[test]
    fn test_missing_column() {
        let data = "patient_id,event\n1,1\n";
        let err = read_patients(data, b',', &PatientColumns::default()).unwrap_err();
        assert!(err.to_string().contains("time"));
    }

    #[test]
    fn test_invalid_values() {
        let columns = PatientColumns::default();
        let bad_event = "patient_id,event,time\n1,maybe,3\n";
        assert!(read_patients(bad_event, b',', &columns).is_err());
        let bad_time = "patient_id,event,time\n1,1,-2\n";
        assert!(read_patients(bad_time, b',', &columns).is_err());
        let bad_id = "patient_id,event,time\nx,1,2\n";
        assert!(read_patients(bad_id, b',', &columns).is_err());
    }

    #[test]
    fn test_read_group_column() {
        let data = "patient_id,event,time,arm\n1,1,3,A\n2,0,5,\n";
        let rows =
            read_rows(data.as_bytes(), b',', &PatientColumns::default(), Some("arm")).unwrap();
        assert_eq!(rows[0].1.as_deref(), Some("A"));
        assert_eq!(rows[1].1.as_deref(), Some(""));

        let err = read_rows(data.as_bytes(), b',', &PatientColumns::default(), Some("site"))
            .unwrap_err();
        assert!(err.to_string().contains("site"));
    }

    #[test]
    fn test_parse_event() {
        assert_eq!(parse_event("TRUE").unwrap(), EventKind::Failure);
        assert_eq!(parse_event("Failure").unwrap(), EventKind::Failure);
        assert_eq!(parse_event("0").unwrap(), EventKind::Censored);
        assert!(parse_event("").is_err());
    }

    #[test]
    fn test_parse_time_floors() {
        assert_eq!(parse_time("7.99").unwrap(), 7);
        assert_eq!(parse_time("0.4").unwrap(), 0);
        assert!(parse_time("NaN").is_err());
        assert!(parse_time("inf").is_err());
    }
}
