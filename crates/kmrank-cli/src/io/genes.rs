//! Gene expression matrix reader.
//!
//! The first column holds the gene id. Every other header names a patient
//! and a measurement, `<patient id>_Before` or `<patient id>_After`:
//!
//! ```text
//! gene,1_Before,1_After,2_Before,2_After
//! ILMN_1343291,5.2,6.1,4.8,
//! ```
//!
//! Empty, unparsable and non-finite cells are missing values.

use std::{
    collections::{BTreeMap, HashMap},
    fs::File,
    io,
    path::Path,
    sync::Arc,
};

use anyhow::{Context, bail};
use kmrank_analysis::{
    expression::{ExpressionValue, GeneGroup},
    patient::PatientId,
};

use crate::util;

/// Column positions of one patient's measurements.
#[derive(Debug, Clone, Copy, Default)]
struct PatientColumns {
    before: Option<usize>,
    after: Option<usize>,
}

pub fn read_genes_file(path: &Path) -> anyhow::Result<Vec<GeneGroup>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open genes file: {}", path.display()))?;
    let genes = read_genes(file, util::delimiter_for(path))
        .with_context(|| format!("Failed to read genes file: {}", path.display()))?;
    tracing::info!(count = genes.len(), path = %path.display(), "loaded genes");
    Ok(genes)
}

pub fn read_genes<R>(reader: R, delimiter: u8) -> anyhow::Result<Vec<GeneGroup>>
where
    R: io::Read,
{
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers().context("Failed to read header row")?;
    let columns = patient_columns(headers)?;

    let mut interned = HashMap::<String, Arc<str>>::new();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("Malformed gene row")?;
        let Some(gene_id) = record.get(0).filter(|id| !id.is_empty()) else {
            continue;
        };
        let gene_id = Arc::clone(
            interned
                .entry(gene_id.to_owned())
                .or_insert_with(|| gene_id.into()),
        );

        let value = |index: Option<usize>| {
            index
                .and_then(|i| record.get(i))
                .and_then(|cell| cell.parse::<f64>().ok())
                .filter(|v| v.is_finite())
        };
        for (&patient_id, cols) in &columns {
            let (before, after) = (value(cols.before), value(cols.after));
            if before.is_none() && after.is_none() {
                continue;
            }
            rows.push(ExpressionValue {
                gene_id: Arc::clone(&gene_id),
                patient_id,
                before,
                after,
            });
        }
    }

    Ok(GeneGroup::group_rows(rows))
}

fn patient_columns(headers: &csv::StringRecord) -> anyhow::Result<BTreeMap<PatientId, PatientColumns>> {
    let mut columns = BTreeMap::<PatientId, PatientColumns>::new();
    for (index, header) in headers.iter().enumerate().skip(1) {
        let Some((patient, measure)) = header.split_once('_') else {
            bail!("Unexpected column '{header}' in the genes file");
        };
        let patient_id = patient
            .parse::<PatientId>()
            .with_context(|| format!("Invalid patient id in column '{header}'"))?;
        let entry = columns.entry(patient_id).or_default();
        let slot = match measure {
            "Before" => &mut entry.before,
            "After" => &mut entry.after,
            _ => bail!("Unexpected column '{header}' in the genes file"),
        };
        if slot.replace(index).is_some() {
            bail!("Duplicate column '{header}' in the genes file");
        }
    }
    Ok(columns)
}
