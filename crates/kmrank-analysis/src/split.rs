//! Strategies partitioning the patients of a gene into two cohorts.
//!
//! A [`CohortSplitter`] looks at the expression rows of one gene and returns
//! a "low" and a "high" expression cohort. The only strategy provided is
//! [`TopNPercentSplit`], which takes the bottom and top `percent` of patients
//! ranked by an [`ExpressionMeasure`].

use std::{collections::HashSet, sync::Arc};

use crate::{
    expression::{ExpressionValue, GeneGroup},
    patient::{Patient, PatientId, PatientLookup},
};

/// Patients of one cohort, borrowed from the [`PatientLookup`].
pub type Cohort<'a> = Vec<&'a Patient>;

/// The two disjoint cohorts produced for a gene.
#[derive(Debug, Clone, Default)]
pub struct CohortPair<'a> {
    pub low: Cohort<'a>,
    pub high: Cohort<'a>,
}

impl CohortPair<'_> {
    /// Size of the smaller cohort.
    #[must_use]
    pub fn group_size(&self) -> usize {
        self.low.len().min(self.high.len())
    }
}

/// Scalar of an expression row used to rank patients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ExpressionMeasure {
    #[display("before")]
    Before,
    #[display("after")]
    After,
    #[display("diff")]
    AbsoluteDifference,
}

impl ExpressionMeasure {
    #[must_use]
    pub fn select(self, row: &ExpressionValue) -> Option<f64> {
        match self {
            Self::Before => row.before,
            Self::After => row.after,
            Self::AbsoluteDifference => row.absolute_difference(),
        }
    }
}

/// Invalid strategy configuration, detected before any gene is processed.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum SplitConfigError {
    #[display("percent must be within 1..=50, got {percent}")]
    PercentOutOfRange { percent: u32 },
    #[display("patient lookup is empty")]
    EmptyPatientLookup,
}

/// Malformed expression data of a single gene.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum GeneError {
    #[display("row of gene '{found}' found in the rows of gene '{expected}'")]
    MixedGeneIds { expected: Arc<str>, found: Arc<str> },
    #[display("patient {patient_id} has more than one expression row")]
    DuplicatePatient { patient_id: PatientId },
    #[display("non-finite {measure} expression for patient {patient_id}")]
    NonFiniteValue {
        patient_id: PatientId,
        measure: ExpressionMeasure,
    },
}

/// Partitions the patients of a gene into two cohorts.
pub trait CohortSplitter: Sync {
    /// Stable identifier of the configured strategy, e.g. `top-20-before`.
    fn id(&self) -> String;

    fn split(&self, gene: &GeneGroup) -> Result<CohortPair<'_>, GeneError>;
}

/// Splits off the lowest and highest `percent` of patients.
///
/// Rows with a missing measure or an unknown patient are ignored. The rest
/// are stably sorted by the measure; with `n` rows and
/// `k = floor(n * percent / 100)`, the first `k` rows form the low cohort and
/// the last `k` rows the high cohort. Since `percent <= 50` the two never
/// overlap.
#[derive(Debug, Clone)]
pub struct TopNPercentSplit<'a> {
    percent: u32,
    measure: ExpressionMeasure,
    patients: &'a PatientLookup,
}

impl<'a> TopNPercentSplit<'a> {
    pub const MAX_PERCENT: u32 = 50;

    /// Creates the strategy, validating its configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use kmrank_analysis::{
    ///     patient::{Patient, PatientLookup},
    ///     split::{CohortSplitter as _, ExpressionMeasure, SplitConfigError, TopNPercentSplit},
    /// };
    /// use kmrank_stats::survival::EventKind;
    ///
    /// let patients = PatientLookup::new([Patient {
    ///     id: 1,
    ///     event_time: 5,
    ///     event_kind: EventKind::Failure,
    /// }])
    /// .unwrap();
    ///
    /// let split = TopNPercentSplit::new(20, ExpressionMeasure::Before, &patients).unwrap();
    /// assert_eq!(split.id(), "top-20-before");
    ///
    /// let err = TopNPercentSplit::new(51, ExpressionMeasure::Before, &patients).unwrap_err();
    /// assert!(matches!(err, SplitConfigError::PercentOutOfRange { percent: 51 }));
    /// ```
    pub fn new(
        percent: u32,
        measure: ExpressionMeasure,
        patients: &'a PatientLookup,
    ) -> Result<Self, SplitConfigError> {
        if percent == 0 || percent > Self::MAX_PERCENT {
            return Err(SplitConfigError::PercentOutOfRange { percent });
        }
        if patients.is_empty() {
            return Err(SplitConfigError::EmptyPatientLookup);
        }
        Ok(Self {
            percent,
            measure,
            patients,
        })
    }

    #[must_use]
    pub fn percent(&self) -> u32 {
        self.percent
    }

    #[must_use]
    pub fn measure(&self) -> ExpressionMeasure {
        self.measure
    }

    /// Eligible rows of the gene, paired with their patient.
    fn eligible_rows(&self, gene: &GeneGroup) -> Result<Vec<(f64, &'a Patient)>, GeneError> {
        let mut seen = HashSet::new();
        let mut eligible = Vec::with_capacity(gene.rows.len());

        for row in &gene.rows {
            if row.gene_id != gene.gene_id {
                return Err(GeneError::MixedGeneIds {
                    expected: Arc::clone(&gene.gene_id),
                    found: Arc::clone(&row.gene_id),
                });
            }
            let Some(value) = self.measure.select(row) else {
                continue;
            };
            let Some(patient) = self.patients.get(row.patient_id) else {
                continue;
            };
            if !value.is_finite() {
                return Err(GeneError::NonFiniteValue {
                    patient_id: row.patient_id,
                    measure: self.measure,
                });
            }
            if !seen.insert(row.patient_id) {
                return Err(GeneError::DuplicatePatient {
                    patient_id: row.patient_id,
                });
            }
            eligible.push((value, patient));
        }

        Ok(eligible)
    }
}

impl<'a> CohortSplitter for TopNPercentSplit<'a> {
    fn id(&self) -> String {
        format!("top-{}-{}", self.percent, self.measure)
    }

    fn split(&self, gene: &GeneGroup) -> Result<CohortPair<'_>, GeneError> {
        let mut ranked = self.eligible_rows(gene)?;
        // stable: ties keep their row order
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = ranked.len();
        let k = n * self.percent as usize / 100;
        let patients = |rows: &[(f64, &'a Patient)]| -> Cohort<'a> {
            rows.iter().map(|(_, p)| *p).collect()
        };

        Ok(CohortPair {
            low: patients(&ranked[..k]),
            high: patients(&ranked[n - k..]),
        })
    }
}

#[cfg(test)]
mod tests {
    use kmrank_stats::survival::EventKind;

    use super::*;

    fn lookup(count: u32) -> PatientLookup {
        PatientLookup::new((1..=count).map(|id| Patient {
            id,
            event_time: id * 2,
            event_kind: if id % 3 == 0 {
                EventKind::Censored
            } else {
                EventKind::Failure
            },
        }))
        .unwrap()
    }

    fn row(patient_id: PatientId, before: Option<f64>, after: Option<f64>) -> ExpressionValue {
        ExpressionValue {
            gene_id: "G1".into(),
            patient_id,
            before,
            after,
        }
    }

    fn gene(rows: Vec<ExpressionValue>) -> GeneGroup {
        GeneGroup {
            gene_id: "G1".into(),
            rows,
        }
    }

    fn ids(cohort: &Cohort<'_>) -> Vec<PatientId> {
        cohort.iter().map(|p| p.id).collect()
    }

    #[test]
    fn test_percent_range() {
        let patients = lookup(3);
        for percent in [0, 51, 100] {
            assert!(matches!(
                TopNPercentSplit::new(percent, ExpressionMeasure::Before, &patients),
                Err(SplitConfigError::PercentOutOfRange { .. })
            ));
        }
        for percent in [1, 25, 50] {
            assert!(TopNPercentSplit::new(percent, ExpressionMeasure::After, &patients).is_ok());
        }
    }

    #[test]
    fn test_empty_lookup_rejected() {
        let patients = PatientLookup::default();
        assert!(matches!(
            TopNPercentSplit::new(10, ExpressionMeasure::Before, &patients),
            Err(SplitConfigError::EmptyPatientLookup)
        ));
    }

    #[test]
    fn test_ids() {
        let patients = lookup(1);
        let id = |percent, measure| {
            TopNPercentSplit::new(percent, measure, &patients)
                .unwrap()
                .id()
        };
        assert_eq!(id(20, ExpressionMeasure::Before), "top-20-before");
        assert_eq!(id(5, ExpressionMeasure::After), "top-5-after");
        assert_eq!(id(50, ExpressionMeasure::AbsoluteDifference), "top-50-diff");
    }

    #[test]
    fn test_split_by_before_value() {
        let patients = lookup(10);
        let split = TopNPercentSplit::new(20, ExpressionMeasure::Before, &patients).unwrap();
        let rows = (1..=10)
            .map(|id| row(id, Some(f64::from(10 - id)), None))
            .collect();
        let pair = split.split(&gene(rows)).unwrap();
        assert_eq!(ids(&pair.low), [10, 9]);
        assert_eq!(ids(&pair.high), [2, 1]);
        assert_eq!(pair.group_size(), 2);
    }

    #[test]
    fn test_ineligible_rows_ignored() {
        let patients = lookup(4);
        let split = TopNPercentSplit::new(50, ExpressionMeasure::After, &patients).unwrap();
        let rows = vec![
            row(1, Some(1.0), Some(4.0)),
            row(2, Some(1.0), None),
            row(3, None, Some(1.0)),
            // unknown patient
            row(99, Some(1.0), Some(0.0)),
            row(4, None, Some(2.0)),
        ];
        let pair = split.split(&gene(rows)).unwrap();
        // eligible: 1 (4.0), 3 (1.0), 4 (2.0)
        assert_eq!(ids(&pair.low), [3]);
        assert_eq!(ids(&pair.high), [1]);
    }

    #[test]
    fn test_absolute_difference() {
        let patients = lookup(4);
        let split =
            TopNPercentSplit::new(25, ExpressionMeasure::AbsoluteDifference, &patients).unwrap();
        let rows = vec![
            row(1, Some(1.0), Some(4.0)),
            row(2, Some(5.0), Some(4.5)),
            row(3, Some(2.0), Some(0.0)),
            row(4, Some(7.0), Some(1.0)),
        ];
        let pair = split.split(&gene(rows)).unwrap();
        assert_eq!(ids(&pair.low), [2]);
        assert_eq!(ids(&pair.high), [4]);
    }

    #[test]
    fn test_ties_keep_row_order() {
        let patients = lookup(4);
        let split = TopNPercentSplit::new(50, ExpressionMeasure::Before, &patients).unwrap();
        let rows = (1..=4).map(|id| row(id, Some(1.0), None)).collect();
        let pair = split.split(&gene(rows)).unwrap();
        assert_eq!(ids(&pair.low), [1, 2]);
        assert_eq!(ids(&pair.high), [3, 4]);
    }

    #[test]
    fn test_half_split_of_odd_count_leaves_middle_out() {
        let patients = lookup(5);
        let split = TopNPercentSplit::new(50, ExpressionMeasure::Before, &patients).unwrap();
        let rows = (1..=5).map(|id| row(id, Some(f64::from(id)), None)).collect();
        let pair = split.split(&gene(rows)).unwrap();
        assert_eq!(ids(&pair.low), [1, 2]);
        assert_eq!(ids(&pair.high), [4, 5]);
    }

    #[test]
    fn test_cohort_sizes_for_all_percents() {
        for n in [0_u32, 1, 2, 7, 33, 100] {
            let patients = lookup(n.max(1));
            let rows = (1..=n)
                .map(|id| row(id, Some(f64::from(id * 37 % 11)), None))
                .collect::<Vec<_>>();
            let gene = gene(rows);
            for percent in 1..=50 {
                let split =
                    TopNPercentSplit::new(percent, ExpressionMeasure::Before, &patients).unwrap();
                let pair = split.split(&gene).unwrap();
                let k = (n * percent / 100) as usize;
                assert_eq!(pair.low.len(), k);
                assert_eq!(pair.high.len(), k);
                let low = ids(&pair.low).into_iter().collect::<HashSet<_>>();
                assert!(ids(&pair.high).iter().all(|id| !low.contains(id)));
            }
        }
    }

    #[test]
    fn test_malformed_rows() {
        let patients = lookup(3);
        let split = TopNPercentSplit::new(50, ExpressionMeasure::Before, &patients).unwrap();

        let err = split
            .split(&gene(vec![row(1, Some(1.0), None), row(1, Some(2.0), None)]))
            .unwrap_err();
        assert_eq!(err, GeneError::DuplicatePatient { patient_id: 1 });

        let err = split
            .split(&gene(vec![row(2, Some(f64::NAN), None)]))
            .unwrap_err();
        assert_eq!(
            err,
            GeneError::NonFiniteValue {
                patient_id: 2,
                measure: ExpressionMeasure::Before
            }
        );

        let mut other = row(3, Some(1.0), None);
        other.gene_id = "G2".into();
        let err = split.split(&gene(vec![other])).unwrap_err();
        assert!(matches!(err, GeneError::MixedGeneIds { .. }));
    }
}
