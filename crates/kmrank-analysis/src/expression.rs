//! Per-patient expression measurements of a gene.

use std::{collections::HashMap, sync::Arc};

use crate::patient::PatientId;

/// Expression of one gene in one patient, before and after treatment.
///
/// A missing measurement is `None`; it never takes part in arithmetic.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionValue {
    pub gene_id: Arc<str>,
    pub patient_id: PatientId,
    pub before: Option<f64>,
    pub after: Option<f64>,
}

impl ExpressionValue {
    /// `|after - before|`, missing if either side is missing.
    ///
    /// # Examples
    ///
    /// ```
    /// use kmrank_analysis::expression::ExpressionValue;
    ///
    /// let mut value = ExpressionValue {
    ///     gene_id: "ILMN_1".into(),
    ///     patient_id: 1,
    ///     before: Some(2.5),
    ///     after: Some(1.0),
    /// };
    /// assert_eq!(value.absolute_difference(), Some(1.5));
    ///
    /// value.after = None;
    /// assert_eq!(value.absolute_difference(), None);
    /// ```
    #[must_use]
    pub fn absolute_difference(&self) -> Option<f64> {
        Some((self.after? - self.before?).abs())
    }
}

/// All expression rows of a single gene.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneGroup {
    pub gene_id: Arc<str>,
    pub rows: Vec<ExpressionValue>,
}

impl GeneGroup {
    /// Groups rows by gene id, keeping genes in order of first appearance.
    ///
    /// # Examples
    ///
    /// ```
    /// use kmrank_analysis::expression::{ExpressionValue, GeneGroup};
    ///
    /// let row = |gene: &str, patient_id| ExpressionValue {
    ///     gene_id: gene.into(),
    ///     patient_id,
    ///     before: Some(1.0),
    ///     after: None,
    /// };
    /// let groups = GeneGroup::group_rows([row("B", 1), row("A", 1), row("B", 2)]);
    /// assert_eq!(groups.len(), 2);
    /// assert_eq!(&*groups[0].gene_id, "B");
    /// assert_eq!(groups[0].rows.len(), 2);
    /// ```
    pub fn group_rows<I>(rows: I) -> Vec<Self>
    where
        I: IntoIterator<Item = ExpressionValue>,
    {
        let mut index = HashMap::<Arc<str>, usize>::new();
        let mut groups = Vec::<Self>::new();
        for row in rows {
            let i = *index.entry(Arc::clone(&row.gene_id)).or_insert_with(|| {
                groups.push(Self {
                    gene_id: Arc::clone(&row.gene_id),
                    rows: vec![],
                });
                groups.len() - 1
            });
            groups[i].rows.push(row);
        }
        groups
    }
}
