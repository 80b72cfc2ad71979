//! Gene ranking by survival stratification.
//!
//! For every gene the patients are split into a low and a high expression
//! cohort, the two Kaplan-Meier curves are compared with a log-rank test, and
//! the genes are ranked by p-value with a false discovery rate attached.
//!
//! # Workflow
//!
//! 1. **Patients** ([`patient::PatientLookup`]): survival records keyed by id
//! 2. **Expression** ([`expression::GeneGroup`]): expression rows grouped by gene
//! 3. **Split strategy** ([`split::TopNPercentSplit`]): validated once, before any gene runs
//! 4. **Evaluation** ([`runner::GeneEvaluationRunner`]): all genes in parallel, sorted by p-value
//! 5. **Ranking** ([`result::RankedResults`]): false discovery rates per rank
//!
//! # Examples
//!
//! ```
//! use kmrank_analysis::{
//!     expression::{ExpressionValue, GeneGroup},
//!     patient::{Patient, PatientLookup},
//!     runner::{GeneEvaluationRunner, RunnerConfig},
//!     split::{ExpressionMeasure, TopNPercentSplit},
//! };
//! use kmrank_stats::survival::EventKind;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let patients = PatientLookup::new((1..=8).map(|id| Patient {
//!     id,
//!     event_time: id * 3,
//!     event_kind: if id % 2 == 0 { EventKind::Failure } else { EventKind::Censored },
//! }))?;
//!
//! let rows = (1..=8).map(|patient_id| ExpressionValue {
//!     gene_id: "ILMN_1343291".into(),
//!     patient_id,
//!     before: Some(f64::from(patient_id)),
//!     after: None,
//! });
//! let genes = GeneGroup::group_rows(rows);
//!
//! let split = TopNPercentSplit::new(25, ExpressionMeasure::Before, &patients)?;
//! let runner = GeneEvaluationRunner::new(&split, RunnerConfig::default())?;
//! let ranked = runner.run(&genes)?.rank();
//!
//! for result in ranked.by_p_value() {
//!     println!("{} p={:.3e} fdr={:?}", result.gene_id, result.p_value(), result.fdr());
//! }
//! # Ok(())
//! # }
//! ```

pub mod expression;
pub mod patient;
pub mod result;
pub mod runner;
pub mod split;
