//! Survival statistics for two-cohort comparisons.
//!
//! - [`survival`]: Kaplan-Meier curves for right-censored time-to-event data
//! - [`log_rank`]: log-rank test between two Kaplan-Meier curves
//! - [`fdr`]: false discovery rate scores for a ranked list of p-values
//!
//! # Examples
//!
//! ```
//! use kmrank_stats::{
//!     log_rank::LogRankTest,
//!     survival::{EventKind, SurvivalCurve},
//! };
//!
//! let low = SurvivalCurve::from_events([
//!     (3, EventKind::Failure),
//!     (5, EventKind::Failure),
//!     (9, EventKind::Censored),
//! ]);
//! let high = SurvivalCurve::from_events([
//!     (8, EventKind::Censored),
//!     (12, EventKind::Failure),
//!     (15, EventKind::Censored),
//! ]);
//! let test = LogRankTest::compute(&low, &high);
//! println!("p = {:.4}", test.p_value());
//! ```

pub mod fdr;
pub mod log_rank;
pub mod survival;
