//! Readers for the patient and gene files, and the report writer.

pub mod genes;
pub mod patients;
pub mod report;
