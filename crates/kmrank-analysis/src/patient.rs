//! Patients and the read-only patient lookup shared by every gene.

use std::collections::BTreeMap;

use kmrank_stats::survival::EventKind;
use serde::Serialize;

pub type PatientId = u32;

/// Survival record of one patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Patient {
    pub id: PatientId,
    /// Time of the failure or censoring event.
    pub event_time: u32,
    pub event_kind: EventKind,
}

impl Patient {
    #[must_use]
    pub fn survival_event(&self) -> (u32, EventKind) {
        (self.event_time, self.event_kind)
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum PatientLookupError {
    #[display("patient {id} appears more than once")]
    DuplicatePatient { id: PatientId },
}

/// Immutable mapping from patient id to [`Patient`].
#[derive(Debug, Clone, Default)]
pub struct PatientLookup {
    patients: BTreeMap<PatientId, Patient>,
}

impl PatientLookup {
    /// Builds the lookup, rejecting duplicate patient ids.
    ///
    /// # Examples
    ///
    /// ```
    /// use kmrank_analysis::patient::{Patient, PatientLookup};
    /// use kmrank_stats::survival::EventKind;
    ///
    /// let lookup = PatientLookup::new([
    ///     Patient { id: 1, event_time: 12, event_kind: EventKind::Failure },
    ///     Patient { id: 2, event_time: 30, event_kind: EventKind::Censored },
    /// ])
    /// .unwrap();
    /// assert_eq!(lookup.len(), 2);
    /// assert_eq!(lookup.get(2).unwrap().event_time, 30);
    /// ```
    pub fn new<I>(patients: I) -> Result<Self, PatientLookupError>
    where
        I: IntoIterator<Item = Patient>,
    {
        let mut map = BTreeMap::new();
        for patient in patients {
            if map.insert(patient.id, patient).is_some() {
                return Err(PatientLookupError::DuplicatePatient { id: patient.id });
            }
        }
        Ok(Self { patients: map })
    }

    #[must_use]
    pub fn get(&self, id: PatientId) -> Option<&Patient> {
        self.patients.get(&id)
    }

    #[must_use]
    pub fn contains(&self, id: PatientId) -> bool {
        self.patients.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.patients.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    /// Patients in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Patient> + '_ {
        self.patients.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_patient_rejected() {
        let patient = Patient {
            id: 7,
            event_time: 3,
            event_kind: EventKind::Failure,
        };
        let err = PatientLookup::new([patient, patient]).unwrap_err();
        assert!(matches!(err, PatientLookupError::DuplicatePatient { id: 7 }));
        assert_eq!(err.to_string(), "patient 7 appears more than once");
    }

    #[test]
    fn test_iter_in_id_order() {
        let lookup = PatientLookup::new([9, 2, 30, 4, 17].map(|id| Patient {
            id,
            event_time: 1,
            event_kind: EventKind::Censored,
        }))
        .unwrap();
        let ids = lookup.iter().map(|p| p.id).collect::<Vec<_>>();
        assert_eq!(ids, [2, 4, 9, 17, 30]);
    }

    #[test]
    fn test_missing_patient() {
        let lookup = PatientLookup::new([]).unwrap();
        assert!(lookup.is_empty());
        assert!(lookup.get(1).is_none());
        assert!(!lookup.contains(1));
    }
}
