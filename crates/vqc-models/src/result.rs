//! Result document reported on job completion.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::check::{CheckKind, CheckValue};
use crate::job::JobId;

/// Computed values keyed by check kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CheckResults(BTreeMap<CheckKind, CheckValue>);

impl CheckResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value under the kind it answers.
    pub fn insert(&mut self, value: CheckValue) {
        self.0.insert(value.kind(), value);
    }

    pub fn get(&self, kind: CheckKind) -> Option<&CheckValue> {
        self.0.get(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = CheckKind> + '_ {
        self.0.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The sole payload of a completion report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultDocument {
    pub job_id: JobId,
    /// Requested names, echoed as received
    pub requested: Vec<String>,
    pub checks: CheckResults,
}

impl ResultDocument {
    pub fn new(job_id: JobId, requested: Vec<String>, checks: CheckResults) -> Self {
        Self {
            job_id,
            requested,
            checks,
        }
    }
}
