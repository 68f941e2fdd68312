use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Record of a single completed round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 1-based round number
    pub index: usize,
    pub generator_prompt: String,
    pub generated_text: String,
    pub temperature_used: f64,
    pub scores: BTreeMap<String, f64>,
    pub average_score: f64,
    pub meets_threshold: bool,
    pub feedback: String,
    pub suggested_next_temperature: f64,
    pub timestamp: DateTime<Utc>,
}

/// Ordered, append-only log of the completed rounds of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    records: Vec<IterationRecord>,
}

impl History {
    pub(crate) fn push(&mut self, record: IterationRecord) {
        debug_assert_eq!(record.index, self.records.len() + 1);
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, IterationRecord> {
        self.records.iter()
    }

    pub fn last(&self) -> Option<&IterationRecord> {
        self.records.last()
    }

    /// Get the record for a 1-based round number
    pub fn get(&self, index: usize) -> Option<&IterationRecord> {
        index.checked_sub(1).and_then(|i| self.records.get(i))
    }

    /// The highest-scoring round; the earliest wins ties
    pub fn best(&self) -> Option<&IterationRecord> {
        self.records.iter().fold(None, |best, record| match best {
            Some(current) if current.average_score >= record.average_score => Some(current),
            _ => Some(record),
        })
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a IterationRecord;
    type IntoIter = std::slice::Iter<'a, IterationRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
