use serde::Serialize;
use std::collections::BTreeMap;

/// Scores looked up over the configured criteria, and the verdict they imply
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreCard {
    /// One entry per configured criterion, in configured order
    pub per_criterion: Vec<(String, f64)>,
    pub average: f64,
    pub meets_threshold: bool,
}

impl ScoreCard {
    /// Average the critic's scores over `criteria`.
    ///
    /// A criterion the critic did not score counts as 0.0, and scores for
    /// names outside `criteria` are ignored. The threshold is inclusive.
    /// `criteria` must be non-empty.
    pub fn compute(scores: &BTreeMap<String, f64>, criteria: &[String], threshold: f64) -> Self {
        let per_criterion: Vec<(String, f64)> = criteria
            .iter()
            .map(|name| (name.clone(), scores.get(name).copied().unwrap_or(0.0)))
            .collect();

        let average = if per_criterion.is_empty() {
            0.0
        } else {
            per_criterion.iter().map(|(_, score)| score).sum::<f64>() / per_criterion.len() as f64
        };

        Self {
            per_criterion,
            average,
            meets_threshold: average >= threshold,
        }
    }

    /// Criteria the critic left unscored
    pub fn missing(&self, scores: &BTreeMap<String, f64>) -> Vec<&str> {
        self.per_criterion
            .iter()
            .filter(|(name, _)| !scores.contains_key(name))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
