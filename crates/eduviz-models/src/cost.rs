//! Cost Record and job-level aggregation (spec §3, P8 cost monotonicity).

use serde::{Deserialize, Serialize};

/// Per-call cost record appended to the shared, process-wide cost store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub dollars: f64,
}

/// Aggregated cost for a single job, persisted as `cost_summary.json`
/// alongside `video_info.json` on completion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    pub total_calls: u64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_dollars: f64,
    pub by_model: std::collections::BTreeMap<String, CostRecord>,
}

impl CostSummary {
    pub fn record(&mut self, rec: &CostRecord) {
        self.total_calls += 1;
        self.total_input_tokens += rec.input_tokens;
        self.total_output_tokens += rec.output_tokens;
        self.total_dollars += rec.dollars;

        let entry = self
            .by_model
            .entry(rec.model.clone())
            .or_insert_with(|| CostRecord {
                model: rec.model.clone(),
                input_tokens: 0,
                output_tokens: 0,
                dollars: 0.0,
            });
        entry.input_tokens += rec.input_tokens;
        entry.output_tokens += rec.output_tokens;
        entry.dollars += rec.dollars;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregation_is_order_independent() {
        let recs = vec![
            CostRecord { model: "a".into(), input_tokens: 10, output_tokens: 5, dollars: 0.1 },
            CostRecord { model: "b".into(), input_tokens: 20, output_tokens: 10, dollars: 0.2 },
            CostRecord { model: "a".into(), input_tokens: 30, output_tokens: 15, dollars: 0.3 },
        ];

        let mut forward = CostSummary::default();
        for r in &recs {
            forward.record(r);
        }

        let mut reversed = CostSummary::default();
        for r in recs.iter().rev() {
            reversed.record(r);
        }

        assert_eq!(forward.total_calls, reversed.total_calls);
        assert!((forward.total_dollars - reversed.total_dollars).abs() < 1e-9);
        assert_eq!(forward.total_input_tokens, reversed.total_input_tokens);
    }
}
