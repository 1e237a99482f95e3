//! Compressed turn history (spec §4.5.3 step 4: "a compressed history of
//! the last two turns: status, strategy, edit counts, reason").

use eduviz_models::PatchOutcome;

use super::classify::Strategy;

#[derive(Debug, Clone)]
pub struct TurnSummary {
    pub turn: u32,
    pub status: TurnStatus,
    pub strategy: Strategy,
    pub applied: usize,
    pub rejected: usize,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    Stabilized,
    Failed,
}

impl TurnSummary {
    pub fn new(turn: u32, status: TurnStatus, strategy: Strategy, outcomes: &[PatchOutcome], reason: Option<String>) -> Self {
        let applied = outcomes.iter().filter(|o| o.is_success()).count();
        let rejected = outcomes.len() - applied;
        Self { turn, status, strategy, applied, rejected, reason }
    }
}

/// Renders the last two turns as a compact block for the next prompt.
pub fn render_history(turns: &[TurnSummary]) -> String {
    let recent = &turns[turns.len().saturating_sub(2)..];
    if recent.is_empty() {
        return "No prior attempts.".to_string();
    }

    recent
        .iter()
        .map(|t| {
            let status = match t.status {
                TurnStatus::Stabilized => "stabilized",
                TurnStatus::Failed => "failed",
            };
            format!(
                "turn {}: {} via `{}` ({} applied, {} rejected){}",
                t.turn,
                status,
                t.strategy.as_str(),
                t.applied,
                t.rejected,
                t.reason.as_ref().map(|r| format!(" — {r}")).unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_history_renders_placeholder() {
        assert_eq!(render_history(&[]), "No prior attempts.");
    }

    #[test]
    fn only_last_two_turns_are_rendered() {
        let turns: Vec<TurnSummary> = (1..=5)
            .map(|i| TurnSummary::new(i, TurnStatus::Failed, Strategy::General, &[PatchOutcome::NotFound], None))
            .collect();
        let rendered = render_history(&turns);
        assert!(!rendered.contains("turn 1:"));
        assert!(rendered.contains("turn 4:"));
        assert!(rendered.contains("turn 5:"));
    }

    #[test]
    fn counts_applied_and_rejected_outcomes() {
        let outcomes = vec![PatchOutcome::Applied, PatchOutcome::Applied, PatchOutcome::NotFound];
        let summary = TurnSummary::new(1, TurnStatus::Failed, Strategy::NameError, &outcomes, None);
        assert_eq!(summary.applied, 2);
        assert_eq!(summary.rejected, 1);
    }
}
