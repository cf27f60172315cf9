use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::cost_model::ModelSelection;

/// Accumulated model-selection savings for one project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionStats {
    pub total_savings: f64,
    pub cheaper_selections: u64,
    pub expensive_selections: u64,
}

/// Per-project savings ledger fed by every model selection.
#[derive(Debug, Default)]
pub struct SelectionMetrics {
    projects: DashMap<String, SelectionStats>,
}

impl SelectionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, project_id: &str, selection: &ModelSelection) {
        let mut entry = self.projects.entry(project_id.to_string()).or_default();
        if selection.is_cheaper() {
            entry.total_savings += selection.savings();
            entry.cheaper_selections += 1;
        } else if selection.is_more_expensive() {
            entry.expensive_selections += 1;
        }
    }

    pub fn savings(&self, project_id: &str) -> f64 {
        self.projects
            .get(project_id)
            .map(|s| s.total_savings)
            .unwrap_or(0.0)
    }

    pub fn stats(&self, project_id: &str) -> SelectionStats {
        self.projects
            .get(project_id)
            .map(|s| *s)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost_model::select_model;
    use readiness_core::{Depth, LLMConfig};

    #[test]
    fn test_savings_accumulate_per_project() {
        let metrics = SelectionMetrics::new();
        let config = LLMConfig::default().with_model("gpt-4");

        let cheaper = select_model("semantic_analysis", &config, Depth::Medium, 1000);
        metrics.record("p1", &cheaper);
        metrics.record("p1", &cheaper);

        let same = select_model("semantic_analysis", &config, Depth::Deep, 1000);
        metrics.record("p1", &same);

        let stats = metrics.stats("p1");
        assert_eq!(stats.cheaper_selections, 2);
        assert_eq!(stats.expensive_selections, 0);
        assert!((metrics.savings("p1") - 2.0 * (0.03 - 0.0015)).abs() < 1e-12);
        assert_eq!(metrics.savings("p2"), 0.0);
    }

    #[test]
    fn test_upgrade_counts_as_expensive() {
        let metrics = SelectionMetrics::new();
        let config = LLMConfig::default().with_model("gpt-3.5-turbo");
        let upgraded = select_model("semantic_analysis", &config, Depth::Deep, 1000);
        metrics.record("p1", &upgraded);
        assert_eq!(metrics.stats("p1").expensive_selections, 1);
        assert_eq!(metrics.savings("p1"), 0.0);
    }
}
