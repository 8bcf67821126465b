use serde::{Deserialize, Serialize};

use crate::domain::scheduling_model::span::time_span::Ticks;

/// Tunables of the capacity engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Length of a day in ticks; a continuity search that crosses the planning horizon
    /// twice is deferred by one day.
    pub ticks_per_day: Ticks,

    /// Consecutive retries that change only the sequencing context, not the time.
    pub max_context_retries: usize,

    /// Upper bound on iterations of one continuity search.
    pub max_search_iterations: usize,

    /// Drop attention demands that ended before the clock whenever a ledger is written.
    pub prune_attention_history: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig { ticks_per_day: 86_400, max_context_retries: 8, max_search_iterations: 10_000, prune_attention_history: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{ "ticksPerDay": 1440 }"#).unwrap();
        assert_eq!(config.ticks_per_day, 1440);
        assert_eq!(config.max_context_retries, 8);
        assert!(config.prune_attention_history);
    }
}
