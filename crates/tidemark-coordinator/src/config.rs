//! Coordinator configuration.

use std::time::Duration;

/// Configuration for a [`Coordinator`](crate::Coordinator) instance.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Coordination-group identifier stamped on every control event.
    ///
    /// Consumers drop events from foreign groups, so several deployments
    /// can share one control topic.
    pub group: String,
    /// Control topic carrying coordination events.
    pub control_topic: String,
    /// Source topics the writer fleet consumes.
    ///
    /// Partition 0 of the first topic is the designated leader partition.
    pub source_topics: Vec<String>,
    /// Minimum wall-clock spacing between the close of one commit cycle
    /// and the start of the next. Default: 300 s.
    pub commit_interval: Duration,
    /// Maximum time a cycle stays open awaiting completeness before it is
    /// force-closed with whatever accumulated. Default: 30 s.
    pub commit_timeout: Duration,
    /// Bounded wait for one control-channel poll. Default: 1 s.
    pub poll_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            group: "tidemark".to_string(),
            control_topic: "tidemark-control".to_string(),
            source_topics: Vec::new(),
            commit_interval: Duration::from_secs(300),
            commit_timeout: Duration::from_secs(30),
            poll_timeout: Duration::from_secs(1),
        }
    }
}

impl CoordinatorConfig {
    /// Returns the designated leader partition: partition 0 of the first
    /// configured source topic, or `None` when no source topic is set.
    #[must_use]
    pub fn leader_partition(&self) -> Option<(String, i32)> {
        self.source_topics.first().map(|t| (t.clone(), 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = CoordinatorConfig::default();
        assert_eq!(cfg.commit_interval, Duration::from_secs(300));
        assert_eq!(cfg.commit_timeout, Duration::from_secs(30));
        assert!(cfg.leader_partition().is_none());
    }

    #[test]
    fn leader_partition_is_first_topic_partition_zero() {
        let cfg = CoordinatorConfig {
            source_topics: vec!["orders".into(), "payments".into()],
            ..CoordinatorConfig::default()
        };
        assert_eq!(cfg.leader_partition(), Some(("orders".to_string(), 0)));
    }
}
