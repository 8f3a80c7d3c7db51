//! What starts a run.

use crate::models::{PriorityTier, Source};

/// Operator-initiated run over the full source list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualTrigger {
    /// Also run sources in the `low` tier.
    pub include_low_priority_sources: bool,
    /// Overrides the configured per-source item cap.
    pub limit_per_source_items: Option<usize>,
}

/// Timer-initiated run over one tier, rotated across invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTrigger {
    pub tier: PriorityTier,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Manual(ManualTrigger),
    Scheduled(ScheduledTrigger),
}

impl Trigger {
    pub fn label(&self) -> String {
        match self {
            Trigger::Manual(_) => "manual".to_string(),
            Trigger::Scheduled(s) => format!("scheduled:{}", s.tier),
        }
    }

    /// Sources eligible before any rotation.
    pub fn eligible<'a>(&self, sources: &'a [Source]) -> Vec<&'a Source> {
        match self {
            Trigger::Manual(m) => sources
                .iter()
                .filter(|s| m.include_low_priority_sources || s.tier != PriorityTier::Low)
                .collect(),
            Trigger::Scheduled(s) => sources.iter().filter(|src| src.tier == s.tier).collect(),
        }
    }

    pub fn item_limit(&self, configured: usize) -> usize {
        match self {
            Trigger::Manual(ManualTrigger {
                limit_per_source_items: Some(limit),
                ..
            }) => *limit,
            _ => configured,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceKind;

    fn sources() -> Vec<Source> {
        vec![
            Source::new("https://a.com", PriorityTier::High, SourceKind::Newspaper),
            Source::new("https://b.com", PriorityTier::Normal, SourceKind::Broadcast),
            Source::new("https://c.com", PriorityTier::Low, SourceKind::Social),
        ]
    }

    #[test]
    fn test_manual_excludes_low_tier_by_default() {
        let all = sources();
        let manual = Trigger::Manual(ManualTrigger::default());
        assert_eq!(manual.eligible(&all).len(), 2);
        let manual = Trigger::Manual(ManualTrigger {
            include_low_priority_sources: true,
            limit_per_source_items: Some(3),
        });
        assert_eq!(manual.eligible(&all).len(), 3);
        assert_eq!(manual.item_limit(10), 3);
        assert_eq!(manual.label(), "manual");
    }

    #[test]
    fn test_scheduled_filters_by_tier() {
        let all = sources();
        let scheduled = Trigger::Scheduled(ScheduledTrigger { tier: PriorityTier::Normal });
        let eligible = scheduled.eligible(&all);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].url, "https://b.com");
        assert_eq!(scheduled.item_limit(10), 10);
        assert_eq!(scheduled.label(), "scheduled:normal");
    }
}
