//! Conversion between live achievements and the persisted progress DTO.

use cheevo_shared::{AchievementProgress, ConditionProgress, Numeric};

use super::achievement::Achievement;

impl Achievement {
    /// Snapshot of this achievement's runtime fields.
    pub fn progress(&self) -> AchievementProgress {
        AchievementProgress {
            primed: self.primed,
            remembered: self.remembered.map(Into::into),
            conditions: self
                .conditions
                .iter()
                .map(|c| ConditionProgress {
                    hits: c.hits,
                    is_met: c.is_met,
                })
                .collect(),
            measured_current: self.measured_current,
            measured_target: self.measured_target,
            measured_active: self.measured_active,
            measured_is_percent: self.measured_is_percent,
        }
    }

    /// Apply stored progress.
    ///
    /// Only the overlapping prefix of the condition list is restored, so a
    /// snapshot taken against an older formula cannot index out of range.
    /// Hits are clamped to the current hit target.
    pub(crate) fn apply_progress(&mut self, progress: &AchievementProgress) {
        self.primed = progress.primed;
        self.remembered = progress.remembered.map(Numeric::from);
        for (condition, stored) in self.conditions.iter_mut().zip(&progress.conditions) {
            condition.hits = if condition.hit_target > 0 {
                stored.hits.min(condition.hit_target)
            } else {
                stored.hits
            };
            condition.is_met = stored.is_met;
        }
        self.measured_current = progress.measured_current;
        self.measured_target = progress.measured_target;
        self.measured_active = progress.measured_active;
        self.measured_is_percent = progress.measured_is_percent;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::FormulaCompiler;

    fn achievement(formula: &str) -> Achievement {
        Achievement::new("a", formula, FormulaCompiler::default().compile(formula))
    }

    #[test]
    fn test_progress_round_trip() {
        let mut source = achievement("0xH1=1(4)_M:0xH2>=8");
        source.conditions[0].hits = 3;
        source.conditions[1].hits = 1;
        source.conditions[1].is_met = true;
        source.primed = true;
        source.remembered = Some(Numeric::Float(2.5));
        source.measured_current = 5.0;
        source.measured_target = 8.0;
        source.measured_active = true;

        let mut restored = achievement("0xH1=1(4)_M:0xH2>=8");
        restored.apply_progress(&source.progress());
        assert_eq!(restored, source);
    }

    #[test]
    fn test_apply_overlapping_prefix_only() {
        let mut target = achievement("0xH1=1(2)_0xH2=1_0xH3=1");
        let progress = AchievementProgress {
            conditions: vec![ConditionProgress {
                hits: 9,
                is_met: true,
            }],
            ..Default::default()
        };
        target.apply_progress(&progress);
        assert_eq!(target.conditions[0].hits, 2);
        assert!(target.conditions[0].is_met);
        assert_eq!(target.conditions[1].hits, 0);
    }
}
