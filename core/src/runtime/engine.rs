//! Achievement engine
//!
//! Holds every loaded achievement plus the RAM snapshots they are evaluated
//! against. The RAM domain is passed to each call rather than owned, so the
//! same domain can be handed to a plan executor between frames.

use hashbrown::HashMap;

use cheevo_shared::{STATE_SCHEMA_VERSION, StateSnapshot};

use super::achievement::Achievement;
use super::evaluator;
use super::snapshots::RamSnapshots;
use crate::config::CompilerConfig;
use crate::formula::FormulaCompiler;
use crate::ram::RamDomain;

pub struct AchievementEngine {
    compiler: FormulaCompiler,
    /// Load order is evaluation and serialization order.
    achievements: Vec<Achievement>,
    index: HashMap<String, usize>,
    snapshots: RamSnapshots,
}

impl AchievementEngine {
    /// Create an engine with snapshots synced to `ram`.
    pub fn new<R: RamDomain + ?Sized>(ram: &R, config: CompilerConfig) -> Self {
        Self {
            compiler: FormulaCompiler::new(config),
            achievements: Vec::new(),
            index: HashMap::new(),
            snapshots: RamSnapshots::capture(ram),
        }
    }

    pub fn compiler(&self) -> &FormulaCompiler {
        &self.compiler
    }

    pub fn snapshots(&self) -> &RamSnapshots {
        &self.snapshots
    }

    /// Compile and install achievements, replacing any entry with the same id.
    pub fn load<I, K, F>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, F)>,
        K: Into<String>,
        F: AsRef<str>,
    {
        for (id, formula) in entries {
            self.load_one(id, formula.as_ref());
        }
    }

    pub fn load_one(&mut self, id: impl Into<String>, formula: &str) {
        let id = id.into();
        let conditions = self.compiler.compile(formula);
        tracing::debug!(id = %id, conditions = conditions.len(), "loaded achievement");
        let achievement = Achievement::new(id.clone(), formula, conditions);
        match self.index.get(&id) {
            Some(&slot) => self.achievements[slot] = achievement,
            None => {
                self.index.insert(id, self.achievements.len());
                self.achievements.push(achievement);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Achievement> {
        self.index.get(id).map(|&slot| &self.achievements[slot])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Achievement> {
        self.achievements.iter()
    }

    pub fn len(&self) -> usize {
        self.achievements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.achievements.is_empty()
    }

    /// Advance the snapshots one frame and evaluate every locked achievement.
    ///
    /// Returns the ids unlocked by this call, in load order.
    pub fn evaluate_frame<R: RamDomain + ?Sized>(&mut self, ram: &R) -> Vec<String> {
        if let Err(err) = self.snapshots.advance(ram) {
            tracing::warn!(%err, "RAM copy failed; evaluating against previous frame");
        }

        let mut unlocked = Vec::new();
        for achievement in self.achievements.iter_mut().filter(|a| !a.unlocked) {
            if evaluator::evaluate(achievement, &self.snapshots) {
                tracing::info!(id = %achievement.id, "achievement unlocked");
                unlocked.push(achievement.id.clone());
            }
        }
        unlocked
    }

    /// Progress of every achievement.
    pub fn serialize_state(&self) -> StateSnapshot {
        let mut snapshot = StateSnapshot::default();
        for achievement in &self.achievements {
            if achievement.unlocked {
                snapshot.completed_ids.push(achievement.id.clone());
            } else {
                snapshot
                    .progress
                    .insert(achievement.id.clone(), achievement.progress());
            }
        }
        snapshot
    }

    /// Replace all runtime state with `snapshot`, then resync the RAM snapshots.
    ///
    /// Ids are matched exactly first, then case-insensitively. Unknown ids are
    /// ignored. A RAM failure during the resync leaves the snapshots as they were.
    pub fn restore_state<R: RamDomain + ?Sized>(&mut self, snapshot: &StateSnapshot, ram: &R) {
        if !snapshot.is_current_schema() {
            tracing::warn!(
                found = %snapshot.schema_version,
                expected = STATE_SCHEMA_VERSION,
                "restoring state with unexpected schema version"
            );
        }

        for achievement in &mut self.achievements {
            achievement.reset_to_power_on();
        }

        for id in &snapshot.completed_ids {
            match self.lookup(id) {
                Some(slot) => self.achievements[slot].unlocked = true,
                None => tracing::debug!(id = %id, "ignoring unknown completed id"),
            }
        }

        for (id, progress) in &snapshot.progress {
            match self.lookup(id) {
                Some(slot) if !self.achievements[slot].unlocked => {
                    self.achievements[slot].apply_progress(progress);
                }
                Some(_) => {}
                None => tracing::debug!(id = %id, "ignoring progress for unknown id"),
            }
        }

        self.resync(ram);
        tracing::debug!(
            completed = snapshot.completed_ids.len(),
            in_progress = snapshot.progress.len(),
            "restored achievement state"
        );
    }

    /// Clear all runtime state, including unlocks, and resync the RAM snapshots.
    pub fn reset_to_power_on<R: RamDomain + ?Sized>(&mut self, ram: &R) {
        for achievement in &mut self.achievements {
            achievement.reset_to_power_on();
        }
        self.resync(ram);
        tracing::debug!(count = self.achievements.len(), "reset achievements to power-on");
    }

    fn resync<R: RamDomain + ?Sized>(&mut self, ram: &R) {
        if let Err(err) = self.snapshots.resync(ram) {
            tracing::debug!(%err, "RAM resync failed; keeping previous snapshots");
        }
    }

    fn lookup(&self, id: &str) -> Option<usize> {
        if let Some(&slot) = self.index.get(id) {
            return Some(slot);
        }
        let wanted = id.to_lowercase();
        self.achievements
            .iter()
            .position(|a| a.id.to_lowercase() == wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ram::{MemoryDomain, SystemRam};
    use crate::test_utils::FailingRam;
    use cheevo_shared::Numeric;

    fn engine(ram: &SystemRam, entries: &[(&str, &str)]) -> AchievementEngine {
        let mut engine = AchievementEngine::new(ram, CompilerConfig::default());
        engine.load(entries.iter().copied());
        engine
    }

    // ============================================================================
    // Loading
    // ============================================================================

    #[test]
    fn test_load_replaces_same_id() {
        let ram = SystemRam::new(16);
        let mut e = engine(&ram, &[("a", "0xH1=1"), ("b", "0xH2=1")]);
        e.load_one("a", "0xH3=1_0xH4=1");
        assert_eq!(e.len(), 2);
        assert_eq!(e.get("a").unwrap().conditions().len(), 2);
        let ids: Vec<_> = e.iter().map(Achievement::id).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(e.get("A").is_none());
    }

    // ============================================================================
    // Frame evaluation
    // ============================================================================

    #[test]
    fn test_evaluate_reports_new_unlocks_once() {
        let mut ram = SystemRam::new(16);
        let mut e = engine(&ram, &[("a", "0xH1=1"), ("b", "0xH2=1")]);
        assert!(e.evaluate_frame(&ram).is_empty());

        ram.poke(1, 1);
        ram.poke(2, 1);
        assert_eq!(e.evaluate_frame(&ram), vec!["a", "b"]);
        assert!(e.evaluate_frame(&ram).is_empty());
        assert!(e.get("a").unwrap().is_unlocked());
    }

    #[test]
    fn test_failed_copy_keeps_previous_frame() {
        let mut ram = SystemRam::new(16);
        ram.poke(1, 1);
        let mut e = engine(&ram, &[("a", "d0xH1=0")]);
        let failing = FailingRam::new(16);
        assert_eq!(e.evaluate_frame(&failing), vec!["a"]);
        assert_eq!(e.snapshots().now()[1], 1);
    }

    // ============================================================================
    // State snapshots
    // ============================================================================

    #[test]
    fn test_serialize_restore_round_trip() {
        let mut ram = SystemRam::new(16);
        let mut e = engine(
            &ram,
            &[("done", "0xH1=1"), ("count", "K:0xH2_0xH3=1(5)_M:0xH4>=9")],
        );
        ram.poke(1, 1);
        ram.poke(2, 7);
        ram.poke(3, 1);
        ram.poke(4, 3);
        e.evaluate_frame(&ram);
        e.evaluate_frame(&ram);

        let snapshot = e.serialize_state();
        assert_eq!(snapshot.completed_ids, vec!["done"]);
        let before = e.get("count").unwrap().clone();

        let mut restored = engine(
            &SystemRam::new(16),
            &[("done", "0xH1=1"), ("count", "K:0xH2_0xH3=1(5)_M:0xH4>=9")],
        );
        restored.restore_state(&snapshot, &ram);
        assert!(restored.get("done").unwrap().is_unlocked());
        assert_eq!(restored.get("count").unwrap(), &before);
        assert_eq!(before.remembered(), Some(Numeric::Integer(7)));
        assert_eq!(before.conditions()[1].hits, 2);
        assert_eq!(restored.snapshots().prior()[2], 7);
    }

    #[test]
    fn test_restore_is_case_insensitive_and_ignores_unknown() {
        let ram = SystemRam::new(16);
        let mut e = engine(&ram, &[("Boss", "0xH1=1(3)")]);
        let mut snapshot = StateSnapshot::default();
        let mut progress = e.get("Boss").unwrap().progress();
        progress.conditions[0].hits = 2;
        snapshot.progress.insert("boss".into(), progress);
        snapshot.completed_ids.push("ghost".into());

        e.restore_state(&snapshot, &ram);
        assert_eq!(e.get("Boss").unwrap().conditions()[0].hits, 2);
    }

    #[test]
    fn test_restore_resets_unlisted_achievements() {
        let mut ram = SystemRam::new(16);
        let mut e = engine(&ram, &[("a", "0xH1=1")]);
        ram.poke(1, 1);
        e.evaluate_frame(&ram);
        assert!(e.get("a").unwrap().is_unlocked());

        e.restore_state(&StateSnapshot::default(), &ram);
        assert!(!e.get("a").unwrap().is_unlocked());
    }

    #[test]
    fn test_restore_survives_failing_ram() {
        let mut ram = SystemRam::new(16);
        ram.poke(5, 42);
        let mut e = engine(&ram, &[("a", "0xH1=1")]);
        e.restore_state(&StateSnapshot::default(), &FailingRam::new(16));
        assert_eq!(e.snapshots().now()[5], 42);
        e.reset_to_power_on(&FailingRam::new(16));
        assert_eq!(e.snapshots().prior()[5], 42);
    }

    #[test]
    fn test_reset_to_power_on_clears_unlocks() {
        let mut ram = SystemRam::new(16);
        let mut e = engine(&ram, &[("a", "0xH1=1")]);
        ram.poke(1, 1);
        assert_eq!(e.evaluate_frame(&ram), vec!["a"]);

        e.reset_to_power_on(&ram);
        let a = e.get("a").unwrap();
        assert!(!a.is_unlocked());
        assert_eq!(a.conditions()[0].hits, 0);
        assert_eq!(e.evaluate_frame(&ram), vec!["a"]);
    }
}
