//! Verify command - replay generated plans against scratch RAM
//!
//! Each achievement gets a fresh zeroed RAM domain and a fresh engine. The
//! frame stepper does nothing, so the only writes the engine observes are the
//! plan's own.

use std::path::PathBuf;

use anyhow::{Context, Result};
use cheevo_core::{
    AchievementEngine, Config, FormulaCompiler, FrameStepper, MemoryDomain, PlanExecutor,
    RamDomain, RamError, SystemRam, build_plan,
};
use cheevo_shared::StateSnapshot;
use clap::Args;

use crate::set::AchievementSet;

/// Arguments for the verify command
#[derive(Args)]
pub struct VerifyArgs {
    /// Formula text (ignored when --set is given)
    #[arg(required_unless_present = "set")]
    pub formula: Option<String>,

    /// Achievement set TOML to verify
    #[arg(short, long)]
    pub set: Option<PathBuf>,

    /// Write the engine state after verification as JSON
    #[arg(long)]
    pub state: Option<PathBuf>,
}

/// Outcome for one achievement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub id: String,
    pub title: String,
    pub steps: usize,
    pub unlocked: bool,
}

pub fn execute(args: VerifyArgs, config: &Config) -> Result<()> {
    let set = match (&args.set, &args.formula) {
        (Some(path), _) => AchievementSet::load(path)?,
        (None, Some(formula)) => AchievementSet::single("formula", formula.as_str()),
        (None, None) => anyhow::bail!("Either a formula or --set is required"),
    };

    let (verdicts, state) = verify_set(&set, config)?;
    for verdict in &verdicts {
        let status = if verdict.unlocked { "PASS" } else { "FAIL" };
        if verdict.title.is_empty() {
            println!("{}  {} ({} steps)", status, verdict.id, verdict.steps);
        } else {
            println!("{}  {} \"{}\" ({} steps)", status, verdict.id, verdict.title, verdict.steps);
        }
    }

    if let Some(path) = &args.state {
        std::fs::write(path, state.to_json()?)
            .with_context(|| format!("Failed to write state: {}", path.display()))?;
        tracing::info!("Wrote state to {}", path.display());
    }

    let failed = verdicts.iter().filter(|v| !v.unlocked).count();
    if failed > 0 {
        anyhow::bail!("{} of {} achievement(s) did not unlock", failed, verdicts.len());
    }
    Ok(())
}

/// Verify every achievement in `set`, returning verdicts and the merged
/// end-of-plan state of every per-achievement engine.
pub fn verify_set(set: &AchievementSet, config: &Config) -> Result<(Vec<Verdict>, StateSnapshot)> {
    let compiler = FormulaCompiler::new(config.compiler);
    let mut verdicts = Vec::with_capacity(set.achievements.len());
    let mut state = StateSnapshot::default();
    for entry in &set.achievements {
        let plan = build_plan(&compiler.compile(&entry.formula));
        anyhow::ensure!(
            plan.len() <= config.verify.max_steps,
            "Plan for {} has {} steps (max_steps = {})",
            entry.id,
            plan.len(),
            config.verify.max_steps
        );

        let mut console = HeadlessConsole::new(config.verify.ram_size);
        let mut engine = AchievementEngine::new(&console, config.compiler);
        engine.load_one(entry.id.as_str(), &entry.formula);
        let unlocked = PlanExecutor::with_engine(&mut engine, entry.id.as_str()).run(&plan, &mut console);
        tracing::debug!(id = %entry.id, steps = plan.len(), frames = console.frames, unlocked, "verified");

        let snapshot = engine.serialize_state();
        state.completed_ids.extend(snapshot.completed_ids);
        state.progress.extend(snapshot.progress);
        verdicts.push(Verdict {
            id: entry.id.clone(),
            title: entry.title.clone(),
            steps: plan.len(),
            unlocked,
        });
    }

    Ok((verdicts, state))
}

/// Scratch RAM with a frame stepper that only counts frames.
struct HeadlessConsole {
    ram: SystemRam,
    frames: u64,
}

impl HeadlessConsole {
    fn new(size: usize) -> Self {
        Self {
            ram: SystemRam::new(size),
            frames: 0,
        }
    }
}

impl RamDomain for HeadlessConsole {
    fn size(&self) -> usize {
        self.ram.size()
    }

    fn copy_into(&self, buffer: &mut [u8]) -> Result<(), RamError> {
        self.ram.copy_into(buffer)
    }

    fn peek(&self, index: usize) -> u8 {
        self.ram.peek(index)
    }
}

impl MemoryDomain for HeadlessConsole {
    fn poke(&mut self, index: usize, value: u8) {
        self.ram.poke(index, value);
    }
}

impl FrameStepper for HeadlessConsole {
    fn run_frame(&mut self) {
        self.frames += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_passing_set() {
        let set = AchievementSet::parse(
            r#"
[[achievements]]
id = "coins"
formula = "0xH0010>=50_P:0xH0011=1"

[[achievements]]
id = "streak"
formula = "0xH0020>d0xH0020(5)"
"#,
        )
        .unwrap();
        let (verdicts, state) = verify_set(&set, &Config::default()).unwrap();
        assert!(verdicts.iter().all(|v| v.unlocked));
        assert_eq!(verdicts[1].steps, 6);
        assert_eq!(state.completed_ids, vec!["coins".to_string(), "streak".to_string()]);
        assert!(state.progress.is_empty());
    }

    #[test]
    fn test_unsatisfiable_formula_fails() {
        // The plan cannot make a constant comparison true
        let set = AchievementSet::single("never", "1=2");
        let (verdicts, state) = verify_set(&set, &Config::default()).unwrap();
        assert!(!verdicts[0].unlocked);
        assert!(state.completed_ids.is_empty());
        assert!(state.progress.contains_key("never"));
    }

    #[test]
    fn test_max_steps_enforced() {
        let mut config = Config::default();
        config.verify.max_steps = 3;
        let set = AchievementSet::single("long", "0xH0001=1(10)");
        assert!(verify_set(&set, &config).is_err());
    }

    #[test]
    fn test_state_file_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let args = VerifyArgs {
            formula: Some("0xH0001=3".into()),
            set: None,
            state: Some(path.clone()),
        };
        execute(args, &Config::default()).unwrap();

        let state = StateSnapshot::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(state.is_current_schema());
        assert_eq!(state.completed_ids, vec!["formula".to_string()]);
    }
}
