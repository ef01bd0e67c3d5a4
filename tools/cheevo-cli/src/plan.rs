//! Plan command - build the RAM-write plan for a formula

use std::path::PathBuf;

use anyhow::{Context, Result};
use cheevo_core::{Config, FormulaCompiler, TestPlan, build_plan};
use clap::Args;

/// Arguments for the plan command
#[derive(Args)]
pub struct PlanArgs {
    /// Formula text
    pub formula: String,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,

    /// Write the JSON plan to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn execute(args: PlanArgs, config: &Config) -> Result<()> {
    let plan = build_plan(&FormulaCompiler::new(config.compiler).compile(&args.formula));
    tracing::debug!(steps = plan.len(), writes = plan.write_count(), "plan built");

    if let Some(output) = &args.output {
        std::fs::write(output, plan.to_json()?)
            .with_context(|| format!("Failed to write plan: {}", output.display()))?;
        tracing::info!("Wrote {} steps to {}", plan.len(), output.display());
    } else if args.json {
        println!("{}", plan.to_json()?);
    } else {
        print!("{}", render(&plan));
    }
    Ok(())
}

/// One line per step: frame index, comment, then `addr=value/mask` writes.
pub fn render(plan: &TestPlan) -> String {
    let mut out = String::new();
    for (frame, step) in plan.iter().enumerate() {
        out.push_str(&format!("{:>4}  {}", frame, step.comment));
        for write in &step.writes {
            if write.mask == 0xFF {
                out.push_str(&format!(" {:#06x}={:#04x}", write.address, write.value));
            } else {
                out.push_str(&format!(
                    " {:#06x}={:#04x}/{:#04x}",
                    write.address, write.value, write.mask
                ));
            }
        }
        out.push('\n');
    }
    out
}
