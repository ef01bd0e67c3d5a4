//! Compile command - show the conditions a formula compiles to

use anyhow::Result;
use cheevo_core::{Condition, Config, FormulaCompiler, decompile};
use clap::Args;

/// Arguments for the compile command
#[derive(Args)]
pub struct CompileArgs {
    /// Formula text, e.g. "0xH0010=5(3)"
    pub formula: String,

    /// Print the conditions as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: CompileArgs, config: &Config) -> Result<()> {
    let conditions = FormulaCompiler::new(config.compiler).compile(&args.formula);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&conditions)?);
    } else {
        print!("{}", describe(&conditions));
    }
    Ok(())
}

/// Numbered condition listing followed by the canonical formula.
pub fn describe(conditions: &[Condition]) -> String {
    let mut out = String::new();
    for (index, condition) in conditions.iter().enumerate() {
        out.push_str(&format!("{:>3}  {}\n", index, condition));
    }
    out.push_str(&format!("canonical: {}\n", decompile(conditions)));
    out
}
