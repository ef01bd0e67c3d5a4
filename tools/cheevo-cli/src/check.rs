//! Check command - lint a formula

use anyhow::Result;
use cheevo_core::{Config, FormulaCompiler, FormulaWarning, check};
use clap::Args;

/// Arguments for the check command
#[derive(Args)]
pub struct CheckArgs {
    /// Formula text
    pub formula: String,

    /// Fail when any warning is reported
    #[arg(long)]
    pub strict: bool,
}

pub fn execute(args: CheckArgs, config: &Config) -> Result<()> {
    let warnings = lint(&args.formula, config);
    if warnings.is_empty() {
        println!("OK");
        return Ok(());
    }
    for warning in &warnings {
        println!("warning: {}", warning);
    }
    if args.strict {
        anyhow::bail!("{} warning(s)", warnings.len());
    }
    Ok(())
}

pub fn lint(formula: &str, config: &Config) -> Vec<FormulaWarning> {
    check(&FormulaCompiler::new(config.compiler).compile(formula))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_formula() {
        assert!(lint("0xH0010=5_0xH0011>d0xH0011", &Config::default()).is_empty());
    }

    #[test]
    fn test_strict_fails_on_warnings() {
        let args = CheckArgs {
            formula: "0xH0010=5_N:0xH0011=1".into(),
            strict: true,
        };
        assert!(execute(args, &Config::default()).is_err());

        let args = CheckArgs {
            formula: "0xH0010=5_N:0xH0011=1".into(),
            strict: false,
        };
        assert!(execute(args, &Config::default()).is_ok());
    }
}
