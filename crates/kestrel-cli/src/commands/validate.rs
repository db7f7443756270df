use crate::OutputFormat;
use anyhow::Result;
use console::style;
use kestrel_core::{Scenario, ScenarioLoader, ScenarioSet};
use std::io::{self, Write};
use std::path::Path;

/// Load and check scenarios without launching a browser; returns the exit code
pub fn execute(inputs: &[String], artifacts_dir: &Path, format: OutputFormat) -> Result<i32> {
    let checked = ScenarioLoader::load_all(inputs)
        .map_err(anyhow::Error::from)
        .and_then(|scenarios| Ok(ScenarioSet::new(scenarios, artifacts_dir)?));

    let mut out = io::stdout().lock();
    let code = match format {
        OutputFormat::Pretty => write_pretty(&mut out, &checked)?,
        OutputFormat::Json => write_json(&mut out, &checked)?,
    };
    Ok(code)
}

fn write_pretty<W: Write>(out: &mut W, checked: &Result<ScenarioSet>) -> Result<i32> {
    match checked {
        Ok(set) => {
            for scenario in set.scenarios() {
                writeln!(
                    out,
                    "  {} {} ({} steps)",
                    style("✓").green(),
                    scenario.name(),
                    scenario.steps().len()
                )?;
            }
            writeln!(out, "{} scenario(s) valid", set.len())?;
            Ok(0)
        }
        Err(e) => {
            writeln!(out, "  {} {:#}", style("✗").red(), e)?;
            Ok(1)
        }
    }
}

fn write_json<W: Write>(out: &mut W, checked: &Result<ScenarioSet>) -> Result<i32> {
    let (document, code) = match checked {
        Ok(set) => (
            serde_json::json!({
                "valid": true,
                "scenarios": set.scenarios().iter().map(summary).collect::<Vec<_>>(),
            }),
            0,
        ),
        Err(e) => (
            serde_json::json!({
                "valid": false,
                "error": format!("{:#}", e),
            }),
            1,
        ),
    };

    serde_json::to_writer_pretty(&mut *out, &document)?;
    writeln!(out)?;
    Ok(code)
}

fn summary(scenario: &Scenario) -> serde_json::Value {
    serde_json::json!({
        "name": scenario.name(),
        "steps": scenario.steps().len(),
        "screenshots": scenario.screenshot_paths().collect::<Vec<_>>(),
    })
}
