use super::Scenario;
use crate::{Error, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

const SCENARIO_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

pub struct ScenarioLoader;

impl ScenarioLoader {
    /// Read and validate a scenario file, picking the format from its extension
    pub fn from_file(path: &Path) -> Result<Scenario> {
        tracing::debug!("Reading scenario file from: {}", path.display());

        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let scenario: Scenario = if is_json(path) {
            serde_json::from_reader(reader)?
        } else {
            serde_yaml::from_reader(reader)?
        };

        tracing::debug!(
            "Loaded scenario '{}' with {} steps",
            scenario.name(),
            scenario.steps().len()
        );

        Ok(scenario)
    }

    /// Parse a scenario from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Scenario> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Parse a scenario from JSON text
    pub fn from_json_str(content: &str) -> Result<Scenario> {
        Ok(serde_json::from_str(content)?)
    }

    /// Expand files, directories and glob patterns into scenario file paths
    ///
    /// Directories contribute their direct `.yaml`, `.yml` and `.json`
    /// children in name order. Duplicates are dropped, first occurrence wins.
    pub fn discover(inputs: &[String]) -> Result<Vec<PathBuf>> {
        let mut paths: Vec<PathBuf> = Vec::new();

        for input in inputs {
            let path = Path::new(input);

            let found = if path.is_dir() {
                scenario_files_in(path)?
            } else if path.exists() {
                vec![path.to_path_buf()]
            } else if is_glob(input) {
                let matches = glob::glob(input)
                    .map_err(|e| Error::Pattern(format!("{}: {}", input, e)))?
                    .filter_map(|entry| entry.ok())
                    .filter(|p| p.is_file() && has_scenario_extension(p))
                    .collect::<Vec<_>>();
                if matches.is_empty() {
                    return Err(Error::Pattern(format!("{} matched no scenario files", input)));
                }
                matches
            } else {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} does not exist", input),
                )));
            };

            for p in found {
                if !paths.contains(&p) {
                    paths.push(p);
                }
            }
        }

        Ok(paths)
    }

    /// Discover and load every scenario named by `inputs`
    pub fn load_all(inputs: &[String]) -> Result<Vec<Scenario>> {
        Self::discover(inputs)?
            .iter()
            .map(|path| {
                Self::from_file(path).map_err(|source| Error::File {
                    path: path.clone(),
                    source: Box::new(source),
                })
            })
            .collect()
    }
}

fn scenario_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && has_scenario_extension(p))
        .collect::<Vec<_>>();
    files.sort();
    Ok(files)
}

fn has_scenario_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SCENARIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn is_glob(input: &str) -> bool {
    input.contains(['*', '?', '['])
}
