//! Batch front end for the segmentation pipeline: configuration file
//! loading and the worker-pool job queue.

pub mod queue;

use std::fs;
use std::path::Path;

use segmentation::PipelineConfig;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Unsupported config format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// Load a [`PipelineConfig`] from a TOML or JSON file. Missing keys
/// fall back to the defaults, so partial files are fine.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig, CliError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => Ok(toml::from_str(&content)?),
        Some("json") => Ok(serde_json::from_str(&content)?),
        _ => Err(CliError::UnsupportedFileFormat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use segmentation::ChannelColor;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn toml_config_loads_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "config.toml",
            "nuclei_channel = \"red\"\nmin_fiber_intensity = 40\n",
        );

        let config = load_config(&path).unwrap();
        assert_eq!(config.nuclei_channel, ChannelColor::Red);
        assert_eq!(config.min_fiber_intensity, 40);
        assert_eq!(config.max_fiber_intensity, 255);
    }

    #[test]
    fn json_config_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "config.json", r#"{"min_nuclei_per_fiber": 7}"#);

        let config = load_config(&path).unwrap();
        assert_eq!(config.min_nuclei_per_fiber, 7);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "config.yaml", "min_fiber_intensity: 40");

        assert!(matches!(
            load_config(&path),
            Err(CliError::UnsupportedFileFormat)
        ));
    }
}
