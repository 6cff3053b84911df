//! The `glint.toml` project file.
//!
//! ```toml
//! [compiler]
//! spirv_version = "1.3"
//! debug_names = true
//!
//! [include]
//! paths = ["shaders/include", "third_party/glsl"]
//!
//! [defines]
//! QUALITY = "2"
//! ```
//!
//! Relative include paths are taken relative to the directory holding the
//! project file.

use std::path::{Path, PathBuf};

use fxhash::FxHashMap;
use glint_compiler::CompilerConfig;
use serde::Deserialize;

use crate::error::{convert_io_error, CliError};
use crate::utils::{find_project_root, PROJECT_FILE};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub compiler: CompilerConfig,
    pub include: IncludeSection,
    pub defines: FxHashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IncludeSection {
    pub paths: Vec<String>,
}

impl ProjectConfig {
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| convert_io_error(e, path.to_path_buf(), "reading project file"))?;
        let mut config: ProjectConfig = toml::from_str(&text).map_err(|source| CliError::ConfigError {
            path: path.to_path_buf(),
            source,
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.include.paths = config
            .include
            .paths
            .iter()
            .map(|dir| rebase(base, dir))
            .collect();

        log::debug!("loaded project file {}", path.display());
        Ok(config)
    }

    /// Loads the project file above `start`, or the defaults if there is none.
    pub fn discover(start: &Path) -> Result<Self, CliError> {
        match find_project_root(start) {
            Some(root) => Self::load(&root.join(PROJECT_FILE)),
            None => {
                log::debug!("no {} found above {}", PROJECT_FILE, start.display());
                Ok(Self::default())
            }
        }
    }

    /// Macro definitions in a stable order.
    pub fn sorted_defines(&self) -> Vec<(String, String)> {
        let mut defines: Vec<_> = self
            .defines
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        defines.sort();
        defines
    }
}

fn rebase(base: &Path, dir: &str) -> String {
    let path = PathBuf::from(dir);
    if path.is_absolute() || base.as_os_str().is_empty() {
        dir.to_string()
    } else {
        base.join(path).to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_compiler::SpirvVersion;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_full_project_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(PROJECT_FILE);
        fs::write(
            &path,
            r#"
[compiler]
spirv_version = "1.3"
debug_names = true

[include]
paths = ["include", "/abs/glsl"]

[defines]
B = "2"
A = "1"
"#,
        )
        .unwrap();

        let config = ProjectConfig::load(&path).unwrap();
        assert_eq!(config.compiler.spirv_version, SpirvVersion::new(1, 3));
        assert!(config.compiler.debug_names);
        assert_eq!(
            config.include.paths,
            vec![
                temp_dir.path().join("include").to_string_lossy().into_owned(),
                "/abs/glsl".to_string(),
            ]
        );
        assert_eq!(
            config.sorted_defines(),
            vec![("A".into(), "1".into()), ("B".into(), "2".into())]
        );
    }

    #[test]
    fn test_empty_project_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(PROJECT_FILE);
        fs::write(&path, "").unwrap();

        let config = ProjectConfig::load(&path).unwrap();
        assert_eq!(config.compiler, CompilerConfig::default());
        assert!(config.include.paths.is_empty());
        assert!(config.defines.is_empty());
    }

    #[test]
    fn test_invalid_project_file_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(PROJECT_FILE);
        fs::write(&path, "[compiler]\nspirv_version = 3\n").unwrap();

        let err = ProjectConfig::load(&path).unwrap_err();
        assert!(matches!(err, CliError::ConfigError { .. }));
    }
}
