use crate::error::{CompilerError, CompilerResult, IoError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Highest SPIR-V minor version the engine can target.
pub const MAX_SPIRV_MINOR: u8 = 6;

/// Include nesting limit used when none is configured.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 32;

/// Engine configuration fixed for the lifetime of a [`Compiler`](crate::Compiler).
///
/// Loaded from the `[compiler]` table of a project file, for example:
///
/// ```toml
/// spirv_version = "1.3"
/// debug_names = true
/// max_include_depth = 16
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// SPIR-V version written into module headers
    pub spirv_version: SpirvVersion,

    /// Emit `OpName` debug names for functions and variables
    pub debug_names: bool,

    /// Maximum nesting of `#include` directives
    pub max_include_depth: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            spirv_version: SpirvVersion::default(),
            debug_names: false,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }
}

impl CompilerConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> CompilerResult<Self> {
        let config: CompilerConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a configuration file.
    pub fn load(path: impl AsRef<Path>) -> CompilerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| CompilerError::ConfigRead {
            path: path.to_path_buf(),
            source: IoError(err),
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks that the engine can honor this configuration.
    pub fn validate(&self) -> CompilerResult<()> {
        if self.spirv_version.major != 1 || self.spirv_version.minor > MAX_SPIRV_MINOR {
            return Err(CompilerError::UnsupportedTarget(self.spirv_version));
        }
        if self.max_include_depth == 0 {
            return Err(CompilerError::InvalidIncludeDepth);
        }
        Ok(())
    }
}

/// A SPIR-V version, written `"major.minor"` in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SpirvVersion {
    pub major: u8,
    pub minor: u8,
}

impl SpirvVersion {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl Default for SpirvVersion {
    fn default() -> Self {
        Self::new(1, 0)
    }
}

impl fmt::Display for SpirvVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for SpirvVersion {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let (major, minor) = text
            .trim()
            .split_once('.')
            .ok_or_else(|| format!("expected a version like \"1.3\", found \"{text}\""))?;
        let major = major
            .parse()
            .map_err(|_| format!("invalid major version \"{major}\""))?;
        let minor = minor
            .parse()
            .map_err(|_| format!("invalid minor version \"{minor}\""))?;
        Ok(Self { major, minor })
    }
}

impl TryFrom<String> for SpirvVersion {
    type Error = String;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        text.parse()
    }
}

impl From<SpirvVersion> for String {
    fn from(version: SpirvVersion) -> Self {
        version.to_string()
    }
}
