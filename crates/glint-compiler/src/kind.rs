use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// The pipeline stage a shader is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderKind {
    Vertex,
    Fragment,
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 2] = [ShaderKind::Vertex, ShaderKind::Fragment];

    /// Infers the kind from a conventional file extension (`.vert`, `.frag`).
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        match path.as_ref().extension()?.to_str()? {
            "vert" => Some(ShaderKind::Vertex),
            "frag" => Some(ShaderKind::Fragment),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShaderKind::Vertex => "vertex",
            ShaderKind::Fragment => "fragment",
        }
    }
}

impl fmt::Display for ShaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShaderKind {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.to_ascii_lowercase().as_str() {
            "vertex" | "vert" => Ok(ShaderKind::Vertex),
            "fragment" | "frag" => Ok(ShaderKind::Fragment),
            other => Err(format!("unknown shader kind \"{other}\"")),
        }
    }
}

impl From<ShaderKind> for naga::ShaderStage {
    fn from(kind: ShaderKind) -> Self {
        match kind {
            ShaderKind::Vertex => naga::ShaderStage::Vertex,
            ShaderKind::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(ShaderKind::from_path("a/b.vert"), Some(ShaderKind::Vertex));
        assert_eq!(ShaderKind::from_path("b.frag"), Some(ShaderKind::Fragment));
        assert_eq!(ShaderKind::from_path("b.glsl"), None);
        assert_eq!(ShaderKind::from_path("noext"), None);
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("Vertex".parse::<ShaderKind>(), Ok(ShaderKind::Vertex));
        assert_eq!("frag".parse::<ShaderKind>(), Ok(ShaderKind::Fragment));
        assert!("compute".parse::<ShaderKind>().is_err());
    }
}
