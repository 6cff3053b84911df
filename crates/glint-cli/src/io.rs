use std::path::{Path, PathBuf};

use crate::error::{convert_io_error, CliError};

pub fn read_source(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|e| convert_io_error(e, path.to_path_buf(), "reading shader"))
}

pub fn write_binary(path: &Path, bytes: &[u8]) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| convert_io_error(e, parent.to_path_buf(), "creating output directory"))?;
    }
    std::fs::write(path, bytes).map_err(|e| convert_io_error(e, path.to_path_buf(), "writing SPIR-V"))
}

/// Output path for `input` when none is given: `shader.frag` becomes `shader.frag.spv`.
pub fn default_output_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_os_string();
    name.push(".spv");
    PathBuf::from(name)
}
