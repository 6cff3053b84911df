use glint_source::FileFinder;

use crate::error::CliError;

/// Prints the path `name` resolves to on the search path.
///
/// With no directories the bare name is tried.
pub fn handle_find(name: &str, include_dirs: Vec<String>) -> Result<(), CliError> {
    let path = locate(name, include_dirs)?;
    println!("{path}");
    Ok(())
}

fn locate(name: &str, include_dirs: Vec<String>) -> Result<String, CliError> {
    let finder = if include_dirs.is_empty() {
        FileFinder::with_search_path([""])
    } else {
        FileFinder::with_search_path(include_dirs)
    };

    finder.find_readable_filepath(name).ok_or_else(|| {
        let searched: Vec<String> = finder.candidates(name).collect();
        CliError::NotFound {
            name: name.to_string(),
            searched: (!searched.is_empty()).then(|| format!("Searched: {}", searched.join(", "))),
        }
    })
}
