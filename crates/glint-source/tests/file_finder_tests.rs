use glint_source::{
    candidate_path, FileFinder, FileIncluder, IncludeError, IncludeKind, IncludeRequest,
    IncludeResolver,
};
use std::{collections::HashMap, fs, path::Path};
use tempfile::TempDir;

/// Relative file paths mapped to their contents.
type TestTree = HashMap<&'static str, &'static str>;

/// Writes `tree` under a fresh temporary directory.
///
/// # Panics
/// Panics if the temporary directory or any file cannot be created.
fn setup_tree(tree: TestTree) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temporary directory");
    for (relative_path, content) in tree {
        let full_path = temp_dir.path().join(relative_path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .unwrap_or_else(|e| panic!("Failed to create directory {parent:?}: {e}"));
        }
        fs::write(&full_path, content)
            .unwrap_or_else(|e| panic!("Failed to write file {full_path:?}: {e}"));
    }
    temp_dir
}

fn path_str(path: &Path) -> String {
    path.to_str().expect("temporary paths are UTF-8").to_string()
}

#[test]
fn test_first_readable_prefix_wins() {
    let tree = setup_tree(TestTree::from([
        ("first/shared.glsl", "// first"),
        ("second/shared.glsl", "// second"),
    ]));
    let first = path_str(&tree.path().join("first"));
    let second = path_str(&tree.path().join("second"));

    let finder = FileFinder::with_search_path([first.clone(), second.clone()]);
    let found = finder.find_readable_filepath("shared.glsl").expect("file should be found");
    assert_eq!(found, format!("{first}/shared.glsl"));

    let finder = FileFinder::with_search_path([second.clone(), first]);
    let found = finder.find_readable_filepath("shared.glsl").expect("file should be found");
    assert_eq!(found, format!("{second}/shared.glsl"));
}

#[test]
fn test_missing_prefixes_are_skipped() {
    let tree = setup_tree(TestTree::from([("lib/only_here.glsl", "")]));
    let missing = path_str(&tree.path().join("missing"));
    let lib = path_str(&tree.path().join("lib"));

    let finder = FileFinder::with_search_path([missing, lib.clone()]);
    assert_eq!(
        finder.find_readable_filepath("only_here.glsl"),
        Some(format!("{lib}/only_here.glsl"))
    );
}

#[test]
fn test_trailing_separator_is_not_doubled() {
    let tree = setup_tree(TestTree::from([("inc/a.h", "")]));
    let inc = format!("{}/", path_str(&tree.path().join("inc")));

    let finder = FileFinder::with_search_path([inc.clone()]);
    assert_eq!(finder.find_readable_filepath("a.h"), Some(format!("{inc}a.h")));
}

#[test]
fn test_result_is_a_candidate_of_some_prefix() {
    let tree = setup_tree(TestTree::from([("b/x.glsl", ""), ("c/x.glsl", "")]));
    let prefixes: Vec<String> = ["a", "b", "c"]
        .iter()
        .map(|dir| path_str(&tree.path().join(dir)))
        .collect();
    let finder = FileFinder::with_search_path(prefixes.clone());

    let found = finder.find_readable_filepath("x.glsl").expect("file should be found");
    assert!(prefixes
        .iter()
        .any(|prefix| candidate_path(prefix, "x.glsl") == found));
    assert!(fs::File::open(&found).is_ok());
}

#[test]
fn test_empty_prefix_tries_absolute_filename_as_is() {
    let tree = setup_tree(TestTree::from([("abs.glsl", "")]));
    let absolute = path_str(&tree.path().join("abs.glsl"));

    let finder = FileFinder::with_search_path([""]);
    assert_eq!(finder.find_readable_filepath(&absolute), Some(absolute.clone()));

    // "." makes the absolute name relative to the working directory.
    let finder = FileFinder::with_search_path(["."]);
    assert_eq!(finder.find_readable_filepath(&absolute), None);
}

#[test]
fn test_directories_are_not_readable_files() {
    let tree = setup_tree(TestTree::from([("dir/inner/file.glsl", "")]));
    let dir = path_str(&tree.path().join("dir"));

    let finder = FileFinder::with_search_path([dir]);
    assert_eq!(finder.find_readable_filepath("inner"), None);
}

#[cfg(unix)]
#[test]
fn test_unreadable_candidate_falls_through_to_next_prefix() {
    use std::os::unix::fs::PermissionsExt;

    let tree = setup_tree(TestTree::from([
        ("locked/x.glsl", "// locked"),
        ("open/x.glsl", "// open"),
    ]));
    let locked_file = tree.path().join("locked/x.glsl");
    fs::set_permissions(&locked_file, fs::Permissions::from_mode(0o000))
        .expect("Failed to change permissions");

    if fs::File::open(&locked_file).is_ok() {
        // Running with privileges that ignore file permissions.
        return;
    }

    let locked = path_str(&tree.path().join("locked"));
    let open = path_str(&tree.path().join("open"));
    let finder = FileFinder::with_search_path([locked, open.clone()]);
    assert_eq!(finder.find_readable_filepath("x.glsl"), Some(format!("{open}/x.glsl")));
}

#[test]
fn test_file_includer_prefers_requesting_directory_for_relative_includes() {
    let tree = setup_tree(TestTree::from([
        ("shaders/common.glsl", "// next to the shader"),
        ("include/common.glsl", "// on the search path"),
    ]));
    let requesting = path_str(&tree.path().join("shaders/main.frag"));
    let include_dir = path_str(&tree.path().join("include"));
    let includer = FileIncluder::new(FileFinder::with_search_path([include_dir]));

    let relative = includer
        .resolve(&IncludeRequest {
            target: "common.glsl",
            kind: IncludeKind::Relative,
            requesting_source: &requesting,
            depth: 1,
        })
        .expect("relative include should resolve");
    assert_eq!(relative.content, "// next to the shader");

    let standard = includer
        .resolve(&IncludeRequest {
            target: "common.glsl",
            kind: IncludeKind::Standard,
            requesting_source: &requesting,
            depth: 1,
        })
        .expect("standard include should resolve");
    assert_eq!(standard.content, "// on the search path");
}

#[test]
fn test_file_includer_reports_not_found() {
    let tree = setup_tree(TestTree::new());
    let includer = FileIncluder::new(FileFinder::with_search_path([path_str(tree.path())]));

    let err = includer
        .resolve(&IncludeRequest {
            target: "absent.glsl",
            kind: IncludeKind::Standard,
            requesting_source: "main.vert",
            depth: 1,
        })
        .unwrap_err();
    assert!(matches!(err, IncludeError::NotFound { ref target, .. } if target == "absent.glsl"));
}
