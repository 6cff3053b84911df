use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};

use super::{failure, report, Session, ShaderArgs};
use crate::error::CliError;
use crate::io::{default_output_path, write_binary};

pub fn handle_compile(args: ShaderArgs, output: Option<PathBuf>) -> Result<(), CliError> {
    if output.is_some() && args.files.len() > 1 {
        return Err(CliError::OutputWithManyInputs);
    }

    let session = Session::prepare(&args)?;
    let total = args.files.len();

    let progress = if total > 1 {
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}") {
            bar.set_style(style);
        }
        bar
    } else {
        ProgressBar::hidden()
    };

    let mut failed = 0;
    for file in &args.files {
        progress.set_message(file.display().to_string());

        let result = session.compile_file(file).and_then(|module| {
            if !module.success() {
                return Err(failure(file, &module));
            }
            let destination = output.clone().unwrap_or_else(|| default_output_path(file));
            write_binary(&destination, module.as_bytes())?;
            log::info!("wrote {} ({} bytes)", destination.display(), module.len());
            Ok(())
        });

        if let Err(err) = result {
            failed += 1;
            progress.suspend(|| report(err));
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    if failed > 0 {
        return Err(CliError::BuildFailed { failed, total });
    }
    println!("Compiled {} shader{}", total, if total == 1 { "" } else { "s" });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn args(files: Vec<PathBuf>) -> ShaderArgs {
        ShaderArgs {
            files,
            stage: None,
            entry: "main".to_string(),
            include_dirs: Vec::new(),
            defines: Vec::new(),
            config: None,
        }
    }

    #[test]
    fn test_compile_writes_spirv_next_to_input() {
        let temp_dir = TempDir::new().unwrap();
        let shader = temp_dir.path().join("a.frag");
        fs::write(&shader, "void main(){}").unwrap();

        handle_compile(args(vec![shader.clone()]), None).unwrap();

        let bytes = fs::read(default_output_path(&shader)).unwrap();
        assert!(bytes.len() >= 20);
        assert_eq!(&bytes[..4], &0x0723_0203u32.to_ne_bytes());
    }

    #[test]
    fn test_compile_uses_project_includes_and_defines() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("inc")).unwrap();
        fs::write(
            temp_dir.path().join("glint.toml"),
            "[include]\npaths = [\"inc\"]\n[defines]\nHAS_MAIN = \"1\"\n",
        )
        .unwrap();
        fs::write(
            temp_dir.path().join("inc/entry.glsl"),
            "#ifdef HAS_MAIN\nvoid main(){}\n#endif\n",
        )
        .unwrap();
        let shader = temp_dir.path().join("b.vert");
        fs::write(&shader, "#include <entry.glsl>\n").unwrap();

        let output = temp_dir.path().join("out/b.spv");
        handle_compile(args(vec![shader]), Some(output.clone())).unwrap();
        assert!(output.is_file());
    }

    #[test]
    fn test_compile_failures_are_counted() {
        let temp_dir = TempDir::new().unwrap();
        let good = temp_dir.path().join("good.vert");
        let bad = temp_dir.path().join("bad.vert");
        fs::write(&good, "void main(){}").unwrap();
        fs::write(&bad, "jfalkds").unwrap();

        let err = handle_compile(args(vec![good.clone(), bad.clone()]), None).unwrap_err();
        assert!(matches!(err, CliError::BuildFailed { failed: 1, total: 2 }));
        assert!(default_output_path(&good).is_file());
        assert!(!default_output_path(&bad).exists());
    }

    #[test]
    fn test_output_requires_single_input() {
        let err = handle_compile(
            args(vec![PathBuf::from("a.vert"), PathBuf::from("b.vert")]),
            Some(PathBuf::from("out.spv")),
        )
        .unwrap_err();
        assert!(matches!(err, CliError::OutputWithManyInputs));
    }
}
