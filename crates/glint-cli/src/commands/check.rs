use super::{failure, report, Session, ShaderArgs};
use crate::error::CliError;

/// Compiles every file without writing output.
pub fn handle_check(args: ShaderArgs) -> Result<(), CliError> {
    let session = Session::prepare(&args)?;
    let total = args.files.len();

    let mut failed = 0;
    for file in &args.files {
        match session.compile_file(file) {
            Ok(module) if module.success() => println!("ok: {}", file.display()),
            Ok(module) => {
                failed += 1;
                report(failure(file, &module));
            }
            Err(err) => {
                failed += 1;
                report(err);
            }
        }
    }

    if failed > 0 {
        return Err(CliError::BuildFailed { failed, total });
    }
    Ok(())
}
