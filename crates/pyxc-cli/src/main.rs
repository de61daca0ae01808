use std::process::ExitCode;

use pyxc_cli::Diagnostic;

fn main() -> ExitCode {
    match pyxc_cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<Diagnostic>() {
                Some(diag) => eprintln!("{diag}"),
                None => eprintln!("error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}
