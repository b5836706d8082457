use std::process::ExitCode;

use model_viewer::{ViewerConfig, run};

fn main() -> ExitCode {
    let result = ViewerConfig::from_args(std::env::args().skip(1))
        .map_err(Into::into)
        .and_then(run);
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("model-viewer: {e}");
            ExitCode::FAILURE
        }
    }
}
