//! Exit non-zero unless mock CN preconditions hold.
//!
//! Intended for `onlyif`-style guards in service manifests.

use std::process::ExitCode;

use mockcn_agent::onlyif::root_in_smartos_global;

fn main() -> ExitCode {
    match root_in_smartos_global() {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Fatal: cannot run because: {e}");
            ExitCode::FAILURE
        }
    }
}
