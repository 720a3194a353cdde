use std::process::{exit, Command};

use log::error;

/// Compiles the project for the wasm target with the given cargo profile,
/// streaming cargo's output straight through. On failure this exits the
/// whole process with cargo's own exit code.
pub fn build_wasm(profile: &str) {
    let mut command = Command::new("cargo");
    command.args(["build", "--target=wasm32-unknown-unknown", "--profile", profile]);

    let status = match command.status() {
        Ok(status) => status,
        Err(err) => {
            error!("failed to run cargo: {err}");
            exit(1);
        }
    };

    if !status.success() {
        // None means the child was killed by a signal.
        let code = status.code().unwrap_or(1);
        error!("Cargo failed with exit code {code}");
        error!("Command: {command:?}");
        exit(code);
    }
}
