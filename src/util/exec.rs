//! Utilities for executing external programs.

use std::{env, path::Path};

/// Returns the path of a bundled external program.
///
/// Looks up the program (a) in its absolute path, if given, (b) in the working directory,
/// and (c) as a sibling of the currently running executable.
pub(crate) fn path(file_name: &str) -> String {
    let path = Path::new(file_name).to_path_buf();
    if path.is_absolute() && path.exists() {
        return file_name.to_owned();
    }
    if path.exists() {
        return format!("./{}", file_name);
    }
    let Ok(mut exe_path) = env::current_exe() else {
        return file_name.to_owned();
    };
    exe_path.pop();
    exe_path.push(file_name);
    exe_path.to_str().unwrap_or(file_name).to_owned()
}
