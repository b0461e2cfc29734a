//! Miscellaneous utilities.

use std::{fs, io, io::Read};

pub(crate) mod exec;

/// Reads the full contents of `file_name`, or of standard input when it is
/// `-` (`spec.md` §6's input format accepts either).
pub(crate) fn read_file(file_name: &str) -> io::Result<String> {
    if file_name == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        fs::read_to_string(file_name)
    }
}
