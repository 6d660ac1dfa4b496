//! `inkstone checksum`: print the CRC-32 of files.

use std::path::Path;

use inkstone_common::checksum_of_file;

use crate::{ChecksumArgs, GlobalArgs};

/// Runs the `inkstone checksum` command.
///
/// Prints `<crc>  <path>` for each file. Returns 1 if any file could not be
/// read.
pub fn run(args: &ChecksumArgs, _global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let mut failed = false;
    for file in &args.files {
        match checksum_line(Path::new(file)) {
            Ok(line) => println!("{line}"),
            Err(e) => {
                eprintln!("error: {e}");
                failed = true;
            }
        }
    }
    Ok(if failed { 1 } else { 0 })
}

fn checksum_line(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    let crc = checksum_of_file(path)?;
    Ok(format!("{crc:08x}  {}", path.display()))
}
