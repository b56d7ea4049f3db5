//! Shared access to Office Open XML packages.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use zip::result::ZipError;
use zip::ZipArchive;

use super::ExtractionError;

pub type Package<R> = ZipArchive<R>;

/// Open a package from disk.
pub fn open_package(path: &Path) -> Result<Package<BufReader<File>>, ExtractionError> {
    let file = File::open(path)?;
    Ok(ZipArchive::new(BufReader::new(file))?)
}

/// Read a part as UTF-8 text. A missing part is `None`.
pub fn read_part<R: Read + Seek>(
    package: &mut Package<R>,
    name: &str,
) -> Result<Option<String>, ExtractionError> {
    let mut entry = match package.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    Ok(Some(xml))
}

/// Read a part that must exist.
pub fn require_part<R: Read + Seek>(
    package: &mut Package<R>,
    name: &str,
) -> Result<String, ExtractionError> {
    read_part(package, name)?
        .ok_or_else(|| ExtractionError::Failed(format!("missing package part {}", name)))
}
