use std::fs::File;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Archive kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    /// Single or multi-part (`.part01.rar`, `.part02.rar`, ...) RAR.
    Rar,
}

impl ArchiveKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "zip" => Some(ArchiveKind::Zip),
            "rar" => Some(ArchiveKind::Rar),
            _ => None,
        }
    }
}

/// Outcome of one [`extract`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractReport {
    pub archive_found: bool,
    /// Files written this run, in archive order.
    pub extracted: Vec<PathBuf>,
    /// Matching members left alone because the output already existed.
    pub kept: usize,
    /// Members rejected by the pattern.
    pub filtered_out: usize,
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Unpack members of `archive` whose name matches `pattern` into `dest`,
/// flattening any directory structure.
///
/// The output name is capture group 1 of the match (with `/` turned into
/// `_`) when the pattern has a group, else the member's base name. A
/// missing archive is reported and yields an empty report.
pub fn extract(
    archive: &Path,
    dest: &Path,
    pattern: &Regex,
    overwrite: bool,
) -> Result<ExtractReport> {
    if !archive.is_file() {
        log::warn!("Archive {} not found, nothing to extract", archive.display());
        return Ok(ExtractReport::default());
    }
    std::fs::create_dir_all(dest).map_err(|e| Error::io(dest, e))?;

    let kind = ArchiveKind::from_path(archive).ok_or_else(|| {
        Error::archive(archive, "unknown archive type (expected .zip or .rar)")
    })?;
    log::info!("Extracting {} into {}", archive.display(), dest.display());

    let mut report = ExtractReport {
        archive_found: true,
        ..Default::default()
    };
    match kind {
        ArchiveKind::Zip => extract_zip(archive, dest, pattern, overwrite, &mut report)?,
        ArchiveKind::Rar => extract_rar(archive, dest, pattern, overwrite, &mut report)?,
    }

    log::info!(
        "{}: {} extracted, {} already present, {} filtered out",
        archive.display(),
        report.extracted.len(),
        report.kept,
        report.filtered_out
    );
    Ok(report)
}

/// Flattened output name for a member, or `None` when it is filtered out.
pub fn output_name(member: &str, pattern: &Regex) -> Option<String> {
    let member = member.replace('\\', "/");
    let caps = pattern.captures(&member)?;
    let name = match caps.get(1) {
        Some(group) => group.as_str().replace('/', "_"),
        None => member.rsplit('/').next().unwrap_or(&member).to_string(),
    };
    (!name.is_empty()).then_some(name)
}

/// Scratch file in `dest` that members are written to before being renamed
/// into place, so a failed copy never leaves a partial output behind.
fn stage(dest: &Path) -> Result<tempfile::NamedTempFile> {
    tempfile::Builder::new()
        .prefix(".extract-")
        .tempfile_in(dest)
        .map_err(|e| Error::io(dest, e))
}

/// Where a matching member should go, or `None` if it is already there.
fn target(dest: &Path, name: &str, overwrite: bool, report: &mut ExtractReport) -> Option<PathBuf> {
    let out = dest.join(name);
    if out.exists() && !overwrite {
        log::debug!("{} exists, keeping it", out.display());
        report.kept += 1;
        return None;
    }
    Some(out)
}

// ---------------------------------------------------------------------------
// ZIP
// ---------------------------------------------------------------------------

fn extract_zip(
    archive: &Path,
    dest: &Path,
    pattern: &Regex,
    overwrite: bool,
    report: &mut ExtractReport,
) -> Result<()> {
    let file = File::open(archive).map_err(|e| Error::io(archive, e))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| Error::archive(archive, e.to_string()))?;

    for i in 0..zip.len() {
        let mut member = zip
            .by_index(i)
            .map_err(|e| Error::archive(archive, e.to_string()))?;
        if member.is_dir() {
            continue;
        }
        let Some(name) = output_name(member.name(), pattern) else {
            report.filtered_out += 1;
            continue;
        };
        let Some(out) = target(dest, &name, overwrite, report) else {
            continue;
        };
        let mut staged = stage(dest)?;
        std::io::copy(&mut member, &mut staged).map_err(|e| Error::io(&out, e))?;
        staged.persist(&out).map_err(|e| Error::io(&out, e.error))?;
        report.extracted.push(out);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// RAR
// ---------------------------------------------------------------------------

#[cfg(feature = "rar")]
fn extract_rar(
    archive: &Path,
    dest: &Path,
    pattern: &Regex,
    overwrite: bool,
    report: &mut ExtractReport,
) -> Result<()> {
    let rar_err = rar_error(archive);

    // Later volumes of a multi-part set are picked up from the same directory.
    let mut open = unrar::Archive::new(archive)
        .open_for_processing()
        .map_err(rar_err)?;
    while let Some(header) = open.read_header().map_err(rar_err)? {
        let entry = header.entry();
        let member = entry.filename.to_string_lossy().into_owned();
        let out = if entry.is_file() {
            match output_name(&member, pattern) {
                Some(name) => target(dest, &name, overwrite, report),
                None => {
                    report.filtered_out += 1;
                    None
                }
            }
        } else {
            None
        };

        open = match out {
            Some(out) => {
                let staged = stage(dest)?.into_temp_path();
                let next = header.extract_to(&staged).map_err(rar_err)?;
                staged.persist(&out).map_err(|e| Error::io(&out, e.error))?;
                report.extracted.push(out);
                next
            }
            None => header.skip().map_err(rar_err)?,
        };
    }
    Ok(())
}

#[cfg(feature = "rar")]
fn rar_error<E: std::fmt::Display>(archive: &Path) -> impl Fn(E) -> Error + Copy + '_ {
    move |e| Error::archive(archive, e.to_string())
}

#[cfg(not(feature = "rar"))]
fn extract_rar(
    archive: &Path,
    _dest: &Path,
    _pattern: &Regex,
    _overwrite: bool,
    _report: &mut ExtractReport,
) -> Result<()> {
    Err(Error::archive(
        archive,
        "rar support not enabled (rebuild with --features rar)",
    ))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;

    use super::*;

    fn write_zip(path: &Path, members: &[(&str, &str)]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        writer.add_directory("sub/", options).unwrap();
        for (name, body) in members {
            writer.start_file(*name, options).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    fn listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn extracts_matching_members_flattened() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("raw.zip");
        write_zip(
            &archive,
            &[("a.mat", "A"), ("b.csv", "B"), ("sub/c.mat", "C")],
        );
        let dest = dir.path().join("out");

        let report = extract(&archive, &dest, &Regex::new(r"\.mat$").unwrap(), false).unwrap();
        assert!(report.archive_found);
        assert_eq!(report.extracted.len(), 2);
        assert_eq!(report.filtered_out, 1);
        assert_eq!(listing(&dest), ["a.mat", "c.mat"]);
        assert_eq!(std::fs::read_to_string(dest.join("c.mat")).unwrap(), "C");
    }

    #[test]
    fn capture_group_names_output_and_existing_files_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("xjtu.zip");
        write_zip(
            &archive,
            &[
                ("XJTU-SY/35Hz12kN/Bearing1_1/1.csv", "new"),
                ("XJTU-SY/35Hz12kN/Bearing1_2/1.csv", "new"),
            ],
        );
        let dest = dir.path().join("out");
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("Bearing1_1_1.csv"), b"old").unwrap();

        let pattern = Regex::new(r"(Bearing\d_\d/\d+\.csv)$").unwrap();
        let report = extract(&archive, &dest, &pattern, false).unwrap();
        assert_eq!(report.kept, 1);
        assert_eq!(listing(&dest), ["Bearing1_1_1.csv", "Bearing1_2_1.csv"]);
        assert_eq!(std::fs::read_to_string(dest.join("Bearing1_1_1.csv")).unwrap(), "old");

        extract(&archive, &dest, &pattern, true).unwrap();
        assert_eq!(std::fs::read_to_string(dest.join("Bearing1_1_1.csv")).unwrap(), "new");
    }

    #[test]
    fn corrupt_member_leaves_nothing_behind() {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        zip.start_file("a.mat", options).unwrap();
        zip.write_all(b"GOOD-PAYLOAD-GOOD-PAYLOAD").unwrap();
        let mut bytes = zip.finish().unwrap().into_inner();
        // Flip the first stored byte so the CRC no longer matches.
        let at = bytes.windows(4).position(|w| w == b"GOOD").unwrap();
        bytes[at] = b'X';

        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bad.zip");
        std::fs::write(&archive, &bytes).unwrap();
        let dest = dir.path().join("out");
        let pattern = Regex::new(r"\.mat$").unwrap();

        assert!(extract(&archive, &dest, &pattern, false).is_err());
        assert!(!dest.join("a.mat").exists());
        assert!(listing(&dest).is_empty());

        // A rerun tries again instead of trusting a half-written file.
        assert!(extract(&archive, &dest, &pattern, false).is_err());
        assert!(listing(&dest).is_empty());
    }

    #[test]
    fn missing_archive_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let report = extract(
            &dir.path().join("absent.zip"),
            &dir.path().join("out"),
            &Regex::new(".*").unwrap(),
            false,
        )
        .unwrap();
        assert!(!report.archive_found);
        assert!(report.extracted.is_empty());
    }

    #[test]
    fn output_name_normalizes_separators() {
        let pattern = Regex::new(r"([^/]+\.mat)$").unwrap();
        assert_eq!(output_name(r"HUST\raw\IB504.mat", &pattern).as_deref(), Some("IB504.mat"));
        assert_eq!(output_name("notes.txt", &pattern), None);
    }
}
