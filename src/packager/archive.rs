//! Zip archive of a finished output directory

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::{DocpackError, Result};
use crate::path_utils::to_forward_slashes;

/// Archive path for an output directory: `<out>.zip` next to it
pub fn archive_path(output_dir: &Path) -> PathBuf {
    let mut name = output_dir
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "bundle".into());
    name.push(".zip");
    output_dir.with_file_name(name)
}

/// Zip every file below `output_dir` into `destination`
///
/// Entries are named relative to the output directory with forward slashes
/// and added in sorted order. The archive is written to a temporary file
/// and moved into place once complete.
pub fn create_zip(output_dir: &Path, destination: &Path) -> Result<PathBuf> {
    let failed = |reason: String| DocpackError::ArchiveFailed {
        path: destination.display().to_string(),
        reason,
    };

    let parent = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let temp = tempfile::NamedTempFile::new_in(parent).map_err(|e| failed(e.to_string()))?;

    let mut zip = ZipWriter::new(BufWriter::new(temp.as_file()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut entries = 0usize;
    for entry in WalkDir::new(output_dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(output_dir)
            .map_err(|e| failed(e.to_string()))?;
        let name = to_forward_slashes(relative);

        zip.start_file(name, options)
            .map_err(|e| failed(e.to_string()))?;
        let mut reader = BufReader::new(
            File::open(entry.path()).map_err(|e| failed(format!("{}: {e}", entry.path().display())))?,
        );
        io::copy(&mut reader, &mut zip).map_err(|e| failed(e.to_string()))?;
        entries += 1;
    }

    zip.finish()
        .map_err(|e| failed(e.to_string()))?
        .into_inner()
        .map_err(|e| failed(e.error().to_string()))?;
    temp.persist(destination)
        .map_err(|e| failed(e.error.to_string()))?;

    debug!(
        archive = %destination.display(),
        entries,
        "wrote zip archive"
    );
    Ok(destination.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn test_archive_path_is_sibling() {
        assert_eq!(
            archive_path(Path::new("/tmp/out/handbook")),
            PathBuf::from("/tmp/out/handbook.zip")
        );
    }

    #[test]
    fn test_create_zip_contains_every_file() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("bundle");
        std::fs::create_dir_all(out.join("docs")).unwrap();
        std::fs::write(out.join("start.md"), "# Start\n").unwrap();
        std::fs::write(out.join("docs/api.md"), "# API\n").unwrap();

        let zip_path = create_zip(&out, &archive_path(&out)).unwrap();
        assert!(zip_path.ends_with("bundle.zip"));

        let mut archive = zip::ZipArchive::new(File::open(&zip_path).unwrap()).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["docs/api.md", "start.md"]);

        let mut content = String::new();
        archive
            .by_name("docs/api.md")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "# API\n");
    }
}
