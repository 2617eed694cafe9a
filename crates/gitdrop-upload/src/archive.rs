//! Archive expansion.
//!
//! Flattens uploaded files into `(relative path, bytes)` entries. Zip
//! archives contribute one entry per regular file inside them; everything
//! else passes through under its original name.

use std::io::{Cursor, Read};

use crate::error::{UploadError, UploadResult};
use crate::request::InputFile;

/// Resource-fork directory macOS adds to archives it creates.
const MACOS_RESOURCE_FORK: &str = "__MACOSX";

/// A file ready to be written into the workspace.
#[derive(Clone, PartialEq, Eq)]
pub struct MaterializedFile {
    /// Destination relative to the repository root, `/`-separated.
    pub path: String,
    /// Bytes to write.
    pub content: Vec<u8>,
}

impl std::fmt::Debug for MaterializedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterializedFile")
            .field("path", &self.path)
            .field("bytes", &self.content.len())
            .finish()
    }
}

/// Per-archive extraction limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveLimits {
    /// Maximum number of entries (including skipped ones) in one archive.
    pub max_entries: usize,
    /// Maximum total uncompressed size of one archive.
    pub max_extracted_bytes: u64,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            max_extracted_bytes: 500_000_000,
        }
    }
}

/// Expand `files` into materialized entries, unpacking zip archives.
///
/// # Errors
///
/// Returns [`UploadError::FileProcessing`] naming the archive if it is
/// malformed or exceeds `limits`. Nothing from that archive is returned.
pub fn expand(files: Vec<InputFile>, limits: &ArchiveLimits) -> UploadResult<Vec<MaterializedFile>> {
    let mut out = Vec::with_capacity(files.len());
    for file in files {
        if file.is_zip() {
            let entries = expand_zip(&file, limits)?;
            tracing::debug!(archive = %file.name, entries = entries.len(), "Expanded archive");
            out.extend(entries);
        } else {
            out.push(MaterializedFile {
                path: file.name,
                content: file.content,
            });
        }
    }
    Ok(out)
}

fn expand_zip(file: &InputFile, limits: &ArchiveLimits) -> UploadResult<Vec<MaterializedFile>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(file.content.as_slice()))
        .map_err(|e| UploadError::file(&file.name, format!("invalid zip archive: {e}")))?;

    if archive.len() > limits.max_entries {
        return Err(UploadError::file(
            &file.name,
            format!(
                "archive has {} entries (maximum {})",
                archive.len(),
                limits.max_entries
            ),
        ));
    }

    let mut entries = Vec::new();
    let mut total: u64 = 0;
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| UploadError::file(&file.name, format!("unreadable entry: {e}")))?;
        let name = entry.name().to_owned();
        if entry.is_dir() || is_skipped_entry(&name) {
            continue;
        }

        // Read at most one byte past the budget so an understated header
        // size cannot bypass the limit.
        let remaining = limits.max_extracted_bytes.saturating_sub(total);
        let mut content = Vec::new();
        entry
            .by_ref()
            .take(remaining.saturating_add(1))
            .read_to_end(&mut content)
            .map_err(|e| UploadError::file(&file.name, format!("failed to read {name}: {e}")))?;
        total = total.saturating_add(u64::try_from(content.len()).unwrap_or(u64::MAX));
        if total > limits.max_extracted_bytes {
            return Err(UploadError::file(
                &file.name,
                format!(
                    "archive exceeds maximum extracted size ({} bytes)",
                    limits.max_extracted_bytes
                ),
            ));
        }

        entries.push(MaterializedFile {
            path: name,
            content,
        });
    }
    Ok(entries)
}

/// Resource forks and entries whose path starts with a dot never leave the archive.
fn is_skipped_entry(name: &str) -> bool {
    name.contains(MACOS_RESOURCE_FORK) || name.starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn build_zip(entries: &[(&str, &[u8])], dirs: &[&str]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        for dir in dirs {
            writer.add_directory(*dir, options).unwrap();
        }
        for (name, data) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn filters_hidden_and_resource_fork_entries() {
        let zip = build_zip(
            &[
                ("a.txt", b"alpha\x00\xff"),
                (".env", b"SECRET=1"),
                ("__MACOSX/a.txt", b"fork"),
            ],
            &["dir/"],
        );
        let out = expand(
            vec![InputFile::new("bundle.zip", zip)],
            &ArchiveLimits::default(),
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path, "a.txt");
        assert_eq!(out[0].content, b"alpha\x00\xff");
    }

    #[test]
    fn nested_paths_are_kept() {
        let zip = build_zip(
            &[
                ("src/app.js", b"x"),
                ("src/.gitkeep", b""),
                ("config/.env.example", b"PORT=80"),
                (".env", b"SECRET=1"),
            ],
            &[],
        );
        let out = expand(
            vec![InputFile::new("upload", zip).with_media_type("application/zip")],
            &ArchiveLimits::default(),
        )
        .unwrap();
        let paths: Vec<_> = out.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, ["src/app.js", "src/.gitkeep", "config/.env.example"]);
    }

    #[test]
    fn plain_files_pass_through() {
        let out = expand(
            vec![
                InputFile::new("README.md", b"Hello".to_vec()),
                InputFile::new("docs/guide.md", b"Guide".to_vec()),
            ],
            &ArchiveLimits::default(),
        )
        .unwrap();
        let paths: Vec<_> = out.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, ["README.md", "docs/guide.md"]);
    }

    #[test]
    fn malformed_archive_names_the_file() {
        let err = expand(
            vec![
                InputFile::new("ok.txt", b"fine".to_vec()),
                InputFile::new("broken.zip", b"not a zip".to_vec()),
            ],
            &ArchiveLimits::default(),
        )
        .unwrap_err();
        match err {
            UploadError::FileProcessing { file, .. } => assert_eq!(file, "broken.zip"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn entry_limit() {
        let zip = build_zip(&[("a", b"1"), ("b", b"2"), ("c", b"3")], &[]);
        let limits = ArchiveLimits {
            max_entries: 2,
            ..ArchiveLimits::default()
        };
        let err = expand(vec![InputFile::new("x.zip", zip)], &limits).unwrap_err();
        assert!(err.to_string().contains("entries"));
    }

    #[test]
    fn size_limit() {
        let zip = build_zip(&[("a", &[0u8; 64]), ("b", &[0u8; 64])], &[]);
        let limits = ArchiveLimits {
            max_extracted_bytes: 100,
            ..ArchiveLimits::default()
        };
        let err = expand(vec![InputFile::new("x.zip", zip)], &limits).unwrap_err();
        assert!(err.to_string().contains("maximum extracted size"));
    }
}
