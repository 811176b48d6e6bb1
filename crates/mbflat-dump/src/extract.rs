//! Dump archive extraction.
//!
//! Each dump archive is a `.tar.xz` carrying a single NDJSON member at
//! `mbdump/<entity>`. Extraction streams the member straight to
//! `<dest>/<entity>` through a temporary file, so a crash never leaves a
//! half-written dump visible.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tar::Archive;
use tracing::{info, warn};
use xz2::read::XzDecoder;

use crate::error::{DumpError, Result};

/// Extract the `mbdump/<entity>` member of `archive` to `<dest>/<entity>`.
///
/// Idempotent: an existing non-empty target is left untouched. A failed
/// extraction removes its partial output and is retried once before the
/// error surfaces.
pub fn extract_entity(archive: &Path, dest: &Path, entity: &str) -> Result<PathBuf> {
    if !archive.exists() {
        return Err(DumpError::ArchiveNotFound(archive.to_path_buf()));
    }

    let target = dest.join(entity);
    if target.metadata().map(|m| m.len() > 0).unwrap_or(false) {
        info!("{} already extracted, skipping", target.display());
        return Ok(target);
    }

    match extract_member(archive, &target, entity) {
        Ok(()) => Ok(target),
        Err(err) => {
            warn!(
                "Extraction of {} failed ({err}), retrying once",
                archive.display()
            );
            let _ = fs::remove_file(&target);
            extract_member(archive, &target, entity).map_err(|retry_err| {
                warn!(
                    "Retry extraction of {} failed: {retry_err}",
                    archive.display()
                );
                let _ = fs::remove_file(&target);
                DumpError::ExtractionFailed(archive.to_path_buf())
            })?;
            Ok(target)
        }
    }
}

/// Run `f` over a streaming reader of the archive's `mbdump/<entity>`
/// member, without ever materializing the decompressed archive.
///
/// This is how the release dump is consumed: the member is located inside
/// the tar stream and handed to the caller as a plain reader.
pub fn with_member_stream<T>(
    archive: &Path,
    entity: &str,
    f: impl FnOnce(&mut dyn io::Read) -> Result<T>,
) -> Result<T> {
    if !archive.exists() {
        return Err(DumpError::ArchiveNotFound(archive.to_path_buf()));
    }

    let member_path = format!("mbdump/{entity}");
    let file = File::open(archive)?;
    let mut tar = Archive::new(XzDecoder::new(file));

    for entry in tar.entries()? {
        let mut entry = entry?;
        let matches = entry
            .path()
            .map(|p| p.as_os_str() == member_path.as_str())
            .unwrap_or(false);
        if matches {
            return f(&mut entry);
        }
    }

    Err(DumpError::MemberNotFound {
        member: member_path,
        archive: archive.to_path_buf(),
    })
}

fn extract_member(archive: &Path, target: &Path, entity: &str) -> Result<()> {
    info!(
        "Extracting mbdump/{entity} from {} to {}",
        archive.display(),
        target.display()
    );

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = target.with_extension("extract-tmp");

    let result = with_member_stream(archive, entity, |reader| {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        let bytes = io::copy(reader, &mut writer)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        info!("Extracted {bytes} bytes for {entity}");
        Ok(())
    });

    match result {
        Ok(()) => {
            fs::rename(&tmp, target)?;
            Ok(())
        }
        Err(err) => {
            let _ = fs::remove_file(&tmp);
            Err(err)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Read;
    use xz2::write::XzEncoder;

    /// Build a `.tar.xz` fixture containing `mbdump/<entity>`.
    pub(crate) fn write_archive(path: &Path, entity: &str, contents: &[u8]) {
        let file = File::create(path).unwrap();
        let xz = XzEncoder::new(file, 6);
        let mut builder = tar::Builder::new(xz);

        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("mbdump/{entity}"), contents)
            .unwrap();

        let xz = builder.into_inner().unwrap();
        xz.finish().unwrap().sync_all().unwrap();
    }

    #[test]
    fn extracts_member_and_skips_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("artist.tar.xz");
        write_archive(&archive, "artist", b"{\"id\":\"a1\"}\n");

        let target = extract_entity(&archive, dir.path(), "artist").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"{\"id\":\"a1\"}\n");

        // A second run must not rewrite the file.
        let mtime = fs::metadata(&target).unwrap().modified().unwrap();
        extract_entity(&archive, dir.path(), "artist").unwrap();
        assert_eq!(fs::metadata(&target).unwrap().modified().unwrap(), mtime);
    }

    #[test]
    fn missing_archive_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_entity(&dir.path().join("none.tar.xz"), dir.path(), "artist");
        assert!(matches!(err, Err(DumpError::ArchiveNotFound(_))));
    }

    #[test]
    fn corrupt_archive_fails_after_retry() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("artist.tar.xz");
        fs::write(&archive, b"not an xz stream").unwrap();

        let err = extract_entity(&archive, dir.path(), "artist");
        assert!(matches!(err, Err(DumpError::ExtractionFailed(_))));
        assert!(!dir.path().join("artist").exists());
    }

    #[test]
    fn member_stream_reads_without_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("release.tar.xz");
        write_archive(&archive, "release", b"{\"id\":\"r1\"}\n{\"id\":\"r2\"}\n");

        let contents = with_member_stream(&archive, "release", |reader| {
            let mut buf = String::new();
            reader.read_to_string(&mut buf)?;
            Ok(buf)
        })
        .unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(!dir.path().join("release").exists());
    }

    #[test]
    fn wrong_member_name_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("artist.tar.xz");
        write_archive(&archive, "artist", b"{}\n");

        let err = with_member_stream(&archive, "release", |_| Ok(()));
        assert!(matches!(err, Err(DumpError::MemberNotFound { .. })));
    }
}
