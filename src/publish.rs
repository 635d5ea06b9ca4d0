//! # Atomic Publishing
//!
//! The page is written to a temporary file in the scratch directory and then
//! renamed over the live file. Readers see either the previous page or the
//! new one, never a partial write.
//!
//! Temporary names are unique per run, so overlapping runs cannot clobber
//! each other's scratch file. The scratch and publish directories must be on
//! the same filesystem for the rename to be atomic.

use crate::TideError;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::{Builder, NamedTempFile};

/// Mode of the published page: owner writes, everyone reads.
#[cfg(unix)]
pub const PAGE_MODE: u32 = 0o644;

/// Writes pages through a scratch directory onto a fixed live path.
#[derive(Clone, Debug)]
pub struct Publisher {
    scratch_dir: PathBuf,
    publish_path: PathBuf,
}

impl Publisher {
    pub fn new(scratch_dir: impl Into<PathBuf>, publish_path: impl Into<PathBuf>) -> Self {
        Publisher {
            scratch_dir: scratch_dir.into(),
            publish_path: publish_path.into(),
        }
    }

    /// Replace the live page with `html`.
    ///
    /// On error the live page is left as it was and the temporary file is
    /// removed.
    pub fn publish(&self, html: &str) -> Result<&Path, TideError> {
        let mut temp = Builder::new()
            .prefix("tides-")
            .suffix(".html.tmp")
            .tempfile_in(&self.scratch_dir)
            .map_err(|e| TideError::publish(&self.scratch_dir, e))?;
        tracing::debug!(temp = %temp.path().display(), "writing page");

        let written =
            make_readable(&temp).and_then(|()| write_synced(&mut temp, html.as_bytes()));
        if let Err(e) = written {
            return Err(TideError::publish(temp.path(), e));
        }

        temp.persist(&self.publish_path)
            .map_err(|e| TideError::publish(&self.publish_path, e.error))?;

        tracing::info!(path = %self.publish_path.display(), bytes = html.len(), "published tide table");
        Ok(&self.publish_path)
    }
}

/// Scratch files start as 0600; the web server reads the page as another user.
#[cfg(unix)]
fn make_readable(file: &NamedTempFile) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.as_file()
        .set_permissions(std::fs::Permissions::from_mode(PAGE_MODE))
}

#[cfg(not(unix))]
fn make_readable(_file: &NamedTempFile) -> io::Result<()> {
    Ok(())
}

fn write_synced(file: &mut NamedTempFile, bytes: &[u8]) -> io::Result<()> {
    file.write_all(bytes)?;
    file.flush()?;
    file.as_file().sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Dirs {
        _root: TempDir,
        scratch: PathBuf,
        live: PathBuf,
    }

    fn dirs() -> Dirs {
        let root = TempDir::new().unwrap();
        let scratch = root.path().join("tmp");
        let live_dir = root.path().join("weather");
        fs::create_dir(&scratch).unwrap();
        fs::create_dir(&live_dir).unwrap();
        Dirs {
            scratch,
            live: live_dir.join("tides.html"),
            _root: root,
        }
    }

    #[test]
    fn test_publish_replaces_live_file() {
        let d = dirs();
        fs::write(&d.live, "old page").unwrap();

        let publisher = Publisher::new(&d.scratch, &d.live);
        let path = publisher.publish("<html>new page</html>").unwrap();

        assert_eq!(path, d.live.as_path());
        assert_eq!(fs::read_to_string(&d.live).unwrap(), "<html>new page</html>");
        assert_eq!(fs::read_dir(&d.scratch).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_published_page_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let d = dirs();
        fs::write(&d.live, "old page").unwrap();
        Publisher::new(&d.scratch, &d.live)
            .publish("<html></html>")
            .unwrap();

        let mode = fs::metadata(&d.live).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode & 0o044, 0o044, "page not readable by group/other: {mode:o}");
        assert_eq!(mode, PAGE_MODE);
    }

    #[test]
    fn test_publish_creates_missing_live_file() {
        let d = dirs();
        Publisher::new(&d.scratch, &d.live).publish("first").unwrap();
        assert_eq!(fs::read_to_string(&d.live).unwrap(), "first");
    }

    #[test]
    fn test_failed_write_leaves_live_file_alone() {
        let d = dirs();
        fs::write(&d.live, "old page").unwrap();

        let publisher = Publisher::new(d.scratch.join("missing"), &d.live);
        let err = publisher.publish("new page").unwrap_err();

        assert_eq!(err.stage(), "publish");
        assert_eq!(fs::read_to_string(&d.live).unwrap(), "old page");
    }

    #[test]
    fn test_failed_rename_cleans_up_scratch() {
        let d = dirs();
        let publisher = Publisher::new(&d.scratch, d.live.with_file_name("gone").join("tides.html"));

        assert!(matches!(
            publisher.publish("new page"),
            Err(TideError::Publish { .. })
        ));
        assert_eq!(fs::read_dir(&d.scratch).unwrap().count(), 0);
        assert!(!d.live.exists());
    }
}
