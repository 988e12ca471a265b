//! Writes output files. Contents go to a temporary file in the target's
//! directory which is then renamed over the target, so a crash leaves either
//! the previous file or the complete new one. Two invocations writing the
//! same path at the same time are not coordinated; the last rename wins.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

/// The result of a fallible file-writing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error writing or removing an output file.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when an output file can't be written.
    #[error("writing `{}`: {}", .path.display(), .err)]
    Write {
        path: PathBuf,
        #[source]
        err: io::Error,
    },

    /// Returned when a converted source file can't be removed.
    #[error("removing `{}`: {}", .path.display(), .err)]
    Remove {
        path: PathBuf,
        #[source]
        err: io::Error,
    },
}

/// Atomically replaces the file at `path` with `contents`, creating parent
/// directories as needed. An existing file keeps its permissions.
pub fn write_file(path: &Path, contents: &str) -> Result<()> {
    let wrap = |err| Error::Write {
        path: path.to_owned(),
        err,
    };

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(wrap)?;

    let mut file = NamedTempFile::new_in(dir).map_err(wrap)?;
    file.write_all(contents.as_bytes()).map_err(wrap)?;
    file.as_file().sync_all().map_err(wrap)?;
    set_permissions(&file, path).map_err(wrap)?;
    file.persist(path).map_err(|e| wrap(e.error))?;
    Ok(())
}

/// Temporary files are created owner-only; give the output the target's
/// existing permissions, or the usual ones for a new file.
fn set_permissions(file: &NamedTempFile, target: &Path) -> io::Result<()> {
    match std::fs::metadata(target) {
        Ok(metadata) => file.as_file().set_permissions(metadata.permissions()),
        Err(_) => default_permissions(file),
    }
}

#[cfg(unix)]
fn default_permissions(file: &NamedTempFile) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.as_file()
        .set_permissions(std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions(_file: &NamedTempFile) -> io::Result<()> {
    Ok(())
}

/// Removes a file.
pub fn remove_file(path: &Path) -> Result<()> {
    std::fs::remove_file(path).map_err(|err| Error::Remove {
        path: path.to_owned(),
        err,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    #[test]
    fn test_write_file_replaces_contents() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out").join("index.html");

        write_file(&path, "first")?;
        write_file(&path, "second")?;
        assert_eq!(fs::read_to_string(&path)?, "second");

        // no temporary files left behind
        let entries = fs::read_dir(dir.path().join("out"))?.count();
        assert_eq!(entries, 1);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_write_file_permissions() -> std::result::Result<(), Box<dyn std::error::Error>> {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("index.html");
        write_file(&path, "x")?;
        assert_eq!(fs::metadata(&path)?.permissions().mode() & 0o777, 0o644);

        fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        write_file(&path, "y")?;
        assert_eq!(fs::metadata(&path)?.permissions().mode() & 0o777, 0o600);
        Ok(())
    }

    #[test]
    fn test_remove_missing_file() {
        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(e) => panic!("creating temp dir: {}", e),
        };
        let result = remove_file(&dir.path().join("missing.md"));
        assert!(matches!(result, Err(Error::Remove { .. })));
    }
}
