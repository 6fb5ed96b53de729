use std::fs;
use std::io;
use std::path::Path;
use tempfile::{Builder, TempPath};
use tracing::{debug, warn};

const PREFIX: &str = "g2xtb-";
const SUFFIX: &str = ".out";

/// A uniquely named file the native library writes its report into.
///
/// Only the path is held, never an open handle: the library opens the file
/// itself. The file is removed when the value is dropped, whatever happened
/// in between, or explicitly by [`ScratchFile::drain`].
#[derive(Debug)]
pub struct ScratchFile {
    path: TempPath,
}

impl ScratchFile {
    /// Creates the file in the system temporary directory.
    pub fn create() -> io::Result<Self> {
        Self::create_in(std::env::temp_dir())
    }

    pub fn create_in<P: AsRef<Path>>(dir: P) -> io::Result<Self> {
        let path = Builder::new()
            .prefix(PREFIX)
            .suffix(SUFFIX)
            .tempfile_in(dir)?
            .into_temp_path();
        debug!("Created scratch file {:?}", &*path);
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole report and removes the file.
    ///
    /// A file that no longer exists yields an empty report. Bytes that are not
    /// valid UTF-8 are replaced rather than rejected.
    pub fn drain(self) -> io::Result<String> {
        let report = match fs::read(&self.path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("Scratch file {:?} was removed before it could be read", &*self.path);
                String::new()
            }
            Err(e) => return Err(e),
        };

        match self.path.close() {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_file_exists_with_expected_name() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchFile::create_in(dir.path()).unwrap();

        assert!(scratch.path().exists());
        let name = scratch.path().file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(PREFIX));
        assert!(name.ends_with(SUFFIX));
    }

    #[test]
    fn paths_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let a = ScratchFile::create_in(dir.path()).unwrap();
        let b = ScratchFile::create_in(dir.path()).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn drain_returns_contents_and_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchFile::create_in(dir.path()).unwrap();
        let path = scratch.path().to_path_buf();
        fs::write(&path, "total energy  -5.070 Eh\n").unwrap();

        let report = scratch.drain().unwrap();

        assert_eq!(report, "total energy  -5.070 Eh\n");
        assert!(!path.exists());
    }

    #[test]
    fn drain_of_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchFile::create_in(dir.path()).unwrap();
        fs::remove_file(scratch.path()).unwrap();

        assert_eq!(scratch.drain().unwrap(), "");
    }

    #[test]
    fn dropping_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchFile::create_in(dir.path()).unwrap();
        let path = scratch.path().to_path_buf();

        drop(scratch);

        assert!(!path.exists());
    }

    #[test]
    fn creating_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = ScratchFile::create_in(dir.path().join("does-not-exist"));
        assert!(result.is_err());
    }
}
