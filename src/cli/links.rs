//! Namespace link installer (`trixie createlink <ns>...`).
//!
//! Creates `<prefix><ns>` next to the running executable for each namespace,
//! so that invoking the link runs actions in that namespace.

// ============================================================================
// Imports
// ============================================================================

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::invocation::Invocation;

// ============================================================================
// Constants
// ============================================================================

/// Executable suffix of the host platform.
#[cfg(windows)]
const EXECUTABLE_SUFFIX: &str = ".exe";

#[cfg(not(windows))]
const EXECUTABLE_SUFFIX: &str = "";

// ============================================================================
// Linker
// ============================================================================

/// Creates namespace links pointing at one executable.
#[derive(Debug, Clone)]
pub struct Linker {
    source: PathBuf,
    dir: PathBuf,
    prefix: String,
    extension: &'static str,
}

impl Linker {
    /// Creates a linker for `source`, naming links `<prefix><ns>`.
    #[must_use]
    pub fn new(source: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        let source = source.into();
        let dir = source
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            source,
            dir,
            prefix: prefix.into(),
            extension: EXECUTABLE_SUFFIX,
        }
    }

    /// Creates a linker for the running executable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Link`] if the invocation name has no recognised
    /// prefix.
    pub fn for_executable(invocation: &Invocation) -> Result<Self> {
        let prefix = invocation
            .link_prefix
            .clone()
            .ok_or_else(|| Error::link("Unknown prefix used. Not creating links"))?;

        let source = std::env::current_exe()?;
        Ok(Self::new(source, prefix))
    }

    /// Path of the link for `namespace`.
    #[must_use]
    pub fn target(&self, namespace: &str) -> PathBuf {
        self.dir
            .join(format!("{}{namespace}{}", self.prefix, self.extension))
    }

    /// Creates the link for `namespace`.
    pub fn link(&self, namespace: &str) -> io::Result<PathBuf> {
        let target = self.target(namespace);
        place(&self.source, &target)?;
        debug!(target = %target.display(), "Link created");
        Ok(target)
    }

    /// Creates links for every namespace, reporting failures on stderr.
    ///
    /// Returns the number of links that could not be created.
    pub fn link_all(&self, namespaces: &[String]) -> usize {
        namespaces
            .iter()
            .filter(|namespace| match self.link(namespace) {
                Ok(_) => false,
                Err(e) => {
                    warn!(namespace = %namespace, error = %e, "Link failed");
                    eprintln!("Could not create {namespace} link ({e})");
                    true
                }
            })
            .count()
    }
}

#[cfg(unix)]
fn place(source: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, target)
}

#[cfg(not(unix))]
fn place(source: &Path, target: &Path) -> io::Result<()> {
    std::fs::copy(source, target).map(|_| ())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use tempfile::tempdir;

    fn fake_executable(dir: &Path) -> PathBuf {
        let source = dir.join(format!("trixie{EXECUTABLE_SUFFIX}"));
        fs::write(&source, b"binary").expect("write");
        source
    }

    #[test]
    fn test_target_sits_next_to_source() {
        let linker = Linker::new("/opt/trixie/bin/trixie", "t_");
        assert_eq!(
            linker.target("vm"),
            PathBuf::from(format!("/opt/trixie/bin/t_vm{EXECUTABLE_SUFFIX}"))
        );
    }

    #[test]
    fn test_link_all_creates_each_namespace() {
        let dir = tempdir().expect("tempdir");
        let source = fake_executable(dir.path());
        let linker = Linker::new(&source, "t_");

        let failures = linker.link_all(&["vm".to_string(), "dns".to_string()]);
        assert_eq!(failures, 0);

        for ns in ["vm", "dns"] {
            let target = linker.target(ns);
            assert_eq!(fs::read(&target).expect("read link"), b"binary");
        }
    }

    #[test]
    fn test_link_all_counts_failures() {
        let dir = tempdir().expect("tempdir");
        let source = fake_executable(dir.path());
        let linker = Linker::new(&source, "t_");

        linker.link("vm").expect("first link");
        let failures = linker.link_all(&["vm".to_string(), "dns".to_string()]);
        assert_eq!(failures, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_link_is_symlink_on_unix() {
        let dir = tempdir().expect("tempdir");
        let source = fake_executable(dir.path());
        let linker = Linker::new(&source, "trixie-");

        let target = linker.link("vm").expect("link");
        assert_eq!(fs::read_link(&target).expect("read_link"), source);
    }

    #[test]
    fn test_for_executable_requires_prefix() {
        let invocation = Invocation::detect("vm").expect("detect");
        assert!(matches!(
            Linker::for_executable(&invocation),
            Err(Error::Link { .. })
        ));
    }
}
