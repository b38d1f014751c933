//! Binary-name sniffing.
//!
//! The client is installed under several names, one per remote namespace:
//! `t_vm`, `trixie-vm` and `___vm` all run actions in the `vm.` namespace.
//! The plain `trixie` binary runs local commands.

// ============================================================================
// Imports
// ============================================================================

use std::path::Path;

use regex::Regex;
use tracing::debug;

use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

/// Namespace of the locally handled commands.
pub const INTERNAL_NAMESPACE: &str = "internal.";

/// Prefixes recognised in front of a namespace.
const NAMESPACE_PATTERN: &str = r"(?i)(^t_?|trixie-|___)?(?P<namespace>[a-z]*)$";

/// Same pattern without the start anchor; picks the prefix new links reuse.
const PREFIX_PATTERN: &str = r"(?i)(t_?|trixie-|___)?(?P<namespace>[a-z]*)$";

/// Names that resolve to the local namespace.
const INTERNAL_ALIASES: &[&str] = &["trixie.", "rixie.", "trace."];

// ============================================================================
// Invocation
// ============================================================================

/// What the process was invoked as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// File name without directory and `.exe`.
    pub binary_name: String,
    /// Namespace prepended to remote actions, always ending in `.`.
    pub namespace: String,
    /// Prefix shared by sibling links, if the name carries one.
    pub link_prefix: Option<String>,
}

impl Invocation {
    /// Derives the invocation from `argv[0]`.
    pub fn detect(argv0: &str) -> Result<Self> {
        let binary_name = binary_name(argv0);

        let namespace = Regex::new(NAMESPACE_PATTERN)?
            .captures(&binary_name)
            .and_then(|caps| caps.name("namespace"))
            .map(|m| format!("{}.", m.as_str()))
            .filter(|ns| ns != "." && !INTERNAL_ALIASES.contains(&ns.as_str()))
            .unwrap_or_else(|| INTERNAL_NAMESPACE.to_string());

        let link_prefix = Regex::new(PREFIX_PATTERN)?
            .captures(&binary_name)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());

        debug!(binary = %binary_name, %namespace, ?link_prefix, "Invocation detected");

        Ok(Self {
            binary_name,
            namespace,
            link_prefix,
        })
    }

    /// Returns `true` for the local command namespace.
    #[inline]
    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.namespace == INTERNAL_NAMESPACE
    }

    /// Prepends the namespace to `action`.
    #[inline]
    #[must_use]
    pub fn qualify(&self, action: &str) -> String {
        format!("{}{action}", self.namespace)
    }
}

/// Strips the directory and a `.exe` suffix.
fn binary_name(argv0: &str) -> String {
    let file_name = Path::new(argv0)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| argv0.to_string());

    file_name
        .strip_suffix(".exe")
        .map(str::to_string)
        .unwrap_or(file_name)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(argv0: &str) -> Invocation {
        Invocation::detect(argv0).expect("detect")
    }

    #[test]
    fn test_prefixed_names_select_namespace() {
        assert_eq!(detect("t_vm").namespace, "vm.");
        assert_eq!(detect("tvm").namespace, "vm.");
        assert_eq!(detect("trixie-vm").namespace, "vm.");
        assert_eq!(detect("___dns").namespace, "dns.");
    }

    #[test]
    fn test_unprefixed_name_is_its_own_namespace() {
        let invocation = detect("vm");
        assert_eq!(invocation.namespace, "vm.");
        assert_eq!(invocation.link_prefix, None);
    }

    #[test]
    fn test_trixie_itself_is_internal() {
        assert!(detect("trixie").is_internal());
        assert!(detect("/usr/local/bin/trixie").is_internal());
        assert!(detect("C:/tools/trixie.exe").is_internal());
        assert!(detect("___trace").is_internal());
    }

    #[test]
    fn test_unmatched_name_is_internal() {
        assert!(detect("trixie2").is_internal());
        assert!(detect("t-").is_internal());
    }

    #[test]
    fn test_strips_directory_and_exe() {
        let invocation = detect("/opt/bin/t_vm.exe");
        assert_eq!(invocation.binary_name, "t_vm");
        assert_eq!(invocation.namespace, "vm.");
    }

    #[test]
    fn test_case_insensitive_prefix() {
        assert_eq!(detect("TRIXIE-vm").namespace, "vm.");
    }

    #[test]
    fn test_link_prefix() {
        assert_eq!(detect("trixie").link_prefix.as_deref(), Some("t"));
        assert_eq!(detect("t_vm").link_prefix.as_deref(), Some("t_"));
        assert_eq!(detect("trixie-vm").link_prefix.as_deref(), Some("trixie-"));
    }

    #[test]
    fn test_qualify() {
        assert_eq!(detect("t_vm").qualify("list"), "vm.list");
        assert_eq!(detect("trixie").qualify("createlink"), "internal.createlink");
    }
}
