//! Module-name path substitution.
//!
//! A path whose leading segments match a Go module name is rewritten to the
//! module's filesystem root, so include lists can name modules instead of
//! checkouts. The listing comes from `go list -m -json all`, which prints a
//! concatenation of JSON objects; a missing or failing toolchain degrades to
//! an empty map and paths are used as-is.

use std::path::{Path, PathBuf};
use std::process::Command;

use rustc_hash::FxHashMap;
use tracing::debug;

/// Module name → filesystem root, as seen from the current directory.
pub fn module_paths() -> FxHashMap<String, PathBuf> {
    let mut modules = FxHashMap::default();

    let output = match Command::new("go").args(["list", "-m", "-json", "all"]).output() {
        Ok(output) if output.status.success() => output,
        Ok(_) | Err(_) => {
            debug!("go list unavailable, module path substitution disabled");
            return modules;
        }
    };

    let stream = serde_json::Deserializer::from_slice(&output.stdout);
    for value in stream.into_iter::<serde_json::Value>().flatten() {
        let path = value.get("Path").and_then(|v| v.as_str());
        let dir = value.get("Dir").and_then(|v| v.as_str());
        if let (Some(path), Some(dir)) = (path, dir) {
            modules.insert(path.to_string(), PathBuf::from(dir));
        }
    }
    debug!(count = modules.len(), "loaded module paths");
    modules
}

/// Rewrites a module-prefixed path to its filesystem location and makes it
/// absolute.
pub fn real_path(path: &str, modules: &FxHashMap<String, PathBuf>) -> PathBuf {
    for (name, dir) in modules {
        if let Some(rest) = strip_module_prefix(path, name) {
            return absolutize(&dir.join(rest));
        }
    }
    absolutize(Path::new(path))
}

fn strip_module_prefix<'p>(path: &'p str, module: &str) -> Option<&'p str> {
    let rest = path.strip_prefix(module)?;
    if rest.is_empty() {
        return Some("");
    }
    rest.strip_prefix('/')
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_path_substitutes_module() {
        let mut modules = FxHashMap::default();
        modules.insert(
            "example.com/proj".to_string(),
            PathBuf::from("/home/u/go/proj"),
        );

        assert_eq!(
            real_path("example.com/proj/tpl", &modules),
            PathBuf::from("/home/u/go/proj/tpl")
        );
        assert_eq!(
            real_path("example.com/proj", &modules),
            PathBuf::from("/home/u/go/proj")
        );
    }

    #[test]
    fn test_real_path_requires_segment_boundary() {
        let mut modules = FxHashMap::default();
        modules.insert("example.com/proj".to_string(), PathBuf::from("/root/proj"));

        // A longer, unrelated segment must not match the module prefix.
        let out = real_path("/data/example.com/projects", &modules);
        assert_eq!(out, PathBuf::from("/data/example.com/projects"));
    }

    #[test]
    fn test_real_path_absolutizes() {
        let modules = FxHashMap::default();
        let out = real_path("relative/dir", &modules);
        assert!(out.is_absolute());
        assert!(out.ends_with("relative/dir"));
    }
}
