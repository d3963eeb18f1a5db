//! Input discovery and output path computation.

use std::io;
use std::path::{Path, PathBuf};

/// Collects every file under `dir` whose name ends in `.{suffix}`,
/// optionally recursing. Results are sorted for deterministic runs.
pub fn discover(dir: &Path, suffix: &str, recursive: bool) -> io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    collect(dir, &format!(".{suffix}"), recursive, &mut found)?;
    found.sort();
    Ok(found)
}

fn collect(dir: &Path, dot_suffix: &str, recursive: bool, found: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if recursive {
                collect(&path, dot_suffix, recursive, found)?;
            }
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(dot_suffix))
        {
            found.push(path);
        }
    }
    Ok(())
}

/// Computes the output path for a template: the last extension is swapped
/// for `.go`, and `out_dir` overrides the directory when given.
pub fn outfile_path(file: &Path, out_dir: Option<&Path>) -> PathBuf {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let out_name = match name.rfind('.') {
        Some(offset) => format!("{}.go", &name[..offset]),
        None => format!("{name}.go"),
    };

    let dir = match out_dir {
        Some(dir) => dir.to_path_buf(),
        None => file.parent().unwrap_or_else(|| Path::new(".")).to_path_buf(),
    };
    dir.join(out_name)
}

/// Whether the output is already newer than the input.
pub fn up_to_date(input: &Path, output: &Path) -> bool {
    let in_time = match std::fs::metadata(input).and_then(|m| m.modified()) {
        Ok(t) => t,
        Err(_) => return false,
    };
    let out_time = match std::fs::metadata(output).and_then(|m| m.modified()) {
        Ok(t) => t,
        Err(_) => return false,
    };
    out_time > in_time
}
