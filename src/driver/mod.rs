//! The file pipeline: discovers inputs, runs the compilation pipeline per
//! file, writes outputs, and post-processes them with `goimports`/`gofmt`.
//!
//! Include files named with `-I` are compiled once up front; their ASTs are
//! prepended to every output, and the registry they populate is cloned
//! before each main-file compile. A fault in one input does not stop the
//! remaining files.

pub mod discover;
pub mod modpath;

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use crate::compiler::ast::Node;
use crate::compiler::error::{CompileError, ErrorKind, Frame};
use crate::compiler::{codegen, Compilation, ParamMode};

/// Everything the CLI collects for one run.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// `-o`: output directory; defaults to each input's directory.
    pub out_dir: Option<PathBuf>,
    /// `-t`: compile every file with this suffix.
    pub suffix: Option<String>,
    /// `-d`: input directory for `-t`.
    pub input_dir: Option<PathBuf>,
    /// `-I`: `:`/`;` separated include directories and files.
    pub includes: Option<String>,
    /// `-i`: run `goimports` instead of `gofmt`.
    pub run_imports: bool,
    /// `-r`: recurse the input directory tree.
    pub recursive: bool,
    /// `-v`: verbose progress.
    pub verbose: bool,
    /// `-f`: recompile even when the output is newer than the input.
    pub force: bool,
    /// `--lenient-params`: fill missing block parameters with empty strings.
    pub lenient_params: bool,
    /// Template files named on the command line.
    pub files: Vec<PathBuf>,
}

/// Runs one invocation and returns the number of failed files.
pub fn run(config: &RunConfig) -> Result<usize> {
    let modules = modpath::module_paths();

    if config.recursive {
        if config.suffix.is_none() {
            bail!("-r requires -t");
        }
        if config.out_dir.is_some() {
            bail!("-r cannot be combined with -o");
        }
    }

    let (mut include_paths, include_files) = split_includes(config, &modules)?;

    let input_dir = config
        .input_dir
        .as_ref()
        .map(|d| modpath::real_path(&d.to_string_lossy(), &modules));
    match &input_dir {
        Some(dir) => include_paths.push(dir.clone()),
        None => include_paths.push(modpath::real_path(".", &modules)),
    }

    let out_dir = match &config.out_dir {
        Some(dir) => {
            let dir = modpath::real_path(&dir.to_string_lossy(), &modules);
            let meta = std::fs::metadata(&dir).with_context(|| {
                format!(
                    "the output directory {} does not exist; create it and run again",
                    dir.display()
                )
            })?;
            if !meta.is_dir() {
                bail!("the output path {} is not a directory", dir.display());
            }
            Some(dir)
        }
        None => None,
    };

    let files = match &config.suffix {
        Some(suffix) => {
            let dir = input_dir.clone().unwrap_or_else(|| PathBuf::from("."));
            discover::discover(&dir, suffix, config.recursive)
                .with_context(|| format!("could not scan {}", dir.display()))?
        }
        None => config
            .files
            .iter()
            .map(|f| modpath::real_path(&f.to_string_lossy(), &modules))
            .collect(),
    };
    if files.is_empty() {
        bail!("no input files");
    }

    let param_mode = if config.lenient_params {
        ParamMode::Lenient
    } else {
        ParamMode::Exact
    };

    // Compile the prepended include files once; their blocks seed every
    // per-file registry.
    let mut base = Compilation::new(include_paths, param_mode);
    let mut include_asts: Vec<Node> = Vec::new();
    for file in &include_files {
        base.blocks
            .predefine(file, &discover::outfile_path(file, out_dir.as_deref()));
        let ast = base
            .build_ast(file)
            .with_context(|| format!("while preparing include file {}", file.display()))?;
        include_asts.push(ast);
    }
    let include_blocks = base.blocks.clone();

    let mut failures = 0usize;
    let mut written: Vec<PathBuf> = Vec::new();

    for file in &files {
        let out_path = discover::outfile_path(file, out_dir.as_deref());
        if !config.force && discover::up_to_date(file, &out_path) {
            debug!(file = %file.display(), "up to date, skipping");
            continue;
        }

        let mut comp = base.with_blocks(include_blocks.clone());
        comp.blocks.predefine(file, &out_path);

        let ast = match comp.build_ast(file) {
            Ok(ast) => ast,
            Err(e) => {
                eprintln!("{e}");
                failures += 1;
                continue;
            }
        };

        let source = codegen::emit_file(include_asts.iter().chain(std::iter::once(&ast)));

        if let Err(e) = std::fs::write(&out_path, source) {
            eprintln!("{}", CompileError::io(&out_path, &e));
            failures += 1;
            continue;
        }
        info!(from = %file.display(), to = %out_path.display(), "compiled");
        written.push(out_path);
    }

    for file in &written {
        if let Err(msg) = postprocess(file, config.run_imports) {
            eprintln!("{msg}");
            failures += 1;
        }
    }

    Ok(failures)
}

/// Splits the `-I` list into search directories and prepended files,
/// resolving module-name prefixes.
fn split_includes(
    config: &RunConfig,
    modules: &rustc_hash::FxHashMap<String, PathBuf>,
) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();

    let Some(includes) = &config.includes else {
        return Ok((dirs, files));
    };
    for item in includes.split([':', ';']).filter(|s| !s.is_empty()) {
        let path = modpath::real_path(item, modules);
        let meta = std::fs::metadata(&path)
            .with_context(|| format!("include path {} does not exist", path.display()))?;
        if meta.is_dir() {
            dirs.push(path);
        } else {
            files.push(path);
        }
    }
    Ok((dirs, files))
}

/// Formats one output file in place. `goimports` also fixes up the import
/// list; plain `gofmt` is the fallback.
fn postprocess(file: &Path, run_imports: bool) -> Result<(), CompileError> {
    let tool = if run_imports { "goimports" } else { "gofmt" };
    let fault = |message: String| {
        CompileError::new(ErrorKind::Format, message, Frame::file(file.to_path_buf(), 0, 0))
    };

    let output = Command::new(tool)
        .arg("-w")
        .arg(file)
        .output()
        .map_err(|e| fault(format!("could not run {tool} on {}: {e}", file.display())))?;
    if !output.status.success() {
        // Usually a syntax error in the generated file; surface the
        // formatter's own message.
        return Err(fault(format!(
            "{tool} failed on {}:\n{}",
            file.display(),
            String::from_utf8_lossy(&output.stderr).trim_end()
        )));
    }
    Ok(())
}
