//! Command-line entry point for gotpl.

use std::path::PathBuf;

use clap::{Arg, ArgAction, Command};
use tracing_subscriber::EnvFilter;

use gotpl::driver::{self, RunConfig};

fn main() {
    let matches = Command::new("gotpl")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compiles gotpl template files into Go source")
        .arg(
            Arg::new("out-dir")
                .short('o')
                .value_name("DIR")
                .help("Output directory; defaults to each template's directory"),
        )
        .arg(
            Arg::new("type")
                .short('t')
                .value_name("SUF")
                .help("Compile every file with this suffix in the input directory"),
        )
        .arg(
            Arg::new("dir")
                .short('d')
                .value_name("DIR")
                .help("Input directory for -t; defaults to the current directory"),
        )
        .arg(
            Arg::new("includes")
                .short('I')
                .value_name("LIST")
                .help(
                    "':' or ';' separated include directories and files. Files are \
                     prepended to every compilation; directories are searched in order \
                     for {{include}} resolution",
                ),
        )
        .arg(
            Arg::new("imports")
                .short('i')
                .action(ArgAction::SetTrue)
                .help("Run goimports on each output instead of gofmt"),
        )
        .arg(
            Arg::new("recursive")
                .short('r')
                .action(ArgAction::SetTrue)
                .help("Recurse the input directory tree (requires -t, forbids -o)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::SetTrue)
                .help("Verbose progress"),
        )
        .arg(
            Arg::new("force")
                .short('f')
                .action(ArgAction::SetTrue)
                .help("Recompile even if the output is newer than the input"),
        )
        .arg(
            Arg::new("lenient-params")
                .long("lenient-params")
                .action(ArgAction::SetTrue)
                .help("Fill missing named-block parameters with empty strings"),
        )
        .arg(
            Arg::new("files")
                .value_name("FILE")
                .num_args(0..)
                .help("Template files to compile"),
        )
        .get_matches();

    let config = RunConfig {
        out_dir: matches.get_one::<String>("out-dir").map(PathBuf::from),
        suffix: matches.get_one::<String>("type").cloned(),
        input_dir: matches.get_one::<String>("dir").map(PathBuf::from),
        includes: matches.get_one::<String>("includes").cloned(),
        run_imports: matches.get_flag("imports"),
        recursive: matches.get_flag("recursive"),
        verbose: matches.get_flag("verbose"),
        force: matches.get_flag("force"),
        lenient_params: matches.get_flag("lenient-params"),
        files: matches
            .get_many::<String>("files")
            .into_iter()
            .flatten()
            .map(PathBuf::from)
            .collect(),
    };

    init_tracing(config.verbose);

    match driver::run(&config) {
        Ok(0) => {}
        Ok(failures) => {
            eprintln!("{failures} file(s) failed");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{e:#}");
            std::process::exit(1);
        }
    }
}

/// Stderr logging honoring `RUST_LOG`; `-v` raises the default to `info`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
