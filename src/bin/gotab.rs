//! `go generate` driver: `//go:generate gotab` in a Go file regenerates the
//! table driven tests of that file.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use gotab::logging::{init_logging, LogFormat, LogLevel, LogSettings};
use gotab::Config;

#[derive(Parser, Debug)]
#[command(name = "gotab", version, about = "Generates table driven Go tests")]
struct Cli {
    /// Go source file holding the tables
    #[arg(long, env = "GOFILE")]
    file: Option<PathBuf>,

    /// Package the file belongs to
    #[arg(long, env = "GOPACKAGE")]
    package: Option<String>,

    /// Extra import search root (repeatable), searched after GOPATH
    #[arg(long = "search-path", value_name = "DIR")]
    search_paths: Vec<PathBuf>,

    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,

    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = Config::from_env();
    config.log = LogSettings {
        format: cli.log_format,
        level: cli.log_level,
    }
    .merged_with_env();
    config.search.extra.extend(cli.search_paths);
    init_logging(&config.log);

    let (Some(file), Some(package)) = (cli.file, cli.package) else {
        eprintln!("tab : GOFILE and GOPACKAGE must be set; run through go generate or pass --file and --package");
        return ExitCode::FAILURE;
    };

    println!("tab : processing file {} in package {package}", file.display());
    match gotab::process(&file, &package, &config) {
        Ok(placed) => {
            println!(
                "tab : processed file {}, placed {placed} table driven test(s)",
                file.display()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::debug!(target: "gotab", error = ?err, "run failed");
            eprintln!("tab : {err}");
            ExitCode::FAILURE
        }
    }
}
