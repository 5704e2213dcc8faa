use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

use crate::build::BuildContext;
use crate::logging::LogOptions;

/// Roots consulted when an import path lies outside the enclosing module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPaths {
    /// `$GOROOT`; its `src` directory holds the standard library.
    pub goroot: Option<PathBuf>,
    /// `$GOPATH` entries; each has its own `src` directory.
    pub gopath: Vec<PathBuf>,
    /// Additional roots searched last, laid out like a `src` directory.
    pub extra: Vec<PathBuf>,
}

impl SearchPaths {
    /// Builds search roots from `GOROOT`, `GOPATH` and `GOTAB_PATH`.
    ///
    /// Without `GOROOT` the Go toolchain is asked (`go env GOROOT`); without
    /// `GOPATH` the Go default `$HOME/go` is used.
    pub fn from_env() -> Self {
        let goroot = env::var_os("GOROOT")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(goroot_from_toolchain);

        let gopath = match env::var_os("GOPATH").filter(|v| !v.is_empty()) {
            Some(list) => split(list),
            None => env::var_os("HOME")
                .map(|home| vec![PathBuf::from(home).join("go")])
                .unwrap_or_default(),
        };

        let extra = env::var_os("GOTAB_PATH").map(split).unwrap_or_default();

        tracing::debug!(
            target: "gotab::config",
            goroot = ?goroot,
            gopath = ?gopath,
            extra = ?extra,
            "search paths"
        );

        Self {
            goroot,
            gopath,
            extra,
        }
    }
}

fn split(list: OsString) -> Vec<PathBuf> {
    env::split_paths(&list)
        .filter(|p| !p.as_os_str().is_empty())
        .collect()
}

fn goroot_from_toolchain() -> Option<PathBuf> {
    let output = Command::new("go").args(["env", "GOROOT"]).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}

/// Run configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub search: SearchPaths,
    /// Platform whose files are loaded.
    pub build: BuildContext,
    pub log: LogOptions,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            search: SearchPaths::from_env(),
            build: BuildContext::from_env(),
            log: LogOptions::from_env(),
        }
    }
}
