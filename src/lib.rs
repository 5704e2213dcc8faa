//! Generates table driven Go tests.
//!
//! A package-level variable named `tt<Target>` holding a slice of structs is
//! a test table for the function `<Target>` (or the method `Type.Method` for
//! `tt<Type>_<Method>`). Each row field is matched to a receiver, parameter or
//! result of the target by type, and a `TestTT<Target>` routine iterating the
//! table is written right after it.

pub mod build;
pub mod config;
pub mod emit;
pub mod equiv;
pub mod error;
pub mod loader;
pub mod logging;
pub mod matcher;
pub mod resolve;
pub mod splice;

use std::fs;
use std::path::{Path, PathBuf};

pub use build::BuildContext;
pub use config::{Config, SearchPaths};
pub use error::{Error, Result};
pub use matcher::TableDecl;
pub use resolve::Session;

/// Validates every table in `file` (a member of `package`) and regenerates
/// its routine. Nothing is written unless every table is valid. Returns the
/// number of routines placed.
pub fn process(file: &Path, package: &str, config: &Config) -> Result<usize> {
    let src = fs::read_to_string(file).map_err(|e| Error::io(file, e))?;
    let (arena, ast) = splice::reparse(file, &src)?;

    let idents = matcher::candidates(&arena, &ast);
    if idents.is_empty() {
        tracing::info!(target: "gotab", file = %file.display(), "no tables");
        return Ok(0);
    }
    let imports_testing = arena
        .imports_list(ast.imports)
        .iter()
        .any(|i| arena.name(i.path) == "testing");
    if !imports_testing {
        tracing::warn!(
            target: "gotab",
            file = %file.display(),
            "file does not import \"testing\"; generated routines will not compile"
        );
    }

    let dir = package_dir(file)?;
    let mut session = Session::new(config.search.clone()).with_build(config.build.clone());
    let pkg = session.add_package(loader::parse(&dir, package, &config.build)?);
    let tables = matcher::discover(&mut session, pkg, &idents)?;
    if tables.is_empty() {
        return Ok(0);
    }

    let mut content = src;
    for table in &tables {
        content = splice::put_table(file, &content, table)?;
    }
    fs::write(file, content).map_err(|e| Error::io(file, e))?;

    tracing::info!(
        target: "gotab",
        file = %file.display(),
        tables = tables.len(),
        packages = session.len(),
        "routines placed"
    );
    Ok(tables.len())
}

fn package_dir(file: &Path) -> Result<PathBuf> {
    let dir = match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    dir.canonicalize().map_err(|e| Error::io(dir, e))
}
