use std::io;
use std::path::PathBuf;

use gosyntax::Diag;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("package {package} not found in {}", dir.display())]
    PackageNotFound { package: String, dir: PathBuf },

    #[error("{}:{line}:{col}: {}", path.display(), diag.message)]
    Syntax {
        path: PathBuf,
        line: usize,
        col: usize,
        diag: Diag,
    },

    #[error("{table} should be an array or slice of structs")]
    NotAStructSlice { table: String },

    #[error("{table} has {fields} field(s) but {target} needs {slots} (receiver, parameters and results)")]
    SlotCountMismatch {
        table: String,
        target: String,
        fields: usize,
        slots: usize,
    },

    #[error("slot {index} of {target} ({slot}) does not match field {field} of {table} ({field_type})")]
    SlotMismatch {
        table: String,
        target: String,
        index: usize,
        slot: String,
        field: String,
        field_type: String,
    },

    #[error("{ident} not found in file {}", path.display())]
    TargetNotFound { ident: String, path: PathBuf },

    #[error("unsupported type shape: {0}")]
    UnsupportedShape(String),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("rendering table driven test: {0}")]
    Render(String),
}

impl Error {
    /// Positions `diag` within `src`, the text of the file at `path`.
    pub fn syntax(path: impl Into<PathBuf>, src: &str, diag: Diag) -> Self {
        let (line, col) = gosyntax::error::line_col(src, diag.span.start as usize);
        Error::Syntax {
            path: path.into(),
            line,
            col,
            diag,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gosyntax::ast::Span;

    #[test]
    fn syntax_error_renders_file_position() {
        let src = "package p\nvar = 1\n";
        let err = Error::syntax("calc.go", src, Diag::parse(Span::new(14, 15), "expected identifier"));
        assert_eq!(err.to_string(), "calc.go:2:5: expected identifier");
    }

    #[test]
    fn slot_mismatch_names_both_sides() {
        let err = Error::SlotMismatch {
            table: "ttAdd".into(),
            target: "Add".into(),
            index: 1,
            slot: "int".into(),
            field: "b".into(),
            field_type: "string".into(),
        };
        assert_eq!(
            err.to_string(),
            "slot 1 of Add (int) does not match field b of ttAdd (string)"
        );
    }
}
