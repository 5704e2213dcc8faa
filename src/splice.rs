//! Byte-range edits of a Go source file: removing a previously generated
//! test and inserting a fresh one after its table.

use std::ops::Range;
use std::path::Path;

use gosyntax::ast::{AstArena, GenDeclKind, SourceFile, Span, Spec, TopLevelDecl};
use gosyntax::lexer::Tok;
use gosyntax::{Diag, Lexer};

use crate::emit;
use crate::error::{Error, Result};
use crate::matcher::TableDecl;

/// Parses `src` (the text of `path`), reporting the first diagnostic.
pub fn reparse(path: &Path, src: &str) -> Result<(AstArena, SourceFile)> {
    gosyntax::parse_file(src).map_err(|failure| {
        let diag = failure
            .diags
            .into_iter()
            .next()
            .unwrap_or_else(|| Diag::parse(Span::default(), "malformed source"));
        Error::syntax(path, src, diag)
    })
}

/// Byte range of the top-level function `name`, its doc comment included.
pub fn func_decl_range(arena: &AstArena, file: &SourceFile, name: &str) -> Option<Range<usize>> {
    arena.top_decls(file.decls).iter().find_map(|decl| {
        let TopLevelDecl::Func(id) = *decl else {
            return None;
        };
        let func = arena.funcs[id];
        if func.recv.is_some() || arena.name(func.name.sym) != name {
            return None;
        }
        let span = arena.funcs.span(id);
        let start = func
            .doc
            .map_or(span.start, |doc| arena.comment_groups.span(doc).start);
        Some(start as usize..span.end as usize)
    })
}

/// End offset of the `var` statement declaring `ident`; for a grouped
/// declaration, the end of its closing parenthesis.
pub fn table_end(arena: &AstArena, file: &SourceFile, ident: &str) -> Option<usize> {
    arena.top_decls(file.decls).iter().find_map(|decl| {
        let TopLevelDecl::Gen(id) = *decl else {
            return None;
        };
        let gen_decl = arena.gen_decls[id];
        if gen_decl.kind != GenDeclKind::Var {
            return None;
        }
        let declares = arena.specs_list(gen_decl.specs).iter().any(|spec| match spec {
            Spec::Value(vs) => arena
                .ident_names(vs.names)
                .iter()
                .any(|n| arena.name(n.sym) == ident),
            Spec::Type(_) => false,
        });
        declares.then(|| arena.gen_decls.span(id).end as usize)
    })
}

/// Range replaced by the routine for a table ending at `end`: everything up to
/// the next comment or keyword, or to the end of the file. The flag reports
/// whether the range reaches the end of the file.
pub fn insertion_range(src: &str, end: usize) -> (Range<usize>, bool) {
    let rest = &src[end..];
    for (start, tok, _) in Lexer::with_comments(rest) {
        if matches!(tok, Tok::Comment(_)) || tok.is_keyword() {
            return (end..end + start, false);
        }
    }
    (end..src.len(), true)
}

/// Regenerates the routine for `table` in `src`, the text of `path`.
pub fn put_table(path: &Path, src: &str, table: &TableDecl) -> Result<String> {
    let test_name = table.test_name();
    let mut content = src.to_owned();

    let (arena, file) = reparse(path, &content)?;
    if let Some(range) = func_decl_range(&arena, &file, &test_name) {
        tracing::debug!(
            target: "gotab::splice",
            test = %test_name,
            bytes = range.len(),
            "removing previous routine"
        );
        content.replace_range(range, "");
    }

    let (arena, file) = reparse(path, &content)?;
    let end = table_end(&arena, &file, &table.ident).ok_or_else(|| Error::TargetNotFound {
        ident: table.ident.clone(),
        path: path.to_path_buf(),
    })?;
    let (range, at_eof) = insertion_range(&content, end);
    let routine = emit::render(table, at_eof)?;
    tracing::debug!(
        target: "gotab::splice",
        test = %test_name,
        offset = range.start,
        at_eof,
        "placing routine"
    );
    content.replace_range(range, &routine);
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: &str = "package p

// TestTTAdd is stale.
func TestTTAdd(t *testing.T) {
}

var (
	ttAdd = 1
)

// trailing
func F() {}
";

    #[test]
    fn function_range_includes_its_doc() {
        let (arena, file) = reparse(Path::new("p.go"), SRC).unwrap();
        let range = func_decl_range(&arena, &file, "TestTTAdd").unwrap();
        assert!(SRC[range.clone()].starts_with("// TestTTAdd is stale."));
        assert!(SRC[range].ends_with("{\n}"));
        assert!(func_decl_range(&arena, &file, "Missing").is_none());
    }

    #[test]
    fn grouped_tables_end_at_the_paren() {
        let (arena, file) = reparse(Path::new("p.go"), SRC).unwrap();
        let end = table_end(&arena, &file, "ttAdd").unwrap();
        assert!(SRC[..end].ends_with("ttAdd = 1\n)"));

        let (range, at_eof) = insertion_range(SRC, end);
        assert!(!at_eof);
        assert_eq!(&SRC[range], "\n\n");
    }

    #[test]
    fn insertion_runs_to_eof_without_a_stop() {
        let src = "package p\n\nvar ttX = 1\n\n";
        let (arena, file) = reparse(Path::new("p.go"), src).unwrap();
        let end = table_end(&arena, &file, "ttX").unwrap();
        assert_eq!(insertion_range(src, end), (end..src.len(), true));
    }

    #[test]
    fn syntax_errors_name_the_file() {
        let err = reparse(Path::new("p.go"), "package p\nfunc (\n").unwrap_err();
        assert!(err.to_string().starts_with("p.go:"));
    }
}
