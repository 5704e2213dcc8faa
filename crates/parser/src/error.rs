use thiserror::Error;

use crate::ast::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagKind {
    Lex,
    Parse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diag {
    pub kind: DiagKind,
    pub span: Span,
    pub message: String,
}

impl Diag {
    #[inline]
    pub fn parse(span: Span, message: impl Into<String>) -> Self {
        Self {
            kind: DiagKind::Parse,
            span,
            message: message.into(),
        }
    }

    /// Renders the diagnostic as `line:col: message` against the source it
    /// was produced from.
    pub fn render(&self, src: &str) -> String {
        let (line, col) = line_col(src, self.span.start as usize);
        format!("{line}:{col}: {}", self.message)
    }
}

/// Collected diagnostics of a failed parse.
#[derive(Debug, Clone, Error)]
#[error("{} diagnostic(s), first: {}", .diags.len(), first_message(.diags))]
pub struct ParseFailure {
    pub diags: Vec<Diag>,
}

fn first_message(diags: &[Diag]) -> &str {
    diags.first().map_or("<none>", |d| d.message.as_str())
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    #[error("invalid token")]
    InvalidToken,
    #[error("unterminated comment")]
    UnterminatedComment,
}

impl Default for LexErrorKind {
    #[inline]
    fn default() -> Self {
        LexErrorKind::InvalidToken
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind}: {span:?}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
}

impl Default for LexError {
    #[inline]
    fn default() -> Self {
        Self {
            kind: LexErrorKind::InvalidToken,
            span: Span::default(),
        }
    }
}

impl LexError {
    #[inline]
    pub fn diag(&self) -> Diag {
        Diag {
            kind: DiagKind::Lex,
            span: self.span,
            message: self.kind.to_string(),
        }
    }
}

/// 1-based line and column (in bytes) of `offset` within `src`.
pub fn line_col(src: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(src.len());
    let before = &src.as_bytes()[..offset];
    let line = memchr::memchr_iter(b'\n', before).count() + 1;
    let col = match memchr::memrchr(b'\n', before) {
        Some(nl) => offset - nl,
        None => offset + 1,
    };
    (line, col)
}
