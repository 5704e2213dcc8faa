use crate::ast::Span;
use crate::error::{Diag, LexError, LexErrorKind};
use logos::{Lexer as LogosLexer, Logos};
use smallvec::SmallVec;
use std::ops::Range;

// =============================================================================
// 0. Shared helpers
// =============================================================================

#[inline(always)]
const fn first_newline_offset(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if matches!(bytes[i], b'\n' | b'\r') {
            return Some(i);
        }
        i += 1;
    }

    None
}

// =============================================================================
// 1. Block comment scanner
// =============================================================================

#[inline]
fn lex_block_comment(lex: &mut LogosLexer<'_, RawTok>) -> Result<(), LexErrorKind> {
    use memchr::memchr;

    let rem = lex.remainder().as_bytes();
    let mut search_start = 0;

    while let Some(star_pos) = memchr(b'*', &rem[search_start..]) {
        let abs_pos = search_start + star_pos;

        if rem.get(abs_pos + 1) == Some(&b'/') {
            lex.bump(abs_pos + 2);
            return Ok(());
        }

        search_start = abs_pos + 1;
    }

    lex.bump(rem.len());
    Err(LexErrorKind::UnterminatedComment)
}

// =============================================================================
// 2. Numeric literal classification
// =============================================================================

/// Classifies an already-matched numeric literal.
///
/// The regex accepts the Go shapes loosely (underscores anywhere, any digit
/// run); declarations never depend on a literal's value, so only the kind is
/// recovered here.
fn classify_number(lit: &str) -> NumKind {
    let bytes = lit.as_bytes();
    if bytes.last() == Some(&b'i') {
        return NumKind::Imag;
    }
    let is_hex = bytes.len() > 1 && bytes[0] == b'0' && matches!(bytes[1], b'x' | b'X');
    let is_float = if is_hex {
        bytes.iter().any(|b| matches!(b, b'.' | b'p' | b'P'))
    } else if bytes.len() > 1 && bytes[0] == b'0' && matches!(bytes[1], b'b' | b'B' | b'o' | b'O')
    {
        false
    } else {
        bytes.iter().any(|b| matches!(b, b'.' | b'e' | b'E'))
    };

    if is_float { NumKind::Float } else { NumKind::Int }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumKind {
    Int,
    Float,
    Imag,
}

// =============================================================================
// 3. Token Definition (RawTok - DFA built by logos)
// =============================================================================

#[repr(u8)]
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(error = LexErrorKind)]
#[logos(skip r"[ \t]+")]
#[rustfmt::skip]
enum RawTok {
    #[token("\u{FEFF}")] Bom,

    // Trivia
    #[regex(r"\r\n|\n|\r")] Newline,
    #[regex(r"//[^\n\r]*", allow_greedy = true)] LineComment,
    #[token("/*", lex_block_comment)]
    BlockComment,

    // Keywords (before Ident)
    #[token("break")] KwBreak,
    #[token("case")] KwCase,
    #[token("chan")] KwChan,
    #[token("const")] KwConst,
    #[token("continue")] KwContinue,
    #[token("default")] KwDefault,
    #[token("defer")] KwDefer,
    #[token("else")] KwElse,
    #[token("fallthrough")] KwFallthrough,
    #[token("for")] KwFor,
    #[token("func")] KwFunc,
    #[token("go")] KwGo,
    #[token("goto")] KwGoto,
    #[token("if")] KwIf,
    #[token("import")] KwImport,
    #[token("interface")] KwInterface,
    #[token("map")] KwMap,
    #[token("package")] KwPackage,
    #[token("range")] KwRange,
    #[token("return")] KwReturn,
    #[token("select")] KwSelect,
    #[token("struct")] KwStruct,
    #[token("switch")] KwSwitch,
    #[token("type")] KwType,
    #[token("var")] KwVar,

    // Identifiers
    #[regex(r"[_\p{L}][_\p{L}\p{Nd}]*")] Ident,

    // Numbers: decimal int/float, leading-dot float, hex (incl. hex floats), binary/octal.
    #[regex(r"[0-9][0-9_]*(\.[0-9_]*)?([eE][+-]?[0-9_]+)?i?|\.[0-9][0-9_]*([eE][+-]?[0-9_]+)?i?|0[xX][0-9a-fA-F_]*(\.[0-9a-fA-F_]*)?([pP][+-]?[0-9_]+)?i?|0[bBoO][0-9_]+i?")]
    Number,

    // Strings / runes
    #[regex(r"`[^`]*`")] RawString,
    #[regex(r#""([^"\\\n\r]|\\.)*""#)] String,
    #[regex(r"'([^'\\\n\r]|\\.)+'")] Rune,

    // Operators
    #[token("...")] Ellipsis,
    #[token("<<=")] ShlAssign,
    #[token(">>=")] ShrAssign,
    #[token("&^=")] AndNotAssign,
    #[token("+=")] AddAssign,
    #[token("-=")] SubAssign,
    #[token("*=")] MulAssign,
    #[token("/=")] DivAssign,
    #[token("%=")] ModAssign,
    #[token("&=")] AndAssign,
    #[token("|=")] OrAssign,
    #[token("^=")] XorAssign,
    #[token("<<")] Shl,
    #[token(">>")] Shr,
    #[token("&^")] AndNot,
    #[token("&&")] LAnd,
    #[token("||")] LOr,
    #[token("==")] EqEq,
    #[token("!=")] NotEq,
    #[token("<=")] Le,
    #[token(">=")] Ge,
    #[token("++")] Inc,
    #[token("--")] Dec,
    #[token(":=")] Define,
    #[token("<-")] Arrow,
    #[token("=")] Assign,
    #[token("+")] Plus,
    #[token("-")] Minus,
    #[token("*")] Star,
    #[token("/")] Slash,
    #[token("%")] Percent,
    #[token("&")] Amp,
    #[token("|")] Pipe,
    #[token("^")] Caret,
    #[token("~")] Tilde,
    #[token("!")] Bang,
    #[token("<")] Lt,
    #[token(">")] Gt,

    // Delimiters
    #[token("(")] LParen,
    #[token(")")] RParen,
    #[token("[")] LBrack,
    #[token("]")] RBrack,
    #[token("{")] LBrace,
    #[token("}")] RBrace,
    #[token(",")] Comma,
    #[token(";")] Semi,
    #[token(":")] Colon,
    #[token(".")] Dot,

    // Catch-all (lowest priority)
    #[regex(r".", priority = 0)] Error,
}

// =============================================================================
// 4. Lookup tables
// =============================================================================

macro_rules! gen_lookup_table {
    (bool, $size:expr, $($variant:ident),* $(,)?) => {{
        let mut table = [false; $size];
        $(table[RawTok::$variant as usize] = true;)*
        table
    }};
}

const SEMI_INSERT_TABLE: [bool; 256] = gen_lookup_table!(
    bool,
    256,
    Ident,
    Number,
    Rune,
    String,
    RawString,
    KwBreak,
    KwContinue,
    KwFallthrough,
    KwReturn,
    Inc,
    Dec,
    RParen,
    RBrack,
    RBrace,
);

impl RawTok {
    #[inline(always)]
    const fn can_insert_semicolon(self) -> bool {
        SEMI_INSERT_TABLE[self as usize]
    }

    fn to_token<'src>(self, slice: &'src str) -> Tok<'src> {
        macro_rules! simple_tok {
            ($($raw:ident => $tok:ident),* $(,)?) => {
                match self {
                    Self::Ident => Tok::Ident(slice),
                    Self::Rune => Tok::RuneLit(slice),
                    Self::String => Tok::StringLit(slice),
                    Self::RawString => Tok::RawStringLit(slice),
                    Self::Number => match classify_number(slice) {
                        NumKind::Int => Tok::IntLit(slice),
                        NumKind::Float => Tok::FloatLit(slice),
                        NumKind::Imag => Tok::ImagLit(slice),
                    },
                    Self::LineComment | Self::BlockComment => Tok::Comment(slice),
                    $(Self::$raw => Tok::$tok,)*
                    Self::Newline | Self::Bom => Tok::Error,
                }
            };
        }

        simple_tok! {
            KwBreak => KwBreak, KwCase => KwCase, KwChan => KwChan, KwConst => KwConst,
            KwContinue => KwContinue, KwDefault => KwDefault, KwDefer => KwDefer, KwElse => KwElse,
            KwFallthrough => KwFallthrough, KwFor => KwFor, KwFunc => KwFunc, KwGo => KwGo,
            KwGoto => KwGoto, KwIf => KwIf, KwImport => KwImport, KwInterface => KwInterface,
            KwMap => KwMap, KwPackage => KwPackage, KwRange => KwRange, KwReturn => KwReturn,
            KwSelect => KwSelect, KwStruct => KwStruct, KwSwitch => KwSwitch, KwType => KwType, KwVar => KwVar,

            Ellipsis => Ellipsis, ShlAssign => ShlAssign, ShrAssign => ShrAssign, AndNotAssign => AndNotAssign,
            AddAssign => AddAssign, SubAssign => SubAssign, MulAssign => MulAssign, DivAssign => DivAssign,
            ModAssign => ModAssign, AndAssign => AndAssign, OrAssign => OrAssign, XorAssign => XorAssign,
            Shl => Shl, Shr => Shr, AndNot => AndNot, LAnd => LAnd, LOr => LOr, EqEq => EqEq, NotEq => NotEq,
            Le => Le, Ge => Ge, Inc => Inc, Dec => Dec, Define => Define, Arrow => Arrow,
            Assign => Assign, Plus => Plus, Minus => Minus, Star => Star, Slash => Slash, Percent => Percent,
            Amp => Amp, Pipe => Pipe, Caret => Caret, Tilde => Tilde, Bang => Bang, Lt => Lt, Gt => Gt,

            LParen => LParen, RParen => RParen, LBrack => LBrack, RBrack => RBrack, LBrace => LBrace,
            RBrace => RBrace, Comma => Comma, Semi => Semi, Colon => Colon, Dot => Dot, Error => Error,
        }
    }
}

// =============================================================================
// 5. Public Token Definition (zero-copy)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tok<'input> {
    Ident(&'input str),
    IntLit(&'input str),
    FloatLit(&'input str),
    ImagLit(&'input str),
    RuneLit(&'input str),
    StringLit(&'input str),
    RawStringLit(&'input str),

    /// Line or block comment, text included. Only produced by
    /// [`Lexer::with_comments`].
    Comment(&'input str),

    // Keywords
    KwBreak,
    KwCase,
    KwChan,
    KwConst,
    KwContinue,
    KwDefault,
    KwDefer,
    KwElse,
    KwFallthrough,
    KwFor,
    KwFunc,
    KwGo,
    KwGoto,
    KwIf,
    KwImport,
    KwInterface,
    KwMap,
    KwPackage,
    KwRange,
    KwReturn,
    KwSelect,
    KwStruct,
    KwSwitch,
    KwType,
    KwVar,

    // Operators / Delimiters
    Ellipsis,
    ShlAssign,
    ShrAssign,
    AndNotAssign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    Shl,
    Shr,
    AndNot,
    LAnd,
    LOr,
    EqEq,
    NotEq,
    Le,
    Ge,
    Inc,
    Dec,
    Define,
    Arrow,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Bang,
    Lt,
    Gt,
    LParen,
    RParen,
    LBrack,
    RBrack,
    LBrace,
    RBrace,
    Comma,
    Semi,
    Colon,
    Dot,

    Error,
}

impl Tok<'_> {
    /// Reports whether the token is one of Go's 25 reserved keywords.
    pub const fn is_keyword(&self) -> bool {
        matches!(
            self,
            Tok::KwBreak
                | Tok::KwCase
                | Tok::KwChan
                | Tok::KwConst
                | Tok::KwContinue
                | Tok::KwDefault
                | Tok::KwDefer
                | Tok::KwElse
                | Tok::KwFallthrough
                | Tok::KwFor
                | Tok::KwFunc
                | Tok::KwGo
                | Tok::KwGoto
                | Tok::KwIf
                | Tok::KwImport
                | Tok::KwInterface
                | Tok::KwMap
                | Tok::KwPackage
                | Tok::KwRange
                | Tok::KwReturn
                | Tok::KwSelect
                | Tok::KwStruct
                | Tok::KwSwitch
                | Tok::KwType
                | Tok::KwVar
        )
    }
}

impl<'input> std::fmt::Display for Tok<'input> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tok::Ident(s)
            | Tok::IntLit(s)
            | Tok::FloatLit(s)
            | Tok::ImagLit(s)
            | Tok::RuneLit(s)
            | Tok::StringLit(s)
            | Tok::RawStringLit(s) => write!(f, "{s:?}"),
            Tok::Comment(_) => f.write_str("comment"),
            other => write!(f, "{other:?}"),
        }
    }
}

// =============================================================================
// 6. Lexer wrapper: semicolon insertion + comments + diags
// =============================================================================

pub type Spanned<'src> = (usize, Tok<'src>, usize);

pub struct Lexer<'src> {
    logos: LogosLexer<'src, RawTok>,
    pending: SmallVec<[Spanned<'src>; 2]>,
    diags: Vec<Diag>,
    last_can_insert_semi: bool,
    keep_comments: bool,
    src_len: usize,
    eof_done: bool,
}

impl<'src> Lexer<'src> {
    /// Lexer that drops comments, as the parser wants them.
    pub fn new(input: &'src str) -> Self {
        Self {
            logos: RawTok::lexer(input),
            pending: SmallVec::new(),
            diags: Vec::with_capacity(16),
            last_can_insert_semi: false,
            keep_comments: false,
            src_len: input.len(),
            eof_done: false,
        }
    }

    /// Lexer that also yields `Tok::Comment` for every comment.
    pub fn with_comments(input: &'src str) -> Self {
        Self {
            keep_comments: true,
            ..Self::new(input)
        }
    }

    pub fn take_diags(&mut self) -> Vec<Diag> {
        std::mem::take(&mut self.diags)
    }

    #[inline]
    fn push_lex_diag(&mut self, kind: LexErrorKind, span: Range<usize>) {
        let sp = Span::new(span.start, span.end);
        self.diags.push(LexError { kind, span: sp }.diag());
    }

    #[inline]
    fn emit_semi_at(&mut self, pos: usize) {
        self.pending.push((pos, Tok::Semi, pos));
    }

    #[inline]
    fn handle_trivia(&mut self, raw: RawTok, span: &Range<usize>, slice: &'src str) -> bool {
        match raw {
            RawTok::Newline => {
                if self.last_can_insert_semi {
                    self.last_can_insert_semi = false;
                    self.emit_semi_at(span.start);
                }
                true
            }
            RawTok::LineComment => {
                if self.keep_comments {
                    self.pending.push((span.start, Tok::Comment(slice), span.end));
                }
                true
            }
            RawTok::BlockComment => {
                if self.last_can_insert_semi {
                    if let Some(off) = first_newline_offset(slice) {
                        self.last_can_insert_semi = false;
                        // With comments kept the `;` precedes the comment so
                        // token starts stay monotonic.
                        let at = if self.keep_comments {
                            span.start
                        } else {
                            span.start + off
                        };
                        self.emit_semi_at(at);
                    }
                }
                if self.keep_comments {
                    self.pending.push((span.start, Tok::Comment(slice), span.end));
                }
                true
            }
            _ => false,
        }
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Spanned<'src>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            // 1) Emit pending tokens (injected ';' and comments), oldest first.
            if !self.pending.is_empty() {
                return Some(self.pending.remove(0));
            }

            // 2) Hard EOF
            if self.eof_done {
                return None;
            }

            // 3) Next raw token
            match self.logos.next() {
                None => {
                    self.handle_eof();
                    continue;
                }

                Some(Err(kind)) => return Some(self.handle_lex_error(kind)),

                Some(Ok(raw)) => {
                    if let Some(item) = self.handle_raw_token(raw) {
                        return Some(item);
                    }
                }
            }
        }
    }
}

impl<'src> Lexer<'src> {
    #[inline]
    fn handle_eof(&mut self) {
        self.eof_done = true;

        if self.last_can_insert_semi {
            self.last_can_insert_semi = false;
            self.emit_semi_at(self.src_len);
        }
    }

    #[inline]
    fn handle_lex_error(&mut self, kind: LexErrorKind) -> Spanned<'src> {
        let span = self.logos.span();
        self.push_lex_diag(kind, span.clone());
        self.last_can_insert_semi = false;
        (span.start, Tok::Error, span.end)
    }

    /// Returns `None` when the raw token produced nothing to emit directly
    /// (trivia, a leading BOM); queued tokens are picked up by the caller.
    #[inline]
    fn handle_raw_token(&mut self, raw: RawTok) -> Option<Spanned<'src>> {
        let span = self.logos.span();
        let slice = self.logos.slice();

        if raw == RawTok::Bom {
            if span.start == 0 {
                return None;
            }
            self.push_lex_diag(LexErrorKind::InvalidToken, span.clone());
            self.last_can_insert_semi = false;
            return Some((span.start, Tok::Error, span.end));
        }

        if self.handle_trivia(raw, &span, slice) {
            return None;
        }

        if raw == RawTok::Error {
            self.push_lex_diag(LexErrorKind::InvalidToken, span.clone());
            self.last_can_insert_semi = false;
            return Some((span.start, Tok::Error, span.end));
        }

        self.last_can_insert_semi = raw.can_insert_semicolon();
        Some((span.start, raw.to_token(slice), span.end))
    }
}
