use gosyntax::lexer::{Lexer, Tok};

fn injected_semis(input: &str) -> Vec<usize> {
    Lexer::new(input)
        .filter_map(|(s, t, e)| (matches!(t, Tok::Semi) && s == e).then_some(s))
        .collect()
}

fn tok_name(t: &Tok<'_>) -> &'static str {
    match t {
        Tok::Ident(_) => "IDENT",
        Tok::IntLit(_) => "INT",
        Tok::FloatLit(_) => "FLOAT",
        Tok::ImagLit(_) => "IMAG",
        Tok::RuneLit(_) => "CHAR",
        Tok::StringLit(_) | Tok::RawStringLit(_) => "STRING",
        Tok::Comment(_) => "COMMENT",
        Tok::Semi => ";",
        Tok::Inc => "++",
        Tok::Dec => "--",
        Tok::Plus => "+",
        Tok::Assign => "=",
        Tok::Define => ":=",
        Tok::LParen => "(",
        Tok::RParen => ")",
        Tok::LBrack => "[",
        Tok::RBrack => "]",
        Tok::LBrace => "{",
        Tok::RBrace => "}",
        Tok::Comma => ",",
        Tok::Dot => ".",
        Tok::KwBreak => "break",
        Tok::KwContinue => "continue",
        Tok::KwFallthrough => "fallthrough",
        Tok::KwReturn => "return",
        Tok::KwFunc => "func",
        Tok::KwIf => "if",
        Tok::KwPackage => "package",
        Tok::KwVar => "var",
        Tok::KwStruct => "struct",
        Tok::Error => "ERROR",
        _ => "OTHER",
    }
}

fn lex_names(input: &str, comments: bool) -> String {
    let lx = if comments {
        Lexer::with_comments(input)
    } else {
        Lexer::new(input)
    };
    lx.map(|(_, t, _)| tok_name(&t)).collect::<Vec<_>>().join(" ")
}

struct SemiCase {
    input: &'static str,
    want: &'static str,
}

// `want` lists COMMENT tokens; they are dropped when lexing without comments.
#[rustfmt::skip]
const SEMICOLON_TESTS: &[SemiCase] = &[
    SemiCase { input: "", want: "" },
    SemiCase { input: "\u{FEFF};", want: ";" },
    SemiCase { input: ";", want: ";" },

    SemiCase { input: "foo\n", want: "IDENT ;" },
    SemiCase { input: "123\n", want: "INT ;" },
    SemiCase { input: "1.2\n", want: "FLOAT ;" },
    SemiCase { input: "2i\n", want: "IMAG ;" },
    SemiCase { input: "'x'\n", want: "CHAR ;" },
    SemiCase { input: "\"x\"\n", want: "STRING ;" },
    SemiCase { input: "`x`\n", want: "STRING ;" },

    SemiCase { input: "+\n", want: "+" },
    SemiCase { input: "=\n", want: "=" },
    SemiCase { input: ":=\n", want: ":=" },
    SemiCase { input: "++\n", want: "++ ;" },
    SemiCase { input: "--\n", want: "-- ;" },

    SemiCase { input: "(\n", want: "(" },
    SemiCase { input: "[\n", want: "[" },
    SemiCase { input: "{\n", want: "{" },
    SemiCase { input: ",\n", want: "," },
    SemiCase { input: ")\n", want: ") ;" },
    SemiCase { input: "]\n", want: "] ;" },
    SemiCase { input: "}\n", want: "} ;" },

    SemiCase { input: "break\n", want: "break ;" },
    SemiCase { input: "continue\n", want: "continue ;" },
    SemiCase { input: "fallthrough\n", want: "fallthrough ;" },
    SemiCase { input: "return\n", want: "return ;" },
    SemiCase { input: "func\n", want: "func" },
    SemiCase { input: "var\n", want: "var" },
    SemiCase { input: "struct\n", want: "struct" },

    SemiCase { input: "foo//comment\n", want: "IDENT COMMENT ;" },
    SemiCase { input: "foo/*comment*/\n", want: "IDENT COMMENT ;" },
    SemiCase { input: "foo/*\n*/", want: "IDENT ; COMMENT" },
    SemiCase { input: "foo    /*comment*/    \n", want: "IDENT COMMENT ;" },

    SemiCase {
        input: "package main\n\nfunc main() {\n\tif {\n\t\treturn /* */ }\n}\n",
        want: "package IDENT ; func IDENT ( ) { if { return COMMENT } ; } ;",
    },
    SemiCase { input: "package main", want: "package IDENT ;" },
];

fn without_comments(want: &str) -> String {
    want.split_whitespace()
        .filter(|w| *w != "COMMENT")
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn semicolon_table_without_comments() {
    for t in SEMICOLON_TESTS {
        let want = without_comments(t.want);
        assert_eq!(lex_names(t.input, false), want, "input=<<{}>>", t.input);
    }
}

#[test]
fn trailing_newlines_do_not_change_the_stream() {
    for t in SEMICOLON_TESTS {
        let want = without_comments(t.want);
        let mut trimmed = t.input;
        while let Some(rest) = trimmed.strip_suffix('\n') {
            trimmed = rest;
            assert_eq!(lex_names(trimmed, false), want, "input=<<{trimmed}>>");
        }
    }
}

#[test]
fn line_comment_is_yielded_before_the_newline_semi() {
    // The line comment ends before the newline, so the `;` follows it.
    assert_eq!(lex_names("foo // c\n", true), "IDENT COMMENT ;");
}

#[test]
fn comment_newline_equivalence() {
    assert_eq!(injected_semis("x/*\n*/y").len(), injected_semis("x\ny").len());
}

#[test]
fn crlf_newline_inserts_at_cr() {
    assert_eq!(injected_semis("x\r\ny"), vec![1, 4]);
}

#[test]
fn block_comment_newline_does_not_insert_after_if() {
    assert_eq!(injected_semis("if/*\n*/x"), vec![8]);
}

#[test]
fn line_comment_at_eof() {
    let src = "x//c";
    assert_eq!(injected_semis(src), vec![src.len()]);
}

#[test]
fn closing_delimiters_insert() {
    assert_eq!(injected_semis("f()\ng"), vec![3, 5]);
    assert_eq!(injected_semis("a[0]\nb"), vec![4, 6]);
    assert_eq!(injected_semis("}\nx"), vec![1, 3]);
}
