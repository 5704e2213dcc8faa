//! Go declaration-level lexer and parser.
//!
//! - The lexer uses Logos and implements Go semicolon insertion.
//! - The parser is hand-written recursive descent over the collected token
//!   stream and fills an [`ast::AstArena`].

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
mod parser_support;

pub use error::{Diag, ParseFailure};
pub use lexer::Lexer;
pub use parser::{parse_file, parse_file_into};
