use crate::ast::{self, ListRef, Span};
use crate::lexer::Tok;

/// One comma-separated entry of a parameter or type-parameter list, before
/// grouping. A lone identifier (`a` in `a, b int`) has no type yet.
#[derive(Clone, Debug)]
pub struct ParamDecl {
    pub names: Vec<ast::IdentName>,
    pub typ: Option<ast::TypeId>,
    pub span: Span,
}

/// Groups parameter entries into fields.
///
/// If any entry carries both a name and a type, the list is named: lone
/// identifiers accumulate until the next typed entry and share its type
/// (`a, b int`). Otherwise every entry is a type on its own (`int, string`)
/// and lone identifiers are type names.
pub fn resolve_param_list(
    arena: &mut ast::AstArena,
    params: Vec<ParamDecl>,
) -> PResultless<Vec<ast::FieldId>> {
    let named = params
        .iter()
        .any(|p| p.typ.is_some() && !p.names.is_empty());

    let mut out = Vec::with_capacity(params.len());

    if !named {
        for param in params {
            match param.typ {
                Some(typ) => out.push(alloc_field(arena, ListRef::EMPTY, typ, param.span)),
                None => {
                    for name in param.names {
                        let typ = named_type_from_ident(arena, name);
                        out.push(alloc_field(arena, ListRef::EMPTY, typ, name.pos));
                    }
                }
            }
        }
        return Ok(out);
    }

    let mut pending_names: Vec<ast::IdentName> = Vec::new();
    let mut pending_start: Option<u32> = None;

    for param in params {
        match param.typ {
            Some(typ) => {
                if param.names.is_empty() {
                    return Err(param.span);
                }
                let mut names = std::mem::take(&mut pending_names);
                names.extend(param.names);
                let names_ref = arena.list_ident_names(names);
                let span = Span {
                    start: pending_start.take().unwrap_or(param.span.start),
                    end: param.span.end,
                };
                out.push(alloc_field(arena, names_ref, typ, span));
            }
            None => {
                if pending_names.is_empty() {
                    pending_start = Some(param.span.start);
                }
                pending_names.extend(param.names);
            }
        }
    }

    // `a, b int, c` mixes named and anonymous parameters.
    if let Some(last) = pending_names.last() {
        return Err(last.pos);
    }

    Ok(out)
}

/// Result whose error is only the offending span; the caller words the
/// diagnostic.
pub type PResultless<T> = Result<T, Span>;

fn alloc_field(
    arena: &mut ast::AstArena,
    names: ListRef<ast::IdentName>,
    typ: ast::TypeId,
    span: Span,
) -> ast::FieldId {
    arena.fields.alloc(
        ast::Field {
            names,
            typ,
            tag: None,
            is_embed: false,
        },
        span,
    )
}

pub fn named_type_from_ident(arena: &mut ast::AstArena, name: ast::IdentName) -> ast::TypeId {
    arena.types.alloc(
        ast::Type::Named {
            pkg: None,
            name,
            args: ListRef::EMPTY,
        },
        name.pos,
    )
}

/// Tokens that can begin a type expression.
#[inline]
pub fn starts_type(tok: Tok<'_>) -> bool {
    matches!(
        tok,
        Tok::Ident(_)
            | Tok::Star
            | Tok::LBrack
            | Tok::LParen
            | Tok::Arrow
            | Tok::KwMap
            | Tok::KwChan
            | Tok::KwFunc
            | Tok::KwStruct
            | Tok::KwInterface
    )
}

/// Strips the quotes of an import path literal. Import paths never need
/// escape processing.
#[inline]
pub fn unquote_path(lit: &str) -> &str {
    let bytes = lit.as_bytes();
    if bytes.len() >= 2 && matches!(bytes[0], b'"' | b'`') && bytes[bytes.len() - 1] == bytes[0] {
        &lit[1..lit.len() - 1]
    } else {
        lit
    }
}
