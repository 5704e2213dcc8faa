//! Recursive-descent parser for the declaration level of a Go file.
//!
//! Function bodies and initializer expressions are consumed as balanced token
//! runs. The one exception is a composite literal whose type is an array,
//! slice, map or struct type literal; its type is parsed so callers can look
//! at the element type.

use crate::ast::*;
use crate::error::{Diag, ParseFailure};
use crate::lexer::{Lexer, Spanned, Tok};
use crate::parser_support::{self, ParamDecl};

type PResult<T> = Result<T, Diag>;

/// Parses one file into a fresh arena.
pub fn parse_file(src: &str) -> Result<(AstArena, SourceFile), ParseFailure> {
    let mut arena = AstArena::new();
    let file = parse_file_into(&mut arena, src)?;
    Ok((arena, file))
}

/// Parses one file into a shared arena. On failure the arena may hold
/// unreachable nodes from the partial parse.
pub fn parse_file_into(arena: &mut AstArena, src: &str) -> Result<SourceFile, ParseFailure> {
    let mut lexer = Lexer::with_comments(src);
    let mut toks = Vec::with_capacity(src.len() / 4);
    let mut comments = Vec::new();

    for (start, tok, end) in lexer.by_ref() {
        match tok {
            Tok::Comment(text) => {
                let kind = if text.starts_with("//") {
                    CommentKind::Line
                } else {
                    CommentKind::Block
                };
                comments.push((Span::new(start, end), kind));
            }
            _ => toks.push((start, tok, end)),
        }
    }

    let diags = lexer.take_diags();
    if !diags.is_empty() {
        return Err(ParseFailure { diags });
    }

    let mut parser = Parser {
        src,
        toks,
        pos: 0,
        prev_end: 0,
        arena,
        groups: Vec::new(),
    };
    parser.collect_comments(&comments);
    parser
        .source_file()
        .map_err(|diag| ParseFailure { diags: vec![diag] })
}

struct Parser<'src, 'a> {
    src: &'src str,
    toks: Vec<Spanned<'src>>,
    pos: usize,
    /// End offset of the last consumed token.
    prev_end: usize,
    arena: &'a mut AstArena,
    groups: Vec<(CommentGroupId, Span)>,
}

// =============================================================================
// Token cursor
// =============================================================================

impl<'src> Parser<'src, '_> {
    #[inline]
    fn peek(&self) -> Option<Tok<'src>> {
        self.peek_nth(0)
    }

    #[inline]
    fn peek_nth(&self, n: usize) -> Option<Tok<'src>> {
        self.toks.get(self.pos + n).map(|t| t.1)
    }

    #[inline]
    fn at(&self, tok: Tok<'_>) -> bool {
        self.peek() == Some(tok)
    }

    fn cur_span(&self) -> Span {
        match self.toks.get(self.pos) {
            Some(&(start, _, end)) => Span::new(start, end),
            None => Span::new(self.src.len(), self.src.len()),
        }
    }

    fn bump(&mut self) -> Span {
        let sp = self.cur_span();
        if self.pos < self.toks.len() {
            self.prev_end = sp.end as usize;
            self.pos += 1;
        }
        sp
    }

    fn eat(&mut self, tok: Tok<'_>) -> Option<Span> {
        self.at(tok).then(|| self.bump())
    }

    fn expect(&mut self, tok: Tok<'_>, what: &str) -> PResult<Span> {
        match self.eat(tok) {
            Some(sp) => Ok(sp),
            None => Err(self.unexpected(what)),
        }
    }

    fn unexpected(&self, what: &str) -> Diag {
        let found = match self.peek() {
            Some(Tok::Semi) if self.cur_span().is_empty() => "newline".to_owned(),
            Some(tok) => tok.to_string(),
            None => "EOF".to_owned(),
        };
        Diag::parse(self.cur_span(), format!("expected {what}, found {found}"))
    }

    /// A `;` may be omitted before a closing `)` or `}` and at EOF.
    fn expect_semi(&mut self, what: &str) -> PResult<()> {
        match self.peek() {
            Some(Tok::Semi) => {
                self.bump();
                Ok(())
            }
            None | Some(Tok::RParen | Tok::RBrace) => Ok(()),
            Some(_) => Err(self.unexpected(what)),
        }
    }

    fn ident(&mut self, what: &str) -> PResult<IdentName> {
        match self.peek() {
            Some(Tok::Ident(name)) => {
                let pos = self.bump();
                let sym = self.arena.interner.intern(name);
                Ok(IdentName { sym, pos })
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn span_from(&self, start: Span) -> Span {
        Span::new(start.start as usize, self.prev_end.max(start.start as usize))
    }

    /// Token following the bracket group that opens at token index `open`.
    fn after_brackets(&self, open: usize) -> Option<Tok<'src>> {
        let mut depth = 0usize;
        for (i, &(_, tok, _)) in self.toks.iter().enumerate().skip(open) {
            match tok {
                Tok::LBrack => depth += 1,
                Tok::RBrack => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return self.toks.get(i + 1).map(|t| t.1);
                    }
                }
                _ => {}
            }
        }
        None
    }
}

// =============================================================================
// Comments
// =============================================================================

impl Parser<'_, '_> {
    /// Newline count of the gap, or `None` if it holds anything but
    /// whitespace.
    fn gap_newlines(&self, from: u32, to: u32) -> Option<usize> {
        let gap = self.src.get(from as usize..to as usize)?;
        gap.bytes()
            .all(|b| b.is_ascii_whitespace())
            .then(|| gap.bytes().filter(|&b| b == b'\n').count())
    }

    fn collect_comments(&mut self, comments: &[(Span, CommentKind)]) {
        let mut i = 0;
        while i < comments.len() {
            let first = comments[i].0;
            let mut ids = Vec::new();
            let mut last = first;

            while let Some(&(sp, kind)) = comments.get(i) {
                if !ids.is_empty() && self.gap_newlines(last.end, sp.start).is_none_or(|n| n > 1) {
                    break;
                }
                ids.push(self.arena.comments.alloc(Comment { kind }, sp));
                last = sp;
                i += 1;
            }

            let list = self.arena.list_comment_ids(ids);
            let span = first.to(last);
            let id = self
                .arena
                .comment_groups
                .alloc(CommentGroup { comments: list }, span);
            self.groups.push((id, span));
        }
    }

    /// Comment group ending on the line right before `pos`.
    fn doc_for(&self, pos: Span) -> Option<CommentGroupId> {
        let idx = self.groups.partition_point(|(_, sp)| sp.end <= pos.start);
        let &(id, sp) = self.groups.get(idx.checked_sub(1)?)?;
        (self.gap_newlines(sp.end, pos.start) == Some(1)).then_some(id)
    }
}

// =============================================================================
// Declarations
// =============================================================================

impl Parser<'_, '_> {
    fn source_file(&mut self) -> PResult<SourceFile> {
        let types_start = self.arena.types.next_raw();

        let package_pos = self.expect(Tok::KwPackage, "package clause")?;
        let name = self.ident("package name")?;
        self.expect_semi("`;` after package clause")?;

        let mut imports = Vec::new();
        while self.at(Tok::KwImport) {
            self.import_decl(&mut imports)?;
            self.expect_semi("`;` after import declaration")?;
        }

        let mut decls = Vec::new();
        while let Some(tok) = self.peek() {
            let decl = match tok {
                Tok::Semi => {
                    self.bump();
                    continue;
                }
                Tok::KwConst | Tok::KwVar | Tok::KwType => TopLevelDecl::Gen(self.gen_decl()?),
                Tok::KwFunc => TopLevelDecl::Func(self.func_decl()?),
                Tok::KwImport => {
                    return Err(Diag::parse(
                        self.cur_span(),
                        "imports must appear before other declarations",
                    ));
                }
                _ => return Err(self.unexpected("declaration")),
            };
            decls.push(decl);
            self.expect_semi("`;` after top level declaration")?;
        }

        let group_ids: Vec<_> = self.groups.iter().map(|(id, _)| *id).collect();
        Ok(SourceFile {
            package_pos,
            name,
            imports: self.arena.list_imports(imports),
            decls: self.arena.list_top_decls(decls),
            comments: self.arena.list_comment_group_ids(group_ids),
            types: IdRange {
                start: types_start,
                end: self.arena.types.next_raw(),
            },
            span: Span::new(0, self.src.len()),
        })
    }

    fn import_decl(&mut self, out: &mut Vec<ImportSpec>) -> PResult<()> {
        self.bump();
        if self.eat(Tok::LParen).is_some() {
            while !self.at(Tok::RParen) {
                if self.eat(Tok::Semi).is_some() {
                    continue;
                }
                if self.peek().is_none() {
                    return Err(self.unexpected("`)`"));
                }
                out.push(self.import_spec()?);
                self.expect_semi("`;` or `)` after import spec")?;
            }
            self.bump();
        } else {
            out.push(self.import_spec()?);
        }
        Ok(())
    }

    fn import_spec(&mut self) -> PResult<ImportSpec> {
        let name = match self.peek() {
            Some(Tok::Dot) => Some(ImportName::Dot(self.bump())),
            Some(Tok::Ident("_")) => Some(ImportName::Blank(self.bump())),
            Some(Tok::Ident(_)) => Some(ImportName::Name(self.ident("import name")?)),
            _ => None,
        };
        match self.peek() {
            Some(Tok::StringLit(lit) | Tok::RawStringLit(lit)) => {
                let path_pos = self.bump();
                let path = self.arena.interner.intern(parser_support::unquote_path(lit));
                Ok(ImportSpec {
                    name,
                    path,
                    path_pos,
                })
            }
            _ => Err(self.unexpected("import path")),
        }
    }

    fn gen_decl(&mut self) -> PResult<GenDeclId> {
        let kind = match self.peek() {
            Some(Tok::KwConst) => GenDeclKind::Const,
            Some(Tok::KwType) => GenDeclKind::Type,
            _ => GenDeclKind::Var,
        };
        let kw_pos = self.bump();

        let mut specs = Vec::new();
        let (l_paren, r_paren) = if let Some(l_paren) = self.eat(Tok::LParen) {
            while !self.at(Tok::RParen) {
                if self.eat(Tok::Semi).is_some() {
                    continue;
                }
                if self.peek().is_none() {
                    return Err(self.unexpected("`)`"));
                }
                specs.push(self.spec(kind)?);
                self.expect_semi("`;` or `)` after spec")?;
            }
            (Some(l_paren), Some(self.bump()))
        } else {
            specs.push(self.spec(kind)?);
            (None, None)
        };

        let span = self.span_from(kw_pos);
        let specs = self.arena.list_specs(specs);
        Ok(self.arena.gen_decls.alloc(
            GenDecl {
                kw_pos,
                kind,
                l_paren,
                specs,
                r_paren,
            },
            span,
        ))
    }

    fn spec(&mut self, kind: GenDeclKind) -> PResult<Spec> {
        match kind {
            GenDeclKind::Type => self.type_spec().map(Spec::Type),
            GenDeclKind::Const | GenDeclKind::Var => self.value_spec().map(Spec::Value),
        }
    }

    fn value_spec(&mut self) -> PResult<ValueSpec> {
        let mut names = vec![self.ident("identifier")?];
        while self.eat(Tok::Comma).is_some() {
            names.push(self.ident("identifier")?);
        }

        let typ = match self.peek() {
            Some(tok) if parser_support::starts_type(tok) => Some(self.parse_type()?),
            _ => None,
        };

        let mut values = Vec::new();
        if self.eat(Tok::Assign).is_some() {
            loop {
                values.push(self.expr()?);
                if self.eat(Tok::Comma).is_none() {
                    break;
                }
            }
        }

        Ok(ValueSpec {
            names: self.arena.list_ident_names(names),
            typ,
            values: self.arena.list_exprs(values),
        })
    }

    fn type_spec(&mut self) -> PResult<TypeSpec> {
        let name = self.ident("type name")?;
        let type_params = if self.at(Tok::LBrack) && self.looks_like_type_params() {
            Some(self.type_params()?)
        } else {
            None
        };
        let alias = self.eat(Tok::Assign).is_some();
        let typ = self.parse_type()?;
        Ok(TypeSpec {
            name,
            type_params,
            alias,
            typ,
        })
    }

    /// `type T[P C] ...` versus `type T [N]E`.
    fn looks_like_type_params(&self) -> bool {
        matches!(self.peek_nth(1), Some(Tok::Ident(_)))
            && matches!(
                self.peek_nth(2),
                Some(
                    Tok::Ident(_)
                        | Tok::Comma
                        | Tok::Tilde
                        | Tok::LBrack
                        | Tok::KwInterface
                        | Tok::KwFunc
                        | Tok::KwMap
                        | Tok::KwChan
                        | Tok::KwStruct
                )
            )
    }

    fn func_decl(&mut self) -> PResult<FuncDeclId> {
        let func_pos = self.bump();
        let doc = self.doc_for(func_pos);

        let recv = if self.at(Tok::LParen) {
            let list = self.param_list()?;
            let &[field] = self.arena.fields_list(list.fields) else {
                return Err(Diag::parse(list.l_paren, "method must have exactly one receiver"));
            };
            let field = self.arena.fields[field];
            let name = self.arena.ident_names(field.names).first().copied();
            Some(Receiver {
                name,
                typ: field.typ,
            })
        } else {
            None
        };

        let name = self.ident("function name")?;
        let type_params = if self.at(Tok::LBrack) {
            Some(self.type_params()?)
        } else {
            None
        };
        let signature = self.signature()?;
        let body = if self.at(Tok::LBrace) {
            Some(self.skip_braces()?)
        } else {
            None
        };

        let span = self.span_from(func_pos);
        Ok(self.arena.funcs.alloc(
            FuncDecl {
                doc,
                func_pos,
                recv,
                name,
                type_params,
                signature,
                body,
            },
            span,
        ))
    }
}

// =============================================================================
// Generics
// =============================================================================

impl Parser<'_, '_> {
    fn type_params(&mut self) -> PResult<TypeParamsId> {
        let open = self.expect(Tok::LBrack, "`[`")?;
        let mut decls = Vec::new();
        let mut pending: Vec<IdentName> = Vec::new();

        while !self.at(Tok::RBrack) {
            pending.push(self.ident("type parameter")?);
            if self.eat(Tok::Comma).is_some() {
                continue;
            }
            if self.at(Tok::RBrack) {
                break;
            }
            let constraint = self.type_elem()?;
            let names = self.arena.list_ident_names(std::mem::take(&mut pending));
            decls.push(TypeParamDecl { names, constraint });
            if self.eat(Tok::Comma).is_none() {
                break;
            }
        }

        if let Some(name) = pending.first() {
            return Err(Diag::parse(name.pos, "type parameter is missing a constraint"));
        }
        self.expect(Tok::RBrack, "`]`")?;

        let span = self.span_from(open);
        let params = self.arena.list_type_param_decls(decls);
        Ok(self.arena.type_params.alloc(TypeParams { params }, span))
    }

    fn type_elem(&mut self) -> PResult<TypeElem> {
        let mut terms = vec![self.type_term()?];
        while self.eat(Tok::Pipe).is_some() {
            terms.push(self.type_term()?);
        }
        Ok(TypeElem {
            terms: self.arena.list_type_terms(terms),
        })
    }

    fn type_term(&mut self) -> PResult<TypeTerm> {
        match self.eat(Tok::Tilde) {
            Some(tilde_pos) => Ok(TypeTerm::Tilde {
                tilde_pos,
                typ: self.parse_type()?,
            }),
            None => Ok(TypeTerm::Type {
                typ: self.parse_type()?,
            }),
        }
    }
}

// =============================================================================
// Types
// =============================================================================

impl Parser<'_, '_> {
    fn parse_type(&mut self) -> PResult<TypeId> {
        let start = self.cur_span();
        let typ = match self.peek() {
            Some(Tok::Ident(_)) => return self.type_name(),
            Some(Tok::Star) => {
                let star_pos = self.bump();
                Type::Pointer {
                    star_pos,
                    elem: self.parse_type()?,
                }
            }
            Some(Tok::LBrack) => {
                self.bump();
                if self.eat(Tok::RBrack).is_some() {
                    Type::Slice {
                        elem: self.parse_type()?,
                    }
                } else {
                    let len = match (self.peek(), self.peek_nth(1)) {
                        (Some(Tok::Ellipsis), Some(Tok::RBrack)) => ArrayLen::Ellipsis(self.bump()),
                        _ => self.array_len()?,
                    };
                    self.expect(Tok::RBrack, "`]`")?;
                    Type::Array {
                        len,
                        elem: self.parse_type()?,
                    }
                }
            }
            Some(Tok::KwMap) => {
                self.bump();
                self.expect(Tok::LBrack, "`[`")?;
                let key = self.parse_type()?;
                self.expect(Tok::RBrack, "`]`")?;
                Type::Map {
                    key,
                    val: self.parse_type()?,
                }
            }
            Some(Tok::KwChan) => {
                self.bump();
                let dir = if self.eat(Tok::Arrow).is_some() {
                    ChanDir::Send
                } else {
                    ChanDir::Both
                };
                Type::Chan {
                    dir,
                    elem: self.parse_type()?,
                }
            }
            Some(Tok::Arrow) => {
                self.bump();
                self.expect(Tok::KwChan, "`chan`")?;
                Type::Chan {
                    dir: ChanDir::Recv,
                    elem: self.parse_type()?,
                }
            }
            Some(Tok::KwStruct) => self.struct_type()?,
            Some(Tok::KwInterface) => self.interface_type()?,
            Some(Tok::KwFunc) => {
                self.bump();
                Type::Func {
                    sig: self.signature()?,
                }
            }
            Some(Tok::LParen) => {
                self.bump();
                let typ = self.parse_type()?;
                self.expect(Tok::RParen, "`)`")?;
                Type::Paren { typ }
            }
            _ => return Err(self.unexpected("type")),
        };
        let span = self.span_from(start);
        Ok(self.arena.types.alloc(typ, span))
    }

    fn type_name(&mut self) -> PResult<TypeId> {
        let first = self.ident("type name")?;
        let (pkg, name) = if self.eat(Tok::Dot).is_some() {
            (Some(first), self.ident("qualified type name")?)
        } else {
            (None, first)
        };

        let args = if self.at(Tok::LBrack) {
            self.bump();
            let mut args = Vec::new();
            while !self.at(Tok::RBrack) {
                args.push(self.parse_type()?);
                if self.eat(Tok::Comma).is_none() {
                    break;
                }
            }
            self.expect(Tok::RBrack, "`]` after type arguments")?;
            self.arena.list_types(args)
        } else {
            ListRef::EMPTY
        };

        let span = self.span_from(first.pos);
        Ok(self.arena.types.alloc(Type::Named { pkg, name, args }, span))
    }

    /// Array length expression up to the closing `]`, kept as whitespace-free
    /// source text.
    fn array_len(&mut self) -> PResult<ArrayLen> {
        let first = self.cur_span();
        let mut depth = 0usize;
        loop {
            match self.peek() {
                None => return Err(self.unexpected("`]`")),
                Some(Tok::RBrack) if depth == 0 => break,
                Some(Tok::LBrack | Tok::LParen | Tok::LBrace) => depth += 1,
                Some(Tok::RBrack | Tok::RParen | Tok::RBrace) => depth = depth.saturating_sub(1),
                Some(_) => {}
            }
            self.bump();
        }

        let pos = self.span_from(first);
        let text: String = self.src[pos.range()].split_whitespace().collect();
        Ok(ArrayLen::Expr {
            text: self.arena.interner.intern(&text),
            pos,
        })
    }

    fn struct_type(&mut self) -> PResult<Type> {
        self.bump();
        self.expect(Tok::LBrace, "`{` after struct")?;
        let mut fields = Vec::new();
        while !self.at(Tok::RBrace) {
            if self.eat(Tok::Semi).is_some() {
                continue;
            }
            if self.peek().is_none() {
                return Err(self.unexpected("`}`"));
            }
            fields.push(self.struct_field()?);
            self.expect_semi("`;` or `}` after field")?;
        }
        self.bump();
        Ok(Type::Struct {
            fields: self.arena.list_fields(fields),
        })
    }

    fn struct_field(&mut self) -> PResult<FieldId> {
        let start = self.cur_span();
        let embedded = match (self.peek(), self.peek_nth(1)) {
            (Some(Tok::Star), _) => true,
            (
                Some(Tok::Ident(_)),
                None
                | Some(
                    Tok::Dot | Tok::Semi | Tok::RBrace | Tok::StringLit(_) | Tok::RawStringLit(_),
                ),
            ) => true,
            (Some(Tok::Ident(_)), Some(Tok::LBrack)) => matches!(
                self.after_brackets(self.pos + 1),
                None | Some(Tok::Semi | Tok::RBrace | Tok::StringLit(_) | Tok::RawStringLit(_))
            ),
            (Some(Tok::Ident(_)), _) => false,
            _ => return Err(self.unexpected("field name or embedded type")),
        };

        let (names, typ) = if embedded {
            (ListRef::EMPTY, self.parse_type()?)
        } else {
            let mut names = vec![self.ident("field name")?];
            while self.eat(Tok::Comma).is_some() {
                names.push(self.ident("field name")?);
            }
            let typ = self.parse_type()?;
            (self.arena.list_ident_names(names), typ)
        };

        let tag = match self.peek() {
            Some(Tok::StringLit(_) | Tok::RawStringLit(_)) => Some(self.bump()),
            _ => None,
        };

        let span = self.span_from(start);
        Ok(self.arena.fields.alloc(
            Field {
                names,
                typ,
                tag,
                is_embed: embedded,
            },
            span,
        ))
    }

    fn interface_type(&mut self) -> PResult<Type> {
        self.bump();
        self.expect(Tok::LBrace, "`{` after interface")?;
        let mut elems = Vec::new();
        while !self.at(Tok::RBrace) {
            if self.eat(Tok::Semi).is_some() {
                continue;
            }
            if self.peek().is_none() {
                return Err(self.unexpected("`}`"));
            }
            let elem = match (self.peek(), self.peek_nth(1)) {
                (Some(Tok::Ident(_)), Some(Tok::LParen)) => {
                    let name = self.ident("method name")?;
                    InterfaceElem::Method {
                        name,
                        sig: self.signature()?,
                    }
                }
                _ => InterfaceElem::TypeElem(self.type_elem()?),
            };
            elems.push(elem);
            self.expect_semi("`;` or `}` after interface element")?;
        }
        self.bump();
        Ok(Type::Interface {
            elems: self.arena.list_interface_elems(elems),
        })
    }

    fn signature(&mut self) -> PResult<SignatureId> {
        let start = self.cur_span();
        let params = self.param_list()?;
        let results = match self.peek() {
            Some(Tok::LParen) => Some(Results::Params(self.param_list()?)),
            Some(tok) if parser_support::starts_type(tok) => Some(Results::Type(self.parse_type()?)),
            _ => None,
        };
        let span = self.span_from(start);
        Ok(self
            .arena
            .signatures
            .alloc(Signature { params, results }, span))
    }

    fn param_list(&mut self) -> PResult<FieldList> {
        let l_paren = self.expect(Tok::LParen, "`(`")?;
        let mut entries = Vec::new();
        while !self.at(Tok::RParen) {
            entries.push(self.param_entry()?);
            if self.eat(Tok::Comma).is_none() {
                break;
            }
        }
        let r_paren = self.expect(Tok::RParen, "`)` after parameters")?;

        let fields = parser_support::resolve_param_list(self.arena, entries)
            .map_err(|sp| Diag::parse(sp, "mixed named and unnamed parameters"))?;
        Ok(FieldList {
            l_paren,
            fields: self.arena.list_fields(fields),
            r_paren,
        })
    }

    fn param_entry(&mut self) -> PResult<ParamDecl> {
        let start = self.cur_span();
        let (names, typ) = match (self.peek(), self.peek_nth(1)) {
            (Some(Tok::Ident(_)), Some(Tok::Comma | Tok::RParen)) => {
                (vec![self.ident("parameter")?], None)
            }
            (Some(Tok::Ident(_)), Some(Tok::Dot)) => (Vec::new(), Some(self.parse_type()?)),
            (Some(Tok::Ident(_)), Some(Tok::LBrack))
                if matches!(
                    self.after_brackets(self.pos + 1),
                    Some(Tok::Comma | Tok::RParen)
                ) =>
            {
                (Vec::new(), Some(self.parse_type()?))
            }
            (Some(Tok::Ident(_)), Some(next))
                if next == Tok::Ellipsis || parser_support::starts_type(next) =>
            {
                let name = self.ident("parameter")?;
                (vec![name], Some(self.param_type()?))
            }
            _ => (Vec::new(), Some(self.param_type()?)),
        };
        Ok(ParamDecl {
            names,
            typ,
            span: self.span_from(start),
        })
    }

    fn param_type(&mut self) -> PResult<TypeId> {
        let Some(dots) = self.eat(Tok::Ellipsis) else {
            return self.parse_type();
        };
        let elem = self.parse_type()?;
        let span = self.span_from(dots);
        Ok(self.arena.types.alloc(Type::Variadic { elem }, span))
    }
}

// =============================================================================
// Expressions
// =============================================================================

impl Parser<'_, '_> {
    fn expr(&mut self) -> PResult<ExprId> {
        let start = self.cur_span();

        if matches!(
            self.peek(),
            Some(Tok::LBrack | Tok::KwMap | Tok::KwStruct)
        ) {
            if let Some(lit) = self.try_composite_lit(start)? {
                return Ok(lit);
            }
        }

        self.skip_expr()?;
        let span = self.span_from(start);
        Ok(self.arena.exprs.alloc(Expr::Opaque(span), span))
    }

    /// Parses `T{...}` when it forms the whole expression; otherwise rewinds
    /// and returns `None`.
    fn try_composite_lit(&mut self, start: Span) -> PResult<Option<ExprId>> {
        let (save_pos, save_end) = (self.pos, self.prev_end);

        if let Ok(typ) = self.parse_type() {
            if self.at(Tok::LBrace) {
                let body = self.skip_braces()?;
                if matches!(
                    self.peek(),
                    None | Some(Tok::Semi | Tok::Comma | Tok::RParen)
                ) {
                    let lit = LiteralValue {
                        l_brace: Span::new(body.start as usize, body.start as usize + 1),
                        r_brace: Span::new(body.end as usize - 1, body.end as usize),
                    };
                    let span = self.span_from(start);
                    return Ok(Some(
                        self.arena.exprs.alloc(Expr::CompositeLit { typ, lit }, span),
                    ));
                }
            }
        }

        self.pos = save_pos;
        self.prev_end = save_end;
        Ok(None)
    }

    fn skip_expr(&mut self) -> PResult<()> {
        let start = self.pos;
        let mut depth = 0usize;
        loop {
            match self.peek() {
                None if depth > 0 => return Err(self.unexpected("closing delimiter")),
                None => break,
                Some(Tok::LParen | Tok::LBrack | Tok::LBrace) => depth += 1,
                Some(Tok::RParen | Tok::RBrack | Tok::RBrace) => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                Some(Tok::Comma | Tok::Semi) if depth == 0 => break,
                Some(_) => {}
            }
            self.bump();
        }

        if self.pos == start {
            return Err(self.unexpected("expression"));
        }
        Ok(())
    }

    /// Consumes a `{ ... }` block and returns its span, braces included.
    fn skip_braces(&mut self) -> PResult<Span> {
        let open = self.expect(Tok::LBrace, "`{`")?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.peek() {
                None => return Err(Diag::parse(open, "unclosed `{`")),
                Some(Tok::LBrace) => depth += 1,
                Some(Tok::RBrace) => depth -= 1,
                Some(_) => {}
            }
            self.bump();
        }
        Ok(self.span_from(open))
    }
}
