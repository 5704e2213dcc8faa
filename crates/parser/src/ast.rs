//! # Go declaration AST
//!
//! Arena-allocated syntax tree for the declaration level of a Go source file:
//! package clause, imports, `const`/`var`/`type` declarations, functions and
//! methods, and every type expression they contain.
//!
//! ## Architecture
//!
//! - **Nodes**: allocated in typed arenas (`SpannedArena<T>`), addressed by `Id<T>`
//! - **Lists**: centralized buffers referenced through `ListRef<T>`
//! - **Spans**: stored in side tables next to each node
//! - **Symbols**: identifiers are interned once per arena
//!
//! Several files of one package share a single `AstArena`, so ids from any of
//! them can be compared and looked up without knowing the file. Each
//! `SourceFile` records the id ranges it owns.
//!
//! Function bodies and initializer expressions are not modelled; they are kept
//! as opaque spans, except composite literals whose type is spelled in place.

use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::ops::{Index, IndexMut};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::hash::{BuildHasher, BuildHasherDefault, RandomState};

// =============================================================================
// Core Foundation Types
// =============================================================================

/// Byte span `[start, end)` in the source file.
///
/// Positions are stored as `u32`, limiting file size to 4GB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Creates a new span from usize positions.
    ///
    /// # Panics
    /// In debug builds, panics if positions exceed `u32::MAX`.
    #[inline]
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= u32::MAX as usize);
        debug_assert!(end <= u32::MAX as usize);
        Self {
            start: start as u32,
            end: end as u32,
        }
    }

    #[inline]
    pub const fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Smallest span covering both.
    #[inline]
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    #[inline]
    pub fn range(self) -> core::ops::Range<usize> {
        self.start as usize..self.end as usize
    }
}

/// Type-safe identifier for arena-allocated nodes.
#[repr(transparent)]
pub struct Id<T> {
    raw: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub const fn to_usize(&self) -> usize {
        self.raw as usize
    }

    #[inline]
    pub const fn raw(&self) -> u32 {
        self.raw
    }
}

// Manual impls: derives would put bounds on `T`.
impl<T> Copy for Id<T> {}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.raw)
    }
}

/// Half-open range of ids allocated while parsing one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IdRange {
    pub start: u32,
    pub end: u32,
}

impl IdRange {
    #[inline]
    pub fn contains<T>(&self, id: Id<T>) -> bool {
        (self.start..self.end).contains(&id.raw())
    }
}

/// Typed reference into a centralized list buffer.
pub struct ListRef<T> {
    start: u32,
    len: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Copy for ListRef<T> {}

impl<T> Clone for ListRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for ListRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start && self.len == other.len
    }
}

impl<T> Eq for ListRef<T> {}

impl<T> fmt::Debug for ListRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}; {}]", self.start, self.len)
    }
}

impl<T> Default for ListRef<T> {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl<T> ListRef<T> {
    pub const EMPTY: Self = Self {
        start: 0,
        len: 0,
        _marker: PhantomData,
    };

    #[inline]
    pub const fn new(start: u32, len: u32) -> Self {
        Self {
            start,
            len,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub const fn start(&self) -> u32 {
        self.start
    }

    #[inline]
    pub const fn len(&self) -> u32 {
        self.len
    }

    #[inline]
    pub const fn end(&self) -> u32 {
        self.start + self.len
    }
}

// =============================================================================
// Symbol Interning System
// =============================================================================

/// Interned string symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Symbol(u32);

pub type Ident = Symbol;

impl Symbol {
    #[inline]
    pub const fn from_raw(v: u32) -> Self {
        Self(v)
    }

    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// Identifier occurrence (interned symbol + source position).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentName {
    pub sym: Ident,
    pub pos: Span,
}

/// Identity hasher for u64 values (used for symbol hash buckets).
#[derive(Default)]
struct U64IdentityHasher(u64);

impl Hasher for U64IdentityHasher {
    fn write(&mut self, _b: &[u8]) {
        unreachable!("U64IdentityHasher only supports write_u64")
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.0 = i;
    }

    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }
}

type U64IdentityBuild = BuildHasherDefault<U64IdentityHasher>;

/// String interner; symbols are looked up through hash buckets.
#[derive(Debug, Default)]
pub struct Interner {
    strings: Vec<Box<str>>,
    buckets: HashMap<u64, SmallVec<[Symbol; 1]>, U64IdentityBuild>,
    state: RandomState,
}

impl Interner {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    fn hash_str(&self, s: &str) -> u64 {
        self.state.hash_one(s)
    }

    /// Interns a string and returns its symbol.
    pub fn intern(&mut self, s: &str) -> Symbol {
        let h = self.hash_str(s);
        let entry = self.buckets.entry(h).or_default();

        for &sym in entry.iter() {
            if self.strings[sym.0 as usize].as_ref() == s {
                return sym;
            }
        }

        let sym = Symbol(self.strings.len() as u32);
        self.strings.push(s.into());
        entry.push(sym);
        sym
    }

    /// Looks up a string without interning it.
    pub fn get(&self, s: &str) -> Option<Symbol> {
        let h = self.hash_str(s);
        self.buckets
            .get(&h)?
            .iter()
            .copied()
            .find(|sym| self.strings[sym.0 as usize].as_ref() == s)
    }

    /// Resolves a symbol back to its string.
    ///
    /// # Panics
    /// Panics if the symbol was produced by another interner.
    #[inline]
    pub fn resolve(&self, sym: Symbol) -> &str {
        self.strings
            .get(sym.0 as usize)
            .expect("symbol from a different interner")
            .as_ref()
    }
}

// =============================================================================
// Arena Allocation
// =============================================================================

/// Arena for nodes with associated spans.
#[derive(Debug)]
pub struct SpannedArena<T> {
    data: Vec<T>,
    spans: Vec<Span>,
}

impl<T> Default for SpannedArena<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            spans: Vec::new(),
        }
    }
}

impl<T> SpannedArena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc(&mut self, node: T, span: Span) -> Id<T> {
        let id = Id::from_raw(self.data.len() as u32);
        self.data.push(node);
        self.spans.push(span);
        id
    }

    #[inline]
    pub fn get(&self, id: Id<T>) -> &T {
        &self.data[id.to_usize()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: Id<T>) -> &mut T {
        &mut self.data[id.to_usize()]
    }

    #[inline]
    pub fn span(&self, id: Id<T>) -> Span {
        self.spans[id.to_usize()]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Id the next allocation will receive.
    #[inline]
    pub fn next_raw(&self) -> u32 {
        self.data.len() as u32
    }
}

impl<T> Index<Id<T>> for SpannedArena<T> {
    type Output = T;
    fn index(&self, id: Id<T>) -> &T {
        self.get(id)
    }
}

impl<T> IndexMut<Id<T>> for SpannedArena<T> {
    fn index_mut(&mut self, id: Id<T>) -> &mut T {
        self.get_mut(id)
    }
}

// =============================================================================
// Type Aliases for Node IDs
// =============================================================================

pub type GenDeclId = Id<GenDecl>;
pub type FuncDeclId = Id<FuncDecl>;
pub type ExprId = Id<Expr>;
pub type TypeId = Id<Type>;
pub type FieldId = Id<Field>;
pub type SignatureId = Id<Signature>;
pub type TypeParamsId = Id<TypeParams>;
pub type CommentId = Id<Comment>;
pub type CommentGroupId = Id<CommentGroup>;

// =============================================================================
// Centralized List Storage
// =============================================================================

#[derive(Debug, Default)]
pub struct ExtraData {
    pub ident_names: Vec<IdentName>,
    pub exprs: Vec<ExprId>,
    pub types: Vec<TypeId>,
    pub fields: Vec<FieldId>,
    pub specs: Vec<Spec>,
    pub imports: Vec<ImportSpec>,
    pub top_decls: Vec<TopLevelDecl>,
    pub type_terms: Vec<TypeTerm>,
    pub interface_elems: Vec<InterfaceElem>,
    pub type_param_decls: Vec<TypeParamDecl>,
    pub comment_ids: Vec<CommentId>,
    pub comment_group_ids: Vec<CommentGroupId>,
}

// =============================================================================
// Main AST Arena
// =============================================================================

/// Central arena holding all AST nodes, list buffers and the interner.
#[derive(Debug, Default)]
pub struct AstArena {
    pub gen_decls: SpannedArena<GenDecl>,
    pub funcs: SpannedArena<FuncDecl>,
    pub exprs: SpannedArena<Expr>,
    pub types: SpannedArena<Type>,
    pub signatures: SpannedArena<Signature>,
    pub fields: SpannedArena<Field>,
    pub type_params: SpannedArena<TypeParams>,
    pub comments: SpannedArena<Comment>,
    pub comment_groups: SpannedArena<CommentGroup>,
    pub extras: ExtraData,
    pub interner: Interner,
}

macro_rules! list_fns {
    ($($builder:ident / $accessor:ident : $t:ty => $buf:ident),* $(,)?) => {
        $(
            pub fn $builder(&mut self, i: impl IntoIterator<Item = $t>) -> ListRef<$t> {
                Self::push_list(&mut self.extras.$buf, i)
            }

            pub fn $accessor(&self, r: ListRef<$t>) -> &[$t] {
                Self::slice(&self.extras.$buf, r)
            }
        )*
    };
}

impl AstArena {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn push_list<T>(buf: &mut Vec<T>, items: impl IntoIterator<Item = T>) -> ListRef<T> {
        let start = buf.len();
        buf.extend(items);
        let len = buf.len() - start;
        debug_assert!(start <= u32::MAX as usize);
        debug_assert!(len <= u32::MAX as usize);
        ListRef::new(start as u32, len as u32)
    }

    #[inline]
    fn slice<T>(buf: &[T], r: ListRef<T>) -> &[T] {
        &buf[r.start() as usize..r.end() as usize]
    }

    list_fns! {
        list_ident_names / ident_names: IdentName => ident_names,
        list_exprs / exprs_list: ExprId => exprs,
        list_types / types_list: TypeId => types,
        list_fields / fields_list: FieldId => fields,
        list_specs / specs_list: Spec => specs,
        list_imports / imports_list: ImportSpec => imports,
        list_top_decls / top_decls: TopLevelDecl => top_decls,
        list_type_terms / type_terms: TypeTerm => type_terms,
        list_interface_elems / interface_elems: InterfaceElem => interface_elems,
        list_type_param_decls / type_param_decls: TypeParamDecl => type_param_decls,
        list_comment_ids / comment_ids: CommentId => comment_ids,
        list_comment_group_ids / comment_group_ids: CommentGroupId => comment_group_ids,
    }

    /// Resolves an interned symbol.
    #[inline]
    pub fn name(&self, sym: Symbol) -> &str {
        self.interner.resolve(sym)
    }

    /// Number of slots a field contributes once flattened: one per declared
    /// name, or one for an anonymous field.
    #[inline]
    pub fn field_arity(&self, id: FieldId) -> usize {
        let names = self.fields[id].names;
        if names.is_empty() {
            1
        } else {
            names.len() as usize
        }
    }

    /// Flattens a field list into one type per slot, in declaration order.
    pub fn flatten_fields(&self, fields: ListRef<FieldId>) -> Vec<TypeId> {
        let mut out = Vec::new();
        for &f in self.fields_list(fields) {
            let typ = self.fields[f].typ;
            out.extend(std::iter::repeat_n(typ, self.field_arity(f)));
        }
        out
    }

    /// Like [`flatten_fields`](Self::flatten_fields) for a signature's results.
    pub fn flatten_results(&self, results: Option<Results>) -> Vec<TypeId> {
        match results {
            None => Vec::new(),
            Some(Results::Type(t)) => vec![t],
            Some(Results::Params(list)) => self.flatten_fields(list.fields),
        }
    }
}

// =============================================================================
// Comments
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    Line,
    Block,
}

/// Comment token (text is recovered from source via span).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comment {
    pub kind: CommentKind,
}

/// Adjacent comments with no blank line between them. Its span covers every
/// member comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentGroup {
    pub comments: ListRef<CommentId>,
}

// =============================================================================
// Source File (Root Node)
// =============================================================================

/// A parsed Go source file.
///
/// ```text
/// SourceFile = PackageClause ";" { ImportDecl ";" } { TopLevelDecl ";" }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceFile {
    pub package_pos: Span,
    pub name: IdentName,
    /// Every import spec of every import declaration, in source order.
    pub imports: ListRef<ImportSpec>,
    /// Top-level declarations in source order (imports excluded).
    pub decls: ListRef<TopLevelDecl>,
    pub comments: ListRef<CommentGroupId>,
    /// Type nodes allocated for this file.
    pub types: IdRange,
    /// Whole-file span.
    pub span: Span,
}

// =============================================================================
// Declarations
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopLevelDecl {
    Gen(GenDeclId),
    Func(FuncDeclId),
}

/// `const`, `type` or `var` declaration; its arena span runs from the keyword
/// to the last token of the statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenDecl {
    pub kw_pos: Span,
    pub kind: GenDeclKind,
    pub l_paren: Option<Span>,
    pub specs: ListRef<Spec>,
    pub r_paren: Option<Span>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GenDeclKind {
    Const,
    Type,
    Var,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spec {
    Value(ValueSpec),
    Type(TypeSpec),
}

/// `ImportSpec = [ "." | PackageName ] ImportPath`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSpec {
    pub name: Option<ImportName>,
    /// Unquoted import path.
    pub path: Symbol,
    pub path_pos: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportName {
    Dot(Span),
    Blank(Span),
    Name(IdentName),
}

/// `const` or `var` spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueSpec {
    pub names: ListRef<IdentName>,
    pub typ: Option<TypeId>,
    pub values: ListRef<ExprId>,
}

/// `TypeSpec = AliasDecl | TypeDef`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSpec {
    pub name: IdentName,
    pub type_params: Option<TypeParamsId>,
    pub alias: bool,
    pub typ: TypeId,
}

/// Function or method declaration; its arena span runs from `func` to the
/// closing brace of the body (or the end of the signature).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuncDecl {
    /// Comment group ending on the line right before `func`.
    pub doc: Option<CommentGroupId>,
    pub func_pos: Span,
    pub recv: Option<Receiver>,
    pub name: IdentName,
    pub type_params: Option<TypeParamsId>,
    pub signature: SignatureId,
    /// Braces included.
    pub body: Option<Span>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receiver {
    pub name: Option<IdentName>,
    pub typ: TypeId,
}

// =============================================================================
// Generics
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeParams {
    pub params: ListRef<TypeParamDecl>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeParamDecl {
    pub names: ListRef<IdentName>,
    pub constraint: TypeElem,
}

/// `TypeTerm { "|" TypeTerm }`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeElem {
    pub terms: ListRef<TypeTerm>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTerm {
    Tilde { tilde_pos: Span, typ: TypeId },
    Type { typ: TypeId },
}

// =============================================================================
// Signatures and Fields
// =============================================================================

/// `Signature = Parameters [ Result ]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub params: FieldList,
    pub results: Option<Results>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Results {
    /// Parenthesized, possibly named: `(n int, err error)`
    Params(FieldList),
    /// Single unnamed result: `int`
    Type(TypeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldList {
    pub l_paren: Span,
    pub fields: ListRef<FieldId>,
    pub r_paren: Span,
}

/// Field in a parameter list, struct, or interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Field names (empty for anonymous fields)
    pub names: ListRef<IdentName>,
    pub typ: TypeId,
    /// Raw struct tag, quotes included.
    pub tag: Option<Span>,
    /// Embedded struct field
    pub is_embed: bool,
}

// =============================================================================
// Expressions
// =============================================================================

/// Braces of a literal value; elements are not modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiteralValue {
    pub l_brace: Span,
    pub r_brace: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expr {
    /// `T{...}` where `T` is an array, slice, map or struct type literal.
    CompositeLit { typ: TypeId, lit: LiteralValue },
    /// Any other expression, kept as a balanced token run.
    Opaque(Span),
}

// =============================================================================
// Types
// =============================================================================

/// Type node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    /// `Name`, `pkg.Name` or `Name[T]`
    Named {
        pkg: Option<IdentName>,
        name: IdentName,
        args: ListRef<TypeId>,
    },

    /// `*T`
    Pointer { star_pos: Span, elem: TypeId },

    /// `[N]T` or `[...]T`
    Array { len: ArrayLen, elem: TypeId },

    /// `[]T`
    Slice { elem: TypeId },

    /// `map[K]V`
    Map { key: TypeId, val: TypeId },

    /// `chan T`, `<-chan T`, `chan<- T`
    Chan { dir: ChanDir, elem: TypeId },

    /// `struct { ... }`
    Struct { fields: ListRef<FieldId> },

    /// `interface { ... }`
    Interface { elems: ListRef<InterfaceElem> },

    /// `func(...) ...`
    Func { sig: SignatureId },

    /// `...T`, only as the last parameter type
    Variadic { elem: TypeId },

    /// `(T)`
    Paren { typ: TypeId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayLen {
    /// Length expression, compared by its spelled text.
    Expr { text: Symbol, pos: Span },
    /// `[...]T`
    Ellipsis(Span),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceElem {
    /// `Method(...) ...`
    Method { name: IdentName, sig: SignatureId },
    /// Embedded interface (`io.Reader`) or union (`~int | string`)
    TypeElem(TypeElem),
}

impl AstArena {
    /// The embedded type of an interface element, if it is a single plain term.
    pub fn embedded_type(&self, elem: TypeElem) -> Option<TypeId> {
        match self.type_terms(elem.terms) {
            [TypeTerm::Type { typ }] => Some(*typ),
            _ => None,
        }
    }
}
