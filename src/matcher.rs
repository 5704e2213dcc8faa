//! Finds `tt`-prefixed tables, binds each to the function or method it
//! exercises and checks every row field against the signature slot it feeds.

use std::fmt;

use gosyntax::ast::{
    AstArena, Expr, GenDeclKind, SignatureId, SourceFile, Spec, TopLevelDecl, Type, TypeId,
    ValueSpec,
};

use crate::equiv::{flatten_signature, Equivalence};
use crate::error::{Error, Result};
use crate::loader::Decl;
use crate::resolve::{PkgId, Resolved, Session, Shape, TypeDeclRef};

/// Prefix marking a table declaration.
pub const MARKER: &str = "tt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Function { name: String },
    Method { type_name: String, name: String },
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Function { name } => f.write_str(name),
            Target::Method { type_name, name } => write!(f, "{type_name}.{name}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRole {
    Receiver,
    Param,
    Result,
}

/// How a row field reaches its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Passing {
    /// `tt.f`
    Direct,
    /// `tt.f...` into a variadic parameter.
    Spread,
    /// `tt.f()`, spread when `spread` is set.
    Thunk { spread: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub role: SlotRole,
    /// Row field bound to the slot.
    pub field: String,
    pub passing: Passing,
}

/// A validated table: every row field is bound to a slot of `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDecl {
    pub ident: String,
    pub target: Target,
    pub slots: Vec<Slot>,
}

impl TableDecl {
    /// The identifier without its marker.
    pub fn stripped(&self) -> &str {
        self.ident.strip_prefix(MARKER).unwrap_or(&self.ident)
    }

    /// Name of the generated test function.
    pub fn test_name(&self) -> String {
        format!("TestTT{}", capitalize(self.stripped()))
    }

    pub fn slots_of(&self, role: SlotRole) -> impl Iterator<Item = &Slot> + '_ {
        self.slots.iter().filter(move |s| s.role == role)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Table identifiers declared at the top level of `file`: the first
/// marker-prefixed name of each `var` statement.
pub fn candidates(arena: &AstArena, file: &SourceFile) -> Vec<String> {
    let mut out = Vec::new();
    for decl in arena.top_decls(file.decls) {
        let TopLevelDecl::Gen(id) = *decl else {
            continue;
        };
        let decl = arena.gen_decls[id];
        if decl.kind != GenDeclKind::Var {
            continue;
        }
        let first = arena
            .specs_list(decl.specs)
            .iter()
            .filter_map(|spec| match spec {
                Spec::Value(vs) => Some(vs),
                Spec::Type(_) => None,
            })
            .flat_map(|vs| arena.ident_names(vs.names))
            .map(|name| arena.name(name.sym))
            .find(|name| name.len() > MARKER.len() && name.starts_with(MARKER));
        if let Some(name) = first {
            out.push(name.to_owned());
        }
    }
    out
}

/// What a slot accepts.
#[derive(Debug, Clone)]
enum Expected {
    /// The receiver: the declared type, as a pointer when the method needs one.
    Receiver {
        decl: TypeDeclRef,
        needs_pointer: bool,
        spelled: String,
    },
    Typed { pkg: PkgId, typ: TypeId },
}

#[derive(Debug, Clone)]
struct SlotSpec {
    role: SlotRole,
    expected: Expected,
}

/// Binds and validates every candidate. Candidates naming no function or
/// method are skipped; the first invalid table fails the whole batch.
pub fn discover(session: &mut Session, pkg: PkgId, idents: &[String]) -> Result<Vec<TableDecl>> {
    let mut tables = Vec::with_capacity(idents.len());
    for ident in idents {
        if let Some(table) = match_table(session, pkg, ident)? {
            tracing::debug!(
                target: "gotab::matcher",
                table = %table.ident,
                target = %table.target,
                slots = table.slots.len(),
                "table validated"
            );
            tables.push(table);
        }
    }
    Ok(tables)
}

/// Binds one table identifier. `None` when it names no target.
pub fn match_table(session: &mut Session, pkg: PkgId, ident: &str) -> Result<Option<TableDecl>> {
    let Some(stripped) = ident.strip_prefix(MARKER).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let Some((target, specs)) = find_target(session, pkg, stripped)? else {
        tracing::debug!(target: "gotab::matcher", table = ident, "no function or method; skipping");
        return Ok(None);
    };
    let Some(Decl::Var { spec, .. }) = session.package(pkg).lookup(ident) else {
        tracing::debug!(target: "gotab::matcher", table = ident, "not a package variable; skipping");
        return Ok(None);
    };

    let not_a_table = || Error::NotAStructSlice {
        table: ident.to_owned(),
    };
    let (row_pkg, fields) = row_fields(session, pkg, spec, ident)?.ok_or_else(not_a_table)?;

    if fields.len() != specs.len() {
        return Err(Error::SlotCountMismatch {
            table: ident.to_owned(),
            target: target.to_string(),
            fields: fields.len(),
            slots: specs.len(),
        });
    }

    let mut eq = Equivalence::new(session);
    let mut slots = Vec::with_capacity(specs.len());
    for (index, (slot_spec, (field, field_type))) in specs.iter().zip(fields).enumerate() {
        let Some(passing) = check_slot(&mut eq, &slot_spec.expected, row_pkg, field_type)? else {
            let session = eq.session();
            let slot = match &slot_spec.expected {
                Expected::Receiver { spelled, .. } => spelled.clone(),
                Expected::Typed { pkg, typ } => session.spell(*pkg, *typ),
            };
            return Err(Error::SlotMismatch {
                table: ident.to_owned(),
                target: target.to_string(),
                index,
                slot,
                field,
                field_type: session.spell(row_pkg, field_type),
            });
        };
        slots.push(Slot {
            role: slot_spec.role,
            field,
            passing,
        });
    }

    Ok(Some(TableDecl {
        ident: ident.to_owned(),
        target,
        slots,
    }))
}

/// A free function named `stripped`, or the first `Type_Method` split of it
/// naming a method of a declared type.
fn find_target(
    session: &mut Session,
    pkg: PkgId,
    stripped: &str,
) -> Result<Option<(Target, Vec<SlotSpec>)>> {
    if let Some(func) = session.package(pkg).function(stripped) {
        let sig = session.package(pkg).arena.funcs[func].signature;
        let target = Target::Function {
            name: stripped.to_owned(),
        };
        return Ok(Some((target, signature_slots(session, pkg, sig, None))));
    }

    let parts: Vec<&str> = stripped.split('_').collect();
    for split in 1..parts.len() {
        let type_name = parts[..split].join("_");
        let method = parts[split..].join("_");
        let Some(recv) = session.resolve_named(pkg, &type_name)? else {
            continue;
        };
        let Some(decl) = recv.decl else {
            continue;
        };
        let as_pointer = Resolved {
            pointer: true,
            ..recv
        };
        let Some(found) = session.find_method(&as_pointer, &method)? else {
            continue;
        };
        let needs_pointer = session.find_method(&recv, &method)?.is_none();
        let spelled = if needs_pointer {
            format!("*{type_name}")
        } else {
            type_name.clone()
        };
        let receiver = Expected::Receiver {
            decl,
            needs_pointer,
            spelled,
        };
        let target = Target::Method {
            type_name,
            name: method,
        };
        return Ok(Some((target, signature_slots(session, found.pkg, found.sig, Some(receiver)))));
    }
    Ok(None)
}

fn signature_slots(
    session: &Session,
    pkg: PkgId,
    sig: SignatureId,
    receiver: Option<Expected>,
) -> Vec<SlotSpec> {
    let (params, results) = flatten_signature(session, pkg, sig);
    let receiver = receiver.map(|expected| SlotSpec {
        role: SlotRole::Receiver,
        expected,
    });
    let typed = |role: SlotRole| move |typ: TypeId| SlotSpec {
        role,
        expected: Expected::Typed { pkg, typ },
    };
    receiver
        .into_iter()
        .chain(params.into_iter().map(typed(SlotRole::Param)))
        .chain(results.into_iter().map(typed(SlotRole::Result)))
        .collect()
}

/// Named row fields of the struct element type of the table initializer,
/// flattened, with the package owning their types.
fn row_fields(
    session: &mut Session,
    pkg: PkgId,
    spec: ValueSpec,
    ident: &str,
) -> Result<Option<(PkgId, Vec<(String, TypeId)>)>> {
    let arena = &session.package(pkg).arena;
    let index = arena
        .ident_names(spec.names)
        .iter()
        .position(|n| arena.name(n.sym) == ident)
        .unwrap_or(0);
    let Some(&value) = arena.exprs_list(spec.values).get(index) else {
        return Ok(None);
    };
    let Expr::CompositeLit { typ, .. } = arena.exprs[value] else {
        return Ok(None);
    };
    let elem = match arena.types[typ] {
        Type::Slice { elem } | Type::Array { elem, .. } => elem,
        _ => return Ok(None),
    };

    let row = session.resolve(pkg, elem)?;
    let Shape::Type(st) = row.shape else {
        return Ok(None);
    };
    let Type::Struct { fields } = session.node(row.pkg, st) else {
        return Ok(None);
    };
    if row.pointer {
        return Ok(None);
    }

    let arena = &session.package(row.pkg).arena;
    let mut out = Vec::new();
    for &id in arena.fields_list(fields) {
        let field = arena.fields[id];
        let names = arena.ident_names(field.names);
        if names.is_empty() {
            out.push((embedded_name(arena, field.typ), field.typ));
        }
        for name in names {
            out.push((arena.name(name.sym).to_owned(), field.typ));
        }
    }
    Ok(Some((row.pkg, out)))
}

/// Implicit name of an embedded field: its type name without qualifier.
fn embedded_name(arena: &AstArena, mut typ: TypeId) -> String {
    loop {
        match arena.types[typ] {
            Type::Paren { typ: inner } | Type::Pointer { elem: inner, .. } => typ = inner,
            Type::Named { name, .. } => return arena.name(name.sym).to_owned(),
            _ => return "_".to_owned(),
        }
    }
}

fn check_slot(
    eq: &mut Equivalence<'_>,
    expected: &Expected,
    rp: PkgId,
    field: TypeId,
) -> Result<Option<Passing>> {
    if let Some(spread) = accepts(eq, expected, rp, field)? {
        return Ok(Some(if spread { Passing::Spread } else { Passing::Direct }));
    }
    if let Some((tp, result)) = thunk_result(eq.session(), rp, field)? {
        if let Some(spread) = accepts(eq, expected, tp, result)? {
            return Ok(Some(Passing::Thunk { spread }));
        }
    }
    Ok(None)
}

/// `Some(false)` when `b` is equal to the slot, `Some(true)` when it is a
/// sequence feeding a variadic slot.
fn accepts(eq: &mut Equivalence<'_>, expected: &Expected, bp: PkgId, b: TypeId) -> Result<Option<bool>> {
    match *expected {
        Expected::Receiver {
            decl, needs_pointer, ..
        } => {
            let r = eq.session().resolve(bp, b)?;
            Ok((r.decl == Some(decl) && (r.pointer || !needs_pointer)).then_some(false))
        }
        Expected::Typed { pkg, typ } => {
            if eq.equal(pkg, typ, bp, b)? {
                return Ok(Some(false));
            }
            let Type::Variadic { elem } = eq.session().node(pkg, typ) else {
                return Ok(None);
            };
            let Some((ep, belem)) = sequence_elem(eq.session(), bp, b)? else {
                return Ok(None);
            };
            Ok(eq.equal(pkg, elem, ep, belem)?.then_some(true))
        }
    }
}

/// Element of an array or slice type.
fn sequence_elem(session: &mut Session, pkg: PkgId, typ: TypeId) -> Result<Option<(PkgId, TypeId)>> {
    let r = session.resolve(pkg, typ)?;
    let Shape::Type(t) = r.shape else {
        return Ok(None);
    };
    match session.node(r.pkg, t) {
        Type::Slice { elem } | Type::Array { elem, .. } if !r.pointer => Ok(Some((r.pkg, elem))),
        _ => Ok(None),
    }
}

/// Result type of a `func() T`.
fn thunk_result(session: &mut Session, pkg: PkgId, typ: TypeId) -> Result<Option<(PkgId, TypeId)>> {
    let r = session.resolve(pkg, typ)?;
    let Shape::Type(t) = r.shape else {
        return Ok(None);
    };
    let Type::Func { sig } = session.node(r.pkg, t) else {
        return Ok(None);
    };
    if r.pointer {
        return Ok(None);
    }
    let (params, results) = flatten_signature(session, r.pkg, sig);
    match results.as_slice() {
        [result] if params.is_empty() => Ok(Some((r.pkg, *result))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchPaths;
    use crate::loader;
    use std::fs;

    fn load(src: &str) -> (Session, PkgId) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.go"), src).unwrap();
        let mut session = Session::new(SearchPaths::default());
        let id = session.add_package(loader::parse(dir.path(), "a", &crate::BuildContext::host()).unwrap());
        (session, id)
    }

    #[test]
    fn first_marked_name_per_statement() {
        let src = "package a\n\nvar x, ttA, ttB = 1, 2, 3\nvar (\n\tttC = 1\n\tttD = 2\n)\nvar tt = 0\nconst ttE = 1\n";
        let (arena, file) = gosyntax::parse_file(src).unwrap();
        assert_eq!(candidates(&arena, &file), ["ttA", "ttC"]);
    }

    #[test]
    fn test_names_capitalize_the_stripped_identifier() {
        let table = TableDecl {
            ident: "ttcounter_Increment".into(),
            target: Target::Function { name: "x".into() },
            slots: Vec::new(),
        };
        assert_eq!(table.stripped(), "counter_Increment");
        assert_eq!(table.test_name(), "TestTTCounter_Increment");
    }

    #[test]
    fn functions_win_over_method_splits() {
        let (mut session, pkg) = load(
            "package a\n\ntype A struct{}\nfunc (A) B() {}\nfunc A_B() {}\n\nvar ttA_B = []struct{}{}\n",
        );
        let table = match_table(&mut session, pkg, "ttA_B").unwrap().unwrap();
        assert_eq!(table.target, Target::Function { name: "A_B".into() });
        assert!(table.slots.is_empty());
    }

    #[test]
    fn method_splits_try_every_boundary() {
        let (mut session, pkg) = load(
            "package a\n\ntype my_type struct{}\nfunc (m *my_type) do_it() int { return 0 }\n\nvar ttmy_type_do_it = []struct {\n\tm   *my_type\n\tout int\n}{}\n",
        );
        let table = match_table(&mut session, pkg, "ttmy_type_do_it").unwrap().unwrap();
        assert_eq!(
            table.target,
            Target::Method {
                type_name: "my_type".into(),
                name: "do_it".into()
            }
        );
        assert_eq!(table.slots[0].role, SlotRole::Receiver);
        assert_eq!(table.slots[1].role, SlotRole::Result);
    }

    #[test]
    fn unmatched_identifiers_are_skipped() {
        let (mut session, pkg) = load("package a\n\nvar ttNothing = []struct{}{}\n");
        assert!(match_table(&mut session, pkg, "ttNothing").unwrap().is_none());
    }

    #[test]
    fn thunks_and_spreads() {
        let (mut session, pkg) = load(
            "package a\n\nfunc Sum(base int, rest ...int) int { return base }\n\nvar ttSum = []struct {\n\tbase func() int\n\trest []int\n\tsum  int\n}{}\n",
        );
        let table = match_table(&mut session, pkg, "ttSum").unwrap().unwrap();
        let passing: Vec<Passing> = table.slots.iter().map(|s| s.passing).collect();
        assert_eq!(
            passing,
            [Passing::Thunk { spread: false }, Passing::Spread, Passing::Direct]
        );
    }

    #[test]
    fn value_receivers_accept_pointers_but_not_the_reverse() {
        let src = "package a\n\ntype C struct{}\nfunc (c C) Get() int { return 0 }\nfunc (c *C) Put(n int) {}\n\nvar ttC_Get = []struct {\n\tc   *C\n\tout int\n}{}\n\nvar ttC_Put = []struct {\n\tc C\n\tn int\n}{}\n";
        let (mut session, pkg) = load(src);
        assert!(match_table(&mut session, pkg, "ttC_Get").unwrap().is_some());
        match match_table(&mut session, pkg, "ttC_Put") {
            Err(Error::SlotMismatch { index, slot, .. }) => {
                assert_eq!(index, 0);
                assert_eq!(slot, "*C");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn initializer_must_be_a_struct_sequence() {
        let (mut session, pkg) = load("package a\n\nfunc F() {}\n\nvar ttF = []int{1}\n");
        assert!(matches!(
            match_table(&mut session, pkg, "ttF"),
            Err(Error::NotAStructSlice { .. })
        ));
    }
}
