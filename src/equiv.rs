//! Directional type equality between a signature slot (the A side) and a
//! table field (the B side).
//!
//! Names are followed through [`Session::resolve`]. An interface on the A
//! side accepts any B whose method set covers it, and a pointer on the A side
//! never accepts a non-pointer B. Recursive types terminate by assuming a pair
//! equal while it is being compared.

use std::collections::HashSet;

use gosyntax::ast::{ArrayLen, FieldId, ListRef, SignatureId, Type, TypeId};

use crate::error::Result;
use crate::resolve::{PkgId, Resolved, Session, Shape};

/// `(pkg, shape node, declared name, pointer)` of the B side.
type SideKey = (PkgId, u32, u32, bool);

pub struct Equivalence<'s> {
    session: &'s mut Session,
    assumed: HashSet<(PkgId, u32, SideKey)>,
}

impl<'s> Equivalence<'s> {
    pub fn new(session: &'s mut Session) -> Self {
        Self {
            session,
            assumed: HashSet::new(),
        }
    }

    #[inline]
    pub fn session(&mut self) -> &mut Session {
        self.session
    }

    /// `a` (of package `ap`) accepts `b` (of package `bp`).
    pub fn equal(&mut self, ap: PkgId, a: TypeId, bp: PkgId, b: TypeId) -> Result<bool> {
        let ra = self.session.resolve(ap, a)?;
        let rb = self.session.resolve(bp, b)?;
        self.resolved_equal(&ra, &rb)
    }

    /// Both absent, or both present and equal.
    pub fn equal_opt(
        &mut self,
        a: Option<(PkgId, TypeId)>,
        b: Option<(PkgId, TypeId)>,
    ) -> Result<bool> {
        match (a, b) {
            (None, None) => Ok(true),
            (Some((ap, a)), Some((bp, b))) => self.equal(ap, a, bp, b),
            _ => Ok(false),
        }
    }

    pub fn resolved_equal(&mut self, ra: &Resolved, rb: &Resolved) -> Result<bool> {
        if ra.pointer && !rb.pointer {
            return Ok(false);
        }
        if ra.decl.is_some() && ra.decl == rb.decl {
            return Ok(true);
        }

        match ra.shape {
            Shape::EmptyInterface => Ok(true),
            Shape::Opaque { .. } => Ok(matches!(rb.shape, Shape::Opaque { .. })
                && self.session.opaque_text(ra) == self.session.opaque_text(rb)),
            Shape::Type(at) => {
                let key = (ra.pkg, at.raw(), side_key(rb));
                if !self.assumed.insert(key) {
                    return Ok(true);
                }
                let result = self.structural(ra.pkg, at, rb);
                self.assumed.remove(&key);
                result
            }
        }
    }

    fn structural(&mut self, ap: PkgId, at: TypeId, rb: &Resolved) -> Result<bool> {
        let a_node = self.session.node(ap, at);
        if let Type::Interface { .. } = a_node {
            return self.satisfies(ap, at, rb);
        }
        let Shape::Type(bt) = rb.shape else {
            return Ok(false);
        };
        let bp = rb.pkg;

        match (a_node, self.session.node(bp, bt)) {
            (Type::Map { key: ak, val: av }, Type::Map { key: bk, val: bv }) => {
                Ok(self.equal(ap, ak, bp, bk)? && self.equal(ap, av, bp, bv)?)
            }
            (Type::Struct { fields: af }, Type::Struct { fields: bf }) => {
                self.fields_equal(ap, af, bp, bf)
            }
            (Type::Array { len: al, elem: ae }, Type::Array { len: bl, elem: be }) => {
                Ok(self.lengths_equal(ap, al, bp, bl) && self.equal(ap, ae, bp, be)?)
            }
            (Type::Slice { elem: ae }, Type::Slice { elem: be })
            | (Type::Variadic { elem: ae }, Type::Variadic { elem: be })
            | (Type::Pointer { elem: ae, .. }, Type::Pointer { elem: be, .. }) => {
                self.equal(ap, ae, bp, be)
            }
            (Type::Chan { dir: ad, elem: ae }, Type::Chan { dir: bd, elem: be }) => {
                Ok(ad == bd && self.equal(ap, ae, bp, be)?)
            }
            (Type::Func { sig: asig }, Type::Func { sig: bsig }) => {
                self.signatures_equal(ap, asig, bp, bsig)
            }
            _ => Ok(false),
        }
    }

    /// Array lengths are compared as written.
    fn lengths_equal(&self, ap: PkgId, al: ArrayLen, bp: PkgId, bl: ArrayLen) -> bool {
        match (al, bl) {
            (ArrayLen::Ellipsis(_), ArrayLen::Ellipsis(_)) => true,
            (ArrayLen::Expr { text: at, .. }, ArrayLen::Expr { text: bt, .. }) => {
                self.session.package(ap).arena.name(at) == self.session.package(bp).arena.name(bt)
            }
            _ => false,
        }
    }

    fn fields_equal(
        &mut self,
        ap: PkgId,
        af: ListRef<FieldId>,
        bp: PkgId,
        bf: ListRef<FieldId>,
    ) -> Result<bool> {
        let a = self.session.package(ap).arena.flatten_fields(af);
        let b = self.session.package(bp).arena.flatten_fields(bf);
        self.lists_equal(ap, &a, bp, &b)
    }

    fn lists_equal(&mut self, ap: PkgId, a: &[TypeId], bp: PkgId, b: &[TypeId]) -> Result<bool> {
        if a.len() != b.len() {
            return Ok(false);
        }
        for (&at, &bt) in a.iter().zip(b) {
            if !self.equal(ap, at, bp, bt)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Parameters pairwise, then results pairwise.
    pub fn signatures_equal(
        &mut self,
        ap: PkgId,
        asig: SignatureId,
        bp: PkgId,
        bsig: SignatureId,
    ) -> Result<bool> {
        let (a_params, a_results) = flatten_signature(self.session, ap, asig);
        let (b_params, b_results) = flatten_signature(self.session, bp, bsig);
        Ok(self.lists_equal(ap, &a_params, bp, &b_params)?
            && self.lists_equal(ap, &a_results, bp, &b_results)?)
    }

    /// Every method the interface `iface` requires is in the method set of
    /// `rb` with an equal signature.
    fn satisfies(&mut self, ap: PkgId, iface: TypeId, rb: &Resolved) -> Result<bool> {
        for (name, required) in self.session.interface_methods(ap, iface)? {
            let Some(found) = self.session.find_method(rb, &name)? else {
                tracing::trace!(target: "gotab::equiv", method = %name, "method missing");
                return Ok(false);
            };
            if !self.signatures_equal(required.pkg, required.sig, found.pkg, found.sig)? {
                tracing::trace!(target: "gotab::equiv", method = %name, "method signature differs");
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn side_key(r: &Resolved) -> SideKey {
    let shape = match r.shape {
        Shape::Type(t) => t.raw(),
        _ => u32::MAX,
    };
    let decl = r.decl.map_or(u32::MAX, |d| d.name.as_u32());
    (r.pkg, shape, decl, r.pointer)
}

pub(crate) fn flatten_signature(
    session: &Session,
    pkg: PkgId,
    sig: SignatureId,
) -> (Vec<TypeId>, Vec<TypeId>) {
    let arena = &session.package(pkg).arena;
    let sig = arena.signatures[sig];
    (
        arena.flatten_fields(sig.params.fields),
        arena.flatten_results(sig.results),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchPaths;
    use crate::loader;
    use std::fs;

    const SRC: &str = "package a

type Celsius float64
type Temp = Celsius

type Node struct {
	next *Node
	val  int
}

type List struct {
	next *List
	val  int
}

type Shape interface{ Area() float64 }
type Square struct{ s float64 }

func (q Square) Area() float64 { return q.s * q.s }

var (
	celsius Celsius
	temp    Temp
	f64     float64
	node    Node
	list    List
	shape   Shape
	square  Square
	sqPtr   *Square
	grid    [3]int
	grid2   [3]int
	grid4   [4]int
	ch      <-chan int
	ch2     chan int
	anyv    any
	fn      func(int, ...string) error
	fn2     func(int, ...string) error
)
";

    fn fixture() -> (Session, PkgId) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.go"), SRC).unwrap();
        let mut session = Session::new(SearchPaths::default());
        let id = session.add_package(loader::parse(dir.path(), "a", &crate::BuildContext::host()).unwrap());
        (session, id)
    }

    fn var(session: &Session, pkg: PkgId, name: &str) -> TypeId {
        match session.package(pkg).lookup(name) {
            Some(loader::Decl::Var { spec, .. }) => spec.typ.unwrap(),
            other => panic!("unexpected {other:?}"),
        }
    }

    fn check(a: &str, b: &str) -> bool {
        let (mut session, pkg) = fixture();
        let at = var(&session, pkg, a);
        let bt = var(&session, pkg, b);
        Equivalence::new(&mut session).equal(pkg, at, pkg, bt).unwrap()
    }

    #[test]
    fn aliases_share_a_declaration() {
        assert!(check("celsius", "temp"));
        assert!(check("temp", "celsius"));
    }

    #[test]
    fn defined_types_compare_by_underlying_shape() {
        assert!(check("celsius", "f64"), "Celsius is followed to float64");
        assert!(!check("f64", "node"));
        assert!(check("node", "list"), "recursive structs terminate");
    }

    #[test]
    fn interfaces_accept_implementations() {
        assert!(check("shape", "square"));
        assert!(check("shape", "sqPtr"));
        assert!(!check("square", "shape"));
        assert!(check("anyv", "node"));
    }

    #[test]
    fn pointers_are_directional() {
        assert!(!check("sqPtr", "square"));
        assert!(check("square", "sqPtr"));
    }

    #[test]
    fn absent_types_only_match_absent() {
        let (mut session, pkg) = fixture();
        let t = var(&session, pkg, "f64");
        let mut eq = Equivalence::new(&mut session);
        assert!(eq.equal_opt(None, None).unwrap());
        assert!(!eq.equal_opt(Some((pkg, t)), None).unwrap());
        assert!(eq.equal_opt(Some((pkg, t)), Some((pkg, t))).unwrap());
    }

    #[test]
    fn literal_shapes() {
        assert!(check("grid", "grid2"));
        assert!(!check("grid", "grid4"));
        assert!(!check("ch", "ch2"));
        assert!(check("fn", "fn2"));
    }
}
