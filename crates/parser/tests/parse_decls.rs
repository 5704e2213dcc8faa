use gosyntax::ast::{
    ArrayLen, AstArena, ChanDir, Expr, GenDeclKind, ImportName, InterfaceElem, Results,
    SourceFile, Spec, TopLevelDecl, Type, TypeId,
};
use gosyntax::{parse_file, parse_file_into};

fn parse(src: &str) -> (AstArena, SourceFile) {
    match parse_file(src) {
        Ok(parsed) => parsed,
        Err(failure) => panic!("parse failed: {failure}\n{src}"),
    }
}

fn type_spec(arena: &AstArena, file: &SourceFile, name: &str) -> TypeId {
    for decl in arena.top_decls(file.decls) {
        if let TopLevelDecl::Gen(id) = decl {
            for spec in arena.specs_list(arena.gen_decls[*id].specs) {
                if let Spec::Type(ts) = spec {
                    if arena.name(ts.name.sym) == name {
                        return ts.typ;
                    }
                }
            }
        }
    }
    panic!("type {name} not found");
}

fn named(arena: &AstArena, id: TypeId) -> String {
    match arena.types[id] {
        Type::Named { pkg: Some(pkg), name, .. } => {
            format!("{}.{}", arena.name(pkg.sym), arena.name(name.sym))
        }
        Type::Named { pkg: None, name, .. } => arena.name(name.sym).to_owned(),
        other => panic!("expected named type, got {other:?}"),
    }
}

#[test]
fn package_and_imports() {
    let src = r#"package calc

import "fmt"
import (
	str "strings"
	. "math"
	_ "embed"
	`net/http`
)
"#;
    let (arena, file) = parse(src);
    assert_eq!(arena.name(file.name.sym), "calc");

    let imports = arena.imports_list(file.imports);
    let paths: Vec<_> = imports.iter().map(|i| arena.name(i.path)).collect();
    assert_eq!(paths, ["fmt", "strings", "math", "embed", "net/http"]);

    assert!(imports[0].name.is_none());
    match imports[1].name {
        Some(ImportName::Name(n)) => assert_eq!(arena.name(n.sym), "str"),
        other => panic!("unexpected import name {other:?}"),
    }
    assert!(matches!(imports[2].name, Some(ImportName::Dot(_))));
    assert!(matches!(imports[3].name, Some(ImportName::Blank(_))));
}

#[test]
fn table_initializer_is_a_composite_literal() {
    let src = "package p

var ttAdd = []struct {
	a, b int
	sum  int
}{
	{1, 2, 3},
	{-1, 1, 0},
}
";
    let (arena, file) = parse(src);
    let [TopLevelDecl::Gen(gd)] = arena.top_decls(file.decls) else {
        panic!("expected one declaration");
    };
    let decl = arena.gen_decls[*gd];
    assert_eq!(decl.kind, GenDeclKind::Var);

    let span = arena.gen_decls.span(*gd);
    assert_eq!(&src[span.range()][..9], "var ttAdd");
    assert!(src[span.range()].ends_with("{-1, 1, 0},\n}"));

    let [Spec::Value(vs)] = arena.specs_list(decl.specs) else {
        panic!("expected one value spec");
    };
    let [value] = arena.exprs_list(vs.values) else {
        panic!("expected one value");
    };
    let Expr::CompositeLit { typ, .. } = arena.exprs[*value] else {
        panic!("expected composite literal");
    };
    let Type::Slice { elem } = arena.types[typ] else {
        panic!("expected slice type");
    };
    let Type::Struct { fields } = arena.types[elem] else {
        panic!("expected struct element");
    };
    assert_eq!(arena.flatten_fields(fields).len(), 3);
}

#[test]
fn other_initializers_are_opaque() {
    let src = "package p

var (
	a = f(1, []int{2})
	b, c = 1, \"x\"
	d = []int{1}[0]
)
";
    let (arena, file) = parse(src);
    let [TopLevelDecl::Gen(gd)] = arena.top_decls(file.decls) else {
        panic!("expected one declaration");
    };
    let decl = arena.gen_decls[*gd];
    assert!(decl.l_paren.is_some() && decl.r_paren.is_some());

    let values: Vec<_> = arena
        .specs_list(decl.specs)
        .iter()
        .flat_map(|s| match s {
            Spec::Value(vs) => arena.exprs_list(vs.values).to_vec(),
            Spec::Type(_) => Vec::new(),
        })
        .collect();
    assert_eq!(values.len(), 4);
    for v in values {
        let Expr::Opaque(span) = arena.exprs[v] else {
            panic!("expected opaque expression");
        };
        assert!(!span.is_empty());
    }
    assert_eq!(arena.gen_decls.span(*gd).end as usize, src.len() - 1);
}

#[test]
fn functions_methods_and_doc_comments() {
    let src = "package p

// Add returns
// the sum.
func Add(a, b int) (sum int) { return a + b }

// detached

func (c *Counter) Increment(n int, rest ...int) {
	c.n += n
}

func Pair() (int, error)
";
    let (arena, file) = parse(src);
    let funcs: Vec<_> = arena
        .top_decls(file.decls)
        .iter()
        .filter_map(|d| match d {
            TopLevelDecl::Func(id) => Some(*id),
            TopLevelDecl::Gen(_) => None,
        })
        .collect();
    assert_eq!(funcs.len(), 3);

    let add = arena.funcs[funcs[0]];
    assert_eq!(arena.name(add.name.sym), "Add");
    let doc = add.doc.expect("Add has a doc comment");
    let doc_span = arena.comment_groups.span(doc);
    assert_eq!(&src[doc_span.range()], "// Add returns\n// the sum.");
    let sig = arena.signatures[add.signature];
    assert_eq!(arena.flatten_fields(sig.params.fields).len(), 2);
    assert_eq!(arena.flatten_results(sig.results).len(), 1);
    let body = add.body.expect("Add has a body");
    assert_eq!(&src[body.range()], "{ return a + b }");

    let inc = arena.funcs[funcs[1]];
    assert!(inc.doc.is_none(), "a blank line detaches the comment");
    let recv = inc.recv.expect("method receiver");
    assert_eq!(arena.name(recv.name.expect("receiver name").sym), "c");
    let Type::Pointer { elem, .. } = arena.types[recv.typ] else {
        panic!("expected pointer receiver");
    };
    assert_eq!(named(&arena, elem), "Counter");
    let params = arena.flatten_fields(arena.signatures[inc.signature].params.fields);
    assert!(matches!(arena.types[params[1]], Type::Variadic { .. }));
    let span = arena.funcs.span(funcs[1]);
    assert!(src[span.range()].starts_with("func (c *Counter)"));
    assert!(src[span.range()].ends_with("c.n += n\n}"));

    let pair = arena.funcs[funcs[2]];
    assert!(pair.body.is_none());
    let results = arena.signatures[pair.signature].results;
    assert!(matches!(results, Some(Results::Params(_))));
    let flat = arena.flatten_results(results);
    assert_eq!(named(&arena, flat[0]), "int");
    assert_eq!(named(&arena, flat[1]), "error");
}

#[test]
fn type_expressions() {
    let src = "package p

type (
	Arr   [2 * N]int
	Dots  = [...]string
	M     map[string][]*pkg.T
	Recv  <-chan int
	Send  chan<- error
	Fn    func(int, string) bool
	Iface interface {
		io.Reader
		Close() error
	}
	Emb struct {
		*Base
		pkg.Other
		name string `json:\"name\"`
	}
	List[T any] struct{ items []T }
	Num interface{ ~int | ~float64 }
)
";
    let (arena, file) = parse(src);

    let Type::Array { len: ArrayLen::Expr { text, .. }, .. } = arena.types[type_spec(&arena, &file, "Arr")] else {
        panic!("expected array");
    };
    assert_eq!(arena.name(text), "2*N");

    assert!(matches!(
        arena.types[type_spec(&arena, &file, "Dots")],
        Type::Array { len: ArrayLen::Ellipsis(_), .. }
    ));

    let Type::Map { val, .. } = arena.types[type_spec(&arena, &file, "M")] else {
        panic!("expected map");
    };
    let Type::Slice { elem } = arena.types[val] else {
        panic!("expected slice");
    };
    let Type::Pointer { elem, .. } = arena.types[elem] else {
        panic!("expected pointer");
    };
    assert_eq!(named(&arena, elem), "pkg.T");

    assert!(matches!(
        arena.types[type_spec(&arena, &file, "Recv")],
        Type::Chan { dir: ChanDir::Recv, .. }
    ));
    assert!(matches!(
        arena.types[type_spec(&arena, &file, "Send")],
        Type::Chan { dir: ChanDir::Send, .. }
    ));

    let Type::Func { sig } = arena.types[type_spec(&arena, &file, "Fn")] else {
        panic!("expected func");
    };
    assert_eq!(arena.flatten_fields(arena.signatures[sig].params.fields).len(), 2);
    assert!(matches!(arena.signatures[sig].results, Some(Results::Type(_))));

    let Type::Interface { elems } = arena.types[type_spec(&arena, &file, "Iface")] else {
        panic!("expected interface");
    };
    let elems = arena.interface_elems(elems);
    assert_eq!(elems.len(), 2);
    let InterfaceElem::TypeElem(embedded) = elems[0] else {
        panic!("expected embedded interface");
    };
    assert_eq!(named(&arena, arena.embedded_type(embedded).unwrap()), "io.Reader");
    assert!(matches!(elems[1], InterfaceElem::Method { .. }));

    let Type::Struct { fields } = arena.types[type_spec(&arena, &file, "Emb")] else {
        panic!("expected struct");
    };
    let fields = arena.fields_list(fields);
    assert!(arena.fields[fields[0]].is_embed);
    assert!(arena.fields[fields[1]].is_embed);
    assert!(!arena.fields[fields[2]].is_embed);
    assert!(arena.fields[fields[2]].tag.is_some());

    let Type::Interface { elems } = arena.types[type_spec(&arena, &file, "Num")] else {
        panic!("expected constraint interface");
    };
    let [InterfaceElem::TypeElem(union)] = arena.interface_elems(elems) else {
        panic!("expected one union element");
    };
    assert_eq!(arena.type_terms(union.terms).len(), 2);
    assert!(arena.embedded_type(*union).is_none());
}

#[test]
fn files_share_one_arena() {
    let mut arena = AstArena::new();
    let a = parse_file_into(&mut arena, "package p\ntype A int\n").unwrap();
    let b = parse_file_into(&mut arena, "package p\ntype B []A\n").unwrap();
    assert_eq!(a.types.end, b.types.start);
    assert!(b.types.start < b.types.end);
    assert_eq!(arena.name(a.name.sym), arena.name(b.name.sym));
}

#[test]
fn syntax_errors_carry_a_position() {
    let src = "package p\n\nfunc (x\n";
    let err = parse_file(src).unwrap_err();
    assert_eq!(err.diags.len(), 1);
    let rendered = err.diags[0].render(src);
    assert_eq!(rendered, "3:8: expected `)` after parameters, found newline");

    let err = parse_file("package p\nvar x int\nimport \"fmt\"\n").unwrap_err();
    assert!(err.diags[0].message.contains("imports must appear"));
}
