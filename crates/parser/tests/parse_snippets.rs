use gosyntax::ast::TopLevelDecl;
use gosyntax::parse_file;

/// Parses `src` and returns the number of (gen, func) top-level declarations.
fn assert_parses(src: &str) -> (usize, usize) {
    let (arena, file) = match parse_file(src) {
        Ok(parsed) => parsed,
        Err(f) => panic!("expected parse ok, got diagnostics: {:#?}", f.diags),
    };
    let decls = arena.top_decls(file.decls);
    let funcs = decls
        .iter()
        .filter(|d| matches!(d, TopLevelDecl::Func(_)))
        .count();
    (decls.len() - funcs, funcs)
}

#[test]
fn parses_imports_and_decls() {
    let counts = assert_parses(
        r#"
package main

import (
    "fmt"
    . "math"
    _ "net/http"
)

const (
    A = 1
    B int = 2
)

var (
    x = 1
    y, z int
)

type (
    T = int
    U[T any] struct { F T }
    V interface {
        M(x int) int
        ~int | ~string
    }
)

func main() {
    fmt.Println(Sqrt(4))
}
"#,
    );
    assert_eq!(counts, (3, 1));
}

#[test]
fn parses_statements() {
    let counts = assert_parses(
        r#"
package p

func f(x int) int {
    if x < 0 { return -x }
    for i := 0; i < 10; i++ {
        if i == 5 { break }
        continue
    }
    for range []int{1,2,3} {
    }
    switch x {
    case 0, 1:
        x++
    default:
        x = 3
    }
    select {
    case ch <- x:
        return x
    default:
        return 0
    }
}
"#,
    );
    assert_eq!(counts, (0, 1));
}

#[test]
fn parses_expressions() {
    let counts = assert_parses(
        r#"
package p

func f(a, b, c int, ch chan<- int) {
    _ = a + b*c - (a<<2)
    _ = a == b || a < c && b <= c
    _ = &a
    _ = <-ch
    _ = []int{1,2,3}[0]
    _ = []int{1,2,3}[1:]
    _ = []int{1,2,3}[:2]
    _ = []int{1,2,3}[0:2:3]
    _ = map[string]int{"a":1, "b":2}["a"]
    _ = f(a, b, c)
    _ = f(a, b, c...)
}
"#,
    );
    assert_eq!(counts, (0, 1));
}
