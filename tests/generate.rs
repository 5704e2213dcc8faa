use std::fs;
use std::path::PathBuf;

use gotab::{Config, Error};
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new(files: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        for (name, src) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, src).unwrap();
        }
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn read(&self, name: &str) -> String {
        fs::read_to_string(self.path(name)).unwrap()
    }

    fn run(&self, name: &str, package: &str) -> gotab::Result<usize> {
        gotab::process(&self.path(name), package, &Config::default())
    }
}

const CALC: &str = "package calc

type Counter struct{ n int }

func (c *Counter) Increment(n int) int {
	c.n += n
	return c.n
}

func Add(a, b int) (sum int) { return a + b }

func Sum(base int, xs ...int) int {
	for _, x := range xs {
		base += x
	}
	return base
}
";

const ADD_TABLE: &str = "package calc

import \"testing\"

var ttAdd = []struct {
	a, b int
	sum  int
}{
	{1, 2, 3},
	{-1, 1, 0},
}
";

const ADD_ROUTINE: &str = "

// TestTTAdd is an automatically generated table driven test for the function
// Add using the tests defined in ttAdd.
func TestTTAdd(t *testing.T) {
	for i, tt := range ttAdd {
		sum := Add(tt.a, tt.b)
		if sum != tt.sum {
			t.Errorf(\"%d : sum : got %v, expected %v\", i, sum, tt.sum)
		}
	}
}
";

#[test]
fn function_table_gets_a_routine() {
    let fx = Fixture::new(&[("calc.go", CALC), ("calc_test.go", ADD_TABLE)]);
    assert_eq!(fx.run("calc_test.go", "calc").unwrap(), 1);

    let expected = format!("{}{ADD_ROUTINE}", ADD_TABLE.trim_end_matches('\n'));
    assert_eq!(fx.read("calc_test.go"), expected);
    assert_eq!(fx.read("calc.go"), CALC);
}

#[test]
fn regenerating_is_idempotent() {
    let fx = Fixture::new(&[("calc.go", CALC), ("calc_test.go", ADD_TABLE)]);
    fx.run("calc_test.go", "calc").unwrap();
    let first = fx.read("calc_test.go");
    fx.run("calc_test.go", "calc").unwrap();
    assert_eq!(fx.read("calc_test.go"), first);
}

#[test]
fn stale_routines_are_replaced_and_following_code_kept() {
    let src = "package calc

import \"testing\"

var (
	ttAdd = []struct {
		a, b int
		sum  int
	}{}
)

// TestTTAdd was edited by hand.
func TestTTAdd(t *testing.T) {
	t.Fatal(\"stale\")
}

// helper stays.
func helper() {}
";
    let fx = Fixture::new(&[("calc.go", CALC), ("calc_test.go", src)]);
    fx.run("calc_test.go", "calc").unwrap();

    let out = fx.read("calc_test.go");
    assert!(!out.contains("stale"));
    assert!(out.contains("\t}{}\n)\n\n// TestTTAdd is an automatically generated"));
    assert!(out.ends_with("\t}\n}\n\n// helper stays.\nfunc helper() {}\n"));
    assert_eq!(out.matches("func TestTTAdd").count(), 1);
}

#[test]
fn method_table_calls_through_the_receiver() {
    let table = "package calc

import \"testing\"

var ttCounter_Increment = []struct {
	c    *Counter
	n    int
	want int
}{
	{&Counter{}, 1, 1},
}
";
    let fx = Fixture::new(&[("calc.go", CALC), ("counter_test.go", table)]);
    assert_eq!(fx.run("counter_test.go", "calc").unwrap(), 1);

    let out = fx.read("counter_test.go");
    assert!(out.contains("func TestTTCounter_Increment(t *testing.T) {\n"));
    assert!(out.contains("// the method Counter.Increment using the tests defined in ttCounter_Increment."));
    assert!(out.contains("\t\twant := tt.c.Increment(tt.n)\n"));
    assert!(out.contains("\t\tif want != tt.want {\n"));
}

#[test]
fn extra_field_is_a_count_mismatch_and_leaves_the_file_alone() {
    let table = "package calc

import \"testing\"

var ttAdd = []struct {
	a, b  int
	sum   int
	extra string
}{}
";
    let fx = Fixture::new(&[("calc.go", CALC), ("calc_test.go", table)]);
    match fx.run("calc_test.go", "calc") {
        Err(Error::SlotCountMismatch { fields, slots, .. }) => {
            assert_eq!((fields, slots), (4, 3));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(fx.read("calc_test.go"), table);
}

#[test]
fn incompatible_field_fails_at_its_slot() {
    let table = "package calc

import \"testing\"

var ttAdd = []struct {
	a   int
	b   string
	sum int
}{}
";
    let fx = Fixture::new(&[("calc.go", CALC), ("calc_test.go", table)]);
    let err = fx.run("calc_test.go", "calc").unwrap_err();
    assert_eq!(
        err.to_string(),
        "slot 1 of Add (int) does not match field b of ttAdd (string)"
    );
    assert_eq!(fx.read("calc_test.go"), table);
}

#[test]
fn one_bad_table_blocks_every_write() {
    let table = "package calc

import \"testing\"

var ttAdd = []struct {
	a, b int
	sum  int
}{}

var ttSum = []struct {
	base int
}{}
";
    let fx = Fixture::new(&[("calc.go", CALC), ("calc_test.go", table)]);
    assert!(matches!(
        fx.run("calc_test.go", "calc"),
        Err(Error::SlotCountMismatch { .. })
    ));
    assert_eq!(fx.read("calc_test.go"), table);
}

#[test]
fn variadic_slots_take_slices() {
    let table = "package calc

import \"testing\"

var ttSum = []struct {
	base int
	xs   []int
	out  int
}{}
";
    let fx = Fixture::new(&[("calc.go", CALC), ("calc_test.go", table)]);
    fx.run("calc_test.go", "calc").unwrap();
    assert!(fx.read("calc_test.go").contains("\t\tout := Sum(tt.base, tt.xs...)\n"));
}

const IO: &str = "package stream

type Reader interface{ Read() string }

type ReadCloser interface {
	Reader
	Close() error
}

type file struct{}

func (f *file) Read() string { return \"\" }
func (f *file) Close() error { return nil }

func Drain(rc ReadCloser) string { return rc.Read() }
";

#[test]
fn embedded_interfaces_are_required_transitively() {
    let table = "package stream

import \"testing\"

var ttDrain = []struct {
	rc  *file
	out string
}{}
";
    let fx = Fixture::new(&[("stream.go", IO), ("stream_test.go", table)]);
    assert_eq!(fx.run("stream_test.go", "stream").unwrap(), 1);
}

#[test]
fn pointer_receiver_methods_do_not_satisfy_values() {
    let table = "package stream

import \"testing\"

var ttDrain = []struct {
	rc  file
	out string
}{}
";
    let fx = Fixture::new(&[("stream.go", IO), ("stream_test.go", table)]);
    match fx.run("stream_test.go", "stream") {
        Err(Error::SlotMismatch {
            index,
            slot,
            field_type,
            ..
        }) => {
            assert_eq!(index, 0);
            assert_eq!(slot, "ReadCloser");
            assert_eq!(field_type, "file");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn imported_types_resolve_across_aliases() {
    let fx = Fixture::new(&[
        ("go.mod", "module example.com/m\n\ngo 1.22\n"),
        ("geo/geo.go", "package geo\n\ntype Point struct{ X, Y int }\n"),
        (
            "app/app.go",
            "package app\n\nimport \"example.com/m/geo\"\n\nfunc Norm(p geo.Point) int { return p.X + p.Y }\n",
        ),
        (
            "app/app_test.go",
            "package app\n\nimport (\n\t\"testing\"\n\n\tg \"example.com/m/geo\"\n)\n\nvar ttNorm = []struct {\n\tp g.Point\n\tn int\n}{}\n",
        ),
    ]);
    assert_eq!(fx.run("app/app_test.go", "app").unwrap(), 1);
    assert!(fx.read("app/app_test.go").contains("\t\tn := Norm(tt.p)\n"));
}

#[test]
fn files_without_tables_are_untouched() {
    let fx = Fixture::new(&[("calc.go", CALC)]);
    assert_eq!(fx.run("calc.go", "calc").unwrap(), 0);
    assert_eq!(fx.read("calc.go"), CALC);
}

#[test]
fn unknown_package_is_reported() {
    let fx = Fixture::new(&[("calc.go", CALC), ("calc_test.go", ADD_TABLE)]);
    assert!(matches!(
        fx.run("calc_test.go", "other"),
        Err(Error::PackageNotFound { .. })
    ));
}

#[test]
fn variadic_slots_reject_scalars_and_other_elements() {
    for decl in ["xs int", "xs []string"] {
        let table = format!(
            "package calc\n\nimport \"testing\"\n\nvar ttSum = []struct {{\n\tbase int\n\t{decl}\n\tout  int\n}}{{}}\n"
        );
        let fx = Fixture::new(&[("calc.go", CALC), ("calc_test.go", &table)]);
        match fx.run("calc_test.go", "calc") {
            Err(Error::SlotMismatch { index, slot, field, .. }) => {
                assert_eq!((index, slot.as_str(), field.as_str()), (1, "...int", "xs"));
            }
            other => panic!("unexpected {other:?} for {decl}"),
        }
        assert_eq!(fx.read("calc_test.go"), table);
    }
}

const SIZES: &str = "package sizes

type Sizer interface {
	Size() int
	Name() string
}

type Measured interface {
	Sizer
}

type box struct{}

func (b box) Size() int     { return 0 }
func (b box) Name() string  { return \"box\" }

type half struct{}

func (h half) Size() int { return 0 }

func Report(m Measured) string { return m.Name() }
";

#[test]
fn embed_only_interfaces_take_the_embedded_methods() {
    let table = "package sizes

import \"testing\"

var ttReport = []struct {
	m   box
	out string
}{}
";
    let fx = Fixture::new(&[("sizes.go", SIZES), ("sizes_test.go", table)]);
    assert_eq!(fx.run("sizes_test.go", "sizes").unwrap(), 1);
    assert!(fx.read("sizes_test.go").contains("\t\tout := Report(tt.m)\n"));
}

#[test]
fn embed_only_interfaces_reject_partial_implementations() {
    let table = "package sizes

import \"testing\"

var ttReport = []struct {
	m   half
	out string
}{}
";
    let fx = Fixture::new(&[("sizes.go", SIZES), ("sizes_test.go", table)]);
    match fx.run("sizes_test.go", "sizes") {
        Err(Error::SlotMismatch {
            index,
            slot,
            field_type,
            ..
        }) => {
            assert_eq!(index, 0);
            assert_eq!(slot, "Measured");
            assert_eq!(field_type, "half");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(fx.read("sizes_test.go"), table);
}

/// An import directory holding a `//go:build ignore` generator in package
/// `main` and one file per platform.
fn shapes_module() -> Fixture {
    Fixture::new(&[
        ("go.mod", "module example.com/m\n\ngo 1.22\n"),
        (
            "shapes/gen_variants.go",
            "//go:build ignore\n\npackage main\n\nfunc main() {}\n",
        ),
        (
            "shapes/shapes.go",
            "package shapes\n\ntype Shape interface{ Area() float64 }\n",
        ),
        (
            "shapes/os_linux.go",
            "package shapes\n\nfunc platform() string { return \"linux\" }\n",
        ),
        (
            "shapes/os_windows.go",
            "package shapes\n\nfunc platform() string { return \"windows\" }\n",
        ),
        (
            "shapes/os_darwin.go",
            "package shapes\n\nfunc platform() string { return \"darwin\" }\n",
        ),
        (
            "app/app.go",
            "package app\n\nimport \"example.com/m/shapes\"\n\nfunc Total(s shapes.Shape) float64 { return s.Area() }\n",
        ),
        (
            "app/app_test.go",
            "package app\n\nimport \"testing\"\n\ntype Square struct{ side float64 }\n\nfunc (s Square) Area() float64 { return s.side * s.side }\n\nvar ttTotal = []struct {\n\ts   Square\n\tout float64\n}{}\n",
        ),
    ])
}

#[test]
fn imports_skip_constrained_files() {
    let fx = shapes_module();
    assert_eq!(fx.run("app/app_test.go", "app").unwrap(), 1);
    assert!(fx.read("app/app_test.go").contains("\t\tout := Total(tt.s)\n"));
}

#[test]
fn imported_interfaces_still_check_methods() {
    let fx = shapes_module();
    let table = "package app\n\nimport \"testing\"\n\ntype Line struct{}\n\nvar ttTotal = []struct {\n\ts   Line\n\tout float64\n}{}\n";
    fs::write(fx.path("app/app_test.go"), table).unwrap();
    match fx.run("app/app_test.go", "app") {
        Err(Error::SlotMismatch { slot, field_type, .. }) => {
            assert_eq!(slot, "shapes.Shape");
            assert_eq!(field_type, "Line");
        }
        other => panic!("unexpected {other:?}"),
    }
}
