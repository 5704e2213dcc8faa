//! Parses a directory into a [`Package`] whose top-level names are resolvable.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use gosyntax::ast::{
    AstArena, FuncDeclId, GenDeclId, GenDeclKind, IdentName, SignatureId, SourceFile, Span, Spec,
    TopLevelDecl, Type, TypeId, TypeSpec, ValueSpec,
};
use gosyntax::Diag;

use crate::build::BuildContext;
use crate::error::{Error, Result};

/// A top-level declaration, as bound in a package scope.
#[derive(Debug, Clone, Copy)]
pub enum Decl {
    Func {
        func: FuncDeclId,
        file: usize,
    },
    Type {
        spec: TypeSpec,
        kind: TypeKind,
        file: usize,
    },
    Var {
        spec: ValueSpec,
        decl: GenDeclId,
        file: usize,
    },
    Const {
        spec: ValueSpec,
        file: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Struct,
    Interface,
    Alias,
    Other,
}

/// A method, indexed by receiver type name and method name.
#[derive(Debug, Clone, Copy)]
pub struct MethodDecl {
    pub func: FuncDeclId,
    pub sig: SignatureId,
    pub pointer: bool,
    pub file: usize,
}

#[derive(Debug)]
pub struct LoadedFile {
    pub path: PathBuf,
    pub src: String,
    pub ast: SourceFile,
}

#[derive(Debug)]
pub struct Package {
    pub name: String,
    pub dir: PathBuf,
    pub arena: AstArena,
    pub files: Vec<LoadedFile>,
    scope: HashMap<String, Decl>,
    methods: HashMap<(String, String), MethodDecl>,
}

impl Package {
    #[inline]
    pub fn lookup(&self, name: &str) -> Option<Decl> {
        self.scope.get(name).copied()
    }

    /// Function (not method) named `name`.
    pub fn function(&self, name: &str) -> Option<FuncDeclId> {
        match self.lookup(name)? {
            Decl::Func { func, .. } => Some(func),
            _ => None,
        }
    }

    pub fn type_spec(&self, name: &str) -> Option<TypeSpec> {
        match self.lookup(name)? {
            Decl::Type { spec, .. } => Some(spec),
            _ => None,
        }
    }

    /// Method `method` declared with receiver `T` or `*T` where `T` is
    /// `type_name`.
    #[inline]
    pub fn method(&self, type_name: &str, method: &str) -> Option<MethodDecl> {
        self.methods
            .get(&(type_name.to_owned(), method.to_owned()))
            .copied()
    }

    /// Index of the file that owns a type node.
    pub fn file_of_type(&self, id: TypeId) -> Option<usize> {
        self.files.iter().position(|f| f.ast.types.contains(id))
    }

    #[inline]
    pub fn text(&self, name: IdentName) -> &str {
        self.arena.name(name.sym)
    }

    /// Source text of a type node, as written.
    pub fn spell(&self, id: TypeId) -> String {
        match self.file_of_type(id) {
            Some(file) => {
                let range = self.arena.types.span(id).range();
                self.files[file].src.get(range).unwrap_or("?").to_owned()
            }
            None => "?".to_owned(),
        }
    }
}

/// Loads the package `name` from `dir`. `_test.go` files are included, so
/// tables declared in tests resolve alongside the code they exercise. A name
/// declared twice is an error.
pub fn parse(dir: &Path, name: &str, build: &BuildContext) -> Result<Package> {
    load_dir(dir, Mode::Analysed { name }, build)
}

/// Loads an imported package. Its name is `hint` (the last element of the
/// import path) when a file declares that package, else the first file's.
/// Redeclarations keep the first binding.
pub fn load_import(dir: &Path, hint: &str, build: &BuildContext) -> Result<Package> {
    load_dir(dir, Mode::Imported { hint }, build)
}

#[derive(Debug, Clone, Copy)]
enum Mode<'a> {
    Analysed { name: &'a str },
    Imported { hint: &'a str },
}

impl Mode<'_> {
    fn strict(self) -> bool {
        matches!(self, Mode::Analysed { .. })
    }
}

fn go_files(dir: &Path, include_tests: bool, build: &BuildContext) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| Error::io(dir, e))?.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !file_name.ends_with(".go") || file_name.starts_with(['.', '_']) {
            continue;
        }
        if !include_tests && file_name.ends_with("_test.go") {
            continue;
        }
        if !build.matches_file_name(file_name) {
            tracing::trace!(target: "gotab::loader", file = file_name, "excluded by file name");
            continue;
        }
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn load_dir(dir: &Path, mode: Mode<'_>, build: &BuildContext) -> Result<Package> {
    let mut arena = AstArena::new();
    let mut parsed = Vec::new();

    for path in go_files(dir, mode.strict(), build)? {
        let src = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        if !build.matches_source(&src) {
            tracing::trace!(
                target: "gotab::loader",
                file = %path.display(),
                "excluded by build constraint"
            );
            continue;
        }
        let ast = gosyntax::parse_file_into(&mut arena, &src).map_err(|failure| {
            let diag = failure
                .diags
                .into_iter()
                .next()
                .unwrap_or_else(|| Diag::parse(Span::default(), "malformed source"));
            Error::syntax(&path, &src, diag)
        })?;
        parsed.push(LoadedFile { path, src, ast });
    }

    let name = match mode {
        Mode::Analysed { name } => Some(name.to_owned()),
        Mode::Imported { hint } => {
            let declared = |f: &LoadedFile| arena.name(f.ast.name.sym);
            parsed
                .iter()
                .find(|f| declared(*f) == hint)
                .or_else(|| parsed.first())
                .map(|f| declared(f).to_owned())
        }
    };

    let mut files = Vec::with_capacity(parsed.len());
    if let Some(name) = &name {
        for file in parsed {
            let file_pkg = arena.name(file.ast.name.sym);
            if file_pkg != name.as_str() {
                tracing::trace!(
                    target: "gotab::loader",
                    file = %file.path.display(),
                    package = file_pkg,
                    "skipping file of another package"
                );
                continue;
            }
            files.push(file);
        }
    }

    let Some(name) = name.filter(|_| !files.is_empty()) else {
        let package = match mode {
            Mode::Analysed { name } => name,
            Mode::Imported { hint } => hint,
        };
        return Err(Error::PackageNotFound {
            package: package.to_owned(),
            dir: dir.to_path_buf(),
        });
    };

    let mut pkg = Package {
        name,
        dir: dir.to_path_buf(),
        arena,
        files: Vec::with_capacity(files.len()),
        scope: HashMap::new(),
        methods: HashMap::new(),
    };

    let strict = mode.strict();
    for (index, file) in files.into_iter().enumerate() {
        let ast = file.ast;
        pkg.files.push(file);
        bind_file(&mut pkg, index, &ast, strict).map_err(|diag| {
            let file = &pkg.files[index];
            Error::syntax(&file.path, &file.src, diag)
        })?;
    }

    tracing::debug!(
        target: "gotab::loader",
        package = %pkg.name,
        dir = %dir.display(),
        files = pkg.files.len(),
        names = pkg.scope.len(),
        methods = pkg.methods.len(),
        "package loaded"
    );

    Ok(pkg)
}

/// Binds every top-level name of one file. A name bound twice is an error
/// when `strict`; otherwise the first binding stays.
fn bind_file(
    pkg: &mut Package,
    file: usize,
    ast: &SourceFile,
    strict: bool,
) -> std::result::Result<(), Diag> {
    let decls = pkg.arena.top_decls(ast.decls).to_vec();
    for decl in decls {
        match decl {
            TopLevelDecl::Func(func) => bind_func(pkg, file, func, strict)?,
            TopLevelDecl::Gen(id) => {
                let gen_decl = pkg.arena.gen_decls[id];
                let specs = pkg.arena.specs_list(gen_decl.specs).to_vec();
                for spec in specs {
                    match spec {
                        Spec::Type(spec) => {
                            let kind = type_kind(&pkg.arena, spec);
                            bind(pkg, spec.name, Decl::Type { spec, kind, file }, strict)?;
                        }
                        Spec::Value(spec) => {
                            let names = pkg.arena.ident_names(spec.names).to_vec();
                            for name in names {
                                let decl = match gen_decl.kind {
                                    GenDeclKind::Const => Decl::Const { spec, file },
                                    _ => Decl::Var {
                                        spec,
                                        decl: id,
                                        file,
                                    },
                                };
                                bind(pkg, name, decl, strict)?;
                            }
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

fn bind_func(
    pkg: &mut Package,
    file: usize,
    func: FuncDeclId,
    strict: bool,
) -> std::result::Result<(), Diag> {
    let decl = pkg.arena.funcs[func];
    let Some(recv) = decl.recv else {
        if pkg.text(decl.name) == "init" {
            return Ok(());
        }
        return bind(pkg, decl.name, Decl::Func { func, file }, strict);
    };

    let Some((type_name, pointer)) = receiver_type_name(&pkg.arena, recv.typ) else {
        return Err(Diag::parse(
            pkg.arena.types.span(recv.typ),
            "invalid receiver type",
        ));
    };
    let method = pkg.text(decl.name).to_owned();
    if method == "_" {
        return Ok(());
    }

    let entry = MethodDecl {
        func,
        sig: decl.signature,
        pointer,
        file,
    };
    match pkg.methods.entry((type_name.clone(), method)) {
        Entry::Occupied(slot) if !strict => {
            redeclared(&slot.key().1);
            Ok(())
        }
        Entry::Occupied(_) => Err(Diag::parse(
            decl.name.pos,
            format!("method {type_name}.{} already declared", pkg.arena.name(decl.name.sym)),
        )),
        Entry::Vacant(slot) => {
            slot.insert(entry);
            Ok(())
        }
    }
}

fn bind(
    pkg: &mut Package,
    name: IdentName,
    decl: Decl,
    strict: bool,
) -> std::result::Result<(), Diag> {
    let text = pkg.text(name).to_owned();
    if text == "_" {
        return Ok(());
    }
    match pkg.scope.entry(text) {
        Entry::Occupied(slot) if !strict => {
            redeclared(slot.key());
            Ok(())
        }
        Entry::Occupied(slot) => Err(Diag::parse(
            name.pos,
            format!("{} redeclared in this block", slot.key()),
        )),
        Entry::Vacant(slot) => {
            slot.insert(decl);
            Ok(())
        }
    }
}

fn redeclared(name: &str) {
    tracing::trace!(target: "gotab::loader", name, "redeclaration in imported package, first kept");
}

/// `T`, `*T`, `(T)`, `T[P]` and `*T[P]` all name the receiver type `T`.
pub fn receiver_type_name(arena: &AstArena, mut typ: TypeId) -> Option<(String, bool)> {
    let mut pointer = false;
    loop {
        match arena.types[typ] {
            Type::Paren { typ: inner } => typ = inner,
            Type::Pointer { elem, .. } if !pointer => {
                pointer = true;
                typ = elem;
            }
            Type::Named {
                pkg: None, name, ..
            } => return Some((arena.name(name.sym).to_owned(), pointer)),
            _ => return None,
        }
    }
}

fn type_kind(arena: &AstArena, spec: TypeSpec) -> TypeKind {
    if spec.alias {
        return TypeKind::Alias;
    }
    match arena.types[spec.typ] {
        Type::Struct { .. } => TypeKind::Struct,
        Type::Interface { .. } => TypeKind::Interface,
        _ => TypeKind::Other,
    }
}
