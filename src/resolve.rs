//! Cross-package type resolution.
//!
//! A [`Session`] owns every loaded package. Imported packages are located and
//! parsed the first time a qualified name refers to them; the outcome, failure
//! included, is cached per import path.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use gosyntax::ast::{
    FuncDeclId, IdentName, ImportName, InterfaceElem, SignatureId, Symbol, Type, TypeId, TypeSpec,
};

use crate::build::BuildContext;
use crate::config::SearchPaths;
use crate::error::{Error, Result};
use crate::loader::{self, Package};

/// Index of a package within a [`Session`].
pub type PkgId = usize;

/// Definition chains longer than this are reported as unsupported.
const MAX_DEPTH: usize = 32;

/// A declared type name, unique across the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeDeclRef {
    pub pkg: PkgId,
    pub name: Symbol,
}

/// What a type expression denotes once names are followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// A type literal in the arena of [`Resolved::pkg`].
    Type(TypeId),
    /// A predeclared or unresolvable name; compared by spelling.
    Opaque {
        qual: Option<Symbol>,
        name: Symbol,
    },
    /// `any`
    EmptyInterface,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    /// Package whose arena and interner own `shape`.
    pub pkg: PkgId,
    /// Outermost declared name the expression went through, if any.
    pub decl: Option<TypeDeclRef>,
    /// One level of `*` was stripped.
    pub pointer: bool,
    pub shape: Shape,
}

/// A method signature found in a method set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodRef {
    pub pkg: PkgId,
    pub sig: SignatureId,
    /// `None` for interface methods.
    pub func: Option<FuncDeclId>,
}

#[derive(Debug)]
pub struct Session {
    packages: Vec<Package>,
    imports: HashMap<String, Option<PkgId>>,
    search: SearchPaths,
    build: BuildContext,
}

impl Session {
    pub fn new(search: SearchPaths) -> Self {
        Self {
            packages: Vec::new(),
            imports: HashMap::new(),
            search,
            build: BuildContext::host(),
        }
    }

    /// Selects imported files for `build` instead of the host.
    pub fn with_build(mut self, build: BuildContext) -> Self {
        self.build = build;
        self
    }

    pub fn add_package(&mut self, pkg: Package) -> PkgId {
        self.packages.push(pkg);
        self.packages.len() - 1
    }

    #[inline]
    pub fn package(&self, id: PkgId) -> &Package {
        &self.packages[id]
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    #[inline]
    pub fn node(&self, pkg: PkgId, id: TypeId) -> Type {
        self.packages[pkg].arena.types[id]
    }

    /// Source text of a type node.
    pub fn spell(&self, pkg: PkgId, id: TypeId) -> String {
        self.packages[pkg].spell(id)
    }

    /// Spelling of an opaque shape, `pkg.Name` or `Name`.
    pub fn opaque_text(&self, r: &Resolved) -> Option<String> {
        let Shape::Opaque { qual, name } = r.shape else {
            return None;
        };
        let arena = &self.packages[r.pkg].arena;
        Some(match qual {
            Some(q) => format!("{}.{}", arena.name(q), arena.name(name)),
            None => arena.name(name).to_owned(),
        })
    }

    /// Package for `path` imported from package `from`, loading it on first
    /// use. Packages that cannot be found or parsed resolve to `None`.
    pub fn import(&mut self, from: PkgId, path: &str) -> Option<PkgId> {
        if let Some(&cached) = self.imports.get(path) {
            return cached;
        }

        let found = match self.locate(&self.packages[from].dir, path) {
            Some(dir) => match loader::load_import(&dir, import_name_hint(path), &self.build) {
                Ok(pkg) => {
                    tracing::debug!(
                        target: "gotab::resolve",
                        path,
                        dir = %dir.display(),
                        package = %pkg.name,
                        "import loaded"
                    );
                    Some(self.add_package(pkg))
                }
                Err(err) => {
                    tracing::warn!(target: "gotab::resolve", path, error = %err, "import could not be loaded");
                    None
                }
            },
            None => {
                tracing::warn!(target: "gotab::resolve", path, "import path not found");
                None
            }
        };

        self.imports.insert(path.to_owned(), found);
        found
    }

    /// Directory holding the package for import `path`: the enclosing module,
    /// its vendor tree, `GOROOT`, each `GOPATH` entry, then extra roots.
    fn locate(&self, from: &Path, path: &str) -> Option<PathBuf> {
        let mut candidates = Vec::new();

        if let Some((root, module)) = find_module(from) {
            if path == module {
                candidates.push(root.clone());
            } else if let Some(rest) = path
                .strip_prefix(module.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
            {
                candidates.push(root.join(rest));
            }
            candidates.push(root.join("vendor").join(path));
        }
        if let Some(goroot) = &self.search.goroot {
            candidates.push(goroot.join("src").join(path));
        }
        for gopath in &self.search.gopath {
            candidates.push(gopath.join("src").join(path));
        }
        for extra in &self.search.extra {
            candidates.push(extra.join(path));
        }

        candidates.into_iter().find(|dir| dir.is_dir())
    }

    /// Resolves a type expression of package `pkg`.
    pub fn resolve(&mut self, pkg: PkgId, typ: TypeId) -> Result<Resolved> {
        self.resolve_at(pkg, typ, 0)
    }

    /// Resolves the type declared as `name` in package `pkg`.
    pub fn resolve_named(&mut self, pkg: PkgId, name: &str) -> Result<Option<Resolved>> {
        match self.packages[pkg].type_spec(name) {
            Some(spec) => self.follow(pkg, spec, false, 0).map(Some),
            None => Ok(None),
        }
    }

    fn resolve_at(&mut self, pkg: PkgId, typ: TypeId, depth: usize) -> Result<Resolved> {
        let (id, pointer) = strip_pointer(&self.packages[pkg], typ);
        let Type::Named { pkg: qual, name, args } = self.node(pkg, id) else {
            return Ok(Resolved {
                pkg,
                decl: None,
                pointer,
                shape: Shape::Type(id),
            });
        };

        if !args.is_empty() {
            return Err(Error::UnsupportedShape(format!(
                "generic instantiation {}",
                self.spell(pkg, id)
            )));
        }

        let opaque = Resolved {
            pkg,
            decl: None,
            pointer,
            shape: Shape::Opaque {
                qual: qual.map(|q| q.sym),
                name: name.sym,
            },
        };

        let owner = match qual {
            None => pkg,
            Some(q) => match self.qualified_package(pkg, id, q) {
                Some(owner) => owner,
                None => {
                    tracing::warn!(
                        target: "gotab::resolve",
                        typ = %self.spell(pkg, id),
                        "unresolved package; comparing by name"
                    );
                    return Ok(opaque);
                }
            },
        };

        let text = self.packages[pkg].text(name).to_owned();
        match self.packages[owner].type_spec(&text) {
            Some(spec) => self.follow(owner, spec, pointer, depth),
            None if qual.is_none() && text == "any" => Ok(Resolved {
                shape: Shape::EmptyInterface,
                ..opaque
            }),
            None => Ok(opaque),
        }
    }

    fn follow(&mut self, pkg: PkgId, spec: TypeSpec, pointer: bool, depth: usize) -> Result<Resolved> {
        if spec.type_params.is_some() {
            return Err(Error::UnsupportedShape(format!(
                "generic type {}",
                self.packages[pkg].text(spec.name)
            )));
        }
        if depth >= MAX_DEPTH {
            return Err(Error::UnsupportedShape(format!(
                "definition of {} does not terminate",
                self.packages[pkg].text(spec.name)
            )));
        }
        let inner = self.resolve_at(pkg, spec.typ, depth + 1)?;
        // An alias denotes the declaration it names.
        let decl = if spec.alias {
            inner.decl
        } else {
            Some(TypeDeclRef {
                pkg,
                name: spec.name.sym,
            })
        };
        Ok(Resolved {
            decl,
            pointer,
            ..inner
        })
    }

    /// Package a qualifier refers to in the file owning type node `at`.
    ///
    /// An import aliased to the qualifier wins. Otherwise unaliased imports
    /// are loaded until one declares a package of that name, starting with
    /// those whose last path element matches.
    fn qualified_package(&mut self, pkg: PkgId, at: TypeId, qual: IdentName) -> Option<PkgId> {
        let package = &self.packages[pkg];
        let qualifier = package.text(qual).to_owned();
        let file = package.file_of_type(at)?;

        let mut aliased = None;
        let mut plain = Vec::new();
        for import in package.arena.imports_list(package.files[file].ast.imports) {
            let path = package.arena.name(import.path).to_owned();
            match import.name {
                None => plain.push(path),
                Some(ImportName::Name(alias)) if package.text(alias) == qualifier => {
                    aliased = Some(path);
                }
                Some(_) => {}
            }
        }

        if let Some(path) = aliased {
            return self.import(pkg, &path);
        }

        plain.sort_by_key(|path| last_element(path) != qualifier);
        for path in plain {
            if let Some(found) = self.import(pkg, &path) {
                if self.packages[found].name == qualifier {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Methods an interface type requires, embedded interfaces expanded, in
    /// declaration order.
    pub fn interface_methods(&mut self, pkg: PkgId, iface: TypeId) -> Result<Vec<(String, MethodRef)>> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        self.collect_methods(pkg, iface, &mut out, &mut seen)?;
        Ok(out)
    }

    fn collect_methods(
        &mut self,
        pkg: PkgId,
        iface: TypeId,
        out: &mut Vec<(String, MethodRef)>,
        seen: &mut HashSet<(PkgId, u32)>,
    ) -> Result<()> {
        if !seen.insert((pkg, iface.raw())) {
            return Ok(());
        }
        let Type::Interface { elems } = self.node(pkg, iface) else {
            return Ok(());
        };
        let elems = self.packages[pkg].arena.interface_elems(elems).to_vec();

        for elem in elems {
            match elem {
                InterfaceElem::Method { name, sig } => {
                    let text = self.packages[pkg].text(name).to_owned();
                    if !out.iter().any(|(existing, _)| *existing == text) {
                        out.push((text, MethodRef { pkg, sig, func: None }));
                    }
                }
                InterfaceElem::TypeElem(elem) => {
                    let Some(embedded) = self.packages[pkg].arena.embedded_type(elem) else {
                        return Err(Error::UnsupportedShape(format!(
                            "type union in interface {}",
                            self.spell(pkg, iface)
                        )));
                    };
                    let r = self.resolve(pkg, embedded)?;
                    match r.shape {
                        Shape::EmptyInterface => {}
                        Shape::Type(t) if matches!(self.node(r.pkg, t), Type::Interface { .. }) => {
                            self.collect_methods(r.pkg, t, out, seen)?;
                        }
                        _ => {
                            return Err(Error::UnsupportedShape(format!(
                                "embedded {} in interface {}",
                                self.spell(pkg, embedded),
                                self.spell(pkg, iface)
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Looks `name` up in the method set of `r`.
    ///
    /// Methods declared on the named type come first; a pointer-receiver
    /// method only counts when `r` is a pointer. Then embedded fields are
    /// searched in declaration order, the first hit winning.
    pub fn find_method(&mut self, r: &Resolved, name: &str) -> Result<Option<MethodRef>> {
        self.find_method_at(r, name, 0)
    }

    fn find_method_at(&mut self, r: &Resolved, name: &str, depth: usize) -> Result<Option<MethodRef>> {
        if depth >= MAX_DEPTH {
            return Ok(None);
        }

        if let Some(decl) = r.decl {
            let owner = &self.packages[decl.pkg];
            if let Some(method) = owner.method(owner.arena.name(decl.name), name) {
                if method.pointer && !r.pointer {
                    return Ok(None);
                }
                return Ok(Some(MethodRef {
                    pkg: decl.pkg,
                    sig: method.sig,
                    func: Some(method.func),
                }));
            }
        }

        let Shape::Type(t) = r.shape else {
            return Ok(None);
        };
        match self.node(r.pkg, t) {
            Type::Interface { .. } => Ok(self
                .interface_methods(r.pkg, t)?
                .into_iter()
                .find(|(method, _)| method == name)
                .map(|(_, m)| m)),
            Type::Struct { fields } => {
                let arena = &self.packages[r.pkg].arena;
                let embedded: Vec<TypeId> = arena
                    .fields_list(fields)
                    .iter()
                    .map(|&f| arena.fields[f])
                    .filter(|f| f.is_embed)
                    .map(|f| f.typ)
                    .collect();
                for typ in embedded {
                    let mut inner = self.resolve(r.pkg, typ)?;
                    inner.pointer |= r.pointer;
                    if let Some(found) = self.find_method_at(&inner, name, depth + 1)? {
                        return Ok(Some(found));
                    }
                }
                Ok(None)
            }
            _ => Ok(None),
        }
    }
}

/// Strips parentheses and at most one `*`.
fn strip_pointer(pkg: &Package, mut typ: TypeId) -> (TypeId, bool) {
    let mut pointer = false;
    loop {
        match pkg.arena.types[typ] {
            Type::Paren { typ: inner } => typ = inner,
            Type::Pointer { elem, .. } if !pointer => {
                pointer = true;
                typ = elem;
            }
            _ => return (typ, pointer),
        }
    }
}

fn last_element(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Likely package name of an import path: its last element, skipping a
/// `/vN` major version suffix.
fn import_name_hint(path: &str) -> &str {
    let mut elems = path.rsplit('/');
    let last = elems.next().unwrap_or(path);
    let versioned = last
        .strip_prefix('v')
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
    match elems.next() {
        Some(parent) if versioned => parent,
        _ => last,
    }
}

/// Nearest `go.mod` at or above `dir`: the module root and module path.
fn find_module(dir: &Path) -> Option<(PathBuf, String)> {
    dir.ancestors().find_map(|root| {
        let text = fs::read_to_string(root.join("go.mod")).ok()?;
        let module = module_path(&text)?;
        Some((root.to_path_buf(), module))
    })
}

fn module_path(gomod: &str) -> Option<String> {
    gomod.lines().find_map(|line| {
        let line = line.split("//").next().unwrap_or("").trim();
        let rest = line.strip_prefix("module")?;
        if !rest.starts_with([' ', '\t']) {
            return None;
        }
        let path = rest.trim().trim_matches(|c| c == '"' || c == '`');
        (!path.is_empty()).then(|| path.to_owned())
    })
}
