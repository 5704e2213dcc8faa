//! Build constraints: `_GOOS`/`_GOARCH` file name suffixes, `//go:build`
//! expressions and the older `// +build` lines.

use std::env;

const KNOWN_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "js", "linux",
    "nacl", "netbsd", "openbsd", "plan9", "solaris", "wasip1", "windows", "zos",
];

const UNIX_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "linux",
    "netbsd", "openbsd", "solaris",
];

const KNOWN_ARCH: &[&str] = &[
    "386", "amd64", "amd64p32", "arm", "armbe", "arm64", "arm64be", "loong64", "mips", "mipsle",
    "mips64", "mips64le", "mips64p32", "mips64p32le", "ppc", "ppc64", "ppc64le", "riscv",
    "riscv64", "s390", "s390x", "sparc", "sparc64", "wasm",
];

/// The platform files are selected for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    pub goos: String,
    pub goarch: String,
    pub cgo: bool,
}

impl Default for BuildContext {
    fn default() -> Self {
        Self::host()
    }
}

impl BuildContext {
    pub fn new(goos: impl Into<String>, goarch: impl Into<String>) -> Self {
        Self {
            goos: goos.into(),
            goarch: goarch.into(),
            cgo: false,
        }
    }

    /// The platform this binary runs on, in Go's spelling.
    pub fn host() -> Self {
        let goos = match env::consts::OS {
            "macos" => "darwin",
            os => os,
        };
        let goarch = match env::consts::ARCH {
            "x86_64" => "amd64",
            "x86" => "386",
            "aarch64" => "arm64",
            "powerpc64" if cfg!(target_endian = "little") => "ppc64le",
            "powerpc64" => "ppc64",
            "loongarch64" => "loong64",
            arch => arch,
        };
        Self::new(goos, goarch)
    }

    /// `GOOS`, `GOARCH` and `CGO_ENABLED` as `go generate` exports them,
    /// falling back to the host.
    pub fn from_env() -> Self {
        let mut ctx = Self::host();
        if let Some(goos) = env::var("GOOS").ok().filter(|v| !v.is_empty()) {
            ctx.goos = goos;
        }
        if let Some(goarch) = env::var("GOARCH").ok().filter(|v| !v.is_empty()) {
            ctx.goarch = goarch;
        }
        ctx.cgo = env::var("CGO_ENABLED").is_ok_and(|v| v == "1");
        ctx
    }

    /// Whether a single build tag holds.
    pub fn matches_tag(&self, tag: &str) -> bool {
        match tag {
            t if t == self.goos || t == self.goarch => true,
            "unix" => UNIX_OS.contains(&self.goos.as_str()),
            "gc" => true,
            "cgo" => self.cgo,
            "linux" => self.goos == "android",
            "darwin" => self.goos == "ios",
            "solaris" => self.goos == "illumos",
            t => is_release_tag(t),
        }
    }

    /// Whether the `_GOOS`, `_GOARCH` or `_GOOS_GOARCH` suffix of a file
    /// name, if any, admits the file.
    pub fn matches_file_name(&self, name: &str) -> bool {
        let stem = name.strip_suffix(".go").unwrap_or(name);
        let stem = stem.strip_suffix("_test").unwrap_or(stem);
        let Some(first) = stem.find('_') else {
            return true;
        };
        let parts: Vec<&str> = stem[first + 1..].split('_').collect();
        let n = parts.len();
        if n >= 2 && KNOWN_OS.contains(&parts[n - 2]) && KNOWN_ARCH.contains(&parts[n - 1]) {
            return self.matches_tag(parts[n - 2]) && self.matches_tag(parts[n - 1]);
        }
        let last = parts[n - 1];
        if KNOWN_OS.contains(&last) || KNOWN_ARCH.contains(&last) {
            return self.matches_tag(last);
        }
        true
    }

    /// Whether the constraint comments ahead of the package clause admit
    /// the file. A `//go:build` line overrides any `// +build` lines.
    pub fn matches_source(&self, src: &str) -> bool {
        let mut plus = Vec::new();
        for line in header_comments(src) {
            if let Some(expr) = line.strip_prefix("//go:build") {
                if expr.is_empty() || expr.starts_with([' ', '\t']) {
                    return self.eval(expr);
                }
            } else if let Some(opts) = line[2..].trim_start().strip_prefix("+build") {
                if opts.starts_with([' ', '\t']) && !opts.trim().is_empty() {
                    plus.push(opts);
                }
            }
        }
        plus.into_iter().all(|opts| self.plus_build(opts))
    }

    /// `// +build a,b !c`: any space-separated option, each a comma-joined
    /// conjunction.
    fn plus_build(&self, opts: &str) -> bool {
        opts.split_whitespace().any(|opt| {
            opt.split(',').all(|term| match term.strip_prefix('!') {
                Some(tag) => !self.matches_tag(tag),
                None => self.matches_tag(term),
            })
        })
    }

    fn eval(&self, expr: &str) -> bool {
        let mut parser = ExprParser { rest: expr, ctx: self };
        match parser.or() {
            Some(value) if parser.rest.trim().is_empty() => value,
            _ => {
                tracing::trace!(target: "gotab::build", expr, "malformed build expression");
                true
            }
        }
    }
}

/// `go1.N` tags hold for every release.
fn is_release_tag(tag: &str) -> bool {
    tag.strip_prefix("go1.")
        .is_some_and(|minor| !minor.is_empty() && minor.bytes().all(|b| b.is_ascii_digit()))
}

/// Line comments preceding the package clause, block comments skipped.
fn header_comments(src: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut in_block = false;
    for line in src.lines() {
        let line = line.trim();
        if in_block {
            in_block = !line.contains("*/");
            continue;
        }
        if line.is_empty() {
            continue;
        }
        if line.starts_with("//") {
            out.push(line);
        } else if line.starts_with("/*") {
            in_block = !line[2..].contains("*/");
        } else {
            break;
        }
    }
    out
}

/// `||` over `&&` over `!`, with parentheses.
struct ExprParser<'a> {
    rest: &'a str,
    ctx: &'a BuildContext,
}

impl ExprParser<'_> {
    fn eat(&mut self, tok: &str) -> bool {
        self.rest = self.rest.trim_start();
        match self.rest.strip_prefix(tok) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn or(&mut self) -> Option<bool> {
        let mut value = self.and()?;
        while self.eat("||") {
            let rhs = self.and()?;
            value = value || rhs;
        }
        Some(value)
    }

    fn and(&mut self) -> Option<bool> {
        let mut value = self.not()?;
        while self.eat("&&") {
            let rhs = self.not()?;
            value = value && rhs;
        }
        Some(value)
    }

    fn not(&mut self) -> Option<bool> {
        if self.eat("!") {
            return self.not().map(|v| !v);
        }
        if self.eat("(") {
            let value = self.or()?;
            return self.eat(")").then_some(value);
        }
        self.rest = self.rest.trim_start();
        let len = self
            .rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
            .unwrap_or(self.rest.len());
        if len == 0 {
            return None;
        }
        let (tag, rest) = self.rest.split_at(len);
        self.rest = rest;
        Some(self.ctx.matches_tag(tag))
    }
}
