//! Go build context: source roots, target platform, and package
//! classification.
//!
//! The context answers three questions for the scanners: where are the
//! source roots, where does the toolchain put compiled archives for this
//! target, and which package does a given `.go` file declare (if any).
//! Classification reads only the file header — filename platform
//! constraints, build-tag lines, and the package clause — never the full
//! syntax tree.

use std::env;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};

/// How much of a file header to read when looking for the package clause.
/// Covers license banners of any realistic length.
const HEADER_READ_LIMIT: u64 = 16 * 1024;

const KNOWN_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "illumos", "ios", "js", "linux", "netbsd",
    "openbsd", "plan9", "solaris", "wasip1", "windows",
];

const KNOWN_ARCH: &[&str] = &[
    "386", "amd64", "arm", "arm64", "loong64", "mips", "mips64", "mips64le", "mipsle", "ppc64",
    "ppc64le", "riscv64", "s390x", "wasm",
];

/// Build parameters for one target, shared by every root scanner.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Compiler toolchain: `"gc"` or `"gccgo"`.
    pub compiler: String,
    pub goos: String,
    pub goarch: String,
    /// Optional suffix appended to the archive directory name
    /// (e.g. `"race"` producing `pkg/linux_amd64_race`).
    pub install_suffix: String,
    pub goroot: Option<PathBuf>,
    pub gopaths: Vec<PathBuf>,
}

impl BuildContext {
    /// Build a context from the process environment, with platform
    /// defaults where the Go variables are unset.
    pub fn from_env() -> Self {
        let goos = env::var("GOOS").unwrap_or_else(|_| host_goos().to_string());
        let goarch = env::var("GOARCH").unwrap_or_else(|_| host_goarch().to_string());
        let goroot = env::var_os("GOROOT")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(goroot_from_toolchain);
        let gopaths = match env::var_os("GOPATH") {
            Some(v) if !v.is_empty() => env::split_paths(&v).collect(),
            _ => dirs::home_dir().map(|h| h.join("go")).into_iter().collect(),
        };
        Self {
            compiler: "gc".to_string(),
            goos,
            goarch,
            install_suffix: String::new(),
            goroot,
            gopaths,
        }
    }

    /// Build a context for explicit roots, targeting the host platform.
    pub fn with_roots(goroot: Option<PathBuf>, gopaths: Vec<PathBuf>) -> Self {
        Self {
            compiler: "gc".to_string(),
            goos: host_goos().to_string(),
            goarch: host_goarch().to_string(),
            install_suffix: String::new(),
            goroot,
            gopaths,
        }
    }

    /// Existing `src` directories under GOROOT then each GOPATH entry.
    pub fn src_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        if let Some(goroot) = &self.goroot {
            let d = goroot.join("src");
            if d.is_dir() {
                dirs.push(d);
            }
        }
        for gopath in &self.gopaths {
            let d = gopath.join("src");
            if d.is_dir() && !dirs.contains(&d) {
                dirs.push(d);
            }
        }
        dirs
    }

    /// Whether `dir` belongs to the toolchain's own standard library.
    pub fn is_stdlib_root(&self, dir: &Path) -> bool {
        self.goroot.as_deref().is_some_and(|gr| dir.starts_with(gr))
    }

    /// Relative directory holding compiled archives for this target,
    /// e.g. `pkg/linux_amd64` or `pkg/gccgo_linux_amd64_race`.
    pub fn pkg_target_root(&self) -> Result<String> {
        let mut root = match self.compiler.as_str() {
            "gc" => format!("pkg/{}_{}", self.goos, self.goarch),
            "gccgo" => format!("pkg/gccgo_{}_{}", self.goos, self.goarch),
            other => {
                return Err(Error::UnknownCompiler {
                    name: other.to_string(),
                })
            }
        };
        if !self.install_suffix.is_empty() {
            root.push('_');
            root.push_str(&self.install_suffix);
        }
        Ok(root)
    }

    /// Classify a source file: the package name it declares, or `None`
    /// when the file is excluded by platform constraints, carries the
    /// `ignore` build tag, or has no parseable package clause.
    pub fn short_import(&self, path: &Path) -> Option<String> {
        if !self.good_os_arch_file(path) {
            return None;
        }
        let header = read_header(path)?;
        parse_package_clause(&header)
    }

    /// Filename platform constraints: `name_GOOS.go`, `name_GOARCH.go`,
    /// and `name_GOOS_GOARCH.go` only build on matching targets. A bare
    /// `linux.go` has no prefix and is unconstrained.
    fn good_os_arch_file(&self, path: &Path) -> bool {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            return false;
        };
        let parts: Vec<&str> = stem.split('_').collect();
        let n = parts.len();
        if n >= 3 && KNOWN_OS.contains(&parts[n - 2]) && KNOWN_ARCH.contains(&parts[n - 1]) {
            return parts[n - 2] == self.goos && parts[n - 1] == self.goarch;
        }
        if n >= 2 && KNOWN_OS.contains(&parts[n - 1]) {
            return parts[n - 1] == self.goos;
        }
        if n >= 2 && KNOWN_ARCH.contains(&parts[n - 1]) {
            return parts[n - 1] == self.goarch;
        }
        true
    }
}

/// GOROOT as reported by an installed toolchain, if any.
fn goroot_from_toolchain() -> Option<PathBuf> {
    let output = Command::new("go").args(["env", "GOROOT"]).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if root.is_empty() {
        None
    } else {
        Some(PathBuf::from(root))
    }
}

fn host_goos() -> &'static str {
    match env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

fn host_goarch() -> &'static str {
    match env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        other => other,
    }
}

fn read_header(path: &Path) -> Option<String> {
    let file = fs::File::open(path).ok()?;
    let mut buf = Vec::new();
    file.take(HEADER_READ_LIMIT).read_to_end(&mut buf).ok()?;
    Some(String::from_utf8_lossy(&buf).into_owned())
}

/// Scan a file header for the package clause, skipping blank lines and
/// comments. Returns `None` on malformed headers or an excluding build
/// tag rather than erroring: a file that cannot be classified is simply
/// not a package member.
fn parse_package_clause(src: &str) -> Option<String> {
    let src = src.strip_prefix('\u{feff}').unwrap_or(src);
    let mut in_block = false;
    for raw in src.lines() {
        let mut line = raw.trim();
        if in_block {
            let Some(end) = line.find("*/") else {
                continue;
            };
            line = line[end + 2..].trim_start();
            in_block = false;
        }
        while let Some(rest) = line.strip_prefix("/*") {
            match rest.find("*/") {
                Some(end) => line = rest[end + 2..].trim_start(),
                None => {
                    in_block = true;
                    line = "";
                }
            }
        }
        if line.is_empty() {
            continue;
        }
        if let Some(comment) = line.strip_prefix("//") {
            if is_excluding_build_tag(comment) {
                return None;
            }
            continue;
        }
        let rest = line.strip_prefix("package")?;
        if !rest.starts_with(|c: char| c.is_whitespace()) {
            return None;
        }
        let name: String = rest
            .trim_start()
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
            return None;
        }
        return Some(name);
    }
    None
}

/// Whether a `//`-comment body is a build-tag line naming the `ignore` tag.
fn is_excluding_build_tag(comment: &str) -> bool {
    if let Some(expr) = comment.strip_prefix("go:build") {
        return expr.starts_with(|c: char| c.is_whitespace())
            && expr.split_whitespace().any(|tok| tok == "ignore");
    }
    comment.trim_start().strip_prefix("+build").is_some_and(|expr| {
        expr.starts_with(|c: char| c.is_whitespace())
            && expr.split_whitespace().any(|tok| tok == "ignore")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn host_context() -> BuildContext {
        BuildContext::with_roots(None, Vec::new())
    }

    #[test]
    fn parses_plain_package_clause() {
        assert_eq!(parse_package_clause("package http\n"), Some("http".into()));
        assert_eq!(
            parse_package_clause("\n\npackage  main // entry\n"),
            Some("main".into())
        );
    }

    #[test]
    fn skips_comments_before_clause() {
        let src = "// Copyright.\n// License.\n\npackage a\n";
        assert_eq!(parse_package_clause(src), Some("a".into()));

        let src = "/* multi\n   line\n   banner */\npackage b\n";
        assert_eq!(parse_package_clause(src), Some("b".into()));

        let src = "/* inline */ package c\n";
        assert_eq!(parse_package_clause(src), Some("c".into()));
    }

    #[test]
    fn rejects_malformed_headers() {
        assert_eq!(parse_package_clause(""), None);
        assert_eq!(parse_package_clause("func main() {}\n"), None);
        assert_eq!(parse_package_clause("packagefoo\n"), None);
        assert_eq!(parse_package_clause("package 9lives\n"), None);
        assert_eq!(parse_package_clause("package\n"), None);
    }

    #[test]
    fn ignore_build_tag_excludes_file() {
        assert_eq!(
            parse_package_clause("//go:build ignore\n\npackage gen\n"),
            None
        );
        assert_eq!(
            parse_package_clause("// +build ignore\n\npackage gen\n"),
            None
        );
        // Unrelated tags do not exclude.
        assert_eq!(
            parse_package_clause("//go:build linux\n\npackage a\n"),
            Some("a".into())
        );
    }

    #[test]
    fn filename_platform_constraints() {
        let mut ctx = host_context();
        ctx.goos = "linux".to_string();
        ctx.goarch = "amd64".to_string();

        assert!(ctx.good_os_arch_file(Path::new("a/io.go")));
        assert!(ctx.good_os_arch_file(Path::new("a/io_linux.go")));
        assert!(!ctx.good_os_arch_file(Path::new("a/io_windows.go")));
        assert!(ctx.good_os_arch_file(Path::new("a/io_amd64.go")));
        assert!(!ctx.good_os_arch_file(Path::new("a/io_arm64.go")));
        assert!(ctx.good_os_arch_file(Path::new("a/io_linux_amd64.go")));
        assert!(!ctx.good_os_arch_file(Path::new("a/io_linux_arm64.go")));
        assert!(!ctx.good_os_arch_file(Path::new("a/io_darwin_amd64.go")));
        // No prefix segment: unconstrained.
        assert!(ctx.good_os_arch_file(Path::new("a/linux.go")));
    }

    #[test]
    fn short_import_reads_file_header() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("x.go");
        fs::write(&path, "// comment\npackage widget\n").unwrap();

        let ctx = host_context();
        assert_eq!(ctx.short_import(&path), Some("widget".to_string()));
        assert_eq!(ctx.short_import(&tmp.path().join("missing.go")), None);
    }

    #[test]
    fn pkg_target_root_shapes() {
        let mut ctx = host_context();
        ctx.goos = "linux".to_string();
        ctx.goarch = "amd64".to_string();

        assert_eq!(ctx.pkg_target_root().unwrap(), "pkg/linux_amd64");

        ctx.compiler = "gccgo".to_string();
        assert_eq!(ctx.pkg_target_root().unwrap(), "pkg/gccgo_linux_amd64");

        ctx.compiler = "gc".to_string();
        ctx.install_suffix = "race".to_string();
        assert_eq!(ctx.pkg_target_root().unwrap(), "pkg/linux_amd64_race");

        ctx.compiler = "llgo".to_string();
        assert!(matches!(
            ctx.pkg_target_root(),
            Err(Error::UnknownCompiler { .. })
        ));
    }

    #[test]
    fn src_dirs_only_returns_existing() {
        let tmp = TempDir::new().unwrap();
        let gopath = tmp.path().join("go");
        fs::create_dir_all(gopath.join("src")).unwrap();
        let phantom = tmp.path().join("phantom");

        let ctx = BuildContext::with_roots(Some(phantom), vec![gopath.clone()]);
        assert_eq!(ctx.src_dirs(), vec![gopath.join("src")]);
    }
}
