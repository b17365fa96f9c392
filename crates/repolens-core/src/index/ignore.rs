//! Ignore rules for tree traversal
//!
//! Rules are shell globs evaluated case-sensitively against both the path
//! relative to the directory that declared them and the final path segment.
//! A rule declared in `a/b/.gitignore` only sees paths under `a/b/`.

use glob::{MatchOptions, Pattern};
use std::path::Path;

/// Name of the per-directory ignore file
pub const IGNORE_FILE_NAME: &str = ".gitignore";

/// Dependency lock files, always ignored
pub const LOCK_FILES: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "Gemfile.lock",
    "Cargo.lock",
    "composer.lock",
    "poetry.lock",
    "Pipfile.lock",
    "pnpm-lock.yaml",
];

/// Patterns applied at the root of every traversal
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    ".git",
    "__pycache__",
    ".next",
    "pnpm-workspace.yaml",
    "*.pyc",
    "*.pyo",
    ".venv",
    "*.swp",
    "*.swo",
    "dist",
    "LICENSE",
    "*.DS_Store",
    "*.lock",
    "*.log",
    "*.tsbuildinfo",
    "yarn-error.log",
    ".turbo",
    "**/dist/**/*",
    "node_modules",
    "node_modules/**",
];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone)]
struct IgnoreRule {
    /// Directory the rule was declared in, relative to the root ("" for root)
    scope: String,
    pattern: Pattern,
    /// Leading `/` in the ignore file: match the scoped path only
    anchored: bool,
}

impl IgnoreRule {
    fn matches(&self, path: &str) -> bool {
        let relative = if self.scope.is_empty() {
            path
        } else {
            match path
                .strip_prefix(self.scope.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
            {
                Some(rest) => rest,
                None => return false,
            }
        };

        if self.pattern.matches_with(relative, MATCH_OPTIONS) {
            return true;
        }
        !self.anchored && self.pattern.matches_with(basename(relative), MATCH_OPTIONS)
    }
}

/// Ordered, scoped collection of ignore rules
#[derive(Debug, Clone, Default)]
pub struct IgnoreRuleSet {
    rules: Vec<IgnoreRule>,
}

impl IgnoreRuleSet {
    /// Empty rule set (lock files are still ignored)
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in defaults scoped to the root
    pub fn with_defaults() -> Self {
        let defaults: Vec<String> = DEFAULT_IGNORE_PATTERNS.iter().map(|p| p.to_string()).collect();
        Self::new().extended("", &defaults)
    }

    /// New rule set with `patterns` added, scoped to the subtree at `scope`.
    ///
    /// Patterns that do not compile are skipped.
    pub fn extended(&self, scope: &str, patterns: &[String]) -> Self {
        let scope = scope.trim_matches('/').to_string();
        let mut rules = self.rules.clone();

        for raw in patterns {
            let anchored = raw.starts_with('/');
            let cleaned = raw.trim_start_matches('/').trim_end_matches('/');
            if cleaned.is_empty() {
                continue;
            }
            match Pattern::new(cleaned) {
                Ok(pattern) => rules.push(IgnoreRule {
                    scope: scope.clone(),
                    pattern,
                    anchored,
                }),
                Err(e) => {
                    tracing::debug!("Skipping invalid ignore pattern '{}': {}", raw, e);
                }
            }
        }

        Self { rules }
    }

    /// Whether `path` (relative to the traversal root, `/`-separated) is excluded
    pub fn is_ignored(&self, path: &str) -> bool {
        let path = path.trim_start_matches("./").trim_matches('/');
        if LOCK_FILES.contains(&basename(path)) {
            return true;
        }
        self.rules.iter().any(|rule| rule.matches(path))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Predicate form of [`IgnoreRuleSet::is_ignored`]
pub fn is_ignored(path: &str, rules: &IgnoreRuleSet) -> bool {
    rules.is_ignored(path)
}

/// Parse ignore-file content into patterns, dropping blanks and comments.
///
/// Negated patterns (`!pattern`) are not supported and are dropped.
pub fn parse_ignore_file(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| {
            if line.starts_with('!') {
                tracing::debug!("Ignoring unsupported negated pattern '{}'", line);
                return false;
            }
            true
        })
        .map(str::to_string)
        .collect()
}

/// Convert a filesystem path into the `/`-separated form used by the matcher
pub fn to_rule_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(patterns: &[&str]) -> IgnoreRuleSet {
        let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        IgnoreRuleSet::new().extended("", &patterns)
    }

    #[test]
    fn test_lock_files_always_ignored() {
        let empty = IgnoreRuleSet::new();
        assert!(empty.is_ignored("Cargo.lock"));
        assert!(empty.is_ignored("web/package-lock.json"));
        assert!(empty.is_ignored("deep/nested/pnpm-lock.yaml"));
        assert!(!empty.is_ignored("src/lib.rs"));
    }

    #[test]
    fn test_matches_full_path_or_basename() {
        let set = rules(&["*.pyc", "build/*.o"]);
        assert!(set.is_ignored("pkg/module.pyc"));
        assert!(set.is_ignored("build/main.o"));
        assert!(!set.is_ignored("src/build/main.o"));
        assert!(!set.is_ignored("pkg/module.py"));
    }

    #[test]
    fn test_case_sensitive() {
        let set = rules(&["*.LOG"]);
        assert!(set.is_ignored("server.LOG"));
        assert!(!set.is_ignored("server.log"));
    }

    #[test]
    fn test_glob_features() {
        let set = rules(&["temp?.txt", "[ab]*.rs", "node_modules/**"]);
        assert!(set.is_ignored("temp1.txt"));
        assert!(!set.is_ignored("temp10.txt"));
        assert!(set.is_ignored("src/alpha.rs"));
        assert!(!set.is_ignored("src/gamma.rs"));
        assert!(set.is_ignored("node_modules/left-pad/index.js"));
    }

    #[test]
    fn test_defaults() {
        let set = IgnoreRuleSet::with_defaults();
        assert!(set.is_ignored(".git"));
        assert!(set.is_ignored("node_modules"));
        assert!(set.is_ignored("app/dist"));
        assert!(set.is_ignored("LICENSE"));
        assert!(set.is_ignored("server.log"));
        assert!(!set.is_ignored("src/main.rs"));
        assert!(!set.is_ignored("README.md"));
    }

    #[test]
    fn test_scoped_rules_do_not_leak_to_siblings() {
        let set = IgnoreRuleSet::new().extended("frontend", &["*.generated.ts".to_string()]);
        assert!(set.is_ignored("frontend/api.generated.ts"));
        assert!(set.is_ignored("frontend/deep/types.generated.ts"));
        assert!(!set.is_ignored("backend/api.generated.ts"));
        assert!(!set.is_ignored("api.generated.ts"));
        assert!(!set.is_ignored("frontend-extra/api.generated.ts"));
    }

    #[test]
    fn test_anchored_pattern() {
        let set = IgnoreRuleSet::new().extended("", &["/build".to_string()]);
        assert!(set.is_ignored("build"));
        assert!(!set.is_ignored("src/build"));
    }

    #[test]
    fn test_directory_pattern_trailing_slash() {
        let set = rules(&["target/"]);
        assert!(set.is_ignored("target"));
        assert!(set.is_ignored("crates/core/target"));
    }

    #[test]
    fn test_parse_ignore_file() {
        let content = "# build output\n\n  target/  \n*.tmp\n!keep.tmp\n";
        assert_eq!(parse_ignore_file(content), vec!["target/", "*.tmp"]);
    }

    #[test]
    fn test_invalid_pattern_skipped() {
        let set = rules(&["a**b", "*.bak"]);
        assert_eq!(set.len(), 1);
        assert!(set.is_ignored("notes.bak"));
    }

    #[test]
    fn test_to_rule_path() {
        let path = Path::new("src").join("index").join("mod.rs");
        assert_eq!(to_rule_path(&path), "src/index/mod.rs");
    }
}
