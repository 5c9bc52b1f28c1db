//! `.gitletignore`: paths the working-tree scan never reports.
//!
//! Format, one rule per line:
//! - blank lines and `#` comments are skipped
//! - a plain name (`build`, `dist/`) ignores any directory with that name
//! - a pattern containing `*` or `?` is matched against file names
//!
//! `.gitlet` is always ignored. Without a `.gitletignore` the defaults
//! apply; with one, the file replaces them.

use std::fs;
use std::path::Path;

pub const IGNORE_FILE: &str = ".gitletignore";

const ALWAYS_IGNORED_DIRS: &[&str] = &[".gitlet"];

const DEFAULT_IGNORE_DIRS: &[&str] = &[".git"];

const MAX_RULES: usize = 1000;
const MAX_PATTERN_LEN: usize = 1024;

#[derive(Debug, Clone)]
pub struct IgnoreRules {
    /// Directory names, matched against any path component.
    dir_names: Vec<String>,
    /// File-name globs.
    file_globs: Vec<String>,
}

impl IgnoreRules {
    /// Load `.gitletignore` from the repository root, or fall back to defaults.
    pub fn load(root: &Path) -> Self {
        match fs::read_to_string(root.join(IGNORE_FILE)) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::defaults(),
        }
    }

    pub fn defaults() -> Self {
        let dir_names = ALWAYS_IGNORED_DIRS
            .iter()
            .chain(DEFAULT_IGNORE_DIRS)
            .map(|s| s.to_string())
            .collect();
        IgnoreRules {
            dir_names,
            file_globs: Vec::new(),
        }
    }

    /// Parse ignore-file content. Rules past `MAX_RULES` and patterns
    /// longer than `MAX_PATTERN_LEN` are dropped.
    pub fn parse(content: &str) -> Self {
        let mut dir_names: Vec<String> =
            ALWAYS_IGNORED_DIRS.iter().map(|s| s.to_string()).collect();
        let mut file_globs = Vec::new();

        let rules = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .filter(|l| l.len() <= MAX_PATTERN_LEN)
            .take(MAX_RULES);
        for rule in rules {
            if rule.contains(|c: char| c == '*' || c == '?') {
                file_globs.push(rule.to_string());
            } else {
                dir_names.push(rule.trim_end_matches('/').to_string());
            }
        }

        IgnoreRules {
            dir_names,
            file_globs,
        }
    }

    /// Should the walk skip a directory with this name?
    pub fn is_dir_ignored(&self, name: &str) -> bool {
        self.dir_names.iter().any(|d| d == name)
    }

    /// Should this file be hidden? Checks the file name against the globs.
    pub fn is_file_ignored(&self, rel_path: &str) -> bool {
        let filename = rel_path.rsplit('/').next().unwrap_or(rel_path);
        self.file_globs
            .iter()
            .any(|pattern| glob_match(pattern, filename))
    }
}

/// `*` matches any run of characters, `?` exactly one.
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if let Some((star_p, star_t)) = backtrack {
            pi = star_p + 1;
            ti = star_t + 1;
            backtrack = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|&c| c == '*')
}
