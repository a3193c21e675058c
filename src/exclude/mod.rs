//! Filename exclusion rules applied while mirroring local directories.
//!
//! A rule is either a literal entry name (`node_modules`) or a suffix
//! wildcard (`*.log`). Rules only ever look at a single path component,
//! so `tests` skips an entry named `tests` but not `src/tests.php`.

use once_cell::sync::Lazy;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ExcludeError {
    #[error("Exclusion pattern must not be empty")]
    EmptyPattern,

    #[error("Exclusion pattern '{0}' must not contain a path separator")]
    PathSeparator(String),
}

/// Patterns skipped by default when uploading the application
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    ".git",
    ".gitignore",
    ".github",
    ".DS_Store",
    "node_modules",
    "tests",
    "docs",
    "*.log",
    "*.md",
    "deploy_to_allinkl.py",
    "deploy-to-allinkl.php",
    "tsconfig.json",
    "package.json",
    "package-lock.json",
    "composer.lock",
    "phpunit.xml",
    "phpcs.xml",
    "phpstan.neon",
    "__pycache__",
    "*.pyc",
];

static DEFAULT_RULES: Lazy<ExclusionRules> = Lazy::new(|| {
    ExclusionRules::from_patterns(DEFAULT_EXCLUDE_PATTERNS.iter().copied())
        .unwrap_or_else(|_| ExclusionRules::new(Vec::new()))
});

/// A single exclusion rule
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExclusionRule {
    /// Matches an entry whose name equals the string
    Exact(String),
    /// Matches an entry whose name ends with the string (e.g. ".log")
    Suffix(String),
}

impl ExclusionRule {
    /// Parse a pattern. Only `*.ext` becomes a suffix rule; everything else
    /// is taken literally.
    pub fn parse(pattern: &str) -> Result<Self, ExcludeError> {
        if pattern.is_empty() {
            return Err(ExcludeError::EmptyPattern);
        }
        if pattern.contains('/') || pattern.contains('\\') {
            return Err(ExcludeError::PathSeparator(pattern.to_string()));
        }

        if pattern.starts_with("*.") {
            Ok(ExclusionRule::Suffix(pattern[1..].to_string()))
        } else {
            Ok(ExclusionRule::Exact(pattern.to_string()))
        }
    }

    pub fn matches(&self, filename: &str) -> bool {
        match self {
            ExclusionRule::Exact(name) => filename == name,
            ExclusionRule::Suffix(ext) => filename.ends_with(ext.as_str()),
        }
    }
}

impl fmt::Display for ExclusionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionRule::Exact(name) => write!(f, "{}", name),
            ExclusionRule::Suffix(ext) => write!(f, "*{}", ext),
        }
    }
}

/// The set of rules consulted for every directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionRules {
    rules: Vec<ExclusionRule>,
}

impl ExclusionRules {
    pub fn new(rules: Vec<ExclusionRule>) -> Self {
        let mut deduped: Vec<ExclusionRule> = Vec::with_capacity(rules.len());
        for rule in rules {
            if !deduped.contains(&rule) {
                deduped.push(rule);
            }
        }
        Self { rules: deduped }
    }

    pub fn from_patterns<I, S>(patterns: I) -> Result<Self, ExcludeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = patterns
            .into_iter()
            .map(|p| ExclusionRule::parse(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rules))
    }

    /// Whether an entry with this name must be skipped
    pub fn is_excluded(&self, filename: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(filename))
    }

    /// The rules rendered back to their pattern form
    pub fn patterns(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for ExclusionRules {
    fn default() -> Self {
        DEFAULT_RULES.clone()
    }
}
