//! Threat signature catalog.
//!
//! Signatures are data. The catalog is loaded once at process start, from
//! the built-in set plus an optional TOML file, and is immutable
//! afterwards; adding a signature never touches scoring logic.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Severity;

/// Attack technique classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThreatCategory {
    SqlInjection,
    Xss,
    Rce,
    Lfi,
    Xxe,
    Csrf,
}

impl ThreatCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ThreatCategory::SqlInjection => "sql-injection",
            ThreatCategory::Xss => "xss",
            ThreatCategory::Rce => "rce",
            ThreatCategory::Lfi => "lfi",
            ThreatCategory::Xxe => "xxe",
            ThreatCategory::Csrf => "csrf",
        }
    }
}

/// A single catalog signature.
#[derive(Debug, Clone)]
pub struct ThreatPattern {
    pub id: String,
    pub name: String,
    pub matcher: Regex,
    pub severity: Severity,
    pub category: ThreatCategory,
    pub description: String,
    pub mitigation: String,
}

/// Errors while assembling the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("signature {id}: invalid pattern: {source}")]
    InvalidPattern {
        id: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid catalog document: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to read catalog file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Serialized form of a signature in a catalog file.
#[derive(Debug, Deserialize)]
struct PatternEntry {
    id: String,
    name: String,
    pattern: String,
    severity: Severity,
    category: ThreatCategory,
    #[serde(default)]
    description: String,
    #[serde(default)]
    mitigation: String,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    patterns: Vec<PatternEntry>,
}

/// Immutable signature catalog.
#[derive(Debug)]
pub struct PatternCatalog {
    patterns: Vec<ThreatPattern>,
}

impl PatternCatalog {
    /// The built-in signature set covering all supported categories.
    pub fn builtin() -> Self {
        let patterns = BUILTIN
            .iter()
            .map(|(id, name, pattern, severity, category, description, mitigation)| {
                ThreatPattern {
                    id: (*id).to_string(),
                    name: (*name).to_string(),
                    matcher: compile(pattern)
                        .expect("built-in signature pattern must compile"),
                    severity: *severity,
                    category: *category,
                    description: (*description).to_string(),
                    mitigation: (*mitigation).to_string(),
                }
            })
            .collect();
        Self { patterns }
    }

    /// Built-in signatures plus the ones from a TOML catalog document.
    pub fn builtin_with_extra(doc: &str) -> Result<Self, CatalogError> {
        let mut catalog = Self::builtin();
        let file: CatalogFile = toml::from_str(doc)?;
        for entry in file.patterns {
            let matcher = compile(&entry.pattern).map_err(|source| {
                CatalogError::InvalidPattern {
                    id: entry.id.clone(),
                    source,
                }
            })?;
            catalog.patterns.push(ThreatPattern {
                id: entry.id,
                name: entry.name,
                matcher,
                severity: entry.severity,
                category: entry.category,
                description: entry.description,
                mitigation: entry.mitigation,
            });
        }
        Ok(catalog)
    }

    /// Built-in signatures, plus the catalog file when a path is given.
    pub fn load(path: Option<&str>) -> Result<Self, CatalogError> {
        match path {
            Some(path) => {
                let doc = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
                    path: path.to_string(),
                    source,
                })?;
                let catalog = Self::builtin_with_extra(&doc)?;
                tracing::info!(path, signatures = catalog.len(), "Threat catalog loaded");
                Ok(catalog)
            }
            None => Ok(Self::builtin()),
        }
    }

    pub fn patterns(&self) -> &[ThreatPattern] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

type BuiltinEntry = (
    &'static str,
    &'static str,
    &'static str,
    Severity,
    ThreatCategory,
    &'static str,
    &'static str,
);

const BUILTIN: &[BuiltinEntry] = &[
    (
        "sqli-union",
        "SQL UNION injection",
        r"union\s+(all\s+)?select",
        Severity::Critical,
        ThreatCategory::SqlInjection,
        "UNION SELECT used to splice attacker-controlled result sets",
        "Use parameterized queries; never interpolate user input into SQL",
    ),
    (
        "sqli-tautology",
        "SQL tautology",
        r"\b(or|and)\s+\d+\s*=\s*\d+",
        Severity::Critical,
        ThreatCategory::SqlInjection,
        "Always-true predicate appended to bypass WHERE clauses",
        "Use parameterized queries; validate numeric inputs",
    ),
    (
        "sqli-statement",
        "Inline SQL statement",
        r"select\s+[^;]{0,200}\s+from\s+\w+",
        Severity::High,
        ThreatCategory::SqlInjection,
        "Complete SELECT statement embedded in a request field",
        "Use parameterized queries; reject raw SQL in inputs",
    ),
    (
        "sqli-ddl",
        "Destructive SQL statement",
        r"\b(drop|truncate)\s+table\b|\bdelete\s+from\b",
        Severity::Critical,
        ThreatCategory::SqlInjection,
        "Schema-destroying statement embedded in a request field",
        "Use parameterized queries; restrict database account privileges",
    ),
    (
        "sqli-comment",
        "SQL comment terminator",
        r"('|\d)\s*(--|#)\s",
        Severity::Medium,
        ThreatCategory::SqlInjection,
        "Comment sequence used to cut off the rest of a query",
        "Use parameterized queries",
    ),
    (
        "xss-script-tag",
        "Script tag injection",
        r"<\s*script\b",
        Severity::High,
        ThreatCategory::Xss,
        "Literal script element in request content",
        "Encode output; set a restrictive Content-Security-Policy",
    ),
    (
        "xss-event-handler",
        "Inline event handler",
        r"\bon(error|load|click|mouseover|focus)\s*=",
        Severity::Medium,
        ThreatCategory::Xss,
        "HTML event handler attribute smuggled into content",
        "Sanitize HTML attributes; encode output",
    ),
    (
        "xss-js-uri",
        "javascript: URI",
        r"javascript\s*:",
        Severity::Medium,
        ThreatCategory::Xss,
        "Script execution via a javascript: scheme URI",
        "Allow-list URI schemes on any user-supplied link",
    ),
    (
        "xss-dom-sink",
        "DOM sink access",
        r"document\s*\.\s*(cookie|write)|\beval\s*\(",
        Severity::High,
        ThreatCategory::Xss,
        "Direct access to script-injection sinks",
        "Encode output; avoid reflecting request content into markup",
    ),
    (
        "rce-shell-chain",
        "Shell command chaining",
        r"[;&|]\s*(cat|ls|rm|wget|curl|nc|bash|sh|ping)\b",
        Severity::Critical,
        ThreatCategory::Rce,
        "Command separator followed by a shell utility",
        "Never pass request content to a shell; use exec-style APIs",
    ),
    (
        "rce-subshell",
        "Command substitution",
        r"\$\(\s*\w+|`\s*\w+[^`]*`",
        Severity::High,
        ThreatCategory::Rce,
        "Subshell syntax evaluated by command interpreters",
        "Never pass request content to a shell",
    ),
    (
        "rce-exec-call",
        "Code execution call",
        r"\b(exec|system|passthru|popen|proc_open)\s*\(",
        Severity::Critical,
        ThreatCategory::Rce,
        "Server-side execution primitive named in request content",
        "Disable dynamic execution primitives; validate inputs",
    ),
    (
        "rce-windows-shell",
        "Windows shell invocation",
        r"\b(cmd\.exe|powershell)\b",
        Severity::High,
        ThreatCategory::Rce,
        "Windows command interpreter named in request content",
        "Never pass request content to a shell",
    ),
    (
        "lfi-traversal",
        "Path traversal",
        r"\.\./\.\./|\.\.\\\.\.\\",
        Severity::High,
        ThreatCategory::Lfi,
        "Repeated parent-directory segments walking out of the web root",
        "Canonicalize paths and reject any that escape the content root",
    ),
    (
        "lfi-sensitive-file",
        "Sensitive file probe",
        r"/etc/(passwd|shadow)|boot\.ini|win\.ini",
        Severity::Critical,
        ThreatCategory::Lfi,
        "Well-known system file referenced in request content",
        "Canonicalize paths; serve files only from an allow-listed root",
    ),
    (
        "lfi-wrapper",
        "Stream wrapper scheme",
        r"\b(php|data|expect|zip)://",
        Severity::High,
        ThreatCategory::Lfi,
        "Language stream wrapper used to smuggle file access",
        "Allow-list URI schemes server-side",
    ),
    (
        "xxe-doctype-entity",
        "External entity declaration",
        r"<!doctype[^>]{0,100}\[|<!entity",
        Severity::High,
        ThreatCategory::Xxe,
        "Inline DTD or entity declaration in an XML payload",
        "Disable DTD processing in the XML parser",
    ),
    (
        "xxe-system-file",
        "SYSTEM entity file read",
        r#"system\s+["']file:"#,
        Severity::Critical,
        ThreatCategory::Xxe,
        "SYSTEM entity resolving to a local file",
        "Disable external entity resolution",
    ),
    (
        "csrf-foreign-form",
        "Cross-origin form post",
        r#"<\s*form[^>]{0,200}action\s*=\s*["']https?://"#,
        Severity::Low,
        ThreatCategory::Csrf,
        "Form element posting to an absolute foreign origin",
        "Require per-session CSRF tokens on state-changing routes",
    ),
];
