//! Route pattern compilation.
//!
//! A pattern is a URL path with `{name}` placeholders, e.g. `/user/{id}/edit`.
//! Compiling it yields a case-insensitive regular expression of the form
//!
//! ```text
//! ^<literal-escaped pattern, placeholders as ([^/]+)>(/.*)?$
//! ```
//!
//! together with the placeholder names in declaration order. Capture group *i*
//! (1-based) holds the value of the *i*-th name; the group after the last name holds
//! the trailing optional-parameter suffix, if any. A route without a pattern
//! compiles to a match-anything expression with no names.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::error::RouterError;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap_or_else(|e| {
        tracing::error!("Failed to compile placeholder regex: {}", e);
        Regex::new(r"[^\s\S]").unwrap()
    })
});

/// A compiled route pattern.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: Option<String>,
    regex: Regex,
    required: Vec<String>,
}

impl CompiledPattern {
    /// Compile `pattern`, or a catch-all when `pattern` is `None`.
    ///
    /// # Errors
    ///
    /// - [`RouterError::DuplicateParameter`] if a placeholder name appears twice.
    /// - [`RouterError::InvalidPattern`] if the resulting expression is rejected by
    ///   the regex engine (e.g. it exceeds the size limit).
    ///
    /// # Examples
    ///
    /// ```
    /// use watamelo::router::CompiledPattern;
    ///
    /// let p = CompiledPattern::compile(Some("/p/{id}/{slug}")).unwrap();
    /// assert_eq!(p.required(), ["id", "slug"]);
    /// ```
    pub fn compile(pattern: Option<&str>) -> Result<Self, RouterError> {
        let Some(pattern) = pattern else {
            return Ok(Self {
                source: None,
                regex: build(".*", "*")?,
                required: Vec::new(),
            });
        };

        let mut body = String::with_capacity(pattern.len() + 16);
        let mut required: Vec<String> = Vec::new();
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(pattern) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if required.iter().any(|n| n == name.as_str()) {
                return Err(RouterError::DuplicateParameter {
                    name: name.as_str().to_owned(),
                    route: pattern.to_owned(),
                });
            }
            body.push_str(&regex::escape(&pattern[last..whole.start()]));
            body.push_str("([^/]+)");
            required.push(name.as_str().to_owned());
            last = whole.end();
        }
        body.push_str(&regex::escape(&pattern[last..]));

        Ok(Self {
            source: Some(pattern.to_owned()),
            regex: build(&body, pattern)?,
            required,
        })
    }

    /// The pattern text this was compiled from; `None` for a catch-all.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Required parameter names, in capture-group order.
    pub fn required(&self) -> &[String] {
        &self.required
    }

    pub fn is_catch_all(&self) -> bool {
        self.source.is_none()
    }

    /// Match `path`, returning the required values and the optional suffix.
    pub(crate) fn captures<'p>(&self, path: &'p str) -> Option<PatternMatch<'p>> {
        self.regex.captures(path).map(|caps| PatternMatch {
            caps,
            required: self.required.len(),
        })
    }
}

fn build(body: &str, pattern: &str) -> Result<Regex, RouterError> {
    Regex::new(&format!("(?i)^{body}(/.*)?$")).map_err(|source| RouterError::InvalidPattern {
        pattern: pattern.to_owned(),
        source,
    })
}

/// Raw captures of one successful pattern match.
pub(crate) struct PatternMatch<'p> {
    caps: Captures<'p>,
    required: usize,
}

impl<'p> PatternMatch<'p> {
    /// Raw value of the `index`-th required parameter.
    pub(crate) fn required(&self, index: usize) -> &'p str {
        self.caps.get(index + 1).map_or("", |m| m.as_str())
    }

    /// Path text after the required portion, e.g. `/1|2` (empty when absent).
    pub(crate) fn suffix(&self) -> &'p str {
        self.caps.get(self.required + 1).map_or("", |m| m.as_str())
    }
}
