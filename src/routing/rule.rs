//! Path segment rule compilation.
//!
//! # Responsibilities
//! - Parse one registered path segment into a [`Rule`]
//! - Attach built-in patterns to the reserved `id` and `name` keys
//! - Reject malformed segments before any node is created
//!
//! # Syntax
//! ```text
//!  Literal     users
//!  Named       :user          {user}
//!  Pattern     :slug([a-z]+)  {slug:[a-z]+}
//!  Wildcard    :*  :static*   {*}  {static*}
//! ```
//!
//! # Design Decisions
//! - Patterns are anchored on both ends; a segment matches only as a whole
//! - A custom pattern on `id` or `name` replaces the built-in one
//! - Compilation happens once at registration, never on the request path

use regex::Regex;
use thiserror::Error;

/// Built-in pattern for the reserved `id` key.
pub const ID_PATTERN: &str = "^[0-9]+$";

/// Built-in pattern for the reserved `name` key.
pub const NAME_PATTERN: &str = "^[A-Za-z0-9_-]+$";

/// Errors raised while compiling a path segment.
#[derive(Debug, Error)]
pub enum RuleError {
    /// The segment declares a parameter without a key, e.g. `:` or `{}`.
    #[error("empty parameter key in segment `{0}`")]
    EmptyKey(String),

    /// A `{` was opened and never closed, or `(` without `)`.
    #[error("unterminated parameter in segment `{0}`")]
    Unterminated(String),

    /// A pattern delimiter was given with nothing inside, e.g. `{id:}`.
    #[error("empty pattern in segment `{0}`")]
    EmptyPattern(String),

    /// A wildcard was combined with an explicit pattern.
    #[error("wildcard segment `{0}` cannot carry a pattern")]
    PatternOnWildcard(String),

    /// The user-supplied pattern is not a valid regular expression.
    #[error("invalid pattern in segment `{segment}`: {source}")]
    InvalidPattern {
        segment: String,
        #[source]
        source: regex::Error,
    },
}

/// A compiled path segment.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Parameter key, or the literal text for static segments.
    pub key: String,
    /// Anchored validation pattern, if any.
    pub pattern: Option<Regex>,
    /// Whether the segment consumes the rest of the path.
    pub wildcard: bool,
    /// Whether the segment is a plain literal.
    pub literal: bool,
}

impl Rule {
    fn literal(raw: &str) -> Self {
        Self {
            key: raw.to_string(),
            pattern: None,
            wildcard: false,
            literal: true,
        }
    }

    fn wildcard(key: &str) -> Self {
        Self {
            key: key.to_string(),
            pattern: None,
            wildcard: true,
            literal: false,
        }
    }

    /// The literal text a wildcard requires before it starts capturing.
    /// Empty for the bare `*`.
    pub fn wildcard_prefix(&self) -> &str {
        self.key.strip_suffix('*').unwrap_or(&self.key)
    }

    /// Returns true if `segment` satisfies this rule's pattern.
    /// Rules without a pattern accept any non-empty segment.
    pub fn accepts(&self, segment: &str) -> bool {
        match &self.pattern {
            Some(re) => re.is_match(segment),
            None => !segment.is_empty(),
        }
    }
}

/// Compile one raw path segment.
pub fn compile(raw: &str) -> Result<Rule, RuleError> {
    if let Some(rest) = raw.strip_prefix(':') {
        return compile_prefixed(raw, rest);
    }

    if let Some(rest) = raw.strip_prefix('{') {
        let inner = rest
            .strip_suffix('}')
            .ok_or_else(|| RuleError::Unterminated(raw.to_string()))?;
        return compile_braced(raw, inner);
    }

    Ok(Rule::literal(raw))
}

// `:key`, `:key(regex)`, `:*`, `:prefix*`
fn compile_prefixed(raw: &str, rest: &str) -> Result<Rule, RuleError> {
    match rest.find('(') {
        Some(open) => {
            let body = rest[open + 1..]
                .strip_suffix(')')
                .ok_or_else(|| RuleError::Unterminated(raw.to_string()))?;
            named(raw, &rest[..open], Some(body))
        }
        None => named(raw, rest, None),
    }
}

// `{key}`, `{key:regex}`, `{*}`, `{prefix*}`
fn compile_braced(raw: &str, inner: &str) -> Result<Rule, RuleError> {
    match inner.split_once(':') {
        Some((key, body)) => named(raw, key, Some(body)),
        None => named(raw, inner, None),
    }
}

fn named(raw: &str, key: &str, pattern: Option<&str>) -> Result<Rule, RuleError> {
    if key.is_empty() {
        return Err(RuleError::EmptyKey(raw.to_string()));
    }

    if key.ends_with('*') {
        if pattern.is_some() {
            return Err(RuleError::PatternOnWildcard(raw.to_string()));
        }
        return Ok(Rule::wildcard(key));
    }

    let source = match (pattern, key) {
        (Some(body), _) if !body.is_empty() => Some(format!("^(?:{})$", body)),
        (Some(_), _) => return Err(RuleError::EmptyPattern(raw.to_string())),
        (None, "id") => Some(ID_PATTERN.to_string()),
        (None, "name") => Some(NAME_PATTERN.to_string()),
        (None, _) => None,
    };

    let pattern = source
        .map(|s| Regex::new(&s))
        .transpose()
        .map_err(|source| RuleError::InvalidPattern {
            segment: raw.to_string(),
            source,
        })?;

    Ok(Rule {
        key: key.to_string(),
        pattern,
        wildcard: false,
        literal: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal() {
        let rule = compile("users").unwrap();
        assert!(rule.literal);
        assert_eq!(rule.key, "users");
        assert!(rule.pattern.is_none());
    }

    #[test]
    fn test_reserved_keys_get_default_patterns() {
        for raw in [":id", "{id}"] {
            let rule = compile(raw).unwrap();
            assert_eq!(rule.key, "id");
            assert!(rule.accepts("42"));
            assert!(!rule.accepts("4a"));
        }

        let rule = compile(":name").unwrap();
        assert!(rule.accepts("hello_world-2"));
        assert!(!rule.accepts("hello world"));
    }

    #[test]
    fn test_plain_named_accepts_anything() {
        let rule = compile("{user}").unwrap();
        assert!(!rule.literal);
        assert!(rule.pattern.is_none());
        assert!(rule.accepts("anything.at-all"));
    }

    #[test]
    fn test_explicit_pattern_both_forms() {
        for raw in [":slug([a-z]+)", "{slug:[a-z]+}"] {
            let rule = compile(raw).unwrap();
            assert_eq!(rule.key, "slug");
            assert!(rule.accepts("abc"));
            // anchored: partial matches are rejected
            assert!(!rule.accepts("abc1"));
        }
    }

    #[test]
    fn test_custom_pattern_overrides_reserved() {
        let rule = compile("{id:[a-f0-9]{4}}").unwrap();
        assert!(rule.accepts("beef"));
        assert!(!rule.accepts("1234567"));
    }

    #[test]
    fn test_wildcards() {
        for raw in [":*", "{*}"] {
            let rule = compile(raw).unwrap();
            assert!(rule.wildcard);
            assert_eq!(rule.key, "*");
            assert_eq!(rule.wildcard_prefix(), "");
        }

        let rule = compile("{static*}").unwrap();
        assert!(rule.wildcard);
        assert_eq!(rule.key, "static*");
        assert_eq!(rule.wildcard_prefix(), "static");
    }

    #[test]
    fn test_malformed_segments() {
        assert!(matches!(compile(":"), Err(RuleError::EmptyKey(_))));
        assert!(matches!(compile("{}"), Err(RuleError::EmptyKey(_))));
        assert!(matches!(compile("{id"), Err(RuleError::Unterminated(_))));
        assert!(matches!(compile(":id([0-9]+"), Err(RuleError::Unterminated(_))));
        assert!(matches!(compile("{id:}"), Err(RuleError::EmptyPattern(_))));
        assert!(matches!(compile("{*:x}"), Err(RuleError::PatternOnWildcard(_))));
        assert!(matches!(
            compile("{n:[0-9}"),
            Err(RuleError::InvalidPattern { .. })
        ));
    }
}
