//! Field patterns: paths that may use `[]` to mean "every element".

use std::fmt;

use serde_json::Value;

use crate::error::FormResult;
use crate::path::{Path, Seg};

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternSeg {
    Exact(Seg),
    AnyIndex,
}

/// A path pattern such as `colors[].name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPattern {
    segments: Vec<PatternSeg>,
}

impl FieldPattern {
    pub fn parse(input: &str) -> FormResult<Self> {
        let mut segments = Vec::new();
        for (i, part) in input.split("[]").enumerate() {
            if i > 0 {
                segments.push(PatternSeg::AnyIndex);
            }
            let part = if i > 0 { part.strip_prefix('.').unwrap_or(part) } else { part };
            let path = Path::parse(part)?;
            segments.extend(path.segments().iter().cloned().map(PatternSeg::Exact));
        }
        Ok(Self { segments })
    }

    /// Returns `true` if the pattern has no wildcard.
    pub fn is_exact(&self) -> bool {
        self.segments.iter().all(|s| matches!(s, PatternSeg::Exact(_)))
    }

    /// Concrete paths this pattern addresses in `root`, with the value found
    /// at each (`None` when absent).
    ///
    /// Exact segments always produce a path, present or not; `[]` produces
    /// one path per element of an existing array and nothing otherwise.
    pub fn expand<'v>(&self, root: &'v Value) -> Vec<(Path, Option<&'v Value>)> {
        let mut frontier = vec![(Path::root(), Some(root))];
        for seg in &self.segments {
            let mut next = Vec::with_capacity(frontier.len());
            for (path, node) in frontier {
                match seg {
                    PatternSeg::AnyIndex => {
                        if let Some(Value::Array(items)) = node {
                            for (i, item) in items.iter().enumerate() {
                                next.push((path.child(i), Some(item)));
                            }
                        }
                    }
                    PatternSeg::Exact(seg) => {
                        let child = node.and_then(|n| match (seg, n) {
                            (Seg::Key(k), Value::Object(obj)) => obj.get(k),
                            (Seg::Index(i), Value::Array(items)) => items.get(*i),
                            _ => None,
                        });
                        next.push((path.child(seg.clone()), child));
                    }
                }
            }
            frontier = next;
        }
        frontier
    }
}

impl fmt::Display for FieldPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut exact = Vec::new();
        let mut out = String::new();
        let flush = |exact: &mut Vec<Seg>, out: &mut String| {
            if !exact.is_empty() {
                let rendered = Path::from_segments(std::mem::take(exact)).to_string();
                if !out.is_empty() && !rendered.starts_with('[') {
                    out.push('.');
                }
                out.push_str(&rendered);
            }
        };
        for seg in &self.segments {
            match seg {
                PatternSeg::Exact(s) => exact.push(s.clone()),
                PatternSeg::AnyIndex => {
                    flush(&mut exact, &mut out);
                    out.push_str("[]");
                }
            }
        }
        flush(&mut exact, &mut out);
        write!(f, "{}", out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use serde_json::json;

    #[test]
    fn test_parse_and_display() {
        for input in ["name.first", "colors[].name", "matrix[][]", "a[0].b"] {
            assert_eq!(FieldPattern::parse(input).unwrap().to_string(), input);
        }
        assert!(FieldPattern::parse("a[x]").is_err());
        assert!(!FieldPattern::parse("tags[]").unwrap().is_exact());
    }

    #[test]
    fn test_expand_wildcard() {
        let value = json!({"colors": [{"name": "red"}, {}]});
        let found = FieldPattern::parse("colors[].name").unwrap().expand(&value);
        assert_eq!(
            found,
            vec![
                (path!("colors", 0usize, "name"), Some(&json!("red"))),
                (path!("colors", 1usize, "name"), None),
            ]
        );
    }

    #[test]
    fn test_expand_missing_array() {
        let value = json!({});
        assert!(FieldPattern::parse("colors[].name").unwrap().expand(&value).is_empty());
        assert_eq!(
            FieldPattern::parse("name.first").unwrap().expand(&value),
            vec![(path!("name", "first"), None)]
        );
    }
}
