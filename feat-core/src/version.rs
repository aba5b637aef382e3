//! Version ordering and relationship version constraints

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::error::{GraphError, GraphResult};

/// Comparison operator of a version constraint
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConstraintOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    /// Same major version, and at least the given version
    #[serde(rename = "^")]
    Caret,
    /// Same major.minor version, and at least the given version
    #[serde(rename = "~")]
    Tilde,
}

impl ConstraintOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ConstraintOp::Eq => "=",
            ConstraintOp::Ne => "!=",
            ConstraintOp::Gt => ">",
            ConstraintOp::Ge => ">=",
            ConstraintOp::Lt => "<",
            ConstraintOp::Le => "<=",
            ConstraintOp::Caret => "^",
            ConstraintOp::Tilde => "~",
        }
    }
}

impl fmt::Display for ConstraintOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A version requirement a relationship places on its target
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionConstraint {
    pub operator: ConstraintOp,
    pub version: String,
}

impl VersionConstraint {
    pub fn new(operator: ConstraintOp, version: impl Into<String>) -> Self {
        Self {
            operator,
            version: version.into(),
        }
    }

    /// Parses constraints such as `>= 1.2`, `^2.0` or a bare `1.4` (equality)
    pub fn parse(s: &str) -> GraphResult<Self> {
        let trimmed = s.trim();
        // Two-character operators must be tried before their prefixes
        const OPS: [(&str, ConstraintOp); 8] = [
            (">=", ConstraintOp::Ge),
            ("<=", ConstraintOp::Le),
            ("!=", ConstraintOp::Ne),
            (">", ConstraintOp::Gt),
            ("<", ConstraintOp::Lt),
            ("=", ConstraintOp::Eq),
            ("^", ConstraintOp::Caret),
            ("~", ConstraintOp::Tilde),
        ];

        let (operator, rest) = OPS
            .iter()
            .find_map(|(sym, op)| trimmed.strip_prefix(sym).map(|rest| (*op, rest)))
            .unwrap_or((ConstraintOp::Eq, trimmed));

        let version = rest.trim();
        if version.is_empty() || version.contains(char::is_whitespace) {
            return Err(GraphError::InvalidConstraint(s.to_string()));
        }

        Ok(Self::new(operator, version))
    }

    /// Checks whether `version` satisfies this constraint
    pub fn is_satisfied_by(&self, version: &str) -> bool {
        let ord = compare_versions(version, &self.version);
        match self.operator {
            ConstraintOp::Eq => ord == Ordering::Equal,
            ConstraintOp::Ne => ord != Ordering::Equal,
            ConstraintOp::Gt => ord == Ordering::Greater,
            ConstraintOp::Ge => ord != Ordering::Less,
            ConstraintOp::Lt => ord == Ordering::Less,
            ConstraintOp::Le => ord != Ordering::Greater,
            ConstraintOp::Caret => ord != Ordering::Less && same_prefix(version, &self.version, 1),
            ConstraintOp::Tilde => ord != Ordering::Less && same_prefix(version, &self.version, 2),
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operator, self.version)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Component<'a> {
    Number(u64),
    Text(&'a str),
}

fn components(version: &str) -> Vec<Component<'_>> {
    let v = version.trim();
    let v = v.strip_prefix('v').or_else(|| v.strip_prefix('V')).unwrap_or(v);
    v.split('.')
        .map(|part| match part.parse::<u64>() {
            Ok(n) => Component::Number(n),
            Err(_) => Component::Text(part),
        })
        .collect()
}

/// Orders two version strings by their dot-separated components.
/// Missing components count as zero; numbers sort before text.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (ca, cb) = (components(a), components(b));
    let len = ca.len().max(cb.len());

    for i in 0..len {
        let left = ca.get(i).unwrap_or(&Component::Number(0));
        let right = cb.get(i).unwrap_or(&Component::Number(0));
        let ord = match (left, right) {
            (Component::Number(x), Component::Number(y)) => x.cmp(y),
            (Component::Number(_), Component::Text(_)) => Ordering::Less,
            (Component::Text(_), Component::Number(_)) => Ordering::Greater,
            (Component::Text(x), Component::Text(y)) => x.cmp(y),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    Ordering::Equal
}

fn same_prefix(a: &str, b: &str, n: usize) -> bool {
    let (ca, cb) = (components(a), components(b));
    (0..n).all(|i| {
        ca.get(i).unwrap_or(&Component::Number(0)) == cb.get(i).unwrap_or(&Component::Number(0))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("1.2", "1.2.0"), Ordering::Equal);
        assert_eq!(compare_versions("v1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare_versions("2.0", "10.0"), Ordering::Less);
        assert_eq!(compare_versions("1.0.rc1", "1.0.1"), Ordering::Greater);
    }

    #[test]
    fn test_parse_constraint() {
        let c = VersionConstraint::parse(">= 1.2").unwrap();
        assert_eq!(c.operator, ConstraintOp::Ge);
        assert_eq!(c.version, "1.2");

        let c = VersionConstraint::parse("2.0").unwrap();
        assert_eq!(c.operator, ConstraintOp::Eq);

        let c = VersionConstraint::parse("!=3").unwrap();
        assert_eq!(c.operator, ConstraintOp::Ne);

        assert!(VersionConstraint::parse(">=").is_err());
        assert!(VersionConstraint::parse("> 1 2").is_err());
    }

    #[test]
    fn test_constraint_satisfaction() {
        let ge = VersionConstraint::new(ConstraintOp::Ge, "1.2");
        assert!(ge.is_satisfied_by("1.2.0"));
        assert!(ge.is_satisfied_by("1.3"));
        assert!(!ge.is_satisfied_by("1.1.9"));

        let lt = VersionConstraint::new(ConstraintOp::Lt, "2.0");
        assert!(lt.is_satisfied_by("1.9"));
        assert!(!lt.is_satisfied_by("2.0"));

        let caret = VersionConstraint::new(ConstraintOp::Caret, "1.2");
        assert!(caret.is_satisfied_by("1.9"));
        assert!(!caret.is_satisfied_by("2.0"));
        assert!(!caret.is_satisfied_by("1.1"));

        let tilde = VersionConstraint::new(ConstraintOp::Tilde, "1.2");
        assert!(tilde.is_satisfied_by("1.2.5"));
        assert!(!tilde.is_satisfied_by("1.3.0"));
    }

    #[test]
    fn test_constraint_display() {
        let c = VersionConstraint::new(ConstraintOp::Le, "3.1");
        assert_eq!(c.to_string(), "<= 3.1");
    }
}
