use crate::error::{DocError, Result};
use smol_str::SmolStr;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// One hop of a dot-path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathNode {
    Key(SmolStr),
    Index(u64),
}

/// Dot-separated address into a document: `users.3."display name"`.
///
/// Tokens made only of ASCII digits are indices, everything else is a key.
/// Keys that are empty, all digits, or contain whitespace, `.`, `"` or `\`
/// must be quoted; inside quotes `\"` and `\\` are the only escapes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DotPath {
    nodes: Vec<PathNode>,
}

fn invalid(text: &str, reason: &str) -> DocError {
    DocError::InvalidPath(format!("{reason} in {text:?}"))
}

impl DotPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut nodes = Vec::new();
        let mut chars = text.chars().peekable();
        loop {
            let node = match chars.peek() {
                None => return Err(invalid(text, "missing path node")),
                Some('"') => {
                    chars.next();
                    let mut key = String::new();
                    loop {
                        match chars.next() {
                            None => return Err(invalid(text, "unterminated quote")),
                            Some('"') => break,
                            Some('\\') => match chars.next() {
                                Some(c @ ('"' | '\\')) => key.push(c),
                                _ => return Err(invalid(text, "bad escape")),
                            },
                            Some(c) => key.push(c),
                        }
                    }
                    PathNode::Key(SmolStr::from(key))
                }
                Some(_) => {
                    let mut token = String::new();
                    while let Some(&c) = chars.peek() {
                        if c == '.' {
                            break;
                        }
                        if c == '"' || c == '\\' || c.is_whitespace() {
                            return Err(invalid(text, "unquoted reserved character"));
                        }
                        token.push(c);
                        chars.next();
                    }
                    if token.is_empty() {
                        return Err(invalid(text, "empty path node"));
                    }
                    if token.bytes().all(|b| b.is_ascii_digit()) {
                        let index = token
                            .parse()
                            .map_err(|_| invalid(text, "index out of range"))?;
                        PathNode::Index(index)
                    } else {
                        PathNode::Key(SmolStr::from(token))
                    }
                }
            };
            nodes.push(node);
            match chars.next() {
                None => break,
                Some('.') => {}
                Some(_) => return Err(invalid(text, "expected '.' after quoted key")),
            }
        }
        Ok(DotPath { nodes })
    }

    pub fn key(mut self, key: impl Into<SmolStr>) -> Self {
        self.nodes.push(PathNode::Key(key.into()));
        self
    }

    pub fn index(mut self, index: u64) -> Self {
        self.nodes.push(PathNode::Index(index));
        self
    }

    pub fn nodes(&self) -> &[PathNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl FromStr for DotPath {
    type Err = DocError;

    fn from_str(s: &str) -> Result<Self> {
        DotPath::parse(s)
    }
}

impl From<Vec<PathNode>> for DotPath {
    fn from(nodes: Vec<PathNode>) -> Self {
        DotPath { nodes }
    }
}

fn is_bare_key(key: &str) -> bool {
    !key.is_empty()
        && !key.bytes().all(|b| b.is_ascii_digit())
        && !key
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '.' | '"' | '\\'))
}

impl fmt::Display for PathNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathNode::Index(i) => write!(f, "{i}"),
            PathNode::Key(key) if is_bare_key(key) => f.write_str(key),
            PathNode::Key(key) => {
                f.write_str("\"")?;
                for c in key.chars() {
                    if matches!(c, '"' | '\\') {
                        f.write_str("\\")?;
                    }
                    write!(f, "{c}")?;
                }
                f.write_str("\"")
            }
        }
    }
}

impl fmt::Display for DotPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{node}")?;
        }
        Ok(())
    }
}

/// Anything a document lookup accepts as a path: a parsed [`DotPath`] or
/// its text form.
pub trait ToDotPath {
    fn to_dot_path(&self) -> Result<Cow<'_, DotPath>>;
}

impl ToDotPath for DotPath {
    fn to_dot_path(&self) -> Result<Cow<'_, DotPath>> {
        Ok(Cow::Borrowed(self))
    }
}

impl ToDotPath for str {
    fn to_dot_path(&self) -> Result<Cow<'_, DotPath>> {
        DotPath::parse(self).map(Cow::Owned)
    }
}

impl ToDotPath for String {
    fn to_dot_path(&self) -> Result<Cow<'_, DotPath>> {
        DotPath::parse(self).map(Cow::Owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_nodes() {
        let path = DotPath::parse(r#"doc.1."a b".0"#).unwrap();
        assert_eq!(
            path.nodes(),
            &[
                PathNode::Key("doc".into()),
                PathNode::Index(1),
                PathNode::Key("a b".into()),
                PathNode::Index(0),
            ]
        );
        assert_eq!(path, DotPath::new().key("doc").index(1).key("a b").index(0));
    }

    #[test]
    fn test_parse_stringify_round_trip() {
        for text in [
            "1.0.0",
            "a",
            r#""12""#,
            r#""with.dot".x"#,
            r#""quote\"d".1"#,
            r#""back\\slash""#,
            r#""""#,
            "ünïcode.7",
        ] {
            let path: DotPath = text.parse().unwrap();
            assert_eq!(path.to_string(), text);
        }
    }

    #[test]
    fn test_reserved_characters_reparse() {
        for key in [r"a\b", "a\"b", "a.b", "a b", "42"] {
            let path = DotPath::new().key(key);
            assert_eq!(DotPath::parse(&path.to_string()).unwrap(), path, "{key:?}");
        }
    }

    #[test]
    fn test_quoted_digits_stay_keys() {
        let path = DotPath::parse(r#""2""#).unwrap();
        assert_eq!(path.nodes(), &[PathNode::Key("2".into())]);
    }

    #[test]
    fn test_rejects_malformed_paths() {
        for text in ["", "a..b", "a.", ".a", "a b", r"a\b", r#""open"#, r#""x"y"#, r#""\n""#, "99999999999999999999999"] {
            assert!(
                matches!(DotPath::parse(text), Err(DocError::InvalidPath(_))),
                "{text:?}"
            );
        }
    }
}
