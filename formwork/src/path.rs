//! Structured paths into a form value.
//!
//! A path is a sequence of segments, each either a field name or an array
//! index. The canonical string form is `a.b[2].c`; the empty string is the
//! root of the value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::FormError;

/// A single path segment.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Seg {
    /// Object field name.
    Key(String),
    /// Array index.
    Index(usize),
}

impl Seg {
    /// Create a key segment.
    #[inline]
    pub fn key(k: impl Into<String>) -> Self {
        Seg::Key(k.into())
    }

    /// Get the index if this is an index segment.
    #[inline]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Seg::Key(_) => None,
            Seg::Index(i) => Some(*i),
        }
    }

    /// Get the key if this is a key segment.
    #[inline]
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Seg::Key(k) => Some(k),
            Seg::Index(_) => None,
        }
    }
}

impl From<&str> for Seg {
    fn from(s: &str) -> Self {
        Seg::Key(s.to_owned())
    }
}

impl From<String> for Seg {
    fn from(s: String) -> Self {
        Seg::Key(s)
    }
}

impl From<usize> for Seg {
    fn from(i: usize) -> Self {
        Seg::Index(i)
    }
}

/// A path into a form value.
///
/// Paths are immutable value objects; equality is structural.
///
/// # Examples
///
/// ```
/// use formwork::Path;
///
/// let path: Path = "colors[0].name".parse().unwrap();
/// assert_eq!(path, Path::root().key("colors").index(0).key("name"));
/// assert_eq!(path.to_string(), "colors[0].name");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path(Vec<Seg>);

impl Path {
    /// The empty path, addressing the whole value.
    #[inline]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Create a path from segments.
    #[inline]
    pub fn from_segments(segments: Vec<Seg>) -> Self {
        Self(segments)
    }

    /// Parse a path from its string form.
    ///
    /// Accepts dotted names, bracketed indices and quoted bracket keys:
    /// `a.b[2].c`, `[0].name`, `meta["x.y"]`.
    pub fn parse(input: &str) -> Result<Self, FormError> {
        Parser::new(input).parse()
    }

    /// Append a key segment (builder).
    #[inline]
    pub fn key(mut self, k: impl Into<String>) -> Self {
        self.0.push(Seg::Key(k.into()));
        self
    }

    /// Append an index segment (builder).
    #[inline]
    pub fn index(mut self, i: usize) -> Self {
        self.0.push(Seg::Index(i));
        self
    }

    /// Return a new path with `seg` appended.
    #[inline]
    pub fn child(&self, seg: impl Into<Seg>) -> Path {
        let mut result = self.clone();
        result.0.push(seg.into());
        result
    }

    /// Join this path with another path.
    #[inline]
    pub fn join(&self, other: &Path) -> Path {
        let mut result = self.clone();
        result.0.extend(other.0.iter().cloned());
        result
    }

    #[inline]
    pub fn segments(&self) -> &[Seg] {
        &self.0
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The path without its last segment.
    pub fn parent(&self) -> Option<Path> {
        if self.0.is_empty() {
            None
        } else {
            Some(Path(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// True if `self` is an equal or strict prefix of `other`.
    ///
    /// ```
    /// use formwork::path;
    ///
    /// assert!(path!("name").is_prefix_of(&path!("name", "first")));
    /// assert!(path!("name").is_prefix_of(&path!("name")));
    /// assert!(!path!("name", "first").is_prefix_of(&path!("name")));
    /// ```
    #[inline]
    pub fn is_prefix_of(&self, other: &Path) -> bool {
        other.0.starts_with(&self.0)
    }

    /// True if `self` is a prefix of `other` and shorter than it.
    #[inline]
    pub fn is_strict_prefix_of(&self, other: &Path) -> bool {
        self.0.len() < other.0.len() && self.is_prefix_of(other)
    }

    /// Renumber this path after the element at `removed` was deleted from the
    /// array at `array_path`.
    ///
    /// Returns `None` when the path addressed the removed element (or
    /// something inside it). Paths not under the array are returned as-is.
    pub fn shift_index(&self, array_path: &Path, removed: usize) -> Option<Path> {
        match self.index_under(array_path) {
            Some(i) if i == removed => None,
            Some(i) if i > removed => Some(self.with_index_at(array_path.len(), i - 1)),
            _ => Some(self.clone()),
        }
    }

    /// Renumber this path after an element was inserted at `inserted` in the
    /// array at `array_path`: indices at or after the insertion point move up.
    pub fn bump_index(&self, array_path: &Path, inserted: usize) -> Path {
        match self.index_under(array_path) {
            Some(i) if i >= inserted => self.with_index_at(array_path.len(), i + 1),
            _ => self.clone(),
        }
    }

    /// Renumber the element index this path has under `array_path` with `f`.
    ///
    /// `f` returning `None` drops the path. Paths not under the array are
    /// returned as-is.
    pub fn remap_index(
        &self,
        array_path: &Path,
        f: impl FnOnce(usize) -> Option<usize>,
    ) -> Option<Path> {
        match self.index_under(array_path) {
            Some(i) => f(i).map(|j| self.with_index_at(array_path.len(), j)),
            None => Some(self.clone()),
        }
    }

    /// The element index this path addresses inside `array_path`, if any.
    pub fn index_under(&self, array_path: &Path) -> Option<usize> {
        if !array_path.is_strict_prefix_of(self) {
            return None;
        }
        self.0[array_path.len()].as_index()
    }

    /// Replace the index segment at `depth` (which must be an index).
    pub(crate) fn with_index_at(&self, depth: usize, index: usize) -> Path {
        let mut segments = self.0.clone();
        segments[depth] = Seg::Index(index);
        Path(segments)
    }

    /// Iterate over the segments.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Seg> {
        self.0.iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            match seg {
                Seg::Index(idx) => write!(f, "[{}]", idx)?,
                Seg::Key(k) if needs_quoting(k) => {
                    write!(f, "[\"{}\"]", k.replace('\\', "\\\\").replace('"', "\\\""))?
                }
                Seg::Key(k) if i == 0 => write!(f, "{}", k)?,
                Seg::Key(k) => write!(f, ".{}", k)?,
            }
        }
        Ok(())
    }
}

fn needs_quoting(key: &str) -> bool {
    key.is_empty() || key.contains(['.', '[', ']', '"', '\'', '\\'])
}

impl FromStr for Path {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

impl TryFrom<&str> for Path {
    type Error = FormError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Path::parse(s)
    }
}

impl TryFrom<String> for Path {
    type Error = FormError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Path::parse(&s)
    }
}

/// Anything that can name a path: a parsed [`Path`] or its string form.
pub trait IntoPath {
    fn into_path(self) -> Result<Path, FormError>;
}

impl IntoPath for Path {
    fn into_path(self) -> Result<Path, FormError> {
        Ok(self)
    }
}

impl IntoPath for &Path {
    fn into_path(self) -> Result<Path, FormError> {
        Ok(self.clone())
    }
}

impl IntoPath for &str {
    fn into_path(self) -> Result<Path, FormError> {
        Path::parse(self)
    }
}

impl IntoPath for String {
    fn into_path(self) -> Result<Path, FormError> {
        Path::parse(&self)
    }
}

impl IntoPath for &String {
    fn into_path(self) -> Result<Path, FormError> {
        Path::parse(self)
    }
}

impl FromIterator<Seg> for Path {
    fn from_iter<I: IntoIterator<Item = Seg>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Seg;
    type IntoIter = std::slice::Iter<'a, Seg>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// Paths serialize as their canonical string so they can key JSON objects.
impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Path::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Construct a `Path` from a sequence of segments.
///
/// String literals become key segments, integers become index segments.
///
/// ```
/// use formwork::path;
///
/// let p = path!("colors", 0usize, "name");
/// assert_eq!(p.to_string(), "colors[0].name");
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::Path::root()
    };
    ($($seg:expr),+ $(,)?) => {{
        let segments = vec![$($crate::Seg::from($seg)),+];
        $crate::Path::from_segments(segments)
    }};
}

struct Parser<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    segments: Vec<Seg>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            segments: Vec::new(),
        }
    }

    fn fail(&self, reason: impl Into<String>) -> FormError {
        FormError::invalid_path(self.input, reason)
    }

    fn parse(mut self) -> Result<Path, FormError> {
        if self.input.is_empty() {
            return Ok(Path::root());
        }

        let mut expect_name = true;
        while let Some(&(_, c)) = self.chars.peek() {
            match c {
                '[' => {
                    self.chars.next();
                    let seg = self.bracket()?;
                    self.segments.push(seg);
                    expect_name = false;
                }
                '.' => {
                    if expect_name {
                        return Err(self.fail("empty segment"));
                    }
                    self.chars.next();
                    expect_name = true;
                }
                ']' => return Err(self.fail("unbalanced ']'")),
                _ => {
                    if !expect_name {
                        return Err(self.fail("expected '.' or '[' between segments"));
                    }
                    let name = self.name();
                    self.segments.push(Seg::Key(name));
                    expect_name = false;
                }
            }
        }

        if expect_name {
            return Err(self.fail("path ends with '.'"));
        }
        Ok(Path(self.segments))
    }

    fn name(&mut self) -> String {
        let mut name = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c == '.' || c == '[' || c == ']' {
                break;
            }
            name.push(c);
            self.chars.next();
        }
        name
    }

    fn bracket(&mut self) -> Result<Seg, FormError> {
        match self.chars.peek().map(|&(_, c)| c) {
            Some(q @ ('"' | '\'')) => {
                self.chars.next();
                let mut key = String::new();
                loop {
                    match self.chars.next() {
                        Some((_, '\\')) => match self.chars.next() {
                            Some((_, c)) => key.push(c),
                            None => return Err(self.fail("unterminated quoted key")),
                        },
                        Some((_, c)) if c == q => break,
                        Some((_, c)) => key.push(c),
                        None => return Err(self.fail("unterminated quoted key")),
                    }
                }
                match self.chars.next() {
                    Some((_, ']')) => Ok(Seg::Key(key)),
                    _ => Err(self.fail("expected ']' after quoted key")),
                }
            }
            _ => {
                let mut digits = String::new();
                loop {
                    match self.chars.next() {
                        Some((_, ']')) => break,
                        Some((_, c)) => digits.push(c),
                        None => return Err(self.fail("unbalanced '['")),
                    }
                }
                let digits = digits.trim();
                if digits.starts_with('-') {
                    return Err(self.fail(format!("negative index {}", digits)));
                }
                digits
                    .parse::<usize>()
                    .map(Seg::Index)
                    .map_err(|_| self.fail(format!("'{}' is not an array index", digits)))
            }
        }
    }
}
