use std::fmt;

/// Dotted name of a registered native, `root.path.to.member`.
///
/// A `/` in the root namespace name is written as `_` (`util/types` becomes `util_types`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName(String);

impl QualifiedName {
    pub fn new(root: &str, path: &[&str]) -> Self {
        let mut name = root.replace('/', "_");
        for segment in path {
            name.push('.');
            name.push_str(segment);
        }
        QualifiedName(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Root segment as written, and the rest of the path.
    pub fn split_root(&self) -> (&str, Vec<&str>) {
        split_root(&self.0)
    }
}

pub(crate) fn split_root(name: &str) -> (&str, Vec<&str>) {
    let mut segments = name.split('.');
    let root = segments.next().unwrap_or_default();
    (root, segments.collect())
}

/// Module names a written root may stand for: the literal text first, then with `_` read back
/// as `/`.
pub(crate) fn root_candidates(root: &str) -> Vec<String> {
    let mut candidates = vec![root.to_string()];
    if root.contains('_') {
        candidates.push(root.replace('_', "/"));
    }
    candidates
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QualifiedName {
    fn from(name: &str) -> Self {
        QualifiedName(name.to_string())
    }
}

impl From<String> for QualifiedName {
    fn from(name: String) -> Self {
        QualifiedName(name)
    }
}

impl AsRef<str> for QualifiedName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
