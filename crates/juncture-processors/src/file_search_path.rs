//! Ordered lists of directories to search for plugins.

use std::fmt;

use juncture_core::{NativeString, StringArray};
use serde::{Deserialize, Serialize};

/// Separator used by the text form of a [`FileSearchPath`].
const SEPARATOR: char = ';';

/// An ordered set of directories, without duplicates.
///
/// The text form joins the directories with `;`, e.g.
/// `/usr/lib/vst3;~/.vst3`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileSearchPath {
    directories: StringArray,
}

impl FileSearchPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a `;` separated list. Blank entries are skipped and duplicate
    /// entries are kept once.
    pub fn parse(text: &str) -> Self {
        let mut path = Self::new();
        for directory in text.split(SEPARATOR) {
            path.add(directory);
        }
        path
    }

    /// Adds a directory unless it is blank or already present. Returns
    /// `true` if it was added.
    pub fn add(&mut self, directory: &str) -> bool {
        let directory = directory.trim();
        if directory.is_empty() || self.directories.contains(directory) {
            return false;
        }
        self.directories.add(NativeString::new(directory));
        true
    }

    /// Removes a directory. Returns `true` if it was present.
    pub fn remove(&mut self, directory: &str) -> bool {
        let Some(index) = self.directories.index_of(directory) else {
            return false;
        };
        let remaining: StringArray = self
            .directories
            .iter()
            .enumerate()
            .filter(|(position, _)| *position != index)
            .map(|(_, kept)| kept)
            .collect();
        self.directories = remaining;
        true
    }

    pub fn len(&self) -> usize {
        self.directories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directories.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.directories.get(index).map(NativeString::as_str)
    }

    pub fn contains(&self, directory: &str) -> bool {
        self.directories.contains(directory)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.directories.iter()
    }

    pub fn directories(&self) -> &StringArray {
        &self.directories
    }
}

impl fmt::Display for FileSearchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut separator = [0u8; 4];
        f.write_str(&self.directories.join(SEPARATOR.encode_utf8(&mut separator)))
    }
}

impl<S: AsRef<str>> FromIterator<S> for FileSearchPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut path = Self::new();
        for directory in iter {
            path.add(directory.as_ref());
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let path = FileSearchPath::parse("/usr/lib/vst3; ~/.vst3;;/usr/lib/vst3");
        assert_eq!(path.len(), 2);
        assert_eq!(path.get(1), Some("~/.vst3"));
        assert_eq!(path.to_string(), "/usr/lib/vst3;~/.vst3");
        assert_eq!(FileSearchPath::parse(&path.to_string()), path);
    }

    #[test]
    fn test_add_and_remove() {
        let mut path = FileSearchPath::new();
        assert!(path.add("/foo/bar"));
        assert!(path.add("/bar/foo"));
        assert!(!path.add("/foo/bar"));
        assert!(!path.add("  "));
        assert_eq!(path.len(), 2);

        assert!(path.remove("/foo/bar"));
        assert!(!path.remove("/foo/bar"));
        assert_eq!(path.iter().collect::<Vec<_>>(), ["/bar/foo"]);
    }

    #[test]
    fn test_empty() {
        let path = FileSearchPath::default();
        assert!(path.is_empty());
        assert_eq!(path.to_string(), "");
        assert!(FileSearchPath::parse("").is_empty());
    }

    #[test]
    fn test_serializes_as_list() {
        let path: FileSearchPath = ["/a", "/b"].into_iter().collect();
        assert_eq!(serde_json::to_string(&path).unwrap(), r#"["/a","/b"]"#);
    }
}
