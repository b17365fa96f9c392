//! Materialized source tree

use std::collections::BTreeMap;

/// A traversed entry: file content, a directory, or an entry that could not be read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    Blob {
        path: String,
        content: String,
        size: usize,
    },
    Subtree {
        path: String,
        children: BTreeMap<String, TreeNode>,
    },
    /// Fetch failure or unsupported entry type, kept inline instead of aborting the walk
    Unreadable { path: String, reason: String },
}

impl TreeNode {
    pub fn blob(path: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self::Blob {
            path: path.into(),
            size: content.len(),
            content,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::Blob { path, .. } | Self::Subtree { path, .. } | Self::Unreadable { path, .. } => {
                path
            }
        }
    }

    /// Flatten to `relative path -> content`, with unreadable entries as their reason
    pub fn flatten(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        self.flatten_into(&mut out, true);
        out
    }

    /// Flatten readable blobs only
    pub fn flatten_files(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        self.flatten_into(&mut out, false);
        out
    }

    fn flatten_into(&self, out: &mut BTreeMap<String, String>, include_unreadable: bool) {
        match self {
            Self::Blob { path, content, .. } => {
                out.insert(path.clone(), content.clone());
            }
            Self::Subtree { children, .. } => {
                for child in children.values() {
                    child.flatten_into(out, include_unreadable);
                }
            }
            Self::Unreadable { path, reason } => {
                if include_unreadable {
                    out.insert(path.clone(), reason.clone());
                }
            }
        }
    }

    /// Paths of entries that could not be read
    pub fn unreadable(&self) -> Vec<&str> {
        match self {
            Self::Blob { .. } => Vec::new(),
            Self::Unreadable { path, .. } => vec![path.as_str()],
            Self::Subtree { children, .. } => {
                children.values().flat_map(|c| c.unreadable()).collect()
            }
        }
    }

    pub fn file_count(&self) -> usize {
        match self {
            Self::Blob { .. } => 1,
            Self::Unreadable { .. } => 0,
            Self::Subtree { children, .. } => children.values().map(|c| c.file_count()).sum(),
        }
    }

    pub fn total_size(&self) -> usize {
        match self {
            Self::Blob { size, .. } => *size,
            Self::Unreadable { .. } => 0,
            Self::Subtree { children, .. } => children.values().map(|c| c.total_size()).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TreeNode {
        let mut src = BTreeMap::new();
        src.insert("lib.rs".to_string(), TreeNode::blob("src/lib.rs", "pub fn a() {}"));
        src.insert(
            "huge.bin".to_string(),
            TreeNode::Unreadable {
                path: "src/huge.bin".to_string(),
                reason: "Error fetching file content: HTTP 500".to_string(),
            },
        );

        let mut root = BTreeMap::new();
        root.insert("README.md".to_string(), TreeNode::blob("README.md", "# Demo"));
        root.insert(
            "src".to_string(),
            TreeNode::Subtree {
                path: "src".to_string(),
                children: src,
            },
        );
        TreeNode::Subtree {
            path: String::new(),
            children: root,
        }
    }

    #[test]
    fn test_flatten_includes_inline_errors() {
        let flat = sample().flatten();
        assert_eq!(flat.len(), 3);
        assert_eq!(flat["src/lib.rs"], "pub fn a() {}");
        assert!(flat["src/huge.bin"].starts_with("Error fetching"));
    }

    #[test]
    fn test_flatten_files_skips_unreadable() {
        let flat = sample().flatten_files();
        assert_eq!(flat.len(), 2);
        assert!(!flat.contains_key("src/huge.bin"));
    }

    #[test]
    fn test_counts() {
        let tree = sample();
        assert_eq!(tree.file_count(), 2);
        assert_eq!(tree.total_size(), "pub fn a() {}".len() + "# Demo".len());
        assert_eq!(tree.unreadable(), vec!["src/huge.bin"]);
    }
}
