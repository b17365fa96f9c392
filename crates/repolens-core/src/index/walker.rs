//! Tree traversal for indexing
//!
//! Two walkers produce the same `relative path -> content` view of a tree:
//! [`walk_local`] recurses a directory on disk, [`RemoteWalker`] recurses a
//! hosted repository through a [`CachedFetcher`], fanning out over siblings.

use super::ignore::{parse_ignore_file, to_rule_path, IgnoreRuleSet, IGNORE_FILE_NAME};
use super::tree::TreeNode;
use crate::error::{RepoLensError, Result};
use crate::providers::{binary_placeholder, CachedFetcher, EntryKind, RemoteEntry};
use futures::future::{join_all, BoxFuture, FutureExt};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use walkdir::WalkDir;

/// Result of a walk: readable files plus entries recorded as inline errors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkOutput {
    pub files: BTreeMap<String, String>,
    pub unreadable: BTreeMap<String, String>,
}

impl WalkOutput {
    pub fn from_tree(tree: &TreeNode) -> Self {
        let files = tree.flatten_files();
        let unreadable = tree
            .flatten()
            .into_iter()
            .filter(|(path, _)| !files.contains_key(path))
            .collect();
        Self { files, unreadable }
    }

    /// Single mapping with inline error strings for unreadable entries
    pub fn into_mapping(self) -> BTreeMap<String, String> {
        let mut mapping = self.files;
        mapping.extend(self.unreadable);
        mapping
    }

    pub fn total_bytes(&self) -> usize {
        self.files.values().map(|c| c.len()).sum()
    }
}

/// Walk a local directory, honoring ignore files found at every level
pub fn walk_local(root: &Path, rules: &IgnoreRuleSet) -> Result<WalkOutput> {
    if !root.is_dir() {
        return Err(RepoLensError::InvalidInput(format!(
            "Not a directory: {}",
            root.display()
        )));
    }

    let root_rules = with_local_ignore_file(rules, root, "");
    let mut scopes: Vec<(String, IgnoreRuleSet)> = vec![(String::new(), root_rules)];
    let mut output = WalkOutput::default();

    let mut walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let relative = e
                    .path()
                    .and_then(|p| p.strip_prefix(root).ok())
                    .map(to_rule_path);
                tracing::warn!("Skipping unreadable entry: {}", e);
                if let Some(relative) = relative {
                    output
                        .unreadable
                        .insert(relative, format!("Error reading entry: {}", e));
                }
                continue;
            }
        };

        let relative = to_rule_path(entry.path().strip_prefix(root).unwrap_or(entry.path()));

        // Leave scopes of directories this entry is not inside
        while scopes.len() > 1 && !is_within(&relative, &scopes[scopes.len() - 1].0) {
            scopes.pop();
        }
        let active = &scopes[scopes.len() - 1].1;

        if active.is_ignored(&relative) {
            if entry.file_type().is_dir() {
                walker.skip_current_dir();
            }
            continue;
        }

        let file_type = entry.file_type();
        if file_type.is_dir() {
            let nested = with_local_ignore_file(active, entry.path(), &relative);
            scopes.push((relative, nested));
        } else if file_type.is_file() {
            match std::fs::read(entry.path()) {
                Ok(bytes) => {
                    let size = bytes.len();
                    let content = String::from_utf8(bytes)
                        .unwrap_or_else(|_| binary_placeholder(&relative, size));
                    output.files.insert(relative, content);
                }
                Err(e) => {
                    tracing::warn!("Error reading file {}: {}", entry.path().display(), e);
                    output
                        .unreadable
                        .insert(relative, format!("Error reading file content: {}", e));
                }
            }
        } else {
            output
                .unreadable
                .insert(relative, "Unknown item type: special file".to_string());
        }
    }

    tracing::info!(
        "Walked {}: {} files, {} unreadable",
        root.display(),
        output.files.len(),
        output.unreadable.len()
    );
    Ok(output)
}

fn with_local_ignore_file(rules: &IgnoreRuleSet, dir: &Path, scope: &str) -> IgnoreRuleSet {
    let ignore_path = dir.join(IGNORE_FILE_NAME);
    if !ignore_path.is_file() {
        return rules.clone();
    }
    match std::fs::read_to_string(&ignore_path) {
        Ok(content) => rules.extended(scope, &parse_ignore_file(&content)),
        Err(e) => {
            tracing::debug!("Could not read {}: {}", ignore_path.display(), e);
            rules.clone()
        }
    }
}

fn is_within(path: &str, dir: &str) -> bool {
    dir.is_empty()
        || path
            .strip_prefix(dir)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn join_path(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Concurrent walker over a hosted repository.
///
/// Every entry of a listed directory is processed concurrently and joined
/// before the directory's node is assembled. In-flight fetches are capped by
/// a semaphore sized independently of the fetcher's rate budget.
pub struct RemoteWalker {
    fetcher: Arc<CachedFetcher>,
    base_rules: IgnoreRuleSet,
    fetch_slots: Arc<Semaphore>,
}

impl RemoteWalker {
    pub fn new(fetcher: Arc<CachedFetcher>, base_rules: IgnoreRuleSet, max_concurrent: usize) -> Self {
        Self {
            fetcher,
            base_rules,
            fetch_slots: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Walk from the repository root. Failing to list the root is fatal;
    /// failures below it are kept inline.
    pub async fn walk(&self) -> Result<TreeNode> {
        let tree = self.walk_dir(String::new(), self.base_rules.clone()).await?;
        tracing::info!(
            "Walked {} tree: {} files, {} unreadable, {} requests",
            self.fetcher.source_type(),
            tree.file_count(),
            tree.unreadable().len(),
            self.fetcher.request_count()
        );
        Ok(tree)
    }

    fn walk_dir(&self, path: String, inherited: IgnoreRuleSet) -> BoxFuture<'_, Result<TreeNode>> {
        async move {
            let entries = self.limited(self.fetcher.list(&path)).await?;

            let has_ignore_file = entries
                .iter()
                .any(|e| e.kind == EntryKind::File && e.name == IGNORE_FILE_NAME);
            let rules = if has_ignore_file {
                let ignore_path = join_path(&path, IGNORE_FILE_NAME);
                match self.limited(self.fetcher.content(&ignore_path)).await {
                    Ok(content) => inherited.extended(&path, &parse_ignore_file(&content)),
                    Err(e) => {
                        tracing::debug!("No usable ignore file at '{}': {}", ignore_path, e);
                        inherited
                    }
                }
            } else {
                inherited
            };

            let pending = entries
                .iter()
                .filter(|entry| !rules.is_ignored(&entry.path))
                .map(|entry| {
                    let rules = &rules;
                    async move { (entry.name.clone(), self.process_entry(entry, rules).await) }
                });

            let children: BTreeMap<String, TreeNode> = join_all(pending)
                .await
                .into_iter()
                .filter_map(|(name, node)| node.map(|node| (name, node)))
                .collect();

            Ok(TreeNode::Subtree { path, children })
        }
        .boxed()
    }

    async fn process_entry(&self, entry: &RemoteEntry, rules: &IgnoreRuleSet) -> Option<TreeNode> {
        if rules.is_ignored(&entry.path) {
            return None;
        }

        let node = match &entry.kind {
            EntryKind::File => match self.limited(self.fetcher.content(&entry.path)).await {
                Ok(content) => TreeNode::blob(entry.path.clone(), content),
                Err(e) => {
                    tracing::warn!("Failed to fetch {}: {}", entry.path, e);
                    TreeNode::Unreadable {
                        path: entry.path.clone(),
                        reason: format!("Error fetching file content: {}", e),
                    }
                }
            },
            EntryKind::Dir => match self.walk_dir(entry.path.clone(), rules.clone()).await {
                Ok(node) => node,
                Err(e) => {
                    tracing::warn!("Failed to list {}: {}", entry.path, e);
                    TreeNode::Unreadable {
                        path: entry.path.clone(),
                        reason: format!("Error listing directory: {}", e),
                    }
                }
            },
            EntryKind::Other(kind) => TreeNode::Unreadable {
                path: entry.path.clone(),
                reason: format!("Unknown item type: {}", kind),
            },
        };
        Some(node)
    }

    async fn limited<T, F>(&self, fetch: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let _slot = self
            .fetch_slots
            .acquire()
            .await
            .map_err(|e| RepoLensError::Other(anyhow::anyhow!("Fetch pool closed: {}", e)))?;
        fetch.await
    }
}
