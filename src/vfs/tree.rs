use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::VaultError;
use crate::vfs::document::NodeDoc;

pub type NodeId = usize;

pub const ROOT_ID: NodeId = 0;
pub const ROOT_NAME: &str = "root";
pub const VERSIONS_FOLDER: &str = ".versions";

#[derive(Debug, Clone)]
pub enum NodeKind {
    File { content: Vec<u8> },
    Folder { children: BTreeMap<String, NodeId> },
}

#[derive(Debug, Clone)]
pub struct NodeSlot {
    pub name: String,
    pub created_at: f64,
    pub modified_at: f64,
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
}

impl NodeSlot {
    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder { .. })
    }
}

pub fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs_f64()
}

/// An arena of `Option<NodeSlot>`, `None` marking a slot whose subtree has
/// been deleted. Each node owns a `parent: Option<NodeId>` back-reference
/// into the same arena instead of a class hierarchy with `Rc`/`Weak`
/// pointers, so rename/move can update the parent's child map and the
/// node's own `name` field in the same borrow without an ownership cycle.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Option<NodeSlot>>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// A fresh tree containing only the root folder.
    pub fn new() -> Self {
        let now = now_secs();
        let root = NodeSlot {
            name: ROOT_NAME.to_string(),
            created_at: now,
            modified_at: now,
            parent: None,
            kind: NodeKind::Folder {
                children: BTreeMap::new(),
            },
        };
        Self {
            nodes: vec![Some(root)],
        }
    }

    pub fn root(&self) -> &NodeSlot {
        self.nodes[ROOT_ID].as_ref().expect("root always present")
    }

    pub(crate) fn get(&self, id: NodeId) -> &NodeSlot {
        self.nodes[id].as_ref().expect("dangling node id")
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut NodeSlot {
        self.nodes[id].as_mut().expect("dangling node id")
    }

    fn alloc(&mut self, slot: NodeSlot) -> NodeId {
        self.nodes.push(Some(slot));
        self.nodes.len() - 1
    }

    /// Canonical path of `id`: ancestor names joined with `/`; the root's
    /// path is empty.
    pub fn path_of(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut current = id;
        loop {
            let node = self.get(current);
            match node.parent {
                Some(parent) => {
                    parts.push(node.name.clone());
                    current = parent;
                }
                None => break,
            }
        }
        parts.reverse();
        parts.join("/")
    }

    /// Resolve a `/`-joined path. Empty segments (including `""`, `"/"`,
    /// and repeated slashes) are discarded, so all three resolve to root.
    pub fn resolve(&self, path: &str) -> Result<NodeId, VaultError> {
        let mut current = ROOT_ID;
        for part in path.split('/').filter(|s| !s.is_empty()) {
            match &self.get(current).kind {
                NodeKind::Folder { children } => {
                    current = *children
                        .get(part)
                        .ok_or_else(|| VaultError::NotFound(path.to_string()))?;
                }
                NodeKind::File { .. } => {
                    return Err(VaultError::NotAFolder(path.to_string()));
                }
            }
        }
        Ok(current)
    }

    fn resolve_folder(&self, path: &str) -> Result<NodeId, VaultError> {
        let id = self.resolve(path)?;
        if self.get(id).is_folder() {
            Ok(id)
        } else {
            Err(VaultError::NotAFolder(path.to_string()))
        }
    }

    fn children_of(&self, id: NodeId) -> &BTreeMap<String, NodeId> {
        match &self.get(id).kind {
            NodeKind::Folder { children } => children,
            NodeKind::File { .. } => unreachable!("caller must check is_folder first"),
        }
    }

    fn children_of_mut(&mut self, id: NodeId) -> &mut BTreeMap<String, NodeId> {
        match &mut self.get_mut(id).kind {
            NodeKind::Folder { children } => children,
            NodeKind::File { .. } => unreachable!("caller must check is_folder first"),
        }
    }

    /// Child names of `path`, with `.versions` hidden when listing root.
    pub fn list_children(&self, path: &str) -> Result<Vec<String>, VaultError> {
        let id = self.resolve_folder(path)?;
        let hide_versions = id == ROOT_ID;
        Ok(self
            .children_of(id)
            .keys()
            .filter(|name| !(hide_versions && name.as_str() == VERSIONS_FOLDER))
            .cloned()
            .collect())
    }

    pub fn create_folder(&mut self, name: &str, parent_path: &str) -> Result<String, VaultError> {
        let parent = self.resolve_folder(parent_path)?;
        if self.children_of(parent).contains_key(name) {
            return Err(VaultError::Collision(name.to_string()));
        }
        let now = now_secs();
        let id = self.alloc(NodeSlot {
            name: name.to_string(),
            created_at: now,
            modified_at: now,
            parent: Some(parent),
            kind: NodeKind::Folder {
                children: BTreeMap::new(),
            },
        });
        self.children_of_mut(parent).insert(name.to_string(), id);
        self.get_mut(parent).modified_at = now;
        Ok(self.path_of(id))
    }

    pub fn add_file(
        &mut self,
        name: &str,
        content: Vec<u8>,
        parent_path: &str,
    ) -> Result<String, VaultError> {
        let parent = self.resolve_folder(parent_path)?;
        if self.children_of(parent).contains_key(name) {
            return Err(VaultError::Collision(name.to_string()));
        }
        let now = now_secs();
        let id = self.alloc(NodeSlot {
            name: name.to_string(),
            created_at: now,
            modified_at: now,
            parent: Some(parent),
            kind: NodeKind::File { content },
        });
        self.children_of_mut(parent).insert(name.to_string(), id);
        self.get_mut(parent).modified_at = now;
        Ok(self.path_of(id))
    }

    /// Replace a file's content. The caller (the vault facade) is
    /// responsible for pushing a version beforehand via [`crate::vfs::versions`].
    pub fn set_file_content(&mut self, path: &str, content: Vec<u8>) -> Result<(), VaultError> {
        let id = self.resolve(path)?;
        match &mut self.get_mut(id).kind {
            NodeKind::File { content: slot } => *slot = content,
            NodeKind::Folder { .. } => return Err(VaultError::NotAFolder(path.to_string())),
        }
        self.get_mut(id).modified_at = now_secs();
        Ok(())
    }

    pub fn file_content(&self, path: &str) -> Result<&[u8], VaultError> {
        let id = self.resolve(path)?;
        match &self.get(id).kind {
            NodeKind::File { content } => Ok(content),
            NodeKind::Folder { .. } => Err(VaultError::NotAFolder(path.to_string())),
        }
    }

    /// Renames `path` to `new_name`. Returns `false` (no-op, nothing
    /// persisted) when the name is unchanged, `true` when the rename
    /// actually happened.
    pub fn rename_node(&mut self, path: &str, new_name: &str) -> Result<bool, VaultError> {
        if path.split('/').all(|s| s.is_empty()) {
            return Err(VaultError::IllegalOperation("cannot rename root".to_string()));
        }
        let id = self.resolve(path)?;
        let old_name = self.get(id).name.clone();
        if old_name == new_name {
            return Ok(false);
        }
        let parent = self.get(id).parent.expect("non-root node has a parent");
        if self.children_of(parent).contains_key(new_name) {
            return Err(VaultError::Collision(new_name.to_string()));
        }
        self.children_of_mut(parent).remove(&old_name);
        self.children_of_mut(parent).insert(new_name.to_string(), id);
        self.get_mut(id).name = new_name.to_string();
        Ok(true)
    }

    pub fn delete_node(&mut self, path: &str) -> Result<(), VaultError> {
        if path.split('/').all(|s| s.is_empty()) {
            return Err(VaultError::IllegalOperation("cannot delete root".to_string()));
        }
        let id = self.resolve(path)?;
        let parent = self.get(id).parent.expect("non-root node has a parent");
        let name = self.get(id).name.clone();
        self.children_of_mut(parent).remove(&name);
        self.tombstone_subtree(id);
        Ok(())
    }

    fn tombstone_subtree(&mut self, id: NodeId) {
        let child_ids: Vec<NodeId> = match &self.get(id).kind {
            NodeKind::Folder { children } => children.values().copied().collect(),
            NodeKind::File { .. } => Vec::new(),
        };
        for child in child_ids {
            self.tombstone_subtree(child);
        }
        self.nodes[id] = None;
    }

    pub(crate) fn ensure_versions_folder(&mut self) -> NodeId {
        if let NodeKind::Folder { children } = &self.get(ROOT_ID).kind {
            if let Some(id) = children.get(VERSIONS_FOLDER) {
                return *id;
            }
        }
        let now = now_secs();
        let id = self.alloc(NodeSlot {
            name: VERSIONS_FOLDER.to_string(),
            created_at: now,
            modified_at: now,
            parent: Some(ROOT_ID),
            kind: NodeKind::Folder {
                children: BTreeMap::new(),
            },
        });
        self.children_of_mut(ROOT_ID)
            .insert(VERSIONS_FOLDER.to_string(), id);
        id
    }

    pub(crate) fn versions_children(&self, versions_id: NodeId) -> &BTreeMap<String, NodeId> {
        self.children_of(versions_id)
    }

    pub(crate) fn upsert_version_file(
        &mut self,
        versions_id: NodeId,
        name: &str,
        content: Vec<u8>,
    ) {
        if let Some(existing) = self.children_of(versions_id).get(name).copied() {
            let now = now_secs();
            if let NodeKind::File { content: slot } = &mut self.get_mut(existing).kind {
                *slot = content;
            }
            self.get_mut(existing).created_at = now;
            self.get_mut(existing).modified_at = now;
            return;
        }
        let now = now_secs();
        let id = self.alloc(NodeSlot {
            name: name.to_string(),
            created_at: now,
            modified_at: now,
            parent: Some(versions_id),
            kind: NodeKind::File { content },
        });
        self.children_of_mut(versions_id)
            .insert(name.to_string(), id);
    }

    pub(crate) fn remove_version_child(&mut self, versions_id: NodeId, name: &str) {
        self.children_of_mut(versions_id).remove(name);
    }

    /// Rebuild the document into a tree, assigning fresh arena ids by a
    /// single top-down walk.
    pub fn from_document(root: &NodeDoc) -> Self {
        let mut tree = Tree { nodes: Vec::new() };
        tree.build(root, None);
        tree
    }

    fn build(&mut self, doc: &NodeDoc, parent: Option<NodeId>) -> NodeId {
        match doc {
            NodeDoc::File {
                name,
                created_at,
                modified_at,
                content,
            } => self.alloc(NodeSlot {
                name: name.clone(),
                created_at: *created_at,
                modified_at: *modified_at,
                parent,
                kind: NodeKind::File {
                    content: content.clone(),
                },
            }),
            NodeDoc::Folder {
                name,
                created_at,
                modified_at,
                children,
            } => {
                let id = self.alloc(NodeSlot {
                    name: name.clone(),
                    created_at: *created_at,
                    modified_at: *modified_at,
                    parent,
                    kind: NodeKind::Folder {
                        children: BTreeMap::new(),
                    },
                });
                for (child_name, child_doc) in children {
                    let child_id = self.build(child_doc, Some(id));
                    self.children_of_mut(id).insert(child_name.clone(), child_id);
                }
                id
            }
        }
    }

    /// Serialize the tree (starting at root) into its document form.
    pub fn to_document(&self) -> NodeDoc {
        self.doc_of(ROOT_ID)
    }

    fn doc_of(&self, id: NodeId) -> NodeDoc {
        let node = self.get(id);
        match &node.kind {
            NodeKind::File { content } => NodeDoc::File {
                name: node.name.clone(),
                created_at: node.created_at,
                modified_at: node.modified_at,
                content: content.clone(),
            },
            NodeKind::Folder { children } => NodeDoc::Folder {
                name: node.name.clone(),
                created_at: node.created_at,
                modified_at: node.modified_at,
                children: children
                    .iter()
                    .map(|(name, child_id)| (name.clone(), self.doc_of(*child_id)))
                    .collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_canonicalization() {
        let tree = Tree::new();
        assert_eq!(tree.resolve("").unwrap(), ROOT_ID);
        assert_eq!(tree.resolve("/").unwrap(), ROOT_ID);
        assert_eq!(tree.resolve("///").unwrap(), ROOT_ID);
    }

    #[test]
    fn create_and_resolve_nested() {
        let mut tree = Tree::new();
        tree.create_folder("Work", "").unwrap();
        tree.add_file("TODO.txt", b"- ship\n".to_vec(), "Work").unwrap();
        let content = tree.file_content("Work/TODO.txt").unwrap();
        assert_eq!(content, b"- ship\n");
    }

    #[test]
    fn collision_on_create_folder() {
        let mut tree = Tree::new();
        tree.create_folder("a", "").unwrap();
        assert!(matches!(
            tree.create_folder("a", ""),
            Err(VaultError::Collision(_))
        ));
    }

    #[test]
    fn traverse_through_file_is_not_a_folder() {
        let mut tree = Tree::new();
        tree.add_file("f.txt", vec![], "").unwrap();
        assert!(matches!(
            tree.resolve("f.txt/x"),
            Err(VaultError::NotAFolder(_))
        ));
    }

    #[test]
    fn missing_segment_is_not_found() {
        let tree = Tree::new();
        assert!(matches!(tree.resolve("nope"), Err(VaultError::NotFound(_))));
    }

    #[test]
    fn rename_collision_preserves_both_siblings() {
        let mut tree = Tree::new();
        tree.add_file("a", b"A".to_vec(), "").unwrap();
        tree.add_file("b", b"B".to_vec(), "").unwrap();
        assert!(matches!(
            tree.rename_node("a", "b"),
            Err(VaultError::Collision(_))
        ));
        assert_eq!(tree.file_content("a").unwrap(), b"A");
        assert_eq!(tree.file_content("b").unwrap(), b"B");
    }

    #[test]
    fn delete_root_is_illegal() {
        let mut tree = Tree::new();
        assert!(matches!(
            tree.delete_node(""),
            Err(VaultError::IllegalOperation(_))
        ));
    }

    #[test]
    fn delete_removes_subtree() {
        let mut tree = Tree::new();
        tree.create_folder("a", "").unwrap();
        tree.add_file("f", vec![1], "a").unwrap();
        tree.delete_node("a").unwrap();
        assert!(matches!(tree.resolve("a"), Err(VaultError::NotFound(_))));
    }

    #[test]
    fn document_roundtrip() {
        let mut tree = Tree::new();
        tree.create_folder("Work", "").unwrap();
        tree.add_file("TODO.txt", b"hi".to_vec(), "Work").unwrap();

        let doc = tree.to_document();
        let rebuilt = Tree::from_document(&doc);
        assert_eq!(rebuilt.file_content("Work/TODO.txt").unwrap(), b"hi");
    }

    #[test]
    fn versions_folder_hidden_from_root_listing() {
        let mut tree = Tree::new();
        tree.ensure_versions_folder();
        tree.create_folder("Work", "").unwrap();
        let listing = tree.list_children("").unwrap();
        assert!(!listing.iter().any(|n| n == VERSIONS_FOLDER));
        assert!(listing.iter().any(|n| n == "Work"));
    }
}
