//! Value types for the cached object classes.
//!
//! These are the derived objects a versioned-filesystem backend caches to
//! avoid re-deriving them from on-disk structures. All of them serialize with
//! serde; the cache layer stores them as JSON.

use serde::{Deserialize, Serialize};

/// Stable identifier of a node revision within a repository.
pub type NodeId = String;

/// Whether a node is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    File,
    Directory,
}

/// A node in the revision DAG.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagNode {
    /// The node-revision id this DAG node represents.
    pub id: NodeId,
    pub kind: NodeKind,
    /// Revision in which this node revision was created.
    pub revision: u64,
    /// The path at which this node was created.
    pub created_path: String,
}

/// A single entry in a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub id: NodeId,
    pub kind: NodeKind,
}

/// The full entry listing of one directory node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryListing {
    pub entries: Vec<DirEntry>,
}

/// Offsets of the revisions stored in one pack file, indexed by revision
/// number relative to the start of the shard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackManifest {
    pub offsets: Vec<u64>,
}

/// Reconstructed full contents of a file at some revision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fulltext {
    pub data: Vec<u8>,
}

/// One window of a delta-compressed representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaWindow {
    /// Offset of the source view this window applies against.
    pub source_offset: u64,
    /// Size of the fully expanded target view.
    pub target_len: u64,
    /// Instruction and new-data stream, already decoded from disk.
    pub data: Vec<u8>,
}

/// The metadata record describing one node revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRevision {
    pub id: NodeId,
    pub kind: NodeKind,
    pub predecessor: Option<NodeId>,
    /// Representation key for the node's text, if it has one.
    pub text_rep: Option<String>,
    /// Representation key for the node's properties, if it has one.
    pub props_rep: Option<String>,
    pub created_path: String,
}
