//! Frame graph.
//!
//! Maintains a tree of named reference frames.  Each frame stores the key of
//! its parent and its [`Pose`] relative to that parent; the graph owns every
//! frame by name, so there are no live references between nodes and moving a
//! frame never touches its descendants.
//!
//! Given any two frames the graph finds their lowest common ancestor, composes
//! the local poses along both branches and returns the relative transform,
//! optionally re-expressed in the axes of a third frame.
//!
//! # Example
//!
//! ```rust
//! use wrt_graph::graph::FrameGraph;
//! use wrt_graph::pose::Pose;
//!
//! let mut graph = FrameGraph::new("world");
//! graph.insert("table", "world", Pose::from_translation(0.0, 2.0, 0.0)).unwrap();
//! graph.insert("end-effector", "table", Pose::from_translation(1.0, 0.0, 0.0)).unwrap();
//!
//! let pose = graph.resolve("end-effector", "world", "world").unwrap();
//! assert_eq!(pose, Pose::from_translation(1.0, 2.0, 0.0));
//! ```

use std::collections::BTreeMap;

use tracing::{debug, info};
use wrt_types::{DEFAULT_ROOT_FRAME, FrameRecord, WrtError};

use crate::pose::Pose;

// ────────────────────────────────────────────────────────────────────────────
// FrameNode
// ────────────────────────────────────────────────────────────────────────────

/// A named vertex of the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameNode {
    name: String,
    parent: Option<String>,
    local_pose: Pose,
}

impl FrameNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key of the parent frame; `None` for the root.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Placement of this frame relative to its parent.
    pub fn local_pose(&self) -> &Pose {
        &self.local_pose
    }
}

// ────────────────────────────────────────────────────────────────────────────
// FrameGraph
// ────────────────────────────────────────────────────────────────────────────

/// The frames of one world, keyed by name, with a single implicit root.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameGraph {
    root: String,
    frames: BTreeMap<String, FrameNode>,
}

impl Default for FrameGraph {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT_FRAME)
    }
}

impl FrameGraph {
    /// Create a graph holding only the root frame.
    pub fn new(root: &str) -> Self {
        let mut frames = BTreeMap::new();
        frames.insert(
            root.to_string(),
            FrameNode {
                name: root.to_string(),
                parent: None,
                local_pose: Pose::identity(),
            },
        );
        Self {
            root: root.to_string(),
            frames,
        }
    }

    /// Rebuild a graph from its storage form and check that it is a tree.
    ///
    /// An empty record list yields a graph holding only `root`.  The stored
    /// pose of the root is ignored.
    ///
    /// # Errors
    ///
    /// [`WrtError::CorruptWorld`] when names repeat, when the root record is
    /// missing or has a parent, when a second parentless frame exists, when
    /// a parent is absent, when a pose is invalid, or when the parent links
    /// contain a loop.
    pub fn from_records(root: &str, records: Vec<FrameRecord>, tolerance: f64) -> Result<Self, WrtError> {
        if records.is_empty() {
            return Ok(Self::new(root));
        }

        let mut frames = BTreeMap::new();
        for record in records {
            let local_pose = match record.parent {
                None if record.name == root => Pose::identity(),
                None => {
                    return Err(WrtError::CorruptWorld(format!(
                        "frame '{}' has no parent but the root is '{root}'",
                        record.name
                    )));
                }
                Some(_) if record.name == root => {
                    return Err(WrtError::CorruptWorld(format!("root frame '{root}' has a parent")));
                }
                Some(_) => Pose::from_floats(&record.pose, tolerance).map_err(|e| {
                    WrtError::CorruptWorld(format!("frame '{}': {e}", record.name))
                })?,
            };
            let name = record.name.clone();
            let node = FrameNode {
                name: record.name,
                parent: record.parent,
                local_pose,
            };
            if frames.insert(name.clone(), node).is_some() {
                return Err(WrtError::CorruptWorld(format!("frame '{name}' is stored twice")));
            }
        }

        if !frames.contains_key(root) {
            return Err(WrtError::CorruptWorld(format!("root frame '{root}' is missing")));
        }

        let graph = Self {
            root: root.to_string(),
            frames,
        };
        graph.validate()?;
        Ok(graph)
    }

    /// Flat storage form, ordered by frame name.
    pub fn to_records(&self) -> Vec<FrameRecord> {
        self.frames
            .values()
            .map(|node| FrameRecord {
                name: node.name.clone(),
                parent: node.parent.clone(),
                pose: node.local_pose.to_floats(),
            })
            .collect()
    }

    /// Check that every frame reaches the root through existing parents.
    pub fn validate(&self) -> Result<(), WrtError> {
        for name in self.frames.keys() {
            self.path_to_root(name).map_err(|e| match e {
                WrtError::CorruptWorld(_) => e,
                other => WrtError::CorruptWorld(other.to_string()),
            })?;
        }
        Ok(())
    }

    // ── accessors ───────────────────────────────────────────────────────────

    /// Name of the root frame.
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn contains(&self, name: &str) -> bool {
        self.frames.contains_key(name)
    }

    pub fn frame(&self, name: &str) -> Option<&FrameNode> {
        self.frames.get(name)
    }

    /// All frames, ordered by name.
    pub fn frames(&self) -> impl Iterator<Item = &FrameNode> {
        self.frames.values()
    }

    /// Number of frames, root included.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Direct children of `name`, ordered by name.
    pub fn children(&self, name: &str) -> Vec<&str> {
        self.frames
            .values()
            .filter(|node| node.parent.as_deref() == Some(name))
            .map(|node| node.name.as_str())
            .collect()
    }

    /// Every frame below `name`, in depth-first order.
    pub fn descendants(&self, name: &str) -> Vec<&str> {
        let mut out = Vec::new();
        let mut stack = self.children(name);
        stack.reverse();
        while let Some(next) = stack.pop() {
            out.push(next);
            let mut kids = self.children(next);
            kids.reverse();
            stack.extend(kids);
        }
        out
    }

    // ── traversal ───────────────────────────────────────────────────────────

    /// Frames from `name` up to and including the root.
    ///
    /// The walk is bounded by the number of frames, so a loop in the parent
    /// links is reported as [`WrtError::CycleDetected`] instead of spinning.
    pub fn path_to_root(&self, name: &str) -> Result<Vec<&str>, WrtError> {
        let mut node = self.frames.get(name).ok_or_else(|| WrtError::unknown(name))?;
        let mut path = vec![node.name.as_str()];

        while let Some(parent) = node.parent.as_deref() {
            if path.len() > self.frames.len() {
                return Err(WrtError::CycleDetected {
                    subject: name.to_string(),
                    parent: parent.to_string(),
                });
            }
            node = self.frames.get(parent).ok_or_else(|| {
                WrtError::CorruptWorld(format!("frame '{}' points at missing parent '{parent}'", node.name))
            })?;
            path.push(node.name.as_str());
        }

        if node.name != self.root {
            return Err(WrtError::CorruptWorld(format!(
                "frame '{name}' is not connected to root '{}'",
                self.root
            )));
        }
        Ok(path)
    }

    /// Deepest frame that lies on both `a`'s and `b`'s path to the root.
    pub fn lowest_common_ancestor(&self, a: &str, b: &str) -> Result<&str, WrtError> {
        let path_a = self.path_to_root(a)?;
        let path_b = self.path_to_root(b)?;
        Ok(Self::lca_of(&path_a, &path_b))
    }

    /// Walk both root-ending paths from the root downward until they diverge.
    fn lca_of<'a>(path_a: &[&'a str], path_b: &[&'a str]) -> &'a str {
        let mut lca = path_a[path_a.len() - 1];
        for (x, y) in path_a.iter().rev().zip(path_b.iter().rev()) {
            if x != y {
                break;
            }
            lca = *x;
        }
        lca
    }

    /// Compose local poses from the head of `path` up to (excluding)
    /// `ancestor`, yielding the pose of `path[0]` relative to `ancestor`.
    fn pose_to_ancestor(&self, path: &[&str], ancestor: &str) -> Result<Pose, WrtError> {
        let mut acc = Pose::identity();
        for name in path.iter().take_while(|name| **name != ancestor) {
            let node = self.frames.get(*name).ok_or_else(|| WrtError::unknown(name))?;
            acc = node.local_pose.compose(&acc);
        }
        Ok(acc)
    }

    /// Pose of `subject` relative to `reference`, written in `reference`'s
    /// own axes.
    pub fn pose_wrt(&self, subject: &str, reference: &str) -> Result<Pose, WrtError> {
        let subject_path = self.path_to_root(subject)?;
        let reference_path = self.path_to_root(reference)?;
        let lca = Self::lca_of(&subject_path, &reference_path);

        let subject_in_lca = self.pose_to_ancestor(&subject_path, lca)?;
        let reference_in_lca = self.pose_to_ancestor(&reference_path, lca)?;
        debug!(subject, reference, lca, "composed frame paths");
        Ok(reference_in_lca.inverse().compose(&subject_in_lca))
    }

    /// Pose of `subject` with respect to `reference`, expressed in the axes
    /// of `expressed_in`.
    ///
    /// When `expressed_in` differs from `reference`, both the rotation and
    /// the translation of the relative pose are pre-multiplied by the
    /// orientation of `reference` as seen from `expressed_in`.  The physical
    /// relationship is unchanged; only the numbers move into another basis.
    ///
    /// # Errors
    ///
    /// [`WrtError::UnknownFrame`] when any of the three names is absent.
    pub fn resolve(&self, subject: &str, reference: &str, expressed_in: &str) -> Result<Pose, WrtError> {
        for name in [subject, reference, expressed_in] {
            if !self.contains(name) {
                return Err(WrtError::unknown(name));
            }
        }

        let relative = self.pose_wrt(subject, reference)?;
        if expressed_in == reference {
            return Ok(relative);
        }
        let basis = self.pose_wrt(reference, expressed_in)?;
        Ok(relative.reexpressed(basis.rotation()))
    }

    // ── mutation ────────────────────────────────────────────────────────────

    /// Add a new frame under `parent`.
    pub fn insert(&mut self, name: &str, parent: &str, pose: Pose) -> Result<(), WrtError> {
        if self.contains(name) {
            return Err(WrtError::InvalidRequest(format!("frame '{name}' already exists")));
        }
        if !self.contains(parent) {
            return Err(WrtError::unknown(parent));
        }
        self.frames.insert(
            name.to_string(),
            FrameNode {
                name: name.to_string(),
                parent: Some(parent.to_string()),
                local_pose: pose,
            },
        );
        info!(frame = name, parent, "frame created");
        Ok(())
    }

    /// Attach `subject` to `new_parent` with the given relative pose.
    ///
    /// Descendants of `subject` keep their local poses and move rigidly with
    /// it.  If `new_parent` currently lies inside `subject`'s subtree, it is
    /// first detached and re-attached under `subject`'s previous parent,
    /// keeping its placement in the world; the name of that frame is
    /// returned.
    ///
    /// Every check runs before anything is written, so an error leaves the
    /// graph untouched.
    ///
    /// # Errors
    ///
    /// - [`WrtError::UnknownFrame`] – `subject` or `new_parent` is absent.
    /// - [`WrtError::CycleDetected`] – `subject` is the root (never
    ///   detachable) or `subject` equals `new_parent`.
    pub fn reparent(&mut self, subject: &str, new_parent: &str, pose: Pose) -> Result<Option<String>, WrtError> {
        let previous_parent = self
            .frames
            .get(subject)
            .ok_or_else(|| WrtError::unknown(subject))?
            .parent
            .clone();
        if !self.contains(new_parent) {
            return Err(WrtError::unknown(new_parent));
        }

        let cycle = || WrtError::CycleDetected {
            subject: subject.to_string(),
            parent: new_parent.to_string(),
        };
        let Some(previous_parent) = previous_parent else {
            return Err(cycle());
        };
        if subject == new_parent {
            return Err(cycle());
        }

        let creates_cycle = self.path_to_root(new_parent)?.contains(&subject);
        let detach = if creates_cycle {
            let placement = self.pose_wrt(new_parent, &previous_parent)?;
            Some((new_parent.to_string(), previous_parent, placement))
        } else {
            None
        };

        // ── commit ──
        let detached = match detach {
            Some((name, parent, placement)) => {
                let node = self.frames.get_mut(&name).ok_or_else(|| WrtError::unknown(&name))?;
                info!(frame = %name, new_parent = %parent, "detached frame to break cycle");
                node.parent = Some(parent);
                node.local_pose = placement;
                Some(name)
            }
            None => None,
        };

        let node = self.frames.get_mut(subject).ok_or_else(|| WrtError::unknown(subject))?;
        node.parent = Some(new_parent.to_string());
        node.local_pose = pose;
        info!(frame = subject, parent = new_parent, "frame reparented");
        Ok(detached)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
