//! [`SharedFrameGraph`] – a frame graph shared between threads.
//!
//! Queries take the read lock; a `Set` holds the write lock for its whole
//! read-modify-write so readers never observe a half-applied reparent.

use std::sync::Arc;

use parking_lot::RwLock;
use wrt_types::WrtError;

use crate::facade::{self, Outcome, Request, SetOptions};
use crate::graph::FrameGraph;
use crate::pose::Pose;

/// Cloneable handle to one world's graph.
#[derive(Debug, Clone, Default)]
pub struct SharedFrameGraph {
    inner: Arc<RwLock<FrameGraph>>,
}

impl SharedFrameGraph {
    pub fn new(graph: FrameGraph) -> Self {
        Self {
            inner: Arc::new(RwLock::new(graph)),
        }
    }

    /// `Get(subject).Wrt(reference).Ei(expressed_in)` under the read lock.
    pub fn resolve(&self, subject: &str, reference: &str, expressed_in: &str) -> Result<Pose, WrtError> {
        self.inner.read().resolve(subject, reference, expressed_in)
    }

    /// Apply any request; `Set` takes the write lock, `Get` the read lock.
    pub fn apply(&self, request: &Request, options: &SetOptions) -> Result<Outcome, WrtError> {
        if request.is_mutation() {
            request.apply(&mut self.inner.write(), options)
        } else {
            facade::get(
                &self.inner.read(),
                request.subject(),
                request.reference(),
                request.expressed_in(),
            )
            .map(Outcome::Pose)
        }
    }

    /// Copy of the current graph, e.g. for saving.
    pub fn snapshot(&self) -> FrameGraph {
        self.inner.read().clone()
    }
}
