//! Storage boundary.
//!
//! A [`WorldStore`] loads and saves whole frame graphs keyed by world name.
//! [`execute`] wraps one request in a load → apply → save cycle: the stored
//! world only changes when the request and the save both succeed.
//!
//! [`MemoryStore`] keeps worlds in process memory in their flat record form,
//! which exercises the same conversion a persistent adapter goes through.

use std::collections::HashMap;

use tracing::info;
use wrt_types::{DEFAULT_TOLERANCE, FrameRecord, WrtError};

use crate::facade::{Outcome, Request, SetOptions};
use crate::graph::FrameGraph;

/// Load/save collaborator for frame graphs.
pub trait WorldStore {
    /// The stored graph of `world`, or `None` if the world was never saved.
    fn load(&self, world: &str) -> Result<Option<FrameGraph>, WrtError>;

    /// Replace the stored content of `world` with `graph`.
    fn save(&mut self, world: &str, graph: &FrameGraph) -> Result<(), WrtError>;
}

/// Load `world`, or start a fresh graph rooted at `root` when it is absent.
pub fn load_or_new<S: WorldStore + ?Sized>(store: &S, world: &str, root: &str) -> Result<FrameGraph, WrtError> {
    match store.load(world)? {
        Some(graph) => Ok(graph),
        None => {
            info!(world, root, "world not found; starting a new one");
            Ok(FrameGraph::new(root))
        }
    }
}

/// Run `request` against `world` in `store`.
///
/// A missing world is created with `root` as its root frame.  `Set`
/// requests are saved after they apply; `Get` requests never write.
pub fn execute<S: WorldStore + ?Sized>(
    store: &mut S,
    world: &str,
    root: &str,
    request: &Request,
    options: &SetOptions,
) -> Result<Outcome, WrtError> {
    let mut graph = load_or_new(store, world, root)?;
    let outcome = request.apply(&mut graph, options)?;
    if request.is_mutation() {
        store.save(world, &graph)?;
        info!(world, request = %request, "world saved");
    }
    Ok(outcome)
}

// ────────────────────────────────────────────────────────────────────────────
// MemoryStore
// ────────────────────────────────────────────────────────────────────────────

/// In-process [`WorldStore`].
#[derive(Debug)]
pub struct MemoryStore {
    worlds: HashMap<String, (String, Vec<FrameRecord>)>,
    tolerance: f64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            worlds: HashMap::new(),
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tolerance applied when stored poses are validated on load.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Names of the stored worlds, sorted.
    pub fn worlds(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.worlds.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl WorldStore for MemoryStore {
    fn load(&self, world: &str) -> Result<Option<FrameGraph>, WrtError> {
        self.worlds
            .get(world)
            .map(|(root, records)| FrameGraph::from_records(root, records.clone(), self.tolerance))
            .transpose()
    }

    fn save(&mut self, world: &str, graph: &FrameGraph) -> Result<(), WrtError> {
        self.worlds
            .insert(world.to_string(), (graph.root().to_string(), graph.to_records()));
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Pose;

    fn set(subject: &str, wrt: &str, pose: Pose) -> Request {
        Request::builder().set(subject).wrt(wrt).ei(wrt).pose(pose).build().unwrap()
    }

    fn get(subject: &str, wrt: &str) -> Request {
        Request::builder().get(subject).wrt(wrt).ei(wrt).build().unwrap()
    }

    /// Fails every save; used to check that nothing leaks on error.
    struct ReadOnlyStore(MemoryStore);

    impl WorldStore for ReadOnlyStore {
        fn load(&self, world: &str) -> Result<Option<FrameGraph>, WrtError> {
            self.0.load(world)
        }

        fn save(&mut self, _world: &str, _graph: &FrameGraph) -> Result<(), WrtError> {
            Err(WrtError::storage(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }
    }

    #[test]
    fn set_is_persisted_between_calls() {
        let mut store = MemoryStore::new();
        let opts = SetOptions::default();
        execute(&mut store, "lab", "world", &set("table", "world", Pose::from_translation(0.0, 2.0, 0.0)), &opts)
            .unwrap();
        execute(&mut store, "lab", "world", &set("cup", "table", Pose::from_translation(1.0, 0.0, 0.0)), &opts)
            .unwrap();

        let outcome = execute(&mut store, "lab", "world", &get("cup", "world"), &opts).unwrap();
        let Outcome::Pose(pose) = outcome else {
            panic!("expected a pose");
        };
        assert!(pose.approx_eq(&Pose::from_translation(1.0, 2.0, 0.0), 1e-12));
    }

    #[test]
    fn get_on_new_world_does_not_save() {
        let mut store = MemoryStore::new();
        let outcome = execute(&mut store, "fresh", "world", &get("world", "world"), &SetOptions::default()).unwrap();
        assert_eq!(outcome, Outcome::Pose(Pose::identity()));
        assert!(store.worlds().is_empty());
    }

    #[test]
    fn worlds_are_independent() {
        let mut store = MemoryStore::new();
        let opts = SetOptions::default();
        execute(&mut store, "one", "world", &set("table", "world", Pose::identity()), &opts).unwrap();

        let err = execute(&mut store, "two", "world", &get("table", "world"), &opts).unwrap_err();
        assert!(matches!(err, WrtError::UnknownFrame(_)));
        assert_eq!(store.worlds(), vec!["one"]);
    }

    #[test]
    fn failed_set_leaves_store_unchanged() {
        let mut store = MemoryStore::new();
        let opts = SetOptions::default();
        execute(&mut store, "lab", "world", &set("table", "world", Pose::identity()), &opts).unwrap();
        let before = store.load("lab").unwrap();

        let err = execute(&mut store, "lab", "world", &set("cup", "shelf", Pose::identity()), &opts).unwrap_err();
        assert!(matches!(err, WrtError::UnknownFrame(_)));
        assert_eq!(store.load("lab").unwrap(), before);
    }

    #[test]
    fn storage_errors_surface_unchanged() {
        let mut store = ReadOnlyStore(MemoryStore::new());
        let err = execute(
            &mut store,
            "lab",
            "world",
            &set("table", "world", Pose::identity()),
            &SetOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, WrtError::Storage(_)));
        assert!(err.to_string().contains("read-only"));
        assert!(store.load("lab").unwrap().is_none());
    }

    #[test]
    fn custom_root_is_kept() {
        let mut store = MemoryStore::new();
        execute(&mut store, "cell", "base_link", &set("tool", "base_link", Pose::identity()), &SetOptions::default())
            .unwrap();
        let graph = store.load("cell").unwrap().unwrap();
        assert_eq!(graph.root(), "base_link");
    }

    #[test]
    fn near_tolerance_sets_reload_cleanly() {
        let scaled = |angle: f64| {
            let m = Pose::rotation_z(angle).rotation().matrix() * (1.0 + 3e-7);
            Pose::from_parts(m, nalgebra::Vector3::zeros()).unwrap()
        };
        let opts = SetOptions::default();
        let mut store = MemoryStore::new();
        execute(&mut store, "lab", "world", &set("a", "world", scaled(0.5)), &opts).unwrap();
        let c = Request::builder().set("c").wrt("a").ei("world").pose(scaled(0.2)).build().unwrap();
        execute(&mut store, "lab", "world", &c, &opts).unwrap();

        let graph = store.load("lab").unwrap().unwrap();
        for frame in graph.frames() {
            let deviation = crate::pose::orthonormal_deviation(frame.local_pose().rotation().matrix());
            assert!(deviation <= crate::pose::ORTHONORMAL_DRIFT, "{} drifted by {deviation}", frame.name());
        }
        let back = Request::builder().get("c").wrt("a").ei("world").build().unwrap();
        let Outcome::Pose(pose) = execute(&mut store, "lab", "world", &back, &opts).unwrap() else {
            panic!("expected a pose");
        };
        assert!(pose.approx_eq(&Pose::rotation_z(0.2), 1e-9));
    }
}
