//! Get / Set / Wrt / Ei / As accessor surface.
//!
//! Callers describe what they want as a [`Request`], assembled with a
//! [`RequestBuilder`] and validated once in [`RequestBuilder::build`]:
//!
//! - exactly one of `Get` or `Set` names the subject frame,
//! - `Wrt` (the reference frame) and `Ei` (the frame whose axes the numbers
//!   are written in) are mandatory,
//! - `As` (the pose to assign) is mandatory for `Set` and refused for `Get`.
//!
//! A valid request is then applied to an explicit [`FrameGraph`]; the facade
//! keeps no state of its own.
//!
//! # Example
//!
//! ```rust
//! use wrt_graph::facade::{Outcome, Request, SetOptions};
//! use wrt_graph::graph::FrameGraph;
//! use wrt_graph::pose::Pose;
//!
//! let mut world = FrameGraph::new("world");
//! let options = SetOptions::default();
//!
//! Request::builder()
//!     .set("table").wrt("world").ei("world")
//!     .pose(Pose::from_translation(0.0, 2.0, 0.0))
//!     .build().unwrap()
//!     .apply(&mut world, &options).unwrap();
//!
//! let get = Request::builder().get("table").wrt("world").ei("world").build().unwrap();
//! match get.apply(&mut world, &options).unwrap() {
//!     Outcome::Pose(p) => assert_eq!(p, Pose::from_translation(0.0, 2.0, 0.0)),
//!     Outcome::Updated { .. } => unreachable!(),
//! }
//! ```

use std::fmt;

use tracing::debug;
use wrt_types::WrtError;

use crate::graph::FrameGraph;
use crate::pose::Pose;

// ────────────────────────────────────────────────────────────────────────────
// Options
// ────────────────────────────────────────────────────────────────────────────

/// Behaviour switches for `Set`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Create a missing reference frame under the root (identity pose)
    /// instead of failing with [`WrtError::UnknownFrame`].
    pub create_missing_reference: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Request
// ────────────────────────────────────────────────────────────────────────────

/// What to do with the subject frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Get,
    /// Assign this pose, written in the `Ei` frame's axes.
    Set(Pose),
}

/// A validated Get or Set request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    subject: String,
    reference: String,
    expressed_in: String,
    operation: Operation,
}

/// Result of applying a [`Request`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// `Get` result.
    Pose(Pose),
    /// `Set` committed.  `detached` names the frame that was moved under the
    /// subject's previous parent to avoid a cycle, if any.
    Updated { detached: Option<String> },
}

impl Request {
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn expressed_in(&self) -> &str {
        &self.expressed_in
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// `true` for `Set`.
    pub fn is_mutation(&self) -> bool {
        matches!(self.operation, Operation::Set(_))
    }

    /// Dispatch against `graph`.  A `Get` never modifies the graph.
    pub fn apply(&self, graph: &mut FrameGraph, options: &SetOptions) -> Result<Outcome, WrtError> {
        debug!(request = %self, "applying request");
        match &self.operation {
            Operation::Get => get(graph, &self.subject, &self.reference, &self.expressed_in).map(Outcome::Pose),
            Operation::Set(pose) => {
                set(graph, &self.subject, &self.reference, &self.expressed_in, *pose, options)
                    .map(|detached| Outcome::Updated { detached })
            }
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.operation {
            Operation::Get => "Get",
            Operation::Set(_) => "Set",
        };
        write!(
            f,
            "{verb}('{}').Wrt('{}').Ei('{}')",
            self.subject, self.reference, self.expressed_in
        )?;
        if self.is_mutation() {
            write!(f, ".As(..)")?;
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// RequestBuilder
// ────────────────────────────────────────────────────────────────────────────

/// Collects the parts of a request in any order; [`RequestBuilder::build`]
/// checks them together.
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    get: Option<String>,
    set: Option<String>,
    wrt: Option<String>,
    ei: Option<String>,
    pose: Option<Pose>,
}

impl RequestBuilder {
    pub fn get(mut self, frame: impl Into<String>) -> Self {
        self.get = Some(frame.into());
        self
    }

    pub fn set(mut self, frame: impl Into<String>) -> Self {
        self.set = Some(frame.into());
        self
    }

    pub fn wrt(mut self, frame: impl Into<String>) -> Self {
        self.wrt = Some(frame.into());
        self
    }

    pub fn ei(mut self, frame: impl Into<String>) -> Self {
        self.ei = Some(frame.into());
        self
    }

    /// The `As` payload.
    pub fn pose(mut self, pose: Pose) -> Self {
        self.pose = Some(pose);
        self
    }

    /// Validate and produce the [`Request`].
    ///
    /// # Errors
    ///
    /// [`WrtError::InvalidRequest`] when both or neither of Get/Set are
    /// given, when Wrt or Ei is missing, when a frame name is blank, when
    /// Set lacks As, or when Get carries As.
    pub fn build(self) -> Result<Request, WrtError> {
        let invalid = |msg: &str| WrtError::InvalidRequest(msg.to_string());

        let (subject, operation) = match (self.get, self.set) {
            (Some(_), Some(_)) => return Err(invalid("only one of Get or Set may be specified")),
            (None, None) => return Err(invalid("one of Get or Set must be specified")),
            (Some(subject), None) => {
                if self.pose.is_some() {
                    return Err(invalid("As is only accepted with Set"));
                }
                (subject, Operation::Get)
            }
            (None, Some(subject)) => {
                let pose = self.pose.ok_or_else(|| invalid("Set requires As"))?;
                (subject, Operation::Set(pose))
            }
        };
        let reference = self.wrt.ok_or_else(|| invalid("Wrt is required"))?;
        let expressed_in = self.ei.ok_or_else(|| invalid("Ei is required"))?;

        for name in [&subject, &reference, &expressed_in] {
            if name.trim().is_empty() {
                return Err(invalid("frame names must not be empty"));
            }
        }

        Ok(Request {
            subject,
            reference,
            expressed_in,
            operation,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Operations
// ────────────────────────────────────────────────────────────────────────────

/// `Get(subject).Wrt(reference).Ei(expressed_in)`.
pub fn get(graph: &FrameGraph, subject: &str, reference: &str, expressed_in: &str) -> Result<Pose, WrtError> {
    graph.resolve(subject, reference, expressed_in)
}

/// `Set(subject).Wrt(reference).Ei(expressed_in).As(pose)`.
///
/// `pose` is written in `expressed_in`'s axes; it is first rewritten in
/// `reference`'s axes using the orientation of `expressed_in` as it stands
/// before the call, then `subject` is placed under `reference` with it.  A
/// subject that does not exist yet is created.
///
/// Changes are staged on a copy and committed only when every step
/// succeeds.  Returns the frame detached to avoid a cycle, if any.
pub fn set(
    graph: &mut FrameGraph,
    subject: &str,
    reference: &str,
    expressed_in: &str,
    pose: Pose,
    options: &SetOptions,
) -> Result<Option<String>, WrtError> {
    let mut staged = graph.clone();

    if !staged.contains(reference) {
        if !options.create_missing_reference {
            return Err(WrtError::unknown(reference));
        }
        let root = staged.root().to_string();
        staged.insert(reference, &root, Pose::identity())?;
    }
    if !staged.contains(expressed_in) {
        return Err(WrtError::unknown(expressed_in));
    }

    let local = if expressed_in == reference {
        pose
    } else {
        let basis = staged.pose_wrt(reference, expressed_in)?;
        pose.reexpressed(&basis.rotation().inverse())
    };

    let detached = if staged.contains(subject) {
        staged.reparent(subject, reference, local)?
    } else {
        staged.insert(subject, reference, local)?;
        None
    };

    *graph = staged;
    Ok(detached)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    const EPS: f64 = 1e-9;

    fn set_req(subject: &str, wrt: &str, ei: &str, pose: Pose) -> Request {
        Request::builder().set(subject).wrt(wrt).ei(ei).pose(pose).build().unwrap()
    }

    fn get_pose(graph: &mut FrameGraph, subject: &str, wrt: &str, ei: &str) -> Pose {
        let req = Request::builder().get(subject).wrt(wrt).ei(ei).build().unwrap();
        match req.apply(graph, &SetOptions::default()).unwrap() {
            Outcome::Pose(p) => p,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    fn matrix(m: [[f64; 4]; 4]) -> Pose {
        Pose::from_matrix(m).unwrap()
    }

    // ── builder ─────────────────────────────────────────────────────────────

    #[test]
    fn builder_requires_exactly_one_of_get_or_set() {
        let neither = Request::builder().wrt("a").ei("a").build();
        assert!(matches!(neither, Err(WrtError::InvalidRequest(_))));

        let both = Request::builder()
            .get("x")
            .set("x")
            .wrt("a")
            .ei("a")
            .pose(Pose::identity())
            .build();
        assert!(matches!(both, Err(WrtError::InvalidRequest(_))));
    }

    #[test]
    fn builder_requires_wrt_and_ei() {
        let err = Request::builder().get("x").ei("a").build().unwrap_err();
        assert!(err.to_string().contains("Wrt"));
        let err = Request::builder().get("x").wrt("a").build().unwrap_err();
        assert!(err.to_string().contains("Ei"));
    }

    #[test]
    fn builder_pairs_as_with_set_only() {
        let err = Request::builder().set("x").wrt("a").ei("a").build().unwrap_err();
        assert!(err.to_string().contains("As"));

        let err = Request::builder()
            .get("x")
            .wrt("a")
            .ei("a")
            .pose(Pose::identity())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("As"));
    }

    #[test]
    fn builder_rejects_blank_names() {
        let err = Request::builder().get(" ").wrt("a").ei("a").build().unwrap_err();
        assert!(matches!(err, WrtError::InvalidRequest(_)));
    }

    #[test]
    fn request_display_reads_like_the_expression() {
        let req = Request::builder().get("c").wrt("world").ei("b").build().unwrap();
        assert_eq!(req.to_string(), "Get('c').Wrt('world').Ei('b')");
        assert!(!req.is_mutation());
    }

    // ── scenarios ───────────────────────────────────────────────────────────

    #[test]
    fn set_then_get_identity_wrt_table_in_world() {
        let mut g = FrameGraph::new("world");
        set_req("table", "world", "world", Pose::identity()).apply(&mut g, &SetOptions::default()).unwrap();
        set_req("end-effector", "table", "world", Pose::identity())
            .apply(&mut g, &SetOptions::default())
            .unwrap();

        let pose = get_pose(&mut g, "end-effector", "table", "world");
        assert!(pose.approx_eq(&Pose::identity(), EPS));
    }

    #[test]
    fn translation_accumulates_through_table() {
        let mut g = FrameGraph::new("world");
        let opts = SetOptions::default();
        set_req("table", "world", "world", Pose::from_translation(0.0, 2.0, 0.0)).apply(&mut g, &opts).unwrap();
        set_req("end-effector", "table", "table", Pose::from_translation(1.0, 0.0, 0.0))
            .apply(&mut g, &opts)
            .unwrap();

        let pose = get_pose(&mut g, "end-effector", "world", "world");
        assert!(pose.approx_eq(&Pose::from_translation(1.0, 2.0, 0.0), EPS));
    }

    /// Four frames chained through rotations, queried in several bases.
    #[test]
    fn rotated_chain_reference_values() {
        let mut g = FrameGraph::new("world");
        let opts = SetOptions::default();
        set_req("a", "world", "world", Pose::from_translation(1.0, 1.0, 1.0)).apply(&mut g, &opts).unwrap();
        set_req("b", "a", "a", Pose::rotation_x(FRAC_PI_2)).apply(&mut g, &opts).unwrap();
        set_req("c", "b", "b", Pose::from_translation(1.0, 0.0, 0.0)).apply(&mut g, &opts).unwrap();
        set_req("d", "b", "b", Pose::rotation_z(FRAC_PI_2).with_translation(1.0, 1.0, 0.0))
            .apply(&mut g, &opts)
            .unwrap();

        let cases = [
            (("a", "b", "b"), [[1.0, 0.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0], [0.0, -1.0, 0.0, 0.0], [0.0, 0.0, 0.0, 1.0]]),
            (("a", "b", "a"), [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0], [0.0, 0.0, 0.0, 1.0]]),
            (("c", "world", "world"), [[1.0, 0.0, 0.0, 2.0], [0.0, 0.0, -1.0, 1.0], [0.0, 1.0, 0.0, 1.0], [0.0, 0.0, 0.0, 1.0]]),
            (("c", "world", "c"), [[1.0, 0.0, 0.0, 2.0], [0.0, 1.0, 0.0, 1.0], [0.0, 0.0, 1.0, -1.0], [0.0, 0.0, 0.0, 1.0]]),
            (("c", "world", "a"), [[1.0, 0.0, 0.0, 2.0], [0.0, 0.0, -1.0, 1.0], [0.0, 1.0, 0.0, 1.0], [0.0, 0.0, 0.0, 1.0]]),
            (("d", "a", "a"), [[0.0, -1.0, 0.0, 1.0], [0.0, 0.0, -1.0, 0.0], [1.0, 0.0, 0.0, 1.0], [0.0, 0.0, 0.0, 1.0]]),
        ];
        for ((s, r, e), expected) in cases {
            let pose = get_pose(&mut g, s, r, e);
            assert!(pose.approx_eq(&matrix(expected), EPS), "Get({s}).Wrt({r}).Ei({e}) = {pose:?}");
        }
    }

    #[test]
    fn set_in_foreign_axes_is_read_back_in_same_axes() {
        let mut g = FrameGraph::new("world");
        let opts = SetOptions::default();
        set_req("table", "world", "world", Pose::rotation_z(FRAC_PI_2).with_translation(3.0, 0.0, 0.0))
            .apply(&mut g, &opts)
            .unwrap();

        // One metre along world +X from the table, written in world axes.
        set_req("cup", "table", "world", Pose::from_translation(1.0, 0.0, 0.0)).apply(&mut g, &opts).unwrap();

        let in_world_axes = get_pose(&mut g, "cup", "table", "world");
        assert!(in_world_axes.approx_eq(&Pose::from_translation(1.0, 0.0, 0.0), EPS));

        // In the table's own axes (yawed +90°) that is its -Y direction.
        let in_table_axes = get_pose(&mut g, "cup", "table", "table");
        assert!(in_table_axes.approx_eq(
            &Pose::rotation_z(-FRAC_PI_2).with_translation(0.0, -1.0, 0.0),
            EPS
        ));

        let cup_in_world = get_pose(&mut g, "cup", "world", "world");
        assert!(cup_in_world.approx_eq(&Pose::from_translation(4.0, 0.0, 0.0), EPS));
    }

    #[test]
    fn set_expressed_in_subject_uses_its_orientation_before_the_move() {
        let mut g = FrameGraph::new("world");
        let opts = SetOptions::default();
        set_req("b", "world", "world", Pose::rotation_z(FRAC_PI_2).with_translation(1.0, 0.0, 0.0))
            .apply(&mut g, &opts)
            .unwrap();
        set_req("c", "b", "b", Pose::rotation_x(FRAC_PI_2).with_translation(0.0, 0.0, 5.0))
            .apply(&mut g, &opts)
            .unwrap();
        let as_pose = Pose::rotation_x(FRAC_PI_2).with_translation(0.0, 2.0, 0.0);

        // Ei is the subject itself: the numbers are read in b's axes as they
        // were before the Set, i.e. yawed +90° from world.
        set_req("b", "world", "b", as_pose).apply(&mut g, &opts).unwrap();
        let expected = Pose::rotation_z(FRAC_PI_2)
            .compose(&Pose::rotation_x(FRAC_PI_2))
            .with_translation(-2.0, 0.0, 0.0);
        assert!(get_pose(&mut g, "b", "world", "world").approx_eq(&expected, EPS));
        // b has turned, so reading back in its new axes gives other numbers.
        assert!(!get_pose(&mut g, "b", "world", "b").approx_eq(&as_pose, EPS));

        // Ei is a descendant of the subject: its pre-Set axes apply the same way.
        let c_axes = g.pose_wrt("c", "world").unwrap();
        set_req("b", "world", "c", as_pose).apply(&mut g, &opts).unwrap();
        let expected = as_pose.reexpressed(c_axes.rotation());
        assert!(get_pose(&mut g, "b", "world", "world").approx_eq(&expected, EPS));
        assert_eq!(g.frame("c").unwrap().parent(), Some("b"));
    }

    #[test]
    fn invalid_bottom_row_never_reaches_the_graph() {
        let err = Pose::from_matrix([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 2.0],
        ])
        .unwrap_err();
        assert!(matches!(err, WrtError::InvalidTransform(_)));
    }

    // ── set semantics ───────────────────────────────────────────────────────

    #[test]
    fn set_unknown_reference_fails_without_side_effects() {
        let mut g = FrameGraph::new("world");
        let before = g.clone();
        let err = set_req("cup", "shelf", "shelf", Pose::identity())
            .apply(&mut g, &SetOptions::default())
            .unwrap_err();
        assert!(matches!(err, WrtError::UnknownFrame(n) if n == "shelf"));
        assert_eq!(g, before);
    }

    #[test]
    fn set_can_create_missing_reference_under_root() {
        let mut g = FrameGraph::new("world");
        let opts = SetOptions {
            create_missing_reference: true,
        };
        set_req("cup", "shelf", "shelf", Pose::from_translation(0.0, 0.0, 1.0)).apply(&mut g, &opts).unwrap();
        assert_eq!(g.frame("shelf").unwrap().parent(), Some("world"));
        assert_eq!(g.frame("cup").unwrap().parent(), Some("shelf"));
    }

    #[test]
    fn set_unknown_expressed_in_fails() {
        let mut g = FrameGraph::new("world");
        let err = set_req("cup", "world", "ghost", Pose::identity())
            .apply(&mut g, &SetOptions::default())
            .unwrap_err();
        assert!(matches!(err, WrtError::UnknownFrame(n) if n == "ghost"));
        assert!(!g.contains("cup"));
    }

    #[test]
    fn set_root_is_rejected_and_graph_unchanged() {
        let mut g = FrameGraph::new("world");
        let opts = SetOptions::default();
        set_req("table", "world", "world", Pose::identity()).apply(&mut g, &opts).unwrap();
        let before = g.clone();
        let err = set_req("world", "table", "table", Pose::identity()).apply(&mut g, &opts).unwrap_err();
        assert!(matches!(err, WrtError::CycleDetected { .. }));
        assert_eq!(g, before);
    }

    #[test]
    fn set_under_descendant_reports_detached_frame() {
        let mut g = FrameGraph::new("world");
        let opts = SetOptions::default();
        set_req("arm", "world", "world", Pose::identity()).apply(&mut g, &opts).unwrap();
        set_req("gripper", "arm", "arm", Pose::from_translation(0.0, 0.0, 1.0)).apply(&mut g, &opts).unwrap();

        let outcome = set_req("arm", "gripper", "gripper", Pose::identity()).apply(&mut g, &opts).unwrap();
        assert_eq!(
            outcome,
            Outcome::Updated {
                detached: Some("gripper".to_string())
            }
        );
        assert_eq!(g.frame("gripper").unwrap().parent(), Some("world"));
        g.validate().unwrap();
    }

    #[test]
    fn get_never_creates_frames() {
        let mut g = FrameGraph::new("world");
        let req = Request::builder().get("ghost").wrt("world").ei("world").build().unwrap();
        let err = req.apply(&mut g, &SetOptions { create_missing_reference: true }).unwrap_err();
        assert!(matches!(err, WrtError::UnknownFrame(_)));
        assert_eq!(g.frame_count(), 1);
    }
}
