//! `wrt-graph` – the frame-graph engine.
//!
//! Keeps a tree of named 3-D coordinate frames and answers "where is frame A
//! with respect to frame B, written in frame C's axes".
//!
//! # Modules
//!
//! - [`pose`] – [`Pose`][pose::Pose]: validated rigid transform with
//!   composition and inversion.
//! - [`graph`] – [`FrameGraph`][graph::FrameGraph]: the tree of frames,
//!   lowest-common-ancestor resolution and cycle-safe reparenting.
//! - [`facade`] – [`Request`][facade::Request] /
//!   [`RequestBuilder`][facade::RequestBuilder]: the Get/Set/Wrt/Ei/As
//!   surface.
//! - [`storage`] – [`WorldStore`][storage::WorldStore]: load/save boundary,
//!   [`execute`][storage::execute] and an in-memory store.
//! - [`shared`] – [`SharedFrameGraph`][shared::SharedFrameGraph]: read/write
//!   locked graph for long-running services.

pub mod facade;
pub mod graph;
pub mod pose;
pub mod shared;
pub mod storage;

pub use facade::{Operation, Outcome, Request, RequestBuilder, SetOptions};
pub use graph::{FrameGraph, FrameNode};
pub use pose::{Matrix4x4, Pose};
pub use shared::SharedFrameGraph;
pub use storage::{MemoryStore, WorldStore, execute, load_or_new};
pub use wrt_types::WrtError;
