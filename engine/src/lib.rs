//! Geometry and replication engine for a shared virtual tabletop.
//!
//! A scenario is a set of maps and pieces placed in 3-D space. This crate
//! snaps their transforms to square and hex grids, tracks fog of war per map,
//! groups maps into levels by elevation, resolves movement paths, computes
//! roster values, and applies the replicated action stream that keeps every
//! peer's copy of the scenario in step. Rendering, transport, and storage are
//! the host's job; everything here is a synchronous function of its inputs.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`geom`] | `Vector3` / `Euler` value types and rotation |
//! | [`grid`] | Square and hex cell math, placement spirals |
//! | [`metadata`] | Typed map and piece properties with validation |
//! | [`snap`] | Snapping map and piece transforms to a grid |
//! | [`fog`] | Fog-of-war bitmaps and their map-space mapping |
//! | [`doc`] | Maps, pieces, sparse patches, attachment chains |
//! | [`level`] | Grouping maps into levels by elevation |
//! | [`path`] | Movement path resolution and its memo |
//! | [`roster`] | Piece roster columns, values and sort keys |
//! | [`hit`] | Which map lies under a point |
//! | [`action`] | Replicated actions, peer keys and the reducer |
//! | [`snapshot`] | GM / player documents and legacy upgrades on load |
//! | [`tabletop`] | Tabletop settings and access control |
//! | [`consts`] | Shared numeric constants |

pub mod action;
pub mod consts;
pub mod doc;
pub mod fog;
pub mod geom;
pub mod grid;
pub mod hit;
pub mod level;
pub mod metadata;
pub mod path;
pub mod roster;
pub mod snap;
pub mod snapshot;
pub mod tabletop;
