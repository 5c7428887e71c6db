//! kdray core: the acceleration and intersection pipeline.
//!
//! This crate provides:
//!
//! - **Collaborator interfaces**: [`Primitive`], [`Material`], [`Light`],
//!   [`Camera`], [`Background`], [`VolumeRegion`], [`Object3D`], [`Integrator`]
//! - **kd-tree**: SAH construction with optional primitive clipping, and
//!   ordered ray traversal ([`kdtree`])
//! - **Scene**: object table, change tracking and the update pipeline
//! - **Photon map**: point kd-tree with bounded k-nearest-neighbour search
//!
//! # Example
//!
//! ```ignore
//! use kdray_core::{Scene, PrimitiveObject};
//!
//! let mut scene = Scene::new();
//! scene.set_camera(Box::new(camera));
//! scene.add_object(Box::new(PrimitiveObject::new(sphere)))?;
//! scene.update()?;
//! let hit = scene.intersect(&ray, -1.0);
//! ```

pub mod background;
pub mod camera;
pub mod color;
pub mod error;
pub mod integrator;
pub mod intersect;
pub mod kdtree;
pub mod light;
pub mod material;
pub mod object;
pub mod photon;
pub mod primitive;
pub mod scene;
pub mod state;
pub mod volume;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use background::Background;
pub use camera::Camera;
pub use color::{Color, Rgba};
pub use error::{SceneError, SceneResult};
pub use integrator::Integrator;
pub use intersect::{Intersecter, KdIntersecter, Partitioner, PrimitiveList, SimpleIntersecter};
pub use kdtree::{BuildError, BuildResult, CellSplit, ClipOutcome, KdData, KdOptions, KdTree};
pub use light::{Light, LightSample};
pub use material::Material;
pub use object::{Object3D, ObjectId, PrimitiveObject};
pub use photon::{GatherResult, Photon, PhotonList, PhotonMap};
pub use primitive::{AsPrimitive, ClipData, Collision, Primitive, RayHit, SurfacePoint, UserData};
pub use scene::{Antialiasing, ChangeSet, Scene};
pub use state::{Fragment, RenderState};
pub use volume::VolumeRegion;
