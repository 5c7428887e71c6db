//! Render driver and stock scene parts for kdray.
//!
//! Provides the batched parallel driver and image acquisition, plus concrete
//! primitives, cameras, materials, lights and integrators that plug into the
//! interfaces of `kdray_core`.

mod bucket;
mod camera;
mod clip;
mod error;
mod image;
mod integrator;
mod light;
mod material;
mod mesh;
mod renderer;
mod sphere;
mod triangle;

pub use bucket::{generate_buckets, Bucket, DEFAULT_BUCKET_SIZE};
pub use camera::{concentric_disk, OrthographicCamera, PerspectiveCamera};
pub use clip::{clip_box, clip_plane, PolyClip, Polygon, MAX_VERTICES};
pub use error::{RenderError, RenderResult};
pub use image::Image;
pub use integrator::{
    AmbientOcclusion, DepthIntegrator, DirectLightIntegrator, PhotonKernel, TrivialIntegrator,
};
pub use light::{ConstantBackground, PointLight};
pub use material::{DebugMaterial, Lambert};
pub use mesh::{Mesh, MeshObject};
pub use renderer::{render, render_simple, render_simple_to, render_to, RenderSettings};
pub use sphere::Sphere;
pub use triangle::Triangle;
