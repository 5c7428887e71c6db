//! The primitive interface and the records passed between intersection and shading.

use std::any::Any;
use std::sync::Arc;

use kdray_math::{orthonormal_basis, Aabb, DVec3, Ray};

use crate::kdtree::{CellSplit, ClipOutcome};
use crate::material::Material;

/// Opaque values a primitive hands from `intersect` to `surface`
/// (barycentrics, parametric coordinates).
pub type UserData = [f64; 3];

/// Type-erased clipping state, owned by whichever primitive produced it.
pub type ClipData = Arc<dyn Any + Send + Sync>;

/// A primitive's own report of a ray hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub t: f64,
    pub user_data: UserData,
}

impl RayHit {
    pub fn new(t: f64) -> Self {
        Self {
            t,
            user_data: [0.0; 3],
        }
    }

    pub fn with_user_data(t: f64, user_data: UserData) -> Self {
        Self { t, user_data }
    }
}

/// A hit found by an intersecter.
#[derive(Clone, Copy)]
pub struct Collision<'a> {
    pub primitive: &'a dyn Primitive,
    /// Position of the primitive in the intersecter's list.
    pub index: usize,
    pub ray: Ray,
    pub t: f64,
    pub user_data: UserData,
}

impl<'a> Collision<'a> {
    pub fn new(primitive: &'a dyn Primitive, index: usize, ray: Ray, hit: RayHit) -> Self {
        Self {
            primitive,
            index,
            ray,
            t: hit.t,
            user_data: hit.user_data,
        }
    }

    /// World-space hit position.
    pub fn point(&self) -> DVec3 {
        self.ray.at(self.t)
    }

    /// Asks the primitive for the shading frame at the hit.
    pub fn surface(&self) -> SurfacePoint {
        let mut sp = self.primitive.surface(self);
        sp.primitive = self.index;
        sp
    }
}

impl std::fmt::Debug for Collision<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collision")
            .field("index", &self.index)
            .field("t", &self.t)
            .field("user_data", &self.user_data)
            .finish()
    }
}

/// Geometric and shading frame at a hit.
#[derive(Clone)]
pub struct SurfacePoint {
    pub material: Arc<dyn Material>,
    pub position: DVec3,
    /// Shading normal.
    pub normal: DVec3,
    pub geometric_normal: DVec3,
    pub orco_position: DVec3,
    pub orco_normal: DVec3,
    pub has_orco: bool,
    pub has_uv: bool,
    pub u: f64,
    pub v: f64,
    /// Tangents completing the shading frame.
    pub nu: DVec3,
    pub nv: DVec3,
    pub dp_du: DVec3,
    pub dp_dv: DVec3,
    /// Index of the primitive that was hit, in the intersecter's list.
    pub primitive: usize,
}

impl SurfacePoint {
    /// A frame with no UVs or original coordinates, tangents derived from `normal`.
    pub fn new(material: Arc<dyn Material>, position: DVec3, normal: DVec3) -> Self {
        let (nu, nv) = orthonormal_basis(normal);
        Self {
            material,
            position,
            normal,
            geometric_normal: normal,
            orco_position: position,
            orco_normal: normal,
            has_orco: false,
            has_uv: false,
            u: 0.0,
            v: 0.0,
            nu,
            nv,
            dp_du: nu,
            dp_dv: nv,
            primitive: 0,
        }
    }
}

/// Anything a ray can hit.
pub trait Primitive: Send + Sync {
    /// World-space bound.
    fn bound(&self) -> Aabb;

    /// Hit along `ray` with `t > ray.t_min`, if any.
    fn intersect(&self, ray: &Ray) -> Option<RayHit>;

    /// Shading frame for a hit this primitive reported.
    fn surface(&self, collision: &Collision<'_>) -> SurfacePoint;

    fn material(&self) -> Arc<dyn Material>;

    /// Bound of the part of the primitive inside `cell`.
    ///
    /// Primitives that cannot clip keep the default.
    fn clip(
        &self,
        _cell: &Aabb,
        _split: Option<CellSplit>,
        _prior: Option<&ClipData>,
    ) -> ClipOutcome<ClipData> {
        ClipOutcome::Unsupported
    }
}

/// Views a primitive, sized or not, as a trait object.
pub trait AsPrimitive {
    fn as_primitive(&self) -> &dyn Primitive;
}

impl<T: Primitive> AsPrimitive for T {
    fn as_primitive(&self) -> &dyn Primitive {
        self
    }
}

impl AsPrimitive for dyn Primitive {
    fn as_primitive(&self) -> &dyn Primitive {
        self
    }
}
