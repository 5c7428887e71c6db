//! Mesh triangles.
//!
//! Intersection uses the Möller-Trumbore algorithm. Triangles also clip
//! themselves against kd-tree cells, so the tree sees the tight bound of the
//! part of each triangle inside a cell rather than its full bound.

use std::sync::Arc;

use kdray_core::{CellSplit, ClipData, ClipOutcome, Collision, Material, Primitive, RayHit, SurfacePoint};
use kdray_math::{Aabb, DVec3, Ray};
use log::trace;

use crate::clip::{clip_box, clip_plane, PolyClip, Polygon};
use crate::mesh::Mesh;

const PARALLEL_EPSILON: f64 = 1e-12;

/// One face of a [`Mesh`].
pub struct Triangle {
    mesh: Arc<Mesh>,
    face: [usize; 3],
    /// Unit geometric normal.
    normal: DVec3,
    material: Arc<dyn Material>,
}

impl Triangle {
    /// A stand-alone triangle.
    pub fn new(v0: DVec3, v1: DVec3, v2: DVec3, material: Arc<dyn Material>) -> Self {
        let mesh = Arc::new(Mesh::new(vec![v0, v1, v2], vec![0, 1, 2], None));
        Self::from_mesh(mesh, 0, material)
    }

    /// Face `face` of `mesh`.
    pub fn from_mesh(mesh: Arc<Mesh>, face: usize, material: Arc<dyn Material>) -> Self {
        let i = &mesh.indices[face * 3..face * 3 + 3];
        let face = [i[0] as usize, i[1] as usize, i[2] as usize];
        let [a, b, c] = face.map(|v| mesh.positions[v]);
        let normal = (b - a).cross(c - a).try_normalize().unwrap_or(DVec3::Z);
        Self {
            mesh,
            face,
            normal,
            material,
        }
    }

    pub fn vertices(&self) -> [DVec3; 3] {
        self.face.map(|v| self.mesh.positions[v])
    }

    pub fn normal(&self) -> DVec3 {
        self.normal
    }

    fn box_clip(&self, cell: &Aabb) -> ClipOutcome<ClipData> {
        match clip_box(&self.vertices(), cell) {
            PolyClip::Empty => ClipOutcome::Empty,
            PolyClip::Degenerate => {
                trace!("Triangle box clip degenerated");
                ClipOutcome::Unsupported
            }
            PolyClip::Clipped(poly, bound) => ClipOutcome::Clipped(bound, Arc::new(poly) as ClipData),
        }
    }
}

impl Primitive for Triangle {
    fn bound(&self) -> Aabb {
        Aabb::from_points(self.vertices())
    }

    fn intersect(&self, ray: &Ray) -> Option<RayHit> {
        let [a, b, c] = self.vertices();
        let edge1 = b - a;
        let edge2 = c - a;

        let pvec = ray.direction.cross(edge2);
        let det = edge1.dot(pvec);
        if det.abs() < PARALLEL_EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;

        let tvec = ray.origin - a;
        let u = tvec.dot(pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let qvec = tvec.cross(edge1);
        let v = ray.direction.dot(qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = edge2.dot(qvec) * inv_det;
        if t <= ray.t_min {
            return None;
        }
        Some(RayHit::with_user_data(t, [u, v, 0.0]))
    }

    fn surface(&self, collision: &Collision<'_>) -> SurfacePoint {
        let [u, v, _] = collision.user_data;
        let w = 1.0 - u - v;
        let [a, b, c] = self.vertices();

        let normal = match &self.mesh.normals {
            Some(normals) if self.mesh.has_normals() => {
                let [na, nb, nc] = self.face.map(|i| normals[i]);
                (na * w + nb * u + nc * v)
                    .try_normalize()
                    .unwrap_or(self.normal)
            }
            _ => self.normal,
        };

        let mut sp = SurfacePoint::new(Arc::clone(&self.material), collision.point(), normal);
        sp.geometric_normal = self.normal;
        sp.has_orco = false;

        match &self.mesh.uvs {
            Some(uvs) if self.mesh.has_uvs() => {
                let [ta, tb, tc] = self.face.map(|i| uvs[i]);
                let uv = ta * w + tb * u + tc * v;
                sp.has_uv = true;
                sp.u = uv.x;
                sp.v = uv.y;

                let du1 = tb - ta;
                let du2 = tc - ta;
                let det = du1.x * du2.y - du1.y * du2.x;
                if det.abs() > PARALLEL_EPSILON {
                    let inv = 1.0 / det;
                    sp.dp_du = ((b - a) * du2.y - (c - a) * du1.y) * inv;
                    sp.dp_dv = ((c - a) * du1.x - (b - a) * du2.x) * inv;
                }
            }
            _ => {
                sp.u = u;
                sp.v = v;
                sp.dp_du = b - a;
                sp.dp_dv = c - a;
            }
        }
        sp
    }

    fn material(&self) -> Arc<dyn Material> {
        Arc::clone(&self.material)
    }

    fn clip(
        &self,
        cell: &Aabb,
        split: Option<CellSplit>,
        prior: Option<&ClipData>,
    ) -> ClipOutcome<ClipData> {
        let prior = prior.and_then(|data| (**data).downcast_ref::<Polygon>());
        let (Some(split), Some(poly)) = (split, prior) else {
            return self.box_clip(cell);
        };

        match clip_plane(poly, split.axis, split.plane(cell), split.lower_half) {
            PolyClip::Empty => ClipOutcome::Empty,
            PolyClip::Clipped(poly, bound) => ClipOutcome::Clipped(bound, Arc::new(poly) as ClipData),
            PolyClip::Degenerate => {
                trace!("Triangle plane clip degenerated, clipping against the whole cell");
                self.box_clip(cell)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::DebugMaterial;
    use kdray_core::{Intersecter, KdIntersecter, KdOptions, SimpleIntersecter};
    use kdray_math::{Axis, DVec2};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_point(rng: &mut StdRng, extent: f64) -> DVec3 {
        DVec3::new(
            rng.gen_range(-extent..extent),
            rng.gen_range(-extent..extent),
            rng.gen_range(-extent..extent),
        )
    }

    fn triangle() -> Triangle {
        Triangle::new(
            DVec3::new(-1.0, -1.0, -1.0),
            DVec3::new(1.0, -1.0, -1.0),
            DVec3::new(0.0, 1.0, -1.0),
            Arc::new(DebugMaterial),
        )
    }

    #[test]
    fn test_triangle_hit() {
        let tri = triangle();
        let ray = Ray::new(DVec3::ZERO, DVec3::NEG_Z);
        let hit = tri.intersect(&ray).unwrap();
        assert!((hit.t - 1.0).abs() < 1e-12);
        assert!((tri.normal() - DVec3::Z).length() < 1e-12);
    }

    #[test]
    fn test_triangle_miss() {
        let tri = triangle();
        assert!(tri.intersect(&Ray::new(DVec3::ZERO, DVec3::Z)).is_none());
        assert!(tri
            .intersect(&Ray::new(DVec3::new(5.0, 0.0, 0.0), DVec3::NEG_Z))
            .is_none());
        // Behind t_min.
        let ray = Ray::new(DVec3::ZERO, DVec3::NEG_Z).with_range(1.5, -1.0);
        assert!(tri.intersect(&ray).is_none());
    }

    #[test]
    fn test_surface_barycentrics() {
        let tri = triangle();
        let ray = Ray::new(DVec3::new(1.0, -1.0, 1.0), DVec3::NEG_Z);
        let hit = tri.intersect(&ray).unwrap();
        let [u, v, _] = hit.user_data;
        assert!((u - 1.0).abs() < 1e-12 && v.abs() < 1e-12);

        let coll = Collision::new(&tri, 0, ray, hit);
        let sp = tri.surface(&coll);
        assert!((sp.position - DVec3::new(1.0, -1.0, -1.0)).length() < 1e-12);
        assert!(!sp.has_uv);
    }

    #[test]
    fn test_smooth_normals_and_uvs() {
        let mut mesh = Mesh::plane(DVec3::ZERO, 2.0);
        mesh.normals = Some(vec![DVec3::Y; 4]);
        let mesh = Arc::new(mesh);
        let tri = Triangle::from_mesh(Arc::clone(&mesh), 0, Arc::new(DebugMaterial));
        let ray = Ray::new(DVec3::new(-0.5, 1.0, 0.5), DVec3::NEG_Y);
        let hit = tri.intersect(&ray).unwrap();
        let sp = tri.surface(&Collision::new(&tri, 0, ray, hit));
        assert!(sp.has_uv);
        assert!((DVec2::new(sp.u, sp.v) - DVec2::new(0.25, 0.75)).length() < 1e-12);
        assert!((sp.normal - DVec3::Y).length() < 1e-12);
    }

    #[test]
    fn test_clip_without_prior_uses_box() {
        let tri = triangle();
        let cell = Aabb::new(DVec3::new(0.0, -2.0, -2.0), DVec3::new(2.0, 2.0, 2.0));
        let ClipOutcome::Clipped(bound, _) = tri.clip(&cell, None, None) else {
            panic!("expected a clip");
        };
        assert!((bound.min.x - 0.0).abs() < 1e-12);
        assert!((bound.max.x - 1.0).abs() < 1e-12);
        assert!((bound.max.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_clip_chains_prior_polygon() {
        let tri = triangle();
        let right_half = Aabb::new(DVec3::new(0.0, -2.0, -2.0), DVec3::new(2.0, 2.0, 2.0));
        let ClipOutcome::Clipped(_, data) = tri.clip(&right_half, None, None) else {
            panic!("expected a clip");
        };

        // Lower quarter: below y = 0 inside the right half.
        let cell = Aabb::new(DVec3::new(0.0, -2.0, -2.0), DVec3::new(2.0, 0.0, 2.0));
        let split = CellSplit {
            axis: Axis::Y,
            lower_half: true,
        };
        let ClipOutcome::Clipped(bound, _) = tri.clip(&cell, Some(split), Some(&data)) else {
            panic!("expected a clip");
        };
        assert!((bound.max.y - 0.0).abs() < 1e-12);
        assert!((bound.min.x - 0.0).abs() < 1e-12);
        assert!((bound.max.x - 1.0).abs() < 1e-12);

        // Cell far above the triangle.
        let above = Aabb::new(DVec3::new(0.0, 1.5, -2.0), DVec3::new(2.0, 2.0, 2.0));
        let split = CellSplit {
            axis: Axis::Y,
            lower_half: false,
        };
        assert!(matches!(
            tri.clip(&above, Some(split), Some(&data)),
            ClipOutcome::Empty
        ));
    }

    #[test]
    fn test_clipped_tree_matches_linear_scan() {
        let mut rng = StdRng::seed_from_u64(42);
        let material: Arc<dyn Material> = Arc::new(DebugMaterial);
        let triangles: Vec<Arc<dyn Primitive>> = (0..300)
            .map(|_| {
                let center = random_point(&mut rng, 10.0);
                let [a, b, c] = [(); 3].map(|_| center + random_point(&mut rng, 1.5));
                Arc::new(Triangle::new(a, b, c, Arc::clone(&material))) as Arc<dyn Primitive>
            })
            .collect();

        let options = KdOptions::default();
        assert!(options.clip_threshold > 0);
        let kd = KdIntersecter::new(triangles.clone(), &options).unwrap();
        let simple = SimpleIntersecter::new(triangles);
        assert!(kd.tree().depth() > 0);

        for _ in 0..3000 {
            let origin = random_point(&mut rng, 15.0);
            let target = random_point(&mut rng, 5.0);
            let ray = Ray::new(origin, (target - origin).normalize()).with_range(1e-6, -1.0);

            let a = kd.intersect(&ray, f64::INFINITY).map(|c| (c.index, c.t));
            let b = simple.intersect(&ray, f64::INFINITY).map(|c| (c.index, c.t));
            assert_eq!(a, b, "ray {ray:?}");
            assert_eq!(
                kd.is_shadowed(&ray, 12.0),
                simple.is_shadowed(&ray, 12.0),
                "ray {ray:?}"
            );
        }
    }
}
