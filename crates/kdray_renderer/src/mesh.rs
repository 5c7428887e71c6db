//! Indexed triangle meshes.

use std::sync::Arc;

use kdray_core::{Material, Object3D, Primitive};
use kdray_math::{Aabb, DVec2, DVec3};

use crate::triangle::Triangle;

/// Vertex positions, optional per-vertex normals and UVs, and triangle indices.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub positions: Vec<DVec3>,

    /// One normal per vertex, for smooth shading
    pub normals: Option<Vec<DVec3>>,

    pub uvs: Option<Vec<DVec2>>,

    /// Every 3 indices form a triangle, counter-clockwise seen from the front
    pub indices: Vec<u32>,

    pub bounds: Aabb,
}

impl Mesh {
    pub fn new(positions: Vec<DVec3>, indices: Vec<u32>, normals: Option<Vec<DVec3>>) -> Self {
        let bounds = Aabb::from_points(positions.iter().copied());
        Self {
            positions,
            normals,
            uvs: None,
            indices,
            bounds,
        }
    }

    pub fn with_uvs(mut self, uvs: Vec<DVec2>) -> Self {
        self.uvs = Some(uvs);
        self
    }

    /// A `size` x `size` square in the XZ plane at height `y`, facing +Y.
    pub fn plane(center: DVec3, size: f64) -> Self {
        let h = size / 2.0;
        let positions = vec![
            center + DVec3::new(-h, 0.0, -h),
            center + DVec3::new(-h, 0.0, h),
            center + DVec3::new(h, 0.0, h),
            center + DVec3::new(h, 0.0, -h),
        ];
        let uvs = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(0.0, 1.0),
            DVec2::new(1.0, 1.0),
            DVec2::new(1.0, 0.0),
        ];
        Self::new(positions, vec![0, 1, 2, 0, 2, 3], None).with_uvs(uvs)
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Replaces the normals with area-weighted averages of the face normals.
    pub fn compute_normals(&mut self) {
        let vertex_count = self.positions.len();
        let mut normals = vec![DVec3::ZERO; vertex_count];

        for face in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [face[0] as usize, face[1] as usize, face[2] as usize];
            if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
                continue;
            }
            let p0 = self.positions[i0];
            let face_normal = (self.positions[i1] - p0).cross(self.positions[i2] - p0);
            normals[i0] += face_normal;
            normals[i1] += face_normal;
            normals[i2] += face_normal;
        }

        for normal in &mut normals {
            *normal = normal.try_normalize().unwrap_or(DVec3::Y);
        }
        self.normals = Some(normals);
    }

    pub fn has_normals(&self) -> bool {
        self.normals
            .as_ref()
            .is_some_and(|n| n.len() == self.positions.len())
    }

    pub fn has_uvs(&self) -> bool {
        self.uvs
            .as_ref()
            .is_some_and(|uv| uv.len() == self.positions.len())
    }
}

/// Scene object exposing every face of a mesh as a [`Triangle`].
pub struct MeshObject {
    mesh: Arc<Mesh>,
    material: Arc<dyn Material>,
    visible: bool,
}

impl MeshObject {
    pub fn new(mesh: Arc<Mesh>, material: Arc<dyn Material>) -> Self {
        Self {
            mesh,
            material,
            visible: true,
        }
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    /// The faces as concrete triangles.
    pub fn triangles(&self) -> Vec<Arc<Triangle>> {
        (0..self.mesh.triangle_count())
            .map(|face| {
                Arc::new(Triangle::from_mesh(
                    Arc::clone(&self.mesh),
                    face,
                    Arc::clone(&self.material),
                ))
            })
            .collect()
    }
}

impl Object3D for MeshObject {
    fn primitives(&self) -> Vec<Arc<dyn Primitive>> {
        self.triangles()
            .into_iter()
            .map(|t| t as Arc<dyn Primitive>)
            .collect()
    }

    fn visible(&self) -> bool {
        self.visible
    }
}
