//! Built-in demo scenes.

use std::sync::Arc;

use anyhow::Result;
use clap::ValueEnum;
use kdray_core::{Color, PrimitiveObject, Scene};
use kdray_math::DVec3;
use kdray_renderer::{ConstantBackground, Lambert, Mesh, MeshObject, PerspectiveCamera, PointLight, Sphere};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    /// Grid of spheres over a floor, lit by a point light.
    Spheres,
    /// One unit sphere at the origin seen from (0, 0, 5).
    Single,
    /// Nothing but a camera.
    Empty,
}

/// Builds `preset` with a camera of the given resolution.
pub fn build(preset: Preset, width: usize, height: usize) -> Result<Scene> {
    let mut scene = Scene::new();
    match preset {
        Preset::Spheres => spheres(&mut scene, width, height)?,
        Preset::Single => {
            scene.set_camera(Box::new(
                PerspectiveCamera::new(width, height).with_position(
                    DVec3::new(0.0, 0.0, 5.0),
                    DVec3::ZERO,
                    DVec3::Y,
                ),
            ));
            let material = Arc::new(Lambert::new(Color::new(0.8, 0.3, 0.2)));
            let sphere = Sphere::new(DVec3::ZERO, 1.0, material);
            scene.add_object(Box::new(PrimitiveObject::new(Arc::new(sphere))))?;
            scene.add_light(Box::new(PointLight::new(
                DVec3::new(2.0, 3.0, 5.0),
                Color::ONE,
                30.0,
            )));
        }
        Preset::Empty => {
            scene.set_camera(Box::new(PerspectiveCamera::new(width, height)));
        }
    }
    Ok(scene)
}

fn spheres(scene: &mut Scene, width: usize, height: usize) -> Result<()> {
    scene.set_camera(Box::new(
        PerspectiveCamera::new(width, height)
            .with_position(DVec3::new(0.0, 4.0, 12.0), DVec3::new(0.0, 0.5, 0.0), DVec3::Y)
            .with_fov(40.0),
    ));

    let floor = Arc::new(Mesh::plane(DVec3::new(0.0, -0.5, 0.0), 40.0));
    let floor_material = Arc::new(Lambert::new(Color::splat(0.6)).with_reflectivity(0.15));
    scene.add_object(Box::new(MeshObject::new(floor, floor_material)))?;

    for i in -3..=3 {
        for j in -3..=3 {
            let center = DVec3::new(i as f64 * 1.5, 0.0, j as f64 * 1.5);
            let tint = Color::new(
                0.3 + 0.1 * (i + 3) as f64,
                0.4,
                0.3 + 0.1 * (j + 3) as f64,
            );
            let reflectivity = if (i + j) % 3 == 0 { 0.5 } else { 0.0 };
            let material = Arc::new(Lambert::new(tint).with_reflectivity(reflectivity));
            let sphere = Sphere::new(center, 0.5, material);
            scene.add_object(Box::new(PrimitiveObject::new(Arc::new(sphere))))?;
        }
    }

    scene.add_light(Box::new(PointLight::new(
        DVec3::new(4.0, 8.0, 6.0),
        Color::new(1.0, 0.95, 0.9),
        120.0,
    )));
    scene.set_background(Box::new(ConstantBackground::new(Color::new(0.05, 0.07, 0.12))));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_build() {
        let mut spheres = build(Preset::Spheres, 16, 9).unwrap();
        assert_eq!(spheres.objects().count(), 50);
        assert_eq!(spheres.lights().len(), 1);
        spheres.update().unwrap();
        assert!(spheres.bound().size().y > 0.9);

        let mut empty = build(Preset::Empty, 4, 4).unwrap();
        empty.update().unwrap();
        assert_eq!(empty.objects().count(), 0);
    }
}
