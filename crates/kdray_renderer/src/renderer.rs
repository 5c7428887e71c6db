//! The render driver.
//!
//! The image is split into buckets. Buckets are rendered in batches of
//! `workers`, each batch fanned out over the rayon pool and joined before the
//! next one starts. Every pixel becomes a [`Fragment`] sent over a bounded
//! channel to a single acquirer thread, which is the only writer of the
//! [`Image`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, SyncSender};
use std::sync::Arc;
use std::time::Instant;

use kdray_core::{Camera, Fragment, Integrator, RenderState, Rgba, Scene, SceneError};
use kdray_math::{DVec3, DifferentialRay};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::bucket::{generate_buckets, DEFAULT_BUCKET_SIZE};
use crate::error::{RenderError, RenderResult};
use crate::image::Image;

/// Driver configuration.
///
/// Samples per pixel come from the scene's antialiasing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Buckets rendered concurrently per batch.
    pub workers: usize,
    pub bucket_size: usize,
    /// Fragments buffered between the workers and the acquirer.
    pub channel_capacity: usize,
    /// Mixed into every pixel's PRNG seed.
    pub seed: u64,
    #[serde(skip)]
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            workers: 16,
            bucket_size: DEFAULT_BUCKET_SIZE,
            channel_capacity: 100,
            seed: 0,
            cancel: None,
        }
    }
}

impl RenderSettings {
    /// Stops the render at the next pixel once `flag` is set.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Updates the scene, preprocesses the integrator and renders in batches.
pub fn render(
    scene: &mut Scene,
    integrator: &mut dyn Integrator,
    settings: &RenderSettings,
) -> RenderResult<Image> {
    prepare(scene, integrator)?;
    let (scene, integrator) = (&*scene, &*integrator);
    acquire(scene, settings, |sink| render_to(scene, integrator, settings, sink))
}

/// Same as [`render`], one pixel at a time on the calling thread.
pub fn render_simple(
    scene: &mut Scene,
    integrator: &mut dyn Integrator,
    settings: &RenderSettings,
) -> RenderResult<Image> {
    prepare(scene, integrator)?;
    let (scene, integrator) = (&*scene, &*integrator);
    acquire(scene, settings, |sink| {
        render_simple_to(scene, integrator, settings, sink)
    })
}

/// Renders an updated scene in batches, sending every pixel to `sink`.
///
/// Returns once every batch has been joined. Stops early if the receiver
/// hangs up or the render is cancelled.
pub fn render_to(
    scene: &Scene,
    integrator: &dyn Integrator,
    settings: &RenderSettings,
    sink: &SyncSender<Fragment>,
) -> RenderResult<()> {
    let camera = scene.camera().ok_or(SceneError::MissingCamera)?;
    let (width, height) = (camera.resolution_x(), camera.resolution_y());
    let samples = scene.antialiasing().samples;

    let buckets = generate_buckets(width, height, settings.bucket_size.max(1));
    let batch_size = settings.workers.max(1);
    let batches = buckets.len().div_ceil(batch_size);

    for (i, batch) in buckets.chunks(batch_size).enumerate() {
        if settings.cancelled() {
            info!("Render cancelled after {i}/{batches} batches");
            break;
        }
        batch.par_iter().for_each_with(sink.clone(), |tx, bucket| {
            for (x, y) in bucket.pixels() {
                if settings.cancelled() {
                    return;
                }
                let color = render_pixel(scene, camera, integrator, settings.seed, samples, x, y);
                if tx.send(Fragment { x, y, color }).is_err() {
                    return;
                }
            }
        });
        info!("batch {}/{}", i + 1, batches);
    }
    Ok(())
}

/// Renders an updated scene row by row on the calling thread.
pub fn render_simple_to(
    scene: &Scene,
    integrator: &dyn Integrator,
    settings: &RenderSettings,
    sink: &SyncSender<Fragment>,
) -> RenderResult<()> {
    let camera = scene.camera().ok_or(SceneError::MissingCamera)?;
    let samples = scene.antialiasing().samples;
    for y in 0..camera.resolution_y() {
        for x in 0..camera.resolution_x() {
            if settings.cancelled() {
                return Ok(());
            }
            let color = render_pixel(scene, camera, integrator, settings.seed, samples, x, y);
            if sink.send(Fragment { x, y, color }).is_err() {
                return Ok(());
            }
        }
    }
    Ok(())
}

fn prepare(scene: &mut Scene, integrator: &mut dyn Integrator) -> RenderResult<()> {
    let start = Instant::now();
    scene.update()?;
    info!("Scene updated in {:.2?}", start.elapsed());
    integrator.preprocess(scene);
    Ok(())
}

/// Runs `produce` against a channel drained by an acquirer thread, then
/// returns the acquired image.
fn acquire<F>(scene: &Scene, settings: &RenderSettings, produce: F) -> RenderResult<Image>
where
    F: FnOnce(&SyncSender<Fragment>) -> RenderResult<()>,
{
    let camera = scene.camera().ok_or(SceneError::MissingCamera)?;
    let (width, height) = (camera.resolution_x(), camera.resolution_y());
    let start = Instant::now();

    let (tx, rx) = sync_channel(settings.channel_capacity.max(1));
    let (result, acquired) = std::thread::scope(|s| {
        let acquirer = s.spawn(move || {
            let mut image = Image::new(width, height);
            let count = image.acquire(rx);
            (image, count)
        });
        let result = produce(&tx);
        drop(tx);
        (result, acquirer.join())
    });
    result?;
    let (image, count) = acquired.map_err(|_| RenderError::Acquirer)?;

    debug!("Acquired {count} fragments");
    info!("Rendered {width}x{height} in {:.2?}", start.elapsed());
    Ok(image)
}

/// Averages `samples` integrator calls for pixel `(x, y)`.
fn render_pixel(
    scene: &Scene,
    camera: &dyn Camera,
    integrator: &dyn Integrator,
    seed: u64,
    samples: u32,
    x: usize,
    y: usize,
) -> Rgba {
    let (width, height) = (camera.resolution_x(), camera.resolution_y());
    let pixel_number = y * width + x;

    let mut state = RenderState::new(pixel_seed(seed, pixel_number as u64));
    state.pixel_number = pixel_number;
    state.screen_pos = DVec3::new(
        2.0 * x as f64 / width as f64 - 1.0,
        -2.0 * y as f64 / height as f64 + 1.0,
        0.0,
    );

    let samples = samples.max(1);
    let mut sum = Rgba::TRANSPARENT;
    for sample in 0..samples {
        state.reset();
        state.pixel_sample = sample;

        let (dx, dy) = if sample == 0 {
            (0.5, 0.5)
        } else {
            (state.rng.gen::<f64>(), state.rng.gen::<f64>())
        };
        let (lens_u, lens_v) = if camera.sample_lens() {
            (state.rng.gen::<f64>(), state.rng.gen::<f64>())
        } else {
            (0.5, 0.5)
        };

        let (px, py) = (x as f64 + dx, y as f64 + dy);
        let (ray, weight) = camera.shoot_ray(px, py, lens_u, lens_v);
        if weight <= 0.0 {
            continue;
        }
        let (ray_x, _) = camera.shoot_ray(px + 1.0, py, lens_u, lens_v);
        let (ray_y, _) = camera.shoot_ray(px, py + 1.0, lens_u, lens_v);
        let ray = DifferentialRay::new(ray).with_differentials(&ray_x, &ray_y);

        sum += integrator.integrate(scene, &mut state, &ray) * weight;
    }
    sum / samples as f64
}

/// Seed for one pixel, stable across runs and thread schedules.
///
/// The render seed and pixel number fill separate words of the generator key,
/// so distinct pairs never share a key.
fn pixel_seed(seed: u64, pixel: u64) -> u64 {
    let mut key = <StdRng as SeedableRng>::Seed::default();
    key[..8].copy_from_slice(&seed.to_le_bytes());
    key[8..16].copy_from_slice(&pixel.to_le_bytes());
    StdRng::from_seed(key).gen()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::PerspectiveCamera;
    use crate::integrator::{DepthIntegrator, DirectLightIntegrator, TrivialIntegrator};
    use crate::light::{ConstantBackground, PointLight};
    use crate::material::Lambert;
    use crate::sphere::Sphere;
    use kdray_core::{Antialiasing, Color, PrimitiveObject};

    fn camera(width: usize, height: usize) -> Box<PerspectiveCamera> {
        Box::new(
            PerspectiveCamera::new(width, height).with_position(
                DVec3::new(0.0, 0.0, 5.0),
                DVec3::ZERO,
                DVec3::Y,
            ),
        )
    }

    fn single_sphere(size: usize) -> Scene {
        let mut scene = Scene::new();
        scene.set_camera(camera(size, size));
        let sphere = Sphere::new(DVec3::ZERO, 1.0, Arc::new(Lambert::new(Color::ONE)));
        scene
            .add_object(Box::new(PrimitiveObject::new(Arc::new(sphere))))
            .unwrap();
        scene
    }

    fn lit_spheres(samples: u32) -> Scene {
        let mut scene = Scene::new();
        scene.set_camera(camera(24, 16));
        for i in 0..5 {
            let x = i as f64 - 2.0;
            let material = Lambert::new(Color::new(0.2 * i as f64, 0.5, 0.8))
                .with_reflectivity(0.1 * i as f64);
            let sphere = Sphere::new(DVec3::new(x, 0.0, -(i as f64)), 0.6, Arc::new(material));
            scene
                .add_object(Box::new(PrimitiveObject::new(Arc::new(sphere))))
                .unwrap();
        }
        scene.add_light(Box::new(PointLight::new(DVec3::new(3.0, 4.0, 5.0), Color::ONE, 40.0)));
        scene.set_background(Box::new(ConstantBackground::new(Color::new(0.1, 0.1, 0.3))));
        scene.set_antialiasing(Antialiasing::new(samples, 1, 0, 0.05));
        scene
    }

    #[test]
    fn test_single_sphere_depth() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut scene = single_sphere(9);
        let image = render(&mut scene, &mut DepthIntegrator, &RenderSettings::default()).unwrap();

        // The center ray hits the sphere's front at t = 4.
        let center = image.get(4, 4);
        assert!((center.r - 0.25).abs() < 1e-9, "got {}", center.r);
        assert_eq!(center.a, 1.0);
        for (x, y) in [(0, 0), (8, 0), (0, 8), (8, 8)] {
            assert_eq!(image.get(x, y), Rgba::TRANSPARENT);
        }
    }

    #[test]
    fn test_empty_scene() {
        let mut scene = Scene::new();
        scene.set_camera(camera(5, 3));
        let image = render(&mut scene, &mut TrivialIntegrator, &RenderSettings::default()).unwrap();
        assert_eq!(image.pixels.len(), 15);
        assert!(image
            .pixels
            .iter()
            .all(|&p| p == Rgba::new(0.1, 0.1, 0.1, 0.0)));
    }

    #[test]
    fn test_missing_camera() {
        let mut scene = Scene::new();
        let err = render(&mut scene, &mut TrivialIntegrator, &RenderSettings::default()).unwrap_err();
        assert!(matches!(err, RenderError::Scene(SceneError::MissingCamera)));
    }

    #[test]
    fn test_render_is_deterministic() {
        let settings = RenderSettings {
            seed: 9,
            bucket_size: 4,
            ..RenderSettings::default()
        };
        let mut a = lit_spheres(4);
        let mut b = lit_spheres(4);
        let first = render(&mut a, &mut DirectLightIntegrator::default(), &settings).unwrap();
        let second = render(&mut b, &mut DirectLightIntegrator::default(), &settings).unwrap();
        assert_eq!(first, second);
        assert!(first.pixels.iter().any(|p| p.r > 0.0));
    }

    #[test]
    fn test_simple_mode_matches_batched() {
        let settings = RenderSettings {
            workers: 3,
            bucket_size: 5,
            ..RenderSettings::default()
        };
        let mut scene = lit_spheres(3);
        let batched = render(&mut scene, &mut DirectLightIntegrator::default(), &settings).unwrap();
        let simple =
            render_simple(&mut scene, &mut DirectLightIntegrator::default(), &settings).unwrap();
        assert_eq!(batched, simple);
    }

    #[test]
    fn test_batching_does_not_change_the_image() {
        let mut scene = lit_spheres(2);
        let narrow = RenderSettings {
            workers: 1,
            bucket_size: 3,
            channel_capacity: 1,
            ..RenderSettings::default()
        };
        let wide = RenderSettings::default();
        let a = render(&mut scene, &mut DirectLightIntegrator::default(), &narrow).unwrap();
        let b = render(&mut scene, &mut DirectLightIntegrator::default(), &wide).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_seed_changes_jittered_samples() {
        let mut scene = lit_spheres(4);
        let a = render(&mut scene, &mut DirectLightIntegrator::default(), &RenderSettings::default())
            .unwrap();
        let other = RenderSettings {
            seed: 1,
            ..RenderSettings::default()
        };
        let b = render(&mut scene, &mut DirectLightIntegrator::default(), &other).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_cancelled_render_sends_nothing() {
        let flag = Arc::new(AtomicBool::new(true));
        let settings = RenderSettings::default().with_cancel(flag);
        let mut scene = single_sphere(8);
        let image = render(&mut scene, &mut TrivialIntegrator, &settings).unwrap();
        assert!(image.pixels.iter().all(|&p| p == Rgba::TRANSPARENT));
    }

    #[test]
    fn test_render_to_custom_sink() {
        let mut scene = single_sphere(6);
        scene.update().unwrap();
        let (tx, rx) = sync_channel(4);
        let handle = std::thread::spawn(move || rx.iter().collect::<Vec<Fragment>>());
        render_to(&scene, &TrivialIntegrator, &RenderSettings::default(), &tx).unwrap();
        drop(tx);
        let mut fragments = handle.join().unwrap();
        fragments.sort_by_key(|f| (f.y, f.x));
        assert_eq!(fragments.len(), 36);
        assert_eq!((fragments[0].x, fragments[0].y), (0, 0));
        assert_eq!((fragments[35].x, fragments[35].y), (5, 5));
    }

    #[test]
    fn test_settings_serde_defaults() {
        let settings: RenderSettings = serde_json::from_str(r#"{"workers": 4}"#).unwrap();
        assert_eq!(settings.workers, 4);
        assert_eq!(settings.bucket_size, DEFAULT_BUCKET_SIZE);
        assert_eq!(settings.channel_capacity, 100);
        assert!(settings.cancel.is_none());
    }

    #[test]
    fn test_pixel_seed_spreads() {
        assert_ne!(pixel_seed(0, 0), pixel_seed(0, 1));
        assert_ne!(pixel_seed(0, 5), pixel_seed(1, 5));
        assert_eq!(pixel_seed(3, 7), pixel_seed(3, 7));
        // Swapping seed and pixel number gives a different key.
        assert_ne!(pixel_seed(1, 2), pixel_seed(2, 1));

        let seeds: std::collections::HashSet<u64> = (0..1024).map(|p| pixel_seed(42, p)).collect();
        assert_eq!(seeds.len(), 1024);
    }
}
