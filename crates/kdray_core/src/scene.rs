//! Scene container and the update pipeline.
//!
//! Mutations only mark what changed. [`Scene::update`] does the expensive
//! work (collecting primitives, building the intersecter, re-seating lights)
//! and must run before any ray query or render.

use std::collections::BTreeMap;
use std::sync::Arc;

use kdray_math::{Aabb, DVec3, Ray};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::background::Background;
use crate::camera::Camera;
use crate::error::{SceneError, SceneResult};
use crate::intersect::{Intersecter, Partitioner};
use crate::light::Light;
use crate::object::{Object3D, ObjectId};
use crate::primitive::{Collision, Primitive};
use crate::volume::VolumeRegion;

/// Which parts of the scene need work on the next update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeSet {
    pub objects: bool,
    pub lights: bool,
    pub other: bool,
}

impl ChangeSet {
    pub const ALL: ChangeSet = ChangeSet {
        objects: true,
        lights: true,
        other: true,
    };

    pub fn is_clear(&self) -> bool {
        !(self.objects || self.lights || self.other)
    }

    pub fn clear(&mut self) {
        *self = ChangeSet::default();
    }
}

/// Antialiasing parameters consumed by integrators and drivers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Antialiasing {
    pub samples: u32,
    pub passes: u32,
    /// Samples added on each pass after the first.
    pub inc_samples: u32,
    pub threshold: f64,
}

impl Default for Antialiasing {
    fn default() -> Self {
        Self {
            samples: 1,
            passes: 1,
            inc_samples: 1,
            threshold: 0.05,
        }
    }
}

impl Antialiasing {
    /// Clamps `samples` to at least one; a zero `inc_samples` means "same as
    /// `samples`".
    pub fn new(samples: u32, passes: u32, inc_samples: u32, threshold: f64) -> Self {
        let samples = samples.max(1);
        Self {
            samples,
            passes,
            inc_samples: if inc_samples > 0 { inc_samples } else { samples },
            threshold,
        }
    }
}

/// Everything that defines the environment to render.
pub struct Scene {
    changes: ChangeSet,
    next_id: u32,

    objects: BTreeMap<ObjectId, Box<dyn Object3D>>,
    volumes: Vec<Box<dyn VolumeRegion>>,
    lights: Vec<Box<dyn Light>>,
    camera: Option<Box<dyn Camera>>,
    background: Option<Box<dyn Background>>,

    partitioner: Partitioner,
    intersecter: Option<Box<dyn Intersecter>>,
    bound: Aabb,
    antialiasing: Antialiasing,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            changes: ChangeSet::ALL,
            next_id: 1,
            objects: BTreeMap::new(),
            volumes: Vec::new(),
            lights: Vec::new(),
            camera: None,
            background: None,
            partitioner: Partitioner::default(),
            intersecter: None,
            bound: Aabb::ZERO,
            antialiasing: Antialiasing::default(),
        }
    }

    pub fn changes(&self) -> ChangeSet {
        self.changes
    }

    /// Adds an object and returns its id. Ids start at 1.
    pub fn add_object(&mut self, object: Box<dyn Object3D>) -> SceneResult<ObjectId> {
        let id = ObjectId(self.next_id);
        if self.objects.contains_key(&id) {
            return Err(SceneError::AllocatedIdCollision(id));
        }
        self.objects.insert(id, object);
        self.next_id += 1;
        self.changes.objects = true;
        Ok(id)
    }

    pub fn remove_object(&mut self, id: ObjectId) -> Option<Box<dyn Object3D>> {
        let removed = self.objects.remove(&id);
        if removed.is_some() {
            self.changes.objects = true;
        }
        removed
    }

    pub fn object(&self, id: ObjectId) -> Option<&dyn Object3D> {
        self.objects.get(&id).map(|o| o.as_ref())
    }

    /// Objects in id order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &dyn Object3D)> + '_ {
        self.objects.iter().map(|(id, o)| (*id, o.as_ref()))
    }

    pub fn add_light(&mut self, light: Box<dyn Light>) {
        self.lights.push(light);
        self.changes.lights = true;
    }

    pub fn lights(&self) -> &[Box<dyn Light>] {
        &self.lights
    }

    pub fn add_volume_region(&mut self, region: Box<dyn VolumeRegion>) {
        self.volumes.push(region);
        self.changes.other = true;
    }

    pub fn volume_regions(&self) -> &[Box<dyn VolumeRegion>] {
        &self.volumes
    }

    pub fn set_camera(&mut self, camera: Box<dyn Camera>) {
        self.camera = Some(camera);
        self.changes.other = true;
    }

    pub fn camera(&self) -> Option<&dyn Camera> {
        self.camera.as_deref()
    }

    /// Replaces the background. Its light, if any, is re-seated on update.
    pub fn set_background(&mut self, background: Box<dyn Background>) {
        self.background = Some(background);
        self.changes.other = true;
        self.changes.lights = true;
    }

    pub fn background(&self) -> Option<&dyn Background> {
        self.background.as_deref()
    }

    pub fn set_antialiasing(&mut self, antialiasing: Antialiasing) {
        self.antialiasing = antialiasing;
    }

    pub fn antialiasing(&self) -> Antialiasing {
        self.antialiasing
    }

    /// Chooses the acceleration structure used from the next update on.
    pub fn set_partitioner(&mut self, partitioner: Partitioner) {
        self.partitioner = partitioner;
        self.changes.objects = true;
    }

    pub fn partitioner(&self) -> &Partitioner {
        &self.partitioner
    }

    /// Bound of every visible primitive, as of the last update.
    pub fn bound(&self) -> Aabb {
        self.bound
    }

    /// Brings derived state up to date with the recorded changes.
    ///
    /// Does nothing when no change is pending.
    pub fn update(&mut self) -> SceneResult<()> {
        if self.changes.is_clear() {
            return Ok(());
        }
        if self.camera.is_none() {
            return Err(SceneError::MissingCamera);
        }
        debug!("Performing scene update");

        if self.changes.objects {
            self.intersecter = None;
            let prims: Vec<Arc<dyn Primitive>> = self
                .objects
                .values()
                .filter(|o| o.visible())
                .flat_map(|o| o.primitives())
                .collect();
            debug!("Geometry collected, {} primitives", prims.len());

            let intersecter = self.partitioner.build(prims)?;
            self.bound = intersecter.bound();
            self.intersecter = Some(intersecter);
        }

        if self.changes.lights {
            let mut lights = std::mem::take(&mut self.lights);
            for light in &mut lights {
                light.set_scene(self);
            }
            let mut background = self.background.take();
            if let Some(light) = background.as_mut().and_then(|bg| bg.light_mut()) {
                light.set_scene(self);
            }
            self.lights = lights;
            self.background = background;
            debug!("Set up {} lights", self.lights.len());
        }

        self.changes.clear();
        Ok(())
    }

    /// Nearest hit with `ray.t_min < t <= dist`.
    ///
    /// A negative `dist` means "use `ray.t_max`", itself unbounded when negative.
    pub fn intersect(&self, ray: &Ray, dist: f64) -> Option<Collision<'_>> {
        let Some(intersecter) = &self.intersecter else {
            warn!("intersect called without an update");
            return None;
        };
        intersecter.intersect(ray, Self::query_distance(ray, dist))
    }

    /// Whether anything blocks `ray` with `ray.t_min < t < dist`.
    ///
    /// `dist` follows the same convention as [`Scene::intersect`].
    pub fn shadowed(&self, ray: &Ray, dist: f64) -> bool {
        let Some(intersecter) = &self.intersecter else {
            warn!("shadowed called without an update");
            return false;
        };
        intersecter.is_shadowed(ray, Self::query_distance(ray, dist))
    }

    /// Whether the segment from `from` to `to` is blocked, ignoring `bias`
    /// (a fraction of the segment) at both ends.
    pub fn is_shadowed_between(&self, from: DVec3, to: DVec3, bias: f64) -> bool {
        let ray = Ray::new(from, to - from).with_range(bias, 1.0 - bias);
        self.shadowed(&ray, -1.0)
    }

    fn query_distance(ray: &Ray, dist: f64) -> f64 {
        if dist >= 0.0 {
            dist
        } else {
            ray.max_distance()
        }
    }
}
