use std::fmt;
use std::sync::Arc;

use crate::primitive::Primitive;

/// Handle for an object added to a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A scene object: a source of primitives.
pub trait Object3D: Send + Sync {
    fn primitives(&self) -> Vec<Arc<dyn Primitive>>;

    /// Invisible objects contribute nothing to the acceleration structure.
    fn visible(&self) -> bool {
        true
    }
}

/// An object made of a single primitive.
pub struct PrimitiveObject {
    primitive: Arc<dyn Primitive>,
    visible: bool,
}

impl PrimitiveObject {
    pub fn new(primitive: Arc<dyn Primitive>) -> Self {
        Self {
            primitive,
            visible: true,
        }
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}

impl Object3D for PrimitiveObject {
    fn primitives(&self) -> Vec<Arc<dyn Primitive>> {
        vec![Arc::clone(&self.primitive)]
    }

    fn visible(&self) -> bool {
        self.visible
    }
}
