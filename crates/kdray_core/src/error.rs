use thiserror::Error;

use crate::kdtree::BuildError;
use crate::object::ObjectId;

/// Errors surfaced by scene mutation and update.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("scene has no camera")]
    MissingCamera,

    /// The object table already held the id chosen for a new object.
    #[error("allocated object id {0} is already in use")]
    AllocatedIdCollision(ObjectId),

    #[error("failed to build acceleration structure: {0}")]
    Build(#[from] BuildError),
}

pub type SceneResult<T> = Result<T, SceneError>;
