use kdray_core::SceneError;
use thiserror::Error;

/// Errors surfaced by the render driver and image output.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error("failed to write image: {0}")]
    Image(#[from] image::ImageError),

    #[error("image is {width}x{height} but holds {len} pixels")]
    SizeMismatch {
        width: usize,
        height: usize,
        len: usize,
    },

    /// The acquirer thread panicked before the image was complete.
    #[error("image acquisition thread panicked")]
    Acquirer,
}

pub type RenderResult<T> = Result<T, RenderError>;
