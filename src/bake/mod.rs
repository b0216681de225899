//! Post-parse passes that turn raw chunk data into a render-ready scene:
//! transform baking, normal synthesis, and animation track conversion.

pub mod anim;
pub mod normals;
pub mod transform;

pub use anim::{RotationSample, VectorSample, bake_animation};
pub use normals::{NormalError, synthesize_normals};
pub use transform::bake_transforms;
