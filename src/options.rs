//! Loader configuration.
//!
//! All knobs that used to live in global loader state are collected here and
//! threaded through the pipeline as an explicit value.

use bon::Builder;

/// Which axis of the authored file is treated as "up".
///
/// 3DS containers are authored Z-up; the neutral model is Y-up, so every
/// 3-component vector read from the file is remapped `(x, y, z) -> (x, z, -y)`
/// unless the loader is told to keep the source convention.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UpAxis {
    /// Remap file vectors into a Y-up frame (the default).
    #[default]
    YUp,
    /// Keep the file's Z-up vectors untouched.
    ZUp,
}

/// Policy for the orientation-flip correction applied when a mesh matrix has
/// a negative determinant.
///
/// The source loader suppresses the flip when the object's immediate parent
/// is a `$$$DUMMY` placeholder node. Whether that rule is right for chains of
/// nested dummies was never established, so it is a policy here rather than
/// hardcoded behavior.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FlipPolicy {
    /// Flip whenever the determinant is negative, but suppress the flip when
    /// the immediate parent is a dummy node (source behavior, the default).
    #[default]
    SuppressUnderDummyParent,
    /// Always flip on a negative determinant.
    Always,
    /// Never apply the flip correction.
    Never,
}

/// Options controlling a single load call.
#[derive(Builder, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoadOptions {
    /// Up-axis remap applied to every vector read.
    #[builder(default)]
    pub up_axis: UpAxis,
    /// Rebuild parent/child links from node ids. When disabled every object
    /// becomes a root.
    #[builder(default = true)]
    pub resolve_hierarchy: bool,
    /// Run normal synthesis after baking.
    #[builder(default = true)]
    pub synthesize_normals: bool,
    /// Fold a non-identity pivot translation into each object's local matrix
    /// for consumers that ignore pivot offsets.
    #[builder(default = false)]
    pub bake_pivot: bool,
    /// Orientation-flip correction policy.
    #[builder(default)]
    pub flip_policy: FlipPolicy,
    /// Upper bound on distinct smoothing groups per geometry. The source
    /// format never exceeds 32 (one bit per group), but merged files have
    /// been seen with more; geometries over the limit skip synthesis.
    #[builder(default = 256)]
    pub max_smoothing_groups: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions::builder().build()
    }
}
