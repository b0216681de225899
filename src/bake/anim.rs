//! Converts sparse per-axis track samples into the neutral keyframe model.
//!
//! Rotation samples arrive as relative angle-axis pairs. Each sample is
//! composed onto the accumulated rotation matrix and the result decomposed
//! into Euler angles with an atan2-based extraction; the sample's own axis
//! breaks the tie when the extraction hits the gimbal-lock ambiguity.

use std::f32::consts::FRAC_PI_2;

use glam::{Mat3, Vec3};

use crate::scene::Animation;

/// One position or scale sample from a track chunk.
#[derive(Clone, Copy, Debug)]
pub struct VectorSample {
    /// Frame time.
    pub time: f32,
    pub value: Vec3,
    pub tension: f32,
}

/// One rotation sample: an angle-axis step relative to the previous key.
#[derive(Clone, Copy, Debug)]
pub struct RotationSample {
    pub time: f32,
    /// Radians.
    pub angle: f32,
    pub axis: Vec3,
    pub tension: f32,
}

/// Build the three-axis track model from raw samples. Returns `None` when no
/// track carries any sample, so objects without animation stay unanimated.
pub fn bake_animation(
    position: &[VectorSample],
    rotation: &[RotationSample],
    scaling: &[VectorSample],
) -> Option<Animation> {
    if position.is_empty() && rotation.is_empty() && scaling.is_empty() {
        return None;
    }

    let mut animation = Animation::default();
    for sample in position {
        animation
            .position
            .insert(sample.time, sample.value, sample.tension);
    }
    for sample in scaling {
        animation
            .scaling
            .insert(sample.time, sample.value, sample.tension);
    }

    let mut accumulated = Mat3::IDENTITY;
    for sample in rotation {
        let axis = sample.axis.normalize_or_zero();
        if axis != Vec3::ZERO {
            accumulated = Mat3::from_axis_angle(axis, sample.angle) * accumulated;
        }
        let euler = matrix_to_euler(accumulated, axis);
        animation
            .rotation
            .insert(sample.time, euler, sample.tension);
    }

    Some(animation)
}

/// Decompose a rotation matrix into XYZ Euler angles (`R = Rx * Ry * Rz`).
///
/// At the gimbal singularity the X and Z angles collapse into one twist
/// term; the twist is assigned to whichever principal axis the incoming
/// rotation axis leans toward.
fn matrix_to_euler(m: Mat3, hint_axis: Vec3) -> Vec3 {
    let sy = m.z_axis.x.clamp(-1.0, 1.0);
    let cy = (1.0 - sy * sy).sqrt();
    if cy > 1e-4 {
        Vec3::new(
            (-m.z_axis.y).atan2(m.z_axis.z),
            sy.atan2(cy),
            (-m.y_axis.x).atan2(m.x_axis.x),
        )
    } else {
        let twist = m.x_axis.y.atan2(m.y_axis.y);
        if hint_axis.x.abs() >= hint_axis.z.abs() {
            Vec3::new(twist, FRAC_PI_2.copysign(sy), 0.0)
        } else {
            Vec3::new(0.0, FRAC_PI_2.copysign(sy), twist)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    use super::*;

    fn assert_close(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-5, "{a} != {b}");
    }

    #[test]
    fn empty_tracks_yield_no_animation() {
        assert!(bake_animation(&[], &[], &[]).is_none());
    }

    #[test]
    fn principal_axis_rotations_map_to_single_components() {
        for (axis, expected) in [
            (Vec3::X, Vec3::new(FRAC_PI_4, 0.0, 0.0)),
            (Vec3::Z, Vec3::new(0.0, 0.0, FRAC_PI_4)),
        ] {
            let samples = [RotationSample {
                time: 0.0,
                angle: FRAC_PI_4,
                axis,
                tension: 0.0,
            }];
            let anim = bake_animation(&[], &samples, &[]).unwrap();
            let euler = anim.rotation.sample_or(0.0, Vec3::ZERO);
            assert_close(euler, expected);
        }
    }

    #[test]
    fn y_rotation_survives_the_gimbal_singularity() {
        let samples = [RotationSample {
            time: 0.0,
            angle: FRAC_PI_2,
            axis: Vec3::Y,
            tension: 0.0,
        }];
        let anim = bake_animation(&[], &samples, &[]).unwrap();
        let euler = anim.rotation.sample_or(0.0, Vec3::ZERO);
        assert_close(euler, Vec3::new(0.0, FRAC_PI_2, 0.0));
    }

    #[test]
    fn rotation_samples_compose_onto_previous_keys() {
        let samples = [
            RotationSample {
                time: 0.0,
                angle: FRAC_PI_4,
                axis: Vec3::Z,
                tension: 0.0,
            },
            RotationSample {
                time: 10.0,
                angle: FRAC_PI_4,
                axis: Vec3::Z,
                tension: 0.0,
            },
        ];
        let anim = bake_animation(&[], &samples, &[]).unwrap();
        let euler = anim.rotation.sample_or(10.0, Vec3::ZERO);
        assert_close(euler, Vec3::new(0.0, 0.0, FRAC_PI_2));
    }

    #[test]
    fn position_samples_insert_in_time_order() {
        let samples: Vec<VectorSample> = [5.0, 1.0, 3.0]
            .into_iter()
            .map(|time| VectorSample {
                time,
                value: Vec3::splat(time),
                tension: 0.0,
            })
            .collect();
        let anim = bake_animation(&samples, &[], &[]).unwrap();
        let times: Vec<f32> = anim.position.x.keys.iter().map(|k| k.time).collect();
        assert_eq!(times, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn zero_axis_sample_keeps_previous_rotation() {
        let samples = [
            RotationSample {
                time: 0.0,
                angle: FRAC_PI_4,
                axis: Vec3::Z,
                tension: 0.0,
            },
            RotationSample {
                time: 5.0,
                angle: 1.0,
                axis: Vec3::ZERO,
                tension: 0.0,
            },
        ];
        let anim = bake_animation(&[], &samples, &[]).unwrap();
        let euler = anim.rotation.sample_or(5.0, Vec3::ZERO);
        assert_close(euler, Vec3::new(0.0, 0.0, FRAC_PI_4));
    }
}
