//! Keyframe track model.
//!
//! An [`Animation`] holds three per-component vector tracks (position,
//! rotation, scaling). Each vector track is three independent single-value
//! tracks (X/Y/Z), and each of those is an ascending-time-ordered list of
//! `(time, value, tension)` samples.

use glam::Vec3;

/// One sample in a single-value track.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,
    /// Tangent-shape parameter carried from the source track (tension).
    pub tension: f32,
}

/// An ascending-time-ordered list of keyframes for one scalar component.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyTrack {
    pub keys: Vec<Keyframe>,
}

impl KeyTrack {
    /// Insert a key at `time`, keeping keys ordered by ascending time.
    ///
    /// The insertion position comes from a linear scan over existing keys.
    /// A fresh key starts out with the value of the nearest preceding key
    /// (or 0.0 on an empty track) so interpolation stays continuous until an
    /// explicit value is set. Inserting at an existing key's time returns
    /// that key instead of duplicating it.
    pub fn insert(&mut self, time: f32) -> &mut Keyframe {
        let mut idx = self.keys.len();
        for (i, key) in self.keys.iter().enumerate() {
            if key.time == time {
                return &mut self.keys[i];
            }
            if key.time > time {
                idx = i;
                break;
            }
        }
        let value = if idx > 0 { self.keys[idx - 1].value } else { 0.0 };
        self.keys.insert(
            idx,
            Keyframe {
                time,
                value,
                tension: 0.0,
            },
        );
        &mut self.keys[idx]
    }

    /// Sample the track at `time` with linear interpolation, clamping before
    /// the first and after the last key. An empty track yields `default`.
    pub fn sample_or(&self, time: f32, default: f32) -> f32 {
        let keys = &self.keys;
        if keys.is_empty() {
            return default;
        }
        if time <= keys[0].time {
            return keys[0].value;
        }
        if let Some(last) = keys.last()
            && time >= last.time
        {
            return last.value;
        }
        for pair in keys.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if time >= a.time && time < b.time {
                let t = (time - a.time) / (b.time - a.time);
                return a.value + (b.value - a.value) * t;
            }
        }
        keys[keys.len() - 1].value
    }
}

/// Three independent X/Y/Z tracks for one vector quantity.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VectorTrack {
    pub x: KeyTrack,
    pub y: KeyTrack,
    pub z: KeyTrack,
}

impl VectorTrack {
    /// Insert keys for all three components at `time`.
    pub fn insert(&mut self, time: f32, value: Vec3, tension: f32) {
        for (track, v) in [
            (&mut self.x, value.x),
            (&mut self.y, value.y),
            (&mut self.z, value.z),
        ] {
            let key = track.insert(time);
            key.value = v;
            key.tension = tension;
        }
    }

    pub fn sample_or(&self, time: f32, default: Vec3) -> Vec3 {
        Vec3::new(
            self.x.sample_or(time, default.x),
            self.y.sample_or(time, default.y),
            self.z.sample_or(time, default.z),
        )
    }

    /// Largest key count across the three component tracks.
    pub fn max_keys(&self) -> usize {
        self.x
            .keys
            .len()
            .max(self.y.keys.len())
            .max(self.z.keys.len())
    }

    fn collect_times(&self, out: &mut Vec<f32>) {
        for track in [&self.x, &self.y, &self.z] {
            for key in &track.keys {
                if !out.iter().any(|&t| t == key.time) {
                    out.push(key.time);
                }
            }
        }
    }
}

/// A sampled transform: the static form an animation freezes into.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform {
    pub position: Vec3,
    /// Euler angles in radians.
    pub rotation: Vec3,
    pub scaling: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Transform {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scaling: Vec3::ONE,
        }
    }
}

/// Per-object keyframe animation.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Animation {
    pub position: VectorTrack,
    /// Euler angles in radians, converted from the source's angle-axis keys.
    pub rotation: VectorTrack,
    pub scaling: VectorTrack,
}

impl Animation {
    /// Largest key count over all nine component tracks.
    pub fn max_keys(&self) -> usize {
        self.position
            .max_keys()
            .max(self.rotation.max_keys())
            .max(self.scaling.max_keys())
    }

    /// Union of every key time across all tracks, ascending.
    pub fn time_union(&self) -> Vec<f32> {
        let mut times = Vec::new();
        self.position.collect_times(&mut times);
        self.rotation.collect_times(&mut times);
        self.scaling.collect_times(&mut times);
        times.sort_by(|a, b| a.total_cmp(b));
        times
    }

    /// Earliest key time, if any track has keys.
    pub fn start_time(&self) -> Option<f32> {
        self.time_union().first().copied()
    }

    /// Sample the full transform at `time`. Missing tracks fall back to the
    /// identity transform's components.
    pub fn sample(&self, time: f32) -> Transform {
        Transform {
            position: self.position.sample_or(time, Vec3::ZERO),
            rotation: self.rotation.sample_or(time, Vec3::ZERO),
            scaling: self.scaling.sample_or(time, Vec3::ONE),
        }
    }
}
