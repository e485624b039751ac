// A live instance of a studio model in the scene.
//
// Owns the mutable viewing state: packed body value, skin family, raw
// controller values, sequence playback, world transform. UI pushes land
// here between frames; nothing in the frame path mutates the asset itself.

use std::sync::Arc;

use glam::Vec3;

use super::bodygroup;
use super::{StudioModel, CONTROLLER_SLOTS, MOUTH_CONTROLLER};

#[derive(Debug, Clone)]
pub struct Entity {
    model: Arc<StudioModel>,
    body_value: u32,
    skin: usize,
    /// Raw controller values by declared index. Stored exactly as set, never
    /// snapped or clamped; range mapping happens at evaluation time only.
    controller_values: [f32; CONTROLLER_SLOTS],
    mouth: f32,
    sequence: usize,
    frame: f32,
    origin: Vec3,
    rotation: Vec3,
    scale: Vec3,
    transparency: f32,
    /// Derived from the current sequence's authored bounds and the scale;
    /// refreshed whenever either changes.
    bounds: (Vec3, Vec3),
}

impl Entity {
    pub fn new(model: Arc<StudioModel>) -> Self {
        let mut entity = Self {
            model,
            body_value: 0,
            skin: 0,
            controller_values: [0.0; CONTROLLER_SLOTS],
            mouth: 0.0,
            sequence: 0,
            frame: 0.0,
            origin: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            transparency: 1.0,
            bounds: (Vec3::ZERO, Vec3::ZERO),
        };
        entity.refresh_bounds();
        entity
    }

    pub fn model(&self) -> &Arc<StudioModel> {
        &self.model
    }

    // Body groups

    pub fn body_value(&self) -> u32 {
        self.body_value
    }

    /// Decoded submodel selection for one body part.
    pub fn body_value_for_group(&self, body_part: usize) -> usize {
        bodygroup::decode_digit(self.body_value, &self.model.submodel_counts(), body_part)
    }

    /// Selects a submodel for one body part. Out-of-range indices and parts
    /// without submodels are silently ignored.
    pub fn set_bodygroup(&mut self, body_part: usize, submodel: usize) {
        self.body_value = bodygroup::encode_digit(
            self.body_value,
            &self.model.submodel_counts(),
            body_part,
            submodel,
        );
    }

    // Skins

    pub fn skin(&self) -> usize {
        self.skin
    }

    pub fn set_skin(&mut self, skin: usize) {
        if skin < self.model.skin_families() {
            self.skin = skin;
        } else {
            log::warn!(
                "ignoring skin {skin}, model has {} families",
                self.model.skin_families()
            );
        }
    }

    // Bone controllers

    /// Raw value for a declared controller index (the mouth uses its own slot).
    pub fn controller_value(&self, declared: i32) -> f32 {
        if declared == MOUTH_CONTROLLER {
            return self.mouth;
        }
        match usize::try_from(declared) {
            Ok(slot) if slot < CONTROLLER_SLOTS => self.controller_values[slot],
            _ => 0.0,
        }
    }

    /// Stores a controller value exactly as given. Unknown indices are a no-op.
    pub fn set_controller(&mut self, declared: i32, value: f32) {
        if declared == MOUTH_CONTROLLER {
            self.mouth = value;
            return;
        }
        match usize::try_from(declared) {
            Ok(slot) if slot < CONTROLLER_SLOTS => self.controller_values[slot] = value,
            _ => log::warn!("ignoring value for unknown controller {declared}"),
        }
    }

    pub fn mouth(&self) -> f32 {
        self.mouth
    }

    pub fn set_mouth(&mut self, value: f32) {
        self.mouth = value;
    }

    // Sequences

    pub fn sequence(&self) -> usize {
        self.sequence
    }

    pub fn set_sequence(&mut self, sequence: usize) {
        if sequence < self.model.sequences.len() {
            self.sequence = sequence;
            self.frame = 0.0;
            self.refresh_bounds();
        } else {
            log::warn!(
                "ignoring sequence {sequence}, model has {}",
                self.model.sequences.len()
            );
        }
    }

    pub fn frame(&self) -> f32 {
        self.frame
    }

    /// Advances playback by `dt` seconds at the sequence's authored rate,
    /// wrapping at the end.
    pub fn advance_frame(&mut self, dt: f32) {
        let Some(sequence) = self.model.sequences.get(self.sequence) else {
            return;
        };
        if sequence.frame_count <= 1 {
            self.frame = 0.0;
            return;
        }
        let span = sequence.frame_count as f32 - 1.0;
        self.frame = (self.frame + dt * sequence.fps).rem_euclid(span);
    }

    // World transform

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn set_origin(&mut self, origin: Vec3) {
        self.origin = origin;
    }

    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.rotation = rotation;
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.refresh_bounds();
    }

    /// Flips one axis of the scale, mirroring the model along it.
    pub fn mirror_axis(&mut self, axis: usize) {
        if axis < 3 {
            self.scale[axis] *= -1.0;
            self.refresh_bounds();
        }
    }

    pub fn transparency(&self) -> f32 {
        self.transparency
    }

    pub fn set_transparency(&mut self, transparency: f32) {
        self.transparency = transparency.clamp(0.0, 1.0);
    }

    // Bounds

    /// Current bounds: the sequence's authored bounds under the entity scale.
    /// Authored per sequence, never recomputed from geometry.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        self.bounds
    }

    fn refresh_bounds(&mut self) {
        let Some(sequence) = self.model.sequences.get(self.sequence) else {
            self.bounds = (Vec3::ZERO, Vec3::ZERO);
            return;
        };
        let a = sequence.bbmin * self.scale;
        let b = sequence.bbmax * self.scale;
        self.bounds = (a.min(b), a.max(b));
    }
}
