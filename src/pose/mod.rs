// Pose evaluation: per-frame bone matrices for an entity.
//
// Animation decoding is pluggable. The evaluator asks a decoder for the six
// raw channel values of each bone, layers controller adjustments on top, and
// composes the parent chain into model-space matrices. Channel values stay
// in authored units (translation units, rotation degrees) until the final
// compose step.

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::model::{
    BoneController, Entity, StudioModel, BONE_CHANNELS, FIRST_ROTATION_CHANNEL,
};

/// Source of raw per-bone channel values for a sequence frame.
///
/// Implementations own the compressed motion payload format; the evaluator
/// never looks inside `Sequence::motion` itself.
pub trait AnimationDecoder {
    fn sample(
        &self,
        model: &StudioModel,
        sequence: usize,
        frame: f32,
        bone: usize,
    ) -> [f32; BONE_CHANNELS];
}

/// Decoder that ignores motion data and returns every bone's rest values.
#[derive(Debug, Default, Clone, Copy)]
pub struct RestPoseDecoder;

impl AnimationDecoder for RestPoseDecoder {
    fn sample(
        &self,
        model: &StudioModel,
        _sequence: usize,
        _frame: f32,
        bone: usize,
    ) -> [f32; BONE_CHANNELS] {
        model
            .bones
            .get(bone)
            .map(|b| b.defaults)
            .unwrap_or([0.0; BONE_CHANNELS])
    }
}

/// Maps a raw controller value into the controller's authored range.
///
/// The value is interpolated linearly between `start` and `end` and clamped
/// to the range. Inverted ranges (`start > end`) interpolate the same way;
/// clamping then holds the result between `end` and `start`.
pub fn controller_adjustment(controller: &BoneController, raw: f32) -> f32 {
    let span = controller.end - controller.start;
    if span == 0.0 {
        return controller.start;
    }
    let t = ((raw - controller.start) / span).clamp(0.0, 1.0);
    controller.start + t * span
}

/// Model-space transform for every bone of the entity's current pose.
///
/// Bones are stored parent-first, so one forward pass composes the chain.
/// The entity's own origin/rotation/scale are not applied here; they belong
/// to the world transform the renderer builds.
pub fn evaluate_pose(entity: &Entity, decoder: &dyn AnimationDecoder) -> Vec<Mat4> {
    let model = entity.model();
    let mut transforms: Vec<Mat4> = Vec::with_capacity(model.bones.len());

    for (index, bone) in model.bones.iter().enumerate() {
        let mut channels = decoder.sample(model, entity.sequence(), entity.frame(), index);

        for (channel, &slot) in bone.controllers.iter().enumerate() {
            let Some(controller) = slot.and_then(|c| model.bone_controller(c)) else {
                continue;
            };
            let raw = entity.controller_value(controller.index);
            channels[channel] += controller_adjustment(controller, raw);
        }

        let translation = Vec3::new(channels[0], channels[1], channels[2]);
        let rotation = Quat::from_euler(
            EulerRot::ZYX,
            channels[FIRST_ROTATION_CHANNEL + 2].to_radians(),
            channels[FIRST_ROTATION_CHANNEL + 1].to_radians(),
            channels[FIRST_ROTATION_CHANNEL].to_radians(),
        );
        let local = Mat4::from_rotation_translation(rotation, translation);

        let world = match bone.parent {
            Some(parent) => transforms[parent] * local,
            None => local,
        };
        transforms.push(world);
    }

    transforms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_fixtures::sample_model;
    use crate::model::MOUTH_CONTROLLER;
    use std::sync::Arc;

    fn entity() -> Entity {
        Entity::new(Arc::new(sample_model()))
    }

    #[test]
    fn rest_pose_places_child_at_offset() {
        let e = entity();
        let pose = evaluate_pose(&e, &RestPoseDecoder);
        assert_eq!(pose.len(), 2);
        assert_eq!(pose[0], Mat4::IDENTITY);
        let head = pose[1].transform_point3(Vec3::ZERO);
        assert!((head - Vec3::new(0.0, 0.0, 12.0)).length() < 1e-5);
    }

    #[test]
    fn adjustment_clamps_to_range() {
        let model = sample_model();
        let c = model.bone_controller(0).unwrap();
        assert_eq!(controller_adjustment(c, 0.0), 0.0);
        assert_eq!(controller_adjustment(c, 45.0), 30.0);
        assert_eq!(controller_adjustment(c, -100.0), -30.0);
    }

    #[test]
    fn adjustment_handles_inverted_range() {
        let c = BoneController {
            bone: 0,
            channel: 5,
            start: 30.0,
            end: -30.0,
            rest: 0,
            index: 0,
        };
        assert_eq!(controller_adjustment(&c, 10.0), 10.0);
        // Past either endpoint the result pins to the nearer endpoint
        assert_eq!(controller_adjustment(&c, 100.0), 30.0);
        assert_eq!(controller_adjustment(&c, -100.0), -30.0);
    }

    #[test]
    fn adjustment_with_degenerate_range_returns_start() {
        let c = BoneController {
            bone: 0,
            channel: 0,
            start: 5.0,
            end: 5.0,
            rest: 0,
            index: 0,
        };
        assert_eq!(controller_adjustment(&c, 123.0), 5.0);
    }

    #[test]
    fn controller_rotates_bound_channel() {
        let mut e = entity();
        // Controller 0 drives bone 0 channel 5 (rotation Z), range -30..30
        e.set_controller(0, 30.0);
        let pose = evaluate_pose(&e, &RestPoseDecoder);
        let x_axis = pose[0].transform_vector3(Vec3::X);
        let expected = 30.0f32.to_radians();
        assert!((x_axis.x - expected.cos()).abs() < 1e-5);
        assert!((x_axis.y - expected.sin()).abs() < 1e-5);

        // The child composes through the rotated parent
        let head = pose[1].transform_point3(Vec3::ZERO);
        assert!((head.z - 12.0).abs() < 1e-5);
    }

    #[test]
    fn mouth_controller_uses_mouth_value() {
        let mut model = sample_model();
        model.controllers[0].index = MOUTH_CONTROLLER;
        let mut e = Entity::new(Arc::new(model));
        e.set_mouth(30.0);
        // Slot 0 is untouched; the mouth value alone drives the channel
        e.set_controller(0, 0.0);
        let pose = evaluate_pose(&e, &RestPoseDecoder);
        let x_axis = pose[0].transform_vector3(Vec3::X);
        assert!((x_axis.y - 30.0f32.to_radians().sin()).abs() < 1e-5);
    }

    #[test]
    fn unclamped_stored_value_is_clamped_at_evaluation() {
        let mut e = entity();
        e.set_controller(0, 512.0);
        assert_eq!(e.controller_value(0), 512.0);
        let pose = evaluate_pose(&e, &RestPoseDecoder);
        let x_axis = pose[0].transform_vector3(Vec3::X);
        // Pinned at the 30 degree end of the range
        assert!((x_axis.y - 30.0f32.to_radians().sin()).abs() < 1e-5);
    }
}
