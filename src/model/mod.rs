// In-memory data model for a parsed studio model.
//
// The asset is immutable after load: bones, controllers, body parts,
// sequences, skin families, hitboxes, and paletted textures. Entities
// reference the asset through an Arc and never copy it.

pub mod bodygroup;
pub mod entity;
pub mod loader;

pub use entity::Entity;

use crate::palette::PaletteTexture;
use glam::Vec3;

/// Bone motion channels, in file order: translation X/Y/Z then rotation X/Y/Z.
pub const BONE_CHANNELS: usize = 6;

/// First rotation channel (channels 3..6 are rotations, in radians).
pub const FIRST_ROTATION_CHANNEL: usize = 3;

/// Declared controller index reserved for the mouth. The mouth is addressed
/// by this sentinel, not by its position in the controller table.
pub const MOUTH_CONTROLLER: i32 = 4;

/// Number of general-purpose controller slots (declared indices 0..4).
pub const CONTROLLER_SLOTS: usize = 4;

/// A single bone: local rest values for its six channels and the controller
/// bound to each channel, if any.
#[derive(Debug, Clone)]
pub struct Bone {
    pub name: String,
    /// Parent bone, None for roots. Parents always precede children, so the
    /// bone list can be walked front to back to compose transforms.
    pub parent: Option<usize>,
    /// Rest-pose value per channel: translation units for 0..3, degrees for 3..6.
    pub defaults: [f32; BONE_CHANNELS],
    /// Controller table index driving each channel, if bound.
    pub controllers: [Option<usize>; BONE_CHANNELS],
}

/// A named scalar input mapped through an authored range onto one bone channel.
#[derive(Debug, Clone)]
pub struct BoneController {
    pub bone: usize,
    /// Channel on the target bone this controller drives.
    pub channel: usize,
    /// Authored range. `start` may exceed `end` (inverted range).
    pub start: f32,
    pub end: f32,
    pub rest: i32,
    /// Declared semantic index (0..4, or MOUTH_CONTROLLER for the mouth).
    pub index: i32,
}

/// A swappable geometry slot with selectable variants.
#[derive(Debug, Clone)]
pub struct BodyPart {
    pub name: String,
    pub models: Vec<SubModel>,
}

/// One selectable variant of a body part.
#[derive(Debug, Clone)]
pub struct SubModel {
    pub name: String,
    pub meshes: Vec<Mesh>,
}

/// A run of triangle strips sharing one skin-table slot.
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Column into the skin table; the active skin family maps it to a texture.
    pub skin_ref: usize,
    pub strips: Vec<Vec<MeshVertex>>,
}

/// A skinned vertex: model-space position in the bone's frame, one bone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshVertex {
    pub bone: usize,
    pub pos: [f32; 3],
    pub uv: [f32; 2],
}

/// An animation sequence. The per-bone motion data is an opaque blob decoded
/// by the external animation decoder; this core only reads the metadata and
/// the authored bounds.
#[derive(Debug, Clone)]
pub struct Sequence {
    pub label: String,
    pub fps: f32,
    pub flags: u32,
    pub frame_count: u32,
    /// Authored model-space bounds for the whole sequence.
    pub bbmin: Vec3,
    pub bbmax: Vec3,
    pub motion: Vec<u8>,
}

/// An axis-aligned hit volume attached to a bone.
#[derive(Debug, Clone)]
pub struct Hitbox {
    pub bone: usize,
    pub group: i32,
    pub bbmin: Vec3,
    pub bbmax: Vec3,
}

/// A parsed studio model. Read-only after load.
#[derive(Debug, Clone, Default)]
pub struct StudioModel {
    pub name: String,
    pub bones: Vec<Bone>,
    pub controllers: Vec<BoneController>,
    pub hitboxes: Vec<Hitbox>,
    pub sequences: Vec<Sequence>,
    pub body_parts: Vec<BodyPart>,
    pub textures: Vec<PaletteTexture>,
    /// Skin table width: one column per mesh skin-ref.
    pub skin_refs: usize,
    /// Family-major table of texture indices, `families * skin_refs` entries.
    pub skin_table: Vec<u16>,
}

impl StudioModel {
    pub fn skin_families(&self) -> usize {
        if self.skin_refs == 0 {
            0
        } else {
            self.skin_table.len() / self.skin_refs
        }
    }

    /// Texture index for a mesh skin-ref under the given family. Out-of-range
    /// families fall back to family 0; an out-of-range ref falls back to 0.
    pub fn skin(&self, family: usize, skin_ref: usize) -> usize {
        if skin_ref >= self.skin_refs {
            return 0;
        }
        let family = if family < self.skin_families() {
            family
        } else {
            0
        };
        self.skin_table
            .get(family * self.skin_refs + skin_ref)
            .copied()
            .unwrap_or(0) as usize
    }

    /// Controller by position in the controller table.
    pub fn bone_controller(&self, logical_index: usize) -> Option<&BoneController> {
        self.controllers.get(logical_index)
    }

    /// Controller by declared semantic index (the way entities address them).
    pub fn bone_controller_by_index(&self, declared: i32) -> Option<&BoneController> {
        self.controllers.iter().find(|c| c.index == declared)
    }

    /// The distinguished mouth controller, if the model has one.
    pub fn mouth_controller(&self) -> Option<&BoneController> {
        self.bone_controller_by_index(MOUTH_CONTROLLER)
    }

    /// Submodel counts per body part, the radices of the packed body value.
    pub fn submodel_counts(&self) -> Vec<usize> {
        self.body_parts.iter().map(|p| p.models.len()).collect()
    }

    /// Exact case-sensitive label lookup.
    pub fn sequence_by_label(&self, label: &str) -> Option<usize> {
        self.sequences.iter().position(|s| s.label == label)
    }
}


#[cfg(test)]
mod tests {
    use super::test_fixtures::sample_model;
    use super::*;

    #[test]
    fn skin_lookup_by_family() {
        let model = sample_model();
        assert_eq!(model.skin_families(), 2);
        assert_eq!(model.skin(0, 0), 0);
        assert_eq!(model.skin(0, 1), 1);
        assert_eq!(model.skin(1, 0), 1);
        assert_eq!(model.skin(1, 1), 0);
    }

    #[test]
    fn skin_lookup_out_of_range_falls_back() {
        let model = sample_model();
        // Unknown family falls back to family 0
        assert_eq!(model.skin(9, 1), 1);
        // Unknown skin-ref falls back to texture 0
        assert_eq!(model.skin(0, 9), 0);
    }

    #[test]
    fn controller_lookup_by_declared_index() {
        let model = sample_model();
        assert!(model.bone_controller_by_index(0).is_some());
        assert!(model.bone_controller_by_index(3).is_none());
        assert!(model.mouth_controller().is_none());
    }

    #[test]
    fn sequence_label_lookup_is_case_sensitive() {
        let model = sample_model();
        assert_eq!(model.sequence_by_label("idle"), Some(1));
        assert_eq!(model.sequence_by_label("IDLE"), None);
    }
}
