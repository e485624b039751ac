// Studio model drawing.
//
// Vertices are skinned on the CPU: the pose evaluator produces model-space
// bone matrices, the entity transform is folded in, and finished strips are
// submitted to the backend. Paletted textures are expanded to RGB and
// uploaded lazily the first time a mesh needs them; remap-capable textures
// keep their pristine palette around so recoloring re-uploads from source.

use std::collections::HashMap;

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::model::Entity;
use crate::palette::RemapTexture;
use crate::pose::{evaluate_pose, AnimationDecoder};
use crate::traits::render::{
    BlendFactor, GraphicsBackend, PolygonMode, StripVertex, TextureId,
};

/// Color of the wireframe overlay pass.
const WIREFRAME_OVERLAY_COLOR: [f32; 4] = [1.0, 0.0, 0.0, 1.0];

#[derive(Debug, Clone, Copy, Default)]
pub struct DrawFlags {
    pub wireframe_overlay: bool,
}

struct CachedTexture {
    id: TextureId,
    remap: Option<RemapTexture>,
}

/// Draws entities and owns the texture upload cache and the running polygon
/// counter. One renderer serves one model at a time; call [`Self::invalidate`]
/// when the model changes.
#[derive(Default)]
pub struct ModelRenderer {
    textures: HashMap<usize, CachedTexture>,
    drawn_polygons: u32,
    remap_colors: Option<(i32, i32)>,
}

impl ModelRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total polygons drawn since creation. Callers diff this across a pass
    /// to get per-pass counts.
    pub fn drawn_polygons(&self) -> u32 {
        self.drawn_polygons
    }

    /// Drops all cached uploads. Required when the entity's model changes,
    /// since the cache is keyed by texture index only.
    pub fn invalidate(&mut self) {
        self.textures.clear();
    }

    /// Sets the top/bottom recolor hues and re-uploads every remap-capable
    /// texture already resident. Textures uploaded later pick the hues up on
    /// first use.
    pub fn set_remap_colors(&mut self, backend: &mut dyn GraphicsBackend, top: i32, bottom: i32) {
        self.remap_colors = Some((top, bottom));
        for cached in self.textures.values_mut() {
            if let Some(remap) = &mut cached.remap {
                remap.apply_hues(top, bottom);
                let texture = &remap.texture;
                backend.update_texture(cached.id, texture.width, texture.height, &texture.to_rgb());
            }
        }
    }

    /// Draws the entity's selected submodels with the current pose.
    ///
    /// Returns the number of polygons submitted.
    pub fn draw(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        entity: &Entity,
        decoder: &dyn AnimationDecoder,
        flags: DrawFlags,
    ) -> u32 {
        let model = entity.model().clone();
        let pose = evaluate_pose(entity, decoder);
        let world = entity_world_transform(entity);
        let final_transforms: Vec<Mat4> = pose.iter().map(|bone| world * *bone).collect();

        let transparent = entity.transparency() < 1.0;
        if transparent {
            backend.set_blend(true);
            backend.set_blend_func(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);
        }
        backend.color([1.0, 1.0, 1.0, entity.transparency()]);

        let mut strips: Vec<Vec<StripVertex>> = Vec::new();
        let mut polygons = 0u32;

        for (part_index, part) in model.body_parts.iter().enumerate() {
            let selected = entity.body_value_for_group(part_index);
            let Some(submodel) = part.models.get(selected) else {
                continue;
            };
            for mesh in &submodel.meshes {
                let texture_index = model.skin(entity.skin(), mesh.skin_ref);
                let id = self.ensure_texture(backend, &model.textures, texture_index);
                backend.bind_texture(id);

                for strip in &mesh.strips {
                    if strip.len() < 3 {
                        continue;
                    }
                    let vertices: Vec<StripVertex> = strip
                        .iter()
                        .map(|v| {
                            let pos = final_transforms[v.bone]
                                .transform_point3(Vec3::from_array(v.pos));
                            StripVertex::new(pos.to_array(), v.uv)
                        })
                        .collect();
                    polygons += vertices.len() as u32 - 2;
                    backend.draw_triangle_strip(&vertices);
                    strips.push(vertices);
                }
            }
        }

        if transparent {
            backend.set_blend(false);
        }

        if flags.wireframe_overlay {
            backend.set_polygon_mode(PolygonMode::Line);
            backend.set_texture_2d(false);
            backend.set_depth_test(true);
            backend.color(WIREFRAME_OVERLAY_COLOR);
            for vertices in &strips {
                polygons += vertices.len() as u32 - 2;
                backend.draw_triangle_strip(vertices);
            }
            backend.set_polygon_mode(PolygonMode::Fill);
        }

        self.drawn_polygons += polygons;
        polygons
    }

    fn ensure_texture(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        textures: &[crate::palette::PaletteTexture],
        index: usize,
    ) -> Option<TextureId> {
        if let Some(cached) = self.textures.get(&index) {
            return Some(cached.id);
        }
        let texture = textures.get(index)?;
        let mut remap = RemapTexture::detect(texture.clone());
        if let (Some(remap), Some((top, bottom))) = (&mut remap, self.remap_colors) {
            remap.apply_hues(top, bottom);
        }
        let source = remap.as_ref().map(|r| &r.texture).unwrap_or(texture);
        let id = backend.create_texture(source.width, source.height, &source.to_rgb());
        log::debug!(
            "uploaded texture {} {:?} ({}x{})",
            index,
            source.name,
            source.width,
            source.height
        );
        self.textures.insert(index, CachedTexture { id, remap });
        Some(id)
    }
}

/// World transform from the entity's origin, rotation (degrees) and scale.
fn entity_world_transform(entity: &Entity) -> Mat4 {
    let rotation = entity.rotation();
    Mat4::from_translation(entity.origin())
        * Mat4::from_quat(Quat::from_euler(
            EulerRot::ZYX,
            rotation.z.to_radians(),
            rotation.y.to_radians(),
            rotation.x.to_radians(),
        ))
        * Mat4::from_scale(entity.scale())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_fixtures::sample_model;
    use crate::palette::PALETTE_SIZE;
    use crate::pose::RestPoseDecoder;
    use crate::render::command_recorder::{Command, CommandRecorder};
    use std::sync::Arc;

    fn entity() -> Entity {
        Entity::new(Arc::new(sample_model()))
    }

    #[test]
    fn draw_counts_polygons_per_strip() {
        let mut rec = CommandRecorder::new();
        let mut renderer = ModelRenderer::new();
        let e = entity();
        // Default body: body_a (1 strip) + head_a (1 strip), 4 verts each
        let polys = renderer.draw(&mut rec, &e, &RestPoseDecoder, DrawFlags::default());
        assert_eq!(polys, 4);
        assert_eq!(renderer.drawn_polygons(), 4);
        assert_eq!(
            rec.count_matching(|c| matches!(c, Command::DrawTriangleStrip(_))),
            2
        );
    }

    #[test]
    fn body_value_selects_submodel() {
        let mut rec = CommandRecorder::new();
        let mut renderer = ModelRenderer::new();
        let mut e = entity();
        // body_b has two strips instead of one
        e.set_bodygroup(0, 1);
        let polys = renderer.draw(&mut rec, &e, &RestPoseDecoder, DrawFlags::default());
        assert_eq!(polys, 6);
    }

    #[test]
    fn textures_upload_once() {
        let mut rec = CommandRecorder::new();
        let mut renderer = ModelRenderer::new();
        let e = entity();
        renderer.draw(&mut rec, &e, &RestPoseDecoder, DrawFlags::default());
        assert_eq!(
            rec.count_matching(|c| matches!(c, Command::CreateTexture { .. })),
            2
        );
        rec.reset();
        renderer.draw(&mut rec, &e, &RestPoseDecoder, DrawFlags::default());
        assert_eq!(
            rec.count_matching(|c| matches!(c, Command::CreateTexture { .. })),
            0
        );

        renderer.invalidate();
        rec.reset();
        renderer.draw(&mut rec, &e, &RestPoseDecoder, DrawFlags::default());
        assert_eq!(
            rec.count_matching(|c| matches!(c, Command::CreateTexture { .. })),
            2
        );
    }

    #[test]
    fn remap_colors_reupload_remap_textures() {
        let mut model = sample_model();
        model.textures[0] = crate::palette::PaletteTexture::new(
            "DM_Base.bmp",
            2,
            2,
            vec![0; 4],
            vec![128; PALETTE_SIZE],
        )
        .unwrap();
        let e = Entity::new(Arc::new(model));

        let mut rec = CommandRecorder::new();
        let mut renderer = ModelRenderer::new();
        renderer.draw(&mut rec, &e, &RestPoseDecoder, DrawFlags::default());

        rec.reset();
        renderer.set_remap_colors(&mut rec, 120, 200);
        // Only the remap-capable texture is re-uploaded
        assert_eq!(
            rec.count_matching(|c| matches!(c, Command::UpdateTexture { .. })),
            1
        );
    }

    #[test]
    fn transparency_enables_blending() {
        let mut rec = CommandRecorder::new();
        let mut renderer = ModelRenderer::new();
        let mut e = entity();
        e.set_transparency(0.5);
        renderer.draw(&mut rec, &e, &RestPoseDecoder, DrawFlags::default());
        assert!(rec.commands().contains(&Command::SetBlend(true)));
        assert!(rec.commands().contains(&Command::Color([1.0, 1.0, 1.0, 0.5])));
        assert_eq!(rec.commands().last(), Some(&Command::SetBlend(false)));
    }

    #[test]
    fn wireframe_overlay_redraws_strips_in_line_mode() {
        let mut rec = CommandRecorder::new();
        let mut renderer = ModelRenderer::new();
        let e = entity();
        let polys = renderer.draw(
            &mut rec,
            &e,
            &RestPoseDecoder,
            DrawFlags {
                wireframe_overlay: true,
            },
        );
        assert_eq!(polys, 8);
        assert_eq!(
            rec.count_matching(|c| matches!(c, Command::DrawTriangleStrip(_))),
            4
        );
        assert!(rec
            .commands()
            .contains(&Command::SetPolygonMode(PolygonMode::Line)));
        assert_eq!(
            rec.commands().last(),
            Some(&Command::SetPolygonMode(PolygonMode::Fill))
        );
    }

    #[test]
    fn entity_transform_moves_vertices() {
        let mut rec = CommandRecorder::new();
        let mut renderer = ModelRenderer::new();
        let mut e = entity();
        e.set_origin(Vec3::new(10.0, 0.0, 0.0));
        renderer.draw(&mut rec, &e, &RestPoseDecoder, DrawFlags::default());
        let strip = rec
            .commands()
            .iter()
            .find_map(|c| match c {
                Command::DrawTriangleStrip(v) => Some(v.clone()),
                _ => None,
            })
            .unwrap();
        assert!((strip[0].pos[0] - 10.0).abs() < 1e-5);
    }
}
