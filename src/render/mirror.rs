// Ground mirror pass.
//
// The reflection is drawn first, before the real model and the floor. The
// floor quad is rasterized into the stencil buffer only, then the model is
// drawn Z-negated with the stencil test restricted to floor pixels and a
// clip plane at the ground so the reflection never pokes above it. The
// scoped pass guard restores the matrix stack and stencil state on every
// exit path.

use glam::Vec2;

use crate::model::Entity;
use crate::pose::AnimationDecoder;
use crate::render::floor::draw_floor_quad;
use crate::render::mode::{setup_render_mode, RenderMode};
use crate::render::model_renderer::{DrawFlags, ModelRenderer};
use crate::traits::render::{CompareFunc, CullFace, GraphicsBackend, StencilOp};

/// Clip plane covering the ground: keeps Z >= 0, cutting the reflection off
/// at the floor.
const GROUND_CLIP_PLANE: [f64; 4] = [0.0, 0.0, 1.0, 0.0];

const STENCIL_MASK: u32 = 0xffff_ffff;

/// Scoped mirror pass. Construction marks the floor in the stencil buffer
/// and flips the modelview Z; drop tears the state back down.
struct MirrorPass<'a> {
    backend: &'a mut dyn GraphicsBackend,
}

impl<'a> MirrorPass<'a> {
    fn begin(backend: &'a mut dyn GraphicsBackend, floor_length: f32) -> Self {
        // Mark floor pixels with stencil 1, touching neither color nor depth
        backend.set_depth_test(false);
        backend.set_color_mask(false);

        backend.set_stencil_test(true);
        backend.set_stencil_op(StencilOp::Keep, StencilOp::Keep, StencilOp::Replace);
        backend.set_stencil_func(CompareFunc::Always, 1, STENCIL_MASK);

        // Texture repeat is irrelevant while only the stencil is written
        draw_floor_quad(backend, floor_length, 1.0, Vec2::ZERO);

        backend.set_color_mask(true);
        backend.set_depth_test(true);

        // From here on, draw only where the floor marked the stencil
        backend.set_stencil_func(CompareFunc::Equal, 1, STENCIL_MASK);
        backend.set_stencil_op(StencilOp::Keep, StencilOp::Keep, StencilOp::Keep);

        backend.push_matrix();
        backend.scale(1.0, 1.0, -1.0);
        backend.set_cull_face(CullFace::Back);

        Self { backend }
    }
}

impl Drop for MirrorPass<'_> {
    fn drop(&mut self) {
        self.backend.set_clip_plane(false);
        self.backend.pop_matrix();
        self.backend.set_stencil_test(false);
    }
}

/// Draws the entity's reflection in the ground plane.
///
/// Returns the number of polygons the reflection added.
#[allow(clippy::too_many_arguments)]
pub fn draw_mirrored_model(
    backend: &mut dyn GraphicsBackend,
    renderer: &mut ModelRenderer,
    entity: &Entity,
    decoder: &dyn AnimationDecoder,
    render_mode: RenderMode,
    wireframe_overlay: bool,
    floor_length: f32,
    backface_culling: bool,
) -> u32 {
    let mut pass = MirrorPass::begin(backend, floor_length);

    setup_render_mode(&mut *pass.backend, render_mode, backface_culling);

    pass.backend.set_clip_plane(true);
    pass.backend.clip_plane(GROUND_CLIP_PLANE);

    // An odd number of negative scale axes flips the winding; compensate so
    // the reflection culls the same faces as the direct draw.
    let scale = entity.scale();
    let product = scale.x * scale.y * scale.z;
    let mut cull = CullFace::Back;
    if product <= 0.0 {
        cull = cull.inverted();
    }
    pass.backend.set_cull_face(cull);

    let flags = DrawFlags { wireframe_overlay };

    renderer.draw(&mut *pass.backend, entity, decoder, flags)
}
