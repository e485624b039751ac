// Scene orchestration.
//
// Owns the viewed entity, the camera, the renderer and the per-frame clock.
// Tick advances animation against the time provider; Draw issues one full
// frame to the backend: clear, camera, optional ground mirror, the model,
// then the floor blended on top.

use glam::{Mat4, Vec2, Vec3};

use crate::config::ViewerSettings;
use crate::model::Entity;
use crate::pose::{AnimationDecoder, RestPoseDecoder};
use crate::render::floor::draw_floor;
use crate::render::mirror::draw_mirrored_model;
use crate::render::mode::setup_render_mode;
use crate::render::model_renderer::{DrawFlags, ModelRenderer};
use crate::traits::render::{ClearMask, CullFace, GraphicsBackend, PolygonMode, TextureId};
use crate::traits::time::TimeProvider;

/// Slowest frame the animation clock will honor. Longer gaps (a paused
/// window, a debugger break) are folded down to a tenth of a second.
const MAX_FRAME_TIME: f64 = 1.0;
const CLAMPED_FRAME_TIME: f64 = 0.1;

/// Ticks arriving faster than this are skipped; their time accrues into the
/// next accepted tick.
const MIN_FRAME_TIME: f64 = 1.0 / 60.0;

/// Free-look camera. Angles follow the viewer convention where the world is
/// rotated rather than the eye moved.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub origin: Vec3,
    pub angles: Vec3,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            angles: Vec3::ZERO,
        }
    }
}

impl Camera {
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_translation(-self.origin)
            * Mat4::from_rotation_x(self.angles.z.to_radians())
            * Mat4::from_rotation_y(self.angles.x.to_radians())
            * Mat4::from_rotation_z(self.angles.y.to_radians())
    }
}

pub struct Scene {
    pub settings: ViewerSettings,
    pub camera: Camera,
    time: Box<dyn TimeProvider>,
    decoder: Box<dyn AnimationDecoder>,
    renderer: ModelRenderer,
    entity: Option<Entity>,
    ground_texture: Option<TextureId>,
    floor_texture_offset: Vec2,
    previous_time: f64,
    drawn_polygons: u32,
}

impl Scene {
    pub fn new(time: Box<dyn TimeProvider>) -> Self {
        let previous_time = time.now();
        Self {
            settings: ViewerSettings::default(),
            camera: Camera::default(),
            time,
            decoder: Box::new(RestPoseDecoder),
            renderer: ModelRenderer::new(),
            entity: None,
            ground_texture: None,
            floor_texture_offset: Vec2::ZERO,
            previous_time,
            drawn_polygons: 0,
        }
    }

    /// Replaces the animation decoder used for pose evaluation.
    pub fn set_decoder(&mut self, decoder: Box<dyn AnimationDecoder>) {
        self.decoder = decoder;
    }

    pub fn entity(&self) -> Option<&Entity> {
        self.entity.as_ref()
    }

    pub fn entity_mut(&mut self) -> Option<&mut Entity> {
        self.entity.as_mut()
    }

    /// Installs the entity to view, drops stale texture uploads and frames
    /// the camera on its bounds.
    pub fn set_entity(&mut self, entity: Entity) {
        self.renderer.invalidate();
        self.frame_camera(&entity);
        self.entity = Some(entity);
    }

    pub fn clear_entity(&mut self) {
        self.entity = None;
        self.renderer.invalidate();
    }

    pub fn set_ground_texture(&mut self, texture: Option<TextureId>) {
        self.ground_texture = texture;
    }

    /// Sets the recolor hues and re-uploads affected textures.
    pub fn set_remap_colors(&mut self, backend: &mut dyn GraphicsBackend, top: i32, bottom: i32) {
        self.settings.top_color = top;
        self.settings.bottom_color = bottom;
        self.renderer.set_remap_colors(backend, top, bottom);
    }

    /// Polygons drawn by the most recent [`Self::draw`] call.
    pub fn drawn_polygons(&self) -> u32 {
        self.drawn_polygons
    }

    /// Points the camera at the entity's bounds.
    ///
    /// The bounds are clamped to a sane range first, asymmetrically so a
    /// degenerate box still centers away from the origin.
    fn frame_camera(&mut self, entity: &Entity) {
        let (mut min, mut max) = entity.bounds();
        for i in 0..3 {
            min[i] = min[i].clamp(-2000.0, 2000.0);
            max[i] = max[i].clamp(-1000.0, 1000.0);
        }

        let size = max - min;
        let d = size.x.max(size.y).max(size.z);

        self.camera.origin = Vec3::new(-(min.z + size.z / 2.0), d, 0.0);
        self.camera.angles = Vec3::new(-90.0, 0.0, -90.0);
    }

    /// Drops the entity onto the ground plane, using the authored bounds of
    /// the sequence labeled "idle" when present, otherwise sequence 0.
    pub fn align_on_ground(&mut self) {
        let Some(entity) = &mut self.entity else {
            return;
        };
        let model = entity.model().clone();
        let sequence = model.sequence_by_label("idle").unwrap_or(0);
        let Some(sequence) = model.sequences.get(sequence) else {
            return;
        };
        let origin = entity.origin();
        entity.set_origin(Vec3::new(origin.x, origin.y, -sequence.bbmin.z));
    }

    /// Advances the animation clock.
    ///
    /// Deltas under the minimum are skipped and accrue into the next tick;
    /// deltas over a second are treated as a pause and folded to 0.1s.
    pub fn tick(&mut self) {
        let now = self.time.now();
        let mut frame_time = now - self.previous_time;

        if frame_time > MAX_FRAME_TIME {
            frame_time = CLAMPED_FRAME_TIME;
        }

        if frame_time < MIN_FRAME_TIME {
            return;
        }

        self.previous_time = now;

        if let Some(entity) = &mut self.entity {
            entity.advance_frame(frame_time as f32);
        }
    }

    fn should_mirror(&self) -> bool {
        self.settings.show_ground && self.settings.mirror_on_ground
    }

    /// Draws one frame.
    pub fn draw(&mut self, backend: &mut dyn GraphicsBackend, width: u32, height: u32) {
        let [r, g, b] = self.settings.background_color;
        backend.set_clear_color([r, g, b, 1.0]);

        if self.should_mirror() {
            backend.set_clear_stencil(0);
            backend.clear(ClearMask::COLOR_DEPTH_STENCIL);
        } else {
            backend.clear(ClearMask::COLOR_DEPTH);
        }

        backend.viewport(0, 0, width, height);
        backend.set_polygon_mode(PolygonMode::Fill);

        backend.set_projection(self.settings.fov, width, height);
        backend.load_matrix(self.camera.view_matrix());

        let polygons_before = self.renderer.drawn_polygons();

        if let Some(entity) = &self.entity {
            if self.should_mirror() {
                draw_mirrored_model(
                    backend,
                    &mut self.renderer,
                    entity,
                    self.decoder.as_ref(),
                    self.settings.render_mode,
                    self.settings.wireframe_overlay,
                    self.settings.floor_length,
                    self.settings.backface_culling,
                );
            }
        }

        setup_render_mode(
            backend,
            self.settings.render_mode,
            self.settings.backface_culling,
        );

        if let Some(entity) = &self.entity {
            // Mirrored winding when an odd number of scale axes is negative
            let scale = entity.scale();
            let product = scale.x * scale.y * scale.z;
            let mut cull = CullFace::Front;
            if product <= 0.0 {
                cull = cull.inverted();
            }
            backend.set_cull_face(cull);

            let flags = DrawFlags {
                wireframe_overlay: self.settings.wireframe_overlay,
            };
            self.renderer.draw(backend, entity, self.decoder.as_ref(), flags);
        }

        if self.settings.show_ground {
            draw_floor(
                backend,
                self.settings.floor_length,
                self.settings.texture_repeat_length,
                self.floor_texture_offset,
                self.ground_texture,
                self.settings.ground_color,
                self.settings.mirror_on_ground,
            );
        }

        self.drawn_polygons = self.renderer.drawn_polygons() - polygons_before;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_fixtures::sample_model;
    use crate::model::Sequence;
    use crate::render::command_recorder::{Command, CommandRecorder};
    use crate::traits::time::MockTimeProvider;
    use std::sync::Arc;

    fn scene_with_entity() -> (Scene, MockTimeProvider) {
        let time = MockTimeProvider::new();
        let mut scene = Scene::new(Box::new(time.clone()));
        scene.set_entity(Entity::new(Arc::new(sample_model())));
        (scene, time)
    }

    #[test]
    fn tick_advances_animation() {
        let (mut scene, time) = scene_with_entity();
        time.advance(0.05);
        scene.tick();
        // 0.05s at 30 fps
        let frame = scene.entity().unwrap().frame();
        assert!((frame - 1.5).abs() < 1e-4);
    }

    #[test]
    fn tick_skips_fast_frames_and_accrues_time() {
        let (mut scene, time) = scene_with_entity();
        time.advance(0.01);
        scene.tick();
        assert_eq!(scene.entity().unwrap().frame(), 0.0);

        // The skipped time counts toward the next tick
        time.advance(0.01);
        scene.tick();
        let frame = scene.entity().unwrap().frame();
        assert!((frame - 0.6).abs() < 1e-4);
    }

    #[test]
    fn tick_folds_long_pauses() {
        let (mut scene, time) = scene_with_entity();
        time.advance(5.0);
        scene.tick();
        // Treated as 0.1s, not five seconds
        let frame = scene.entity().unwrap().frame();
        assert!((frame - 3.0).abs() < 1e-4);
    }

    #[test]
    fn framing_centers_on_bounds() {
        let (scene, _) = scene_with_entity();
        // walk bounds: min (-16,-16,-4), max (16,16,72): dz 76 is largest
        assert_eq!(scene.camera.origin, Vec3::new(-34.0, 76.0, 0.0));
        assert_eq!(scene.camera.angles, Vec3::new(-90.0, 0.0, -90.0));
    }

    #[test]
    fn framing_clamps_huge_bounds() {
        let mut model = sample_model();
        model.sequences[0].bbmin.z = -5000.0;
        model.sequences[0].bbmax.z = 5000.0;
        let time = MockTimeProvider::new();
        let mut scene = Scene::new(Box::new(time));
        scene.set_entity(Entity::new(Arc::new(model)));
        // min z clamps to -2000, max z to 1000
        assert_eq!(scene.camera.origin.x, 500.0);
        assert_eq!(scene.camera.origin.y, 3000.0);
    }

    #[test]
    fn align_on_ground_prefers_idle() {
        let (mut scene, _) = scene_with_entity();
        scene.align_on_ground();
        // idle bbmin.z is -2
        assert_eq!(scene.entity().unwrap().origin().z, 2.0);
    }

    #[test]
    fn align_on_ground_falls_back_to_first_sequence() {
        let mut model = sample_model();
        model.sequences[1].label = "Idle".to_string(); // exact match only
        let time = MockTimeProvider::new();
        let mut scene = Scene::new(Box::new(time));
        scene.set_entity(Entity::new(Arc::new(model)));
        scene.align_on_ground();
        // walk bbmin.z is -4
        assert_eq!(scene.entity().unwrap().origin().z, 4.0);
    }

    #[test]
    fn mirror_clears_stencil() {
        let (mut scene, _) = scene_with_entity();
        scene.settings.show_ground = true;
        scene.settings.mirror_on_ground = true;
        let mut rec = CommandRecorder::new();
        scene.draw(&mut rec, 640, 480);
        assert!(rec.commands().contains(&Command::SetClearStencil(0)));
        assert!(rec
            .commands()
            .contains(&Command::Clear(ClearMask::COLOR_DEPTH_STENCIL)));
    }

    #[test]
    fn plain_draw_clears_without_stencil() {
        let (mut scene, _) = scene_with_entity();
        let mut rec = CommandRecorder::new();
        scene.draw(&mut rec, 640, 480);
        assert!(rec.commands().contains(&Command::Clear(ClearMask::COLOR_DEPTH)));
        assert!(!rec.commands().contains(&Command::SetClearStencil(0)));
    }

    #[test]
    fn mirror_pass_counts_toward_frame_polygons() {
        let (mut scene, _) = scene_with_entity();
        scene.settings.show_ground = true;
        scene.settings.mirror_on_ground = true;
        let mut rec = CommandRecorder::new();
        scene.draw(&mut rec, 640, 480);
        // Reflection and direct pass both draw the 4 model polygons
        assert_eq!(scene.drawn_polygons(), 8);

        scene.settings.mirror_on_ground = false;
        scene.draw(&mut rec, 640, 480);
        assert_eq!(scene.drawn_polygons(), 4);
    }

    #[test]
    fn main_pass_culls_front_faces_for_positive_scale() {
        let (mut scene, _) = scene_with_entity();
        let mut rec = CommandRecorder::new();
        scene.draw(&mut rec, 640, 480);
        assert!(rec.commands().contains(&Command::SetCullFace(CullFace::Front)));

        rec.reset();
        scene.entity_mut().unwrap().mirror_axis(0);
        scene.draw(&mut rec, 640, 480);
        assert!(rec.commands().contains(&Command::SetCullFace(CullFace::Back)));
    }

    #[test]
    fn empty_scene_draws_nothing_but_clears() {
        let time = MockTimeProvider::new();
        let mut scene = Scene::new(Box::new(time));
        let mut rec = CommandRecorder::new();
        scene.draw(&mut rec, 320, 240);
        assert_eq!(scene.drawn_polygons(), 0);
        assert_eq!(
            rec.count_matching(|c| matches!(c, Command::DrawTriangleStrip(_))),
            0
        );
    }

    #[test]
    fn align_handles_model_without_sequences() {
        let mut model = sample_model();
        model.sequences = Vec::<Sequence>::new();
        let time = MockTimeProvider::new();
        let mut scene = Scene::new(Box::new(time));
        scene.set_entity(Entity::new(Arc::new(model)));
        scene.align_on_ground();
        assert_eq!(scene.entity().unwrap().origin().z, 0.0);
    }
}
