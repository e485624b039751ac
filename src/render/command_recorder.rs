// Recording backend for tests.
//
// Captures every backend call as a value so tests can assert on exact call
// sequences without a graphics context. Texture ids are handed out from a
// private counter starting at 1.

use glam::Mat4;

use crate::traits::render::{
    BlendFactor, ClearMask, CompareFunc, CullFace, FrontFace, GraphicsBackend, PolygonMode,
    ShadeModel, StencilOp, StripVertex, TextureId,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetPolygonMode(PolygonMode),
    SetShadeModel(ShadeModel),
    SetTexture2d(bool),
    SetCullEnabled(bool),
    SetCullFace(CullFace),
    SetFrontFace(FrontFace),
    SetDepthTest(bool),
    SetColorMask(bool),
    SetBlend(bool),
    SetBlendFunc(BlendFactor, BlendFactor),
    SetStencilTest(bool),
    SetStencilFunc {
        func: CompareFunc,
        reference: i32,
        mask: u32,
    },
    SetStencilOp {
        stencil_fail: StencilOp,
        depth_fail: StencilOp,
        pass: StencilOp,
    },
    SetClearStencil(i32),
    SetClipPlane(bool),
    ClipPlane([f64; 4]),
    SetProjection {
        fov_y_degrees: f32,
        width: u32,
        height: u32,
    },
    LoadMatrix(Mat4),
    PushMatrix,
    PopMatrix,
    Scale(f32, f32, f32),
    Viewport {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
    SetClearColor([f32; 4]),
    Clear(ClearMask),
    CreateTexture {
        id: TextureId,
        width: u32,
        height: u32,
    },
    UpdateTexture {
        id: TextureId,
        width: u32,
        height: u32,
    },
    BindTexture(Option<TextureId>),
    Color([f32; 4]),
    DrawTriangleStrip(Vec<StripVertex>),
    DrawQuadStrip(Vec<StripVertex>),
}

#[derive(Debug, Default)]
pub struct CommandRecorder {
    commands: Vec<Command>,
    next_texture: u64,
}

impl CommandRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn reset(&mut self) {
        self.commands.clear();
    }

    /// Count of commands matching a predicate.
    pub fn count_matching(&self, pred: impl Fn(&Command) -> bool) -> usize {
        self.commands.iter().filter(|c| pred(c)).count()
    }
}

impl GraphicsBackend for CommandRecorder {
    fn set_polygon_mode(&mut self, mode: PolygonMode) {
        self.commands.push(Command::SetPolygonMode(mode));
    }

    fn set_shade_model(&mut self, model: ShadeModel) {
        self.commands.push(Command::SetShadeModel(model));
    }

    fn set_texture_2d(&mut self, enabled: bool) {
        self.commands.push(Command::SetTexture2d(enabled));
    }

    fn set_cull_enabled(&mut self, enabled: bool) {
        self.commands.push(Command::SetCullEnabled(enabled));
    }

    fn set_cull_face(&mut self, face: CullFace) {
        self.commands.push(Command::SetCullFace(face));
    }

    fn set_front_face(&mut self, winding: FrontFace) {
        self.commands.push(Command::SetFrontFace(winding));
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.commands.push(Command::SetDepthTest(enabled));
    }

    fn set_color_mask(&mut self, enabled: bool) {
        self.commands.push(Command::SetColorMask(enabled));
    }

    fn set_blend(&mut self, enabled: bool) {
        self.commands.push(Command::SetBlend(enabled));
    }

    fn set_blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.commands.push(Command::SetBlendFunc(src, dst));
    }

    fn set_stencil_test(&mut self, enabled: bool) {
        self.commands.push(Command::SetStencilTest(enabled));
    }

    fn set_stencil_func(&mut self, func: CompareFunc, reference: i32, mask: u32) {
        self.commands.push(Command::SetStencilFunc {
            func,
            reference,
            mask,
        });
    }

    fn set_stencil_op(&mut self, stencil_fail: StencilOp, depth_fail: StencilOp, pass: StencilOp) {
        self.commands.push(Command::SetStencilOp {
            stencil_fail,
            depth_fail,
            pass,
        });
    }

    fn set_clear_stencil(&mut self, value: i32) {
        self.commands.push(Command::SetClearStencil(value));
    }

    fn set_clip_plane(&mut self, enabled: bool) {
        self.commands.push(Command::SetClipPlane(enabled));
    }

    fn clip_plane(&mut self, plane: [f64; 4]) {
        self.commands.push(Command::ClipPlane(plane));
    }

    fn set_projection(&mut self, fov_y_degrees: f32, width: u32, height: u32) {
        self.commands.push(Command::SetProjection {
            fov_y_degrees,
            width,
            height,
        });
    }

    fn load_matrix(&mut self, matrix: Mat4) {
        self.commands.push(Command::LoadMatrix(matrix));
    }

    fn push_matrix(&mut self) {
        self.commands.push(Command::PushMatrix);
    }

    fn pop_matrix(&mut self) {
        self.commands.push(Command::PopMatrix);
    }

    fn scale(&mut self, x: f32, y: f32, z: f32) {
        self.commands.push(Command::Scale(x, y, z));
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.commands.push(Command::Viewport {
            x,
            y,
            width,
            height,
        });
    }

    fn set_clear_color(&mut self, rgba: [f32; 4]) {
        self.commands.push(Command::SetClearColor(rgba));
    }

    fn clear(&mut self, mask: ClearMask) {
        self.commands.push(Command::Clear(mask));
    }

    fn create_texture(&mut self, width: u32, height: u32, _rgb: &[u8]) -> TextureId {
        self.next_texture += 1;
        let id = TextureId(self.next_texture);
        self.commands.push(Command::CreateTexture { id, width, height });
        id
    }

    fn update_texture(&mut self, id: TextureId, width: u32, height: u32, _rgb: &[u8]) {
        self.commands.push(Command::UpdateTexture { id, width, height });
    }

    fn bind_texture(&mut self, id: Option<TextureId>) {
        self.commands.push(Command::BindTexture(id));
    }

    fn color(&mut self, rgba: [f32; 4]) {
        self.commands.push(Command::Color(rgba));
    }

    fn draw_triangle_strip(&mut self, vertices: &[StripVertex]) {
        self.commands
            .push(Command::DrawTriangleStrip(vertices.to_vec()));
    }

    fn draw_quad_strip(&mut self, vertices: &[StripVertex]) {
        self.commands.push(Command::DrawQuadStrip(vertices.to_vec()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_ids_are_unique_and_sequential() {
        let mut rec = CommandRecorder::new();
        let a = rec.create_texture(4, 4, &[0; 48]);
        let b = rec.create_texture(4, 4, &[0; 48]);
        assert_ne!(a, b);
        assert_eq!(b, TextureId(2));
    }

    #[test]
    fn take_commands_drains() {
        let mut rec = CommandRecorder::new();
        rec.push_matrix();
        rec.pop_matrix();
        assert_eq!(rec.take_commands().len(), 2);
        assert!(rec.commands().is_empty());
    }
}
