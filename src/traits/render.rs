use glam::Mat4;

/// Texture handle for referencing uploaded textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u64);

/// Polygon rasterization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonMode {
    Fill,
    Line,
}

/// Shading interpolation across a primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadeModel {
    Flat,
    Smooth,
}

/// Which face set gets culled when face culling is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullFace {
    Front,
    Back,
}

impl CullFace {
    /// The opposite face set. Used when a mirror transform inverts winding.
    pub fn inverted(self) -> Self {
        match self {
            CullFace::Front => CullFace::Back,
            CullFace::Back => CullFace::Front,
        }
    }
}

/// Winding order considered front-facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontFace {
    Clockwise,
    CounterClockwise,
}

/// Comparison function for the stencil test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareFunc {
    Always,
    Equal,
}

/// Stencil buffer operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilOp {
    Keep,
    Replace,
}

/// Blend factors for the fixed-function blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    One,
    Zero,
    SrcAlpha,
    OneMinusSrcAlpha,
}

/// Which buffers a clear call touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClearMask {
    pub color: bool,
    pub depth: bool,
    pub stencil: bool,
}

impl ClearMask {
    pub const COLOR_DEPTH: Self = Self {
        color: true,
        depth: true,
        stencil: false,
    };

    pub const COLOR_DEPTH_STENCIL: Self = Self {
        color: true,
        depth: true,
        stencil: true,
    };
}

/// A vertex as submitted to strip primitives: position and texture coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StripVertex {
    pub pos: [f32; 3],
    pub uv: [f32; 2],
}

impl StripVertex {
    pub fn new(pos: [f32; 3], uv: [f32; 2]) -> Self {
        Self { pos, uv }
    }
}

/// Abstraction over the primitive-drawing surface.
///
/// The core issues a deterministic sequence of these calls each frame and
/// never reads pixels back. Implementations: a real graphics-API binding
/// (out of tree), `CommandRecorder` (testing).
pub trait GraphicsBackend {
    // Rasterizer state
    fn set_polygon_mode(&mut self, mode: PolygonMode);
    fn set_shade_model(&mut self, model: ShadeModel);
    fn set_texture_2d(&mut self, enabled: bool);
    fn set_cull_enabled(&mut self, enabled: bool);
    fn set_cull_face(&mut self, face: CullFace);
    fn set_front_face(&mut self, winding: FrontFace);
    fn set_depth_test(&mut self, enabled: bool);
    fn set_color_mask(&mut self, enabled: bool);
    fn set_blend(&mut self, enabled: bool);
    fn set_blend_func(&mut self, src: BlendFactor, dst: BlendFactor);

    // Stencil state
    fn set_stencil_test(&mut self, enabled: bool);
    fn set_stencil_func(&mut self, func: CompareFunc, reference: i32, mask: u32);
    fn set_stencil_op(&mut self, stencil_fail: StencilOp, depth_fail: StencilOp, pass: StencilOp);
    fn set_clear_stencil(&mut self, value: i32);

    // Clip plane (a single user plane is sufficient for the ground mirror)
    fn set_clip_plane(&mut self, enabled: bool);
    fn clip_plane(&mut self, plane: [f64; 4]);

    // Transform stack
    fn set_projection(&mut self, fov_y_degrees: f32, width: u32, height: u32);
    fn load_matrix(&mut self, matrix: Mat4);
    fn push_matrix(&mut self);
    fn pop_matrix(&mut self);
    fn scale(&mut self, x: f32, y: f32, z: f32);

    // Frame setup
    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32);
    fn set_clear_color(&mut self, rgba: [f32; 4]);
    fn clear(&mut self, mask: ClearMask);

    // Textures (24-bit RGB, row-major)
    fn create_texture(&mut self, width: u32, height: u32, rgb: &[u8]) -> TextureId;
    fn update_texture(&mut self, id: TextureId, width: u32, height: u32, rgb: &[u8]);
    fn bind_texture(&mut self, id: Option<TextureId>);

    // Primitive submission
    fn color(&mut self, rgba: [f32; 4]);
    fn draw_triangle_strip(&mut self, vertices: &[StripVertex]);
    fn draw_quad_strip(&mut self, vertices: &[StripVertex]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cull_face_inversion() {
        assert_eq!(CullFace::Front.inverted(), CullFace::Back);
        assert_eq!(CullFace::Back.inverted(), CullFace::Front);
    }

    #[test]
    fn clear_mask_presets() {
        assert!(!ClearMask::COLOR_DEPTH.stencil);
        assert!(ClearMask::COLOR_DEPTH_STENCIL.stencil);
        assert!(!ClearMask::default().color);
    }
}
