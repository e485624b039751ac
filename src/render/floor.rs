// Ground plane drawing.
//
// The floor is a single triangle strip in the Z=0 plane, centered on the
// origin. Texture coordinates are arranged so one repeat_length sized patch
// holds one repetition of the texture and a zero offset repeats from the
// origin.

use glam::Vec2;

use crate::traits::render::{
    BlendFactor, CullFace, FrontFace, GraphicsBackend, PolygonMode, StripVertex, TextureId,
};

/// Alpha used when the floor is drawn with a texture.
const TEXTURED_FLOOR_ALPHA: f32 = 0.6;

/// Alpha used when the floor is a flat colored quad.
const COLORED_FLOOR_ALPHA: f32 = 0.7;

/// Color of the underside quad drawn beneath a mirror floor.
const MIRROR_UNDERSIDE_COLOR: [f32; 4] = [0.1, 0.1, 0.1, 1.0];

/// The four strip vertices of a floor quad of the given side length.
pub fn floor_quad(floor_length: f32, texture_repeat_length: f32, texture_offset: Vec2) -> [StripVertex; 4] {
    let vertex_coord = floor_length / 2.0;
    let repetition = vertex_coord / texture_repeat_length;

    let texture_max = repetition + 0.5;
    let texture_min = -repetition + 0.5;

    let offset = texture_offset / texture_repeat_length;

    [
        StripVertex::new(
            [-vertex_coord, vertex_coord, 0.0],
            [texture_min + offset.x, texture_min + offset.y],
        ),
        StripVertex::new(
            [-vertex_coord, -vertex_coord, 0.0],
            [texture_min + offset.x, texture_max + offset.y],
        ),
        StripVertex::new(
            [vertex_coord, vertex_coord, 0.0],
            [texture_max + offset.x, texture_min + offset.y],
        ),
        StripVertex::new(
            [vertex_coord, -vertex_coord, 0.0],
            [texture_max + offset.x, texture_max + offset.y],
        ),
    ]
}

pub fn draw_floor_quad(
    backend: &mut dyn GraphicsBackend,
    floor_length: f32,
    texture_repeat_length: f32,
    texture_offset: Vec2,
) {
    let quad = floor_quad(floor_length, texture_repeat_length, texture_offset);
    backend.draw_triangle_strip(&quad);
}

/// Draws the ground quad, blended over whatever is already in the frame.
///
/// With `mirror` set the floor is drawn semi-transparent over the reflection
/// with reversed winding, then a dark opaque quad is drawn underneath so the
/// reflection does not show through the world from below.
pub fn draw_floor(
    backend: &mut dyn GraphicsBackend,
    floor_length: f32,
    texture_repeat_length: f32,
    texture_offset: Vec2,
    ground_texture: Option<TextureId>,
    ground_color: [f32; 3],
    mirror: bool,
) {
    backend.set_cull_face(CullFace::Front);

    backend.set_polygon_mode(PolygonMode::Fill);
    backend.set_depth_test(true);
    backend.set_cull_enabled(true);

    if mirror {
        backend.set_front_face(FrontFace::Clockwise);
    } else {
        backend.set_cull_enabled(false);
    }

    backend.set_blend(true);
    match ground_texture {
        None => {
            backend.set_texture_2d(false);
            backend.color([
                ground_color[0],
                ground_color[1],
                ground_color[2],
                COLORED_FLOOR_ALPHA,
            ]);
            backend.bind_texture(None);
        }
        Some(texture) => {
            backend.set_texture_2d(true);
            backend.color([1.0, 1.0, 1.0, TEXTURED_FLOOR_ALPHA]);
            backend.bind_texture(Some(texture));
        }
    }

    backend.set_blend_func(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);

    draw_floor_quad(backend, floor_length, texture_repeat_length, texture_offset);

    backend.set_blend(false);

    if mirror {
        backend.set_cull_face(CullFace::Back);
        backend.color(MIRROR_UNDERSIDE_COLOR);
        backend.bind_texture(None);
        draw_floor_quad(backend, floor_length, texture_repeat_length, texture_offset);

        backend.set_front_face(FrontFace::CounterClockwise);
    } else {
        backend.set_cull_enabled(true);
    }
}
