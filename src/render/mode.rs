// Render mode state table.
//
// Each mode is a fixed bundle of rasterizer state applied before the model
// is drawn. The enum is total; there is no invalid sentinel to check for.

use serde::{Deserialize, Serialize};

use crate::traits::render::{GraphicsBackend, PolygonMode, ShadeModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RenderMode {
    Wireframe,
    FlatShaded,
    SmoothShaded,
    #[default]
    TextureShaded,
}

/// Applies the rasterizer state for a render mode.
///
/// `backface_culling` is honored by the shaded modes; wireframe always draws
/// both faces.
pub fn setup_render_mode(backend: &mut dyn GraphicsBackend, mode: RenderMode, backface_culling: bool) {
    match mode {
        RenderMode::Wireframe => {
            backend.set_polygon_mode(PolygonMode::Line);
            backend.set_texture_2d(false);
            backend.set_cull_enabled(false);
            backend.set_depth_test(true);
        }
        RenderMode::FlatShaded | RenderMode::SmoothShaded => {
            backend.set_polygon_mode(PolygonMode::Fill);
            backend.set_texture_2d(false);
            backend.set_cull_enabled(backface_culling);
            backend.set_depth_test(true);
            backend.set_shade_model(if mode == RenderMode::FlatShaded {
                ShadeModel::Flat
            } else {
                ShadeModel::Smooth
            });
        }
        RenderMode::TextureShaded => {
            backend.set_polygon_mode(PolygonMode::Fill);
            backend.set_texture_2d(true);
            backend.set_cull_enabled(backface_culling);
            backend.set_depth_test(true);
            backend.set_shade_model(ShadeModel::Smooth);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::command_recorder::{Command, CommandRecorder};

    #[test]
    fn wireframe_disables_texture_and_culling() {
        let mut rec = CommandRecorder::new();
        setup_render_mode(&mut rec, RenderMode::Wireframe, true);
        assert_eq!(
            rec.commands(),
            &[
                Command::SetPolygonMode(PolygonMode::Line),
                Command::SetTexture2d(false),
                Command::SetCullEnabled(false),
                Command::SetDepthTest(true),
            ]
        );
    }

    #[test]
    fn flat_shaded_selects_flat_model() {
        let mut rec = CommandRecorder::new();
        setup_render_mode(&mut rec, RenderMode::FlatShaded, false);
        assert!(rec
            .commands()
            .contains(&Command::SetShadeModel(ShadeModel::Flat)));
        assert!(rec.commands().contains(&Command::SetCullEnabled(false)));
    }

    #[test]
    fn texture_shaded_enables_texturing_and_honors_culling() {
        let mut rec = CommandRecorder::new();
        setup_render_mode(&mut rec, RenderMode::TextureShaded, true);
        assert!(rec.commands().contains(&Command::SetTexture2d(true)));
        assert!(rec.commands().contains(&Command::SetCullEnabled(true)));
        assert!(rec
            .commands()
            .contains(&Command::SetShadeModel(ShadeModel::Smooth)));
    }
}
