// Studio model viewer core.
//
// Loads Half-Life style studio models, evaluates poses, and turns viewer
// state into a deterministic stream of backend draw calls. The graphics
// backend and the animation decoder are both trait seams, so the whole
// frame path runs headless under tests.

pub mod config;
pub mod model;
pub mod palette;
pub mod pose;
pub mod render;
pub mod scene;
pub mod traits;

pub use config::ViewerSettings;
pub use model::{Entity, StudioModel};
pub use pose::{AnimationDecoder, RestPoseDecoder};
pub use render::{DrawFlags, ModelRenderer, RenderMode};
pub use scene::{Camera, Scene};
