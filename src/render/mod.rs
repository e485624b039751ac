pub mod command_recorder;
pub mod floor;
pub mod mirror;
pub mod mode;
pub mod model_renderer;

pub use command_recorder::{Command, CommandRecorder};
pub use mode::{setup_render_mode, RenderMode};
pub use model_renderer::{DrawFlags, ModelRenderer};
