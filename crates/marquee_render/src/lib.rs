pub mod camera;
pub mod draw;
pub mod gpu_context;
pub mod sprite_pipeline;
pub mod texture;

pub use camera::{CameraUniform, OverlayCamera};
pub use draw::{Binding, DrawCall, DrawContext};
pub use gpu_context::GpuContext;
pub use sprite_pipeline::{SpritePipeline, SpriteVertex};
pub use texture::Texture;
