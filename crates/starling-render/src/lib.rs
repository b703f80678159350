//! Streaming 2D sprite rendering for wgpu.
//!
//! Sprites are batched on the CPU, expanded to quads, streamed into
//! bounded device buffers with an orphan-and-refill discipline, and drawn
//! with indexed draw calls coalesced over runs of equal render state.
//!
//! The typical frame:
//!
//! ```ignore
//! renderer.add(SpriteDescriptor::new(&texture, position));
//! // ... more sprites ...
//! renderer.begin(&mut pass, &bindings);
//! let stats = renderer.flush(&mut pass, &bindings);
//! ```

pub mod batch;
mod coalesce;
pub mod context;
pub mod effect;
mod quad;
pub mod renderer;
pub mod sprite;
mod stream;
pub mod texture;

pub use batch::{SpriteBatch, SpriteSort};
pub use coalesce::FlushStats;
pub use context::{ContextError, GraphicsContext, GraphicsContextDescriptor};
pub use effect::{BlendMode, SpriteEffect};
pub use quad::SpriteVertex;
pub use renderer::{SpriteEffectApply, SpriteRenderer, SpriteRendererDescriptor};
pub use sprite::{SourceRect, SpriteDescriptor};
pub use texture::{SpriteTexture, TextureBindings};
