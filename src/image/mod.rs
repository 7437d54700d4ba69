//! Image lifecycle
//!
//! - [`ImageHandle`]: query a named image (id, existence, labels)
//! - [`BuildableImage`]: run commands in an ephemeral container, commit,
//!   tag, and move the result between the local store and a registry
//! - [`ScratchImage`]: the empty origin used when no base image is set

pub mod argument;
mod buildable;
mod handle;
mod scratch;

pub use argument::{render_options, ImageOptions, OptionMap, RenderedOptions};
pub use buildable::BuildableImage;
pub use handle::{image_config_option, ImageHandle};
pub use scratch::ScratchImage;

use crate::error::BuildResult;
use async_trait::async_trait;

/// An image that build containers can be started from
#[async_trait]
pub trait ParentImage: Send {
    fn name(&self) -> &str;

    /// Id to start containers from, `None` when the image is not built
    async fn built_id(&mut self) -> BuildResult<Option<String>>;

    /// Make the image available locally
    async fn pull(&mut self) -> BuildResult<()>;

    /// Whether the image resolves to an id without building anything
    async fn is_tagged(&mut self) -> BuildResult<bool>;
}
