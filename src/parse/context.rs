//! Parser state threaded through every chunk handler.

use crate::options::LoadOptions;
use crate::scene::builder::SceneGraphBuilder;

/// Everything a chunk handler needs: the scene under construction, the
/// loader configuration, and the progress hook. One value per load call; no
/// state outlives the call.
pub struct ParseContext<'a> {
    pub builder: SceneGraphBuilder,
    pub options: &'a LoadOptions,
    pub progress: Option<&'a mut dyn FnMut(&str)>,
    /// Fallback node id for keyframer nodes without an explicit id chunk;
    /// increments per node in file order.
    pub next_node_id: i32,
}

impl<'a> ParseContext<'a> {
    pub fn new(
        options: &'a LoadOptions,
        progress: Option<&'a mut dyn FnMut(&str)>,
    ) -> ParseContext<'a> {
        ParseContext {
            builder: SceneGraphBuilder::new(),
            options,
            progress,
            next_node_id: 0,
        }
    }

    /// Fire-and-forget status notification.
    pub fn notify(&mut self, message: &str) {
        if let Some(hook) = self.progress.as_mut() {
            hook(message);
        }
    }
}
