//! Panels: windows with a stacking order.

use super::Window;
use crate::bus::{LocalOp, PanelId};
use crate::error::Result;

/// A window placed in the panel stack.
///
/// Raising or lowering a panel repaints the stack, so overlapping windows
/// show the top-most panel's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panel {
    id: PanelId,
    name: String,
    window: Window,
}

impl Panel {
    pub(crate) fn new(id: PanelId, name: &str, window: Window) -> Self {
        Self {
            id,
            name: name.to_string(),
            window,
        }
    }

    /// The name given at creation.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The window this panel shows.
    pub const fn window(&self) -> &Window {
        &self.window
    }

    /// Move the panel to the top of the stack.
    pub fn raise(&self) -> Result<()> {
        self.window.send_refreshing(LocalOp::RaisePanel(self.id))
    }

    /// Move the panel to the bottom of the stack.
    pub fn lower(&self) -> Result<()> {
        self.window.send_refreshing(LocalOp::LowerPanel(self.id))
    }
}
