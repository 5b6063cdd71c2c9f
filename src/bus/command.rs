//! Commands carried by the bus.
//!
//! Each variant holds exactly the payload its operation needs. Requests that
//! expect an answer carry a [`Reply`].

use super::oneshot::Reply;
use crate::backend::{CursorVisibility, Key};
use crate::layout::{Position, Rect, Size};
use crate::style::{Attributes, Color, CustomColor, PairId};
use std::fmt;
use std::io;

/// Identity of a surface on the bus. The dispatcher maps it to the native
/// handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u32);

impl SurfaceId {
    /// The full-screen root surface.
    pub const ROOT: Self = Self(0);
}

/// Identity of a panel on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PanelId(pub u32);

/// Whether a command targets one surface or the shared terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Terminal-wide.
    Global,
    /// One surface.
    Local,
}

/// Answer to a request, as produced by the backend.
pub type Answer<T> = Reply<io::Result<T>>;

/// Operations on the shared terminal state.
#[derive(Debug)]
pub enum GlobalOp {
    /// Allocate the native surface for `id`.
    CreateSurface {
        /// Bus identity of the new surface.
        id: SurfaceId,
        /// Placement on screen.
        area: Rect,
        /// Creation outcome.
        reply: Answer<()>,
    },
    /// Release a surface. Later commands targeting it are protocol violations.
    DestroySurface(SurfaceId),
    /// Enable color mode.
    StartColor {
        /// Outcome.
        reply: Answer<()>,
    },
    /// Define a color pair.
    InitPair(PairId, Color, Color),
    /// Define a custom color.
    InitColor(Color, CustomColor),
    /// Apply a color pair to the default (root) target.
    SetColor(PairId),
    /// Toggle echo of typed input.
    SetEcho(bool),
    /// Change cursor visibility.
    SetCursor(CursorVisibility),
}

/// Operations on a single surface.
#[allow(missing_docs)]
#[derive(Debug)]
pub enum LocalOp {
    Move(Position),
    Append(String),
    Insert(String),
    DeleteChar,
    Refresh,
    Clear,
    Erase,
    SetScrolling(bool),
    Scroll(i32),
    SetAttributes(Attributes),
    SetColor(PairId),
    SetBackground(PairId),
    Border,
    /// Block for a line of at most `max_len` bytes.
    ReadLine {
        max_len: usize,
        reply: Answer<Vec<u8>>,
    },
    /// Block for a single key.
    ReadKey {
        reply: Answer<Key>,
    },
    QuerySize {
        reply: Answer<Size>,
    },
    /// Register the target surface as panel `panel`.
    CreatePanel {
        panel: PanelId,
        reply: Answer<()>,
    },
    RaisePanel(PanelId),
    LowerPanel(PanelId),
}

/// A unit of work for the dispatcher.
#[derive(Debug)]
pub enum Command {
    /// Terminal-wide operation.
    Global(GlobalOp),
    /// Operation on `target`.
    Local {
        /// Surface the operation applies to.
        target: SurfaceId,
        /// The operation.
        op: LocalOp,
    },
    /// Stop the dispatcher. Sent once, by close.
    Shutdown,
}

impl Command {
    /// Shorthand for a local command.
    pub const fn local(target: SurfaceId, op: LocalOp) -> Self {
        Self::Local { target, op }
    }

    /// Scope of the command. `Shutdown` is global.
    pub const fn scope(&self) -> Scope {
        match self {
            Self::Local { .. } => Scope::Local,
            Self::Global(_) | Self::Shutdown => Scope::Global,
        }
    }

    /// Tag name for logs and diagnostics.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Shutdown => "SHUTDOWN",
            Self::Global(op) => match op {
                GlobalOp::CreateSurface { .. } => "CREATE_SURFACE",
                GlobalOp::DestroySurface(_) => "DESTROY_SURFACE",
                GlobalOp::StartColor { .. } => "START_COLOR",
                GlobalOp::InitPair(..) => "INIT_PAIR",
                GlobalOp::InitColor(..) => "INIT_COLOR",
                GlobalOp::SetColor(_) => "SET_COLOR",
                GlobalOp::SetEcho(_) => "SET_ECHO",
                GlobalOp::SetCursor(_) => "SET_CURSOR",
            },
            Self::Local { op, .. } => match op {
                LocalOp::Move(_) => "MOVE",
                LocalOp::Append(_) => "APPEND",
                LocalOp::Insert(_) => "INSERT",
                LocalOp::DeleteChar => "DELETE_CHAR",
                LocalOp::Refresh => "REFRESH",
                LocalOp::Clear => "CLEAR",
                LocalOp::Erase => "ERASE",
                LocalOp::SetScrolling(_) => "SET_SCROLLING",
                LocalOp::Scroll(_) => "SCROLL",
                LocalOp::SetAttributes(_) => "SET_ATTRIBUTES",
                LocalOp::SetColor(_) => "SET_COLOR",
                LocalOp::SetBackground(_) => "SET_BACKGROUND",
                LocalOp::Border => "BORDER",
                LocalOp::ReadLine { .. } => "READ_LINE",
                LocalOp::ReadKey { .. } => "READ_KEY",
                LocalOp::QuerySize { .. } => "QUERY_SIZE",
                LocalOp::CreatePanel { .. } => "CREATE_PANEL",
                LocalOp::RaisePanel(_) => "RAISE_PANEL",
                LocalOp::LowerPanel(_) => "LOWER_PANEL",
            },
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local { target, .. } => write!(f, "{} on surface {}", self.name(), target.0),
            _ => f.write_str(self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::oneshot;

    #[test]
    fn test_scope_and_name() {
        let cmd = Command::local(SurfaceId(3), LocalOp::Refresh);
        assert_eq!(cmd.scope(), Scope::Local);
        assert_eq!(cmd.to_string(), "REFRESH on surface 3");

        let cmd = Command::Global(GlobalOp::SetEcho(false));
        assert_eq!(cmd.scope(), Scope::Global);
        assert_eq!(cmd.to_string(), "SET_ECHO");
    }

    #[test]
    fn test_request_carries_reply() {
        let (reply, pending) = oneshot::channel();
        let cmd = Command::local(SurfaceId::ROOT, LocalOp::QuerySize { reply });
        assert_eq!(cmd.name(), "QUERY_SIZE");
        if let Command::Local {
            op: LocalOp::QuerySize { reply },
            ..
        } = cmd
        {
            reply.send(Ok(Size::new(24, 80)));
        }
        assert_eq!(pending.wait().unwrap().unwrap(), Size::new(24, 80));
    }
}
