//! Process-scoped state shared by a session and its windows.
//!
//! The window registry and the color tables live here instead of in globals,
//! created by `Session::init` and cleared by `Session::end`.

use crate::backend::Capabilities;
use crate::bus::{Bus, PanelId, SurfaceId};
use crate::error::{Result, TermError};
use crate::format::MarkerTable;
use crate::layout::Size;
use crate::style::{ColorTable, PairId};
use crate::window::Window;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Name of the root window.
pub const ROOT_WINDOW: &str = "stdscr";

#[derive(Debug)]
pub(crate) struct Context {
    pub bus: Bus,
    pub capabilities: Capabilities,
    pub markers: MarkerTable,
    pub read_limit: usize,
    root_size: Mutex<Size>,
    windows: Mutex<HashMap<String, Window>>,
    colors: RwLock<ColorTable>,
    next_surface: AtomicU32,
    next_panel: AtomicU32,
}

impl Context {
    pub fn new(
        bus: Bus,
        capabilities: Capabilities,
        root_size: Size,
        markers: MarkerTable,
        read_limit: usize,
    ) -> Self {
        Self {
            bus,
            capabilities,
            markers,
            read_limit,
            root_size: Mutex::new(root_size),
            windows: Mutex::new(HashMap::new()),
            colors: RwLock::new(ColorTable::new()),
            next_surface: AtomicU32::new(1),
            next_panel: AtomicU32::new(1),
        }
    }

    /// Fail with `NotInitialized` once the bus is closed.
    pub fn ensure_open(&self) -> Result<()> {
        if self.bus.is_open() {
            Ok(())
        } else {
            Err(TermError::NotInitialized)
        }
    }

    pub fn root_size(&self) -> Size {
        *lock(&self.root_size)
    }

    pub fn set_root_size(&self, size: Size) {
        *lock(&self.root_size) = size;
    }

    pub fn next_surface(&self) -> SurfaceId {
        SurfaceId(self.next_surface.fetch_add(1, Ordering::Relaxed))
    }

    pub fn next_panel(&self) -> PanelId {
        PanelId(self.next_panel.fetch_add(1, Ordering::Relaxed))
    }

    /// Add a window under its name.
    pub fn register(&self, window: Window) -> Result<()> {
        let mut windows = lock(&self.windows);
        if windows.contains_key(window.name()) {
            return Err(TermError::InvalidArgument(format!(
                "window \"{}\" already exists",
                window.name()
            )));
        }
        windows.insert(window.name().to_string(), window);
        Ok(())
    }

    /// Check a name is free without registering it.
    pub fn ensure_unique(&self, name: &str) -> Result<()> {
        if lock(&self.windows).contains_key(name) {
            return Err(TermError::InvalidArgument(format!("window \"{name}\" already exists")));
        }
        Ok(())
    }

    pub fn unregister(&self, name: &str) -> Option<Window> {
        lock(&self.windows).remove(name)
    }

    pub fn window(&self, name: &str) -> Result<Window> {
        lock(&self.windows)
            .get(name)
            .cloned()
            .ok_or_else(|| TermError::not_found("window", name))
    }

    /// Drop every window. Breaks the window/context reference cycle.
    pub fn clear(&self) -> Vec<Window> {
        lock(&self.windows).drain().map(|(_, w)| w).collect()
    }

    pub fn colors(&self) -> RwLockReadGuard<'_, ColorTable> {
        self.colors.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn colors_mut(&self) -> RwLockWriteGuard<'_, ColorTable> {
        self.colors.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn pair(&self, name: &str) -> Result<PairId> {
        self.colors().pair(name)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
