//! Dispatcher: the dedicated thread that owns the backend.
//!
//! It initializes the terminal, reports readiness, then executes commands
//! one by one until `Shutdown`. The [`Executor`] is a scope guard: if the
//! loop ends any other way (fatal error, panic) its `Drop` restores the
//! terminal before anything else happens.

use super::command::{Command, GlobalOp, LocalOp, PanelId, SurfaceId};
use super::oneshot::{self, Reply};
use super::BusState;
use crate::backend::{Backend, Capabilities, Interrupt};
use crate::config::FatalAction;
use crate::error::{Result, TermError};
use crate::layout::Size;
use crossbeam_channel::Receiver;
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, trace, warn};

/// What the session learns once the terminal is up.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Ready {
    pub capabilities: Capabilities,
    pub root_size: Size,
}

/// Handle to the dispatcher thread.
#[derive(Debug)]
pub(crate) struct Dispatcher {
    handle: Option<JoinHandle<()>>,
}

impl Dispatcher {
    /// Start the dispatcher thread and wait for the terminal to come up.
    ///
    /// `guard` is dropped on the dispatcher thread after the terminal has
    /// been restored.
    pub(crate) fn spawn<B, G>(
        backend: B,
        receiver: Receiver<Command>,
        state: Arc<BusState>,
        fatal_action: FatalAction,
        guard: G,
    ) -> Result<(Self, Ready)>
    where
        B: Backend,
        G: Send + 'static,
    {
        let (ready_tx, ready_rx) = oneshot::channel();
        let handle = thread::Builder::new()
            .name("termbus-dispatch".to_string())
            .spawn(move || {
                let _guard = guard;
                let interrupt = state.interrupt().clone();
                let Some(executor) = Executor::start(backend, interrupt, ready_tx) else {
                    return;
                };
                executor.run(&receiver, &state, fatal_action);
            })?;
        let dispatcher = Self {
            handle: Some(handle),
        };
        let ready = ready_rx.wait()??;
        Ok((dispatcher, ready))
    }

    /// Wait for the dispatcher thread to exit.
    pub(crate) fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!(target: "termbus::dispatch", "dispatcher thread panicked");
            }
        }
    }
}

/// Owner of the backend and of the bus-id to native-handle maps.
struct Executor<B: Backend> {
    backend: B,
    surfaces: HashMap<SurfaceId, B::Surface>,
    /// Destroyed surfaces. Late commands for these are skipped, not fatal.
    retired: HashSet<SurfaceId>,
    panels: HashMap<PanelId, (SurfaceId, B::Panel)>,
    interrupt: Interrupt,
    finished: bool,
}

impl<B: Backend> Drop for Executor<B> {
    fn drop(&mut self) {
        if !self.finished {
            self.backend.emergency_shutdown();
        }
    }
}

impl<B: Backend> Executor<B> {
    /// Initialize the terminal and register the root surface.
    fn start(
        backend: B,
        interrupt: Interrupt,
        ready: Reply<io::Result<Ready>>,
    ) -> Option<Self> {
        let mut executor = Self {
            backend,
            surfaces: HashMap::new(),
            retired: HashSet::new(),
            panels: HashMap::new(),
            interrupt,
            finished: false,
        };
        // A half-done initialize is restored by the drop guard.
        let capabilities = match executor.backend.initialize() {
            Ok(capabilities) => capabilities,
            Err(e) => {
                ready.send(Err(e));
                return None;
            }
        };
        let root = executor
            .backend
            .root_surface()
            .and_then(|root| executor.backend.query_size(&root).map(|size| (root, size)));
        match root {
            Ok((root, root_size)) => {
                executor.surfaces.insert(SurfaceId::ROOT, root);
                debug!(target: "termbus::dispatch", ?capabilities, ?root_size, "terminal ready");
                ready.send(Ok(Ready {
                    capabilities,
                    root_size,
                }));
                Some(executor)
            }
            Err(e) => {
                ready.send(Err(e));
                None
            }
        }
    }

    /// Execute commands until `Shutdown`.
    ///
    /// Every command accepted before the bus closed sits ahead of
    /// `Shutdown` in the queue and still runs. Reads among them see the
    /// raised interrupt and return at once.
    fn run(mut self, receiver: &Receiver<Command>, state: &BusState, fatal_action: FatalAction) {
        while let Ok(command) = receiver.recv() {
            if matches!(command, Command::Shutdown) {
                break;
            }
            if let Err(e) = self.execute(command) {
                self.fail(&e, receiver, state, fatal_action);
                return;
            }
        }
        // Only sends that raced `close` can be left; dropping them answers
        // pending requests with `Interrupted`.
        for command in receiver.try_iter() {
            trace!(target: "termbus::dispatch", command = %command, "dropped at shutdown");
        }
        self.finished = true;
        if let Err(e) = self.backend.finalize() {
            warn!(target: "termbus::dispatch", error = %e, "terminal restore failed");
        }
        debug!(target: "termbus::dispatch", "dispatcher stopped");
    }

    fn fail(
        &mut self,
        e: &TermError,
        receiver: &Receiver<Command>,
        state: &BusState,
        fatal_action: FatalAction,
    ) {
        self.finished = true;
        self.backend.emergency_shutdown();
        let message = e.to_string();
        error!(target: "termbus::dispatch", error = %message, "fatal error, terminal restored");
        state.mark_fatal(message.clone());
        receiver.try_iter().for_each(drop);
        eprintln!("termbus: fatal: {message}");
        if let FatalAction::Exit(code) = fatal_action {
            std::process::exit(code);
        }
    }

    fn execute(&mut self, command: Command) -> Result<()> {
        trace!(target: "termbus::dispatch", command = %command, "execute");
        match command {
            Command::Shutdown => Ok(()),
            Command::Global(op) => self.global(op),
            Command::Local { target, op } => self.local(target, op),
        }
    }

    fn global(&mut self, op: GlobalOp) -> Result<()> {
        let result = match op {
            GlobalOp::CreateSurface { id, area, reply } => {
                if self.surfaces.contains_key(&id) {
                    return Err(TermError::ProtocolViolation(format!(
                        "surface {} created twice",
                        id.0
                    )));
                }
                let created = self.backend.create_surface(area).map(|surface| {
                    self.surfaces.insert(id, surface);
                });
                reply.send(created);
                Ok(())
            }
            GlobalOp::DestroySurface(id) => {
                if self.retired.contains(&id) {
                    warn!(target: "termbus::dispatch", surface = id.0, "surface destroyed twice");
                    return Ok(());
                }
                let surface = self
                    .surfaces
                    .remove(&id)
                    .ok_or_else(|| unknown_surface("DESTROY_SURFACE", id))?;
                self.retired.insert(id);
                self.panels.retain(|_, (owner, _)| *owner != id);
                self.backend.destroy_surface(surface)
            }
            GlobalOp::StartColor { reply } => {
                reply.send(self.backend.start_color());
                Ok(())
            }
            GlobalOp::InitPair(pair, fg, bg) => self.backend.init_pair(pair, fg, bg),
            GlobalOp::InitColor(color, value) => self.backend.init_color(color, value),
            GlobalOp::SetColor(pair) => {
                let root = self
                    .surfaces
                    .get(&SurfaceId::ROOT)
                    .ok_or_else(|| unknown_surface("SET_COLOR", SurfaceId::ROOT))?;
                self.backend.set_color_pair(root, pair)
            }
            GlobalOp::SetEcho(enabled) => self.backend.set_echo(enabled),
            GlobalOp::SetCursor(visibility) => self.backend.set_cursor_visibility(visibility),
        };
        absorb(result);
        Ok(())
    }

    fn local(&mut self, target: SurfaceId, op: LocalOp) -> Result<()> {
        let Some(surface) = self.surfaces.get(&target) else {
            if self.retired.contains(&target) {
                // Queued by a producer that raced the destroy. Dropping `op`
                // answers a pending request with `Interrupted`.
                warn!(
                    target: "termbus::dispatch",
                    surface = target.0,
                    "command for destroyed surface skipped"
                );
                return Ok(());
            }
            return Err(unknown_surface("local command", target));
        };
        let backend = &mut self.backend;
        let result = match op {
            LocalOp::Move(to) => backend.move_cursor(surface, to),
            LocalOp::Append(text) => backend.append_text(surface, &text),
            LocalOp::Insert(text) => backend.insert_text(surface, &text),
            LocalOp::DeleteChar => backend.delete_char(surface),
            LocalOp::Refresh => backend.refresh(surface),
            LocalOp::Clear => backend.clear(surface),
            LocalOp::Erase => backend.erase(surface),
            LocalOp::SetScrolling(enabled) => backend.set_scrolling(surface, enabled),
            LocalOp::Scroll(lines) => backend.scroll(surface, lines),
            LocalOp::SetAttributes(attributes) => backend.set_attributes(surface, attributes),
            LocalOp::SetColor(pair) => backend.set_color_pair(surface, pair),
            LocalOp::SetBackground(pair) => backend.set_background(surface, pair),
            LocalOp::Border => backend.draw_border(surface),
            LocalOp::ReadLine { max_len, reply } => {
                match backend.read_line(surface, max_len, &self.interrupt) {
                    Ok(Some(line)) => reply.send(Ok(line)),
                    Ok(None) => debug!(target: "termbus::dispatch", "read line interrupted"),
                    Err(e) => reply.send(Err(e)),
                }
                Ok(())
            }
            LocalOp::ReadKey { reply } => {
                match backend.read_key(surface, &self.interrupt) {
                    Ok(Some(key)) => reply.send(Ok(key)),
                    Ok(None) => debug!(target: "termbus::dispatch", "read key interrupted"),
                    Err(e) => reply.send(Err(e)),
                }
                Ok(())
            }
            LocalOp::QuerySize { reply } => {
                reply.send(backend.query_size(surface));
                Ok(())
            }
            LocalOp::CreatePanel { panel, reply } => {
                if self.panels.contains_key(&panel) {
                    return Err(TermError::ProtocolViolation(format!(
                        "panel {} created twice",
                        panel.0
                    )));
                }
                match backend.create_panel(surface) {
                    Ok(native) => {
                        self.panels.insert(panel, (target, native));
                        reply.send(Ok(()));
                    }
                    Err(e) => reply.send(Err(e)),
                }
                Ok(())
            }
            LocalOp::RaisePanel(panel) => {
                let native = panel_of(&self.panels, panel, target)?;
                backend.raise_panel(native)
            }
            LocalOp::LowerPanel(panel) => {
                let native = panel_of(&self.panels, panel, target)?;
                backend.lower_panel(native)
            }
        };
        absorb(result);
        Ok(())
    }
}

fn unknown_surface(what: &str, id: SurfaceId) -> TermError {
    TermError::ProtocolViolation(format!("{what} targets unknown surface {}", id.0))
}

fn panel_of<P>(
    panels: &HashMap<PanelId, (SurfaceId, P)>,
    panel: PanelId,
    target: SurfaceId,
) -> Result<&P> {
    match panels.get(&panel) {
        Some((owner, native)) if *owner == target => Ok(native),
        Some((owner, _)) => Err(TermError::ProtocolViolation(format!(
            "panel {} belongs to surface {}, not {}",
            panel.0, owner.0, target.0
        ))),
        None => Err(TermError::ProtocolViolation(format!("unknown panel {}", panel.0))),
    }
}

/// Fire-and-forget commands have nobody to report to.
fn absorb(result: io::Result<()>) {
    if let Err(e) = result {
        warn!(target: "termbus::dispatch", error = %e, "terminal call failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{NativeCall, RecordingBackend};
    use crate::bus::Bus;
    use crate::layout::{Position, Rect};
    use pretty_assertions::assert_eq;
    use std::time::{Duration, Instant};

    fn wait_for(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done() {
            assert!(Instant::now() < deadline, "timed out");
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn start(backend: RecordingBackend) -> (Bus, Dispatcher) {
        let (bus, rx) = Bus::new(8, Interrupt::default());
        let (dispatcher, _ready) =
            Dispatcher::spawn(backend, rx, bus.state(), FatalAction::Halt, ()).unwrap();
        (bus, dispatcher)
    }

    #[test]
    fn test_executes_in_order_then_finalizes() {
        let (backend, handle) = RecordingBackend::new();
        let (bus, mut dispatcher) = start(backend);
        bus.enqueue(Command::local(SurfaceId::ROOT, LocalOp::Move(Position::new(1, 1))))
            .unwrap();
        bus.enqueue(Command::local(SurfaceId::ROOT, LocalOp::Append("x".into())))
            .unwrap();
        bus.close();
        dispatcher.join();
        assert_eq!(
            handle.native_calls(),
            vec![
                NativeCall::Initialize,
                NativeCall::QuerySize(0),
                NativeCall::Move(0, Position::new(1, 1)),
                NativeCall::Append(0, "x".into()),
                NativeCall::Finalize,
            ]
        );
    }

    #[test]
    fn test_failed_initialize_is_reported_and_restored() {
        let (backend, handle) = RecordingBackend::new();
        let backend = backend.failing_when(|c| matches!(c, NativeCall::Initialize));
        let (bus, rx) = Bus::new(8, Interrupt::default());
        let err = Dispatcher::spawn(backend, rx, bus.state(), FatalAction::Halt, ()).unwrap_err();
        assert!(matches!(err, TermError::Io(_)));
        // Initialize may have half-configured the terminal.
        wait_for(|| handle.native_calls().contains(&NativeCall::EmergencyShutdown));
        assert_eq!(
            handle.native_calls(),
            vec![NativeCall::Initialize, NativeCall::EmergencyShutdown]
        );
    }

    #[test]
    fn test_close_runs_everything_already_queued() {
        const WRITES: usize = 8;

        let (backend, handle) = RecordingBackend::new();
        let (bus, mut dispatcher) = start(backend.with_delay(Duration::from_millis(2)));
        for i in 0..WRITES {
            bus.enqueue(Command::local(SurfaceId::ROOT, LocalOp::Append(i.to_string())))
                .unwrap();
        }
        assert!(bus.close());
        assert!(matches!(
            bus.enqueue(Command::local(SurfaceId::ROOT, LocalOp::Refresh)),
            Err(TermError::NotInitialized)
        ));
        dispatcher.join();

        let appends: Vec<String> = handle
            .native_calls()
            .into_iter()
            .filter_map(|c| match c {
                NativeCall::Append(_, text) => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(appends, (0..WRITES).map(|i| i.to_string()).collect::<Vec<_>>());
        assert_eq!(handle.native_calls().last(), Some(&NativeCall::Finalize));
    }

    #[test]
    fn test_command_for_destroyed_surface_is_skipped() {
        let (backend, handle) = RecordingBackend::new();
        let (bus, mut dispatcher) = start(backend);
        bus.request(|reply| {
            Command::Global(GlobalOp::CreateSurface {
                id: SurfaceId(1),
                area: Rect::new(0, 0, 2, 2),
                reply,
            })
        })
        .unwrap();
        bus.enqueue(Command::Global(GlobalOp::DestroySurface(SurfaceId(1))))
            .unwrap();
        // Both raced the destroy above.
        bus.enqueue(Command::local(SurfaceId(1), LocalOp::Refresh)).unwrap();
        bus.enqueue(Command::Global(GlobalOp::DestroySurface(SurfaceId(1))))
            .unwrap();
        let err = bus
            .request(|reply| Command::local(SurfaceId(1), LocalOp::QuerySize { reply }))
            .unwrap_err();
        assert!(matches!(err, TermError::Interrupted));

        assert!(bus.is_open());
        assert_eq!(bus.state().fatal(), None);
        bus.close();
        dispatcher.join();
        let calls = handle.native_calls();
        assert!(!calls.contains(&NativeCall::Refresh(1)));
        assert_eq!(
            calls.iter().filter(|c| **c == NativeCall::DestroySurface(1)).count(),
            1
        );
        assert_eq!(calls.last(), Some(&NativeCall::Finalize));
    }

    #[test]
    fn test_unknown_target_is_fatal() {
        let (backend, handle) = RecordingBackend::new();
        let (bus, mut dispatcher) = start(backend);
        bus.enqueue(Command::local(SurfaceId(9), LocalOp::Refresh)).unwrap();
        dispatcher.join();
        assert!(!bus.is_open());
        assert!(bus.state().fatal().unwrap().contains("unknown surface 9"));
        assert_eq!(handle.native_calls().last(), Some(&NativeCall::EmergencyShutdown));
    }

    #[test]
    fn test_backend_failure_on_request_reaches_caller() {
        let (backend, _handle) = RecordingBackend::new();
        let backend = backend.failing_when(|c| matches!(c, NativeCall::CreateSurface { .. }));
        let (bus, mut dispatcher) = start(backend);
        let err = bus
            .request(|reply| {
                Command::Global(GlobalOp::CreateSurface {
                    id: SurfaceId(1),
                    area: Rect::new(0, 0, 2, 2),
                    reply,
                })
            })
            .unwrap_err();
        assert!(matches!(err, TermError::Io(_)));
        // Fire-and-forget failures are only logged.
        bus.enqueue(Command::local(SurfaceId::ROOT, LocalOp::Refresh)).unwrap();
        assert!(bus.is_open());
        bus.close();
        dispatcher.join();
    }

    #[test]
    fn test_foreign_panel_is_fatal() {
        let (backend, _handle) = RecordingBackend::new();
        let (bus, mut dispatcher) = start(backend);
        bus.request(|reply| {
            Command::Global(GlobalOp::CreateSurface {
                id: SurfaceId(1),
                area: Rect::new(0, 0, 2, 2),
                reply,
            })
        })
        .unwrap();
        bus.request(|reply| {
            Command::local(
                SurfaceId(1),
                LocalOp::CreatePanel {
                    panel: PanelId(1),
                    reply,
                },
            )
        })
        .unwrap();
        bus.enqueue(Command::local(SurfaceId::ROOT, LocalOp::RaisePanel(PanelId(1))))
            .unwrap();
        dispatcher.join();
        assert!(bus.state().fatal().unwrap().contains("belongs to surface 1"));
    }
}
