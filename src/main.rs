//! area-window
//!
//! A small X11 manager built around the per-client window controller. It
//! adopts top-level windows, routes every event to the window that owns the
//! target handle and hands all clients back to the root on exit.

mod x11_async;

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use x11rb::protocol::Event;
use x11rb::protocol::xproto::Window;

use area_window::config::Config;
use area_window::shared::Geometry;
use area_window::wm::display::X11Display;
use area_window::wm::{
    EventResult, ManagedSummary, ManagedWindow, ScreenContext, WindowEvent, XError,
};

/// Core font used for titles
const LABEL_FONT: &str = "fixed";

/// Rounds of focus redirection settled after one event
const FOCUS_ROUNDS: usize = 4;

/// Signals delivered to the event loop
#[derive(Debug, Clone, Copy)]
enum Control {
    Shutdown,
    Reload,
}

/// Managed windows plus the screen-wide state they consult
#[derive(Default)]
struct Registry {
    /// Keyed by client window
    windows: HashMap<Window, ManagedWindow>,
    area: Geometry,
    current_workspace: u32,
    workspaces: HashMap<Window, u32>,
    /// One-shot double-click deadlines
    timers: HashMap<Window, Instant>,
    menu: Option<Window>,
    /// Clients in the order they last received focus
    focus_order: Vec<Window>,
    focus_requests: Vec<(Window, Option<Window>)>,
}

impl Registry {
    /// Client whose window tree contains `handle`
    fn client_of(&self, handle: Window) -> Option<Window> {
        if self.windows.contains_key(&handle) {
            return Some(handle);
        }
        self.windows
            .iter()
            .find(|(_, window)| window.owns(handle))
            .map(|(client, _)| *client)
    }

    /// Most recently focused visible window other than `from`
    fn next_focus(&self, from: Window) -> Option<Window> {
        self.focus_order.iter().rev().copied().find(|client| {
            *client != from
                && self.windows.get(client).is_some_and(|w| {
                    w.is_visible() && w.policy().focus_mode.accepts_focus()
                })
        })
    }

    fn focused(&mut self, client: Window) {
        self.focus_order.retain(|c| *c != client);
        self.focus_order.push(client);
    }

    fn forget(&mut self, client: Window) {
        self.timers.remove(&client);
        self.workspaces.remove(&client);
        self.focus_order.retain(|c| *c != client);
        if self.menu == Some(client) {
            self.menu = None;
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().min().copied()
    }
}

impl ScreenContext for Registry {
    fn find_managed(&self, handle: Window) -> Option<ManagedSummary> {
        let client = self.client_of(handle)?;
        self.windows.get(&client).map(|w| w.summary())
    }

    fn link_transient(&mut self, parent: Window, child: Option<Window>) {
        if let Some(window) = self.windows.get_mut(&parent) {
            window.set_transient(child);
        }
    }

    fn usable_area(&self) -> Geometry {
        self.area
    }

    fn current_workspace(&self) -> u32 {
        self.current_workspace
    }

    fn assign_workspace(&mut self, client: Window, workspace: u32) {
        debug!("Client 0x{:x} on workspace {}", client, workspace);
        self.workspaces.insert(client, workspace);
    }

    fn schedule_timeout(&mut self, client: Window, after: Duration) {
        self.timers.insert(client, Instant::now() + after);
    }

    fn cancel_timeout(&mut self, client: Window) {
        self.timers.remove(&client);
    }

    fn show_menu(&mut self, client: Window, x: i32, y: i32) {
        info!("Window menu for 0x{:x} requested at ({}, {})", client, x, y);
        self.menu = Some(client);
    }

    fn hide_menu(&mut self, client: Window) {
        if self.menu == Some(client) {
            debug!("Window menu for 0x{:x} hidden", client);
            self.menu = None;
        }
    }

    fn redirect_focus(&mut self, from: Window, to: Option<Window>) {
        self.focus_requests.push((from, to));
    }
}

/// Main application state
struct AreaApp {
    display: X11Display,
    x11_stream: x11_async::X11EventStream,
    registry: Registry,
    config: Config,
}

impl AreaApp {
    fn new(config: Config) -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("Failed to connect to X server")?;
        let conn = Arc::new(conn);
        let root = x11rb::connection::Connection::setup(conn.as_ref()).roots[screen_num].root;
        info!("Connected to X server, screen {}, root window 0x{:x}", screen_num, root);

        let display = X11Display::new(conn.clone(), root, LABEL_FONT)?;
        display.become_manager()?;
        let x11_stream = x11_async::X11EventStream::new(conn)
            .context("Failed to initialize X11 event stream")?;

        let registry = Registry {
            area: display.screen_area(screen_num),
            ..Registry::default()
        };
        let mut app = Self {
            display,
            x11_stream,
            registry,
            config,
        };

        for client in app.display.existing_clients()? {
            app.manage(client);
        }
        app.settle_focus();
        Ok(app)
    }

    fn manage(&mut self, client: Window) {
        match ManagedWindow::manage(&self.display, &mut self.registry, client, &self.config) {
            Ok(mut window) => {
                window.set_window_number(self.registry.windows.len());
                self.registry.windows.insert(client, window);
            }
            Err(XError::Stale(_)) => debug!("Client 0x{:x} vanished before it was managed", client),
            Err(e) => warn!("Failed to manage 0x{:x}: {}", client, e),
        }
    }

    async fn run(mut self, mut control: mpsc::Receiver<Control>) -> Result<()> {
        info!("Starting main event loop");
        loop {
            if let Err(e) = self.display.flush() {
                error!("X11 connection lost: {}", e);
                break;
            }

            let deadline = self.registry.next_deadline();
            tokio::select! {
                () = self.x11_stream.wait_readable() => {}
                _ = async {
                    match deadline {
                        Some(at) => tokio::time::sleep_until(at.into()).await,
                        None => std::future::pending::<()>().await,
                    }
                }, if deadline.is_some() => {
                    self.fire_timers();
                }
                message = control.recv() => match message {
                    Some(Control::Reload) => self.reload(),
                    Some(Control::Shutdown) | None => break,
                },
            }

            // events queued while handling are drained too
            loop {
                match self.x11_stream.poll_next_event() {
                    Ok(Some(event)) => self.handle_event(event),
                    Ok(None) => break,
                    Err(e) => {
                        error!("Error polling for X11 events: {}", e);
                        self.release_all();
                        return Err(e);
                    }
                }
            }
        }

        self.release_all();
        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        if let Event::Error(e) = &event {
            // usually a request racing a client that just went away
            debug!("X11 error: {:?}", e);
            return;
        }
        let Some(event) = self.display.translate(&event) else {
            return;
        };
        let target = event.target();
        match (self.registry.client_of(target), event) {
            (Some(client), event) => {
                if let WindowEvent::Focus { focused: true, .. } = event {
                    self.registry.focused(client);
                }
                self.dispatch(client, &event);
            }
            (None, WindowEvent::MapRequest(window)) => self.manage(window),
            (None, WindowEvent::ConfigureRequest(request)) => {
                if let Err(e) = self.display.configure_unmanaged(&request) {
                    debug!("Configure of unmanaged 0x{:x} failed: {}", request.window, e);
                }
            }
            (None, event) => trace!("Ignoring {:?} for unmanaged 0x{:x}", event, target),
        }
        self.settle_focus();
    }

    /// Run one event against its window. The window is taken out of the
    /// registry for the call so it can consult the others.
    fn dispatch(&mut self, client: Window, event: &WindowEvent) {
        let Some(mut window) = self.registry.windows.remove(&client) else {
            return;
        };
        match window.dispatch(&self.display, &mut self.registry, event) {
            Ok(EventResult::Unmanage) => {
                info!("Unmanaged 0x{:x}", client);
                self.registry.forget(client);
            }
            Ok(_) => {
                self.registry.windows.insert(client, window);
            }
            Err(e) => {
                warn!("Event {:?} for 0x{:x} failed: {}", event, client, e);
                self.registry.windows.insert(client, window);
            }
        }
    }

    /// Carry out focus hand-offs requested while handling an event
    fn settle_focus(&mut self) {
        for _ in 0..FOCUS_ROUNDS {
            let requests = std::mem::take(&mut self.registry.focus_requests);
            if requests.is_empty() {
                return;
            }
            for (from, to) in requests {
                let target = to.or_else(|| self.registry.next_focus(from));
                let Some(mut window) = target.and_then(|t| self.registry.windows.remove(&t)) else {
                    if let Err(e) = self.display.focus_root() {
                        warn!("Failed to reset focus: {}", e);
                    }
                    continue;
                };
                let client = window.client();
                if let Err(e) = window.set_input_focus(&self.display, &mut self.registry) {
                    debug!("Focus hand-off to 0x{:x} failed: {}", client, e);
                }
                self.registry.windows.insert(client, window);
            }
        }
        warn!("Focus redirection did not settle");
        self.registry.focus_requests.clear();
    }

    fn fire_timers(&mut self) {
        let now = Instant::now();
        let expired: Vec<Window> = self
            .registry
            .timers
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(client, _)| *client)
            .collect();
        for client in expired {
            self.registry.timers.remove(&client);
            if let Some(window) = self.registry.windows.get_mut(&client) {
                window.timeout();
            }
        }
    }

    fn reload(&mut self) {
        let config = match Config::load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Keeping current configuration: {:#}", e);
                return;
            }
        };
        info!("Configuration reloaded");
        self.config = config;
        for window in self.registry.windows.values_mut() {
            if let Err(e) = window.reconfigure(&self.display, &self.config) {
                warn!("Failed to reconfigure 0x{:x}: {}", window.client(), e);
            }
        }
    }

    /// Hand every client back to the root window, mapped
    fn release_all(&mut self) {
        info!("Releasing {} clients", self.registry.windows.len());
        let windows: Vec<(Window, ManagedWindow)> = self.registry.windows.drain().collect();
        for (client, mut window) in windows {
            if let Err(e) = window.restore(&self.display, &mut self.registry, true) {
                warn!("Failed to release 0x{:x}: {}", client, e);
            }
        }
        if let Err(e) = self.display.flush() {
            warn!("Failed to flush on exit: {}", e);
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "area_window=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting area-window");
    let config = Config::load().context("Failed to load configuration")?;

    let (control_tx, control_rx) = mpsc::channel::<Control>(4);
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sighup = signal(SignalKind::hangup())?;
        tokio::spawn(async move {
            loop {
                let message = tokio::select! {
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down gracefully");
                        Control::Shutdown
                    }
                    _ = sigint.recv() => {
                        info!("Received SIGINT, shutting down gracefully");
                        Control::Shutdown
                    }
                    _ = sighup.recv() => {
                        info!("Received SIGHUP, reloading configuration");
                        Control::Reload
                    }
                };
                if control_tx.send(message).await.is_err() {
                    return;
                }
            }
        });
    }

    let app = AreaApp::new(config)?;
    app.run(control_rx).await
}
