use crate::button::{TaskButton, ICON_SIZE, UNFOCUSED_OPACITY};
use crate::host::{DesktopEvent, EventFlow, HostConnection, WindowId, WindowType};
use crate::signals::{Signal, SignalSet};
use crate::widget::Panel;

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// The main user facing configuration details
pub struct Config {
    /// Delay before the initial population pass, to let the host
    /// environment settle at startup.
    pub populate_delay: Duration,
    /// Edge length of every button icon, in pixels.
    pub icon_size: u32,
    /// Opacity applied to buttons whose window is unfocused, 0..=255.
    pub unfocused_opacity: u8,
    /// Whether scrolling on the panel switches workspaces (and hover
    /// peeking raises windows).
    pub workspace_scroll: bool,
}

impl Config {
    /// Initialise a default Config, giving sensible values for all fields.
    pub fn default() -> Config {
        Config {
            populate_delay: Duration::from_millis(500),
            icon_size: ICON_SIZE,
            unfocused_opacity: UNFOCUSED_OPACITY,
            workspace_scroll: true,
        }
    }
}

/// Lifecycle of the bar. `Uninitialized` is the time before `new`;
/// `Populating -> Destroyed` is legal when teardown happens before the
/// delayed population pass fires.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BarState {
    Populating,
    Live,
    Destroyed,
}

/**
 * Owns the full set of TaskButtons and keeps it in sync with the live
 * window set.
 *
 * The `buttons` map is the authoritative per-window uniqueness guard;
 * the panel's slot-collision check is only a backstop. Buttons remove
 * themselves on `WindowUnmanaged`; the bar never scans for dead
 * buttons outside of full teardown, where a defensive sweep destroys
 * whatever is left so no subscription survives the extension.
 */
pub struct TaskBar<'a> {
    host: &'a dyn HostConnection,
    panel: Box<dyn Panel + 'a>,
    config: Config,
    buttons: HashMap<WindowId, TaskButton>,
    signals: SignalSet,
    populate_deadline: Option<Instant>,
    state: BarState,
    running: bool,
}

impl<'a> TaskBar<'a> {
    pub fn new(
        host: &'a dyn HostConnection,
        panel: Box<dyn Panel + 'a>,
        config: Config,
    ) -> TaskBar<'a> {
        info!(
            "taskbar created, populating in {:?}",
            config.populate_delay
        );
        let populate_deadline = Some(Instant::now() + config.populate_delay);
        TaskBar {
            host,
            panel,
            config,
            buttons: HashMap::new(),
            signals: SignalSet::new(),
            populate_deadline,
            state: BarState::Populating,
            running: false,
        }
    }

    pub fn state(&self) -> BarState {
        self.state
    }

    pub fn button_count(&self) -> usize {
        self.buttons.len()
    }

    pub fn button(&self, win: WindowId) -> Option<&TaskButton> {
        self.buttons.get(&win)
    }

    /// Fire the pending population pass once its deadline has passed.
    /// A cancelled (taken) deadline means this never runs.
    pub fn tick(&mut self, now: Instant) {
        if self.state != BarState::Populating {
            return;
        }
        if let Some(deadline) = self.populate_deadline {
            if now >= deadline {
                self.populate_deadline = None;
                self.populate();
            }
        }
    }

    /// Enumerate every workspace in index order and every window in
    /// host order, then go live.
    fn populate(&mut self) {
        for ws in 0..self.host.workspace_count() {
            for win in self.host.workspace_windows(ws) {
                self.make_task_button(win);
            }
        }

        self.signals.connect(Signal::WindowCreated);
        self.signals.connect(Signal::PanelScroll);
        self.state = BarState::Live;
        info!("taskbar populated with {} buttons", self.buttons.len());
    }

    /// Qualification rule: the window must still exist, must not be
    /// skip-taskbar flagged and must not be a modal dialog.
    fn make_task_button(&mut self, win: WindowId) {
        if !self.host.window_exists(win)
            || self.host.is_skip_taskbar(win)
            || self.host.window_type(win) == WindowType::ModalDialog
        {
            return;
        }
        if self.buttons.contains_key(&win) {
            debug!("button for window {} already exists", win);
            return;
        }

        if let Some(button) = TaskButton::new(self.host, self.panel.as_mut(), win, &self.config) {
            self.buttons.insert(win, button);
        }
    }

    pub fn handle_event(&mut self, event: DesktopEvent) {
        if self.state == BarState::Destroyed {
            return;
        }
        let host = self.host;

        match event {
            DesktopEvent::WindowCreated { id } => {
                if self.signals.is_connected(Signal::WindowCreated) {
                    self.make_task_button(id);
                }
            }
            DesktopEvent::WindowUnmanaged { id } => {
                // the button's own unmanaging subscription: it removes
                // itself and releases its widget
                if let Some(mut button) = self.buttons.remove(&id) {
                    if button.observes(Signal::Unmanaging) {
                        button.destroy(self.panel.as_mut());
                    }
                }
            }
            DesktopEvent::FocusChanged => {
                for button in self.buttons.values_mut() {
                    if button.observes(Signal::Focus) {
                        button.update_focus(host);
                    }
                }
            }
            DesktopEvent::DemandsAttentionChanged { id } => {
                if let Some(button) = self.buttons.get_mut(&id) {
                    if button.observes(Signal::Attention) {
                        button.update_demands_attention(host);
                    }
                }
            }
            DesktopEvent::UrgentChanged { id } => {
                if let Some(button) = self.buttons.get_mut(&id) {
                    if button.observes(Signal::Urgent) {
                        button.update_demands_attention(host);
                    }
                }
            }
            DesktopEvent::AppChanged { id } => {
                if let Some(button) = self.buttons.get_mut(&id) {
                    if button.observes(Signal::App) {
                        button.update_app(host);
                    }
                }
            }
            DesktopEvent::SkipTaskbarChanged { id } => {
                if let Some(button) = self.buttons.get_mut(&id) {
                    if button.observes(Signal::SkipTaskbar) {
                        button.update_visibility(host);
                    }
                }
            }
            DesktopEvent::WindowWorkspaceChanged { id } => {
                if let Some(button) = self.buttons.get_mut(&id) {
                    if button.observes(Signal::WindowWorkspace) {
                        button.update_visibility(host);
                    }
                }
            }
            DesktopEvent::ActiveWorkspaceChanged => {
                for button in self.buttons.values_mut() {
                    if button.observes(Signal::ActiveWorkspace) {
                        button.update_visibility(host);
                    }
                }
            }
            DesktopEvent::OverviewShown | DesktopEvent::OverviewHidden => {
                for button in self.buttons.values_mut() {
                    if button.observes(Signal::Overview) {
                        button.update_visibility(host);
                    }
                }
            }
            DesktopEvent::PanelScroll { delta } => {
                // pure pass-through to the host's workspace scroller
                if self.signals.is_connected(Signal::PanelScroll)
                    && host.workspace_scroll_enabled()
                {
                    host.handle_workspace_scroll(delta);
                }
            }
            DesktopEvent::ButtonPress { widget, button } => {
                if let Some(task) = self
                    .buttons
                    .values_mut()
                    .find(|task| task.widget_id() == widget)
                {
                    if task.observes(Signal::Press) {
                        if task.on_click(host, button) == EventFlow::Propagate {
                            debug!("unhandled press {:?} on widget {}", button, widget);
                        }
                    }
                }
            }
            DesktopEvent::HoverChanged { widget, hovering } => {
                if let Some(task) = self
                    .buttons
                    .values_mut()
                    .find(|task| task.widget_id() == widget)
                {
                    if task.observes(Signal::Hover) {
                        task.on_hover(host, hovering);
                    }
                }
            }
        }
    }

    /// Drive the bar from the host's event source until `exit` is
    /// called or the extension is disabled.
    pub fn run(&mut self) {
        self.running = true;
        while self.running && self.state != BarState::Destroyed {
            self.tick(Instant::now());
            match self.host.poll_event() {
                Some(event) => {
                    debug!("got desktop event: {:?}", event);
                    self.handle_event(event);
                }
                None => std::thread::sleep(Duration::from_millis(10)),
            }
            self.host.flush();
        }
    }

    pub fn exit(&mut self) {
        self.running = false;
    }

    /// Cancel any pending population, sweep every remaining button and
    /// disconnect the bar-level subscriptions.
    pub fn destroy(&mut self) {
        if self.state == BarState::Destroyed {
            return;
        }

        if self.populate_deadline.take().is_some() {
            debug!("cancelled pending population pass");
        }

        for (_, mut button) in self.buttons.drain() {
            button.destroy(self.panel.as_mut());
        }

        self.signals.teardown();
        self.state = BarState::Destroyed;
        self.running = false;
        info!("taskbar destroyed");
    }
}

/// The sole externally invoked surface: the host enables the extension
/// to construct the bar and disables it to tear everything down.
pub struct TasksExtension<'a> {
    taskbar: Option<TaskBar<'a>>,
}

impl<'a> TasksExtension<'a> {
    pub fn new() -> TasksExtension<'a> {
        TasksExtension { taskbar: None }
    }

    pub fn enable(
        &mut self,
        host: &'a dyn HostConnection,
        panel: Box<dyn Panel + 'a>,
        config: Config,
    ) {
        if self.taskbar.is_some() {
            warn!("extension already enabled");
            return;
        }
        self.taskbar = Some(TaskBar::new(host, panel, config));
    }

    pub fn disable(&mut self) {
        if let Some(mut taskbar) = self.taskbar.take() {
            taskbar.destroy();
        }
    }

    pub fn taskbar_mut(&mut self) -> Option<&mut TaskBar<'a>> {
        self.taskbar.as_mut()
    }
}
