use crate::host::{EventFlow, HostConnection, MouseButton, WindowId, WsId};
use crate::signals::{Signal, SignalSet};
use crate::taskbar::Config;
use crate::widget::{Icon, Panel, Widget, WidgetId};

pub const ICON_SIZE: u32 = 20; // px
pub const UNFOCUSED_OPACITY: u8 = 128; // 0...255

/**
 * One window presented as a clickable, self-updating panel widget.
 *
 * All visual state (icon, opacity, visibility, attention style) is a
 * pure function of window + workspace + overview state, recomputed by
 * the update_* methods. Each of those is idempotent and touches
 * nothing but widget properties, so redundant notifications from the
 * host are harmless.
 */
pub struct TaskButton {
    window: WindowId,
    app: Option<crate::host::AppDescriptor>,
    widget: Box<dyn Widget>,
    signals: SignalSet,
    slot_key: String,
    icon_size: u32,
    unfocused_opacity: u8,
    active_workspace: WsId,
    window_on_active_workspace: bool,
    /// Window raised on top before a hover peek, to restore on leave.
    window_on_top: Option<WindowId>,
    destroyed: bool,
}

impl TaskButton {
    /// Build a button for `window`, claiming the panel slot keyed off
    /// the window handle. Returns `None` when the slot is already
    /// taken (a duplicate construction attempt).
    pub fn new(
        host: &dyn HostConnection,
        panel: &mut dyn Panel,
        window: WindowId,
        config: &Config,
    ) -> Option<TaskButton> {
        let slot_key = format!("task-button-{}", window);
        let widget = match panel.create_button(&slot_key) {
            Some(widget) => widget,
            None => {
                debug!("panel slot {} already claimed, skipping", slot_key);
                return None;
            }
        };

        let mut button = TaskButton {
            window,
            app: None,
            widget,
            signals: SignalSet::new(),
            slot_key,
            icon_size: config.icon_size,
            unfocused_opacity: config.unfocused_opacity,
            active_workspace: host.active_workspace(),
            window_on_active_workspace: false,
            window_on_top: None,
            destroyed: false,
        };

        button.update_app(host);
        button.update_visibility(host);
        button.connect_signals();

        Some(button)
    }

    fn connect_signals(&mut self) {
        for &signal in &[
            Signal::Focus,
            Signal::Attention,
            Signal::Urgent,
            Signal::App,
            Signal::SkipTaskbar,
            Signal::Unmanaging,
            Signal::WindowWorkspace,
            Signal::ActiveWorkspace,
            Signal::Overview,
            Signal::Hover,
            Signal::Press,
        ] {
            self.signals.connect(signal);
        }
    }

    pub fn widget_id(&self) -> WidgetId {
        self.widget.id()
    }

    pub fn widget(&self) -> &dyn Widget {
        self.widget.as_ref()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Whether this button still listens for `signal`. Destroyed
    /// buttons observe nothing.
    pub fn observes(&self, signal: Signal) -> bool {
        !self.destroyed && self.signals.is_connected(signal)
    }

    /// Re-resolve the owning application and the icon derived from it.
    /// Browser-engine-hosted apps carry their identity in the low-level
    /// class name, so that wins over the resolved application icon.
    pub fn update_app(&mut self, host: &dyn HostConnection) {
        if host.window_exists(self.window) {
            self.app = host.window_app(self.window);
        }

        if let Some(app) = &self.app {
            match host.wm_class(self.window) {
                Some(class) if class.starts_with("chrome") => {
                    self.widget.set_icon(Icon::Named(class));
                }
                _ => self.widget.set_icon(app.icon.clone()),
            }
        }

        self.widget.set_icon_size(self.icon_size);
        self.widget.set_menu_app(self.app.as_ref().map(|app| app.id.clone()));
    }

    /// Cache the active workspace and whether our window sits on it.
    pub fn update_workspace(&mut self, host: &dyn HostConnection) {
        self.active_workspace = host.active_workspace();
        self.window_on_active_workspace =
            host.window_workspace(self.window) == Some(self.active_workspace);
    }

    pub fn update_focus(&mut self, host: &dyn HostConnection) {
        if host.overview_visible() || host.has_focus(self.window) {
            self.widget.set_opacity(255);
        } else {
            self.widget.set_opacity(self.unfocused_opacity);
        }
    }

    /// Attention overrides the normal visibility rules: full opacity,
    /// attention style, forced visible. Clearing it falls back to the
    /// normal computation.
    pub fn update_demands_attention(&mut self, host: &dyn HostConnection) {
        if host.demands_attention(self.window) {
            self.widget.set_opacity(255);
            self.widget.set_attention(true);
            self.widget.set_visible(true);
        } else {
            self.widget.set_attention(false);
            self.update_visibility(host);
        }
    }

    /// visible = overview shown OR (not skip-taskbar AND on the active
    /// workspace).
    pub fn update_visibility(&mut self, host: &dyn HostConnection) {
        self.update_focus(host);
        self.update_workspace(host);

        let visible = host.overview_visible()
            || (!host.is_skip_taskbar(self.window) && self.window_on_active_workspace);
        self.widget.set_visible(visible);
    }

    fn toggle_window(&mut self, host: &dyn HostConnection) {
        self.window_on_top = None;

        if host.has_focus(self.window) {
            if host.can_minimize(self.window) && !host.overview_visible() {
                host.minimize_window(self.window);
            }
        } else {
            host.activate_window(self.window);
            host.focus_window(self.window);
        }
        host.hide_overview();
    }

    pub fn on_click(&mut self, host: &dyn HostConnection, button: MouseButton) -> EventFlow {
        match button {
            MouseButton::Primary => {
                self.widget.close_menu();
                self.toggle_window(host);
                EventFlow::Stop
            }
            MouseButton::Middle => {
                self.widget.close_menu();
                if let Some(app) = &self.app {
                    if app.can_open_new_window {
                        host.open_new_window(app);
                    }
                }
                host.hide_overview();
                EventFlow::Stop
            }
            _ => EventFlow::Propagate,
        }
    }

    /// Hover peek: raise our window above the current top window of
    /// its monitor + workspace, and restore on leave. Disabled while
    /// the overview is shown or workspace scrolling is off.
    pub fn on_hover(&mut self, host: &dyn HostConnection, hovering: bool) {
        if host.overview_visible() || !host.workspace_scroll_enabled() {
            return;
        }

        if hovering {
            let monitor = host.window_monitor(self.window);
            let candidates: Vec<WindowId> = host
                .window_workspace(self.window)
                .map(|ws| host.workspace_windows(ws))
                .unwrap_or_default()
                .into_iter()
                .filter(|&win| !host.is_minimized(win) && host.window_monitor(win) == monitor)
                .collect();
            self.window_on_top = host.sort_windows_by_stacking(candidates).last().copied();

            host.raise_window(self.window);
        } else if let Some(top) = self.window_on_top {
            host.raise_window(top);
        }
    }

    /// Tear down every subscription and release the panel slot. Safe
    /// to call more than once and safe when the window is already gone.
    pub fn destroy(&mut self, panel: &mut dyn Panel) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;

        self.signals.teardown();
        panel.destroy_button(&self.slot_key);
    }
}
