use crate::widget::{Icon, WidgetId};

/// Opaque window handle, owned by the host environment.
pub type WindowId = u32;
pub type WsId = usize;
pub type MonitorId = usize;

/// The subset of host window types the taskbar cares about.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum WindowType {
    Normal,
    Dialog,
    ModalDialog,
    Dock,
    Other,
}

/// Application descriptor resolved from a window handle.
#[derive(Debug, PartialEq, Clone)]
pub struct AppDescriptor {
    /// Stable application identifier (for X hosts, the WM_CLASS class name).
    pub id: String,
    /// Default icon for this application.
    pub icon: Icon,
    /// Whether the application can be asked to open another window.
    pub can_open_new_window: bool,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum MouseButton {
    Primary,
    Middle,
    Secondary,
    Other(u8),
}

/// Whether an input event was consumed or should fall through to the
/// host's default handling.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum EventFlow {
    Stop,
    Propagate,
}

/**
 * Host notifications, already translated from whatever raw form the
 * backend delivers them in (X property notifies, etc). The taskbar
 * event loop consumes these one at a time; handlers run to completion
 * before the next event is polled.
 */
#[derive(Debug, PartialEq, Clone)]
pub enum DesktopEvent {
    /// A new top-level window is managed by the host.
    WindowCreated { id: WindowId },
    /// A window is going away; all references to it become invalid.
    WindowUnmanaged { id: WindowId },
    /// Input focus moved. No window id: both the window gaining and the
    /// window losing focus need their derived state refreshed.
    FocusChanged,
    DemandsAttentionChanged { id: WindowId },
    /// ICCCM urgency hint toggled. Routed to the same handler as
    /// `DemandsAttentionChanged`.
    UrgentChanged { id: WindowId },
    /// An application-identifying property (class, app id) changed.
    AppChanged { id: WindowId },
    SkipTaskbarChanged { id: WindowId },
    /// The window moved to another workspace.
    WindowWorkspaceChanged { id: WindowId },
    ActiveWorkspaceChanged,
    OverviewShown,
    OverviewHidden,
    /// Scroll on the panel surface. Forwarded verbatim to the host's
    /// workspace-scroll handler.
    PanelScroll { delta: i32 },
    /// Pointer button press on a panel widget.
    ButtonPress { widget: WidgetId, button: MouseButton },
    /// Pointer entered or left a panel widget.
    HoverChanged { widget: WidgetId, hovering: bool },
}

/**
 * Everything the taskbar needs from the host desktop environment,
 * folded into one connection-style interface: window queries and
 * commands, workspaces, stacking, application resolution, the overview
 * and the event source.
 *
 * Window references may become invalid at any time between events, so
 * every per-window query is null-tolerant: an unknown handle yields
 * `None` or a benign default, never an error. Commands on an unknown
 * handle are no-ops.
 */
pub trait HostConnection {
    // window queries
    fn window_exists(&self, win: WindowId) -> bool;
    fn has_focus(&self, win: WindowId) -> bool;
    fn demands_attention(&self, win: WindowId) -> bool;
    fn is_skip_taskbar(&self, win: WindowId) -> bool;
    fn is_minimized(&self, win: WindowId) -> bool;
    fn can_minimize(&self, win: WindowId) -> bool;
    fn window_type(&self, win: WindowId) -> WindowType;
    fn window_monitor(&self, win: WindowId) -> Option<MonitorId>;
    fn window_workspace(&self, win: WindowId) -> Option<WsId>;
    fn wm_class(&self, win: WindowId) -> Option<String>;

    // window commands
    fn activate_window(&self, win: WindowId);
    fn focus_window(&self, win: WindowId);
    fn minimize_window(&self, win: WindowId);
    fn raise_window(&self, win: WindowId);

    // workspaces
    fn active_workspace(&self) -> WsId;
    fn workspace_count(&self) -> usize;
    /// Windows on a workspace, in host-provided order.
    fn workspace_windows(&self, ws: WsId) -> Vec<WindowId>;

    /// Order the given windows bottom-to-top by stacking position.
    /// Windows the host has no stacking information for sort first.
    fn sort_windows_by_stacking(&self, windows: Vec<WindowId>) -> Vec<WindowId>;

    // application resolution
    fn window_app(&self, win: WindowId) -> Option<AppDescriptor>;
    fn open_new_window(&self, app: &AppDescriptor);

    // overview
    fn overview_visible(&self) -> bool;
    fn hide_overview(&self);

    // workspace-switch-by-scroll feature
    fn workspace_scroll_enabled(&self) -> bool;
    fn handle_workspace_scroll(&self, delta: i32);

    // event source
    fn poll_event(&self) -> Option<DesktopEvent>;
    fn flush(&self);
}
