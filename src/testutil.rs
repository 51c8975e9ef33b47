//! In-memory host and panel used by the engine tests.

use crate::host::{
    AppDescriptor, DesktopEvent, HostConnection, MonitorId, WindowId, WindowType, WsId,
};
use crate::widget::{Icon, Panel, Widget, WidgetId};

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct FakeWindow {
    pub focused: bool,
    pub demands_attention: bool,
    pub skip_taskbar: bool,
    pub minimized: bool,
    pub can_minimize: bool,
    pub can_open_new_window: bool,
    pub window_type: WindowType,
    pub monitor: MonitorId,
    pub workspace: WsId,
    pub wm_class: String,
    pub app_id: String,
}

impl FakeWindow {
    pub fn on_workspace(ws: WsId) -> FakeWindow {
        FakeWindow {
            focused: false,
            demands_attention: false,
            skip_taskbar: false,
            minimized: false,
            can_minimize: true,
            can_open_new_window: false,
            window_type: WindowType::Normal,
            monitor: 0,
            workspace: ws,
            wm_class: "app".into(),
            app_id: "app".into(),
        }
    }
}

/// Every side effect a button can ask the host for, recorded in order.
#[derive(Debug, PartialEq, Clone)]
pub enum HostCommand {
    Activate(WindowId),
    Focus(WindowId),
    Minimize(WindowId),
    Raise(WindowId),
    OpenNewWindow(String),
    HideOverview,
    WorkspaceScroll(i32),
}

pub struct FakeHost {
    windows: RefCell<HashMap<WindowId, FakeWindow>>,
    /// Bottom-to-top stacking order.
    stacking: RefCell<Vec<WindowId>>,
    active_workspace: Cell<WsId>,
    workspace_count: Cell<usize>,
    overview: Cell<bool>,
    workspace_scroll: Cell<bool>,
    commands: RefCell<Vec<HostCommand>>,
}

impl FakeHost {
    pub fn new(workspaces: usize) -> FakeHost {
        FakeHost {
            windows: RefCell::new(HashMap::new()),
            stacking: RefCell::new(Vec::new()),
            active_workspace: Cell::new(0),
            workspace_count: Cell::new(workspaces),
            overview: Cell::new(false),
            workspace_scroll: Cell::new(true),
            commands: RefCell::new(Vec::new()),
        }
    }

    pub fn add_window(&self, id: WindowId, window: FakeWindow) {
        self.windows.borrow_mut().insert(id, window);
        self.stacking.borrow_mut().push(id);
    }

    pub fn remove_window(&self, id: WindowId) {
        self.windows.borrow_mut().remove(&id);
        self.stacking.borrow_mut().retain(|&win| win != id);
    }

    pub fn with_window(&self, id: WindowId, mutate: impl FnOnce(&mut FakeWindow)) {
        if let Some(window) = self.windows.borrow_mut().get_mut(&id) {
            mutate(window);
        }
    }

    pub fn set_active_workspace(&self, ws: WsId) {
        self.active_workspace.set(ws);
    }

    pub fn set_overview(&self, shown: bool) {
        self.overview.set(shown);
    }

    pub fn set_workspace_scroll(&self, enabled: bool) {
        self.workspace_scroll.set(enabled);
    }

    pub fn set_stacking(&self, order: Vec<WindowId>) {
        *self.stacking.borrow_mut() = order;
    }

    pub fn commands(&self) -> Vec<HostCommand> {
        self.commands.borrow().clone()
    }

    pub fn count(&self, command: &HostCommand) -> usize {
        self.commands
            .borrow()
            .iter()
            .filter(|recorded| *recorded == command)
            .count()
    }

    fn record(&self, command: HostCommand) {
        self.commands.borrow_mut().push(command);
    }
}

impl HostConnection for FakeHost {
    fn window_exists(&self, win: WindowId) -> bool {
        self.windows.borrow().contains_key(&win)
    }

    fn has_focus(&self, win: WindowId) -> bool {
        self.windows
            .borrow()
            .get(&win)
            .map_or(false, |window| window.focused)
    }

    fn demands_attention(&self, win: WindowId) -> bool {
        self.windows
            .borrow()
            .get(&win)
            .map_or(false, |window| window.demands_attention)
    }

    fn is_skip_taskbar(&self, win: WindowId) -> bool {
        self.windows
            .borrow()
            .get(&win)
            .map_or(false, |window| window.skip_taskbar)
    }

    fn is_minimized(&self, win: WindowId) -> bool {
        self.windows
            .borrow()
            .get(&win)
            .map_or(false, |window| window.minimized)
    }

    fn can_minimize(&self, win: WindowId) -> bool {
        self.windows
            .borrow()
            .get(&win)
            .map_or(false, |window| window.can_minimize)
    }

    fn window_type(&self, win: WindowId) -> WindowType {
        self.windows
            .borrow()
            .get(&win)
            .map_or(WindowType::Normal, |window| window.window_type)
    }

    fn window_monitor(&self, win: WindowId) -> Option<MonitorId> {
        self.windows.borrow().get(&win).map(|window| window.monitor)
    }

    fn window_workspace(&self, win: WindowId) -> Option<WsId> {
        self.windows
            .borrow()
            .get(&win)
            .map(|window| window.workspace)
    }

    fn wm_class(&self, win: WindowId) -> Option<String> {
        self.windows
            .borrow()
            .get(&win)
            .map(|window| window.wm_class.clone())
    }

    fn activate_window(&self, win: WindowId) {
        self.record(HostCommand::Activate(win));
        let mut windows = self.windows.borrow_mut();
        for (&id, window) in windows.iter_mut() {
            window.focused = id == win;
        }
    }

    fn focus_window(&self, win: WindowId) {
        self.record(HostCommand::Focus(win));
    }

    fn minimize_window(&self, win: WindowId) {
        self.record(HostCommand::Minimize(win));
        if let Some(window) = self.windows.borrow_mut().get_mut(&win) {
            window.minimized = true;
        }
    }

    fn raise_window(&self, win: WindowId) {
        self.record(HostCommand::Raise(win));
        let mut stacking = self.stacking.borrow_mut();
        stacking.retain(|&other| other != win);
        stacking.push(win);
    }

    fn active_workspace(&self) -> WsId {
        self.active_workspace.get()
    }

    fn workspace_count(&self) -> usize {
        self.workspace_count.get()
    }

    fn workspace_windows(&self, ws: WsId) -> Vec<WindowId> {
        let mut windows: Vec<WindowId> = self
            .windows
            .borrow()
            .iter()
            .filter(|(_, window)| window.workspace == ws)
            .map(|(&id, _)| id)
            .collect();
        windows.sort_unstable();
        windows
    }

    fn sort_windows_by_stacking(&self, windows: Vec<WindowId>) -> Vec<WindowId> {
        let stacking = self.stacking.borrow();
        let mut sorted: Vec<WindowId> = windows
            .iter()
            .copied()
            .filter(|win| !stacking.contains(win))
            .collect();
        sorted.extend(stacking.iter().copied().filter(|win| windows.contains(win)));
        sorted
    }

    fn window_app(&self, win: WindowId) -> Option<AppDescriptor> {
        self.windows.borrow().get(&win).map(|window| AppDescriptor {
            id: window.app_id.clone(),
            icon: Icon::Named(format!("{}-icon", window.app_id)),
            can_open_new_window: window.can_open_new_window,
        })
    }

    fn open_new_window(&self, app: &AppDescriptor) {
        self.record(HostCommand::OpenNewWindow(app.id.clone()));
    }

    fn overview_visible(&self) -> bool {
        self.overview.get()
    }

    fn hide_overview(&self) {
        self.record(HostCommand::HideOverview);
        self.overview.set(false);
    }

    fn workspace_scroll_enabled(&self) -> bool {
        self.workspace_scroll.get()
    }

    fn handle_workspace_scroll(&self, delta: i32) {
        self.record(HostCommand::WorkspaceScroll(delta));
    }

    // a fake host never produces events on its own; tests feed the
    // bar through handle_event directly
    fn poll_event(&self) -> Option<DesktopEvent> {
        None
    }

    fn flush(&self) {}
}

pub struct FakeWidget {
    id: WidgetId,
    visible: bool,
    opacity: u8,
    icon: Icon,
    icon_size: u32,
    attention: bool,
    menu_app: Option<String>,
}

impl FakeWidget {
    fn new(id: WidgetId) -> FakeWidget {
        FakeWidget {
            id,
            visible: true,
            opacity: 255,
            icon: Icon::None,
            icon_size: 0,
            attention: false,
            menu_app: None,
        }
    }
}

impl Widget for FakeWidget {
    fn id(&self) -> WidgetId {
        self.id
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn visible(&self) -> bool {
        self.visible
    }

    fn set_opacity(&mut self, opacity: u8) {
        self.opacity = opacity;
    }

    fn opacity(&self) -> u8 {
        self.opacity
    }

    fn set_icon(&mut self, icon: Icon) {
        self.icon = icon;
    }

    fn icon(&self) -> &Icon {
        &self.icon
    }

    fn set_icon_size(&mut self, px: u32) {
        self.icon_size = px;
    }

    fn icon_size(&self) -> u32 {
        self.icon_size
    }

    fn set_attention(&mut self, on: bool) {
        self.attention = on;
    }

    fn attention(&self) -> bool {
        self.attention
    }

    fn close_menu(&mut self) {}

    fn set_menu_app(&mut self, app: Option<String>) {
        self.menu_app = app;
    }

    fn menu_app(&self) -> Option<&str> {
        self.menu_app.as_deref()
    }
}

pub struct FakePanel {
    next_id: WidgetId,
    slots: HashMap<String, WidgetId>,
    destroyed: Vec<String>,
}

impl FakePanel {
    pub fn new() -> FakePanel {
        FakePanel {
            next_id: 0,
            slots: HashMap::new(),
            destroyed: Vec::new(),
        }
    }

    pub fn destroyed_keys(&self) -> Vec<String> {
        self.destroyed.clone()
    }
}

impl Panel for FakePanel {
    fn create_button(&mut self, key: &str) -> Option<Box<dyn Widget>> {
        if self.slots.contains_key(key) {
            return None;
        }
        self.next_id += 1;
        self.slots.insert(key.to_string(), self.next_id);
        Some(Box::new(FakeWidget::new(self.next_id)))
    }

    fn destroy_button(&mut self, key: &str) {
        self.slots.remove(key);
        self.destroyed.push(key.to_string());
    }
}
