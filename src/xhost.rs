use crate::host::{
    AppDescriptor, DesktopEvent, HostConnection, MonitorId, MouseButton, WindowId, WindowType,
    WsId,
};
use crate::widget::{Icon, WidgetId};

use std::cell::RefCell;
use std::collections::VecDeque;
use std::process::Command;
use std::rc::Rc;

use anyhow::{Context, Result};
use xcb::{randr, Atom, Window};
use xcb_util::{ewmh, icccm};

// Mask out the most significant bit, which indicates if it's a send_event
const XCB_RESPONSE_TYPE_MASK: u8 = 0x7F;
const INPUT_FOCUS_POINTER_ROOT: u8 = xcb::INPUT_FOCUS_POINTER_ROOT as u8;
const CONFIG_WINDOW_STACK_MODE: u16 = xcb::CONFIG_WINDOW_STACK_MODE as u16;
const CONFIG_WINDOW_STACK_ABOVE: u32 = xcb::STACK_MODE_ABOVE as u32;

// We are a taskbar, not the window manager: notify-only masks, no
// substructure redirection.
const ROOT_EVENT_MASK: &[(u32, u32)] = &[(
    xcb::CW_EVENT_MASK,
    xcb::EVENT_MASK_PROPERTY_CHANGE | xcb::EVENT_MASK_SUBSTRUCTURE_NOTIFY,
)];
const TRACKED_WINDOW_MASK: &[(u32, u32)] =
    &[(xcb::CW_EVENT_MASK, xcb::EVENT_MASK_PROPERTY_CHANGE)];

// _NET_WM_DESKTOP value for sticky windows
const ALL_DESKTOPS: u32 = 0xFFFF_FFFF;
// ICCCM WM_HINTS flag bit for the urgency hint
const URGENCY_HINT: u32 = 1 << 8;
// ICCCM WM_CHANGE_STATE argument
const ICONIC_STATE: u32 = 3;
// EWMH source indication: direct user action (a pager/taskbar)
const SOURCE_PAGER: u32 = 2;

macro_rules! atoms {
    ( $( $name:ident ),+ ) => {
        #[allow(non_snake_case)]
        pub struct InternedAtoms {
            $(
                pub $name: xcb::Atom
            ),*
        }

        impl InternedAtoms {
            pub fn new(conn: &xcb::Connection) -> Result<InternedAtoms> {
                Ok(InternedAtoms {
                    $(
                        $name: xcb::intern_atom(conn, false, stringify!($name)).get_reply()?.atom()
                    ),*
                })
            }
        }
    };
    // Allow trailing comma:
    ( $( $name:ident ),+ , ) => (atoms!($( $name ),+);)
}

// Intern atoms that are not built-in in icccm or ewmh
atoms!(WM_CHANGE_STATE);

/// A monitor region: top left corner + extent
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
struct Rect {
    x: i32,
    y: i32,
    w: u32,
    h: u32,
}

impl Rect {
    fn new(x: i32, y: i32, w: u32, h: u32) -> Rect {
        Rect { x, y, w, h }
    }

    fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.w as i32 && y < self.y + self.h as i32
    }
}

/**
 * EWMH-speaking host backend.
 *
 * Window state is read from `_NET_*` properties on demand and mutated
 * through client messages to the root window, so a compliant window
 * manager stays the single owner of all window state. The managed
 * window set mirrors `_NET_CLIENT_LIST`; diffing it on change is what
 * produces created/unmanaged events, so override-redirect and
 * unmanaged windows never surface. The overview maps onto
 * `_NET_SHOWING_DESKTOP`.
 */
pub struct XcbHost {
    conn: Rc<ewmh::Connection>,
    screen: i32,
    root: Window,
    atoms: InternedAtoms,
    monitors: Vec<Rect>,
    known_windows: RefCell<Vec<Window>>,
    pending: RefCell<VecDeque<DesktopEvent>>,
    workspace_scroll: bool,
}

impl XcbHost {
    pub fn new() -> Result<XcbHost> {
        let (conn, screen) =
            xcb::Connection::connect(None).context("Unable to connect to X server")?;
        let conn = ewmh::Connection::connect(conn).map_err(|(e, _)| e)?;

        let root = conn
            .get_setup()
            .roots()
            .nth(screen as usize)
            .context("Unable to get the root window of the preferred screen")?
            .root();

        let atoms = InternedAtoms::new(&conn).context("Failed to intern atoms")?;

        xcb::change_window_attributes_checked(&conn, root, ROOT_EVENT_MASK)
            .request_check()
            .context("Could not register PROPERTY_CHANGE/SUBSTRUCTURE_NOTIFY on the root")?;

        let monitors = detect_monitors(&conn, root);

        let host = XcbHost {
            conn: Rc::new(conn),
            screen,
            root,
            atoms,
            monitors,
            known_windows: RefCell::new(Vec::new()),
            pending: RefCell::new(VecDeque::new()),
            workspace_scroll: true,
        };

        let initial = host.prop_u32s(host.root, host.conn.CLIENT_LIST(), 4096);
        for &win in &initial {
            host.track_window(win);
        }
        info!(
            "connected to X: {} managed windows, {} monitors",
            initial.len(),
            host.monitors.len()
        );
        *host.known_windows.borrow_mut() = initial;
        host.conn.flush();

        Ok(host)
    }

    pub fn connection(&self) -> Rc<ewmh::Connection> {
        self.conn.clone()
    }

    pub fn screen(&self) -> i32 {
        self.screen
    }

    pub fn root(&self) -> Window {
        self.root
    }

    pub fn set_workspace_scroll(&mut self, enabled: bool) {
        self.workspace_scroll = enabled;
    }

    fn prop_u32s(&self, win: Window, atom: Atom, max_len: u32) -> Vec<u32> {
        xcb::get_property(&self.conn, false, win, atom, xcb::ATOM_ANY, 0, max_len)
            .get_reply()
            .map(|reply| reply.value::<u32>().to_vec())
            .unwrap_or_default()
    }

    fn prop_u32(&self, win: Window, atom: Atom) -> Option<u32> {
        self.prop_u32s(win, atom, 1).first().copied()
    }

    fn net_wm_state(&self, win: Window) -> Vec<Atom> {
        self.prop_u32s(win, self.conn.WM_STATE(), 32)
    }

    fn urgency_hint(&self, win: Window) -> bool {
        self.prop_u32s(win, xcb::ATOM_WM_HINTS, 9)
            .first()
            .map_or(false, |flags| flags & URGENCY_HINT != 0)
    }

    fn track_window(&self, win: Window) {
        xcb::change_window_attributes(&self.conn, win, TRACKED_WINDOW_MASK);
    }

    /// Client messages a pager/taskbar asks the WM for go to the root,
    /// with the target window in the event itself.
    fn send_root_message(&self, win: Window, message_type: Atom, data: [u32; 5]) {
        let data = xcb::ClientMessageData::from_data32(data);
        let event = xcb::ClientMessageEvent::new(32, win, message_type, data);
        xcb::send_event(
            &self.conn,
            false,
            self.root,
            xcb::EVENT_MASK_SUBSTRUCTURE_NOTIFY | xcb::EVENT_MASK_SUBSTRUCTURE_REDIRECT,
            &event,
        );
    }

    /// Diff `_NET_CLIENT_LIST` against the windows we knew about and
    /// queue created/unmanaged events for the difference.
    fn refresh_client_list(&self) {
        let current = self.prop_u32s(self.root, self.conn.CLIENT_LIST(), 4096);
        let mut known = self.known_windows.borrow_mut();
        let mut pending = self.pending.borrow_mut();

        for &win in current.iter().filter(|win| !known.contains(win)) {
            self.track_window(win);
            pending.push_back(DesktopEvent::WindowCreated { id: win });
        }
        for &win in known.iter().filter(|win| !current.contains(win)) {
            pending.push_back(DesktopEvent::WindowUnmanaged { id: win });
        }

        *known = current;
    }

    fn translate(&self, event: &xcb::GenericEvent) {
        let etype = event.response_type() & XCB_RESPONSE_TYPE_MASK;
        match etype {
            xcb::DESTROY_NOTIFY => {
                let e: &xcb::DestroyNotifyEvent = unsafe { xcb::cast_event(event) };
                let win = e.window();
                // some WMs are slow to update the client list
                let mut known = self.known_windows.borrow_mut();
                if let Some(pos) = known.iter().position(|&w| w == win) {
                    known.remove(pos);
                    self.pending
                        .borrow_mut()
                        .push_back(DesktopEvent::WindowUnmanaged { id: win });
                }
            }

            xcb::PROPERTY_NOTIFY => {
                let e: &xcb::PropertyNotifyEvent = unsafe { xcb::cast_event(event) };
                let atom = e.atom();
                let win = e.window();
                if win == self.root {
                    if atom == self.conn.ACTIVE_WINDOW() {
                        self.queue(DesktopEvent::FocusChanged);
                    } else if atom == self.conn.CURRENT_DESKTOP() {
                        self.queue(DesktopEvent::ActiveWorkspaceChanged);
                    } else if atom == self.conn.SHOWING_DESKTOP() {
                        if self.overview_visible() {
                            self.queue(DesktopEvent::OverviewShown);
                        } else {
                            self.queue(DesktopEvent::OverviewHidden);
                        }
                    } else if atom == self.conn.CLIENT_LIST() {
                        self.refresh_client_list();
                    }
                } else if atom == self.conn.WM_STATE() {
                    // one property carries both flags; the handlers
                    // are idempotent so firing both is harmless
                    self.queue(DesktopEvent::DemandsAttentionChanged { id: win });
                    self.queue(DesktopEvent::SkipTaskbarChanged { id: win });
                } else if atom == xcb::ATOM_WM_CLASS {
                    self.queue(DesktopEvent::AppChanged { id: win });
                } else if atom == self.conn.WM_DESKTOP() {
                    self.queue(DesktopEvent::WindowWorkspaceChanged { id: win });
                } else if atom == xcb::ATOM_WM_HINTS {
                    self.queue(DesktopEvent::UrgentChanged { id: win });
                }
            }

            // enter/leave and presses are only selected on our own
            // panel widget windows, so they always route to a button
            xcb::ENTER_NOTIFY => {
                let e: &xcb::EnterNotifyEvent = unsafe { xcb::cast_event(event) };
                self.queue(DesktopEvent::HoverChanged {
                    widget: e.event() as WidgetId,
                    hovering: true,
                });
            }

            xcb::LEAVE_NOTIFY => {
                let e: &xcb::LeaveNotifyEvent = unsafe { xcb::cast_event(event) };
                self.queue(DesktopEvent::HoverChanged {
                    widget: e.event() as WidgetId,
                    hovering: false,
                });
            }

            xcb::BUTTON_PRESS => {
                let e: &xcb::ButtonPressEvent = unsafe { xcb::cast_event(event) };
                let widget = e.event() as WidgetId;
                match e.detail() {
                    // X maps scroll wheels onto buttons 4/5
                    4 => self.queue(DesktopEvent::PanelScroll { delta: -1 }),
                    5 => self.queue(DesktopEvent::PanelScroll { delta: 1 }),
                    1 => self.queue(DesktopEvent::ButtonPress {
                        widget,
                        button: MouseButton::Primary,
                    }),
                    2 => self.queue(DesktopEvent::ButtonPress {
                        widget,
                        button: MouseButton::Middle,
                    }),
                    3 => self.queue(DesktopEvent::ButtonPress {
                        widget,
                        button: MouseButton::Secondary,
                    }),
                    other => self.queue(DesktopEvent::ButtonPress {
                        widget,
                        button: MouseButton::Other(other),
                    }),
                }
            }

            // NOTE: ignoring other event types
            _ => (),
        }
    }

    fn queue(&self, event: DesktopEvent) {
        self.pending.borrow_mut().push_back(event);
    }
}

impl HostConnection for XcbHost {
    fn window_exists(&self, win: WindowId) -> bool {
        self.known_windows.borrow().contains(&win)
    }

    fn has_focus(&self, win: WindowId) -> bool {
        self.prop_u32(self.root, self.conn.ACTIVE_WINDOW()) == Some(win)
    }

    fn demands_attention(&self, win: WindowId) -> bool {
        self.net_wm_state(win)
            .contains(&self.conn.WM_STATE_DEMANDS_ATTENTION())
            || self.urgency_hint(win)
    }

    fn is_skip_taskbar(&self, win: WindowId) -> bool {
        self.net_wm_state(win)
            .contains(&self.conn.WM_STATE_SKIP_TASKBAR())
    }

    fn is_minimized(&self, win: WindowId) -> bool {
        self.net_wm_state(win).contains(&self.conn.WM_STATE_HIDDEN())
    }

    fn can_minimize(&self, win: WindowId) -> bool {
        // a missing _NET_WM_ALLOWED_ACTIONS property means the WM
        // does not restrict actions
        let actions = self.prop_u32s(win, self.conn.WM_ALLOWED_ACTIONS(), 32);
        actions.is_empty() || actions.contains(&self.conn.WM_ACTION_MINIMIZE())
    }

    fn window_type(&self, win: WindowId) -> WindowType {
        let types = self.prop_u32s(win, self.conn.WM_WINDOW_TYPE(), 8);
        let first = match types.first() {
            Some(&atom) => atom,
            // EWMH: managed windows without the property are normal
            None => return WindowType::Normal,
        };

        if first == self.conn.WM_WINDOW_TYPE_DIALOG() {
            if self.net_wm_state(win).contains(&self.conn.WM_STATE_MODAL()) {
                WindowType::ModalDialog
            } else {
                WindowType::Dialog
            }
        } else if first == self.conn.WM_WINDOW_TYPE_NORMAL() {
            WindowType::Normal
        } else if first == self.conn.WM_WINDOW_TYPE_DOCK() {
            WindowType::Dock
        } else {
            WindowType::Other
        }
    }

    fn window_monitor(&self, win: WindowId) -> Option<MonitorId> {
        let geom = xcb::get_geometry(&self.conn, win).get_reply().ok()?;
        let origin = xcb::translate_coordinates(&self.conn, win, self.root, 0, 0)
            .get_reply()
            .ok()?;
        let center_x = origin.dst_x() as i32 + geom.width() as i32 / 2;
        let center_y = origin.dst_y() as i32 + geom.height() as i32 / 2;
        self.monitors
            .iter()
            .position(|monitor| monitor.contains(center_x, center_y))
    }

    fn window_workspace(&self, win: WindowId) -> Option<WsId> {
        match self.prop_u32(win, self.conn.WM_DESKTOP())? {
            // sticky windows count as on the active workspace
            ALL_DESKTOPS => Some(self.active_workspace()),
            desktop => Some(desktop as WsId),
        }
    }

    fn wm_class(&self, win: WindowId) -> Option<String> {
        icccm::get_wm_class(&self.conn, win)
            .get_reply()
            .ok()
            .map(|reply| reply.class().to_string())
    }

    fn activate_window(&self, win: WindowId) {
        self.send_root_message(
            win,
            self.conn.ACTIVE_WINDOW(),
            [SOURCE_PAGER, xcb::CURRENT_TIME, 0, 0, 0],
        );
    }

    fn focus_window(&self, win: WindowId) {
        xcb::set_input_focus(
            &self.conn,               // xcb connection to X11
            INPUT_FOCUS_POINTER_ROOT, // fall back to the pointer root when focus is lost
            win,                      // window to focus
            xcb::CURRENT_TIME,        // current time to avoid network race conditions
        );
    }

    fn minimize_window(&self, win: WindowId) {
        self.send_root_message(win, self.atoms.WM_CHANGE_STATE, [ICONIC_STATE, 0, 0, 0, 0]);
    }

    fn raise_window(&self, win: WindowId) {
        xcb::configure_window(
            &self.conn,
            win,
            &[(CONFIG_WINDOW_STACK_MODE, CONFIG_WINDOW_STACK_ABOVE)],
        );
    }

    fn active_workspace(&self) -> WsId {
        self.prop_u32(self.root, self.conn.CURRENT_DESKTOP())
            .unwrap_or(0) as WsId
    }

    fn workspace_count(&self) -> usize {
        self.prop_u32(self.root, self.conn.NUMBER_OF_DESKTOPS())
            .unwrap_or(1)
            .max(1) as usize
    }

    fn workspace_windows(&self, ws: WsId) -> Vec<WindowId> {
        self.known_windows
            .borrow()
            .iter()
            .copied()
            .filter(|&win| self.window_workspace(win) == Some(ws))
            .collect()
    }

    fn sort_windows_by_stacking(&self, windows: Vec<WindowId>) -> Vec<WindowId> {
        let stacking = self.prop_u32s(self.root, self.conn.CLIENT_LIST_STACKING(), 4096);
        let mut sorted: Vec<WindowId> = windows
            .iter()
            .copied()
            .filter(|win| !stacking.contains(win))
            .collect();
        sorted.extend(stacking.iter().copied().filter(|win| windows.contains(win)));
        sorted
    }

    fn window_app(&self, win: WindowId) -> Option<AppDescriptor> {
        let class = self.wm_class(win)?;
        Some(AppDescriptor {
            icon: Icon::Named(class.to_lowercase()),
            can_open_new_window: true,
            id: class,
        })
    }

    fn open_new_window(&self, app: &AppDescriptor) {
        // best effort: the class name doubles as the program name for
        // the vast majority of X applications
        let program = app.id.to_lowercase();
        match Command::new(&program).spawn() {
            Ok(child) => debug!("spawned {} (pid {})", program, child.id()),
            Err(err) => warn!("could not spawn {}: {}", program, err),
        }
    }

    fn overview_visible(&self) -> bool {
        self.prop_u32(self.root, self.conn.SHOWING_DESKTOP()) == Some(1)
    }

    fn hide_overview(&self) {
        self.send_root_message(self.root, self.conn.SHOWING_DESKTOP(), [0, 0, 0, 0, 0]);
    }

    fn workspace_scroll_enabled(&self) -> bool {
        self.workspace_scroll
    }

    fn handle_workspace_scroll(&self, delta: i32) {
        let count = self.workspace_count() as i64;
        let current = self.active_workspace() as i64;
        let target = (current + delta as i64).max(0).min(count - 1);
        if target != current {
            self.send_root_message(
                self.root,
                self.conn.CURRENT_DESKTOP(),
                [target as u32, xcb::CURRENT_TIME, 0, 0, 0],
            );
        }
    }

    fn poll_event(&self) -> Option<DesktopEvent> {
        loop {
            let queued = self.pending.borrow_mut().pop_front();
            if queued.is_some() {
                return queued;
            }
            let event = self.conn.poll_for_event()?;
            self.translate(&event);
        }
    }

    fn flush(&self) {
        self.conn.flush();
    }
}

fn detect_monitors(conn: &ewmh::Connection, root: Window) -> Vec<Rect> {
    let resources = match randr::get_screen_resources(conn, root).get_reply() {
        Ok(resources) => resources,
        Err(err) => {
            warn!("failed to read randr screen resources: {:?}", err);
            return Vec::new();
        }
    };

    resources
        .crtcs()
        .iter()
        .flat_map(|crtc| randr::get_crtc_info(conn, *crtc, 0).get_reply())
        .map(|info| {
            Rect::new(
                info.x() as i32,
                info.y() as i32,
                info.width() as u32,
                info.height() as u32,
            )
        })
        .filter(|rect| rect.w > 0)
        .collect()
}
