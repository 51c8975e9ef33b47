use crate::button::ICON_SIZE;
use crate::widget::{Icon, Panel, Widget, WidgetId};
use crate::xhost::XcbHost;

use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{Context, Result};
use xcb::{Atom, Window};
use xcb_util::ewmh;

const PROP_MODE_REPLACE: u8 = xcb::PROP_MODE_REPLACE as u8;
const WINDOW_CLASS_INPUT_OUTPUT: u16 = xcb::WINDOW_CLASS_INPUT_OUTPUT as u16;

// Pointer events a button widget needs; everything else stays with the WM
const WIDGET_EVENT_MASK: u32 =
    xcb::EVENT_MASK_ENTER_WINDOW | xcb::EVENT_MASK_LEAVE_WINDOW | xcb::EVENT_MASK_BUTTON_PRESS;

const SLOT_PADDING: u16 = 4;
const SLOT_SIZE: u16 = ICON_SIZE as u16 + 2 * SLOT_PADDING;

/**
 * Barebones panel strip backend: one small override-redirect X window
 * per claimed slot, laid out left to right along the top edge of the
 * screen. Compositor-level styling (opacity, attention color) goes
 * through window properties and attributes so a real compositor can
 * pick it up.
 */
pub struct XPanel {
    conn: Rc<ewmh::Connection>,
    root: Window,
    root_visual: xcb::Visualid,
    normal_pixel: u32,
    attention_pixel: u32,
    opacity_atom: Atom,
    slots: HashMap<String, (Window, i16)>,
    layout: SlotLayout,
}

impl XPanel {
    pub fn new(host: &XcbHost) -> Result<XPanel> {
        let conn = host.connection();
        let root = host.root();

        let (root_visual, normal_pixel, attention_pixel) = {
            let setup = conn.get_setup();
            let screen = setup
                .roots()
                .nth(host.screen() as usize)
                .context("Unable to get the preferred screen")?;
            (
                screen.root_visual(),
                screen.black_pixel(),
                screen.white_pixel(),
            )
        };

        let opacity_atom = xcb::intern_atom(&conn, false, "_NET_WM_WINDOW_OPACITY")
            .get_reply()
            .context("Failed to intern _NET_WM_WINDOW_OPACITY")?
            .atom();

        Ok(XPanel {
            conn,
            root,
            root_visual,
            normal_pixel,
            attention_pixel,
            opacity_atom,
            slots: HashMap::new(),
            layout: SlotLayout::new(),
        })
    }
}

/// Hands out x positions for slot windows. Freed positions are reused
/// before the strip grows; growth saturates at the i16 edge instead of
/// wrapping, since coordinates that far off screen are invisible anyway.
struct SlotLayout {
    next_x: i16,
    free: Vec<i16>,
}

impl SlotLayout {
    fn new() -> SlotLayout {
        SlotLayout {
            next_x: 0,
            free: Vec::new(),
        }
    }

    fn claim(&mut self) -> i16 {
        if let Some(x) = self.free.pop() {
            return x;
        }
        let x = self.next_x;
        self.next_x = self.next_x.saturating_add(SLOT_SIZE as i16);
        x
    }

    fn release(&mut self, x: i16) {
        self.free.push(x);
    }
}

impl Panel for XPanel {
    fn create_button(&mut self, key: &str) -> Option<Box<dyn Widget>> {
        if self.slots.contains_key(key) {
            return None;
        }

        let win = self.conn.generate_id();
        let x = self.layout.claim();
        xcb::create_window(
            &self.conn,
            xcb::COPY_FROM_PARENT as u8, // depth
            win,
            self.root,
            x,         // x
            0,         // y
            SLOT_SIZE, // width
            SLOT_SIZE, // height
            0,         // border width
            WINDOW_CLASS_INPUT_OUTPUT,
            self.root_visual,
            // value list entries must stay in CW enum order
            &[
                (xcb::CW_BACK_PIXEL, self.normal_pixel),
                (xcb::CW_OVERRIDE_REDIRECT, 1),
                (xcb::CW_EVENT_MASK, WIDGET_EVENT_MASK),
            ],
        );
        xcb::map_window(&self.conn, win);
        self.conn.flush();

        self.slots.insert(key.to_string(), (win, x));

        Some(Box::new(XWidget::new(
            self.conn.clone(),
            win,
            self.opacity_atom,
            self.normal_pixel,
            self.attention_pixel,
        )))
    }

    fn destroy_button(&mut self, key: &str) {
        if let Some((win, x)) = self.slots.remove(key) {
            xcb::destroy_window(&self.conn, win);
            self.conn.flush();
            self.layout.release(x);
        }
    }
}

/// One panel slot window. The setters push straight to the server; the
/// shadow fields only exist so derived state stays observable.
pub struct XWidget {
    conn: Rc<ewmh::Connection>,
    win: Window,
    opacity_atom: Atom,
    normal_pixel: u32,
    attention_pixel: u32,
    visible: bool,
    opacity: u8,
    icon: Icon,
    icon_size: u32,
    attention: bool,
    menu_app: Option<String>,
}

impl XWidget {
    fn new(
        conn: Rc<ewmh::Connection>,
        win: Window,
        opacity_atom: Atom,
        normal_pixel: u32,
        attention_pixel: u32,
    ) -> XWidget {
        XWidget {
            conn,
            win,
            opacity_atom,
            normal_pixel,
            attention_pixel,
            visible: true,
            opacity: 255,
            icon: Icon::None,
            icon_size: 0,
            attention: false,
            menu_app: None,
        }
    }
}

impl Widget for XWidget {
    fn id(&self) -> WidgetId {
        self.win as WidgetId
    }

    fn set_visible(&mut self, visible: bool) {
        if visible == self.visible {
            return;
        }
        if visible {
            xcb::map_window(&self.conn, self.win);
        } else {
            xcb::unmap_window(&self.conn, self.win);
        }
        self.visible = visible;
    }

    fn visible(&self) -> bool {
        self.visible
    }

    fn set_opacity(&mut self, opacity: u8) {
        // scale 0..=255 onto the full u32 range _NET_WM_WINDOW_OPACITY uses
        let scaled = (opacity as u64 * 0xFFFF_FFFF / 255) as u32;
        xcb::change_property(
            &self.conn,
            PROP_MODE_REPLACE,
            self.win,
            self.opacity_atom,
            xcb::ATOM_CARDINAL,
            32,
            &[scaled],
        );
        self.opacity = opacity;
    }

    fn opacity(&self) -> u8 {
        self.opacity
    }

    fn set_icon(&mut self, icon: Icon) {
        // icon theme lookup is left to whatever draws the slot; expose
        // the name on the window so it can
        let name = match &icon {
            Icon::Named(name) => name.as_str(),
            Icon::None => "",
        };
        xcb::change_property(
            &self.conn,
            PROP_MODE_REPLACE,
            self.win,
            xcb::ATOM_WM_NAME,
            xcb::ATOM_STRING,
            8,
            name.as_bytes(),
        );
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
        if on == self.attention {
            return;
        }
        let pixel = if on {
            self.attention_pixel
        } else {
            self.normal_pixel
        };
        xcb::change_window_attributes(&self.conn, self.win, &[(xcb::CW_BACK_PIXEL, pixel)]);
        // repaint with the new background
        xcb::clear_area(&self.conn, true, self.win, 0, 0, 0, 0);
        self.attention = on;
    }

    fn attention(&self) -> bool {
        self.attention
    }

    fn close_menu(&mut self) {
        // this backend has no menu surface; nothing to dismiss
    }

    fn set_menu_app(&mut self, app: Option<String>) {
        self.menu_app = app;
    }

    fn menu_app(&self) -> Option<&str> {
        self.menu_app.as_deref()
    }
}
