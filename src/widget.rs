/// Identifier used to route pointer events back to a button's widget.
/// X backends use the widget's window id.
pub type WidgetId = u64;

/// Reference to an icon by theme name. Resolution is the toolkit's job.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Icon {
    Named(String),
    None,
}

/**
 * The toolkit seam: one clickable panel widget per task button.
 *
 * The taskbar only ever drives these setters from its derivation
 * functions and never reads host state back through them, so a widget
 * implementation can be as dumb as a struct of fields. Getters exist
 * so the derived state stays observable.
 */
pub trait Widget {
    fn id(&self) -> WidgetId;

    fn set_visible(&mut self, visible: bool);
    fn visible(&self) -> bool;

    /// 0 (transparent) to 255 (opaque).
    fn set_opacity(&mut self, opacity: u8);
    fn opacity(&self) -> u8;

    fn set_icon(&mut self, icon: Icon);
    fn icon(&self) -> &Icon;

    fn set_icon_size(&mut self, px: u32);
    fn icon_size(&self) -> u32;

    /// Apply or clear the attention style.
    fn set_attention(&mut self, on: bool);
    fn attention(&self) -> bool;

    // attached application menu
    fn close_menu(&mut self);
    fn set_menu_app(&mut self, app: Option<String>);
    fn menu_app(&self) -> Option<&str>;
}

/**
 * Named-slot widget registry of the host panel.
 *
 * `create_button` claims a slot and returns the widget mounted there,
 * or `None` if the slot is already taken. The slot-collision check is a
 * second guard against duplicate buttons; the taskbar's own window map
 * is the authoritative one.
 */
pub trait Panel {
    fn create_button(&mut self, key: &str) -> Option<Box<dyn Widget>>;
    fn destroy_button(&mut self, key: &str);
}
