// #![warn(missing_docs)]

#[macro_use]
extern crate log;

pub mod host;
pub mod taskbar;
pub mod widget;

mod button;
mod signals;
mod xhost;
mod xpanel;

#[cfg(test)]
pub(crate) mod testutil;

pub use button::TaskButton;
pub use host::HostConnection;
pub use taskbar::{Config, TaskBar, TasksExtension};
pub use xhost::XcbHost;
pub use xpanel::XPanel;
