#[macro_use]
extern crate log;

use simplelog::{LevelFilter, SimpleLogger};
use taskpanel::{Config, TasksExtension, XPanel, XcbHost};

pub type Result<T> = anyhow::Result<T>;

fn main() -> Result<()> {
    SimpleLogger::init(LevelFilter::Info, simplelog::Config::default())?;

    let config = Config::default();

    let mut host = XcbHost::new()?;
    host.set_workspace_scroll(config.workspace_scroll);
    let panel = XPanel::new(&host)?;

    let mut extension = TasksExtension::new();
    extension.enable(&host, Box::new(panel), config);

    if let Some(taskbar) = extension.taskbar_mut() {
        taskbar.run();
    }

    info!("exiting");
    extension.disable();

    Ok(())
}
