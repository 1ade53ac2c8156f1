//! Application menu commands and their dispatch onto windows and the bridge.

use shared::domain::WindowRole;
use tracing::debug;

use crate::{
    bridge::{EventBridge, ListOrigin},
    error::WindowError,
    window::{WindowManager, WindowSpecs},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    Register,
    List,
    Reload,
}

impl MenuCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            MenuCommand::Register => "register",
            MenuCommand::List => "list",
            MenuCommand::Reload => "reload",
        }
    }
}

pub struct MenuController {
    specs: WindowSpecs,
}

impl MenuController {
    pub fn new(specs: WindowSpecs) -> Self {
        Self { specs }
    }

    pub fn specs(&self) -> &WindowSpecs {
        &self.specs
    }

    pub fn dispatch(
        &self,
        command: MenuCommand,
        windows: &mut WindowManager,
        bridge: &mut EventBridge,
    ) -> Result<(), WindowError> {
        debug!(command = command.as_str(), "dispatching menu command");
        match command {
            MenuCommand::Register => {
                windows.ensure(WindowRole::Register, &self.specs.register)?;
                windows.show(WindowRole::Register);
            }
            MenuCommand::List => {
                let reused = windows.is_open(WindowRole::List);
                windows.ensure(WindowRole::List, &self.specs.list)?;
                windows.show(WindowRole::List);
                // The gate waits on the navigation current when it is armed,
                // so a reused window is reloaded first.
                if reused {
                    windows.reload(WindowRole::List);
                }
                bridge.request_list(windows, ListOrigin::Menu);
            }
            MenuCommand::Reload => {
                windows.reload(WindowRole::Main);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_names_are_stable() {
        let names: Vec<_> = [MenuCommand::Register, MenuCommand::List, MenuCommand::Reload]
            .into_iter()
            .map(MenuCommand::as_str)
            .collect();
        assert_eq!(names, ["register", "list", "reload"]);
    }
}
