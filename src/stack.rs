use std::fs;
use std::thread;
use std::time::Duration;

use tracing::info;

use crate::app::App;
use crate::cmd::Shell;
use crate::compose::ComposeFile;
use crate::error::ProvisionResult;
use crate::layout::Layout;

/// Drives the application's containers through the pinned compose
/// tool.
pub struct Stack<'a> {
    shell: &'a dyn Shell,
    layout: &'a Layout,
    app: &'a App,
    settle: Duration,
}

impl<'a> Stack<'a> {
    #[must_use]
    pub const fn new(shell: &'a dyn Shell, layout: &'a Layout, app: &'a App) -> Self {
        Self {
            shell,
            layout,
            app,
            settle: Duration::from_secs(5),
        }
    }

    /// How long to wait after `up` before declaring success.
    #[must_use]
    pub const fn settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Pull the latest images for every service in the descriptor.
    pub fn refresh(&self) -> ProvisionResult<Vec<String>> {
        let compose = ComposeFile::parse(&fs::read_to_string(self.layout.compose_path())?);
        let services = compose.services()?;
        info!(services = %services.join(", "), "pulling images");
        self.compose(&["pull"])?;
        Ok(services)
    }

    /// Whether a container following the application's naming
    /// convention is running.
    pub fn is_running(&self) -> ProvisionResult<bool> {
        let filter = format!("name={}", self.app.name);
        let names = self
            .shell
            .run("docker", &["ps", "--filter", &filter, "--format", "{{.Names}}"])?;
        Ok(!names.trim().is_empty())
    }

    /// Tear down a running stack, then bring everything up detached.
    pub fn reconcile(&self) -> ProvisionResult<()> {
        if self.is_running()? {
            info!("stopping running stack");
            self.compose(&["down"])?;
        }

        info!("starting stack");
        self.compose(&["up", "-d"])?;

        if !self.settle.is_zero() {
            info!(seconds = self.settle.as_secs(), "waiting for services to start");
            thread::sleep(self.settle);
        }
        Ok(())
    }

    fn compose(&self, args: &[&str]) -> ProvisionResult<()> {
        let bin = self.layout.compose_bin.display().to_string();
        let file = self.layout.compose_path().display().to_string();
        let mut full = vec!["-f", file.as_str()];
        full.extend_from_slice(args);
        self.shell.exec_interactive(&bin, &full)
    }
}
