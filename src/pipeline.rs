use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::app::App;
use crate::cmd::Shell;
use crate::configure::AppConfigurator;
use crate::error::ProvisionResult;
use crate::guard::Guard;
use crate::install::Installer;
use crate::layout::Layout;
use crate::params::RunParams;
use crate::probe::{self, HostFacts, Probe, nat};
use crate::proxy::ProxyConfigurator;
use crate::stack::Stack;

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub fresh_install: bool,
    pub url: String,
    pub data_dir: PathBuf,
    pub services: Vec<String>,
    pub facts: HostFacts,
}

/// The whole installation, start to finish. Safe to run again: a
/// second run upgrades in place.
pub struct Pipeline {
    app: App,
    layout: Layout,
    lock_backoff: Duration,
    port_backoff: Duration,
    nat_port: u16,
    settle: Duration,
}

impl Pipeline {
    #[must_use]
    pub const fn new(app: App, layout: Layout) -> Self {
        Self {
            app,
            layout,
            lock_backoff: Duration::from_secs(1),
            port_backoff: Duration::from_secs(1),
            nat_port: nat::CERTIFICATE_PORT,
            settle: Duration::from_secs(5),
        }
    }

    #[must_use]
    pub const fn lock_backoff(mut self, backoff: Duration) -> Self {
        self.lock_backoff = backoff;
        self
    }

    #[must_use]
    pub const fn port_backoff(mut self, backoff: Duration) -> Self {
        self.port_backoff = backoff;
        self
    }

    /// Port used to confirm a NAT address; the certificate port by
    /// default.
    #[must_use]
    pub const fn nat_port(mut self, port: u16) -> Self {
        self.nat_port = port;
        self
    }

    #[must_use]
    pub const fn settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Check the host, then install, configure, and (re)start.
    /// Nothing is modified until every check has passed.
    pub fn run(&self, shell: &dyn Shell, params: &RunParams) -> ProvisionResult<Outcome> {
        let fresh_install = self.layout.is_fresh_install();
        let facts = self.preflight(shell, params, fresh_install)?;

        let installer = Installer::new(shell, &self.layout).lock_backoff(self.lock_backoff);
        let base: Vec<&str> = self.app.base_packages.iter().map(String::as_str).collect();
        installer.ensure(&base)?;
        installer.ensure_runtime()?;

        let configurator = AppConfigurator::new(shell, &self.layout, &self.app);
        configurator.materialize()?;
        configurator.patch(params.server())?;

        let proxy = ProxyConfigurator::new(shell, &self.layout, &self.app);
        proxy.configure(params)?;
        proxy.ensure_certificate(params)?;

        let stack = Stack::new(shell, &self.layout, &self.app).settle(self.settle);
        let services = stack.refresh()?;
        stack.reconcile()?;

        let url = format!("https://{}", params.hostname());
        info!(%url, "installation complete");
        Ok(Outcome {
            fresh_install,
            url,
            data_dir: self.layout.data_dir.clone(),
            services,
            facts,
        })
    }

    /// Every guard check, in order. Read-only, except that the NAT
    /// check pauses the proxy when it holds the check port.
    pub fn preflight(
        &self,
        shell: &dyn Shell,
        params: &RunParams,
        fresh_install: bool,
    ) -> ProvisionResult<HostFacts> {
        let probe = Probe::new(shell, &self.layout)
            .port_backoff(self.port_backoff)
            .nat_port(self.nat_port);
        let guard = Guard::new(&self.app);
        let mut facts = HostFacts::default();

        guard.check_privileges(probe.is_root()?)?;

        probe.platform(&mut facts)?;
        guard.check_platform(&facts)?;

        probe.software(&mut facts)?;
        guard.check_conflicts(&facts, fresh_install)?;

        let hostname = params.hostname();
        probe.addresses(&mut facts, hostname)?;
        let resolved = probe::resolve(shell, hostname);
        guard.check_dns(hostname, &resolved, &facts)?;

        Ok(facts)
    }
}
