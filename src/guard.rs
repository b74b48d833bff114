use std::net::Ipv4Addr;

use tracing::info;

use crate::app::App;
use crate::error::{ProvisionError, ProvisionResult};
use crate::probe::HostFacts;

pub const SUPPORTED_OS: &str = "ubuntu";
pub const SUPPORTED_VERSION: &str = "22.04";
pub const SUPPORTED_ARCH: &str = "amd64";

/// Packages from the conferencing server itself. It bundles its own
/// proxy and ports and cannot share a host with the application.
pub const CONFLICTING_PACKAGE_PREFIX: &str = "bbb-";

/// Safety checks run before anything on the host is changed. Every
/// check fails fast with a message meant for the operator.
pub struct Guard<'a> {
    app: &'a App,
}

impl<'a> Guard<'a> {
    #[must_use]
    pub const fn new(app: &'a App) -> Self {
        Self { app }
    }

    pub fn check_privileges(&self, is_root: bool) -> ProvisionResult<()> {
        if is_root {
            Ok(())
        } else {
            Err(ProvisionError::Privilege(
                "this installer must be run as root".into(),
            ))
        }
    }

    pub fn check_platform(&self, facts: &HostFacts) -> ProvisionResult<()> {
        let supported = facts.os_id == SUPPORTED_OS
            && facts.os_version == SUPPORTED_VERSION
            && facts.arch == SUPPORTED_ARCH;
        if supported {
            return Ok(());
        }
        Err(ProvisionError::PlatformMismatch {
            expected: format!("{SUPPORTED_OS} {SUPPORTED_VERSION} ({SUPPORTED_ARCH})"),
            found: format!("{} {} ({})", facts.os_id, facts.os_version, facts.arch),
        })
    }

    /// Fresh installs only: refuse to share the host with software
    /// that would fight over the proxy or ports. Upgrades skip this,
    /// the original install already passed it.
    pub fn check_conflicts(&self, facts: &HostFacts, fresh_install: bool) -> ProvisionResult<()> {
        if !fresh_install {
            info!("existing installation found, skipping conflict checks");
            return Ok(());
        }

        let mut problems = Vec::new();

        let conflicting = facts.packages_with_prefix(CONFLICTING_PACKAGE_PREFIX);
        if !conflicting.is_empty() {
            problems.push(format!(
                "conferencing server packages are installed ({})",
                conflicting.join(", ")
            ));
        }

        if facts.foreign_proxy {
            problems.push("nginx is present but was not installed by the package manager".into());
        }

        let busy: Vec<String> = self
            .app
            .required_ports()
            .into_iter()
            .filter(|p| facts.listening.contains(p))
            .map(|p| p.to_string())
            .collect();
        if !busy.is_empty() {
            problems.push(format!("ports already in use: {}", busy.join(", ")));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ProvisionError::ConflictDetected(problems.join("; ")))
        }
    }

    /// `hostname` must already point at this host, otherwise
    /// certificate issuance cannot succeed.
    pub fn check_dns(
        &self,
        hostname: &str,
        resolved: &[Ipv4Addr],
        facts: &HostFacts,
    ) -> ProvisionResult<()> {
        let own = facts.own_addresses();
        if resolved.iter().any(|ip| own.contains(ip)) {
            return Ok(());
        }
        Err(ProvisionError::DnsMismatch {
            hostname: hostname.to_string(),
            resolved: join(resolved),
            expected: join(&own),
        })
    }
}

fn join(ips: &[Ipv4Addr]) -> String {
    ips.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
