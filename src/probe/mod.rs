pub mod cloud;
pub mod nat;
pub mod parse;

use std::collections::BTreeSet;
use std::fs;
use std::net::Ipv4Addr;
use std::time::Duration;

use tracing::{debug, info};

use crate::cmd::Shell;
use crate::error::{ProvisionError, ProvisionResult};
use crate::layout::Layout;
use crate::proxy::ProxyService;

use self::cloud::Cloud;

/// Public resolver used for all hostname lookups.
pub const PUBLIC_RESOLVER: &str = "8.8.8.8";

/// What the probe learned about the host during this run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostFacts {
    pub os_id: String,
    pub os_version: String,
    pub arch: String,
    pub installed: BTreeSet<String>,
    pub listening: BTreeSet<u16>,
    /// A proxy binary is on PATH without its package being installed.
    pub foreign_proxy: bool,
    pub local_ip: Option<Ipv4Addr>,
    pub external_ip: Option<Ipv4Addr>,
    pub behind_nat: bool,
}

impl HostFacts {
    /// Addresses that count as "this host" for DNS ownership.
    #[must_use]
    pub fn own_addresses(&self) -> Vec<Ipv4Addr> {
        let mut own: Vec<Ipv4Addr> = self.local_ip.into_iter().collect();
        if self.behind_nat {
            own.extend(self.external_ip.filter(|ip| !own.contains(ip)));
        }
        own
    }

    /// Installed packages whose name starts with `prefix`.
    #[must_use]
    pub fn packages_with_prefix(&self, prefix: &str) -> Vec<&str> {
        self.installed
            .iter()
            .filter(|p| p.starts_with(prefix))
            .map(String::as_str)
            .collect()
    }
}

/// Where the external address came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Metadata,
    Dns,
}

/// Read-only host inspection. The one exception is the NAT check,
/// which pauses the proxy if it holds the check port and always
/// restores it.
pub struct Probe<'a> {
    shell: &'a dyn Shell,
    layout: &'a Layout,
    port_backoff: Duration,
    nat_port: u16,
}

impl<'a> Probe<'a> {
    #[must_use]
    pub fn new(shell: &'a dyn Shell, layout: &'a Layout) -> Self {
        Self {
            shell,
            layout,
            port_backoff: Duration::from_secs(1),
            nat_port: nat::CERTIFICATE_PORT,
        }
    }

    #[must_use]
    pub const fn port_backoff(mut self, backoff: Duration) -> Self {
        self.port_backoff = backoff;
        self
    }

    /// Port the NAT check listens on and connects to.
    #[must_use]
    pub const fn nat_port(mut self, port: u16) -> Self {
        self.nat_port = port;
        self
    }

    /// Effective user id is 0.
    pub fn is_root(&self) -> ProvisionResult<bool> {
        Ok(self.shell.run("id", &["-u"])? == "0")
    }

    /// OS release and CPU architecture.
    pub fn platform(&self, facts: &mut HostFacts) -> ProvisionResult<()> {
        let content = fs::read_to_string(&self.layout.os_release).unwrap_or_default();
        let (id, version) = parse::parse_os_release(&content);
        facts.os_id = id;
        facts.os_version = version;
        facts.arch = self.shell.run("dpkg", &["--print-architecture"])?;
        debug!(os = %facts.os_id, version = %facts.os_version, arch = %facts.arch, "platform");
        Ok(())
    }

    /// Installed packages, listening ports, and stray proxy binaries.
    pub fn software(&self, facts: &mut HostFacts) -> ProvisionResult<()> {
        let packages = self.shell.run(
            "dpkg-query",
            &["-W", "-f", "${db:Status-Abbrev} ${Package}\\n"],
        )?;
        facts.installed = parse::parse_installed_packages(&packages);

        let sockets = self.shell.run("ss", &["-Htln"])?;
        facts.listening = parse::parse_listening_ports(&sockets);

        facts.foreign_proxy =
            self.shell.command_exists("nginx") && !facts.installed.contains("nginx");

        debug!(
            packages = facts.installed.len(),
            ports = ?facts.listening,
            foreign_proxy = facts.foreign_proxy,
            "software"
        );
        Ok(())
    }

    /// Local and external addresses, confirming NAT when they differ.
    ///
    /// The local address must be found on the host itself. Only cloud
    /// metadata may stand in for it: an answer for `hostname` says
    /// nothing about which host we are on.
    pub fn addresses(&self, facts: &mut HostFacts, hostname: &str) -> ProvisionResult<()> {
        let local = self.local_ip();
        let external = self.external_ip(hostname);

        let (local, external) = match (local, external) {
            (Some(l), Some((e, _))) => (l, e),
            (Some(l), None) => (l, l),
            (None, Some((e, Source::Metadata))) => (e, e),
            (None, Some((_, Source::Dns))) | (None, None) => {
                return Err(ProvisionError::UnresolvableHost(
                    "no IPv4 address is configured on this host".into(),
                ));
            }
        };
        facts.local_ip = Some(local);
        facts.external_ip = Some(external);

        facts.behind_nat = local != external
            && nat::confirm_nat(
                &ProxyService::new(self.shell),
                external,
                self.nat_port,
                self.port_backoff,
            )?;

        info!(
            %local,
            %external,
            nat = facts.behind_nat,
            "host addresses"
        );
        Ok(())
    }

    /// Address of the default-route device, falling back to the
    /// host's configured address list.
    fn local_ip(&self) -> Option<Ipv4Addr> {
        let from_route = self
            .shell
            .run("ip", &["-4", "route", "show", "default"])
            .ok()
            .and_then(|out| parse::parse_default_device(&out))
            .and_then(|dev| {
                self.shell
                    .run("ip", &["-4", "-o", "addr", "show", "dev", &dev])
                    .ok()
            })
            .and_then(|out| parse::parse_inet_addr(&out));

        from_route.or_else(|| {
            self.shell
                .run("hostname", &["-I"])
                .ok()
                .and_then(|out| parse::parse_address_list(&out))
        })
    }

    /// Cloud metadata first, then what public DNS says `hostname` is.
    fn external_ip(&self, hostname: &str) -> Option<(Ipv4Addr, Source)> {
        if let Some(cloud) = Cloud::detect(&self.layout.dmi_dir) {
            debug!(?cloud, "cloud platform detected");
            if let Some(ip) = cloud.public_ip(self.shell) {
                return Some((ip, Source::Metadata));
            }
        }
        resolve(self.shell, hostname)
            .first()
            .map(|ip| (*ip, Source::Dns))
    }
}

/// IPv4 addresses `name` resolves to, via the public resolver when
/// `dig` is available, otherwise via the system resolver.
pub fn resolve(shell: &dyn Shell, name: &str) -> Vec<Ipv4Addr> {
    let resolver = format!("@{PUBLIC_RESOLVER}");
    let via_dig = shell
        .run("dig", &["+short", "A", name, &resolver])
        .map(|out| parse::parse_ipv4_lines(&out))
        .unwrap_or_default();
    if !via_dig.is_empty() {
        return via_dig;
    }

    shell
        .run("getent", &["ahostsv4", name])
        .map(|out| parse::parse_ipv4_lines(&out))
        .unwrap_or_default()
}
