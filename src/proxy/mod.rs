pub mod nginx;

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, info};

use crate::app::App;
use crate::cmd::Shell;
use crate::error::{ProvisionError, ProvisionResult};
use crate::layout::Layout;
use crate::params::RunParams;

/// Lifecycle control of the proxy daemon through the service
/// manager.
pub struct ProxyService<'a> {
    shell: &'a dyn Shell,
    unit: String,
}

impl<'a> ProxyService<'a> {
    #[must_use]
    pub fn new(shell: &'a dyn Shell) -> Self {
        Self {
            shell,
            unit: "nginx".to_string(),
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.shell
            .exec("systemctl", &["is-active", "--quiet", &self.unit])
            .is_ok_and(|o| o.success)
    }

    pub fn stop(&self) -> ProvisionResult<()> {
        self.shell.run("systemctl", &["stop", &self.unit]).map(drop)
    }

    pub fn start(&self) -> ProvisionResult<()> {
        self.shell.run("systemctl", &["start", &self.unit]).map(drop)
    }

    /// Validate the configuration on disk.
    pub fn test(&self) -> ProvisionResult<()> {
        let out = self.shell.exec("nginx", &["-t"])?;
        if out.success {
            Ok(())
        } else {
            Err(ProvisionError::ProxyConfigTest(out.diagnostic()))
        }
    }

    /// Reload, not restart: open connections survive.
    pub fn reload(&self) -> ProvisionResult<()> {
        self.shell.run("systemctl", &["reload", &self.unit]).map(drop)
    }
}

/// Writes and enables the site without ever touching files an
/// operator may have edited.
pub struct ProxyConfigurator<'a> {
    shell: &'a dyn Shell,
    layout: &'a Layout,
    app: &'a App,
}

impl<'a> ProxyConfigurator<'a> {
    #[must_use]
    pub fn new(shell: &'a dyn Shell, layout: &'a Layout, app: &'a App) -> Self {
        Self { shell, layout, app }
    }

    /// Write missing site and fragment files, enable the site,
    /// disable the default site, then validate and reload.
    pub fn configure(&self, params: &RunParams) -> ProvisionResult<()> {
        fs::create_dir_all(&self.layout.fragment_dir)?;
        let fragment = nginx::render_fragment(self.app.port);
        if write_if_absent(&self.layout.fragment_file(), &fragment)? {
            info!(path = %self.layout.fragment_file().display(), "wrote proxy fragment");
        }

        fs::create_dir_all(&self.layout.sites_available)?;
        let site = nginx::render_site(
            params.hostname(),
            &self.layout.access_log(),
            &self.layout.fragment_dir,
        );
        if write_if_absent(&self.layout.site_file(), &site)? {
            info!(path = %self.layout.site_file().display(), "wrote proxy site");
        } else {
            debug!("proxy site already present, leaving it alone");
        }

        fs::create_dir_all(&self.layout.sites_enabled)?;
        let link = self.layout.site_link();
        if !exists_or_dangling(&link) {
            symlink(&self.layout.site_file(), &link)?;
            info!(site = %self.layout.proxy_site, "enabled proxy site");
        }

        let default_site = self.layout.sites_enabled.join("default");
        if exists_or_dangling(&default_site) {
            fs::remove_file(&default_site)?;
            info!("disabled default proxy site");
        }

        let service = ProxyService::new(self.shell);
        service.test()?;
        service.reload()
    }

    /// Request a certificate for the hostname unless one is already
    /// on disk.
    pub fn ensure_certificate(&self, params: &RunParams) -> ProvisionResult<()> {
        let hostname = params.hostname();
        if self.layout.certificate(hostname).exists() {
            debug!(hostname, "certificate already present");
            return Ok(());
        }

        info!(hostname, "requesting certificate");
        let out = self.shell.exec(
            "certbot",
            &[
                "--nginx",
                "--non-interactive",
                "--agree-tos",
                "-m",
                params.email(),
                "-d",
                hostname,
                "--redirect",
            ],
        )?;
        if out.success {
            Ok(())
        } else {
            Err(ProvisionError::Certificate(out.diagnostic()))
        }
    }
}

/// Create `path` with `content` unless it exists. Returns whether
/// it wrote.
pub fn write_if_absent(path: &Path, content: &str) -> ProvisionResult<bool> {
    match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
    {
        Ok(mut file) => {
            use std::io::Write;
            file.write_all(content.as_bytes())?;
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn exists_or_dangling(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> ProvisionResult<()> {
    std::os::unix::fs::symlink(target, link)?;
    Ok(())
}

#[cfg(not(unix))]
fn symlink(target: &Path, link: &Path) -> ProvisionResult<()> {
    fs::copy(target, link)?;
    Ok(())
}
