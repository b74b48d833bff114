use std::cell::Cell;
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cmd::Shell;
use crate::error::{ProvisionError, ProvisionResult};
use crate::layout::Layout;

pub const RUNTIME_PACKAGES: &[&str] = &["docker-ce", "docker-ce-cli", "containerd.io"];
pub const RUNTIME_REPO: &str = "https://download.docker.com/linux/ubuntu";
pub const RUNTIME_SUITE: &str = "jammy";
/// Distribution-packaged compose tool that shadows the pinned one.
pub const LEGACY_COMPOSE_PACKAGE: &str = "docker-compose";
pub const COMPOSE_VERSION: &str = "v2.24.6";

/// Installs system packages and the container runtime, skipping
/// anything already present.
pub struct Installer<'a> {
    shell: &'a dyn Shell,
    layout: &'a Layout,
    lock_backoff: Duration,
    index_fresh: Cell<bool>,
}

impl<'a> Installer<'a> {
    #[must_use]
    pub const fn new(shell: &'a dyn Shell, layout: &'a Layout) -> Self {
        Self {
            shell,
            layout,
            lock_backoff: Duration::from_secs(1),
            index_fresh: Cell::new(false),
        }
    }

    #[must_use]
    pub const fn lock_backoff(mut self, backoff: Duration) -> Self {
        self.lock_backoff = backoff;
        self
    }

    #[must_use]
    pub fn is_installed(&self, package: &str) -> bool {
        self.shell
            .exec("dpkg-query", &["-W", "-f", "${db:Status-Abbrev}", package])
            .is_ok_and(|o| o.success && o.stdout.starts_with("ii"))
    }

    /// Install whichever of `packages` are missing. Returns the names
    /// that were actually installed.
    pub fn ensure(&self, packages: &[&str]) -> ProvisionResult<Vec<String>> {
        let missing: Vec<&str> = packages
            .iter()
            .copied()
            .filter(|p| !self.is_installed(p))
            .collect();
        if missing.is_empty() {
            debug!(?packages, "packages already installed");
            return Ok(Vec::new());
        }

        info!(packages = %missing.join(" "), "installing packages");
        self.wait_for_lock();
        self.refresh_index()?;

        let mut args = vec!["install", "-y", "-q"];
        args.extend(&missing);
        let out = self.apt(&args)?;
        self.wait_for_lock();

        if !out.success {
            return Err(ProvisionError::PackageInstall {
                packages: missing.join(" "),
                diagnostic: out.diagnostic(),
            });
        }
        Ok(missing.iter().map(ToString::to_string).collect())
    }

    /// Block until no other process holds the package-manager lock.
    pub fn wait_for_lock(&self) {
        let locks: Vec<String> = self
            .layout
            .package_locks
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        let mut args = vec!["-s"];
        args.extend(locks.iter().map(String::as_str));

        loop {
            match self.shell.exec("fuser", &args) {
                Ok(out) if out.success => {
                    debug!("package manager busy, waiting");
                    thread::sleep(self.lock_backoff);
                }
                Ok(_) => return,
                Err(e) => {
                    warn!(error = %e, "cannot inspect package lock, continuing");
                    return;
                }
            }
        }
    }

    /// Container runtime from its vendor repository, the pinned
    /// compose tool, and no competing compose package.
    pub fn ensure_runtime(&self) -> ProvisionResult<()> {
        self.register_runtime_source()?;
        self.ensure(RUNTIME_PACKAGES)?;

        if self.is_installed(LEGACY_COMPOSE_PACKAGE) {
            info!("removing distribution compose package");
            self.wait_for_lock();
            let out = self.apt(&["purge", "-y", "-q", LEGACY_COMPOSE_PACKAGE])?;
            self.wait_for_lock();
            if !out.success {
                return Err(ProvisionError::PackageInstall {
                    packages: LEGACY_COMPOSE_PACKAGE.into(),
                    diagnostic: out.diagnostic(),
                });
            }
        }

        self.install_compose_tool()?;

        if !self.shell.command_exists("docker") {
            return Err(ProvisionError::PackageInstall {
                packages: RUNTIME_PACKAGES.join(" "),
                diagnostic: "docker is not on PATH after installation".into(),
            });
        }
        Ok(())
    }

    fn register_runtime_source(&self) -> ProvisionResult<()> {
        let source = self.layout.runtime_source();
        if source.exists() {
            return Ok(());
        }

        info!("registering container runtime repository");
        let key = self.layout.runtime_key();
        fs::create_dir_all(&self.layout.keyrings_dir)?;
        let key_str = key.display().to_string();
        self.shell
            .run("curl", &["-fsSL", &format!("{RUNTIME_REPO}/gpg"), "-o", &key_str])?;

        fs::create_dir_all(&self.layout.apt_sources_dir)?;
        fs::write(
            &source,
            format!(
                "deb [arch=amd64 signed-by={key_str}] {RUNTIME_REPO} {RUNTIME_SUITE} stable\n"
            ),
        )?;

        // New source: the index must be fetched again.
        self.index_fresh.set(false);
        Ok(())
    }

    fn install_compose_tool(&self) -> ProvisionResult<()> {
        let target = &self.layout.compose_bin;
        if is_executable(target) {
            debug!(path = %target.display(), "compose tool present");
            return Ok(());
        }

        info!(version = COMPOSE_VERSION, "installing compose tool");
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let url = format!(
            "https://github.com/docker/compose/releases/download/\
             {COMPOSE_VERSION}/docker-compose-linux-x86_64"
        );
        let target_str = target.display().to_string();
        self.shell.run("curl", &["-fsSL", &url, "-o", &target_str])?;
        make_executable(target)
    }

    fn refresh_index(&self) -> ProvisionResult<()> {
        if self.index_fresh.get() {
            return Ok(());
        }
        info!("refreshing package index");
        let out = self.apt(&["update", "-q"])?;
        if !out.success {
            return Err(ProvisionError::PackageInstall {
                packages: "package index".into(),
                diagnostic: out.diagnostic(),
            });
        }
        self.index_fresh.set(true);
        Ok(())
    }

    fn apt(&self, args: &[&str]) -> ProvisionResult<crate::cmd::CmdOutput> {
        let mut full = vec!["DEBIAN_FRONTEND=noninteractive", "apt-get"];
        full.extend_from_slice(args);
        self.shell.exec("env", &full)
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(unix)]
fn make_executable(path: &Path) -> ProvisionResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> ProvisionResult<()> {
    Ok(())
}
