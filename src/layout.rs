use std::path::{Path, PathBuf};

/// Where things live on the host. Defaults match the supported
/// platform; [`Layout::rooted`] relocates every path under a
/// directory so a run can be staged somewhere harmless.
#[derive(Debug, Clone)]
pub struct Layout {
    /// Application data directory. Its existence marks an upgrade.
    pub data_dir: PathBuf,
    pub env_file_name: String,
    pub compose_file_name: String,
    pub os_release: PathBuf,
    /// DMI identification files used to recognise cloud platforms.
    pub dmi_dir: PathBuf,
    pub sites_available: PathBuf,
    pub sites_enabled: PathBuf,
    /// Name of the site file, fragment, and access log.
    pub proxy_site: String,
    /// Per-application proxy fragments included by the site.
    pub fragment_dir: PathBuf,
    pub proxy_log_dir: PathBuf,
    pub certificate_dir: PathBuf,
    pub apt_sources_dir: PathBuf,
    pub keyrings_dir: PathBuf,
    pub package_locks: Vec<PathBuf>,
    pub compose_bin: PathBuf,
}

impl Layout {
    #[must_use]
    pub fn new() -> Self {
        Self {
            data_dir: PathBuf::from("/root/greenlight-v3"),
            env_file_name: ".env".to_string(),
            compose_file_name: "docker-compose.yml".to_string(),
            os_release: PathBuf::from("/etc/os-release"),
            dmi_dir: PathBuf::from("/sys/devices/virtual/dmi/id"),
            sites_available: PathBuf::from("/etc/nginx/sites-available"),
            sites_enabled: PathBuf::from("/etc/nginx/sites-enabled"),
            proxy_site: "greenlight".to_string(),
            fragment_dir: PathBuf::from("/etc/greenlight/nginx"),
            proxy_log_dir: PathBuf::from("/var/log/nginx"),
            certificate_dir: PathBuf::from("/etc/letsencrypt/live"),
            apt_sources_dir: PathBuf::from("/etc/apt/sources.list.d"),
            keyrings_dir: PathBuf::from("/etc/apt/keyrings"),
            package_locks: vec![
                PathBuf::from("/var/lib/dpkg/lock-frontend"),
                PathBuf::from("/var/lib/dpkg/lock"),
            ],
            compose_bin: PathBuf::from("/usr/local/bin/docker-compose"),
        }
    }

    /// Same layout with every absolute path re-anchored under `root`.
    #[must_use]
    pub fn rooted(root: &Path) -> Self {
        let base = Self::new();
        let under = |p: &Path| root.join(p.strip_prefix("/").unwrap_or(p));
        Self {
            data_dir: under(&base.data_dir),
            os_release: under(&base.os_release),
            dmi_dir: under(&base.dmi_dir),
            sites_available: under(&base.sites_available),
            sites_enabled: under(&base.sites_enabled),
            fragment_dir: under(&base.fragment_dir),
            proxy_log_dir: under(&base.proxy_log_dir),
            certificate_dir: under(&base.certificate_dir),
            apt_sources_dir: under(&base.apt_sources_dir),
            keyrings_dir: under(&base.keyrings_dir),
            package_locks: base.package_locks.iter().map(|p| under(p)).collect(),
            compose_bin: under(&base.compose_bin),
            ..base
        }
    }

    #[must_use]
    pub fn data_dir(mut self, dir: &Path) -> Self {
        self.data_dir = dir.to_path_buf();
        self
    }

    #[must_use]
    pub fn compose_bin(mut self, path: &Path) -> Self {
        self.compose_bin = path.to_path_buf();
        self
    }

    #[must_use]
    pub fn env_path(&self) -> PathBuf {
        self.data_dir.join(&self.env_file_name)
    }

    #[must_use]
    pub fn compose_path(&self) -> PathBuf {
        self.data_dir.join(&self.compose_file_name)
    }

    /// True when the data directory is absent, i.e. a fresh install.
    #[must_use]
    pub fn is_fresh_install(&self) -> bool {
        !self.data_dir.is_dir()
    }

    #[must_use]
    pub fn runtime_source(&self) -> PathBuf {
        self.apt_sources_dir.join("docker.list")
    }

    #[must_use]
    pub fn runtime_key(&self) -> PathBuf {
        self.keyrings_dir.join("docker.asc")
    }

    #[must_use]
    pub fn site_file(&self) -> PathBuf {
        self.sites_available.join(&self.proxy_site)
    }

    #[must_use]
    pub fn site_link(&self) -> PathBuf {
        self.sites_enabled.join(&self.proxy_site)
    }

    #[must_use]
    pub fn fragment_file(&self) -> PathBuf {
        self.fragment_dir.join(format!("{}.nginx", self.proxy_site))
    }

    #[must_use]
    pub fn access_log(&self) -> PathBuf {
        self.proxy_log_dir
            .join(format!("{}.access.log", self.proxy_site))
    }

    #[must_use]
    pub fn certificate(&self, hostname: &str) -> PathBuf {
        self.certificate_dir.join(hostname).join("fullchain.pem")
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let layout = Layout::new();

        assert_eq!(layout.env_path(), Path::new("/root/greenlight-v3/.env"));
        assert_eq!(
            layout.compose_path(),
            Path::new("/root/greenlight-v3/docker-compose.yml")
        );
        assert_eq!(
            layout.runtime_source(),
            Path::new("/etc/apt/sources.list.d/docker.list")
        );
        assert_eq!(
            layout.site_file(),
            Path::new("/etc/nginx/sites-available/greenlight")
        );
        assert_eq!(
            layout.fragment_file(),
            Path::new("/etc/greenlight/nginx/greenlight.nginx")
        );
        assert_eq!(
            layout.certificate("a.example.com"),
            Path::new("/etc/letsencrypt/live/a.example.com/fullchain.pem")
        );
    }

    #[test]
    fn rooted_relocates_everything() {
        let layout = Layout::rooted(Path::new("/tmp/stage"));

        assert_eq!(layout.data_dir, Path::new("/tmp/stage/root/greenlight-v3"));
        assert_eq!(layout.os_release, Path::new("/tmp/stage/etc/os-release"));
        assert_eq!(
            layout.compose_bin,
            Path::new("/tmp/stage/usr/local/bin/docker-compose")
        );
        assert!(
            layout
                .package_locks
                .iter()
                .all(|p| p.starts_with("/tmp/stage"))
        );
        assert_eq!(layout.env_file_name, ".env");
    }

    #[test]
    fn fresh_install_when_data_dir_missing() {
        let layout = Layout::new().data_dir(Path::new("/nonexistent/roomhost-test"));
        assert!(layout.is_fresh_install());
    }
}
