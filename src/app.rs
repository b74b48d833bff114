/// Describes the application being installed: image, naming
/// convention, backing services, and the demonstration server
/// used when no conference server is supplied.
///
/// # Example
///
/// ```
/// use roomhost::App;
///
/// let app = App::new().image("bigbluebutton/greenlight:v3.1");
///
/// assert_eq!(app.image, "bigbluebutton/greenlight:v3.1");
/// assert_eq!(app.port, 5050);
/// ```
#[derive(Debug, Clone)]
pub struct App {
    /// Container naming convention, also used for the proxy site.
    pub name: String,
    pub image: String,
    /// Port the application container publishes on localhost.
    pub port: u16,
    /// Path of the env template inside the image.
    pub env_template: String,
    /// Path of the compose template inside the image.
    pub compose_template: String,
    pub database_service: String,
    pub database_name: String,
    pub cache_service: String,
    pub demo_endpoint: String,
    pub demo_secret: String,
    /// Packages the host needs besides the container runtime.
    pub base_packages: Vec<String>,
}

impl App {
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "greenlight-v3".to_string(),
            image: "bigbluebutton/greenlight:v3".to_string(),
            port: 5050,
            env_template: "sample.env".to_string(),
            compose_template: "docker-compose.yml".to_string(),
            database_service: "postgres".to_string(),
            database_name: "greenlight-v3-production".to_string(),
            cache_service: "redis".to_string(),
            demo_endpoint: "https://test-install.blindsidenetworks.com/bigbluebutton/"
                .to_string(),
            demo_secret: "8cd8ef52e8e101574e400365b55e11a6".to_string(),
            base_packages: [
                "curl",
                "gnupg",
                "ca-certificates",
                "nginx",
                "certbot",
                "python3-certbot-nginx",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
        }
    }

    #[must_use]
    pub fn image(mut self, image: &str) -> Self {
        self.image = image.to_string();
        self
    }

    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn demo_server(mut self, endpoint: &str, secret: &str) -> Self {
        self.demo_endpoint = endpoint.to_string();
        self.demo_secret = secret.to_string();
        self
    }

    /// `postgres://` URL the application uses to reach its database.
    #[must_use]
    pub fn database_url(&self, password: &str) -> String {
        format!(
            "postgres://postgres:{password}@{}:5432/{}",
            self.database_service, self.database_name
        )
    }

    #[must_use]
    pub fn cache_url(&self) -> String {
        format!("redis://{}:6379", self.cache_service)
    }

    /// Ports that must be free before a fresh install.
    #[must_use]
    pub fn required_ports(&self) -> Vec<u16> {
        vec![80, 443, self.port]
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let app = App::new();

        assert_eq!(app.name, "greenlight-v3");
        assert_eq!(app.image, "bigbluebutton/greenlight:v3");
        assert_eq!(app.port, 5050);
        assert_eq!(app.required_ports(), vec![80, 443, 5050]);
        assert!(app.base_packages.contains(&"nginx".to_string()));
    }

    #[test]
    fn connection_urls() {
        let app = App::new();

        assert_eq!(
            app.database_url("pw"),
            "postgres://postgres:pw@postgres:5432/greenlight-v3-production"
        );
        assert_eq!(app.cache_url(), "redis://redis:6379");
    }

    #[test]
    fn builder_chain() {
        let app = App::new()
            .name("rooms")
            .image("example/rooms:1")
            .port(6060)
            .demo_server("https://demo.test/bbb/", "abc");

        assert_eq!(app.name, "rooms");
        assert_eq!(app.image, "example/rooms:1");
        assert_eq!(app.required_ports(), vec![80, 443, 6060]);
        assert_eq!(app.demo_endpoint, "https://demo.test/bbb/");
        assert_eq!(app.demo_secret, "abc");
    }
}
