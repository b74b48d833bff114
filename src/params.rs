use crate::error::{ProvisionError, ProvisionResult};

/// Literal values from the installation docs. Runs using them were
/// copy-pasted without editing.
pub const PLACEHOLDER_HOSTNAME: &str = "bbb.example.com";
pub const PLACEHOLDER_EMAIL: &str = "notice@example.com";

/// Conference server the application should talk to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConferenceServer {
    pub endpoint: String,
    pub secret: String,
}

impl ConferenceServer {
    /// Parse a `host:secret` locator. A bare host is expanded to
    /// the server's default API URL.
    pub fn parse(locator: &str) -> ProvisionResult<Self> {
        let invalid = || {
            ProvisionError::InvalidParameter(format!(
                "conference server must look like host:secret, got '{locator}'"
            ))
        };

        let (host, secret) = locator.rsplit_once(':').ok_or_else(invalid)?;
        if host.is_empty()
            || host.chars().any(char::is_whitespace)
            || secret.is_empty()
            || !secret.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(invalid());
        }

        let endpoint = if host.contains("://") {
            host.to_string()
        } else {
            format!("https://{host}/bigbluebutton/")
        };

        Ok(Self {
            endpoint,
            secret: secret.to_string(),
        })
    }
}

/// Operator-supplied parameters. Only constructed through
/// [`RunParams::new`], so holding one means it has been validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunParams {
    hostname: String,
    email: String,
    server: Option<ConferenceServer>,
}

impl RunParams {
    pub fn new(hostname: &str, email: &str, server: Option<&str>) -> ProvisionResult<Self> {
        if hostname == PLACEHOLDER_HOSTNAME {
            return Err(ProvisionError::InvalidParameter(format!(
                "'{hostname}' is the example hostname from the docs; \
                 use your own"
            )));
        }
        if email == PLACEHOLDER_EMAIL {
            return Err(ProvisionError::InvalidParameter(format!(
                "'{email}' is the example email from the docs; use your own"
            )));
        }
        if !is_valid_hostname(hostname) {
            return Err(ProvisionError::InvalidParameter(format!(
                "'{hostname}' is not a fully qualified hostname"
            )));
        }
        if !is_plausible_email(email) {
            return Err(ProvisionError::InvalidParameter(format!(
                "'{email}' is not an email address"
            )));
        }
        let server = server.map(ConferenceServer::parse).transpose()?;

        Ok(Self {
            hostname: hostname.to_ascii_lowercase(),
            email: email.to_string(),
            server,
        })
    }

    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub const fn server(&self) -> Option<&ConferenceServer> {
        self.server.as_ref()
    }
}

fn is_valid_hostname(name: &str) -> bool {
    let labels: Vec<&str> = name.split('.').collect();
    name.len() <= 253
        && labels.len() >= 2
        && labels.iter().all(|l| {
            !l.is_empty()
                && l.len() <= 63
                && !l.starts_with('-')
                && !l.ends_with('-')
                && l.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

fn is_plausible_email(email: &str) -> bool {
    email
        .split_once('@')
        .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.'))
}
