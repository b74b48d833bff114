use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::cmd::Shell;
use crate::error::ProvisionResult;

/// Hosting platforms whose metadata service can tell us the
/// public address directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cloud {
    Amazon,
    Google,
    Azure,
    DigitalOcean,
}

const METADATA: &str = "http://169.254.169.254";

impl Cloud {
    /// Recognise the platform from the DMI identification files.
    #[must_use]
    pub fn detect(dmi_dir: &Path) -> Option<Self> {
        let read = |name: &str| fs::read_to_string(dmi_dir.join(name)).unwrap_or_default();
        Self::from_markers(
            &read("sys_vendor"),
            &read("bios_version"),
            &read("product_name"),
        )
    }

    #[must_use]
    pub fn from_markers(sys_vendor: &str, bios_version: &str, product_name: &str) -> Option<Self> {
        let vendor = sys_vendor.trim();
        if bios_version.to_ascii_lowercase().contains("amazon") || vendor == "Amazon EC2" {
            Some(Self::Amazon)
        } else if product_name.trim() == "Google Compute Engine" || vendor == "Google" {
            Some(Self::Google)
        } else if vendor == "Microsoft Corporation" {
            Some(Self::Azure)
        } else if vendor == "DigitalOcean" {
            Some(Self::DigitalOcean)
        } else {
            None
        }
    }

    /// Ask the platform's metadata service for the public IPv4
    /// address. `None` when the service is unreachable or the
    /// instance has no public address.
    pub fn public_ip(self, shell: &dyn Shell) -> Option<Ipv4Addr> {
        let answer = match self {
            Self::Amazon => amazon(shell),
            Self::Google => curl(
                shell,
                &[
                    "-H",
                    "Metadata-Flavor: Google",
                    "http://metadata.google.internal/computeMetadata/v1/\
                     instance/network-interfaces/0/access-configs/0/external-ip",
                ],
            ),
            Self::Azure => curl(
                shell,
                &[
                    "-H",
                    "Metadata: true",
                    &format!("{METADATA}/metadata/instance/network?api-version=2021-02-01"),
                ],
            )
            .and_then(|json| match parse_azure_network(&json) {
                Ok(ip) => ip.map(|ip| ip.to_string()),
                Err(e) => {
                    debug!(error = %e, "unreadable Azure metadata");
                    None
                }
            }),
            Self::DigitalOcean => curl(
                shell,
                &[&format!("{METADATA}/metadata/v1/interfaces/public/0/ipv4/address")],
            ),
        };
        answer.and_then(|s| s.trim().parse().ok())
    }
}

fn amazon(shell: &dyn Shell) -> Option<String> {
    let token = curl(
        shell,
        &[
            "-X",
            "PUT",
            "-H",
            "X-aws-ec2-metadata-token-ttl-seconds: 60",
            &format!("{METADATA}/latest/api/token"),
        ],
    )?;
    curl(
        shell,
        &[
            "-H",
            &format!("X-aws-ec2-metadata-token: {}", token.trim()),
            &format!("{METADATA}/latest/meta-data/public-ipv4"),
        ],
    )
}

fn curl(shell: &dyn Shell, args: &[&str]) -> Option<String> {
    let mut full = vec!["-fsS", "--max-time", "3"];
    full.extend_from_slice(args);
    shell
        .exec("curl", &full)
        .ok()
        .filter(|o| o.success)
        .map(|o| o.stdout)
}

#[derive(Debug, Deserialize)]
struct AzureNetwork {
    #[serde(default)]
    interface: Vec<AzureInterface>,
}

#[derive(Debug, Deserialize)]
struct AzureInterface {
    ipv4: AzureIpv4,
}

#[derive(Debug, Deserialize)]
struct AzureIpv4 {
    #[serde(rename = "ipAddress", default)]
    ip_address: Vec<AzureAddress>,
}

#[derive(Debug, Deserialize)]
struct AzureAddress {
    #[serde(rename = "publicIpAddress", default)]
    public_ip_address: String,
}

/// First public address in an Azure instance-metadata network
/// document.
pub fn parse_azure_network(json: &str) -> ProvisionResult<Option<Ipv4Addr>> {
    let network: AzureNetwork = serde_json::from_str(json)?;
    Ok(network
        .interface
        .iter()
        .flat_map(|i| &i.ipv4.ip_address)
        .find_map(|a| a.public_ip_address.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers() {
        assert_eq!(
            Cloud::from_markers("Xen", "4.11.amazon", ""),
            Some(Cloud::Amazon)
        );
        assert_eq!(
            Cloud::from_markers("Google", "Google", "Google Compute Engine\n"),
            Some(Cloud::Google)
        );
        assert_eq!(
            Cloud::from_markers("Microsoft Corporation\n", "", "Virtual Machine"),
            Some(Cloud::Azure)
        );
        assert_eq!(
            Cloud::from_markers("DigitalOcean\n", "20171212", "Droplet"),
            Some(Cloud::DigitalOcean)
        );
        assert_eq!(Cloud::from_markers("QEMU", "1.16", "Standard PC"), None);
    }

    #[test]
    fn azure_document() {
        let json = r#"{"interface":[{"ipv4":{"ipAddress":[
            {"privateIpAddress":"10.0.0.4","publicIpAddress":"20.30.40.50"}
        ],"subnet":[]},"macAddress":"000D3A"}]}"#;

        assert_eq!(
            parse_azure_network(json).unwrap(),
            Some(Ipv4Addr::new(20, 30, 40, 50))
        );
    }

    #[test]
    fn azure_without_public_address() {
        let json = r#"{"interface":[{"ipv4":{"ipAddress":[
            {"privateIpAddress":"10.0.0.4","publicIpAddress":""}
        ]}}]}"#;

        assert_eq!(parse_azure_network(json).unwrap(), None);
    }

    #[test]
    fn azure_garbage_is_an_error() {
        assert!(parse_azure_network("<html>").is_err());
    }
}
