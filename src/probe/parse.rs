//! Parsers for the text the inspection utilities print.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;

/// `(ID, VERSION_ID)` from `/etc/os-release`.
#[must_use]
pub fn parse_os_release(content: &str) -> (String, String) {
    let mut id = String::new();
    let mut version = String::new();
    for line in content.lines() {
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"').to_string();
            match key.trim() {
                "ID" => id = value,
                "VERSION_ID" => version = value,
                _ => {}
            }
        }
    }
    (id, version)
}

/// Device of the default route from `ip -4 route show default`.
///
/// `default via 10.0.0.1 dev eth0 proto dhcp src 10.0.0.5 metric 100`
#[must_use]
pub fn parse_default_device(output: &str) -> Option<String> {
    output
        .lines()
        .filter(|l| l.trim_start().starts_with("default"))
        .find_map(|l| word_after(l, "dev"))
        .map(ToString::to_string)
}

/// First global IPv4 address from `ip -4 -o addr show dev <dev>`.
///
/// `2: eth0    inet 10.0.0.5/24 brd 10.0.0.255 scope global eth0`
#[must_use]
pub fn parse_inet_addr(output: &str) -> Option<Ipv4Addr> {
    output
        .lines()
        .filter(|l| !l.contains("scope host"))
        .filter_map(|l| word_after(l, "inet"))
        .find_map(|cidr| cidr.split('/').next()?.parse().ok())
}

/// First non-loopback IPv4 address from `hostname -I`.
#[must_use]
pub fn parse_address_list(output: &str) -> Option<Ipv4Addr> {
    output
        .split_whitespace()
        .filter_map(|w| w.parse::<Ipv4Addr>().ok())
        .find(|ip| !ip.is_loopback())
}

/// IPv4 addresses at the start of each line, in order, without
/// duplicates. Handles `dig +short` (which may interleave CNAME
/// targets) and `getent ahostsv4`.
#[must_use]
pub fn parse_ipv4_lines(output: &str) -> Vec<Ipv4Addr> {
    let mut seen = Vec::new();
    for ip in output
        .lines()
        .filter_map(|l| l.split_whitespace().next()?.parse::<Ipv4Addr>().ok())
    {
        if !seen.contains(&ip) {
            seen.push(ip);
        }
    }
    seen
}

/// Local ports in LISTEN state from `ss -Htln`.
///
/// `LISTEN 0 511 0.0.0.0:80 0.0.0.0:*`
#[must_use]
pub fn parse_listening_ports(output: &str) -> BTreeSet<u16> {
    output
        .lines()
        .filter_map(|l| {
            let cols: Vec<&str> = l.split_whitespace().collect();
            let local = if cols.first() == Some(&"LISTEN") {
                cols.get(3)?
            } else {
                cols.get(2)?
            };
            local.rsplit_once(':')?.1.parse().ok()
        })
        .collect()
}

/// Installed package names from
/// `dpkg-query -W -f '${db:Status-Abbrev} ${Package}\n'`.
#[must_use]
pub fn parse_installed_packages(output: &str) -> BTreeSet<String> {
    output
        .lines()
        .filter_map(|l| {
            let mut words = l.split_whitespace();
            let status = words.next()?;
            let name = words.next()?;
            status.starts_with("ii").then(|| name.to_string())
        })
        .collect()
}

fn word_after<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let mut words = line.split_whitespace();
    words.by_ref().find(|w| *w == marker)?;
    words.next()
}
