#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::net::TcpListener;
use std::path::Path;

use roomhost::cmd::{CmdOutput, Shell, format_command};
use roomhost::error::{ProvisionError, ProvisionResult};

/// Scripted shell: answers by command-line prefix and records every
/// command it is asked to run. Unmatched commands succeed silently.
/// `curl ... -o <path>` writes a placeholder to `<path>`.
#[derive(Default)]
pub struct FakeShell {
    rules: Vec<(String, CmdOutput)>,
    missing: Vec<String>,
    log: RefCell<Vec<String>>,
}

impl FakeShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands starting with `prefix` with `stdout`.
    pub fn on(mut self, prefix: &str, stdout: &str) -> Self {
        self.rules.push((prefix.to_string(), CmdOutput::ok(stdout)));
        self
    }

    /// Make commands starting with `prefix` exit non-zero.
    pub fn fail(mut self, prefix: &str, stderr: &str) -> Self {
        self.rules
            .push((prefix.to_string(), CmdOutput::failed(1, stderr)));
        self
    }

    /// Like [`on`](Self::on), but takes precedence over every rule
    /// added so far.
    pub fn first(mut self, prefix: &str, stdout: &str) -> Self {
        self.rules
            .insert(0, (prefix.to_string(), CmdOutput::ok(stdout)));
        self
    }

    /// Pretend `program` is not installed at all.
    pub fn without(mut self, program: &str) -> Self {
        self.missing.push(program.to_string());
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    pub fn ran(&self, prefix: &str) -> bool {
        self.log.borrow().iter().any(|c| c.starts_with(prefix))
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.log.borrow().iter().position(|c| c.starts_with(prefix))
    }

    /// Commands that change the host rather than inspect it.
    pub fn mutations(&self) -> Vec<String> {
        const MUTATING: &[&str] = &[
            "env DEBIAN_FRONTEND",
            "apt-get",
            "systemctl stop",
            "systemctl start",
            "systemctl reload",
            "certbot",
            "docker run",
            "curl -fsSL",
        ];
        self.log
            .borrow()
            .iter()
            .filter(|c| {
                MUTATING.iter().any(|m| c.starts_with(m)) || c.contains("docker-compose -f")
            })
            .cloned()
            .collect()
    }

    fn answer(&self, program: &str, args: &[&str]) -> ProvisionResult<CmdOutput> {
        let line = format_command(program, args);
        self.log.borrow_mut().push(line.clone());

        if self.missing.iter().any(|m| m == program) {
            return Err(ProvisionError::CommandNotFound(program.to_string()));
        }

        if program == "curl" {
            if let Some(i) = args.iter().position(|a| *a == "-o") {
                let path = Path::new(args[i + 1]);
                fs::write(path, "downloaded").expect("fake download");
            }
        }

        Ok(self
            .rules
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map_or_else(|| CmdOutput::ok(""), |(_, out)| out.clone()))
    }
}

impl Shell for FakeShell {
    fn exec(&self, program: &str, args: &[&str]) -> ProvisionResult<CmdOutput> {
        self.answer(program, args)
    }

    fn exec_interactive(&self, program: &str, args: &[&str]) -> ProvisionResult<()> {
        let out = self.answer(program, args)?;
        out.into_result(&format_command(program, args)).map(drop)
    }
}

pub const ENV_TEMPLATE: &str = "\
# Greenlight configuration
SECRET_KEY_BASE=

BIGBLUEBUTTON_ENDPOINT=
BIGBLUEBUTTON_SECRET=

DATABASE_URL=
REDIS_URL=

# SMTP_SERVER=
RELATIVE_URL_ROOT=/
";

pub const COMPOSE_TEMPLATE: &str = "\
services:
  postgres:
    image: postgres:14.6-alpine3.17
    container_name: postgres
    restart: unless-stopped
    volumes:
      - ./data/postgres:/var/lib/postgresql/data
    environment:
      - POSTGRES_USER=postgres
      - POSTGRES_PASSWORD=
  redis:
    image: redis:6.2-alpine3.17
    container_name: redis
    restart: unless-stopped
  app:
    image: bigbluebutton/greenlight:v3
    container_name: greenlight-v3
    env_file: .env
    restart: unless-stopped
    ports:
      - 127.0.0.1:5050:3000
    depends_on:
      - postgres
      - redis
";

pub const OS_RELEASE: &str = "\
PRETTY_NAME=\"Ubuntu 22.04.4 LTS\"
NAME=\"Ubuntu\"
VERSION_ID=\"22.04\"
VERSION=\"22.04.4 LTS (Jammy Jellyfish)\"
ID=ubuntu
ID_LIKE=debian
";

/// A host that passes every check: root, Ubuntu 22.04 amd64, no
/// conflicting software, free ports, `hostname` resolving to the
/// default-route address `ip`.
pub fn healthy_host(hostname: &str, ip: &str) -> FakeShell {
    FakeShell::new()
        .on("id -u", "0\n")
        .on("dpkg --print-architecture", "amd64\n")
        .on(
            "dpkg-query -W -f ${db:Status-Abbrev} ${Package}",
            "ii  adduser\nii  openssh-server\nii  curl\n",
        )
        .on("ss -Htln", "LISTEN 0 128 0.0.0.0:22 0.0.0.0:*\n")
        .fail("which nginx", "")
        .on("which docker", "/usr/bin/docker\n")
        .on(
            "ip -4 route show default",
            "default via 10.0.0.1 dev eth0 proto dhcp metric 100\n",
        )
        .on(
            "ip -4 -o addr show dev eth0",
            &format!("2: eth0    inet {ip}/24 brd 10.0.0.255 scope global eth0\n"),
        )
        .on(&format!("dig +short A {hostname}"), &format!("{ip}\n"))
        .fail("fuser", "")
        .fail("systemctl is-active", "")
        .on("docker run --rm --entrypoint cat bigbluebutton/greenlight:v3 sample.env", ENV_TEMPLATE)
        .on(
            "docker run --rm --entrypoint cat bigbluebutton/greenlight:v3 docker-compose.yml",
            COMPOSE_TEMPLATE,
        )
        .on("docker ps", "")
}

/// Write the files the probe reads into a staged root.
pub fn stage_host(root: &Path) {
    let etc = root.join("etc");
    fs::create_dir_all(&etc).expect("create etc");
    fs::write(etc.join("os-release"), OS_RELEASE).expect("write os-release");
}

/// A TCP port nothing is listening on right now.
pub fn free_port() -> u16 {
    let listener = TcpListener::bind(("0.0.0.0", 0)).expect("bind ephemeral port");
    listener.local_addr().expect("local addr").port()
}
