mod support;

use std::cell::RefCell;
use std::net::{Ipv4Addr, TcpListener};
use std::time::Duration;

use roomhost::cmd::{CmdOutput, Shell, format_command};
use roomhost::error::ProvisionResult;
use roomhost::probe::nat::confirm_nat;
use roomhost::proxy::ProxyService;
use support::FakeShell;

/// Documentation range, never routed back to us.
const ELSEWHERE: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 1);

/// A proxy unit that really holds a port while it is active and
/// releases it when stopped.
struct HoldingProxy {
    socket: RefCell<Option<TcpListener>>,
    log: RefCell<Vec<String>>,
}

impl HoldingProxy {
    fn on_ephemeral_port() -> (Self, u16) {
        let socket = TcpListener::bind(("0.0.0.0", 0)).unwrap();
        let port = socket.local_addr().unwrap().port();
        let proxy = Self {
            socket: RefCell::new(Some(socket)),
            log: RefCell::default(),
        };
        (proxy, port)
    }

    fn ran(&self, line: &str) -> bool {
        self.log.borrow().iter().any(|c| c == line)
    }
}

impl Shell for HoldingProxy {
    fn exec(&self, program: &str, args: &[&str]) -> ProvisionResult<CmdOutput> {
        let line = format_command(program, args);
        self.log.borrow_mut().push(line.clone());
        Ok(match line.as_str() {
            "systemctl is-active --quiet nginx" if self.socket.borrow().is_none() => {
                CmdOutput::failed(3, "")
            }
            "systemctl stop nginx" => {
                self.socket.borrow_mut().take();
                CmdOutput::ok("")
            }
            _ => CmdOutput::ok(""),
        })
    }

    fn exec_interactive(&self, _program: &str, _args: &[&str]) -> ProvisionResult<()> {
        Ok(())
    }
}

#[test]
fn own_listener_reached_through_address() {
    let (shell, port) = HoldingProxy::on_ephemeral_port();
    let proxy = ProxyService::new(&shell);

    let behind_nat = confirm_nat(&proxy, Ipv4Addr::LOCALHOST, port, Duration::ZERO).unwrap();

    assert!(behind_nat);
    assert!(shell.ran("systemctl stop nginx"));
    assert!(shell.ran("systemctl start nginx"));
}

#[test]
fn unreachable_address_is_not_nat() {
    let (shell, port) = HoldingProxy::on_ephemeral_port();
    let proxy = ProxyService::new(&shell);

    let behind_nat = confirm_nat(&proxy, ELSEWHERE, port, Duration::ZERO).unwrap();

    assert!(!behind_nat);
    assert!(shell.ran("systemctl stop nginx"));
    assert!(shell.ran("systemctl start nginx"));
}

#[test]
fn free_port_leaves_proxy_alone() {
    let shell = FakeShell::new().on("systemctl is-active", "");
    let proxy = ProxyService::new(&shell);

    let behind_nat =
        confirm_nat(&proxy, Ipv4Addr::LOCALHOST, support::free_port(), Duration::ZERO).unwrap();

    assert!(behind_nat);
    assert!(!shell.ran("systemctl"), "{:?}", shell.commands());
}

#[test]
fn unreachable_address_on_free_port_changes_nothing() {
    let shell = FakeShell::new().on("systemctl is-active", "");
    let proxy = ProxyService::new(&shell);

    let behind_nat = confirm_nat(&proxy, ELSEWHERE, support::free_port(), Duration::ZERO).unwrap();

    assert!(!behind_nat);
    assert!(shell.mutations().is_empty());
}
