use std::io::{ErrorKind, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::ProvisionResult;
use crate::proxy::ProxyService;
use crate::secret;

/// Port the certificate client needs reachable from outside.
pub const CERTIFICATE_PORT: u16 = 443;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const ACCEPT_TIMEOUT: Duration = Duration::from_secs(2);
const ACCEPT_POLL: Duration = Duration::from_millis(20);

/// Stops the proxy for as long as it lives and restarts it on drop,
/// but only if it was running to begin with.
pub struct ProxyPause<'a> {
    proxy: &'a ProxyService<'a>,
    was_running: bool,
}

impl<'a> ProxyPause<'a> {
    pub fn new(proxy: &'a ProxyService<'a>) -> ProvisionResult<Self> {
        let was_running = proxy.is_active();
        if was_running {
            debug!("pausing proxy for NAT check");
            proxy.stop()?;
        }
        Ok(Self { proxy, was_running })
    }

    #[must_use]
    pub const fn was_running(&self) -> bool {
        self.was_running
    }
}

impl Drop for ProxyPause<'_> {
    fn drop(&mut self) {
        if self.was_running {
            if let Err(e) = self.proxy.start() {
                warn!(error = %e, "failed to restart proxy after NAT check");
            }
        }
    }
}

/// Check whether `external` routes back to this host: listen on
/// `port`, connect to it through the external address, and send a
/// token. Only a connection that arrives on our own listener with
/// that token counts. The proxy is paused only if it holds the port,
/// and is restored however this ends.
pub fn confirm_nat(
    proxy: &ProxyService<'_>,
    external: Ipv4Addr,
    port: u16,
    backoff: Duration,
) -> ProvisionResult<bool> {
    // Declared first so the listener is released before the proxy
    // restarts.
    let mut pause = None;
    let listener = match TcpListener::bind(("0.0.0.0", port)) {
        Ok(listener) => listener,
        Err(e) if e.kind() == ErrorKind::AddrInUse => {
            pause = Some(ProxyPause::new(proxy)?);
            wait_for_port(port, backoff)?
        }
        Err(e) => return Err(e.into()),
    };

    let token = secret::generate_hex(16)?;
    let reachable = loops_back(&listener, SocketAddr::from((external, port)), &token)?;
    drop(listener);
    drop(pause);

    if reachable {
        info!(%external, "external address loops back to this host (NAT)");
    } else {
        info!(%external, "external address is not this host");
    }
    Ok(reachable)
}

fn loops_back(listener: &TcpListener, target: SocketAddr, token: &str) -> ProvisionResult<bool> {
    let Ok(mut stream) = TcpStream::connect_timeout(&target, CONNECT_TIMEOUT) else {
        return Ok(false);
    };
    if stream.write_all(token.as_bytes()).is_err() {
        return Ok(false);
    }

    listener.set_nonblocking(true)?;
    let deadline = Instant::now() + ACCEPT_TIMEOUT;
    while Instant::now() < deadline {
        match listener.accept() {
            Ok((incoming, peer)) => {
                if carries_token(incoming, token) {
                    return Ok(true);
                }
                debug!(%peer, "unrelated connection on NAT check port");
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(false)
}

fn carries_token(mut incoming: TcpStream, token: &str) -> bool {
    let mut received = vec![0u8; token.len()];
    incoming.set_nonblocking(false).is_ok()
        && incoming.set_read_timeout(Some(ACCEPT_TIMEOUT)).is_ok()
        && incoming.read_exact(&mut received).is_ok()
        && received == token.as_bytes()
}

/// Bind `port`, retrying while something else still holds it.
fn wait_for_port(port: u16, backoff: Duration) -> ProvisionResult<TcpListener> {
    loop {
        match TcpListener::bind(("0.0.0.0", port)) {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == ErrorKind::AddrInUse => {
                debug!(port, "port still in use, waiting");
                thread::sleep(backoff);
            }
            Err(e) => return Err(e.into()),
        }
    }
}
