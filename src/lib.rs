//! Idempotent installer for a self-hosted conferencing room
//! manager.
//!
//! Roomhost takes a fresh server from nothing to a running
//! application stack: it checks the host, installs the container
//! runtime, writes the reverse-proxy site, and brings the compose
//! stack up. Running it again on the same host pulls fresh images
//! and restarts the stack, so the installer doubles as the upgrade
//! path.
//!
//! # Overview
//!
//! A run is a [`Pipeline`] over an [`App`] (what to install) and a
//! [`Layout`] (where things live on the host). Everything the
//! pipeline does to the outside world goes through a
//! [`Shell`](cmd::Shell); [`System`](cmd::System) is the real one.
//!
//! 1. **Preflight** - the [`Probe`](probe::Probe) gathers
//!    [`HostFacts`](probe::HostFacts) and the [`Guard`](guard::Guard)
//!    rejects the run on the first violated precondition
//! 2. **Install** - missing packages, the container runtime, and the
//!    pinned compose tool
//! 3. **Configure** - env and compose files from the image templates,
//!    then placeholder patches that never clobber existing values
//! 4. **Proxy** - site file, fragment, certificate
//! 5. **Stack** - pull, down if running, up
//!
//! # Example
//!
//! ```rust,no_run
//! use roomhost::{App, Layout, Pipeline, RunParams, System};
//!
//! fn main() -> anyhow::Result<()> {
//!     let params = RunParams::new(
//!         "rooms.example.org",
//!         "ops@example.org",
//!         None,
//!     )?;
//!
//!     let outcome = Pipeline::new(App::new(), Layout::new())
//!         .run(&System, &params)?;
//!
//!     println!("ready at {}", outcome.url);
//!     Ok(())
//! }
//! ```

#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod app;
pub mod cli;
pub mod cmd;
pub mod compose;
pub mod configure;
pub mod envfile;
pub mod error;
pub mod guard;
pub mod install;
pub mod layout;
pub mod logging;
pub mod params;
pub mod pipeline;
pub mod probe;
pub mod proxy;
pub mod secret;
pub mod stack;

pub use app::App;
pub use cmd::{Shell, System};
pub use error::{ProvisionError, ProvisionResult};
pub use layout::Layout;
pub use params::{ConferenceServer, RunParams};
pub use pipeline::{Outcome, Pipeline};
