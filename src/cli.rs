use clap::Parser;

use crate::error::ProvisionResult;
use crate::params::RunParams;

#[derive(Debug, Parser)]
#[command(name = "roomhost")]
#[command(about = "Install or upgrade the conferencing room manager on this host")]
pub struct Cli {
    /// Hostname of this server; must already resolve to it
    #[arg(short = 's', long = "hostname", value_name = "HOSTNAME")]
    pub hostname: String,

    /// Email address for certificate registration
    #[arg(short = 'e', long = "email", value_name = "EMAIL")]
    pub email: String,

    /// Conference server to use instead of the demo server
    #[arg(short = 'b', long = "server", value_name = "HOST:SECRET")]
    pub server: Option<String>,

    /// Log every external command
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Cli {
    /// Validate the flags into run parameters.
    pub fn params(&self) -> ProvisionResult<RunParams> {
        RunParams::new(&self.hostname, &self.email, self.server.as_deref())
    }
}
