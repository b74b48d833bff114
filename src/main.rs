use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use roomhost::cli::Cli;
use roomhost::{App, Layout, Outcome, Pipeline, System, logging};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // Help and version go to stdout and are not failures.
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    logging::init(cli.verbose);

    match run(&cli) {
        Ok(outcome) => {
            report(&outcome);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<Outcome> {
    let params = cli.params()?;
    Pipeline::new(App::new(), Layout::new())
        .run(&System, &params)
        .context("installation aborted; fix the problem and run again")
}

fn report(outcome: &Outcome) {
    eprintln!();
    eprintln!("========================================");
    if outcome.fresh_install {
        eprintln!("Installation complete!");
    } else {
        eprintln!("Upgrade complete!");
    }
    eprintln!("========================================");
    eprintln!();
    eprintln!("URL: {}", outcome.url);
    eprintln!("Data: {}", outcome.data_dir.display());
    eprintln!("Services: {}", outcome.services.join(", "));
    if outcome.facts.behind_nat {
        eprintln!("Note: host is behind NAT");
    }
    eprintln!();
}
