use clap::Parser;

use roomhost::cli::Cli;
use roomhost::error::ProvisionError;

#[test]
fn short_flags() {
    let cli = Cli::try_parse_from([
        "roomhost",
        "-s",
        "Rooms.Example.org",
        "-e",
        "ops@example.org",
        "-b",
        "conf.example.net:Abc123",
        "-v",
    ])
    .unwrap();

    assert!(cli.verbose);
    let params = cli.params().unwrap();
    assert_eq!(params.hostname(), "rooms.example.org");
    assert_eq!(params.email(), "ops@example.org");
    assert_eq!(
        params.server().map(|s| s.endpoint.as_str()),
        Some("https://conf.example.net/bigbluebutton/")
    );
}

#[test]
fn long_flags_without_server() {
    let cli = Cli::try_parse_from([
        "roomhost",
        "--hostname",
        "rooms.example.org",
        "--email",
        "ops@example.org",
    ])
    .unwrap();

    assert!(!cli.verbose);
    assert!(cli.params().unwrap().server().is_none());
}

#[test]
fn hostname_and_email_are_required() {
    assert!(Cli::try_parse_from(["roomhost", "-e", "ops@example.org"]).is_err());
    assert!(Cli::try_parse_from(["roomhost", "-s", "rooms.example.org"]).is_err());
}

#[test]
fn help_is_not_an_error_exit() {
    let err = Cli::try_parse_from(["roomhost", "-h"]).unwrap_err();
    assert!(!err.use_stderr());
}

#[test]
fn placeholder_hostname_rejected_at_parse_time() {
    let cli = Cli::try_parse_from([
        "roomhost",
        "-s",
        "bbb.example.com",
        "-e",
        "ops@example.org",
    ])
    .unwrap();

    assert!(matches!(
        cli.params(),
        Err(ProvisionError::InvalidParameter(_))
    ));
}
