//! session-timeout: show PHP's session settings and optionally set the
//! session lifetime in hours.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use lumo_provision::audit::open_journal;
use lumo_provision::commands::{dispatch, SessionTimeoutCommand};
use lumo_provision::config::Settings;
use lumo_provision::error::ProvisionError;
use lumo_provision::logging::init_logging;
use lumo_provision::php::PhpCli;
use lumo_provision::ui::{
    print_error, print_header, print_step, print_success, render_session_table,
};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Audit PHP session settings and optionally set session.gc_maxlifetime",
    after_help = r#"Examples:
  session-timeout          # audit only
  sudo session-timeout 8   # sessions expire after 8 hours
  sudo session-timeout 0.5 # 30 minutes"#
)]
struct Cli {
    /// New session lifetime in hours (fractions allowed)
    #[arg(allow_hyphen_values = true)]
    hours: Option<String>,

    /// Configuration file
    #[arg(short, long, value_name = "PATH", env = "LUMO_PROVISION_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the audit finished without failures.
fn run(cli: Cli) -> Result<bool, ProvisionError> {
    let settings = Settings::resolve(cli.config.as_deref())?;
    init_logging(&settings.logging, cli.verbose)?;

    let runtime = PhpCli::new(&settings.php.binary, settings.limits.command_timeout());
    let mut journal = open_journal(&settings.journal);

    print_header("PHP session timeout");
    if let Some(hours) = &cli.hours {
        print_step(&format!("Setting session lifetime to {} hours", hours));
    }

    let command = SessionTimeoutCommand::new(cli.hours, &runtime);
    let report = dispatch(&command, journal.as_mut())?;

    if let Some(change) = &report.change {
        print_success(&format!(
            "{} updated, backup at {}",
            change.ini_file.display(),
            change.backup.display()
        ));
    }

    println!("{}", render_session_table(&report));

    for failure in &report.failures {
        print_error(failure);
    }

    Ok(report.is_success())
}
