//! provision-site: issue a Let's Encrypt certificate and configure Nginx for
//! a PHP site.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use lumo_provision::audit::open_journal;
use lumo_provision::commands::{dispatch, ProvisionSiteCommand};
use lumo_provision::config::Settings;
use lumo_provision::error::{ProvisionError, ValidationErrorKind};
use lumo_provision::logging::init_logging;
use lumo_provision::nginx::SiteConfigurator;
use lumo_provision::php::PhpCli;
use lumo_provision::services::{require_root, SystemHost};
use lumo_provision::templates::TemplateEngine;
use lumo_provision::ui::{
    print_error, print_header, print_info, print_provision_summary, ConsoleReporter,
};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Issue a Let's Encrypt certificate and serve a PHP site over HTTPS with Nginx",
    after_help = r#"Examples:
  sudo provision-site example.com
  sudo provision-site -c /etc/lumo/provision.toml shop.example.org"#
)]
struct Cli {
    /// Domain to provision, e.g. example.com
    domain: Option<String>,

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
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), ProvisionError> {
    require_root()?;

    let Some(domain) = cli.domain else {
        print_info("Usage: provision-site <domain>");
        return Err(ProvisionError::Validation {
            kind: ValidationErrorKind::MissingParameter {
                param: "domain".to_string(),
            },
        });
    };

    let settings = Settings::resolve(cli.config.as_deref())?;
    init_logging(&settings.logging, cli.verbose)?;

    let engine = TemplateEngine::load(settings.paths.templates_dir.as_deref())?;
    let configurator = SiteConfigurator::new(engine);
    let runtime = PhpCli::new(&settings.php.binary, settings.limits.command_timeout());
    let host = SystemHost::new(&settings);
    let mut journal = open_journal(&settings.journal);

    print_header(&format!("Provisioning {}", domain));

    let command = ProvisionSiteCommand::new(
        domain,
        &settings,
        &configurator,
        &runtime,
        &host,
        &ConsoleReporter,
    );
    let outcome = dispatch(&command, journal.as_mut())?;

    print_provision_summary(&outcome);
    Ok(())
}
