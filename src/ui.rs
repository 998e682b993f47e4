//! Terminal output: status lines, progress reporting and result tables.

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use console::{style, Emoji};

use crate::commands::{ProvisionOutcome, SessionReport, Verification};
use crate::php::GC_MAXLIFETIME;

pub struct Symbols;

impl Symbols {
    pub const SUCCESS: Emoji<'static, 'static> = Emoji("✔", "+");
    pub const ERROR: Emoji<'static, 'static> = Emoji("✖", "x");
    pub const WARNING: Emoji<'static, 'static> = Emoji("⚠", "!");
    pub const INFO: Emoji<'static, 'static> = Emoji("ℹ", "i");
    pub const ARROW: Emoji<'static, 'static> = Emoji("➜", ">");
    pub const STEP: Emoji<'static, 'static> = Emoji("⚡", "*");
}

pub fn print_header(title: &str) {
    println!();
    println!("{} {}", Symbols::STEP, style(title).bold().underlined());
    println!();
}

pub fn print_success(message: &str) {
    println!("  {} {}", style(Symbols::SUCCESS).green(), message);
}

/// Errors go to stderr so they survive stdout redirection.
pub fn print_error(message: &str) {
    eprintln!("  {} {}", style(Symbols::ERROR).red(), message);
}

pub fn print_warning(message: &str) {
    println!("  {} {}", style(Symbols::WARNING).yellow(), message);
}

pub fn print_info(message: &str) {
    println!("  {} {}", style(Symbols::INFO).blue(), message);
}

pub fn print_step(message: &str) {
    println!("  {} {}", style(Symbols::ARROW).cyan(), message);
}

pub fn log_detail(key: &str, value: &str) {
    println!("    {}: {}", style(key).dim(), value);
}

/// Progress sink for long-running procedures.
pub trait Reporter {
    fn step(&self, message: &str);
    fn success(&self, message: &str);
    fn warning(&self, message: &str);
}

/// Prints progress to the terminal.
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn step(&self, message: &str) {
        print_step(message);
    }

    fn success(&self, message: &str) {
        print_success(message);
    }

    fn warning(&self, message: &str) {
        print_warning(message);
    }
}

/// Closing summary of a provisioning run.
pub fn print_provision_summary(outcome: &ProvisionOutcome) {
    print_header(&format!("{} is provisioned", outcome.domain));
    log_detail("PHP-FPM", &outcome.fpm.to_string());
    log_detail("Web root", &outcome.web_root.display().to_string());
    log_detail("Nginx config", &outcome.config_path.display().to_string());
    log_detail("Certificate", &outcome.ssl_certificate.display().to_string());
    match &outcome.verification {
        Verification::Reachable { http_status } => {
            log_detail("HTTPS check", &format!("HTTP {}", http_status))
        }
        Verification::UnexpectedStatus { http_status } => {
            log_detail("HTTPS check", &format!("HTTP {} (server error)", http_status))
        }
        Verification::Failed { .. } => log_detail("HTTPS check", "not reachable yet"),
    }
    println!();
}

fn format_hours(seconds: u64) -> String {
    let hours = seconds as f64 / 3600.0;
    if hours.fract() == 0.0 {
        format!("{:.0} h", hours)
    } else {
        format!("{:.2} h", hours)
    }
}

fn value_cell(value: Option<&str>) -> Cell {
    match value {
        Some(v) if !v.is_empty() => Cell::new(v),
        Some(_) => Cell::new("(empty)").fg(Color::DarkGrey),
        None => Cell::new("(not set)").fg(Color::DarkGrey),
    }
}

/// Table summarizing the session configuration after an audit.
pub fn render_session_table(report: &SessionReport) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Setting").add_attribute(Attribute::Bold),
        Cell::new("Value").add_attribute(Attribute::Bold),
    ]);

    let ini = report.ini_file.as_ref().map(|p| p.display().to_string());
    table.add_row(vec![Cell::new("Loaded ini file"), value_cell(ini.as_deref())]);

    for directive in &report.directives {
        let value = match (directive.key.as_str(), report.gc_maxlifetime_seconds()) {
            (GC_MAXLIFETIME, Some(seconds)) => {
                Cell::new(format!("{} s ({})", seconds, format_hours(seconds)))
            }
            _ => value_cell(directive.value.as_deref()),
        };
        table.add_row(vec![Cell::new(&directive.key), value]);
    }

    if let Some(change) = &report.change {
        table.add_row(vec![
            Cell::new("Backup"),
            Cell::new(change.backup.display().to_string()),
        ]);
    }

    let status = if report.is_success() {
        Cell::new("OK").fg(Color::Green).add_attribute(Attribute::Bold)
    } else {
        Cell::new("FAILED").fg(Color::Red).add_attribute(Attribute::Bold)
    };
    table.add_row(vec![Cell::new("Status"), status]);

    table
}
