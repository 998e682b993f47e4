//! Nginx site configuration: layout, templated writes and enabling.

mod site;

pub use site::{enable_site, write_config_file, EnableOutcome, SiteConfigurator, SiteLayout};
