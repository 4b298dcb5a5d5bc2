pub mod settings;

pub use settings::Settings;

#[cfg(feature = "cli")]
pub use cli::CliConfig;

#[cfg(feature = "cli")]
mod cli {
    use crate::config::settings::redact;
    use crate::domain::ports::ConfigProvider;
    use crate::utils::error::Result;
    use crate::utils::validation::{self, Validate};
    use clap::Parser;
    use serde::{Deserialize, Serialize};
    use std::path::Path;

    #[derive(Clone, Serialize, Deserialize, Parser)]
    #[command(name = "outpatient-etl")]
    #[command(about = "Geocode hospital outpatient-service records and index them for search")]
    pub struct CliConfig {
        /// CSV file to ingest (only one file is read)
        #[arg(long)]
        pub files: String,

        /// Number of rows to attempt after the header
        #[arg(long)]
        pub records: usize,

        #[arg(long)]
        pub search_hostname: String,

        #[arg(long)]
        pub search_port: String,

        /// Optional TOML settings file for the geocoder and search index
        #[arg(long)]
        pub config: Option<String>,

        /// API key for the geocoding service (overrides the settings file)
        #[arg(long)]
        pub geocoder_api_key: Option<String>,

        #[arg(long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Emit log lines as JSON")]
        pub json_logs: bool,
    }

    impl std::fmt::Debug for CliConfig {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("CliConfig")
                .field("files", &self.files)
                .field("records", &self.records)
                .field("search_hostname", &self.search_hostname)
                .field("search_port", &self.search_port)
                .field("config", &self.config)
                .field("geocoder_api_key", &redact(&self.geocoder_api_key))
                .field("verbose", &self.verbose)
                .field("json_logs", &self.json_logs)
                .finish()
        }
    }

    impl ConfigProvider for CliConfig {
        fn input_path(&self) -> &Path {
            Path::new(&self.files)
        }

        fn records(&self) -> usize {
            self.records
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validation::validate_path("files", &self.files)?;
            validation::validate_positive_number("records", self.records, 1)?;
            validation::validate_required_string("search-hostname", &self.search_hostname)?;
            validation::validate_port("search-port", &self.search_port)?;
            if let Some(path) = &self.config {
                validation::validate_path("config", path)?;
            }
            Ok(())
        }
    }

}
