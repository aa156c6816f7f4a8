use partd_core::config::load_config;
use partd_core::{ExtractError, ExtractionConfig};
use std::path::Path;

use crate::output;

pub fn run(file: Option<&Path>) -> Result<(), ExtractError> {
    let config = match file {
        Some(path) => {
            let config = load_config(path)?;
            eprintln!("{} is valid", path.display());
            config
        }
        None => ExtractionConfig::default(),
    };
    output::json::print(&config)
}
