use std::{path::PathBuf, time::Duration};

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug)]
pub struct Settings {
    pub batch: BatchSettings,
    pub destination_folder: String,
    pub endpoint: String,
    pub flat: bool,
    pub sources: Vec<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            batch: BatchSettings::default(),
            destination_folder: String::new(),
            endpoint: "http://localhost:8080".to_owned(),
            flat: false,
            sources: Vec::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct BatchSettings {
    pub fallback_content_type: String,
    pub notify_delay: Duration,
    pub settle_delay: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            fallback_content_type: DEFAULT_CONTENT_TYPE.to_owned(),
            notify_delay: Duration::from_millis(1500),
            settle_delay: Duration::from_millis(500),
        }
    }
}
