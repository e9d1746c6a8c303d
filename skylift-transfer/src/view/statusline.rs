use crate::model::{snapshot::BatchSnapshot, BatchStatus};

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

pub fn lines(snapshot: &BatchSnapshot) -> Vec<String> {
    let mut lines = Vec::new();
    match snapshot.status {
        BatchStatus::Running if snapshot.items.len() > 1 => {
            lines.push(format!("Overall Progress {}%", snapshot.progress));
        }
        BatchStatus::Completed => {
            lines.push(format!("Completed {}%", snapshot.progress));
            if snapshot.has_failures() {
                lines.push("Upload failed. Some files could not be stored.".to_owned());
            }
        }
        BatchStatus::Idle | BatchStatus::Running => {}
    }
    lines
}

pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_owned();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');

    format!("{} {}", trimmed, UNITS[unit])
}
