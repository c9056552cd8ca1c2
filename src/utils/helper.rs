use chrono::{Local, NaiveDate, NaiveDateTime};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Date layout used in export file names
pub const FILE_DATE_FORMAT: &str = "%m-%d-%Y";

/// Current local wall-clock time
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Clock for a run. A re-run for an earlier date keeps today's time of day
/// so intraday weighting still has a session clock.
pub fn run_clock(as_of: Option<NaiveDate>) -> NaiveDateTime {
    let now = local_now();
    match as_of {
        Some(date) => date.and_time(now.time()),
        None => now,
    }
}

pub fn file_date_label(date: NaiveDate) -> String {
    date.format(FILE_DATE_FORMAT).to_string()
}

/// Generate a new run ID
pub fn generate_run_id() -> Uuid {
    Uuid::new_v4()
}

pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
