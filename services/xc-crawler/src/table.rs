//!
//! src/table.rs  xc-crawler  Oct 19th, 2026
//!
//! Flattens recordings into the fixed csv column set, writes the table
//! to disk and reads download jobs back out of it
//!

use std::{fs, path::{Path, PathBuf}};

use tracing::{debug, info};

use crate::errors::CrawlerError;
use crate::types::{ImageSet, Recording};

pub const FILE_COLUMN: &str = "file";
pub const FILE_NAME_COLUMN: &str = "file-name";

/// Column order of the recording table, stable across runs
pub const COLUMNS: [&str; 43] = [
    "id", "gen", "sp", "ssp", "group", "en", "rec", "cnt", "loc",
    "lat", "lng", "alt", "type", "sex", "stage", "method", "url",
    FILE_COLUMN, FILE_NAME_COLUMN,
    "sono_small", "sono_med", "sono_large", "sono_full",
    "osci_small", "osci_med", "osci_large",
    "lic", "q", "length", "time", "date", "uploaded", "also", "rmk",
    "bird-seen", "animal-seen", "playback-used", "temp", "regnr",
    "auto", "dvc", "mic", "smp",
];

fn cell(v: &Option<String>) -> String {
    v.clone().unwrap_or_default()
}

fn image(set: &Option<ImageSet>, pick: fn(&ImageSet) -> &Option<String>) -> String {
    set.as_ref().map(|s| cell(pick(s))).unwrap_or_default()
}

impl Recording {
    /// Flattened cells in COLUMNS order
    pub fn to_row(&self) -> Vec<String> {
        vec![
            cell(&self.id),
            cell(&self.genus),
            cell(&self.species),
            cell(&self.subspecies),
            cell(&self.group),
            cell(&self.english_name),
            cell(&self.recordist),
            cell(&self.country),
            cell(&self.location),
            cell(&self.lat),
            cell(&self.lng),
            cell(&self.alt),
            cell(&self.sound_type),
            cell(&self.sex),
            cell(&self.stage),
            cell(&self.method),
            cell(&self.url),
            cell(&self.file),
            cell(&self.file_name),
            image(&self.sono, |s| &s.small),
            image(&self.sono, |s| &s.med),
            image(&self.sono, |s| &s.large),
            image(&self.sono, |s| &s.full),
            image(&self.osci, |s| &s.small),
            image(&self.osci, |s| &s.med),
            image(&self.osci, |s| &s.large),
            cell(&self.license),
            cell(&self.quality),
            cell(&self.length),
            cell(&self.time),
            cell(&self.date),
            cell(&self.uploaded),
            self.also.join(", "),
            cell(&self.remarks),
            cell(&self.bird_seen),
            cell(&self.animal_seen),
            cell(&self.playback_used),
            cell(&self.temp),
            cell(&self.regnr),
            cell(&self.auto),
            cell(&self.device),
            cell(&self.mic),
            cell(&self.sample_rate),
        ]
    }
}

/// Directory a file lands in, "" becomes the working directory
fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

///
/// Writes the header plus one row per recording. The table is staged in a
/// temp file next to the target and persisted over it once complete.
///
pub fn write_recordings(recordings: &[Recording], path: impl AsRef<Path>) ->
    Result<PathBuf, CrawlerError> {
    let path = path.as_ref().to_path_buf();
    let dir = parent_dir(&path);
    fs::create_dir_all(&dir)?;

    let temp = tempfile::NamedTempFile::new_in(&dir)?;
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(temp.as_file());

        writer.write_record(COLUMNS)?;
        for recording in recordings {
            writer.write_record(recording.to_row())?;
        }
        writer.flush()?;
    }
    temp.persist(&path)?;

    info!(path = %path.display(), rows = recordings.len(), "table.write");
    Ok(path)
}

/// The (file url, file name) pair of one table row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub file_url: String,
    pub file_name: String,
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize, CrawlerError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| CrawlerError::MissingColumn(name.to_string()))
}

///
/// Reads the table back, only the file and file-name columns are needed.
/// Missing columns or unreadable rows are fatal.
///
pub fn read_download_jobs(path: impl AsRef<Path>) -> Result<Vec<DownloadJob>, CrawlerError> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let url_idx  = column_index(&headers, FILE_COLUMN)?;
    let name_idx = column_index(&headers, FILE_NAME_COLUMN)?;

    let mut jobs = Vec::new();
    for record in reader.records() {
        let record = record?;
        jobs.push(DownloadJob {
            file_url: record.get(url_idx).unwrap_or_default().to_string(),
            file_name: record.get(name_idx).unwrap_or_default().to_string(),
        });
    }

    debug!(path = %path.display(), jobs = jobs.len(), "table.read");
    Ok(jobs)
}
