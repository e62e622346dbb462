//! CSV storage of search results keyed by a run identifier

use crate::error::CacheError;
use crate::search::DetectionResult;

use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory of CSV files, one file per run with one row per detection
///
/// Floats are written in the shortest representation which parses back to the same value, so
/// loaded records are bit-identical to the stored ones.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CsvResultCache {
    dir: PathBuf,
}

impl CsvResultCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for a run
    pub fn path(&self, run_id: &str) -> Result<PathBuf, CacheError> {
        check_run_id(run_id)?;
        Ok(self.dir.join(format!("{run_id}.csv")))
    }

    pub fn contains(&self, run_id: &str) -> Result<bool, CacheError> {
        Ok(self.path(run_id)?.is_file())
    }

    /// Load the record of a run, `None` if there is no record
    pub fn load(&self, run_id: &str) -> Result<Option<Vec<DetectionResult>>, CacheError> {
        let path = self.path(run_id)?;
        if !path.is_file() {
            return Ok(None);
        }
        let mut reader = csv::Reader::from_path(&path)?;
        let detections = reader
            .deserialize()
            .collect::<Result<Vec<DetectionResult>, _>>()?;
        debug!("Read {} detections from {}", detections.len(), path.display());
        Ok(Some(detections))
    }

    /// Store the record of a run, replacing an existing one
    ///
    /// The record is written to a temporary file first, so an interrupted write never leaves a
    /// partial record.
    pub fn store(&self, run_id: &str, detections: &[DetectionResult]) -> Result<(), CacheError> {
        let path = self.path(run_id)?;
        fs::create_dir_all(&self.dir)?;
        let tmp_path = self.dir.join(format!(".{run_id}.csv.tmp"));
        {
            let mut writer = csv::Writer::from_path(&tmp_path)?;
            for detection in detections {
                writer.serialize(detection)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp_path, &path)?;
        debug!("Wrote {} detections to {}", detections.len(), path.display());
        Ok(())
    }

    /// Remove the record of a run, returns `false` if there was no record
    pub fn remove(&self, run_id: &str) -> Result<bool, CacheError> {
        let path = self.path(run_id)?;
        if !path.is_file() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        Ok(true)
    }
}

fn check_run_id(run_id: &str) -> Result<(), CacheError> {
    let valid = !run_id.is_empty()
        && !run_id.starts_with('.')
        && run_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(CacheError::InvalidRunId(run_id.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::{TempDir, tempdir};

    fn temp_cache() -> (TempDir, CsvResultCache) {
        let dir = tempdir().unwrap();
        let cache = CsvResultCache::new(dir.path());
        (dir, cache)
    }

    fn detections() -> Vec<DetectionResult> {
        vec![
            DetectionResult {
                period: 3.000_123_456_789_1,
                epoch: 0.1 + 0.2,
                duration_hours: 2.0 / 3.0,
                depth_ppt: 9.876_543_21,
                sde: 12.3,
                fap: 1.234e-30,
                duty_cycle: 1.0 / 36.0,
                period_uncertainty: 1e-4 / 7.0,
                transit_count: 7,
            },
            DetectionResult {
                period: 1.7,
                epoch: 100.25,
                duration_hours: 1.5,
                depth_ppt: -0.5,
                sde: 7.2,
                fap: 0.01,
                duty_cycle: 0.0368,
                period_uncertainty: 3e-4,
                transit_count: 12,
            },
        ]
    }

    #[test]
    fn round_trip_is_bit_identical() {
        let (_dir, cache) = temp_cache();
        let stored = detections();
        cache.store("run-1", &stored).unwrap();
        let loaded = cache.load("run-1").unwrap().unwrap();
        assert_eq!(stored.len(), loaded.len());
        for (a, b) in stored.iter().zip(loaded.iter()) {
            assert_eq!(a.period.to_bits(), b.period.to_bits());
            assert_eq!(a.epoch.to_bits(), b.epoch.to_bits());
            assert_eq!(a.duration_hours.to_bits(), b.duration_hours.to_bits());
            assert_eq!(a.fap.to_bits(), b.fap.to_bits());
            assert_eq!(a.period_uncertainty.to_bits(), b.period_uncertainty.to_bits());
        }
        assert_eq!(stored, loaded);
    }

    #[test]
    fn missing_record() {
        let (_dir, cache) = temp_cache();
        assert!(cache.load("absent").unwrap().is_none());
        assert!(!cache.contains("absent").unwrap());
        assert!(!cache.remove("absent").unwrap());
    }

    #[test]
    fn empty_record_is_not_missing() {
        let (_dir, cache) = temp_cache();
        cache.store("nothing-found", &[]).unwrap();
        assert_eq!(cache.load("nothing-found").unwrap(), Some(vec![]));
        assert!(cache.remove("nothing-found").unwrap());
        assert!(cache.load("nothing-found").unwrap().is_none());
    }

    #[test]
    fn invalid_run_ids() {
        let (_dir, cache) = temp_cache();
        for run_id in ["", ".hidden", "../escape", "a/b", "white space"] {
            assert!(matches!(
                cache.path(run_id),
                Err(CacheError::InvalidRunId(_))
            ));
        }
        assert!(cache.path("TIC-12345_sector.7").is_ok());
    }
}
