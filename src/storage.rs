use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::compass::CalibrationOffsets;
use crate::config::TriangulationConfig;
use crate::error::{TrackerError, TrackerResult};
use crate::triangulation::ObservationSession;
use crate::types::Observation;

/// What the host persists between runs (load at start, save on change)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub calibration: Option<CalibrationOffsets>,
    /// Oldest first
    #[serde(default)]
    pub observations: Vec<Observation>,
}

impl PersistedState {
    pub fn to_json(&self) -> TrackerResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| TrackerError::Storage(e.to_string()))
    }

    pub fn from_json(json: &str) -> TrackerResult<Self> {
        serde_json::from_str(json).map_err(|e| TrackerError::Storage(e.to_string()))
    }

    /// Rebuild the triangulation session from the stored observations
    pub fn restore_session(&self, config: &TriangulationConfig) -> TrackerResult<ObservationSession> {
        ObservationSession::restore(config, self.observations.clone())
    }

    /// Write as JSON, gzip-compressed when the path ends in `.gz`
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        if is_gzip(path) {
            let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
            serde_json::to_writer(&mut encoder, self).context("Failed to serialize state")?;
            encoder.finish()?.flush()?;
        } else {
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, self).context("Failed to serialize state")?;
            writer.flush()?;
        }

        log::debug!(
            "Saved state to {} ({} observations)",
            path.display(),
            self.observations.len()
        );
        Ok(())
    }

    /// Read a state file; a missing file is an empty state
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let state: Self = if is_gzip(path) {
            serde_json::from_reader(BufReader::new(GzDecoder::new(file)))
        } else {
            serde_json::from_reader(BufReader::new(file))
        }
        .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(state)
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension().map(|e| e == "gz").unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GeoPoint;
    use std::path::PathBuf;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("plume_tracker_{}", std::process::id()))
            .join(name)
    }

    fn sample_state() -> PersistedState {
        PersistedState {
            calibration: Some(CalibrationOffsets {
                offset_x: 12.5,
                offset_y: -3.25,
                offset_z: 0.5,
                sample_count: 120,
                computed_at: "2026-10-01T08:00:00+00:00".to_string(),
            }),
            observations: vec![
                Observation::new("a", GeoPoint::new_unchecked(45.0, 7.0), 10.0, 2.0, 3_000.0, 1_790_000_000.0)
                    .with_label("ridge"),
                Observation::new(
                    "b",
                    GeoPoint::new_unchecked(45.25, 7.125).with_altitude(820.0),
                    350.0,
                    1.5,
                    4_200.0,
                    1_790_000_100.0,
                ),
            ],
        }
    }

    #[test]
    fn test_json_accepts_missing_fields() {
        let state = PersistedState::from_json("{}").unwrap();
        assert_eq!(state, PersistedState::default());

        // Altitude is optional on positions
        let json = r#"{"observations":[{"id":"x","position":{"latitude":1.0,"longitude":2.0},
            "heading":5.0,"pitch":0.0,"slant_range":10.0,"captured_at":0.0,"observer_label":""}]}"#;
        let state = PersistedState::from_json(json).unwrap();
        assert_eq!(state.observations[0].position.altitude, 0.0);
        assert!(state.calibration.is_none());
    }

    #[test]
    fn test_save_and_load_plain_and_gzip() {
        let state = sample_state();
        for name in ["state.json", "state.json.gz"] {
            let path = scratch_path(name);
            state.save(&path).unwrap();
            let loaded = PersistedState::load(&path).unwrap();
            assert_eq!(loaded, state);
            let _ = fs::remove_file(&path);
        }
    }

    #[test]
    fn test_bad_json_is_storage_error() {
        assert!(matches!(PersistedState::from_json("[1, 2"), Err(TrackerError::Storage(_))));
    }

    #[test]
    fn test_restore_session() {
        let state = sample_state();
        let json = state.to_json().unwrap();
        let session = PersistedState::from_json(&json)
            .unwrap()
            .restore_session(&TriangulationConfig::default())
            .unwrap();
        assert_eq!(session.len(), 2);
        assert_eq!(session.snapshot(), state.observations);
        assert!(session.result().is_some());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let loaded = PersistedState::load(&scratch_path("does_not_exist.json")).unwrap();
        assert!(loaded.observations.is_empty());
        assert!(loaded.calibration.is_none());
    }

    #[test]
    fn test_load_corrupt_file_errors() {
        let path = scratch_path("corrupt.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();
        assert!(PersistedState::load(&path).is_err());
        let _ = fs::remove_file(&path);
    }
}
