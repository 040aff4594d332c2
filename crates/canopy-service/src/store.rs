//! Audit records and the stores that keep them.

use crate::{CalculationOutcome, StoreError};
use canopy_engine::{DataQuality, UncertaintyRange};
use canopy_geo::GeoJsonPolygon;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// The shape written for every successful calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarbonRecord {
    pub created_at: DateTime<Utc>,
    pub geometry: GeoJsonPolygon,
    pub area_hectares: f64,
    pub total_co2e: f64,
    pub above_ground_biomass: f64,
    pub below_ground_biomass: f64,
    pub soil_organic_carbon: f64,
    pub calculation_method: String,
    pub data_quality: DataQuality,
    pub uncertainty_range: UncertaintyRange,
    pub data_sources: serde_json::Value,
}

impl CarbonRecord {
    /// Build the record for `outcome`, timestamped `created_at`.
    pub fn from_outcome(outcome: &CalculationOutcome, created_at: DateTime<Utc>) -> Self {
        let estimate = &outcome.estimate;
        Self {
            created_at,
            geometry: outcome.polygon.to_geojson(),
            area_hectares: outcome.area_hectares,
            total_co2e: estimate.total_co2e,
            above_ground_biomass: estimate.above_ground_biomass,
            below_ground_biomass: estimate.below_ground_biomass,
            soil_organic_carbon: estimate.soil_organic_carbon,
            calculation_method: estimate.calculation_method.clone(),
            data_quality: estimate.data_quality,
            uncertainty_range: estimate.uncertainty_range,
            data_sources: outcome.data_sources(),
        }
    }
}

/// A record together with the id the store assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    #[serde(flatten)]
    pub record: CarbonRecord,
}

/// Persistence collaborator for audit records.
pub trait EstimateStore: Send + Sync {
    /// Insert `record` and return its generated id.
    fn insert(&self, record: CarbonRecord) -> Result<String, StoreError>;
}

/// In-process store with sequential ids, starting at 1.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<StoredRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records in insertion order.
    pub fn records(&self) -> Vec<StoredRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl EstimateStore for MemoryStore {
    fn insert(&self, record: CarbonRecord) -> Result<String, StoreError> {
        let mut records = self.records.lock();
        let id = (records.len() + 1).to_string();
        records.push(StoredRecord { id: id.clone(), record });
        Ok(id)
    }
}

/// Append-only JSON-lines file, one [`StoredRecord`] per line.
///
/// Ids are the first 16 hex characters of SHA-256 over the geometry JSON
/// followed by the RFC 3339 creation timestamp.
#[derive(Debug)]
pub struct JsonLinesStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesStore {
    /// Store backed by `path`; the file is created on first insert.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Id for a record.
    pub fn record_id(record: &CarbonRecord) -> Result<String, StoreError> {
        let geometry = serde_json::to_string(&record.geometry)?;
        let mut hasher = Sha256::new();
        hasher.update(geometry.as_bytes());
        hasher.update(record.created_at.to_rfc3339_opts(SecondsFormat::Micros, true).as_bytes());
        let digest = hex::encode(hasher.finalize());
        Ok(digest[..16].to_string())
    }

    /// Read back every record. A missing file reads as empty.
    pub fn read_all(&self) -> Result<Vec<StoredRecord>, StoreError> {
        let file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }
}

impl EstimateStore for JsonLinesStore {
    fn insert(&self, record: CarbonRecord) -> Result<String, StoreError> {
        let id = Self::record_id(&record)?;
        let mut line = serde_json::to_string(&StoredRecord { id: id.clone(), record })?;
        line.push('\n');

        let _guard = self.write_lock.lock();
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(id)
    }
}
