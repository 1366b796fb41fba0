//! Per-network deployment records.
//!
//! One JSON object per network, stored as `contracts.<network>.json`. Each
//! deployment step writes exactly one field; everything else in the file,
//! including keys this tool does not know about, is preserved.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::{Result, SetupError};

/// The address slots of a [`DeploymentRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordField {
    Token,
    Adapter,
    Representation,
    Endpoint,
}

impl RecordField {
    pub fn key(self) -> &'static str {
        match self {
            RecordField::Token => "tokenAddress",
            RecordField::Adapter => "adapterAddress",
            RecordField::Representation => "representationAddress",
            RecordField::Endpoint => "endpointAddress",
        }
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Contract addresses known for one network.
///
/// Older record files used the keys `token`, `oftAdapter`, `oft` and
/// `endpoint`; those are still read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    #[serde(default, alias = "token", skip_serializing_if = "Option::is_none")]
    pub token_address: Option<String>,

    #[serde(default, alias = "oftAdapter", skip_serializing_if = "Option::is_none")]
    pub adapter_address: Option<String>,

    #[serde(default, alias = "oft", skip_serializing_if = "Option::is_none")]
    pub representation_address: Option<String>,

    #[serde(default, alias = "endpoint", skip_serializing_if = "Option::is_none")]
    pub endpoint_address: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl DeploymentRecord {
    pub fn get(&self, field: RecordField) -> Option<&str> {
        match field {
            RecordField::Token => self.token_address.as_deref(),
            RecordField::Adapter => self.adapter_address.as_deref(),
            RecordField::Representation => self.representation_address.as_deref(),
            RecordField::Endpoint => self.endpoint_address.as_deref(),
        }
    }

    pub fn set(&mut self, field: RecordField, address: impl Into<String>) {
        let slot = match field {
            RecordField::Token => &mut self.token_address,
            RecordField::Adapter => &mut self.adapter_address,
            RecordField::Representation => &mut self.representation_address,
            RecordField::Endpoint => &mut self.endpoint_address,
        };
        *slot = Some(address.into());
    }

    /// The address in `field`, or [`SetupError::MissingDeployment`].
    pub fn require(&self, chain: &str, field: RecordField) -> Result<&str> {
        self.get(field).ok_or_else(|| SetupError::MissingDeployment {
            chain: chain.to_string(),
            field,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STORES
// ═══════════════════════════════════════════════════════════════════════════════

/// Key-value store of deployment records, keyed by network.
///
/// No locking: two runs writing the same network's record can race.
pub trait DeploymentStore: Send + Sync {
    /// Load a network's record. A network with no record yet yields an
    /// empty one.
    fn load(&self, chain: &str) -> Result<DeploymentRecord>;

    fn save(&self, chain: &str, record: &DeploymentRecord) -> Result<()>;

    /// Read-modify-write of a single field.
    fn write_field(&self, chain: &str, field: RecordField, address: &str) -> Result<()> {
        let mut record = self.load(chain)?;
        record.set(field, address);
        self.save(chain, &record)
    }
}

/// Records stored as `<dir>/contracts.<network>.json`.
#[derive(Debug, Clone)]
pub struct FileDeploymentStore {
    dir: PathBuf,
}

impl FileDeploymentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, chain: &str) -> PathBuf {
        self.dir.join(format!("contracts.{chain}.json"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DeploymentStore for FileDeploymentStore {
    fn load(&self, chain: &str) -> Result<DeploymentRecord> {
        let path = self.path_for(chain);
        if !path.exists() {
            return Ok(DeploymentRecord::default());
        }
        let contents = fs::read_to_string(&path)
            .map_err(|e| SetupError::Record(format!("failed to read {}: {e}", path.display())))?;
        serde_json::from_str(&contents)
            .map_err(|e| SetupError::Record(format!("failed to parse {}: {e}", path.display())))
    }

    fn save(&self, chain: &str, record: &DeploymentRecord) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            SetupError::Record(format!("failed to create {}: {e}", self.dir.display()))
        })?;
        let path = self.path_for(chain);
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| SetupError::Record(format!("failed to serialize record: {e}")))?;
        fs::write(&path, json + "\n")
            .map_err(|e| SetupError::Record(format!("failed to write {}: {e}", path.display())))
    }
}

/// In-memory records, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryDeploymentStore {
    records: Mutex<HashMap<String, DeploymentRecord>>,
}

impl MemoryDeploymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, chain: &str, record: DeploymentRecord) -> Self {
        if let Ok(mut records) = self.records.lock() {
            records.insert(chain.to_string(), record);
        }
        self
    }

    /// Copy of every stored record.
    pub fn snapshot(&self) -> HashMap<String, DeploymentRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl DeploymentStore for MemoryDeploymentStore {
    fn load(&self, chain: &str) -> Result<DeploymentRecord> {
        let records = self
            .records
            .lock()
            .map_err(|_| SetupError::Record("record store poisoned".into()))?;
        Ok(records.get(chain).cloned().unwrap_or_default())
    }

    fn save(&self, chain: &str, record: &DeploymentRecord) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| SetupError::Record("record store poisoned".into()))?;
        records.insert(chain.to_string(), record.clone());
        Ok(())
    }
}
