//! Compiled contract artifacts.
//!
//! Reads creation bytecode from `<dir>/<ContractName>.json`. Both the Hardhat
//! layout (`"bytecode": "0x…"`) and the Foundry layout
//! (`"bytecode": {"object": "0x…"}`) are accepted.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Result, SetupError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractKind {
    Token,
    Adapter,
    Representation,
}

/// Contract names to look up in the artifact directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactNames {
    pub token: String,
    pub adapter: String,
    pub representation: String,
}

impl Default for ArtifactNames {
    fn default() -> Self {
        Self {
            token: "MyToken".to_string(),
            adapter: "MyOFTAdapter".to_string(),
            representation: "MyOFT".to_string(),
        }
    }
}

impl ArtifactNames {
    pub fn name(&self, kind: ContractKind) -> &str {
        match kind {
            ContractKind::Token => &self.token,
            ContractKind::Adapter => &self.adapter,
            ContractKind::Representation => &self.representation,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactLoader {
    dir: PathBuf,
    names: ArtifactNames,
}

impl ArtifactLoader {
    pub fn new(dir: impl Into<PathBuf>, names: ArtifactNames) -> Self {
        Self {
            dir: dir.into(),
            names,
        }
    }

    pub fn path_for(&self, kind: ContractKind) -> PathBuf {
        self.dir.join(format!("{}.json", self.names.name(kind)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creation bytecode for `kind`.
    pub fn bytecode(&self, kind: ContractKind) -> Result<Vec<u8>> {
        let path = self.path_for(kind);
        let contents = fs::read_to_string(&path)
            .map_err(|e| SetupError::Artifact(format!("failed to read {}: {e}", path.display())))?;
        parse_bytecode(&contents)
            .map_err(|e| SetupError::Artifact(format!("{}: {e}", path.display())))
    }

    /// Bytecode followed by ABI-encoded constructor arguments.
    pub fn init_code(&self, kind: ContractKind, constructor_args: &[u8]) -> Result<Vec<u8>> {
        let mut code = self.bytecode(kind)?;
        code.extend_from_slice(constructor_args);
        Ok(code)
    }
}

fn parse_bytecode(json: &str) -> std::result::Result<Vec<u8>, String> {
    let artifact: Value = serde_json::from_str(json).map_err(|e| e.to_string())?;

    let hex_str = match artifact.get("bytecode") {
        Some(Value::String(s)) => s.as_str(),
        Some(Value::Object(obj)) => obj
            .get("object")
            .and_then(Value::as_str)
            .ok_or("bytecode.object missing")?,
        _ => return Err("no bytecode field".into()),
    };

    let bytes = hex::decode(hex_str.strip_prefix("0x").unwrap_or(hex_str))
        .map_err(|e| format!("bytecode is not hex: {e}"))?;
    if bytes.is_empty() {
        // interfaces and abstract contracts compile to empty bytecode
        return Err("empty bytecode".into());
    }
    Ok(bytes)
}
