//! Record store over the data directory

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use veilnet_core::{NodeRecord, RelayRecord};

use crate::blob::{compress, decompress};
use crate::{Result, StoreError};

/// File name of the node's own record under the local dir.
pub const LOCAL_NODE_FILE: &str = "nri.bin";

fn check_id(id: &str) -> Result<()> {
    let ok = id.len() >= 3
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidId(id.to_string()))
    }
}

/// Filesystem store for NRI/RRI blobs and local key material.
pub struct RecordStore {
    nri_dir: PathBuf,
    rri_dir: PathBuf,
    local_dir: PathBuf,
}

impl RecordStore {
    /// Open (and create) the store under a data directory.
    pub fn open(data_dir: &Path, nri_sub: &str, rri_sub: &str, local_sub: &str) -> Result<Self> {
        let store = Self {
            nri_dir: data_dir.join(nri_sub),
            rri_dir: data_dir.join(rri_sub),
            local_dir: data_dir.join(local_sub),
        };
        fs::create_dir_all(&store.nri_dir)?;
        fs::create_dir_all(&store.rri_dir)?;
        fs::create_dir_all(&store.local_dir)?;
        debug!(data_dir = %data_dir.display(), "record store opened");
        Ok(store)
    }

    fn write_blob(path: &Path, json: &str) -> Result<()> {
        fs::write(path, compress(json)?)?;
        Ok(())
    }

    fn read_blob(path: &Path, id: &str) -> Result<String> {
        if !path.exists() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        let blob = fs::read(path)?;
        decompress(&blob)
    }

    fn list_blobs(dir: &Path, limit: Option<usize>) -> Result<Vec<String>> {
        let mut names: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().map(|e| e == "bin").unwrap_or(false))
            .collect();
        names.sort();
        if let Some(limit) = limit {
            names.truncate(limit);
        }
        names
            .iter()
            .map(|path| {
                let blob = fs::read(path)?;
                decompress(&blob)
            })
            .collect()
    }

    // ==================== NRI ====================

    /// Persist a new NRI record. Fails with a conflict when the id exists.
    pub fn save_nri(&self, record: &mut NodeRecord) -> Result<PathBuf> {
        record.validate()?;
        let path = self.nri_dir.join(format!("{}.bin", record.node_id));
        if path.exists() {
            return Err(StoreError::Conflict(record.node_id.clone()));
        }
        record.touch();
        Self::write_blob(&path, &serde_json::to_string_pretty(record)?)?;
        info!(node_id = %record.node_id, path = %path.display(), "NRI saved");
        Ok(path)
    }

    /// Overwrite an existing NRI record, bumping `last_updated`.
    pub fn update_nri(&self, record: &mut NodeRecord) -> Result<PathBuf> {
        record.validate()?;
        let path = self.nri_dir.join(format!("{}.bin", record.node_id));
        if !path.exists() {
            return Err(StoreError::NotFound(record.node_id.clone()));
        }
        record.touch();
        Self::write_blob(&path, &serde_json::to_string_pretty(record)?)?;
        Ok(path)
    }

    pub fn load_nri(&self, node_id: &str) -> Result<NodeRecord> {
        check_id(node_id)?;
        let path = self.nri_dir.join(format!("{node_id}.bin"));
        let json = Self::read_blob(&path, node_id)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn list_nri(&self, limit: Option<usize>) -> Result<Vec<NodeRecord>> {
        Self::list_blobs(&self.nri_dir, limit)?
            .iter()
            .map(|json| Ok(serde_json::from_str(json)?))
            .collect()
    }

    pub fn delete_nri(&self, node_id: &str) -> Result<()> {
        check_id(node_id)?;
        let path = self.nri_dir.join(format!("{node_id}.bin"));
        if !path.exists() {
            return Err(StoreError::NotFound(node_id.to_string()));
        }
        fs::remove_file(path)?;
        Ok(())
    }

    // ==================== RRI ====================

    /// Persist a new RRI record. Fails with a conflict when the id exists.
    pub fn save_rri(&self, record: &mut RelayRecord) -> Result<PathBuf> {
        record.validate()?;
        let path = self.rri_dir.join(format!("{}.bin", record.relay_id));
        if path.exists() {
            return Err(StoreError::Conflict(record.relay_id.clone()));
        }
        record.touch();
        Self::write_blob(&path, &serde_json::to_string_pretty(record)?)?;
        info!(relay_id = %record.relay_id, path = %path.display(), "RRI saved");
        Ok(path)
    }

    pub fn load_rri(&self, relay_id: &str) -> Result<RelayRecord> {
        check_id(relay_id)?;
        let path = self.rri_dir.join(format!("{relay_id}.bin"));
        let json = Self::read_blob(&path, relay_id)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn list_rri(&self, limit: Option<usize>) -> Result<Vec<RelayRecord>> {
        Self::list_blobs(&self.rri_dir, limit)?
            .iter()
            .map(|json| Ok(serde_json::from_str(json)?))
            .collect()
    }

    pub fn delete_rri(&self, relay_id: &str) -> Result<()> {
        check_id(relay_id)?;
        let path = self.rri_dir.join(format!("{relay_id}.bin"));
        if !path.exists() {
            return Err(StoreError::NotFound(relay_id.to_string()));
        }
        fs::remove_file(path)?;
        Ok(())
    }

    // ==================== Local node ====================

    /// Persist this node's own record (overwrite allowed).
    pub fn save_local_node(&self, record: &mut NodeRecord) -> Result<PathBuf> {
        record.validate()?;
        record.touch();
        let path = self.local_dir.join(LOCAL_NODE_FILE);
        Self::write_blob(&path, &serde_json::to_string_pretty(record)?)?;
        Ok(path)
    }

    pub fn load_local_node(&self) -> Result<NodeRecord> {
        let path = self.local_dir.join(LOCAL_NODE_FILE);
        let json = Self::read_blob(&path, "local node record")?;
        Ok(serde_json::from_str(&json)?)
    }

    // ==================== Key material ====================

    /// Write `<name>.key` under the local dir (PEM or base64 text).
    pub fn save_key(&self, name: &str, contents: &str) -> Result<PathBuf> {
        check_id(name)?;
        let path = self.local_dir.join(format!("{name}.key"));
        fs::write(&path, contents)?;
        debug!(name, "key file saved");
        Ok(path)
    }

    pub fn load_key(&self, name: &str) -> Result<String> {
        check_id(name)?;
        let path = self.local_dir.join(format!("{name}.key"));
        if !path.exists() {
            return Err(StoreError::NotFound(format!("key file: {name}")));
        }
        Ok(fs::read_to_string(path)?)
    }

    pub fn key_exists(&self, name: &str) -> bool {
        self.local_dir.join(format!("{name}.key")).exists()
    }
}
