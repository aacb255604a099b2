//! Snapshot documents and where they are written.
//!
//! Layout under the output root:
//!
//! ```text
//! index.json
//! <station>/info.json
//! <station>/<quantity>/<statistic>/latest.json
//! <station>/<quantity>/<statistic>/samples.json
//! ```
//!
//! With a JSONP callback configured the extension is `.jsonp` and each
//! document is wrapped as `callback(...);`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use winddb_common::{
    Capability, Quantity, Sample, Statistic, StationId, StationInfo, WindDbError, WindDbResult,
};

/// Per-capability document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentKind {
    /// The most recent sample
    Latest,
    /// Every sample in the window, newest first
    Samples,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Latest => "latest",
            DocumentKind::Samples => "samples",
        }
    }
}

/// Where a document belongs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentAddress {
    Capability {
        station: StationId,
        capability: Capability,
        kind: DocumentKind,
    },
    Info {
        station: StationId,
    },
    Index,
}

impl DocumentAddress {
    /// Path relative to the output root, without extension.
    pub fn relative_stem(&self) -> PathBuf {
        match self {
            DocumentAddress::Capability {
                station,
                capability,
                kind,
            } => Path::new(station.as_str())
                .join(capability.quantity.as_str())
                .join(capability.statistic.as_str())
                .join(kind.as_str()),
            DocumentAddress::Info { station } => Path::new(station.as_str()).join("info"),
            DocumentAddress::Index => PathBuf::from("index"),
        }
    }

    pub fn relative_path(&self, extension: &str) -> PathBuf {
        self.relative_stem().with_extension(extension)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestDocument {
    pub station: StationId,
    pub quantity: Quantity,
    pub statistic: Statistic,
    pub sample: Sample,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplesDocument {
    pub station: StationId,
    pub quantity: Quantity,
    pub statistic: Statistic,
    pub samples: Vec<Sample>,
}

/// Station metadata as published to the front end.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoDocument {
    pub id: StationId,
    #[serde(rename = "friendlyname")]
    pub friendly_name: String,
    #[serde(rename = "pollrate")]
    pub poll_rate: u32,
    pub position_lat: Option<f64>,
    pub position_lon: Option<f64>,
    pub description: Option<String>,
    pub capabilities: Vec<Capability>,
}

impl InfoDocument {
    pub fn new<'a>(
        info: &StationInfo,
        capabilities: impl IntoIterator<Item = &'a Capability>,
    ) -> Self {
        Self {
            id: info.id.clone(),
            friendly_name: info.friendly_name.clone(),
            poll_rate: info.poll_rate,
            position_lat: info.position_lat,
            position_lon: info.position_lon,
            description: info.description.clone(),
            capabilities: capabilities.into_iter().copied().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexEntry {
    #[serde(flatten)]
    pub station: InfoDocument,
    /// Newest sample timestamp seen in the batch
    #[serde(rename = "lastupdate")]
    pub last_update: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexDocument {
    pub stations: Vec<IndexEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Document {
    Latest(LatestDocument),
    Samples(SamplesDocument),
    Info(InfoDocument),
    Index(IndexDocument),
}

/// Persists rendered documents.
#[async_trait]
pub trait OutputWriter: Send + Sync {
    async fn write(&self, address: &DocumentAddress, document: &Document) -> WindDbResult<()>;

    /// Write a station's documents as a set: when this returns an error
    /// none of the previously written documents has been replaced.
    async fn write_all(&self, documents: &[(DocumentAddress, Document)]) -> WindDbResult<()>;
}

/// Serialization format for [`FileWriter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Jsonp { callback: String },
}

impl OutputFormat {
    /// JSONP when `callback` is set. The callback must be a JavaScript
    /// identifier path such as `winddb.update`.
    pub fn from_callback(callback: Option<&str>) -> WindDbResult<Self> {
        let Some(callback) = callback else {
            return Ok(OutputFormat::Json);
        };

        let valid = callback.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        });
        if !valid {
            return Err(WindDbError::Config(format!(
                "Invalid JSONP callback name: {:?}",
                callback
            )));
        }

        Ok(OutputFormat::Jsonp {
            callback: callback.to_string(),
        })
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Jsonp { .. } => "jsonp",
        }
    }

    pub fn render(&self, document: &Document) -> WindDbResult<Vec<u8>> {
        let json = serde_json::to_string_pretty(document)?;
        let text = match self {
            OutputFormat::Json => format!("{}\n", json),
            OutputFormat::Jsonp { callback } => format!("{}({});\n", callback, json),
        };
        Ok(text.into_bytes())
    }
}

/// Writes documents as files under a root directory.
///
/// Each file is written to a temporary sibling and renamed into place, so
/// readers never observe a partial document.
#[derive(Debug, Clone)]
pub struct FileWriter {
    root: PathBuf,
    format: OutputFormat,
}

impl FileWriter {
    pub fn new(root: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            root: root.into(),
            format,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, address: &DocumentAddress) -> PathBuf {
        self.root
            .join(address.relative_path(self.format.extension()))
    }
}

impl FileWriter {
    /// Render `document` into a temporary sibling of its final path.
    ///
    /// Returns `(temporary, final)` paths.
    async fn stage(
        &self,
        address: &DocumentAddress,
        document: &Document,
    ) -> WindDbResult<(PathBuf, PathBuf)> {
        let path = self.path_for(address);
        let bytes = self.format.render(document)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                WindDbError::Output(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| WindDbError::Output(format!("Failed to write {}: {}", tmp.display(), e)))?;

        debug!(path = %path.display(), bytes = bytes.len(), "Staged document");
        Ok((tmp, path))
    }

    async fn commit(tmp: &Path, path: &Path) -> WindDbResult<()> {
        tokio::fs::rename(tmp, path).await.map_err(|e| {
            WindDbError::Output(format!("Failed to replace {}: {}", path.display(), e))
        })
    }

    async fn discard(staged: &[(PathBuf, PathBuf)]) {
        for (tmp, _) in staged {
            if let Err(e) = tokio::fs::remove_file(tmp).await {
                warn!(path = %tmp.display(), error = %e, "Failed to remove staged document");
            }
        }
    }
}

#[async_trait]
impl OutputWriter for FileWriter {
    async fn write(&self, address: &DocumentAddress, document: &Document) -> WindDbResult<()> {
        let (tmp, path) = self.stage(address, document).await?;
        Self::commit(&tmp, &path).await
    }

    /// Every document is staged before the first rename.
    async fn write_all(&self, documents: &[(DocumentAddress, Document)]) -> WindDbResult<()> {
        let mut staged = Vec::with_capacity(documents.len());
        for (address, document) in documents {
            match self.stage(address, document).await {
                Ok(paths) => staged.push(paths),
                Err(e) => {
                    Self::discard(&staged).await;
                    return Err(e);
                }
            }
        }

        for (i, (tmp, path)) in staged.iter().enumerate() {
            if let Err(e) = Self::commit(tmp, path).await {
                Self::discard(&staged[i..]).await;
                return Err(e);
            }
        }

        Ok(())
    }
}

/// Keeps documents in memory, keyed by address.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    documents: Mutex<BTreeMap<DocumentAddress, Document>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, address: &DocumentAddress) -> Option<Document> {
        self.documents.lock().await.get(address).cloned()
    }

    pub async fn addresses(&self) -> Vec<DocumentAddress> {
        self.documents.lock().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.documents.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.lock().await.is_empty()
    }
}

#[async_trait]
impl OutputWriter for MemoryWriter {
    async fn write(&self, address: &DocumentAddress, document: &Document) -> WindDbResult<()> {
        self.documents
            .lock()
            .await
            .insert(address.clone(), document.clone());
        Ok(())
    }

    async fn write_all(&self, documents: &[(DocumentAddress, Document)]) -> WindDbResult<()> {
        let mut stored = self.documents.lock().await;
        for (address, document) in documents {
            stored.insert(address.clone(), document.clone());
        }
        Ok(())
    }
}
