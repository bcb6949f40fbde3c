use crate::offline::OfflineSyncError;
use crate::storage::KeyValueStore;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File-based implementation of KeyValueStore
///
/// Every key maps to `<data_dir>/<key>.json`. Writes go to a temporary sibling first and are
/// renamed into place, so a crash mid-write leaves the previous blob intact.
pub struct FileStore {
	data_dir: PathBuf,
}

impl FileStore {
	/// Opens (and creates if needed) a store rooted at `data_dir`.
	pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, OfflineSyncError> {
		let data_dir = data_dir.into();
		std::fs::create_dir_all(&data_dir)?;
		info!("Opened file store at {:?}", data_dir);
		Ok(Self { data_dir })
	}

	pub fn data_dir(&self) -> &Path {
		&self.data_dir
	}

	fn get_filename(&self, key: &str) -> Result<PathBuf, OfflineSyncError> {
		let valid = !key.is_empty()
			&& key
				.chars()
				.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
			&& !key.starts_with('.');
		if !valid {
			return Err(OfflineSyncError::Storage(format!(
				"Invalid storage key: {:?}",
				key
			)));
		}
		Ok(self.data_dir.join(format!("{}.json", key)))
	}
}

impl KeyValueStore for FileStore {
	fn get(&self, key: &str) -> Result<Option<String>, OfflineSyncError> {
		let filename = self.get_filename(key)?;
		match std::fs::read_to_string(&filename) {
			Ok(content) => Ok(Some(content)),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
			Err(e) => Err(OfflineSyncError::Storage(format!(
				"Failed to read {:?}: {}",
				filename, e
			))),
		}
	}

	fn set(&self, key: &str, value: &str) -> Result<(), OfflineSyncError> {
		let filename = self.get_filename(key)?;
		let tmp_filename = filename.with_extension("json.tmp");

		std::fs::write(&tmp_filename, value).map_err(|e| {
			OfflineSyncError::Storage(format!("Failed to write {:?}: {}", tmp_filename, e))
		})?;
		std::fs::rename(&tmp_filename, &filename).map_err(|e| {
			OfflineSyncError::Storage(format!("Failed to replace {:?}: {}", filename, e))
		})?;

		debug!("Wrote {} bytes to {:?}", value.len(), filename);
		Ok(())
	}

	fn remove(&self, key: &str) -> Result<(), OfflineSyncError> {
		let filename = self.get_filename(key)?;
		match std::fs::remove_file(&filename) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
			Err(e) => Err(OfflineSyncError::Storage(format!(
				"Failed to remove {:?}: {}",
				filename, e
			))),
		}
	}
}
