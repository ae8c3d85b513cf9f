use crate::access::btree::BTree;
use crate::config::StorageConfig;
use crate::storage::buffer::BufferPoolManager;
use crate::storage::disk::DiskManager;
use crate::storage::page::{FileId, PageId};
use anyhow::{bail, Context, Result};
use log::{debug, info};

/// Engine context: one buffer pool over the heap files of a data directory.
pub struct Database {
    config: StorageConfig,
    buffer_pool: BufferPoolManager,
}

impl Database {
    /// Opens the data directory described by `config`, creating it if needed, and registers
    /// every heap file already in it.
    pub fn open(config: StorageConfig) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!(
                "Failed to create data directory {}",
                config.data_dir.display()
            )
        })?;

        let mut buffer_pool = BufferPoolManager::new(config.buffer_pool_size);
        let mut file_ids = Vec::new();
        for entry in std::fs::read_dir(&config.data_dir)? {
            let path = entry?.path();
            if let Some(file_id) = StorageConfig::parse_heap_file_name(&path) {
                file_ids.push(file_id);
            }
        }
        file_ids.sort();
        for &file_id in &file_ids {
            let path = config.heap_file_path(file_id);
            let disk_manager = DiskManager::open(&path)
                .with_context(|| format!("Failed to open heap file {}", path.display()))?;
            debug!(
                "Registered heap file {} ({} pages)",
                path.display(),
                disk_manager.num_pages()
            );
            buffer_pool.register_disk_manager(file_id, disk_manager);
        }

        info!(
            "Opened {} with {} heap file(s), buffer pool of {} pages",
            config.data_dir.display(),
            file_ids.len(),
            config.buffer_pool_size
        );
        Ok(Self {
            config,
            buffer_pool,
        })
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Creates an empty heap file under a fresh FileId.
    pub fn create_file(&mut self) -> Result<FileId> {
        let file_id = self.buffer_pool.allocate_file_id();
        let path = self.config.heap_file_path(file_id);
        if path.exists() {
            bail!("Heap file already exists at {}", path.display());
        }
        let disk_manager = DiskManager::create(&path)?;
        self.buffer_pool.register_disk_manager(file_id, disk_manager);
        debug!("Created heap file {}", path.display());
        Ok(file_id)
    }

    /// Makes `file_id` usable, creating its heap file if it does not exist yet. A file that is
    /// already registered is left alone.
    pub fn open_file(&mut self, file_id: FileId) -> Result<()> {
        if self.buffer_pool.get_disk_manager(file_id).is_some() {
            return Ok(());
        }
        let path = self.config.heap_file_path(file_id);
        let disk_manager = DiskManager::open(&path)?;
        self.buffer_pool.register_disk_manager(file_id, disk_manager);
        Ok(())
    }

    pub fn create_btree(&mut self, file_id: FileId) -> Result<BTree> {
        Ok(BTree::create(&mut self.buffer_pool, file_id)?)
    }

    pub fn open_btree(&self, meta_page_id: PageId) -> BTree {
        BTree::open(meta_page_id)
    }

    pub fn buffer_pool(&mut self) -> &mut BufferPoolManager {
        &mut self.buffer_pool
    }

    /// Writes every dirty page back and syncs the heap files. Dropping the database does not
    /// do this.
    pub fn flush(&mut self) -> Result<()> {
        self.buffer_pool.flush_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::btree::SearchMode;
    use crate::storage::error::StorageError;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_data_dir() -> Result<()> {
        let dir = tempdir()?;
        let data_dir = dir.path().join("nested").join("data");
        let db = Database::open(StorageConfig::new(&data_dir))?;

        assert!(data_dir.is_dir());
        assert_eq!(db.config().buffer_pool_size, 64);

        Ok(())
    }

    #[test]
    fn test_open_rejects_invalid_config() -> Result<()> {
        let dir = tempdir()?;
        let result = Database::open(StorageConfig::new(dir.path()).with_buffer_pool_size(0));

        let err = result.err().expect("zero-sized pool must be rejected");
        assert!(matches!(
            err.downcast_ref::<StorageError>(),
            Some(StorageError::InvalidConfig(_))
        ));

        Ok(())
    }

    #[test]
    fn test_file_ids_resume_after_reopen() -> Result<()> {
        let dir = tempdir()?;
        {
            let mut db = Database::open(StorageConfig::new(dir.path()))?;
            assert_eq!(db.create_file()?, FileId(0));
            assert_eq!(db.create_file()?, FileId(1));
        }

        let mut db = Database::open(StorageConfig::new(dir.path()))?;
        assert_eq!(db.create_file()?, FileId(2));
        assert!(dir.path().join("2.db").exists());

        Ok(())
    }

    #[test]
    fn test_open_file_is_idempotent() -> Result<()> {
        let dir = tempdir()?;
        let mut db = Database::open(StorageConfig::new(dir.path()))?;

        db.open_file(FileId(3))?;
        db.open_file(FileId(3))?;
        assert!(dir.path().join("3.db").exists());
        assert_eq!(db.create_file()?, FileId(4));

        Ok(())
    }

    #[test]
    fn test_btree_survives_flush_and_reopen() -> Result<()> {
        let dir = tempdir()?;
        let config = StorageConfig::new(dir.path()).with_buffer_pool_size(4);

        let meta_page_id = {
            let mut db = Database::open(config.clone())?;
            let file_id = db.create_file()?;
            let btree = db.create_btree(file_id)?;
            for n in 0..500u32 {
                btree.insert(db.buffer_pool(), &n.to_be_bytes(), &[7; 16])?;
            }
            db.flush()?;
            btree.meta_page_id()
        };

        let mut db = Database::open(config)?;
        let btree = db.open_btree(meta_page_id);
        let iter = btree.search(db.buffer_pool(), SearchMode::Start)?;
        let keys = iter
            .scan(db.buffer_pool())
            .map(|pair| pair.map(|(key, _)| key))
            .collect::<Result<Vec<_>, _>>()?;
        let expected: Vec<Vec<u8>> = (0..500u32).map(|n| n.to_be_bytes().to_vec()).collect();
        assert_eq!(keys, expected);

        Ok(())
    }
}
