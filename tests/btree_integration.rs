use anyhow::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use tempfile::tempdir;
use vibestore::access::btree::{BTree, OwnedPair, SearchMode};
use vibestore::access::memcomparable;
use vibestore::config::StorageConfig;
use vibestore::database::Database;
use vibestore::storage::buffer::BufferPoolManager;
use vibestore::storage::disk::DiskManager;
use vibestore::storage::error::StorageError;
use vibestore::storage::page::FileId;

fn scan_all(btree: &BTree, buffer_pool: &mut BufferPoolManager) -> Result<Vec<OwnedPair>> {
    let iter = btree.search(buffer_pool, SearchMode::Start)?;
    Ok(iter.scan(buffer_pool).collect::<Result<Vec<_>, _>>()?)
}

#[test]
fn test_random_workload_matches_btreemap() -> Result<()> {
    let dir = tempdir()?;
    let mut db = Database::open(StorageConfig::new(dir.path()).with_buffer_pool_size(5))?;
    let file_id = db.create_file()?;
    let btree = db.create_btree(file_id)?;

    let mut rng = StdRng::seed_from_u64(2024);
    let mut expected = BTreeMap::new();
    for _ in 0..4000 {
        let key_len = rng.gen_range(1..48);
        let key: Vec<u8> = (0..key_len).map(|_| rng.gen()).collect();
        let value: Vec<u8> = (0..rng.gen_range(0..64)).map(|_| rng.gen()).collect();

        let result = btree.insert(db.buffer_pool(), &key, &value);
        if expected.contains_key(&key) {
            assert!(matches!(result, Err(StorageError::DuplicateKey)));
        } else {
            result?;
            expected.insert(key, value);
        }
    }

    let pairs = scan_all(&btree, db.buffer_pool())?;
    let expected: Vec<_> = expected.into_iter().collect();
    assert_eq!(pairs, expected);

    Ok(())
}

#[test]
fn test_reopen_after_flush() -> Result<()> {
    let dir = tempdir()?;
    let config = StorageConfig::new(dir.path()).with_buffer_pool_size(8);

    let mut keys: Vec<u32> = (0..3000).collect();
    keys.shuffle(&mut StdRng::seed_from_u64(11));

    let (meta_page_id, height) = {
        let mut db = Database::open(config.clone())?;
        let file_id = db.create_file()?;
        let btree = db.create_btree(file_id)?;
        for &n in &keys {
            btree.insert(db.buffer_pool(), &n.to_be_bytes(), format!("value-{}", n).as_bytes())?;
        }
        db.flush()?;
        (btree.meta_page_id(), btree.height(db.buffer_pool())?)
    };

    let mut db = Database::open(config)?;
    let btree = db.open_btree(meta_page_id);
    assert_eq!(btree.height(db.buffer_pool())?, height);

    for &n in keys.iter().take(200) {
        let value = btree.get(db.buffer_pool(), &n.to_be_bytes())?;
        assert_eq!(value, Some(format!("value-{}", n).into_bytes()));
    }

    // the reopened tree keeps accepting inserts
    btree.insert(db.buffer_pool(), &3000u32.to_be_bytes(), b"tail")?;
    let pairs = scan_all(&btree, db.buffer_pool())?;
    assert_eq!(pairs.len(), 3001);
    assert_eq!(pairs.last().map(|(_, v)| v.as_slice()), Some(&b"tail"[..]));

    Ok(())
}

#[test]
fn test_several_trees_share_one_pool() -> Result<()> {
    let dir = tempdir()?;
    let mut db = Database::open(StorageConfig::new(dir.path()).with_buffer_pool_size(6))?;
    let file_a = db.create_file()?;
    let file_b = db.create_file()?;
    let tree_a = db.create_btree(file_a)?;
    let tree_b = db.create_btree(file_b)?;
    let tree_c = db.create_btree(file_a)?;

    for n in 0..1000u32 {
        tree_a.insert(db.buffer_pool(), &n.to_be_bytes(), b"a")?;
        tree_b.insert(db.buffer_pool(), &(n * 3).to_be_bytes(), b"b")?;
        tree_c.insert(db.buffer_pool(), &(999 - n).to_be_bytes(), b"c")?;
    }

    for (btree, value) in [(&tree_a, b"a"), (&tree_b, b"b"), (&tree_c, b"c")] {
        let pairs = scan_all(btree, db.buffer_pool())?;
        assert_eq!(pairs.len(), 1000);
        assert!(pairs.iter().all(|(_, v)| v == value));
        assert!(pairs.windows(2).all(|w| w[0].0 < w[1].0));
    }

    Ok(())
}

#[test]
fn test_composite_keys_scan_in_field_order() -> Result<()> {
    let dir = tempdir()?;
    let mut buffer_pool = BufferPoolManager::new(16);
    buffer_pool.register_disk_manager(FileId(0), DiskManager::create(&dir.path().join("0.db"))?);
    let btree = BTree::create(&mut buffer_pool, FileId(0))?;

    let rows = [
        ["smith", "john"],
        ["smith", ""],
        ["smit", "zed"],
        ["smith", "johnathan"],
        ["doe", "jane"],
        ["smithsonian", "a"],
    ];
    for row in &rows {
        btree.insert(&mut buffer_pool, &memcomparable::encode(row), b"")?;
    }

    let iter = btree.search(&mut buffer_pool, SearchMode::Key(memcomparable::encode(["smith"])))?;
    let mut decoded = Vec::new();
    for pair in iter.scan(&mut buffer_pool) {
        decoded.push(memcomparable::decode(&pair?.0)?);
    }

    let as_strings: Vec<Vec<String>> = decoded
        .iter()
        .map(|fields| {
            fields
                .iter()
                .map(|f| String::from_utf8_lossy(f).into_owned())
                .collect()
        })
        .collect();
    assert_eq!(
        as_strings,
        vec![
            vec!["smith".to_string(), "".to_string()],
            vec!["smith".to_string(), "john".to_string()],
            vec!["smith".to_string(), "johnathan".to_string()],
            vec!["smithsonian".to_string(), "a".to_string()],
        ]
    );

    Ok(())
}

#[test]
fn test_iterator_skips_to_next_leaf() -> Result<()> {
    let dir = tempdir()?;
    let mut buffer_pool = BufferPoolManager::new(4);
    buffer_pool.register_disk_manager(FileId(0), DiskManager::create(&dir.path().join("0.db"))?);
    let btree = BTree::create(&mut buffer_pool, FileId(0))?;

    let value = [0u8; 200];
    for n in 0..400u32 {
        btree.insert(&mut buffer_pool, &(n * 10).to_be_bytes(), &value)?;
    }

    // every gap key starts at the next stored key, wherever the leaf boundary falls
    for n in 0..398u32 {
        let gap = (n * 10 + 5).to_be_bytes().to_vec();
        let mut iter = btree.search(&mut buffer_pool, SearchMode::Key(gap))?;
        let (key, _) = iter.next(&mut buffer_pool)?.expect("successor exists");
        assert_eq!(key, ((n + 1) * 10).to_be_bytes());
        let (key, _) = iter.next(&mut buffer_pool)?.expect("two successors");
        assert_eq!(key, ((n + 2) * 10).to_be_bytes());
    }

    Ok(())
}
