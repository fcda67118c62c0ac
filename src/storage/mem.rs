//! An in-process reference `Storage` implementation: one `BTreeMap` per
//! column family behind an `RwLock`. Not durable — it exists so the crate's
//! tests, and embedders who do not need crash durability, can run the whole
//! stack without linking a real LSM engine.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::Result;
use crate::storage::{ColumnFamily, Storage, WriteBatch};

#[derive(Default)]
pub struct MemStorage {
    str2id: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    id2str: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    meta: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemStorage {
    pub fn new() -> Self {
        MemStorage::default()
    }

    fn table(&self, cf: ColumnFamily) -> &RwLock<BTreeMap<Vec<u8>, Vec<u8>>> {
        match cf {
            ColumnFamily::Str2Id => &self.str2id,
            ColumnFamily::Id2Str => &self.id2str,
            ColumnFamily::Meta => &self.meta,
        }
    }
}

impl Storage for MemStorage {
    fn get(&self, cf: ColumnFamily, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let table = self.table(cf).read().expect("MemStorage lock poisoned");
        Ok(table.get(key).cloned())
    }

    fn scan_prefix(&self, cf: ColumnFamily, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let table = self.table(cf).read().expect("MemStorage lock poisoned");
        Ok(table
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        // Group puts by column family so each table is locked exactly once;
        // this is the "single critical section" that gives the batch its
        // all-or-nothing visibility to readers (a reader never observes a
        // table with only some of the batch's puts for that family applied,
        // and never observes one family updated without the others).
        let mut by_cf: [Vec<(Vec<u8>, Vec<u8>)>; 3] = Default::default();
        for p in batch.iter() {
            let idx = match p.cf {
                ColumnFamily::Str2Id => 0,
                ColumnFamily::Id2Str => 1,
                ColumnFamily::Meta => 2,
            };
            by_cf[idx].push((p.key.clone(), p.value.clone()));
        }
        for (idx, cf) in ColumnFamily::ALL.into_iter().enumerate() {
            if by_cf[idx].is_empty() {
                continue;
            }
            let mut table = self.table(cf).write().expect("MemStorage lock poisoned");
            for (k, v) in by_cf[idx].drain(..) {
                table.insert(k, v);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get() {
        let storage = MemStorage::new();
        storage.put(ColumnFamily::Meta, b"seq.uri", b"\x00\x00\x00\x00\x00\x00\x00\x01").unwrap();
        assert_eq!(
            storage.get(ColumnFamily::Meta, b"seq.uri").unwrap(),
            Some(b"\x00\x00\x00\x00\x00\x00\x00\x01".to_vec())
        );
        assert_eq!(storage.get(ColumnFamily::Meta, b"seq.bnode").unwrap(), None);
    }

    #[test]
    fn prefix_scan_is_ordered_and_scoped_to_prefix() {
        let storage = MemStorage::new();
        storage.put(ColumnFamily::Str2Id, b"\x01a", b"1").unwrap();
        storage.put(ColumnFamily::Str2Id, b"\x01b", b"2").unwrap();
        storage.put(ColumnFamily::Str2Id, b"\x02x", b"3").unwrap();
        let got = storage.scan_prefix(ColumnFamily::Str2Id, b"\x01").unwrap();
        assert_eq!(
            got,
            vec![(b"\x01a".to_vec(), b"1".to_vec()), (b"\x01b".to_vec(), b"2".to_vec())]
        );
    }

    #[test]
    fn batch_applies_atomically_across_column_families() {
        let storage = MemStorage::new();
        let mut batch = WriteBatch::new();
        batch.put(ColumnFamily::Str2Id, b"k".to_vec(), b"\x00\x00\x00\x00\x00\x00\x00\x2a".to_vec());
        batch.put(ColumnFamily::Id2Str, b"\x00\x00\x00\x00\x00\x00\x00\x2a".to_vec(), b"k".to_vec());
        storage.write(batch).unwrap();
        assert!(storage.get(ColumnFamily::Str2Id, b"k").unwrap().is_some());
        assert!(storage
            .get(ColumnFamily::Id2Str, b"\x00\x00\x00\x00\x00\x00\x00\x2a")
            .unwrap()
            .is_some());
    }
}
