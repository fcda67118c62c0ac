//! Two column families over `Storage` (`str2id`, `id2str`) with a
//! lock-free read path and a single-writer create-if-absent write path.

use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::id_codec;
use crate::inline;
use crate::options::SequenceOptions;
use crate::sequence::{SequenceAllocator, SequenceKind};
use crate::storage::{ColumnFamily, Storage, WriteBatch};
use crate::term::Term;
use crate::term_codec;
use crate::util::coding::{decode_fixed_64_be, put_fixed_64_be};

/// The outcome of a read-only id lookup: distinct from `Result` because a
/// miss is not an error (per the error taxonomy's `NotFound` row).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Found(u64),
    NotFound,
}

impl Lookup {
    pub fn into_option(self) -> Option<u64> {
        match self {
            Lookup::Found(id) => Some(id),
            Lookup::NotFound => None,
        }
    }
}

pub struct DictionaryStore {
    storage: Arc<dyn Storage>,
    // Guards the allocate-then-batch-write sequence; readers never take it.
    writer: Mutex<()>,
    alloc_uri: SequenceAllocator,
    alloc_bnode: SequenceAllocator,
    alloc_literal: SequenceAllocator,
}

fn id_key(id: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8);
    put_fixed_64_be(&mut buf, id);
    buf
}

impl DictionaryStore {
    pub fn open(storage: Arc<dyn Storage>, opts: &SequenceOptions) -> Result<Self> {
        Ok(DictionaryStore {
            alloc_uri: SequenceAllocator::open(
                storage.clone(),
                SequenceKind::Uri,
                opts.safety_margin,
                opts.flush_interval,
            )?,
            alloc_bnode: SequenceAllocator::open(
                storage.clone(),
                SequenceKind::BNode,
                opts.safety_margin,
                opts.flush_interval,
            )?,
            alloc_literal: SequenceAllocator::open(
                storage.clone(),
                SequenceKind::Literal,
                opts.safety_margin,
                opts.flush_interval,
            )?,
            storage,
            writer: Mutex::new(()),
        })
    }

    fn allocator_for_tag(&self, tag: u8) -> &SequenceAllocator {
        match tag {
            id_codec::TAG_URI => &self.alloc_uri,
            id_codec::TAG_BNODE => &self.alloc_bnode,
            id_codec::TAG_LITERAL => &self.alloc_literal,
            other => unreachable!("term dictionary_tag() never returns {}", other),
        }
    }

    /// Encodes `term` and probes `str2id` without taking the writer lock;
    /// inline-eligible literals are resolved without touching storage.
    pub fn lookup_id(&self, term: &Term) -> Result<Lookup> {
        if let Some(id) = inline::try_inline_encode(term) {
            return Ok(Lookup::Found(id));
        }
        let key = term_codec::encode(term)?;
        match self.storage.get(ColumnFamily::Str2Id, &key)? {
            Some(bytes) => Ok(Lookup::Found(decode_fixed_64_be(&bytes))),
            None => Ok(Lookup::NotFound),
        }
    }

    /// Resolves an id back to its term. Inline ids are decoded directly;
    /// dictionary ids are looked up in `id2str`.
    pub fn lookup_term(&self, id: u64) -> Result<Option<Term>> {
        if id_codec::is_inline(id) {
            return Ok(inline::try_inline_decode(id));
        }
        match self.storage.get(ColumnFamily::Id2Str, &id_key(id))? {
            Some(bytes) => Ok(Some(term_codec::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Returns `term`'s id, allocating and durably recording one if this is
    /// the first time `term` has been seen.
    pub fn get_or_create_id(&self, term: &Term) -> Result<u64> {
        if let Some(id) = inline::try_inline_encode(term) {
            return Ok(id);
        }
        let key = term_codec::encode(term)?;
        if let Some(bytes) = self.storage.get(ColumnFamily::Str2Id, &key)? {
            return Ok(decode_fixed_64_be(&bytes));
        }
        let _guard = self.writer.lock().expect("dictionary writer lock poisoned");
        // Re-check under the lock: another thread may have created this
        // exact term while we were waiting to acquire it.
        if let Some(bytes) = self.storage.get(ColumnFamily::Str2Id, &key)? {
            return Ok(decode_fixed_64_be(&bytes));
        }
        let tag = term.dictionary_tag();
        let seq = self.allocator_for_tag(tag).next()?;
        let id = id_codec::encode(tag, seq);
        let term_bytes = term_codec::encode(term)?;
        let mut batch = WriteBatch::new();
        batch.put(ColumnFamily::Str2Id, key, id_key(id));
        batch.put(ColumnFamily::Id2Str, id_key(id), term_bytes);
        self.storage.write(batch)?;
        Ok(id)
    }

    /// Batch variant of `get_or_create_id`: acquires the writer once,
    /// allocates a contiguous run of ids per tag for the misses, and commits
    /// a single batch. Output order matches input order.
    pub fn get_or_create_ids(&self, terms: &[Term]) -> Result<Vec<u64>> {
        let mut results: Vec<Option<u64>> = vec![None; terms.len()];
        let mut misses = Vec::new();

        for (i, term) in terms.iter().enumerate() {
            if let Some(id) = inline::try_inline_encode(term) {
                results[i] = Some(id);
                continue;
            }
            let key = term_codec::encode(term)?;
            if let Some(bytes) = self.storage.get(ColumnFamily::Str2Id, &key)? {
                results[i] = Some(decode_fixed_64_be(&bytes));
            } else {
                misses.push((i, key));
            }
        }

        if misses.is_empty() {
            return Ok(results.into_iter().map(|r| r.unwrap()).collect());
        }

        let _guard = self.writer.lock().expect("dictionary writer lock poisoned");
        let mut batch = WriteBatch::new();
        let mut still_missing = Vec::new();
        for (i, key) in misses {
            if let Some(bytes) = self.storage.get(ColumnFamily::Str2Id, &key)? {
                results[i] = Some(decode_fixed_64_be(&bytes));
            } else {
                still_missing.push((i, key));
            }
        }
        // Several indices may share the same key (the same term appearing more
        // than once in this batch) — allocate one id per distinct key, not one
        // per occurrence, or later puts in the batch would silently orphan the
        // ids allocated for earlier occurrences.
        let mut allocated: std::collections::HashMap<Vec<u8>, u64> = std::collections::HashMap::new();
        for (i, key) in still_missing {
            if let Some(&id) = allocated.get(&key) {
                results[i] = Some(id);
                continue;
            }
            let term = &terms[i];
            let tag = term.dictionary_tag();
            let seq = self.allocator_for_tag(tag).next()?;
            let id = id_codec::encode(tag, seq);
            let term_bytes = term_codec::encode(term)?;
            batch.put(ColumnFamily::Str2Id, key.clone(), id_key(id));
            batch.put(ColumnFamily::Id2Str, id_key(id), term_bytes);
            allocated.insert(key, id);
            results[i] = Some(id);
        }
        if !batch.is_empty() {
            self.storage.write(batch)?;
        }
        Ok(results.into_iter().map(|r| r.unwrap()).collect())
    }

    /// Forces a checkpoint of every sequence counter. Intended for graceful
    /// shutdown.
    pub fn close(&self) {
        self.alloc_uri.close();
        self.alloc_bnode.close();
        self.alloc_literal.close();
    }
}
