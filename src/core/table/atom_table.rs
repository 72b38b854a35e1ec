//! Process-wide atom interning table with permanent storage semantics.
//!
//! Atoms are interned strings identified by their table index. Once
//! interned, an atom is never removed and its index never changes.
//!
//! # Concurrency
//!
//! Lookups of existing names go through a concurrent map and never touch the
//! table lock. Only the append of a new name takes the narrow write lock over
//! block storage; the name is re-checked under that lock and the mapping is
//! published only after the slot has been written.
//!
//! # Memory Considerations
//!
//! Atoms are **never deallocated**. Each table has a fixed capacity chosen at
//! creation ([`MAX_ATOM_COUNT`] by default) and every name is limited to
//! [`MAX_ATOM_CHARS`] characters. Avoid creating atoms from untrusted input.

use dashmap::DashMap;
use parking_lot::RwLock;
use parking_lot::RwLockReadGuard;
use parking_lot::RwLockWriteGuard;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::sync::OnceLock;

use crate::consts::MAX_ATOM_CHARS;
use crate::consts::MAX_ATOM_COUNT;
use crate::error::fatal;

/// The process-wide table, created on first use.
static GLOBAL: OnceLock<AtomTable> = OnceLock::new();

/// Names that always occupy the first slots of every table, in order.
const WELL_KNOWN: [&str; 4] = ["", "true", "false", "undefined"];

// -----------------------------------------------------------------------------
// Atom Table Error
// -----------------------------------------------------------------------------

/// Errors returned from atom table lookup or insertion operations.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[non_exhaustive]
pub enum AtomTableError {
  /// The name exceeds [`MAX_ATOM_CHARS`] characters.
  AtomTooLarge,
  /// The table has reached its capacity.
  TooManyAtoms,
  /// The requested index has not been allocated.
  AtomNotFound,
}

impl Display for AtomTableError {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    match self {
      Self::AtomTooLarge => f.write_str("atom too large"),
      Self::TooManyAtoms => f.write_str("too many atoms"),
      Self::AtomNotFound => f.write_str("atom not found"),
    }
  }
}

impl Error for AtomTableError {}

// -----------------------------------------------------------------------------
// Atom Table
// -----------------------------------------------------------------------------

/// Thread-safe atom interning table with permanent storage.
///
/// The table is made of two parts:
///
/// 1. **Index map**: a [`DashMap`] from name to index, read without locking
///    the table.
/// 2. **Block array**: fixed 1024-slot blocks holding the leaked names,
///    guarded by a [`RwLock`] that is only written when appending.
///
/// Every table starts with the well-known atoms `""`, `"true"`, `"false"`
/// and `"undefined"` at indices 0 to 3.
pub struct AtomTable {
  map: DashMap<&'static str, u32>,
  inner: RwLock<Table>,
}

impl AtomTable {
  /// Creates a table with the default capacity of [`MAX_ATOM_COUNT`].
  #[inline]
  pub fn new() -> Self {
    Self::with_capacity(MAX_ATOM_COUNT)
  }

  /// Creates a table holding at most `capacity` atoms.
  ///
  /// The capacity is raised to fit the well-known atoms if needed.
  pub fn with_capacity(capacity: usize) -> Self {
    let this: Self = Self {
      map: DashMap::with_capacity(Block::SIZE),
      inner: RwLock::new(Table::new(capacity.max(WELL_KNOWN.len()))),
    };

    for (expected, name) in WELL_KNOWN.iter().enumerate() {
      match this.intern(name) {
        Ok(index) if index as usize == expected => {}
        Ok(_) => fatal!("invalid well-known atom"),
        Err(error) => fatal!(error),
      }
    }

    this
  }

  /// Returns the process-wide table.
  ///
  /// The table is created with [`MAX_ATOM_COUNT`] capacity unless
  /// [`init_global`] ran first. It is never torn down.
  ///
  /// [`init_global`]: Self::init_global
  #[inline]
  pub fn global() -> &'static Self {
    GLOBAL.get_or_init(Self::new)
  }

  /// Creates the process-wide table with the given capacity.
  ///
  /// Returns `false` if the table already existed, in which case the
  /// existing capacity is kept.
  pub fn init_global(capacity: usize) -> bool {
    let mut created: bool = false;

    GLOBAL.get_or_init(|| {
      created = true;
      Self::with_capacity(capacity)
    });

    created
  }

  /// Returns the maximum number of atoms this table can hold.
  #[inline]
  pub fn capacity(&self) -> usize {
    self.inner.read().max
  }

  /// Returns the number of interned atoms.
  #[inline]
  pub fn len(&self) -> usize {
    self.inner.read().len
  }

  /// Returns `true` if the table holds no atoms.
  ///
  /// Never the case in practice since the well-known atoms are always
  /// present.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Interns a name and returns its index.
  ///
  /// Returns the existing index when the name is already interned.
  ///
  /// # Errors
  ///
  /// Returns [`AtomTableError::AtomTooLarge`] if the name exceeds
  /// [`MAX_ATOM_CHARS`] characters.
  ///
  /// Returns [`AtomTableError::TooManyAtoms`] if the table is full.
  pub fn intern(&self, name: &str) -> Result<u32, AtomTableError> {
    // -------------------------------------------------------------------------
    // 1. Fast Path - Existing Atom
    // -------------------------------------------------------------------------

    if let Some(index) = self.map.get(name) {
      return Ok(*index);
    }

    // -------------------------------------------------------------------------
    // 2. Slow Path - New Atom
    // -------------------------------------------------------------------------

    let mut guard: RwLockWriteGuard<'_, Table> = self.inner.write();

    // Another thread may have appended the same name while we waited.
    if let Some(index) = self.map.get(name) {
      return Ok(*index);
    }

    if name.chars().count() > MAX_ATOM_CHARS {
      return Err(AtomTableError::AtomTooLarge);
    }

    let len: usize = guard.len;

    if len >= guard.max {
      return Err(AtomTableError::TooManyAtoms);
    }

    if len >= guard.cap() {
      guard.arr.push(Block::new());
    }

    let term: &'static str = Box::leak(Box::from(name));

    guard.arr[len >> Block::BITS].inner[len & Block::MASK] = term;
    guard.len += 1;

    // Publish only once the slot is readable through `lookup`.
    self.map.insert(term, len as u32);

    drop(guard);

    Ok(len as u32)
  }

  /// Returns the name stored at `index`.
  ///
  /// # Errors
  ///
  /// Returns [`AtomTableError::AtomNotFound`] if `index` is out of range.
  pub fn lookup(&self, index: u32) -> Result<&'static str, AtomTableError> {
    let guard: RwLockReadGuard<'_, Table> = self.inner.read();
    let index: usize = index as usize;

    if index >= guard.len {
      return Err(AtomTableError::AtomNotFound);
    }

    Ok(guard.arr[index >> Block::BITS].inner[index & Block::MASK])
  }

  /// Returns `true` if `name` has been interned.
  #[inline]
  pub fn exists(&self, name: &str) -> bool {
    self.map.contains_key(name)
  }

  /// Returns the index of `name`, or `None` if it has not been interned.
  #[inline]
  pub fn index_of(&self, name: &str) -> Option<u32> {
    self.map.get(name).map(|index| *index)
  }
}

impl Default for AtomTable {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}

impl Debug for AtomTable {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    let items: BTreeMap<u32, &'static str> = self
      .map
      .iter()
      .map(|entry| (*entry.value(), *entry.key()))
      .collect();

    f.debug_struct("AtomTable")
      .field("data", &items)
      .field("size", &items.len())
      .finish()
  }
}

// -----------------------------------------------------------------------------
// Atom Table - Table
// -----------------------------------------------------------------------------

/// Block storage guarded by the [`AtomTable`] lock.
struct Table {
  /// Blocks holding the interned names.
  arr: Vec<Block>,
  /// Total number of interned atoms across all blocks.
  len: usize,
  /// Maximum number of atoms.
  max: usize,
}

impl Table {
  fn new(max: usize) -> Self {
    let blocks: usize = max.div_ceil(Block::SIZE);
    let mut arr: Vec<Block> = Vec::with_capacity(blocks);

    arr.push(Block::new());

    Self { arr, len: 0, max }
  }

  /// Returns the number of slots across all allocated blocks.
  #[inline]
  fn cap(&self) -> usize {
    self.arr.len() * Block::SIZE
  }
}

// -----------------------------------------------------------------------------
// Atom Table - Block
// -----------------------------------------------------------------------------

/// Fixed-size storage block for atom names.
#[repr(transparent)]
struct Block {
  inner: Box<[&'static str; Self::SIZE]>,
}

impl Block {
  /// Bit width for block-local slot indexing.
  const BITS: u32 = 10;

  /// Number of atom slots per block (2^10 = 1024).
  const SIZE: usize = 1 << Self::BITS;

  /// Bitmask for extracting the block-local slot index.
  const MASK: usize = Self::SIZE - 1;

  #[inline]
  fn new() -> Self {
    Self {
      inner: Box::new([""; Self::SIZE]),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Barrier;
  use std::thread;
  use triomphe::Arc;

  use crate::consts::MAX_ATOM_CHARS;
  use crate::core::table::AtomTable;
  use crate::core::table::AtomTableError;

  #[test]
  fn test_well_known_atoms() {
    let table: AtomTable = AtomTable::with_capacity(16);

    assert_eq!(table.lookup(0), Ok(""));
    assert_eq!(table.lookup(1), Ok("true"));
    assert_eq!(table.lookup(2), Ok("false"));
    assert_eq!(table.lookup(3), Ok("undefined"));
    assert_eq!(table.len(), 4);
  }

  #[test]
  fn test_intern_is_idempotent() {
    let table: AtomTable = AtomTable::with_capacity(16);
    let first: u32 = table.intern("hello").unwrap();
    let again: u32 = table.intern("hello").unwrap();

    assert_eq!(first, 4);
    assert_eq!(first, again);
    assert_eq!(table.lookup(first), Ok("hello"));
  }

  #[test]
  fn test_exists_and_index_of() {
    let table: AtomTable = AtomTable::with_capacity(16);

    assert!(!table.exists("missing"));
    assert_eq!(table.index_of("missing"), None);

    let index: u32 = table.intern("present").unwrap();

    assert!(table.exists("present"));
    assert_eq!(table.index_of("present"), Some(index));
    assert_eq!(table.index_of("true"), Some(1));
  }

  #[test]
  fn test_lookup_out_of_range() {
    let table: AtomTable = AtomTable::with_capacity(16);

    assert_eq!(table.lookup(4), Err(AtomTableError::AtomNotFound));
    assert_eq!(table.lookup(u32::MAX), Err(AtomTableError::AtomNotFound));
  }

  #[test]
  fn test_atom_too_large() {
    let table: AtomTable = AtomTable::with_capacity(16);
    let limit: String = "a".repeat(MAX_ATOM_CHARS);
    let large: String = "a".repeat(MAX_ATOM_CHARS + 1);

    assert!(table.intern(&limit).is_ok());
    assert_eq!(table.intern(&large), Err(AtomTableError::AtomTooLarge));
    assert!(!table.exists(&large));
  }

  #[test]
  fn test_atom_length_counts_chars() {
    let table: AtomTable = AtomTable::with_capacity(16);
    let multibyte: String = "é".repeat(MAX_ATOM_CHARS);

    assert!(table.intern(&multibyte).is_ok());
  }

  #[test]
  fn test_capacity_exhaustion() {
    let table: AtomTable = AtomTable::with_capacity(6);

    assert_eq!(table.intern("a"), Ok(4));
    assert_eq!(table.intern("b"), Ok(5));
    assert_eq!(table.intern("c"), Err(AtomTableError::TooManyAtoms));

    // Existing names still resolve when full.
    assert_eq!(table.intern("a"), Ok(4));
    assert_eq!(table.len(), 6);
  }

  #[test]
  fn test_grows_across_blocks() {
    let table: AtomTable = AtomTable::with_capacity(4096);

    for index in 0..2000 {
      table.intern(&format!("atom_{index}")).unwrap();
    }

    let index: u32 = table.index_of("atom_1999").unwrap();

    assert_eq!(table.lookup(index), Ok("atom_1999"));
    assert_eq!(table.len(), 2004);
  }

  #[test]
  fn test_global_table_is_shared() {
    let index: u32 = AtomTable::global().intern("global_shared").unwrap();

    assert!(!AtomTable::init_global(8));
    assert_eq!(AtomTable::global().index_of("global_shared"), Some(index));
  }

  #[test]
  fn stress_concurrent_same_atom() {
    let table: Arc<AtomTable> = Arc::new(AtomTable::new());
    let barrier: Arc<Barrier> = Arc::new(Barrier::new(64));

    let threads: Vec<_> = (0..64)
      .map(|_| {
        let table: Arc<AtomTable> = Arc::clone(&table);
        let barrier: Arc<Barrier> = Arc::clone(&barrier);

        thread::spawn(move || {
          barrier.wait();
          table.intern("test").unwrap()
        })
      })
      .collect();

    let indices: Vec<u32> = threads
      .into_iter()
      .map(|handle| handle.join().unwrap())
      .collect();

    assert!(indices.windows(2).all(|window| window[0] == window[1]));
    assert_eq!(table.len(), 5);
  }

  #[test]
  fn stress_concurrent_distinct_atoms() {
    let table: Arc<AtomTable> = Arc::new(AtomTable::new());

    let threads: Vec<_> = (0..8)
      .map(|thread| {
        let table: Arc<AtomTable> = Arc::clone(&table);

        thread::spawn(move || {
          for index in 0..256 {
            let name: String = format!("t{thread}_{index}");
            let slot: u32 = table.intern(&name).unwrap();

            assert_eq!(table.lookup(slot), Ok(name.as_str()));
          }
        })
      })
      .collect();

    for handle in threads {
      handle.join().unwrap();
    }

    assert_eq!(table.len(), 4 + 8 * 256);
  }
}
