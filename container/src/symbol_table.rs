//! Open-addressing map from names to 64-bit values.
//!
//! The assembler uses it to intern label names to label identifiers. Buckets
//! are probed linearly from `fnv1(key) % capacity`, and the table is grown
//! before an insertion would push the load factor above 0.75.

use log::trace;

use crate::ContainerError;

/// Capacities used while growing, before falling back to `2 * old + 1`.
const CAPACITY_PRIMES: [usize; 26] = [
    53, 97, 193, 389, 769, 1543, 3079, 6151, 12289, 24593, 49157, 98317, 196613, 393241, 786433,
    1572869, 3145739, 6291469, 12582917, 25165843, 50331653, 100663319, 201326611, 402653189,
    805306457, 1610612741,
];

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Numerator and denominator of the maximum load factor (0.75).
const MAX_LOAD_NUM: usize = 3;
const MAX_LOAD_DEN: usize = 4;

/// FNV-1 64-bit hash: multiply, then xor each byte.
pub fn fnv1(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &b| {
        hash.wrapping_mul(FNV_PRIME) ^ b as u64
    })
}

/// An occupied bucket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolEntry {
    key: String,
    pub value: u64,
}

impl SymbolEntry {
    pub fn key(&self) -> &str {
        &self.key
    }
}

#[derive(Debug)]
pub struct SymbolTable {
    buckets: Vec<Option<SymbolEntry>>,
    count: usize,
    /// Index into `CAPACITY_PRIMES` of the next capacity to grow to.
    next_prime: usize,
}

impl SymbolTable {
    /// Creates an empty table with the smallest capacity.
    pub fn new() -> Result<Self, ContainerError> {
        Ok(SymbolTable {
            buckets: allocate_buckets(CAPACITY_PRIMES[0])?,
            count: 0,
            next_prime: 1,
        })
    }

    /// Returns the number of keys in the table.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the number of buckets.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    pub fn load_factor(&self) -> f64 {
        self.count as f64 / self.capacity() as f64
    }

    /// Returns the value bound to `key`.
    pub fn find(&self, key: &str) -> Option<u64> {
        match self.probe(key) {
            Probe::Found(index) => self.buckets[index].as_ref().map(|e| e.value),
            Probe::Vacant(_) | Probe::Full => None,
        }
    }

    /// Binds `key` to `value`, replacing any previous value, and returns the
    /// bound entry.
    pub fn insert(&mut self, key: &str, value: u64) -> Result<&mut SymbolEntry, ContainerError> {
        let index = match self.probe(key) {
            Probe::Found(index) => index,
            _ => {
                if (self.count + 1) * MAX_LOAD_DEN > self.capacity() * MAX_LOAD_NUM {
                    self.grow()?;
                }
                let index = match self.probe(key) {
                    Probe::Vacant(index) => index,
                    Probe::Found(_) | Probe::Full => return Err(ContainerError::SymbolTableFull),
                };
                self.buckets[index] = Some(SymbolEntry {
                    key: key.to_owned(),
                    value,
                });
                self.count += 1;
                index
            }
        };

        let entry = self.buckets[index]
            .as_mut()
            .ok_or(ContainerError::SymbolTableFull)?;
        entry.value = value;
        Ok(entry)
    }

    /// Rehashes every entry into the next larger capacity.
    ///
    /// If the new buckets cannot be allocated the table is left unchanged.
    pub fn grow(&mut self) -> Result<(), ContainerError> {
        let new_capacity = match CAPACITY_PRIMES.get(self.next_prime) {
            Some(&prime) => prime,
            None => self
                .capacity()
                .checked_mul(2)
                .and_then(|c| c.checked_add(1))
                .ok_or(ContainerError::AllocationFailed)?,
        };
        let buckets = rehash(&self.buckets, new_capacity)?;

        trace!(
            "Grew symbol table from {} to {} buckets",
            self.capacity(),
            new_capacity
        );
        self.buckets = buckets;
        self.next_prime += 1;
        Ok(())
    }

    /// Iterates over the occupied entries in bucket order.
    pub fn iter(&self) -> impl Iterator<Item = &SymbolEntry> {
        self.buckets.iter().filter_map(Option::as_ref)
    }

    fn probe(&self, key: &str) -> Probe {
        let capacity = self.capacity();
        let start = (fnv1(key.as_bytes()) % capacity as u64) as usize;
        let mut index = start;
        loop {
            match &self.buckets[index] {
                None => return Probe::Vacant(index),
                Some(entry) if entry.key == key => return Probe::Found(index),
                Some(_) => {}
            }
            index = (index + 1) % capacity;
            if index == start {
                return Probe::Full;
            }
        }
    }
}

enum Probe {
    Found(usize),
    Vacant(usize),
    Full,
}

fn allocate_buckets(capacity: usize) -> Result<Vec<Option<SymbolEntry>>, ContainerError> {
    let mut buckets = Vec::new();
    buckets
        .try_reserve_exact(capacity)
        .map_err(|_| ContainerError::AllocationFailed)?;
    buckets.resize_with(capacity, || None);
    Ok(buckets)
}

/// Copies every occupied bucket of `entries` into a new table of `capacity`
/// buckets. `entries` is only read, so a failure leaves it untouched.
fn rehash(
    entries: &[Option<SymbolEntry>],
    capacity: usize,
) -> Result<Vec<Option<SymbolEntry>>, ContainerError> {
    let mut buckets = allocate_buckets(capacity)?;
    for entry in entries.iter().flatten() {
        let index = vacant_bucket(&buckets, &entry.key).ok_or(ContainerError::SymbolTableFull)?;
        buckets[index] = Some(entry.clone());
    }
    Ok(buckets)
}

/// Finds the first free bucket for `key` in a table being rebuilt.
fn vacant_bucket(buckets: &[Option<SymbolEntry>], key: &str) -> Option<usize> {
    let capacity = buckets.len();
    let start = (fnv1(key.as_bytes()) % capacity as u64) as usize;
    (0..capacity)
        .map(|step| (start + step) % capacity)
        .find(|&index| buckets[index].is_none())
}
