//! Dense weight tables and their binary file format.
//!
//! Layout (little-endian, no padding):
//! - `u32` number of tables
//! - per table: `u64` element count `n`, then `n` `f32` weights in index order

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::ops::{Index, IndexMut};
use std::path::Path;

use tracing::debug;

#[derive(thiserror::Error, Debug)]
pub enum WeightError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("weight file truncated in table {table}")]
    Truncated { table: usize },
    #[error("table {table} too large for this platform ({len} weights)")]
    TooLarge { table: usize, len: u64 },
    #[error("too many tables to save: {0}")]
    TooManyTables(usize),
}

/// Weights decoded per read.
const READ_CHUNK: usize = 4096;

/// A fixed-size dense array of `f32` weights, zero-initialized.
#[derive(Clone, PartialEq)]
pub struct WeightTable {
    values: Box<[f32]>,
}

impl WeightTable {
    pub fn new(len: usize) -> Self { Self { values: vec![0.0; len].into_boxed_slice() } }

    #[inline]
    pub fn len(&self) -> usize { self.values.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    #[inline]
    pub fn as_slice(&self) -> &[f32] { &self.values }

    /// Write the length-prefixed table.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(&(self.values.len() as u64).to_le_bytes())?;
        for &w in self.values.iter() {
            out.write_all(&w.to_le_bytes())?;
        }
        Ok(())
    }

    /// Read one length-prefixed table; `table` only labels errors.
    pub fn read_from<R: Read>(input: &mut R, table: usize) -> Result<Self, WeightError> {
        let mut len_bytes = [0u8; 8];
        read_exact_or_truncated(input, &mut len_bytes, table)?;
        let len = u64::from_le_bytes(len_bytes);
        let n: usize = usize::try_from(len)
            .ok()
            .filter(|n| n.checked_mul(4).is_some())
            .ok_or(WeightError::TooLarge { table, len })?;

        // The header is untrusted: grow with the data actually read.
        let mut values = Vec::with_capacity(n.min(READ_CHUNK));
        let mut buf = vec![0u8; 4 * READ_CHUNK];
        let mut remaining = n;
        while remaining > 0 {
            let chunk = remaining.min(READ_CHUNK);
            let bytes = &mut buf[..chunk * 4];
            read_exact_or_truncated(input, bytes, table)?;
            values.extend(
                bytes
                    .chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            );
            remaining -= chunk;
        }
        Ok(Self { values: values.into_boxed_slice() })
    }
}

impl Index<usize> for WeightTable {
    type Output = f32;

    #[inline]
    fn index(&self, idx: usize) -> &f32 { &self.values[idx] }
}

impl IndexMut<usize> for WeightTable {
    #[inline]
    fn index_mut(&mut self, idx: usize) -> &mut f32 { &mut self.values[idx] }
}

impl std::fmt::Debug for WeightTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WeightTable(len={})", self.values.len())
    }
}

fn read_exact_or_truncated<R: Read>(input: &mut R, buf: &mut [u8], table: usize) -> Result<(), WeightError> {
    input.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => WeightError::Truncated { table },
        _ => WeightError::Io(e),
    })
}

/// Encode all tables into a writer.
pub fn write_tables<W: Write>(out: &mut W, tables: &[WeightTable]) -> Result<(), WeightError> {
    let count: u32 = tables
        .len()
        .try_into()
        .map_err(|_| WeightError::TooManyTables(tables.len()))?;
    out.write_all(&count.to_le_bytes())?;
    for table in tables {
        table.write_to(out)?;
    }
    Ok(())
}

/// Decode all tables from a reader.
pub fn read_tables<R: Read>(input: &mut R) -> Result<Vec<WeightTable>, WeightError> {
    let mut count_bytes = [0u8; 4];
    read_exact_or_truncated(input, &mut count_bytes, 0)?;
    let count = u32::from_le_bytes(count_bytes) as usize;
    (0..count).map(|table| WeightTable::read_from(input, table)).collect()
}

/// Save tables to `path`, truncating any existing file.
pub fn save_tables<P: AsRef<Path>>(path: P, tables: &[WeightTable]) -> Result<(), WeightError> {
    let path = path.as_ref();
    let mut out = BufWriter::new(File::create(path)?);
    write_tables(&mut out, tables)?;
    out.flush()?;
    debug!(path = %path.display(), tables = tables.len(), "saved weight tables");
    Ok(())
}

/// Load all tables from `path`.
pub fn load_tables<P: AsRef<Path>>(path: P) -> Result<Vec<WeightTable>, WeightError> {
    let path = path.as_ref();
    let mut input = BufReader::new(File::open(path)?);
    let tables = read_tables(&mut input)?;
    debug!(path = %path.display(), tables = tables.len(), "loaded weight tables");
    Ok(tables)
}
