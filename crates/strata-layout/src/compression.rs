//! In-place compression of filled buffers.
//!
//! A committed buffer can be compressed before it is shipped and
//! decompressed in place on arrival. Two modes exist:
//! - Horizontal: the used bytes are compressed as one block written at
//!   offset 0. Column layouts first pack their columns back to back.
//! - Vertical: every column is compressed on its own and written at its
//!   column offset. Only column layouts support this mode.
//!
//! ```text
//! column layout, vertical
//! +-----------+------+-----------+------+-----------+------+
//! | col 0 (z) | 0000 | col 1 (z) | 0000 | col 2 (z) | 0000 |
//! +-----------+------+-----------+------+-----------+------+
//! ^ offsets[0]       ^ offsets[1]       ^ offsets[2]
//! ```
//!
//! Bytes past the compressed data are zeroed. While compressed, the buffer
//! must not be read through a view or bound layout.

use crate::layout::{LayoutKind, MemoryLayout};
use std::sync::Arc;
use strata_buffer::TupleBuffer;
use strata_common::{LayoutStrategy, Result, StrataError};
use tracing::debug;

/// Codec used to compress a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionAlgorithm {
    /// Uncompressed.
    None,
    /// LZ4 block format.
    Lz4,
    /// Snappy raw format.
    Snappy,
}

impl std::fmt::Display for CompressionAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CompressionAlgorithm::None => "NONE",
            CompressionAlgorithm::Lz4 => "LZ4",
            CompressionAlgorithm::Snappy => "SNAPPY",
        };
        write!(f, "{}", name)
    }
}

/// Whether a buffer is compressed as one block or column by column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionMode {
    Horizontal,
    Vertical,
}

impl CompressionMode {
    /// Returns the natural mode of a layout strategy.
    pub fn default_for(strategy: LayoutStrategy) -> Self {
        match strategy {
            LayoutStrategy::Row => CompressionMode::Horizontal,
            LayoutStrategy::Column => CompressionMode::Vertical,
        }
    }
}

impl std::fmt::Display for CompressionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompressionMode::Horizontal => write!(f, "HORIZONTAL"),
            CompressionMode::Vertical => write!(f, "VERTICAL"),
        }
    }
}

/// A committed buffer that can be compressed and decompressed in place.
///
/// The record count is taken from the buffer's metadata on creation. The
/// buffer handle must be the only one alive whenever its bytes change.
pub struct CompressedBuffer<'b> {
    layout: Arc<MemoryLayout>,
    buffer: &'b mut TupleBuffer,
    number_of_records: usize,
    algorithm: CompressionAlgorithm,
    mode: CompressionMode,
    /// One entry per compressed block: one for horizontal, one per column
    /// for vertical. Empty while uncompressed.
    compressed_sizes: Vec<usize>,
}

impl<'b> CompressedBuffer<'b> {
    pub(crate) fn new(layout: Arc<MemoryLayout>, buffer: &'b mut TupleBuffer) -> Result<Self> {
        layout.check_buffer(buffer)?;
        let number_of_records = layout.committed_records(buffer)?;
        let mode = CompressionMode::default_for(layout.strategy());
        Ok(Self {
            layout,
            buffer,
            number_of_records,
            algorithm: CompressionAlgorithm::None,
            mode,
            compressed_sizes: Vec::new(),
        })
    }

    #[inline]
    pub fn layout(&self) -> &Arc<MemoryLayout> {
        &self.layout
    }

    /// Returns the underlying buffer.
    #[inline]
    pub fn buffer(&self) -> &TupleBuffer {
        &*self.buffer
    }

    #[inline]
    pub fn number_of_records(&self) -> usize {
        self.number_of_records
    }

    /// Returns the algorithm the buffer is currently compressed with.
    #[inline]
    pub fn algorithm(&self) -> CompressionAlgorithm {
        self.algorithm
    }

    /// Returns the mode used by [`compress`](Self::compress).
    #[inline]
    pub fn mode(&self) -> CompressionMode {
        self.mode
    }

    #[inline]
    pub fn is_compressed(&self) -> bool {
        self.algorithm != CompressionAlgorithm::None
    }

    /// Returns the size of the records' data when uncompressed.
    #[inline]
    pub fn original_size(&self) -> usize {
        self.layout.record_size() * self.number_of_records
    }

    /// Returns the sizes of the compressed blocks.
    #[inline]
    pub fn compressed_sizes(&self) -> &[usize] {
        &self.compressed_sizes
    }

    /// Returns the start offset of every block: `[0]` for row layouts and
    /// the column offsets for column layouts.
    pub fn offsets(&self) -> Vec<usize> {
        match self.layout.column_offsets() {
            Some(offsets) => offsets.to_vec(),
            None => vec![0],
        }
    }

    /// Returns original size divided by compressed size, or 1.0 while the
    /// buffer is uncompressed.
    pub fn compression_ratio(&self) -> f64 {
        let compressed: usize = self.compressed_sizes.iter().sum();
        if compressed == 0 {
            return 1.0;
        }
        self.original_size() as f64 / compressed as f64
    }

    /// Compresses the buffer with `algorithm` in the current mode.
    pub fn compress(&mut self, algorithm: CompressionAlgorithm) -> Result<()> {
        self.compress_with(algorithm, self.mode)
    }

    /// Compresses the buffer with `algorithm` in `mode`.
    ///
    /// Fails without touching the buffer if it is already compressed, if it
    /// holds no records, if `mode` is vertical on a row layout, or if the
    /// compressed data would be larger than the original.
    pub fn compress_with(&mut self, algorithm: CompressionAlgorithm, mode: CompressionMode) -> Result<()> {
        if self.is_compressed() {
            return Err(StrataError::CompressionError(format!(
                "cannot compress from {} to {}",
                self.algorithm, algorithm
            )));
        }
        if mode == CompressionMode::Vertical && self.layout.strategy() == LayoutStrategy::Row {
            return Err(StrataError::CompressionError(
                "vertical compression cannot be performed on a row layout".to_string(),
            ));
        }
        if algorithm == CompressionAlgorithm::None {
            self.mode = mode;
            return Ok(());
        }
        if self.number_of_records == 0 {
            return Err(StrataError::CompressionError(
                "buffer holds no records".to_string(),
            ));
        }

        let original_size = self.original_size();
        let regions = self.regions();
        let data = self.buffer.data_mut()?;
        let blocks = match mode {
            CompressionMode::Horizontal => {
                let packed = pack(data, &regions);
                vec![encode(algorithm, &packed)?]
            }
            CompressionMode::Vertical => regions
                .iter()
                .map(|&(start, len)| encode(algorithm, &data[start..start + len]))
                .collect::<Result<Vec<_>>>()?,
        };

        let starts: Vec<usize> = match mode {
            CompressionMode::Horizontal => vec![0],
            CompressionMode::Vertical => regions.iter().map(|&(start, _)| start).collect(),
        };
        let limits: Vec<usize> = match mode {
            CompressionMode::Horizontal => vec![original_size],
            CompressionMode::Vertical => regions.iter().map(|&(_, len)| len).collect(),
        };
        for (block, &limit) in blocks.iter().zip(&limits) {
            if block.len() > limit {
                return Err(StrataError::CompressionError(format!(
                    "{} output of {} bytes exceeds the original {} bytes",
                    algorithm,
                    block.len(),
                    limit
                )));
            }
        }

        data.fill(0);
        for (block, &start) in blocks.iter().zip(&starts) {
            data[start..start + block.len()].copy_from_slice(block);
        }

        self.compressed_sizes = blocks.iter().map(Vec::len).collect();
        self.algorithm = algorithm;
        self.mode = mode;
        debug!(
            %algorithm,
            %mode,
            original_size,
            compressed_size = self.compressed_sizes.iter().sum::<usize>(),
            "compressed buffer"
        );
        Ok(())
    }

    /// Restores the buffer's original layout in place.
    ///
    /// Does nothing if the buffer is not compressed.
    pub fn decompress(&mut self) -> Result<()> {
        if !self.is_compressed() {
            return Ok(());
        }

        let algorithm = self.algorithm;
        let regions = self.regions();
        let data = self.buffer.data_mut()?;
        match self.mode {
            CompressionMode::Horizontal => {
                let block = &data[..self.compressed_sizes[0]];
                let original_size = regions.iter().map(|&(_, len)| len).sum();
                let packed = decode(algorithm, block, original_size)?;
                data.fill(0);
                unpack(data, &regions, &packed);
            }
            CompressionMode::Vertical => {
                let columns = regions
                    .iter()
                    .zip(&self.compressed_sizes)
                    .map(|(&(start, len), &size)| decode(algorithm, &data[start..start + size], len))
                    .collect::<Result<Vec<_>>>()?;
                data.fill(0);
                for (column, &(start, len)) in columns.iter().zip(&regions) {
                    data[start..start + len].copy_from_slice(column);
                }
            }
        }

        debug!(%algorithm, mode = %self.mode, "decompressed buffer");
        self.algorithm = CompressionAlgorithm::None;
        self.compressed_sizes.clear();
        Ok(())
    }

    /// Returns `(start, len)` of the bytes used by the committed records:
    /// one region for row layouts, one per column for column layouts.
    fn regions(&self) -> Vec<(usize, usize)> {
        let records = self.number_of_records;
        match self.layout.kind() {
            LayoutKind::Row(row) => vec![(0, row.record_size() * records)],
            LayoutKind::Column(column) => column
                .column_offsets()
                .iter()
                .zip(column.field_sizes())
                .map(|(&start, &size)| (start, size * records))
                .collect(),
        }
    }
}

impl std::fmt::Debug for CompressedBuffer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressedBuffer")
            .field("strategy", &self.layout.strategy())
            .field("number_of_records", &self.number_of_records)
            .field("algorithm", &self.algorithm)
            .field("mode", &self.mode)
            .field("compressed_sizes", &self.compressed_sizes)
            .finish()
    }
}

/// Concatenates the regions of `data`.
fn pack(data: &[u8], regions: &[(usize, usize)]) -> Vec<u8> {
    let mut packed = Vec::with_capacity(regions.iter().map(|&(_, len)| len).sum());
    for &(start, len) in regions {
        packed.extend_from_slice(&data[start..start + len]);
    }
    packed
}

/// Scatters `packed` back into the regions of `data`.
fn unpack(data: &mut [u8], regions: &[(usize, usize)], packed: &[u8]) {
    let mut pos = 0;
    for &(start, len) in regions {
        data[start..start + len].copy_from_slice(&packed[pos..pos + len]);
        pos += len;
    }
}

fn encode(algorithm: CompressionAlgorithm, src: &[u8]) -> Result<Vec<u8>> {
    match algorithm {
        CompressionAlgorithm::None => Ok(src.to_vec()),
        CompressionAlgorithm::Lz4 => Ok(lz4_flex::block::compress(src)),
        CompressionAlgorithm::Snappy => snap::raw::Encoder::new()
            .compress_vec(src)
            .map_err(|e| StrataError::CompressionError(format!("snappy: {}", e))),
    }
}

fn decode(algorithm: CompressionAlgorithm, src: &[u8], expected: usize) -> Result<Vec<u8>> {
    let decoded = match algorithm {
        CompressionAlgorithm::None => src.to_vec(),
        CompressionAlgorithm::Lz4 => lz4_flex::block::decompress(src, expected)
            .map_err(|e| StrataError::CompressionError(format!("lz4: {}", e)))?,
        CompressionAlgorithm::Snappy => snap::raw::Decoder::new()
            .decompress_vec(src)
            .map_err(|e| StrataError::CompressionError(format!("snappy: {}", e)))?,
    };
    if decoded.len() != expected {
        return Err(StrataError::CompressionError(format!(
            "decompressed {} bytes, expected {}",
            decoded.len(),
            expected
        )));
    }
    Ok(decoded)
}
