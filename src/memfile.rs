use crate::error::{DocError, Result};
use crate::varint::{decode_varint, encode_varint, encoded_len};
use std::ops::Add;

// ─── Offset ─────────────────────────────────────────────────────────────────

/// Byte position inside a [`MemFile`]. Kept apart from counts and indices so
/// the two never get mixed up in offset arithmetic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Offset(usize);

impl Offset {
    pub const ZERO: Offset = Offset(0);

    #[inline]
    pub const fn new(pos: usize) -> Self {
        Offset(pos)
    }

    #[inline]
    pub const fn get(self) -> usize {
        self.0
    }

    /// Moves the offset by a splice delta. Only used for offsets that lie
    /// behind the splice point, so the result never underflows.
    #[inline]
    pub fn shifted(self, delta: isize) -> Offset {
        Offset(self.0.saturating_add_signed(delta))
    }

    #[inline]
    pub fn distance_to(self, end: Offset) -> usize {
        end.0 - self.0
    }
}

impl Add<usize> for Offset {
    type Output = Offset;

    #[inline]
    fn add(self, rhs: usize) -> Offset {
        Offset(self.0 + rhs)
    }
}

// ─── MemFile ────────────────────────────────────────────────────────────────

/// The document buffer. All reads are bounds-checked and report
/// [`DocError::Corrupted`] instead of panicking; all structural edits funnel
/// through [`MemFile::splice`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemFile {
    buf: Vec<u8>,
}

impl MemFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(buf: Vec<u8>) -> Self {
        MemFile { buf }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn end(&self) -> Offset {
        Offset(self.buf.len())
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Ensures `len` bytes exist at `at` and returns the offset just past them.
    pub fn check_span(&self, at: Offset, len: u64) -> Result<Offset> {
        let available = self.buf.len().saturating_sub(at.0);
        match usize::try_from(len) {
            Ok(len) if len <= available => Ok(Offset(at.0 + len)),
            Ok(len) => Err(DocError::corrupted(at.0, len, available)),
            Err(_) => Err(DocError::corrupted(at.0, usize::MAX, available)),
        }
    }

    // ════════════════════════════════════════════════════════════════════════
    // Reads
    // ════════════════════════════════════════════════════════════════════════

    #[inline]
    pub fn peek_u8(&self, at: Offset) -> Result<u8> {
        self.buf
            .get(at.0)
            .copied()
            .ok_or_else(|| DocError::corrupted(at.0, 1, 0))
    }

    pub fn read_at(&self, at: Offset, len: usize) -> Result<&[u8]> {
        let end = self.check_span(at, len as u64)?;
        Ok(&self.buf[at.0..end.0])
    }

    pub fn read_array<const N: usize>(&self, at: Offset) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_at(at, N)?);
        Ok(out)
    }

    /// Reads the varint at `at`, returning `(value, encoded_len)`.
    pub fn read_varint(&self, at: Offset) -> Result<(u64, usize)> {
        let tail = self.buf.get(at.0..).unwrap_or_default();
        decode_varint(tail).ok_or_else(|| {
            let needed = tail.first().and_then(|b| encoded_len(*b)).unwrap_or(1);
            DocError::corrupted(at.0, needed, tail.len())
        })
    }

    // ════════════════════════════════════════════════════════════════════════
    // Writes
    // ════════════════════════════════════════════════════════════════════════

    /// Overwrites existing bytes. Never changes the buffer length.
    pub fn write_at(&mut self, at: Offset, bytes: &[u8]) -> Result<()> {
        let end = self.check_span(at, bytes.len() as u64)?;
        self.buf[at.0..end.0].copy_from_slice(bytes);
        Ok(())
    }

    pub fn write_u8(&mut self, at: Offset, byte: u8) -> Result<()> {
        self.write_at(at, &[byte])
    }

    pub fn insert_at(&mut self, at: Offset, bytes: &[u8]) -> Result<()> {
        self.splice(at, 0, bytes).map(|_| ())
    }

    pub fn remove_at(&mut self, at: Offset, len: usize) -> Result<()> {
        self.splice(at, len, &[]).map(|_| ())
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Moves `len` bytes from `from` to `to` inside the buffer.
    pub fn copy_within(&mut self, from: Offset, len: usize, to: Offset) -> Result<()> {
        let src_end = self.check_span(from, len as u64)?;
        self.check_span(to, len as u64)?;
        self.buf.copy_within(from.0..src_end.0, to.0);
        Ok(())
    }

    /// Replaces `old_len` bytes at `at` with `new_data` and returns the size
    /// delta. Handles grow, shrink and same-size cases with a single shift of
    /// the tail.
    pub fn splice(&mut self, at: Offset, old_len: usize, new_data: &[u8]) -> Result<isize> {
        let old_end = self.check_span(at, old_len as u64)?.0;
        let offset = at.0;
        let new_len = new_data.len();
        let tail_len = self.buf.len() - old_end;

        if new_len == old_len {
            self.buf[offset..offset + new_len].copy_from_slice(new_data);
        } else if new_len > old_len {
            let growth = new_len - old_len;
            self.buf.resize(self.buf.len() + growth, 0);
            // Shift tail right
            self.buf
                .copy_within(old_end..old_end + tail_len, old_end + growth);
            self.buf[offset..offset + new_len].copy_from_slice(new_data);
        } else {
            let shrink = old_len - new_len;
            self.buf[offset..offset + new_len].copy_from_slice(new_data);
            // Shift tail left
            self.buf
                .copy_within(old_end..old_end + tail_len, old_end - shrink);
            self.buf.truncate(self.buf.len() - shrink);
        }
        Ok(new_len as isize - old_len as isize)
    }

    /// Rewrites the varint at `at` with `value`. Returns how far everything
    /// behind it moved.
    pub fn update_varint(&mut self, at: Offset, value: u64) -> Result<isize> {
        let (_, old_len) = self.read_varint(at)?;
        self.splice(at, old_len, &encode_varint(value))
    }
}

// ─── Buffer Access ──────────────────────────────────────────────────────────

/// Read access to the document buffer. Implemented by shared and exclusive
/// borrows so one iterator type serves both read views and write sessions.
pub trait DocBuf {
    fn file(&self) -> &MemFile;
}

/// Write access. Only exclusive borrows get it.
pub trait DocBufMut: DocBuf {
    fn file_mut(&mut self) -> &mut MemFile;
}

impl DocBuf for &MemFile {
    #[inline]
    fn file(&self) -> &MemFile {
        self
    }
}

impl DocBuf for &mut MemFile {
    #[inline]
    fn file(&self) -> &MemFile {
        self
    }
}

impl DocBufMut for &mut MemFile {
    #[inline]
    fn file_mut(&mut self) -> &mut MemFile {
        self
    }
}
