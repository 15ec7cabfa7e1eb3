use std::{collections::VecDeque, fmt::Debug};

use crate::{
    parser::{INIT_BUF_SIZE, MAX_ALLOC_SIZE},
    reader::{read_exact_at, ReadAt},
};

// Set a reasonable value to avoid causing frequent memory allocations
const MAX_REUSE_BUF_SIZE: usize = 1024 * 1024;
const MAX_POOLED_BUF: usize = 16;

/// A small pool of byte buffers reused across decodes by one
/// [`crate::MetaParser`]. Box bodies and segment payloads are loaded into
/// these.
pub(crate) struct Buffers {
    pool: VecDeque<Vec<u8>>,
    acquired: usize,
}

impl Buffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&mut self) -> Vec<u8> {
        let buf = if let Some(buf) = self.pool.pop_back() {
            tracing::trace!(?self, "acquired: pooled");
            buf
        } else {
            tracing::trace!(?self, "acquired: created");
            new_buf()
        };
        self.acquired = self.acquired.saturating_add(1);
        buf
    }

    pub fn release(&mut self, mut buf: Vec<u8>) {
        if self.pool.len() < MAX_POOLED_BUF {
            Self::clean(&mut buf);
            self.pool.push_back(buf);
        }
        self.acquired = self.acquired.saturating_sub(1);
        tracing::trace!(?self, "released");
    }

    fn clean(buf: &mut Vec<u8>) {
        buf.clear();
        if buf.capacity() > MAX_REUSE_BUF_SIZE {
            buf.shrink_to(MAX_REUSE_BUF_SIZE);
        }
    }
}

impl Default for Buffers {
    fn default() -> Self {
        let mut pool = VecDeque::new();
        pool.push_back(new_buf());
        Self { pool, acquired: 0 }
    }
}

fn new_buf() -> Vec<u8> {
    Vec::with_capacity(INIT_BUF_SIZE)
}

impl Debug for Buffers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffers")
            .field("acquired", &self.acquired)
            .field("pool", &self.pool.len())
            .finish()
    }
}

/// Replaces the content of `buf` with `len` bytes read at `offset`.
pub(crate) fn load_at<R: ReadAt + ?Sized>(
    reader: &R,
    buf: &mut Vec<u8>,
    offset: u64,
    len: usize,
) -> crate::Result<()> {
    if len > MAX_ALLOC_SIZE {
        tracing::warn!(len, "refuse to load an oversized block");
        return Err(crate::Error::NotEnoughData {
            offset,
            needed: len,
        });
    }
    if let Some(size) = reader.size() {
        if offset.saturating_add(len as u64) > size {
            return Err(crate::Error::NotEnoughData {
                offset,
                needed: len,
            });
        }
    }
    buf.clear();
    buf.resize(len, 0);
    read_exact_at(reader, buf, offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers() {
        let mut bb = Buffers::new();

        let buf1 = bb.acquire();
        assert_eq!(bb.acquired, 1);
        assert_eq!(bb.pool.len(), 0);

        let mut buf2 = bb.acquire();
        assert_eq!(bb.acquired, 2);
        buf2.extend_from_slice(b"abc");

        bb.release(buf2);
        assert_eq!(bb.acquired, 1);
        assert_eq!(bb.pool.len(), 1);

        let buf2 = bb.acquire();
        assert!(buf2.is_empty());
        assert_eq!(bb.pool.len(), 0);

        bb.release(buf1);
        bb.release(buf2);
        assert_eq!(bb.acquired, 0);
        assert_eq!(bb.pool.len(), 2);
    }

    #[test]
    fn load_within_bounds() {
        let data: Vec<u8> = (0u8..32).collect();
        let mut buf = Vec::new();
        load_at(&data, &mut buf, 4, 4).unwrap();
        assert_eq!(buf, [4, 5, 6, 7]);
        assert!(matches!(
            load_at(&data, &mut buf, 30, 4),
            Err(crate::Error::NotEnoughData { offset: 30, needed: 4 })
        ));
    }
}
