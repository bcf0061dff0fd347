// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared memory ring buffer with framed messages.
//!
//! # Memory Layout
//!
//! ```text
//! +-------------------------------------------------------------+
//! | RingHeader (16 bytes: write_index, read_index, sizes)       |
//! +-------------------------------------------------------------+
//! | data[0 .. buffer_size)                                      |
//! |   frame := MessageHeader (152 bytes) + payload              |
//! |   frames are packed back to back at write_index % size      |
//! +-------------------------------------------------------------+
//! ```
//!
//! # Synchronization Protocol
//!
//! Single producer, single consumer, across process boundaries:
//!
//! Writer send:
//! 1. Load `write_index` (Relaxed - we own it), `read_index` (Acquire)
//! 2. Check free space; reject with nothing written when full
//! 3. Write header + payload bytes into `data`
//! 4. Publish: `write_index += frame` (Release)
//!
//! Reader receive:
//! 1. Load `read_index` (Relaxed - we own it), `write_index` (Acquire)
//! 2. Equal indices mean no data
//! 3. Validate the frame header (magic, topic), copy the payload out
//! 4. Advance: `read_index += frame` (Release)
//!
//! The Release store on `write_index` pairs with the Acquire load in the
//! reader, so every frame byte written before the publish is visible
//! after the load. A frame is therefore never observed half-written.
//!
//! # Wrap Handling
//!
//! Frames are never split across the physical end of `data`. When a frame
//! would cross the boundary, the writer first emits a *padding frame*: a
//! well-formed header with an empty topic name whose `size` spans the
//! remaining gap. Readers skip it through the ordinary topic-mismatch
//! branch. Every reachable write offset leaves a gap to the boundary of
//! either zero or at least one full header, so headers are never split
//! either.

use crate::config::MESSAGE_MAGIC;
use std::ptr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use super::{Result, ShmError};

/// Fixed-size frame header preceding every payload in the ring.
///
/// This layout is a cross-process wire contract (little-endian on
/// little-endian hosts, no conversion performed). 152 bytes total, no
/// implicit padding.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct MessageHeader {
    /// Magic number identifying a valid frame
    pub magic: u32,
    /// Logical producer position at write time
    pub sequence: u32,
    /// Payload length in bytes (header excluded)
    pub size: u32,
    /// Reserved; always 0 in this version
    pub checksum: u32,
    /// Producer wall-clock milliseconds since the Unix epoch
    pub timestamp: u64,
    /// NUL-terminated topic name
    pub topic_name: [u8; 64],
    /// NUL-terminated sender (participant) name
    pub sender_name: [u8; 64],
}

/// Size of the frame header in bytes.
pub const HEADER_SIZE: usize = std::mem::size_of::<MessageHeader>();

impl MessageHeader {
    /// Build a frame header for a payload on `topic` from `sender`.
    fn new(topic: &str, sender: &str, sequence: u32, size: u32) -> Self {
        Self {
            magic: MESSAGE_MAGIC,
            sequence,
            size,
            checksum: 0,
            timestamp: unix_millis(),
            topic_name: to_name_field(topic),
            sender_name: to_name_field(sender),
        }
    }

    /// Build a padding frame spanning `size` payload bytes.
    ///
    /// The empty topic name never matches a real topic, so readers skip
    /// the pad through the topic-mismatch branch.
    fn padding(sender: &str, sequence: u32, size: u32) -> Self {
        Self {
            magic: MESSAGE_MAGIC,
            sequence,
            size,
            checksum: 0,
            timestamp: unix_millis(),
            topic_name: [0u8; 64],
            sender_name: to_name_field(sender),
        }
    }

    /// Topic name as a `&str`, up to the first NUL.
    #[must_use]
    pub fn topic(&self) -> &str {
        name_field_str(&self.topic_name)
    }

    /// Sender name as a `&str`, up to the first NUL.
    #[must_use]
    pub fn sender(&self) -> &str {
        name_field_str(&self.sender_name)
    }
}

/// Copy a string into a NUL-terminated 64-byte name field (truncating).
fn to_name_field(s: &str) -> [u8; 64] {
    let mut field = [0u8; 64];
    let n = s.len().min(63);
    field[..n].copy_from_slice(&s.as_bytes()[..n]);
    field
}

/// Decode a NUL-terminated name field back into a `&str`.
fn name_field_str(field: &[u8; 64]) -> &str {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    std::str::from_utf8(&field[..end]).unwrap_or("")
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Control block at the start of every topic segment.
///
/// The indices are free-running modular `u32` counters; occupancy is
/// `write_index.wrapping_sub(read_index)` and physical offsets are
/// `index % buffer_size`. Writer owns `write_index`, reader owns
/// `read_index`; each publishes with Release and observes the other with
/// Acquire.
#[repr(C)]
pub struct RingHeader {
    /// Next logical write position (owned by the single producer)
    pub write_index: AtomicU32,
    /// Next logical read position (owned by the single consumer)
    pub read_index: AtomicU32,
    /// Size of the data region following this header
    pub buffer_size: u32,
    /// Maximum total frame size (header + payload) accepted by `push`
    pub max_message_size: u32,
}

/// Size of the ring control block in bytes.
pub const RING_HEADER_SIZE: usize = std::mem::size_of::<RingHeader>();

/// Total segment size for a ring with `buffer_size` data bytes.
#[must_use]
pub const fn ring_segment_size(buffer_size: u32) -> usize {
    RING_HEADER_SIZE + buffer_size as usize
}

/// Borrowed view of a ring buffer living inside a mapped segment.
///
/// Constructed per operation by the transport while it holds its topic
/// map lock; the underlying segment outlives the view.
pub struct Ring {
    base: *mut u8,
}

impl Ring {
    /// Create a view over a segment known to hold a ring buffer.
    ///
    /// # Safety
    ///
    /// `base` must point to a mapping of at least
    /// `ring_segment_size(header.buffer_size)` bytes that starts with a
    /// `RingHeader`, and must stay valid for the lifetime of the view.
    pub(crate) unsafe fn from_base(base: *mut u8) -> Self {
        Self { base }
    }

    /// Initialize the control block of a fresh segment.
    ///
    /// Called by the advertising side only; subscribers rely on the
    /// kernel's zero fill (`write_index == read_index == 0` is a valid
    /// empty ring).
    pub(crate) fn init(&self, buffer_size: u32, max_message_size: u32) {
        let header = self.header();
        header.write_index.store(0, Ordering::Relaxed);
        header.read_index.store(0, Ordering::Relaxed);
        // SAFETY: the advertising side initializes the segment before
        // publishing it in its topic map; sizes are plain fields written
        // once here and read-only afterwards.
        unsafe {
            let header_mut = self.base as *mut RingHeader;
            ptr::addr_of_mut!((*header_mut).buffer_size).write(buffer_size);
            ptr::addr_of_mut!((*header_mut).max_message_size).write(max_message_size);
        }
    }

    #[inline]
    pub(crate) fn header(&self) -> &RingHeader {
        // SAFETY:
        // - base points at a mapping that starts with a RingHeader
        //   (guaranteed by the from_base contract)
        // - mmap returns page-aligned memory, satisfying the 4-byte
        //   alignment of the atomics
        // - all mutable fields are atomics, safe to share across processes
        unsafe { &*(self.base as *const RingHeader) }
    }

    #[inline]
    fn data(&self) -> *mut u8 {
        // SAFETY: the mapping extends RING_HEADER_SIZE + buffer_size
        // bytes, so the data region starts in bounds
        unsafe { self.base.add(RING_HEADER_SIZE) }
    }

    /// Write one frame into the ring.
    ///
    /// Fails with nothing written when the frame exceeds
    /// `max_message_size` or the ring does not have room for it (plus any
    /// padding needed at the wrap boundary).
    pub fn push(&self, topic: &str, sender: &str, payload: &[u8]) -> Result<()> {
        let header = self.header();
        let buffer_size = header.buffer_size;
        let max_message_size = header.max_message_size;
        let hdr = HEADER_SIZE as u32;

        if buffer_size == 0 {
            return Err(ShmError::Corruption);
        }
        let total = hdr + payload.len() as u32;
        if total > max_message_size {
            return Err(ShmError::FrameTooLarge {
                size: total as usize,
                max: max_message_size as usize,
            });
        }

        let w = header.write_index.load(Ordering::Relaxed);
        let r = header.read_index.load(Ordering::Acquire);
        let used = w.wrapping_sub(r);
        if used > buffer_size {
            return Err(ShmError::Corruption);
        }
        let available = buffer_size - used;

        let pos = w % buffer_size;
        let gap = buffer_size - pos;

        // A frame fits at an offset when it ends exactly at the boundary
        // or leaves room for at least one more header before it.
        let fits = |gap: u32| total <= gap && (gap == total || gap - total >= hdr);

        let pad = if fits(gap) { 0 } else { gap };
        if pad > 0 && !fits(buffer_size) {
            // The frame can never sit at offset 0 without splitting a
            // later header; it is too large for this ring geometry.
            return Err(ShmError::FrameTooLarge {
                size: total as usize,
                max: buffer_size as usize,
            });
        }

        if available <= pad + total {
            return Err(ShmError::BufferFull {
                needed: (pad + total) as usize,
                available: available as usize,
            });
        }

        if pad > 0 {
            debug_assert!(pad >= hdr);
            let pad_header = MessageHeader::padding(sender, w, pad - hdr);
            // SAFETY:
            // - pos + pad == buffer_size, so the pad header (pad >= hdr)
            //   lies inside the data region
            // - the space check above guarantees the reader is not inside
            //   [pos, pos + pad); only this single producer writes here
            unsafe {
                ptr::copy_nonoverlapping(
                    ptr::addr_of!(pad_header) as *const u8,
                    self.data().add(pos as usize),
                    HEADER_SIZE,
                );
            }
        }

        let frame_pos = if pad > 0 { 0 } else { pos };
        let frame_header = MessageHeader::new(topic, sender, w.wrapping_add(pad), total - hdr);

        // SAFETY:
        // - fits() guaranteed frame_pos + total <= buffer_size, so both
        //   copies stay inside the data region
        // - the space check guarantees the reader is outside the span
        //   being written; the frame only becomes visible after the
        //   Release store below
        // - source and destination do not overlap (payload is the
        //   caller's buffer, destination is shared memory)
        unsafe {
            let dst = self.data().add(frame_pos as usize);
            ptr::copy_nonoverlapping(ptr::addr_of!(frame_header) as *const u8, dst, HEADER_SIZE);
            ptr::copy_nonoverlapping(payload.as_ptr(), dst.add(HEADER_SIZE), payload.len());
        }

        // Publish: pairs with the Acquire load in pop(), making the frame
        // bytes above visible before the index moves.
        header
            .write_index
            .store(w.wrapping_add(pad + total), Ordering::Release);
        Ok(())
    }

    /// Read the next frame addressed to `topic` into `buf`.
    ///
    /// * `Ok(Some(n))` - `n` payload bytes were copied and consumed
    /// * `Ok(None)` - no data, or a frame for another topic was skipped
    /// * `Err(BufferTooSmall)` - `buf` cannot hold the frame; the frame
    ///   is preserved for a retry with a larger buffer
    /// * `Err(Corruption)` - magic mismatch; one header length was
    ///   skipped as a recovery step
    pub fn pop(&self, topic: &str, buf: &mut [u8]) -> Result<Option<usize>> {
        let header = self.header();
        let buffer_size = header.buffer_size;
        let hdr = HEADER_SIZE as u32;

        let r = header.read_index.load(Ordering::Relaxed);
        let w = header.write_index.load(Ordering::Acquire);
        if r == w {
            return Ok(None);
        }
        if buffer_size == 0 {
            return Err(ShmError::Corruption);
        }

        let pos = r % buffer_size;

        let mut frame = std::mem::MaybeUninit::<MessageHeader>::uninit();
        // SAFETY:
        // - the writer never leaves a committed frame whose header
        //   crosses the boundary (wrap invariant), and r != w means a
        //   committed frame starts at pos, so pos + HEADER_SIZE is in
        //   bounds
        // - the Acquire load of write_index above makes the frame bytes
        //   visible
        // - byte copy gives read_unaligned semantics: frame offsets are
        //   not guaranteed aligned
        // - every MessageHeader field is an integer or byte array, so any
        //   bit pattern is a valid value for assume_init
        let frame = unsafe {
            ptr::copy_nonoverlapping(
                self.data().add(pos as usize),
                frame.as_mut_ptr() as *mut u8,
                HEADER_SIZE,
            );
            frame.assume_init()
        };

        if frame.magic != MESSAGE_MAGIC {
            // Corrupt from this reader's view: skip one header as a
            // recovery step.
            header
                .read_index
                .store(r.wrapping_add(hdr), Ordering::Release);
            return Err(ShmError::Corruption);
        }

        if frame.topic() != topic {
            // Padding frame or a frame for another subscriber of this
            // segment: consume and report no data.
            header.read_index.store(
                r.wrapping_add(hdr).wrapping_add(frame.size),
                Ordering::Release,
            );
            return Ok(None);
        }

        let size = frame.size as usize;
        if buf.len() < size {
            // Preserved: read_index untouched so a retry with a larger
            // buffer returns this same frame.
            return Err(ShmError::BufferTooSmall {
                needed: size,
                got: buf.len(),
            });
        }

        // SAFETY:
        // - the writer placed size payload bytes contiguously after the
        //   header, inside the data region (wrap invariant)
        // - size <= buf.len() was checked above
        unsafe {
            ptr::copy_nonoverlapping(
                self.data().add(pos as usize + HEADER_SIZE),
                buf.as_mut_ptr(),
                size,
            );
        }

        header.read_index.store(
            r.wrapping_add(hdr).wrapping_add(frame.size),
            Ordering::Release,
        );
        Ok(Some(size))
    }

    /// Number of used bytes (frames plus padding) currently in the ring.
    #[must_use]
    pub fn used_bytes(&self) -> u32 {
        let header = self.header();
        let w = header.write_index.load(Ordering::Acquire);
        let r = header.read_index.load(Ordering::Acquire);
        w.wrapping_sub(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        // Wire contract: 152 bytes, fields at fixed offsets.
        assert_eq!(HEADER_SIZE, 152);
        assert_eq!(std::mem::offset_of!(MessageHeader, magic), 0);
        assert_eq!(std::mem::offset_of!(MessageHeader, sequence), 4);
        assert_eq!(std::mem::offset_of!(MessageHeader, size), 8);
        assert_eq!(std::mem::offset_of!(MessageHeader, checksum), 12);
        assert_eq!(std::mem::offset_of!(MessageHeader, timestamp), 16);
        assert_eq!(std::mem::offset_of!(MessageHeader, topic_name), 24);
        assert_eq!(std::mem::offset_of!(MessageHeader, sender_name), 88);
    }

    #[test]
    fn test_ring_header_layout() {
        assert_eq!(RING_HEADER_SIZE, 16);
        assert_eq!(ring_segment_size(1024), 16 + 1024);
    }

    #[test]
    fn test_name_field_roundtrip() {
        let field = to_name_field("sensor_data");
        assert_eq!(name_field_str(&field), "sensor_data");

        // 64+ character names truncate to 63 bytes plus the NUL.
        let long = "x".repeat(100);
        let field = to_name_field(&long);
        assert_eq!(name_field_str(&field).len(), 63);
    }

    // Heap-backed ring for protocol tests; the mapped-segment case is
    // covered by the transport tests.
    struct TestRing {
        _mem: Vec<u8>,
        ring: Ring,
    }

    fn test_ring(buffer_size: u32, max_message_size: u32) -> TestRing {
        let mut mem = vec![0u8; ring_segment_size(buffer_size)];
        // SAFETY: mem holds ring_segment_size bytes, zero-initialized,
        // and outlives the Ring view inside TestRing.
        let ring = unsafe { Ring::from_base(mem.as_mut_ptr()) };
        ring.init(buffer_size, max_message_size);
        TestRing { _mem: mem, ring }
    }

    #[test]
    fn test_roundtrip() {
        let t = test_ring(4096, 1024);
        let payload = [0x01, 0x02, 0x03, 0x04];

        t.ring.push("t", "writer", &payload).expect("push failed");

        let mut buf = [0u8; 64];
        let n = t.ring.pop("t", &mut buf).expect("pop failed");
        assert_eq!(n, Some(4));
        assert_eq!(&buf[..4], &payload);
    }

    #[test]
    fn test_empty_ring_has_no_data() {
        let t = test_ring(4096, 1024);
        let mut buf = [0u8; 64];
        assert_eq!(t.ring.pop("t", &mut buf).expect("pop failed"), None);
        assert_eq!(t.ring.header().read_index.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_fifo_order() {
        let t = test_ring(8192, 1024);

        for i in 0u32..10 {
            t.ring
                .push("t", "writer", &i.to_le_bytes())
                .expect("push failed");
        }

        let mut buf = [0u8; 64];
        for i in 0u32..10 {
            let n = t.ring.pop("t", &mut buf).expect("pop failed").unwrap();
            assert_eq!(n, 4);
            assert_eq!(u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]), i);
        }
        assert_eq!(t.ring.pop("t", &mut buf).expect("pop failed"), None);
    }

    #[test]
    fn test_frame_too_large_rejected() {
        // max_message_size=256: a 200-byte payload (152+200 > 256) is
        // rejected, a 64-byte payload (152+64 <= 256) is accepted.
        let t = test_ring(4096, 256);

        let big = [0u8; 200];
        let result = t.ring.push("t", "writer", &big);
        assert!(matches!(result, Err(ShmError::FrameTooLarge { .. })));

        let small = [0u8; 64];
        assert!(t.ring.push("t", "writer", &small).is_ok());
    }

    #[test]
    fn test_buffer_full_leaves_state_unchanged() {
        // 152+64 = 216-byte frames: four fit in a 1024-byte ring
        // (positions 0, 216, 432, 648); the fifth hits the full check.
        let t = test_ring(1024, 512);

        for i in 1u8..=4 {
            t.ring.push("t", "writer", &[i; 64]).expect("push failed");
        }

        let w_before = t.ring.header().write_index.load(Ordering::Relaxed);
        let r_before = t.ring.header().read_index.load(Ordering::Relaxed);

        let result = t.ring.push("t", "writer", &[5u8; 64]);
        assert!(matches!(result, Err(ShmError::BufferFull { .. })));
        assert_eq!(t.ring.header().write_index.load(Ordering::Relaxed), w_before);
        assert_eq!(t.ring.header().read_index.load(Ordering::Relaxed), r_before);

        // All committed frames still readable, in order.
        let mut buf = [0u8; 64];
        for i in 1u8..=4 {
            assert_eq!(t.ring.pop("t", &mut buf).expect("pop"), Some(64));
            assert_eq!(buf[0], i);
        }
    }

    #[test]
    fn test_small_buffer_preserves_frame() {
        let t = test_ring(4096, 1024);
        let payload = [0xABu8; 100];
        t.ring.push("t", "writer", &payload).expect("push failed");

        let mut small = [0u8; 10];
        let result = t.ring.pop("t", &mut small);
        assert!(matches!(result, Err(ShmError::BufferTooSmall { needed: 100, .. })));

        // read_index untouched: a retry with a larger buffer succeeds and
        // returns the same payload.
        let mut big = [0u8; 128];
        let n = t.ring.pop("t", &mut big).expect("pop failed");
        assert_eq!(n, Some(100));
        assert_eq!(&big[..100], &payload[..]);
    }

    #[test]
    fn test_other_topic_frame_skipped() {
        let t = test_ring(4096, 1024);
        t.ring.push("other", "writer", &[1, 2, 3]).expect("push");
        t.ring.push("t", "writer", &[9, 9]).expect("push");

        let mut buf = [0u8; 64];
        // First pop consumes the foreign frame and reports no data.
        assert_eq!(t.ring.pop("t", &mut buf).expect("pop"), None);
        // Second pop returns our frame.
        assert_eq!(t.ring.pop("t", &mut buf).expect("pop"), Some(2));
        assert_eq!(&buf[..2], &[9, 9]);
    }

    #[test]
    fn test_magic_mismatch_recovery() {
        let t = test_ring(4096, 1024);
        t.ring.push("t", "writer", &[7u8; 8]).expect("push");

        // Stomp the magic of the committed frame.
        // SAFETY: offset 0 of the data region holds the frame header.
        unsafe {
            *t.ring.data() = 0xFF;
        }

        let mut buf = [0u8; 64];
        let result = t.ring.pop("t", &mut buf);
        assert!(matches!(result, Err(ShmError::Corruption)));
        // Defensive skip advanced by exactly one header length.
        assert_eq!(
            t.ring.header().read_index.load(Ordering::Relaxed),
            HEADER_SIZE as u32
        );
    }

    #[test]
    fn test_wrap_inserts_padding() {
        // 1024-byte ring; 152+200 = 352-byte frames. Two frames end at
        // 704; the third (needs 352, gap is 320) forces a pad.
        let t = test_ring(1024, 512);
        let mut buf = [0u8; 256];

        for round in 0u8..6 {
            t.ring
                .push("t", "writer", &[round; 200])
                .expect("push failed");
            // Drain so the ring never fills; pads appear as None pops.
            loop {
                match t.ring.pop("t", &mut buf) {
                    Ok(Some(n)) => {
                        assert_eq!(n, 200);
                        assert!(buf[..n].iter().all(|&b| b == round));
                        break;
                    }
                    Ok(None) => continue, // padding frame skipped
                    Err(e) => panic!("pop failed: {e}"),
                }
            }
        }
    }

    #[test]
    fn test_wrap_preserves_fifo_without_drain() {
        // Force a pad while several frames are buffered, then drain all.
        let t = test_ring(2048, 512);
        let mut buf = [0u8; 256];

        // Move the indices near the boundary: 5 x 352 = 1760, gap 288.
        for _ in 0..5 {
            t.ring.push("t", "w", &[0u8; 200]).expect("push");
        }
        for _ in 0..5 {
            assert_eq!(t.ring.pop("t", &mut buf).expect("pop"), Some(200));
        }

        // Next frame needs a pad (gap 288 < 352); the two writes then
        // land at offset 0 and 352.
        t.ring.push("t", "w", &[1u8; 200]).expect("push");
        t.ring.push("t", "w", &[2u8; 200]).expect("push");

        let mut seen = Vec::new();
        loop {
            match t.ring.pop("t", &mut buf) {
                Ok(Some(n)) => seen.push(buf[..n].to_vec()),
                Ok(None) => {
                    if t.ring.used_bytes() == 0 {
                        break;
                    }
                }
                Err(e) => panic!("pop failed: {e}"),
            }
        }
        assert_eq!(seen.len(), 2);
        assert!(seen[0].iter().all(|&b| b == 1));
        assert!(seen[1].iter().all(|&b| b == 2));
    }

    #[test]
    fn test_checksum_always_zero() {
        let t = test_ring(4096, 1024);
        t.ring.push("t", "writer", &[1, 2, 3]).expect("push");

        let mut frame = std::mem::MaybeUninit::<MessageHeader>::uninit();
        // SAFETY: a committed frame header sits at data offset 0; all
        // header fields tolerate any bit pattern.
        let frame = unsafe {
            ptr::copy_nonoverlapping(t.ring.data(), frame.as_mut_ptr() as *mut u8, HEADER_SIZE);
            frame.assume_init()
        };
        assert_eq!(frame.checksum, 0);
        assert_eq!(frame.magic, MESSAGE_MAGIC);
        assert_eq!(frame.topic(), "t");
        assert_eq!(frame.sender(), "writer");
    }
}
