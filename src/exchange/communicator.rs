//! Thin façade over rank-to-rank message passing.
//!
//! Messages are contiguous byte slices. All handles are waitable but
//! non-blocking; the exchange helpers call `.wait()` before trusting a
//! buffer. Receives may be shorter than the posted buffer (truncation is
//! not an error); the helpers validate lengths themselves.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

/// Typed message tag. Stages derive their tags from a base with [`offset`]
/// so concurrent exchanges never collide.
///
/// [`offset`]: CommTag::offset
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CommTag(pub u16);

impl CommTag {
    pub const fn new(base: u16) -> Self {
        Self(base)
    }

    #[inline]
    pub const fn base(self) -> u16 {
        self.0
    }

    /// A related tag `n` slots after this one (wrapping).
    #[inline]
    pub const fn offset(self, n: u16) -> Self {
        Self(self.0.wrapping_add(n))
    }
}

/// Non-blocking rank-to-rank communication interface.
pub trait Communicator: Send + Sync + 'static {
    type SendHandle: Wait;
    type RecvHandle: Wait;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle;

    /// This rank's index in the communicator.
    fn rank(&self) -> usize;
    /// Number of participating ranks.
    fn size(&self) -> usize;

    /// True when there is only one rank and exchanges are no-ops.
    fn is_serial(&self) -> bool {
        self.size() <= 1
    }
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

/// Compile-time no-op comm for pure serial runs and unit tests.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: u16, _buf: &mut [u8]) {}

    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
}

// --- RayonComm: intra-process ranks on threads ---

type Key = (usize, usize, u16); // (src, dst, tag)
type Queue = Arc<Mutex<VecDeque<Bytes>>>;

static MAILBOX: Lazy<DashMap<Key, Queue>> = Lazy::new(DashMap::new);

fn queue(key: Key) -> Queue {
    MAILBOX.entry(key).or_default().clone()
}

/// In-process communicator: one instance per simulated rank, FIFO per
/// (src, dst, tag) channel. Channels live in a process-wide mailbox, so
/// tests exercising it must not share tags across concurrent cases.
#[derive(Clone, Debug)]
pub struct RayonComm {
    rank: usize,
    size: usize,
}

impl RayonComm {
    pub fn new(rank: usize, size: usize) -> Self {
        Self { rank, size }
    }
}

pub struct LocalHandle {
    queue: Queue,
    cap: usize,
}

impl Wait for LocalHandle {
    fn wait(self) -> Option<Vec<u8>> {
        loop {
            if let Some(bytes) = self.queue.lock().pop_front() {
                let n = bytes.len().min(self.cap);
                return Some(bytes[..n].to_vec());
            }
            std::thread::yield_now();
        }
    }
}

impl Communicator for RayonComm {
    type SendHandle = ();
    type RecvHandle = LocalHandle;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) {
        queue((self.rank, peer, tag))
            .lock()
            .push_back(Bytes::copy_from_slice(buf));
    }

    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> LocalHandle {
        LocalHandle {
            queue: queue((peer, self.rank, tag)),
            cap: buf.len(),
        }
    }

    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.size
    }
}
