//! Thin façade over in-process (threaded) or inter-process (MPI) message
//! passing.
//!
//! Messages are contiguous byte slices. All handles are waitable but
//! non-blocking; the exchange layers call `.wait()` before trusting a
//! buffer.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::JoinHandle;

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;

/// Message tag separating the concurrent exchange protocols.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CommTag(pub u16);

/// Non-blocking communication interface (minimal by design).
pub trait Communicator: Send + Sync + 'static {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    fn isend(&self, peer: usize, tag: CommTag, buf: &[u8]) -> Self::SendHandle;
    /// Post a receive of exactly `len` bytes from `peer`.
    fn irecv(&self, peer: usize, tag: CommTag, len: usize) -> Self::RecvHandle;
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

/// Compile-time no-op comm for single-partition runs and serial unit tests.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn isend(&self, _peer: usize, _tag: CommTag, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: CommTag, _len: usize) {}
}

// --- ThreadComm: intra-process / multi-thread ---

type Key = (usize, usize, CommTag); // (src, dst, tag)

/// FIFO per (src, dst, tag); repeated sends on one tag arrive in order.
#[derive(Default)]
struct Mailbox {
    slots: DashMap<Key, VecDeque<Bytes>>,
}

impl Mailbox {
    fn push(&self, key: Key, data: Bytes) {
        self.slots.entry(key).or_default().push_back(data);
    }

    fn pop(&self, key: &Key) -> Option<Bytes> {
        self.slots.get_mut(key).and_then(|mut q| q.pop_front())
    }
}

/// One rank of an in-process communicator group, for driving distributed
/// algorithms with plain threads.
#[derive(Clone)]
pub struct ThreadComm {
    rank: usize,
    size: usize,
    mail: Arc<Mailbox>,
}

impl ThreadComm {
    /// Create a group of `size` connected ranks sharing one mailbox.
    pub fn group(size: usize) -> Vec<ThreadComm> {
        let mail = Arc::new(Mailbox::default());
        (0..size)
            .map(|rank| ThreadComm {
                rank,
                size,
                mail: Arc::clone(&mail),
            })
            .collect()
    }
}

pub struct LocalHandle {
    buf: Arc<Mutex<Option<Vec<u8>>>>,
    handle: Option<JoinHandle<()>>,
}

impl Wait for LocalHandle {
    fn wait(mut self) -> Option<Vec<u8>> {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.buf.lock().take()
    }
}

impl Communicator for ThreadComm {
    type SendHandle = ();
    type RecvHandle = LocalHandle;

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn isend(&self, peer: usize, tag: CommTag, buf: &[u8]) {
        self.mail
            .push((self.rank, peer, tag), Bytes::copy_from_slice(buf));
    }

    fn irecv(&self, peer: usize, tag: CommTag, len: usize) -> LocalHandle {
        let key = (peer, self.rank, tag);
        let mail = Arc::clone(&self.mail);
        let out = Arc::new(Mutex::new(None));
        let out_clone = Arc::clone(&out);
        let handle = std::thread::spawn(move || loop {
            if let Some(bytes) = mail.pop(&key) {
                *out_clone.lock() = Some(bytes[..len.min(bytes.len())].to_vec());
                break;
            }
            std::thread::yield_now();
        });
        LocalHandle {
            buf: out,
            handle: Some(handle),
        }
    }
}

// --- MPI backend (feature = "mpi-support") ---

#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::{CommTag, Communicator, Wait};
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;
    use std::sync::Arc;

    /// Buffer backing all in-flight buffered sends. Exchange rounds send at
    /// most a few records per coupled face, so this bounds meshes with
    /// halos into the tens of millions of faces.
    const SEND_BUFFER_BYTES: usize = 16 << 20;

    pub struct MpiComm {
        world: Arc<SimpleCommunicator>,
        rank: usize,
        size: usize,
    }

    impl MpiComm {
        pub fn new() -> Option<Self> {
            let mut universe = mpi::initialize()?;
            // Buffered sends require an attached buffer; without one the
            // first `isend` is an MPI error.
            universe.set_buffer_size(SEND_BUFFER_BYTES);
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            // Keep MPI (and the attached buffer) alive for the process
            // lifetime.
            std::mem::forget(universe);
            Some(Self {
                world: Arc::new(world),
                rank,
                size,
            })
        }
    }

    /// Deferred blocking receive, completed inside `wait`. Sends complete
    /// at post time against the attached buffer, so waiting receives after
    /// all sends are posted cannot deadlock.
    pub struct MpiRecv {
        world: Arc<SimpleCommunicator>,
        peer: i32,
        tag: i32,
        len: usize,
    }

    impl Wait for MpiRecv {
        fn wait(self) -> Option<Vec<u8>> {
            let mut buf = vec![0u8; self.len];
            self.world
                .process_at_rank(self.peer)
                .receive_into_with_tag(&mut buf[..], self.tag);
            Some(buf)
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = ();
        type RecvHandle = MpiRecv;

        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn isend(&self, peer: usize, tag: CommTag, buf: &[u8]) {
            self.world
                .process_at_rank(peer as i32)
                .buffered_send_with_tag(buf, tag.0 as i32);
        }

        fn irecv(&self, peer: usize, tag: CommTag, len: usize) -> MpiRecv {
            MpiRecv {
                world: Arc::clone(&self.world),
                peer: peer as i32,
                tag: tag.0 as i32,
                len,
            }
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_roundtrip_two_ranks() {
        let group = ThreadComm::group(2);
        let recv = group[1].irecv(0, CommTag(7), 4);
        group[0].isend(1, CommTag(7), &[1, 2, 3, 4]);
        let data = recv.wait().expect("expected data from rank 0");
        assert_eq!(data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn fifo_order_per_tag() {
        let group = ThreadComm::group(2);
        group[0].isend(1, CommTag(3), &[10]);
        group[0].isend(1, CommTag(3), &[20]);
        let first = group[1].irecv(0, CommTag(3), 1).wait().unwrap();
        let second = group[1].irecv(0, CommTag(3), 1).wait().unwrap();
        assert_eq!((first[0], second[0]), (10, 20));
    }

    // Run under mpirun; a single rank exercises the buffered self-send.
    #[cfg(feature = "mpi-support")]
    #[test]
    fn mpi_buffered_roundtrip() {
        let comm = MpiComm::new().expect("mpi initialize");
        let peer = (comm.rank() + 1) % comm.size();
        let from = (comm.rank() + comm.size() - 1) % comm.size();
        let recv = comm.irecv(from, CommTag(9), 2);
        comm.isend(peer, CommTag(9), &[42, 43]);
        assert_eq!(recv.wait().unwrap(), vec![42, 43]);
    }

    #[test]
    fn groups_are_isolated() {
        let a = ThreadComm::group(2);
        let b = ThreadComm::group(2);
        a[0].isend(1, CommTag(1), &[1]);
        b[0].isend(1, CommTag(1), &[2]);
        assert_eq!(a[1].irecv(0, CommTag(1), 1).wait().unwrap()[0], 1);
        assert_eq!(b[1].irecv(0, CommTag(1), 1).wait().unwrap()[0], 2);
    }
}
