//! Neighbor and collective exchanges built on the point-to-point layer.
//!
//! Every exchange is two-stage: a fixed-width count header first, the
//! typed payload second, on adjacent tags. All send handles are drained
//! before returning, even on error, so mailbox state never leaks into the
//! next stage.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};

use super::communicator::{CommTag, Communicator, Wait};
use super::wire::{cast_slice, cast_slice_from, cast_slice_mut, WireCount};
use crate::error::VofTopoError;

fn comm_err(neighbor: usize, msg: String) -> VofTopoError {
    VofTopoError::CommError {
        neighbor,
        source: msg.into(),
    }
}

/// Exchanges typed batches with a fixed peer set, symmetrically.
///
/// Every peer in `peers` is sent a count (zero when `outgoing` has no batch
/// for it) and a payload when the count is non-zero; the same is expected
/// inbound. Returns the non-empty inbound batches by peer rank.
pub fn exchange_with_peers<T, C>(
    comm: &C,
    peers: &[usize],
    outgoing: &HashMap<usize, Vec<T>>,
    tag: CommTag,
) -> Result<HashMap<usize, Vec<T>>, VofTopoError>
where
    T: Pod + Zeroable,
    C: Communicator,
{
    // stage 1: counts
    let mut recv_size: HashMap<usize, C::RecvHandle> = HashMap::new();
    let mut size_bufs: HashMap<usize, WireCount> = HashMap::new();
    for &nbr in peers {
        size_bufs.insert(nbr, WireCount::new(0));
    }
    for &nbr in peers {
        let cnt = size_bufs
            .get_mut(&nbr)
            .ok_or_else(|| comm_err(nbr, "missing size buffer".into()))?;
        let h = comm.irecv(
            nbr,
            tag.base(),
            cast_slice_mut(std::slice::from_mut(cnt)),
        );
        recv_size.insert(nbr, h);
    }

    let mut pending_sends = Vec::with_capacity(peers.len());
    let mut send_counts = Vec::with_capacity(peers.len());
    for &nbr in peers {
        let count = WireCount::new(outgoing.get(&nbr).map_or(0, |v| v.len()));
        pending_sends.push(comm.isend(
            nbr,
            tag.base(),
            cast_slice(std::slice::from_ref(&count)),
        ));
        send_counts.push(count);
    }

    let mut sizes_in: HashMap<usize, usize> = HashMap::new();
    let mut maybe_err = None;
    for (nbr, h) in recv_size {
        match h.wait() {
            Some(data) if data.len() == std::mem::size_of::<WireCount>() => {
                let mut cnt = WireCount::new(0);
                cast_slice_mut(std::slice::from_mut(&mut cnt)).copy_from_slice(&data);
                sizes_in.insert(nbr, cnt.get());
            }
            Some(data) if maybe_err.is_none() => {
                maybe_err = Some(comm_err(
                    nbr,
                    format!("expected 4-byte size header, got {}", data.len()),
                ));
            }
            None if maybe_err.is_none() => {
                maybe_err = Some(comm_err(nbr, "size receive returned no data".into()));
            }
            _ => {}
        }
    }
    for send in pending_sends {
        let _ = send.wait();
    }
    if let Some(err) = maybe_err {
        return Err(err);
    }

    // stage 2: payloads on the adjacent tag
    let data_tag = tag.offset(1);
    let item = std::mem::size_of::<T>();
    let mut recv_data: HashMap<usize, (C::RecvHandle, Vec<u8>)> = HashMap::new();
    for (&nbr, &n) in &sizes_in {
        if n == 0 {
            continue;
        }
        let mut buffer = vec![0u8; n * item];
        let h = comm.irecv(nbr, data_tag.base(), &mut buffer);
        recv_data.insert(nbr, (h, buffer));
    }
    let mut pending_sends = Vec::new();
    for &nbr in peers {
        if let Some(items) = outgoing.get(&nbr) {
            if !items.is_empty() {
                pending_sends.push(comm.isend(nbr, data_tag.base(), cast_slice(items)));
            }
        }
    }

    let mut inbound = HashMap::new();
    let mut maybe_err = None;
    for (nbr, (h, buffer)) in recv_data {
        match h.wait() {
            Some(data) if data.len() == buffer.len() => {
                if maybe_err.is_none() {
                    let items: &[T] = cast_slice_from(&data);
                    inbound.insert(nbr, items.to_vec());
                }
            }
            Some(data) if maybe_err.is_none() => {
                maybe_err = Some(comm_err(
                    nbr,
                    format!("expected {} payload bytes, got {}", buffer.len(), data.len()),
                ));
            }
            None if maybe_err.is_none() => {
                maybe_err = Some(comm_err(nbr, "payload receive returned no data".into()));
            }
            _ => {}
        }
    }
    for send in pending_sends {
        let _ = send.wait();
    }
    if let Some(err) = maybe_err {
        return Err(err);
    }
    Ok(inbound)
}

/// Gathers one typed batch from every rank, indexed by rank.
///
/// Serial communicators short-circuit to a single-slot result.
pub fn all_gather<T, C>(comm: &C, local: &[T], tag: CommTag) -> Result<Vec<Vec<T>>, VofTopoError>
where
    T: Pod + Zeroable,
    C: Communicator,
{
    let rank = comm.rank();
    let size = comm.size();
    if size <= 1 {
        return Ok(vec![local.to_vec()]);
    }
    let peers: Vec<usize> = (0..size).filter(|&r| r != rank).collect();
    let outgoing: HashMap<usize, Vec<T>> =
        peers.iter().map(|&r| (r, local.to_vec())).collect();
    let mut inbound = exchange_with_peers(comm, &peers, &outgoing, tag)?;

    let mut out = Vec::with_capacity(size);
    for r in 0..size {
        if r == rank {
            out.push(local.to_vec());
        } else {
            out.push(inbound.remove(&r).unwrap_or_default());
        }
    }
    if out.len() != size {
        return Err(VofTopoError::IncompleteGather {
            want: size,
            got: out.len(),
        });
    }
    Ok(out)
}

/// Gathers one fixed-size value from every rank.
pub fn all_gather_one<T, C>(comm: &C, value: T, tag: CommTag) -> Result<Vec<T>, VofTopoError>
where
    T: Pod + Zeroable,
    C: Communicator,
{
    let gathered = all_gather(comm, std::slice::from_ref(&value), tag)?;
    let mut out = Vec::with_capacity(gathered.len());
    for (rank, batch) in gathered.into_iter().enumerate() {
        match batch.first() {
            Some(v) => out.push(*v),
            None => {
                return Err(comm_err(rank, "empty contribution in gather".into()));
            }
        }
    }
    Ok(out)
}
