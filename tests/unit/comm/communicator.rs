use super::*;
use crate::comm::local::LocalCluster;

#[test]
fn allgather_returns_every_rank_in_order() {
    let out = LocalCluster::run(4, |comm| comm.allgather(&[comm.rank() as u8; 2])).unwrap();
    for per_rank in out {
        let per_rank = per_rank.unwrap();
        assert_eq!(per_rank, vec![vec![0, 0], vec![1, 1], vec![2, 2], vec![3, 3]]);
    }
}

#[test]
fn gather_only_fills_destination() {
    let out = LocalCluster::run(3, |comm| comm.gather(&[comm.rank() as u8 * 10], 1)).unwrap();
    assert_eq!(out[0].as_ref().unwrap(), &None);
    assert_eq!(out[1].as_ref().unwrap(), &Some(vec![vec![0], vec![10], vec![20]]));
    assert_eq!(out[2].as_ref().unwrap(), &None);
}

#[test]
fn counting_comm_tracks_sent_payload() {
    let out = LocalCluster::run(2, |comm| {
        let counting = CountingComm::new(comm);
        if counting.rank() == 0 {
            let req = counting.isend(1, 7, vec![0; 12])?;
            counting.wait_all(&[req])?;
        } else {
            assert_eq!(counting.recv(0, 7)?.len(), 12);
        }
        Ok::<_, CompositeError>(counting.bytes_sent())
    })
    .unwrap();
    assert_eq!(out[0].as_ref().unwrap(), &12);
    assert_eq!(out[1].as_ref().unwrap(), &0);
}

#[test]
fn null_requests_are_never_pending() {
    let r = RecvRequest::null();
    assert!(!r.is_pending());
    assert!(RecvRequest::new(0, 1).is_pending());
}
