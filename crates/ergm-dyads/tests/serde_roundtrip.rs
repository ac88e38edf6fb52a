use ergm_dyads::{
    canonical_hash, constraints, map_from_bytes, map_from_json, map_to_bytes, map_to_json,
    DyadSpace, FreeDyadMap, Run,
};

#[test]
fn maps_round_trip_through_json_and_bincode() {
    let space = DyadSpace::bipartite(7, 3, true).unwrap();
    let map = constraints::block_diagonal(&space, &[1, 1, 2, 1, 2, 2, 2]).unwrap();

    let json = map_to_json(&map).unwrap();
    assert_eq!(map_from_json(&json).unwrap(), map);

    let bytes = map_to_bytes(&map).unwrap();
    assert_eq!(map_from_bytes(&bytes).unwrap(), map);
}

#[test]
fn hash_ignores_run_fragmentation() {
    let space = DyadSpace::new(2, true, None, true).unwrap();
    let fragmented = FreeDyadMap::from_runs(
        space,
        vec![Run::new(1, true), Run::new(1, true), Run::new(2, false)],
    )
    .unwrap();
    let canonical = FreeDyadMap::from_runs(space, vec![Run::new(2, true), Run::new(2, false)]).unwrap();
    assert_ne!(fragmented, canonical);
    assert_eq!(canonical_hash(&fragmented), canonical_hash(&canonical));
    assert_ne!(
        canonical_hash(&canonical),
        canonical_hash(&canonical.not())
    );
}

#[test]
fn corrupted_payload_is_rejected() {
    let map = FreeDyadMap::baseline(DyadSpace::undirected(3));
    let json = map_to_json(&map).unwrap().replace("\"n\": 3", "\"n\": 4");
    let err = map_from_json(&json).unwrap_err();
    assert_eq!(err.info().code, "run-length-sum");
}
