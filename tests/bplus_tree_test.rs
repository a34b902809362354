//! Integration tests for the B+tree index

use std::sync::Arc;

use strata::buffer::BufferPoolManager;
use strata::common::{PageId, RecordId, SlotId, INVALID_PAGE_ID};
use strata::index::BPlusTree;
use strata::storage::disk::DiskManager;
use tempfile::NamedTempFile;

fn create_bpm(pool_size: usize) -> (Arc<BufferPoolManager>, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let disk_manager = Arc::new(DiskManager::new(temp_file.path()).unwrap());
    let bpm = Arc::new(BufferPoolManager::new(pool_size, 2, disk_manager));
    (bpm, temp_file)
}

fn rid(key: u64) -> RecordId {
    RecordId::new(PageId::new(key as u32), SlotId::new((key % 100) as u16))
}

fn collect_keys(tree: &BPlusTree<u64, RecordId>) -> Vec<u64> {
    tree.iter()
        .unwrap()
        .map(|entry| entry.unwrap().0)
        .collect()
}

#[test]
fn test_sequential_insert_and_full_scan() {
    let (bpm, _temp) = create_bpm(50);
    let mut tree: BPlusTree<u64, RecordId> = BPlusTree::new("seq", bpm, 4, 4).unwrap();

    for key in 1..=100u64 {
        assert!(tree.insert(&key, &rid(key)).unwrap(), "insert {key}");
    }

    let keys = collect_keys(&tree);
    assert_eq!(keys, (1..=100).collect::<Vec<u64>>());

    for key in 1..=100u64 {
        assert_eq!(tree.get_value(&key).unwrap(), vec![rid(key)]);
    }
    assert!(tree.get_value(&101).unwrap().is_empty());
}

#[test]
fn test_reverse_insert_keeps_order() {
    let (bpm, _temp) = create_bpm(50);
    let mut tree: BPlusTree<u64, RecordId> = BPlusTree::new("rev", bpm, 4, 4).unwrap();

    for key in (1..=100u64).rev() {
        assert!(tree.insert(&key, &rid(key)).unwrap());
    }

    assert_eq!(collect_keys(&tree), (1..=100).collect::<Vec<u64>>());
}

#[test]
fn test_random_insert_and_lookup() {
    use rand::seq::SliceRandom;
    use rand::thread_rng;

    let (bpm, _temp) = create_bpm(50);
    let mut tree: BPlusTree<u64, RecordId> = BPlusTree::new("rand", bpm, 5, 5).unwrap();

    let mut keys: Vec<u64> = (0..500).collect();
    keys.shuffle(&mut thread_rng());
    for &key in &keys {
        assert!(tree.insert(&key, &rid(key)).unwrap());
    }

    assert_eq!(collect_keys(&tree), (0..500).collect::<Vec<u64>>());
    for &key in &keys {
        assert_eq!(tree.get_value(&key).unwrap(), vec![rid(key)]);
    }
}

#[test]
fn test_duplicate_insert_rejected() {
    let (bpm, _temp) = create_bpm(50);
    let mut tree: BPlusTree<u64, RecordId> = BPlusTree::new("dup", bpm, 4, 4).unwrap();

    for key in 0..50u64 {
        assert!(tree.insert(&key, &rid(key)).unwrap());
    }
    for key in 0..50u64 {
        assert!(!tree.insert(&key, &rid(key + 1)).unwrap());
        // The original value is untouched
        assert_eq!(tree.get_value(&key).unwrap(), vec![rid(key)]);
    }
}

#[test]
fn test_minimal_fanout_splits_every_insert() {
    let (bpm, _temp) = create_bpm(50);
    let mut tree: BPlusTree<u64, RecordId> = BPlusTree::new("tiny", bpm, 2, 2).unwrap();

    for key in 1..=20u64 {
        assert!(tree.insert(&key, &rid(key)).unwrap());
    }
    assert_eq!(collect_keys(&tree), (1..=20).collect::<Vec<u64>>());
}

#[test]
fn test_iter_from_positions_at_lower_bound() {
    let (bpm, _temp) = create_bpm(50);
    let mut tree: BPlusTree<u64, RecordId> = BPlusTree::new("bounds", bpm, 4, 4).unwrap();

    for key in (10..=100u64).step_by(10) {
        tree.insert(&key, &rid(key)).unwrap();
    }

    // Present key: iteration starts at it
    let keys: Vec<u64> = tree
        .iter_from(&50)
        .unwrap()
        .map(|e| e.unwrap().0)
        .collect();
    assert_eq!(keys, vec![50, 60, 70, 80, 90, 100]);

    // Absent key: iteration starts at the next larger key
    let keys: Vec<u64> = tree
        .iter_from(&55)
        .unwrap()
        .map(|e| e.unwrap().0)
        .collect();
    assert_eq!(keys, vec![60, 70, 80, 90, 100]);

    // Past the largest key: nothing to yield
    assert!(tree.iter_from(&101).unwrap().next().is_none());
}

#[test]
fn test_remove_simple() {
    let (bpm, _temp) = create_bpm(50);
    let mut tree: BPlusTree<u64, RecordId> = BPlusTree::new("rm", bpm, 4, 4).unwrap();

    for key in 1..=10u64 {
        tree.insert(&key, &rid(key)).unwrap();
    }
    tree.remove(&5).unwrap();
    tree.remove(&5).unwrap(); // absent: no-op

    assert!(tree.get_value(&5).unwrap().is_empty());
    assert_eq!(collect_keys(&tree), vec![1, 2, 3, 4, 6, 7, 8, 9, 10]);
}

#[test]
fn test_remove_drains_to_empty_and_reuses() {
    let (bpm, _temp) = create_bpm(50);
    let mut tree: BPlusTree<u64, RecordId> = BPlusTree::new("drain", bpm, 3, 3).unwrap();

    for key in 1..=30u64 {
        tree.insert(&key, &rid(key)).unwrap();
    }
    for key in 1..=30u64 {
        tree.remove(&key).unwrap();
    }

    assert!(tree.is_empty());
    assert_eq!(tree.root_page_id(), INVALID_PAGE_ID);
    assert!(collect_keys(&tree).is_empty());

    // An emptied tree accepts new inserts
    for key in [3u64, 1, 2] {
        assert!(tree.insert(&key, &rid(key)).unwrap());
    }
    assert_eq!(collect_keys(&tree), vec![1, 2, 3]);
}

#[test]
fn test_remove_exercises_borrow_and_merge() {
    let (bpm, _temp) = create_bpm(50);
    let mut tree: BPlusTree<u64, RecordId> = BPlusTree::new("merge", bpm, 3, 3).unwrap();

    for key in 1..=60u64 {
        tree.insert(&key, &rid(key)).unwrap();
    }

    // Removing a prefix forces leftmost-leaf merges up the tree
    for key in 1..=30u64 {
        tree.remove(&key).unwrap();
        let keys = collect_keys(&tree);
        assert_eq!(keys, ((key + 1)..=60).collect::<Vec<u64>>());
        // Leaf-chain order stays strictly increasing after every step
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }

    // Removing a suffix forces the symmetric right-edge path
    for key in (46..=60u64).rev() {
        tree.remove(&key).unwrap();
    }
    assert_eq!(collect_keys(&tree), (31..=45).collect::<Vec<u64>>());
}

#[test]
fn test_remove_random_half() {
    use rand::seq::SliceRandom;
    use rand::thread_rng;

    let (bpm, _temp) = create_bpm(50);
    let mut tree: BPlusTree<u64, RecordId> = BPlusTree::new("rmrand", bpm, 4, 4).unwrap();

    let mut keys: Vec<u64> = (0..200).collect();
    keys.shuffle(&mut thread_rng());
    for &key in &keys {
        tree.insert(&key, &rid(key)).unwrap();
    }

    let (gone, kept) = keys.split_at(100);
    let mut gone = gone.to_vec();
    gone.shuffle(&mut thread_rng());
    for &key in &gone {
        tree.remove(&key).unwrap();
    }

    let mut expected: Vec<u64> = kept.to_vec();
    expected.sort_unstable();
    assert_eq!(collect_keys(&tree), expected);

    for &key in &gone {
        assert!(tree.get_value(&key).unwrap().is_empty());
    }
    for &key in kept {
        assert_eq!(tree.get_value(&key).unwrap(), vec![rid(key)]);
    }
}

#[test]
fn test_two_trees_share_the_header_page() {
    let (bpm, _temp) = create_bpm(50);

    let mut orders: BPlusTree<u64, RecordId> =
        BPlusTree::new("orders_pk", Arc::clone(&bpm), 4, 4).unwrap();
    let mut users: BPlusTree<u64, RecordId> =
        BPlusTree::new("users_pk", Arc::clone(&bpm), 4, 4).unwrap();

    for key in 0..40u64 {
        orders.insert(&key, &rid(key)).unwrap();
        users.insert(&(key + 1000), &rid(key)).unwrap();
    }

    assert_ne!(orders.root_page_id(), users.root_page_id());
    assert_eq!(collect_keys(&orders), (0..40).collect::<Vec<u64>>());
    assert_eq!(collect_keys(&users), (1000..1040).collect::<Vec<u64>>());
}

#[test]
fn test_reopen_after_flush_finds_all_keys() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_path_buf();

    {
        let dm = Arc::new(DiskManager::new(&path).unwrap());
        let bpm = Arc::new(BufferPoolManager::new(50, 2, dm));
        let mut tree: BPlusTree<u64, RecordId> =
            BPlusTree::new("persist", Arc::clone(&bpm), 4, 4).unwrap();
        for key in 1..=50u64 {
            tree.insert(&key, &rid(key)).unwrap();
        }
        bpm.flush_all_pages().unwrap();
    }

    let dm = Arc::new(DiskManager::new(&path).unwrap());
    let bpm = Arc::new(BufferPoolManager::new(50, 2, dm));
    let tree: BPlusTree<u64, RecordId> = BPlusTree::new("persist", bpm, 4, 4).unwrap();

    assert!(!tree.is_empty());
    assert_eq!(collect_keys(&tree), (1..=50).collect::<Vec<u64>>());
}

#[test]
fn test_dump_and_draw_render_the_tree() {
    let (bpm, _temp) = create_bpm(50);
    let mut tree: BPlusTree<u64, RecordId> = BPlusTree::new("viz", bpm, 4, 4).unwrap();

    for key in 1..=20u64 {
        tree.insert(&key, &rid(key)).unwrap();
    }

    let text = tree.dump().unwrap();
    assert!(text.contains("internal"));
    assert!(text.contains("leaf"));

    let mut dot = Vec::new();
    tree.draw(&mut dot).unwrap();
    let dot = String::from_utf8(dot).unwrap();
    assert!(dot.starts_with("digraph"));
    assert!(dot.contains("->"));
}
