use std::sync::Arc;

use strata::buffer::BufferPoolManager;
use strata::common::{PageId, RecordId, SlotId};
use strata::index::BPlusTree;
use strata::storage::disk::DiskManager;

fn main() {
    println!("Strata - disk-oriented storage and indexing core");
    println!("================================================\n");

    let db_path = "demo.db";
    let disk = Arc::new(DiskManager::new(db_path).expect("failed to open database file"));
    println!("Opened database file: {}", db_path);

    let bpm = Arc::new(BufferPoolManager::new(16, 2, Arc::clone(&disk)));
    println!("Created buffer pool with 16 frames (LRU-2 replacement)\n");

    let mut tree: BPlusTree<u64, RecordId> =
        BPlusTree::new("demo_index", Arc::clone(&bpm), 8, 8).expect("failed to open index");

    for key in [42u64, 7, 19, 3, 88, 61, 25, 50, 11, 73] {
        let value = RecordId::new(PageId::new(key as u32), SlotId::new(0));
        tree.insert(&key, &value).expect("insert failed");
    }
    println!("Inserted 10 keys; root is {}", tree.root_page_id());

    print!("Keys in order:");
    for entry in tree.iter().expect("iterator failed") {
        let (key, _) = entry.expect("scan failed");
        print!(" {}", key);
    }
    println!("\n");

    println!("Tree structure:\n{}", tree.dump().expect("dump failed"));

    bpm.flush_all_pages().expect("flush failed");
    println!(
        "Disk stats: {} pages, {} reads, {} writes",
        disk.num_pages(),
        disk.num_reads(),
        disk.num_writes()
    );

    std::fs::remove_file(db_path).ok();
    println!("\nDemo completed successfully!");
}
