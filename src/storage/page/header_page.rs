use crate::common::{PageId, PAGE_SIZE};

const RECORD_COUNT_OFFSET: usize = 0;
const RECORDS_OFFSET: usize = 8;

// One record: length-prefixed name (1 + 31 bytes) + root page id (4 bytes)
const NAME_CAPACITY: usize = 31;
const RECORD_SIZE: usize = 1 + NAME_CAPACITY + 4;

/// Longest index name a header record can hold.
pub const MAX_INDEX_NAME_LEN: usize = NAME_CAPACITY;

/// Most records a header page can hold.
pub const MAX_HEADER_RECORDS: usize = (PAGE_SIZE - RECORDS_OFFSET) / RECORD_SIZE;

fn record_count(data: &[u8]) -> usize {
    u32::from_le_bytes(data[RECORD_COUNT_OFFSET..RECORD_COUNT_OFFSET + 4].try_into().unwrap())
        as usize
}

fn record_offset(index: usize) -> usize {
    RECORDS_OFFSET + index * RECORD_SIZE
}

fn record_name(data: &[u8], index: usize) -> &[u8] {
    let off = record_offset(index);
    let len = data[off] as usize;
    &data[off + 1..off + 1 + len]
}

fn record_root(data: &[u8], index: usize) -> PageId {
    let off = record_offset(index) + 1 + NAME_CAPACITY;
    PageId::new(u32::from_le_bytes(data[off..off + 4].try_into().unwrap()))
}

fn find_index(data: &[u8], name: &str) -> Option<usize> {
    (0..record_count(data)).find(|&i| record_name(data, i) == name.as_bytes())
}

/// Read-only view of the header page (page id 0), which stores the
/// `{index name -> root page id}` table.
pub struct HeaderPageRef<'a> {
    data: &'a [u8],
}

impl<'a> HeaderPageRef<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        assert_eq!(data.len(), PAGE_SIZE);
        Self { data }
    }

    pub fn record_count(&self) -> usize {
        record_count(self.data)
    }

    /// Root page id recorded under `name`, if any.
    pub fn find_record(&self, name: &str) -> Option<PageId> {
        find_index(self.data, name).map(|i| record_root(self.data, i))
    }
}

/// Mutable view of the header page.
pub struct HeaderPage<'a> {
    data: &'a mut [u8],
}

impl<'a> HeaderPage<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        assert_eq!(data.len(), PAGE_SIZE);
        Self { data }
    }

    pub fn init(&mut self) {
        self.data.fill(0);
    }

    pub fn record_count(&self) -> usize {
        record_count(self.data)
    }

    pub fn find_record(&self, name: &str) -> Option<PageId> {
        find_index(self.data, name).map(|i| record_root(self.data, i))
    }

    fn set_record_count(&mut self, count: usize) {
        self.data[RECORD_COUNT_OFFSET..RECORD_COUNT_OFFSET + 4]
            .copy_from_slice(&(count as u32).to_le_bytes());
    }

    fn write_record(&mut self, index: usize, name: &str, root: PageId) {
        debug_assert!(name.len() <= NAME_CAPACITY);
        let off = record_offset(index);
        self.data[off..off + RECORD_SIZE].fill(0);
        self.data[off] = name.len() as u8;
        self.data[off + 1..off + 1 + name.len()].copy_from_slice(name.as_bytes());
        self.data[off + 1 + NAME_CAPACITY..off + RECORD_SIZE]
            .copy_from_slice(&root.as_u32().to_le_bytes());
    }

    /// Adds a record; false when the name already exists or the page is full.
    pub fn insert_record(&mut self, name: &str, root: PageId) -> bool {
        let count = self.record_count();
        if count >= MAX_HEADER_RECORDS || find_index(self.data, name).is_some() {
            return false;
        }
        self.write_record(count, name, root);
        self.set_record_count(count + 1);
        true
    }

    /// Rewrites an existing record's root; false when absent.
    pub fn update_record(&mut self, name: &str, root: PageId) -> bool {
        match find_index(self.data, name) {
            Some(i) => {
                let off = record_offset(i) + 1 + NAME_CAPACITY;
                self.data[off..off + 4].copy_from_slice(&root.as_u32().to_le_bytes());
                true
            }
            None => false,
        }
    }

    /// Drops a record, moving the last record into its slot; false when
    /// absent.
    pub fn delete_record(&mut self, name: &str) -> bool {
        let Some(i) = find_index(self.data, name) else {
            return false;
        };
        let count = self.record_count();
        let last = count - 1;
        if i != last {
            let (src, dst) = (record_offset(last), record_offset(i));
            let moved: Vec<u8> = self.data[src..src + RECORD_SIZE].to_vec();
            self.data[dst..dst + RECORD_SIZE].copy_from_slice(&moved);
        }
        let off = record_offset(last);
        self.data[off..off + RECORD_SIZE].fill(0);
        self.set_record_count(last);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_page_has_no_records() {
        let data = [0u8; PAGE_SIZE];
        let page = HeaderPageRef::new(&data);
        assert_eq!(page.record_count(), 0);
        assert_eq!(page.find_record("orders_pk"), None);
    }

    #[test]
    fn test_insert_find_update() {
        let mut data = [0u8; PAGE_SIZE];
        let mut page = HeaderPage::new(&mut data);
        page.init();

        assert!(page.insert_record("orders_pk", PageId::new(3)));
        assert!(!page.insert_record("orders_pk", PageId::new(4)));
        assert_eq!(page.find_record("orders_pk"), Some(PageId::new(3)));

        assert!(page.update_record("orders_pk", PageId::new(9)));
        assert_eq!(page.find_record("orders_pk"), Some(PageId::new(9)));
        assert!(!page.update_record("missing", PageId::new(1)));
    }

    #[test]
    fn test_delete_compacts_records() {
        let mut data = [0u8; PAGE_SIZE];
        let mut page = HeaderPage::new(&mut data);
        page.init();

        page.insert_record("a", PageId::new(1));
        page.insert_record("b", PageId::new(2));
        page.insert_record("c", PageId::new(3));

        assert!(page.delete_record("a"));
        assert_eq!(page.record_count(), 2);
        assert_eq!(page.find_record("a"), None);
        assert_eq!(page.find_record("b"), Some(PageId::new(2)));
        assert_eq!(page.find_record("c"), Some(PageId::new(3)));
        assert!(!page.delete_record("a"));
    }
}
