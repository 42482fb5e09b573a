//! Integration tests for the buffer pool manager.
//!
//! These run the pool over real files and across threads, covering
//! behavior that unit tests don't reach.

use std::sync::Arc;
use std::thread;

use pagecache::buffer::replacer::ReplacerKind;
use pagecache::buffer::BufferPoolManager;
use pagecache::storage::FileDiskManager;
use pagecache::{BufferPoolConfig, FileId, PageId};
use tempfile::tempdir;

fn create_bpm(pool_size: usize) -> (BufferPoolManager, FileId, tempfile::TempDir) {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempdir().unwrap();
    let mut dm = FileDiskManager::new();
    let fd = dm.open_file(dir.path().join("test.db")).unwrap();
    (BufferPoolManager::new(pool_size, dm), fd, dir)
}

/// Test data persistence across multiple eviction cycles.
#[test]
fn test_data_persistence_across_evictions() {
    let (bpm, fd, _dir) = create_bpm(2);

    // Create 5 pages with unique data (forces evictions)
    let mut page_ids = vec![];
    for i in 0u8..5 {
        let mut guard = bpm.new_page_guarded(fd).unwrap();
        guard.as_mut_slice()[0] = i;
        guard.as_mut_slice()[1] = i.wrapping_mul(3);
        page_ids.push(guard.page_id());
    }

    // Read all back - verifies evicted pages were written
    for (i, &pid) in page_ids.iter().enumerate() {
        let guard = bpm.fetch_page_read(pid).unwrap();
        assert_eq!(guard.as_slice()[0], i as u8);
        assert_eq!(guard.as_slice()[1], (i as u8).wrapping_mul(3));
    }
}

/// Same workload under CLOCK replacement.
#[test]
fn test_clock_pool_persistence() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempdir().unwrap();
    let mut dm = FileDiskManager::new();
    let fd = dm.open_file(dir.path().join("clock.db")).unwrap();
    let config = BufferPoolConfig::default()
        .pool_size(3)
        .replacer(ReplacerKind::Clock);
    let bpm = BufferPoolManager::with_config(config, dm).unwrap();

    let page_ids: Vec<PageId> = (0u8..10)
        .map(|i| {
            let mut guard = bpm.new_page_guarded(fd).unwrap();
            guard.as_mut_slice()[7] = i;
            guard.page_id()
        })
        .collect();

    for (i, &pid) in page_ids.iter().enumerate().rev() {
        let guard = bpm.fetch_page_read(pid).unwrap();
        assert_eq!(guard.as_slice()[7], i as u8);
    }
    assert_eq!(bpm.page_count(), 3);
}

/// Test flush and reload across pool instances.
#[test]
fn test_flush_and_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");
    let data = b"persistent!";

    let pid;

    // First session: create and write
    {
        let mut dm = FileDiskManager::new();
        let fd = dm.open_file(&path).unwrap();
        let bpm = BufferPoolManager::new(10, dm);

        let mut guard = bpm.new_page_guarded(fd).unwrap();
        pid = guard.page_id();
        guard.as_mut_slice()[..data.len()].copy_from_slice(data);
        drop(guard);

        bpm.flush_all_pages(fd).unwrap();
    }

    // Second session: same path, fresh ids
    {
        let mut dm = FileDiskManager::new();
        let fd = dm.open_file(&path).unwrap();
        assert_eq!(dm.page_count(fd).unwrap(), 1);
        let bpm = BufferPoolManager::new(10, dm);

        let guard = bpm.fetch_page_read(PageId::new(fd, pid.page_no)).unwrap();
        assert_eq!(&guard.as_slice()[..data.len()], data);
    }
}

/// Pages of different files never alias each other.
#[test]
fn test_two_files_share_one_pool() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempdir().unwrap();
    let mut dm = FileDiskManager::new();
    let a = dm.open_file(dir.path().join("a.db")).unwrap();
    let b = dm.open_file(dir.path().join("b.db")).unwrap();
    let bpm = BufferPoolManager::new(2, dm);

    for round in 0u8..4 {
        for (fd, tag) in [(a, 0xA0), (b, 0xB0)] {
            let mut guard = bpm.new_page_guarded(fd).unwrap();
            assert_eq!(guard.page_id(), PageId::new(fd, round as u32));
            guard.as_mut_slice()[0] = tag + round;
        }
    }

    for round in 0u8..4 {
        for (fd, tag) in [(a, 0xA0), (b, 0xB0)] {
            let guard = bpm.fetch_page_read(PageId::new(fd, round as u32)).unwrap();
            assert_eq!(guard.as_slice()[0], tag + round);
        }
    }
}

/// Test concurrent writers to different pages.
#[test]
fn test_concurrent_writers() {
    let (bpm, fd, _dir) = create_bpm(10);
    let bpm = Arc::new(bpm);

    let page_ids: Vec<PageId> = (0..5)
        .map(|_| bpm.new_page_guarded(fd).unwrap().page_id())
        .collect();

    let mut handles = vec![];

    for (i, pid) in page_ids.iter().enumerate() {
        let bpm_clone = Arc::clone(&bpm);
        let pid = *pid;

        handles.push(thread::spawn(move || {
            for j in 0..50 {
                let mut guard = bpm_clone.fetch_page_write(pid).unwrap();
                guard.as_mut_slice()[0] = ((i * 50 + j) % 256) as u8;
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }

    // Verify each page has last written value
    for (i, &pid) in page_ids.iter().enumerate() {
        let guard = bpm.fetch_page_read(pid).unwrap();
        assert_eq!(guard.as_slice()[0], ((i * 50 + 49) % 256) as u8);
    }
}

/// Threads churn through more pages than frames; every page keeps its data.
#[test]
fn test_concurrent_eviction_churn() {
    const THREADS: usize = 4;
    const PAGES_PER_THREAD: u32 = 16;

    let (bpm, fd, _dir) = create_bpm(8);
    let bpm = Arc::new(bpm);

    let page_ids: Vec<PageId> = (0..THREADS as u32 * PAGES_PER_THREAD)
        .map(|i| {
            let mut guard = bpm.new_page_guarded(fd).unwrap();
            guard.as_mut_slice()[..4].copy_from_slice(&i.to_le_bytes());
            guard.page_id()
        })
        .collect();
    let page_ids = Arc::new(page_ids);

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let bpm = Arc::clone(&bpm);
            let page_ids = Arc::clone(&page_ids);
            thread::spawn(move || {
                for round in 0..3 {
                    for k in 0..PAGES_PER_THREAD as usize {
                        let idx = t * PAGES_PER_THREAD as usize + k;
                        let mut guard = bpm.fetch_page_write(page_ids[idx]).unwrap();
                        let stamp = u32::from_le_bytes(guard.as_slice()[..4].try_into().unwrap());
                        assert_eq!(stamp, idx as u32);
                        guard.as_mut_slice()[4] = round;
                    }
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    for (idx, &pid) in page_ids.iter().enumerate() {
        let guard = bpm.fetch_page_read(pid).unwrap();
        assert_eq!(&guard.as_slice()[..4], &(idx as u32).to_le_bytes());
        assert_eq!(guard.as_slice()[4], 2);
    }
    assert_eq!(bpm.evictable_count() + bpm.free_frame_count(), 8);
}

/// A thread flushes a page through the guard it holds; the flush returns
/// and the bytes are on disk before the guard is dropped.
#[test]
fn test_flush_while_holding_guard() {
    use std::sync::mpsc;
    use std::time::Duration;

    use pagecache::storage::DiskManager;
    use pagecache::PAGE_SIZE;

    let (bpm, fd, dir) = create_bpm(4);
    let bpm = Arc::new(bpm);
    let (flushed_tx, flushed_rx) = mpsc::channel();
    let (done_tx, done_rx) = mpsc::channel::<()>();

    let worker = {
        let bpm = Arc::clone(&bpm);
        thread::spawn(move || {
            let mut guard = bpm.new_page_guarded(fd).unwrap();
            guard.as_mut_slice()[..6].copy_from_slice(b"synced");
            guard.flush().unwrap();
            flushed_tx.send(guard.page_id()).unwrap();
            // Keep the guard until the main thread has checked the file.
            done_rx.recv().unwrap();
        })
    };

    let page_id = flushed_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(bpm.is_dirty(page_id), Some(false));
    assert_eq!(bpm.pin_count(page_id), Some(1));

    let mut reader = FileDiskManager::new();
    let other = reader.open_file(dir.path().join("test.db")).unwrap();
    let mut buf = [0u8; PAGE_SIZE];
    reader
        .read_page(PageId::new(other, page_id.page_no), &mut buf)
        .unwrap();
    assert_eq!(&buf[..6], b"synced");

    done_tx.send(()).unwrap();
    worker.join().unwrap();
    assert_eq!(bpm.is_dirty(page_id), Some(false));
}

/// Test stats accuracy under load.
#[test]
fn test_stats_accuracy() {
    let (bpm, fd, _dir) = create_bpm(2);

    let pid = bpm.new_page_guarded(fd).unwrap().page_id();

    // Multiple fetches = cache hits
    for _ in 0..5 {
        let _ = bpm.fetch_page_read(pid).unwrap();
    }

    let stats = bpm.stats().snapshot();
    assert_eq!(stats.hits, 5);
    assert_eq!(stats.misses, 0);

    // Force eviction
    let _ = bpm.new_page_guarded(fd).unwrap();
    let _ = bpm.new_page_guarded(fd).unwrap();

    let stats = bpm.stats().snapshot();
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.pages_written, 1);
}
