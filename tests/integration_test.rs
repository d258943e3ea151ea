use anyhow::{anyhow, Result};
use pagedb::access::{RecordId, TableFile, Tuple};
use pagedb::catalog::TableId;
use pagedb::concurrency::LockMode;
use pagedb::config::DbConfig;
use pagedb::database::Database;
use pagedb::error::Error;
use pagedb::storage::page::PageId;
use pagedb::transaction::{Transaction, TransactionId};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::tempdir;

const WIDTH: usize = 4;
const PAGE_SIZE: usize = 64; // 15 slots per page

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn small_config(pool_pages: usize) -> DbConfig {
    DbConfig::default()
        .with_buffer_pool_pages(pool_pages)
        .with_page_size(PAGE_SIZE)
}

fn wait_until_blocked(db: &Database, tid: TransactionId, page_id: PageId) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while db.lock_manager().waiting_on(tid) != Some(page_id) {
        assert!(Instant::now() < deadline, "{} never blocked on {}", tid, page_id);
        thread::sleep(Duration::from_millis(5));
    }
}

fn scan_ints(txn: &Transaction, table: TableId) -> Result<Vec<i32>> {
    let mut values = Vec::new();
    for tuple in txn.scan(table)? {
        values.push(tuple?.ints()[0]);
    }
    Ok(values)
}

/// Writes `0..rows` into a fresh table file through a throwaway database.
fn populate(path: &Path, rows: i32) -> Result<()> {
    let db = Database::new(small_config(16))?;
    let table = db.create_table(path, "seed", WIDTH)?;
    let txn = db.begin();
    for i in 0..rows {
        txn.insert_tuple(table, &mut Tuple::from_ints(&[i]))?;
    }
    txn.commit()?;
    Ok(())
}

#[test]
fn test_reader_blocks_until_writer_commits() -> Result<()> {
    init_logging();
    let dir = tempdir()?;
    let path = dir.path().join("t.tbl");
    populate(&path, 16)?; // page 0 full, one row on page 1

    let db = Database::new(small_config(2))?;
    let table = db.open_table(&path, "t", WIDTH)?;
    let page0 = PageId::new(table, 0);
    let page1 = PageId::new(table, 1);

    // The writer dirties both pages, filling the cache.
    let writer = db.begin();
    for page_id in [page0, page1] {
        let page = writer.get_page(page_id, LockMode::Exclusive)?;
        let first = page.read().tuple(0).ok_or_else(|| anyhow!("{} is empty", page_id))?;
        writer.delete_tuple(&first)?;
    }
    assert_eq!(db.buffer_pool().cached_pages(), 2);
    assert_eq!(db.lock_manager().exclusive_holder(page0), Some(writer.id()));
    assert_eq!(db.lock_manager().exclusive_holder(page1), Some(writer.id()));

    let reader = db.begin();
    let reader_id = reader.id();
    let handle = thread::spawn(move || -> pagedb::error::Result<Vec<i32>> {
        let page = reader.get_page(page0, LockMode::Shared)?;
        let values: Vec<i32> = page.read().tuples().map(|t| t.ints()[0]).collect();
        reader.commit()?;
        Ok(values)
    });

    wait_until_blocked(&db, reader_id, page0);
    assert!(!handle.is_finished());

    db.buffer_pool().transaction_complete(writer.id(), true)?;
    let values = handle.join().map_err(|_| anyhow!("reader panicked"))??;
    assert_eq!(values, (1..15).collect::<Vec<_>>());
    assert_eq!(db.lock_manager().exclusive_holder(page0), None);
    assert!(db.lock_manager().shared_holders(page0).is_empty());

    // Both deletes reached disk.
    let file = db.catalog().table_file(table)?;
    assert_eq!(file.read_page(page0)?.num_empty_slots(), 1);
    assert_eq!(file.read_page(page1)?.num_empty_slots(), 15);
    writer.commit()?;
    Ok(())
}

#[test]
fn test_readers_share_a_page() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("t.tbl");
    populate(&path, 3)?;

    let db = Database::new(small_config(2))?;
    let table = db.open_table(&path, "t", WIDTH)?;
    let page0 = PageId::new(table, 0);

    let a = db.begin();
    let b = db.begin();
    assert_eq!(scan_ints(&a, table)?, vec![0, 1, 2]);
    assert_eq!(scan_ints(&b, table)?, vec![0, 1, 2]);
    assert_eq!(db.lock_manager().shared_holders(page0), vec![a.id(), b.id()]);
    assert_eq!(db.lock_manager().exclusive_holder(page0), None);

    // Two shared holders: neither can upgrade without waiting, and the second to try is
    // the one closing the cycle.
    let a_id = a.id();
    let handle = thread::spawn(move || {
        let result = a.get_page(page0, LockMode::Exclusive).map(|_| ());
        (a, result)
    });
    wait_until_blocked(&db, a_id, page0);

    let err = b
        .get_page(page0, LockMode::Exclusive)
        .err()
        .ok_or_else(|| anyhow!("upgrade should have deadlocked"))?;
    assert!(err.is_deadlock());
    b.abort()?;

    let (a, result) = handle.join().map_err(|_| anyhow!("upgrader panicked"))?;
    result?;
    assert_eq!(db.lock_manager().exclusive_holder(page0), Some(a.id()));
    a.commit()?;
    Ok(())
}

#[test]
fn test_deadlock_aborts_one_transaction() -> Result<()> {
    init_logging();
    let dir = tempdir()?;
    let path = dir.path().join("t.tbl");
    populate(&path, 16)?; // page 0 full, one row on page 1

    let db = Database::new(small_config(4))?;
    let table = db.open_table(&path, "t", WIDTH)?;
    let page0 = PageId::new(table, 0);
    let page1 = PageId::new(table, 1);

    let t1 = db.begin();
    let t2 = db.begin();
    t1.get_page(page0, LockMode::Shared)?;
    t2.get_page(page1, LockMode::Shared)?;

    let t1_id = t1.id();
    let handle = thread::spawn(move || {
        let result = t1.get_page(page1, LockMode::Exclusive).map(|_| ());
        (t1, result)
    });
    wait_until_blocked(&db, t1_id, page1);

    let t2_id = t2.id();
    match t2.get_page(page0, LockMode::Exclusive) {
        Err(Error::TransactionAborted { tid, page_id }) => {
            assert_eq!(tid, t2_id);
            assert_eq!(page_id, page0);
        }
        other => return Err(anyhow!("expected deadlock, got {:?}", other.map(|_| ()))),
    }
    assert_eq!(db.lock_manager().waiting_on(t2_id), None);
    t2.abort()?;

    let (t1, result) = handle.join().map_err(|_| anyhow!("t1 panicked"))?;
    result?;
    assert_eq!(db.lock_manager().exclusive_holder(page1), Some(t1_id));
    assert!(!db.lock_manager().holds(t2_id, page1));
    t1.commit()?;
    assert!(db.lock_manager().pages_held(t1_id).is_empty());
    Ok(())
}

#[test]
fn test_insert_grows_file_with_single_frame() -> Result<()> {
    let dir = tempdir()?;
    let db = Database::new(small_config(1))?;
    let table = db.create_table(&dir.path().join("t.tbl"), "t", WIDTH)?;

    let txn = db.begin();
    let mut first = Tuple::from_ints(&[0]);
    txn.insert_tuple(table, &mut first)?;
    assert_eq!(
        first.record_id,
        Some(RecordId::new(PageId::new(table, 0), 0))
    );
    for i in 1..15 {
        txn.insert_tuple(table, &mut Tuple::from_ints(&[i]))?;
    }
    txn.commit()?;
    let file = db.catalog().table_file(table)?;
    assert_eq!(file.num_pages()?, 1);
    assert_eq!(file.read_page(PageId::new(table, 0))?.num_empty_slots(), 0);

    // Page 0 is full and clean; it gets evicted to make room for page 1.
    let txn = db.begin();
    let mut tuple = Tuple::from_ints(&[15]);
    txn.insert_tuple(table, &mut tuple)?;
    assert_eq!(tuple.record_id.map(|r| r.page_id), Some(PageId::new(table, 1)));
    assert_eq!(db.buffer_pool().cached_pages(), 1);
    assert!(db.buffer_pool().is_cached(PageId::new(table, 1)));
    txn.commit()?;

    assert_eq!(file.num_pages()?, 2);
    let txn = db.begin();
    assert_eq!(scan_ints(&txn, table)?, (0..16).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn test_abort_discards_changes() -> Result<()> {
    let dir = tempdir()?;
    let db = Database::new(small_config(4))?;
    let table = db.create_table(&dir.path().join("t.tbl"), "t", WIDTH)?;

    let txn = db.begin();
    txn.insert_tuple(table, &mut Tuple::from_ints(&[7]))?;
    txn.abort()?;

    // The page allocated for the insert survives, but empty.
    let file = db.catalog().table_file(table)?;
    assert_eq!(file.num_pages()?, 1);
    assert_eq!(file.read_page(PageId::new(table, 0))?.num_empty_slots(), 15);

    let txn = db.begin();
    assert!(scan_ints(&txn, table)?.is_empty());
    txn.commit()?;

    // Deletes roll back too.
    let txn = db.begin();
    let mut tuple = Tuple::from_ints(&[8]);
    txn.insert_tuple(table, &mut tuple)?;
    txn.commit()?;

    let txn = db.begin();
    txn.delete_tuple(&tuple)?;
    assert!(scan_ints(&txn, table)?.is_empty());
    txn.abort()?;

    let txn = db.begin();
    assert_eq!(scan_ints(&txn, table)?, vec![8]);
    Ok(())
}

#[test]
fn test_commit_survives_restart() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("t.tbl");

    let tuple = {
        let db = Database::new(small_config(4))?;
        let table = db.create_table(&path, "t", WIDTH)?;
        let txn = db.begin();
        let mut tuple = Tuple::from_ints(&[1234]);
        txn.insert_tuple(table, &mut tuple)?;
        txn.commit()?;
        tuple
    };

    let db = Database::new(small_config(4))?;
    let table = db.open_table(&path, "t", WIDTH)?;
    let record_id = tuple.record_id.ok_or_else(|| anyhow!("insert left no record id"))?;
    let txn = db.begin();
    let page = txn.get_page(PageId::new(table, record_id.page_id.page_no), LockMode::Shared)?;
    let stored = page
        .read()
        .tuple(record_id.slot as usize)
        .ok_or_else(|| anyhow!("slot is empty after restart"))?;
    assert_eq!(stored.data, tuple.data);
    Ok(())
}

#[test]
fn test_dirty_pages_pin_the_pool() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("t.tbl");
    populate(&path, 45)?; // three full pages

    let db = Database::new(small_config(2))?;
    let table = db.open_table(&path, "t", WIDTH)?;

    let txn = db.begin();
    let tuples: Vec<Tuple> = txn.scan(table)?.collect::<pagedb::error::Result<_>>()?;
    assert_eq!(tuples.len(), 45);

    // Dirty pages 0 and 1.
    txn.delete_tuple(&tuples[0])?;
    txn.delete_tuple(&tuples[15])?;

    let err = txn
        .scan(table)?
        .find_map(|t| t.err())
        .ok_or_else(|| anyhow!("scan should run out of frames"))?;
    assert!(matches!(err, Error::BufferPoolFull { capacity: 2 }));
    assert!(matches!(
        db.buffer_pool().evict_page(),
        Err(Error::BufferPoolFull { .. })
    ));
    txn.abort()?;

    let txn = db.begin();
    assert_eq!(scan_ints(&txn, table)?, (0..45).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn test_concurrent_writers() -> Result<()> {
    init_logging();
    let dir = tempdir()?;
    let db = Arc::new(Database::new(small_config(8))?);
    let table = db.create_table(&dir.path().join("t.tbl"), "t", WIDTH)?;

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let db = Arc::clone(&db);
            thread::spawn(move || -> pagedb::error::Result<()> {
                loop {
                    let txn = db.begin();
                    let result = (0..10).try_for_each(|i| {
                        txn.insert_tuple(table, &mut Tuple::from_ints(&[worker * 100 + i]))
                    });
                    match result {
                        Ok(()) => return txn.commit(),
                        Err(e) if e.is_deadlock() => txn.abort()?,
                        Err(e) => return Err(e),
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().map_err(|_| anyhow!("writer panicked"))??;
    }

    let txn = db.begin();
    let mut values = scan_ints(&txn, table)?;
    values.sort();
    let mut expected: Vec<i32> = (0..4).flat_map(|w| (0..10).map(move |i| w * 100 + i)).collect();
    expected.sort();
    assert_eq!(values, expected);
    Ok(())
}
