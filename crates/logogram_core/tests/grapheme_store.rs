use logogram_core::db::{open_db, open_db_in_memory};
use logogram_core::{
    render_grapheme, DisabledArchiveSink, EngineError, FsArchiveSink, GenerateRequest, Grapheme,
    GraphemeRepository, GraphemeStore, LogogramEngine, Modality, ParameterVector, RepoError,
    RepoResult, SqliteGraphemeRepository, StoreError, WriteOutcome,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

/// Counts writes and stalls each one, widening the creation window.
/// `stale_reads` makes the next N reads miss as if another writer had not
/// committed yet.
struct SlowRepo {
    inner: SqliteGraphemeRepository,
    writes: AtomicUsize,
    stale_reads: AtomicUsize,
    delay: Duration,
}

impl SlowRepo {
    fn new(delay: Duration) -> Self {
        Self {
            inner: SqliteGraphemeRepository::new(open_db_in_memory().unwrap()),
            writes: AtomicUsize::new(0),
            stale_reads: AtomicUsize::new(0),
            delay,
        }
    }
}

impl GraphemeRepository for SlowRepo {
    fn read(&self, key: &str) -> RepoResult<Option<Grapheme>> {
        let stale = self
            .stale_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if stale {
            return Ok(None);
        }
        self.inner.read(key)
    }

    fn write_if_absent(&self, grapheme: &Grapheme) -> RepoResult<WriteOutcome> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        self.inner.write_if_absent(grapheme)
    }

    fn list_all(&self) -> RepoResult<Vec<Grapheme>> {
        self.inner.list_all()
    }
}

/// Backend that never has a record and fails every write after `delay`.
struct OfflineRepo {
    delay: Duration,
}

impl GraphemeRepository for OfflineRepo {
    fn read(&self, _key: &str) -> RepoResult<Option<Grapheme>> {
        Ok(None)
    }

    fn write_if_absent(&self, _grapheme: &Grapheme) -> RepoResult<WriteOutcome> {
        thread::sleep(self.delay);
        Err(RepoError::InvalidData("backend offline".to_string()))
    }

    fn list_all(&self) -> RepoResult<Vec<Grapheme>> {
        Err(RepoError::InvalidData("backend offline".to_string()))
    }
}

fn offline_engine(delay: Duration) -> LogogramEngine<OfflineRepo> {
    LogogramEngine::new(
        GraphemeStore::new(OfflineRepo { delay }, Box::new(DisabledArchiveSink)),
        Box::new(DisabledArchiveSink),
    )
}

fn memory_store() -> GraphemeStore<SqliteGraphemeRepository> {
    GraphemeStore::new(
        SqliteGraphemeRepository::new(open_db_in_memory().unwrap()),
        Box::new(DisabledArchiveSink),
    )
}

fn assertive() -> ParameterVector {
    ParameterVector {
        certainty: 0.95,
        modality: Modality::Obligation,
        emphasis: 0.9,
        negation: true,
        ..ParameterVector::default()
    }
}

#[test]
fn first_creation_wins_regardless_of_later_parameters() {
    let store = memory_store();

    let first = store.get_or_create("Cat", &ParameterVector::default()).unwrap();
    let second = store.get_or_create("  cat ", &assertive()).unwrap();

    assert_eq!(first.key, "cat");
    assert_eq!(first, second);
    assert_eq!(second.parameters, ParameterVector::default());
}

#[test]
fn get_does_not_create() {
    let store = memory_store();

    assert!(store.get("river").unwrap().is_none());
    let created = store.get_or_create("river", &ParameterVector::default()).unwrap();
    assert_eq!(store.get("RIVER").unwrap(), Some(created));
}

#[test]
fn records_survive_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graphemes.db");

    let original = {
        let store = GraphemeStore::new(
            SqliteGraphemeRepository::new(open_db(&path).unwrap()),
            Box::new(DisabledArchiveSink),
        );
        store.get_or_create("lantern", &assertive()).unwrap()
    };

    let reopened = GraphemeStore::new(
        SqliteGraphemeRepository::new(open_db(&path).unwrap()),
        Box::new(DisabledArchiveSink),
    );
    let restored = reopened
        .get_or_create("lantern", &ParameterVector::default())
        .unwrap();

    assert_eq!(restored, original);
    assert!(restored.is_consistent());
}

#[test]
fn concurrent_first_use_creates_exactly_once() {
    let store = Arc::new(GraphemeStore::new(
        SlowRepo::new(Duration::from_millis(150)),
        Box::new(DisabledArchiveSink),
    ));
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|index| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let params = if index % 2 == 0 {
                    ParameterVector::default()
                } else {
                    assertive()
                };
                barrier.wait();
                store.get_or_create("harbor", &params).unwrap()
            })
        })
        .collect();

    let results: Vec<Grapheme> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(store.repository().writes.load(Ordering::SeqCst), 1);
    assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(store.repository().list_all().unwrap().len(), 1);
}

#[test]
fn distinct_keys_do_not_wait_on_each_other() {
    let store = Arc::new(
        GraphemeStore::new(
            SlowRepo::new(Duration::from_millis(100)),
            Box::new(DisabledArchiveSink),
        )
        .with_create_wait_timeout(Duration::from_millis(20)),
    );

    let handles: Vec<_> = ["alpha", "bravo", "charlie", "delta"]
        .into_iter()
        .map(|word| {
            let store = Arc::clone(&store);
            thread::spawn(move || store.get_or_create(word, &ParameterVector::default()))
        })
        .collect();

    for handle in handles {
        handle.join().unwrap().expect("independent keys never time out");
    }
    assert_eq!(store.repository().writes.load(Ordering::SeqCst), 4);
}

#[test]
fn waiter_times_out_on_slow_creation() {
    let store = Arc::new(
        GraphemeStore::new(
            SlowRepo::new(Duration::from_millis(400)),
            Box::new(DisabledArchiveSink),
        )
        .with_create_wait_timeout(Duration::from_millis(20)),
    );

    let leader = {
        let store = Arc::clone(&store);
        thread::spawn(move || store.get_or_create("glacier", &ParameterVector::default()))
    };
    thread::sleep(Duration::from_millis(80));

    let err = store
        .get_or_create("glacier", &ParameterVector::default())
        .unwrap_err();
    assert!(matches!(err, StoreError::ConcurrentCreateTimeout { .. }));

    let created = leader.join().unwrap().unwrap();
    assert_eq!(
        store.get_or_create("glacier", &assertive()).unwrap(),
        created
    );
}

#[test]
fn archive_writes_standalone_svg_idempotently() {
    let dir = tempfile::tempdir().unwrap();
    let store = GraphemeStore::new(
        SqliteGraphemeRepository::new(open_db_in_memory().unwrap()),
        Box::new(FsArchiveSink::new(dir.path())),
    );
    let grapheme = store.get_or_create("ember", &ParameterVector::default()).unwrap();

    let first = store.archive(&grapheme).unwrap();
    let second = store.archive(&grapheme).unwrap();

    assert_eq!(first, second);
    assert_eq!(first, dir.path().join(&grapheme.archive_name));
    assert_eq!(
        std::fs::read_to_string(&first).unwrap(),
        render_grapheme(&grapheme)
    );
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn archive_all_counts_successes_and_failures() {
    let dir = tempfile::tempdir().unwrap();
    let conn_path = dir.path().join("graphemes.db");
    let archive_dir = dir.path().join("svg");

    {
        let store = GraphemeStore::new(
            SqliteGraphemeRepository::new(open_db(&conn_path).unwrap()),
            Box::new(DisabledArchiveSink),
        );
        for word in ["moss", "stone", "tide"] {
            store.get_or_create(word, &ParameterVector::default()).unwrap();
        }
        let report = store.archive_all().unwrap();
        assert_eq!((report.archived, report.failed), (0, 3));
    }

    let store = GraphemeStore::new(
        SqliteGraphemeRepository::new(open_db(&conn_path).unwrap()),
        Box::new(FsArchiveSink::new(&archive_dir)),
    );
    let report = store.archive_all().unwrap();
    assert_eq!((report.archived, report.failed), (3, 0));

    let listed = store.repository().list_all().unwrap();
    for grapheme in &listed {
        assert!(archive_dir.join(&grapheme.archive_name).is_file());
    }
}

#[test]
fn late_leader_returns_stored_record_without_regenerating() {
    let store = GraphemeStore::new(SlowRepo::new(Duration::ZERO), Box::new(DisabledArchiveSink));
    let first = store
        .get_or_create("meadow", &ParameterVector::default())
        .unwrap();

    store.repository().stale_reads.store(1, Ordering::SeqCst);
    let second = store.get_or_create("meadow", &assertive()).unwrap();

    assert_eq!(second, first);
    assert_eq!(store.repository().writes.load(Ordering::SeqCst), 1);
}

#[test]
fn backend_failure_surfaces_as_storage_unavailable() {
    let engine = offline_engine(Duration::ZERO);

    let err = engine
        .generate(&GenerateRequest::single("cat"))
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::StorageUnavailable(StoreError::StorageUnavailable(RepoError::InvalidData(_)))
    ));
    assert!(matches!(
        engine.store().archive_all(),
        Err(StoreError::StorageUnavailable(_))
    ));
}

#[test]
fn waiter_sees_failed_creation_as_storage_unavailable() {
    let engine = Arc::new(offline_engine(Duration::from_millis(300)));

    let leader = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            matches!(
                engine.generate(&GenerateRequest::single("beacon")),
                Err(EngineError::StorageUnavailable(StoreError::StorageUnavailable(_)))
            )
        })
    };
    thread::sleep(Duration::from_millis(80));

    let err = engine
        .generate(&GenerateRequest::single("beacon"))
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::StorageUnavailable(StoreError::CreationFailed(_))
    ));
    assert!(leader.join().unwrap());
}
