//! End-to-end tests of the log manager over the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use strand_codec::{BinaryCodec, CodecRef, JsonCodec, RecordCodec};
use strand_core::{Flag, LogOffset, LogPartition, Record};
use strand_log::{Closeable, LogAppender, LogError, LogManager, LogTailer, MemoryLogStore};

fn binary() -> CodecRef<Record> {
    Arc::new(BinaryCodec::<Record>::new())
}

fn json() -> CodecRef<Record> {
    Arc::new(JsonCodec::<Record>::new())
}

async fn manager_with(name: &str, size: u32) -> LogManager<MemoryLogStore> {
    let manager = LogManager::new(MemoryLogStore::new());
    assert!(manager.create_if_not_exists(name, size).await.unwrap());
    manager
}

async fn drain(tailer: &Arc<dyn LogTailer<Record>>) -> Vec<Record> {
    let mut records = Vec::new();
    while let Some(record) = tailer.read(Duration::ZERO).await.unwrap() {
        records.push(record.message);
    }
    records
}

// -----------------------------------------------------------------------------
// Assignment
// -----------------------------------------------------------------------------

#[tokio::test]
async fn test_events_round_trip_and_single_owner() {
    let manager = manager_with("events", 3).await;
    let appender = manager.get_appender("events", Some(binary())).await.unwrap();
    assert_eq!(appender.size(), 3);

    for partition in 0..3 {
        let offset = appender
            .append_to(partition, &Record::new(format!("k{partition}"), "payload"))
            .await
            .unwrap();
        assert_eq!(offset, LogOffset::new(LogPartition::new("events", partition), 0));
    }

    let partitions = LogPartition::all_of("events", 3);
    let tailer = manager
        .create_tailer("g1", &partitions, Some(binary()))
        .await
        .unwrap();
    assert_eq!(tailer.group(), "g1");
    assert_eq!(tailer.assignments(), partitions);

    let mut keys: Vec<String> = drain(&tailer).await.into_iter().map(|r| r.key).collect();
    keys.sort();
    assert_eq!(keys, ["k0", "k1", "k2"]);
    tailer.commit().await.unwrap();

    // A second tailer of g1 on any owned partition is rejected.
    let err = manager
        .create_tailer("g1", &partitions[..1], Some(binary()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LogError::AlreadyAssigned { ref group, ref partition }
            if group == "g1" && *partition == LogPartition::new("events", 0)
    ));

    // Another group is independent.
    manager
        .create_tailer("g2", &partitions[..1], Some(binary()))
        .await
        .unwrap();

    // Once the owner is closed the partition can be taken again, resuming
    // from the committed offset.
    tailer.close().unwrap();
    let again = manager
        .create_tailer("g1", &partitions[..1], Some(binary()))
        .await
        .unwrap();
    assert!(again.read(Duration::ZERO).await.unwrap().is_none());
}

#[tokio::test]
async fn test_json_tailer_rejected_by_binary_appender() {
    let manager = manager_with("events", 1).await;
    manager.get_appender("events", Some(binary())).await.unwrap();

    let partitions = [LogPartition::new("events", 0)];
    let err = manager
        .create_tailer("g1", &partitions, Some(json()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LogError::CodecMismatch { ref existing, ref requested, .. }
            if existing == "binary" && requested == "json"
    ));

    // A default-codec tailer is rejected too.
    let err = manager
        .create_tailer::<Record>("g1", &partitions, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LogError::CodecMismatch { .. }));

    // The failed attempts reserved nothing.
    assert_eq!(manager.live_tailers(), 0);
    manager
        .create_tailer("g1", &partitions, Some(binary()))
        .await
        .unwrap();
    assert_eq!(manager.live_tailers(), 1);
}

#[tokio::test]
async fn test_default_appender_accepts_any_tailer_codec() {
    let manager = manager_with("events", 2).await;
    manager.get_appender::<Record>("events", None).await.unwrap();

    manager
        .create_tailer("g1", &[LogPartition::new("events", 0)], Some(json()))
        .await
        .unwrap();
    manager
        .create_tailer::<Record>("g1", &[LogPartition::new("events", 1)], None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unknown_log_creates_no_backend_tailer() {
    let manager = LogManager::new(MemoryLogStore::new());
    let partitions = [LogPartition::new("missing", 0)];

    let err = manager
        .create_tailer("g1", &partitions, Some(binary()))
        .await
        .unwrap_err();
    assert!(matches!(err, LogError::UnknownLog { ref name } if name == "missing"));
    assert_eq!(manager.backend().stats().tailers_created, 0);
    assert_eq!(manager.live_tailers(), 0);

    manager.create_if_not_exists("missing", 1).await.unwrap();
    manager
        .create_tailer("g1", &partitions, Some(binary()))
        .await
        .unwrap();
    assert_eq!(manager.backend().stats().tailers_created, 1);
}

#[tokio::test]
async fn test_partition_out_of_range_releases_reservation() {
    let manager = manager_with("events", 2).await;
    let partitions = [LogPartition::new("events", 0), LogPartition::new("events", 5)];

    let err = manager
        .create_tailer("g1", &partitions, Some(binary()))
        .await
        .unwrap_err();
    assert!(matches!(err, LogError::PartitionOutOfRange { partition: 5, .. }));
    manager
        .create_tailer("g1", &partitions[..1], Some(binary()))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_backend_failure_releases_reservation() {
    let manager = manager_with("events", 1).await;
    manager.backend().faults().force_create_tailer_fail = true;

    let partitions = [LogPartition::new("events", 0)];
    let err = manager
        .create_tailer("g1", &partitions, Some(binary()))
        .await
        .unwrap_err();
    assert!(matches!(err, LogError::Backend { .. }));
    manager
        .create_tailer("g1", &partitions, Some(binary()))
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_create_creates_once() {
    let manager = Arc::new(LogManager::new(MemoryLogStore::new()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.create_if_not_exists("events", 3).await })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() {
            created += 1;
        }
    }
    assert_eq!(created, 1);
    assert_eq!(manager.size("events").await.unwrap(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_tailers_single_owner() {
    let manager = Arc::new(manager_with("events", 1).await);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move {
                manager
                    .create_tailer("g1", &[LogPartition::new("events", 0)], Some(binary()))
                    .await
            })
        })
        .collect();

    let mut owners = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(tailer) => owners.push(tailer),
            Err(e) => assert!(matches!(e, LogError::AlreadyAssigned { .. })),
        }
    }
    assert_eq!(owners.len(), 1);
}

// -----------------------------------------------------------------------------
// Reading
// -----------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_read_wakes_on_append() {
    let manager = manager_with("events", 1).await;
    let appender = manager.get_appender("events", Some(binary())).await.unwrap();
    let tailer = manager
        .create_tailer("g1", &[LogPartition::new("events", 0)], Some(binary()))
        .await
        .unwrap();

    let reader = tokio::spawn(async move { tailer.read(Duration::from_secs(10)).await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    appender
        .append("k", &Record::new("k", "late"))
        .await
        .unwrap();

    let record = reader.await.unwrap().unwrap().unwrap();
    assert_eq!(record.message.data.as_ref(), b"late");
}

#[tokio::test]
async fn test_read_times_out() {
    let manager = manager_with("events", 1).await;
    let tailer = manager
        .create_tailer("g1", &[LogPartition::new("events", 0)], Some(binary()))
        .await
        .unwrap();
    assert!(tailer
        .read(Duration::from_millis(10))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_read_with_unbounded_timeout() {
    let manager = manager_with("events", 1).await;
    let appender = manager.get_appender("events", Some(binary())).await.unwrap();
    appender.append_to(0, &Record::new("k", "x")).await.unwrap();
    let tailer = manager
        .create_tailer("g1", &[LogPartition::new("events", 0)], Some(binary()))
        .await
        .unwrap();

    let record = tailer.read(Duration::MAX).await.unwrap().unwrap();
    assert_eq!(record.message.data.as_ref(), b"x");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unbounded_read_wakes_on_append() {
    let manager = manager_with("events", 1).await;
    let appender = manager.get_appender("events", Some(binary())).await.unwrap();
    let tailer = manager
        .create_tailer("g1", &[LogPartition::new("events", 0)], Some(binary()))
        .await
        .unwrap();

    let reader = tokio::spawn(async move { tailer.read(Duration::MAX).await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    appender.append_to(0, &Record::new("k", "late")).await.unwrap();

    let record = tokio::time::timeout(Duration::from_secs(2), reader)
        .await
        .expect("reader should wake on append")
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(record.message.data.as_ref(), b"late");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_close_wakes_blocked_reader() {
    let manager = manager_with("events", 1).await;
    let tailer = manager
        .create_tailer("g1", &[LogPartition::new("events", 0)], Some(binary()))
        .await
        .unwrap();

    let reader = {
        let tailer = Arc::clone(&tailer);
        tokio::spawn(async move { tailer.read(Duration::from_secs(10)).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    tailer.close().unwrap();

    let result = tokio::time::timeout(Duration::from_secs(2), reader)
        .await
        .expect("reader should wake on close")
        .unwrap();
    assert!(matches!(result, Err(LogError::Closed { .. })));
    assert!(tailer.closed());
}

#[tokio::test]
async fn test_poison_pill_stops_partition() {
    let manager = manager_with("events", 2).await;
    let codec: CodecRef<Record> = Arc::new(RecordCodec);
    let appender = manager.get_appender("events", Some(codec.clone())).await.unwrap();

    appender.append_to(0, &Record::new("a", "1")).await.unwrap();
    appender.append_to(0, &Record::poison_pill()).await.unwrap();
    appender.append_to(0, &Record::new("b", "2")).await.unwrap();
    appender
        .append_to(1, &Record::new("c", "3").with_flag(Flag::Trace))
        .await
        .unwrap();

    let tailer = manager
        .create_tailer("g1", &LogPartition::all_of("events", 2), Some(codec))
        .await
        .unwrap();

    let records = drain(&tailer).await;
    let keys: Vec<&str> = records.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys.len(), 3);
    assert!(records[..].iter().any(Record::is_poison_pill));
    assert!(!keys.contains(&"b"));
    assert!(records.iter().any(|r| r.key == "c" && r.has_flag(Flag::Trace)));

    // Repositioning resumes the stopped partition.
    tailer
        .seek(&LogOffset::new(LogPartition::new("events", 0), 2))
        .await
        .unwrap();
    let resumed = drain(&tailer).await;
    assert_eq!(resumed.len(), 1);
    assert_eq!(resumed[0].key, "b");
}

#[tokio::test]
async fn test_positioning() {
    let manager = manager_with("events", 1).await;
    let appender = manager.get_appender("events", Some(binary())).await.unwrap();
    for i in 0..4 {
        appender
            .append_to(0, &Record::new(format!("k{i}"), "v"))
            .await
            .unwrap();
    }

    let partition = LogPartition::new("events", 0);
    let tailer = manager
        .create_partition_tailer("g1", partition.clone(), Some(binary()))
        .await
        .unwrap();

    tailer.read(Duration::ZERO).await.unwrap().unwrap();
    let committed = tailer.commit_partition(&partition).await.unwrap();
    assert_eq!(committed, LogOffset::new(partition.clone(), 1));

    tailer.to_end().await.unwrap();
    assert!(tailer.read(Duration::ZERO).await.unwrap().is_none());

    tailer.to_last_committed().await.unwrap();
    let record = tailer.read(Duration::ZERO).await.unwrap().unwrap();
    assert_eq!(record.offset, LogOffset::new(partition.clone(), 1));
    assert_eq!(record.message.key, "k1");

    tailer.to_start().await.unwrap();
    assert_eq!(drain(&tailer).await.len(), 4);

    let other = LogPartition::new("events", 7);
    assert!(matches!(
        tailer.commit_partition(&other).await,
        Err(LogError::NotAssigned { .. })
    ));
    assert!(matches!(
        tailer.seek(&LogOffset::new(other, 0)).await,
        Err(LogError::NotAssigned { .. })
    ));
}

#[tokio::test]
async fn test_closed_resources_reject_use() {
    let manager = manager_with("events", 1).await;
    let appender = manager.get_appender("events", Some(binary())).await.unwrap();
    let tailer = manager
        .create_tailer("g1", &[LogPartition::new("events", 0)], Some(binary()))
        .await
        .unwrap();

    tailer.close().unwrap();
    tailer.close().unwrap();
    assert!(matches!(
        tailer.read(Duration::ZERO).await,
        Err(LogError::Closed { .. })
    ));
    assert!(matches!(tailer.commit().await, Err(LogError::Closed { .. })));

    appender.close().unwrap();
    assert!(matches!(
        appender.append("k", &Record::new("k", "v")).await,
        Err(LogError::Closed { .. })
    ));
}

// -----------------------------------------------------------------------------
// Shutdown
// -----------------------------------------------------------------------------

#[tokio::test]
async fn test_close_is_best_effort() {
    let manager = LogManager::new(MemoryLogStore::new());
    manager.create_if_not_exists("events", 1).await.unwrap();
    manager.create_if_not_exists("audit", 1).await.unwrap();
    let events = manager.get_appender("events", Some(binary())).await.unwrap();
    let audit = manager.get_appender("audit", Some(binary())).await.unwrap();
    let tailer = manager
        .create_tailer("g1", &[LogPartition::new("events", 0)], Some(binary()))
        .await
        .unwrap();

    // The first close (the "audit" appender) fails.
    manager.backend().faults().force_close_fail = true;
    let err = manager.close().await.unwrap_err();
    match err {
        LogError::CloseFailed { failures } => {
            assert_eq!(failures.len(), 1);
            assert!(failures[0].starts_with("appender audit"));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(events.closed());
    assert!(audit.closed());
    assert!(tailer.closed());
    assert_eq!(manager.live_tailers(), 0);
    assert!(matches!(
        manager.create_tailer("g1", &[LogPartition::new("events", 0)], Some(binary())).await,
        Err(LogError::Closed { .. })
    ));
    manager.close().await.unwrap();
}

#[tokio::test]
async fn test_close_skips_tailers_closed_by_caller() {
    let manager = manager_with("events", 1).await;
    let tailer = manager
        .create_tailer("g1", &[LogPartition::new("events", 0)], Some(binary()))
        .await
        .unwrap();
    tailer.close().unwrap();

    // A close fault is not consumed by an already-closed tailer.
    manager.backend().faults().force_close_fail = true;
    manager.close().await.unwrap();
    assert!(manager.backend().faults().force_close_fail);
}
