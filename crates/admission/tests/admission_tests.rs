//! Integration tests for the admission controller
//!
//! Covers rate-limit boundaries under simulated time, isolation between
//! clients, concurrent admission for a single client, and store failures.

use async_trait::async_trait;
use cannon_admission::{
    Admission, AdmissionConfig, AdmissionController, CacheLookup, CachedResult, Error, FsStore,
    ManualClock, MemoryStore, Store,
};
use cannon_fingerprint::{ExecutionRequest, Fingerprint, Runtime};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

fn config(capacity: usize) -> AdmissionConfig {
    AdmissionConfig {
        capacity,
        window_secs: 60,
        ..AdmissionConfig::default()
    }
}

fn image() -> Fingerprint {
    cannon_fingerprint::image_fingerprint("golang:1.21.4-bullseye", &[], None)
}

fn controller_with(
    store: Arc<dyn Store>,
    capacity: usize,
) -> (Arc<AdmissionController>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::starting_now());
    let ctl = AdmissionController::with_clock(store, config(capacity), clock.clone()).unwrap();
    (Arc::new(ctl), clock)
}

// =============================================================================
// Rate limit boundary
// =============================================================================

#[tokio::test]
async fn three_requests_within_a_second_then_denied_until_window_passes() {
    let (ctl, clock) = controller_with(Arc::new(MemoryStore::new()), 3);

    for _ in 0..3 {
        assert!(ctl.admit("client-a").await.unwrap().is_allowed());
        clock.advance(Duration::from_millis(250));
    }
    let fourth = ctl.admit("client-a").await.unwrap();
    let Admission::Denied { retry_after } = fourth else {
        panic!("fourth request should be denied, got {fourth:?}");
    };
    assert!(retry_after <= Duration::from_secs(60));
    assert!(retry_after > Duration::from_secs(59));

    // Past W from the first call
    clock.advance(Duration::from_secs(60));
    assert!(ctl.admit("client-a").await.unwrap().is_allowed());
}

#[tokio::test]
async fn denial_does_not_extend_the_window() {
    let (ctl, clock) = controller_with(Arc::new(MemoryStore::new()), 1);

    assert!(ctl.admit("c").await.unwrap().is_allowed());
    for _ in 0..10 {
        clock.advance(Duration::from_secs(5));
        assert!(!ctl.admit("c").await.unwrap().is_allowed());
    }
    // 60s after the only admitted request, regardless of the denials in between
    clock.advance(Duration::from_secs(10));
    assert!(ctl.admit("c").await.unwrap().is_allowed());
}

// =============================================================================
// Independence across clients
// =============================================================================

#[tokio::test]
async fn exhausting_one_client_does_not_affect_another() {
    let (ctl, _clock) = controller_with(Arc::new(MemoryStore::new()), 2);

    assert!(ctl.admit("10.0.0.1").await.unwrap().is_allowed());
    assert!(ctl.admit("10.0.0.1").await.unwrap().is_allowed());
    assert!(!ctl.admit("10.0.0.1").await.unwrap().is_allowed());

    assert_eq!(
        ctl.admit("10.0.0.2").await.unwrap(),
        Admission::Allowed { remaining: 1 }
    );
}

// =============================================================================
// Concurrency
// =============================================================================

/// Many tasks admitting for the same client at the same instant never exceed
/// capacity: window updates go through compare-and-swap.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_admissions_respect_capacity() {
    let (ctl, _clock) = controller_with(Arc::new(MemoryStore::new()), 5);

    let handles: Vec<_> = (0..64)
        .map(|_| {
            let ctl = ctl.clone();
            tokio::spawn(async move { ctl.admit("burst").await })
        })
        .collect();

    let mut allowed = 0;
    for result in futures::future::join_all(handles).await {
        if result.unwrap().unwrap().is_allowed() {
            allowed += 1;
        }
    }
    assert_eq!(allowed, 5, "exactly capacity admissions expected");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_admissions_on_fs_store_respect_capacity() {
    let tmp = TempDir::new().unwrap();
    let (ctl, _clock) = controller_with(Arc::new(FsStore::new(tmp.path())), 3);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let ctl = ctl.clone();
            tokio::spawn(async move { ctl.admit("burst").await })
        })
        .collect();

    let allowed = futures::future::join_all(handles)
        .await
        .into_iter()
        .filter(|r| r.as_ref().unwrap().as_ref().unwrap().is_allowed())
        .count();
    assert_eq!(allowed, 3);
}

// =============================================================================
// Store failures
// =============================================================================

/// Store that fails every call
struct UnreachableStore;

#[async_trait]
impl Store for UnreachableStore {
    async fn get(&self, _key: &str) -> cannon_admission::Result<Option<Vec<u8>>> {
        Err(Error::store_unavailable("get", "connection refused"))
    }

    async fn set(&self, _key: &str, _value: Vec<u8>) -> cannon_admission::Result<()> {
        Err(Error::store_unavailable("set", "connection refused"))
    }

    async fn compare_and_swap(
        &self,
        _key: &str,
        _expected: Option<&[u8]>,
        _new: Vec<u8>,
    ) -> cannon_admission::Result<bool> {
        Err(Error::store_unavailable(
            "compare_and_swap",
            "connection refused",
        ))
    }

    fn name(&self) -> &'static str {
        "unreachable"
    }
}

/// Store whose calls never complete
struct HangingStore {
    calls: AtomicUsize,
}

#[async_trait]
impl Store for HangingStore {
    async fn get(&self, _key: &str) -> cannon_admission::Result<Option<Vec<u8>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }

    async fn set(&self, _key: &str, _value: Vec<u8>) -> cannon_admission::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }

    async fn compare_and_swap(
        &self,
        _key: &str,
        _expected: Option<&[u8]>,
        _new: Vec<u8>,
    ) -> cannon_admission::Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }

    fn name(&self) -> &'static str {
        "hanging"
    }
}

#[tokio::test]
async fn unreachable_store_fails_every_operation() {
    let (ctl, _clock) = controller_with(Arc::new(UnreachableStore), 2);
    let fp = ExecutionRequest::new(Runtime::Go).fingerprint();

    let err = ctl.admit("c").await.unwrap_err();
    assert!(matches!(err, Error::StoreUnavailable { .. }));
    assert!(err.is_retryable());

    assert!(matches!(
        ctl.lookup(&fp, &image(), false).await.unwrap_err(),
        Error::StoreUnavailable { .. }
    ));
    assert!(matches!(
        ctl.record(&fp, &image(), vec![], vec![]).await.unwrap_err(),
        Error::StoreUnavailable { .. }
    ));
}

#[tokio::test]
async fn bypassed_lookup_does_not_touch_the_store() {
    let (ctl, _clock) = controller_with(Arc::new(UnreachableStore), 2);
    let fp = ExecutionRequest::new(Runtime::Go).fingerprint();
    assert_eq!(ctl.lookup(&fp, &image(), true).await.unwrap(), CacheLookup::Miss);
}

#[tokio::test(start_paused = true)]
async fn hanging_store_times_out() {
    let store = Arc::new(HangingStore {
        calls: AtomicUsize::new(0),
    });
    let ctl = AdmissionController::new(
        store.clone(),
        AdmissionConfig {
            store_timeout_ms: 50,
            ..AdmissionConfig::default()
        },
    )
    .unwrap();

    let err = ctl.admit("c").await.unwrap_err();
    assert!(matches!(
        err,
        Error::StoreTimeout {
            timeout_ms: 50,
            ..
        }
    ));
    assert!(err.is_retryable());
    assert_eq!(store.calls.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Full request cycle
// =============================================================================

#[tokio::test]
async fn second_identical_request_is_served_from_cache() {
    let (ctl, _clock) = controller_with(Arc::new(MemoryStore::new()), 1);
    let request = ExecutionRequest::new(Runtime::Go)
        .with_file("main.go", "package main\nfunc main() { println(\"hello\") }\n")
        .with_command("go run main.go");

    // First request: miss, admit, execute (elsewhere), record
    let f1 = request.fingerprint();
    assert_eq!(ctl.lookup(&f1, &image(), false).await.unwrap(), CacheLookup::Miss);
    assert!(ctl.admit("clientX").await.unwrap().is_allowed());
    ctl.record(&f1, &image(), vec!["hello\n".to_string()], vec![])
        .await
        .unwrap();

    // Second identical request: hit without consulting the limiter. The
    // client's window is full (capacity 1), so admitting would be denied.
    let again = request.clone().fingerprint();
    assert_eq!(again, f1);
    assert_eq!(
        ctl.lookup(&again, &image(), false).await.unwrap(),
        CacheLookup::Hit(CachedResult::new(vec!["hello\n".to_string()], vec![]))
    );
    assert!(!ctl.admit("clientX").await.unwrap().is_allowed());
}

#[tokio::test]
async fn results_survive_a_restart_on_fs_store() {
    let tmp = TempDir::new().unwrap();
    let fp = ExecutionRequest::new(Runtime::Rust)
        .with_command("cargo run")
        .fingerprint();

    {
        let (ctl, _clock) = controller_with(Arc::new(FsStore::new(tmp.path())), 2);
        ctl.record(&fp, &image(), vec!["Hello, world!\n".into()], vec!["warning\n".into()])
            .await
            .unwrap();
    }

    let (ctl, _clock) = controller_with(Arc::new(FsStore::new(tmp.path())), 2);
    let hit = ctl.lookup(&fp, &image(), false).await.unwrap().into_result().unwrap();
    assert_eq!(hit.stdout, vec!["Hello, world!\n".to_string()]);
    assert_eq!(hit.stderr, vec!["warning\n".to_string()]);
}
