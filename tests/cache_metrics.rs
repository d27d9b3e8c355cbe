use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use metrics_util::debugging::{DebugValue, DebuggingRecorder};

use crema::cache::{PRODUCTS_TAG, TaggedCache};

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let cache: Arc<TaggedCache<String>> = Arc::new(TaggedCache::new(
        "listing",
        NonZeroUsize::new(1).expect("non-zero"),
    ));
    let compute = |value: &'static str| async move { Ok::<_, Infallible>(value.to_string()) };

    // miss, then hit
    for _ in 0..2 {
        cache
            .get_or_compute("page:1", &[PRODUCTS_TAG], None, || compute("one"))
            .await
            .expect("infallible");
    }

    // capacity of one evicts the first page
    cache
        .get_or_compute("page:2", &[PRODUCTS_TAG], None, || compute("two"))
        .await
        .expect("infallible");

    // a waiter reuses the leader's value
    let leader = {
        let cache = cache.clone();
        tokio::spawn(async move {
            cache
                .get_or_compute("page:3", &[PRODUCTS_TAG], None, || async {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok::<_, Infallible>("three".to_string())
                })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let waiter = cache
        .get_or_compute("page:3", &[PRODUCTS_TAG], None, || compute("unused"))
        .await
        .expect("infallible");
    assert_eq!(waiter, "three");
    leader
        .await
        .expect("leader task completes")
        .expect("infallible");

    cache.invalidate_tag(PRODUCTS_TAG);

    let snapshot = snapshotter.snapshot().into_vec();

    let names: HashSet<String> = snapshot
        .iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();
    let expected = [
        "crema_cache_hit_total",
        "crema_cache_miss_total",
        "crema_cache_coalesced_total",
        "crema_cache_evict_total",
        "crema_cache_invalidate_total",
        "crema_cache_compute_ms",
    ];
    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }

    let counters: HashMap<String, u64> = snapshot
        .iter()
        .filter_map(|(composite_key, _, _, value)| match value {
            DebugValue::Counter(count) => {
                Some((composite_key.key().name().to_string(), *count))
            }
            _ => None,
        })
        .collect();
    assert_eq!(counters.get("crema_cache_hit_total"), Some(&1));
    assert_eq!(counters.get("crema_cache_miss_total"), Some(&3));
    assert_eq!(counters.get("crema_cache_coalesced_total"), Some(&1));
    assert_eq!(counters.get("crema_cache_invalidate_total"), Some(&1));

    for (composite_key, _, _, _) in &snapshot {
        let key = composite_key.key();
        if key.name().starts_with("crema_cache_") {
            assert!(
                key.labels()
                    .any(|label| label.key() == "cache" && label.value() == "listing"),
                "{} should carry the cache label",
                key.name()
            );
        }
    }
}
