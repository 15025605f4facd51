use super::common::*;
use crate::feed::FeedError;
use crate::periods::{PeriodBoard, PeriodViewResolver, ResolveError, ViewMode};
use crate::snapshots::{InMemorySnapshotStore, SnapshotError, SnapshotStore};
use crate::tiers::{Criterion, TierKey};
use serde_json::json;
use std::sync::Arc;

const MARCH: ViewMode = ViewMode::Frozen {
    year: 2025,
    month: 3,
};

#[tokio::test]
async fn live_view_classifies_current_feed() {
    let (resolver, gateway, _) = memory_resolver(march_rows());

    let board = match resolver.resolve("norte", ViewMode::Live).await {
        Ok(PeriodBoard::Live(live)) => live,
        other => panic!("expected live board, got {other:?}"),
    };

    assert_eq!(board.branch, "Sucursal Norte");
    assert_eq!(gateway.calls(), 1);
    let ana = board.board.find("Ana Gómez").expect("Ana classified");
    assert_eq!(ana.achieved_tier, TierKey::Senior);
    assert_eq!(ana.comparisons[&TierKey::Senior].total_points, 100);

    let bruno = board.board.find("Bruno Díaz").expect("Bruno classified");
    assert_eq!(bruno.achieved_tier, TierKey::Junior);
    assert_eq!(bruno.comparisons[&TierKey::Junior].total_points, 75);
    assert!(!bruno.comparisons[&TierKey::Junior].met(Criterion::Display));
}

#[tokio::test]
async fn frozen_view_returns_stored_payload_after_feed_changes() {
    let (resolver, gateway, _) = memory_resolver(march_rows());
    resolver
        .close_period("norte", 2025, 3, None)
        .await
        .expect("march closes");
    let expected_payload = serde_json::to_value(march_rows()).expect("rows serialize");

    gateway.publish(vec![row(json!({
        "representative": "Ana Gómez",
        "projected_tier": "Junior"
    }))]);
    let calls_before = gateway.calls();

    let frozen = match resolver.resolve("norte", MARCH).await {
        Ok(PeriodBoard::Frozen(frozen)) => frozen,
        other => panic!("expected frozen board, got {other:?}"),
    };

    assert_eq!(gateway.calls(), calls_before, "frozen view must not hit the feed");
    assert_eq!(frozen.payload, expected_payload);
    assert_eq!((frozen.snapshot.period_year, frozen.snapshot.period_month), (2025, 3));
    assert_eq!(frozen.branch, "Sucursal Norte");
}

#[tokio::test]
async fn frozen_view_without_snapshot_is_not_found() {
    let (resolver, _, _) = memory_resolver(Vec::new());

    match resolver
        .resolve("norte", ViewMode::Frozen { year: 2025, month: 1 })
        .await
    {
        Err(ResolveError::NoSnapshot {
            branch_key,
            year,
            month,
        }) => {
            assert_eq!(branch_key, "norte");
            assert_eq!((year, month), (2025, 1));
        }
        other => panic!("expected no snapshot, got {other:?}"),
    }

    match resolver.resolve("norte", ViewMode::Live).await {
        Ok(PeriodBoard::Live(live)) => assert!(live.board.representatives.is_empty()),
        other => panic!("expected empty live board, got {other:?}"),
    }
}

#[tokio::test]
async fn close_period_records_source_and_points_to_frozen_view() {
    let (resolver, _, store) = memory_resolver(march_rows());

    let closed = resolver
        .close_period("norte", 2025, 3, Some(json!({ "requested_by": "supervisor-7" })))
        .await
        .expect("close succeeds");

    assert_eq!(closed.representatives, 2);
    assert_eq!(closed.next_view, MARCH);

    let stored = store
        .find_period("norte", 2025, 3)
        .await
        .expect("lookup")
        .expect("snapshot present");
    assert_eq!(stored.id, closed.id);
    assert_eq!(stored.branch, "Sucursal Norte");
    let meta = stored.meta.expect("meta recorded");
    assert_eq!(meta["source"], "sheets/norte");
    assert_eq!(meta["representatives"], 2);
    assert_eq!(meta["context"]["requested_by"], "supervisor-7");
}

#[tokio::test]
async fn closing_twice_produces_two_snapshots() {
    let (resolver, _, _) = memory_resolver(march_rows());

    let first = resolver
        .close_period("norte", 2025, 3, None)
        .await
        .expect("first close");
    let second = resolver
        .close_period("norte", 2025, 3, None)
        .await
        .expect("second close");

    assert_ne!(first.id, second.id);
    let periods = resolver.list_periods("norte").await.expect("list");
    assert_eq!(periods.len(), 2);
    assert_eq!(periods[0].id, second.id);
}

#[tokio::test]
async fn feed_failure_aborts_close_without_writing() {
    let store = Arc::new(InMemorySnapshotStore::default());
    let resolver = PeriodViewResolver::new(directory(), Arc::new(FailingGateway), store.clone());

    match resolver.close_period("norte", 2025, 3, None).await {
        Err(ResolveError::Fetch { branch_key, source }) => {
            assert_eq!(branch_key, "norte");
            assert!(matches!(source, FeedError::Upstream { code: Some(403), .. }));
        }
        other => panic!("expected fetch failure, got {other:?}"),
    }
    assert!(store.is_empty());
}

#[tokio::test]
async fn invalid_month_is_rejected_before_fetching() {
    let (resolver, gateway, store) = memory_resolver(march_rows());

    let err = resolver
        .close_period("norte", 2025, 13, None)
        .await
        .expect_err("month 13 rejected");

    assert!(matches!(
        err,
        ResolveError::Snapshot(SnapshotError::InvalidField {
            field: "period_month",
            ..
        })
    ));
    assert_eq!(gateway.calls(), 0);
    assert!(store.is_empty());
}

#[tokio::test]
async fn unknown_branch_is_reported_for_live_views() {
    let (resolver, gateway, _) = memory_resolver(march_rows());

    assert!(matches!(
        resolver.resolve("oeste", ViewMode::Live).await,
        Err(ResolveError::UnknownBranch(key)) if key == "oeste"
    ));
    assert_eq!(gateway.calls(), 0);
}

#[tokio::test]
async fn persistence_failures_keep_store_diagnostics() {
    let resolver = PeriodViewResolver::new(
        directory(),
        Arc::new(SheetGateway::with_rows(march_rows())),
        Arc::new(BrokenStore),
    );

    match resolver.close_period("norte", 2025, 3, None).await {
        Err(ResolveError::Snapshot(SnapshotError::Persistence(failure))) => {
            assert_eq!(failure.code.as_deref(), Some("5"));
            assert_eq!(failure.hint.as_deref(), Some("retry after the import finishes"));
        }
        other => panic!("expected persistence failure, got {other:?}"),
    }
}

#[tokio::test]
async fn representative_detail_reads_frozen_rows() {
    let (resolver, gateway, _) = memory_resolver(march_rows());
    resolver
        .close_period("norte", 2025, 3, None)
        .await
        .expect("march closes");
    gateway.publish(Vec::new());

    let detail = resolver
        .representative("norte", "bruno díaz", MARCH)
        .await
        .expect("frozen detail");
    assert_eq!(detail.achieved_tier, TierKey::Junior);
    assert_eq!(detail.comparisons.len(), 3);

    assert!(matches!(
        resolver
            .representative("norte", "Bruno Díaz", ViewMode::Live)
            .await,
        Err(ResolveError::UnknownRepresentative { .. })
    ));
}

#[tokio::test]
async fn frozen_payload_keeps_null_cells() {
    let original = json!([{
        "representative": "Ana Gómez",
        "supervisor": null,
        "projected_tier": "Junior",
        "zone": null,
        "efficiency": "91%"
    }]);
    let rows = serde_json::from_value(original.clone()).expect("rows deserialize");
    let (resolver, _, _) = memory_resolver(rows);
    resolver
        .close_period("norte", 2025, 3, None)
        .await
        .expect("march closes");

    match resolver.resolve("norte", MARCH).await {
        Ok(PeriodBoard::Frozen(frozen)) => assert_eq!(frozen.payload, original),
        other => panic!("expected frozen board, got {other:?}"),
    }
}
