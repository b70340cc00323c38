mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{api, setup_context, OfflineTestContext};
use lms_offline::application::ports::HttpMethod;
use lms_offline::domain::entities::{AssetStatus, DownloadStatus, DownloadTask};
use lms_offline::DownloadHandle;
use serde_json::json;

async fn script_course(ctx: &OfflineTestContext) {
    ctx.transport
        .respond_json(
            &api("courses/c1"),
            json!({
                "id": "c1",
                "title": "Intro",
                "modules": [
                    { "id": "mod1", "lessons": [ { "id": "l1" }, { "id": "l2" } ] },
                    { "id": "mod2", "lessons": [ { "id": "l3" }, { "id": "l4" } ] }
                ]
            }),
        )
        .await;
    ctx.transport
        .respond_json(
            &api("lessons/l1"),
            json!({ "id": "l1", "media": [ { "id": "m1" } ] }),
        )
        .await;
    for lesson in ["l2", "l3", "l4"] {
        ctx.transport
            .respond_json(&api(&format!("lessons/{lesson}")), json!({ "id": lesson }))
            .await;
    }
    ctx.transport
        .respond(HttpMethod::Get, &api("media/m1"), 200, vec![0u8; 64])
        .await;
}

async fn wait_until<F>(handle: &DownloadHandle, condition: F) -> DownloadTask
where
    F: Fn(&DownloadTask) -> bool,
{
    let mut rx = handle.subscribe();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let task = rx.borrow_and_update();
                if condition(&task) {
                    return task.clone();
                }
            }
            rx.changed().await.expect("download task dropped");
        }
    })
    .await
    .expect("condition not reached in time")
}

#[tokio::test]
async fn downloads_whole_course() {
    let ctx = setup_context().await;
    script_course(&ctx).await;
    let manager = ctx.download_manager();

    let handle = manager.start_download("c1").await.unwrap();
    let task = handle.wait().await;

    assert_eq!(task.status, DownloadStatus::Complete);
    assert_eq!(task.total_units, 5);
    assert_eq!(task.completed_units, 5);
    assert_eq!(task.per_asset_status.get("m1"), Some(&AssetStatus::Done));
    assert!(task.missing().is_empty());
    assert!(manager.is_downloaded("c1").await.unwrap());

    let media_key = ctx.gateway.cache_key_for("media/m1").unwrap();
    let entry = ctx.store.get(&media_key).await.unwrap().unwrap();
    assert!(entry.pinned);
    assert_eq!(entry.payload.len(), 64);
}

#[tokio::test]
async fn second_start_returns_the_running_task() {
    let ctx = setup_context().await;
    script_course(&ctx).await;
    let gate = ctx.transport.gate(&api("courses/c1")).await;
    let manager = ctx.download_manager();

    let first = manager.start_download("c1").await.unwrap();
    let second = manager.start_download("c1").await.unwrap();

    assert!(first.same_task(&second));
    assert_eq!(first.id(), second.id());

    gate.notify_one();
    let task = second.wait().await;
    assert_eq!(task.status, DownloadStatus::Complete);
    assert_eq!(
        ctx.transport
            .calls_to(HttpMethod::Get, &api("courses/c1"))
            .await,
        1
    );
}

#[tokio::test]
async fn progress_is_monotonic() {
    let ctx = setup_context().await;
    script_course(&ctx).await;
    let manager = ctx.download_manager();

    let handle = manager.start_download("c1").await.unwrap();
    let mut rx = handle.subscribe();
    let mut last = 0;
    loop {
        let task = rx.borrow_and_update().clone();
        assert!(task.completed_units >= last);
        assert!(task.completed_units <= task.total_units || task.total_units == 0);
        last = task.completed_units;
        if task.is_terminal() {
            break;
        }
        if rx.changed().await.is_err() {
            break;
        }
    }
    assert_eq!(manager.progress("c1").await.unwrap().completed_units, 5);
}

#[tokio::test]
async fn cancelled_download_resumes_without_refetching() {
    let ctx = setup_context().await;
    script_course(&ctx).await;
    let gate = ctx.transport.gate(&api("lessons/l3")).await;
    let manager = ctx.download_manager();

    let handle = manager.start_download("c1").await.unwrap();
    wait_until(&handle, |task| task.completed_units == 3).await;

    assert!(manager.cancel("c1").await);
    assert_eq!(handle.snapshot().status, DownloadStatus::Cancelled);

    // The in-flight lesson is allowed to finish and persist.
    gate.notify_one();
    let task = wait_until(&handle, |task| {
        task.per_asset_status.get("l3") == Some(&AssetStatus::Done)
    })
    .await;
    assert_eq!(task.status, DownloadStatus::Cancelled);
    assert_eq!(task.per_asset_status.get("l4"), Some(&AssetStatus::Pending));
    assert!(!manager.is_downloaded("c1").await.unwrap());

    ctx.transport.clear_calls().await;
    let resumed = manager.start_download("c1").await.unwrap();
    assert!(!resumed.same_task(&handle));
    let task = resumed.wait().await;

    assert_eq!(task.status, DownloadStatus::Complete);
    assert!(ctx.transport.call_count().await <= 1);
    assert_eq!(
        ctx.transport
            .calls_to(HttpMethod::Get, &api("lessons/l4"))
            .await,
        1
    );
}

#[tokio::test]
async fn failed_media_leaves_course_partially_downloaded() {
    let ctx = setup_context().await;
    script_course(&ctx).await;
    ctx.transport
        .respond(HttpMethod::Get, &api("media/m1"), 500, "boom")
        .await;
    let manager = ctx.download_manager();

    let task = manager.start_download("c1").await.unwrap().wait().await;

    assert_eq!(task.status, DownloadStatus::Failed);
    assert_eq!(task.completed_units, 4);
    assert_eq!(task.missing(), vec!["l1".to_string(), "m1".to_string()]);
    assert!(!manager.is_downloaded("c1").await.unwrap());

    // Retrying only fetches what is missing.
    ctx.transport
        .respond(HttpMethod::Get, &api("media/m1"), 200, vec![1u8; 8])
        .await;
    ctx.transport.clear_calls().await;

    let task = manager.start_download("c1").await.unwrap().wait().await;
    assert_eq!(task.status, DownloadStatus::Complete);
    let urls: Vec<String> = ctx
        .transport
        .calls()
        .await
        .into_iter()
        .map(|request| request.url)
        .collect();
    assert_eq!(urls, vec![api("media/m1")]);
}

#[tokio::test]
async fn missing_course_fails_immediately() {
    let ctx = setup_context().await;
    let manager = ctx.download_manager();

    let task = manager.start_download("nope").await.unwrap().wait().await;
    assert_eq!(task.status, DownloadStatus::Failed);
    assert_eq!(task.completed_units, 0);
    assert!(manager.start_download("  ").await.is_err());
}

#[tokio::test]
async fn downloaded_course_is_recognised_from_store_alone() {
    let ctx = setup_context().await;
    script_course(&ctx).await;

    let first = ctx.download_manager();
    first.start_download("c1").await.unwrap().wait().await;

    let fresh = ctx.download_manager();
    assert!(fresh.progress("c1").await.is_none());
    assert!(fresh.is_downloaded("c1").await.unwrap());
}

#[tokio::test]
async fn remove_course_deletes_every_entry() {
    let ctx = setup_context().await;
    script_course(&ctx).await;
    let manager = ctx.download_manager();
    manager.start_download("c1").await.unwrap().wait().await;

    let removed = manager.remove_course("c1").await.unwrap();

    assert_eq!(removed, 6);
    assert!(manager.progress("c1").await.is_none());
    assert!(!manager.is_downloaded("c1").await.unwrap());
    assert_eq!(ctx.store.stats().await.unwrap().entry_count, 0);
}

#[tokio::test]
async fn courses_download_independently() {
    let ctx = setup_context().await;
    script_course(&ctx).await;
    ctx.transport
        .respond_json(
            &api("courses/c2"),
            json!({ "id": "c2", "modules": [ { "id": "x", "lessons": [ { "id": "l2" } ] } ] }),
        )
        .await;
    let manager: Arc<_> = ctx.download_manager();

    let c1 = manager.start_download("c1").await.unwrap();
    let c2 = manager.start_download("c2").await.unwrap();
    assert!(!c1.same_task(&c2));

    let (t1, t2) = tokio::join!(c1.wait(), c2.wait());
    assert_eq!(t1.status, DownloadStatus::Complete);
    assert_eq!(t2.status, DownloadStatus::Complete);
    assert_eq!(t2.total_units, 2);
}

#[tokio::test]
async fn is_downloaded_rechecks_store_after_clear() {
    let ctx = setup_context().await;
    script_course(&ctx).await;
    let manager = ctx.download_manager();

    let handle = manager.start_download("c1").await.unwrap();
    assert_eq!(handle.wait().await.status, DownloadStatus::Complete);
    ctx.gateway.flush_cache_writes().await;
    assert!(manager.is_downloaded("c1").await.unwrap());

    ctx.store.clear_all(None).await.unwrap();

    assert_eq!(
        manager.progress("c1").await.unwrap().status,
        DownloadStatus::Complete
    );
    assert!(!manager.is_downloaded("c1").await.unwrap());
}
