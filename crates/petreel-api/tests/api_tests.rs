//! API integration tests.

mod common;

use axum::http::StatusCode;
use common::{body_bytes, json_body, TestApp, UploadForm};
use petreel_models::{stages, JobResult, TaskId, TaskRecord, TaskStatus};

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new();
    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert!(response.headers().contains_key("x-request-id"));

    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_ready_reports_checks() {
    let app = TestApp::new();
    let response = app.get("/ready").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["queue"]["backend"], "memory");
    assert_eq!(body["checks"]["artifacts"]["backend"], "local");

    let app = TestApp::with_failing_queue();
    let response = app.get("/ready").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["checks"]["queue"]["status"], "error");
}

#[tokio::test]
async fn test_upload_writes_inputs_and_queues_job() {
    let app = TestApp::new();
    let response = app.upload(&UploadForm::rex()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(
        body["message"],
        "Upload successful, processing queued. You will receive an email with the video link."
    );
    let id = TaskId::from(body["task_id"].as_str().unwrap());

    let prompt = std::fs::read_to_string(app.path().join(format!("{id}.txt"))).unwrap();
    assert_eq!(prompt, "Happy Birthday Rex");
    let email = std::fs::read_to_string(app.path().join(format!("{id}_email.txt"))).unwrap();
    assert_eq!(email, "a@b.com");
    assert!(app.path().join(format!("{id}.jpg")).exists());

    let log = std::fs::read_to_string(app.path().join(format!("{id}_processing.log"))).unwrap();
    assert!(log.contains(&format!("Task {id} queued for processing")));
    assert!(log.contains("Email: a@b.com"));

    let jobs = app.queue.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].task_id, id);
    assert_eq!(jobs[0].product_description, "Happy Birthday Rex");
    assert!(jobs[0].photo_path.ends_with(&format!("{id}.jpg")));

    let record = app.state.status.read(&id).await.unwrap().unwrap();
    assert_eq!(record.status, TaskStatus::Pending);
    assert_eq!(record.stage, stages::WAITING_FOR_WORKER);
    assert!(record.queued_at.is_some());
    assert_eq!(record.user_email.as_deref(), Some("a@b.com"));
}

#[tokio::test]
async fn test_upload_marks_queued_when_configured() {
    let app = TestApp::with_mark_queued();
    let id = app.upload_rex().await;

    let body = json_body(app.get(&format!("/api/status/{id}")).await).await;
    assert_eq!(body["status"], "QUEUED");
    assert_eq!(body["stage"], stages::WAITING_FOR_WORKER);
}

#[tokio::test]
async fn test_upload_missing_fields_writes_nothing() {
    let app = TestApp::new();
    let cases = [
        UploadForm { photo: None, ..UploadForm::rex() },
        UploadForm { message: None, ..UploadForm::rex() },
        UploadForm { email: None, ..UploadForm::rex() },
        UploadForm { message: Some("  "), ..UploadForm::rex() },
    ];

    for form in &cases {
        let response = app.upload(form).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Missing required fields (dogPhoto, message, or email)");
        assert!(body.get("task_id").is_none());
    }

    assert!(app.files().is_empty());
    assert!(app.queue.jobs().is_empty());
}

#[tokio::test]
async fn test_upload_rejects_bad_email_and_photo_type() {
    let app = TestApp::new();

    let response = app
        .upload(&UploadForm { email: Some("not-an-email"), ..UploadForm::rex() })
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .upload(&UploadForm { photo: Some(("dog.exe", b"MZ")), ..UploadForm::rex() })
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(app.files().is_empty());
}

#[tokio::test]
async fn test_upload_queue_failure_marks_task_failed() {
    let app = TestApp::with_failing_queue();
    let response = app.upload(&UploadForm::rex()).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Failed to queue task for processing");

    let status_file = app
        .files()
        .into_iter()
        .find(|name| name.ends_with("_status.json"))
        .unwrap();
    let record: TaskRecord =
        serde_json::from_slice(&std::fs::read(app.path().join(status_file)).unwrap()).unwrap();
    assert_eq!(record.status, TaskStatus::Failed);
    assert_eq!(record.stage, stages::QUEUE_FAILED);
    assert!(record.error.unwrap().contains("connection refused"));
    assert!(record.completed.is_some());
}

#[tokio::test]
async fn test_unknown_task_is_404() {
    let app = TestApp::new();

    let response = app.get("/api/status/does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await, serde_json::json!({"error": "Task not found"}));

    let response = app.get("/api/result/does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await, serde_json::json!({"error": "Result not found"}));

    let response = app.get("/api/status/bad%2E%2E%2Fid").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_without_record_but_with_inputs() {
    let app = TestApp::new();
    std::fs::write(app.path().join("T9.txt"), "Happy Birthday").unwrap();

    let response = app.get("/api/status/T9").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({
            "status": "PENDING",
            "stage": "Initializing...",
            "message": "Your request is being processed"
        })
    );
}

#[tokio::test]
async fn test_complete_without_video_reports_processing() {
    let app = TestApp::new();
    let id = TaskId::from("T2");
    let mut record = TaskRecord::pending(None);
    record.status = TaskStatus::Complete;
    record.video_path = Some(app.path().join("gone.mp4").to_string_lossy().into_owned());
    app.state.status.write(&id, &record).await.unwrap();

    for _ in 0..3 {
        let body = json_body(app.get("/api/status/T2").await).await;
        assert_eq!(body["status"], "PROCESSING");
        assert_eq!(body["stage"], stages::FINALIZING);
    }
}

#[tokio::test]
async fn test_status_keeps_worker_fields() {
    let app = TestApp::new();
    std::fs::write(
        app.path().join("T3_status.json"),
        r#"{"status":"PROCESSING","stage":"Rendering scenes","progress":42}"#,
    )
    .unwrap();
    app.state
        .task_log
        .append(&TaskId::from("T3"), "Cloudinary upload successful. Secure URL: https://cdn/rex.mp4")
        .await
        .unwrap();

    let body = json_body(app.get("/api/status/T3").await).await;
    assert_eq!(body["status"], "PROCESSING");
    assert_eq!(body["result_url"], "https://cdn/rex.mp4");
    assert_eq!(body["progress"], 42);

    let stored: serde_json::Value =
        serde_json::from_slice(&std::fs::read(app.path().join("T3_status.json")).unwrap()).unwrap();
    assert_eq!(stored["progress"], 42);
    assert_eq!(stored["result_url"], "https://cdn/rex.mp4");
}

#[tokio::test]
async fn test_upload_then_result_completes_task() {
    let app = TestApp::new();
    let id = app.upload_rex().await;

    let body = json_body(app.get(&format!("/api/status/{id}")).await).await;
    assert_eq!(body["status"], "PENDING");

    // Worker picks the job up and reports back.
    let job = app.queue.pop_job().unwrap();
    assert_eq!(job.task_id, id);
    app.queue.push_result(JobResult::completed(id.clone(), "https://cdn/x.mp4"));

    let body = json_body(app.get(&format!("/api/status/{id}")).await).await;
    assert_eq!(body["status"], "COMPLETE");
    assert_eq!(body["result_url"], "https://cdn/x.mp4");
    assert_eq!(body["stage"], stages::DELIVERED);
    assert!(body["completed"].is_string());
    assert_eq!(app.queue.results_len(), 0);

    // Still complete on the next poll: the remote URL stands in for the file.
    let body = json_body(app.get(&format!("/api/status/{id}")).await).await;
    assert_eq!(body["status"], "COMPLETE");
}

#[tokio::test]
async fn test_failed_result_is_reported() {
    let app = TestApp::new();
    let id = app.upload_rex().await;
    app.queue.push_result(JobResult::failed(id.clone(), "No dog detected"));

    let body = json_body(app.get(&format!("/api/status/{id}")).await).await;
    assert_eq!(body["status"], "FAILED");
    assert_eq!(body["error"], "No dog detected");
}

#[tokio::test]
async fn test_concurrent_status_checks_claim_result_once() {
    let app = TestApp::new();
    let id = app.upload_rex().await;
    app.queue.push_result(JobResult::completed(id.clone(), "https://cdn/x.mp4"));

    let uri = format!("/api/status/{id}");
    let checks: Vec<_> = (0..8)
        .map(|_| {
            let router = app.router();
            let uri = uri.clone();
            tokio::spawn(async move {
                use tower::ServiceExt;
                let request = axum::http::Request::builder()
                    .uri(uri)
                    .body(axum::body::Body::empty())
                    .unwrap();
                router.oneshot(request).await.unwrap().status()
            })
        })
        .collect();
    for check in checks {
        assert_eq!(check.await.unwrap(), StatusCode::OK);
    }

    assert_eq!(app.queue.results_len(), 0);
    let record = app.state.status.read(&id).await.unwrap().unwrap();
    assert_eq!(record.status, TaskStatus::Complete);
    // Queued write, then exactly one promotion.
    assert_eq!(record.revision, 2);
}

#[tokio::test]
async fn test_result_streams_video() {
    let app = TestApp::new();
    std::fs::write(app.path().join("render_T4_final.mp4"), b"fake-mp4-bytes").unwrap();

    let response = app.get("/api/result/T4").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "video/mp4");
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"dog_birthday_card_T4.mp4\""
    );
    assert_eq!(body_bytes(response).await, b"fake-mp4-bytes");
}

#[tokio::test]
async fn test_result_prefers_recorded_video_path() {
    let app = TestApp::new();
    let recorded = app.path().join("custom.mp4");
    std::fs::write(&recorded, b"recorded").unwrap();
    std::fs::write(app.path().join("T5.mp4"), b"scanned").unwrap();

    let mut record = TaskRecord::pending(None);
    record.complete(None);
    record.video_path = Some(recorded.to_string_lossy().into_owned());
    app.state.status.write(&TaskId::from("T5"), &record).await.unwrap();

    let response = app.get("/api/result/T5").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"recorded");
}
