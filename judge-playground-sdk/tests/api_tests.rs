// Integration tests for the client against a mocked backend

use futures::StreamExt;
use judge_playground_sdk::batch::{evaluate_rows_metrics, judge_rows};
use judge_playground_sdk::{
    annotate_synthetic_ids, GenerateRequest, GenerationListParams, JudgePlaygroundClient,
    LabelDatasetRequest, RowsParams, ScoreRequest, SdkError, StreamEvent, UploadFile,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ===== Setup Helpers =====

async fn setup() -> (MockServer, JudgePlaygroundClient) {
    let server = MockServer::start().await;
    let client = JudgePlaygroundClient::builder(server.uri())
        .build()
        .expect("client");
    (server, client)
}

fn judge_body() -> serde_json::Value {
    json!({"correctness": 8.0, "relevance": 9.0, "fluency": 7.5, "overall": 8.2})
}

// ===== Error mapping =====

#[tokio::test]
async fn test_not_found_uses_detail_message() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/generations/999/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not found."})))
        .mount(&server)
        .await;

    let err = client.generations().get(999).await.unwrap_err();
    assert_eq!(err.status_code(), Some(404));
    assert!(!err.is_network_error());
    match err {
        SdkError::Http { message, json, .. } => {
            assert_eq!(message, "Not found.");
            assert_eq!(json, Some(json!({"detail": "Not found."})));
        }
        other => panic!("expected Http error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_success_with_invalid_json_is_invalid_response() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/datasets/1/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client.datasets().get(1).await.unwrap_err();
    match err {
        SdkError::InvalidResponse { status, body } => {
            assert_eq!(status, 200);
            assert_eq!(body, "<html>oops</html>");
        }
        other => panic!("expected InvalidResponse, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_with_html_body() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/models/"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<h1>Bad Gateway</h1>"))
        .mount(&server)
        .await;

    let err = client.models().list().await.unwrap_err();
    assert!(err.is_server_error());
    assert_eq!(err.body(), Some("<h1>Bad Gateway</h1>"));
    assert_eq!(err.json(), None);
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    let client = JudgePlaygroundClient::builder("http://127.0.0.1:9")
        .build()
        .unwrap();

    let err = client.models().list().await.unwrap_err();
    assert!(err.is_network_error());
    assert_eq!(err.status_code(), None);
}

// ===== Connection =====

#[tokio::test]
async fn test_connection_accepts_non_json_root() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
        .mount(&server)
        .await;

    let status = client.test_connection().await;
    assert!(status.is_connected());
}

#[tokio::test]
async fn test_connection_reports_transport_error() {
    let client = JudgePlaygroundClient::builder("http://127.0.0.1:9")
        .build()
        .unwrap();

    assert!(!client.test_connection().await.is_connected());
}

// ===== Generations =====

#[tokio::test]
async fn test_generate_normalizes_generation_id() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/inference/generate/"))
        .and(body_partial_json(json!({"model_slug": "gemma3-4b-ollama", "prompt": "Hi"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "generation_id": 12,
            "model_slug": "gemma3-4b-ollama",
            "text": "Hello!",
            "latency_ms": 420
        })))
        .expect(1)
        .mount(&server)
        .await;

    let generation = client.generations().generate("gemma3-4b-ollama", "Hi").await.unwrap();
    assert_eq!(generation.id, 12);
    assert_eq!(generation.output, "Hello!");
    assert_eq!(generation.model.as_deref(), Some("gemma3-4b-ollama"));
    assert_eq!(generation.latency_ms, Some(420));
}

#[tokio::test]
async fn test_generate_without_id_is_contract_violation() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/inference/generate/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"output": "x"})))
        .mount(&server)
        .await;

    let err = client.generations().generate("m", "p").await.unwrap_err();
    assert!(matches!(err, SdkError::ContractViolation(_)));
}

#[tokio::test]
async fn test_get_generation_normalizes_backend_shape() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/generations/7/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "prompt": "Who wrote Dune?",
            "output": "Frank Herbert",
            "model": "mistral-7b",
            "created_at": "2025-01-01T00:00:00Z"
        })))
        .mount(&server)
        .await;

    let generation = client.generations().get(7).await.unwrap();
    assert_eq!(generation.id, 7);
    assert_eq!(generation.prompt.as_deref(), Some("Who wrote Dune?"));
    assert_eq!(generation.created_at.as_deref(), Some("2025-01-01T00:00:00Z"));
}

#[tokio::test]
async fn test_list_generations_omits_unset_query_params() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/generations/"))
        .and(query_param("page_size", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "next": null,
            "previous": null,
            "results": [{"id": 1, "output": "a", "model": "m"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client
        .generations()
        .list(&GenerationListParams::new().with_page_size(10))
        .await
        .unwrap();
    assert_eq!(page.count, 1);
    assert_eq!(page.results[0].id, 1);
    assert!(!page.has_more());

    let requests = server.received_requests().await.unwrap();
    let query = requests[0].url.query().unwrap_or_default();
    assert_eq!(query, "page_size=10");
}

#[tokio::test]
async fn test_generate_stream_yields_tokens() {
    let (server, client) = setup().await;
    let body = "event: start\ndata: {}\n\n\
                data: {\"token\": \"Hel\"}\n\n\
                data: {\"token\": \"lo\"}\n\n\
                event: done\ndata: {}\n\n";
    Mock::given(method("POST"))
        .and(path("/api/inference/generate/stream/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .mount(&server)
        .await;

    let events: Vec<StreamEvent> = client
        .generations()
        .generate_stream(&GenerateRequest::new("m", "p"))
        .await
        .unwrap()
        .map(|e| e.unwrap())
        .collect()
        .await;

    assert_eq!(
        events,
        vec![
            StreamEvent::Start,
            StreamEvent::Token("Hel".to_string()),
            StreamEvent::Token("lo".to_string()),
            StreamEvent::Done,
        ]
    );
}

// ===== Evaluations =====

#[tokio::test]
async fn test_metrics_request_and_unit_scale() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/evaluate/"))
        .and(body_partial_json(json!({
            "generation_id": 5,
            "reference": "ref",
            "metrics": ["bleu", "rouge", "cosine"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "evaluation_id": 3,
            "metrics": {"bleu": 42.0, "rouge1": 0.5, "rougeL": 0.4, "cosine": 0.9}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client.evaluations().metrics(5, "ref").await.unwrap();
    assert_eq!(result.evaluation_id, 3);
    assert_eq!(result.metrics.bleu, Some(0.42));
    assert_eq!(result.metrics.rouge_l, Some(0.4));
}

#[tokio::test]
async fn test_text_metrics_low_bleu_is_a_percentage() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/evaluate/"))
        .and(body_partial_json(json!({"candidate": "a", "reference": "b"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "evaluation_id": 8,
            "metrics": {"bleu": 0.8, "cosine": 0.7}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client.evaluations().text_metrics("a", "b").await.unwrap();
    let bleu = result.metrics.bleu.unwrap();
    assert!((bleu - 0.008).abs() < 1e-12);
    assert_eq!(result.metrics.cosine, Some(0.7));
}

#[tokio::test]
async fn test_judge_omits_missing_candidate() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/evaluate/judge/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(judge_body()))
        .mount(&server)
        .await;

    let request = judge_playground_sdk::JudgeRequest::new(4, "ref");
    let scores = client.evaluations().judge(&request).await.unwrap();
    assert_eq!(scores.overall, 8.2);

    let requests = server.received_requests().await.unwrap();
    let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(sent, json!({"generation_id": 4, "reference": "ref"}));
}

// ===== Composite =====

#[tokio::test]
async fn test_generate_then_score_returns_all_three() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/inference/generate/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"pk": 21, "completion": "Herbert"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/evaluate/"))
        .and(body_partial_json(json!({"generation_id": 21})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "evaluation_id": 1,
            "metrics": {"bleu": 0.3, "rouge1": 0.6, "rougeL": 0.5, "cosine": 0.8}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/evaluate/judge/"))
        .and(body_partial_json(json!({
            "generation_id": 21,
            "candidate": "Herbert",
            "judge_model": "qwen"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(judge_body()))
        .expect(1)
        .mount(&server)
        .await;

    let scored = client
        .generate_then_score(&ScoreRequest::new("m", "Who wrote Dune?", "Frank Herbert").with_judge_model("qwen"))
        .await
        .unwrap();

    assert_eq!(scored.generation_id, 21);
    assert_eq!(scored.generation.output, "Herbert");
    assert_eq!(scored.metrics.metrics.cosine, Some(0.8));
    assert_eq!(scored.judge.fluency, 7.5);
}

#[tokio::test]
async fn test_generate_then_score_short_circuits_on_generate_failure() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/inference/generate/"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "model crashed"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/evaluate/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/evaluate/judge/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client
        .generate_then_score(&ScoreRequest::new("m", "p", "r"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "HTTP 500: model crashed");
}

#[tokio::test]
async fn test_generate_then_score_fails_when_judge_fails() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/inference/generate/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 2, "output": "x"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/evaluate/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "evaluation_id": 1,
            "metrics": {"bleu": 0.1}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/evaluate/judge/"))
        .respond_with(ResponseTemplate::new(503).set_body_string("judge offline"))
        .mount(&server)
        .await;

    let err = client
        .generate_then_score(&ScoreRequest::new("m", "p", "r"))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), Some(503));
}

#[tokio::test]
async fn test_generate_then_score_fails_when_metrics_fails() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/inference/generate/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 2, "output": "x"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/evaluate/"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "metrics crashed"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/evaluate/judge/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(judge_body()))
        .mount(&server)
        .await;

    let err = client
        .generate_then_score(&ScoreRequest::new("m", "p", "r"))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), Some(500));
    assert_eq!(err.to_string(), "HTTP 500: metrics crashed");
}

// ===== Datasets and models =====

#[tokio::test]
async fn test_upload_is_multipart() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/datasets/upload/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "dataset": {"id": 9, "name": "claims", "kind": "csv", "row_count": 2},
            "inserted": 2,
            "sample": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let file = UploadFile::new("claims.csv", "claim,reference,label\na,b,SUPPORTS\n");
    let response = client.datasets().upload(file, Some("claims")).await.unwrap();
    assert_eq!(response.dataset.id, 9);
    assert_eq!(response.inserted, 2);

    let requests = server.received_requests().await.unwrap();
    let content_type = requests[0]
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("filename=\"claims.csv\""));
    assert!(body.contains("name=\"name\""));
}

#[tokio::test]
async fn test_dataset_rows_query() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/datasets/3/rows/"))
        .and(query_param("limit", "5"))
        .and(query_param("label", "REFUTES"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "next": null,
            "previous": null,
            "results": [{"id": 1, "claim": "c", "reference": "r", "label": "REFUTES"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let rows = client
        .datasets()
        .rows(3, &RowsParams::new().with_limit(5).with_label("REFUTES"))
        .await
        .unwrap();
    assert_eq!(rows.results[0].label.as_deref(), Some("REFUTES"));
}

#[tokio::test]
async fn test_empty_model_catalog_is_not_an_error() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/models/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert!(client.models().list().await.unwrap().is_empty());
}

// ===== Labeling =====

#[tokio::test]
async fn test_label_json_sends_format() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/inference/label_dataset/"))
        .and(body_partial_json(json!({"dataset_id": 1, "model_slug": "m", "format": "json"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"row_id": 10, "claim": "c", "reference": "r", "pred_label": "SUPPORTS", "justification": "because"},
            {"row_id": 11, "claim": "c2", "reference": "r2", "pred_label": "REFUTES", "justification": "no"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let rows = client
        .labeling()
        .label_json(&LabelDatasetRequest::new(1, "m").with_limit(2))
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].pred_label.as_deref(), Some("REFUTES"));
    assert_eq!(rows[0].generation_id, None);
}

#[tokio::test]
async fn test_download_csv_uses_content_disposition() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/inference/label_dataset/"))
        .and(body_partial_json(json!({"format": "csv"})))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/csv")
                .insert_header("content-disposition", "attachment; filename=\"foo.csv\"")
                .set_body_string("row_id,pred_label\n1,SUPPORTS\n"),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let saved = client
        .labeling()
        .download_csv(&LabelDatasetRequest::new(1, "m"), dir.path(), None)
        .await
        .unwrap();

    assert_eq!(saved.filename, "foo.csv");
    assert_eq!(
        std::fs::read_to_string(dir.path().join("foo.csv")).unwrap(),
        "row_id,pred_label\n1,SUPPORTS\n"
    );
}

#[tokio::test]
async fn test_download_csv_error_is_typed() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/inference/label_dataset/"))
        .respond_with(ResponseTemplate::new(400).set_body_string("dataset_id required"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let err = client
        .labeling()
        .download_csv(&LabelDatasetRequest::new(0, "m"), dir.path(), Some("x.csv"))
        .await
        .unwrap_err();
    assert!(err.is_client_error());
    assert!(!dir.path().join("x.csv").exists());
}

#[tokio::test]
async fn test_download_csv_error_uses_detail_message() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/inference/label_dataset/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "dataset 7 not found"})))
        .mount(&server)
        .await;

    let err = client
        .labeling()
        .fetch_csv(&LabelDatasetRequest::new(7, "m"))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), Some(404));
    assert_eq!(err.to_string(), "HTTP 404: dataset 7 not found");
    assert_eq!(err.json(), Some(&json!({"detail": "dataset 7 not found"})));
}

// ===== Batch =====

#[tokio::test]
async fn test_batch_judge_keeps_order_and_records_failures() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/evaluate/judge/"))
        .and(body_partial_json(json!({"generation_id": 1, "candidate": "because"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(judge_body()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/evaluate/judge/"))
        .and(body_partial_json(json!({"generation_id": 2})))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "judge died"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut rows: Vec<judge_playground_sdk::LabelDatasetRowResult> = serde_json::from_value(json!([
        {"row_id": 10, "claim": "c", "reference": "r", "justification": "because"},
        {"row_id": 11, "claim": "c", "reference": "r", "justification": "other"},
        {"row_id": 12, "claim": "c", "reference": "", "justification": "none"}
    ]))
    .unwrap();
    annotate_synthetic_ids(&mut rows);

    let outcomes = judge_rows(client.evaluations(), &rows, None).await;
    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].value().map(|s| s.overall), Some(8.2));
    assert_eq!(outcomes[1].error(), Some("HTTP 500: judge died"));
    assert_eq!(outcomes[2].error(), Some("missing generation_id or reference"));
    assert_eq!(outcomes[2].row.row_id, 12);
}

#[tokio::test]
async fn test_batch_metrics_compare_justification_text() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/evaluate/"))
        .and(body_partial_json(json!({"candidate": "because", "reference": "r"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "evaluation_id": 1,
            "metrics": {"bleu": 12.0, "rouge1": 0.2, "rougeL": 0.2, "cosine": 0.5}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let rows: Vec<judge_playground_sdk::LabelDatasetRowResult> = serde_json::from_value(json!([
        {"row_id": 1, "claim": "c", "reference": "r", "justification": "because"},
        {"row_id": 2, "claim": "c", "reference": "r"}
    ]))
    .unwrap();

    let outcomes = evaluate_rows_metrics(client.evaluations(), &rows).await;
    assert_eq!(outcomes[0].value().and_then(|m| m.bleu), Some(0.12));
    assert_eq!(outcomes[1].error(), Some("missing justification or reference"));
}
