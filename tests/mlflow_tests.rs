// Registry client, registrar and loader tests against a mocked MLflow server

use adult_income::models::PredictionInput;
use adult_income::services::{
    LoadError, MlflowClient, MlflowError, ModelLoader, Registrar, RegistrarError, RegistrationWait,
};
use mockito::{Matcher, Server};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn create_client(server: &Server) -> MlflowClient {
    MlflowClient::new(server.url(), Duration::from_secs(5)).unwrap()
}

fn model_version(version: &str, status: &str) -> String {
    json!({
        "model_version": {
            "name": "adult-income",
            "version": version,
            "source": "mlflow-artifacts:/1/abc123/artifacts/model",
            "run_id": "abc123",
            "current_stage": "None",
            "status": status
        }
    })
    .to_string()
}

fn artifact() -> String {
    json!({
        "type": "logistic_regression",
        "intercept": -1.0,
        "numeric": [
            { "column": "capital_gain", "mean": 1000.0, "scale": 1000.0, "weight": 2.0 }
        ],
        "categorical": [
            { "column": "education", "weights": { "Bachelors": 0.5 } }
        ]
    })
    .to_string()
}

#[tokio::test]
async fn test_registrar_issues_register_transition_alias() {
    let mut server = Server::new_async().await;

    let get_run = server
        .mock("GET", "/api/2.0/mlflow/runs/get")
        .match_query(Matcher::UrlEncoded("run_id".into(), "abc123".into()))
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "run": { "info": { "run_id": "abc123", "artifact_uri": "mlflow-artifacts:/1/abc123/artifacts" } }
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let create_model = server
        .mock("POST", "/api/2.0/mlflow/registered-models/create")
        .match_body(Matcher::PartialJson(json!({ "name": "adult-income" })))
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "error_code": "RESOURCE_ALREADY_EXISTS", "message": "Registered Model already exists." })
                .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let create_version = server
        .mock("POST", "/api/2.0/mlflow/model-versions/create")
        .match_body(Matcher::PartialJson(json!({
            "name": "adult-income",
            "source": "mlflow-artifacts:/1/abc123/artifacts/model",
            "run_id": "abc123"
        })))
        .with_header("content-type", "application/json")
        .with_body(model_version("2", "READY"))
        .expect(1)
        .create_async()
        .await;

    let transition = server
        .mock("POST", "/api/2.0/mlflow/model-versions/transition-stage")
        .match_body(Matcher::PartialJson(json!({
            "name": "adult-income",
            "version": "2",
            "stage": "Staging"
        })))
        .with_header("content-type", "application/json")
        .with_body(model_version("2", "READY"))
        .expect(1)
        .create_async()
        .await;

    let alias = server
        .mock("POST", "/api/2.0/mlflow/registered-models/alias")
        .match_body(Matcher::PartialJson(json!({
            "name": "adult-income",
            "alias": "champion",
            "version": "2"
        })))
        .with_header("content-type", "application/json")
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let registrar = Registrar::new(create_client(&server), "Staging", "champion");
    let outcome = registrar.run("abc123", "adult-income").await.unwrap();

    assert_eq!(outcome.version, "2");
    assert_eq!(outcome.stage, "Staging");
    assert_eq!(outcome.alias, "champion");

    get_run.assert_async().await;
    create_model.assert_async().await;
    create_version.assert_async().await;
    transition.assert_async().await;
    alias.assert_async().await;
}

#[tokio::test]
async fn test_registrar_leaves_version_on_alias_failure() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/api/2.0/mlflow/runs/get")
        .match_query(Matcher::Any)
        .with_body(json!({ "run": { "info": { "run_id": "abc123", "artifact_uri": "/mlruns/1/abc123/artifacts" } } }).to_string())
        .create_async()
        .await;
    server
        .mock("POST", "/api/2.0/mlflow/registered-models/create")
        .with_body(json!({ "registered_model": { "name": "adult-income" } }).to_string())
        .create_async()
        .await;
    server
        .mock("POST", "/api/2.0/mlflow/model-versions/create")
        .with_body(model_version("5", "READY"))
        .create_async()
        .await;
    server
        .mock("POST", "/api/2.0/mlflow/model-versions/transition-stage")
        .with_body(model_version("5", "READY"))
        .create_async()
        .await;
    server
        .mock("POST", "/api/2.0/mlflow/registered-models/alias")
        .with_status(500)
        .with_body(json!({ "error_code": "INTERNAL_ERROR", "message": "database is locked" }).to_string())
        .create_async()
        .await;

    let registrar = Registrar::new(create_client(&server), "Staging", "champion");
    let err = registrar.run("abc123", "adult-income").await.unwrap_err();

    match err {
        RegistrarError::SetAlias { version, source, .. } => {
            assert_eq!(version, "5");
            assert!(matches!(source, MlflowError::ApiError { status: 500, .. }));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_failed_registration_is_reported() {
    let mut server = Server::new_async().await;

    server
        .mock("POST", "/api/2.0/mlflow/registered-models/create")
        .with_body("{}")
        .create_async()
        .await;
    server
        .mock("POST", "/api/2.0/mlflow/model-versions/create")
        .with_body(model_version("1", "FAILED_REGISTRATION"))
        .create_async()
        .await;

    let client = create_client(&server);
    let err = client
        .register_model("mlflow-artifacts:/1/abc123/artifacts/model", "adult-income")
        .await
        .unwrap_err();

    assert!(matches!(err, MlflowError::RegistrationFailed { .. }));
}

#[tokio::test]
async fn test_pending_registration_times_out() {
    let mut server = Server::new_async().await;

    server
        .mock("POST", "/api/2.0/mlflow/registered-models/create")
        .with_body("{}")
        .create_async()
        .await;
    server
        .mock("POST", "/api/2.0/mlflow/model-versions/create")
        .with_body(model_version("1", "PENDING_REGISTRATION"))
        .create_async()
        .await;

    let client = create_client(&server).with_registration_wait(RegistrationWait {
        timeout: Duration::ZERO,
        poll_interval: Duration::from_millis(10),
    });
    let err = client
        .register_model("mlflow-artifacts:/1/abc123/artifacts/model", "adult-income")
        .await
        .unwrap_err();

    assert!(matches!(err, MlflowError::RegistrationTimeout { .. }));
}

#[tokio::test]
async fn test_loader_resolves_alias_and_downloads_artifact() {
    let mut server = Server::new_async().await;

    let by_alias = server
        .mock("GET", "/api/2.0/mlflow/registered-models/alias")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("name".into(), "adult-income".into()),
            Matcher::UrlEncoded("alias".into(), "champion".into()),
        ]))
        .with_body(model_version("3", "READY"))
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", "/api/2.0/mlflow/model-versions/get-download-uri")
        .match_query(Matcher::UrlEncoded("version".into(), "3".into()))
        .with_body(json!({ "artifact_uri": "mlflow-artifacts:/1/abc123/artifacts/model" }).to_string())
        .create_async()
        .await;
    let download = server
        .mock("GET", "/api/2.0/mlflow-artifacts/artifacts/1/abc123/artifacts/model/model.json")
        .with_body(artifact())
        .expect(1)
        .create_async()
        .await;

    let loader = ModelLoader::new(Arc::new(create_client(&server)));
    let model = loader.load("adult-income", "champion").await.unwrap();

    assert_eq!(model.version, "3");
    assert_eq!(model.run_id.as_deref(), Some("abc123"));
    assert_eq!(model.flavor(), "logistic_regression");

    let (value, class) = model.predict(&PredictionInput::example()).unwrap();
    assert_eq!(value, 1);
    assert_eq!(class.label(), ">50K");

    by_alias.assert_async().await;
    download.assert_async().await;
}

#[tokio::test]
async fn test_loader_reads_local_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("model.json"), artifact()).unwrap();

    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/2.0/mlflow/registered-models/alias")
        .match_query(Matcher::Any)
        .with_body(model_version("1", "READY"))
        .create_async()
        .await;
    server
        .mock("GET", "/api/2.0/mlflow/model-versions/get-download-uri")
        .match_query(Matcher::Any)
        .with_body(json!({ "artifact_uri": format!("file://{}", dir.path().display()) }).to_string())
        .create_async()
        .await;

    let loader = ModelLoader::new(Arc::new(create_client(&server)));
    let model = loader.load("adult-income", "champion").await.unwrap();

    let mut input = PredictionInput::example();
    input.capital_gain = 0;
    assert_eq!(model.predict(&input).unwrap().0, 0);
}

#[tokio::test]
async fn test_loader_missing_alias() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/2.0/mlflow/registered-models/alias")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(
            json!({ "error_code": "RESOURCE_DOES_NOT_EXIST", "message": "Registered model alias champion not found." })
                .to_string(),
        )
        .create_async()
        .await;

    let loader = ModelLoader::new(Arc::new(create_client(&server)));
    let err = loader.load("adult-income", "champion").await.unwrap_err();

    assert!(matches!(err, LoadError::Registry(MlflowError::NotFound(_))));
}

#[tokio::test]
async fn test_loader_rejects_unsupported_store() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/2.0/mlflow/registered-models/alias")
        .match_query(Matcher::Any)
        .with_body(model_version("1", "READY"))
        .create_async()
        .await;
    server
        .mock("GET", "/api/2.0/mlflow/model-versions/get-download-uri")
        .match_query(Matcher::Any)
        .with_body(json!({ "artifact_uri": "s3://models/1/abc123/artifacts/model" }).to_string())
        .create_async()
        .await;

    let loader = ModelLoader::new(Arc::new(create_client(&server)));
    let err = loader.load("adult-income", "champion").await.unwrap_err();

    assert!(matches!(err, LoadError::Registry(MlflowError::UnsupportedArtifactUri(_))));
}

#[tokio::test]
async fn test_loader_unreachable_registry() {
    // Nothing listens on this port
    let client = MlflowClient::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
    let loader = ModelLoader::new(Arc::new(client));

    let err = loader.load("adult-income", "champion").await.unwrap_err();
    assert!(matches!(err, LoadError::Registry(MlflowError::RequestError(_))));
}
