//! Integration tests for the built-in workers and the full request path
//!
//! Web pages are served by wiremock; LLM replies are scripted.

mod common;

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use common::ScriptedLLM;
use ensemble_engine::conductor::Orchestrator;
use ensemble_engine::config::{AnalysisConfig, RetrievalConfig, WorkersConfig};
use ensemble_engine::llm::LLMProvider;
use ensemble_engine::workers::{analysis::AnalysisWorker, default_registry, retrieval::RetrievalWorker};
use sdk::errors::{CapabilityError, EngineError};
use sdk::{Artifact, CellValue};

const FILMS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Highest-grossing films</title><style>table { border: 1px }</style></head>
<body>
<table class="infobox"><tr><th>Updated</th><td>2024</td></tr></table>
<table class="wikitable">
  <tr><th>Rank</th><th>Title</th><th>Worldwide gross</th><th>Year</th></tr>
  <tr><td>1</td><td><a href="/wiki/Avatar">Avatar</a></td><td>$2,923,706,026</td><td>2009</td></tr>
  <tr><td>2</td><td>Avengers: Endgame</td><td>$2,799,439,100</td><td>2019</td></tr>
  <tr><td>3</td><td>Avatar: The Way of Water</td><td>$2,320,250,281</td><td>2022</td></tr>
  <tr><td>4</td><td>Titanic</td><td>$2,264,750,694</td><td>1997</td></tr>
  <tr><td>5</td><td>Star Wars: The Force Awakens</td><td>$2,071,310,218</td><td>2015</td></tr>
  <tr><td>6</td><td>Avengers: Infinity War</td><td>$2,052,415,039</td><td>2018</td></tr>
  <tr><td>7</td><td>Spider-Man: No Way Home</td><td>$1,921,847,111</td><td>2021</td></tr>
</table>
</body>
</html>"#;

const COUNT_SQL: &str = "```sql\nSELECT COUNT(*) FROM data_table \
    WHERE CAST(REPLACE(REPLACE(\"Worldwide gross\", '$', ''), ',', '') AS INTEGER) > 2000000000 \
    AND \"Year\" < 2020;\n```";

async fn films_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wiki/films"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FILMS_PAGE))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_retrieval_extracts_largest_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wiki/films"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FILMS_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let worker = RetrievalWorker::new(&RetrievalConfig::default());
    let table = worker
        .fetch_table(&format!("{}/wiki/films", server.uri()))
        .await
        .unwrap();

    assert_eq!(table.columns(), ["Rank", "Title", "Worldwide gross", "Year"]);
    assert_eq!(table.num_rows(), 7);
    assert_eq!(table.rows()[0][1], CellValue::Text("Avatar".to_string()));
    assert_eq!(table.rows()[3][3], CellValue::Integer(1997));

    let requests = server.received_requests().await.unwrap();
    let user_agent = requests[0].headers.get("user-agent").unwrap();
    assert_eq!(
        user_agent.to_str().unwrap(),
        RetrievalConfig::default().user_agent
    );
}

#[tokio::test]
async fn test_retrieval_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let worker = RetrievalWorker::new(&RetrievalConfig::default());
    let result = worker.fetch_table(&format!("{}/missing", server.uri())).await;
    assert!(matches!(result, Err(CapabilityError::TransportError(_))));
}

#[tokio::test]
async fn test_retrieval_page_without_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body><p>Nothing here</p></body></html>"),
        )
        .mount(&server)
        .await;

    let worker = RetrievalWorker::new(&RetrievalConfig::default());
    let result = worker.fetch_table(&format!("{}/empty", server.uri())).await;
    match result {
        Err(CapabilityError::NotFound(msg)) => assert!(msg.contains("No HTML tables found")),
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_analysis_answers_from_generated_sql() {
    let server = films_server().await;
    let table = RetrievalWorker::new(&RetrievalConfig::default())
        .fetch_table(&format!("{}/wiki/films", server.uri()))
        .await
        .unwrap();

    let llm = ScriptedLLM::new([COUNT_SQL]);
    let worker = AnalysisWorker::new(
        Arc::clone(&llm) as Arc<dyn LLMProvider>,
        &AnalysisConfig::default(),
    );

    let answer = worker
        .answer(&table, "How many films grossed more than $2 billion before 2020?")
        .await
        .unwrap();
    assert_eq!(answer, Artifact::Value(CellValue::Integer(5)));

    // The SQL prompt carries the schema
    let prompt = llm.prompt(0);
    assert!(prompt[0].content.contains("data_table"));
    assert!(prompt[0].content.contains("Worldwide gross"));
}

#[tokio::test]
async fn test_analysis_rejects_write_statement() {
    let server = films_server().await;
    let table = RetrievalWorker::new(&RetrievalConfig::default())
        .fetch_table(&format!("{}/wiki/films", server.uri()))
        .await
        .unwrap();

    let llm = ScriptedLLM::new(["DROP TABLE data_table"]);
    let worker = AnalysisWorker::new(llm, &AnalysisConfig::default());
    let result = worker.answer(&table, "Delete everything").await;
    assert!(matches!(result, Err(CapabilityError::QueryError(_))));
}

#[tokio::test]
async fn test_request_end_to_end() {
    let server = films_server().await;
    let url = format!("{}/wiki/films", server.uri());

    let plan = json!({
        "tasks": [
            {
                "agent": "SearchAndScrapeAgent",
                "goal": "Fetch the data table of highest grossing films.",
                "url": url
            },
            {
                "agent": "DataAnalysisAgent",
                "goal": "How many films grossed more than $2 billion before 2020?"
            },
            {
                "agent": "VisualizationAgent",
                "goal": "Plot Rank vs. Worldwide gross",
                "params": {
                    "plot_type": "scatter",
                    "x_column": "Rank",
                    "y_column": "Worldwide gross",
                    "regression_line": true
                }
            }
        ]
    });

    let llm = ScriptedLLM::new([plan.to_string(), COUNT_SQL.to_string()]);
    let provider: Arc<dyn LLMProvider> = Arc::<ScriptedLLM>::clone(&llm);
    let registry = default_registry(Arc::clone(&provider), &WorkersConfig::default()).unwrap();
    let orchestrator = Orchestrator::new(provider, Arc::new(registry));

    let result = orchestrator
        .handle_request("Scrape the list of highest grossing films and answer...")
        .await
        .unwrap();

    // Retrieval output stays internal
    assert_eq!(result.len(), 2);
    let json = result.to_json();
    assert_eq!(json[0], json!(5));
    assert!(json[1]
        .as_str()
        .unwrap()
        .starts_with("data:image/svg+xml;base64,"));
    assert_eq!(llm.calls(), 2);
}

#[tokio::test]
async fn test_failed_retrieval_aborts_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let plan = json!({
        "tasks": [
            {"agent": "SearchAndScrapeAgent", "goal": "Fetch", "url": format!("{}/down", server.uri())},
            {"agent": "DataAnalysisAgent", "goal": "Count the rows"}
        ]
    });

    let llm = ScriptedLLM::new([plan.to_string()]);
    let provider: Arc<dyn LLMProvider> = Arc::<ScriptedLLM>::clone(&llm);
    let registry = default_registry(Arc::clone(&provider), &WorkersConfig::default()).unwrap();
    let orchestrator = Orchestrator::new(provider, Arc::new(registry));

    match orchestrator.handle_request("fetch and count").await {
        Err(EngineError::StepFailed { step, agent, .. }) => {
            assert_eq!(step, 0);
            assert_eq!(agent, "SearchAndScrapeAgent");
        }
        other => panic!("expected StepFailed, got {:?}", other),
    }
    // Analysis never asked for SQL
    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn test_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(FILMS_PAGE)
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let plan = json!({
        "tasks": [
            {"agent": "SearchAndScrapeAgent", "goal": "Fetch", "url": format!("{}/slow", server.uri())}
        ]
    });

    let llm = ScriptedLLM::new([plan.to_string()]);
    let provider: Arc<dyn LLMProvider> = Arc::<ScriptedLLM>::clone(&llm);
    let registry = default_registry(Arc::clone(&provider), &WorkersConfig::default()).unwrap();
    let orchestrator = Orchestrator::new(provider, Arc::new(registry))
        .with_request_timeout(Duration::from_secs(1));

    let err = orchestrator.handle_request("fetch slowly").await.unwrap_err();
    assert!(matches!(err, EngineError::RequestTimeout(1)));
}
