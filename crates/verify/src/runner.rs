//! Scenario Test Runner
//!
//! Runs a `TestSuite` against a live service. Steps run in order and never
//! abort early; saved data is shared across every scenario in one run.

use std::time::Duration;

use project_translator_core::CoreResult;

use crate::models::{ScenarioResult, SuiteResult, TestScenario, TestSuite};
use crate::placeholders::SavedData;
use crate::request_executor::RequestExecutor;

pub struct ScenarioRunner {
    executor: RequestExecutor,
    saved: SavedData,
}

impl ScenarioRunner {
    pub fn new(base_url: &str, request_timeout: Duration) -> CoreResult<Self> {
        Ok(Self {
            executor: RequestExecutor::new(base_url, request_timeout)?,
            saved: SavedData::new(),
        })
    }

    /// Values captured so far in this run.
    pub fn saved(&self) -> &SavedData {
        &self.saved
    }

    /// Run every scenario in `suite`, in file order.
    pub async fn run_suite(&mut self, suite: &TestSuite) -> SuiteResult {
        tracing::info!(
            suite = %suite.name,
            scenarios = suite.scenarios.len(),
            base_url = %self.executor.base_url(),
            "running test suite"
        );

        let mut results = Vec::with_capacity(suite.scenarios.len());
        for scenario in &suite.scenarios {
            results.push(self.run_scenario(scenario).await);
        }

        let result = SuiteResult::from_scenarios(&suite.name, results);
        tracing::info!(
            suite = %suite.name,
            passed = result.passed_scenarios,
            total = result.total_scenarios,
            "test suite finished"
        );
        result
    }

    /// Run one scenario; every step runs even after a failure.
    pub async fn run_scenario(&mut self, scenario: &TestScenario) -> ScenarioResult {
        let mut steps = Vec::with_capacity(scenario.steps.len());
        for (index, step) in scenario.steps.iter().enumerate() {
            let result = self.executor.execute(step, index + 1, &mut self.saved).await;
            if !result.success {
                tracing::warn!(
                    scenario = %scenario.name,
                    step = %step.name,
                    errors = ?result.validation_errors,
                    error = ?result.error,
                    "step failed"
                );
            }
            steps.push(result);
        }

        let result = ScenarioResult::new(scenario, steps);
        tracing::info!(
            scenario = %scenario.name,
            passed = result.passed_steps,
            total = result.total_steps,
            success = result.success,
            "scenario finished"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    type Store = Arc<Mutex<HashMap<u64, Value>>>;

    async fn create(State(store): State<Store>, Json(mut body): Json<Value>) -> (StatusCode, Json<Value>) {
        let mut items = store.lock().unwrap();
        let id = items.len() as u64 + 1;
        body["id"] = json!(id);
        items.insert(id, body.clone());
        (StatusCode::CREATED, Json(body))
    }

    async fn list(State(store): State<Store>) -> Json<Value> {
        let items = store.lock().unwrap();
        let mut all: Vec<_> = items.values().cloned().collect();
        all.sort_by_key(|v| v["id"].as_u64());
        Json(Value::Array(all))
    }

    async fn fetch(State(store): State<Store>, Path(id): Path<u64>) -> Result<Json<Value>, StatusCode> {
        store
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .map(Json)
            .ok_or(StatusCode::NOT_FOUND)
    }

    async fn remove(State(store): State<Store>, Path(id): Path<u64>) -> StatusCode {
        match store.lock().unwrap().remove(&id) {
            Some(_) => StatusCode::NO_CONTENT,
            None => StatusCode::NOT_FOUND,
        }
    }

    async fn serve() -> String {
        serve_with_create_status(StatusCode::CREATED).await
    }

    async fn serve_with_create_status(status: StatusCode) -> String {
        let store: Store = Arc::default();
        let create_with_status = move |state: State<Store>, body: Json<Value>| async move {
            let (_, created) = create(state, body).await;
            (status, created)
        };
        let app = Router::new()
            .route("/items", get(list).post(create_with_status))
            .route("/items/{id}", get(fetch).delete(remove))
            .with_state(store);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn suite(base_url: &str, scenarios: Value) -> TestSuite {
        TestSuite::from_json_str(
            &json!({"test_suite": "items", "base_url": base_url, "scenarios": scenarios}).to_string(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_crud_scenario_with_saved_id() {
        let base = serve().await;
        let suite = suite(
            &base,
            json!([{
                "name": "crud",
                "steps": [
                    {"name": "create", "method": "POST", "endpoint": "/items",
                     "body": {"name": "widget"}, "expected_status": 201,
                     "save_response_field": "item_id"},
                    {"name": "fetch", "endpoint": "/items/{saved_item_id}",
                     "expected_response": {"name": "widget"}},
                    {"name": "list", "endpoint": "/items", "expected_items": 1},
                    {"name": "delete", "method": "DELETE", "endpoint": "/items/{saved_item_id}",
                     "expected_status": 204},
                    {"name": "gone", "endpoint": "/items/{saved_item_id}", "expected_status": 404}
                ]
            }]),
        );

        let mut runner = ScenarioRunner::new(&suite.base_url, Duration::from_secs(5)).unwrap();
        let result = runner.run_suite(&suite).await;

        assert!(result.success, "{:#?}", result);
        assert_eq!(result.passed_scenarios, 1);
        assert_eq!(runner.saved().get("item_id"), Some(&json!(1)));
        let steps = &result.scenario_results[0].step_results;
        assert_eq!(steps[0].saved_field.as_deref(), Some("item_id"));
        assert_eq!(steps[4].status_code, Some(404));
    }

    #[tokio::test]
    async fn test_minimal_crud_suite_passes() {
        let base = serve_with_create_status(StatusCode::OK).await;
        let suite = TestSuite::from_json_str(
            r#"{"scenarios":[{"name":"crud","steps":[{"name":"create","method":"POST","endpoint":"/items","body":{"name":"x"},"expected_status":200,"save_response_field":"item1"},{"name":"get","method":"GET","endpoint":"/items/{saved_item1}","expected_status":200,"expected_response_contains":["name"]}]}]}"#,
        )
        .unwrap();
        assert_eq!(suite.base_url, "http://localhost:8000");

        let mut runner = ScenarioRunner::new(&base, Duration::from_secs(5)).unwrap();
        let result = runner.run_suite(&suite).await;

        assert!(result.success, "{:#?}", result);
        assert_eq!(result.passed_scenarios, 1);
        assert_eq!(runner.saved().get("item1"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn test_failed_step_does_not_abort_scenario() {
        let base = serve().await;
        let suite = suite(
            &base,
            json!([{
                "name": "mismatch",
                "steps": [
                    {"name": "missing", "endpoint": "/items/42"},
                    {"name": "list", "endpoint": "/items", "expected_response_type": "array"}
                ]
            }]),
        );

        let mut runner = ScenarioRunner::new(&suite.base_url, Duration::from_secs(5)).unwrap();
        let result = runner.run_suite(&suite).await;

        assert!(!result.success);
        let scenario = &result.scenario_results[0];
        assert_eq!(scenario.total_steps, 2);
        assert_eq!(scenario.passed_steps, 1);
        assert_eq!(
            scenario.step_results[0].validation_errors[0],
            "Status code mismatch: expected 200, got 404"
        );
        assert!(scenario.step_results[1].success);
    }

    #[tokio::test]
    async fn test_saved_data_spans_scenarios() {
        let base = serve().await;
        let suite = suite(
            &base,
            json!([
                {"name": "setup", "steps": [
                    {"name": "create", "method": "POST", "endpoint": "/items",
                     "body": {"name": "a"}, "expected_status": 201,
                     "save_response_field": "first"}
                ]},
                {"name": "read", "steps": [
                    {"name": "fetch", "endpoint": "/items/{saved_first}",
                     "expected_response_contains": ["id", "name"]}
                ]}
            ]),
        );

        let mut runner = ScenarioRunner::new(&suite.base_url, Duration::from_secs(5)).unwrap();
        let result = runner.run_suite(&suite).await;
        assert!(result.success, "{:#?}", result);
        assert_eq!(result.passed_scenarios, 2);
    }

    #[tokio::test]
    async fn test_unresolved_placeholder_stays_literal() {
        let base = serve().await;
        let suite = suite(
            &base,
            json!([{"name": "literal", "steps": [
                {"name": "fetch", "endpoint": "/items/{saved_nothing}", "expected_status": 400}
            ]}]),
        );

        let mut runner = ScenarioRunner::new(&suite.base_url, Duration::from_secs(5)).unwrap();
        let result = runner.run_suite(&suite).await;
        let step = &result.scenario_results[0].step_results[0];
        // axum rejects the non-numeric path segment
        assert_eq!(step.status_code, Some(400));
        assert!(step.success);
    }
}
