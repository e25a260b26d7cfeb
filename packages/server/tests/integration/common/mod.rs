use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use common::{Catalog, EngineConfig, SandboxConfig};
use server::catalog::InMemoryCatalog;
use server::config::{AppConfig, CatalogConfig, CorsConfig, ServerConfig};
use server::engine::Engine;
use server::state::AppState;
use worker::{ExecutionLimits, ExecutionPhase, RawExecution, SandboxError, SandboxRunner};

pub mod routes {
    pub const PROBLEMS: &str = "/api/v1/problems";

    pub fn problem(id: &str) -> String {
        format!("/api/v1/problems/{id}")
    }

    pub fn problem_languages(id: &str) -> String {
        format!("/api/v1/problems/{id}/languages")
    }

    pub fn problem_submissions(id: &str) -> String {
        format!("/api/v1/problems/{id}/submissions")
    }

    pub fn submission(id: &str) -> String {
        format!("/api/v1/submissions/{id}")
    }

    pub fn submission_wait(id: &str, wait_ms: u64) -> String {
        format!("/api/v1/submissions/{id}?wait_ms={wait_ms}")
    }

    pub fn submission_cancel(id: &str) -> String {
        format!("/api/v1/submissions/{id}/cancel")
    }
}

/// Source directives understood by [`ScriptedSandbox`].
pub mod directives {
    pub const COMPILE_ERROR: &str = "#!compile_error";
    pub const HANG: &str = "#!hang";
    pub const STUBBORN: &str = "#!stubborn";
    pub const CRASH: &str = "#!crash";
    pub const WRONG: &str = "#!wrong";
    pub const SLOW: &str = "#!slow";
}

/// Stand-in for a real toolchain. Answers every seeded test input with its
/// expected output unless the source carries a directive.
pub struct ScriptedSandbox {
    answers: HashMap<String, String>,
}

impl ScriptedSandbox {
    pub fn new() -> Arc<Self> {
        let answers = server::seed::problems()
            .into_iter()
            .flat_map(|p| p.test_cases)
            .map(|tc| (tc.input, tc.expected_output))
            .collect();
        Arc::new(Self { answers })
    }
}

#[async_trait]
impl SandboxRunner for ScriptedSandbox {
    async fn run(
        &self,
        language: &str,
        source: &str,
        input: &str,
        limits: &ExecutionLimits,
        cancel: &CancellationToken,
    ) -> Result<RawExecution, SandboxError> {
        if source.contains(directives::COMPILE_ERROR) && self.requires_compile(language) {
            let mut raw = RawExecution::new(ExecutionPhase::Compile);
            raw.exit_code = Some(1);
            raw.stderr = "main.cpp:3:5: error: expected ';' before 'return'\n".into();
            return Ok(raw);
        }

        let mut raw = RawExecution::new(ExecutionPhase::Run);
        if source.contains(directives::STUBBORN) {
            tokio::time::sleep(Duration::from_secs(30)).await;
            raw.timed_out = true;
            return Ok(raw);
        }
        if source.contains(directives::HANG) {
            tokio::select! {
                _ = cancel.cancelled() => return Err(SandboxError::Cancelled),
                _ = tokio::time::sleep(limits.timeout) => {
                    raw.timed_out = true;
                    raw.elapsed_ms = limits.timeout.as_millis() as u64;
                    return Ok(raw);
                }
            }
        }
        if source.contains(directives::SLOW) {
            tokio::select! {
                _ = cancel.cancelled() => return Err(SandboxError::Cancelled),
                _ = tokio::time::sleep(Duration::from_millis(150)) => {}
            }
        }
        if source.contains(directives::CRASH) {
            raw.signal = Some(11);
            raw.stderr = "Segmentation fault\n".into();
            return Ok(raw);
        }

        raw.exit_code = Some(0);
        raw.elapsed_ms = 3;
        raw.peak_memory_kb = 4096;
        raw.stdout = if source.contains(directives::WRONG) {
            "[1,2]\n".into()
        } else {
            format!("{}\n", self.answers.get(input).map(String::as_str).unwrap_or(""))
        };
        Ok(raw)
    }

    fn supports_language(&self, language: &str) -> bool {
        matches!(language, "cpp" | "java" | "javascript" | "python")
    }

    fn requires_compile(&self, language: &str) -> bool {
        matches!(language, "cpp" | "java")
    }
}

/// Engine over the built-in catalog and a [`ScriptedSandbox`].
pub fn start_engine(config: EngineConfig) -> (Engine, Arc<dyn Catalog>) {
    let catalog: Arc<dyn Catalog> = Arc::new(InMemoryCatalog::seeded());
    let engine = Engine::start(config, catalog.clone(), ScriptedSandbox::new());
    (engine, catalog)
}

/// A running test server.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub engine: Engine,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
    pub retry_after: Option<String>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(EngineConfig::default()).await
    }

    pub async fn spawn_with(engine_config: EngineConfig) -> Self {
        let (engine, catalog) = start_engine(engine_config.clone());

        let app_config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
                max_wait_ms: 10_000,
            },
            engine: engine_config,
            sandbox: SandboxConfig::default(),
            catalog: CatalogConfig::default(),
            languages: vec![],
        };

        let state = AppState {
            engine: engine.clone(),
            catalog,
            config: app_config,
        };

        let app = server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            engine,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn post(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_raw(&self, path: &str, body: &'static str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    /// Submit a solution and return the submission `id`.
    pub async fn submit(&self, problem_id: &str, language: &str, source_code: &str) -> String {
        let res = self
            .post(
                &routes::problem_submissions(problem_id),
                &serde_json::json!({
                    "language": language,
                    "source_code": source_code,
                }),
            )
            .await;
        assert_eq!(res.status, 202, "submit failed: {}", res.text);
        res.id()
    }

    /// Long-poll a submission until it is terminal.
    pub async fn wait_terminal(&self, id: &str) -> TestResponse {
        let res = self.get(&routes::submission_wait(id, 5_000)).await;
        assert_eq!(res.status, 200, "poll failed: {}", res.text);
        let state = res.body["state"].as_str().unwrap_or_default();
        assert!(
            !matches!(state, "Queued" | "Running"),
            "submission {id} still {state}: {}",
            res.text
        );
        res
    }

    /// Poll until the submission reports `state`.
    pub async fn wait_for_state(&self, id: &str, state: &str) {
        for _ in 0..100 {
            let res = self.get(&routes::submission(id)).await;
            if res.body["state"] == state {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("submission {id} never reached {state}");
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let retry_after = res
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self {
            status,
            text,
            body,
            retry_after,
        }
    }

    pub fn id(&self) -> String {
        self.body["id"]
            .as_str()
            .expect("response body should contain 'id'")
            .to_string()
    }
}

/// Python two-sum with a dictionary lookup and a guard clause.
pub const TWO_SUM_PYTHON: &str = r#"import json

# Single pass: remember each value's index, look up the complement.
def two_sum(nums, target):
    if not nums:
        return []
    seen = {}
    for index, value in enumerate(nums):
        complement = target - value
        if complement in seen:
            return [seen[complement], index]
        seen[value] = index
    return []

nums = json.loads(input())
target = int(input())
print(json.dumps(two_sum(nums, target)).replace(" ", ""))
"#;
