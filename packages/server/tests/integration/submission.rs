use common::EngineConfig;
use serde_json::json;

use crate::common::{TWO_SUM_PYTHON, TestApp, directives, routes};

fn with_directive(directive: &str) -> String {
    format!("{directive}\n{TWO_SUM_PYTHON}")
}

mod submission_creation {
    use super::*;

    #[tokio::test]
    async fn accepted_submission_starts_queued() {
        let app = TestApp::spawn().await;

        let res = app
            .post(
                &routes::problem_submissions("two-sum"),
                &json!({"language": "python", "source_code": TWO_SUM_PYTHON}),
            )
            .await;

        assert_eq!(res.status, 202, "submit failed: {}", res.text);
        assert_eq!(res.body["state"], "Queued");
        assert!(res.body["id"].as_str().is_some());
    }

    #[tokio::test]
    async fn unsupported_language_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .post(
                &routes::problem_submissions("two-sum"),
                &json!({"language": "cobol", "source_code": "DISPLAY 'HI'."}),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "INVALID_SUBMISSION");
    }

    #[tokio::test]
    async fn blank_source_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .post(
                &routes::problem_submissions("two-sum"),
                &json!({"language": "python", "source_code": "   \n\t"}),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "INVALID_SUBMISSION");
    }

    #[tokio::test]
    async fn oversized_source_is_rejected() {
        let app = TestApp::spawn_with(EngineConfig {
            max_source_bytes: 64,
            ..Default::default()
        })
        .await;

        let res = app
            .post(
                &routes::problem_submissions("two-sum"),
                &json!({"language": "python", "source_code": TWO_SUM_PYTHON}),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "INVALID_SUBMISSION");
    }

    #[tokio::test]
    async fn unknown_problem_returns_404() {
        let app = TestApp::spawn().await;

        let res = app
            .post(
                &routes::problem_submissions("missing"),
                &json!({"language": "python", "source_code": TWO_SUM_PYTHON}),
            )
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn malformed_json_is_a_validation_error() {
        let app = TestApp::spawn().await;

        let res = app
            .post_raw(&routes::problem_submissions("two-sum"), "{\"language\": ")
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn pass_rate_above_100_is_a_validation_error() {
        let app = TestApp::spawn().await;

        let res = app
            .post(
                &routes::problem_submissions("two-sum"),
                &json!({
                    "language": "python",
                    "source_code": TWO_SUM_PYTHON,
                    "historical_pass_rate": 150,
                }),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn full_queue_returns_503_with_retry_after() {
        let app = TestApp::spawn_with(EngineConfig {
            queue_capacity: 0,
            ..Default::default()
        })
        .await;

        let res = app
            .post(
                &routes::problem_submissions("two-sum"),
                &json!({"language": "python", "source_code": TWO_SUM_PYTHON}),
            )
            .await;

        assert_eq!(res.status, 503);
        assert_eq!(res.body["code"], "CAPACITY_EXCEEDED");
        assert_eq!(res.retry_after.as_deref(), Some("5"));
    }
}

mod submission_evaluation {
    use super::*;

    #[tokio::test]
    async fn correct_solution_completes_with_report_and_assessment() {
        let app = TestApp::spawn().await;
        let id = app.submit("two-sum", "python", TWO_SUM_PYTHON).await;

        let res = app.wait_terminal(&id).await;

        assert_eq!(res.body["state"], "Completed", "{}", res.text);
        assert!(res.body["started_at"].is_string());
        assert!(res.body["finished_at"].is_string());
        let report = &res.body["report"];
        assert_eq!(report["status"], "Completed");
        assert_eq!(report["passed_count"], 4);
        assert_eq!(report["total_count"], 4);
        assert_eq!(report["aggregate_timed_out"], false);

        let assessment = &res.body["assessment"];
        assert!(assessment["score"].as_u64().unwrap() >= 80, "{}", res.text);
        assert_eq!(assessment["overall_rating"], "Strong Solution");
        assert_eq!(assessment["estimated_time_complexity"], "O(n)");
        let strengths = assessment["strengths"].as_array().unwrap();
        assert_eq!(strengths[0], "All test cases pass");
    }

    #[tokio::test]
    async fn case_results_follow_declared_order() {
        let app = TestApp::spawn().await;
        let id = app.submit("two-sum", "python", TWO_SUM_PYTHON).await;

        let res = app.wait_terminal(&id).await;

        let ids: Vec<&str> = res.body["report"]["case_results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["test_case_id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, ["two-sum-1", "two-sum-2", "two-sum-3", "two-sum-4"]);
    }

    #[tokio::test]
    async fn wrong_answer_shows_visible_output_and_redacts_hidden() {
        let app = TestApp::spawn().await;
        let id = app
            .submit("two-sum", "python", &with_directive(directives::WRONG))
            .await;

        let res = app.wait_terminal(&id).await;

        assert_eq!(res.body["state"], "Completed");
        let report = &res.body["report"];
        assert_eq!(report["passed_count"], 1);
        assert_eq!(report["worst_outcome"], "WrongAnswer");

        let cases = report["case_results"].as_array().unwrap();
        let visible = &cases[0];
        assert_eq!(visible["hidden"], false);
        assert_eq!(visible["outcome"], "WrongAnswer");
        assert_eq!(visible["actual_output"], "[1,2]");
        assert_eq!(visible["expected_output"], "[0,1]");
        assert_eq!(cases[1]["outcome"], "Pass");

        let hidden = &cases[2];
        assert_eq!(hidden["hidden"], true);
        assert!(hidden["input"].is_null());
        assert!(hidden["expected_output"].is_null());
        assert!(hidden["actual_output"].is_null());

        let improvements = res.body["assessment"]["improvements"].as_array().unwrap();
        assert_eq!(improvements[0], "Fix failing test cases (3 of 4 failed)");
    }

    #[tokio::test]
    async fn runtime_crash_is_reported_per_case() {
        let app = TestApp::spawn().await;
        let id = app
            .submit("two-sum", "python", &with_directive(directives::CRASH))
            .await;

        let res = app.wait_terminal(&id).await;

        assert_eq!(res.body["state"], "Completed");
        assert_eq!(res.body["report"]["worst_outcome"], "RuntimeError");
        assert_eq!(
            res.body["report"]["case_results"][0]["stderr"],
            "Segmentation fault\n"
        );
    }

    #[tokio::test]
    async fn compile_error_carries_diagnostics_and_no_cases() {
        let app = TestApp::spawn().await;
        let id = app
            .submit(
                "two-sum",
                "cpp",
                &format!("{}\nint main() {{ return 0 }}\n", directives::COMPILE_ERROR),
            )
            .await;

        let res = app.wait_terminal(&id).await;

        assert_eq!(res.body["state"], "CompileError", "{}", res.text);
        let report = &res.body["report"];
        assert_eq!(report["status"], "CompileError");
        assert_eq!(report["total_count"], 0);
        assert!(
            report["compile_output"]
                .as_str()
                .unwrap()
                .contains("expected ';'")
        );
        assert!(res.body["assessment"].is_null());
    }

    #[tokio::test]
    async fn exceeding_the_case_timeout_yields_timeout_outcomes() {
        let app = TestApp::spawn_with(EngineConfig {
            case_timeout_ms: 50,
            ..Default::default()
        })
        .await;
        let id = app
            .submit("two-sum", "python", &with_directive(directives::HANG))
            .await;

        let res = app.wait_terminal(&id).await;

        assert_eq!(res.body["state"], "Completed");
        assert_eq!(res.body["report"]["worst_outcome"], "Timeout");
        assert_eq!(res.body["report"]["passed_count"], 0);
    }

    #[tokio::test]
    async fn historical_pass_rate_feeds_readiness() {
        let app = TestApp::spawn().await;
        let res = app
            .post(
                &routes::problem_submissions("two-sum"),
                &json!({
                    "language": "python",
                    "source_code": with_directive(directives::WRONG),
                    "historical_pass_rate": 100,
                }),
            )
            .await;
        assert_eq!(res.status, 202, "{}", res.text);

        let res = app.wait_terminal(&res.id()).await;

        let assessment = &res.body["assessment"];
        let score = assessment["score"].as_u64().unwrap();
        let readiness = assessment["interview_readiness"].as_u64().unwrap();
        assert!(readiness > score, "{}", res.text);
    }
}

mod submission_status {
    use super::*;

    #[tokio::test]
    async fn unknown_submission_returns_404() {
        let app = TestApp::spawn().await;

        let res = app
            .get(&routes::submission("0190b6c4-0000-7000-8000-000000000000"))
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn malformed_id_returns_400() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::submission("not-a-uuid")).await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn status_without_wait_returns_immediately() {
        let app = TestApp::spawn_with(EngineConfig {
            pool_size: 1,
            ..Default::default()
        })
        .await;
        let blocker = app
            .submit("two-sum", "python", &with_directive(directives::HANG))
            .await;
        app.wait_for_state(&blocker, "Running").await;
        let id = app.submit("two-sum", "python", TWO_SUM_PYTHON).await;

        let res = app.get(&routes::submission(&id)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["state"], "Queued");
        assert!(res.body["report"].is_null());
    }
}

mod submission_cancellation {
    use super::*;

    #[tokio::test]
    async fn cancelling_a_queued_submission_withdraws_it() {
        let app = TestApp::spawn_with(EngineConfig {
            pool_size: 1,
            ..Default::default()
        })
        .await;
        let blocker = app
            .submit("two-sum", "python", &with_directive(directives::HANG))
            .await;
        app.wait_for_state(&blocker, "Running").await;
        let id = app.submit("two-sum", "python", TWO_SUM_PYTHON).await;

        let res = app.post(&routes::submission_cancel(&id), &json!({})).await;

        assert_eq!(res.status, 200, "cancel failed: {}", res.text);
        assert_eq!(res.body["outcome"], "Cancelled");
        assert_eq!(res.body["state"], "Cancelled");

        let res = app.get(&routes::submission(&id)).await;
        assert_eq!(res.body["state"], "Cancelled");
        assert!(res.body["report"].is_null());
        assert!(res.body["started_at"].is_null());
    }

    #[tokio::test]
    async fn cancelling_a_running_submission_stops_it() {
        let app = TestApp::spawn().await;
        let id = app
            .submit("two-sum", "python", &with_directive(directives::HANG))
            .await;
        app.wait_for_state(&id, "Running").await;

        let res = app.post(&routes::submission_cancel(&id), &json!({})).await;

        assert_eq!(res.status, 200, "cancel failed: {}", res.text);
        assert_eq!(res.body["outcome"], "Cancelled");
        assert_eq!(res.body["state"], "Cancelled");
    }

    #[tokio::test]
    async fn cancelling_a_finished_submission_changes_nothing() {
        let app = TestApp::spawn().await;
        let id = app.submit("two-sum", "python", TWO_SUM_PYTHON).await;
        app.wait_terminal(&id).await;

        let res = app.post(&routes::submission_cancel(&id), &json!({})).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["outcome"], "AlreadyTerminal");
        assert_eq!(res.body["state"], "Completed");
    }

    #[tokio::test]
    async fn sandbox_ignoring_cancel_is_force_failed() {
        let app = TestApp::spawn_with(EngineConfig {
            teardown_timeout_ms: 50,
            ..Default::default()
        })
        .await;
        let id = app
            .submit("two-sum", "python", &with_directive(directives::STUBBORN))
            .await;
        app.wait_for_state(&id, "Running").await;

        let res = app.post(&routes::submission_cancel(&id), &json!({})).await;

        assert_eq!(res.status, 200, "cancel failed: {}", res.text);
        assert_eq!(res.body["outcome"], "ForceFailed");
        assert_eq!(res.body["state"], "InternalError");
    }

    #[tokio::test]
    async fn unknown_submission_returns_404() {
        let app = TestApp::spawn().await;

        let res = app
            .post(
                &routes::submission_cancel("0190b6c4-0000-7000-8000-000000000000"),
                &json!({}),
            )
            .await;

        assert_eq!(res.status, 404);
    }
}
