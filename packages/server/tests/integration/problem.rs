use crate::common::{TestApp, routes};

mod problem_library {
    use super::*;

    #[tokio::test]
    async fn lists_all_problems_ordered_by_id() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::PROBLEMS).await;

        assert_eq!(res.status, 200, "list failed: {}", res.text);
        assert_eq!(res.body["total"], 6);
        let ids: Vec<&str> = res.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_str().unwrap())
            .collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        assert!(ids.contains(&"two-sum"));
    }

    #[tokio::test]
    async fn summary_carries_reference_complexity() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::PROBLEMS).await;

        let two_sum = res.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .find(|p| p["id"] == "two-sum")
            .expect("two-sum should be listed")
            .clone();
        assert_eq!(two_sum["title"], "Two Sum");
        assert_eq!(two_sum["difficulty"], "Easy");
        assert_eq!(two_sum["time_complexity"], "O(n)");
        assert_eq!(two_sum["space_complexity"], "O(n)");
    }

    #[tokio::test]
    async fn filters_by_difficulty() {
        let app = TestApp::spawn().await;

        let res = app.get(&format!("{}?difficulty=Easy", routes::PROBLEMS)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["total"], 3);
        for problem in res.body["data"].as_array().unwrap() {
            assert_eq!(problem["difficulty"], "Easy");
        }
    }

    #[tokio::test]
    async fn filters_by_category_case_insensitively() {
        let app = TestApp::spawn().await;

        let res = app
            .get(&format!("{}?category=linked%20list", routes::PROBLEMS))
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["total"], 2);
    }

    #[tokio::test]
    async fn category_all_disables_the_filter() {
        let app = TestApp::spawn().await;

        let res = app.get(&format!("{}?category=all", routes::PROBLEMS)).await;

        assert_eq!(res.body["total"], 6);
    }

    #[tokio::test]
    async fn searches_titles() {
        let app = TestApp::spawn().await;

        let res = app.get(&format!("{}?search=PALINDROM", routes::PROBLEMS)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["total"], 1);
        assert_eq!(res.body["data"][0]["id"], "longest-palindromic-substring");
    }

    #[tokio::test]
    async fn unknown_difficulty_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get(&format!("{}?difficulty=Trivial", routes::PROBLEMS)).await;

        assert_eq!(res.status, 400);
    }
}

mod problem_detail {
    use super::*;

    #[tokio::test]
    async fn shows_visible_cases_and_counts_hidden_ones() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::problem("two-sum")).await;

        assert_eq!(res.status, 200, "get failed: {}", res.text);
        assert_eq!(res.body["id"], "two-sum");
        assert_eq!(res.body["hidden_test_case_count"], 2);
        let samples = res.body["sample_test_cases"].as_array().unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0]["id"], "two-sum-1");
        assert_eq!(samples[0]["expected_output"], "[0,1]");
        assert!(!res.text.contains("two-sum-3"));
        assert!(!res.body["examples"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_problem_returns_404() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::problem("no-such-problem")).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod problem_languages {
    use super::*;

    #[tokio::test]
    async fn lists_languages_supported_by_problem_and_sandbox() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::problem_languages("two-sum")).await;

        assert_eq!(res.status, 200, "languages failed: {}", res.text);
        assert_eq!(res.body["problem_id"], "two-sum");
        assert_eq!(
            res.body["languages"],
            serde_json::json!(["cpp", "java", "javascript", "python"])
        );
    }

    #[tokio::test]
    async fn unknown_problem_returns_404() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::problem_languages("missing")).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}
