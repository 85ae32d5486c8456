#![cfg(feature = "web")]
//! REST handler integration tests: trades, journal, metrics and export.

mod common;

use approx::assert_relative_eq;
use axum::http::{Method, StatusCode, header};
use serde_json::json;
use std::sync::Arc;
use tradejournal::ports::store_port::JournalStore;

use common::*;

mod trade_tests {
    use super::*;

    #[tokio::test]
    async fn create_computes_profit_loss_server_side() {
        let (app, _) = create_app();
        let cookie = register(&app, "trader", "pw").await;

        let mut body = trade_json("aapl", "long", 190.25, 193.45, 100.0, "2025-03-20");
        body["fees"] = json!(2.0);
        // Client-supplied values are ignored.
        body["profitLoss"] = json!(99999.0);
        body["status"] = json!("loss");

        let trade = create_trade(&app, &cookie, body).await;
        assert_eq!(trade["id"], 1);
        assert_eq!(trade["symbol"], "AAPL");
        assert_eq!(trade["tradeType"], "long");
        assert_relative_eq!(trade["profitLoss"].as_f64().unwrap(), 318.0, epsilon = 1e-9);
        assert_eq!(trade["status"], "win");
    }

    #[tokio::test]
    async fn short_trade_profit() {
        let (app, _) = create_app();
        let cookie = register(&app, "trader", "pw").await;
        let trade = create_trade(
            &app,
            &cookie,
            trade_json("MSFT", "short", 420.75, 417.25, 50.0, "2025-03-21"),
        )
        .await;
        assert_relative_eq!(trade["profitLoss"].as_f64().unwrap(), 175.0, epsilon = 1e-9);
    }

    #[tokio::test]
    async fn invalid_trade_is_400() {
        let (app, _) = create_app();
        let cookie = register(&app, "trader", "pw").await;
        let response = send(
            &app,
            json_request(
                Method::POST,
                "/api/trades",
                Some(&cookie),
                Some(trade_json("TSLA", "long", 100.0, 101.0, 0.0, "2025-03-20")),
            ),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert!(response.message().contains("position"), "{}", response.message());
    }

    #[tokio::test]
    async fn overflowing_profit_loss_is_400() {
        let (app, store) = create_app();
        let cookie = register(&app, "trader", "pw").await;
        for direction in ["long", "short"] {
            let response = send(
                &app,
                json_request(
                    Method::POST,
                    "/api/trades",
                    Some(&cookie),
                    Some(trade_json("AAPL", direction, 1e-300, 1e300, 1e300, "2025-03-20")),
                ),
            )
            .await;
            assert_eq!(response.status, StatusCode::BAD_REQUEST, "{direction}");
            assert_eq!(response.message(), "invalid profitLoss: out of range");
        }
        assert!(store.list_trades(1).unwrap().is_empty());

        let metrics = send(&app, json_request(Method::GET, "/api/metrics", Some(&cookie), None)).await;
        assert_eq!(metrics.json()["totalProfitLoss"], 0.0);
    }

    #[tokio::test]
    async fn get_update_delete_round() {
        let (app, _) = create_app();
        let cookie = register(&app, "trader", "pw").await;
        let trade = create_trade(
            &app,
            &cookie,
            trade_json("TSLA", "long", 275.5, 272.3, 20.0, "2025-03-22"),
        )
        .await;
        assert_eq!(trade["status"], "loss");

        let fetched = send(&app, json_request(Method::GET, "/api/trades/1", Some(&cookie), None)).await;
        assert_eq!(fetched.status, StatusCode::OK);
        assert_eq!(fetched.json(), trade);

        let patched = send(
            &app,
            json_request(
                Method::PATCH,
                "/api/trades/1",
                Some(&cookie),
                Some(json!({ "exitPrice": 280.5, "notes": "Held through the dip" })),
            ),
        )
        .await;
        assert_eq!(patched.status, StatusCode::OK);
        let patched = patched.json();
        assert_relative_eq!(patched["profitLoss"].as_f64().unwrap(), 100.0, epsilon = 1e-9);
        assert_eq!(patched["status"], "win");
        assert_eq!(patched["notes"], "Held through the dip");
        assert_eq!(patched["symbol"], "TSLA");

        let put = send(
            &app,
            json_request(
                Method::PUT,
                "/api/trades/1",
                Some(&cookie),
                Some(json!({ "exitPrice": 275.5 })),
            ),
        )
        .await;
        assert_eq!(put.status, StatusCode::OK);
        assert_eq!(put.json()["status"], "breakeven");

        let deleted = send(&app, json_request(Method::DELETE, "/api/trades/1", Some(&cookie), None)).await;
        assert_eq!(deleted.status, StatusCode::NO_CONTENT);

        let gone = send(&app, json_request(Method::GET, "/api/trades/1", Some(&cookie), None)).await;
        assert_eq!(gone.status, StatusCode::NOT_FOUND);
        assert_eq!(gone.message(), "Trade not found");
    }

    #[tokio::test]
    async fn invalid_patch_leaves_trade_unchanged() {
        let (app, _) = create_app();
        let cookie = register(&app, "trader", "pw").await;
        let trade = create_trade(
            &app,
            &cookie,
            trade_json("TSLA", "long", 100.0, 110.0, 10.0, "2025-03-22"),
        )
        .await;

        let response = send(
            &app,
            json_request(
                Method::PATCH,
                "/api/trades/1",
                Some(&cookie),
                Some(json!({ "entryPrice": -5.0 })),
            ),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);

        let fetched = send(&app, json_request(Method::GET, "/api/trades/1", Some(&cookie), None)).await;
        assert_eq!(fetched.json(), trade);
    }

    #[tokio::test]
    async fn malformed_id_is_400() {
        let (app, _) = create_app();
        let cookie = register(&app, "trader", "pw").await;
        let response = send(&app, json_request(Method::GET, "/api/trades/abc", Some(&cookie), None)).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.message(), "Invalid trade ID");
    }

    #[tokio::test]
    async fn other_users_trade_is_403() {
        let (app, _) = create_app();
        let alice = register(&app, "alice", "pw").await;
        let bob = register(&app, "bob", "pw").await;
        create_trade(
            &app,
            &alice,
            trade_json("AAPL", "long", 100.0, 110.0, 1.0, "2025-03-20"),
        )
        .await;

        for method in [Method::GET, Method::DELETE] {
            let response = send(&app, json_request(method, "/api/trades/1", Some(&bob), None)).await;
            assert_eq!(response.status, StatusCode::FORBIDDEN);
            assert_eq!(response.message(), "Unauthorized access to this trade");
        }

        let patch = send(
            &app,
            json_request(
                Method::PATCH,
                "/api/trades/1",
                Some(&bob),
                Some(json!({ "notes": "mine now" })),
            ),
        )
        .await;
        assert_eq!(patch.status, StatusCode::FORBIDDEN);

        let bobs = send(&app, json_request(Method::GET, "/api/trades", Some(&bob), None)).await;
        assert_eq!(bobs.json(), json!([]));

        let alices = send(&app, json_request(Method::GET, "/api/trades", Some(&alice), None)).await;
        assert_eq!(alices.json().as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_is_newest_exit_first() {
        let (app, _) = create_app();
        let cookie = register(&app, "trader", "pw").await;
        for day in ["2025-03-18", "2025-03-22", "2025-03-20"] {
            create_trade(&app, &cookie, trade_json("SPY", "long", 500.0, 501.0, 1.0, day)).await;
        }

        let response = send(&app, json_request(Method::GET, "/api/trades", Some(&cookie), None)).await;
        let ids: Vec<i64> = response
            .json()
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn range_requires_both_dates() {
        let (app, _) = create_app();
        let cookie = register(&app, "trader", "pw").await;
        let response = send(
            &app,
            json_request(
                Method::GET,
                "/api/trades/range?startDate=2025-03-01",
                Some(&cookie),
                None,
            ),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.message(), "Start date and end date are required");
    }

    #[tokio::test]
    async fn range_filters_on_exit_date_inclusive_of_end_day() {
        let (app, _) = create_app();
        let cookie = register(&app, "trader", "pw").await;
        for day in ["2025-03-18", "2025-03-20", "2025-03-22"] {
            create_trade(&app, &cookie, trade_json("SPY", "long", 500.0, 501.0, 1.0, day)).await;
        }

        let response = send(
            &app,
            json_request(
                Method::GET,
                "/api/trades/range?startDate=2025-03-19&endDate=2025-03-22",
                Some(&cookie),
                None,
            ),
        )
        .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json().as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn range_with_bad_date_is_400() {
        let (app, _) = create_app();
        let cookie = register(&app, "trader", "pw").await;
        let response = send(
            &app,
            json_request(
                Method::GET,
                "/api/trades/range?startDate=yesterday&endDate=2025-03-22",
                Some(&cookie),
                None,
            ),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }
}

mod journal_tests {
    use super::*;

    #[tokio::test]
    async fn journal_crud() {
        let (app, _) = create_app();
        let cookie = register(&app, "trader", "pw").await;

        let created = send(
            &app,
            json_request(
                Method::POST,
                "/api/journal",
                Some(&cookie),
                Some(journal_json("Strong trading day", "2025-03-20")),
            ),
        )
        .await;
        assert_eq!(created.status, StatusCode::CREATED);
        let entry = created.json();
        assert_eq!(entry["mood"], "positive");
        assert_eq!(entry["userId"], 1);

        let updated = send(
            &app,
            json_request(
                Method::PUT,
                "/api/journal/1",
                Some(&cookie),
                Some(json!({ "title": "Lessons from today", "mood": "neutral" })),
            ),
        )
        .await;
        assert_eq!(updated.status, StatusCode::OK);
        assert_eq!(updated.json()["title"], "Lessons from today");
        assert_eq!(updated.json()["content"], "Followed the plan.");

        let listed = send(&app, json_request(Method::GET, "/api/journal", Some(&cookie), None)).await;
        assert_eq!(listed.json().as_array().unwrap().len(), 1);

        let deleted = send(&app, json_request(Method::DELETE, "/api/journal/1", Some(&cookie), None)).await;
        assert_eq!(deleted.status, StatusCode::NO_CONTENT);

        let missing = send(&app, json_request(Method::GET, "/api/journal/1", Some(&cookie), None)).await;
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
        assert_eq!(missing.message(), "Journal entry not found");
    }

    #[tokio::test]
    async fn blank_title_is_400() {
        let (app, _) = create_app();
        let cookie = register(&app, "trader", "pw").await;
        let response = send(
            &app,
            json_request(
                Method::POST,
                "/api/journal",
                Some(&cookie),
                Some(journal_json("   ", "2025-03-20")),
            ),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn other_users_entry_is_403() {
        let (app, _) = create_app();
        let alice = register(&app, "alice", "pw").await;
        let bob = register(&app, "bob", "pw").await;
        send(
            &app,
            json_request(
                Method::POST,
                "/api/journal",
                Some(&alice),
                Some(journal_json("Private", "2025-03-20")),
            ),
        )
        .await;

        let response = send(&app, json_request(Method::GET, "/api/journal/1", Some(&bob), None)).await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert_eq!(response.message(), "Unauthorized access to this journal entry");
    }
}

mod metrics_tests {
    use super::*;

    async fn seeded_app() -> (axum::Router, String) {
        let (app, _) = create_app();
        let cookie = register(&app, "trader", "pw").await;
        create_trade(&app, &cookie, trade_json("AAPL", "long", 190.25, 193.45, 100.0, "2025-03-20")).await;
        create_trade(&app, &cookie, trade_json("MSFT", "short", 420.75, 417.25, 50.0, "2025-03-21")).await;
        create_trade(&app, &cookie, trade_json("TSLA", "long", 275.5, 272.3, 20.0, "2025-03-22")).await;
        (app, cookie)
    }

    #[tokio::test]
    async fn metrics_over_all_trades() {
        let (app, cookie) = seeded_app().await;
        let response = send(&app, json_request(Method::GET, "/api/metrics", Some(&cookie), None)).await;
        assert_eq!(response.status, StatusCode::OK);
        let m = response.json();

        assert_eq!(m["totalTrades"], 3);
        assert_relative_eq!(m["winRate"].as_f64().unwrap(), 200.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(m["totalProfitLoss"].as_f64().unwrap(), 431.0, epsilon = 1e-9);
        assert_relative_eq!(m["profitFactor"].as_f64().unwrap(), 495.0 / 64.0, epsilon = 1e-9);
        assert_relative_eq!(m["largestWin"].as_f64().unwrap(), 320.0, epsilon = 1e-9);
        assert_relative_eq!(m["largestLoss"].as_f64().unwrap(), 64.0, epsilon = 1e-9);
        assert_relative_eq!(
            m["profitByInstrument"]["stocks"].as_f64().unwrap(),
            431.0,
            epsilon = 1e-9
        );
        // Every trade enters at 09:30 UTC.
        assert_relative_eq!(
            m["profitBySession"]["morning"].as_f64().unwrap(),
            431.0,
            epsilon = 1e-9
        );
        assert_eq!(m["profitBySession"]["evening"], 0.0);
    }

    #[tokio::test]
    async fn metrics_filter_needs_both_dates() {
        let (app, cookie) = seeded_app().await;

        let only_start = send(
            &app,
            json_request(Method::GET, "/api/metrics?startDate=2025-03-22", Some(&cookie), None),
        )
        .await;
        assert_eq!(only_start.json()["totalTrades"], 3);

        let both = send(
            &app,
            json_request(
                Method::GET,
                "/api/metrics?startDate=2025-03-22&endDate=2025-03-22",
                Some(&cookie),
                None,
            ),
        )
        .await;
        let m = both.json();
        assert_eq!(m["totalTrades"], 1);
        assert_eq!(m["winRate"], 0.0);
        assert_eq!(m["profitFactor"], 0.0);
    }

    #[tokio::test]
    async fn empty_metrics_are_zeroed() {
        let (app, _) = create_app();
        let cookie = register(&app, "trader", "pw").await;
        let m = send(&app, json_request(Method::GET, "/api/metrics", Some(&cookie), None))
            .await
            .json();
        assert_eq!(m["totalTrades"], 0);
        assert_eq!(m["profitByInstrument"], json!({}));
        assert_eq!(m["profitBySession"].as_object().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn performance_breakdowns() {
        let (app, cookie) = seeded_app().await;

        let daily = send(&app, json_request(Method::GET, "/api/metrics/daily", Some(&cookie), None))
            .await
            .json();
        let days = daily.as_array().unwrap();
        assert_eq!(days.len(), 3);
        assert_eq!(days[0]["date"], "2025-03-20");

        let monthly = send(&app, json_request(Method::GET, "/api/metrics/monthly", Some(&cookie), None))
            .await
            .json();
        assert_eq!(monthly[0]["month"], "2025-03");
        assert_eq!(monthly[0]["trades"], 3);

        let sessions = send(&app, json_request(Method::GET, "/api/metrics/sessions", Some(&cookie), None))
            .await
            .json();
        assert_eq!(sessions.as_array().unwrap().len(), 4);

        let weekdays = send(&app, json_request(Method::GET, "/api/metrics/weekdays", Some(&cookie), None))
            .await
            .json();
        assert_eq!(weekdays.as_array().unwrap().len(), 7);
    }
}

mod export_tests {
    use super::*;

    #[tokio::test]
    async fn csv_export_of_trades() {
        let (app, _) = create_app();
        let cookie = register(&app, "trader", "pw").await;
        create_trade(&app, &cookie, trade_json("AAPL", "long", 100.0, 110.0, 1.0, "2025-03-20")).await;

        let response = send(&app, json_request(Method::GET, "/api/export?format=csv", Some(&cookie), None)).await;
        assert_eq!(response.status, StatusCode::OK);
        assert!(
            response.headers[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/csv")
        );
        assert!(
            response.headers[header::CONTENT_DISPOSITION]
                .to_str()
                .unwrap()
                .contains("trades.csv")
        );
        assert_eq!(response.text.lines().count(), 2);
        assert!(response.text.contains("AAPL"));
    }

    #[tokio::test]
    async fn csv_export_of_journal() {
        let (app, _) = create_app();
        let cookie = register(&app, "trader", "pw").await;
        let response = send(
            &app,
            json_request(Method::GET, "/api/export?format=csv&data=journal", Some(&cookie), None),
        )
        .await;
        assert_eq!(response.status, StatusCode::OK);
        assert!(response.text.starts_with("id,date,title"));
    }

    #[tokio::test]
    async fn json_export_has_both_collections() {
        let (app, _) = create_app();
        let cookie = register(&app, "trader", "pw").await;
        create_trade(&app, &cookie, trade_json("AAPL", "long", 100.0, 110.0, 1.0, "2025-03-20")).await;

        let response = send(&app, json_request(Method::GET, "/api/export?format=json", Some(&cookie), None)).await;
        let body = response.json();
        assert_eq!(body["trades"].as_array().unwrap().len(), 1);
        assert_eq!(body["journalEntries"], json!([]));
    }

    #[tokio::test]
    async fn unknown_format_is_400() {
        let (app, _) = create_app();
        let cookie = register(&app, "trader", "pw").await;
        let response = send(&app, json_request(Method::GET, "/api/export?format=xml", Some(&cookie), None)).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }
}

mod routing_tests {
    use super::*;
    use tradejournal::adapters::memory_store::MemoryStore;

    #[tokio::test]
    async fn unknown_api_path_is_json_404() {
        let (app, _) = create_app();
        let response = send(&app, json_request(Method::GET, "/api/nope", None, None)).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.message(), "Not found");
    }

    #[tokio::test]
    async fn static_dir_serves_spa_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>journal</html>").unwrap();

        let config = MockConfigPort {
            static_dir: Some(dir.path().display().to_string()),
        };
        let app = create_app_with(Arc::new(MemoryStore::new()), &config);

        let root = send(&app, json_request(Method::GET, "/index.html", None, None)).await;
        assert_eq!(root.status, StatusCode::OK);
        assert!(root.text.contains("journal"));

        let client_route = send(&app, json_request(Method::GET, "/calendar", None, None)).await;
        assert_eq!(client_route.status, StatusCode::OK);
        assert!(client_route.text.contains("journal"));

        let api = send(&app, json_request(Method::GET, "/api/missing", None, None)).await;
        assert_eq!(api.status, StatusCode::NOT_FOUND);
    }
}
