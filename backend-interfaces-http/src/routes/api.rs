use axum::routing::{get, patch, post};
use axum::Router;

use backend_application::AppState;

use crate::handlers::{
    admin_handlers, checkout_handlers, event_handlers, ops_handlers, payout_handlers,
    promo_code_handlers, webhook_handlers,
};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/search", get(event_handlers::search_events))
        .route("/api/events", post(event_handlers::create_event))
        .route("/api/events/:id", get(event_handlers::get_event))
        .route("/api/events/:id/tiers", post(event_handlers::add_tier))
        .route("/api/events/:id/publish", post(event_handlers::publish_event))
        .route("/api/events/:id/check-in", post(event_handlers::check_in))
        .route(
            "/api/events/:id/financials",
            get(event_handlers::event_financials),
        )
        .route("/api/events/:id/export", get(event_handlers::export_event))
        .route(
            "/api/events/:id/promo-codes",
            get(promo_code_handlers::list_promo_codes).post(promo_code_handlers::create_promo_code),
        )
        .route(
            "/api/promo-codes/validate",
            post(promo_code_handlers::validate_promo_code),
        )
        .route(
            "/api/promo-codes/:id",
            patch(promo_code_handlers::toggle_promo_code),
        )
        .route("/api/checkout/card", post(checkout_handlers::card_checkout))
        .route(
            "/api/checkout/mobile-money",
            post(checkout_handlers::mobile_money_checkout),
        )
        .route(
            "/api/payments/moncash/return",
            get(checkout_handlers::mobile_money_return),
        )
        .route("/api/webhooks/stripe", post(webhook_handlers::card_webhook))
        .route(
            "/api/payouts",
            get(payout_handlers::list_my_payouts).post(payout_handlers::request_payout),
        )
        .route("/api/payouts/:id", get(payout_handlers::payout_detail))
        .route("/api/earnings", get(payout_handlers::my_earnings))
        .route("/api/admin/overview", get(admin_handlers::overview))
        .route(
            "/api/admin/payouts",
            get(payout_handlers::admin_list_payouts),
        )
        .route(
            "/api/admin/payouts/:id/approve",
            post(payout_handlers::approve_payout),
        )
        .route(
            "/api/admin/payouts/:id/decline",
            post(payout_handlers::decline_payout),
        )
        .route(
            "/api/admin/payouts/:id/process",
            post(payout_handlers::process_payout),
        )
        .route(
            "/api/admin/payouts/:id/mark-paid",
            post(payout_handlers::mark_payout_paid),
        )
        .route(
            "/api/admin/payouts/:id/fail",
            post(payout_handlers::fail_payout),
        )
        .route(
            "/api/admin/tickets/:id/refund",
            post(admin_handlers::refund_ticket),
        )
        .route("/api/admin/users/:id/role", post(admin_handlers::update_role))
        .route(
            "/api/admin/users/:id/verify",
            post(admin_handlers::update_verification),
        )
        .route(
            "/api/admin/suspicious",
            get(admin_handlers::list_suspicious),
        )
        .route(
            "/api/admin/suspicious/:id/review",
            post(admin_handlers::review_suspicious),
        )
        .route(
            "/api/admin/organizers/:id/reconcile",
            post(admin_handlers::reconcile_earnings),
        )
        .route("/api/ops/health/live", get(ops_handlers::health_live))
        .route("/api/ops/health/ready", get(ops_handlers::health_ready))
        .route(
            "/api/ops/metrics/prometheus",
            get(ops_handlers::metrics_prometheus),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
    use axum::http::{Request, Response, StatusCode};
    use backend_application::testing::{bearer_for, test_state, MemoryStore, TEST_ADMIN_EMAIL};
    use backend_domain::{Currency, MobileMoneyPayment, Role};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(router: Router, request: Request<Body>) -> Response<Body> {
        router.oneshot(request).await.expect("response")
    }

    async fn body_json(response: Response<Body>) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    fn json_request(method: &str, uri: &str, bearer: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).expect("request")
    }

    fn get(uri: &str, bearer: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).expect("request")
    }

    #[tokio::test]
    async fn health_endpoints_report_dependencies() {
        let store = MemoryStore::new();
        let router = build_router(test_state(&store));
        let live = send(router.clone(), get("/api/ops/health/live", None)).await;
        assert_eq!(live.status(), StatusCode::OK);

        let ready = send(router, get("/api/ops/health/ready", None)).await;
        assert_eq!(ready.status(), StatusCode::OK);
        assert_eq!(body_json(ready).await["database"], "ok");
    }

    #[tokio::test]
    async fn organizer_endpoints_require_a_session() {
        let store = MemoryStore::new();
        let router = build_router(test_state(&store));
        let organizer = store.seed_user("org@example.com", Role::Organizer);
        let body = json!({
            "title": "Jazz nan Lakou",
            "venue": "Jacmel",
            "starts_at": (chrono::Utc::now() + chrono::Duration::days(30)).to_rfc3339(),
            "currency": "HTG",
            "ticket_price": 150000,
            "total_tickets": 200
        });

        let anonymous = send(router.clone(), json_request("POST", "/api/events", None, body.clone())).await;
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(anonymous).await["error"], "unauthorized");

        let token = bearer_for(&organizer);
        let created = send(router, json_request("POST", "/api/events", Some(&token), body)).await;
        assert_eq!(created.status(), StatusCode::OK);
        let event = body_json(created).await;
        assert_eq!(event["title"], "Jazz nan Lakou");
        assert_eq!(event["published"], false);
    }

    #[tokio::test]
    async fn metrics_are_admin_only() {
        let store = MemoryStore::new();
        let router = build_router(test_state(&store));
        let fan = store.seed_user("fan@example.com", Role::Attendee);
        let admin = store.seed_user(TEST_ADMIN_EMAIL, Role::Attendee);

        let forbidden = send(
            router.clone(),
            get("/api/ops/metrics/prometheus", Some(&bearer_for(&fan))),
        )
        .await;
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

        let allowed = send(router, get("/api/ops/metrics/prometheus", Some(&bearer_for(&admin)))).await;
        assert_eq!(allowed.status(), StatusCode::OK);
        let text = to_bytes(allowed.into_body(), usize::MAX).await.expect("body");
        assert!(String::from_utf8_lossy(&text).contains("eventhaiti_webhooks_received_total"));
    }

    #[tokio::test]
    async fn webhook_without_valid_signature_is_rejected() {
        let store = MemoryStore::new();
        let router = build_router(test_state(&store));

        let missing = send(
            router.clone(),
            json_request("POST", "/api/webhooks/stripe", None, json!({"id": "evt_1"})),
        )
        .await;
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

        let mut forged = json_request("POST", "/api/webhooks/stripe", None, json!({"id": "evt_1"}));
        forged
            .headers_mut()
            .insert("Stripe-Signature", "t=1,v1=00".parse().expect("header"));
        let forged = send(router, forged).await;
        assert_eq!(forged.status(), StatusCode::BAD_REQUEST);
        assert!(store.tickets().is_empty());
    }

    #[tokio::test]
    async fn mobile_money_round_trip_uses_correlation_cookie() {
        let store = MemoryStore::new();
        let router = build_router(test_state(&store));
        let organizer = store.seed_user("org@example.com", Role::Organizer);
        let fan = store.seed_user("fan@example.com", Role::Attendee);
        let event = store.seed_event(organizer.id, Currency::Htg, 50_000, 10);

        let started = send(
            router.clone(),
            json_request(
                "POST",
                "/api/checkout/mobile-money",
                Some(&bearer_for(&fan)),
                json!({ "event_id": event.id, "quantity": 1 }),
            ),
        )
        .await;
        assert_eq!(started.status(), StatusCode::OK);
        let cookies: Vec<String> = started
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok().map(ToString::to_string))
            .collect();
        assert!(cookies.iter().any(|c| c.starts_with("eh_mm_order=") && c.contains("HttpOnly")));
        assert!(cookies.iter().any(|c| c.starts_with("eh_mm_token=")));
        let checkout = body_json(started).await;
        let order_id = checkout["order_id"].as_str().expect("order id").to_string();
        assert_eq!(checkout["redirect"]["kind"], "redirect");

        store.add_mobile_money_payment(MobileMoneyPayment {
            transaction_id: "T-9".to_string(),
            order_id: order_id.clone(),
            amount: 50_000,
            successful: true,
            payer: None,
        });
        let mut back = get("/api/payments/moncash/return?transactionId=T-9", None);
        back.headers_mut().insert(
            COOKIE,
            format!("eh_mm_order={order_id}").parse().expect("cookie"),
        );
        let returned = send(router, back).await;
        assert_eq!(returned.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            returned.headers()[LOCATION],
            format!("https://eventhaiti.test/purchase/success?order={order_id}").as_str()
        );
        assert!(returned
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .all(|value| value.to_str().unwrap_or("").contains("Max-Age=0")));
        assert_eq!(store.tickets().len(), 1);
    }

    #[tokio::test]
    async fn mobile_money_return_falls_back_to_token_cookie() {
        let store = MemoryStore::new();
        let router = build_router(test_state(&store));
        let organizer = store.seed_user("org@example.com", Role::Organizer);
        let fan = store.seed_user("fan@example.com", Role::Attendee);
        let event = store.seed_event(organizer.id, Currency::Htg, 50_000, 10);

        let started = send(
            router.clone(),
            json_request(
                "POST",
                "/api/checkout/mobile-money",
                Some(&bearer_for(&fan)),
                json!({ "event_id": event.id, "quantity": 1 }),
            ),
        )
        .await;
        let token_cookie = started
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find(|c| c.starts_with("eh_mm_token="))
            .and_then(|c| c.split(';').next())
            .expect("token cookie")
            .to_string();
        let order_id = body_json(started).await["order_id"]
            .as_str()
            .expect("order id")
            .to_string();
        store.add_mobile_money_payment(MobileMoneyPayment {
            transaction_id: "T-10".to_string(),
            order_id: order_id.clone(),
            amount: 50_000,
            successful: true,
            payer: None,
        });

        let mut back = get("/api/payments/moncash/return", None);
        back.headers_mut()
            .insert(COOKIE, token_cookie.parse().expect("cookie"));
        let returned = send(router, back).await;
        assert_eq!(returned.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            returned.headers()[LOCATION],
            format!("https://eventhaiti.test/purchase/success?order={order_id}").as_str()
        );
        assert_eq!(store.tickets().len(), 1);
    }

    #[tokio::test]
    async fn export_returns_csv_attachment() {
        let store = MemoryStore::new();
        let router = build_router(test_state(&store));
        let organizer = store.seed_user("org@example.com", Role::Organizer);
        let event = store.seed_event(organizer.id, Currency::Usd, 5000, 10);

        let response = send(
            router.clone(),
            get(
                &format!("/api/events/{}/export?kind=financials", event.id),
                Some(&bearer_for(&organizer)),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[CONTENT_TYPE]
            .to_str()
            .expect("type")
            .starts_with("text/csv"));
        let disposition = response.headers()["content-disposition"]
            .to_str()
            .expect("disposition")
            .to_string();
        assert!(disposition.contains(&format!("event_{}_financials_", event.id)));

        let bad_kind = send(
            router,
            get(
                &format!("/api/events/{}/export?kind=ledger", event.id),
                Some(&bearer_for(&organizer)),
            ),
        )
        .await;
        assert_eq!(bad_kind.status(), StatusCode::BAD_REQUEST);
    }
}
