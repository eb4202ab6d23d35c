//! Integration tests for the event types API endpoints

mod test_utils;

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serial_test::serial;
    use tower::util::ServiceExt;

    use crate::test_utils::{body_to_string, test_app};

    /// Tests listing the seeded event types
    #[tokio::test]
    #[serial]
    async fn it_lists_event_types() {
        let app = test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/event-types")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = body_to_string(response.into_body()).await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        let event_types = json["event_types"].as_array().unwrap();
        assert_eq!(event_types.len(), 2);
    }

    /// Tests fetching one event type by id
    #[tokio::test]
    #[serial]
    async fn it_gets_one_event_type() {
        let app = test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/event-types?id=et-rr")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = body_to_string(response.into_body()).await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["event_type"]["scheduling_mode"], "round_robin");
        assert_eq!(json["event_type"]["duration_minutes"], 30);
    }

    /// Tests creating an event type with defaults applied
    #[tokio::test]
    #[serial]
    async fn it_creates_an_event_type() {
        let app = test_app().await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/event-types")
                    .method("POST")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({
                            "name": "Office Hours",
                            "duration_minutes": 45,
                            "owner_host_id": "host-a"
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = body_to_string(response.into_body()).await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        let event_type = &json["event_type"];
        assert_eq!(event_type["name"], "Office Hours");
        assert_eq!(event_type["scheduling_mode"], "solo");
        assert_eq!(event_type["min_notice_minutes"], 60);
        assert_eq!(event_type["buffer_before"], 0);
        assert!(!event_type["id"].as_str().unwrap().is_empty());
    }

    /// Tests a non-positive duration is rejected
    #[tokio::test]
    #[serial]
    async fn it_rejects_a_zero_duration() {
        let app = test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/event-types")
                    .method("POST")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({
                            "name": "Broken",
                            "duration_minutes": 0
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    /// Tests absurdly large intervals are rejected instead of being
    /// stored and breaking slot computation later
    #[tokio::test]
    #[serial]
    async fn it_rejects_oversized_durations() {
        let app = test_app().await;

        let cases = [
            serde_json::json!({
                "name": "Marathon",
                "duration_minutes": 9_000_000_000_000_000i64
            }),
            serde_json::json!({
                "name": "Marathon",
                "duration_minutes": 30,
                "buffer_before": 100_000
            }),
            serde_json::json!({
                "name": "Marathon",
                "duration_minutes": 30,
                "min_notice_minutes": 9_000_000_000_000_000i64
            }),
        ];

        for case in cases {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .uri("/api/event-types")
                        .method("POST")
                        .header("content-type", "application/json")
                        .body(Body::from(case.to_string()))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }

        // Updates re-validate the merged result too
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/event-types")
                    .method("PUT")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({
                            "id": "et-solo",
                            "duration_minutes": 9_000_000_000_000_000i64
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // Slot listing still works afterwards
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/slots?event_type_id=et-solo&date=2099-06-01")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    /// Tests an unknown scheduling mode is rejected
    #[tokio::test]
    #[serial]
    async fn it_rejects_an_unknown_scheduling_mode() {
        let app = test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/event-types")
                    .method("POST")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({
                            "name": "Broken",
                            "duration_minutes": 30,
                            "scheduling_mode": "pair_programming"
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    /// Tests partial updates keep the unspecified fields
    #[tokio::test]
    #[serial]
    async fn it_updates_an_event_type() {
        let app = test_app().await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/event-types")
                    .method("PUT")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({
                            "id": "et-solo",
                            "duration_minutes": 60
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = body_to_string(response.into_body()).await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["event_type"]["duration_minutes"], 60);
        assert_eq!(json["event_type"]["name"], "Intro Call");
    }

    /// Tests deleting an event type removes it from listings
    #[tokio::test]
    #[serial]
    async fn it_deletes_an_event_type() {
        let app = test_app().await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/event-types")
                    .method("DELETE")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({ "id": "et-solo" }).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/event-types?id=et-solo")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
