//! SportMonks client tests against a mock server.

use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sportmonks_ingestion::client::{ReferenceKind, SportMonksClient};
use sportmonks_ingestion::{ApiError, IngestError, Payload};

fn client(server: &MockServer) -> SportMonksClient {
    SportMonksClient::new(&format!("{}/api/v2.0/", server.uri()), "test_token", "UTC", 600)
        .expect("should create client")
}

#[tokio::test]
async fn error_bodies_map_to_typed_errors() {
    let cases: [(u16, fn(&ApiError) -> bool); 9] = [
        (400, |e| matches!(e, ApiError::BadRequest(_))),
        (401, |e| matches!(e, ApiError::Unauthorized(_))),
        (403, |e| matches!(e, ApiError::PermissionDenied(_))),
        (404, |e| matches!(e, ApiError::NotFound(_))),
        (429, |e| matches!(e, ApiError::TooManyRequests(_))),
        (500, |e| matches!(e, ApiError::Server { status: 500, .. })),
        (502, |e| matches!(e, ApiError::Server { status: 502, .. })),
        (503, |e| matches!(e, ApiError::Server { status: 503, .. })),
        (504, |e| matches!(e, ApiError::Server { status: 504, .. })),
    ];

    for (status, check) in cases {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2.0/continents"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "error": {"message": "nope", "code": status}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .reference(ReferenceKind::Continents)
            .await
            .unwrap_err();
        assert!(check(&err), "status {} mapped to {:?}", status, err);
    }
}

#[tokio::test]
async fn non_json_failure_keeps_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2.0/markets"))
        .respond_with(ResponseTemplate::new(503).set_body_string("<html>down</html>"))
        .mount(&server)
        .await;

    let err = client(&server).reference(ReferenceKind::Markets).await.unwrap_err();
    assert!(matches!(err, ApiError::Server { status: 503, .. }));
}

#[tokio::test]
async fn request_carries_token_timezone_and_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2.0/fixtures/between/2024-08-17/2024-08-18"))
        .and(query_param("api_token", "test_token"))
        .and(query_param("tz", "UTC"))
        .and(query_param("page", "1"))
        .and(query_param("include", "localTeam,visitorTeam,odds"))
        .and(query_param("leagues", "8,9"))
        .and(query_param("markets", "1,12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let fixtures = client(&server)
        .fixtures_between(
            NaiveDate::from_ymd_opt(2024, 8, 17).unwrap(),
            NaiveDate::from_ymd_opt(2024, 8, 18).unwrap(),
            &[8, 9],
            &[1, 12],
            &[],
            &["localTeam", "visitorTeam", "odds"],
        )
        .await
        .unwrap();
    assert!(fixtures.is_empty());
}

#[tokio::test]
async fn pages_are_appended() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2.0/leagues"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 8, "name": "Premier League"}],
            "meta": {"pagination": {"current_page": 1, "total_pages": 3}}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2.0/leagues"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 9, "name": "Championship"}],
            "meta": {"pagination": {"current_page": 2, "total_pages": 3}}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2.0/leagues"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 12, "name": "League One"}],
            "meta": {"pagination": {"current_page": 3, "total_pages": 3}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let leagues = client(&server).reference(ReferenceKind::Leagues).await.unwrap();
    let ids: Vec<i64> = leagues.iter().map(|l| l.id).collect();
    assert_eq!(ids, vec![8, 9, 12]);
}

#[tokio::test]
async fn single_fixture_is_unnested() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2.0/fixtures/multi/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "id": 42,
                "localTeam": {"data": {"id": 1, "name": "Chelsea", "short_code": "CHE"}},
                "visitorTeam": {"data": {"id": 2, "name": "Arsenal", "short_code": "ARS"}},
                "odds": {"data": [{
                    "id": 1,
                    "name": "3Way Result",
                    "bookmaker": {"data": [{
                        "id": 2,
                        "name": "bet365",
                        "odds": {"data": [{"label": "Home", "value": "2.10", "total": null}]}
                    }]}
                }]}
            }
        })))
        .mount(&server)
        .await;

    let payload = client(&server)
        .fixtures_by_ids(&[42], &[], &[], &["localTeam", "visitorTeam", "odds"])
        .await
        .unwrap();
    let fixture = match payload {
        Payload::Single(f) => f,
        Payload::Many(_) => panic!("expected a single fixture"),
    };
    assert_eq!(fixture.local_team.unwrap().short_code.as_deref(), Some("CHE"));
    assert_eq!(fixture.odds[0].bookmaker[0].odds[0].label, "Home");
}

#[tokio::test]
async fn fixture_odds_narrow_by_bookmaker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2.0/odds/fixture/42/bookmaker/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 12, "name": "Over/Under", "bookmaker": {"data": []}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let markets = client(&server).fixture_odds(42, Some(2), None).await.unwrap();
    assert_eq!(markets.len(), 1);
    assert_eq!(markets[0].id, 12);
}

#[tokio::test]
async fn scalar_data_is_an_invalid_shape() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2.0/bookmakers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": "oops"})))
        .mount(&server)
        .await;

    let err = client(&server).reference(ReferenceKind::Bookmakers).await.unwrap_err();
    assert!(matches!(err, ApiError::Shape(IngestError::InvalidShape(_))));
}

#[tokio::test]
async fn missing_data_member_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2.0/seasons"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"meta": {}})))
        .mount(&server)
        .await;

    let err = client(&server).reference(ReferenceKind::Seasons).await.unwrap_err();
    assert!(matches!(err, ApiError::MissingData));
}
