use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cinema_booking::error::GENERIC_BOOKING_FAILURE;
use cinema_booking::models::{ComboLine, PaymentRequest};
use cinema_booking::services::{BackendClient, PaymentService};
use cinema_booking::{BookingError, Config};

fn service_for(server: &MockServer) -> PaymentService {
    let config = Config::for_backend(format!("{}/api", server.uri()), "ws://unused");
    PaymentService::new(BackendClient::from_config(&config).unwrap())
}

fn request() -> PaymentRequest {
    PaymentRequest {
        user_id: 5,
        showtime_id: 10,
        list_seat_id: vec![1, 2],
        payment_method: "VNPAY".to_string(),
        list_combo: Some(vec![ComboLine { combo_id: 7, quantity: 2 }]),
    }
}

#[tokio::test]
async fn returns_redirect_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/payments/client"))
        .and(body_json(json!({
            "userId": 5,
            "showtimeId": 10,
            "listSeatId": [1, 2],
            "paymentMethod": "VNPAY",
            "listCombo": [{"comboId": 7, "quantity": 2}]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": {"paymentUrl": "https://pay.example/abc"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let url = service_for(&server).submit(&request()).await.unwrap();
    assert_eq!(url, "https://pay.example/abc");
}

#[tokio::test]
async fn rejection_surfaces_server_message_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/payments/client"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({"message": "Seat A2 already booked"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = service_for(&server).submit(&request()).await.unwrap_err();
    assert_eq!(err.user_message(), "Seat A2 already booked");
}

#[tokio::test]
async fn rejection_without_message_uses_generic_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/payments/client"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&server)
        .await;

    let err = service_for(&server).submit(&request()).await.unwrap_err();
    assert_eq!(err.user_message(), GENERIC_BOOKING_FAILURE);
}

#[tokio::test]
async fn invalid_request_is_not_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut req = request();
    req.list_seat_id.clear();
    let err = service_for(&server).submit(&req).await.unwrap_err();
    assert!(matches!(err, BookingError::Invalid(_)));
}

#[tokio::test]
async fn success_without_redirect_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/payments/client"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .mount(&server)
        .await;

    let err = service_for(&server).submit(&request()).await.unwrap_err();
    assert!(matches!(err, BookingError::MissingRedirect));
}
