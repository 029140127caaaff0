use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use homeprice::predict::{HttpPredictor, PredictionRequest, PredictionService};
use homeprice::AppError;

struct Captured {
    request_line: String,
    body: String,
}

/// Serves exactly one HTTP response and hands back what the client sent.
fn one_shot_server(status: &'static str, body: &'static str) -> (String, mpsc::Receiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();

        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap();
                }
            }
        }
        let mut buf = vec![0u8; content_length];
        reader.read_exact(&mut buf).unwrap();

        let mut stream = stream;
        write!(
            stream,
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
        .unwrap();
        stream.flush().unwrap();

        tx.send(Captured {
            request_line: request_line.trim_end().to_string(),
            body: String::from_utf8(buf).unwrap(),
        })
        .unwrap();
    });

    (format!("http://{}/predict", addr), rx)
}

fn request() -> PredictionRequest {
    PredictionRequest {
        total_sqft: 1200.0,
        bath: 2,
        balcony: 1,
        price_per_sqft: 7500.0,
        location: "Whitefield".into(),
    }
}

#[test]
fn posts_json_and_parses_prediction() {
    let (endpoint, rx) = one_shot_server(
        "200 OK",
        r#"{"predicted_price_lakhs": 90.25, "shap_values": [["total_sqft", 4.5]]}"#,
    );
    let predictor = HttpPredictor::new(endpoint, Duration::from_secs(5)).unwrap();

    let result = predictor.predict(&request()).unwrap();
    assert_eq!(result.predicted_price_lakhs, 90.25);
    assert_eq!(result.shap_values.len(), 1);
    assert_eq!(result.shap_values[0].feature, "total_sqft");

    let captured = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(captured.request_line, "POST /predict HTTP/1.1");
    let sent: serde_json::Value = serde_json::from_str(&captured.body).unwrap();
    assert_eq!(sent["location"], "Whitefield");
    assert_eq!(sent["bath"], 2);
    assert_eq!(sent["total_sqft"], 1200.0);
}

#[test]
fn missing_shap_values_default_to_empty() {
    let (endpoint, _rx) = one_shot_server("200 OK", r#"{"predicted_price_lakhs": 42.0}"#);
    let predictor = HttpPredictor::new(endpoint, Duration::from_secs(5)).unwrap();
    let result = predictor.predict(&request()).unwrap();
    assert_eq!(result.predicted_price_lakhs, 42.0);
    assert!(result.shap_values.is_empty());
}

#[test]
fn null_shap_values_default_to_empty() {
    let (endpoint, _rx) =
        one_shot_server("200 OK", r#"{"predicted_price_lakhs": 42.0, "shap_values": null}"#);
    let predictor = HttpPredictor::new(endpoint, Duration::from_secs(5)).unwrap();
    let result = predictor.predict(&request()).unwrap();
    assert_eq!(result.predicted_price_lakhs, 42.0);
    assert!(result.shap_values.is_empty());
}

#[test]
fn zero_price_is_rejected() {
    let (endpoint, _rx) = one_shot_server("200 OK", r#"{"predicted_price_lakhs": 0.0}"#);
    let predictor = HttpPredictor::new(endpoint, Duration::from_secs(5)).unwrap();
    let err = predictor.predict(&request()).unwrap_err();
    assert!(matches!(err, AppError::InvalidPrice(p) if p == 0.0));
    assert!(err.user_message().starts_with("Something went wrong"));
}

#[test]
fn negative_price_is_rejected() {
    let (endpoint, _rx) = one_shot_server("200 OK", r#"{"predicted_price_lakhs": -5.0, "shap_values": []}"#);
    let predictor = HttpPredictor::new(endpoint, Duration::from_secs(5)).unwrap();
    let err = predictor.predict(&request()).unwrap_err();
    assert!(matches!(err, AppError::InvalidPrice(p) if p == -5.0));
    assert!(err.is_transport());
}

#[test]
fn non_success_status_is_a_transport_error() {
    let (endpoint, _rx) = one_shot_server("500 Internal Server Error", r#"{"detail": "boom"}"#);
    let predictor = HttpPredictor::new(endpoint, Duration::from_secs(5)).unwrap();
    let err = predictor.predict(&request()).unwrap_err();
    assert!(matches!(err, AppError::Status(500)));
    assert!(err.is_transport());
}

#[test]
fn unreachable_service_is_a_transport_error() {
    // Bind then drop to get a port nothing listens on.
    let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let predictor =
        HttpPredictor::new(format!("http://{}/predict", addr), Duration::from_secs(2)).unwrap();
    let err = predictor.predict(&request()).unwrap_err();
    assert!(matches!(err, AppError::Http(_)));
    assert!(err.user_message().starts_with("Something went wrong"));
}
