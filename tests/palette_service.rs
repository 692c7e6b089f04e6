#![cfg(feature = "palette")]

use std::io::Read;
use std::sync::mpsc;

use shotframe::ingest::{ingest_blocking, IngestOutcome, IngestSource};
use shotframe::{
    BackgroundKind, BeautifierConfig, Color, GradientDirection, HttpPaletteService, LoadedImage,
    Palette, PaletteConfig, PaletteService, Session,
};
use tiny_http::{Header, Response, Server};

struct Captured {
    url: String,
    body: serde_json::Value,
}

/// Serve one request with `status` and `body`, reporting what was received.
fn serve_once(status: u16, body: String) -> (String, mpsc::Receiver<Captured>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr();
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        if let Ok(mut request) = server.recv() {
            let mut raw = String::new();
            let _ = request.as_reader().read_to_string(&mut raw);
            let _ = tx.send(Captured {
                url: request.url().to_string(),
                body: serde_json::from_str(&raw).unwrap_or(serde_json::Value::Null),
            });
            let header: Header = "Content-Type: application/json".parse().unwrap();
            let response = Response::from_string(body)
                .with_status_code(status)
                .with_header(header);
            let _ = request.respond(response);
        }
    });
    (format!("http://{}/v1beta/models", addr), rx)
}

fn reply_with_text(text: &str) -> String {
    serde_json::json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    })
    .to_string()
}

fn sample_png() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(6, 4, image::Rgba([30, 60, 90, 255]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

fn sample_image() -> LoadedImage {
    match ingest_blocking(IngestSource::Bytes {
        mime: Some("image/png".into()),
        data: sample_png(),
    })
    .unwrap()
    {
        IngestOutcome::Loaded(img) => img,
        other => panic!("expected an image, got {:?}", other),
    }
}

fn service(endpoint: &str, key: Option<&str>) -> HttpPaletteService {
    HttpPaletteService::new(PaletteConfig {
        endpoint: endpoint.to_string(),
        model: "test-model".to_string(),
        api_key: key.map(str::to_string),
        timeout_ms: 5_000,
    })
    .expect("client")
}

#[tokio::test]
async fn parses_fenced_reply_and_sends_stripped_payload() {
    let text = "```json\n{\"colors\":[\"#111111\",\"#222222\",\"#333333\"],\"description\":\"greys\"}\n```";
    let (endpoint, rx) = serve_once(200, reply_with_text(text));
    let palette = service(&endpoint, Some("test-key")).suggest(&sample_image()).await;

    assert_eq!(palette.colors.len(), 3);
    assert_eq!(palette.description.as_deref(), Some("greys"));

    let seen = rx.recv().unwrap();
    assert!(seen.url.starts_with("/v1beta/models/test-model:generateContent"));
    assert!(seen.url.contains("key=test-key"));
    let parts = &seen.body["contents"][0]["parts"];
    assert!(parts[0]["text"].as_str().unwrap().contains("colors"));
    assert_eq!(parts[1]["inline_data"]["mime_type"], "image/png");
    let data = parts[1]["inline_data"]["data"].as_str().unwrap();
    assert!(!data.starts_with("data:"));
    assert!(!data.is_empty());
}

#[tokio::test]
async fn server_error_yields_fallback() {
    let (endpoint, _rx) = serve_once(500, "{\"error\":\"boom\"}".to_string());
    let palette = service(&endpoint, Some("k")).suggest(&sample_image()).await;
    assert_eq!(palette, Palette::fallback());
}

#[tokio::test]
async fn unusable_reply_yields_fallback() {
    let (endpoint, _rx) = serve_once(200, reply_with_text("I cannot help with that."));
    let palette = service(&endpoint, Some("k")).suggest(&sample_image()).await;
    assert_eq!(palette, Palette::fallback());
}

#[tokio::test]
async fn missing_key_skips_the_request() {
    let (endpoint, rx) = serve_once(200, reply_with_text("{\"colors\":[\"#000\",\"#fff\"]}"));
    let palette = service(&endpoint, Some("   ")).suggest(&sample_image()).await;
    assert_eq!(palette, Palette::fallback());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn unreachable_service_yields_fallback() {
    let palette = service("http://127.0.0.1:9", Some("k")).suggest(&sample_image()).await;
    assert_eq!(palette, Palette::fallback());
}

#[tokio::test]
async fn suggestion_becomes_the_background_gradient() {
    let text = "{\"colors\":[\"#111111\",\"#222222\",\"#333333\"]}";
    let (endpoint, _rx) = serve_once(200, reply_with_text(text));

    let mut session = Session::new(&BeautifierConfig::default());
    session
        .ingest(IngestSource::Bytes { mime: None, data: sample_png() })
        .await
        .unwrap();
    session
        .suggest_background(&service(&endpoint, Some("k")))
        .await
        .unwrap();

    let bg = &session.settings().background;
    assert_eq!(bg.kind, BackgroundKind::Gradient);
    assert_eq!(bg.gradient.start, Color::parse("#111111").unwrap());
    assert_eq!(bg.gradient.end, Color::parse("#333333").unwrap());
    assert_eq!(bg.gradient.direction, GradientDirection::ToBottomRight);
}

#[tokio::test]
async fn failed_suggestion_applies_fallback_without_error() {
    let mut session = Session::new(&BeautifierConfig::default());
    session
        .ingest(IngestSource::Bytes { mime: None, data: sample_png() })
        .await
        .unwrap();
    let palette = session
        .suggest_background(&service("http://127.0.0.1:9", None))
        .await
        .unwrap();
    assert_eq!(palette, Palette::fallback());
    let fallback = Palette::fallback();
    assert_eq!(session.settings().background.gradient.start, fallback.colors[0]);
    assert_eq!(session.settings().background.gradient.end, fallback.colors[2]);
}
