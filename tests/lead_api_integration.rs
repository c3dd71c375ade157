//! Integration tests for the lead API.
//!
//! Each test spins up the Axum server on a random port with real channel
//! adapters pointed at wiremock servers, and exercises the HTTP contract.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;
use wiremock::matchers::{body_partial_json, body_string_contains, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lead_intake::api::lead_routes;
use lead_intake::channels::sheets::SheetsConfig;
use lead_intake::channels::telegram::TelegramConfig;
use lead_intake::channels::{ChannelManager, SheetsChannel, TelegramChannel};
use lead_intake::config::DispatchConfig;
use lead_intake::gate::{AbuseGate, RecaptchaConfig, RecaptchaVerifier};
use lead_intake::pipeline::LeadDispatcher;
use lead_intake::pipeline::render::client_message;
use lead_intake::pipeline::types::UrgencyTier;

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Mock downstream services.
struct Downstream {
    captcha: MockServer,
    telegram: MockServer,
    sheets: MockServer,
}

impl Downstream {
    async fn start() -> Self {
        Self {
            captcha: MockServer::start().await,
            telegram: MockServer::start().await,
            sheets: MockServer::start().await,
        }
    }

    async fn captcha_answers(&self, body: Value) {
        Mock::given(method("POST"))
            .and(path("/siteverify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.captcha)
            .await;
    }

    fn gate(&self) -> AbuseGate {
        let verifier = RecaptchaVerifier::new(RecaptchaConfig {
            secret: SecretString::from("test-secret"),
            verify_url: format!("{}/siteverify", self.captcha.uri()),
        });
        AbuseGate::new(Arc::new(verifier), Some(0.5), Duration::from_secs(2))
    }

    fn channels(&self) -> ChannelManager {
        let mut channels = ChannelManager::new();
        channels.add(Arc::new(TelegramChannel::new(TelegramConfig {
            bot_token: SecretString::from("123:ABC"),
            chat_id: "-100200".into(),
            api_base: self.telegram.uri(),
        })));
        channels.add(Arc::new(SheetsChannel::new(SheetsConfig {
            spreadsheet_id: "sheet-1".into(),
            access_token: SecretString::from("ya29.token"),
            range: "Leads!A:H".into(),
            api_base: self.sheets.uri(),
        })));
        channels.add_disabled("sms", "missing SMS_ACCOUNT_SID");
        channels
    }
}

/// Start an Axum server on a random port, return the base URL.
async fn start_server(downstream: &Downstream) -> String {
    let dispatcher = LeadDispatcher::new(
        downstream.gate(),
        downstream.channels(),
        DispatchConfig {
            channel_timeout: Duration::from_secs(2),
        },
    );
    let app = lead_routes(Arc::new(dispatcher));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("http://127.0.0.1:{port}")
}

async fn post_lead(base: &str, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{base}/api/lead"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

fn hot_lead() -> Value {
    json!({
        "phone": "+79991234567",
        "answers": {"5": "Более 8 млн ₽", "6": "В ближайший месяц"},
        "token": "client-token"
    })
}

fn channel_result<'a>(body: &'a Value, name: &str) -> &'a Value {
    body["channelResults"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["channelName"] == name)
        .unwrap_or_else(|| panic!("no result for {name}"))
}

// ── Probe requests ───────────────────────────────────────────────────

#[tokio::test]
async fn probe_without_answers_touches_nothing() {
    timeout(TEST_TIMEOUT, async {
        let downstream = Downstream::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&downstream.captcha)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&downstream.telegram)
            .await;
        let base = start_server(&downstream).await;

        let (status, body) =
            post_lead(&base, json!({"phone": "+79991234567", "token": "t"})).await;

        assert_eq!(status, 200);
        assert_eq!(body["success"], true);
        assert!(body.get("leadStatus").is_none());
        assert!(body.get("channelResults").is_none());
    })
    .await
    .expect("test timed out");
}

// ── Abuse gate ───────────────────────────────────────────────────────

#[tokio::test]
async fn empty_token_rejected_without_verifier_call() {
    timeout(TEST_TIMEOUT, async {
        let downstream = Downstream::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&downstream.captcha)
            .await;
        let base = start_server(&downstream).await;

        let mut lead = hot_lead();
        lead["token"] = json!("");
        let (status, body) = post_lead(&base, lead).await;

        assert_eq!(status, 400);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Invalid captcha");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn low_score_rejected_and_nothing_dispatched() {
    timeout(TEST_TIMEOUT, async {
        let downstream = Downstream::start().await;
        downstream
            .captcha_answers(json!({"success": true, "score": 0.3, "action": "lead"}))
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&downstream.sheets)
            .await;
        let base = start_server(&downstream).await;

        let (status, _body) = post_lead(&base, hot_lead()).await;
        assert_eq!(status, 400);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn verifier_outage_is_service_unavailable() {
    timeout(TEST_TIMEOUT, async {
        let downstream = Downstream::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&downstream.captcha)
            .await;
        let base = start_server(&downstream).await;

        let (status, body) = post_lead(&base, hot_lead()).await;
        assert_eq!(status, 503);
        assert_eq!(body["error"], "Captcha verification failed");
    })
    .await
    .expect("test timed out");
}

// ── Dispatch ─────────────────────────────────────────────────────────

#[tokio::test]
async fn hot_lead_reaches_every_configured_channel() {
    timeout(TEST_TIMEOUT, async {
        let downstream = Downstream::start().await;
        downstream
            .captcha_answers(json!({"success": true, "score": 0.9, "action": "lead"}))
            .await;
        Mock::given(method("POST"))
            .and(path("/bot123:ABC/sendMessage"))
            .and(body_partial_json(json!({"chat_id": "-100200", "parse_mode": "Markdown"})))
            .and(body_string_contains("ГОРЯЧИЙ"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&downstream.telegram)
            .await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/v4/spreadsheets/sheet-1/values/.+:append$"))
            .and(body_string_contains("+79991234567"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&downstream.sheets)
            .await;
        let base = start_server(&downstream).await;

        let (status, body) = post_lead(&base, hot_lead()).await;

        assert_eq!(status, 200);
        assert_eq!(body["success"], true);
        assert_eq!(body["leadStatus"], "HOT");
        assert_eq!(body["clientMessage"], client_message(UrgencyTier::Hot));

        assert_eq!(channel_result(&body, "telegram")["succeeded"], true);
        assert_eq!(channel_result(&body, "sheets")["succeeded"], true);
        let sms = channel_result(&body, "sms");
        assert_eq!(sms["attempted"], false);
        assert!(sms.get("error").is_none());

        // Operator message carries all six question lines in order.
        let requests = downstream.telegram.received_requests().await.unwrap();
        let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
        let text = sent["text"].as_str().unwrap();
        let positions: Vec<usize> = (1..=6)
            .map(|q| text.find(&format!("\n{q}. ")).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(text.contains("[+79991234567](tel:79991234567)"));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn chat_failure_does_not_fail_the_lead() {
    timeout(TEST_TIMEOUT, async {
        let downstream = Downstream::start().await;
        downstream
            .captcha_answers(json!({"success": true, "score": 0.9, "action": "lead"}))
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("telegram down"))
            .mount(&downstream.telegram)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&downstream.sheets)
            .await;
        let base = start_server(&downstream).await;

        let mut lead = hot_lead();
        lead["answers"] = json!({"5": "3-5 млн ₽", "6": ""});
        let (status, body) = post_lead(&base, lead).await;

        assert_eq!(status, 200);
        assert_eq!(body["success"], true);
        assert_eq!(body["leadStatus"], "WARM");
        assert_eq!(body["clientMessage"], client_message(UrgencyTier::Warm));

        let chat = channel_result(&body, "telegram");
        assert_eq!(chat["attempted"], true);
        assert_eq!(chat["succeeded"], false);
        assert!(chat["error"].as_str().unwrap().contains("telegram down"));
        assert_eq!(channel_result(&body, "sheets")["succeeded"], true);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn cors_preflight_is_allowed() {
    timeout(TEST_TIMEOUT, async {
        let downstream = Downstream::start().await;
        let base = start_server(&downstream).await;

        let resp = reqwest::Client::new()
            .request(reqwest::Method::OPTIONS, format!("{base}/api/lead"))
            .header("origin", "https://example.com")
            .header("access-control-request-method", "POST")
            .send()
            .await
            .unwrap();

        assert!(resp.status().is_success());
        assert!(resp.headers().contains_key("access-control-allow-origin"));
    })
    .await
    .expect("test timed out");
}
