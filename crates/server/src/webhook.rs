//! Slack webhook endpoints.
//!
//! Slack retries any delivery not answered with a 200 within three seconds.
//! Handlers therefore acknowledge first and do the terminal work in a spawned
//! task whose outcome is only logged. The sole non-200 is a 400 when the
//! interactive `payload` form field is missing altogether.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use claude_focus_protocol::focus_url::DIRECT_URL_PREFIX;
use claude_focus_protocol::{FocusAction, FocusResult};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::auth::slack_signature_middleware;
use crate::dispatcher::FocusTarget;
use crate::error::FocusError;
use crate::registry::SessionQuery;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let signing_secret = state.config.signing_secret.clone();

    let app = Router::new()
        .route("/slack/actions", post(slack_actions_handler))
        .route("/slack/events", post(slack_events_handler))
        .route("/health", get(health_handler))
        .with_state(state);

    let app = match signing_secret {
        Some(secret) => app.layer(middleware::from_fn_with_state(
            Arc::new(secret),
            slack_signature_middleware,
        )),
        None => app,
    };

    app.layer(TraceLayer::new_for_http())
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}

#[derive(Debug, Deserialize)]
struct InteractionPayload {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    actions: Vec<BlockAction>,
}

#[derive(Debug, Deserialize)]
struct BlockAction {
    #[serde(default)]
    value: Option<String>,
}

/// What became of one inbound request after it was acknowledged.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Ignored(&'static str),
    InvalidAction(String),
    SessionNotFound(String),
    Dispatched(FocusResult),
}

/// HTTP POST handler for `/slack/actions` (interactive button clicks).
///
/// The body is decoded here rather than by axum's `Form` extractor, whose
/// rejections (415, 422) would reach Slack as non-200 responses.
pub async fn slack_actions_handler(State(state): State<Arc<AppState>>, body: Bytes) -> StatusCode {
    let payload = match payload_field(&body) {
        Ok(Some(payload)) => payload,
        Ok(None) => {
            warn!(
                component = "webhook",
                event = "webhook.payload_missing",
            );
            return StatusCode::BAD_REQUEST;
        }
        Err(e) => {
            debug!(
                component = "webhook",
                event = "webhook.form_malformed",
                error = %e,
            );
            return StatusCode::OK;
        }
    };

    tokio::spawn(async move {
        let outcome = handle_action_payload(&payload, &state).await;
        log_outcome("action", &outcome);
    });

    StatusCode::OK
}

/// First `payload` field of a url-encoded form body. Repeats are ignored.
fn payload_field(body: &[u8]) -> Result<Option<String>, FocusError> {
    let fields: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
        .map_err(|e| FocusError::MalformedPayload(e.to_string()))?;
    Ok(fields
        .into_iter()
        .find(|(key, _)| key == "payload")
        .map(|(_, value)| value))
}

/// Split an action value on its last `|` into selector and action type.
///
/// The selector may be a `url:` focus URL, so only the final separator counts.
pub fn split_action_value(value: &str) -> Option<(&str, &str)> {
    value.rsplit_once('|')
}

pub async fn handle_action_payload(payload: &str, state: &AppState) -> ActionOutcome {
    let payload: InteractionPayload = match serde_json::from_str(payload) {
        Ok(payload) => payload,
        Err(e) => {
            debug!(
                component = "webhook",
                event = "webhook.payload_malformed",
                error = %e,
            );
            return ActionOutcome::Ignored("malformed payload");
        }
    };

    if payload.kind != "block_actions" {
        return ActionOutcome::Ignored("not a block_actions payload");
    }
    let Some(value) = payload.actions.first().and_then(|a| a.value.as_deref()) else {
        return ActionOutcome::Ignored("no action value");
    };
    let Some((selector, action_type)) = split_action_value(value) else {
        return ActionOutcome::Ignored("action value has no separator");
    };
    let action: FocusAction = match action_type.parse() {
        Ok(action) => action,
        Err(_) => return ActionOutcome::InvalidAction(action_type.to_string()),
    };

    let (target, instance_id) = match selector.strip_prefix(DIRECT_URL_PREFIX) {
        Some(url) => (FocusTarget::Url(url.to_string()), None),
        None => {
            let query = SessionQuery {
                id: Some(selector.to_string()),
                name: None,
            };
            match state.registry.get_session(&query) {
                Some(session) => (FocusTarget::Session(session), Some(selector)),
                None => return ActionOutcome::SessionNotFound(selector.to_string()),
            }
        }
    };

    let result = state.dispatcher.execute(&target, action, None).await;
    if let (true, Some(id)) = (result.success, instance_id) {
        state.activity.touch(id);
    }
    ActionOutcome::Dispatched(result)
}

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    challenge: Option<String>,
    #[serde(default)]
    event: Option<MessageEvent>,
}

#[derive(Debug, Deserialize)]
struct MessageEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    bot_id: Option<String>,
    #[serde(default)]
    thread_ts: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

/// A human reply inside a notification thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadReply {
    pub thread_ts: String,
    pub text: String,
}

impl ThreadReply {
    fn from_event(event: &MessageEvent) -> Option<Self> {
        if event.kind != "message" || event.subtype.is_some() || event.bot_id.is_some() {
            return None;
        }
        let thread_ts = event.thread_ts.as_deref()?;
        // The thread parent has ts == thread_ts; only replies count.
        if event.ts.as_deref() == Some(thread_ts) {
            return None;
        }
        let text = unescape_slack_text(event.text.as_deref()?.trim());
        if text.is_empty() {
            return None;
        }
        Some(Self {
            thread_ts: thread_ts.to_string(),
            text,
        })
    }
}

/// Slack escapes `&`, `<` and `>` in message text; type what the user typed.
fn unescape_slack_text(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// HTTP POST handler for `/slack/events` (Events API).
pub async fn slack_events_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let envelope: EventEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            debug!(
                component = "webhook",
                event = "webhook.event_malformed",
                error = %e,
            );
            return StatusCode::OK.into_response();
        }
    };

    if envelope.kind == "url_verification" {
        let challenge = envelope.challenge.unwrap_or_default();
        return Json(json!({ "challenge": challenge })).into_response();
    }

    // A redelivery would type the same reply twice.
    if let Some(retry) = headers.get("x-slack-retry-num") {
        debug!(
            component = "webhook",
            event = "webhook.retry_ignored",
            retry = ?retry,
        );
        return StatusCode::OK.into_response();
    }

    if envelope.kind != "event_callback" {
        return StatusCode::OK.into_response();
    }
    let Some(reply) = envelope.event.as_ref().and_then(ThreadReply::from_event) else {
        return StatusCode::OK.into_response();
    };

    tokio::spawn(async move {
        let outcome = handle_thread_reply(&reply, &state).await;
        log_outcome("thread_reply", &outcome);
    });

    StatusCode::OK.into_response()
}

pub async fn handle_thread_reply(reply: &ThreadReply, state: &AppState) -> ActionOutcome {
    let Some(mapping) = state.threads.get(&reply.thread_ts) else {
        return ActionOutcome::Ignored("untracked thread");
    };

    let target = FocusTarget::Url(mapping.focus_url.clone());
    let result = state
        .dispatcher
        .execute(&target, FocusAction::Focus, Some(&reply.text))
        .await;
    if result.success {
        state.activity.touch(&mapping.instance_id);
    }
    ActionOutcome::Dispatched(result)
}

fn log_outcome(source: &'static str, outcome: &ActionOutcome) {
    match outcome {
        ActionOutcome::Dispatched(result) if result.success => info!(
            component = "webhook",
            event = "webhook.dispatched",
            source = source,
            message = %result.message,
        ),
        ActionOutcome::Dispatched(result) => warn!(
            component = "webhook",
            event = "webhook.dispatch_failed",
            source = source,
            error = %result.message,
        ),
        ActionOutcome::InvalidAction(action) => warn!(
            component = "webhook",
            event = "webhook.invalid_action",
            source = source,
            action = %action,
        ),
        ActionOutcome::SessionNotFound(id) => info!(
            component = "webhook",
            event = "webhook.session_not_found",
            source = source,
            error = %FocusError::SessionNotFound(id.clone()),
        ),
        ActionOutcome::Ignored(reason) => debug!(
            component = "webhook",
            event = "webhook.ignored",
            source = source,
            reason = reason,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FocusConfig, ReverseLink, SshSettings, TmuxSettings};
    use crate::test_support::{fake_executable, invocations};
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use std::path::Path;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_state(dir: &Path, signing_secret: Option<&str>) -> Arc<AppState> {
        let tmux = fake_executable(dir, "tmux", "exit 0");
        let ssh = fake_executable(dir, "ssh", "exit 0");
        let helper = fake_executable(dir, "helper", "exit 0");
        std::fs::write(dir.join("default"), "").unwrap();
        std::fs::create_dir_all(dir.join("instances")).unwrap();
        std::fs::create_dir_all(dir.join("threads")).unwrap();

        let config = FocusConfig {
            data_dir: dir.to_path_buf(),
            instances_dir: dir.join("instances"),
            threads_dir: dir.join("threads"),
            activity_dir: dir.join("activity"),
            helper_path: helper,
            helper_timeout: Duration::from_secs(5),
            remote_helper_path: ".claude-focus/bin/claude-focus-helper".to_string(),
            tmux: TmuxSettings {
                binary: tmux.to_string_lossy().into_owned(),
                socket: dir.join("default"),
                command_timeout: Duration::from_secs(5),
            },
            ssh: SshSettings {
                binary: ssh.to_string_lossy().into_owned(),
                connect_timeout: Duration::from_secs(1),
            },
            reverse_link: ReverseLink::Absent,
            signing_secret: signing_secret.map(str::to_string),
        };
        Arc::new(AppState::new(Arc::new(config)))
    }

    fn register_tmux_session(dir: &Path, id: &str) {
        let body = json!({
            "id": id,
            "name": "api",
            "hostname": "devbox",
            "terminalType": "tmux",
            "terminalTarget": "main:0.0",
            "focusUrl": "claude-focus://tmux/main:0.0",
            "registeredAt": "2024-05-01T10:00:00Z",
        });
        std::fs::write(dir.join("instances").join(format!("{id}.json")), body.to_string()).unwrap();
    }

    fn block_actions(value: &str) -> String {
        json!({
            "type": "block_actions",
            "actions": [{ "action_id": "focus", "value": value }],
        })
        .to_string()
    }

    fn form_body(payload: &str) -> String {
        format!("payload={}", urlencoding::encode(payload))
    }

    fn form_request(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/slack/actions")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    #[test]
    fn action_value_splits_on_last_pipe() {
        assert_eq!(
            split_action_value("url:claude-focus://a/b|c|continue"),
            Some(("url:claude-focus://a/b|c", "continue"))
        );
        assert_eq!(split_action_value("abc123|1"), Some(("abc123", "1")));
        assert_eq!(split_action_value("abc123"), None);
    }

    #[tokio::test]
    async fn missing_payload_field_is_400() {
        let tmp = tempfile::tempdir().unwrap();
        let app = router(test_state(tmp.path(), None));
        let response = app
            .oneshot(form_request("token=abc".to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn payload_field_takes_the_first_occurrence() {
        assert_eq!(
            payload_field(b"token=x&payload=%7B%7D&payload=second").unwrap(),
            Some("{}".to_string())
        );
        assert_eq!(payload_field(b"token=x").unwrap(), None);
        assert_eq!(payload_field(b"").unwrap(), None);
    }

    #[tokio::test]
    async fn form_quirks_are_still_acknowledged() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path(), None);

        let no_content_type = Request::builder()
            .method("POST")
            .uri("/slack/actions")
            .body(Body::from("payload=%7B%7D"))
            .unwrap();
        let response = router(state.clone()).oneshot(no_content_type).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let duplicate = form_request("payload=%7B%7D&payload=%7B%7D".to_string());
        let response = router(state.clone()).oneshot(duplicate).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json_body = Request::builder()
            .method("POST")
            .uri("/slack/actions")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"payload":"{}"}"#))
            .unwrap();
        let response = router(state).oneshot(json_body).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_payload_json_is_acknowledged() {
        let tmp = tempfile::tempdir().unwrap();
        let app = router(test_state(tmp.path(), None));
        let response = app
            .oneshot(form_request(form_body("{not json")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_session_is_acknowledged_without_adapter_call() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path(), None);
        let app = router(state.clone());

        let response = app
            .oneshot(form_request(form_body(&block_actions("abc123|continue"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let outcome = handle_action_payload(&block_actions("abc123|continue"), &state).await;
        assert_eq!(outcome, ActionOutcome::SessionNotFound("abc123".to_string()));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(invocations(tmp.path(), "tmux").is_empty());
        assert!(invocations(tmp.path(), "helper").is_empty());
    }

    #[tokio::test]
    async fn invalid_action_is_acknowledged_and_dropped() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path(), None);
        register_tmux_session(tmp.path(), "4242");

        let response = router(state.clone())
            .oneshot(form_request(form_body(&block_actions("4242|approve"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let outcome = handle_action_payload(&block_actions("4242|approve"), &state).await;
        assert_eq!(outcome, ActionOutcome::InvalidAction("approve".to_string()));
        assert!(invocations(tmp.path(), "tmux").is_empty());
    }

    #[tokio::test]
    async fn non_block_actions_are_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path(), None);
        let payload = json!({ "type": "view_submission", "actions": [] }).to_string();
        assert_eq!(
            handle_action_payload(&payload, &state).await,
            ActionOutcome::Ignored("not a block_actions payload")
        );
        let empty = json!({ "type": "block_actions", "actions": [] }).to_string();
        assert_eq!(
            handle_action_payload(&empty, &state).await,
            ActionOutcome::Ignored("no action value")
        );
    }

    #[tokio::test]
    async fn registered_session_is_focused_and_touched() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path(), None);
        register_tmux_session(tmp.path(), "4242");

        let outcome = handle_action_payload(&block_actions("4242|focus"), &state).await;
        match outcome {
            ActionOutcome::Dispatched(result) => assert!(result.success, "{}", result.message),
            other => panic!("expected dispatch, got {other:?}"),
        }
        let calls = invocations(tmp.path(), "tmux");
        assert!(calls.last().unwrap().ends_with("select-pane -t main:0.0"));
        assert!(tmp.path().join("activity").join("4242").exists());
    }

    #[tokio::test]
    async fn direct_url_selector_bypasses_registry() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path(), None);
        let encoded = urlencoding::encode("claude-focus://iterm2/ABCD-1234");
        let value = format!("url:{encoded}|2");

        let outcome = handle_action_payload(&block_actions(&value), &state).await;
        assert!(matches!(outcome, ActionOutcome::Dispatched(ref r) if r.success));
        assert_eq!(
            invocations(tmp.path(), "helper"),
            vec!["claude-focus://iterm2/ABCD-1234?action=focus&text=2"]
        );
    }

    #[tokio::test]
    async fn url_verification_echoes_challenge() {
        let tmp = tempfile::tempdir().unwrap();
        let app = router(test_state(tmp.path(), None));
        let request = Request::builder()
            .method("POST")
            .uri("/slack/events")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({ "type": "url_verification", "challenge": "3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P" }).to_string(),
            ))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body["challenge"],
            "3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P"
        );
    }

    #[test]
    fn only_human_thread_replies_count() {
        let event = |extra: Value| -> MessageEvent {
            let mut base = json!({
                "type": "message",
                "thread_ts": "1712345678.000100",
                "ts": "1712345699.000200",
                "text": "run the migration &amp; report",
            });
            if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
                for (k, v) in extra {
                    base.insert(k.clone(), v.clone());
                }
            }
            serde_json::from_value(base).unwrap()
        };

        let reply = ThreadReply::from_event(&event(json!({}))).unwrap();
        assert_eq!(reply.text, "run the migration & report");

        assert!(ThreadReply::from_event(&event(json!({ "bot_id": "B01" }))).is_none());
        assert!(ThreadReply::from_event(&event(json!({ "subtype": "message_changed" }))).is_none());
        assert!(ThreadReply::from_event(&event(json!({ "ts": "1712345678.000100" }))).is_none());
        assert!(ThreadReply::from_event(&event(json!({ "thread_ts": null }))).is_none());
        assert!(ThreadReply::from_event(&event(json!({ "text": "   " }))).is_none());
    }

    #[tokio::test]
    async fn thread_reply_types_into_mapped_session() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path(), None);
        std::fs::write(
            tmp.path().join("threads").join("1712345678.000100.json"),
            json!({
                "threadTs": "1712345678.000100",
                "instanceId": "4242",
                "focusUrl": "claude-focus://tmux/main:0.0",
                "termType": "tmux",
            })
            .to_string(),
        )
        .unwrap();

        let reply = ThreadReply {
            thread_ts: "1712345678.000100".to_string(),
            text: "yes, ship it".to_string(),
        };
        let outcome = handle_thread_reply(&reply, &state).await;
        assert!(matches!(outcome, ActionOutcome::Dispatched(ref r) if r.success));
        assert!(invocations(tmp.path(), "tmux")
            .iter()
            .any(|c| c.ends_with("send-keys -t main:0.0 -l -- yes, ship it")));
        assert!(tmp.path().join("activity").join("4242").exists());

        let untracked = ThreadReply {
            thread_ts: "1700000000.000001".to_string(),
            text: "hello".to_string(),
        };
        assert_eq!(
            handle_thread_reply(&untracked, &state).await,
            ActionOutcome::Ignored("untracked thread")
        );
    }

    #[tokio::test]
    async fn retried_events_are_not_replayed() {
        let tmp = tempfile::tempdir().unwrap();
        let app = router(test_state(tmp.path(), None));
        let request = Request::builder()
            .method("POST")
            .uri("/slack/events")
            .header("content-type", "application/json")
            .header("x-slack-retry-num", "1")
            .body(Body::from(
                json!({
                    "type": "event_callback",
                    "event": {
                        "type": "message",
                        "thread_ts": "1712345678.000100",
                        "ts": "1712345699.000200",
                        "text": "hello",
                    }
                })
                .to_string(),
            ))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(invocations(tmp.path(), "tmux").is_empty());
    }

    #[tokio::test]
    async fn signing_secret_gates_slack_routes_only() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path(), Some("shhh"));

        let response = router(state.clone())
            .oneshot(form_request(form_body(&block_actions("abc123|focus"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = form_body(&block_actions("abc123|focus"));
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs()
            .to_string();
        let signature = crate::auth::sign("shhh", &timestamp, body.as_bytes());
        let request = Request::builder()
            .method("POST")
            .uri("/slack/actions")
            .header("content-type", "application/x-www-form-urlencoded")
            .header("x-slack-request-timestamp", &timestamp)
            .header("x-slack-signature", &signature)
            .body(Body::from(body))
            .unwrap();
        let response = router(state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let health = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = router(state).oneshot(health).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
