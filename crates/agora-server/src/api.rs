use std::sync::Arc;

use agora_shared::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use agora_shared::{ConversationId, MessageId, UserId};
use agora_store::{Conversation, Message, UserStatus};
use axum::{
    extract::{ws::WebSocketUpgrade, Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::{bearer_token, TokenVerifier};
use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::error::ServerError;
use crate::registry::ConnectionRegistry;
use crate::session;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConnectionRegistry>,
    pub store: Store,
    pub dispatcher: Dispatcher,
    /// `None` when no `JWT_SECRET` is configured.
    pub verifier: Option<TokenVerifier>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(store: Store, config: ServerConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let dispatcher = Dispatcher::new(Arc::clone(&registry), store.clone());
        let verifier = config.jwt_secret.as_deref().map(TokenVerifier::new);
        Self {
            registry,
            store,
            dispatcher,
            verifier,
            config: Arc::new(config),
        }
    }

    /// Check the bearer token when verification is enabled.
    fn authorize(&self, headers: &HeaderMap) -> Result<Option<UserId>, ServerError> {
        match &self.verifier {
            Some(verifier) => {
                let token = bearer_token(headers)
                    .ok_or_else(|| ServerError::Unauthorized("missing bearer token".into()))?;
                verifier.verify(token).map(Some)
            }
            None => Ok(None),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(ws_upgrade))
        .route("/conversations/start", post(start_conversation))
        .route("/conversations/group", post(create_group))
        .route(
            "/conversations/{id}",
            get(get_conversation).delete(delete_conversation),
        )
        .route("/conversations/{id}/messages", get(get_messages))
        .route("/conversations/{id}/messages/{sender}", post(send_message))
        .route("/messages/delete", delete(delete_message))
        .route("/messages/{id}", patch(edit_message))
        .route("/users/{id}/conversations", get(get_user_conversations))
        .route("/users/{id}/status", get(get_status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    connections: usize,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        connections: state.registry.len(),
    })
}

// ---------------------------------------------------------------------------
// Realtime upgrade
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct WsParams {
    #[serde(rename = "userID")]
    user_id: Option<String>,
    token: Option<String>,
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
) -> Result<Response, ServerError> {
    let raw = params
        .user_id
        .ok_or_else(|| ServerError::BadRequest("missing userID".into()))?;
    let user = parse_user_id(&raw)?;

    let authenticated = match &state.verifier {
        Some(verifier) => {
            let token = params.token.as_deref().or_else(|| bearer_token(&headers));
            if let Err(e) = verifier.verify_for(token, user) {
                warn!(user = %user.short(), error = %e, "rejected realtime upgrade");
                return Err(e);
            }
            true
        }
        None => false,
    };

    let max_frame = state.config.max_frame_size;
    Ok(ws
        .max_message_size(max_frame)
        .max_frame_size(max_frame)
        .on_upgrade(move |socket| session::run(socket, user, authenticated, state)))
}

// ---------------------------------------------------------------------------
// Conversations
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct StartConversationRequest {
    #[serde(rename = "senderID")]
    sender_id: UserId,
    #[serde(rename = "recipientID")]
    recipient_id: UserId,
}

#[derive(Serialize)]
struct StartConversationResponse {
    #[serde(rename = "conversationID")]
    conversation_id: ConversationId,
}

async fn start_conversation(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<StartConversationRequest>,
) -> Result<(StatusCode, Json<StartConversationResponse>), ServerError> {
    if let Some(caller) = state.authorize(&headers)? {
        if caller != req.sender_id {
            return Err(ServerError::Forbidden("senderID does not match token".into()));
        }
    }

    let (conversation, created) = state
        .store
        .find_or_create_direct_conversation(req.sender_id, req.recipient_id)
        .await?;

    if created {
        info!(conversation = %conversation.id, "direct conversation started");
    }
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(StartConversationResponse {
            conversation_id: conversation.id,
        }),
    ))
}

#[derive(Deserialize)]
struct CreateGroupRequest {
    #[serde(default)]
    name: Option<String>,
    participants: Vec<UserId>,
}

async fn create_group(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<Conversation>), ServerError> {
    if let Some(caller) = state.authorize(&headers)? {
        if !req.participants.contains(&caller) {
            return Err(ServerError::Forbidden("caller must be a participant".into()));
        }
    }

    let conversation = state
        .store
        .create_group_conversation(req.name, req.participants)
        .await?;
    info!(
        conversation = %conversation.id,
        participants = conversation.participants.len(),
        "group conversation created"
    );
    Ok((StatusCode::CREATED, Json(conversation)))
}

fn parse_conversation_id(raw: &str) -> Result<ConversationId, ServerError> {
    ConversationId::from_hex(raw).map_err(|e| ServerError::BadRequest(e.to_string()))
}

/// Load a conversation the caller is allowed to see.
async fn visible_conversation(
    state: &AppState,
    headers: &HeaderMap,
    id: ConversationId,
) -> Result<Conversation, ServerError> {
    let caller = state.authorize(headers)?;
    let conversation = state.store.get_conversation(id).await?;
    if let Some(caller) = caller {
        if !conversation.has_participant(caller) {
            return Err(ServerError::Forbidden("not a participant".into()));
        }
    }
    Ok(conversation)
}

async fn get_conversation(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, ServerError> {
    let id = parse_conversation_id(&id)?;
    Ok(Json(visible_conversation(&state, &headers, id).await?))
}

#[derive(Deserialize)]
struct PageParams {
    limit: Option<u32>,
    offset: Option<u32>,
}

async fn get_messages(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(page): Query<PageParams>,
) -> Result<Json<Vec<Message>>, ServerError> {
    let id = parse_conversation_id(&id)?;
    visible_conversation(&state, &headers, id).await?;

    let limit = page.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = page.offset.unwrap_or(0);
    let messages = state.store.get_messages(id, limit, offset).await?;
    Ok(Json(messages))
}

async fn delete_conversation(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let id = parse_conversation_id(&id)?;
    visible_conversation(&state, &headers, id).await?;

    let deleted = state.store.delete_conversation(id).await?;
    info!(conversation = %id, deleted, "conversation deleted");
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

fn parse_user_id(raw: &str) -> Result<UserId, ServerError> {
    UserId::from_hex(raw).map_err(|e| ServerError::BadRequest(e.to_string()))
}

fn parse_message_id(raw: &str) -> Result<MessageId, ServerError> {
    MessageId::from_hex(raw).map_err(|e| ServerError::BadRequest(e.to_string()))
}

#[derive(Deserialize)]
struct SendMessageRequest {
    content: String,
    #[serde(default)]
    attachments: Vec<String>,
}

/// Save a message and push it to the conversation's connected participants,
/// exactly as a realtime `send_message` frame would.
async fn send_message(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path((id, sender)): Path<(String, String)>,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ServerError> {
    let conversation_id = parse_conversation_id(&id)?;
    let sender_id = parse_user_id(&sender)?;
    if let Some(caller) = state.authorize(&headers)? {
        if caller != sender_id {
            return Err(ServerError::Forbidden("senderID does not match token".into()));
        }
    }

    let message = state
        .store
        .save_message(sender_id, conversation_id, req.content, req.attachments)
        .await?;
    let report = state.dispatcher.message_created(&message).await;
    info!(
        conversation = %conversation_id,
        message = %message.id,
        delivered = report.delivered,
        "message sent over HTTP"
    );
    Ok((StatusCode::CREATED, Json(message)))
}

#[derive(Deserialize)]
struct EditMessageRequest {
    #[serde(rename = "newContent")]
    new_content: String,
}

async fn edit_message(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<EditMessageRequest>,
) -> Result<Json<Message>, ServerError> {
    let message_id = parse_message_id(&id)?;
    let caller = state.authorize(&headers)?;
    let original = state.store.get_message(message_id).await?;
    visible_conversation(&state, &headers, original.conversation_id).await?;

    let editor = caller.unwrap_or(original.sender_id);
    let message = state
        .store
        .save_edited_message(message_id, req.new_content, original.conversation_id, editor)
        .await?;
    state.dispatcher.message_edited(&message).await;
    Ok(Json(message))
}

#[derive(Deserialize)]
struct DeleteMessageRequest {
    id: String,
}

async fn delete_message(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<DeleteMessageRequest>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let message_id = parse_message_id(&req.id)?;
    state.authorize(&headers)?;
    let message = state.store.get_message(message_id).await?;
    visible_conversation(&state, &headers, message.conversation_id).await?;

    state.store.delete_message(message_id).await?;
    info!(
        conversation = %message.conversation_id,
        message = %message_id,
        "message deleted"
    );
    Ok(Json(serde_json::json!({ "deleted": true })))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Every conversation the user takes part in, most recently active first.
async fn get_user_conversations(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Conversation>>, ServerError> {
    let user = parse_user_id(&id)?;
    if let Some(caller) = state.authorize(&headers)? {
        if caller != user {
            return Err(ServerError::Forbidden("cannot list another user's conversations".into()));
        }
    }
    Ok(Json(state.store.get_conversations(user).await?))
}

async fn get_status(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ServerError> {
    state.authorize(&headers)?;
    let user = parse_user_id(&id)?;
    let status: Option<UserStatus> = state.store.get_user_status(user).await?;
    match status {
        Some(status) => Ok(Json(status).into_response()),
        None => Err(ServerError::NotFound(format!("no status for {user}"))),
    }
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve_on(listener, state).await
}

/// Serve on an already bound listener.
pub async fn serve_on(listener: tokio::net::TcpListener, state: AppState) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %listener.local_addr()?, "Starting HTTP API server");

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::auth::Claims;
    use crate::registry::Connection;

    fn token_for(user: UserId, secret: &str) -> String {
        let claims = Claims {
            id: user.to_hex(),
            exp: Some(jsonwebtoken::get_current_timestamp() + 3600),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn with_bearer(mut req: Request<Body>, token: &str) -> Request<Body> {
        req.headers_mut()
            .insert("authorization", format!("Bearer {token}").parse().unwrap());
        req
    }

    fn state_with(secret: Option<&str>) -> AppState {
        let config = ServerConfig {
            jwt_secret: secret.map(str::to_string),
            ..ServerConfig::default()
        };
        AppState::new(Store::open_in_memory().unwrap(), config)
    }

    async fn call(state: &AppState, req: Request<Body>) -> (StatusCode, Value) {
        let resp = build_router(state.clone()).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        json_request(Method::POST, uri, body)
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_connections() {
        let state = state_with(None);
        let (status, body) = call(&state, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["connections"], 0);
    }

    #[tokio::test]
    async fn start_conversation_is_idempotent() {
        let state = state_with(None);
        let (a, b) = (UserId::new(), UserId::new());
        let body = json!({ "senderID": a.to_hex(), "recipientID": b.to_hex() });

        let (status, first) = call(&state, post_json("/conversations/start", body.clone())).await;
        assert_eq!(status, StatusCode::CREATED);

        let swapped = json!({ "senderID": b.to_hex(), "recipientID": a.to_hex() });
        let (status, second) = call(&state, post_json("/conversations/start", swapped)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["conversationID"], second["conversationID"]);
    }

    #[tokio::test]
    async fn conversation_lifecycle() {
        let state = state_with(None);
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());

        let (status, group) = call(
            &state,
            post_json(
                "/conversations/group",
                json!({ "name": "trio", "participants": [a.to_hex(), b.to_hex(), c.to_hex()] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(group["isGroup"], true);
        let id = group["id"].as_str().unwrap().to_string();

        let conv_id = ConversationId::from_hex(&id).unwrap();
        state.store.save_message(a, conv_id, "hey".into(), vec![]).await.unwrap();

        let (status, messages) = call(
            &state,
            Request::get(format!("/conversations/{id}/messages?limit=10"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(messages[0]["content"], "hey");

        let (status, fetched) = call(
            &state,
            Request::get(format!("/conversations/{id}")).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["lastMessage"]["content"], "hey");

        let (status, deleted) = call(
            &state,
            Request::delete(format!("/conversations/{id}")).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["deleted"], true);

        let (status, err) = call(
            &state,
            Request::get(format!("/conversations/{id}")).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(err["error"].is_string());
    }

    #[tokio::test]
    async fn bad_identifiers_are_rejected() {
        let state = state_with(None);
        let (status, _) = call(
            &state,
            Request::get("/conversations/not-hex").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &state,
            post_json(
                "/conversations/group",
                json!({ "participants": [UserId::new().to_hex()] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn tokens_are_enforced_when_configured() {
        let secret = "rest-secret";
        let state = state_with(Some(secret));
        let (a, b) = (UserId::new(), UserId::new());
        let body = json!({ "senderID": a.to_hex(), "recipientID": b.to_hex() });

        let (status, _) = call(&state, post_json("/conversations/start", body.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = token_for(a, secret);
        let req = with_bearer(post_json("/conversations/start", body), &token);
        let (status, _) = call(&state, req).await;
        assert_eq!(status, StatusCode::CREATED);

        let never_expires = encode(
            &Header::default(),
            &Claims { id: a.to_hex(), exp: None },
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();
        let req = Request::get(format!("/users/{a}/conversations"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = call(&state, with_bearer(req, &never_expires)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let req = Request::get(format!("/users/{a}/conversations"))
            .body(Body::empty())
            .unwrap();
        let (status, list) = call(&state, with_bearer(req, &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);

        let req = Request::get(format!("/users/{b}/conversations"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = call(&state, with_bearer(req, &token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (conv, _) = state.store.find_or_create_direct_conversation(a, b).await.unwrap();
        let uri = format!("/conversations/{}/messages/{b}", conv.id);
        let req = with_bearer(post_json(&uri, json!({ "content": "as b" })), &token);
        let (status, _) = call(&state, req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn sent_message_reaches_connected_participants() {
        let state = state_with(None);
        let (a, b) = (UserId::new(), UserId::new());
        let (conv, _) = state.store.find_or_create_direct_conversation(a, b).await.unwrap();

        let (connection, mut rx) = Connection::channel(b, 8);
        state.registry.register(connection);

        let (status, sent) = call(
            &state,
            post_json(
                &format!("/conversations/{}/messages/{a}", conv.id),
                json!({ "content": "over http", "attachments": ["file-1"] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(sent["content"], "over http");
        assert_eq!(sent["senderID"], a.to_hex());
        assert_eq!(sent["attachments"][0], "file-1");

        let frame: Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(frame["type"], "conversations_update");
        assert_eq!(frame["message"]["id"], sent["id"]);

        let stored = state.store.get_conversation(conv.id).await.unwrap();
        assert_eq!(stored.last_message.unwrap().content, "over http");

        let (status, _) = call(
            &state,
            post_json(
                &format!("/conversations/{}/messages/{a}", ConversationId::new()),
                json!({ "content": "lost" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn edit_then_delete_last_message() {
        let state = state_with(None);
        let (a, b) = (UserId::new(), UserId::new());
        let (conv, _) = state.store.find_or_create_direct_conversation(a, b).await.unwrap();
        let first = state.store.save_message(a, conv.id, "first".into(), vec![]).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let second = state.store.save_message(b, conv.id, "secnod".into(), vec![]).await.unwrap();

        let (connection, mut rx) = Connection::channel(a, 8);
        state.registry.register(connection);

        let (status, edited) = call(
            &state,
            json_request(
                Method::PATCH,
                &format!("/messages/{}", second.id),
                json!({ "newContent": "second" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(edited["content"], "second");
        assert_eq!(edited["isEdited"], true);

        let frame: Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(frame["id"], second.id.to_hex());
        assert_eq!(frame["content"], "second");

        let (status, deleted) = call(
            &state,
            json_request(
                Method::DELETE,
                "/messages/delete",
                json!({ "id": second.id.to_hex() }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["deleted"], true);

        let (status, fetched) = call(
            &state,
            Request::get(format!("/conversations/{}", conv.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["lastMessage"]["id"], first.id.to_hex());
        assert_eq!(fetched["lastMessage"]["content"], "first");

        let (status, list) = call(
            &state,
            Request::get(format!("/users/{b}/conversations"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list[0]["lastMessage"]["content"], "first");
    }

    #[tokio::test]
    async fn message_routes_reject_bad_and_missing_ids() {
        let state = state_with(None);

        let (status, _) = call(
            &state,
            json_request(Method::PATCH, "/messages/nope", json!({ "newContent": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &state,
            json_request(
                Method::PATCH,
                &format!("/messages/{}", MessageId::new()),
                json!({ "newContent": "x" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(
            &state,
            json_request(
                Method::DELETE,
                "/messages/delete",
                json!({ "id": MessageId::new().to_hex() }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(
            &state,
            post_json(
                &format!("/conversations/{}/messages/not-a-user", ConversationId::new()),
                json!({ "content": "x" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn status_lookup() {
        let state = state_with(None);
        let a = UserId::new();
        let uri = format!("/users/{}/status", a.to_hex());

        let (status, _) = call(&state, Request::get(&uri).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        state.store.update_user_status(a, "online".into()).await.unwrap();
        let (status, body) = call(&state, Request::get(&uri).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "online");
    }
}
