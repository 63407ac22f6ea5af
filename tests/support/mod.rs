//! In-process mock of the chat backend (REST + WebSocket).

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use agent_chat_client::Client;
use axum::{
    Form, Json, Router,
    extract::{
        Path, Query, State,
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "secret";
pub const FULL_NAME: &str = "Alice Liddell";

/// Sending this text makes the assistant answer with the outage sentinel.
pub const OUTAGE_TRIGGER: &str = "please fail";

type ApiError = (StatusCode, Json<Value>);
type ApiResult = Result<Json<Value>, ApiError>;

struct User {
    password: String,
    full_name: Option<String>,
    email: Option<String>,
}

struct Conversation {
    id: String,
    owner: String,
    title: String,
    messages: Vec<(&'static str, String)>,
}

#[derive(Default)]
struct Db {
    users: HashMap<String, User>,
    tokens: HashMap<String, String>,
    conversations: Vec<Conversation>,
    socket_attempts: usize,
}

type Shared = Arc<Mutex<Db>>;

/// A running mock backend; stops when dropped.
pub struct MockServer {
    pub addr: SocketAddr,
    db: Shared,
    handle: JoinHandle<()>,
}

impl MockServer {
    pub async fn start() -> Self {
        let mut db = Db::default();
        db.users.insert(
            USERNAME.into(),
            User {
                password: PASSWORD.into(),
                full_name: Some(FULL_NAME.into()),
                email: Some("alice@example.com".into()),
            },
        );
        let db: Shared = Arc::new(Mutex::new(db));

        let api = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/signup", post(signup))
            .route("/auth/me", get(me))
            .route("/chat/conversations", get(list_conversations))
            .route("/chat/conversations/{id}", delete(delete_conversation))
            .route("/chat/conversations/{id}/history", get(history))
            .route("/chat/conversations/{id}/rename", put(rename))
            .route("/chat/message", post(message))
            .route("/chat/models", get(models))
            .route("/health/", get(health))
            .route("/health/status", get(status));

        let app = Router::new()
            .nest("/api/v1", api)
            .route("/ws/{kind}", get(socket))
            .with_state(Arc::clone(&db));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("local addr");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock backend");
        });

        Self { addr, db, handle }
    }

    pub fn api_url(&self) -> String {
        format!("http://{}/api/v1", self.addr)
    }

    /// Client with in-memory storage pointed at this server.
    pub fn client(&self) -> Client {
        Client::new(self.api_url()).expect("client")
    }

    /// Title as stored server-side.
    pub fn stored_title(&self, conversation_id: &str) -> Option<String> {
        let db = self.db.lock().unwrap();
        db.conversations
            .iter()
            .find(|c| c.id == conversation_id)
            .map(|c| c.title.clone())
    }

    /// Socket handshakes attempted, rejected ones included.
    pub fn socket_attempts(&self) -> usize {
        self.db.lock().unwrap().socket_attempts
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Client that is already logged in as alice.
pub async fn logged_in_client(server: &MockServer) -> Client {
    let client = server.client();
    client
        .auth()
        .login(USERNAME, PASSWORD)
        .await
        .expect("login as alice");
    client
}

fn detail(status: StatusCode, message: &str) -> ApiError {
    (status, Json(json!({ "detail": message })))
}

fn bearer_user(db: &Db, headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| db.tokens.get(token))
        .cloned()
        .ok_or_else(|| detail(StatusCode::UNAUTHORIZED, "Could not validate credentials"))
}

fn user_json(username: &str, user: &User) -> Value {
    json!({
        "username": username,
        "full_name": user.full_name,
        "email": user.email,
        "disabled": false,
    })
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login(State(db): State<Shared>, Form(form): Form<LoginForm>) -> ApiResult {
    let mut db = db.lock().unwrap();
    let valid = db
        .users
        .get(&form.username)
        .is_some_and(|u| u.password == form.password);
    if !valid {
        return Err(detail(
            StatusCode::UNAUTHORIZED,
            "Incorrect username or password",
        ));
    }
    let access = uuid::Uuid::new_v4().to_string();
    db.tokens.insert(access.clone(), form.username);
    Ok(Json(json!({
        "access_token": access,
        "refresh_token": uuid::Uuid::new_v4().to_string(),
        "token_type": "bearer",
    })))
}

#[derive(Deserialize)]
struct SignupBody {
    username: String,
    password: String,
    full_name: Option<String>,
    email: Option<String>,
}

async fn signup(State(db): State<Shared>, Json(body): Json<SignupBody>) -> ApiResult {
    let mut db = db.lock().unwrap();
    if db.users.contains_key(&body.username) {
        return Err(detail(
            StatusCode::BAD_REQUEST,
            "Username already registered",
        ));
    }
    let user = User {
        password: body.password,
        full_name: body.full_name,
        email: body.email,
    };
    let out = user_json(&body.username, &user);
    db.users.insert(body.username, user);
    Ok(Json(out))
}

async fn me(State(db): State<Shared>, headers: HeaderMap) -> ApiResult {
    let db = db.lock().unwrap();
    let username = bearer_user(&db, &headers)?;
    let user = &db.users[&username];
    Ok(Json(user_json(&username, user)))
}

async fn list_conversations(State(db): State<Shared>, headers: HeaderMap) -> ApiResult {
    let db = db.lock().unwrap();
    let username = bearer_user(&db, &headers)?;
    let conversations: Vec<Value> = db
        .conversations
        .iter()
        .filter(|c| c.owner == username)
        .map(|c| {
            json!({
                "id": c.id,
                "title": c.title,
                "created_at": "2024-05-01T10:00:00",
                "updated_at": "2024-05-01T10:05:00.123456",
                "message_count": c.messages.len(),
                "is_active": true,
            })
        })
        .collect();
    Ok(Json(json!({ "conversations": conversations })))
}

fn owned<'a>(db: &'a mut Db, username: &str, id: &str) -> Result<&'a mut Conversation, ApiError> {
    db.conversations
        .iter_mut()
        .find(|c| c.id == id && c.owner == username)
        .ok_or_else(|| detail(StatusCode::NOT_FOUND, "Conversation not found"))
}

async fn history(
    State(db): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult {
    let mut db = db.lock().unwrap();
    let username = bearer_user(&db, &headers)?;
    let conv = owned(&mut db, &username, &id)?;
    let messages: Vec<Value> = conv
        .messages
        .iter()
        .enumerate()
        .map(|(i, (kind, content))| {
            json!({
                "id": i + 1,
                "content": content,
                "message_type": kind,
                "timestamp": "2024-05-01T10:00:00",
            })
        })
        .collect();
    Ok(Json(json!({ "conversation_id": id, "messages": messages })))
}

async fn delete_conversation(
    State(db): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult {
    let mut db = db.lock().unwrap();
    let username = bearer_user(&db, &headers)?;
    owned(&mut db, &username, &id)?;
    db.conversations.retain(|c| c.id != id);
    Ok(Json(json!({ "message": "Conversation deleted" })))
}

#[derive(Deserialize)]
struct RenameBody {
    new_title: String,
}

async fn rename(
    State(db): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<RenameBody>,
) -> ApiResult {
    let mut db = db.lock().unwrap();
    let username = bearer_user(&db, &headers)?;
    if body.new_title.trim().is_empty() {
        return Err(detail(StatusCode::UNPROCESSABLE_ENTITY, "Title required"));
    }
    let conv = owned(&mut db, &username, &id)?;
    conv.title = body.new_title;
    Ok(Json(json!({ "message": "Conversation renamed" })))
}

#[derive(Deserialize)]
struct MessageBody {
    message: String,
    conversation_id: Option<String>,
    temperature: f32,
    model: Option<String>,
}

async fn message(
    State(db): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<MessageBody>,
) -> ApiResult {
    let mut db = db.lock().unwrap();
    let username = bearer_user(&db, &headers)?;
    assert!((0.0..=2.0).contains(&body.temperature));

    let id = match body.conversation_id {
        Some(id) => {
            owned(&mut db, &username, &id)?;
            id
        }
        None => {
            let id = uuid::Uuid::new_v4().to_string();
            db.conversations.push(Conversation {
                id: id.clone(),
                owner: username,
                title: body.message.chars().take(30).collect(),
                messages: Vec::new(),
            });
            id
        }
    };

    let reply = if body.message == OUTAGE_TRIGGER {
        "serviceUnavailable".to_string()
    } else {
        format!("echo: {}", body.message)
    };
    let conv = db
        .conversations
        .iter_mut()
        .find(|c| c.id == id)
        .expect("conversation exists");
    conv.messages.push(("user", body.message));
    conv.messages.push(("assistant", reply.clone()));

    Ok(Json(json!({
        "response": reply,
        "conversation_id": id,
        "model_used": body.model.unwrap_or_else(|| "mock-small".into()),
        "tokens_used": 7,
        "processing_time": 0.01,
    })))
}

async fn models() -> Json<Value> {
    Json(json!({
        "available_models": ["mock-small", "mock-large"],
        "default_model": "mock-small",
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": "test",
        "database": "connected",
        "websocket_connections": 0,
    }))
}

async fn status() -> Json<Value> {
    Json(json!({
        "app_name": "Mock Chat",
        "version": "test",
        "debug": true,
        "websocket_channels": { "chat": 0, "notifications": 0, "data": 0 },
        "total_connections": 0,
    }))
}

/// Rejects unknown tokens before the upgrade. Chat echoes, notifications
/// greets once, data emits three frames.
async fn socket(
    State(db): State<Shared>,
    Path(kind): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let authorized = {
        let mut db = db.lock().unwrap();
        db.socket_attempts += 1;
        params
            .get("token")
            .is_some_and(|token| db.tokens.contains_key(token))
    };
    if !authorized {
        return StatusCode::FORBIDDEN.into_response();
    }
    ws.on_upgrade(move |socket| serve_socket(socket, kind))
}

async fn serve_socket(mut socket: WebSocket, kind: String) {
    match kind.as_str() {
        "notifications" => {
            let _ = socket
                .send(WsMessage::Text(r#"{"type":"welcome"}"#.into()))
                .await;
        }
        "data" => {
            for i in 0..3 {
                let _ = socket
                    .send(WsMessage::Text(format!(r#"{{"point":{i}}}"#).into()))
                    .await;
            }
        }
        _ => {}
    }
    while let Some(Ok(frame)) = socket.recv().await {
        match frame {
            WsMessage::Text(text) => {
                if text.as_str() == "bye" {
                    let _ = socket.send(WsMessage::Close(None)).await;
                    break;
                }
                let reply = format!("echo: {}", text.as_str());
                if socket.send(WsMessage::Text(reply.into())).await.is_err() {
                    break;
                }
            }
            WsMessage::Close(_) => break,
            _ => {}
        }
    }
}
