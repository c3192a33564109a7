//! 服务器主逻辑

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use protocol::{
    Connection, ErrorCode, ErrorResponse, GameError, HttpRequest, HttpResponse, Listener,
    MatchCreated, MatchId, Method, MoveRequest, MoveResponse, ProtocolError, RegisterRequest,
    RegisterResponse, SharedMatch, SuccessResponse, DEFAULT_MATCH_ID, MAX_PLAYER_ID_LEN,
};

use crate::config::ServerConfig;
use crate::registry::MatchRegistry;

/// accept 失败后的退避时间
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

const WELCOME: &str = "Connect Four server. Routes: /status /register /board /make_move /new_game /history /matches\n";

/// 服务器状态
pub struct ServerState {
    pub config: ServerConfig,
    pub matches: MatchRegistry,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let matches = MatchRegistry::new(config.rows, config.columns, config.max_matches)?;
        Ok(Self { config, matches })
    }
}

/// 对局内的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Status,
    Register,
    Board,
    MakeMove,
    NewGame,
    History,
}

impl Action {
    fn parse(segment: &str) -> Option<Self> {
        match segment {
            "status" => Some(Action::Status),
            "register" => Some(Action::Register),
            "board" => Some(Action::Board),
            "make_move" => Some(Action::MakeMove),
            "new_game" => Some(Action::NewGame),
            "history" => Some(Action::History),
            _ => None,
        }
    }

    fn method(&self) -> Method {
        match self {
            Action::Status | Action::Board | Action::History => Method::Get,
            Action::Register | Action::MakeMove | Action::NewGame => Method::Post,
        }
    }
}

/// 路由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Welcome,
    Matches,
    Game { match_id: MatchId, action: Action },
}

impl Route {
    fn parse(path: &str) -> Option<Self> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Some(Route::Welcome),
            ["matches"] => Some(Route::Matches),
            ["matches", id, action] => Some(Route::Game {
                match_id: id.parse().ok()?,
                action: Action::parse(action)?,
            }),
            [action] => Some(Route::Game {
                match_id: DEFAULT_MATCH_ID,
                action: Action::parse(action)?,
            }),
            _ => None,
        }
    }
}

/// 请求处理器
pub struct RequestHandler;

impl RequestHandler {
    /// 处理一个请求
    pub fn handle(state: &ServerState, request: &HttpRequest) -> HttpResponse {
        debug!(method = ?request.method, path = %request.path, "收到请求");

        let Some(route) = Route::parse(&request.path) else {
            return error_response(404, ErrorCode::NotFound);
        };

        match route {
            Route::Welcome => match request.method {
                Method::Get => HttpResponse::text(200, WELCOME),
                _ => error_response(405, ErrorCode::MethodNotAllowed),
            },
            Route::Matches => Self::handle_matches(state, request),
            Route::Game { match_id, action } => {
                if request.method != action.method() {
                    return error_response(405, ErrorCode::MethodNotAllowed);
                }
                let Some(game) = state.matches.get(match_id) else {
                    return error_response(404, ErrorCode::MatchNotFound);
                };
                Self::handle_action(&game, action, request)
            }
        }
    }

    /// `GET /matches` 列表，`POST /matches` 创建
    fn handle_matches(state: &ServerState, request: &HttpRequest) -> HttpResponse {
        match request.method {
            Method::Get => json_response(200, &state.matches.list()),
            Method::Post => match state.matches.create() {
                Ok(match_id) => json_response(201, &MatchCreated { match_id }),
                Err(_) => error_response(429, ErrorCode::TooManyMatches),
            },
            _ => error_response(405, ErrorCode::MethodNotAllowed),
        }
    }

    fn handle_action(game: &SharedMatch, action: Action, request: &HttpRequest) -> HttpResponse {
        match action {
            Action::Status => json_response(200, &game.status()),
            Action::Board => json_response(200, &game.board_snapshot()),
            Action::History => json_response(200, &game.history()),
            Action::Register => Self::handle_register(game, request),
            Action::MakeMove => Self::handle_make_move(game, request),
            Action::NewGame => match game.restart() {
                Ok(()) => json_response(200, &SuccessResponse::ok()),
                Err(e) => game_error_response(&e),
            },
        }
    }

    fn handle_register(game: &SharedMatch, request: &HttpRequest) -> HttpResponse {
        let body: RegisterRequest = match parse_body(request) {
            Some(body) => body,
            None => return error_response(400, ErrorCode::BadRequest),
        };
        if !is_valid_player_id(&body.player_id) {
            return error_response(400, ErrorCode::BadRequest);
        }

        match game.register(body.player_id) {
            Ok(icon) => json_response(200, &RegisterResponse { icon }),
            Err(e) => game_error_response(&e),
        }
    }

    fn handle_make_move(game: &SharedMatch, request: &HttpRequest) -> HttpResponse {
        let body: MoveRequest = match parse_body(request) {
            Some(body) => body,
            None => return error_response(400, ErrorCode::BadRequest),
        };
        if !is_valid_player_id(&body.player_id) {
            return error_response(400, ErrorCode::BadRequest);
        }

        // 负数列号映射为越界列，仍按对局的前置检查顺序报错
        let column = usize::try_from(body.column).unwrap_or(usize::MAX);

        match game.make_move(column, &body.player_id) {
            Ok(outcome) => json_response(
                200,
                &MoveResponse {
                    success: true,
                    board: outcome.board,
                    status: outcome.status,
                },
            ),
            Err(e) => game_error_response(&e),
        }
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(request: &HttpRequest) -> Option<T> {
    match request.json() {
        Ok(body) => Some(body),
        Err(e) => {
            warn!(path = %request.path, error = %e, "请求体无效");
            None
        }
    }
}

fn is_valid_player_id(player_id: &str) -> bool {
    !player_id.is_empty() && player_id.chars().count() <= MAX_PLAYER_ID_LEN
}

fn json_response<T: Serialize>(status: u16, body: &T) -> HttpResponse {
    HttpResponse::json(status, body).unwrap_or_else(|e| {
        warn!(error = %e, "响应序列化失败");
        HttpResponse::text(500, "InternalError")
    })
}

fn error_response(status: u16, code: ErrorCode) -> HttpResponse {
    json_response(status, &ErrorResponse { error: code })
}

fn game_error_response(err: &GameError) -> HttpResponse {
    debug!(error = %err, "操作被拒绝");
    match ErrorCode::from(err) {
        ErrorCode::InternalError => error_response(500, ErrorCode::InternalError),
        code => error_response(400, code),
    }
}

/// 处理一条连接上的全部请求
pub async fn handle_connection<C: Connection>(mut conn: C, state: Arc<ServerState>) {
    let peer = conn.peer_addr().unwrap_or_else(|| "unknown".to_string());
    debug!(%peer, "连接建立");

    loop {
        match conn.recv_request().await {
            Ok(Some(request)) => {
                let keep_alive = !request.wants_close();
                let response = RequestHandler::handle(&state, &request);
                if let Err(e) = conn.send_response(&response, keep_alive).await {
                    warn!(%peer, error = %e, "发送响应失败");
                    break;
                }
                if !keep_alive {
                    break;
                }
            }
            Ok(None) => break,
            Err(ProtocolError::ConnectionClosed) => break,
            Err(ProtocolError::Io(e)) => {
                warn!(%peer, error = %e, "连接读取失败");
                break;
            }
            Err(e) => {
                warn!(%peer, error = %e, "请求格式错误");
                let response = match e {
                    ProtocolError::BodyTooLarge { .. } => {
                        error_response(413, ErrorCode::PayloadTooLarge)
                    }
                    _ => error_response(400, ErrorCode::BadRequest),
                };
                if let Err(e) = conn.send_response(&response, false).await {
                    debug!(%peer, error = %e, "发送错误响应失败");
                }
                break;
            }
        }
    }

    debug!(%peer, "连接关闭");
}

/// 接受连接并为每条连接启动一个任务
pub async fn serve<L: Listener>(mut listener: L, state: Arc<ServerState>) -> anyhow::Result<()> {
    info!(
        addr = listener.local_addr().as_deref().unwrap_or("unknown"),
        rows = state.config.rows,
        columns = state.config.columns,
        "服务端已启动"
    );

    loop {
        match listener.accept().await {
            Ok(conn) => {
                tokio::spawn(handle_connection(conn, Arc::clone(&state)));
            }
            Err(e) => {
                warn!(error = %e, "接受连接失败");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{BoardSnapshot, MatchStatus, MoveRecord};
    use serde_json::{json, Value};

    fn state() -> ServerState {
        ServerState::new(ServerConfig::default()).unwrap()
    }

    fn get(state: &ServerState, path: &str) -> HttpResponse {
        RequestHandler::handle(state, &HttpRequest::new(Method::Get, path))
    }

    fn post(state: &ServerState, path: &str, body: Value) -> HttpResponse {
        let request = HttpRequest::new(Method::Post, path).with_json(&body).unwrap();
        RequestHandler::handle(state, &request)
    }

    fn body(response: &HttpResponse) -> Value {
        response.json_body().unwrap()
    }

    fn register_both(state: &ServerState) {
        post(state, "/register", json!({ "player_id": "A" }));
        post(state, "/register", json!({ "player_id": "B" }));
    }

    #[test]
    fn test_route_parsing() {
        assert_eq!(Route::parse("/"), Some(Route::Welcome));
        assert_eq!(
            Route::parse("/status"),
            Some(Route::Game {
                match_id: DEFAULT_MATCH_ID,
                action: Action::Status
            })
        );
        assert_eq!(
            Route::parse("/matches/7/make_move/"),
            Some(Route::Game {
                match_id: 7,
                action: Action::MakeMove
            })
        );
        assert_eq!(Route::parse("/matches"), Some(Route::Matches));
        assert_eq!(Route::parse("/matches/x/status"), None);
        assert_eq!(Route::parse("/nope"), None);
    }

    #[test]
    fn test_register_flow() {
        let state = state();

        let response = post(&state, "/register", json!({ "player_id": "A" }));
        assert_eq!(response.status, 200);
        assert_eq!(body(&response), json!({ "icon": "X" }));

        let response = get(&state, "/status");
        assert_eq!(
            body(&response),
            json!({ "active_player": "A", "turn": 0, "winner": null })
        );

        let response = post(&state, "/register", json!({ "player_id": "B" }));
        assert_eq!(body(&response), json!({ "icon": "O" }));

        let response = post(&state, "/register", json!({ "player_id": "C" }));
        assert_eq!(response.status, 400);
        assert_eq!(body(&response), json!({ "error": "GameFull" }));
    }

    #[test]
    fn test_invalid_player_ids() {
        let state = state();
        for player_id in [json!(""), json!("x".repeat(MAX_PLAYER_ID_LEN + 1)), json!(5)] {
            let response = post(&state, "/register", json!({ "player_id": player_id }));
            assert_eq!(response.status, 400);
            assert_eq!(body(&response), json!({ "error": "BadRequest" }));
        }

        let response = post(&state, "/register", json!({ "player_id": "x".repeat(MAX_PLAYER_ID_LEN) }));
        assert_eq!(response.status, 200);
    }

    #[test]
    fn test_make_move_errors() {
        let state = state();

        let response = post(&state, "/make_move", json!({ "player_id": "A", "column": 0 }));
        assert_eq!(body(&response), json!({ "error": "NotRegistered" }));

        register_both(&state);

        let cases = [
            (json!({ "player_id": "B", "column": 0 }), "NotYourTurn"),
            (json!({ "player_id": "A", "column": 7 }), "InvalidColumn"),
            (json!({ "player_id": "A", "column": -1 }), "InvalidColumn"),
        ];
        for (request, error) in cases {
            let response = post(&state, "/make_move", request);
            assert_eq!(response.status, 400);
            assert_eq!(body(&response), json!({ "error": error }));
        }

        let response = post(&state, "/make_move", json!({ "player_id": "A" }));
        assert_eq!(body(&response), json!({ "error": "BadRequest" }));
    }

    #[test]
    fn test_column_full() {
        let state = ServerState::new(ServerConfig {
            rows: 2,
            columns: 3,
            ..ServerConfig::default()
        })
        .unwrap();
        register_both(&state);

        post(&state, "/make_move", json!({ "player_id": "A", "column": 1 }));
        post(&state, "/make_move", json!({ "player_id": "B", "column": 1 }));
        let response = post(&state, "/make_move", json!({ "player_id": "A", "column": 1 }));
        assert_eq!(body(&response), json!({ "error": "ColumnFull" }));
    }

    #[test]
    fn test_vertical_win_scenario() {
        let state = state();
        register_both(&state);

        for (player, column) in [("A", 3), ("B", 0), ("A", 3), ("B", 1), ("A", 3), ("B", 2)] {
            let response = post(&state, "/make_move", json!({ "player_id": player, "column": column }));
            assert_eq!(response.status, 200);
        }

        let response = post(&state, "/make_move", json!({ "player_id": "A", "column": 3 }));
        assert_eq!(response.status, 200);
        let value = body(&response);
        assert_eq!(value["success"], json!(true));
        assert_eq!(
            value["status"],
            json!({ "active_player": null, "turn": 7, "winner": "A" })
        );
        assert_eq!(value["board"][2][3], json!("X"));
        assert_eq!(value["board"][1][3], json!(""));

        let response = post(&state, "/make_move", json!({ "player_id": "B", "column": 4 }));
        assert_eq!(body(&response), json!({ "error": "GameOver" }));

        let history: Vec<MoveRecord> = get(&state, "/history").json_body().unwrap();
        assert_eq!(history.len(), 7);

        let response = post(&state, "/new_game", json!({}));
        assert_eq!(body(&response), json!({ "success": true }));

        let status: MatchStatus = get(&state, "/status").json_body().unwrap();
        assert_eq!(status.turn, 0);
        assert_eq!(status.active_player.as_deref(), Some("A"));
        let board: BoardSnapshot = get(&state, "/board").json_body().unwrap();
        assert!(board.is_empty());
    }

    #[test]
    fn test_new_game_requires_players() {
        let state = state();
        let response = post(&state, "/new_game", json!({}));
        assert_eq!(response.status, 400);
        assert_eq!(body(&response), json!({ "error": "NotRegistered" }));
    }

    #[test]
    fn test_board_shape() {
        let state = state();
        let value = body(&get(&state, "/board"));
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 6);
        assert!(rows.iter().all(|row| row.as_array().unwrap().len() == 7));
        assert_eq!(rows[0][0], json!(""));
    }

    #[test]
    fn test_not_found_and_method_not_allowed() {
        let state = state();

        let response = get(&state, "/unknown");
        assert_eq!(response.status, 404);
        assert_eq!(body(&response), json!({ "error": "NotFound" }));

        let response = get(&state, "/register");
        assert_eq!(response.status, 405);
        assert_eq!(body(&response), json!({ "error": "MethodNotAllowed" }));

        let response = post(&state, "/status", json!({}));
        assert_eq!(response.status, 405);

        let response = get(&state, "/");
        assert_eq!(response.status, 200);
        assert!(response.content_type.starts_with("text/plain"));
    }

    #[test]
    fn test_multiple_matches() {
        let state = state();

        let response = post(&state, "/matches", json!({}));
        assert_eq!(response.status, 201);
        let created: MatchCreated = response.json_body().unwrap();
        assert_eq!(created.match_id, 1);

        let response = post(&state, "/matches/1/register", json!({ "player_id": "Z" }));
        assert_eq!(body(&response), json!({ "icon": "X" }));

        // 默认对局不受影响
        let status: MatchStatus = get(&state, "/status").json_body().unwrap();
        assert_eq!(status.active_player, None);

        let response = get(&state, "/matches/99/status");
        assert_eq!(response.status, 404);
        assert_eq!(body(&response), json!({ "error": "MatchNotFound" }));

        let list = body(&get(&state, "/matches"));
        assert_eq!(list.as_array().unwrap().len(), 2);
        assert_eq!(list[1]["match_id"], json!(1));
        assert_eq!(list[1]["phase"], json!("AwaitingSecond"));
    }

    #[test]
    fn test_match_limit() {
        let state = ServerState::new(ServerConfig {
            max_matches: 3,
            ..ServerConfig::default()
        })
        .unwrap();

        for match_id in [1, 2] {
            let response = post(&state, "/matches", json!({}));
            assert_eq!(response.status, 201);
            post(&state, &format!("/matches/{match_id}/register"), json!({ "player_id": "A" }));
        }

        let response = post(&state, "/matches", json!({}));
        assert_eq!(response.status, 429);
        assert_eq!(body(&response), json!({ "error": "TooManyMatches" }));
        assert_eq!(state.matches.len(), 3);
    }

    #[tokio::test]
    async fn test_connection_rejects_oversized_body() {
        let (client, server) = tokio::io::duplex(1 << 20);
        let (mut client_read, mut client_write) = tokio::io::split(client);

        struct DuplexConnection {
            reader: protocol::HttpReader<tokio::io::ReadHalf<tokio::io::DuplexStream>>,
            writer: protocol::HttpWriter<tokio::io::WriteHalf<tokio::io::DuplexStream>>,
        }

        #[async_trait::async_trait]
        impl Connection for DuplexConnection {
            async fn recv_request(&mut self) -> protocol::Result<Option<HttpRequest>> {
                self.reader.read_request().await
            }
            async fn send_response(&mut self, response: &HttpResponse, keep_alive: bool) -> protocol::Result<()> {
                self.writer.write_response(response, keep_alive).await
            }
            fn peer_addr(&self) -> Option<String> {
                None
            }
        }

        let (server_read, server_write) = tokio::io::split(server);
        let conn = DuplexConnection {
            reader: protocol::HttpReader::new(server_read),
            writer: protocol::HttpWriter::new(server_write),
        };
        let task = tokio::spawn(handle_connection(conn, Arc::new(state())));

        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        let head = format!(
            "POST /register HTTP/1.1\r\nContent-Length: {}\r\n\r\n",
            protocol::MAX_BODY_SIZE + 1
        );
        client_write.write_all(head.as_bytes()).await.unwrap();

        let mut raw = String::new();
        client_read.read_to_string(&mut raw).await.unwrap();
        assert!(raw.starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
        assert!(raw.ends_with(r#"{"error":"PayloadTooLarge"}"#));

        task.await.unwrap();
    }
}
