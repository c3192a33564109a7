//! 远程玩家与真实服务端的对局

use std::sync::Arc;
use std::time::Duration;

use connect4_cli::{RemoteOutcome, RemotePlayer};
use connect4_server::{serve, ServerConfig, ServerState};
use protocol::{Icon, Listener, MatchStatus, MoveRequest, RegisterRequest, TcpListener};

const POLL: Duration = Duration::from_millis(10);

/// 启动服务端，返回其地址
async fn start_server(config: ServerConfig) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(ServerState::new(config).unwrap());
    tokio::spawn(serve(listener, state));
    format!("http://{addr}")
}

async fn register(server: &str, player_id: &str) {
    let request = RegisterRequest {
        player_id: player_id.to_string(),
    };
    let response = reqwest::Client::new()
        .post(format!("{server}/register"))
        .json(&request)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
}

/// 对手：轮到自己时依次落下给定的列，被拒绝（例如对方尚未注册）时稍后重试
async fn scripted_opponent(server: String, player_id: &'static str, columns: Vec<i64>) {
    let client = reqwest::Client::new();
    let mut next = 0;
    while next < columns.len() {
        let status: MatchStatus = client
            .get(format!("{server}/status"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if status.winner.is_some() || (status.turn > 0 && status.active_player.is_none()) {
            return;
        }
        if status.active_player.as_deref() == Some(player_id) {
            let request = MoveRequest {
                player_id: player_id.to_string(),
                column: columns[next],
            };
            let response = client
                .post(format!("{server}/make_move"))
                .json(&request)
                .send()
                .await
                .unwrap();
            if response.status().is_success() {
                next += 1;
            }
        }
        tokio::time::sleep(POLL).await;
    }
}

#[tokio::test]
async fn test_remote_player_wins() {
    let server = start_server(ServerConfig::default()).await;

    let mut output = Vec::new();
    // 第一个输入非法，第二个越界，随后四次落在第 3 列
    let input: &[u8] = b"abc\n9\n3\n3\n3\n3\n";
    let mut player = RemotePlayer::new(&server, "A", input, &mut output)
        .unwrap()
        .with_poll_interval(POLL);
    assert_eq!(player.register().await.unwrap(), Icon::X);

    let opponent_server = server.clone();
    let opponent = tokio::spawn(async move {
        register(&opponent_server, "B").await;
        scripted_opponent(opponent_server, "B", vec![0, 1, 2]).await;
    });

    let outcome = player.run().await.unwrap();
    drop(player);
    opponent.await.unwrap();

    assert_eq!(outcome, RemoteOutcome::Won);
    let output = String::from_utf8(output).unwrap();
    assert!(output.contains("--------- Game Started ---------"));
    assert!(output.contains("Please enter a column number."));
    assert!(output.contains("Move was illegal (InvalidColumn). Please try again."));
    assert!(output.contains("You won the game!"));
}

#[tokio::test]
async fn test_remote_player_loses_and_draws() {
    // 对手先注册，远程玩家执 O
    let server = start_server(ServerConfig::default()).await;
    register(&server, "first").await;

    let mut output = Vec::new();
    let input: &[u8] = b"0\n1\n2\n";
    let mut player = RemotePlayer::new(&server, "second", input, &mut output)
        .unwrap()
        .with_poll_interval(POLL);

    let opponent = tokio::spawn(scripted_opponent(server.clone(), "first", vec![6, 6, 6, 6]));
    let outcome = player.run().await.unwrap();
    assert_eq!(player.icon(), Some(Icon::O));
    drop(player);
    opponent.await.unwrap();

    assert_eq!(outcome, RemoteOutcome::Lost("first".to_string()));
    assert!(String::from_utf8(output).unwrap().contains("Player first won the game"));

    // 1x2 棋盘上的和棋
    let server = start_server(ServerConfig {
        rows: 1,
        columns: 2,
        ..ServerConfig::default()
    })
    .await;
    let mut output = Vec::new();
    let input: &[u8] = b"0\n";
    let mut player = RemotePlayer::new(&server, "p1", input, &mut output)
        .unwrap()
        .with_poll_interval(POLL);
    player.register().await.unwrap();

    let opponent_server = server.clone();
    let opponent = tokio::spawn(async move {
        register(&opponent_server, "p2").await;
        scripted_opponent(opponent_server, "p2", vec![1]).await;
    });

    assert_eq!(player.run().await.unwrap(), RemoteOutcome::Drawn);
    opponent.await.unwrap();
}
