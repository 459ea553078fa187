use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use axum::Router;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Method, Request, StatusCode};
use goteam_server::{AUTH_COOKIE, AppState, STATE_COOKIE, ServerConfig, router};
use goteam_state::{HierarchyCodec, HierarchyState, Signer, Timestamp};
use goteam_store::MemoryBackend;
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;

const KEY: &str = "api-test-signing-key-0123456789abcdef";

fn app() -> Result<Router> {
    app_with(&ServerConfig::with_signing_key(KEY))
}

fn app_with(config: &ServerConfig) -> Result<Router> {
    let state = AppState::new(config, MemoryBackend::default())?;
    Ok(router(state))
}

/// A browser stand-in that remembers the cookies it is given.
struct Client {
    router: Router,
    cookies: BTreeMap<String, String>,
}

impl Client {
    fn new(router: &Router) -> Self {
        Self {
            router: router.clone(),
            cookies: BTreeMap::new(),
        }
    }

    async fn send(
        &mut self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut request = Request::builder().method(method).uri(uri);
        if !self.cookies.is_empty() {
            let header = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            request = request.header(COOKIE, header);
        }
        let request = match body {
            Some(body) => request
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => request.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        for header in response.headers().get_all(SET_COOKIE) {
            let pair = header.to_str()?.split(';').next().unwrap_or_default();
            match pair.split_once('=') {
                Some((name, "")) => {
                    self.cookies.remove(name);
                }
                Some((name, value)) => {
                    self.cookies.insert(name.to_owned(), value.to_owned());
                }
                None => {}
            }
        }

        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, body))
    }

    async fn get(&mut self, uri: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::GET, uri, None).await
    }

    async fn post(&mut self, uri: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::POST, uri, Some(body)).await
    }

    async fn patch(&mut self, uri: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::PATCH, uri, Some(body)).await
    }

    async fn delete(&mut self, uri: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::DELETE, uri, None).await
    }

    async fn register(router: &Router, username: &str, invite_code: Option<&str>) -> Result<Self> {
        let mut client = Self::new(router);
        let (status, body) = client
            .post(
                "/register",
                json!({ "username": username, "password": "hunter22", "inviteCode": invite_code }),
            )
            .await?;
        if status != StatusCode::OK {
            return Err(anyhow!("registering {username} failed with {status}: {body}"));
        }
        Ok(client)
    }

    async fn board(&mut self) -> Result<Value> {
        let (status, body) = self.get("/board").await?;
        if status != StatusCode::OK {
            return Err(anyhow!("reading the board failed with {status}: {body}"));
        }
        Ok(body)
    }

    fn state(&self) -> Result<HierarchyState> {
        let token = self
            .cookies
            .get(STATE_COOKIE)
            .context("no state token was issued")?;
        let codec = HierarchyCodec::new(Signer::new(KEY)?, Duration::from_secs(3600));
        Ok(codec.decode(token, Timestamp::now())?)
    }
}

fn column_id(board: &Value, index: usize) -> Result<String> {
    board["activeBoard"]["columns"][index]["id"]
        .as_str()
        .map(str::to_owned)
        .context("missing column")
}

fn error(body: &Value) -> &str {
    body["error"].as_str().unwrap_or_default()
}

fn tampered(token: &str) -> String {
    let replacement = if token.starts_with('A') { "B" } else { "A" };
    format!("{replacement}{}", &token[1..])
}

#[tokio::test]
async fn it_registers_an_admin_with_a_first_board() -> Result<()> {
    let router = app()?;
    let mut admin = Client::register(&router, "alice123", None).await?;

    assert!(admin.cookies.contains_key(AUTH_COOKIE));
    assert!(admin.cookies.contains_key(STATE_COOKIE));

    let board = admin.board().await?;
    assert_eq!(board["user"], json!({ "username": "alice123", "isAdmin": true }));
    assert!(board["team"]["inviteCode"].is_string());
    assert_eq!(board["boards"].as_array().map(Vec::len), Some(1));
    assert_eq!(board["activeBoard"]["name"], "New Board");
    assert_eq!(
        board["activeBoard"]["columns"].as_array().map(Vec::len),
        Some(4)
    );
    assert_eq!(admin.state()?.boards[0].columns.len(), 4);
    Ok(())
}

#[tokio::test]
async fn it_validates_registrations() -> Result<()> {
    let router = app()?;
    let mut client = Client::new(&router);

    let (status, body) = client
        .post("/register", json!({ "username": "bob", "password": "hunter22" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error(&body), "Username cannot be shorter than 5 characters.");

    Client::register(&router, "alice123", None).await?;
    let (status, body) = client
        .post("/register", json!({ "username": "alice123", "password": "hunter22" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error(&body), "Username is already taken.");

    let (status, body) = client
        .post(
            "/register",
            json!({ "username": "carol123", "password": "hunter22", "inviteCode": "nope" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error(&body), "Invalid invite code.");
    Ok(())
}

#[tokio::test]
async fn it_logs_in_with_the_right_password_only() -> Result<()> {
    let router = app()?;
    Client::register(&router, "alice123", None).await?;
    let mut client = Client::new(&router);

    let (status, body) = client
        .post("/login", json!({ "username": "alice123", "password": "hunter23" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error(&body), "Invalid username or password.");
    assert!(client.cookies.is_empty());

    let (status, _) = client
        .post("/login", json!({ "username": "alice123", "password": "hunter22" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(client.board().await?["user"]["username"], "alice123");
    Ok(())
}

#[tokio::test]
async fn it_requires_a_valid_auth_token() -> Result<()> {
    let router = app()?;
    let mut stranger = Client::new(&router);

    let (status, body) = stranger.get("/board").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error(&body), "Auth token not found.");

    let mut admin = Client::register(&router, "alice123", None).await?;
    let token = admin.cookies[AUTH_COOKIE].clone();
    admin.cookies.insert(AUTH_COOKIE.into(), tampered(&token));

    let (status, body) = admin.get("/board").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error(&body), "Invalid auth token.");
    Ok(())
}

#[tokio::test]
async fn it_creates_tasks_and_reissues_state() -> Result<()> {
    let router = app()?;
    let mut admin = Client::register(&router, "alice123", None).await?;
    let column = column_id(&admin.board().await?, 0)?;

    let (status, created) = admin
        .post(
            "/task",
            json!({
                "column": column,
                "title": "Write docs",
                "description": "All of them",
                "subtasks": ["Outline", "Draft"],
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    let task = created["id"].as_str().context("missing task id")?.to_owned();

    let state = admin.state()?;
    assert_eq!(state.boards[0].columns[0].tasks[0].id, task);
    assert_eq!(state.boards[0].columns[0].tasks[0].subtasks.len(), 2);

    let board = admin.board().await?;
    let listed = &board["activeBoard"]["columns"][0]["tasks"][0];
    assert_eq!(listed["title"], "Write docs");
    assert_eq!(listed["description"], "All of them");
    assert_eq!(listed["subtasks"][1]["title"], "Draft");
    assert_eq!(listed["subtasks"][1]["done"], false);
    Ok(())
}

#[tokio::test]
async fn it_rejects_invalid_task_titles() -> Result<()> {
    let router = app()?;
    let mut admin = Client::register(&router, "alice123", None).await?;
    let column = column_id(&admin.board().await?, 0)?;

    let (status, body) = admin
        .post(
            "/task",
            json!({ "column": column, "title": "ok", "subtasks": ["x".repeat(51)] }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        error(&body),
        "Subtask title cannot be longer than 50 characters."
    );
    Ok(())
}

#[tokio::test]
async fn it_forbids_members_from_editing() -> Result<()> {
    let router = app()?;
    let mut admin = Client::register(&router, "alice123", None).await?;
    let board = admin.board().await?;
    let invite = board["team"]["inviteCode"]
        .as_str()
        .context("missing invite code")?;
    let column = column_id(&board, 0)?;

    let mut member = Client::register(&router, "bobby123", Some(invite)).await?;
    let seen = member.board().await?;
    assert_eq!(seen["user"]["isAdmin"], false);
    assert!(seen["team"].get("inviteCode").is_none());
    assert_eq!(seen["activeBoard"]["id"], board["activeBoard"]["id"]);

    let (status, body) = member
        .post("/task", json!({ "column": column, "title": "Sneaky" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error(&body), "Only team admins can create tasks.");

    let (status, body) = member
        .patch(&format!("/column?id={column}"), json!({ "tasks": [] }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error(&body), "Only team admins can edit columns.");

    let (status, body) = member.post("/board", json!({ "name": "Mine" })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error(&body), "Only team admins can create boards.");
    Ok(())
}

#[tokio::test]
async fn it_hides_other_teams_boards() -> Result<()> {
    let router = app()?;
    let mut alice = Client::register(&router, "alice123", None).await?;
    let mut mallory = Client::register(&router, "mallory1", None).await?;
    let board = alice.board().await?["activeBoard"]["id"]
        .as_str()
        .context("missing board id")?
        .to_owned();

    let (status, body) = mallory.delete(&format!("/board?id={board}")).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error(&body), "Board not found.");

    let (status, _) = mallory.get(&format!("/board?id={board}")).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(alice.board().await?["boards"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn it_rejects_a_tampered_state_token() -> Result<()> {
    let router = app()?;
    let mut admin = Client::register(&router, "alice123", None).await?;
    let token = admin.cookies[STATE_COOKIE].clone();
    admin.cookies.insert(STATE_COOKIE.into(), tampered(&token));

    let (status, body) = admin.post("/board", json!({ "name": "Second" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error(&body), "Invalid state token.");
    Ok(())
}

#[tokio::test]
async fn it_rebuilds_a_missing_state_token_from_the_store() -> Result<()> {
    let router = app()?;
    let mut admin = Client::register(&router, "alice123", None).await?;
    let column = column_id(&admin.board().await?, 2)?;
    admin.cookies.remove(STATE_COOKIE);

    let (status, _) = admin
        .post("/task", json!({ "column": column, "title": "Recovered" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(admin.state()?.boards[0].columns[2].tasks.len(), 1);
    Ok(())
}

#[tokio::test]
async fn it_limits_boards_per_team() -> Result<()> {
    let router = app()?;
    let mut admin = Client::register(&router, "alice123", None).await?;

    for name in ["Second", "Third"] {
        let (status, _) = admin.post("/board", json!({ "name": name })).await?;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(admin.state()?.boards.len(), 3);

    let (status, body) = admin.post("/board", json!({ "name": "Fourth" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error(&body), "Max 3 boards is allowed per team.");
    Ok(())
}

#[tokio::test]
async fn it_lists_boards_in_the_order_the_state_token_carries() -> Result<()> {
    let router = app()?;
    let mut admin = Client::register(&router, "alice123", None).await?;
    for name in ["Second", "Third"] {
        admin.post("/board", json!({ "name": name })).await?;
    }
    let reconciled = admin
        .state()?
        .boards
        .into_iter()
        .map(|board| board.name)
        .collect::<Vec<_>>();
    assert_eq!(reconciled, vec!["New Board", "Second", "Third"]);

    let board = admin.board().await?;
    let listed = board["boards"]
        .as_array()
        .context("missing boards")?
        .iter()
        .map(|board| board["name"].as_str().unwrap_or_default().to_owned())
        .collect::<Vec<_>>();
    assert_eq!(listed, reconciled);
    assert_eq!(board["activeBoard"]["name"], "New Board");

    let fresh = admin
        .state()?
        .boards
        .into_iter()
        .map(|board| board.name)
        .collect::<Vec<_>>();
    assert_eq!(fresh, reconciled);
    Ok(())
}

#[tokio::test]
async fn it_renames_and_reorders_a_board() -> Result<()> {
    let router = app()?;
    let mut admin = Client::register(&router, "alice123", None).await?;
    let board = admin.board().await?;
    let id = board["activeBoard"]["id"].as_str().context("missing board id")?;
    let mut columns = (0..4)
        .map(|index| column_id(&board, index))
        .collect::<Result<Vec<_>>>()?;
    columns.reverse();

    let (status, body) = admin
        .patch(
            &format!("/board?id={id}"),
            json!({ "columns": &columns[1..] }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        error(&body),
        "Columns must list every column of the board exactly once."
    );

    let (status, _) = admin
        .patch(
            &format!("/board?id={id}"),
            json!({ "name": "Renamed", "columns": columns }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let state = admin.state()?;
    assert_eq!(state.boards[0].name, "Renamed");
    assert_eq!(
        state.boards[0]
            .columns
            .iter()
            .map(|column| column.id.clone())
            .collect::<Vec<_>>(),
        columns
    );

    let board = admin.board().await?;
    assert_eq!(board["activeBoard"]["name"], "Renamed");
    assert_eq!(column_id(&board, 0)?, columns[0]);
    Ok(())
}

#[tokio::test]
async fn it_moves_tasks_between_columns() -> Result<()> {
    let router = app()?;
    let mut admin = Client::register(&router, "alice123", None).await?;
    let board = admin.board().await?;
    let (todo, doing) = (column_id(&board, 0)?, column_id(&board, 1)?);

    let mut tasks = Vec::new();
    for title in ["First", "Second"] {
        let (_, created) = admin
            .post("/task", json!({ "column": todo, "title": title }))
            .await?;
        tasks.push(created["id"].as_str().context("missing task id")?.to_owned());
    }

    let (status, body) = admin
        .patch(&format!("/column?id={todo}"), json!({ "tasks": [tasks[1]] }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error(&body), "Every task in the column must be listed.");

    let (status, _) = admin
        .patch(&format!("/column?id={doing}"), json!({ "tasks": [tasks[1]] }))
        .await?;
    assert_eq!(status, StatusCode::OK);

    let state = admin.state()?;
    assert_eq!(state.boards[0].columns[0].tasks.len(), 1);
    assert_eq!(state.boards[0].columns[1].tasks[0].id, tasks[1]);

    let board = admin.board().await?;
    assert_eq!(board["activeBoard"]["columns"][1]["tasks"][0]["title"], "Second");
    Ok(())
}

#[tokio::test]
async fn it_updates_tasks_in_place_and_ticks_subtasks() -> Result<()> {
    let router = app()?;
    let mut admin = Client::register(&router, "alice123", None).await?;
    let column = column_id(&admin.board().await?, 0)?;

    let mut tasks = Vec::new();
    for title in ["First", "Second"] {
        let (_, created) = admin
            .post("/task", json!({ "column": column, "title": title, "subtasks": ["Old"] }))
            .await?;
        tasks.push(created["id"].as_str().context("missing task id")?.to_owned());
    }

    let (status, _) = admin
        .patch(
            &format!("/task?id={}", tasks[0]),
            json!({ "title": "First!", "description": "", "subtasks": ["New", "Newer"] }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let state = admin.state()?;
    let column_state = &state.boards[0].columns[0];
    assert_eq!(column_state.tasks[0].id, tasks[0]);
    assert_eq!(column_state.tasks[0].subtasks.len(), 2);
    let subtask = column_state.tasks[0].subtasks[1].id.clone();

    let (status, _) = admin
        .patch(&format!("/subtask?id={subtask}"), json!({ "done": true }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(admin.state()?.boards[0].columns[0].tasks[0].subtasks[1].done);

    let board = admin.board().await?;
    let listed = &board["activeBoard"]["columns"][0]["tasks"][0];
    assert_eq!(listed["title"], "First!");
    assert_eq!(listed["subtasks"][1]["done"], true);
    Ok(())
}

#[tokio::test]
async fn it_drops_deleted_tasks_from_the_state_token() -> Result<()> {
    let router = app()?;
    let mut admin = Client::register(&router, "alice123", None).await?;
    let column = column_id(&admin.board().await?, 0)?;
    let (_, created) = admin
        .post("/task", json!({ "column": column, "title": "Doomed", "subtasks": ["a"] }))
        .await?;
    let task = created["id"].as_str().context("missing task id")?.to_owned();

    let (status, _) = admin.delete(&format!("/task?id={task}")).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(admin.state()?.boards[0].columns[0].tasks.is_empty());

    let (status, body) = admin.delete(&format!("/task?id={task}")).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error(&body), "Task not found.");
    Ok(())
}

#[tokio::test]
async fn it_deletes_boards_with_everything_on_them() -> Result<()> {
    let router = app()?;
    let mut admin = Client::register(&router, "alice123", None).await?;
    let (_, created) = admin.post("/board", json!({ "name": "Scratch" })).await?;
    let board = created["id"].as_str().context("missing board id")?.to_owned();

    let (status, _) = admin.delete(&format!("/board?id={board}")).await?;
    assert_eq!(status, StatusCode::OK);

    let state = admin.state()?;
    assert_eq!(state.boards.len(), 1);
    assert!(state.board(&board).is_none());
    Ok(())
}

#[tokio::test]
async fn it_reports_malformed_bodies_as_bad_requests() -> Result<()> {
    let router = app()?;
    let mut admin = Client::register(&router, "alice123", None).await?;

    let (status, body) = admin.post("/board", json!({ "title": "wrong field" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!error(&body).is_empty());
    Ok(())
}

#[tokio::test]
async fn it_keeps_working_once_the_hierarchy_outgrows_the_state_token() -> Result<()> {
    let mut config = ServerConfig::with_signing_key(KEY);
    config.token_ceiling = 1000;
    let router = app_with(&config)?;

    let mut admin = Client::register(&router, "alice123", None).await?;
    assert!(admin.cookies.contains_key(STATE_COOKIE));
    let column = column_id(&admin.board().await?, 0)?;

    for index in 0..20 {
        let (status, body) = admin
            .post(
                "/task",
                json!({
                    "column": column,
                    "title": format!("Task {index}"),
                    "subtasks": ["a", "b"],
                }),
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "task {index}: {body}");
    }
    assert!(!admin.cookies.contains_key(STATE_COOKIE));

    let mut client = Client::new(&router);
    let (status, _) = client
        .post("/login", json!({ "username": "alice123", "password": "hunter22" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(client.cookies.contains_key(AUTH_COOKIE));
    assert!(!client.cookies.contains_key(STATE_COOKIE));

    let board = client.board().await?;
    assert_eq!(
        board["activeBoard"]["columns"][0]["tasks"].as_array().map(Vec::len),
        Some(20)
    );

    let (status, _) = client
        .post("/task", json!({ "column": column, "title": "One more" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        client.board().await?["activeBoard"]["columns"][0]["tasks"]
            .as_array()
            .map(Vec::len),
        Some(21)
    );
    Ok(())
}

#[tokio::test]
async fn it_lists_members_with_admins_first() -> Result<()> {
    let router = app()?;
    let mut admin = Client::register(&router, "zelda123", None).await?;
    let board = admin.board().await?;
    let invite = board["team"]["inviteCode"]
        .as_str()
        .context("missing invite code")?;
    let mut member = Client::register(&router, "bobby123", Some(invite)).await?;
    Client::register(&router, "mallory1", None).await?;

    let expected = json!([
        { "username": "zelda123", "isAdmin": true },
        { "username": "bobby123", "isAdmin": false },
    ]);
    assert_eq!(admin.board().await?["members"], expected);
    assert_eq!(member.board().await?["members"], expected);
    Ok(())
}

#[tokio::test]
async fn it_lets_admins_remove_members() -> Result<()> {
    let router = app()?;
    let mut admin = Client::register(&router, "alice123", None).await?;
    let board = admin.board().await?;
    let invite = board["team"]["inviteCode"]
        .as_str()
        .context("missing invite code")?;
    let mut member = Client::register(&router, "bobby123", Some(invite)).await?;
    Client::register(&router, "mallory1", None).await?;

    let (status, body) = member.delete("/member?id=alice123").await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error(&body), "Only team admins can remove members.");

    let (status, body) = admin.delete("/member?id=alice123").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error(&body), "Admins cannot remove themselves.");

    let (status, body) = admin.delete("/member?id=mallory1").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error(&body), "User not found.");

    let (status, _) = admin.delete("/member?id=bobby123").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        admin.board().await?["members"],
        json!([{ "username": "alice123", "isAdmin": true }])
    );

    let mut client = Client::new(&router);
    let (status, body) = client
        .post("/login", json!({ "username": "bobby123", "password": "hunter22" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error(&body), "Invalid username or password.");
    Ok(())
}
