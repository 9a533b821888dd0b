use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use citygdp_api::auth::AppState;
use citygdp_api::chatbot::{Answer, ChatError, ChatHistory, Exchange};
use citygdp_api::feedback;
use citygdp_api::insights;
use citygdp_api::session::Session;
use citygdp_types::events::{GatewayCommand, GatewayEvent};

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

type ChatTask = JoinHandle<Result<Answer, ChatError>>;

/// Everything that lives exactly as long as one WebSocket connection.
/// Never shared: the connection loop is its only owner.
#[derive(Debug)]
pub struct ConnectionState {
    pub id: Uuid,
    pub session: Session,
    pub history: ChatHistory,
    /// Upstream chat request in flight. At most one per connection; it runs
    /// on its own task so heartbeats and other commands are not held up.
    pub chat_task: Option<ChatTask>,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            session: Session::new(),
            history: ChatHistory::new(),
            chat_task: None,
        }
    }

    fn cancel_chat(&mut self) {
        if let Some(task) = self.chat_task.take() {
            task.abort();
        }
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Serve one client. The session starts anonymous and is dropped when the
/// socket closes.
pub async fn handle_connection(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut conn = ConnectionState::new();

    info!("Connection {} opened", conn.id);

    if send_event(&mut sender, &GatewayEvent::Hello { authenticated: false })
        .await
        .is_err()
    {
        return;
    }

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;
    let mut pong_received = true;
    let mut missed_heartbeats: u8 = 0;

    loop {
        tokio::select! {
            msg = receiver.next() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    _ => break,
                };

                match msg {
                    Message::Text(text) => {
                        let reply = match serde_json::from_str::<GatewayCommand>(&text) {
                            Ok(cmd) => handle_command(&state, &mut conn, cmd).await,
                            Err(e) => {
                                // Raw text may hold a password; log only the parse error
                                warn!("Connection {} bad command: {}", conn.id, e);
                                Some(GatewayEvent::error("bad_command", "could not parse command"))
                            }
                        };
                        if let Some(event) = reply {
                            if send_event(&mut sender, &event).await.is_err() {
                                break;
                            }
                        }
                    }
                    Message::Pong(_) => pong_received = true,
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            res = chat_result(&mut conn.chat_task) => {
                let event = finish_chat(&mut conn, res);
                if send_event(&mut sender, &event).await.is_err() {
                    break;
                }
            }
            _ = heartbeat.tick() => {
                if std::mem::replace(&mut pong_received, false) {
                    missed_heartbeats = 0;
                } else {
                    missed_heartbeats += 1;
                    if missed_heartbeats >= 2 {
                        warn!("Connection {} heartbeat timeout (missed {} pongs), dropping", conn.id, missed_heartbeats);
                        break;
                    }
                }
                if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }

    conn.cancel_chat();
    match conn.session.current() {
        Some(account) => info!("Connection {} closed ({} was logged in)", conn.id, account.username),
        None => info!("Connection {} closed", conn.id),
    }
}

async fn send_event(
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    event: &GatewayEvent,
) -> Result<(), axum::Error> {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            error!("Failed to encode gateway event: {}", e);
            return Ok(());
        }
    };
    sender.send(Message::Text(text.into())).await
}

fn join_failed(e: JoinError) -> GatewayEvent {
    error!("Task join error: {}", e);
    GatewayEvent::error("internal", "internal error")
}

/// Resolves when the in-flight chat request finishes; never, when there is none.
async fn chat_result(task: &mut Option<ChatTask>) -> Result<Result<Answer, ChatError>, JoinError> {
    match task {
        Some(task) => task.await,
        None => std::future::pending().await,
    }
}

/// Record a finished chat request in the history and build its reply.
pub fn finish_chat(
    conn: &mut ConnectionState,
    res: Result<Result<Answer, ChatError>, JoinError>,
) -> GatewayEvent {
    conn.chat_task = None;

    match res {
        Ok(Ok(answer)) => {
            conn.history.record(&answer.query, &answer.reply);
            GatewayEvent::ChatReply {
                reply: answer.reply,
                history: conn.history.lines().to_vec(),
            }
        }
        Ok(Err(e)) => {
            warn!("Connection {} chat failed: {:?}", conn.id, e);
            GatewayEvent::error(e.code(), e.to_string())
        }
        Err(e) => join_failed(e),
    }
}

/// Apply one command to this connection's state.
///
/// Returns the reply, or `None` when a chat request was started; its reply
/// comes later through [`finish_chat`].
pub async fn handle_command(
    state: &AppState,
    conn: &mut ConnectionState,
    cmd: GatewayCommand,
) -> Option<GatewayEvent> {
    debug!("Connection {} -> {:?}", conn.id, cmd);

    let event = match cmd {
        GatewayCommand::Register {
            username,
            email,
            password,
        } => {
            let state = state.clone();
            let res = tokio::task::spawn_blocking(move || {
                state.accounts.register(&username, &email, &password)
            })
            .await;

            match res {
                Ok(Ok(account)) => GatewayEvent::Registered { account },
                Ok(Err(e)) => GatewayEvent::error(e.code(), e.to_string()),
                Err(e) => join_failed(e),
            }
        }

        GatewayCommand::Login { email, password } => {
            // The login runs on a copy; the connection's session only changes
            // once the whole attempt has succeeded.
            let state = state.clone();
            let mut session = conn.session.clone();
            let res = tokio::task::spawn_blocking(move || {
                session
                    .login(&state.accounts, &email, &password)
                    .map(|account| (session, account))
            })
            .await;

            match res {
                Ok(Ok((session, account))) => {
                    conn.session = session;
                    info!("Connection {} logged in as {}", conn.id, account.username);
                    GatewayEvent::LoggedIn { account }
                }
                Ok(Err(e)) => GatewayEvent::error(e.code(), e.to_string()),
                Err(e) => join_failed(e),
            }
        }

        GatewayCommand::Logout => {
            conn.session.logout();
            conn.cancel_chat();
            conn.history = ChatHistory::new();
            GatewayEvent::LoggedOut
        }

        GatewayCommand::Profile => match conn.session.require() {
            Ok(account) => GatewayEvent::Profile {
                account: account.clone(),
            },
            Err(e) => GatewayEvent::error(e.code(), e.to_string()),
        },

        GatewayCommand::Report { view } => match conn.session.require() {
            Ok(_) => GatewayEvent::Report {
                view: state.reports.select(view.as_deref()),
            },
            Err(e) => GatewayEvent::error(e.code(), e.to_string()),
        },

        GatewayCommand::Insights {
            cities,
            year_from,
            year_to,
            sectors,
        } => match conn.session.require() {
            Ok(_) => match insights::summarize(&cities, year_from, year_to, &sectors) {
                Ok(insights) => GatewayEvent::Insights { insights },
                Err(e) => GatewayEvent::error(e.code(), e.to_string()),
            },
            Err(e) => GatewayEvent::error(e.code(), e.to_string()),
        },

        GatewayCommand::SubmitFeedback {
            rating,
            feedback: text,
            contact_email,
        } => {
            let state = state.clone();
            let session = conn.session.clone();
            let res = tokio::task::spawn_blocking(move || {
                feedback::submit(&state.db, &session, rating, &text, contact_email.as_deref())
            })
            .await;

            match res {
                Ok(Ok(id)) => GatewayEvent::FeedbackAccepted { id },
                Ok(Err(e)) => GatewayEvent::error(e.code(), e.to_string()),
                Err(e) => join_failed(e),
            }
        }

        GatewayCommand::ListFeedback { limit } => {
            let state = state.clone();
            let session = conn.session.clone();
            let res =
                tokio::task::spawn_blocking(move || feedback::recent(&state.db, &session, limit))
                    .await;

            match res {
                Ok(Ok(entries)) => GatewayEvent::FeedbackList { entries },
                Ok(Err(e)) => GatewayEvent::error(e.code(), e.to_string()),
                Err(e) => join_failed(e),
            }
        }

        GatewayCommand::Chat { query } => {
            if let Err(e) = conn.session.require() {
                return Some(GatewayEvent::error(e.code(), e.to_string()));
            }
            if conn.chat_task.is_some() {
                return Some(GatewayEvent::error("chat_busy", "previous question is still being answered"));
            }

            match Exchange::new(state.chat.as_ref(), &conn.history, &query) {
                Ok(exchange) => {
                    conn.chat_task = Some(tokio::spawn(exchange.send()));
                    return None;
                }
                Err(e) => GatewayEvent::error(e.code(), e.to_string()),
            }
        }
    };

    Some(event)
}
