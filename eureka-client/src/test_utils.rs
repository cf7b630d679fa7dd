use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use http::StatusCode;
use tokio::time::{Duration, Instant};

use crate::error::TransportError;
use crate::transport::RegistryTransport;

/// What the fake registry answers to one request.
#[derive(Clone, Copy, Debug)]
pub enum Reply {
    Status(u16),
    Unreachable,
}

#[derive(Clone, Debug)]
pub enum Request {
    Post(serde_json::Value),
    Put { instance_id: String },
}

#[derive(Clone, Debug)]
pub struct Call {
    pub request: Request,
    pub at: Instant,
}

impl Call {
    /// `POST <status>` or `PUT`, for comparing call sequences.
    pub fn label(&self) -> String {
        match &self.request {
            Request::Post(body) => format!("POST {}", status_of(body)),
            Request::Put { .. } => "PUT".to_owned(),
        }
    }
}

fn status_of(body: &serde_json::Value) -> String {
    body["instance"]["status"]
        .as_str()
        .unwrap_or_default()
        .to_owned()
}

struct Script {
    posts: VecDeque<Reply>,
    puts: VecDeque<Reply>,
    default_post: Reply,
    default_put: Reply,
    put_delay: Duration,
    calls: Vec<Call>,
}

/// In-memory `RegistryTransport` answering from a script, recording every call with the
/// (possibly paused) tokio clock.
#[derive(Clone)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    /// Accepts everything until told otherwise.
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                posts: VecDeque::new(),
                puts: VecDeque::new(),
                default_post: Reply::Status(204),
                default_put: Reply::Status(200),
                put_delay: Duration::ZERO,
                calls: Vec::new(),
            })),
        }
    }

    /// Queue replies for the next POSTs; once exhausted the default reply is used.
    pub fn script_posts(&self, replies: impl IntoIterator<Item = Reply>) {
        self.script.lock().unwrap().posts.extend(replies);
    }

    pub fn script_puts(&self, replies: impl IntoIterator<Item = Reply>) {
        self.script.lock().unwrap().puts.extend(replies);
    }

    pub fn set_default_post(&self, reply: Reply) {
        self.script.lock().unwrap().default_post = reply;
    }

    pub fn set_default_put(&self, reply: Reply) {
        self.script.lock().unwrap().default_put = reply;
    }

    /// Make every heartbeat take this long to answer.
    pub fn set_put_delay(&self, delay: Duration) {
        self.script.lock().unwrap().put_delay = delay;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn post_bodies(&self) -> Vec<serde_json::Value> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call.request {
                Request::Post(body) => Some(body),
                Request::Put { .. } => None,
            })
            .collect()
    }

    pub fn post_statuses(&self) -> Vec<String> {
        self.post_bodies().iter().map(status_of).collect()
    }

    pub fn post_instants_for(&self, status: &str) -> Vec<Instant> {
        self.calls()
            .into_iter()
            .filter(|call| {
                matches!(&call.request, Request::Post(body) if status_of(body) == status)
            })
            .map(|call| call.at)
            .collect()
    }

    pub fn put_instants(&self) -> Vec<Instant> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call.request, Request::Put { .. }))
            .map(|call| call.at)
            .collect()
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn answer(reply: Reply, url: &str) -> Result<StatusCode, TransportError> {
    match reply {
        Reply::Status(code) => Ok(StatusCode::from_u16(code).expect("valid status code")),
        Reply::Unreachable => Err(TransportError::new(
            url,
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
        )),
    }
}

#[async_trait]
impl RegistryTransport for ScriptedTransport {
    async fn post_instance(
        &self,
        app_name: &str,
        body: String,
    ) -> Result<StatusCode, TransportError> {
        let reply = {
            let mut script = self.script.lock().unwrap();
            script.calls.push(Call {
                request: Request::Post(serde_json::from_str(&body).expect("valid JSON body")),
                at: Instant::now(),
            });
            let default = script.default_post;
            script.posts.pop_front().unwrap_or(default)
        };

        answer(reply, &format!("/apps/{}", app_name))
    }

    async fn put_heartbeat(
        &self,
        app_name: &str,
        instance_id: &str,
    ) -> Result<StatusCode, TransportError> {
        let (reply, delay) = {
            let mut script = self.script.lock().unwrap();
            script.calls.push(Call {
                request: Request::Put {
                    instance_id: instance_id.to_owned(),
                },
                at: Instant::now(),
            });
            let default = script.default_put;
            (script.puts.pop_front().unwrap_or(default), script.put_delay)
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        answer(reply, &format!("/apps/{}/{}", app_name, instance_id))
    }
}
