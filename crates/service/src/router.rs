//! Maps decoded requests onto orchestrator operations.
//!
//! | Route | `post` | `get` | `put` | `delete` |
//! |---|---|---|---|---|
//! | `users` | `create_user` | `get_user` | `update_user` | `delete_user` |
//! | `tokens` | `create_token` | `get_token` | `update_token` | `delete_token` |
//! | `checks` | `create_check` | `get_check` | `update_check` | `delete_check` |
//!
//! `ping` always answers 200; any other route answers 404.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::{
    error::{Result, ServiceError},
    orchestrator::Orchestrator,
    request::{Request, Response},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Resource {
    Users,
    Tokens,
    Checks,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    fn parse(method: &str) -> Option<Self> {
        match method.trim().to_ascii_lowercase().as_str() {
            "post" => Some(Self::Create),
            "get" => Some(Self::Read),
            "put" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// Request dispatcher.
#[derive(Clone, Debug)]
pub struct Router {
    orchestrator: Arc<Orchestrator>,
}

impl Router {
    /// Creates a router over `orchestrator`.
    #[must_use]
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// The orchestrator requests are dispatched to.
    #[must_use]
    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Handles one request. Never fails: every outcome is a [`Response`].
    #[tracing::instrument(skip_all, fields(route = request.route(), method = %request.method))]
    pub async fn handle(&self, request: &Request) -> Response {
        let resource = match request.route() {
            "ping" => return Response::empty(),
            "users" => Resource::Users,
            "tokens" => Resource::Tokens,
            "checks" => Resource::Checks,
            _ => return Response::not_found(),
        };

        let outcome = match Action::parse(&request.method) {
            Some(action) => self.dispatch(resource, action, request).await,
            None => Err(ServiceError::MethodNotAllowed { method: request.method.clone() }),
        };

        match outcome {
            Ok(body) => Response::ok(body),
            Err(err) => {
                if err.status() >= 500 {
                    tracing::error!(error = %err, "request failed");
                } else {
                    tracing::debug!(error = %err, status = err.status(), "request rejected");
                }
                Response::from(&err)
            },
        }
    }

    async fn dispatch(&self, resource: Resource, action: Action, request: &Request) -> Result<Value> {
        let o = &self.orchestrator;
        let token = request.token.as_deref();
        let query = |name| key(request, name);
        let payload = &request.payload;

        match (resource, action) {
            (Resource::Users, Action::Create) => o.create_user(payload).await.map(|()| empty()),
            (Resource::Users, Action::Read) => to_body(o.get_user(query("phone"), token).await?),
            (Resource::Users, Action::Update) => to_body(o.update_user(payload, token).await?),
            (Resource::Users, Action::Delete) => {
                o.delete_user(query("phone"), token).await.map(|()| empty())
            },
            (Resource::Tokens, Action::Create) => to_body(o.create_token(payload).await?),
            (Resource::Tokens, Action::Read) => to_body(o.get_token(query("id")).await?),
            (Resource::Tokens, Action::Update) => to_body(o.update_token(payload).await?),
            (Resource::Tokens, Action::Delete) => {
                o.delete_token(query("id")).await.map(|()| empty())
            },
            (Resource::Checks, Action::Create) => to_body(o.create_check(payload, token).await?),
            (Resource::Checks, Action::Read) => to_body(o.get_check(query("id"), token).await?),
            (Resource::Checks, Action::Update) => to_body(o.update_check(payload, token).await?),
            (Resource::Checks, Action::Delete) => {
                o.delete_check(query("id"), token).await.map(|()| empty())
            },
        }
    }
}

/// Key fields for read and delete come from the query; absent keys are
/// reported by the operation's own validation.
fn key<'r>(request: &'r Request, name: &str) -> &'r str {
    request.query.raw_str(name).unwrap_or_default()
}

fn empty() -> Value {
    Value::Object(serde_json::Map::new())
}

fn to_body(resource: impl Serialize) -> Result<Value> {
    serde_json::to_value(resource).map_err(|e| ServiceError::Internal(e.to_string()))
}
