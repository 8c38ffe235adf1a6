use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use taskdeck_shared::{
    ApiErrorBody, AuthSession, SignInArgs, SignUpArgs, TaskCreate, TaskDto, TaskToggleArgs,
    TaskUpdateArgs,
};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use super::{AuthGateway, TaskGateway};
use crate::error::GatewayError;
use crate::session::{AUTH_TOKEN_KEY, SessionStore};
use crate::task::{Task, TaskId};

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Serialize)]
struct CompleteBody {
    completed: bool,
}

/// REST/JSON client for the task and auth service.
pub struct HttpGateway {
    client: Client,
    base_url: String,
    session: Arc<dyn SessionStore>,
}

impl HttpGateway {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        session: Arc<dyn SessionStore>,
    ) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.trim_end_matches('/').to_string();
        info!(base_url = %base_url, ?timeout, "http gateway ready");
        Ok(Self {
            client,
            base_url,
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> (RequestBuilder, String) {
        let request_id = Uuid::new_v4().to_string();
        let mut builder = self
            .client
            .request(method, self.url(path))
            .header(REQUEST_ID_HEADER, &request_id);
        if let Some(token) = self.session.get(AUTH_TOKEN_KEY) {
            builder = builder.bearer_auth(token);
        }
        (builder, request_id)
    }

    async fn send(builder: RequestBuilder, request_id: &str) -> Result<Response, GatewayError> {
        let response = builder.send().await.map_err(|err| {
            error!(request_id, error = %err, "request failed before a response");
            GatewayError::Transport(err.to_string())
        })?;

        let status = response.status();
        debug!(request_id, status = status.as_u16(), "response received");
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ApiErrorBody>()
            .await
            .ok()
            .and_then(ApiErrorBody::into_message);
        error!(request_id, status = status.as_u16(), message = ?message, "service rejected request");
        Err(status_error(status, message))
    }

    async fn call_json<R, A>(
        &self,
        method: Method,
        path: &str,
        body: Option<&A>,
    ) -> Result<R, GatewayError>
    where
        R: DeserializeOwned,
        A: Serialize + ?Sized,
    {
        let (mut builder, request_id) = self.request(method, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = Self::send(builder, &request_id).await?;
        response
            .json::<R>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

fn status_error(status: StatusCode, message: Option<String>) -> GatewayError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Unauthorized { message },
        StatusCode::NOT_FOUND => GatewayError::NotFound,
        _ => GatewayError::Http {
            status: status.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl TaskGateway for HttpGateway {
    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Task>, GatewayError> {
        let tasks: Vec<TaskDto> = self
            .call_json(Method::GET, "/api/tasks", None::<&()>)
            .await?;
        Ok(tasks.into_iter().map(Task::from).collect())
    }

    #[instrument(skip(self, create), fields(title_len = create.title.len()))]
    async fn create(&self, create: TaskCreate) -> Result<Task, GatewayError> {
        let dto: TaskDto = self
            .call_json(Method::POST, "/api/tasks", Some(&create))
            .await?;
        Ok(dto.into())
    }

    #[instrument(skip(self, args), fields(id = %args.id))]
    async fn update(&self, args: TaskUpdateArgs) -> Result<Task, GatewayError> {
        let path = format!("/api/tasks/{}", args.id);
        let dto: TaskDto = self
            .call_json(Method::PUT, &path, Some(&args.patch))
            .await?;
        Ok(dto.into())
    }

    #[instrument(skip(self), fields(id = %args.id, completed = args.completed))]
    async fn toggle(&self, args: TaskToggleArgs) -> Result<Task, GatewayError> {
        let path = format!("/api/tasks/{}/complete", args.id);
        let body = CompleteBody {
            completed: args.completed,
        };
        let dto: TaskDto = self
            .call_json(Method::PATCH, &path, Some(&body))
            .await?;
        Ok(dto.into())
    }

    #[instrument(skip(self))]
    async fn remove(&self, id: TaskId) -> Result<(), GatewayError> {
        let (builder, request_id) = self.request(Method::DELETE, &format!("/api/tasks/{id}"));
        Self::send(builder, &request_id).await?;
        Ok(())
    }
}

#[async_trait]
impl AuthGateway for HttpGateway {
    #[instrument(skip(self, args), fields(email = %args.email))]
    async fn sign_in(&self, args: SignInArgs) -> Result<AuthSession, GatewayError> {
        self.call_json(Method::POST, "/api/auth/sign-in", Some(&args))
            .await
    }

    #[instrument(skip(self, args), fields(email = %args.email))]
    async fn sign_up(&self, args: SignUpArgs) -> Result<AuthSession, GatewayError> {
        self.call_json(Method::POST, "/api/auth/sign-up", Some(&args))
            .await
    }
}
