//! Boundary to the remote task and auth service.
//!
//! Every call is a single request: no implicit retry, exactly one
//! outcome. Timeouts, if any, belong to the implementation.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use taskdeck_shared::{
    AuthSession, SignInArgs, SignUpArgs, TaskCreate, TaskToggleArgs, TaskUpdateArgs,
};

use crate::error::GatewayError;
use crate::task::{Task, TaskId};

pub use http::HttpGateway;
pub use memory::MemoryGateway;

#[async_trait]
pub trait TaskGateway: Send + Sync {
    async fn list(&self) -> Result<Vec<Task>, GatewayError>;

    async fn create(&self, create: TaskCreate) -> Result<Task, GatewayError>;

    async fn update(&self, args: TaskUpdateArgs) -> Result<Task, GatewayError>;

    /// `update` restricted to the completion flag.
    async fn toggle(&self, args: TaskToggleArgs) -> Result<Task, GatewayError>;

    async fn remove(&self, id: TaskId) -> Result<(), GatewayError>;
}

#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn sign_in(&self, args: SignInArgs) -> Result<AuthSession, GatewayError>;

    async fn sign_up(&self, args: SignUpArgs) -> Result<AuthSession, GatewayError>;
}
