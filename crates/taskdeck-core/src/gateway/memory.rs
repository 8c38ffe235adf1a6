//! In-process gateway with scripted failures and latencies.
//!
//! Used by the test suite and by hosts that want to exercise the
//! controllers without a running service. Nothing here is persisted.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use taskdeck_shared::{
    AuthSession, SignInArgs, SignUpArgs, TaskCreate, TaskToggleArgs, TaskUpdateArgs,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{AuthGateway, TaskGateway};
use crate::error::GatewayError;
use crate::task::{Task, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    List,
    Create,
    Update,
    Toggle,
    Remove,
    SignIn,
    SignUp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    List,
    Create(TaskCreate),
    Update(TaskUpdateArgs),
    Toggle(TaskToggleArgs),
    Remove(TaskId),
    SignIn { email: String },
    SignUp { email: String, name: String },
}

impl GatewayCall {
    pub fn op(&self) -> GatewayOp {
        match self {
            Self::List => GatewayOp::List,
            Self::Create(_) => GatewayOp::Create,
            Self::Update(_) => GatewayOp::Update,
            Self::Toggle(_) => GatewayOp::Toggle,
            Self::Remove(_) => GatewayOp::Remove,
            Self::SignIn { .. } => GatewayOp::SignIn,
            Self::SignUp { .. } => GatewayOp::SignUp,
        }
    }
}

#[derive(Debug, Clone)]
struct Account {
    name: String,
    password: String,
}

#[derive(Debug, Default)]
struct Inner {
    tasks: Vec<Task>,
    next_id: u64,
    accounts: HashMap<String, Account>,
    failures: HashMap<GatewayOp, VecDeque<GatewayError>>,
    delays: HashMap<GatewayOp, VecDeque<Duration>>,
    calls: Vec<GatewayCall>,
}

#[derive(Debug)]
pub struct MemoryGateway {
    inner: Mutex<Inner>,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 1,
                ..Inner::default()
            }),
        }
    }

    /// Service-side tasks, newest first. Ids continue after the largest seed.
    pub fn seeded(tasks: Vec<Task>) -> Self {
        let next_id = tasks.iter().map(|t| t.id.0).max().unwrap_or(0).saturating_add(1);
        Self {
            inner: Mutex::new(Inner {
                tasks,
                next_id,
                ..Inner::default()
            }),
        }
    }

    pub fn with_next_id(self, next_id: u64) -> Self {
        self.inner.lock().next_id = next_id;
        self
    }

    pub fn with_account(self, email: &str, name: &str, password: &str) -> Self {
        self.inner.lock().accounts.insert(
            email.to_string(),
            Account {
                name: name.to_string(),
                password: password.to_string(),
            },
        );
        self
    }

    /// The next call of `op` fails with `err`. Queued failures are consumed in order.
    pub fn fail_next(&self, op: GatewayOp, err: GatewayError) {
        self.inner
            .lock()
            .failures
            .entry(op)
            .or_default()
            .push_back(err);
    }

    /// The next call of `op` resolves only after `delay`.
    pub fn delay_next(&self, op: GatewayOp, delay: Duration) {
        self.inner
            .lock()
            .delays
            .entry(op)
            .or_default()
            .push_back(delay);
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.inner.lock().calls.clone()
    }

    pub fn call_count(&self, op: GatewayOp) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| c.op() == op)
            .count()
    }

    pub fn stored_tasks(&self) -> Vec<Task> {
        self.inner.lock().tasks.clone()
    }

    /// Records the call and pops any scripted delay and failure for it.
    async fn begin(&self, call: GatewayCall) -> Result<(), GatewayError> {
        let op = call.op();
        let (delay, failure) = {
            let mut inner = self.inner.lock();
            inner.calls.push(call);
            let delay = inner.delays.get_mut(&op).and_then(VecDeque::pop_front);
            let failure = inner.failures.get_mut(&op).and_then(VecDeque::pop_front);
            (delay, failure)
        };

        if let Some(delay) = delay {
            debug!(?op, ?delay, "delaying scripted response");
            tokio::time::sleep(delay).await;
        }

        match failure {
            Some(err) => {
                debug!(?op, error = %err, "returning scripted failure");
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn session_for(email: &str, name: &str) -> AuthSession {
        AuthSession {
            token: Uuid::new_v4().to_string(),
            user_id: None,
            user_name: Some(name.to_string()),
            user_email: Some(email.to_string()),
        }
    }
}

#[async_trait]
impl TaskGateway for MemoryGateway {
    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Task>, GatewayError> {
        self.begin(GatewayCall::List).await?;
        Ok(self.inner.lock().tasks.clone())
    }

    #[instrument(skip(self, create), fields(title_len = create.title.len()))]
    async fn create(&self, create: TaskCreate) -> Result<Task, GatewayError> {
        self.begin(GatewayCall::Create(create.clone())).await?;
        let mut inner = self.inner.lock();
        let task = Task {
            id: TaskId(inner.next_id),
            title: create.title,
            description: create.description,
            completed: create.completed,
            created_at: Utc::now(),
        };
        inner.next_id = inner.next_id.saturating_add(1);
        inner.tasks.insert(0, task.clone());
        Ok(task)
    }

    #[instrument(skip(self, args), fields(id = %args.id))]
    async fn update(&self, args: TaskUpdateArgs) -> Result<Task, GatewayError> {
        self.begin(GatewayCall::Update(args.clone())).await?;
        let mut inner = self.inner.lock();
        let task = inner
            .tasks
            .iter_mut()
            .find(|t| t.id == args.id)
            .ok_or(GatewayError::NotFound)?;
        task.title = args.patch.title;
        task.description = args.patch.description;
        task.completed = args.patch.completed;
        Ok(task.clone())
    }

    #[instrument(skip(self), fields(id = %args.id, completed = args.completed))]
    async fn toggle(&self, args: TaskToggleArgs) -> Result<Task, GatewayError> {
        self.begin(GatewayCall::Toggle(args)).await?;
        let mut inner = self.inner.lock();
        let task = inner
            .tasks
            .iter_mut()
            .find(|t| t.id == args.id)
            .ok_or(GatewayError::NotFound)?;
        task.completed = args.completed;
        Ok(task.clone())
    }

    #[instrument(skip(self))]
    async fn remove(&self, id: TaskId) -> Result<(), GatewayError> {
        self.begin(GatewayCall::Remove(id)).await?;
        let mut inner = self.inner.lock();
        let before = inner.tasks.len();
        inner.tasks.retain(|t| t.id != id);
        if inner.tasks.len() == before {
            return Err(GatewayError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl AuthGateway for MemoryGateway {
    #[instrument(skip(self, args), fields(email = %args.email))]
    async fn sign_in(&self, args: SignInArgs) -> Result<AuthSession, GatewayError> {
        self.begin(GatewayCall::SignIn {
            email: args.email.clone(),
        })
        .await?;
        let inner = self.inner.lock();
        match inner.accounts.get(&args.email) {
            Some(account) if account.password == args.password => {
                Ok(Self::session_for(&args.email, &account.name))
            }
            _ => Err(GatewayError::Unauthorized {
                message: Some("Invalid email or password".to_string()),
            }),
        }
    }

    #[instrument(skip(self, args), fields(email = %args.email))]
    async fn sign_up(&self, args: SignUpArgs) -> Result<AuthSession, GatewayError> {
        self.begin(GatewayCall::SignUp {
            email: args.email.clone(),
            name: args.name.clone(),
        })
        .await?;
        let mut inner = self.inner.lock();
        if inner.accounts.contains_key(&args.email) {
            return Err(GatewayError::Rejected(
                "Email already registered".to_string(),
            ));
        }
        inner.accounts.insert(
            args.email.clone(),
            Account {
                name: args.name.clone(),
                password: args.password,
            },
        );
        Ok(Self::session_for(&args.email, &args.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_assigns_ids_and_prepends() {
        let gateway = MemoryGateway::new().with_next_id(101);
        let first = gateway
            .create(TaskCreate::new("a", ""))
            .await
            .expect("create a");
        let second = gateway
            .create(TaskCreate::new("b", ""))
            .await
            .expect("create b");

        assert_eq!(first.id, TaskId(101));
        assert_eq!(second.id, TaskId(102));
        let stored: Vec<TaskId> = gateway.stored_tasks().iter().map(|t| t.id).collect();
        assert_eq!(stored, vec![TaskId(102), TaskId(101)]);
    }

    #[tokio::test]
    async fn seeding_the_largest_id_does_not_overflow() {
        let gateway = MemoryGateway::seeded(vec![Task {
            id: TaskId(u64::MAX),
            title: "last".to_string(),
            description: String::new(),
            completed: false,
            created_at: Utc::now(),
        }]);
        let created = gateway
            .create(TaskCreate::new("after", ""))
            .await
            .expect("create after max");
        assert_eq!(created.id, TaskId(u64::MAX));
    }

    #[tokio::test]
    async fn scripted_failure_is_consumed_once() {
        let gateway = MemoryGateway::new();
        gateway.fail_next(GatewayOp::List, GatewayError::Transport("down".to_string()));

        assert!(gateway.list().await.is_err());
        assert!(gateway.list().await.is_ok());
        assert_eq!(gateway.call_count(GatewayOp::List), 2);
    }

    #[tokio::test]
    async fn remove_of_unknown_id_is_not_found() {
        let gateway = MemoryGateway::new();
        assert_eq!(
            gateway.remove(TaskId(9)).await,
            Err(GatewayError::NotFound)
        );
    }

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let gateway = MemoryGateway::new();
        let session = gateway
            .sign_up(SignUpArgs {
                email: "ada@example.com".to_string(),
                password: "analytical".to_string(),
                name: "Ada".to_string(),
            })
            .await
            .expect("sign up");
        assert_eq!(session.user_name.as_deref(), Some("Ada"));

        let err = gateway
            .sign_in(SignInArgs {
                email: "ada@example.com".to_string(),
                password: "wrong-password".to_string(),
            })
            .await
            .expect_err("bad password");
        assert_eq!(err.user_message(), Some("Invalid email or password"));
    }
}
