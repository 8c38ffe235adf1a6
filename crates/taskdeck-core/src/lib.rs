//! Task dashboard state: the task collection kept in sync with a remote
//! service, the add/edit form, transient notices and the auth forms.

pub mod app;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod form;
pub mod gateway;
pub mod list;
pub mod logging;
pub mod notify;
pub mod session;
pub mod task;

pub use app::App;
pub use dashboard::{Dashboard, DashboardSummary};
pub use error::{AuthError, FormError, GatewayError, ValidationError};
pub use form::{DraftField, FormMode, TaskFormController};
pub use list::TaskListController;
pub use notify::{Notice, NoticeKind, NotificationCenter, Notifier};
pub use task::{Progress, Task, TaskId};
