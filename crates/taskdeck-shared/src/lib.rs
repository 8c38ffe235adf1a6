use std::fmt;

use chrono::{
  DateTime,
  Utc
};
use serde::{
  Deserialize,
  Serialize
};

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl From<u64> for TaskId {
  fn from(value: u64) -> Self {
    Self(value)
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct TaskDto {
  pub id:          TaskId,
  #[serde(default)]
  pub title:       String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub completed:   bool,
  #[serde(alias = "createdAt")]
  pub created_at:  DateTime<Utc>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct TaskCreate {
  pub title:       String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub completed:   bool
}

impl TaskCreate {
  pub fn new(
    title: impl Into<String>,
    description: impl Into<String>
  ) -> Self {
    Self {
      title:       title.into(),
      description: description.into(),
      completed:   false
    }
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct TaskPatch {
  pub title:       String,
  pub description: String,
  pub completed:   bool
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct TaskUpdateArgs {
  pub id:    TaskId,
  pub patch: TaskPatch
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct TaskToggleArgs {
  pub id:        TaskId,
  pub completed: bool
}

#[derive(
  Clone, Serialize, Deserialize,
)]
pub struct SignInArgs {
  pub email:    String,
  pub password: String
}

#[derive(
  Clone, Serialize, Deserialize,
)]
pub struct SignUpArgs {
  pub email:    String,
  pub password: String,
  pub name:     String
}

// Passwords stay out of logs.
impl fmt::Debug for SignInArgs {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.debug_struct("SignInArgs")
      .field("email", &self.email)
      .finish_non_exhaustive()
  }
}

impl fmt::Debug for SignUpArgs {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.debug_struct("SignUpArgs")
      .field("email", &self.email)
      .field("name", &self.name)
      .finish_non_exhaustive()
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct AuthSession {
  #[serde(alias = "access_token")]
  pub token:      String,
  #[serde(default)]
  pub user_id:    Option<String>,
  #[serde(default)]
  pub user_name:  Option<String>,
  #[serde(default)]
  pub user_email: Option<String>
}

/// Error payload returned by the
/// service on non-2xx responses.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  Default,
)]
pub struct ApiErrorBody {
  #[serde(default)]
  pub detail:  Option<String>,
  #[serde(default)]
  pub message: Option<String>
}

impl ApiErrorBody {
  pub fn into_message(
    self
  ) -> Option<String> {
    self
      .detail
      .or(self.message)
      .map(|m| m.trim().to_string())
      .filter(|m| !m.is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn task_dto_accepts_camel_case_created_at()
  {
    let raw = r#"{
      "id": 101,
      "title": "Buy milk",
      "completed": false,
      "createdAt": "2026-02-16T05:00:00Z"
    }"#;

    let dto: TaskDto =
      serde_json::from_str(raw)
        .expect("decode task");
    assert_eq!(dto.id, TaskId(101));
    assert_eq!(dto.description, "");
    assert!(!dto.completed);
  }

  #[test]
  fn sign_in_debug_hides_password() {
    let args = SignInArgs {
      email:    "a@b.co".to_string(),
      password: "hunter22".to_string()
    };
    let shown = format!("{args:?}");
    assert!(shown.contains("a@b.co"));
    assert!(!shown.contains("hunter22"));
  }

  #[test]
  fn api_error_prefers_detail() {
    let body: ApiErrorBody =
      serde_json::from_str(
        r#"{"detail":"Email already registered","message":"other"}"#
      )
      .expect("decode error body");
    assert_eq!(
      body.into_message().as_deref(),
      Some("Email already registered")
    );

    let empty: ApiErrorBody =
      serde_json::from_str(
        r#"{"detail":"  "}"#
      )
      .expect("decode error body");
    assert_eq!(empty.into_message(), None);
  }
}
