use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::auth::AuthFlow;
use crate::config::Settings;
use crate::dashboard::Dashboard;
use crate::gateway::{AuthGateway, HttpGateway, TaskGateway};
use crate::list::TaskListController;
use crate::notify::NotificationCenter;
use crate::session::{FileSessionStore, SessionStore};

/// Everything a view host needs, wired once per application session.
pub struct App {
    pub dashboard: Dashboard,
    pub auth: AuthFlow,
    pub notices: Arc<NotificationCenter>,
    pub session: Arc<dyn SessionStore>,
}

impl App {
    /// Wires the HTTP gateway and on-disk session store from settings.
    #[tracing::instrument(skip(settings), fields(base_url = %settings.api_base_url))]
    pub fn bootstrap(settings: &Settings) -> anyhow::Result<Self> {
        let session: Arc<dyn SessionStore> = Arc::new(
            FileSessionStore::open(&settings.session_path).with_context(|| {
                format!(
                    "failed to open session store at {}",
                    settings.session_path.display()
                )
            })?,
        );
        let gateway = Arc::new(
            HttpGateway::new(&settings.api_base_url, settings.api_timeout, session.clone())
                .context("failed to build http gateway")?,
        );

        info!("application wired");
        Ok(Self::with_parts(gateway.clone(), gateway, session, settings))
    }

    pub fn with_parts(
        tasks: Arc<dyn TaskGateway>,
        auth: Arc<dyn AuthGateway>,
        session: Arc<dyn SessionStore>,
        settings: &Settings,
    ) -> Self {
        let notices = Arc::new(NotificationCenter::new(settings.notice_max_visible));
        let list = Arc::new(
            TaskListController::new(tasks, notices.clone())
                .with_notice_duration(settings.notice_duration),
        );
        Self {
            dashboard: Dashboard::new(list, notices.clone(), session.clone()),
            auth: AuthFlow::new(auth, session.clone()),
            notices,
            session,
        }
    }
}
