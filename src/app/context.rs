use crate::chat::ChatSession;
use crate::config::{default_state_root, load_settings, session_path, Settings};
use crate::gateway::HttpGateway;
use crate::persistence::ReportRepository;
use crate::session::{AuthService, LocalAuthProvider, SessionStore};
use crate::shared::{EventLog, ReportId};
use crate::workflow::ReportWorkflow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything a command needs, wired from one state root.
pub struct AppContext {
    pub state_root: PathBuf,
    pub settings: Settings,
    pub repository: ReportRepository,
    pub session: Arc<SessionStore>,
    pub gateway: HttpGateway,
    pub log: EventLog,
}

impl AppContext {
    pub fn load() -> Result<Self, String> {
        let state_root = default_state_root().map_err(|e| e.to_string())?;
        Self::for_state_root(&state_root)
    }

    pub fn for_state_root(state_root: &Path) -> Result<Self, String> {
        let settings = load_settings(state_root).map_err(|e| e.to_string())?;
        let log = if settings.logging.enabled {
            EventLog::for_state_root(state_root)
        } else {
            EventLog::disabled()
        };
        let repository = ReportRepository::open(&settings.resolve_database_path(state_root))
            .map_err(|e| e.to_string())?;
        repository.ensure_schema().map_err(|e| e.to_string())?;
        let session = SessionStore::persistent(&session_path(state_root))
            .map_err(|e| e.to_string())?;
        let gateway = HttpGateway::new(&settings.gateway);

        Ok(Self {
            state_root: state_root.to_path_buf(),
            settings,
            repository,
            session: Arc::new(session),
            gateway,
            log,
        })
    }

    pub fn auth_service(&self) -> AuthService<LocalAuthProvider, &ReportRepository> {
        AuthService::new(
            LocalAuthProvider::new(self.repository.clone()),
            &self.repository,
            Arc::clone(&self.session),
            self.log.clone(),
        )
    }

    pub fn workflow(&self) -> ReportWorkflow<&HttpGateway, &ReportRepository> {
        ReportWorkflow::new(
            Arc::clone(&self.session),
            &self.gateway,
            &self.repository,
            self.log.clone(),
        )
        .with_max_files(self.settings.uploads.max_files)
    }

    pub fn chat(&self, report_id: ReportId) -> ChatSession<&HttpGateway, &ReportRepository> {
        ChatSession::new(
            Arc::clone(&self.session),
            &self.gateway,
            &self.repository,
            report_id,
            self.log.clone(),
        )
    }
}
