use super::error::ChatError;
use crate::gateway::AnalysisGateway;
use crate::persistence::{ChatMessage, NewChatMessage, ReportStore, User};
use crate::session::SessionStore;
use crate::shared::clock::now_millis;
use crate::shared::{EventLog, ReportId};
use std::sync::Arc;

pub const FALLBACK_REPLY: &str = "Sorry, I couldn't process your request.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatExchange {
    pub user_message: ChatMessage,
    pub assistant_message: ChatMessage,
    pub used_fallback: bool,
}

/// Conversation about one report, scoped to the signed-in user.
pub struct ChatSession<G, S> {
    session: Arc<SessionStore>,
    gateway: G,
    store: S,
    report_id: ReportId,
    log: EventLog,
}

impl<G: AnalysisGateway, S: ReportStore> ChatSession<G, S> {
    pub fn new(
        session: Arc<SessionStore>,
        gateway: G,
        store: S,
        report_id: ReportId,
        log: EventLog,
    ) -> Self {
        Self {
            session,
            gateway,
            store,
            report_id,
            log,
        }
    }

    pub fn report_id(&self) -> &ReportId {
        &self.report_id
    }

    pub fn load_history(&self) -> Result<Vec<ChatMessage>, ChatError> {
        let user = self.current_user()?;
        Ok(self.store.list_chat_messages(&self.report_id, &user.id)?)
    }

    /// Persists the user's message, asks the gateway and persists the reply.
    /// A gateway failure leaves the user's message stored.
    pub fn send_message(&self, content: &str) -> Result<ChatExchange, ChatError> {
        if content.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let user = self.current_user()?;
        if self.store.get_report(&self.report_id, &user.id)?.is_none() {
            return Err(ChatError::ReportNotFound {
                report_id: self.report_id.to_string(),
            });
        }

        let user_message = self.store.append_chat_message(&NewChatMessage {
            report_id: self.report_id.clone(),
            user_id: user.id.clone(),
            content: content.to_string(),
            is_user: true,
            timestamp: now_millis(),
        })?;

        let reply = match self.gateway.chat(&self.report_id, content) {
            Ok(reply) => reply,
            Err(err) => {
                self.log
                    .error("chat.reply_failed", &format!("{}: {err}", self.report_id));
                return Err(err.into());
            }
        };
        let used_fallback = reply.response.is_none();
        let text = reply
            .response
            .unwrap_or_else(|| FALLBACK_REPLY.to_string());

        let assistant_message = self.store.append_chat_message(&NewChatMessage {
            report_id: self.report_id.clone(),
            user_id: user.id,
            content: text,
            is_user: false,
            timestamp: now_millis().max(user_message.timestamp),
        })?;
        Ok(ChatExchange {
            user_message,
            assistant_message,
            used_fallback,
        })
    }

    fn current_user(&self) -> Result<User, ChatError> {
        self.session
            .require_user()
            .map_err(|_| ChatError::NotAuthenticated)
    }
}
