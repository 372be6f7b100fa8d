pub mod error;
pub mod models;
pub mod report_data;
pub mod repository;

pub use error::PersistenceError;
pub use models::{
    ChatMessage, Credential, NewChatMessage, NewReport, Report, ReportSummary, ReportUpdate, User,
};
pub use report_data::{
    ClassificationData, GatewayResponseData, ReportData, ReportDataSection, UploadedFileRecord,
    UploadsData, UserInputsData,
};
pub use repository::ReportRepository;

use crate::shared::{ReportId, UserId};

/// Report and chat persistence, always scoped by the owning user.
pub trait ReportStore {
    fn create_report(&self, report: &NewReport) -> Result<Report, PersistenceError>;

    fn report_exists(&self, report_id: &ReportId) -> Result<bool, PersistenceError>;

    /// Read-modify-write merge of the structured blob; keys not touched by
    /// `update` are preserved.
    fn update_report_data(
        &self,
        report_id: &ReportId,
        user_id: &UserId,
        update: ReportUpdate,
    ) -> Result<Report, PersistenceError>;

    fn get_report(
        &self,
        report_id: &ReportId,
        user_id: &UserId,
    ) -> Result<Option<Report>, PersistenceError>;

    fn list_reports_by_user(&self, user_id: &UserId)
        -> Result<Vec<ReportSummary>, PersistenceError>;

    /// Returns `false` when no report with that id belongs to `user_id`.
    fn delete_report(&self, report_id: &ReportId, user_id: &UserId)
        -> Result<bool, PersistenceError>;

    fn append_chat_message(&self, message: &NewChatMessage)
        -> Result<ChatMessage, PersistenceError>;

    fn list_chat_messages(
        &self,
        report_id: &ReportId,
        user_id: &UserId,
    ) -> Result<Vec<ChatMessage>, PersistenceError>;
}

pub trait UserStore {
    fn insert_user(&self, user: &User) -> Result<(), PersistenceError>;

    fn get_user(&self, user_id: &UserId) -> Result<Option<User>, PersistenceError>;
}

impl<T: ReportStore + ?Sized> ReportStore for &T {
    fn create_report(&self, report: &NewReport) -> Result<Report, PersistenceError> {
        (**self).create_report(report)
    }

    fn report_exists(&self, report_id: &ReportId) -> Result<bool, PersistenceError> {
        (**self).report_exists(report_id)
    }

    fn update_report_data(
        &self,
        report_id: &ReportId,
        user_id: &UserId,
        update: ReportUpdate,
    ) -> Result<Report, PersistenceError> {
        (**self).update_report_data(report_id, user_id, update)
    }

    fn get_report(
        &self,
        report_id: &ReportId,
        user_id: &UserId,
    ) -> Result<Option<Report>, PersistenceError> {
        (**self).get_report(report_id, user_id)
    }

    fn list_reports_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ReportSummary>, PersistenceError> {
        (**self).list_reports_by_user(user_id)
    }

    fn delete_report(
        &self,
        report_id: &ReportId,
        user_id: &UserId,
    ) -> Result<bool, PersistenceError> {
        (**self).delete_report(report_id, user_id)
    }

    fn append_chat_message(
        &self,
        message: &NewChatMessage,
    ) -> Result<ChatMessage, PersistenceError> {
        (**self).append_chat_message(message)
    }

    fn list_chat_messages(
        &self,
        report_id: &ReportId,
        user_id: &UserId,
    ) -> Result<Vec<ChatMessage>, PersistenceError> {
        (**self).list_chat_messages(report_id, user_id)
    }
}

impl<T: UserStore + ?Sized> UserStore for &T {
    fn insert_user(&self, user: &User) -> Result<(), PersistenceError> {
        (**self).insert_user(user)
    }

    fn get_user(&self, user_id: &UserId) -> Result<Option<User>, PersistenceError> {
        (**self).get_user(user_id)
    }
}
