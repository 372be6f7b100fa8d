use super::error::PersistenceError;
use super::models::{
    ChatMessage, Credential, NewChatMessage, NewReport, Report, ReportSummary, ReportUpdate, User,
};
use super::report_data::ReportData;
use super::{ReportStore, UserStore};
use crate::shared::clock::now_secs;
use crate::shared::{MessageId, ReportId, UserId};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::fs;
use std::path::{Path, PathBuf};

const MESSAGE_ID_MAX_GENERATION_ATTEMPTS: u32 = 8;

/// SQLite-backed store for users, credentials, reports and chat transcripts.
/// Every report and chat query is scoped by the owning user id.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    db_path: PathBuf,
}

type RawReportRow = (String, String, String, Option<String>, Option<String>, i64);
type RawChatRow = (String, String, String, String, bool, i64);

impl ReportRepository {
    pub fn open(db_path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent).map_err(|source| PersistenceError::CreateParent {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let repo = Self {
            db_path: db_path.to_path_buf(),
        };

        // Fail fast on an unusable path.
        let _ = repo.connect()?;
        Ok(repo)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn ensure_schema(&self) -> Result<(), PersistenceError> {
        let connection = self.connect()?;
        connection
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS users (
                    id TEXT PRIMARY KEY,
                    email TEXT NOT NULL,
                    organization_name TEXT NOT NULL,
                    created_at INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS credentials (
                    user_id TEXT PRIMARY KEY,
                    email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                    password_salt TEXT NOT NULL,
                    password_hash TEXT NOT NULL,
                    created_at INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS reports (
                    report_id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    initial_context TEXT NOT NULL,
                    text_paragraph_markdown TEXT,
                    other_json_data TEXT,
                    created_at INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS chat_messages (
                    id TEXT PRIMARY KEY,
                    report_id TEXT NOT NULL
                        REFERENCES reports(report_id)
                        ON DELETE CASCADE,
                    user_id TEXT NOT NULL,
                    content TEXT NOT NULL,
                    is_user INTEGER NOT NULL,
                    timestamp INTEGER NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_reports_user_created
                    ON reports(user_id, created_at DESC);
                CREATE INDEX IF NOT EXISTS idx_chat_messages_report_user_timestamp
                    ON chat_messages(report_id, user_id, timestamp ASC);
                ",
            )
            .map_err(sql_error)?;
        Ok(())
    }

    pub fn insert_credential(&self, credential: &Credential) -> Result<(), PersistenceError> {
        let connection = self.connect()?;
        connection
            .execute(
                "
                INSERT INTO credentials (user_id, email, password_salt, password_hash, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ",
                params![
                    credential.user_id.as_str(),
                    credential.email,
                    credential.password_salt,
                    credential.password_hash,
                    now_secs(),
                ],
            )
            .map_err(sql_error)?;
        Ok(())
    }

    pub fn find_credential_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Credential>, PersistenceError> {
        let connection = self.connect()?;
        let row = connection
            .query_row(
                "
                SELECT user_id, email, password_salt, password_hash
                FROM credentials
                WHERE email = ?1 COLLATE NOCASE
                LIMIT 1
                ",
                params![email],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()
            .map_err(sql_error)?;

        row.map(|(user_id, email, password_salt, password_hash)| {
            Ok(Credential {
                user_id: parse_user_id("credentials", &user_id)?,
                email,
                password_salt,
                password_hash,
            })
        })
        .transpose()
    }

    fn connect(&self) -> Result<Connection, PersistenceError> {
        let connection =
            Connection::open(&self.db_path).map_err(|source| PersistenceError::Open {
                path: self.db_path.display().to_string(),
                source,
            })?;
        connection
            .execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(sql_error)?;
        Ok(connection)
    }
}

impl UserStore for ReportRepository {
    fn insert_user(&self, user: &User) -> Result<(), PersistenceError> {
        let connection = self.connect()?;
        connection
            .execute(
                "
                INSERT INTO users (id, email, organization_name, created_at)
                VALUES (?1, ?2, ?3, ?4)
                ",
                params![
                    user.id.as_str(),
                    user.email,
                    user.organization_name,
                    user.created_at
                ],
            )
            .map_err(sql_error)?;
        Ok(())
    }

    fn get_user(&self, user_id: &UserId) -> Result<Option<User>, PersistenceError> {
        let connection = self.connect()?;
        let row = connection
            .query_row(
                "
                SELECT id, email, organization_name, created_at
                FROM users
                WHERE id = ?1
                ",
                params![user_id.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()
            .map_err(sql_error)?;

        row.map(|(id, email, organization_name, created_at)| {
            Ok(User {
                id: parse_user_id("users", &id)?,
                email,
                organization_name,
                created_at,
            })
        })
        .transpose()
    }
}

impl ReportStore for ReportRepository {
    fn create_report(&self, report: &NewReport) -> Result<Report, PersistenceError> {
        let connection = self.connect()?;
        let inserted = connection
            .execute(
                "
                INSERT INTO reports (
                    report_id, user_id, initial_context,
                    text_paragraph_markdown, other_json_data, created_at
                ) VALUES (?1, ?2, ?3, NULL, NULL, ?4)
                ON CONFLICT(report_id) DO NOTHING
                ",
                params![
                    report.report_id.as_str(),
                    report.user_id.as_str(),
                    report.initial_context,
                    report.created_at,
                ],
            )
            .map_err(sql_error)?;
        if inserted == 0 {
            return Err(PersistenceError::ReportIdTaken {
                report_id: report.report_id.to_string(),
            });
        }

        Ok(Report {
            report_id: report.report_id.clone(),
            user_id: report.user_id.clone(),
            initial_context: report.initial_context.clone(),
            text_paragraph_markdown: None,
            other_json_data: None,
            created_at: report.created_at,
        })
    }

    fn report_exists(&self, report_id: &ReportId) -> Result<bool, PersistenceError> {
        let connection = self.connect()?;
        let exists = connection
            .query_row(
                "SELECT 1 FROM reports WHERE report_id = ?1 LIMIT 1",
                params![report_id.as_str()],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .map_err(sql_error)?
            .is_some();
        Ok(exists)
    }

    fn update_report_data(
        &self,
        report_id: &ReportId,
        user_id: &UserId,
        update: ReportUpdate,
    ) -> Result<Report, PersistenceError> {
        let mut connection = self.connect()?;
        // IMMEDIATE takes the write lock before the read so concurrent merges
        // on the same report serialize instead of losing updates.
        let tx = connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(sql_error)?;

        let Some(current) = load_report(&tx, report_id, user_id)? else {
            tx.rollback().map_err(sql_error)?;
            return Err(PersistenceError::ReportNotFound {
                report_id: report_id.to_string(),
                user_id: user_id.to_string(),
            });
        };

        let mut data = current.other_json_data.unwrap_or_default();
        for section in update.sections {
            data.apply_section(section)
                .map_err(|source| PersistenceError::Json {
                    report_id: report_id.to_string(),
                    source,
                })?;
        }
        let encoded = if data.is_empty() {
            None
        } else {
            Some(
                serde_json::to_string(&data).map_err(|source| PersistenceError::Json {
                    report_id: report_id.to_string(),
                    source,
                })?,
            )
        };

        tx.execute(
            "
            UPDATE reports
            SET other_json_data = ?3,
                text_paragraph_markdown = COALESCE(?4, text_paragraph_markdown)
            WHERE report_id = ?1 AND user_id = ?2
            ",
            params![
                report_id.as_str(),
                user_id.as_str(),
                encoded,
                update.markdown
            ],
        )
        .map_err(sql_error)?;

        let updated = load_report(&tx, report_id, user_id)?.ok_or_else(|| {
            PersistenceError::ReportNotFound {
                report_id: report_id.to_string(),
                user_id: user_id.to_string(),
            }
        })?;
        tx.commit().map_err(sql_error)?;
        Ok(updated)
    }

    fn get_report(
        &self,
        report_id: &ReportId,
        user_id: &UserId,
    ) -> Result<Option<Report>, PersistenceError> {
        let connection = self.connect()?;
        load_report(&connection, report_id, user_id)
    }

    fn list_reports_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ReportSummary>, PersistenceError> {
        let connection = self.connect()?;
        let mut statement = connection
            .prepare(
                "
                SELECT report_id, created_at
                FROM reports
                WHERE user_id = ?1
                ORDER BY created_at DESC, rowid DESC
                ",
            )
            .map_err(sql_error)?;

        let rows = statement
            .query_map(params![user_id.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(sql_error)?;

        let mut out = Vec::new();
        for row in rows {
            let (report_id, created_at) = row.map_err(sql_error)?;
            out.push(ReportSummary {
                report_id: parse_report_id("reports", &report_id)?,
                created_at,
            });
        }
        Ok(out)
    }

    fn delete_report(
        &self,
        report_id: &ReportId,
        user_id: &UserId,
    ) -> Result<bool, PersistenceError> {
        let connection = self.connect()?;
        let deleted = connection
            .execute(
                "DELETE FROM reports WHERE report_id = ?1 AND user_id = ?2",
                params![report_id.as_str(), user_id.as_str()],
            )
            .map_err(sql_error)?;
        Ok(deleted > 0)
    }

    fn append_chat_message(
        &self,
        message: &NewChatMessage,
    ) -> Result<ChatMessage, PersistenceError> {
        let connection = self.connect()?;
        for _ in 0..MESSAGE_ID_MAX_GENERATION_ATTEMPTS {
            let id = MessageId::generate(message.timestamp / 1000).map_err(|reason| {
                PersistenceError::InvalidRow {
                    table: "chat_messages",
                    reason,
                }
            })?;
            let inserted = connection
                .execute(
                    "
                    INSERT INTO chat_messages (id, report_id, user_id, content, is_user, timestamp)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ON CONFLICT(id) DO NOTHING
                    ",
                    params![
                        id.as_str(),
                        message.report_id.as_str(),
                        message.user_id.as_str(),
                        message.content,
                        message.is_user,
                        message.timestamp,
                    ],
                )
                .map_err(sql_error)?;
            if inserted == 1 {
                return Ok(ChatMessage {
                    id,
                    report_id: message.report_id.clone(),
                    user_id: message.user_id.clone(),
                    content: message.content.clone(),
                    is_user: message.is_user,
                    timestamp: message.timestamp,
                });
            }
        }
        Err(PersistenceError::IdAllocation {
            kind: "message id",
            attempts: MESSAGE_ID_MAX_GENERATION_ATTEMPTS,
        })
    }

    fn list_chat_messages(
        &self,
        report_id: &ReportId,
        user_id: &UserId,
    ) -> Result<Vec<ChatMessage>, PersistenceError> {
        let connection = self.connect()?;
        let mut statement = connection
            .prepare(
                "
                SELECT id, report_id, user_id, content, is_user, timestamp
                FROM chat_messages
                WHERE report_id = ?1 AND user_id = ?2
                ORDER BY timestamp ASC, rowid ASC
                ",
            )
            .map_err(sql_error)?;

        let rows = statement
            .query_map(params![report_id.as_str(), user_id.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, bool>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            })
            .map_err(sql_error)?;

        let mut out = Vec::new();
        for row in rows {
            let raw: RawChatRow = row.map_err(sql_error)?;
            out.push(chat_message_from_row(raw)?);
        }
        Ok(out)
    }
}

fn load_report(
    connection: &Connection,
    report_id: &ReportId,
    user_id: &UserId,
) -> Result<Option<Report>, PersistenceError> {
    let row: Option<RawReportRow> = connection
        .query_row(
            "
            SELECT report_id, user_id, initial_context,
                   text_paragraph_markdown, other_json_data, created_at
            FROM reports
            WHERE report_id = ?1 AND user_id = ?2
            ",
            params![report_id.as_str(), user_id.as_str()],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            },
        )
        .optional()
        .map_err(sql_error)?;

    row.map(report_from_row).transpose()
}

fn report_from_row(raw: RawReportRow) -> Result<Report, PersistenceError> {
    let (report_id, user_id, initial_context, markdown, data, created_at) = raw;
    let other_json_data = data
        .map(|raw| {
            serde_json::from_str::<ReportData>(&raw).map_err(|source| PersistenceError::Json {
                report_id: report_id.clone(),
                source,
            })
        })
        .transpose()?;
    Ok(Report {
        report_id: parse_report_id("reports", &report_id)?,
        user_id: parse_user_id("reports", &user_id)?,
        initial_context,
        text_paragraph_markdown: markdown,
        other_json_data,
        created_at,
    })
}

fn chat_message_from_row(raw: RawChatRow) -> Result<ChatMessage, PersistenceError> {
    let (id, report_id, user_id, content, is_user, timestamp) = raw;
    Ok(ChatMessage {
        id: MessageId::parse(&id).map_err(|reason| PersistenceError::InvalidRow {
            table: "chat_messages",
            reason,
        })?,
        report_id: parse_report_id("chat_messages", &report_id)?,
        user_id: parse_user_id("chat_messages", &user_id)?,
        content,
        is_user,
        timestamp,
    })
}

fn parse_report_id(table: &'static str, raw: &str) -> Result<ReportId, PersistenceError> {
    ReportId::parse(raw).map_err(|reason| PersistenceError::InvalidRow { table, reason })
}

fn parse_user_id(table: &'static str, raw: &str) -> Result<UserId, PersistenceError> {
    UserId::parse(raw).map_err(|reason| PersistenceError::InvalidRow { table, reason })
}

fn sql_error(source: rusqlite::Error) -> PersistenceError {
    PersistenceError::Sql { source }
}
