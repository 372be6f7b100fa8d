use super::error::WorkflowError;
use super::state::{derive_form_fields, WorkflowState, WorkflowStep};
use crate::config::settings::DEFAULT_MAX_UPLOAD_FILES;
use crate::gateway::{AnalysisGateway, UploadFile, UploadReceipt};
use crate::persistence::{
    ClassificationData, GatewayResponseData, NewReport, PersistenceError, ReportDataSection,
    ReportStore, ReportUpdate, UploadedFileRecord, UploadsData, UserInputsData,
};
use crate::session::SessionStore;
use crate::shared::clock::now_secs;
use crate::shared::{EventLog, ReportId, UserId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const REPORT_ID_MAX_GENERATION_ATTEMPTS: u32 = 8;

/// Marks a workflow instance as abandoned. Clones share the same flag.
#[derive(Debug, Clone)]
pub struct AbandonHandle {
    epoch: Arc<AtomicU64>,
}

impl AbandonHandle {
    pub fn abandon(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    pub report_id: ReportId,
    pub form_fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOutcome {
    pub report_id: ReportId,
    pub markdown: Option<String>,
    pub narrative_stored: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    pub report_id: ReportId,
    pub files: Vec<UploadedFileRecord>,
    pub receipt: UploadReceipt,
}

/// Drives one report through query intake, field collection and final
/// submission. State only advances after the remote call and the local
/// write for that step both succeed.
pub struct ReportWorkflow<G, S> {
    session: Arc<SessionStore>,
    gateway: G,
    store: S,
    log: EventLog,
    max_files: usize,
    state: WorkflowState,
    abandon_epoch: Arc<AtomicU64>,
    started_epoch: u64,
}

impl<G: AnalysisGateway, S: ReportStore> ReportWorkflow<G, S> {
    pub fn new(session: Arc<SessionStore>, gateway: G, store: S, log: EventLog) -> Self {
        Self {
            session,
            gateway,
            store,
            log,
            max_files: DEFAULT_MAX_UPLOAD_FILES,
            state: WorkflowState::default(),
            abandon_epoch: Arc::new(AtomicU64::new(0)),
            started_epoch: 0,
        }
    }

    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn step(&self) -> WorkflowStep {
        self.state.step
    }

    pub fn report_id(&self) -> Option<&ReportId> {
        self.state.report_id.as_ref()
    }

    pub fn form_fields(&self) -> &[String] {
        &self.state.form_fields
    }

    pub fn abandon_handle(&self) -> AbandonHandle {
        AbandonHandle {
            epoch: Arc::clone(&self.abandon_epoch),
        }
    }

    /// Drops all instance state. Handles issued before the restart no
    /// longer affect this workflow.
    pub fn restart(&mut self) {
        self.state = WorkflowState::default();
        self.abandon_epoch = Arc::new(AtomicU64::new(0));
        self.started_epoch = 0;
    }

    pub fn submit_query(&mut self, query: &str) -> Result<QueryOutcome, WorkflowError> {
        self.ensure_live()?;
        let query = query.trim();
        if query.is_empty() {
            return Err(WorkflowError::EmptyQuery);
        }
        let user = self
            .session
            .require_user()
            .map_err(|_| WorkflowError::NotAuthenticated)?;
        self.ensure_step("submit_query", WorkflowStep::QueryIntake)?;

        let report_id = self.insert_report(&user.id, query)?;
        self.log.info(
            "workflow.report_created",
            &format!("report {report_id} for user {}", user.id),
        );

        let classification = match self.gateway.classify(query, &report_id) {
            Ok(classification) => classification,
            Err(err) => {
                self.log
                    .error("workflow.classify_failed", &format!("{report_id}: {err}"));
                return Err(err.into());
            }
        };
        self.ensure_live()?;

        let form_fields = derive_form_fields(&classification.requested_data);
        self.store.update_report_data(
            &report_id,
            &user.id,
            ReportUpdate::section(ReportDataSection::Classification(ClassificationData {
                api_calls: classification.api_calls.clone(),
                requested_data: classification.requested_data.clone(),
                form_fields: form_fields.clone(),
            })),
        )?;

        self.state = WorkflowState {
            step: WorkflowStep::QueryIntake,
            analysis_query: query.to_string(),
            api_calls: classification.api_calls,
            requested_data: classification.requested_data,
            form_fields: form_fields.clone(),
            user_inputs: Default::default(),
            report_id: Some(report_id.clone()),
        };
        self.advance(WorkflowStep::FieldCollection);
        self.log.info(
            "workflow.classified",
            &format!("{report_id}: {} form fields", form_fields.len()),
        );
        Ok(QueryOutcome {
            report_id,
            form_fields,
        })
    }

    pub fn record_field(&mut self, name: &str, value: &str) -> Result<(), WorkflowError> {
        self.ensure_live()?;
        self.ensure_step("record_field", WorkflowStep::FieldCollection)?;
        if !self.state.form_fields.iter().any(|field| field == name) {
            return Err(WorkflowError::UnknownField {
                field: name.to_string(),
            });
        }
        self.state
            .user_inputs
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    pub fn missing_fields(&self) -> Vec<String> {
        self.state.missing_fields()
    }

    /// Sends the collected inputs for analysis. Completeness is not checked
    /// here; callers consult [`ReportWorkflow::missing_fields`] first.
    pub fn submit_final(&mut self) -> Result<AnalysisOutcome, WorkflowError> {
        self.ensure_live()?;
        self.ensure_step("submit_final", WorkflowStep::FieldCollection)?;
        let user = self
            .session
            .require_user()
            .map_err(|_| WorkflowError::NotAuthenticated)?;
        let report_id = self
            .state
            .report_id
            .clone()
            .ok_or(WorkflowError::ReportNotAssigned)?;

        let payloads = self.state.api_call_payloads();
        let response = match self.gateway.analyze(&payloads, &report_id) {
            Ok(response) => response,
            Err(err) => {
                self.log
                    .error("workflow.analyze_failed", &format!("{report_id}: {err}"));
                return Err(err.into());
            }
        };
        self.ensure_live()?;

        let narrative_stored = response.markdown.is_some();
        if !narrative_stored {
            self.log.warn(
                "workflow.narrative_missing",
                &format!("{report_id}: analysis returned no markdown"),
            );
        }
        self.store.update_report_data(
            &report_id,
            &user.id,
            ReportUpdate {
                markdown: response.markdown.clone(),
                sections: vec![
                    ReportDataSection::UserInputs(UserInputsData {
                        values: self.state.user_inputs.clone(),
                    }),
                    ReportDataSection::GatewayResponse(GatewayResponseData {
                        markdown_present: narrative_stored,
                        payload: response.raw,
                    }),
                ],
            },
        )?;

        self.advance(WorkflowStep::Submitted);
        self.log
            .info("workflow.submitted", &format!("report {report_id}"));
        Ok(AnalysisOutcome {
            report_id,
            markdown: response.markdown,
            narrative_stored,
        })
    }

    /// Uploads supporting documents for the current report. Never changes
    /// the workflow step.
    pub fn upload_supporting_files(
        &mut self,
        files: Vec<UploadFile>,
    ) -> Result<UploadOutcome, WorkflowError> {
        self.ensure_live()?;
        let user = self
            .session
            .require_user()
            .map_err(|_| WorkflowError::NotAuthenticated)?;
        let report_id = self
            .state
            .report_id
            .clone()
            .ok_or(WorkflowError::ReportNotAssigned)?;
        if files.is_empty() {
            return Err(WorkflowError::NoFiles);
        }
        if files.len() > self.max_files {
            return Err(WorkflowError::TooManyFiles {
                count: files.len(),
                max: self.max_files,
            });
        }

        let receipt = match self.gateway.upload(&files, &report_id) {
            Ok(receipt) => receipt,
            Err(err) => {
                self.log
                    .error("workflow.upload_failed", &format!("{report_id}: {err}"));
                return Err(err.into());
            }
        };
        self.ensure_live()?;

        let uploaded_at = now_secs();
        let records: Vec<UploadedFileRecord> = files
            .iter()
            .map(|file| UploadedFileRecord {
                file_name: file.file_name.clone(),
                size_bytes: file.size_bytes(),
                uploaded_at,
            })
            .collect();
        self.store.update_report_data(
            &report_id,
            &user.id,
            ReportUpdate::section(ReportDataSection::Uploads(UploadsData {
                files: records.clone(),
            })),
        )?;
        self.log.info(
            "workflow.uploaded",
            &format!("{report_id}: {} files", records.len()),
        );
        Ok(UploadOutcome {
            report_id,
            files: records,
            receipt,
        })
    }

    fn ensure_live(&self) -> Result<(), WorkflowError> {
        if self.abandon_epoch.load(Ordering::SeqCst) != self.started_epoch {
            return Err(WorkflowError::Abandoned);
        }
        Ok(())
    }

    fn advance(&mut self, next: WorkflowStep) {
        if self.state.step.can_advance_to(next) {
            self.state.step = next;
        }
    }

    fn ensure_step(
        &self,
        operation: &'static str,
        expected: WorkflowStep,
    ) -> Result<(), WorkflowError> {
        if self.state.step != expected {
            return Err(WorkflowError::InvalidStep {
                operation,
                step: self.state.step,
            });
        }
        Ok(())
    }

    /// Inserts a report row under a fresh id. A candidate taken between the
    /// existence check and the insert is retried with a new id.
    fn insert_report(&self, user_id: &UserId, query: &str) -> Result<ReportId, WorkflowError> {
        for _ in 0..REPORT_ID_MAX_GENERATION_ATTEMPTS {
            let candidate = ReportId::generate(now_secs())
                .map_err(|reason| WorkflowError::IdAllocation { reason })?;
            if self.store.report_exists(&candidate)? {
                continue;
            }
            let created = self.store.create_report(&NewReport {
                report_id: candidate.clone(),
                user_id: user_id.clone(),
                initial_context: query.to_string(),
                created_at: now_secs(),
            });
            match created {
                Ok(_) => return Ok(candidate),
                Err(PersistenceError::ReportIdTaken { .. }) => {
                    self.log.warn(
                        "workflow.report_id_collision",
                        &format!("{candidate} taken during insert; retrying"),
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(WorkflowError::IdAllocation {
            reason: format!(
                "every candidate collided after {REPORT_ID_MAX_GENERATION_ATTEMPTS} attempts"
            ),
        })
    }
}
