//! Conversation controller and per-session state.
//!
//! A [`SessionContext`] is explicit state passed into every controller
//! operation — no globals — so the HTTP surface can hold one context per
//! session id. Two events drive it:
//!
//! - **upload**: extract the PDF text, persist it, request a summary from
//!   the model, persist and store the summary. Guarded by the
//!   summary-computed flag: at most one summary per session, and repeated
//!   uploads re-display the stored one without recomputation.
//! - **question**: build a prompt grounding the question in the document
//!   text, request an answer, append the entry to the durable transcript
//!   and the in-session sequence. Entries are append-only, arrival order.

use anyhow::Result;
use serde::Serialize;

use crate::extract;
use crate::model::{LanguageModel, ModelOutcome};
use crate::storage::{Storage, CHAT_HISTORY_FILE, EXTRACTED_CONTENT_FILE, SUMMARY_FILE};

const SUMMARY_PROMPT_HEADER: &str = "You are a study assistant chatbot. Generate a detailed summary and key bullet points for the purpose of studying from the provided document content. Make sure it is useful information:";
const SUMMARY_PROMPT_FOOTER: &str = "Provide detailed responses without unnecessary elaboration.";
const QUESTION_PROMPT_HEADER: &str = "You are a study assistant chatbot. Use the provided document content to answer user queries accurately that can help with studies:";

/// Builds the one-shot summary prompt for a document.
pub fn summary_prompt(document_content: &str) -> String {
    format!(
        "{}\n\n{}\n\n{}",
        SUMMARY_PROMPT_HEADER, document_content, SUMMARY_PROMPT_FOOTER
    )
}

/// Builds the grounded prompt for a user question.
pub fn question_prompt(document_content: &str, question: &str) -> String {
    format!(
        "{}\n\n{}\n\nUser's question: {}",
        QUESTION_PROMPT_HEADER, document_content, question
    )
}

/// One question/answer pair in the session transcript.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptEntry {
    pub question: String,
    pub answer: String,
}

impl TranscriptEntry {
    /// Durable-file form: `User: <q>\nChatbot: <a>\n\n`.
    pub fn formatted(&self) -> String {
        format!("User: {}\nChatbot: {}\n\n", self.question, self.answer)
    }
}

/// Per-session conversation state. Created on first upload (or resumed from
/// the durable files for the CLI), lives until the process or session ends.
#[derive(Debug, Default)]
pub struct SessionContext {
    pub summary_generated: bool,
    /// Full extracted text of the uploaded document; immutable after upload.
    pub document_content: String,
    pub summary: Option<String>,
    pub transcript: Vec<TranscriptEntry>,
}

/// Result of an upload event.
#[derive(Debug)]
pub struct UploadResult {
    /// Summary text shown to the user (may be the legacy service-error
    /// string — stored and displayed like a normal summary).
    pub summary: String,
    /// False when the stored summary was re-displayed without recomputation.
    pub freshly_computed: bool,
    /// Whether the model call produced a real answer (true for re-display).
    pub ok: bool,
    /// HTTP status from the model endpoint when `ok` is false.
    pub service_status: Option<u16>,
    /// Malformed response lines dropped while assembling the summary.
    pub skipped_lines: usize,
}

/// Result of a question event.
#[derive(Debug)]
pub struct QuestionResult {
    pub answer: String,
    /// False when the answer is the legacy service-error string.
    pub ok: bool,
    /// HTTP status from the model endpoint when `ok` is false.
    pub service_status: Option<u16>,
    pub skipped_lines: usize,
}

fn service_status(outcome: &ModelOutcome) -> Option<u16> {
    match outcome {
        ModelOutcome::ServiceError { status, .. } => Some(*status),
        ModelOutcome::Answer(_) => None,
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resumes a context from the durable files: document content from
    /// `extracted_content.txt` (empty when missing — questions still go
    /// through) and the stored summary, if any. Used by the CLI, where each
    /// invocation is a fresh process.
    pub fn resume(storage: &Storage) -> Result<Self> {
        let document_content = storage
            .read_text_opt(EXTRACTED_CONTENT_FILE)?
            .unwrap_or_default();
        let summary = storage.read_text_opt(SUMMARY_FILE)?;
        Ok(Self {
            summary_generated: summary.is_some(),
            document_content,
            summary,
            transcript: Vec::new(),
        })
    }

    /// Upload event. Extracts text from the PDF bytes, persists it, and
    /// requests a summary — unless one was already computed for this
    /// session, in which case the stored summary is returned untouched.
    pub async fn handle_upload(
        &mut self,
        pdf_bytes: &[u8],
        storage: &Storage,
        model: &dyn LanguageModel,
    ) -> Result<UploadResult> {
        if self.summary_generated {
            let summary = self.summary.clone().unwrap_or_default();
            return Ok(UploadResult {
                summary,
                freshly_computed: false,
                ok: true,
                service_status: None,
                skipped_lines: 0,
            });
        }

        let text = extract::extract_pdf(pdf_bytes)?;
        storage.save_text(&text, EXTRACTED_CONTENT_FILE, false)?;
        self.document_content = text;

        let reply = model.generate(&summary_prompt(&self.document_content)).await?;
        let summary = reply.outcome.display_text().to_string();
        storage.save_text(&summary, SUMMARY_FILE, false)?;

        self.summary = Some(summary.clone());
        self.summary_generated = true;

        Ok(UploadResult {
            summary,
            freshly_computed: true,
            ok: reply.outcome.is_answer(),
            service_status: service_status(&reply.outcome),
            skipped_lines: reply.skipped_lines,
        })
    }

    /// Question event. Issues the request even when the document content is
    /// empty; the model's reply (or the legacy error string) is appended to
    /// the durable transcript and the in-session sequence.
    pub async fn handle_question(
        &mut self,
        question: &str,
        storage: &Storage,
        model: &dyn LanguageModel,
    ) -> Result<QuestionResult> {
        let reply = model
            .generate(&question_prompt(&self.document_content, question))
            .await?;
        let ok = reply.outcome.is_answer();
        let status = service_status(&reply.outcome);
        let answer = reply.outcome.display_text().to_string();

        let entry = TranscriptEntry {
            question: question.to_string(),
            answer: answer.clone(),
        };
        storage.save_text(&entry.formatted(), CHAT_HISTORY_FILE, true)?;
        self.transcript.push(entry);

        Ok(QuestionResult {
            answer,
            ok,
            service_status: status,
            skipped_lines: reply.skipped_lines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelOutcome, ModelReply, NO_RESPONSE_FALLBACK};
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Scripted model double: pops replies in order and records prompts.
    struct ScriptedModel {
        replies: Mutex<Vec<ModelOutcome>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<ModelOutcome>) -> Self {
            let mut replies = replies;
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn answering(text: &str) -> Self {
            Self::new(vec![ModelOutcome::Answer(text.to_string())])
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn generate(&self, prompt: &str) -> Result<ModelReply> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let outcome = self
                .replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| ModelOutcome::Answer(NO_RESPONSE_FALLBACK.to_string()));
            Ok(ModelReply {
                outcome,
                skipped_lines: 0,
            })
        }
    }

    fn storage() -> (TempDir, Storage) {
        let tmp = TempDir::new().unwrap();
        let storage = Storage::new(tmp.path()).unwrap();
        (tmp, storage)
    }

    #[test]
    fn prompts_embed_document_and_question() {
        let p = summary_prompt("DOC TEXT");
        assert!(p.contains("study assistant chatbot"));
        assert!(p.contains("DOC TEXT"));
        assert!(p.ends_with("Provide detailed responses without unnecessary elaboration."));

        let q = question_prompt("DOC TEXT", "What is this?");
        assert!(q.contains("DOC TEXT"));
        assert!(q.ends_with("User's question: What is this?"));
    }

    #[test]
    fn transcript_entry_format_matches_legacy_file() {
        let entry = TranscriptEntry {
            question: "Q1".to_string(),
            answer: "A1".to_string(),
        };
        assert_eq!(entry.formatted(), "User: Q1\nChatbot: A1\n\n");
    }

    #[tokio::test]
    async fn second_upload_redisplays_without_recomputation() {
        let (_tmp, storage) = storage();
        let model = ScriptedModel::answering("the summary");
        let mut session = SessionContext::new();
        session.summary_generated = true;
        session.summary = Some("stored summary".to_string());

        // Garbage bytes: with the flag set, neither extraction nor the
        // model must be touched.
        let result = session
            .handle_upload(b"not a pdf", &storage, &model)
            .await
            .unwrap();
        assert_eq!(result.summary, "stored summary");
        assert!(!result.freshly_computed);
        assert!(model.prompts().is_empty());
    }

    #[tokio::test]
    async fn upload_with_corrupt_pdf_propagates_extraction_error() {
        let (_tmp, storage) = storage();
        let model = ScriptedModel::answering("unused");
        let mut session = SessionContext::new();
        let err = session.handle_upload(b"not a pdf", &storage, &model).await;
        assert!(err.is_err());
        assert!(model.prompts().is_empty());
        assert!(!session.summary_generated);
    }

    #[tokio::test]
    async fn question_with_empty_document_still_issues_request() {
        let (_tmp, storage) = storage();
        let model = ScriptedModel::answering("an answer");
        let mut session = SessionContext::new();

        let result = session
            .handle_question("What is the main topic?", &storage, &model)
            .await
            .unwrap();
        assert_eq!(result.answer, "an answer");
        assert!(result.ok);
        let prompts = model.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].ends_with("User's question: What is the main topic?"));
    }

    #[tokio::test]
    async fn transcript_preserves_order_in_file_and_session() {
        let (_tmp, storage) = storage();
        let model = ScriptedModel::new(vec![
            ModelOutcome::Answer("A1".to_string()),
            ModelOutcome::Answer("A2".to_string()),
        ]);
        let mut session = SessionContext::new();

        session.handle_question("Q1", &storage, &model).await.unwrap();
        session.handle_question("Q2", &storage, &model).await.unwrap();

        let file = storage.read_text(CHAT_HISTORY_FILE).unwrap();
        assert_eq!(file, "User: Q1\nChatbot: A1\n\nUser: Q2\nChatbot: A2\n\n");
        let q1 = file.find("Q1").unwrap();
        let q2 = file.find("Q2").unwrap();
        assert!(q1 < q2);
        assert_eq!(session.transcript.len(), 2);
        assert_eq!(session.transcript[0].question, "Q1");
        assert_eq!(session.transcript[1].question, "Q2");
    }

    #[tokio::test]
    async fn service_error_is_recorded_as_a_normal_answer() {
        let (_tmp, storage) = storage();
        let message = crate::model::service_error_message(500);
        let model = ScriptedModel::new(vec![ModelOutcome::ServiceError {
            status: 500,
            message: message.clone(),
        }]);
        let mut session = SessionContext::new();

        let result = session.handle_question("Q", &storage, &model).await.unwrap();
        assert!(!result.ok);
        assert_eq!(result.service_status, Some(500));
        assert_eq!(result.answer, message);
        let file = storage.read_text(CHAT_HISTORY_FILE).unwrap();
        assert!(file.contains("Chatbot: Error: 500 - Unable to process the request."));
    }

    #[tokio::test]
    async fn resume_loads_document_and_summary_from_disk() {
        let (_tmp, storage) = storage();
        storage
            .save_text("persisted doc", EXTRACTED_CONTENT_FILE, false)
            .unwrap();
        storage.save_text("persisted summary", SUMMARY_FILE, false).unwrap();

        let session = SessionContext::resume(&storage).unwrap();
        assert_eq!(session.document_content, "persisted doc");
        assert_eq!(session.summary.as_deref(), Some("persisted summary"));
        assert!(session.summary_generated);

        // Fresh directory: empty document content, no summary.
        let (_tmp2, empty) = self::storage();
        let session = SessionContext::resume(&empty).unwrap();
        assert_eq!(session.document_content, "");
        assert!(!session.summary_generated);
    }
}
