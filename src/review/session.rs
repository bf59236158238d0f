use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::chat::agent::{BackendError, CritiqueBackend};
use crate::chat::prompt::{PromptBuilder, SYSTEM_PROMPT};
use crate::critique::parser::{ContractViolation, ParseMode, parse_critique};
use crate::critique::score::{Score, ScoreBand};
use crate::critique::sections::{CritiqueSections, SectionKey};
use crate::loader::document::{DocumentLoader, LoadError, Upload};

/// Where a session is in the run-analysis flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Validating,
    Extracting,
    Requesting,
    Parsing,
    Displaying,
    Error,
}

impl RequestState {
    pub fn in_flight(&self) -> bool {
        *self != RequestState::Idle
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    Backend,
    Contract,
    Busy,
}

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("please upload your resume file to proceed")]
    NoUpload,
    #[error("the uploaded file '{0}' is empty")]
    EmptyUpload(String),
    #[error("please enter the target job role")]
    BlankRole,
    #[error("could not read '{file}': {source}")]
    Unreadable {
        file: String,
        #[source]
        source: LoadError,
    },
    #[error("text extraction failed or '{0}' contains no text; please verify the uploaded document")]
    EmptyText(String),
    #[error("an error occurred during analysis: {0}")]
    Backend(#[from] BackendError),
    #[error("the model's reply did not follow the expected format: {violation}")]
    Contract {
        violation: ContractViolation,
        raw: String,
    },
    #[error("an analysis is already running")]
    Busy,
}

impl ReviewError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReviewError::NoUpload
            | ReviewError::EmptyUpload(_)
            | ReviewError::BlankRole
            | ReviewError::Unreadable { .. }
            | ReviewError::EmptyText(_) => ErrorKind::Input,
            ReviewError::Backend(_) => ErrorKind::Backend,
            ReviewError::Contract { .. } => ErrorKind::Contract,
            ReviewError::Busy => ErrorKind::Busy,
        }
    }

    /// The unparsed completion, kept for diagnosis of contract violations.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            ReviewError::Contract { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

/// Validated input for one analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub resume_text: String,
    pub job_role: String,
}

/// A successful analysis, ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub job_role: String,
    pub file_name: String,
    pub score: Score,
    pub band: ScoreBand,
    pub sections: CritiqueSections,
    pub missing: Vec<SectionKey>,
    pub raw_response: String,
    pub reviewed_at: DateTime<Utc>,
}

/// Runs analyses one at a time against a backend.
pub struct ReviewSession<B> {
    backend: B,
    mode: ParseMode,
    state: RequestState,
}

impl<B: CritiqueBackend> ReviewSession<B> {
    pub fn new(backend: B, mode: ParseMode) -> Self {
        Self {
            backend,
            mode,
            state: RequestState::Idle,
        }
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Runs the whole flow for one user action. `observer` sees every state
    /// the request passes through, ending with `Idle`.
    pub async fn analyze<F>(
        &mut self,
        upload: Option<&Upload>,
        job_role: &str,
        observer: F,
    ) -> Result<Review, ReviewError>
    where
        F: FnMut(RequestState),
    {
        if self.state.in_flight() {
            warn!("analysis requested while another one is {:?}", self.state);
            return Err(ReviewError::Busy);
        }

        let mut flight = InFlight::begin(&mut self.state, observer);
        let result = run(&self.backend, self.mode, &mut flight, upload, job_role).await;

        match &result {
            Ok(review) => info!(
                "review complete for '{}': {}",
                review.job_role, review.score
            ),
            Err(e) => {
                flight.advance(RequestState::Error);
                warn!("review failed: {}", e);
            }
        }

        result
    }
}

async fn run<B, F>(
    backend: &B,
    mode: ParseMode,
    flight: &mut InFlight<'_, F>,
    upload: Option<&Upload>,
    job_role: &str,
) -> Result<Review, ReviewError>
where
    B: CritiqueBackend,
    F: FnMut(RequestState),
{
    flight.advance(RequestState::Validating);
    let upload = upload.ok_or(ReviewError::NoUpload)?;
    let job_role = job_role.trim();
    if job_role.is_empty() {
        return Err(ReviewError::BlankRole);
    }
    if upload.is_empty() {
        return Err(ReviewError::EmptyUpload(upload.file_name.clone()));
    }

    flight.advance(RequestState::Extracting);
    let request = extract(upload, job_role).await?;

    flight.advance(RequestState::Requesting);
    let prompt = PromptBuilder::build(&request.job_role, &request.resume_text);
    let raw = backend.generate(&prompt, SYSTEM_PROMPT).await?;
    debug!("raw critique response:\n{}", raw);

    flight.advance(RequestState::Parsing);
    let parsed = match parse_critique(&raw, mode) {
        Ok(parsed) => parsed,
        Err(violation) => return Err(ReviewError::Contract { violation, raw }),
    };

    flight.advance(RequestState::Displaying);
    Ok(Review {
        job_role: request.job_role,
        file_name: upload.file_name.clone(),
        score: parsed.score,
        band: parsed.score.band(),
        missing: parsed.sections.missing(),
        sections: parsed.sections,
        raw_response: raw,
        reviewed_at: Utc::now(),
    })
}

async fn extract(upload: &Upload, job_role: &str) -> Result<AnalysisRequest, ReviewError> {
    let resume_text = DocumentLoader::extract(upload)
        .await
        .map_err(|source| ReviewError::Unreadable {
            file: upload.file_name.clone(),
            source,
        })?;

    if resume_text.trim().is_empty() {
        return Err(ReviewError::EmptyText(upload.file_name.clone()));
    }

    debug!("extracted {} characters from {}", resume_text.len(), upload.file_name);

    Ok(AnalysisRequest {
        resume_text,
        job_role: job_role.to_string(),
    })
}

/// Marks a session busy for as long as it lives; dropping it always puts the
/// session back to `Idle`.
struct InFlight<'a, F: FnMut(RequestState)> {
    state: &'a mut RequestState,
    observer: F,
}

impl<'a, F: FnMut(RequestState)> InFlight<'a, F> {
    fn begin(state: &'a mut RequestState, observer: F) -> Self {
        Self { state, observer }
    }

    fn advance(&mut self, next: RequestState) {
        debug!("request state {:?} -> {:?}", self.state, next);
        *self.state = next;
        (self.observer)(next);
    }
}

impl<F: FnMut(RequestState)> Drop for InFlight<'_, F> {
    fn drop(&mut self) {
        *self.state = RequestState::Idle;
        (self.observer)(RequestState::Idle);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::loader::document::{MIME_PDF, MIME_TEXT};

    const FULL_REPLY: &str = "<CVScore>81</CVScore>
<FirstImpression>Focused backend profile.</FirstImpression>
<ATSKeywords>Has Rust, Postgres. Missing gRPC.</ATSKeywords>
<ImpactQuantification>Add latency numbers.</ImpactQuantification>
<FormattingReadability>Clean single column.</FormattingReadability>
<OverallRecommendation>Interview.</OverallRecommendation>";

    enum Reply {
        Text(String),
        Fail(u16),
    }

    struct FakeBackend {
        reply: Reply,
        calls: Arc<AtomicUsize>,
    }

    impl FakeBackend {
        fn replying(text: &str) -> (Self, Arc<AtomicUsize>) {
            Self::new(Reply::Text(text.to_string()))
        }

        fn failing(status: u16) -> (Self, Arc<AtomicUsize>) {
            Self::new(Reply::Fail(status))
        }

        fn new(reply: Reply) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    reply,
                    calls: Arc::clone(&calls),
                },
                calls,
            )
        }
    }

    impl CritiqueBackend for FakeBackend {
        async fn generate(&self, prompt: &str, system_instruction: &str) -> Result<String, BackendError> {
            assert!(prompt.contains("<CVScore>"));
            assert_eq!(system_instruction, SYSTEM_PROMPT);
            self.calls.fetch_add(1, Ordering::SeqCst);

            match &self.reply {
                Reply::Text(text) => Ok(text.clone()),
                Reply::Fail(status) => Err(BackendError::Api {
                    status: *status,
                    message: "quota exceeded".to_string(),
                }),
            }
        }
    }

    fn text_upload(body: &str) -> Upload {
        Upload::new("resume.txt", body.as_bytes().to_vec(), MIME_TEXT)
    }

    #[tokio::test]
    async fn full_reply_produces_review() {
        let (backend, calls) = FakeBackend::replying(FULL_REPLY);
        let mut session = ReviewSession::new(backend, ParseMode::Strict);
        let mut trace = Vec::new();

        let review = session
            .analyze(Some(&text_upload("Jane Doe, Rust")), "  Backend Engineer ", |s| trace.push(s))
            .await
            .unwrap();

        assert_eq!(review.score.value(), 81);
        assert_eq!(review.band, ScoreBand::Strong);
        assert_eq!(review.job_role, "Backend Engineer");
        assert_eq!(review.sections.present().count(), 5);
        assert!(review.missing.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            trace,
            vec![
                RequestState::Validating,
                RequestState::Extracting,
                RequestState::Requesting,
                RequestState::Parsing,
                RequestState::Displaying,
                RequestState::Idle,
            ]
        );
        assert_eq!(session.state(), RequestState::Idle);
    }

    #[tokio::test]
    async fn empty_upload_never_reaches_backend() {
        let (backend, calls) = FakeBackend::replying(FULL_REPLY);
        let mut session = ReviewSession::new(backend, ParseMode::Strict);
        let upload = Upload::new("resume.pdf", Vec::new(), MIME_PDF);

        let err = session
            .analyze(Some(&upload), "Backend Engineer", |_| {})
            .await
            .unwrap_err();

        assert!(matches!(err, ReviewError::EmptyUpload(ref name) if name == "resume.pdf"));
        assert_eq!(err.kind(), ErrorKind::Input);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.state(), RequestState::Idle);
    }

    #[tokio::test]
    async fn input_errors_are_distinct() {
        let (backend, calls) = FakeBackend::replying(FULL_REPLY);
        let mut session = ReviewSession::new(backend, ParseMode::Strict);

        let no_upload = session.analyze(None, "Backend Engineer", |_| {}).await;
        assert!(matches!(no_upload, Err(ReviewError::NoUpload)));

        let blank_role = session.analyze(Some(&text_upload("resume")), "   ", |_| {}).await;
        assert!(matches!(blank_role, Err(ReviewError::BlankRole)));

        let whitespace = session.analyze(Some(&text_upload(" \n\t ")), "SRE", |_| {}).await;
        assert!(matches!(whitespace, Err(ReviewError::EmptyText(_))));

        let unsupported = Upload::new("resume.docx", b"PK".to_vec(), "application/zip");
        let unsupported = session.analyze(Some(&unsupported), "SRE", |_| {}).await;
        assert!(matches!(unsupported, Err(ReviewError::EmptyText(_))));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unclosed_section_surfaces_raw_reply() {
        let reply = FULL_REPLY.replace("</FirstImpression>", "");
        let (backend, _) = FakeBackend::replying(&reply);
        let mut session = ReviewSession::new(backend, ParseMode::Strict);
        let mut trace = Vec::new();

        let err = session
            .analyze(Some(&text_upload("resume")), "Backend Engineer", |s| trace.push(s))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Contract);
        assert!(matches!(
            err,
            ReviewError::Contract {
                violation: ContractViolation::MissingSection(SectionKey::FirstImpression),
                ..
            }
        ));
        assert_eq!(err.raw_response(), Some(reply.as_str()));
        assert!(!trace.contains(&RequestState::Displaying));
        assert_eq!(trace[trace.len() - 2..], [RequestState::Error, RequestState::Idle]);
    }

    #[tokio::test]
    async fn missing_score_is_contract_violation_even_in_partial_mode() {
        let reply = FULL_REPLY.replace("<CVScore>81</CVScore>", "<CVScore>eighty</CVScore>");
        let (backend, _) = FakeBackend::replying(&reply);
        let mut session = ReviewSession::new(backend, ParseMode::Partial);

        let err = session
            .analyze(Some(&text_upload("resume")), "Backend Engineer", |_| {})
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReviewError::Contract {
                violation: ContractViolation::MissingScore,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn partial_mode_lists_missing_sections() {
        let reply = FULL_REPLY.replace("<ATSKeywords>", "");
        let (backend, _) = FakeBackend::replying(&reply);
        let mut session = ReviewSession::new(backend, ParseMode::Partial);

        let review = session
            .analyze(Some(&text_upload("resume")), "Backend Engineer", |_| {})
            .await
            .unwrap();

        assert_eq!(review.missing, vec![SectionKey::AtsKeywords]);
        assert_eq!(review.sections.present().count(), 4);
    }

    #[tokio::test]
    async fn backend_failure_is_reported_and_not_retried() {
        let (backend, calls) = FakeBackend::failing(429);
        let mut session = ReviewSession::new(backend, ParseMode::Strict);

        let err = session
            .analyze(Some(&text_upload("resume")), "Backend Engineer", |_| {})
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Backend);
        assert!(err.to_string().contains("quota exceeded"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.state(), RequestState::Idle);
    }

    #[tokio::test]
    async fn busy_session_rejects_new_trigger() {
        let (backend, calls) = FakeBackend::replying(FULL_REPLY);
        let mut session = ReviewSession::new(backend, ParseMode::Strict);
        session.state = RequestState::Requesting;

        let err = session
            .analyze(Some(&text_upload("resume")), "Backend Engineer", |_| {})
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Busy);
        assert_eq!(session.state(), RequestState::Requesting);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn session_is_reusable_after_failure() {
        let (backend, _) = FakeBackend::replying(FULL_REPLY);
        let mut session = ReviewSession::new(backend, ParseMode::Strict);

        assert!(session.analyze(None, "SRE", |_| {}).await.is_err());
        let review = session
            .analyze(Some(&text_upload("resume")), "SRE", |_| {})
            .await
            .unwrap();

        assert_eq!(review.score.value(), 81);
    }
}
