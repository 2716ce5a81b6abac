//! Refinement loop - caption, design, then review and revise until accepted.
//!
//! The loop owns the session for the whole run. Every stage result is checked
//! before the next stage starts; a reasoning stage that exhausts its attempt
//! budget aborts the run with `RetriesExhausted`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use crate::artifact::{ArtifactStore, path_to_data_url};
use crate::error::{Result, StylerError};
use crate::id::artifact_tag;
use crate::llm::{Conversation, LlmClient, ReasoningClient};
use crate::prompt::PromptBuilder;
use crate::render::{RenderError, RenderGateway, StyleId};
use crate::response::{ReviewVerdict, Verdict, extract_payload, parse_verdict};
use crate::retry::RetryPolicy;
use crate::session::{ArtifactRef, IterationRecord, Session, SessionState, Stage};
use crate::style::{EditStructure, LayerInventory, StyleDocument, Viewport, apply_edits_with_report};
use crate::transcript::Transcript;

/// Configuration for the RefinementLoop.
#[derive(Debug, Clone)]
pub struct RefinementConfig {
    /// Stop with `IterationLimit` after this many Revision verdicts; unbounded when unset
    pub max_iterations: Option<u32>,
    /// Retry policy for publish and render calls
    pub render_policy: RetryPolicy,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            max_iterations: None,
            render_policy: RetryPolicy::single(),
        }
    }
}

impl RefinementConfig {
    pub fn new(max_iterations: Option<u32>, render_policy: RetryPolicy) -> Self {
        Self {
            max_iterations,
            render_policy,
        }
    }
}

/// Result of an accepted run.
#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    pub session_id: String,
    pub document: StyleDocument,
    pub style_id: StyleId,
    /// Number of review turns, the accepting one included
    pub reviews: u32,
    pub records: Vec<IterationRecord>,
    pub final_style_path: PathBuf,
}

pub struct RefinementLoop<L, G>
where
    L: LlmClient,
    G: RenderGateway,
{
    reasoner: ReasoningClient<L>,
    gateway: Arc<G>,
    prompts: PromptBuilder,
    artifacts: ArtifactStore,
    transcript: Arc<Transcript>,
    config: RefinementConfig,
}

impl<L, G> RefinementLoop<L, G>
where
    L: LlmClient,
    G: RenderGateway,
{
    pub fn new(
        reasoner: ReasoningClient<L>,
        gateway: Arc<G>,
        prompts: PromptBuilder,
        artifacts: ArtifactStore,
        transcript: Arc<Transcript>,
        config: RefinementConfig,
    ) -> Self {
        Self {
            reasoner,
            gateway,
            prompts,
            artifacts,
            transcript,
            config,
        }
    }

    /// Run until the reviewer accepts.
    pub async fn run(&self, reference: &Path, document: StyleDocument) -> Result<RefinementOutcome> {
        let viewport = document.viewport()?;
        let reference_url = path_to_data_url(reference)?;
        let mut session = Session::new(document);
        log::info!("Session {} started for style '{}'", session.id, session.document().name);

        // Base style as published, for comparison
        let base_id = self.publish(session.document()).await?;
        self.render_artifact(&base_id, &viewport, 0).await?;
        session.set_style_id(base_id);

        let caption = self.caption(&reference_url).await?;
        session.set_caption(caption);
        session.transition(SessionState::Captioned);

        self.design(&mut session, &reference_url).await?;
        session.transition(SessionState::StyleDesigned);

        let mut artifact = self.render_current(&mut session, &viewport).await?;
        session.transition(SessionState::Rendered);

        let mut revisions = 0u32;
        loop {
            session.transition(SessionState::AwaitingReview);
            let iteration = session.iteration();
            let verdict = self.review(&session, &reference_url, &artifact, iteration).await?;
            log::info!("Review {}: {}", iteration, verdict.kind());

            match verdict {
                ReviewVerdict::Accept => {
                    self.record(&mut session, IterationRecord::new(iteration, artifact, Verdict::Accept, None))?;
                    session.transition(SessionState::Accepted);
                    break;
                }
                ReviewVerdict::Revision(edits) => {
                    self.record(
                        &mut session,
                        IterationRecord::new(iteration, artifact.clone(), Verdict::Revision, Some(edits.clone())),
                    )?;
                    revisions += 1;
                    if let Some(limit) = self.config.max_iterations
                        && revisions >= limit
                    {
                        log::warn!("Stopping after {} revisions without acceptance", revisions);
                        return Err(StylerError::IterationLimit { iterations: revisions });
                    }

                    session.transition(SessionState::Revising);
                    self.apply_and_publish(&mut session, &edits).await?;
                    artifact = self.render_current(&mut session, &viewport).await?;
                    session.transition(SessionState::Rendered);
                }
            }
        }

        let reviews = session.iteration();
        let final_style_path = self.artifacts.save_final_style(session.document())?;
        self.transcript.record_note(
            "accepted",
            &format!("accepted after {} reviews, final style {}", reviews, final_style_path.display()),
        )?;

        let session_id = session.id.clone();
        let (document, style_id, records) = session.into_parts();
        let style_id = style_id.ok_or_else(|| StylerError::Publish("no published style at acceptance".to_string()))?;

        Ok(RefinementOutcome {
            session_id,
            document,
            style_id,
            reviews,
            records,
            final_style_path,
        })
    }

    async fn caption(&self, reference_url: &str) -> Result<String> {
        let conversation = self.prompts.caption(reference_url)?;
        let caption = self.required(Stage::Caption, self.reasoner.ask(Stage::Caption, &conversation).await)?;
        log::info!("Image caption generated");
        Ok(caption)
    }

    async fn design(&self, session: &mut Session, reference_url: &str) -> Result<()> {
        let inventory = LayerInventory::for_design(session.document());
        let caption = session.caption().unwrap_or_default().to_string();
        let conversation = self.prompts.design(reference_url, &caption, &inventory)?;

        let (payload, edits) = self.ask_payload(Stage::Design, &conversation, |payload| {
            EditStructure::from_payload(payload)
        })
        .await?;
        self.transcript.record_payload(Stage::Design, &payload)?;

        for brief in edits.icon_briefs() {
            self.transcript.record_note(
                &format!("icon brief {}", brief.layer),
                brief.expectation.as_deref().unwrap_or_default(),
            )?;
        }

        self.apply_and_publish(session, &edits).await
    }

    async fn review(
        &self,
        session: &Session,
        reference_url: &str,
        artifact: &ArtifactRef,
        iteration: u32,
    ) -> Result<ReviewVerdict> {
        let map_url = path_to_data_url(&artifact.path)?;
        let inventory = LayerInventory::for_review(session.document());
        let conversation = self.prompts.review(reference_url, &map_url, &inventory, iteration)?;

        let (payload, verdict) = self.ask_payload(Stage::Review, &conversation, parse_verdict).await?;
        self.transcript.record_payload(Stage::Review, &payload)?;
        Ok(verdict)
    }

    /// Ask for a fenced payload and validate it; either failure spends an attempt.
    async fn ask_payload<T, V>(&self, stage: Stage, conversation: &Conversation, validate: V) -> Result<(Value, T)>
    where
        V: Fn(&Value) -> Result<T>,
    {
        let reply = self
            .reasoner
            .ask_with(stage, conversation, |text| {
                let payload = extract_payload(text)?;
                let parsed = validate(&payload)?;
                Ok((payload, parsed))
            })
            .await;
        self.required(stage, reply)
    }

    fn required<T>(&self, stage: Stage, reply: Option<T>) -> Result<T> {
        reply.ok_or(StylerError::RetriesExhausted {
            stage,
            attempts: self.reasoner.policy().max_attempts,
        })
    }

    /// Build the next document, install it, and publish it.
    async fn apply_and_publish(&self, session: &mut Session, edits: &EditStructure) -> Result<()> {
        let (next, report) = apply_edits_with_report(session.document_snapshot(), edits);
        log::info!(
            "Applied {} assignments ({} skipped, {} icon briefs)",
            report.applied,
            report.skipped,
            report.icon_briefs
        );
        let style_id = self.publish(&next).await?;
        session.replace_document(next);
        session.set_style_id(style_id);
        Ok(())
    }

    /// Render the session's current style as the next `R{n}` artifact.
    async fn render_current(&self, session: &mut Session, viewport: &Viewport) -> Result<ArtifactRef> {
        let style_id = session
            .style_id()
            .cloned()
            .ok_or_else(|| StylerError::Render("no published style to render".to_string()))?;
        let iteration = session.advance_iteration();
        self.render_artifact(&style_id, viewport, iteration).await
    }

    async fn publish(&self, document: &StyleDocument) -> Result<StyleId> {
        let policy = self.config.render_policy;
        let mut last_error = String::new();
        let style_id = policy
            .run(
                |attempt| {
                    log::info!("{}: attempt {}/{}", Stage::Publish, attempt, policy.max_attempts);
                    self.gateway.publish(document)
                },
                |attempt, err: &RenderError| {
                    log::warn!("{}: attempt {} failed: {}", Stage::Publish, attempt, err);
                    last_error = err.to_string();
                },
            )
            .await;
        let style_id = style_id.ok_or_else(|| StylerError::Publish(last_error))?;
        self.transcript
            .record_note(Stage::Publish.label(), &format!("published style {}", style_id))?;
        Ok(style_id)
    }

    async fn render_artifact(&self, style_id: &StyleId, viewport: &Viewport, iteration: u32) -> Result<ArtifactRef> {
        let policy = self.config.render_policy;
        let mut last_error = String::new();
        let bytes = policy
            .run(
                |attempt| {
                    log::info!("{}: attempt {}/{}", Stage::Render, attempt, policy.max_attempts);
                    self.gateway.render(style_id, viewport)
                },
                |attempt, err: &RenderError| {
                    log::warn!("{}: attempt {} failed: {}", Stage::Render, attempt, err);
                    last_error = err.to_string();
                },
            )
            .await;
        let bytes = bytes.ok_or_else(|| StylerError::Render(last_error))?;

        let artifact = self.artifacts.save_image(&artifact_tag(iteration), &bytes)?;
        self.transcript.record_note(
            Stage::Render.label(),
            &format!("{} -> {}", style_id, artifact.path.display()),
        )?;
        Ok(artifact)
    }

    fn record(&self, session: &mut Session, record: IterationRecord) -> Result<()> {
        self.transcript.append_record(&record)?;
        session.push_record(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLlmClient, MockReply};
    use crate::render::MockRenderGateway;
    use crate::response::fence_payload;
    use crate::transcript::DEFAULT_LOG_FILE;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        temp: TempDir,
        reference: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let reference = temp.path().join("reference.png");
            std::fs::write(&reference, b"reference-bytes").unwrap();
            Self { temp, reference }
        }

        fn out(&self) -> PathBuf {
            self.temp.path().join("out")
        }

        fn build(
            &self,
            replies: Vec<MockReply>,
            config: RefinementConfig,
        ) -> (RefinementLoop<MockLlmClient, MockRenderGateway>, Arc<MockLlmClient>, Arc<MockRenderGateway>) {
            let llm = Arc::new(MockLlmClient::new(replies));
            let gateway = Arc::new(MockRenderGateway::new());
            let transcript = Arc::new(Transcript::open(self.out(), DEFAULT_LOG_FILE).unwrap());
            let reasoner = ReasoningClient::new(
                llm.clone(),
                RetryPolicy::new(3, Duration::from_millis(1)),
                transcript.clone(),
            );
            let runner = RefinementLoop::new(
                reasoner,
                gateway.clone(),
                PromptBuilder::with_builtins().unwrap(),
                ArtifactStore::new(self.out(), "harbor").unwrap(),
                transcript,
                config,
            );
            (runner, llm, gateway)
        }
    }

    fn document() -> StyleDocument {
        StyleDocument::from_json(
            &json!({
                "name": "harbor",
                "center": [-122.4, 37.8],
                "zoom": 12,
                "metadata": {"mapbox:print": {"width": 600, "height": 400, "resolution": 96}},
                "layers": [
                    {"id": "water", "type": "fill", "paint": {"fill-color": "#0000ff"}},
                    {"id": "road", "type": "line", "paint": {"line-width": ["interpolate", ["linear"], 10, 1, 14]}}
                ]
            })
            .to_string(),
        )
        .unwrap()
    }

    fn text(reply: &str) -> MockReply {
        MockReply::Text(reply.to_string())
    }

    fn fenced(payload: Value) -> MockReply {
        MockReply::Text(format!("Here is my answer.\n{}", fence_payload(&payload)))
    }

    fn design_reply() -> MockReply {
        fenced(json!({
            "reasoning": "misty palette",
            "stylesheet": {"fill": {"water": {"explanation": "lighter", "fill-color": "#3399ff"}}}
        }))
    }

    fn accept() -> MockReply {
        fenced(json!({"Action": "Accept"}))
    }

    #[tokio::test]
    async fn test_accept_on_first_review() {
        let fixture = Fixture::new();
        let (runner, llm, gateway) =
            fixture.build(vec![text("A misty harbor."), design_reply(), accept()], RefinementConfig::default());

        let outcome = runner.run(&fixture.reference, document()).await.unwrap();

        assert_eq!(llm.call_count(), 3);
        assert_eq!(outcome.reviews, 1);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].verdict, Verdict::Accept);
        assert_eq!(outcome.records[0].artifact.tag, "R1");
        // base + design
        assert_eq!(gateway.publish_count(), 2);
        // origin + R1, nothing after acceptance
        assert_eq!(gateway.render_count(), 2);
        assert_eq!(
            outcome.document.layer("water").unwrap().paint["fill-color"],
            json!("#3399ff")
        );
        assert_eq!(outcome.style_id.as_str(), "style-2");
        assert!(fixture.out().join("harbor_origin.png").exists());
        assert!(fixture.out().join("harbor_R1.png").exists());
        assert!(!fixture.out().join("harbor_R2.png").exists());
        assert!(outcome.final_style_path.exists());
    }

    #[tokio::test]
    async fn test_revisions_compose_in_order() {
        let fixture = Fixture::new();
        let replies = vec![
            text("A misty harbor."),
            design_reply(),
            fenced(json!({"Action": "Revision", "Modified style sheet": {"line": {"road": {"line-width": 3}}}})),
            fenced(json!({"Action": "Revision", "Modified style sheet": {"fill": {"water": {"fill-color": "#2288ee"}}}})),
            accept(),
        ];
        let (runner, llm, gateway) = fixture.build(replies, RefinementConfig::default());

        let outcome = runner.run(&fixture.reference, document()).await.unwrap();

        assert_eq!(llm.call_count(), 5);
        assert_eq!(outcome.reviews, 3);
        let verdicts: Vec<Verdict> = outcome.records.iter().map(|r| r.verdict).collect();
        assert_eq!(verdicts, vec![Verdict::Revision, Verdict::Revision, Verdict::Accept]);
        // base, design, two revisions
        assert_eq!(gateway.publish_count(), 4);
        assert_eq!(gateway.render_count(), 4);

        let water = outcome.document.layer("water").unwrap();
        assert_eq!(water.paint["fill-color"], json!("#2288ee"));
        let road = outcome.document.layer("road").unwrap();
        assert_eq!(road.paint["line-width"], json!(["interpolate", ["linear"], 10, 3, 14]));

        let records = crate::transcript::read_records(fixture.out().join(crate::transcript::RECORDS_FILE)).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].artifact.tag, "R3");
    }

    #[tokio::test]
    async fn test_caption_exhaustion_aborts() {
        let fixture = Fixture::new();
        let (runner, llm, gateway) = fixture.build(vec![], RefinementConfig::default());

        let err = runner.run(&fixture.reference, document()).await.unwrap_err();

        assert!(matches!(
            err,
            StylerError::RetriesExhausted {
                stage: Stage::Caption,
                attempts: 3
            }
        ));
        assert_eq!(llm.call_count(), 3);
        assert_eq!(gateway.publish_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_design_is_retried() {
        let fixture = Fixture::new();
        let replies = vec![text("caption"), text("I would make the water lighter."), design_reply(), accept()];
        let (runner, llm, _) = fixture.build(replies, RefinementConfig::default());

        let outcome = runner.run(&fixture.reference, document()).await.unwrap();

        assert_eq!(llm.call_count(), 4);
        assert_eq!(outcome.reviews, 1);
    }

    #[tokio::test]
    async fn test_iteration_limit() {
        let fixture = Fixture::new();
        let revision = || fenced(json!({"Action": "Revision", "Modified style sheet": {}}));
        let replies = vec![text("caption"), design_reply(), revision(), revision(), accept()];
        let config = RefinementConfig::new(Some(2), RetryPolicy::single());
        let (runner, _, gateway) = fixture.build(replies, config);

        let err = runner.run(&fixture.reference, document()).await.unwrap_err();

        assert!(matches!(err, StylerError::IterationLimit { iterations: 2 }));
        // origin, R1, R2
        assert_eq!(gateway.render_count(), 3);
    }

    #[tokio::test]
    async fn test_publish_failure_is_fatal() {
        let fixture = Fixture::new();
        let (runner, llm, gateway) = fixture.build(vec![text("unused")], RefinementConfig::default());
        gateway.fail_next_publish(RenderError::Publish("publish response has no id".into()));

        let err = runner.run(&fixture.reference, document()).await.unwrap_err();

        assert!(matches!(err, StylerError::Publish(_)));
        assert_eq!(llm.call_count(), 0);
        assert_eq!(gateway.render_count(), 0);
    }

    #[tokio::test]
    async fn test_render_retry_policy() {
        let fixture = Fixture::new();
        let config = RefinementConfig::new(None, RetryPolicy::new(2, Duration::from_millis(1)));
        let (runner, _, gateway) = fixture.build(vec![text("caption"), design_reply(), accept()], config);
        gateway.fail_next_render(RenderError::Api {
            status: 503,
            message: "busy".into(),
        });

        let outcome = runner.run(&fixture.reference, document()).await.unwrap();

        assert_eq!(outcome.reviews, 1);
        assert_eq!(gateway.render_count(), 2);
    }

    #[tokio::test]
    async fn test_missing_viewport_is_invalid_style() {
        let fixture = Fixture::new();
        let (runner, llm, _) = fixture.build(vec![], RefinementConfig::default());
        let document = StyleDocument::from_json(r#"{"name": "bare", "layers": []}"#).unwrap();

        let err = runner.run(&fixture.reference, document).await.unwrap_err();

        assert!(matches!(err, StylerError::InvalidStyle(_)));
        assert_eq!(llm.call_count(), 0);
    }
}
