//! The sequential pipeline: one record through the ordered stage list, then
//! the mapping onto the public result shape.
//!
//! Validation failures are a normal terminal state: the pipeline stops after
//! the stage that recorded them and answers with a success-shaped result
//! carrying the failures. Stage errors abort and propagate.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, info, warn};

use cantus_core::api::{SynthesisRequest, SynthesisResult, TextFormat};
use cantus_core::record::{SynthesisMode, Utterance, UtteranceKind};
use cantus_core::token::Token;
use cantus_core::{Result, accent};

use crate::stage::RecordStage;

/// Reserved input prefix switching a request into acoustic-only mode.
const CUSTOM_PREFIX: &str = "##AM:";

/// The whole-record pipeline for one synthesis request.
///
/// Holds two stage lists: one for plain-text requests and one for structured
/// requests, whose first stages fan out over the decomposed children.
pub struct Synthesizer {
    record_stages: Vec<Box<dyn RecordStage>>,
    ssml_stages: Vec<Box<dyn RecordStage>>,
    allow_custom_code: bool,
    default_voice: String,
}

impl Synthesizer {
    /// A pipeline over the given stage lists.
    #[must_use]
    pub fn new(
        record_stages: Vec<Box<dyn RecordStage>>,
        ssml_stages: Vec<Box<dyn RecordStage>>,
    ) -> Self {
        Self {
            record_stages,
            ssml_stages,
            allow_custom_code: false,
            default_voice: String::new(),
        }
    }

    /// Opt in to the reserved custom-code input prefix.
    #[must_use]
    pub fn with_custom_code(mut self, allow: bool) -> Self {
        self.allow_custom_code = allow;
        self
    }

    /// Voice applied when a request (or an SSML part) names none.
    #[must_use]
    pub fn with_default_voice(mut self, voice: impl Into<String>) -> Self {
        self.default_voice = voice.into();
        self
    }

    /// Synthesize one request.
    pub async fn work(&self, request: SynthesisRequest) -> Result<SynthesisResult> {
        let request = Arc::new(request);
        let mut record = Utterance::new(Arc::clone(&request));
        debug!(request_id = %record.request_id, "synthesizing");
        if self.allow_custom_code {
            decode_custom_code(&mut record);
        }
        if record.voice.is_empty() {
            record.voice = self.default_voice.clone();
        }
        if request.ssml_parts.is_empty() {
            self.process_all(&self.record_stages, &mut record).await?;
        } else {
            record.kind = UtteranceKind::SsmlRoot;
            record.children = Utterance::from_ssml_parts(&request, &request.ssml_parts);
            for child in &mut record.children {
                if child.kind == UtteranceKind::SsmlText && child.voice.is_empty() {
                    child.voice = record.voice.clone();
                }
            }
            self.process_all(&self.ssml_stages, &mut record).await?;
        }
        map_result(&record)
    }

    async fn process_all(
        &self,
        stages: &[Box<dyn RecordStage>],
        record: &mut Utterance,
    ) -> Result<()> {
        for stage in stages {
            if let Err(err) = stage.process(record).await {
                warn!(stage = stage.name(), error = %err, "stage failed");
                return Err(err);
            }
            if record.is_rejected() {
                debug!(stage = stage.name(), "validation stopped the pipeline");
                break;
            }
        }
        Ok(())
    }
}

/// Decode the reserved prefix into the mode flag, once, at the boundary.
/// Nothing downstream looks at the raw prefix.
fn decode_custom_code(record: &mut Utterance) {
    if let Some(rest) = record.original_text.strip_prefix(CUSTOM_PREFIX) {
        info!(request_id = %record.request_id, "acoustic-only request");
        record.original_text = rest.to_string();
        record.mode = SynthesisMode::AcousticOnly;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Result mapping
// ─────────────────────────────────────────────────────────────────────────────

fn map_result(record: &Utterance) -> Result<SynthesisResult> {
    let mut result = SynthesisResult::default();
    if record.is_rejected() {
        result.validation_failures = record.validation_failures.clone();
        return Ok(result);
    }
    if let Some(audio) = &record.final_audio {
        result.audio = STANDARD.encode(audio);
    }
    let format = record.request.output_text_format;
    if format != TextFormat::None {
        if record.request.allow_collect_data {
            result.request_id = record.request_id.clone();
        }
        result.text = match format {
            TextFormat::None => String::new(),
            TextFormat::Normalized => join_normalized(record),
            TextFormat::Transcribed => join_transcribed(record),
            TextFormat::Accented => render_accented(record)?,
        };
    }
    Ok(result)
}

/// The records carrying synthesized text: the record itself, or its text
/// children for a structured root.
fn text_records(record: &Utterance) -> Vec<&Utterance> {
    if record.kind == UtteranceKind::SsmlRoot {
        record
            .children
            .iter()
            .filter(|c| c.kind == UtteranceKind::SsmlText)
            .collect()
    } else {
        vec![record]
    }
}

fn join_normalized(record: &Utterance) -> String {
    let mut fragments: Vec<&str> = Vec::new();
    for rec in text_records(record) {
        fragments.extend(rec.text_with_numbers.iter().map(String::as_str));
    }
    fragments.join(" ")
}

fn join_transcribed(record: &Utterance) -> String {
    let mut fragments: Vec<&str> = Vec::new();
    for rec in text_records(record) {
        fragments.extend(rec.segments.iter().filter_map(|s| s.transcribed.as_deref()));
    }
    fragments.join(" ")
}

fn render_accented(record: &Utterance) -> Result<String> {
    let mut out = String::new();
    for rec in text_records(record) {
        for segment in &rec.segments {
            for annotated in &segment.tokens {
                match &annotated.token {
                    Token::Word { text, .. } => {
                        out.push_str(&accent::to_accented(text, annotated.effective_accent())?);
                    }
                    Token::Separator(s) => out.push_str(s),
                    Token::Space => out.push(' '),
                    Token::SentenceEnd => {}
                }
            }
        }
    }
    Ok(out)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches::assert_matches;

    use cantus_core::SynthError;
    use cantus_core::api::ValidationFailure;
    use cantus_core::record::Segment;
    use cantus_core::ssml::{SsmlPart, SsmlText, TextChunk};
    use cantus_core::token::{AccentVariant, AnnotatedToken};

    use super::*;

    /// Record stage applying a closure, with an invocation counter.
    struct StageFn {
        name: &'static str,
        calls: Arc<AtomicUsize>,
        apply: Box<dyn Fn(&mut Utterance) -> Result<()> + Send + Sync>,
    }

    impl StageFn {
        fn new(
            name: &'static str,
            apply: impl Fn(&mut Utterance) -> Result<()> + Send + Sync + 'static,
        ) -> (Box<Self>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let stage = Box::new(Self {
                name,
                calls: Arc::clone(&calls),
                apply: Box::new(apply),
            });
            (stage, calls)
        }

        fn passing(name: &'static str) -> (Box<Self>, Arc<AtomicUsize>) {
            Self::new(name, |_| Ok(()))
        }
    }

    #[async_trait::async_trait]
    impl RecordStage for StageFn {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn process(&self, record: &mut Utterance) -> Result<()> {
            let _ = self.calls.fetch_add(1, Ordering::SeqCst);
            (self.apply)(record)
        }
    }

    fn word_with_accent(text: &str, code: i32) -> AnnotatedToken {
        AnnotatedToken {
            accent: Some(AccentVariant {
                accent: code,
                ..AccentVariant::default()
            }),
            ..AnnotatedToken::new(Token::word(text))
        }
    }

    #[tokio::test]
    async fn stages_run_in_configured_order() {
        let (first, first_calls) = StageFn::new("first", |r| {
            r.cleaned_text.push("first".into());
            Ok(())
        });
        let (second, second_calls) = StageFn::new("second", |r| {
            assert_eq!(r.cleaned_text, vec!["first".to_string()]);
            r.cleaned_text.push("second".into());
            Ok(())
        });
        let synth = Synthesizer::new(vec![first, second], vec![]);
        let _ = synth.work(SynthesisRequest::text("labas")).await.unwrap();
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn validation_failure_short_circuits_and_shapes_result() {
        let (rejecting, _) = StageFn::new("validator", |r| {
            r.reject(ValidationFailure::check("max_text_len", 400));
            Ok(())
        });
        let (after, after_calls) = StageFn::passing("after");
        let synth = Synthesizer::new(vec![rejecting, after], vec![]);
        let result = synth.work(SynthesisRequest::text("labas")).await.unwrap();
        assert_eq!(after_calls.load(Ordering::SeqCst), 0);
        assert_eq!(result.validation_failures.len(), 1);
        assert_eq!(result.validation_failures[0].check.id, "max_text_len");
        assert!(result.audio.is_empty());
    }

    #[tokio::test]
    async fn stage_error_aborts() {
        let (failing, _) = StageFn::new("failing", |_| Err(SynthError::NoInput));
        let (after, after_calls) = StageFn::passing("after");
        let synth = Synthesizer::new(vec![failing, after], vec![]);
        let err = synth.work(SynthesisRequest::text("labas")).await.unwrap_err();
        assert_matches!(err, SynthError::NoInput);
        assert_eq!(after_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn custom_code_decoded_when_enabled() {
        let (probe, _) = StageFn::new("probe", |r| {
            assert_eq!(r.mode, SynthesisMode::AcousticOnly);
            assert_eq!(r.original_text, "a - b");
            Ok(())
        });
        let synth = Synthesizer::new(vec![probe], vec![]).with_custom_code(true);
        let _ = synth.work(SynthesisRequest::text("##AM:a - b")).await.unwrap();
    }

    #[tokio::test]
    async fn custom_code_ignored_when_disabled() {
        let (probe, _) = StageFn::new("probe", |r| {
            assert_eq!(r.mode, SynthesisMode::Full);
            assert_eq!(r.original_text, "##AM:a - b");
            Ok(())
        });
        let synth = Synthesizer::new(vec![probe], vec![]);
        let _ = synth.work(SynthesisRequest::text("##AM:a - b")).await.unwrap();
    }

    #[tokio::test]
    async fn empty_voice_falls_back_to_the_default() {
        let (probe, _) = StageFn::new("probe", |r| {
            assert_eq!(r.voice, "aiste");
            Ok(())
        });
        let synth = Synthesizer::new(vec![probe], vec![]).with_default_voice("aiste");
        let _ = synth.work(SynthesisRequest::text("labas")).await.unwrap();
    }

    #[tokio::test]
    async fn request_voice_beats_the_default() {
        let (probe, _) = StageFn::new("probe", |r| {
            assert_eq!(r.voice, "vytas");
            Ok(())
        });
        let synth = Synthesizer::new(vec![probe], vec![]).with_default_voice("aiste");
        let request = SynthesisRequest {
            voice: "vytas".into(),
            ..SynthesisRequest::text("labas")
        };
        let _ = synth.work(request).await.unwrap();
    }

    #[tokio::test]
    async fn voiceless_ssml_children_inherit_the_default() {
        let (ssml, _) = StageFn::new("ssml", |r| {
            assert_eq!(r.children[0].voice, "aiste");
            Ok(())
        });
        let synth = Synthesizer::new(vec![], vec![ssml]).with_default_voice("aiste");
        let request = SynthesisRequest {
            ssml_parts: vec![SsmlPart::Text(SsmlText {
                voice: String::new(),
                speed: 1.0,
                chunks: vec![TextChunk::plain("labas")],
            })],
            ..SynthesisRequest::text("")
        };
        let _ = synth.work(request).await.unwrap();
    }

    #[tokio::test]
    async fn structured_request_takes_the_ssml_stage_list() {
        let (plain, plain_calls) = StageFn::passing("plain");
        let (ssml, ssml_calls) = StageFn::new("ssml", |r| {
            assert_eq!(r.kind, UtteranceKind::SsmlRoot);
            assert_eq!(r.children.len(), 1);
            Ok(())
        });
        let synth = Synthesizer::new(vec![plain], vec![ssml]);
        let request = SynthesisRequest {
            ssml_parts: vec![SsmlPart::Text(SsmlText {
                voice: "aiste".into(),
                speed: 0.0,
                chunks: vec![TextChunk::plain("labas")],
            })],
            ..SynthesisRequest::text("<speak>labas</speak>")
        };
        let _ = synth.work(request).await.unwrap();
        assert_eq!(plain_calls.load(Ordering::SeqCst), 0);
        assert_eq!(ssml_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn rejected_record_maps_failures_only() {
        let mut record = Utterance::new(Arc::new(SynthesisRequest::text("labas")));
        record.final_audio = Some(b"RIFF".to_vec());
        record.reject(ValidationFailure::check("no_text", 0));
        let result = map_result(&record).unwrap();
        assert_eq!(result.validation_failures.len(), 1);
        assert!(result.audio.is_empty());
        assert!(result.text.is_empty());
    }

    #[test]
    fn audio_is_base64_of_final_audio() {
        let mut record = Utterance::new(Arc::new(SynthesisRequest::text("labas")));
        record.final_audio = Some(vec![1, 2, 3]);
        let result = map_result(&record).unwrap();
        assert_eq!(result.audio, STANDARD.encode([1, 2, 3]));
        assert!(result.request_id.is_empty());
        assert!(result.text.is_empty());
    }

    #[test]
    fn normalized_text_joins_fragments() {
        let mut record = Utterance::new(Arc::new(SynthesisRequest {
            output_text_format: TextFormat::Normalized,
            allow_collect_data: true,
            ..SynthesisRequest::text("labas")
        }));
        record.text_with_numbers = vec!["vienas du".into(), "trys".into()];
        let result = map_result(&record).unwrap();
        assert_eq!(result.text, "vienas du trys");
        assert_eq!(result.request_id, record.request_id);
    }

    #[test]
    fn request_id_withheld_without_collect_permission() {
        let mut record = Utterance::new(Arc::new(SynthesisRequest {
            output_text_format: TextFormat::Normalized,
            ..SynthesisRequest::text("labas")
        }));
        record.text_with_numbers = vec!["vienas".into()];
        let result = map_result(&record).unwrap();
        assert!(result.request_id.is_empty());
    }

    #[test]
    fn transcribed_text_joins_segments_across_children() {
        let request = Arc::new(SynthesisRequest {
            output_text_format: TextFormat::Transcribed,
            ..SynthesisRequest::text("x")
        });
        let mut child_a = Utterance::new(Arc::clone(&request));
        child_a.kind = UtteranceKind::SsmlText;
        child_a.segments = vec![Segment {
            transcribed: Some("v i e n a s".into()),
            ..Segment::default()
        }];
        let mut child_b = Utterance::new(Arc::clone(&request));
        child_b.kind = UtteranceKind::SsmlText;
        child_b.segments = vec![Segment {
            transcribed: Some("d u".into()),
            ..Segment::default()
        }];
        let mut root = Utterance::new(request);
        root.kind = UtteranceKind::SsmlRoot;
        root.children = vec![child_a, child_b];

        let result = map_result(&root).unwrap();
        assert_eq!(result.text, "v i e n a s d u");
    }

    #[test]
    fn accented_text_renders_tokens() {
        let mut record = Utterance::new(Arc::new(SynthesisRequest {
            output_text_format: TextFormat::Accented,
            ..SynthesisRequest::text("mama olia.")
        }));
        record.segments = vec![Segment::new(
            vec![
                word_with_accent("mama", 103),
                AnnotatedToken::new(Token::Space),
                AnnotatedToken::new(Token::word("olia")),
                AnnotatedToken::new(Token::Separator(".".into())),
                AnnotatedToken::new(Token::SentenceEnd),
            ],
            true,
        )];
        let result = map_result(&record).unwrap();
        assert_eq!(result.text, "ma{m\\}a olia.");
    }

    #[test]
    fn accented_text_fails_on_bad_code() {
        let mut record = Utterance::new(Arc::new(SynthesisRequest {
            output_text_format: TextFormat::Accented,
            ..SynthesisRequest::text("ab")
        }));
        record.segments = vec![Segment::new(vec![word_with_accent("ab", 509)], true)];
        let err = map_result(&record).unwrap_err();
        assert_matches!(err, SynthError::BadAccent { code: 509, .. });
    }
}
