//! Wiring: settings in, a ready-to-serve synthesizer out.
//!
//! The factory is the only place that knows the stage order. Everything it
//! builds is handed to the pipeline constructors as explicit ordered lists;
//! there is no registry to mutate afterwards.

use std::sync::Arc;
use std::time::Duration;

use cantus_core::{Result, SynthError};
use cantus_settings::{ServiceEndpoint, Settings};
use cantus_synth::{
    CachedSynthesizer, RecordStage, SegmentPool, SegmentStage, Segmenter, SsmlFanout, Synthesizer,
};

use crate::accentuate::Accentuator;
use crate::acoustic::AcousticModel;
use crate::clean::Cleaner;
use crate::convert::AudioConverter;
use crate::http::ServiceClient;
use crate::join::AudioJoiner;
use crate::normalize::Normalizer;
use crate::numbers::NumberReplacer;
use crate::tag::Tagger;
use crate::transcribe::Transcriber;
use crate::urls::UrlReplacer;
use crate::validate::Validator;
use crate::vocode::Vocoder;

/// Build the synthesizer the settings describe.
///
/// Validates the settings first; an unconfigured endpoint or an unusable
/// value surfaces as [`SynthError::Config`].
pub fn build(settings: &Settings) -> Result<CachedSynthesizer> {
    settings
        .validate()
        .map_err(|err| SynthError::config(err.to_string()))?;

    let client = |service: &'static str, endpoint: &ServiceEndpoint| -> Result<ServiceClient> {
        ServiceClient::new(
            service,
            endpoint.url.as_str(),
            Duration::from_millis(endpoint.timeout_ms),
            settings.retry.clone(),
        )
    };
    let services = &settings.services;

    let segment_stages: Vec<Arc<dyn SegmentStage>> = vec![
        Arc::new(Accentuator::new(client("accentuator", &services.accentuator)?)),
        Arc::new(Transcriber::new(client("transcriber", &services.transcriber)?)),
        Arc::new(AcousticModel::new(client(
            "acoustic_model",
            &services.acoustic_model,
        )?)),
        Arc::new(Vocoder::new(client("vocoder", &services.vocoder)?)),
    ];

    let validator = Validator::new(settings.synthesis.max_text_chars);
    let cleaner = Cleaner::new(client("cleaner", &services.cleaner)?);
    let urls = UrlReplacer::new()?;
    let normalizer = Normalizer::new(client("normalizer", &services.normalizer)?);
    let numbers = NumberReplacer::new(client("numbers", &services.numbers)?);
    let tagger = Tagger::new(client("tagger", &services.tagger)?);
    let joiner = AudioJoiner::new();
    let converter = AudioConverter::new(client("converter", &services.converter)?);

    // The same text chain serves both lists; each gets its own pool value
    // over the shared stage set.
    let text_stages = |pool: SegmentPool| -> Vec<Box<dyn RecordStage>> {
        vec![
            Box::new(cleaner.clone()),
            Box::new(urls.clone()),
            Box::new(normalizer.clone()),
            Box::new(numbers.clone()),
            Box::new(tagger.clone()),
            Box::new(Segmenter::new(settings.synthesis.max_chars)),
            Box::new(pool),
        ]
    };

    let mut record_stages: Vec<Box<dyn RecordStage>> = vec![Box::new(validator.clone())];
    record_stages.extend(text_stages(SegmentPool::new(
        settings.synthesis.workers,
        segment_stages.clone(),
    )));
    record_stages.push(Box::new(joiner.clone()));
    record_stages.push(Box::new(converter.clone()));

    let ssml_stages: Vec<Box<dyn RecordStage>> = vec![
        Box::new(validator),
        Box::new(SsmlFanout::new(text_stages(SegmentPool::new(
            settings.synthesis.workers,
            segment_stages,
        )))),
        Box::new(joiner),
        Box::new(converter),
    ];

    let synthesizer = Synthesizer::new(record_stages, ssml_stages)
        .with_custom_code(settings.synthesis.allow_custom_code)
        .with_default_voice(settings.synthesis.default_voice.clone());
    Ok(CachedSynthesizer::new(
        synthesizer,
        settings.cache.capacity,
    ))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
