//! Windowed classification pipeline.
//!
//! Reads a source document line by line, cuts it into word-count-bounded
//! windows, sends each window to the model in document order, and persists
//! the parsed verdicts as a write-once result set. A result set already on
//! disk is returned as-is without contacting the model.

use std::borrow::Cow;
use std::path::PathBuf;

use thiserror::Error;
use threatscan_core::{
    ClassifierConfig, ClassifyReport, ParseError, ResultSet, Verdict, VerdictParser, Windower,
    parser_for,
};
use threatscan_store::{ResultStore, Saved, StoreError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::client::{ChatError, LanguageModel};
use crate::prompts;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("source document {path} cannot be opened: {source}")]
    SourceNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("reading source document {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a single window produced no verdict. Never aborts the pipeline.
#[derive(Error, Debug)]
pub enum WindowError {
    #[error("classification unavailable: {0}")]
    ClassificationUnavailable(#[from] ChatError),
    #[error("unparseable reply: {source}")]
    Parse {
        #[source]
        source: ParseError,
        raw: String,
    },
}

impl WindowError {
    /// The model's raw reply, when one was received.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Self::ClassificationUnavailable(_) => None,
            Self::Parse { raw, .. } => Some(raw),
        }
    }
}

/// Send one window to the model and parse the reply.
pub async fn classify_window(
    model: &dyn LanguageModel,
    system_prompt: &str,
    parser: &dyn VerdictParser,
    text: &str,
) -> Result<Verdict, WindowError> {
    let raw = model.complete(system_prompt, text).await?;
    match parser.parse(&raw) {
        Ok(parsed) => Ok(Verdict::ok(
            parsed.threat_level,
            parsed.justification,
            raw,
            text.to_string(),
        )),
        Err(source) => Err(WindowError::Parse { source, raw }),
    }
}

/// Classify the document `source_id`, reusing a cached result set if present.
///
/// Failed windows are dropped from the result set, counted in
/// [`ClassifyReport::dropped_windows`] and logged. Only the source document
/// being unreadable, or the store failing, fails the call.
pub async fn classify(
    source_id: &str,
    config: &ClassifierConfig,
    model: &dyn LanguageModel,
    store: &ResultStore,
) -> Result<ClassifyReport, PipelineError> {
    let source_path = store.source_path(source_id)?;

    if let Some(results) = store.load(source_id)? {
        info!(source_id, verdicts = results.len(), "cache hit, skipping classification");
        return Ok(ClassifyReport::cached(source_id, results));
    }

    info!(source_id, path = %source_path.display(), "cache miss, classifying");
    let file = tokio::fs::File::open(&source_path)
        .await
        .map_err(|source| PipelineError::SourceNotFound {
            path: source_path.clone(),
            source,
        })?;
    let mut reader = BufReader::new(file);

    let system_prompt = prompts::classification_prompt(config.parser);
    let parser = parser_for(config.parser, config.strict_labels);
    let mut windower = Windower::new(&config.window);
    let mut run = Run::new(source_id, model, &system_prompt, parser.as_ref());

    let mut buf = Vec::new();
    let mut line_no = 0usize;
    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .await
            .map_err(|source| PipelineError::SourceRead {
                path: source_path.clone(),
                source,
            })?;
        if n == 0 {
            break;
        }
        line_no += 1;
        // Scraped dumps are not always clean UTF-8.
        let line = String::from_utf8_lossy(&buf);
        if let Cow::Owned(_) = line {
            warn!(source_id, line = line_no, "invalid UTF-8 replaced");
        }
        if let Some(window) = windower.push_line(&line) {
            run.submit(window).await;
        }
    }
    if let Some(window) = windower.finish() {
        run.submit(window).await;
    }

    let Run {
        results,
        windows,
        dropped,
        ..
    } = run;

    let results = match store.save(source_id, &results)? {
        Saved::Written(_) => results,
        Saved::AlreadyPresent(existing) => existing,
    };

    info!(
        source_id,
        windows,
        dropped_windows = dropped,
        verdicts = results.len(),
        "classification complete"
    );
    Ok(ClassifyReport {
        source_id: source_id.to_string(),
        results,
        windows,
        dropped_windows: dropped,
        cache_hit: false,
    })
}

/// Classify a single text without windowing or persistence.
///
/// Failures are returned as a verdict with `status = error`.
pub async fn predict_one(
    text: &str,
    config: &ClassifierConfig,
    model: &dyn LanguageModel,
) -> Verdict {
    let system_prompt = prompts::classification_prompt(config.parser);
    let parser = parser_for(config.parser, config.strict_labels);
    match classify_window(model, &system_prompt, parser.as_ref(), text).await {
        Ok(verdict) => verdict,
        Err(e) => {
            warn!(error = %e, "single-text classification failed");
            Verdict::failed(
                e.raw_response().unwrap_or_default().to_string(),
                text.to_string(),
                e.to_string(),
            )
        }
    }
}

/// State of one `classify` run over a cache miss.
struct Run<'a> {
    source_id: &'a str,
    model: &'a dyn LanguageModel,
    system_prompt: &'a str,
    parser: &'a dyn VerdictParser,
    results: ResultSet,
    windows: usize,
    dropped: usize,
}

impl<'a> Run<'a> {
    fn new(
        source_id: &'a str,
        model: &'a dyn LanguageModel,
        system_prompt: &'a str,
        parser: &'a dyn VerdictParser,
    ) -> Self {
        Self {
            source_id,
            model,
            system_prompt,
            parser,
            results: Vec::new(),
            windows: 0,
            dropped: 0,
        }
    }

    async fn submit(&mut self, window: String) {
        self.windows += 1;
        let index = self.windows;
        debug!(
            source_id = self.source_id,
            window = index,
            words = window.split_whitespace().count(),
            "submitting window"
        );

        match classify_window(self.model, self.system_prompt, self.parser, &window).await {
            Ok(verdict) => self.results.push(verdict),
            Err(e) => {
                self.dropped += 1;
                warn!(source_id = self.source_id, window = index, error = %e, "window dropped");
            }
        }
    }
}
