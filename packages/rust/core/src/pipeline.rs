//! End-to-end `render` pipeline: load content once → parse page → bind → HTML.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{info, instrument};

use sheetbind_binder::{ApplyReport, Binder, BinderOptions, Document};
use sheetbind_loader::{ContentLoader, ContentSource};
use sheetbind_shared::{AppConfig, CacheSettings, Result, SheetSource, SheetbindError};
use sheetbind_storage::{KvStore, Storage};

/// Input and output locations for one render.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Page to bind content into.
    pub input: PathBuf,
    /// Where to write the rendered page. `None` leaves writing to the caller.
    pub output: Option<PathBuf>,
}

/// Result of one render.
#[derive(Debug)]
pub struct RenderResult {
    /// The rendered page.
    pub html: String,
    /// Where the content came from; `None` when loading failed.
    pub source: Option<ContentSource>,
    /// Number of fields in the loaded content map.
    pub fields: usize,
    /// Per-slot outcome counts.
    pub report: ApplyReport,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the pipeline completes.
    fn done(&self, result: &RenderResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _result: &RenderResult) {}
}

/// Open the libSQL cache and build a loader around it.
pub async fn open_loader(config: &AppConfig) -> Result<ContentLoader<Storage>> {
    let cache = CacheSettings::from(config);
    let storage = Storage::open(&cache.db_path).await?;
    ContentLoader::new(SheetSource::from(config), cache, storage)
}

/// Build the binder with the configured language strings.
pub fn build_binder(config: &AppConfig) -> Result<Binder> {
    Binder::new(BinderOptions::from(&config.binding))
}

/// Bind content into an HTML string.
///
/// Content is loaded before the page is parsed; the DOM never lives across
/// the network await.
pub async fn render_html<S: KvStore>(
    html: &str,
    loader: &ContentLoader<S>,
    binder: &Binder,
    progress: &dyn ProgressReporter,
) -> RenderResult {
    let start = Instant::now();

    progress.phase("Loading content");
    let (content, source) = loader.load_at(Utc::now()).await;

    progress.phase("Binding content");
    let mut doc = Document::parse(html);
    let report = binder.apply(&mut doc, &content);
    let html = doc.to_html();

    let result = RenderResult {
        html,
        source,
        fields: content.len(),
        report,
        elapsed: start.elapsed(),
    };
    progress.done(&result);
    result
}

/// Run the full `render` pipeline on a page file.
#[instrument(skip_all, fields(input = %config.input.display()))]
pub async fn render_file<S: KvStore>(
    config: &RenderConfig,
    loader: &ContentLoader<S>,
    binder: &Binder,
    progress: &dyn ProgressReporter,
) -> Result<RenderResult> {
    let html = std::fs::read_to_string(&config.input)
        .map_err(|e| SheetbindError::io(&config.input, e))?;

    let result = render_html(&html, loader, binder, progress).await;

    if let Some(out) = &config.output {
        if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SheetbindError::io(parent, e))?;
        }
        std::fs::write(out, &result.html).map_err(|e| SheetbindError::io(out, e))?;
    }

    info!(
        source = result.source.map(|s| s.to_string()).unwrap_or_else(|| "none".into()),
        fields = result.fields,
        applied = result.report.applied,
        "page rendered"
    );
    Ok(result)
}
