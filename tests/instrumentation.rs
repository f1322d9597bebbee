//! Verifies that `analyze()` emits its tracing span (§5), the way the
//! teacher's own instrumentation tests assert span names rather than log
//! text.

use std::sync::{Arc, Mutex};

use tracing::Subscriber;
use tracing::span::{Attributes, Id};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

use tekkotsu_drawing::backend::PdfBackend;
use tekkotsu_drawing::geometry::{BBox, Rotation};
use tekkotsu_drawing::types::PageData;
use tekkotsu_drawing::{AnalysisConfig, analyze};

struct SpanCollector {
    spans: Arc<Mutex<Vec<String>>>,
}

impl<S: Subscriber + for<'a> LookupSpan<'a>> Layer<S> for SpanCollector {
    fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
        self.spans.lock().unwrap().push(attrs.metadata().name().to_string());
    }
}

struct StaticBackend {
    pages: Vec<PageData>,
}

impl PdfBackend for StaticBackend {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_data(&self, page_index: usize) -> tekkotsu_drawing::Result<PageData> {
        self.pages.get(page_index).cloned().ok_or_else(|| tekkotsu_drawing::AnalysisError::Backend(format!("no page {page_index}")))
    }

    fn rasterize(&self, _page_index: usize, _clip: Option<BBox>, _dpi: u32) -> tekkotsu_drawing::Result<Option<Vec<u8>>> {
        Ok(None)
    }
}

#[test]
fn analyze_emits_its_span() {
    let spans = Arc::new(Mutex::new(Vec::new()));
    let collector = SpanCollector { spans: spans.clone() };
    let subscriber = tracing_subscriber::registry().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    let backend = StaticBackend {
        pages: vec![PageData {
            page_index: 0,
            media_width: 842.0,
            media_height: 595.0,
            rotation: Rotation::R0,
            texts: vec![],
            lines: vec![],
            rects: vec![],
        }],
    };
    let config = AnalysisConfig::default();
    let _ = analyze(&backend, "traced.pdf", None, None, &config).unwrap();

    let span_names = spans.lock().unwrap();
    assert!(span_names.contains(&"analyze".to_string()), "expected an 'analyze' span, got {span_names:?}");
}
