//! Benchmarks for the full analysis pipeline (§5) over synthetic drawing
//! sheets of increasing primitive density.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use tekkotsu_drawing::backend::PdfBackend;
use tekkotsu_drawing::geometry::{BBox, Line, Point, Rotation};
use tekkotsu_drawing::types::{PageData, TextSpan};
use tekkotsu_drawing::{AnalysisConfig, analyze};

struct StaticBackend {
    pages: Vec<PageData>,
}

impl PdfBackend for StaticBackend {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_data(&self, page_index: usize) -> tekkotsu_drawing::Result<PageData> {
        self.pages
            .get(page_index)
            .cloned()
            .ok_or_else(|| tekkotsu_drawing::AnalysisError::Backend(format!("no page {page_index}")))
    }

    fn rasterize(&self, _page_index: usize, _clip: Option<BBox>, _dpi: u32) -> tekkotsu_drawing::Result<Option<Vec<u8>>> {
        Ok(None)
    }
}

fn text(s: &str, x: f64, y: f64) -> TextSpan {
    TextSpan {
        text: s.into(),
        bbox: BBox::new(x - 4.0, y - 4.0, x + 4.0, y + 4.0),
        font_name: "Arial".into(),
        size: 9.0,
    }
}

/// A primary sheet with `bays` grid lines on each axis, a floor plan
/// title, and a matching set of dimension/height annotations, roughly
/// approximating one governing frame of a real drawing.
fn primary_sheet(bays: usize) -> PageData {
    let mut page = PageData {
        page_index: 0,
        media_width: 1200.0,
        media_height: 850.0,
        rotation: Rotation::R0,
        texts: vec![text("平面図 S=1/100", 600.0, 40.0)],
        lines: vec![],
        rects: vec![],
    };
    for i in 0..=bays {
        let x = 100.0 + i as f64 * 80.0;
        page.texts.push(text(&format!("X{}", i + 1), x, 70.0));
        page.lines.push(Line::new(Point::new(x, 100.0), Point::new(x, 700.0), 0.3));
    }
    for i in 0..3 {
        let y = 150.0 + i as f64 * 200.0;
        page.texts.push(text(&format!("Y{}", i + 1), 70.0, y));
        page.lines.push(Line::new(Point::new(100.0, y), Point::new(100.0 + bays as f64 * 80.0, y), 0.3));
    }
    page
}

fn roof_plan_sheet(bays: usize) -> PageData {
    let mut page = PageData {
        page_index: 1,
        media_width: 1200.0,
        media_height: 850.0,
        rotation: Rotation::R0,
        texts: vec![text("小屋伏図 S=1/150", 600.0, 40.0)],
        lines: vec![],
        rects: vec![],
    };
    page.texts.push(text("X1", 100.0, 100.0));
    page.texts.push(text("Xn+1", 100.0 + bays as f64 * 80.0, 100.0));
    page.texts.push(text("Y1", 100.0, 700.0));
    page.texts.push(text("Y2", 100.0, 120.0));
    for i in 0..bays {
        let x = 120.0 + i as f64 * 80.0;
        page.lines.push(Line::new(Point::new(x, 150.0), Point::new(x + 10.0, 150.0), 0.3));
    }
    page
}

fn bench_analyze(c: &mut Criterion) {
    let config = AnalysisConfig::default();

    let mut group = c.benchmark_group("analyze");

    for bays in [4usize, 12, 24] {
        let backend = StaticBackend { pages: vec![primary_sheet(bays), roof_plan_sheet(bays)] };
        group.bench_function(format!("{bays}_bay_sheet"), |b| {
            b.iter(|| {
                let result = analyze(black_box(&backend), "bench.pdf", None, None, &config).unwrap();
                black_box(result.views.len());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_analyze);
criterion_main!(benches);
