use criterion::{criterion_group, criterion_main, Criterion};

use posterkit::rendering::layout::layout_poster;
use posterkit::rendering::paint::build_display_list;
use posterkit::rendering::raster::{rasterize, CaptureOptions};
use posterkit::rendering::POSTER_SURFACE;
use posterkit::{Exporter, ImageRef, PosterRecord};

fn inline_record() -> PosterRecord {
    let bg = image::RgbImage::from_pixel(300, 400, image::Rgb([40, 90, 200]));
    let mut png = std::io::Cursor::new(Vec::new());
    bg.write_to(&mut png, image::ImageFormat::Png).unwrap();
    PosterRecord {
        featured_image_url: ImageRef::inline_png(png.into_inner()).to_reference_string(),
        ..Default::default()
    }
}

fn bench_layout(c: &mut Criterion) {
    let record = PosterRecord::default();
    c.bench_function("layout_and_display_list", |b| {
        b.iter(|| build_display_list(&layout_poster(&record, POSTER_SURFACE)))
    });
}

fn bench_rasterize(c: &mut Criterion) {
    let list = build_display_list(&layout_poster(&inline_record(), POSTER_SURFACE));
    let opts = CaptureOptions::default();
    c.bench_function("rasterize_2x", |b| {
        b.iter(|| rasterize(&list, POSTER_SURFACE, &opts, None).unwrap())
    });
}

fn bench_jpeg_export(c: &mut Criterion) {
    let record = inline_record();
    let exporter = Exporter::offline(CaptureOptions::default(), 95);
    c.bench_function("capture_and_encode_jpeg", |b| {
        b.iter(|| exporter.capture(&record).unwrap().encode_jpeg(95).unwrap())
    });
}

criterion_group!(benches, bench_layout, bench_rasterize, bench_jpeg_export);
criterion_main!(benches);
