use image::{Rgba, RgbaImage};
use lopdf::{Dictionary, Document, Object, Stream};
use pdf_stamp::embed::*;
use pdf_stamp::geometry::OrientationNormalizer;
use pdf_stamp::model::{JobKind, PlacementJob};
use pdf_stamp::*;

const A4_W_PT: i64 = 595;
const A4_H_PT: i64 = 842;

fn create_test_pdf(sizes: &[(i64, i64)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for &(width, height) in sizes {
        let content_id = doc.add_object(Stream::new(Dictionary::new(), b"q Q".to_vec()));
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(width),
                    Object::Integer(height),
                ]),
            ),
            ("Resources", Object::Dictionary(Dictionary::new())),
            ("Contents", Object::Reference(content_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(sizes.len() as i64)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn a4_pdf(pages: usize) -> Vec<u8> {
    create_test_pdf(&vec![(A4_W_PT, A4_H_PT); pages])
}

fn encode_png(image: &RgbaImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// Three vertical bands: red, green, blue
fn banded_seal() -> RgbaImage {
    RgbaImage::from_fn(300, 300, |x, _| match x / 100 {
        0 => Rgba([255, 0, 0, 255]),
        1 => Rgba([0, 255, 0, 255]),
        _ => Rgba([0, 0, 255, 255]),
    })
}

/// Records what the generator draws instead of writing a PDF
#[derive(Default)]
struct RecordingCanvas {
    pages: Vec<PageGeometry>,
    images: Vec<RgbaImage>,
    draws: Vec<(u32, usize, DrawRect)>,
}

impl PdfCanvas for RecordingCanvas {
    type Image = usize;

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_geometry(&self, page_number: u32) -> Result<PageGeometry> {
        self.pages
            .get(page_number as usize - 1)
            .copied()
            .ok_or(StampError::NoPages)
    }

    fn embed_raster(&mut self, image: &RgbaImage) -> Result<usize> {
        self.images.push(image.clone());
        Ok(self.images.len() - 1)
    }

    fn draw_image(&mut self, page_number: u32, image: usize, rect: DrawRect) -> Result<()> {
        self.draws.push((page_number, image, rect));
        Ok(())
    }

    fn save(&mut self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }
}

fn page_xobjects(doc: &Document, page_number: u32) -> usize {
    let page_id = *doc.get_pages().get(&page_number).unwrap();
    let page = doc.get_dictionary(page_id).unwrap();
    page.get(b"Resources")
        .and_then(Object::as_dict)
        .and_then(|r| r.get(b"XObject"))
        .and_then(Object::as_dict)
        .map(|x| x.len())
        .unwrap_or(0)
}

// Scenario B
#[test]
fn test_straddle_splits_into_thirds() {
    let pages = vec![PageGeometry::new(210.0, 297.0, 0); 3];
    let normalizer = OrientationNormalizer::with_a4_reference(pages.clone());
    let mut canvas = RecordingCanvas {
        pages,
        ..Default::default()
    };

    let mut model = PlacementModel::new(PlacementMode::Stamp);
    let asset = model.add_asset(encode_png(&banded_seal())).unwrap();
    let config = model
        .create_config(
            asset,
            ConfigSpec {
                straddle: true,
                straddle_y_mm: Some(100.0),
                ..Default::default()
            },
        )
        .unwrap();

    let jobs = model.resolve_jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].kind, JobKind::Straddle { y_mm: 100.0 });

    let options = GenerationOptions::default();
    let warnings =
        render_job(&mut canvas, &normalizer, &jobs[0], &banded_seal(), &options).unwrap();
    assert!(warnings.is_empty());
    assert_eq!(canvas.draws.len(), 3);

    let page_width_pt = 210.0 * units::POINTS_PER_MM;
    let (container_w, _) = model.placement(config.into()).unwrap().container_dimensions();
    let full_width_pt = units::mm_to_pt(container_w);

    // Each slice is dominated by its own band
    let expected_channel = [0, 1, 2];
    let mut total_width_pt = 0.0;
    for (i, (page, image, rect)) in canvas.draws.iter().enumerate() {
        assert_eq!(*page, i as u32 + 1);
        // Flush with the right edge, all at the same height
        assert!((rect.x + rect.width - page_width_pt).abs() < 1e-6);
        assert!((rect.y - canvas.draws[0].2.y).abs() < 1e-9);
        assert_eq!(rect.opacity, 0.8);
        total_width_pt += rect.width;

        let slice = &canvas.images[*image];
        let center = slice.get_pixel(slice.width() / 2, slice.height() / 2);
        for channel in 0..3 {
            if channel == expected_channel[i] {
                assert!(center[channel] > 200, "page {} channel {}", page, channel);
            } else {
                assert!(center[channel] < 50, "page {} channel {}", page, channel);
            }
        }
    }
    assert!((total_width_pt - full_width_pt).abs() < 1e-6);
}

#[test]
fn test_page_rect_flips_y_and_uses_remap() {
    let pages = vec![
        PageGeometry::new(210.0, 297.0, 0),
        PageGeometry::new(297.0, 210.0, 0),
    ];
    let normalizer = OrientationNormalizer::with_a4_reference(pages);
    let placement = Placement::new(40.0, 0.0, Point::new(120.0, 190.0), 1.0);

    let portrait = normalizer.frame(1).unwrap();
    let rect = page_rect(&portrait, &placement, 0.8);
    assert!((rect.x - units::mm_to_pt(120.0)).abs() < 1e-6);
    assert!((rect.y - units::mm_to_pt(297.0 - 190.0 - 40.0)).abs() < 1e-6);
    assert!((rect.width - units::mm_to_pt(40.0)).abs() < 1e-6);

    // Scenario C: on the landscape page the stamp lands at the remapped spot
    let landscape = normalizer.frame(2).unwrap();
    let rect = page_rect(&landscape, &placement, 0.8);
    assert!((rect.x - units::mm_to_pt(190.0)).abs() < 1e-6);
    assert!((rect.y - units::mm_to_pt(210.0 - 50.0 - 40.0)).abs() < 1e-6);
}

#[test]
fn test_render_job_warns_on_missing_page() {
    let pages = vec![PageGeometry::new(210.0, 297.0, 0)];
    let normalizer = OrientationNormalizer::with_a4_reference(pages.clone());
    let mut canvas = RecordingCanvas {
        pages,
        ..Default::default()
    };
    let job = PlacementJob {
        source: Target::Config(ConfigId(7)),
        asset_id: AssetId(1),
        placement: Placement::new(40.0, 0.0, Point::default(), 1.0),
        kind: JobKind::Page { page_number: 4 },
    };

    let warnings = render_job(
        &mut canvas,
        &normalizer,
        &job,
        &RgbaImage::new(8, 8),
        &GenerationOptions::default(),
    )
    .unwrap();
    assert_eq!(
        warnings,
        vec![EmbedWarning::PageOutOfRange {
            source: Target::Config(ConfigId(7)),
            page_number: 4,
            page_count: 1,
        }]
    );
    assert!(canvas.draws.is_empty());
}

#[tokio::test]
async fn test_generate_stamps_selected_pages() {
    let mut model = PlacementModel::new(PlacementMode::Stamp);
    let asset = model.add_asset(encode_png(&banded_seal())).unwrap();
    let config = model
        .create_config(
            asset,
            ConfigSpec {
                rotation: 30.0,
                ..ConfigSpec::at(Point::new(20.0, 20.0))
            },
        )
        .unwrap();
    model.set_selected_pages(config, [1, 3]);

    let mut generator = EmbeddingGenerator::default();
    let mut states = Vec::new();
    let output = generator
        .generate_with_progress(a4_pdf(3), &model, |state| states.push(state.clone()))
        .await
        .unwrap();

    assert!(output.warnings.is_empty());
    assert_eq!(output.page_count, 3);
    assert_eq!(generator.state(), &GenerationState::Done);
    assert_eq!(
        states,
        vec![
            GenerationState::Loading,
            GenerationState::Rendering {
                current: 1,
                total: 2
            },
            GenerationState::Rendering {
                current: 2,
                total: 2
            },
            GenerationState::Saving,
            GenerationState::Done,
        ]
    );

    let doc = Document::load_mem(&output.bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 3);
    assert_eq!(page_xobjects(&doc, 1), 1);
    assert_eq!(page_xobjects(&doc, 2), 0);
    assert_eq!(page_xobjects(&doc, 3), 1);
}

#[tokio::test]
async fn test_generate_sign_instances_keep_page_sizes() {
    let mut model = PlacementModel::new(PlacementMode::Sign);
    let asset = model.add_asset(encode_png(&banded_seal())).unwrap();
    let config = model.create_config(asset, ConfigSpec::default()).unwrap();
    let first = model.add_instance(config, 1).unwrap();
    model.add_instance(config, 2).unwrap();
    model.update_position(first.into(), Point::new(150.0, 250.0));

    let input = create_test_pdf(&[(A4_W_PT, A4_H_PT), (A4_H_PT, A4_W_PT)]);
    let mut generator = EmbeddingGenerator::default();
    let output = generator.generate(input, &model).await.unwrap();

    let doc = Document::load_mem(&output.bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 2);
    let second = *doc.get_pages().get(&2).unwrap();
    let media_box = doc
        .get_dictionary(second)
        .unwrap()
        .get(b"MediaBox")
        .unwrap()
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(media_box[2].as_i64().unwrap(), A4_H_PT);
    assert_eq!(page_xobjects(&doc, 1), 1);
    assert_eq!(page_xobjects(&doc, 2), 1);
}

#[tokio::test]
async fn test_generate_skips_out_of_range_pages() {
    let mut model = PlacementModel::new(PlacementMode::Stamp);
    let asset = model.add_asset(encode_png(&banded_seal())).unwrap();
    let config = model.create_config(asset, ConfigSpec::default()).unwrap();
    model.set_selected_pages(config, [1, 5]);

    let mut generator = EmbeddingGenerator::default();
    let output = generator.generate(a4_pdf(2), &model).await.unwrap();

    assert_eq!(
        output.warnings,
        vec![EmbedWarning::PageOutOfRange {
            source: Target::Config(config),
            page_number: 5,
            page_count: 2,
        }]
    );
    let doc = Document::load_mem(&output.bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 2);
    assert_eq!(page_xobjects(&doc, 1), 1);
}

// Scenario D
#[tokio::test]
async fn test_generate_aborts_on_deleted_asset() {
    let mut model = PlacementModel::new(PlacementMode::Stamp);
    let kept = model.add_asset(encode_png(&banded_seal())).unwrap();
    let deleted = model.add_asset(encode_png(&banded_seal())).unwrap();
    let ok_config = model.create_config(kept, ConfigSpec::default()).unwrap();
    let bad_config = model.create_config(deleted, ConfigSpec::default()).unwrap();
    model.set_selected_pages(ok_config, [1]);
    model.set_selected_pages(bad_config, [1]);
    assert!(model.remove_asset(deleted));

    let mut generator = EmbeddingGenerator::default();
    let result = generator.generate(a4_pdf(1), &model).await;

    match result {
        Err(StampError::MissingAsset { asset }) => assert_eq!(asset, deleted.0),
        other => panic!("Expected MissingAsset, got {:?}", other.map(|o| o.bytes.len())),
    }
    assert!(matches!(generator.state(), GenerationState::Failed(_)));
}

#[tokio::test]
async fn test_generate_rejects_unparseable_pdf() {
    let model = PlacementModel::new(PlacementMode::Stamp);
    let mut generator = EmbeddingGenerator::default();
    let result = generator.generate(b"not a pdf".to_vec(), &model).await;
    assert!(matches!(result, Err(StampError::PdfLoad(_))));
    assert!(generator.state().is_finished());
}

#[tokio::test]
async fn test_inspect_pages_reports_geometry() {
    let pages = inspect_pages(create_test_pdf(&[(A4_W_PT, A4_H_PT), (A4_H_PT, A4_W_PT)]))
        .await
        .unwrap();
    assert_eq!(pages.len(), 2);
    assert!(pages[0].is_portrait());
    assert!(pages[1].is_landscape());
}

#[tokio::test]
async fn test_pdf_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.pdf");

    write_pdf_bytes(&path, &a4_pdf(2)).await.unwrap();
    let bytes = read_pdf_bytes(&path).await.unwrap();
    let canvas = load_canvas(bytes).await.unwrap();
    assert_eq!(canvas.page_count(), 2);
}

/// Stamp config with a square 40 mm seal selected on `pages`
fn square_stamp(position: Point, pages: &[u32]) -> (PlacementModel, ConfigId) {
    let mut model = PlacementModel::new(PlacementMode::Stamp);
    let asset = model.add_asset(encode_png(&banded_seal())).unwrap();
    let config = model.create_config(asset, ConfigSpec::at(position)).unwrap();
    model.set_selected_pages(config, pages.iter().copied());
    (model, config)
}

/// Preview container of `config` on a page, converted to displayed points
fn preview_points(
    adapter: &PreviewAdapter,
    model: &PlacementModel,
    config: ConfigId,
    page_number: u32,
) -> (f64, f64, f64, f64, f32) {
    let preview = adapter.render(model, config.into(), page_number).unwrap();
    let px_per_pt = adapter.viewport().px_per_mm(1.0);
    let c = preview.container;
    (
        c.left / px_per_pt,
        c.top / px_per_pt,
        c.width / px_per_pt,
        c.height / px_per_pt,
        preview.opacity,
    )
}

/// Draw every job of `model` onto a recording canvas
fn record(
    pages: &[PageGeometry],
    model: &PlacementModel,
    options: &GenerationOptions,
) -> RecordingCanvas {
    let normalizer = options.normalizer(pages.to_vec());
    let mut canvas = RecordingCanvas {
        pages: pages.to_vec(),
        ..Default::default()
    };
    for job in model.resolve_jobs() {
        render_job(&mut canvas, &normalizer, &job, &banded_seal(), options).unwrap();
    }
    canvas
}

#[test]
fn test_quarter_turned_page_matches_preview() {
    let pages = vec![
        PageGeometry::new(210.0, 297.0, 0),
        PageGeometry::new(210.0, 297.0, 90),
    ];
    let (model, config) = square_stamp(Point::new(120.0, 190.0), &[2]);
    let options = GenerationOptions::default();
    let adapter = PreviewAdapter::new(pages.clone(), &options, Viewport::default());

    let (left, top, width, height, opacity) = preview_points(&adapter, &model, config, 2);
    let canvas = record(&pages, &model, &options);
    assert_eq!(canvas.draws.len(), 1);
    let (page, _, rect) = canvas.draws[0];
    assert_eq!(page, 2);

    // Displayed x runs up the MediaBox, displayed y runs right
    assert_eq!(rect.page_rotation, 90);
    assert!((rect.x - top).abs() < 1e-6);
    assert!((rect.y - left).abs() < 1e-6);
    assert!((rect.width - height).abs() < 1e-6);
    assert!((rect.height - width).abs() < 1e-6);
    assert_eq!(rect.opacity, opacity);

    let media_w = units::mm_to_pt(210.0);
    let media_h = units::mm_to_pt(297.0);
    assert!(rect.x >= 0.0 && rect.x + rect.width <= media_w);
    assert!(rect.y >= 0.0 && rect.y + rect.height <= media_h);
}

#[test]
fn test_upside_down_page_matches_preview() {
    let pages = vec![PageGeometry::new(210.0, 297.0, 180)];
    let (model, config) = square_stamp(Point::new(10.0, 10.0), &[1]);
    let options = GenerationOptions::default();
    let adapter = PreviewAdapter::new(pages.clone(), &options, Viewport::new(1.5, 2.0));

    let (left, top, width, height, _) = preview_points(&adapter, &model, config, 1);
    let canvas = record(&pages, &model, &options);
    let (_, _, rect) = canvas.draws[0];

    // Displayed top-left is the MediaBox bottom-right
    let media_w = units::mm_to_pt(210.0);
    assert_eq!(rect.page_rotation, 180);
    assert!((rect.x - (media_w - left - width)).abs() < 1e-6);
    assert!((rect.y - top).abs() < 1e-6);
    assert!((rect.x - units::mm_to_pt(160.0)).abs() < 1e-6);
    assert!((rect.y - units::mm_to_pt(10.0)).abs() < 1e-6);
    assert!((rect.width - width).abs() < 1e-6);
    assert!((rect.height - height).abs() < 1e-6);
}

#[test]
fn test_straddle_on_quarter_turned_page_stays_on_right_edge() {
    let pages = vec![
        PageGeometry::new(210.0, 297.0, 0),
        PageGeometry::new(210.0, 297.0, 270),
        PageGeometry::new(210.0, 297.0, 0),
    ];
    let mut model = PlacementModel::new(PlacementMode::Stamp);
    let asset = model.add_asset(encode_png(&banded_seal())).unwrap();
    let config = model
        .create_config(
            asset,
            ConfigSpec {
                straddle: true,
                straddle_y_mm: Some(100.0),
                ..Default::default()
            },
        )
        .unwrap();
    let options = GenerationOptions::default();
    let adapter = PreviewAdapter::new(pages.clone(), &options, Viewport::default());
    let preview = adapter.straddle_preview(&model, config, 2).unwrap();

    let canvas = record(&pages, &model, &options);
    let (page, _, rect) = canvas.draws[1];
    assert_eq!(page, 2);
    assert_eq!(rect.page_rotation, 270);

    // The displayed right edge of a /Rotate 270 page is the MediaBox bottom
    assert!(rect.y.abs() < 1e-6);
    // Displayed top maps onto the MediaBox right side
    let media_w = units::mm_to_pt(210.0);
    let top = preview.clip_box.top / adapter.viewport().px_per_mm(1.0);
    assert!((media_w - rect.x - rect.width - top).abs() < 1e-6);
}

#[test]
fn test_preview_and_generator_share_reference_width() {
    let pages = vec![
        PageGeometry::new(210.0, 297.0, 0),
        PageGeometry::new(297.0, 210.0, 0),
    ];
    let (model, config) = square_stamp(Point::new(100.0, 150.0), &[2]);
    let options = GenerationOptions {
        reference_width_mm: 200.0,
        ..Default::default()
    };
    let adapter = PreviewAdapter::new(pages.clone(), &options, Viewport::default());
    assert_eq!(adapter.normalizer(), &options.normalizer(pages.clone()));

    let (left, top, width, height, _) = preview_points(&adapter, &model, config, 2);
    let canvas = record(&pages, &model, &options);
    let (_, _, rect) = canvas.draws[0];

    // Remapped against the 200 mm edge: x' = 150, y' = 200 - 100 - 40
    let pt_per_mm = 210.0 * units::POINTS_PER_MM / 200.0;
    assert!((left - 150.0 * pt_per_mm).abs() < 1e-6);
    assert!((top - 60.0 * pt_per_mm).abs() < 1e-6);
    assert!((rect.x - left).abs() < 1e-6);
    assert!((rect.y - (units::mm_to_pt(210.0) - top - height)).abs() < 1e-6);
    assert!((rect.width - width).abs() < 1e-6);
}

#[test]
fn test_preview_opacity_follows_options() {
    let pages = vec![PageGeometry::new(210.0, 297.0, 0); 2];
    let options = GenerationOptions {
        opacity: 0.35,
        ..Default::default()
    };
    let adapter = PreviewAdapter::new(pages.clone(), &options, Viewport::default());

    let (model, config) = square_stamp(Point::new(20.0, 20.0), &[1]);
    let (_, _, _, _, opacity) = preview_points(&adapter, &model, config, 1);
    let canvas = record(&pages, &model, &options);
    assert_eq!(opacity, 0.35);
    assert_eq!(canvas.draws[0].2.opacity, opacity);

    let mut straddle = model.clone();
    straddle.set_straddle(config, true, Some(50.0));
    let preview = adapter.straddle_preview(&straddle, config, 1).unwrap();
    assert_eq!(preview.opacity, 0.35);
}
