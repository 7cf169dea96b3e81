use pdf_stamp::geometry::*;
use pdf_stamp::units::*;
use pdf_stamp::*;

const EPS: f64 = 1e-6;

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    image::RgbaImage::from_pixel(width, height, image::Rgba([0, 0, 0, 255]))
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

#[test]
fn test_unit_round_trips() {
    for mm in [0.0, 1.0, 12.5, 40.0, 210.0, 297.0] {
        assert!((pt_to_mm(mm_to_pt(mm)) - mm).abs() < EPS, "mm {}", mm);
    }

    let viewport = Viewport::new(1.75, 1.5);
    for px in [0.0, 3.0, 595.0, 842.0] {
        assert!((viewport.mm_to_px(viewport.px_to_mm(px)) - px).abs() < EPS);
    }
    for mm in [0.0, 210.0, 297.0] {
        assert!((px_to_mm(mm_to_px(mm, 2.0, 1.5), 2.0, 1.5) - mm).abs() < EPS);
    }
}

#[test]
fn test_bounds_identity() {
    let b = rotated_bounds(40.0, 25.0, 0.0);
    assert_eq!(b.width, 40.0);
    assert_eq!(b.height, 25.0);
    assert_eq!(b.offset_x, 0.0);
    assert_eq!(b.offset_y, 0.0);
}

#[test]
fn test_bounds_symmetry() {
    let mut theta = 0.0;
    while theta <= 360.0 {
        let a = rotated_bounds(40.0, 25.0, theta);
        let b = rotated_bounds(40.0, 25.0, 360.0 - theta);
        assert!((a.width - b.width).abs() < 1e-9, "theta {}", theta);
        assert!((a.height - b.height).abs() < 1e-9, "theta {}", theta);
        assert!((a.offset_x - b.offset_x).abs() < 1e-9, "theta {}", theta);
        assert!((a.offset_y - b.offset_y).abs() < 1e-9, "theta {}", theta);
        theta += 7.5;
    }
}

#[test]
fn test_center_preserved_across_rotations() {
    let mut model = PlacementModel::new(PlacementMode::Sign);
    let asset = model.add_asset(png(300, 120)).unwrap();
    let config = model
        .create_config(asset, ConfigSpec::at(Point::new(60.0, 80.0)))
        .unwrap();
    let instance = model.add_instance(config, 1).unwrap();
    let target = Target::from(instance);

    let mut angle = 0.0;
    for step in [15.0, 30.0, 45.0, 90.0, 133.0, 180.0, 271.0, 359.0] {
        let before = model.placement(target).unwrap().center();
        angle += step;
        assert!(model.update_rotation(target, angle));
        let after = model.placement(target).unwrap().center();
        assert!(after.approx_eq(&before, EPS), "after rotating to {}", angle);
    }
}

// Scenario A
#[test]
fn test_quarter_turn_swaps_container_and_keeps_center() {
    let mut model = PlacementModel::new(PlacementMode::Stamp);
    let wide = model.add_asset(png(200, 100)).unwrap();
    let square = model.add_asset(png(100, 100)).unwrap();

    for asset in [wide, square] {
        let config = model
            .create_config(asset, ConfigSpec::at(Point::new(30.0, 30.0)))
            .unwrap();
        let target = Target::from(config);
        let (w0, h0) = model.placement(target).unwrap().container_dimensions();
        let center = model.placement(target).unwrap().center();

        model.update_rotation(target, 90.0);

        let placement = model.placement(target).unwrap();
        let (w1, h1) = placement.container_dimensions();
        assert!((w1 - h0).abs() < EPS);
        assert!((h1 - w0).abs() < EPS);
        assert!(placement.center().approx_eq(&center, EPS));
    }
}

#[test]
fn test_straddle_partition() {
    for total in 1..=12u32 {
        for width in [1u32, 7, 100, 157, 472, 1000] {
            let slices = straddle_slices(total, width);
            assert_eq!(slices.len(), total as usize);

            let sum: u32 = slices.iter().map(|s| s.width_px).sum();
            assert_eq!(sum, width, "total {} width {}", total, width);

            let base = width / total;
            for s in &slices[..slices.len() - 1] {
                assert_eq!(s.width_px, base);
            }

            assert_eq!(slices[0].clip_start_pct(), 0.0);
            assert_eq!(slices[slices.len() - 1].clip_end_pct(), 100.0);
            for pair in slices.windows(2) {
                assert!((pair[0].clip_end_pct() - pair[1].clip_start_pct()).abs() < 1e-9);
            }
        }
    }
}

// Scenario C
#[test]
fn test_mixed_orientation_remap_and_inverse() {
    let normalizer = OrientationNormalizer::with_a4_reference(vec![
        PageGeometry::new(210.0, 297.0, 0),
        PageGeometry::new(297.0, 210.0, 0),
        PageGeometry::new(210.0, 297.0, 0),
    ]);

    let portrait = normalizer.frame(1).unwrap();
    let landscape = normalizer.frame(2).unwrap();
    assert!(!portrait.mixed);
    assert!(landscape.mixed);

    let stored = Point::new(120.0, 190.0);
    assert_eq!(portrait.to_page(stored, 40.0), stored);

    let on_page = landscape.to_page(stored, 40.0);
    assert!(on_page.approx_eq(&Point::new(190.0, 50.0), EPS));
    assert!(landscape.to_stored(on_page, 40.0).approx_eq(&stored, EPS));

    for x in [0.0, 35.5, 100.0, 170.0] {
        for y in [0.0, 60.25, 200.0, 257.0] {
            let p = Point::new(x, y);
            let back = landscape.to_stored(landscape.to_page(p, 40.0), 40.0);
            assert!(back.approx_eq(&p, EPS));
        }
    }
}

#[test]
fn test_uniform_landscape_document_is_not_remapped() {
    let normalizer = OrientationNormalizer::with_a4_reference(vec![
        PageGeometry::new(297.0, 210.0, 0),
        PageGeometry::new(297.0, 210.0, 0),
    ]);
    let frame = normalizer.frame(2).unwrap();
    assert!(!frame.mixed);
    assert_eq!(frame.to_page(Point::new(5.0, 6.0), 40.0), Point::new(5.0, 6.0));
}

#[test]
fn test_page_ratio_scales_with_short_edge() {
    // US Letter is 215.9mm wide, so one document millimeter is slightly larger
    let normalizer = OrientationNormalizer::with_a4_reference(vec![PageGeometry::from_points(
        612.0, 792.0, 0,
    )]);
    let frame = normalizer.frame(1).unwrap();
    assert!((frame.pt_per_mm - 612.0 / 210.0).abs() < EPS);
    assert!((frame.width_doc_mm() - 210.0).abs() < EPS);
}
