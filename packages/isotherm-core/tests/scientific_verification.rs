use approx::assert_relative_eq;
use isotherm_core::{
    evaluate, evaluate_grid, fit, fit_exact, is_labeled_level, isotherm_levels, join_sites,
    linspace_levels, load_sites, sites_to_points, Bounds, Grid, GridError, PointSet, SamplePoint,
    SiteError, Table, TpsError,
};
use isotherm_core::sites::{CoordinateRecord, TemperatureRecord};
use std::io::Write;

/// Scattered but reproducible layout on the unit square.
fn scattered_points(n: usize) -> PointSet {
    (0..n)
        .map(|i| {
            let t = i as f64;
            let x = (t * 0.618_033_988_75).fract();
            let y = (t * 0.414_213_562_37 + 0.1).fract();
            let value = 12.0 + 3.0 * (4.0 * x).sin() - 2.0 * (3.0 * y).cos() + x * y;
            SamplePoint::new(x, y, value)
        })
        .collect()
}

/// Readings around downtown Vancouver, x = longitude, y = latitude.
fn vancouver_points() -> PointSet {
    PointSet::from_triples(&[
        (-123.1208, 49.2830, 14.5),
        (-123.1400, 49.2900, 13.0),
        (-123.1000, 49.2750, 15.5),
        (-123.1650, 49.2700, 12.0),
        (-123.0900, 49.2600, 16.0),
        (-123.1300, 49.2550, 13.5),
        (-123.2000, 49.2650, 11.5),
        (-123.1100, 49.2950, 14.0),
    ])
}

#[test]
fn test_three_point_scenario() {
    let points = PointSet::from_triples(&[(0.0, 0.0, 10.0), (1.0, 0.0, 20.0), (0.0, 1.0, 15.0)]);
    let spline = fit_exact(&points).unwrap();

    let values = evaluate(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)], &spline);
    assert_relative_eq!(values[0], 10.0, epsilon = 1e-6);
    assert_relative_eq!(values[1], 20.0, epsilon = 1e-6);
    assert_relative_eq!(values[2], 15.0, epsilon = 1e-6);

    // Three samples leave no freedom for the radial part: the plane through them.
    assert_relative_eq!(spline.value_at(0.5, 0.5), 10.0 + 5.0 + 2.5, epsilon = 1e-9);
}

#[test]
fn test_exact_interpolation_at_control_points() {
    let points = scattered_points(25);
    let spline = fit(&points, 0.0).unwrap();

    let query: Vec<(f64, f64)> = points.iter().map(|p| (p.x, p.y)).collect();
    let values = evaluate(&query, &spline);
    for (p, v) in points.iter().zip(values) {
        assert_relative_eq!(v, p.value, max_relative = 1e-9);
    }
}

#[test]
fn test_exact_interpolation_geographic_coordinates() {
    let points = vancouver_points();
    let spline = fit_exact(&points).unwrap();
    for p in &points {
        assert_relative_eq!(spline.value_at(p.x, p.y), p.value, max_relative = 1e-9);
    }
}

#[test]
fn test_affine_reproduction() {
    let plane = |x: f64, y: f64| 3.0 + 2.0 * x - 5.0 * y;
    let points: PointSet = scattered_points(12)
        .iter()
        .map(|p| SamplePoint::new(p.x, p.y, plane(p.x, p.y)))
        .collect();
    let spline = fit_exact(&points).unwrap();

    for w in spline.weights() {
        assert!(w.abs() < 1e-8, "radial weight {} should vanish", w);
    }
    let [a0, a1, a2] = spline.affine();
    assert_relative_eq!(a0, 3.0, epsilon = 1e-8);
    assert_relative_eq!(a1, 2.0, epsilon = 1e-8);
    assert_relative_eq!(a2, -5.0, epsilon = 1e-8);

    for &(x, y) in &[(-2.0, 4.0), (0.3, 0.7), (10.0, -3.5)] {
        assert_relative_eq!(spline.value_at(x, y), plane(x, y), epsilon = 1e-8);
    }
}

#[test]
fn test_affine_reproduction_geographic_frame() {
    // The coefficients are reported in the caller's frame, not the normalized one.
    let plane = |x: f64, y: f64| 12.0 + 40.0 * (x + 123.1) - 30.0 * (y - 49.28);
    let points: PointSet = vancouver_points()
        .iter()
        .map(|p| SamplePoint::new(p.x, p.y, plane(p.x, p.y)))
        .collect();
    let spline = fit_exact(&points).unwrap();

    let [a0, a1, a2] = spline.affine();
    assert_relative_eq!(a0, 12.0 + 40.0 * 123.1 + 30.0 * 49.28, max_relative = 1e-9);
    assert_relative_eq!(a1, 40.0, max_relative = 1e-8);
    assert_relative_eq!(a2, -30.0, max_relative = 1e-8);
    assert!(spline.weights().iter().all(|w| w.abs() < 1e-6));
}

#[test]
fn test_caller_frame_coefficients_reproduce_surface() {
    let points = vancouver_points();
    let spline = fit_exact(&points).unwrap();
    let coeffs = spline.coefficients();
    let controls = spline.control_points();
    let n = controls.len();
    assert_eq!(coeffs.len(), n + 3);

    // Evaluate the textbook formula directly in degrees.
    let manual = |x: f64, y: f64| {
        let mut val = coeffs[n] + coeffs[n + 1] * x + coeffs[n + 2] * y;
        for (i, &(px, py)) in controls.iter().enumerate() {
            let r2 = (x - px).powi(2) + (y - py).powi(2);
            if r2 > 0.0 {
                val += coeffs[i] * r2 * r2.ln();
            }
        }
        val
    };
    for &(x, y) in &[(-123.15, 49.27), (-123.12, 49.28), (-123.19, 49.29)] {
        assert_relative_eq!(manual(x, y), spline.value_at(x, y), max_relative = 1e-7);
    }
}

#[test]
fn test_order_independence() {
    let points = scattered_points(15);
    let mut reversed: Vec<SamplePoint> = points.points().to_vec();
    reversed.reverse();
    reversed.swap(2, 9);
    let shuffled = PointSet::new(reversed);

    let a = fit_exact(&points).unwrap();
    let b = fit_exact(&shuffled).unwrap();

    let query = [(0.25, 0.25), (0.9, 0.1), (0.5, 0.77), (1.3, -0.2)];
    let va = evaluate(&query, &a);
    let vb = evaluate(&query, &b);
    for (x, y) in va.iter().zip(vb.iter()) {
        assert_relative_eq!(x, y, max_relative = 1e-9);
    }
}

#[test]
fn test_too_few_points_rejected() {
    let points = PointSet::from_triples(&[(0.0, 0.0, 1.0), (1.0, 1.0, 2.0)]);
    assert!(matches!(fit_exact(&points), Err(TpsError::SingularSystem(_))));
    assert!(matches!(
        fit_exact(&PointSet::default()),
        Err(TpsError::SingularSystem(_))
    ));
}

#[test]
fn test_collinear_points_rejected() {
    let diagonal = PointSet::from_triples(&[
        (0.0, 0.0, 1.0),
        (1.0, 1.0, 2.0),
        (2.0, 2.0, 5.0),
        (3.0, 3.0, 3.0),
    ]);
    assert!(matches!(fit_exact(&diagonal), Err(TpsError::SingularSystem(_))));

    let horizontal = PointSet::from_triples(&[(0.0, 4.0, 1.0), (1.0, 4.0, 2.0), (5.0, 4.0, 0.5)]);
    assert!(matches!(fit_exact(&horizontal), Err(TpsError::SingularSystem(_))));
}

#[test]
fn test_coincident_points_rejected() {
    let points = PointSet::from_triples(&[
        (0.0, 0.0, 10.0),
        (0.0, 0.0, 12.0),
        (1.0, 0.0, 5.0),
        (0.0, 1.0, 7.0),
    ]);
    assert!(matches!(fit_exact(&points), Err(TpsError::SingularSystem(_))));
}

#[test]
fn test_invalid_input_rejected() {
    let points = scattered_points(6);
    assert!(matches!(
        fit(&points, -1.0),
        Err(TpsError::InvalidRegularization(_))
    ));
    assert!(matches!(
        fit(&points, f64::NAN),
        Err(TpsError::InvalidRegularization(_))
    ));

    let mut bad = scattered_points(5);
    bad.push(SamplePoint::new(0.3, f64::NAN, 1.0));
    assert!(matches!(
        fit_exact(&bad),
        Err(TpsError::NonFinitePoint { index: 5 })
    ));
}

#[test]
fn test_regularization_smooths() {
    let points = scattered_points(20);
    let exact = fit(&points, 0.0).unwrap();
    let smooth = fit(&points, 0.5).unwrap();
    assert_eq!(smooth.regularization(), 0.5);

    let query: Vec<(f64, f64)> = points.iter().map(|p| (p.x, p.y)).collect();
    let exact_residual: f64 = evaluate(&query, &exact)
        .iter()
        .zip(points.iter())
        .map(|(v, p)| (v - p.value).abs())
        .sum();
    let smooth_residual: f64 = evaluate(&query, &smooth)
        .iter()
        .zip(points.iter())
        .map(|(v, p)| (v - p.value).abs())
        .sum();

    assert!(exact_residual < 1e-8);
    assert!(smooth_residual > 1e-3);
    assert!(smooth_residual.is_finite());
}

#[test]
fn test_grid_coverage() {
    let points = vancouver_points();
    let bounds = Bounds::from_points(&points).unwrap();
    assert_eq!(bounds.min_x, -123.2);
    assert_eq!(bounds.max_x, -123.09);
    assert_eq!(bounds.min_y, 49.255);
    assert_eq!(bounds.max_y, 49.295);

    let grid = Grid::square(bounds, 40).unwrap();
    assert_eq!(grid.x_at(0), bounds.min_x);
    assert_eq!(grid.x_at(39), bounds.max_x);
    assert_eq!(grid.y_at(0), bounds.min_y);
    assert_eq!(grid.y_at(39), bounds.max_y);

    let spline = fit_exact(&points).unwrap();
    let field = evaluate_grid(&grid, &spline);
    assert_eq!(field.dim(), (40, 40));
    assert_eq!(field.values().len(), 40 * 40);
    assert_eq!(field.bounds(), &bounds);

    // Row-major layout matches the flat evaluator.
    let flat = evaluate(&grid.points(), &spline);
    for (a, b) in field.values().iter().zip(flat.iter()) {
        assert_eq!(a, b);
    }
}

#[test]
fn test_padded_grid_contains_bounds() {
    let bounds = Bounds::from_points(&scattered_points(10)).unwrap();
    let padded = bounds.padded(0.2, 0.1).unwrap();
    assert!(padded.encloses(&bounds));
    assert_relative_eq!(padded.width(), bounds.width() + 0.4, epsilon = 1e-12);
    assert_relative_eq!(padded.height(), bounds.height() + 0.2, epsilon = 1e-12);

    let by_fraction = bounds.padded_by_fraction(0.1).unwrap();
    assert!(by_fraction.encloses(&bounds));

    let grid = Grid::new(padded, 3, 5).unwrap();
    assert_eq!(grid.points().len(), 15);
    let (dx, dy) = grid.spacing();
    assert_relative_eq!(dx, padded.width() / 4.0, epsilon = 1e-12);
    assert_relative_eq!(dy, padded.height() / 2.0, epsilon = 1e-12);
}

#[test]
fn test_grid_rejects_bad_input() {
    assert!(matches!(
        Bounds::new(1.0, 0.0, 0.0, 1.0),
        Err(GridError::InvalidBounds { .. })
    ));
    assert!(matches!(
        Bounds::from_points(&PointSet::default()),
        Err(GridError::EmptyPointSet)
    ));
    let bounds = Bounds::new(0.0, 1.0, 0.0, 1.0).unwrap();
    assert!(matches!(
        Grid::new(bounds, 0, 10),
        Err(GridError::EmptyResolution { .. })
    ));
    let single = Grid::new(bounds, 1, 1).unwrap();
    assert_eq!(single.points(), vec![(0.0, 0.0)]);
}

#[test]
fn test_isotherm_levels() {
    let levels = isotherm_levels(11.3, 14.8, 0.5);
    assert_eq!(levels.len(), 6);
    assert_relative_eq!(levels[0], 11.3);
    assert_relative_eq!(levels[5], 13.8, epsilon = 1e-12);

    let whole = isotherm_levels(12.0, 15.0, 0.5);
    let labeled: Vec<f64> = whole.into_iter().filter(|&l| is_labeled_level(l)).collect();
    assert_eq!(labeled, vec![12.0, 13.0, 14.0]);

    assert!(isotherm_levels(10.0, 10.9, 0.5).is_empty());
    assert!(isotherm_levels(10.0, 20.0, 0.0).is_empty());

    assert_eq!(linspace_levels(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    assert!(linspace_levels(0.0, 1.0, 0).is_empty());
}

#[test]
fn test_join_sites() {
    let coords = vec![
        CoordinateRecord { name: "A".into(), lat: 49.28, lon: -123.12 },
        CoordinateRecord { name: "B".into(), lat: 49.27, lon: -123.14 },
    ];
    let temps = vec![
        TemperatureRecord { name: "B".into(), temperature: 13.0 },
        TemperatureRecord { name: "A".into(), temperature: 14.5 },
    ];
    let sites = join_sites(&coords, &temps).unwrap();
    assert_eq!(sites.len(), 2);
    assert_eq!(sites[0].name, "A");
    assert_eq!(sites[0].temperature, 14.5);

    let points = sites_to_points(&sites);
    assert_eq!(points.points()[1], SamplePoint::new(-123.14, 49.27, 13.0));

    let missing_temp = join_sites(&coords, &temps[..1]);
    assert!(matches!(
        missing_temp,
        Err(SiteError::InputMismatch { ref site, missing_from: Table::Temperatures }) if site == "A"
    ));

    let missing_coord = join_sites(&coords[..1], &temps);
    assert!(matches!(
        missing_coord,
        Err(SiteError::InputMismatch { ref site, missing_from: Table::Coordinates }) if site == "B"
    ));

    let doubled = vec![coords[0].clone(), coords[0].clone()];
    assert!(matches!(
        join_sites(&doubled, &temps[1..]),
        Err(SiteError::DuplicateSite { table: Table::Coordinates, .. })
    ));
}

#[test]
fn test_load_sites_from_csv() {
    let dir = tempfile::tempdir().unwrap();
    let coords_path = dir.path().join("coordinates.csv");
    let temps_path = dir.path().join("temps.csv");

    let mut coords = std::fs::File::create(&coords_path).unwrap();
    writeln!(coords, "# name, lat, lon").unwrap();
    writeln!(coords, "CBD,49.2830,-123.1208").unwrap();
    writeln!(coords, "Kits, 49.2680 , -123.1550").unwrap();
    let mut temps = std::fs::File::create(&temps_path).unwrap();
    writeln!(temps, "Kits, 12.5").unwrap();
    writeln!(temps, "CBD , 15.0").unwrap();

    let sites = load_sites(&coords_path, &temps_path).unwrap();
    assert_eq!(sites.len(), 2);
    assert_eq!(sites[1].name, "Kits");
    assert_eq!(sites[1].lon, -123.155);
    assert_eq!(sites[1].temperature, 12.5);

    let bad_path = dir.path().join("bad.csv");
    std::fs::write(&bad_path, "CBD,49.28,west\n").unwrap();
    assert!(matches!(
        load_sites(&bad_path, &temps_path),
        Err(SiteError::Parse { line: 1, .. })
    ));
}
