use nalgebra::Point3;
use riscan_batch::bounds::compute_bounds;

#[test]
fn single_position_example() {
    let origins = vec![Point3::new(10.0, 20.0, 30.0)];
    let bounds = compute_bounds(&origins, 5.0, 50.0).unwrap();
    let b = bounds.to_array();

    assert!(b[2] <= 30.0 - 5.0 - 5.0);
    assert!(b[5] >= 30.0 + 50.0);
    for v in [b[0], b[1], b[3], b[4]] {
        assert_eq!(v.rem_euclid(5.0), 0.0, "expected a multiple of 5, got {v}");
    }

    assert_eq!(b, [5.0, 15.0, 20.0, 15.0, 25.0, 80.0]);
}

#[test]
fn order_independent() {
    let a = Point3::new(-3.2, 14.9, 1.0);
    let b = Point3::new(22.7, -8.1, 4.5);
    let c = Point3::new(5.0, 5.0, 2.2);

    let forward = compute_bounds(&[a, b, c], 5.0, 50.0).unwrap();
    let reversed = compute_bounds(&[c, b, a], 5.0, 50.0).unwrap();
    let shuffled = compute_bounds(&[b, a, c], 5.0, 50.0).unwrap();

    assert_eq!(forward, reversed);
    assert_eq!(forward, shuffled);
}

#[test]
fn empty_input_is_rejected() {
    let err = compute_bounds(&[], 5.0, 50.0).unwrap_err();
    assert!(err.to_string().contains("no positions to bound"));
}

#[test]
fn nonpositive_buffer_is_rejected() {
    let origins = vec![Point3::new(0.0, 0.0, 0.0)];
    assert!(compute_bounds(&origins, 0.0, 50.0).is_err());
}

#[test]
fn volume_encloses_every_origin() {
    let origins = vec![
        Point3::new(100.0, 200.0, 50.0),
        Point3::new(130.0, 180.0, 48.0),
        Point3::new(115.0, 210.0, 53.0),
    ];
    let bounds = compute_bounds(&origins, 5.0, 50.0).unwrap();

    for o in &origins {
        assert!(bounds.min.x < o.x && o.x < bounds.max.x);
        assert!(bounds.min.y < o.y && o.y < bounds.max.y);
        assert!(bounds.min.z < o.z && o.z < bounds.max.z);
    }
}

#[test]
fn grid_dims_floor_divide_the_extent() {
    let origins = vec![Point3::new(10.0, 20.0, 30.0)];
    let bounds = compute_bounds(&origins, 5.0, 50.0).unwrap();
    // Extents are 10 x 10 x 60 at resolution 1.
    assert_eq!(bounds.grid_dims(1.0), (10, 10, 60));
    assert_eq!(bounds.grid_dims(4.0), (2, 2, 15));
}
