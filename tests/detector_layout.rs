use std::collections::HashSet;

use approx::assert_abs_diff_eq;
use iceberg_light::geometry::{check_unique_ids, Axis};
use iceberg_light::*;

fn reference() -> DetectorLayout {
    DetectorLayout::build(&Config::default().detector).unwrap()
}

#[test]
fn copy_indices_are_dense_per_group() {
    let layout = reference();
    check_unique_ids(layout.placements()).unwrap();
    for (group, n) in layout.counts() {
        let ids: HashSet<u32> = layout.group(group).map(|p| p.id.copy_index).collect();
        assert_eq!(ids, (0..n as u32).collect::<HashSet<u32>>(), "{}", group);
    }
}

#[test]
fn mirrored_families_are_symmetric() {
    let layout = reference();
    let families = [
        (GroupKey::FieldCageWide, Axis::X),
        (GroupKey::FieldCageSlim, Axis::X),
        (GroupKey::FieldCageShort, Axis::Z),
        (GroupKey::FieldCageShortSlim, Axis::Z),
        (GroupKey::FieldCageShortSideA, Axis::Z),
        (GroupKey::FieldCageShortSideB, Axis::Z),
        (GroupKey::MembraneShield, Axis::X),
        (GroupKey::MembraneWindow, Axis::X),
        (GroupKey::ShortWallShield, Axis::Z),
        (GroupKey::ShortWallWindow, Axis::Z),
    ];
    for &(group, axis) in families.iter() {
        let placements: Vec<&Placement> = layout.group(group).collect();
        let half = placements.len() / 2;
        for (a, b) in placements[..half].iter().zip(placements[half..].iter()) {
            assert_eq!(b.id.copy_index, a.id.copy_index + half as u32);
            assert_abs_diff_eq!(b.position.component(axis), -a.position.component(axis), epsilon = 1e-12);
            assert_eq!(a.position.y, b.position.y);
            assert!(a.position.component(axis) > 0.0, "{} on the wrong side", a.id);
        }
    }
}

#[test]
fn everything_fits_in_the_cryostat() {
    let config = Config::default();
    let layout = reference();
    let cryostat = config.detector.cryostat.vessel_size * 0.5;
    for p in layout.placements().iter().filter(|p| p.parent == Region::Cryostat) {
        assert!(p.position.x.abs() < cryostat.x, "{}", p.id);
        assert!(p.position.y.abs() < cryostat.y, "{}", p.id);
        assert!(p.position.z.abs() < cryostat.z, "{}", p.id);
    }
}

#[test]
fn rotations_are_proper() {
    for p in reference().placements() {
        let r = p.rotation_or_identity();
        let m = r.matrix();
        let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1]) - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
        assert_abs_diff_eq!(det, 1.0, epsilon = 1e-12);
    }
}

#[test]
fn layout_round_trips_through_json() {
    let layout = reference();
    let json = serde_json::to_string(&layout).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let placements = value["placements"].as_array().unwrap();
    assert_eq!(placements.len(), layout.placements().len());
    assert_eq!(placements[0]["shape"]["kind"], "box");
    let back: Vec<Placement> = serde_json::from_value(value["placements"].clone()).unwrap();
    for (a, b) in back.iter().zip(layout.placements()) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.parent, b.parent);
        assert_eq!(a.shape.kind(), b.shape.kind());
        assert_abs_diff_eq!(a.position.z, b.position.z, epsilon = 1e-12);
    }
}
