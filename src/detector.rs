//! Full light-simulation layout of the ICEBERG cryostat.
//!
//! The world contains the cryostat and its steel shell. Everything else lives
//! in the cryostat: the two plates, the field-cage profiles and the three
//! families of light collectors (long membrane walls, cathode plane, short
//! end walls), each made of a shield frame and an acceptance window.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use crate::config::{DetectorConfig, FieldCageConfig, LightCollectorConfig};
use crate::error::Result;
use crate::geometry::{
    build_grid_placements, build_rail_placements, build_staggered_placements, check_unique_ids, mirror_across_axis,
    Axis, GridSpec, GroupKey, Mirror, Placement, PlacementId, RailSpec, Region, Rotation, Shape, StaggeredSpec,
};
use crate::Vector;

/// Length the cutting box of a half profile sticks out past each end.
const CUT_OVERHANG: f64 = 1.0;

#[derive(Debug, Clone, Serialize)]
pub struct DetectorLayout {
    pub world:  Shape,
    placements: Vec<Placement>,
}

impl DetectorLayout {
    pub fn build(config: &DetectorConfig) -> Result<Self> {
        config.validate()?;
        let mut placements = vessel(config);
        placements.extend(long_field_cage(config)?);
        placements.extend(short_field_cage(config)?);
        placements.extend(membrane_modules(config)?);
        placements.extend(cathode_modules(config)?);
        placements.extend(short_wall_modules(config)?);
        check_unique_ids(&placements)?;

        let layout = Self {
            world: Shape::boxed(config.world_size),
            placements,
        };
        for (group, n) in layout.counts() {
            log::debug!("{}: {} placements", group, n);
        }
        Ok(layout)
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn group(&self, key: GroupKey) -> impl Iterator<Item = &Placement> + '_ {
        self.placements.iter().filter(move |p| p.id.group == key)
    }

    pub fn counts(&self) -> BTreeMap<GroupKey, usize> {
        let mut counts = BTreeMap::new();
        for p in self.placements.iter() {
            *counts.entry(p.id.group).or_insert(0) += 1;
        }
        counts
    }

    pub fn into_placements(self) -> Vec<Placement> {
        self.placements
    }
}

fn single(group: GroupKey, parent: Region, shape: Shape, position: Vector<f64>) -> Placement {
    Placement {
        id: PlacementId { group, copy_index: 0 },
        shape,
        position,
        rotation: None,
        parent,
    }
}

/// `side` followed by its mirror image, whose copy indices continue after it.
fn with_mirror(side: Vec<Placement>, axis: Axis, flip_about: Axis) -> Result<Vec<Placement>> {
    let mirror = Mirror {
        axis,
        flip_about,
        copy_offset: side.len() as i64,
    };
    let mirrored = mirror_across_axis(&side, &mirror)?;
    let mut placements = side;
    placements.extend(mirrored);
    Ok(placements)
}

fn vessel(config: &DetectorConfig) -> Vec<Placement> {
    let c = &config.cryostat;
    let inner_half = c.vessel_size * 0.5 + Vector::new(0.0, c.overlap_margin, 0.0);
    let cryostat = Shape::Box { half: inner_half };
    let shell = Shape::Box {
        half: c.vessel_size * 0.5 + Vector::splat(c.shell_thickness),
    }
    .subtract(cryostat.clone(), Vector::ZERO);
    let plate = Shape::boxed(Vector::new(c.plate_x, c.plate_thickness, c.plate_z));
    let plate_y = (c.active_size.y + c.plate_thickness) / 2.0;
    vec![
        single(GroupKey::Cryostat, Region::World, cryostat, Vector::ZERO),
        single(GroupKey::Shell, Region::World, shell, Vector::ZERO),
        single(
            GroupKey::Cathode,
            Region::Cryostat,
            plate.clone(),
            Vector::new(0.0, -plate_y, 0.0),
        ),
        single(GroupKey::Anode, Region::Cryostat, plate, Vector::new(0.0, plate_y, 0.0)),
    ]
}

/// Elliptical tube along z with the half at +x removed.
fn half_profile(fc: &FieldCageConfig, half_height: f64, half_length: f64) -> Shape {
    let tube = Shape::EllipticalTube {
        dx: fc.profile_half_width,
        dy: half_height,
        dz: half_length,
    };
    let cut = Shape::Box {
        half: Vector::new(fc.profile_half_width, half_height, half_length + CUT_OVERHANG),
    };
    tube.subtract(cut, Vector::new(fc.cut_offset, 0.0, 0.0))
}

fn rail_span(count: u32, pitch: f64) -> f64 {
    f64::from(count.saturating_sub(1)) * pitch
}

/// Offset of the first slim profile; the slim section continues the wide one.
fn slim_start(fc: &FieldCageConfig) -> f64 {
    fc.first_offset + f64::from(fc.wide_count) * fc.pitch
}

fn field_cage_length(config: &DetectorConfig) -> f64 {
    config.cryostat.active_size.z - config.cryostat.plate_thickness
}

fn long_field_cage(config: &DetectorConfig) -> Result<Vec<Placement>> {
    let fc = &config.field_cage;
    let half_length = field_cage_length(config) / 2.0;
    let wide = RailSpec {
        group:        GroupKey::FieldCageWide,
        parent:       Region::Cryostat,
        shape:        half_profile(fc, fc.wide_half_height, half_length),
        base:         Vector::new(fc.width / 2.0, -config.cryostat.active_size.y / 2.0, 0.0),
        axis:         Axis::Y,
        rotation:     None,
        pitch:        fc.pitch,
        start_offset: fc.first_offset,
        span_length:  rail_span(fc.wide_count, fc.pitch),
    };
    let slim = RailSpec {
        group: GroupKey::FieldCageSlim,
        shape: half_profile(fc, fc.slim_half_height, half_length),
        start_offset: slim_start(fc),
        span_length: rail_span(fc.slim_count, fc.pitch),
        ..wide.clone()
    };

    let mut placements = Vec::new();
    for rail in [wide, slim].iter() {
        placements.extend(with_mirror(build_rail_placements(rail)?, Axis::X, Axis::Z)?);
    }
    Ok(placements)
}

/// Profiles along the end walls, running along x. Below the slim section
/// they are single pieces; above it they are split into a slim central piece
/// and two wide outer pieces.
fn short_field_cage(config: &DetectorConfig) -> Result<Vec<Placement>> {
    let fc = &config.field_cage;
    let base = Vector::new(
        0.0,
        -config.cryostat.active_size.y / 2.0,
        field_cage_length(config) / 2.0,
    );
    let short = RailSpec {
        group: GroupKey::FieldCageShort,
        parent: Region::Cryostat,
        shape: half_profile(fc, fc.wide_half_height, fc.width / 2.0 - fc.end_gap),
        base,
        axis: Axis::Y,
        rotation: Some(Rotation::about(Axis::Y, PI / 2.0)),
        pitch: fc.pitch,
        start_offset: fc.first_offset,
        span_length: rail_span(fc.wide_count, fc.pitch),
    };
    let center_half_length = fc.width / 2.0 - fc.side_length;
    let slim = RailSpec {
        group: GroupKey::FieldCageShortSlim,
        shape: half_profile(fc, fc.slim_half_height, center_half_length),
        start_offset: slim_start(fc),
        span_length: rail_span(fc.slim_count, fc.pitch),
        ..short.clone()
    };
    let side_x = center_half_length + fc.side_length / 2.0;
    let side_shape = half_profile(fc, fc.wide_half_height, fc.side_length / 2.0 - fc.end_gap);
    let side_a = RailSpec {
        group: GroupKey::FieldCageShortSideA,
        shape: side_shape.clone(),
        base: base.with_component(Axis::X, side_x),
        ..slim.clone()
    };
    let side_b = RailSpec {
        group: GroupKey::FieldCageShortSideB,
        shape: side_shape,
        base: base.with_component(Axis::X, -side_x),
        ..slim.clone()
    };

    let mut placements = Vec::new();
    for rail in [short, slim, side_a, side_b].iter() {
        placements.extend(with_mirror(build_rail_placements(rail)?, Axis::Z, Axis::Y)?);
    }
    Ok(placements)
}

/// Square frame, `shield_thickness` deep along `normal`, with the window
/// opening cut into its +`normal` face.
fn shield_shape(lc: &LightCollectorConfig, normal: Axis) -> Shape {
    let frame = Vector::splat(lc.shield_size).with_component(normal, lc.shield_thickness);
    let opening = Vector::splat(lc.window).with_component(normal, lc.shield_thickness);
    Shape::boxed(frame).subtract(Shape::boxed(opening), normal.unit() * (lc.shield_thickness / 2.0))
}

fn window_shape(lc: &LightCollectorConfig, normal: Axis) -> Shape {
    Shape::boxed(Vector::splat(lc.window).with_component(normal, lc.acceptance_thickness))
}

/// Window center for a shield whose back rests at `wall`, measured inward.
fn window_depth(lc: &LightCollectorConfig, wall: f64) -> f64 {
    wall - lc.shield_thickness + lc.acceptance_thickness / 2.0 + lc.window_gap
}

fn membrane_modules(config: &DetectorConfig) -> Result<Vec<Placement>> {
    let c = &config.cryostat;
    let lc = &config.light_collectors;
    let m = &config.membrane;
    let wall = c.vessel_size.x / 2.0 - lc.wall_distance;
    let grid = |group, shape, x, rotation| GridSpec {
        group,
        parent: Region::Cryostat,
        shape,
        rows: m.rows,
        cols: m.cols,
        row_pitch: -lc.row_pitch,
        col_pitch: m.col_pitch,
        origin: Vector::new(x, c.active_size.y / 2.0 - lc.top_offset, -c.active_size.z / 2.0 + m.first_z),
        col_axis: Axis::Z,
        row_axis: Axis::Y,
        rotation,
    };
    let shields = build_grid_placements(&grid(
        GroupKey::MembraneShield,
        shield_shape(lc, Axis::X),
        wall - lc.shield_thickness / 2.0,
        Some(Rotation::about(Axis::Y, PI)),
    ))?;
    let windows = build_grid_placements(&grid(
        GroupKey::MembraneWindow,
        window_shape(lc, Axis::X),
        window_depth(lc, wall),
        None,
    ))?;

    let mut placements = with_mirror(shields, Axis::X, Axis::Y)?;
    placements.extend(with_mirror(windows, Axis::X, Axis::Y)?);
    Ok(placements)
}

fn cathode_modules(config: &DetectorConfig) -> Result<Vec<Placement>> {
    let c = &config.cryostat;
    let lc = &config.light_collectors;
    let cm = &config.cathode_modules;
    let floor = -c.active_size.y / 2.0;
    let shields = StaggeredSpec {
        group:     GroupKey::CathodeShield,
        parent:    Region::Cryostat,
        shape:     shield_shape(lc, Axis::Y),
        cols:      cm.cols,
        per_col:   cm.per_col,
        x_pattern: cm.x_positions(),
        y:         floor + lc.shield_thickness / 2.0,
        z0:        -c.active_size.z / 2.0,
        z_pitch:   cm.z_pitch,
    };
    let windows = StaggeredSpec {
        group: GroupKey::CathodeWindow,
        shape: window_shape(lc, Axis::Y),
        y: floor + lc.shield_thickness - lc.acceptance_thickness / 2.0 - lc.window_gap,
        ..shields.clone()
    };

    let mut placements = build_staggered_placements(&shields)?;
    placements.extend(build_staggered_placements(&windows)?);
    Ok(placements)
}

fn short_wall_modules(config: &DetectorConfig) -> Result<Vec<Placement>> {
    let c = &config.cryostat;
    let lc = &config.light_collectors;
    let sw = &config.short_wall;
    let wall = c.vessel_size.z / 2.0 - lc.wall_distance;
    let grid = |group, shape, z| {
        GridSpec::planar(
            group,
            Region::Cryostat,
            shape,
            sw.rows,
            sw.cols,
            -lc.row_pitch,
            sw.col_pitch,
            Vector::new(
                -c.active_size.x / 2.0 + sw.first_x,
                c.active_size.y / 2.0 - lc.top_offset,
                z,
            ),
        )
    };
    let shields = build_grid_placements(&GridSpec {
        rotation: Some(Rotation::about(Axis::Y, PI)),
        ..grid(
            GroupKey::ShortWallShield,
            shield_shape(lc, Axis::Z),
            wall - lc.shield_thickness / 2.0 + lc.window_gap,
        )
    })?;
    let windows = build_grid_placements(&grid(
        GroupKey::ShortWallWindow,
        window_shape(lc, Axis::Z),
        window_depth(lc, wall),
    ))?;

    let mut placements = with_mirror(shields, Axis::Z, Axis::Y)?;
    placements.extend(with_mirror(windows, Axis::Z, Axis::Y)?);
    Ok(placements)
}
