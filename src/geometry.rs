//! Placement records for repeated detector components.
//!
//! Everything here is a pure function of its inputs: a layout is computed once
//! and handed to the downstream geometry engine, which only needs the shape,
//! its position and orientation, the parent volume and a copy index that is
//! unique within its group.

use std::collections::HashSet;

use crate::error::{ensure_finite, ensure_positive, Error, Result};
use crate::vector::{UnitVector, Vector};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn unit(self) -> Vector<f64> {
        match self {
            Axis::X => Vector::new(1.0, 0.0, 0.0),
            Axis::Y => Vector::new(0.0, 1.0, 0.0),
            Axis::Z => Vector::new(0.0, 0.0, 1.0),
        }
    }

    pub fn is_perpendicular_to(self, other: Axis) -> bool {
        self != other
    }
}

/// Proper rotation stored as a row-major 3x3 matrix.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rotation {
    m: [[f64; 3]; 3],
}

impl Rotation {
    pub const fn identity() -> Self {
        Self {
            m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    pub fn about(axis: Axis, angle: f64) -> Self {
        Self::about_vector(UnitVector::axis(axis), angle)
    }

    /// Rodrigues' formula.
    pub fn about_vector(axis: UnitVector<f64>, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        let Vector { x, y, z } = *axis;
        Self {
            m: [
                [t * x * x + c, t * x * y - s * z, t * x * z + s * y],
                [t * x * y + s * z, t * y * y + c, t * y * z - s * x],
                [t * x * z - s * y, t * y * z + s * x, t * z * z + c],
            ],
        }
    }

    pub fn matrix(&self) -> [[f64; 3]; 3] {
        self.m
    }

    /// `self` followed by `after`.
    pub fn then(self, after: Rotation) -> Rotation {
        let (a, b) = (after.m, self.m);
        let mut m = [[0.0; 3]; 3];
        for (i, row) in m.iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
            }
        }
        Rotation { m }
    }

    pub fn apply(&self, v: Vector<f64>) -> Vector<f64> {
        let r = |row: [f64; 3]| row[0] * v.x + row[1] * v.y + row[2] * v.z;
        Vector::new(r(self.m[0]), r(self.m[1]), r(self.m[2]))
    }

    pub fn approx_eq(&self, other: &Rotation, tol: f64) -> bool {
        self.m
            .iter()
            .flatten()
            .zip(other.m.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= tol)
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Self::identity()
    }
}

/// Solids, parameterized by half-lengths in meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    Box {
        half: Vector<f64>,
    },
    EllipticalTube {
        dx: f64,
        dy: f64,
        dz: f64,
    },
    Subtraction {
        minuend:    Box<Shape>,
        subtrahend: Box<Shape>,
        offset:     Vector<f64>,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Display)]
pub enum ShapeKind {
    Box,
    EllipticalTube,
    Subtraction,
}

impl Shape {
    pub fn boxed(full: Vector<f64>) -> Self {
        Shape::Box { half: full * 0.5 }
    }

    pub fn subtract(self, subtrahend: Shape, offset: Vector<f64>) -> Self {
        Shape::Subtraction {
            minuend: Box::new(self),
            subtrahend: Box::new(subtrahend),
            offset,
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Box { .. } => ShapeKind::Box,
            Shape::EllipticalTube { .. } => ShapeKind::EllipticalTube,
            Shape::Subtraction { .. } => ShapeKind::Subtraction,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum Region {
    World,
    Cryostat,
}

/// Families of repeated components. Presentation names come from `Display`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
pub enum GroupKey {
    Cryostat,
    Shell,
    Cathode,
    Anode,
    FieldCageWide,
    FieldCageSlim,
    FieldCageShort,
    FieldCageShortSlim,
    FieldCageShortSideA,
    FieldCageShortSideB,
    MembraneShield,
    MembraneWindow,
    CathodeShield,
    CathodeWindow,
    ShortWallShield,
    ShortWallWindow,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[display(fmt = "{}#{}", group, copy_index)]
pub struct PlacementId {
    pub group:      GroupKey,
    pub copy_index: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub id:       PlacementId,
    pub shape:    Shape,
    pub position: Vector<f64>,
    pub rotation: Option<Rotation>,
    pub parent:   Region,
}

impl Placement {
    pub fn rotation_or_identity(&self) -> Rotation {
        self.rotation.unwrap_or_default()
    }
}

/// Components stepped at a fixed pitch along one axis.
#[derive(Debug, Clone)]
pub struct RailSpec {
    pub group:        GroupKey,
    pub parent:       Region,
    pub shape:        Shape,
    pub base:         Vector<f64>,
    pub axis:         Axis,
    pub rotation:     Option<Rotation>,
    pub pitch:        f64,
    pub start_offset: f64,
    /// Measured from `start_offset`.
    pub span_length:  f64,
}

pub fn build_rail_placements(rail: &RailSpec) -> Result<Vec<Placement>> {
    let pitch = ensure_positive("rail pitch", rail.pitch)?;
    let span = ensure_finite("rail span", rail.span_length)?;
    if span < 0.0 {
        return Err(Error::NonPositive {
            name:  "rail span",
            value: span,
        });
    }
    let start = ensure_finite("rail start offset", rail.start_offset)?;
    let ratio = span / pitch;
    // 0.06 * 49 must still reach 2.94
    let steps = (ratio + ratio * 1e-9).floor() as u32;
    let dir = rail.axis.unit();
    Ok((0..=steps)
        .map(|i| Placement {
            id:       PlacementId {
                group:      rail.group,
                copy_index: i,
            },
            shape:    rail.shape.clone(),
            position: dir.mul_add(start + f64::from(i) * pitch, rail.base),
            rotation: rail.rotation,
            parent:   rail.parent,
        })
        .collect())
}

/// Row-major grid of components.
#[derive(Debug, Clone)]
pub struct GridSpec {
    pub group:     GroupKey,
    pub parent:    Region,
    pub shape:     Shape,
    pub rows:      u32,
    pub cols:      u32,
    /// Nonzero, may be negative.
    pub row_pitch: f64,
    pub col_pitch: f64,
    pub origin:    Vector<f64>,
    pub col_axis:  Axis,
    pub row_axis:  Axis,
    pub rotation:  Option<Rotation>,
}

impl GridSpec {
    /// Columns along x and rows along y.
    pub fn planar(
        group: GroupKey,
        parent: Region,
        shape: Shape,
        rows: u32,
        cols: u32,
        row_pitch: f64,
        col_pitch: f64,
        origin: Vector<f64>,
    ) -> Self {
        Self {
            group,
            parent,
            shape,
            rows,
            cols,
            row_pitch,
            col_pitch,
            origin,
            col_axis: Axis::X,
            row_axis: Axis::Y,
            rotation: None,
        }
    }
}

pub fn build_grid_placements(grid: &GridSpec) -> Result<Vec<Placement>> {
    if grid.rows == 0 || grid.cols == 0 {
        return Err(Error::InvalidGrid("rows and cols must be nonzero"));
    }
    if grid.row_axis == grid.col_axis {
        return Err(Error::InvalidGrid("row and column axes must differ"));
    }
    let row_pitch = ensure_finite("grid row pitch", grid.row_pitch)?;
    let col_pitch = ensure_finite("grid column pitch", grid.col_pitch)?;
    if row_pitch == 0.0 || col_pitch == 0.0 {
        return Err(Error::InvalidGrid("pitches must be nonzero"));
    }
    let row_step = grid.row_axis.unit() * row_pitch;
    let col_step = grid.col_axis.unit() * col_pitch;
    let cells = grid
        .rows
        .checked_mul(grid.cols)
        .ok_or(Error::InvalidGrid("rows * cols overflows the copy index"))?;
    let mut placements = Vec::with_capacity(cells as usize);
    for row in 0..grid.rows {
        for col in 0..grid.cols {
            let position = grid.origin + col_step * f64::from(col) + row_step * f64::from(row);
            placements.push(Placement {
                id: PlacementId {
                    group:      grid.group,
                    copy_index: row * grid.cols + col,
                },
                shape: grid.shape.clone(),
                position,
                rotation: grid.rotation,
                parent: grid.parent,
            });
        }
    }
    Ok(placements)
}

#[derive(Debug, Copy, Clone)]
pub struct Mirror {
    pub axis:        Axis,
    /// Must be perpendicular to `axis`.
    pub flip_about:  Axis,
    pub copy_offset: i64,
}

pub fn mirror_across_axis(placements: &[Placement], mirror: &Mirror) -> Result<Vec<Placement>> {
    if !mirror.axis.is_perpendicular_to(mirror.flip_about) {
        return Err(Error::ParallelFlipAxis {
            axis:       mirror.axis,
            flip_about: mirror.flip_about,
        });
    }
    let flip = Rotation::about(mirror.flip_about, core::f64::consts::PI);
    placements
        .iter()
        .map(|p| {
            let copy_index = i64::from(p.id.copy_index) + mirror.copy_offset;
            if copy_index < 0 || copy_index > i64::from(u32::MAX) {
                return Err(Error::CopyIndexOverflow {
                    id:     p.id,
                    offset: mirror.copy_offset,
                });
            }
            let position = p.position.with_component(mirror.axis, -p.position.component(mirror.axis));
            Ok(Placement {
                id: PlacementId {
                    group:      p.id.group,
                    copy_index: copy_index as u32,
                },
                shape: p.shape.clone(),
                position,
                rotation: Some(p.rotation_or_identity().then(flip)),
                parent: p.parent,
            })
        })
        .collect()
}

/// Columns of modules whose lateral position cycles through a fixed pattern and
/// whose second half sits one half-slot further along z.
#[derive(Debug, Clone)]
pub struct StaggeredSpec {
    pub group:     GroupKey,
    pub parent:    Region,
    pub shape:     Shape,
    pub cols:      u32,
    /// Even.
    pub per_col:   u32,
    pub x_pattern: Vec<f64>,
    pub y:         f64,
    pub z0:        f64,
    pub z_pitch:   f64,
}

pub fn build_staggered_placements(spec: &StaggeredSpec) -> Result<Vec<Placement>> {
    if spec.cols == 0 || spec.per_col == 0 || spec.per_col % 2 != 0 {
        return Err(Error::InvalidGrid("staggered layout needs columns and an even module count"));
    }
    if spec.x_pattern.is_empty() {
        return Err(Error::InvalidGrid("empty lateral pattern"));
    }
    let z_pitch = ensure_positive("staggered z pitch", spec.z_pitch)?;
    let half = spec.per_col / 2;
    let cells = spec
        .cols
        .checked_mul(spec.per_col)
        .ok_or(Error::InvalidGrid("cols * per_col overflows the copy index"))?;
    let mut placements = Vec::with_capacity(cells as usize);
    for col in 0..spec.cols {
        for j in 0..spec.per_col {
            let copy_index = col * spec.per_col + j;
            let x = spec.x_pattern[copy_index as usize % spec.x_pattern.len()];
            let slot = 0.5 + f64::from(2 * col) + if j < half { 0.0 } else { 1.0 };
            placements.push(Placement {
                id: PlacementId {
                    group: spec.group,
                    copy_index,
                },
                shape: spec.shape.clone(),
                position: Vector::new(x, spec.y, spec.z0 + slot * z_pitch),
                rotation: None,
                parent: spec.parent,
            });
        }
    }
    Ok(placements)
}

/// Copy indices must be unique per group within a parent volume.
pub fn check_unique_ids<'a, I>(placements: I) -> Result<()>
where
    I: IntoIterator<Item = &'a Placement>,
{
    let mut seen = HashSet::new();
    for p in placements {
        if !seen.insert((p.id, p.parent)) {
            return Err(Error::DuplicateCopyIndex(p.id));
        }
    }
    Ok(())
}
