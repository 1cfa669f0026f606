//! Procedural mesh helpers for building variants

use bevy::asset::RenderAssetUsages;
use bevy::mesh::{Indices, VertexAttributeValues};
use bevy::prelude::*;
use bevy::render::render_resource::PrimitiveTopology;

/// Accumulates flat-shaded faces into a triangle list
#[derive(Default)]
pub struct MeshWriter {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    indices: Vec<u32>,
}

impl MeshWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a planar quad given in loop order. Winding is fixed up so the
    /// front face points along `normal`.
    pub fn quad(&mut self, corners: [Vec3; 4], normal: Vec3) {
        let base = self.positions.len() as u32;
        let uvs = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];
        for (corner, uv) in corners.iter().zip(uvs) {
            self.positions.push(corner.to_array());
            self.normals.push(normal.to_array());
            self.uvs.push(uv);
        }
        let face = (corners[1] - corners[0]).cross(corners[2] - corners[0]);
        if face.dot(normal) >= 0.0 {
            self.indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
        } else {
            self.indices.extend([base, base + 2, base + 1, base, base + 3, base + 2]);
        }
    }

    pub fn triangle(&mut self, corners: [Vec3; 3], normal: Vec3) {
        let base = self.positions.len() as u32;
        let uvs = [[0.0, 1.0], [1.0, 1.0], [0.5, 0.0]];
        for (corner, uv) in corners.iter().zip(uvs) {
            self.positions.push(corner.to_array());
            self.normals.push(normal.to_array());
            self.uvs.push(uv);
        }
        let face = (corners[1] - corners[0]).cross(corners[2] - corners[0]);
        if face.dot(normal) >= 0.0 {
            self.indices.extend([base, base + 1, base + 2]);
        } else {
            self.indices.extend([base, base + 2, base + 1]);
        }
    }

    pub fn build(self) -> Mesh {
        Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
            .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, self.positions)
            .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, self.normals)
            .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, self.uvs)
            .with_inserted_indices(Indices::U32(self.indices))
    }
}

/// Angular span and radii of a C-shaped footprint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnularSector {
    pub inner_radius: f32,
    pub outer_radius: f32,
    /// Gap centered on local +Z, in degrees
    pub opening_deg: f32,
    /// Z scale applied to the circle, for elliptical footprints
    pub depth_scale: f32,
    pub segments: u32,
}

impl AnnularSector {
    fn point(&self, angle: f32, radius: f32, y: f32) -> Vec3 {
        Vec3::new(angle.sin() * radius, y, angle.cos() * radius * self.depth_scale)
    }

    fn radial(&self, angle: f32) -> Vec3 {
        Vec3::new(angle.sin(), 0.0, angle.cos() * self.depth_scale).normalize_or(Vec3::Z)
    }

    /// Closed solid between heights `y0` and `y1`
    pub fn extrude(&self, y0: f32, y1: f32) -> Mesh {
        let segments = self.segments.max(2);
        let half_gap = (self.opening_deg * 0.5).to_radians();
        let sweep = std::f32::consts::TAU - 2.0 * half_gap;
        let angle_at = |i: u32| half_gap + sweep * i as f32 / segments as f32;
        let (r, rr) = (self.inner_radius, self.outer_radius);

        let mut writer = MeshWriter::new();
        for i in 0..segments {
            let (a0, a1) = (angle_at(i), angle_at(i + 1));
            let mid = self.radial((a0 + a1) * 0.5);

            writer.quad(
                [self.point(a0, rr, y0), self.point(a1, rr, y0), self.point(a1, rr, y1), self.point(a0, rr, y1)],
                mid,
            );
            writer.quad(
                [self.point(a0, r, y0), self.point(a1, r, y0), self.point(a1, r, y1), self.point(a0, r, y1)],
                -mid,
            );
            writer.quad(
                [self.point(a0, rr, y1), self.point(a1, rr, y1), self.point(a1, r, y1), self.point(a0, r, y1)],
                Vec3::Y,
            );
            writer.quad(
                [self.point(a0, rr, y0), self.point(a1, rr, y0), self.point(a1, r, y0), self.point(a0, r, y0)],
                Vec3::NEG_Y,
            );
        }

        // End caps facing into the gap
        for (angle, sign) in [(angle_at(0), -1.0), (angle_at(segments), 1.0)] {
            let tangent = Vec3::new(angle.cos(), 0.0, -angle.sin() * self.depth_scale).normalize_or(Vec3::X);
            writer.quad(
                [self.point(angle, r, y0), self.point(angle, rr, y0), self.point(angle, rr, y1), self.point(angle, r, y1)],
                tangent * sign,
            );
        }

        writer.build()
    }
}

/// Pitched roof prism with its ridge along local X, base at y = 0
pub fn gable_prism(length: f32, span: f32, rise: f32) -> Mesh {
    let (hx, hz) = (length * 0.5, span * 0.5);
    let ridge_l = Vec3::new(-hx, rise, 0.0);
    let ridge_r = Vec3::new(hx, rise, 0.0);
    let front_l = Vec3::new(-hx, 0.0, hz);
    let front_r = Vec3::new(hx, 0.0, hz);
    let back_l = Vec3::new(-hx, 0.0, -hz);
    let back_r = Vec3::new(hx, 0.0, -hz);

    let mut writer = MeshWriter::new();
    writer.quad([front_l, front_r, ridge_r, ridge_l], Vec3::new(0.0, hz, rise).normalize_or(Vec3::Y));
    writer.quad([back_r, back_l, ridge_l, ridge_r], Vec3::new(0.0, hz, -rise).normalize_or(Vec3::Y));
    writer.triangle([back_l, front_l, ridge_l], Vec3::NEG_X);
    writer.triangle([front_r, back_r, ridge_r], Vec3::X);
    writer.quad([back_l, back_r, front_r, front_l], Vec3::NEG_Y);
    writer.build()
}

/// Axis-aligned bounds of a mesh's positions after `transform`
pub fn transformed_bounds(mesh: &Mesh, transform: &Transform) -> Option<(Vec3, Vec3)> {
    let Some(VertexAttributeValues::Float32x3(positions)) = mesh.attribute(Mesh::ATTRIBUTE_POSITION) else {
        return None;
    };
    let mut min = Vec3::splat(f32::MAX);
    let mut max = Vec3::splat(f32::MIN);
    for position in positions {
        let point = transform.transform_point(Vec3::from_array(*position));
        min = min.min(point);
        max = max.max(point);
    }
    (!positions.is_empty()).then_some((min, max))
}
