//! C-shaped buildings: horseshoe and ring share one parametric sector

use bevy::prelude::*;
use campus_core::BuildingDescriptor;

use super::mesh::AnnularSector;
use super::{BuildingGeometry, BuildingPart, PaletteSlot};

const ROOF_THICKNESS: f32 = 0.3;
const ROOF_OVERHANG: f32 = 0.4;
const SEGMENTS: u32 = 48;

pub(super) fn horseshoe(desc: &BuildingDescriptor) -> BuildingGeometry {
    c_shape(desc, 0.55, 100.0)
}

pub(super) fn ring(desc: &BuildingDescriptor) -> BuildingGeometry {
    c_shape(desc, 0.7, 30.0)
}

fn c_shape(desc: &BuildingDescriptor, inner_ratio: f32, opening_deg: f32) -> BuildingGeometry {
    let dims = &desc.dimensions;
    let outer = dims.width * 0.5;
    let sector = AnnularSector {
        inner_radius: outer * inner_ratio,
        outer_radius: outer,
        opening_deg,
        depth_scale: if dims.width > 0.0 { dims.depth / dims.width } else { 1.0 },
        segments: SEGMENTS,
    };

    let mut geometry = BuildingGeometry::default();
    if dims.floors >= 2 {
        let split = dims.floor_height();
        geometry.push(BuildingPart::new(
            "lower",
            sector.extrude(0.0, split),
            Transform::IDENTITY,
            PaletteSlot::Wall,
        ));
        geometry.push(BuildingPart::new(
            "upper",
            sector.extrude(split, dims.height),
            Transform::IDENTITY,
            PaletteSlot::Accent,
        ));
    } else {
        geometry.push(BuildingPart::new(
            "body",
            sector.extrude(0.0, dims.height),
            Transform::IDENTITY,
            PaletteSlot::Wall,
        ));
    }

    let roof = AnnularSector {
        inner_radius: (sector.inner_radius - ROOF_OVERHANG).max(0.0),
        outer_radius: sector.outer_radius + ROOF_OVERHANG,
        ..sector
    };
    geometry.push(BuildingPart::new(
        "roof",
        roof.extrude(dims.height, dims.height + ROOF_THICKNESS),
        Transform::IDENTITY,
        PaletteSlot::Roof,
    ));

    geometry
}
