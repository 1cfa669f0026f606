//! Zigzag: staggered segments along the width, each under its own pitched roof

use bevy::prelude::*;
use campus_core::BuildingDescriptor;

use super::mesh::gable_prism;
use super::{BuildingGeometry, BuildingPart, PaletteSlot};

const STAGGER: f32 = 0.15;
const YAW_DEG: f32 = 8.0;

pub(super) fn segment_count(floors: u32) -> usize {
    (floors as usize + 2).max(3)
}

pub(super) fn zigzag(desc: &BuildingDescriptor) -> BuildingGeometry {
    let dims = &desc.dimensions;
    let count = segment_count(dims.floors);
    let segment_width = dims.width / count as f32;
    let rise = dims.depth * 0.3;

    let mut geometry = BuildingGeometry::default();
    for i in 0..count {
        let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
        let x = -dims.width * 0.5 + segment_width * (i as f32 + 0.5);
        let z = sign * dims.depth * STAGGER;
        let yaw = Quat::from_rotation_y(sign * YAW_DEG.to_radians());

        geometry.push(BuildingPart::new(
            "segment",
            Cuboid::new(segment_width * 1.02, dims.height, dims.depth),
            Transform::from_xyz(x, dims.height * 0.5, z).with_rotation(yaw),
            PaletteSlot::Wall,
        ));
        geometry.push(BuildingPart::new(
            "segment_roof",
            gable_prism(segment_width * 1.06, dims.depth * 1.08, rise),
            Transform::from_xyz(x, dims.height, z).with_rotation(yaw),
            PaletteSlot::Roof,
        ));
    }

    geometry
}
