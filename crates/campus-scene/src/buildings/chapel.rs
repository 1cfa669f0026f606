//! Chapel: nave under a gable roof with a front tower and spire

use std::f32::consts::FRAC_PI_2;
use std::f32::consts::FRAC_PI_4;

use bevy::prelude::*;
use campus_core::BuildingDescriptor;

use super::mesh::gable_prism;
use super::{BuildingGeometry, BuildingPart, PaletteSlot};

pub(super) fn window_count(depth: f32) -> usize {
    ((depth / 4.0) as usize).max(2)
}

pub(super) fn chapel(desc: &BuildingDescriptor) -> BuildingGeometry {
    let dims = &desc.dimensions;
    let (w, d, h) = (dims.width, dims.depth, dims.height);
    let mut geometry = BuildingGeometry::default();

    geometry.push(BuildingPart::new(
        "body",
        Cuboid::new(w, h, d),
        Transform::from_xyz(0.0, h * 0.5, 0.0),
        PaletteSlot::Wall,
    ));

    // Ridge runs front to back
    geometry.push(BuildingPart::new(
        "roof",
        gable_prism(d * 1.04, w * 1.1, w * 0.45),
        Transform::from_xyz(0.0, h, 0.0).with_rotation(Quat::from_rotation_y(FRAC_PI_2)),
        PaletteSlot::Roof,
    ));

    let side = w * 0.35;
    let tower_height = h * 1.6;
    let tower_z = d * 0.5;
    geometry.push(BuildingPart::new(
        "tower",
        Cuboid::new(side, tower_height, side),
        Transform::from_xyz(0.0, tower_height * 0.5, tower_z),
        PaletteSlot::Wall,
    ));

    let spire_height = side * 1.8;
    geometry.push(BuildingPart::new(
        "spire",
        Cone::new(side * 0.75, spire_height).mesh().resolution(4),
        Transform::from_xyz(0.0, tower_height + spire_height * 0.5, tower_z)
            .with_rotation(Quat::from_rotation_y(FRAC_PI_4)),
        PaletteSlot::Roof,
    ));

    let door_height = (h * 0.45).min(2.6);
    geometry.push(BuildingPart::new(
        "door",
        Cuboid::new(side * 0.45, door_height, 0.15),
        Transform::from_xyz(0.0, door_height * 0.5, tower_z + side * 0.5 + 0.05),
        PaletteSlot::Accent,
    ));

    let count = window_count(d);
    let window_height = h * 0.4;
    // Windows keep clear of the tower but never lose more than half the nave
    let usable = (d - side).max(d * 0.5);
    for i in 0..count {
        let z = -d * 0.5 + usable * (i as f32 + 0.5) / count as f32;
        for x in [-(w * 0.5 + 0.04), w * 0.5 + 0.04] {
            geometry.push(BuildingPart::new(
                "window",
                Cuboid::new(0.12, window_height, (usable / count as f32 * 0.35).min(1.4)),
                Transform::from_xyz(x, h * 0.55, z),
                PaletteSlot::Accent,
            ));
        }
    }

    geometry
}
