//! Rectangle: a plain box with a flat roof, also the fallback for unknown shapes

use bevy::prelude::*;
use campus_core::BuildingDescriptor;

use super::{BuildingGeometry, BuildingPart, PaletteSlot};

const ROOF_THICKNESS: f32 = 0.3;
const DOOR_WIDTH: f32 = 1.4;
const DOOR_HEIGHT: f32 = 2.2;
const WINDOW_PITCH: f32 = 3.5;

pub(super) fn windows_per_floor(width: f32) -> usize {
    ((width / WINDOW_PITCH) as usize).max(1)
}

pub(super) fn rectangle(desc: &BuildingDescriptor) -> BuildingGeometry {
    let dims = &desc.dimensions;
    let (w, d, h) = (dims.width, dims.depth, dims.height);
    let front = d * 0.5 + 0.05;
    let mut geometry = BuildingGeometry::default();

    geometry.push(BuildingPart::new(
        "body",
        Cuboid::new(w, h, d),
        Transform::from_xyz(0.0, h * 0.5, 0.0),
        PaletteSlot::Wall,
    ));
    geometry.push(BuildingPart::new(
        "roof",
        Cuboid::new(w + 0.4, ROOF_THICKNESS, d + 0.4),
        Transform::from_xyz(0.0, h + ROOF_THICKNESS * 0.5, 0.0),
        PaletteSlot::Roof,
    ));

    let door_height = DOOR_HEIGHT.min(dims.floor_height() * 0.9);
    geometry.push(BuildingPart::new(
        "door",
        Cuboid::new(DOOR_WIDTH, door_height, 0.15),
        Transform::from_xyz(0.0, door_height * 0.5, front),
        PaletteSlot::Accent,
    ));

    let floor_height = dims.floor_height();
    let count = windows_per_floor(w);
    let spacing = w / count as f32;
    let window_width = (spacing * 0.5).min(1.6);
    for floor in 0..dims.floors.max(1) {
        let y = floor_height * (floor as f32 + 0.55);
        for i in 0..count {
            let x = -w * 0.5 + spacing * (i as f32 + 0.5);
            if floor == 0 && x.abs() < (DOOR_WIDTH + window_width) * 0.5 {
                continue;
            }
            geometry.push(BuildingPart::new(
                "window",
                Cuboid::new(window_width, floor_height * 0.4, 0.1),
                Transform::from_xyz(x, y, front),
                PaletteSlot::Accent,
            ));
        }
    }

    geometry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildings::test_support::descriptor;
    use campus_core::ShapeTag;

    #[test]
    fn test_window_rows_per_floor() {
        let geometry = rectangle(&descriptor(ShapeTag::Rectangle, 14.0, 8.0, 7.0, 2));
        // 4 columns; the ground floor loses none since no column sits on the door
        assert_eq!(windows_per_floor(14.0), 4);
        assert_eq!(geometry.count("window"), 8);
        assert_eq!(geometry.count("door"), 1);
        assert_eq!(geometry.count("roof"), 1);
    }

    #[test]
    fn test_door_column_skipped_on_ground_floor() {
        let geometry = rectangle(&descriptor(ShapeTag::Rectangle, 10.5, 8.0, 3.0, 1));
        // 3 columns, the middle one overlaps the door
        assert_eq!(geometry.count("window"), 2);
    }
}
