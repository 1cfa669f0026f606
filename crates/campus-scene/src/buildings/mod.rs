//! Building variant renderer
//!
//! `build_variant` turns a descriptor into plain geometry (meshes, local
//! transforms and palette slots). Spawning, materials and picking bounds are
//! layered on top by `BuildingsPlugin`.

mod chapel;
mod horseshoe;
pub mod mesh;
mod rectangle;
mod zigzag;

use bevy::prelude::*;
use campus_core::{BuildingDescriptor, Palette, ShapeTag};
use tracing::{info, warn};

use crate::context::CampusCatalog;
use crate::interaction::{BuildingGlow, HoverScale};

/// Which palette color a part is drawn with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaletteSlot {
    Wall,
    Roof,
    Accent,
}

impl PaletteSlot {
    pub const ALL: [PaletteSlot; 3] = [PaletteSlot::Wall, PaletteSlot::Roof, PaletteSlot::Accent];

    pub fn color(&self, palette: &Palette) -> Color {
        let [r, g, b] = match self {
            PaletteSlot::Wall => palette.wall,
            PaletteSlot::Roof => palette.roof,
            PaletteSlot::Accent => palette.accent_or_wall(),
        };
        Color::srgb(r, g, b)
    }
}

/// One mesh of a building, in building-local space
pub struct BuildingPart {
    pub name: &'static str,
    pub mesh: Mesh,
    pub transform: Transform,
    pub slot: PaletteSlot,
}

impl BuildingPart {
    pub fn new(name: &'static str, mesh: impl Into<Mesh>, transform: Transform, slot: PaletteSlot) -> Self {
        Self {
            name,
            mesh: mesh.into(),
            transform,
            slot,
        }
    }
}

#[derive(Default)]
pub struct BuildingGeometry {
    pub parts: Vec<BuildingPart>,
}

impl BuildingGeometry {
    pub fn push(&mut self, part: BuildingPart) {
        self.parts.push(part);
    }

    /// Local-space bounding box over every part
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        self.parts
            .iter()
            .filter_map(|part| mesh::transformed_bounds(&part.mesh, &part.transform))
            .reduce(|(min_a, max_a), (min_b, max_b)| (min_a.min(min_b), max_a.max(max_b)))
    }

    pub fn count(&self, name: &str) -> usize {
        self.parts.iter().filter(|part| part.name == name).count()
    }
}

/// Geometry for a descriptor's shape. Unknown shapes render as a rectangle.
pub fn build_variant(desc: &BuildingDescriptor) -> BuildingGeometry {
    match &desc.shape {
        ShapeTag::Horseshoe => horseshoe::horseshoe(desc),
        ShapeTag::Ring => horseshoe::ring(desc),
        ShapeTag::Zigzag => zigzag::zigzag(desc),
        ShapeTag::Chapel => chapel::chapel(desc),
        ShapeTag::Rectangle => rectangle::rectangle(desc),
        ShapeTag::Unrecognized(tag) => {
            warn!(building = %desc.id, shape = %tag, "Unrecognized building shape, drawing as rectangle");
            rectangle::rectangle(desc)
        }
    }
}

/// Root entity of a spawned building
#[derive(Component, Debug, Clone)]
pub struct BuildingEntity {
    pub building_id: String,
}

/// Mesh entity belonging to a building; ray hits on it resolve to the building
#[derive(Component, Debug, Clone)]
pub struct BuildingMesh {
    pub building_id: String,
}

/// Per-building material handles, one per palette slot
#[derive(Component, Debug, Clone)]
pub struct BuildingMaterials(pub Vec<Handle<StandardMaterial>>);

pub struct BuildingsPlugin;

impl Plugin for BuildingsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_buildings);
    }
}

fn spawn_buildings(
    mut commands: Commands,
    catalog: Res<CampusCatalog>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    for desc in catalog.buildings() {
        let geometry = build_variant(desc);

        let slot_materials: Vec<(PaletteSlot, Handle<StandardMaterial>)> = PaletteSlot::ALL
            .iter()
            .map(|slot| {
                let material = materials.add(StandardMaterial {
                    base_color: slot.color(&desc.palette),
                    perceptual_roughness: 0.85,
                    ..default()
                });
                (*slot, material)
            })
            .collect();

        let [x, y, z] = desc.position;
        let root_transform =
            Transform::from_xyz(x, y, z).with_rotation(Quat::from_rotation_y(desc.rotation_deg.to_radians()));

        let root = commands
            .spawn((
                BuildingEntity {
                    building_id: desc.id.clone(),
                },
                BuildingMaterials(slot_materials.iter().map(|(_, m)| m.clone()).collect()),
                HoverScale::default(),
                BuildingGlow::default(),
                root_transform,
                Visibility::default(),
                Name::new(desc.name.clone()),
            ))
            .id();

        let part_count = geometry.parts.len();
        for part in geometry.parts {
            let material = slot_materials
                .iter()
                .find(|(slot, _)| *slot == part.slot)
                .map(|(_, m)| m.clone())
                .unwrap_or_default();
            let child = commands
                .spawn((
                    Mesh3d(meshes.add(part.mesh)),
                    MeshMaterial3d(material),
                    part.transform,
                    BuildingMesh {
                        building_id: desc.id.clone(),
                    },
                    Name::new(part.name),
                ))
                .id();
            commands.entity(root).add_child(child);
        }

        info!(building = %desc.id, shape = %desc.shape, parts = part_count, "Spawned building");
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use campus_core::{BuildingDescriptor, Dimensions, Palette, ShapeTag};

    pub fn descriptor(shape: ShapeTag, width: f32, depth: f32, height: f32, floors: u32) -> BuildingDescriptor {
        BuildingDescriptor {
            id: format!("test-{}", shape),
            name: "Test".to_string(),
            name_secondary: None,
            shape,
            position: [0.0, 0.0, 0.0],
            rotation_deg: 0.0,
            dimensions: Dimensions {
                width,
                depth,
                height,
                floors,
            },
            palette: Palette {
                wall: [0.9, 0.9, 0.9],
                roof: [0.5, 0.2, 0.2],
                accent: None,
            },
            rooms: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::descriptor;
    use super::*;

    #[test]
    fn test_every_shape_produces_geometry() {
        for shape in [
            ShapeTag::Horseshoe,
            ShapeTag::Ring,
            ShapeTag::Zigzag,
            ShapeTag::Chapel,
            ShapeTag::Rectangle,
        ] {
            let geometry = build_variant(&descriptor(shape.clone(), 20.0, 14.0, 8.0, 2));
            assert!(!geometry.parts.is_empty(), "{} has no parts", shape);
            let (min, max) = geometry.bounds().unwrap();
            assert!(min.y >= -1e-4);
            assert!(max.y >= 8.0 - 1e-4, "{} shorter than its height", shape);
        }
    }

    #[test]
    fn test_unrecognized_shape_falls_back_to_rectangle() {
        let fallback = build_variant(&descriptor(ShapeTag::Unrecognized("pagoda".into()), 12.0, 8.0, 6.0, 2));
        let rectangle = build_variant(&descriptor(ShapeTag::Rectangle, 12.0, 8.0, 6.0, 2));
        let names = |g: &BuildingGeometry| g.parts.iter().map(|p| p.name).collect::<Vec<_>>();
        assert_eq!(names(&fallback), names(&rectangle));
    }

    #[test]
    fn test_accent_falls_back_to_wall() {
        let mut palette = descriptor(ShapeTag::Rectangle, 1.0, 1.0, 1.0, 1).palette;
        assert_eq!(PaletteSlot::Accent.color(&palette), PaletteSlot::Wall.color(&palette));
        palette.accent = Some([0.1, 0.2, 0.3]);
        assert_eq!(PaletteSlot::Accent.color(&palette), Color::srgb(0.1, 0.2, 0.3));
    }
}
