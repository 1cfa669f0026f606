//! Scene setup - lights and ground

use bevy::prelude::*;

/// Marker component for the sun light
#[derive(Component)]
pub struct MainDirectionalLight;

/// Marker component for the ground plane
#[derive(Component)]
pub struct Ground;

/// Ground extent in meters
const GROUND_SIZE: f32 = 400.0;

pub struct SceneSetupPlugin;

impl Plugin for SceneSetupPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_scene);
    }
}

fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.insert_resource(AmbientLight {
        color: Color::srgb(0.95, 0.97, 1.0),
        brightness: 300.0,
        ..default()
    });

    commands.spawn((
        DirectionalLight {
            illuminance: 8000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(40.0, 80.0, 25.0).looking_at(Vec3::ZERO, Vec3::Y),
        MainDirectionalLight,
    ));

    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(GROUND_SIZE, GROUND_SIZE))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.42, 0.55, 0.36),
            perceptual_roughness: 1.0,
            ..default()
        })),
        Transform::IDENTITY,
        Ground,
    ));
}
