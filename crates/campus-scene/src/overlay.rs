//! Sensor overlay renderer: heat discs, flow conduits, status markers and
//! their screen-space labels

use std::collections::{HashMap, HashSet};
use std::f32::consts::FRAC_PI_2;

use bevy::prelude::*;
use campus_core::overlay::{heat_samples, sensor_anchors};
use campus_core::{FlowConduit, HeatBand, HeatSample, OverlayMode, SensorRecord, SensorStatus};
use tracing::debug;

use crate::camera::MainCamera;
use crate::context::{CampusCatalog, SceneContext};
use crate::SceneSet;

/// Heat and marker tunables
#[derive(Resource, Debug, Clone, Copy)]
pub struct OverlayTuning {
    pub heat_band: HeatBand,
    pub heat_radius: f32,
    pub pulse_speed: f32,
    /// Label height above the marker anchor
    pub label_offset: f32,
}

impl Default for OverlayTuning {
    fn default() -> Self {
        Self {
            heat_band: HeatBand::default(),
            heat_radius: 4.0,
            pulse_speed: 3.0,
            label_offset: 0.9,
        }
    }
}

/// Shared meshes for overlay entities
#[derive(Resource, Clone)]
pub struct OverlayAssets {
    disc: Handle<Mesh>,
    conduit: Handle<Mesh>,
    ring: Handle<Mesh>,
    sphere: Handle<Mesh>,
}

impl OverlayAssets {
    pub fn new(meshes: &mut Assets<Mesh>) -> Self {
        Self {
            disc: meshes.add(Circle::new(1.0)),
            conduit: meshes.add(Cylinder::new(1.0, 1.0)),
            ring: meshes.add(Torus::new(0.35, 0.5)),
            sphere: meshes.add(Sphere::new(0.25)),
        }
    }
}

struct MarkerEntry {
    root: Entity,
    label: Entity,
    material: Handle<StandardMaterial>,
    status: SensorStatus,
}

/// Entities currently drawn for each overlay layer
#[derive(Resource, Default)]
pub struct OverlayEntities {
    heat: Vec<Entity>,
    flow: Vec<Entity>,
    markers: HashMap<String, MarkerEntry>,
    drawn_mode: Option<OverlayMode>,
    heat_revision: u64,
    marker_revision: Option<u64>,
}

#[derive(Component)]
pub struct HeatDisc;

#[derive(Component)]
pub struct FlowConduitMesh;

#[derive(Component, Debug, Clone)]
pub struct SensorMarker {
    pub sensor_id: String,
}

#[derive(Component, Debug, Clone, Copy)]
pub struct MarkerRing {
    phase: f32,
}

/// Screen-space label following a world anchor
#[derive(Component, Debug, Clone)]
pub struct SensorLabel {
    pub sensor_id: String,
    pub anchor: Vec3,
}

pub struct OverlayPlugin;

impl Plugin for OverlayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<OverlayTuning>()
            .init_resource::<OverlayEntities>()
            .add_systems(Startup, setup_overlay_assets)
            .add_systems(
                Update,
                (rebuild_overlays, sync_sensor_markers, pulse_markers, position_sensor_labels)
                    .chain()
                    .in_set(SceneSet::Render),
            );
    }
}

fn setup_overlay_assets(mut commands: Commands, mut meshes: ResMut<Assets<Mesh>>) {
    commands.insert_resource(OverlayAssets::new(&mut meshes));
}

/// Cylinder transform spanning `from` to `to` (unit cylinder along Y)
pub fn flow_transform(from: Vec3, to: Vec3, radius: f32) -> Transform {
    let delta = to - from;
    let length = delta.length();
    Transform {
        translation: (from + to) * 0.5,
        rotation: Quat::from_rotation_arc(Vec3::Y, delta.normalize_or(Vec3::Y)),
        scale: Vec3::new(radius, length, radius),
    }
}

pub fn heat_disc_color(sample: &HeatSample) -> Color {
    let [r, g, b] = sample.color;
    Color::srgba(r, g, b, sample.intensity * 0.8)
}

pub fn status_color(status: SensorStatus) -> Color {
    let [r, g, b] = status.color();
    Color::srgb(r, g, b)
}

pub fn label_text(record: &SensorRecord) -> String {
    format!("{} {:.1} {}", record.sensor_type, record.value, record.unit)
        .trim_end()
        .to_string()
}

fn spawn_heat_disc(
    commands: &mut Commands,
    assets: &OverlayAssets,
    materials: &mut Assets<StandardMaterial>,
    sample: &HeatSample,
    radius: f32,
) -> Entity {
    let material = materials.add(StandardMaterial {
        base_color: heat_disc_color(sample),
        alpha_mode: AlphaMode::Blend,
        unlit: true,
        double_sided: true,
        cull_mode: None,
        ..default()
    });
    commands
        .spawn((
            Mesh3d(assets.disc.clone()),
            MeshMaterial3d(material),
            Transform::from_translation(Vec3::from_array(sample.position))
                .with_rotation(Quat::from_rotation_x(-FRAC_PI_2))
                .with_scale(Vec3::splat(radius)),
            HeatDisc,
        ))
        .id()
}

fn spawn_conduit(
    commands: &mut Commands,
    assets: &OverlayAssets,
    materials: &mut Assets<StandardMaterial>,
    conduit: &FlowConduit,
) -> Entity {
    let [r, g, b] = conduit.color;
    let material = materials.add(StandardMaterial {
        base_color: Color::srgba(r, g, b, 0.85),
        emissive: LinearRgba::rgb(r * 0.6, g * 0.6, b * 0.6),
        alpha_mode: AlphaMode::Blend,
        ..default()
    });
    commands
        .spawn((
            Mesh3d(assets.conduit.clone()),
            MeshMaterial3d(material),
            flow_transform(Vec3::from_array(conduit.from), Vec3::from_array(conduit.to), conduit.radius),
            FlowConduitMesh,
        ))
        .id()
}

/// Despawn and rebuild heat/flow entities when the mode changes, or when
/// the table changes while heat is shown
#[allow(clippy::too_many_arguments)]
pub fn rebuild_overlays(
    mut commands: Commands,
    context: Res<SceneContext>,
    catalog: Res<CampusCatalog>,
    tuning: Res<OverlayTuning>,
    assets: Option<Res<OverlayAssets>>,
    mut entities: ResMut<OverlayEntities>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let Some(assets) = assets else { return };
    let mode = context.overlay;
    let revision = context.sensors.revision();
    let mode_changed = entities.drawn_mode != Some(mode);
    let heat_stale = mode.heat_active() && entities.heat_revision != revision;
    if !mode_changed && !heat_stale {
        return;
    }

    let mut stale: Vec<Entity> = entities.heat.drain(..).collect();
    stale.extend(entities.flow.drain(..));
    for entity in stale {
        commands.entity(entity).despawn();
    }

    match mode {
        OverlayMode::Heat => {
            for sample in heat_samples(&context.sensors, &catalog, tuning.heat_band) {
                let disc = spawn_heat_disc(&mut commands, &assets, &mut materials, &sample, tuning.heat_radius);
                entities.heat.push(disc);
            }
        }
        OverlayMode::Flow => {
            for conduit in catalog.conduits() {
                let mesh = spawn_conduit(&mut commands, &assets, &mut materials, conduit);
                entities.flow.push(mesh);
            }
        }
        OverlayMode::Off => {}
    }

    if mode_changed {
        debug!(mode = ?mode, heat = entities.heat.len(), flow = entities.flow.len(), "Overlay rebuilt");
    }
    entities.drawn_mode = Some(mode);
    entities.heat_revision = revision;
}

/// Keep one marker (ring, sphere and label) per anchored sensor
pub fn sync_sensor_markers(
    mut commands: Commands,
    context: Res<SceneContext>,
    catalog: Res<CampusCatalog>,
    assets: Option<Res<OverlayAssets>>,
    mut entities: ResMut<OverlayEntities>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut roots: Query<&mut Transform, With<SensorMarker>>,
    mut labels: Query<(&mut SensorLabel, &mut Text)>,
) {
    let Some(assets) = assets else { return };
    let revision = context.sensors.revision();
    if entities.marker_revision == Some(revision) {
        return;
    }
    entities.marker_revision = Some(revision);

    let mut live = HashSet::new();
    for (record, anchor) in sensor_anchors(&context.sensors, &catalog) {
        let anchor = Vec3::from_array(anchor);
        live.insert(record.id.clone());

        if let Some(entry) = entities.markers.get_mut(&record.id) {
            if let Ok(mut transform) = roots.get_mut(entry.root) {
                transform.translation = anchor;
            }
            if entry.status != record.status {
                if let Some(material) = materials.get_mut(&entry.material) {
                    material.base_color = status_color(record.status);
                    material.emissive = status_color(record.status).to_linear() * 0.5;
                }
                entry.status = record.status;
            }
            if let Ok((mut label, mut text)) = labels.get_mut(entry.label) {
                label.anchor = anchor;
                text.0 = label_text(record);
            }
            continue;
        }

        let material = materials.add(StandardMaterial {
            base_color: status_color(record.status),
            emissive: status_color(record.status).to_linear() * 0.5,
            ..default()
        });
        let phase = entities.markers.len() as f32 * 0.7;
        let root = commands
            .spawn((
                Transform::from_translation(anchor),
                Visibility::default(),
                SensorMarker {
                    sensor_id: record.id.clone(),
                },
            ))
            .with_children(|parent| {
                parent.spawn((
                    Mesh3d(assets.ring.clone()),
                    MeshMaterial3d(material.clone()),
                    Transform::default(),
                    MarkerRing { phase },
                ));
                parent.spawn((
                    Mesh3d(assets.sphere.clone()),
                    MeshMaterial3d(material.clone()),
                    Transform::default(),
                ));
            })
            .id();
        let label = commands
            .spawn((
                Text::new(label_text(record)),
                TextFont {
                    font_size: 12.0,
                    ..default()
                },
                TextColor(Color::WHITE),
                Node {
                    position_type: PositionType::Absolute,
                    ..default()
                },
                Visibility::Hidden,
                SensorLabel {
                    sensor_id: record.id.clone(),
                    anchor,
                },
            ))
            .id();

        entities.markers.insert(
            record.id.clone(),
            MarkerEntry {
                root,
                label,
                material,
                status: record.status,
            },
        );
    }

    let stale: Vec<String> = entities
        .markers
        .keys()
        .filter(|id| !live.contains(*id))
        .cloned()
        .collect();
    for id in stale {
        if let Some(entry) = entities.markers.remove(&id) {
            commands.entity(entry.root).despawn();
            commands.entity(entry.label).despawn();
        }
    }
}

fn pulse_markers(time: Res<Time>, tuning: Res<OverlayTuning>, mut rings: Query<(&MarkerRing, &mut Transform)>) {
    let t = time.elapsed_secs() * tuning.pulse_speed;
    for (ring, mut transform) in rings.iter_mut() {
        let wave = 0.5 + 0.5 * (t + ring.phase).sin();
        transform.scale = Vec3::splat(1.0 + 0.4 * wave);
    }
}

/// Project each label's anchor to the screen; hide labels behind the camera
fn position_sensor_labels(
    tuning: Res<OverlayTuning>,
    camera_query: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    mut labels: Query<(&SensorLabel, &mut Node, &mut Visibility)>,
) {
    let Ok((camera, camera_transform)) = camera_query.single() else { return };
    for (label, mut node, mut visibility) in labels.iter_mut() {
        let world = label.anchor + Vec3::Y * tuning.label_offset;
        match camera.world_to_viewport(camera_transform, world) {
            Ok(screen) => {
                node.left = Val::Px(screen.x);
                node.top = Val::Px(screen.y);
                *visibility = Visibility::Inherited;
            }
            Err(_) => *visibility = Visibility::Hidden,
        }
    }
}
