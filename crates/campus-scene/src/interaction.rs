//! Pointer interaction with buildings: hover, click selection, and the
//! hover/selection feedback (scale pulse and emissive glow)

use bevy::prelude::*;
use bevy_picking::mesh_picking::ray_cast::{MeshRayCast, MeshRayCastSettings};
use tracing::debug;

use crate::buildings::{BuildingEntity, BuildingMaterials, BuildingMesh};
use crate::context::{CampusCatalog, SceneContext, SelectionChanged};
use crate::SceneSet;

/// Pixels a press may travel and still count as a click
const CLICK_SLOP: f32 = 6.0;
/// Scale a hovered or selected building eases toward
pub const PULSE_SCALE: f32 = 1.02;
/// Exponential approach rate of the scale pulse (1/s)
pub const PULSE_RATE: f32 = 12.0;

/// `s + (target - s)(1 - e^(-k dt))`
pub fn approach(current: f32, target: f32, rate: f32, dt: f32) -> f32 {
    current + (target - current) * (1.0 - (-rate * dt.max(0.0)).exp())
}

/// Smoothed uniform scale of a building root
#[derive(Component, Debug, Clone, Copy)]
pub struct HoverScale {
    pub current: f32,
}

impl Default for HoverScale {
    fn default() -> Self {
        Self { current: 1.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GlowState {
    #[default]
    None,
    Hovered,
    Selected,
}

impl GlowState {
    pub fn of(selected: bool, hovered: bool) -> Self {
        match (selected, hovered) {
            (true, _) => GlowState::Selected,
            (false, true) => GlowState::Hovered,
            (false, false) => GlowState::None,
        }
    }

    pub fn emissive(&self) -> LinearRgba {
        match self {
            GlowState::None => LinearRgba::BLACK,
            GlowState::Hovered => LinearRgba::rgb(0.12, 0.12, 0.14),
            GlowState::Selected => LinearRgba::rgb(0.35, 0.28, 0.08),
        }
    }
}

/// Last glow written to a building's materials
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct BuildingGlow(pub GlowState);

/// Hover change between two frames
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoverTransition {
    Leave(String),
    Enter(String),
}

/// Transitions from the previous hovered building to the current one.
/// Moving between parts of the same building yields nothing.
pub fn hover_transitions(previous: Option<&str>, current: Option<&str>) -> Vec<HoverTransition> {
    if previous == current {
        return Vec::new();
    }
    let mut transitions = Vec::new();
    if let Some(id) = previous {
        transitions.push(HoverTransition::Leave(id.to_string()));
    }
    if let Some(id) = current {
        transitions.push(HoverTransition::Enter(id.to_string()));
    }
    transitions
}

/// Tells clicks from drags for one mouse button or touch
#[derive(Debug, Clone, Copy, Default)]
pub struct TapTracker {
    start: Option<Vec2>,
    dragging: bool,
}

impl TapTracker {
    pub fn press(&mut self, position: Vec2) {
        self.start = Some(position);
        self.dragging = false;
    }

    pub fn moved(&mut self, position: Vec2) {
        if let Some(start) = self.start {
            if position.distance(start) > CLICK_SLOP {
                self.dragging = true;
            }
        }
    }

    /// Where the tap happened, if the press ended without dragging
    pub fn release(&mut self) -> Option<Vec2> {
        let tap = self.start.filter(|_| !self.dragging);
        self.start = None;
        self.dragging = false;
        tap
    }
}

#[derive(Resource, Default)]
pub struct PointerState {
    mouse: TapTracker,
    touch: TapTracker,
    /// Building under the pointer last frame
    hovered: Option<String>,
}

/// Building the pointer resolves to this frame
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct PointerTarget {
    pub hovered: Option<String>,
    /// Set by a completed tap and consumed when applied
    pub tapped: Option<String>,
}

/// Emitted once per completed click on a building
#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub struct BuildingClicked {
    pub building_id: String,
}

pub struct InteractionPlugin;

impl Plugin for InteractionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PointerState>()
            .init_resource::<PointerTarget>()
            .add_message::<BuildingClicked>()
            .add_systems(
                Update,
                (pick_pointer_target, apply_pointer_target, handle_deselection)
                    .chain()
                    .in_set(SceneSet::Input),
            )
            .add_systems(
                Update,
                (animate_hover_scale, apply_building_glow).in_set(SceneSet::Animate),
            );
    }
}

/// Building owning the first hit, with hits ordered nearest first.
/// Hits on anything that is not a building part are skipped.
pub fn nearest_building(hits: impl IntoIterator<Item = Entity>, parts: &Query<&BuildingMesh>) -> Option<String> {
    hits.into_iter()
        .find_map(|entity| parts.get(entity).ok())
        .map(|part| part.building_id.clone())
}

/// Nearest building under a screen position
fn building_at(
    screen_pos: Vec2,
    camera: &Camera,
    camera_transform: &GlobalTransform,
    ray_cast: &mut MeshRayCast,
    parts: &Query<&BuildingMesh>,
) -> Option<String> {
    let ray = camera.viewport_to_world(camera_transform, screen_pos).ok()?;
    let filter = |entity: Entity| parts.contains(entity);
    let settings = MeshRayCastSettings::default().with_filter(&filter);
    let hits = ray_cast.cast_ray(ray, &settings);
    nearest_building(hits.iter().map(|(entity, _)| *entity), parts)
}

/// Resolve hover and taps to buildings, one ray per frame
#[allow(clippy::too_many_arguments)]
fn pick_pointer_target(
    mut pointer: ResMut<PointerState>,
    mut target: ResMut<PointerTarget>,
    mut ray_cast: MeshRayCast,
    parts: Query<&BuildingMesh>,
    camera_query: Query<(&Camera, &GlobalTransform), With<crate::camera::MainCamera>>,
    windows: Query<&Window>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    touch_input: Res<Touches>,
    mut contexts: bevy_egui::EguiContexts,
) {
    let egui_wants_pointer = contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input())
        .unwrap_or(false);
    let Ok(window) = windows.single() else { return };
    let Ok((camera, camera_transform)) = camera_query.single() else { return };
    let cursor = window.cursor_position();

    target.hovered = match cursor {
        Some(pos) if !egui_wants_pointer => building_at(pos, camera, camera_transform, &mut ray_cast, &parts),
        _ => None,
    };

    let mut tap: Option<Vec2> = None;

    if let Some(pos) = cursor {
        if mouse_button.just_pressed(MouseButton::Left) && !egui_wants_pointer {
            pointer.mouse.press(pos);
        } else if mouse_button.pressed(MouseButton::Left) {
            pointer.mouse.moved(pos);
        }
    }
    if mouse_button.just_released(MouseButton::Left) {
        tap = pointer.mouse.release();
    }

    if let Some(touch) = touch_input.iter().next() {
        if touch_input.just_pressed(touch.id()) && !egui_wants_pointer {
            pointer.touch.press(touch.position());
        } else {
            pointer.touch.moved(touch.position());
        }
    }
    if touch_input.iter_just_released().next().is_some() {
        tap = tap.or(pointer.touch.release());
    }

    if let Some(pos) = tap {
        target.tapped = building_at(pos, camera, camera_transform, &mut ray_cast, &parts);
    }
}

/// Write hover changes into the selection store and act on a tap
fn apply_pointer_target(
    mut context: ResMut<SceneContext>,
    catalog: Res<CampusCatalog>,
    mut pointer: ResMut<PointerState>,
    mut target: ResMut<PointerTarget>,
    mut clicked: MessageWriter<BuildingClicked>,
    mut selection_changed: MessageWriter<SelectionChanged>,
) {
    // Parts of one building count as one hover target
    for transition in hover_transitions(pointer.hovered.as_deref(), target.hovered.as_deref()) {
        match transition {
            HoverTransition::Leave(id) => {
                if context.selection.is_hovered(&id) {
                    context.selection.hover(None);
                }
            }
            HoverTransition::Enter(id) => context.selection.hover(Some(&id)),
        }
    }
    pointer.hovered = target.hovered.clone();

    let Some(building_id) = target.tapped.take() else { return };

    debug!(building = %building_id, "Building clicked");
    context.select(&building_id, &catalog);
    clicked.write(BuildingClicked {
        building_id: building_id.clone(),
    });
    selection_changed.write(SelectionChanged {
        building_id: context.selection.selected().map(str::to_string),
    });
}

/// Escape clears the selection
fn handle_deselection(
    mut context: ResMut<SceneContext>,
    keyboard: Res<ButtonInput<KeyCode>>,
    mut selection_changed: MessageWriter<SelectionChanged>,
) {
    if keyboard.just_pressed(KeyCode::Escape) && context.selection.selected().is_some() {
        context.clear_selection();
        selection_changed.write(SelectionChanged { building_id: None });
    }
}

/// Ease each building's scale toward 1.02 while hovered or selected
pub fn animate_hover_scale(
    time: Res<Time>,
    context: Res<SceneContext>,
    mut buildings: Query<(&BuildingEntity, &mut HoverScale, &mut Transform)>,
) {
    let dt = time.delta_secs();
    for (building, mut scale, mut transform) in buildings.iter_mut() {
        let id = building.building_id.as_str();
        let target = if context.selection.is_selected(id) || context.selection.is_hovered(id) {
            PULSE_SCALE
        } else {
            1.0
        };
        scale.current = approach(scale.current, target, PULSE_RATE, dt);
        transform.scale = Vec3::splat(scale.current);
    }
}

/// Write emissive tint on glow changes only
fn apply_building_glow(
    context: Res<SceneContext>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut buildings: Query<(&BuildingEntity, &BuildingMaterials, &mut BuildingGlow)>,
) {
    for (building, handles, mut glow) in buildings.iter_mut() {
        let id = building.building_id.as_str();
        let state = GlowState::of(context.selection.is_selected(id), context.selection.is_hovered(id));
        if glow.0 == state {
            continue;
        }
        glow.0 = state;
        for handle in &handles.0 {
            if let Some(material) = materials.get_mut(handle) {
                material.emissive = state.emissive();
            }
        }
    }
}
