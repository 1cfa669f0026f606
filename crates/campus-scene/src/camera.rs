//! Camera transition state machine and orbit navigation
//!
//! The controller is plain data driven by `update(dt)`; the Bevy systems in
//! this module only feed it input and copy its pose onto the main camera.

use bevy::input::mouse::{MouseMotion, MouseWheel};
use bevy::prelude::*;

use crate::context::SceneContext;
use crate::SceneSet;

/// Tunables for the camera controller
#[derive(Debug, Clone, Copy, PartialEq, Resource)]
pub struct CameraTuning {
    /// Eye offset from a selected building's position
    pub offset: Vec3,
    /// Overview pose used when nothing is selected
    pub overview_eye: Vec3,
    pub overview_look_at: Vec3,
    /// Exponential approach rate (1/s)
    pub rate: f32,
    /// Distance under which a transition counts as arrived
    pub epsilon: f32,
    pub orbit_sensitivity: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for CameraTuning {
    fn default() -> Self {
        Self {
            offset: Vec3::new(18.0, 14.0, 18.0),
            overview_eye: Vec3::new(60.0, 55.0, 60.0),
            overview_look_at: Vec3::ZERO,
            rate: 3.0,
            epsilon: 0.01,
            orbit_sensitivity: 0.005,
            zoom_speed: 0.1,
            min_distance: 5.0,
            max_distance: 250.0,
        }
    }
}

/// Desired eye position and look-at point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTarget {
    pub eye: Vec3,
    pub look_at: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraState {
    #[default]
    Idle,
    Transitioning,
}

/// Two-state camera controller (Idle / Transitioning)
#[derive(Debug, Clone)]
pub struct CameraController {
    eye: Vec3,
    look_at: Vec3,
    target: CameraTarget,
    state: CameraState,
    tuning: CameraTuning,
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(CameraTuning::default())
    }
}

impl CameraController {
    /// Start idle at the overview pose
    pub fn new(tuning: CameraTuning) -> Self {
        let target = CameraTarget {
            eye: tuning.overview_eye,
            look_at: tuning.overview_look_at,
        };
        Self {
            eye: target.eye,
            look_at: target.look_at,
            target,
            state: CameraState::Idle,
            tuning,
        }
    }

    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    pub fn look_at(&self) -> Vec3 {
        self.look_at
    }

    pub fn target(&self) -> CameraTarget {
        self.target
    }

    pub fn state(&self) -> CameraState {
        self.state
    }

    pub fn tuning(&self) -> &CameraTuning {
        &self.tuning
    }

    /// Target for a building position, or the overview when `None`
    pub fn target_for(&self, building_position: Option<Vec3>) -> CameraTarget {
        match building_position {
            Some(position) => CameraTarget {
                eye: position + self.tuning.offset,
                look_at: position,
            },
            None => CameraTarget {
                eye: self.tuning.overview_eye,
                look_at: self.tuning.overview_look_at,
            },
        }
    }

    /// Aim at a new target. The live pose is untouched, so a target swapped
    /// mid-transition bends the path instead of jumping.
    pub fn retarget(&mut self, building_position: Option<Vec3>) {
        self.target = self.target_for(building_position);
        self.state = CameraState::Transitioning;
    }

    /// Blend factor for one tick of length `dt`
    pub fn blend(&self, dt: f32) -> f32 {
        1.0 - (-self.tuning.rate * dt.max(0.0)).exp()
    }

    /// Advance one frame. Returns the distance the eye moved.
    pub fn update(&mut self, dt: f32) -> f32 {
        if self.state == CameraState::Idle {
            return 0.0;
        }

        let alpha = self.blend(dt);
        let previous = self.eye;
        self.eye = self.eye.lerp(self.target.eye, alpha);
        self.look_at = self.look_at.lerp(self.target.look_at, alpha);

        if self.eye.distance(self.target.eye) < self.tuning.epsilon
            && self.look_at.distance(self.target.look_at) < self.tuning.epsilon
        {
            self.eye = self.target.eye;
            self.look_at = self.target.look_at;
            self.state = CameraState::Idle;
        }

        previous.distance(self.eye)
    }

    /// Orbit the eye around the look-at point. Ignored while transitioning.
    pub fn orbit(&mut self, delta_azimuth: f32, delta_elevation: f32) {
        if self.state != CameraState::Idle {
            return;
        }
        let offset = self.eye - self.look_at;
        let radius = offset.length().max(f32::EPSILON);
        let azimuth = offset.z.atan2(offset.x) + delta_azimuth;
        let elevation = ((offset.y / radius).clamp(-1.0, 1.0).asin() + delta_elevation).clamp(0.05, 1.45);

        self.eye = self.look_at
            + Vec3::new(
                radius * elevation.cos() * azimuth.cos(),
                radius * elevation.sin(),
                radius * elevation.cos() * azimuth.sin(),
            );
        self.target = CameraTarget {
            eye: self.eye,
            look_at: self.look_at,
        };
    }

    /// Scale the eye distance by `factor`. Ignored while transitioning.
    pub fn zoom(&mut self, factor: f32) {
        if self.state != CameraState::Idle {
            return;
        }
        let offset = self.eye - self.look_at;
        let distance = (offset.length() * factor).clamp(self.tuning.min_distance, self.tuning.max_distance);
        self.eye = self.look_at + offset.normalize_or(Vec3::Y) * distance;
        self.target.eye = self.eye;
    }
}

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

/// Plugin for camera control
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_camera)
            .add_systems(Update, orbit_camera_input.in_set(SceneSet::Input))
            .add_systems(Update, apply_camera_controller.in_set(SceneSet::Animate));
    }
}

fn spawn_camera(mut commands: Commands, context: Res<SceneContext>) {
    let camera = &context.camera;
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            near: 0.1,
            far: 2000.0,
            ..default()
        }),
        Transform::from_translation(camera.eye()).looking_at(camera.look_at(), Vec3::Y),
        MainCamera,
    ));
}

/// Drag to orbit, scroll to zoom - only while the camera is idle
fn orbit_camera_input(
    mut context: ResMut<SceneContext>,
    mut mouse_motion: MessageReader<MouseMotion>,
    mut mouse_wheel: MessageReader<MouseWheel>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    mut contexts: bevy_egui::EguiContexts,
) {
    let egui_wants_pointer = contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input())
        .unwrap_or(false);

    let mut total_motion = Vec2::ZERO;
    for motion in mouse_motion.read() {
        total_motion += motion.delta;
    }
    let mut total_scroll = 0.0;
    for scroll in mouse_wheel.read() {
        total_scroll += scroll.y;
    }

    if egui_wants_pointer {
        return;
    }

    let tuning = *context.camera.tuning();
    if mouse_button.pressed(MouseButton::Left) && total_motion != Vec2::ZERO {
        context.camera.orbit(
            total_motion.x * tuning.orbit_sensitivity,
            total_motion.y * tuning.orbit_sensitivity,
        );
    }
    if total_scroll != 0.0 {
        context.camera.zoom((1.0 - total_scroll * tuning.zoom_speed).max(0.1));
    }
}

/// Advance the controller and copy its pose onto the main camera
pub fn apply_camera_controller(
    time: Res<Time>,
    mut context: ResMut<SceneContext>,
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
) {
    context.camera.update(time.delta_secs());

    if let Ok(mut transform) = camera_query.single_mut() {
        let eye = context.camera.eye();
        let look_at = context.camera.look_at();
        if transform.translation != eye || transform.forward().dot((look_at - eye).normalize_or_zero()) < 0.9999 {
            *transform = Transform::from_translation(eye).looking_at(look_at, Vec3::Y);
        }
    }
}
