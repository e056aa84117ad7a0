//! First-person navigation.
//!
//! [`NavigationController`] turns key state into a damped velocity with gravity,
//! a fixed ground clamp and a jump gate, and moves a [`CameraRig`] with it.
//! Everything is gated by pointer capture: while [`CaptureState::Disengaged`],
//! keys are still recorded but [`NavigationController::update`] does nothing and
//! pointer motion does not turn the view.

use cgmath::{InnerSpace, Vector3, Zero};
use winit::keyboard::KeyCode;

use crate::{camera::CameraRig, config::NavigationConfig, error::ViewerError};

/// Logical navigation inputs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NavAction {
    Forward,
    Backward,
    Left,
    Right,
    Run,
    Jump,
}

/// Maps physical keys to [`NavAction`]s. Several keys may share an action.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyBindings {
    bindings: Vec<(KeyCode, NavAction)>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            bindings: vec![
                (KeyCode::KeyW, NavAction::Forward),
                (KeyCode::ArrowUp, NavAction::Forward),
                (KeyCode::KeyS, NavAction::Backward),
                (KeyCode::ArrowDown, NavAction::Backward),
                (KeyCode::KeyA, NavAction::Left),
                (KeyCode::ArrowLeft, NavAction::Left),
                (KeyCode::KeyD, NavAction::Right),
                (KeyCode::ArrowRight, NavAction::Right),
                (KeyCode::ShiftLeft, NavAction::Run),
                (KeyCode::ShiftRight, NavAction::Run),
                (KeyCode::Space, NavAction::Jump),
            ],
        }
    }
}

impl KeyBindings {
    pub fn action(&self, key: KeyCode) -> Option<NavAction> {
        self.bindings
            .iter()
            .find(|(bound, _)| *bound == key)
            .map(|(_, action)| *action)
    }

    /// Bind `key` to `action`, replacing a previous binding of that key.
    pub fn bind(&mut self, key: KeyCode, action: NavAction) {
        self.bindings.retain(|(bound, _)| *bound != key);
        self.bindings.push((key, action));
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CaptureState {
    #[default]
    Disengaged,
    Engaged,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NavigationState {
    pub move_forward: bool,
    pub move_backward: bool,
    pub move_left: bool,
    pub move_right: bool,
    pub is_running: bool,
    pub can_jump: bool,
    pub velocity: Vector3<f32>,
}

impl Default for NavigationState {
    fn default() -> Self {
        Self {
            move_forward: false,
            move_backward: false,
            move_left: false,
            move_right: false,
            is_running: false,
            can_jump: false,
            velocity: Vector3::zero(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NavigationController {
    config: NavigationConfig,
    bindings: KeyBindings,
    state: NavigationState,
    capture: CaptureState,
    dragging: bool,
}

impl NavigationController {
    pub fn new(config: NavigationConfig) -> Self {
        Self::with_bindings(config, KeyBindings::default())
    }

    pub fn with_bindings(config: NavigationConfig, bindings: KeyBindings) -> Self {
        Self {
            config,
            bindings,
            state: NavigationState::default(),
            capture: CaptureState::Disengaged,
            dragging: false,
        }
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn capture(&self) -> CaptureState {
        self.capture
    }

    pub fn is_engaged(&self) -> bool {
        self.capture == CaptureState::Engaged
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    /// Activation gesture. Only a focused view can capture the pointer.
    pub fn request_capture(&mut self, has_focus: bool) -> Result<(), ViewerError> {
        if !has_focus {
            return Err(ViewerError::CaptureDenied);
        }
        if self.capture == CaptureState::Disengaged {
            log::debug!("Pointer capture engaged");
        }
        self.capture = CaptureState::Engaged;
        Ok(())
    }

    /// The pointer was released by the platform (focus loss, Escape, grab lost).
    pub fn capture_released(&mut self) {
        if self.capture == CaptureState::Engaged {
            log::debug!("Pointer capture released");
        }
        self.capture = CaptureState::Disengaged;
    }

    /// Suspend movement input while the transform tool drags a node.
    pub fn set_dragging(&mut self, dragging: bool) {
        self.dragging = dragging;
    }

    /// Returns whether the key is bound to navigation.
    pub fn key_down(&mut self, key: KeyCode) -> bool {
        let Some(action) = self.bindings.action(key) else {
            return false;
        };
        match action {
            NavAction::Forward => self.state.move_forward = true,
            NavAction::Backward => self.state.move_backward = true,
            NavAction::Left => self.state.move_left = true,
            NavAction::Right => self.state.move_right = true,
            NavAction::Run => self.state.is_running = true,
            NavAction::Jump => {
                if self.state.can_jump {
                    self.state.velocity.y = self.config.jump_impulse;
                    self.state.can_jump = false;
                }
            }
        }
        true
    }

    /// Returns whether the key is bound to navigation.
    ///
    /// Releasing any key of an action clears it, even if a synonym is still held.
    pub fn key_up(&mut self, key: KeyCode) -> bool {
        let Some(action) = self.bindings.action(key) else {
            return false;
        };
        match action {
            NavAction::Forward => self.state.move_forward = false,
            NavAction::Backward => self.state.move_backward = false,
            NavAction::Left => self.state.move_left = false,
            NavAction::Right => self.state.move_right = false,
            NavAction::Run => self.state.is_running = false,
            NavAction::Jump => {}
        }
        true
    }

    /// Turn the view by a pointer delta in pixels. Ignored unless engaged.
    pub fn look(&self, rig: &mut dyn CameraRig, dx: f64, dy: f64) {
        if !self.is_engaged() {
            return;
        }
        let sensitivity = self.config.mouse_sensitivity;
        rig.rotate(dx as f32 * sensitivity, -dy as f32 * sensitivity);
    }

    /// Advance by `dt` seconds. Does nothing unless engaged.
    ///
    /// Long frames (a hidden window, a stalled tab) are cut to `max_step`.
    pub fn update(&mut self, rig: &mut dyn CameraRig, dt: f32) {
        if !self.is_engaged() {
            return;
        }
        let NavigationConfig {
            damping,
            gravity,
            acceleration,
            run_multiplier,
            ground_height,
            max_step,
            ..
        } = self.config;
        let dt = dt.min(max_step);
        let velocity = &mut self.state.velocity;

        velocity.x -= velocity.x * damping * dt;
        velocity.z -= velocity.z * damping * dt;
        velocity.y -= gravity * dt;

        let mut direction = Vector3::new(
            axis(self.state.move_right, self.state.move_left),
            0.0,
            axis(self.state.move_forward, self.state.move_backward),
        );
        if self.dragging {
            direction = Vector3::zero();
        }
        if direction != Vector3::zero() {
            direction = direction.normalize();
        }

        let acceleration = if self.state.is_running {
            acceleration * run_multiplier
        } else {
            acceleration
        };
        if direction.z != 0.0 {
            velocity.z -= direction.z * acceleration * dt;
        }
        if direction.x != 0.0 {
            velocity.x -= direction.x * acceleration * dt;
        }

        rig.move_right(-velocity.x * dt);
        rig.move_forward(-velocity.z * dt);

        let mut height = rig.height() + velocity.y * dt;
        if height < ground_height {
            height = ground_height;
        }
        let grounded = height <= ground_height && velocity.y <= 0.0;
        if grounded {
            velocity.y = 0.0;
        }
        self.state.can_jump = grounded;
        rig.set_height(height);
    }
}

fn axis(positive: bool, negative: bool) -> f32 {
    (positive as i32 - negative as i32) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synonyms_share_an_action() {
        let bindings = KeyBindings::default();
        assert_eq!(bindings.action(KeyCode::KeyW), Some(NavAction::Forward));
        assert_eq!(bindings.action(KeyCode::ArrowUp), Some(NavAction::Forward));
        assert_eq!(bindings.action(KeyCode::KeyQ), None);
    }

    #[test]
    fn rebinding_replaces_the_old_action() {
        let mut bindings = KeyBindings::default();
        bindings.bind(KeyCode::KeyW, NavAction::Jump);
        assert_eq!(bindings.action(KeyCode::KeyW), Some(NavAction::Jump));
    }

    #[test]
    fn capture_needs_focus() {
        let mut controller = NavigationController::new(NavigationConfig::default());
        assert_eq!(controller.request_capture(false), Err(ViewerError::CaptureDenied));
        assert_eq!(controller.capture(), CaptureState::Disengaged);
        assert_eq!(controller.request_capture(true), Ok(()));
        assert!(controller.is_engaged());
        controller.capture_released();
        assert_eq!(controller.capture(), CaptureState::Disengaged);
    }
}
