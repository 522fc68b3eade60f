//! Keyboard-to-pod input mapping.
//!
//! Held keys are sampled every frame. Press-once keys (power coupling, engine
//! start, reset) latch into [`PodInput`] until the step system consumes them,
//! so a fixed-rate step never misses a press made between two ticks.

use bevy::prelude::*;
use podracer_core::prelude::InputFrame;

/// Input for the next pod step.
#[derive(Resource, Clone, Debug, Default, PartialEq, Eq)]
pub struct PodInput {
    pub frame: InputFrame,
    /// Reset the pod instead of stepping it.
    pub reset: bool,
}

impl PodInput {
    /// Drop the press-once flags after a step used them.
    pub const fn consume_presses(&mut self) {
        self.frame.power_coupling = false;
        self.frame.engine_start = false;
        self.reset = false;
    }
}

/// Resource mapping keyboard keys to pod controls.
#[derive(Resource, Clone, Debug)]
pub struct KeyboardBindings {
    pub throttle: KeyCode,
    pub brake: KeyCode,
    pub turn_left: KeyCode,
    pub turn_right: KeyCode,
    pub boost: KeyCode,
    pub power_coupling: KeyCode,
    pub engine_start: KeyCode,
    pub reset: KeyCode,
}

impl Default for KeyboardBindings {
    /// Arrow keys drive, space boosts, C couples, E starts, R resets.
    fn default() -> Self {
        Self {
            throttle: KeyCode::ArrowUp,
            brake: KeyCode::ArrowDown,
            turn_left: KeyCode::ArrowLeft,
            turn_right: KeyCode::ArrowRight,
            boost: KeyCode::Space,
            power_coupling: KeyCode::KeyC,
            engine_start: KeyCode::KeyE,
            reset: KeyCode::KeyR,
        }
    }
}

/// System that reads the keyboard into [`PodInput`].
#[allow(clippy::needless_pass_by_value)]
pub fn keyboard_input_system(
    keys: Res<ButtonInput<KeyCode>>,
    bindings: Res<KeyboardBindings>,
    mut input: ResMut<PodInput>,
) {
    let frame = &mut input.frame;
    frame.throttle = keys.pressed(bindings.throttle);
    frame.brake = keys.pressed(bindings.brake);
    frame.turn_left = keys.pressed(bindings.turn_left);
    frame.turn_right = keys.pressed(bindings.turn_right);
    frame.boost = keys.pressed(bindings.boost);
    frame.power_coupling |= keys.just_pressed(bindings.power_coupling);
    frame.engine_start |= keys.just_pressed(bindings.engine_start);
    input.reset |= keys.just_pressed(bindings.reset);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        let mut app = App::new();
        app.init_resource::<ButtonInput<KeyCode>>()
            .init_resource::<KeyboardBindings>()
            .init_resource::<PodInput>()
            .add_systems(Update, keyboard_input_system);
        app
    }

    #[test]
    fn held_keys_follow_keyboard() {
        let mut app = app();
        app.world_mut()
            .resource_mut::<ButtonInput<KeyCode>>()
            .press(KeyCode::ArrowUp);
        app.update();
        assert!(app.world().resource::<PodInput>().frame.throttle);

        app.world_mut()
            .resource_mut::<ButtonInput<KeyCode>>()
            .release(KeyCode::ArrowUp);
        app.update();
        assert!(!app.world().resource::<PodInput>().frame.throttle);
    }

    #[test]
    fn presses_latch_until_consumed() {
        let mut app = app();
        app.world_mut()
            .resource_mut::<ButtonInput<KeyCode>>()
            .press(KeyCode::KeyC);
        app.update();
        // `just_pressed` is not cleared without the input plugin, so clear it
        // by hand to model the next frame.
        app.world_mut()
            .resource_mut::<ButtonInput<KeyCode>>()
            .clear();
        app.update();
        assert!(app.world().resource::<PodInput>().frame.power_coupling);

        app.world_mut().resource_mut::<PodInput>().consume_presses();
        assert_eq!(*app.world().resource::<PodInput>(), PodInput::default());
    }
}
