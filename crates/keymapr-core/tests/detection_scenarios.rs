// Keymapr Detection Scenarios
//
// These tests drive the trigger detector through complete user workflows
// with a simulated clock, without requiring actual hardware.
//
// Run with: cargo test --test detection_scenarios

use keymapr_core::{
    Action, ClickType, DetectionPreferences, DeviceOrigin, DeviceScope, Effect, Key, KeyAction,
    KeyEvent, KeyMap, KeyMapConfig, Trigger, TriggerDetector, TriggerKey,
};

// =========================================================================
// Test Helpers
// =========================================================================

const KEY_A: Key = Key::new(30);
const KEY_S: Key = Key::new(31);
const KEY_C: Key = Key::new(46);
const KEY_CTRL: Key = Key::new(29);
const KEY_VOL_DOWN: Key = Key::new(114);

/// Drives a detector with an explicit millisecond clock.
struct Sim {
    detector: TriggerDetector,
    now: u64,
}

impl Sim {
    fn new(key_maps: Vec<KeyMap>) -> Self {
        Self::with_preferences(key_maps, DetectionPreferences::default())
    }

    fn with_preferences(key_maps: Vec<KeyMap>, preferences: DetectionPreferences) -> Self {
        Self {
            detector: TriggerDetector::new(&KeyMapConfig::new(key_maps), preferences),
            now: 0,
        }
    }

    /// Advance the clock and run timer work, like the daemon's poll loop.
    fn advance(&mut self, ms: u64) {
        self.now += ms;
        self.detector.check_timeouts(self.now);
    }

    fn press(&mut self, key: Key) -> bool {
        self.detector
            .on_key_event(&KeyEvent::press(key), self.now)
    }

    fn release(&mut self, key: Key) -> bool {
        self.detector
            .on_key_event(&KeyEvent::release(key), self.now)
    }

    fn press_from(&mut self, key: Key, descriptor: &str) -> bool {
        let event = KeyEvent::new(
            key,
            KeyAction::Press,
            DeviceOrigin::External(descriptor.to_string()),
        );
        self.detector.on_key_event(&event, self.now)
    }

    fn release_from(&mut self, key: Key, descriptor: &str) -> bool {
        let event = KeyEvent::new(
            key,
            KeyAction::Release,
            DeviceOrigin::External(descriptor.to_string()),
        );
        self.detector.on_key_event(&event, self.now)
    }

    /// Tap a key with the given hold duration, returning (down, up) consumption.
    fn tap(&mut self, key: Key, hold_ms: u64) -> (bool, bool) {
        let down = self.press(key);
        self.advance(hold_ms);
        let up = self.release(key);
        (down, up)
    }

    fn effects(&mut self) -> Vec<Effect> {
        self.detector.drain_effects()
    }

    /// Drained actions only, ignoring vibration and imitation effects.
    fn actions(&mut self) -> Vec<Action> {
        self.effects()
            .into_iter()
            .filter_map(|effect| match effect {
                Effect::PerformAction(action) => Some(action),
                _ => None,
            })
            .collect()
    }
}

fn command(cmd: &str) -> Action {
    Action::Command {
        command: cmd.to_string(),
    }
}

fn short(key: Key) -> TriggerKey {
    TriggerKey::new(key)
}

fn long(key: Key) -> TriggerKey {
    TriggerKey::new(key).with_click_type(ClickType::Long)
}

fn double(key: Key) -> TriggerKey {
    TriggerKey::new(key).with_click_type(ClickType::Double)
}

// =========================================================================
// Sequence triggers
// =========================================================================

#[test]
fn sequence_trigger_consumes_both_taps_and_fires_once() {
    let mut sim = Sim::new(vec![KeyMap::new(
        Trigger::sequence(vec![short(KEY_A), short(KEY_S)]),
        vec![command("mark")],
    )]);

    assert!(sim.press(KEY_A));
    sim.advance(20);
    assert!(sim.release(KEY_A));
    assert!(sim.effects().is_empty());

    sim.advance(100);
    assert!(sim.press(KEY_S));
    sim.advance(20);
    assert!(sim.release(KEY_S));

    assert_eq!(sim.actions(), vec![command("mark")]);
    assert!(sim.effects().is_empty());
}

#[test]
fn sequence_trigger_resets_after_timeout() {
    let mut sim = Sim::new(vec![KeyMap::new(
        Trigger::sequence(vec![short(KEY_A), short(KEY_S)]).with_timeout(500),
        vec![command("mark")],
    )]);

    sim.tap(KEY_A, 20);
    sim.advance(600);

    // Too late: S behaves normally and nothing fires.
    assert!(!sim.press(KEY_S));
    assert!(!sim.release(KEY_S));
    assert!(sim.effects().is_empty());

    // A fresh attempt within the window still works.
    sim.tap(KEY_A, 20);
    sim.advance(100);
    sim.tap(KEY_S, 20);
    assert_eq!(sim.actions(), vec![command("mark")]);
}

#[test]
fn unrelated_keys_are_never_consumed() {
    let mut sim = Sim::new(vec![KeyMap::new(
        Trigger::sequence(vec![short(KEY_A)]),
        vec![command("mark")],
    )]);

    assert!(!sim.press(KEY_C));
    assert!(!sim.release(KEY_C));
    assert!(sim.effects().is_empty());
}

#[test]
fn sequence_fires_per_completion_not_per_tap() {
    let mut sim = Sim::new(vec![KeyMap::new(
        Trigger::sequence(vec![short(KEY_A), short(KEY_A)]),
        vec![command("mark")],
    )]);

    sim.tap(KEY_A, 20);
    sim.advance(50);
    sim.tap(KEY_A, 20);
    assert_eq!(sim.actions(), vec![command("mark")]);

    sim.advance(50);
    sim.tap(KEY_A, 20);
    assert!(sim.actions().is_empty());
    sim.advance(50);
    sim.tap(KEY_A, 20);
    assert_eq!(sim.actions(), vec![command("mark")]);
}

// =========================================================================
// Parallel (chord) triggers
// =========================================================================

#[test]
fn chord_fires_on_final_press_and_consumes_releases() {
    let mut sim = Sim::new(vec![KeyMap::new(
        Trigger::parallel(vec![short(KEY_CTRL), short(KEY_C)]),
        vec![command("copy")],
    )]);

    assert!(sim.press(KEY_CTRL));
    sim.advance(10);
    assert!(sim.press(KEY_C));
    assert_eq!(sim.actions(), vec![command("copy")]);

    sim.advance(10);
    assert!(sim.release(KEY_C));
    sim.advance(10);
    assert!(sim.release(KEY_CTRL));
    assert!(sim.effects().is_empty());
}

#[test]
fn chord_with_vibrate_emits_the_action_then_one_pulse() {
    let mut sim = Sim::new(vec![KeyMap::new(
        Trigger::parallel(vec![short(KEY_CTRL), short(KEY_C)]),
        vec![command("copy")],
    )
    .with_vibrate(true)]);

    assert!(sim.press(KEY_CTRL));
    sim.advance(10);
    assert!(sim.press(KEY_C));
    assert_eq!(
        sim.effects(),
        vec![Effect::PerformAction(command("copy")), Effect::Vibrate]
    );

    sim.advance(10);
    assert!(sim.release(KEY_C));
    assert!(sim.release(KEY_CTRL));
    assert!(sim.effects().is_empty());
}

#[test]
fn abandoned_chord_resends_the_held_key() {
    let mut sim = Sim::new(vec![KeyMap::new(
        Trigger::parallel(vec![short(KEY_CTRL), short(KEY_C)]),
        vec![command("copy")],
    )]);

    assert!(sim.press(KEY_CTRL));
    sim.advance(30);
    // Released before C ever arrived.
    assert!(sim.release(KEY_CTRL));

    assert_eq!(sim.effects(), vec![Effect::ImitateKey(KEY_CTRL)]);
}

#[test]
fn long_press_chord_fires_after_hold_threshold() {
    let mut sim = Sim::new(vec![KeyMap::new(
        Trigger::parallel(vec![long(KEY_VOL_DOWN)]),
        vec![command("flashlight")],
    )]);

    assert!(sim.press(KEY_VOL_DOWN));
    assert!(sim.actions().is_empty());

    // The daemon's timer check fires the chord while it is still held.
    sim.advance(600);
    assert_eq!(sim.actions(), vec![command("flashlight")]);

    sim.advance(50);
    assert!(sim.release(KEY_VOL_DOWN));
    assert!(sim.effects().is_empty());
}

#[test]
fn long_press_chord_released_early_resends_the_key() {
    let mut sim = Sim::new(vec![KeyMap::new(
        Trigger::parallel(vec![long(KEY_VOL_DOWN)]),
        vec![command("flashlight")],
    )]);

    assert!(sim.press(KEY_VOL_DOWN));
    sim.advance(100);
    assert!(sim.release(KEY_VOL_DOWN));
    assert_eq!(sim.effects(), vec![Effect::ImitateKey(KEY_VOL_DOWN)]);

    // The stale confirmation must not fire later.
    sim.advance(600);
    assert!(sim.effects().is_empty());
}

// =========================================================================
// Long press sequences
// =========================================================================

#[test]
fn long_press_key_fires_when_held_past_threshold() {
    let mut sim = Sim::new(vec![KeyMap::new(
        Trigger::sequence(vec![long(KEY_VOL_DOWN)]),
        vec![command("mute")],
    )]);

    let (down, up) = sim.tap(KEY_VOL_DOWN, 600);
    assert!(down);
    assert!(up);
    assert_eq!(sim.actions(), vec![command("mute")]);
}

#[test]
fn long_press_key_released_early_is_resent() {
    let mut sim = Sim::new(vec![KeyMap::new(
        Trigger::sequence(vec![long(KEY_VOL_DOWN)]),
        vec![command("mute")],
    )]);

    // The down is consumed before the click type is known.
    let (down, up) = sim.tap(KEY_VOL_DOWN, 100);
    assert!(down);
    assert!(up);
    assert_eq!(sim.effects(), vec![Effect::ImitateKey(KEY_VOL_DOWN)]);
}

#[test]
fn long_press_threshold_is_configurable() {
    let preferences = DetectionPreferences {
        long_press_delay_ms: 200,
        ..DetectionPreferences::default()
    };
    let mut sim = Sim::with_preferences(
        vec![KeyMap::new(
            Trigger::sequence(vec![long(KEY_VOL_DOWN)]),
            vec![command("mute")],
        )],
        preferences,
    );

    sim.tap(KEY_VOL_DOWN, 250);
    assert_eq!(sim.actions(), vec![command("mute")]);
}

#[test]
fn shared_key_resolves_by_hold_duration() {
    let mut sim = Sim::new(vec![
        KeyMap::new(Trigger::sequence(vec![short(KEY_A)]), vec![command("quick")]),
        KeyMap::new(Trigger::sequence(vec![long(KEY_A)]), vec![command("hold")]),
    ]);

    // A quick tap fires only the short trigger; the consumed-then-decided
    // key is never re-sent.
    let (down, up) = sim.tap(KEY_A, 50);
    assert!(down);
    assert!(up);
    assert_eq!(sim.effects(), vec![Effect::PerformAction(command("quick"))]);

    // Held past the threshold, the same key fires only the long trigger.
    sim.advance(100);
    sim.tap(KEY_A, 600);
    assert_eq!(sim.effects(), vec![Effect::PerformAction(command("hold"))]);
}

// =========================================================================
// Double press sequences
// =========================================================================

#[test]
fn double_press_fires_when_both_taps_land_in_the_window() {
    let mut sim = Sim::new(vec![KeyMap::new(
        Trigger::sequence(vec![double(KEY_A)]),
        vec![command("assist")],
    )]);

    let (down, up) = sim.tap(KEY_A, 30);
    assert!(down);
    assert!(up);
    assert!(sim.effects().is_empty());

    sim.advance(100);
    sim.tap(KEY_A, 30);
    assert_eq!(sim.actions(), vec![command("assist")]);
}

#[test]
fn lone_press_is_resent_after_the_double_press_window() {
    let mut sim = Sim::new(vec![KeyMap::new(
        Trigger::sequence(vec![double(KEY_A)]),
        vec![command("assist")],
    )]);

    sim.tap(KEY_A, 30);
    assert!(sim.effects().is_empty());

    // Window closes with no second press: the tap behaves normally.
    sim.advance(400);
    assert_eq!(sim.effects(), vec![Effect::ImitateKey(KEY_A)]);

    // And the slot is clean for the next attempt.
    sim.tap(KEY_A, 30);
    sim.advance(100);
    sim.tap(KEY_A, 30);
    assert_eq!(sim.actions(), vec![command("assist")]);
}

// =========================================================================
// Device scoping
// =========================================================================

#[test]
fn any_device_trigger_matches_internal_and_external_events() {
    let descriptor = "046d:c52b:usb-0000:00:14.0-1";
    let mut sim = Sim::new(vec![KeyMap::new(
        Trigger::sequence(vec![short(KEY_A).with_device(DeviceScope::Any)]),
        vec![command("mark")],
    )]);

    sim.tap(KEY_A, 20);
    assert_eq!(sim.actions(), vec![command("mark")]);

    sim.advance(100);
    assert!(sim.press_from(KEY_A, descriptor));
    sim.advance(20);
    assert!(sim.release_from(KEY_A, descriptor));
    assert_eq!(sim.actions(), vec![command("mark")]);
}

#[test]
fn device_scoped_trigger_ignores_other_devices() {
    let descriptor = "046d:c52b:usb-0000:00:14.0-1";
    let mut sim = Sim::new(vec![KeyMap::new(
        Trigger::sequence(vec![
            short(KEY_A).with_device(DeviceScope::External(descriptor.to_string()))
        ]),
        vec![command("mark")],
    )]);

    // A different external keyboard must not trigger or be consumed.
    assert!(!sim.press_from(KEY_A, "dead:beef:usb-0000:00:14.0-2"));
    sim.advance(20);
    assert!(!sim.release_from(KEY_A, "dead:beef:usb-0000:00:14.0-2"));
    assert!(sim.actions().is_empty());

    sim.advance(100);
    assert!(sim.press_from(KEY_A, descriptor));
    sim.advance(20);
    assert!(sim.release_from(KEY_A, descriptor));
    assert_eq!(sim.actions(), vec![command("mark")]);
}

#[test]
fn internal_only_config_skips_external_events_entirely() {
    let mut sim = Sim::new(vec![KeyMap::new(
        Trigger::sequence(vec![short(KEY_A)]),
        vec![command("mark")],
    )]);

    assert!(!sim.press_from(KEY_A, "046d:c52b:usb-0000:00:14.0-1"));
    assert!(!sim.release_from(KEY_A, "046d:c52b:usb-0000:00:14.0-1"));
    assert!(sim.effects().is_empty());
}

// =========================================================================
// Actions, vibration, lifecycle
// =========================================================================

#[test]
fn shared_actions_fire_for_each_completed_trigger() {
    let mut sim = Sim::new(vec![
        KeyMap::new(Trigger::sequence(vec![short(KEY_A)]), vec![command("same")]),
        KeyMap::new(Trigger::sequence(vec![short(KEY_S)]), vec![command("same")]),
    ]);

    sim.tap(KEY_A, 20);
    assert_eq!(sim.actions(), vec![command("same")]);
    sim.advance(50);
    sim.tap(KEY_S, 20);
    assert_eq!(sim.actions(), vec![command("same")]);
}

#[test]
fn multiple_actions_fire_in_configured_order() {
    let mut sim = Sim::new(vec![KeyMap::new(
        Trigger::sequence(vec![short(KEY_A)]),
        vec![
            command("first"),
            Action::SendKey { key: KEY_C },
            Action::Text { text: "hi".into() },
        ],
    )]);

    sim.tap(KEY_A, 20);
    assert_eq!(
        sim.actions(),
        vec![
            command("first"),
            Action::SendKey { key: KEY_C },
            Action::Text { text: "hi".into() },
        ]
    );
}

#[test]
fn vibrate_is_emitted_once_after_the_actions() {
    let mut sim = Sim::new(vec![KeyMap::new(
        Trigger::sequence(vec![short(KEY_A)]),
        vec![command("one"), command("two")],
    )
    .with_vibrate(true)]);

    sim.tap(KEY_A, 20);
    assert_eq!(
        sim.effects(),
        vec![
            Effect::PerformAction(command("one")),
            Effect::PerformAction(command("two")),
            Effect::Vibrate,
        ]
    );
}

#[test]
fn force_vibrate_applies_to_every_fire() {
    let preferences = DetectionPreferences {
        force_vibrate: true,
        ..DetectionPreferences::default()
    };
    let mut sim = Sim::with_preferences(
        vec![KeyMap::new(
            Trigger::sequence(vec![short(KEY_A)]),
            vec![command("mark")],
        )],
        preferences,
    );

    sim.tap(KEY_A, 20);
    assert_eq!(
        sim.effects(),
        vec![Effect::PerformAction(command("mark")), Effect::Vibrate]
    );
}

#[test]
fn disabled_keymaps_never_fire() {
    let mut sim = Sim::new(vec![
        KeyMap::new(Trigger::sequence(vec![short(KEY_A)]), vec![command("off")])
            .with_enabled(false),
    ]);

    assert!(!sim.press(KEY_A));
    assert!(!sim.release(KEY_A));
    assert!(sim.effects().is_empty());
}

#[test]
fn reset_abandons_partial_matches() {
    let mut sim = Sim::new(vec![KeyMap::new(
        Trigger::sequence(vec![short(KEY_A), short(KEY_S)]),
        vec![command("mark")],
    )]);

    sim.tap(KEY_A, 20);
    sim.detector.reset();

    // After the reset, S alone must not complete the old attempt.
    sim.advance(50);
    sim.tap(KEY_S, 20);
    assert!(sim.actions().is_empty());
}

#[test]
fn reconfiguration_swaps_triggers_and_state() {
    let mut sim = Sim::new(vec![KeyMap::new(
        Trigger::sequence(vec![short(KEY_A), short(KEY_S)]),
        vec![command("old")],
    )]);

    sim.tap(KEY_A, 20);
    sim.detector.set_key_maps(&KeyMapConfig::new(vec![KeyMap::new(
        Trigger::sequence(vec![short(KEY_S)]),
        vec![command("new")],
    )]));

    sim.advance(50);
    sim.tap(KEY_S, 20);
    assert_eq!(sim.actions(), vec![command("new")]);
}
