// Keymapr Detection - Event Classifier
// Real-time trigger matching over the raw key event stream

use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;

use super::compile::CompiledTables;
use super::encoded::EncodedEvent;
use crate::input::{KeyAction, KeyEvent};
use crate::{Action, ClickType, DetectionPreferences, Key, KeyMapConfig};

/// A side effect requested by the classifier.
///
/// Effects are queued during [`TriggerDetector::on_key_event`] and
/// [`TriggerDetector::check_timeouts`] and drained by the caller; the
/// classifier itself never executes anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Execute this action now.
    PerformAction(Action),
    /// Emit one haptic pulse.
    Vibrate,
    /// Re-inject this key into normal input handling; it was provisionally
    /// consumed but no trigger claimed it.
    ImitateKey(Key),
}

/// The two observable stages of a double-press slot. A completed double
/// press resolves within the same event, so no third stage is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DoublePressStage {
    NotPressed,
    SinglePressed,
}

/// All mutable per-trigger state. Rebuilt from scratch on every recompile
/// and on [`TriggerDetector::reset`], never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DetectorState {
    /// Index of the last matched event per sequence trigger.
    sequence_progress: Vec<Option<usize>>,
    /// Rolling timeout deadline per sequence trigger.
    sequence_deadlines: Vec<Option<u64>>,
    /// Index of the last matched event per parallel trigger.
    parallel_progress: Vec<Option<usize>>,
    /// Pending long-press chord confirmation per parallel trigger.
    chord_deadlines: Vec<Option<u64>>,
    /// One slot per compiled double-press candidate, in table order.
    double_press_stages: Vec<DoublePressStage>,
    double_press_deadlines: Vec<Option<u64>>,
    /// Key to re-send if the double-press window closes unanswered.
    pending_imitations: Vec<Option<Key>>,
    /// Down timestamp per in-flight encoded identity. A re-down before the
    /// up overwrites; there is no stacking.
    down_times: HashMap<EncodedEvent, u64>,
    /// Keys whose presses a parallel trigger consumed; their releases are
    /// consumed too.
    held_chord_keys: HashSet<EncodedEvent>,
}

impl DetectorState {
    fn for_tables(tables: &CompiledTables) -> Self {
        Self {
            sequence_progress: vec![None; tables.sequence_events.len()],
            sequence_deadlines: vec![None; tables.sequence_events.len()],
            parallel_progress: vec![None; tables.parallel_events.len()],
            chord_deadlines: vec![None; tables.parallel_events.len()],
            double_press_stages: vec![
                DoublePressStage::NotPressed;
                tables.double_press_candidates.len()
            ],
            double_press_deadlines: vec![None; tables.double_press_candidates.len()],
            pending_imitations: vec![None; tables.double_press_candidates.len()],
            down_times: HashMap::new(),
            held_chord_keys: HashSet::new(),
        }
    }
}

/// The real-time trigger classifier.
///
/// `on_key_event` must be called once per physical key transition, in
/// arrival order, from a single logical thread; timer work goes through
/// `check_timeouts` under the same single-writer discipline. One detector
/// instance exclusively owns its compiled tables and mutable state.
///
/// Input-pairing precondition: the platform delivers a key-down before every
/// key-up of the same key. A release with no recorded press trips a debug
/// assertion and is otherwise ignored.
pub struct TriggerDetector {
    tables: CompiledTables,
    state: DetectorState,
    preferences: DetectionPreferences,
    effects: Vec<Effect>,
}

impl TriggerDetector {
    pub fn new(config: &KeyMapConfig, preferences: DetectionPreferences) -> Self {
        let tables = CompiledTables::compile(config);
        let state = DetectorState::for_tables(&tables);
        Self {
            tables,
            state,
            preferences,
            effects: Vec::new(),
        }
    }

    /// Replace the configuration: compile fresh tables, then swap tables and
    /// state together so no event ever observes a half-updated view.
    pub fn set_key_maps(&mut self, config: &KeyMapConfig) {
        let tables = CompiledTables::compile(config);
        self.state = DetectorState::for_tables(&tables);
        self.tables = tables;
    }

    /// Abandon all in-flight partial matches without recompiling.
    /// Idempotent: the state afterwards equals the freshly-compiled state.
    pub fn reset(&mut self) {
        self.state = DetectorState::for_tables(&self.tables);
    }

    pub fn preferences(&self) -> DetectionPreferences {
        self.preferences
    }

    pub fn set_preferences(&mut self, preferences: DetectionPreferences) {
        self.preferences = preferences;
    }

    /// Take the effects queued since the last drain, in emission order.
    pub fn drain_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    /// Classify one key transition. Returns whether the caller must swallow
    /// the original event.
    pub fn on_key_event(&mut self, event: &KeyEvent, now_ms: u64) -> bool {
        if !self.tables.detect {
            return false;
        }

        // Timer work due before this event runs first, so delayed re-checks
        // observe the state exactly as the preceding events left it.
        self.run_due_checks(now_ms);

        let external = event.origin.is_external();
        if (external && !self.tables.detect_external)
            || (!external && !self.tables.detect_internal)
        {
            return false;
        }

        let encoded = self.tables.encode_input(event);
        match event.action {
            KeyAction::Press => self.on_key_down(event.key, encoded, now_ms),
            KeyAction::Release => self.on_key_up(event.key, encoded, now_ms),
            // Auto-repeat carries no trigger information.
            KeyAction::Repeat => false,
        }
    }

    /// Run any delayed re-checks whose deadline has passed: long-press chord
    /// confirmations and double-press timeout re-sends. Each is guarded by
    /// the state it was scheduled against, so a stale check is a no-op.
    pub fn check_timeouts(&mut self, now_ms: u64) {
        if self.tables.detect {
            self.run_due_checks(now_ms);
        }
    }

    /// The earliest pending deadline, for callers that schedule their next
    /// `check_timeouts` call around it.
    pub fn next_deadline(&self) -> Option<u64> {
        self.state
            .chord_deadlines
            .iter()
            .chain(self.state.double_press_deadlines.iter())
            .flatten()
            .copied()
            .min()
    }

    fn run_due_checks(&mut self, now: u64) {
        for i in 0..self.state.chord_deadlines.len() {
            let Some(due) = self.state.chord_deadlines[i] else {
                continue;
            };
            if now < due {
                continue;
            }
            self.state.chord_deadlines[i] = None;
            // Fire only if the chord is still fully held.
            let last = self.tables.parallel_events[i].len() - 1;
            if self.state.parallel_progress[i] == Some(last) {
                self.state.parallel_progress[i] = None;
                self.fire_parallel(i);
            }
        }

        for i in 0..self.state.double_press_deadlines.len() {
            let Some(due) = self.state.double_press_deadlines[i] else {
                continue;
            };
            if now < due {
                continue;
            }
            self.state.double_press_deadlines[i] = None;
            // No second press arrived: the first press behaves normally.
            if self.state.double_press_stages[i] == DoublePressStage::SinglePressed {
                self.state.double_press_stages[i] = DoublePressStage::NotPressed;
                if let Some(key) = self.state.pending_imitations[i].take() {
                    self.effects.push(Effect::ImitateKey(key));
                }
            }
            self.state.pending_imitations[i] = None;
        }
    }

    fn on_key_down(&mut self, key: Key, encoded: EncodedEvent, now: u64) -> bool {
        self.state.down_times.insert(encoded, now);

        let mut consume = false;

        // Sequence deadline sweep: expired triggers reset; triggers still in
        // flight own every key code they contain; a trigger waiting to start
        // owns the key that would start it.
        for i in 0..self.tables.sequence_events.len() {
            if let Some(deadline) = self.state.sequence_deadlines[i] {
                if now >= deadline {
                    self.state.sequence_progress[i] = None;
                    self.state.sequence_deadlines[i] = None;
                }
            }
            match self.state.sequence_deadlines[i] {
                Some(_) => {
                    if self.tables.sequence_events[i]
                        .iter()
                        .any(|e| e.key_code() == key.code())
                    {
                        consume = true;
                    }
                }
                None => {
                    let next = self.state.sequence_progress[i].map_or(0, |p| p + 1);
                    if let Some(expected) = self.tables.sequence_events[i].get(next) {
                        if expected.matches_ignoring_click(encoded) {
                            consume = true;
                        }
                    }
                }
            }
        }

        // Double-press slot sweep: a key inside an open window is owned by
        // the pending double-press decision. Expired windows were already
        // closed by the due-check pass at entry.
        if self.state.double_press_deadlines.iter().any(Option::is_some) {
            consume = true;
        }

        if self.tables.detect_parallels {
            for i in 0..self.tables.parallel_events.len() {
                let next = self.state.parallel_progress[i].map_or(0, |p| p + 1);
                let row_len = self.tables.parallel_events[i].len();
                let expected = match self.tables.parallel_events[i].get(next) {
                    Some(&e) => e,
                    None => continue,
                };

                if expected.matches(encoded.with_click_type(ClickType::Short)) {
                    consume = true;
                    self.state.parallel_progress[i] = Some(next);
                    self.state.held_chord_keys.insert(encoded);
                    if next + 1 == row_len {
                        self.fire_parallel(i);
                    }
                }

                if expected.matches(encoded.with_click_type(ClickType::Long)) {
                    consume = true;
                    self.state.parallel_progress[i] = Some(next);
                    self.state.held_chord_keys.insert(encoded);
                    if next + 1 == row_len {
                        // Confirm after the hold threshold; released-early
                        // chords are caught by the progress guard.
                        self.state.chord_deadlines[i] =
                            Some(now + self.preferences.long_press_delay_ms);
                    }
                }
            }
        }

        if consume {
            log::debug!("consumed {} down", key);
            return true;
        }

        // The press may yet become a long or double press; keep it from the
        // foreground until the release decides.
        if self.tables.detect_sequence_double_presses
            && self
                .tables
                .double_press_candidates
                .iter()
                .any(|c| c.matches(encoded.with_click_type(ClickType::Double)))
        {
            log::debug!("consumed {} down (double-press candidate)", key);
            return true;
        }

        if self.tables.detect_sequence_long_presses
            && self
                .tables
                .long_press_candidates
                .iter()
                .any(|c| c.matches(encoded.with_click_type(ClickType::Long)))
        {
            log::debug!("consumed {} down (long-press candidate)", key);
            return true;
        }

        false
    }

    fn on_key_up(&mut self, key: Key, encoded: EncodedEvent, now: u64) -> bool {
        let Some(down_time) = self.state.down_times.remove(&encoded) else {
            debug_assert!(false, "key-up without a matching key-down: {}", key);
            return false;
        };
        let held_for = now.saturating_sub(down_time);

        let mut consume = false;
        let mut imitate = false;
        let mut vibrate = false;
        let mut successful_long_press = false;
        let mut successful_double_press = false;
        let mut armed_imitation_slot: Option<usize> = None;
        let mut actions_to_fire: IndexSet<usize> = IndexSet::new();

        if self.tables.detect_sequence_long_presses
            && self
                .tables
                .long_press_candidates
                .iter()
                .any(|c| c.matches(encoded.with_click_type(ClickType::Long)))
        {
            consume = true;
            if held_for >= self.preferences.long_press_delay_ms {
                successful_long_press = true;
            } else {
                // Released too early to be the long press it could have been.
                imitate = true;
            }
        }

        if self.tables.detect_sequence_double_presses {
            for i in 0..self.tables.double_press_candidates.len() {
                if !self.tables.double_press_candidates[i]
                    .matches(encoded.with_click_type(ClickType::Double))
                {
                    continue;
                }
                match self.state.double_press_stages[i] {
                    DoublePressStage::NotPressed => {
                        self.state.double_press_stages[i] = DoublePressStage::SinglePressed;
                        self.state.double_press_deadlines[i] =
                            Some(now + self.preferences.double_press_delay_ms);
                        armed_imitation_slot = Some(i);
                        consume = true;
                    }
                    DoublePressStage::SinglePressed => {
                        successful_double_press = true;
                        consume = true;
                        self.state.double_press_stages[i] = DoublePressStage::NotPressed;
                        self.state.double_press_deadlines[i] = None;
                        self.state.pending_imitations[i] = None;
                    }
                }
            }
        }

        if self.tables.detect_sequences {
            let click_type = if successful_long_press {
                ClickType::Long
            } else if successful_double_press {
                ClickType::Double
            } else {
                ClickType::Short
            };
            let resolved = encoded.with_click_type(click_type);

            for i in 0..self.tables.sequence_events.len() {
                let next = self.state.sequence_progress[i].map_or(0, |p| p + 1);
                let row_len = self.tables.sequence_events[i].len();
                let expected = match self.tables.sequence_events[i].get(next) {
                    Some(&e) => e,
                    None => continue,
                };
                if !expected.matches(resolved) {
                    continue;
                }

                consume = true;
                self.state.sequence_progress[i] = Some(next);

                // The first matched key (re)starts the rolling timeout.
                if next == 0 {
                    self.state.sequence_deadlines[i] =
                        Some(now + self.tables.sequence_timeouts[i]);
                }

                if next + 1 == row_len {
                    actions_to_fire.extend(self.tables.sequence_actions[i].iter().copied());
                    vibrate |= self.tables.sequence_vibrate[i];
                    self.state.sequence_progress[i] = None;
                    self.state.sequence_deadlines[i] = None;
                }
            }
        }

        if self.tables.detect_parallels {
            for i in 0..self.tables.parallel_events.len() {
                let Some(progress) = self.state.parallel_progress[i] else {
                    continue;
                };
                let row_len = self.tables.parallel_events[i].len();
                let contains = self.tables.parallel_events[i].iter().any(|e| {
                    e.matches(encoded.with_click_type(ClickType::Short))
                        || e.matches(encoded.with_click_type(ClickType::Long))
                });
                if !contains {
                    continue;
                }

                consume = true;
                // Released mid-chord, or before a pending long-press
                // confirmation: the interrupted key behaves normally.
                if progress + 1 < row_len || self.state.chord_deadlines[i].is_some() {
                    imitate = true;
                }
                self.state.parallel_progress[i] = None;
                self.state.chord_deadlines[i] = None;
            }
        }

        // The release of a key whose press a chord consumed is consumed too.
        if self.state.held_chord_keys.remove(&encoded) {
            consume = true;
        }

        let fired = !actions_to_fire.is_empty();
        for action_id in &actions_to_fire {
            if let Some(action) = self.tables.actions.get(*action_id).cloned() {
                self.effects.push(Effect::PerformAction(action));
            }
        }
        if fired && (vibrate || self.preferences.force_vibrate) {
            self.effects.push(Effect::Vibrate);
        }

        // Imitation and action firing are mutually exclusive; an action wins.
        if imitate && !fired {
            self.effects.push(Effect::ImitateKey(key));
        }

        // A lone first press is re-sent only after its window closes
        // unanswered, and only if nothing else already claimed the key.
        if let Some(slot) = armed_imitation_slot {
            if !imitate && !fired {
                self.state.pending_imitations[slot] = Some(key);
            }
        }

        if consume {
            log::debug!("consumed {} up", key);
        }
        consume
    }

    fn fire_parallel(&mut self, trigger_index: usize) {
        let action_ids = self.tables.parallel_actions[trigger_index].clone();
        let mut fired = false;
        for action_id in action_ids {
            // A missing id means a stale table; skip rather than crash.
            if let Some(action) = self.tables.actions.get(action_id).cloned() {
                self.effects.push(Effect::PerformAction(action));
                fired = true;
            }
        }
        if fired
            && (self.tables.parallel_vibrate[trigger_index] || self.preferences.force_vibrate)
        {
            self.effects.push(Effect::Vibrate);
        }
    }
}
