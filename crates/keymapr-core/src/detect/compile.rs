// Keymapr Detection - Trigger Compiler
// Turns a KeyMapConfig into the dense tables the classifier scans

use indexmap::IndexSet;
use smallvec::SmallVec;

use super::encoded::{EncodedEvent, DEVICE_BIT_SHIFT};
use crate::input::{DeviceOrigin, KeyEvent};
use crate::{Action, ClickType, DeviceScope, KeyMapConfig, TriggerKey, TriggerMode};

/// One trigger's encoded key list. Triggers rarely exceed a handful of keys,
/// so the rows live inline.
pub(crate) type EventRow = SmallVec<[EncodedEvent; 4]>;

/// Query-optimized tables compiled from a [`KeyMapConfig`].
///
/// Sequence and parallel triggers are partitioned into parallel collections
/// indexed by trigger: row `i` of `sequence_events`, `sequence_actions`,
/// `sequence_vibrate` and `sequence_timeouts` all describe the same trigger.
/// Actions are deduplicated by equality into `actions` and referenced by
/// index. The tables are immutable once built; reconfiguration compiles a
/// fresh set and swaps it in wholesale.
#[derive(Debug, Clone, Default)]
pub(crate) struct CompiledTables {
    /// False when no enabled keymap has actions; the classifier then
    /// early-exits on every event.
    pub detect: bool,
    pub detect_internal: bool,
    pub detect_external: bool,
    pub detect_sequences: bool,
    pub detect_parallels: bool,
    pub detect_sequence_long_presses: bool,
    pub detect_sequence_double_presses: bool,

    /// Dense action table; the id of an action is its index.
    pub actions: Vec<Action>,
    /// External device descriptors; descriptor `i` owns encoded-event bit
    /// `DEVICE_BIT_SHIFT + i`.
    pub devices: Vec<String>,

    pub sequence_events: Vec<EventRow>,
    pub sequence_actions: Vec<Vec<usize>>,
    pub sequence_vibrate: Vec<bool>,
    pub sequence_timeouts: Vec<u64>,

    pub parallel_events: Vec<EventRow>,
    pub parallel_actions: Vec<Vec<usize>>,
    pub parallel_vibrate: Vec<bool>,

    /// Every long-press event appearing in a sequence trigger.
    pub long_press_candidates: Vec<EncodedEvent>,
    /// Every double-press event appearing in a sequence trigger. Slot order
    /// here defines the classifier's double-press state slots.
    pub double_press_candidates: Vec<EncodedEvent>,
}

impl CompiledTables {
    /// Compile the configuration. Pure: the same config always produces the
    /// same tables.
    pub(crate) fn compile(config: &KeyMapConfig) -> Self {
        let mut tables = CompiledTables::default();

        if config.active_key_maps().next().is_none() {
            log::debug!("no enabled keymaps with actions; detection disabled");
            return tables;
        }
        tables.detect = true;

        // Device descriptors first: trigger encoding needs their bits.
        let mut devices: IndexSet<&str> = IndexSet::new();
        for key_map in config.active_key_maps() {
            for trigger_key in &key_map.trigger.keys {
                if let DeviceScope::External(descriptor) = &trigger_key.device {
                    devices.insert(descriptor.as_str());
                }
            }
        }
        tables.devices = devices.iter().map(|d| d.to_string()).collect();

        let mut actions: IndexSet<Action> = IndexSet::new();
        let mut long_presses: IndexSet<EncodedEvent> = IndexSet::new();
        let mut double_presses: IndexSet<EncodedEvent> = IndexSet::new();

        for key_map in config.active_key_maps() {
            let mut events: EventRow = SmallVec::new();
            for trigger_key in &key_map.trigger.keys {
                let encoded = tables.encode_trigger_key(trigger_key);
                events.push(encoded);

                if key_map.trigger.mode == TriggerMode::Sequence {
                    match trigger_key.click_type {
                        ClickType::Long => {
                            long_presses.insert(encoded);
                        }
                        ClickType::Double => {
                            double_presses.insert(encoded);
                        }
                        ClickType::Short => {}
                    }
                }

                match trigger_key.device {
                    DeviceScope::Internal => tables.detect_internal = true,
                    DeviceScope::Any => {
                        tables.detect_internal = true;
                        tables.detect_external = true;
                    }
                    DeviceScope::External(_) => tables.detect_external = true,
                }
            }

            let action_ids: Vec<usize> = key_map
                .actions
                .iter()
                .map(|action| actions.insert_full(action.clone()).0)
                .collect();

            match key_map.trigger.mode {
                TriggerMode::Sequence => {
                    tables.sequence_events.push(events);
                    tables.sequence_actions.push(action_ids);
                    tables.sequence_vibrate.push(key_map.vibrate);
                    tables.sequence_timeouts.push(key_map.trigger.timeout());
                }
                TriggerMode::Parallel => {
                    tables.parallel_events.push(events);
                    tables.parallel_actions.push(action_ids);
                    tables.parallel_vibrate.push(key_map.vibrate);
                }
            }
        }

        tables.actions = actions.into_iter().collect();
        tables.long_press_candidates = long_presses.into_iter().collect();
        tables.double_press_candidates = double_presses.into_iter().collect();

        tables.detect_sequences = !tables.sequence_events.is_empty();
        tables.detect_parallels = !tables.parallel_events.is_empty();
        tables.detect_sequence_long_presses = !tables.long_press_candidates.is_empty();
        tables.detect_sequence_double_presses = !tables.double_press_candidates.is_empty();

        log::debug!(
            "compiled {} sequence and {} parallel triggers, {} actions, {} devices",
            tables.sequence_events.len(),
            tables.parallel_events.len(),
            tables.actions.len(),
            tables.devices.len()
        );

        tables
    }

    /// The encoded-event bit owned by an external device descriptor. The top
    /// bit is reserved for unknown devices, so ids end one short of it.
    fn device_bits(&self, descriptor: &str) -> Option<u32> {
        let index = self.devices.iter().position(|d| d == descriptor)?;
        let shift = DEVICE_BIT_SHIFT + index as u32;
        if shift >= 31 {
            return None;
        }
        Some(1 << shift)
    }

    fn encode_trigger_key(&self, trigger_key: &TriggerKey) -> EncodedEvent {
        let device_bits = match &trigger_key.device {
            DeviceScope::Internal => EncodedEvent::internal_device_bits(),
            DeviceScope::Any => 0,
            DeviceScope::External(descriptor) => match self.device_bits(descriptor) {
                Some(bits) => bits,
                None => {
                    // Out of encodable device ids; fall back to any-device.
                    log::warn!(
                        "device descriptor {} has no encodable id; matching any device",
                        descriptor
                    );
                    0
                }
            },
        };
        EncodedEvent::new(trigger_key.key, Some(trigger_key.click_type), device_bits)
    }

    /// Encode an observed input event with an undetermined click type.
    pub(crate) fn encode_input(&self, event: &KeyEvent) -> EncodedEvent {
        match &event.origin {
            DeviceOrigin::Internal => EncodedEvent::internal(event.key),
            DeviceOrigin::External(descriptor) => match self.device_bits(descriptor) {
                Some(bits) => EncodedEvent::new(event.key, None, bits),
                // Unknown device: match any-device trigger keys only.
                None => EncodedEvent::unknown_external(event.key),
            },
        }
    }
}
