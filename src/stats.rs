use std::fmt;

pub const MACHINE_COUNT: usize = 3;
pub const MAX_PLAYERS_PER_MACHINE: u64 = 10;

/// One of the three fixed machine slots, 0-based.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MachineSlot(u8);

impl MachineSlot {
    pub fn new(index: usize) -> Option<Self> {
        if index < MACHINE_COUNT {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    pub fn all() -> [MachineSlot; MACHINE_COUNT] {
        [MachineSlot(0), MachineSlot(1), MachineSlot(2)]
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The 1-based number players see and `getCurrentMachine` returns.
    pub fn number(self) -> u64 {
        u64::from(self.0) + 1
    }

    pub fn next(self) -> Self {
        Self((self.0 + 1) % MACHINE_COUNT as u8)
    }

    pub fn prev(self) -> Self {
        Self((self.0 + MACHINE_COUNT as u8 - 1) % MACHINE_COUNT as u8)
    }
}

impl fmt::Display for MachineSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Machine {}", self.number())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MachineStat {
    pub player_count: u64,
    /// The caller is seated on a different machine, so betting here is barred.
    pub occupied_elsewhere: bool,
}

impl MachineStat {
    pub fn is_full(&self) -> bool {
        self.player_count >= MAX_PLAYERS_PER_MACHINE
    }
}

pub type MachineStats = [MachineStat; MACHINE_COUNT];

/// `current_machine` is 1-based with 0 meaning "not seated".
pub fn occupied_elsewhere(slot: MachineSlot, current_machine: u64) -> bool {
    current_machine > 0 && slot.number() != current_machine
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn occupied_elsewhere__is_false_everywhere_when_not_seated() {
        for slot in MachineSlot::all() {
            assert!(!occupied_elsewhere(slot, 0));
        }
    }

    #[test]
    fn occupied_elsewhere__flags_only_the_other_slots() {
        // given
        let current_machine = 2;

        // when
        let flags: Vec<bool> = MachineSlot::all()
            .into_iter()
            .map(|slot| occupied_elsewhere(slot, current_machine))
            .collect();

        // then
        assert_eq!(vec![true, false, true], flags);
    }

    #[test]
    fn machine_slot__wraps_in_both_directions() {
        let first = MachineSlot::new(0).unwrap();
        assert_eq!(MachineSlot::new(2), Some(first.prev()));
        assert_eq!(MachineSlot::new(1), Some(first.next()));
        assert_eq!(None, MachineSlot::new(3));
    }
}
