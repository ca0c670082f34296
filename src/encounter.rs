//! Encounter module.
//!
//! The [`Encounter`] is the top-level simulation context. It owns the
//! characters, the event bus and the dice, and is passed to everything that
//! reads or mutates combat state.

use crate::character::Character;
use crate::config::EncounterConfig;
use crate::entity::EntityId;
use crate::error::CombatError;
use crate::events::EventBus;
use crate::roll::Dice;
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::debug;

/// Characters, event bus and dice for one fight.
///
/// Characters iterate in id order.
///
/// # Examples
///
/// ```rust
/// use zzcombat::{Character, CombatError, Encounter, EncounterConfig, EntityId};
///
/// let mut encounter = Encounter::new(EncounterConfig::default().with_seed(1));
/// encounter.add_character(Character::new("orc", "Orc")).unwrap();
///
/// let again = encounter.add_character(Character::new("orc", "Another orc"));
/// assert_eq!(again.unwrap_err(), CombatError::DuplicateEntity(EntityId::from_str("orc")));
/// assert_eq!(encounter.character(&EntityId::from_str("orc")).unwrap().name(), "Orc");
/// ```
#[derive(Debug)]
pub struct Encounter {
    config: EncounterConfig,
    characters: BTreeMap<EntityId, Character>,
    bus: Rc<EventBus>,
    dice: Dice,
}

impl Encounter {
    pub fn new(config: EncounterConfig) -> Self {
        let dice = match config.seed {
            Some(seed) => Dice::from_seed(seed),
            None => Dice::from_entropy(),
        };
        Self {
            config,
            characters: BTreeMap::new(),
            bus: Rc::new(EventBus::new()),
            dice,
        }
    }

    pub fn config(&self) -> &EncounterConfig {
        &self.config
    }

    pub fn add_character(&mut self, character: Character) -> Result<(), CombatError> {
        if self.characters.contains_key(character.id()) {
            return Err(CombatError::DuplicateEntity(character.id().clone()));
        }
        debug!(entity = %character.id(), "character joined encounter");
        self.characters.insert(character.id().clone(), character);
        Ok(())
    }

    pub fn remove_character(&mut self, id: &EntityId) -> Option<Character> {
        self.characters.remove(id)
    }

    /// Look up a character, failing with `UnknownEntity`.
    pub fn character(&self, id: &EntityId) -> Result<&Character, CombatError> {
        self.characters
            .get(id)
            .ok_or_else(|| CombatError::UnknownEntity(id.clone()))
    }

    pub fn character_mut(&mut self, id: &EntityId) -> Result<&mut Character, CombatError> {
        self.characters
            .get_mut(id)
            .ok_or_else(|| CombatError::UnknownEntity(id.clone()))
    }

    pub fn find_character(&self, id: &EntityId) -> Option<&Character> {
        self.characters.get(id)
    }

    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    pub fn character_ids(&self) -> Vec<EntityId> {
        self.characters.keys().cloned().collect()
    }

    /// The event bus. Clone the `Rc` to keep it inside a handler.
    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    pub fn dice_mut(&mut self) -> &mut Dice {
        &mut self.dice
    }

    /// Regenerate every character that has vitals, in id order.
    pub fn regenerate_all(&mut self) -> Result<(), CombatError> {
        for character in self.characters.values_mut() {
            if character.is_alive() {
                if let Ok(vitals) = character.vitals_mut() {
                    vitals.regenerate()?;
                }
            }
        }
        Ok(())
    }

    /// Drop every event subscription. Characters stay.
    pub fn teardown(&mut self) {
        self.bus.clear();
        debug!("encounter torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Scope;
    use crate::vitals::Vitals;

    #[test]
    fn test_unknown_entity_is_recoverable() {
        let enc = Encounter::new(EncounterConfig::default());
        let err = enc.character(&EntityId::from_str("nobody")).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_teardown_clears_bus() {
        let mut enc = Encounter::new(EncounterConfig::default());
        enc.bus().subscribe(Scope::Any, |_: &u8| {});
        enc.teardown();
        assert_eq!(enc.bus().subscriber_count::<u8>(), 0);
    }

    #[test]
    fn test_regenerate_all_skips_downed() {
        let mut enc = Encounter::new(EncounterConfig::default());
        let mut up = Vitals::with_health(10).unwrap().with_regeneration(2);
        up.take_damage(5).unwrap();
        let mut down = Vitals::with_health(10).unwrap().with_regeneration(2);
        down.take_damage(10).unwrap();
        enc.add_character(Character::new("up", "Up").with_vitals(up)).unwrap();
        enc.add_character(Character::new("down", "Down").with_vitals(down))
            .unwrap();
        enc.add_character(Character::new("statue", "Statue")).unwrap();

        enc.regenerate_all().unwrap();
        let health = |id: &str| {
            enc.character(&EntityId::from_str(id))
                .unwrap()
                .vitals()
                .unwrap()
                .current_health()
        };
        assert_eq!(health("up"), 7);
        assert_eq!(health("down"), 0);
    }
}
