use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use zzcombat::*;

/// Resolver pinned to one outcome.
struct Forced(Outcome);

impl RollResolver for Forced {
    fn check(&self, _: &ActionContext, _: &Encounter) -> Result<RollCheck, CombatError> {
        Ok(RollCheck::new(11, 0))
    }

    fn resolve_roll(
        &self,
        ctx: &ActionContext,
        encounter: &mut Encounter,
    ) -> Result<RollRecord, CombatError> {
        let roll = match self.0 {
            Outcome::CriticalFailure => 1,
            Outcome::Failure => 6,
            Outcome::Success => 14,
            _ => 20,
        };
        Ok(self.check(ctx, encounter)?.record(roll))
    }

    fn success_chance(&self, _: RollCheck) -> OutcomeChances {
        OutcomeChances::certain(self.0)
    }
}

/// Child that only records whether it ran.
#[derive(Default)]
struct Flag(AtomicBool);

impl Action for Flag {
    fn execute(&self, _: &ActionContext, _: &mut Encounter) -> Result<(), CombatError> {
        self.0.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn approximate(
        &self,
        _: &ActionContext,
        _: &Encounter,
    ) -> Result<ActionApproximation, CombatError> {
        Ok(ActionApproximation::new())
    }
}

/// Records that it ran and projects one point of damage on `imp`.
#[derive(Default)]
struct Marker(AtomicBool);

impl Action for Marker {
    fn execute(&self, _: &ActionContext, _: &mut Encounter) -> Result<(), CombatError> {
        self.0.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn approximate(
        &self,
        _: &ActionContext,
        _: &Encounter,
    ) -> Result<ActionApproximation, CombatError> {
        let mut approx = ActionApproximation::new();
        approx.add_damage(&EntityId::from_str("imp"), 1);
        Ok(approx)
    }
}

/// Always refers to an entity that is not in the encounter.
struct Vanished;

impl Action for Vanished {
    fn execute(&self, _: &ActionContext, _: &mut Encounter) -> Result<(), CombatError> {
        Err(CombatError::UnknownEntity(EntityId::from_str("ghost")))
    }

    fn approximate(
        &self,
        _: &ActionContext,
        _: &Encounter,
    ) -> Result<ActionApproximation, CombatError> {
        Err(CombatError::UnknownEntity(EntityId::from_str("ghost")))
    }
}

/// Deals its damage at most once per target per traversal.
struct OncePerTarget(DealDamage);

impl Action for OncePerTarget {
    fn execute(&self, ctx: &ActionContext, encounter: &mut Encounter) -> Result<(), CombatError> {
        if ctx.try_activate("thorns", &ctx.target().entity) {
            self.0.apply(ctx, encounter)?;
        }
        Ok(())
    }

    fn approximate(
        &self,
        ctx: &ActionContext,
        encounter: &Encounter,
    ) -> Result<ActionApproximation, CombatError> {
        self.0.approximate(ctx, encounter)
    }
}

fn id(s: &str) -> EntityId {
    EntityId::from_str(s)
}

fn combatant(name: &str, dex: i32) -> Character {
    let stats: StatsRegistry = [
        Stat::new(StatCategory::armor_class(), 13),
        Stat::new(StatCategory::attack_bonus(), 4),
        Stat::new(StatCategory::from_str("DEX"), dex),
    ]
    .into_iter()
    .collect();
    Character::new(name, name)
        .with_stats(stats)
        .with_vitals(Vitals::with_health(40).unwrap())
        .with_resistances(Resistances::new())
}

fn arena() -> Encounter {
    let mut encounter = Encounter::new(EncounterConfig::default().with_seed(21));
    encounter.add_character(combatant("wizard", 1)).unwrap();
    encounter.add_character(combatant("ogre", 2)).unwrap();
    encounter.add_character(combatant("imp", 0)).unwrap();
    encounter.add_character(Character::new("statue", "Statue")).unwrap();
    encounter
}

fn damage(label: &str, amount: i32) -> Arc<dyn Action> {
    Arc::new(
        ActionNode::builder(label)
            .with_effect(Arc::new(DealDamage::new(amount, DamageType::Magical)))
            .build(),
    )
}

fn health(encounter: &Encounter, who: &str) -> i32 {
    encounter
        .character(&id(who))
        .unwrap()
        .vitals()
        .unwrap()
        .current_health()
}

/// Fireball: DC 14 DEX save, full damage on a failed save, half on a
/// success, nothing on a critical success.
fn fireball(resolver: Arc<dyn RollResolver>) -> ActionNode {
    ActionNode::builder("fireball")
        .with_roll(resolver)
        .on_critical_failure(damage("full", 20))
        .on_failure(damage("full", 20))
        .on_success(damage("half", 10))
        .build()
}

#[test]
fn test_child_flag_follows_forced_outcome() {
    let mut encounter = arena();
    let ctx = ActionContext::new("wizard", Target::entity("ogre"), "probe");

    let child = Arc::new(Flag::default());
    let node = ActionNode::builder("probe")
        .with_roll(Arc::new(Forced(Outcome::Failure)))
        .on_success(child.clone())
        .build();
    node.execute(&ctx, &mut encounter).unwrap();
    assert!(!child.0.load(Ordering::SeqCst));

    let child = Arc::new(Flag::default());
    let node = ActionNode::builder("probe")
        .with_roll(Arc::new(Forced(Outcome::Success)))
        .on_success(child.clone())
        .build();
    node.execute(&ctx, &mut encounter).unwrap();
    assert!(child.0.load(Ordering::SeqCst));
}

#[test]
fn test_saving_throw_tree_approximation() {
    let encounter = arena();
    let save = SavingThrow::new(14).with_save_stat(StatCategory::from_str("DEX"));
    let tree = fireball(Arc::new(save));

    // Ogre saves at +2 against 14: failure 0.5, success 0.4, crits 0.05.
    // 20 * 0.5 + 20 * 0.05 + 10 * 0.4 = 15
    let ctx = ActionContext::new("wizard", Target::entity("ogre"), "fireball");
    let approx = tree.approximate(&ctx, &encounter).unwrap();
    assert_eq!(approx.damage_to(&id("ogre")), 15);
    assert_eq!(approx.kill_chance_of(&id("ogre")), 0.0);

    // Approximating leaves the world untouched.
    assert_eq!(health(&encounter, "ogre"), 40);
}

#[test]
fn test_area_tree_skips_targets_without_vitals() {
    let mut encounter = arena();
    let downed = Rc::new(Cell::new(0));
    let sink = Rc::clone(&downed);
    encounter
        .bus()
        .subscribe(Scope::Any, move |_: &CharacterDowned| sink.set(sink.get() + 1));

    let tree = ActionNode::builder("fireball")
        .with_targeting(Arc::new(FixedTargets(vec![
            Target::entity("ogre"),
            Target::entity("statue"),
            Target::entity("imp"),
        ])))
        .with_roll(Arc::new(Forced(Outcome::Failure)))
        .on_failure(damage("full", 20))
        .build();
    let action = GameAction::new("fireball").with_child(Arc::new(tree));

    let ctx = action.context("wizard", Target::entity("ogre"));
    action.execute(&ctx, &mut encounter).unwrap();
    action.execute(&ctx, &mut encounter).unwrap();

    assert_eq!(health(&encounter, "ogre"), 0);
    assert_eq!(health(&encounter, "imp"), 0);
    assert_eq!(downed.get(), 2);

    let approx = action.approximate(&ctx, &encounter).unwrap();
    assert!(approx.is_empty());
}

#[test]
fn test_trigger_fires_once_per_traversal() {
    let mut encounter = arena();
    let thorns: Arc<dyn Action> = Arc::new(OncePerTarget(DealDamage::new(3, DamageType::True)));
    let action = GameAction::new("double_strike")
        .with_child(Arc::new(
            ActionNode::builder("first").always(Arc::clone(&thorns)).build(),
        ))
        .with_child(Arc::new(
            ActionNode::builder("second").always(Arc::clone(&thorns)).build(),
        ));

    action
        .execute(&action.context("wizard", Target::entity("imp")), &mut encounter)
        .unwrap();
    assert_eq!(health(&encounter, "imp"), 37);

    // A fresh context starts a fresh traversal.
    action
        .execute(&action.context("wizard", Target::entity("imp")), &mut encounter)
        .unwrap();
    assert_eq!(health(&encounter, "imp"), 34);
}

#[test]
fn test_attack_then_effect_tree() {
    let mut encounter = arena();
    let sunder = StatusEffect::new("sundered").with_modifier(
        StatCategory::armor_class(),
        ModifierKind::Flat {
            value: StatValue::Int(-3),
        },
    );
    let tree = ActionNode::builder("sunder")
        .with_roll(Arc::new(Forced(Outcome::CriticalSuccess)))
        .on_critical_success(Arc::new(
            ActionNode::builder("crack")
                .with_effect(Arc::new(ApplyEffect(sunder)))
                .build(),
        ))
        .build();

    let ctx = ActionContext::new("wizard", Target::entity("ogre"), "sunder");
    let approx = tree.approximate(&ctx, &encounter).unwrap();
    assert_eq!(approx.effect_chance(&id("ogre"), "sundered"), 1.0);

    tree.execute(&ctx, &mut encounter).unwrap();
    let ogre = encounter.character(&id("ogre")).unwrap();
    assert!(ogre.has_effect("sundered"));
    assert_eq!(
        ogre.stat_value(&StatCategory::armor_class()).unwrap(),
        StatValue::Int(10)
    );
}

#[test]
fn test_skipped_effect_still_runs_children() {
    let mut encounter = arena();
    let marker = Arc::new(Marker::default());
    let node = ActionNode::builder("smash")
        .with_effect(Arc::new(DealDamage::new(5, DamageType::Physical)))
        .always(marker.clone())
        .build();

    // The statue has no vitals, so the damage is skipped but the child is not.
    let ctx = ActionContext::new("wizard", Target::entity("statue"), "smash");
    let approx = node.approximate(&ctx, &encounter).unwrap();
    assert_eq!(approx.damage_to(&id("statue")), 0);
    assert_eq!(approx.damage_to(&id("imp")), 1);

    node.execute(&ctx, &mut encounter).unwrap();
    assert!(marker.0.load(Ordering::SeqCst));
}

#[test]
fn test_failed_child_does_not_stop_siblings() {
    let mut encounter = arena();
    let marker = Arc::new(Marker::default());
    let node = ActionNode::builder("combo")
        .always(Arc::new(Vanished))
        .always(marker.clone())
        .build();

    let ctx = ActionContext::new("wizard", Target::entity("ogre"), "combo");
    let approx = node.approximate(&ctx, &encounter).unwrap();
    assert_eq!(approx.damage_to(&id("imp")), 1);

    node.execute(&ctx, &mut encounter).unwrap();
    assert!(marker.0.load(Ordering::SeqCst));
}
