//! Two teams fight it out under AI control.
//!
//! Run with `RUST_LOG=zzcombat=debug` to see every roll and target.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use zzcombat::*;

const DEFINITIONS: &str = include_str!("skirmish.json");
const MAX_ROUNDS: usize = 12;

fn main() -> Result<(), CombatError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = EncounterConfig::from_json(r#"{ "seed": 7, "max_actions_per_turn": 2 }"#)?;
    let grid: Arc<dyn SpatialQuery> =
        Arc::new(OccupancyGrid::new().with_bounds(Tile::new(-4, -4, 0), Tile::new(6, 6, 0)));

    let defs = DefinitionSet::from_json(DEFINITIONS)?;
    let library = ActionLibrary::build(&defs, Some(Arc::clone(&grid)))?;
    let mut encounter = Encounter::new(config);
    library.populate(&mut encounter)?;

    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    encounter.bus().subscribe(Scope::Any, move |e: &DamageTaken| {
        sink.borrow_mut()
            .push(format!("  {} takes {} from {}", e.target, e.amount, e.source));
    });
    let sink = Rc::clone(&log);
    encounter.bus().subscribe(Scope::Any, move |e: &Healed| {
        sink.borrow_mut()
            .push(format!("  {} heals {} for {}", e.source, e.target, e.amount));
    });
    let sink = Rc::clone(&log);
    encounter.bus().subscribe(Scope::Any, move |e: &CharacterDowned| {
        sink.borrow_mut().push(format!("  {} is down!", e.entity));
    });

    let ai = CharacterAi::weighted(&encounter, grid);
    for round in 1..=MAX_ROUNDS {
        println!("Round {}", round);
        for actor in encounter.character_ids() {
            let taken = ai.take_turn(&mut encounter, &actor)?;
            for evaluation in &taken {
                println!(
                    "{} uses {} on {} (score {:.2})",
                    actor,
                    evaluation.action.name(),
                    evaluation.target.entity,
                    evaluation.score
                );
            }
            for line in log.borrow_mut().drain(..) {
                println!("{}", line);
            }
        }
        encounter.regenerate_all()?;

        let standing: Vec<&Character> = encounter.characters().filter(|c| c.is_alive()).collect();
        let teams_left = standing
            .iter()
            .filter_map(|c| c.team())
            .collect::<std::collections::BTreeSet<_>>();
        if teams_left.len() <= 1 {
            match teams_left.first() {
                Some(team) => println!("{} win after {} rounds", team, round),
                None => println!("Nobody is left standing"),
            }
            break;
        }
    }

    for character in encounter.characters() {
        if let Ok(vitals) = character.vitals() {
            println!(
                "{:>8}: {}/{}",
                character.name(),
                vitals.current_health(),
                vitals.max_health()
            );
        }
    }
    encounter.teardown();
    Ok(())
}
