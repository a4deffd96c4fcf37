use super::*;
use crate::message::{EventBus, EventSubscriber};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use shared::message::StationEvent;
use shared::mix::{CommandErrorCode, MixCommand};
use shared::models::{
    Classification, IngredientTarget, Layer, MixingSession, Recipe, RecipeMeta, SessionState,
};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;


fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// Collects every published event
#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<StationEvent>>,
}

impl Recorder {
    fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(StationEvent::kind).collect()
    }

    fn count(&self) -> usize {
        self.events.lock().len()
    }

    fn last(&self) -> Option<StationEvent> {
        self.events.lock().last().cloned()
    }
}

impl EventSubscriber for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn on_event(&self, event: &StationEvent) {
        self.events.lock().push(event.clone());
    }
}

fn create_test_engine() -> (MixingEngine, Arc<Recorder>) {
    let bus = Arc::new(EventBus::new());
    let recorder = Arc::new(Recorder::default());
    bus.add_subscriber(recorder.clone());
    (MixingEngine::new(bus, dec("0.5")), recorder)
}

fn create_engine_with_archive() -> (
    MixingEngine,
    Arc<Recorder>,
    mpsc::UnboundedReceiver<MixingSession>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (engine, recorder) = create_test_engine();
    (engine.with_archive(tx), recorder, rx)
}

fn ingredient(order: u32, sku: &str, grams: &str) -> IngredientTarget {
    IngredientTarget {
        order,
        sku: sku.to_string(),
        target_weight: dec(grams),
    }
}

fn recipe(number: &str, layers: Vec<Layer>) -> Recipe {
    Recipe {
        number: number.to_string(),
        history: None,
        meta: RecipeMeta::default(),
        tolerance: None,
        mix_type: None,
        layers,
    }
}

/// Recipe 42: one layer "Base", kt-1400 50.0 g then kt-1100 50.0 g
fn sample_recipe() -> Recipe {
    recipe(
        "42",
        vec![Layer {
            name: "Base".to_string(),
            ingredients: vec![ingredient(1, "kt-1400", "50.0"), ingredient(2, "kt-1100", "50.0")],
        }],
    )
}

/// Single ingredient recipe, handy for tolerance checks
fn single_recipe(number: &str, grams: &str) -> Recipe {
    recipe(
        number,
        vec![Layer {
            name: "Base".to_string(),
            ingredients: vec![ingredient(1, "kt-1400", grams)],
        }],
    )
}

/// Load `recipe` and start it
fn start_active(engine: &MixingEngine, recipe: Recipe) -> MixingSession {
    let id = recipe.number.clone();
    engine.on_recipe_detected(recipe).unwrap();
    engine.start_mix(&id).unwrap()
}

/// Record one reading and commit it
fn weigh(engine: &MixingEngine, grams: &str) -> MixingSession {
    engine.record_weight(dec(grams)).expect("engine is active");
    engine.next_ingredient().unwrap()
}
