//! Mixing Session Engine
//!
//! Holds the one recipe the station is working on and walks the operator
//! through it ingredient by ingredient.
//!
//! # State machine
//!
//! ```text
//!            on_recipe_detected            start_mix
//!  IDLE ─────────────────────────▶ READY ─────────────▶ ACTIVE ──┐
//!   ▲                               │  ▲                 │  ▲     │ next_ingredient
//!   │                    cancel_mix │  │ new recipe      │  └─────┘ (more left)
//!   │                               ▼  │                 │
//!   │                          CANCELLED ◀───────────────┤ cancel_mix
//!   │                                                    │
//!   │                          COMPLETED ◀───────────────┘ next_ingredient (last)
//!   └── COMPLETED / CANCELLED accept the next detected recipe (→ READY)
//! ```
//!
//! Every transition and every rejection is published on the [`EventBus`]
//! while the engine lock is held, so observers see events in the same order
//! as the transitions happened.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use shared::message::{StationEvent, WeightUpdate};
use shared::mix::{CommandResponse, MixCommand, MixCommandPayload};
use shared::models::{Classification, MixingSession, Recipe, SessionState};
use shared::util::now_millis;
use tokio::sync::mpsc;

use super::error::{MixError, MixResult};
use crate::message::EventBus;

/// Optional operator context for [`MixingEngine::start_mix_with`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartOptions {
    pub operator_id: Option<String>,
    pub operator_name: Option<String>,
    /// Overrides the mix type printed on the ticket
    pub mix_type: Option<String>,
}

struct EngineInner {
    state: SessionState,
    recipe: Option<Recipe>,
    /// Present in READY, ACTIVE and COMPLETED
    session: Option<MixingSession>,
}

impl EngineInner {
    fn new() -> Self {
        Self {
            state: SessionState::Idle,
            recipe: None,
            session: None,
        }
    }
}

/// Single-session mixing engine
///
/// All operations are synchronous and short; callers on async tasks can use
/// them directly.
pub struct MixingEngine {
    inner: Mutex<EngineInner>,
    bus: Arc<EventBus>,
    default_tolerance: Decimal,
    /// Completed sessions are handed off here
    archive_tx: Option<mpsc::UnboundedSender<MixingSession>>,
}

impl fmt::Debug for MixingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MixingEngine")
            .field("state", &self.state())
            .field("default_tolerance", &self.default_tolerance)
            .field("archive", &self.archive_tx.is_some())
            .finish()
    }
}

impl MixingEngine {
    pub fn new(bus: Arc<EventBus>, default_tolerance: Decimal) -> Self {
        Self {
            inner: Mutex::new(EngineInner::new()),
            bus,
            default_tolerance,
            archive_tx: None,
        }
    }

    /// Hand completed sessions to an archive consumer
    pub fn with_archive(mut self, archive_tx: mpsc::UnboundedSender<MixingSession>) -> Self {
        self.archive_tx = Some(archive_tx);
        self
    }

    pub fn default_tolerance(&self) -> Decimal {
        self.default_tolerance
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    /// Current session, if any (READY, ACTIVE or COMPLETED)
    pub fn snapshot(&self) -> Option<MixingSession> {
        self.inner.lock().session.clone()
    }

    /// Recipe currently targeted
    pub fn recipe(&self) -> Option<Recipe> {
        self.inner.lock().recipe.clone()
    }

    /// Load a freshly parsed recipe as the new target
    ///
    /// Refused while a session is ACTIVE; any other state is replaced and the
    /// engine becomes READY.
    pub fn on_recipe_detected(&self, recipe: Recipe) -> MixResult<()> {
        let mut inner = self.inner.lock();

        if !inner.state.accepts_recipe() {
            let active = inner
                .session
                .as_ref()
                .map(|s| s.recipe_id.clone())
                .unwrap_or_default();
            tracing::warn!(recipe = %recipe.number, active = %active, "Recipe refused, session in progress");
            return Err(self.reject(MixError::SessionInProgress(active)));
        }
        if recipe.ingredient_count() == 0 {
            return Err(self.reject(MixError::EmptyRecipe(recipe.number.clone())));
        }

        let tolerance = recipe
            .tolerance
            .filter(|t| !t.is_sign_negative())
            .unwrap_or(self.default_tolerance);
        let session = MixingSession::from_recipe(&recipe, tolerance);

        tracing::info!(
            recipe = %recipe.number,
            ingredients = session.ingredients.len(),
            total = %session.total_weight,
            %tolerance,
            previous = %inner.state,
            "Recipe loaded"
        );

        inner.state = SessionState::Ready;
        inner.session = Some(session);
        inner.recipe = Some(recipe.clone());
        self.bus.publish(StationEvent::RecipeDetected(recipe));
        Ok(())
    }

    /// Start weighing the loaded recipe
    pub fn start_mix(&self, recipe_id: &str) -> MixResult<MixingSession> {
        self.start_mix_with(recipe_id, StartOptions::default())
    }

    /// Start weighing the loaded recipe with operator context
    ///
    /// Only valid in READY, and `recipe_id` must match the loaded recipe.
    pub fn start_mix_with(&self, recipe_id: &str, options: StartOptions) -> MixResult<MixingSession> {
        let mut inner = self.inner.lock();

        match inner.state {
            SessionState::Ready => {}
            SessionState::Idle | SessionState::Cancelled => {
                return Err(self.reject(MixError::NoRecipe));
            }
            state => {
                return Err(self.reject(MixError::InvalidState {
                    command: "start_mix",
                    state,
                }));
            }
        }

        let Some(session) = inner.session.as_mut() else {
            return Err(self.reject(MixError::NoRecipe));
        };
        if session.recipe_id != recipe_id {
            return Err(self.reject(MixError::RecipeMismatch {
                loaded: session.recipe_id.clone(),
                requested: recipe_id.to_string(),
            }));
        }

        session.state = SessionState::Active;
        session.current_index = Some(0);
        session.accumulated_weight = Decimal::ZERO;
        session.last_reading = None;
        session.started_at = Some(now_millis());
        session.operator_id = options.operator_id;
        session.operator_name = options.operator_name;
        if options.mix_type.is_some() {
            session.mix_type = options.mix_type;
        }
        let started = session.clone();
        inner.state = SessionState::Active;

        tracing::info!(
            recipe = %started.recipe_id,
            session_id = %started.session_id,
            operator = ?started.operator_name,
            "Mixing session started"
        );
        self.bus.publish(StationEvent::SessionStarted(started.clone()));
        Ok(started)
    }

    /// Record the latest scale reading against the current ingredient
    ///
    /// Outside ACTIVE the reading is ignored: no state change, no event.
    pub fn record_weight(&self, weight: Decimal) -> Option<WeightUpdate> {
        let mut inner = self.inner.lock();
        if inner.state != SessionState::Active {
            tracing::trace!(state = %inner.state, %weight, "Weight reading ignored");
            return None;
        }

        let session = inner.session.as_mut()?;
        let index = session.current_index?;
        let ingredient = session.ingredients.get(index)?;
        let target = ingredient.target_weight;
        let code = ingredient.code.clone();
        let tolerance = session.tolerance;

        session.last_reading = Some(weight);

        let update = WeightUpdate {
            recipe_id: session.recipe_id.clone(),
            index,
            code,
            weight,
            target,
            tolerance,
            lower: target - tolerance,
            upper: target + tolerance,
            within_tolerance: Classification::classify(weight - target, tolerance).is_within(),
        };
        self.bus.publish(StationEvent::WeightUpdated(update.clone()));
        Some(update)
    }

    /// Commit the latest reading for the current ingredient and advance
    ///
    /// Committing the last ingredient completes the session: final weight,
    /// difference and classification are computed, the session is published
    /// and handed off to the archive.
    pub fn next_ingredient(&self) -> MixResult<MixingSession> {
        let mut inner = self.inner.lock();
        if inner.state != SessionState::Active {
            let state = inner.state;
            return Err(self.reject(MixError::InvalidState {
                command: "next_ingredient",
                state,
            }));
        }

        let Some(session) = inner.session.as_mut() else {
            return Err(self.reject(MixError::NoRecipe));
        };
        let Some(index) = session.current_index else {
            return Err(self.reject(MixError::InvalidState {
                command: "next_ingredient",
                state: session.state,
            }));
        };
        let code = session
            .ingredients
            .get(index)
            .map(|i| i.code.clone())
            .unwrap_or_default();
        let Some(weight) = session.last_reading else {
            return Err(self.reject(MixError::NoReading(code)));
        };
        if weight < Decimal::ZERO {
            return Err(self.reject(MixError::InvalidWeight(weight)));
        }

        if let Some(ingredient) = session.ingredients.get_mut(index) {
            ingredient.weighed = Some(weight);
        }
        session.accumulated_weight += weight;
        session.last_reading = None;

        if !session.is_last_ingredient() {
            session.current_index = Some(index + 1);
            tracing::debug!(
                recipe = %session.recipe_id,
                %code,
                %weight,
                accumulated = %session.accumulated_weight,
                next = index + 1,
                "Ingredient committed"
            );
            return Ok(session.clone());
        }

        let final_weight = session.accumulated_weight;
        let difference = final_weight - session.total_weight;
        let classification = Classification::classify(difference, session.tolerance);

        session.final_weight = Some(final_weight);
        session.difference = Some(difference);
        session.classification = Some(classification);
        session.current_index = None;
        session.state = SessionState::Completed;
        session.completed_at = Some(now_millis());
        let completed = session.clone();
        inner.state = SessionState::Completed;

        tracing::info!(
            recipe = %completed.recipe_id,
            %final_weight,
            %difference,
            ?classification,
            "Mixing session completed"
        );
        self.bus.publish(StationEvent::SessionCompleted(completed.clone()));
        self.hand_off(completed.clone());
        Ok(completed)
    }

    /// Abort the current session
    ///
    /// Never fails. From READY or ACTIVE everything is discarded and the engine
    /// becomes CANCELLED. From COMPLETED the finished session (already handed
    /// off) is cleared and the engine returns to IDLE without a cancel event.
    /// IDLE and CANCELLED are no-ops. Returns whether the state changed.
    pub fn cancel_mix(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            SessionState::Ready | SessionState::Active => {
                let recipe_id = inner.session.take().map(|s| s.recipe_id);
                inner.recipe = None;
                let previous = inner.state;
                inner.state = SessionState::Cancelled;

                tracing::info!(recipe = ?recipe_id, %previous, "Mixing session cancelled");
                self.bus.publish(StationEvent::SessionCancelled { recipe_id });
                true
            }
            SessionState::Completed => {
                let recipe_id = inner.session.take().map(|s| s.recipe_id);
                inner.recipe = None;
                inner.state = SessionState::Idle;

                tracing::info!(recipe = ?recipe_id, "Completed session cleared");
                true
            }
            state => {
                tracing::debug!(%state, "Nothing to cancel");
                false
            }
        }
    }

    /// Execute an operator command and build its response
    pub fn execute(&self, cmd: MixCommand) -> CommandResponse {
        let MixCommand {
            command_id,
            payload,
        } = cmd;
        tracing::debug!(command_id = %command_id, payload = ?payload, "Processing mix command");

        let result = match payload {
            MixCommandPayload::StartMix {
                recipe_id,
                operator_id,
                operator_name,
                mix_type,
            } => self
                .start_mix_with(
                    &recipe_id,
                    StartOptions {
                        operator_id,
                        operator_name,
                        mix_type,
                    },
                )
                .map(Some),
            MixCommandPayload::NextIngredient => self.next_ingredient().map(Some),
            MixCommandPayload::RecordWeight { weight } => {
                self.record_weight(weight);
                Ok(None)
            }
            MixCommandPayload::CancelMix => {
                self.cancel_mix();
                Ok(None)
            }
        };

        match result {
            Ok(Some(session)) => CommandResponse::success(command_id, session.state, Some(session)),
            Ok(None) => {
                let (state, session) = self.current();
                CommandResponse::success(command_id, state, session)
            }
            Err(err) => CommandResponse::error(command_id, self.state(), err.into()),
        }
    }

    fn current(&self) -> (SessionState, Option<MixingSession>) {
        let inner = self.inner.lock();
        (inner.state, inner.session.clone())
    }

    /// Publish a rejection and hand the error back
    fn reject(&self, err: MixError) -> MixError {
        tracing::warn!(error = %err, code = ?err.code(), "Mix command rejected");
        self.bus.publish(StationEvent::session_error(err.to_string()));
        err
    }

    fn hand_off(&self, session: MixingSession) {
        let Some(tx) = &self.archive_tx else {
            return;
        };
        if tx.send(session).is_err() {
            tracing::warn!("Archive channel closed, completed session not archived");
        }
    }
}
