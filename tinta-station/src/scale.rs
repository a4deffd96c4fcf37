//! Scale feed
//!
//! The scale driver lives outside this service. It pushes [`WeightReading`]s
//! through a [`ScaleHandle`]; [`ScaleFeed`] forwards them to the engine in
//! arrival order. Readings arriving outside an active session are ignored by
//! the engine itself.

use std::sync::Arc;

use shared::models::WeightReading;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::mixing::MixingEngine;

/// Producer side handed to the scale driver
///
/// Never blocks and never drops: readings are queued in arrival order so the
/// value on the scale when the operator commits is always the one the engine
/// has seen last.
#[derive(Debug, Clone)]
pub struct ScaleHandle {
    tx: mpsc::UnboundedSender<WeightReading>,
}

impl ScaleHandle {
    /// Queue a reading. Returns `false` once the feed has stopped.
    pub fn push(&self, reading: WeightReading) -> bool {
        if self.tx.send(reading).is_err() {
            tracing::debug!(weight = %reading.weight, "Scale feed closed, reading discarded");
            return false;
        }
        true
    }
}

/// Build a connected handle / receiver pair
pub fn channel() -> (ScaleHandle, mpsc::UnboundedReceiver<WeightReading>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ScaleHandle { tx }, rx)
}

/// Forwards scale readings to the engine
pub struct ScaleFeed {
    engine: Arc<MixingEngine>,
}

impl ScaleFeed {
    pub fn new(engine: Arc<MixingEngine>) -> Self {
        Self { engine }
    }

    pub async fn run(
        self,
        mut rx: mpsc::UnboundedReceiver<WeightReading>,
        shutdown: CancellationToken,
    ) {
        tracing::info!("Scale feed started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Scale feed received shutdown signal");
                    break;
                }
                reading = rx.recv() => {
                    let Some(reading) = reading else {
                        tracing::info!("Scale channel closed, scale feed stopping");
                        break;
                    };
                    self.engine.record_weight(reading.weight);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::EventBus;
    use rust_decimal::Decimal;
    use shared::models::{IngredientTarget, Layer, Recipe, RecipeMeta, SessionState};

    fn engine() -> Arc<MixingEngine> {
        Arc::new(MixingEngine::new(Arc::new(EventBus::new()), Decimal::new(5, 1)))
    }

    fn recipe() -> Recipe {
        Recipe {
            number: "42".into(),
            history: None,
            meta: RecipeMeta::default(),
            tolerance: None,
            mix_type: None,
            layers: vec![Layer {
                name: "Base".into(),
                ingredients: vec![IngredientTarget {
                    order: 1,
                    sku: "kt-1400".into(),
                    target_weight: Decimal::new(500, 1),
                }],
            }],
        }
    }

    #[tokio::test]
    async fn test_readings_reach_active_session_in_order() {
        let engine = engine();
        engine.on_recipe_detected(recipe()).unwrap();
        engine.start_mix("42").unwrap();

        let (handle, rx) = channel();
        for w in [10, 25, 49] {
            assert!(handle.push(WeightReading::new(Decimal::from(w))));
        }
        drop(handle);

        ScaleFeed::new(Arc::clone(&engine))
            .run(rx, CancellationToken::new())
            .await;

        assert_eq!(
            engine.snapshot().unwrap().last_reading,
            Some(Decimal::from(49))
        );
    }

    #[tokio::test]
    async fn test_readings_ignored_when_idle() {
        let engine = engine();
        let (handle, rx) = channel();
        assert!(handle.push(WeightReading::new(Decimal::from(5))));
        drop(handle);

        ScaleFeed::new(Arc::clone(&engine))
            .run(rx, CancellationToken::new())
            .await;

        assert_eq!(engine.state(), SessionState::Idle);
        assert!(engine.snapshot().is_none());
    }

    #[tokio::test]
    async fn test_burst_of_readings_commits_the_newest() {
        let engine = engine();
        engine.on_recipe_detected(recipe()).unwrap();
        engine.start_mix("42").unwrap();

        let (handle, rx) = channel();
        for w in 1..=500 {
            assert!(handle.push(WeightReading::new(Decimal::from(w))));
        }
        drop(handle);

        ScaleFeed::new(Arc::clone(&engine))
            .run(rx, CancellationToken::new())
            .await;

        let session = engine.next_ingredient().unwrap();
        assert_eq!(session.ingredients[0].weighed, Some(Decimal::from(500)));
    }

    #[test]
    fn test_push_after_feed_stopped() {
        let (handle, rx) = channel();
        drop(rx);
        assert!(!handle.push(WeightReading::new(Decimal::ONE)));
    }
}
