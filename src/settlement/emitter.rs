//! Fire-and-forget settlement emission.
//!
//! The matching path pushes [`SettlementInstruction`]s into an unbounded
//! channel and moves on; [`run_emitter`] drains the channel and drives the
//! port with bounded retries. A port failure is logged and dropped after
//! the last attempt, never surfaced back into the matching path.

use super::{SettlementError, SettlementInstruction, SettlementPort, scale_margin, scale_price};
use crate::orderbook::Side;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, warn};

/// Attempts per instruction before it is dropped.
const MAX_ATTEMPTS: u32 = 3;

/// Backoff before the first retry; doubled per attempt.
const RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// Sending half of the settlement outbox.
///
/// Cheap to clone; sending never blocks. If the emitter is gone the
/// instruction is logged and dropped, keeping the matching path oblivious
/// to settlement health.
#[derive(Debug, Clone)]
pub struct InstructionSender(mpsc::UnboundedSender<SettlementInstruction>);

/// Receiving half of the settlement outbox, consumed by [`run_emitter`].
pub type InstructionReceiver = mpsc::UnboundedReceiver<SettlementInstruction>;

impl InstructionSender {
    /// Queue an instruction for emission.
    pub fn send(&self, instruction: SettlementInstruction) {
        if let Err(err) = self.0.send(instruction) {
            warn!(
                kind = err.0.kind(),
                id = %err.0.id(),
                "settlement outbox closed; instruction dropped"
            );
        }
    }
}

/// Create the settlement outbox pair.
pub fn instruction_channel() -> (InstructionSender, InstructionReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (InstructionSender(tx), rx)
}

/// Drain the outbox, dispatching each instruction to the port with retries.
///
/// Runs until the channel closes or `shutdown` flips to true.
pub async fn run_emitter(
    mut rx: InstructionReceiver,
    port: Arc<dyn SettlementPort>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let instruction = tokio::select! {
            maybe = rx.recv() => match maybe {
                Some(instruction) => instruction,
                None => break,
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        };

        dispatch_with_retry(port.as_ref(), &instruction).await;
    }
    debug!("settlement emitter stopped");
}

async fn dispatch_with_retry(port: &dyn SettlementPort, instruction: &SettlementInstruction) {
    let mut backoff = RETRY_BACKOFF;
    for attempt in 1..=MAX_ATTEMPTS {
        match dispatch(port, instruction).await {
            Ok(()) => {
                debug!(kind = instruction.kind(), id = %instruction.id(), "settlement instruction sent");
                return;
            }
            Err(err) if attempt < MAX_ATTEMPTS => {
                warn!(
                    kind = instruction.kind(),
                    id = %instruction.id(),
                    attempt,
                    %err,
                    "settlement dispatch failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
            Err(err) => {
                error!(
                    kind = instruction.kind(),
                    id = %instruction.id(),
                    %err,
                    "settlement dispatch failed permanently"
                );
            }
        }
    }
}

async fn dispatch(
    port: &dyn SettlementPort,
    instruction: &SettlementInstruction,
) -> Result<(), SettlementError> {
    match instruction {
        SettlementInstruction::AddLimitOrder {
            trader,
            side,
            price,
            quantity,
            leverage,
            margin,
            ..
        } => {
            port.add_limit_order(
                trader,
                *leverage,
                scale_margin(*margin),
                price.raw(),
                *quantity,
                *side == Side::Buy,
            )
            .await
        }
        SettlementInstruction::CloseLimitOrder { trader, .. } => {
            port.close_limit_order(trader).await
        }
        SettlementInstruction::FillLimitOrder {
            trader, quantity, ..
        } => port.fill_limit_order(trader, *quantity).await,
        SettlementInstruction::OpenPosition {
            trader,
            side,
            entry_price,
            margin,
            leverage,
            ..
        } => {
            port.open_position(
                trader,
                scale_margin(*margin),
                *leverage,
                *side == Side::Buy,
                scale_price(*entry_price),
            )
            .await
        }
        SettlementInstruction::ClosePosition {
            trader, exit_price, ..
        } => port.close_position(trader, scale_price(*exit_price)).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::Price;
    use crate::settlement::{SettlementCall, SimulatedSettlement};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_emitter_drains_instructions_to_port() {
        let (tx, rx) = instruction_channel();
        let port = Arc::new(SimulatedSettlement::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let emitter = tokio::spawn(run_emitter(rx, port.clone(), shutdown_rx));

        tx.send(SettlementInstruction::AddLimitOrder {
            id: Uuid::new_v4(),
            trader: "0xmaker".to_string(),
            side: Side::Sell,
            price: Price::from_decimal(0.4).unwrap(),
            quantity: 1.0,
            leverage: 2,
            margin: 100.0,
        });
        tx.send(SettlementInstruction::ClosePosition {
            id: Uuid::new_v4(),
            trader: "0xtaker".to_string(),
            exit_price: 0.55,
        });

        // Close the channel so the emitter drains and exits.
        drop(tx);
        emitter.await.unwrap();
        drop(shutdown_tx);

        let calls = port.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(
            &calls[0],
            SettlementCall::AddLimitOrder { trader, price_scaled: 400_000, .. }
                if trader == "0xmaker"
        ));
        assert!(matches!(
            &calls[1],
            SettlementCall::ClosePosition { trader, exit_price_scaled: 550_000 }
                if trader == "0xtaker"
        ));
    }
}
