//! Shared helpers for the integration suites.
#![allow(dead_code)]

use perpbook_rs::engine::Engine;
use perpbook_rs::settlement::{InstructionReceiver, SettlementInstruction, instruction_channel};

pub const MARKET: &str = "YES_TARIFF";

/// An engine wired to a captive settlement outbox.
pub fn engine() -> (Engine, InstructionReceiver) {
    let (tx, rx) = instruction_channel();
    (Engine::new(MARKET, tx), rx)
}

/// Drain every instruction queued so far.
pub fn drain(rx: &mut InstructionReceiver) -> Vec<SettlementInstruction> {
    let mut out = Vec::new();
    while let Ok(instruction) = rx.try_recv() {
        out.push(instruction);
    }
    out
}
