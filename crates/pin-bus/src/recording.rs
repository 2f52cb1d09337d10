//! A [`PanelBus`](crate::PanelBus) that records every transaction verbatim,
//! for tests asserting on the exact init/refresh command sequence and
//! busy-wait deadlines the panel driver issues.

use crate::PanelBus;
use anyhow::Result;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusTransaction {
    Reset,
    Command(u8),
    Data(u8),
    MultipleData(Vec<u8>),
    WaitIdle,
    Delay(u32),
}

#[derive(Default)]
pub struct RecordingBus {
    log: Mutex<Vec<BusTransaction>>,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transactions(&self) -> Vec<BusTransaction> {
        self.log.lock().expect("recording bus poisoned").clone()
    }
}

impl PanelBus for RecordingBus {
    fn reset(&mut self) -> Result<()> {
        self.log.lock().expect("recording bus poisoned").push(BusTransaction::Reset);
        Ok(())
    }

    fn send_command(&mut self, command: u8) -> Result<()> {
        self.log
            .lock()
            .expect("recording bus poisoned")
            .push(BusTransaction::Command(command));
        Ok(())
    }

    fn send_data(&mut self, byte: u8) -> Result<()> {
        self.log.lock().expect("recording bus poisoned").push(BusTransaction::Data(byte));
        Ok(())
    }

    fn send_multiple_data(&mut self, data: &[u8]) -> Result<()> {
        self.log
            .lock()
            .expect("recording bus poisoned")
            .push(BusTransaction::MultipleData(data.to_vec()));
        Ok(())
    }

    fn wait_until_idle(&mut self) {
        self.log.lock().expect("recording bus poisoned").push(BusTransaction::WaitIdle);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.log.lock().expect("recording bus poisoned").push(BusTransaction::Delay(ms));
    }
}
