//! The dual-partition update-slot seam: the alternate partition stays
//! uncommitted — ignored by the bootloader — until the OTA layer
//! explicitly finishes a successful install.

use crate::error::OtaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotValidity {
    Valid,
    PendingVerify,
    Invalid,
}

pub trait UpdateSlots: Send + Sync {
    fn current_version(&self) -> String;
    fn running_slot_validity(&self) -> SlotValidity;
    /// Marks the currently running image valid (boot confirmation).
    fn mark_valid(&self) -> Result<(), OtaError>;
    /// Marks the currently running image invalid, so the bootloader rolls
    /// back to the previous slot on next boot.
    fn mark_invalid(&self) -> Result<(), OtaError>;
    fn write_chunk(&self, offset: u64, data: &[u8]) -> Result<(), OtaError>;
    /// Commits the alternate partition as the new boot target and marks it
    /// pending-verify; only called once a download fully validates.
    fn commit(&self, new_version: String) -> Result<(), OtaError>;
    fn reboot(&self);
}

pub struct SimulatedSlots {
    current_version: std::sync::Mutex<String>,
    validity: std::sync::Mutex<SlotValidity>,
    alternate_bytes: std::sync::Mutex<Vec<u8>>,
    committed: std::sync::Mutex<bool>,
    reboot_count: std::sync::atomic::AtomicU32,
}

impl SimulatedSlots {
    pub fn new(current_version: impl Into<String>) -> Self {
        Self {
            current_version: std::sync::Mutex::new(current_version.into()),
            validity: std::sync::Mutex::new(SlotValidity::Valid),
            alternate_bytes: std::sync::Mutex::new(Vec::new()),
            committed: std::sync::Mutex::new(false),
            reboot_count: std::sync::atomic::AtomicU32::new(0),
        }
    }

    pub fn boot_pending_verify(&self, version: impl Into<String>) -> Self {
        let slots = Self::new(version);
        *slots.validity.lock().expect("slots lock poisoned") = SlotValidity::PendingVerify;
        slots
    }

    pub fn alternate_len(&self) -> usize {
        self.alternate_bytes.lock().expect("slots lock poisoned").len()
    }

    pub fn is_committed(&self) -> bool {
        *self.committed.lock().expect("slots lock poisoned")
    }

    pub fn reboot_count(&self) -> u32 {
        self.reboot_count.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl UpdateSlots for SimulatedSlots {
    fn current_version(&self) -> String {
        self.current_version.lock().expect("slots lock poisoned").clone()
    }

    fn running_slot_validity(&self) -> SlotValidity {
        *self.validity.lock().expect("slots lock poisoned")
    }

    fn mark_valid(&self) -> Result<(), OtaError> {
        *self.validity.lock().expect("slots lock poisoned") = SlotValidity::Valid;
        Ok(())
    }

    fn mark_invalid(&self) -> Result<(), OtaError> {
        *self.validity.lock().expect("slots lock poisoned") = SlotValidity::Invalid;
        Ok(())
    }

    fn write_chunk(&self, _offset: u64, data: &[u8]) -> Result<(), OtaError> {
        self.alternate_bytes.lock().expect("slots lock poisoned").extend_from_slice(data);
        Ok(())
    }

    fn commit(&self, new_version: String) -> Result<(), OtaError> {
        *self.committed.lock().expect("slots lock poisoned") = true;
        *self.current_version.lock().expect("slots lock poisoned") = new_version;
        *self.validity.lock().expect("slots lock poisoned") = SlotValidity::PendingVerify;
        Ok(())
    }

    fn reboot(&self) {
        self.reboot_count.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}
