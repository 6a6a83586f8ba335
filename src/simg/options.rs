use crate::simg::error::SparseError;

/// Default merge window: 1 MiB
pub const DEFAULT_ALIGNMENT_KIB: u32 = 1024;

/// Options for a re-chunking pass
#[derive(Debug, Clone)]
pub struct RechunkOptions {
    /// Merge window capacity in KiB
    pub alignment_unit_kib: u32,
}

impl Default for RechunkOptions {
    fn default() -> Self {
        Self {
            alignment_unit_kib: DEFAULT_ALIGNMENT_KIB,
        }
    }
}

impl RechunkOptions {
    pub fn with_alignment_kib(alignment_unit_kib: u32) -> Self {
        Self { alignment_unit_kib }
    }

    /// Window capacity in bytes
    pub fn alignment_bytes(&self) -> Result<u32, SparseError> {
        if self.alignment_unit_kib == 0 {
            return Err(SparseError::InvalidAlignment(self.alignment_unit_kib));
        }
        self.alignment_unit_kib
            .checked_mul(1024)
            .ok_or(SparseError::InvalidAlignment(self.alignment_unit_kib))
    }
}
