//! Busy times of write-class commands.

use serde::{Deserialize, Serialize};

use crate::common::{Nanos, ms, s, us};

/// Baseline busy times (M25P80 typical values).
mod defaults {
    use super::{Nanos, ms, s, us};

    pub const PAGE_PROGRAM: Nanos = us(1_400);
    pub const WRITE_STATUS: Nanos = ms(5);
    pub const SECTOR_ERASE: Nanos = s(1);
    pub const BULK_ERASE: Nanos = s(10);
}

/// How long each write-class command keeps WIP set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashTimings {
    /// Page program (PP).
    #[serde(default = "FlashTimings::default_page_program")]
    pub page_program_ns: Nanos,
    /// Write status register (WRSR).
    #[serde(default = "FlashTimings::default_write_status")]
    pub write_status_ns: Nanos,
    /// Sector erase (SE).
    #[serde(default = "FlashTimings::default_sector_erase")]
    pub sector_erase_ns: Nanos,
    /// Bulk erase (BE).
    #[serde(default = "FlashTimings::default_bulk_erase")]
    pub bulk_erase_ns: Nanos,
}

impl FlashTimings {
    const fn default_page_program() -> Nanos {
        defaults::PAGE_PROGRAM
    }
    const fn default_write_status() -> Nanos {
        defaults::WRITE_STATUS
    }
    const fn default_sector_erase() -> Nanos {
        defaults::SECTOR_ERASE
    }
    const fn default_bulk_erase() -> Nanos {
        defaults::BULK_ERASE
    }
}

impl Default for FlashTimings {
    fn default() -> Self {
        Self {
            page_program_ns: defaults::PAGE_PROGRAM,
            write_status_ns: defaults::WRITE_STATUS,
            sector_erase_ns: defaults::SECTOR_ERASE,
            bulk_erase_ns: defaults::BULK_ERASE,
        }
    }
}
