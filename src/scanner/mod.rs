pub mod discount_scanner;

pub use discount_scanner::{
    gap_alert, DiscountScanner, ScanAction, ScanReport, ScannerSettings, SkipReason,
    TrackedConflict, TrackedRetreat,
};
