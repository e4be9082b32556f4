//! marine-sens-core: Core services and contracts for marine-sens.
//!
//! This crate contains the conversion registry, the configuration provider
//! contract, injectable clocks, explicit schedulers and shared constants.

pub mod clock;
pub mod constants;
pub mod conversion;
pub mod provider;
pub mod scheduler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use conversion::{Conversion, ConversionError, ConversionRegistry, Format, Presentation};
pub use provider::{decode_record, ConfigProvider, ConfigStoreError, MemoryConfigStore};
pub use scheduler::{Debouncer, PeriodicTask};

// Re-export the data model for convenience
pub use marine_sens_types as types;
