//! Segue core types.
//!
//! Shared data model and collaborator seams for the segue auto-mix engine:
//! track metadata, deck state, typed control events, learned controller
//! mappings, and engine configuration. The decision/timing logic itself
//! lives in `segue-engine`.

pub use config::{
    ConfigError, ConfigFile, ConfigManager, ConfigOption, ConfigSchema, Settings, StyleOverride,
    StyleOverrides,
};
pub use controls::{ControlBus, ControlEvent, ControlId, ControlValue, Subscription};
pub use deck::{Deck, DeckId};
pub use mapping::{
    ControlBinding, ControlMap, ControlMapping, JsonFileMappingStore, MappingStore,
    MappingStoreError, MemoryMappingStore,
};
pub use track::{SectionKind, SectionSpan, Structure, Track, TrackId, TrackType};

mod config;
mod controls;
mod deck;
mod mapping;
mod track;
