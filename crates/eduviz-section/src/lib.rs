//! Section Processor (C6): turns one outline `Section` into rendered,
//! narrated video by driving TTS, the Animation Agent, the renderer, and
//! the no-cut A/V merge in sequence (spec §4.6).

pub mod error;
pub mod processor;

pub use error::{SectionError, SectionResult};
pub use processor::{process_section, ProcessedSection, SectionConfig};
