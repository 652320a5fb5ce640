/*!
 * # cuedub
 *
 * Dubs the timed transcript of a content item into time-aligned speech
 * tracks in other languages.
 *
 * ## Pipeline
 *
 * For every (content item, target language) pair:
 *
 * 1. `transcript`: load the source-language cues
 * 2. `segmenter`: merge cues into units bounded by duration and length
 * 3. `translation`: translate every unit with retry and pacing
 * 4. `synthesis`: voice each unit in engine-sized chunks
 * 5. `alignment`: pad each clip with silence to follow the source timeline
 * 6. `assembler`: concatenate the unit clips into the final track
 *
 * Every stage result is persisted through `artifacts`, so interrupted runs
 * resume where they stopped and finished runs make no external calls.
 *
 * ## Other modules
 *
 * - `app_config`: configuration management
 * - `app_controller`: batch driver with per-item and per-language isolation
 * - `pipeline`: one language run of one content item
 * - `providers`: LLM clients and test doubles
 * - `audio`: WAV clips
 * - `errors`: error types
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod alignment;
pub mod app_config;
pub mod app_controller;
pub mod artifacts;
pub mod assembler;
pub mod audio;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod numerals;
pub mod pipeline;
pub mod providers;
pub mod segmenter;
pub mod shutdown;
pub mod synthesis;
pub mod transcript;
pub mod translation;
pub mod units;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{BatchReport, Controller};
pub use errors::{AudioError, DubError, ProviderError, TranscriptError};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use pipeline::{LanguageOutcome, LanguagePipeline};
