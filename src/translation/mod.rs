/*!
 * Translation of segmentation units.
 *
 * - `service`: LLM-backed [`Translator`](crate::providers::Translator) for the configured provider
 * - `gateway`: one unit per call with bounded, jittered retry and pacing
 * - `batch`: all units of a language with bounded concurrency and caching
 */

pub use self::batch::BatchTranslator;
pub use self::gateway::{RetryPolicy, TranslationGateway};
pub use self::service::TranslationService;

pub mod batch;
pub mod gateway;
pub mod service;
