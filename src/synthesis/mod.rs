/*!
 * Speech synthesis.
 *
 * - `chunker`: word-boundary text chunks within a character budget
 * - `engine`: the speech engine interface and its HTTP client
 * - `orchestrator`: chunked synthesis of one unit with chunk caching
 */

pub use self::engine::{HttpSpeechEngine, SpeechEngine, SpeechRequest};
pub use self::orchestrator::{RunContext, SynthesisOrchestrator};

pub mod chunker;
pub mod engine;
pub mod orchestrator;
