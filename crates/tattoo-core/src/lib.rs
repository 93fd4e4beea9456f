//! tattoo-core: everything between an uploaded photo and a saved tattoo preview.
//!
//! - [`prompt`] builds the instruction text from the form fields.
//! - [`generation`] normalises uploads and walks the model's response parts.
//! - [`gemini`] holds the [`ImageModel`] seam and its Gemini implementation.
//! - [`storage`] allocates `generated_image<N>.png` files.

pub mod codec;
pub mod error;
pub mod gemini;
pub mod generation;
pub mod prompt;
pub mod storage;

pub use error::{CoreError, Result};
pub use gemini::{GeminiClient, GenerationRequest, ImageModel, ModelPart, ModelResponse};
pub use generation::{GenerationOutcome, PreparedInputs, prepare_inputs, process_parts};
pub use prompt::{PromptFields, build_prompt};
pub use storage::OutputStore;
