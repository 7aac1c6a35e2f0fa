//! Pipeline stages for paper-to-podcast generation.
//!
//! Each submodule implements exactly one step. Keeping steps separate makes
//! each independently testable and lets the orchestrator in
//! [`crate::podcast`] swap an implementation (a fake extractor, a scripted
//! model) without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! locator ──▶ extract ──▶ prompts ──▶ llm ──▶ decode
//!  (paper ID)  (text)     (render)   (call)  (JSON + checks)
//! ```
//!
//! 1. [`locator`]: validate the caller's URL and pull out the paper ID
//! 2. [`extract`]: fetch the PDF ([`input`], [`pdf_text`]) or the abstract
//!    page ([`abstract_page`]) and produce plain text
//! 3. [`llm`]:     send a rendered prompt to the model under a deadline; the
//!    only step that talks to a provider
//! 4. [`decode`]:  strip fences and invisible characters, then strictly
//!    decode and validate the model's JSON

pub mod abstract_page;
pub mod decode;
pub mod extract;
pub mod input;
pub mod llm;
pub mod locator;
pub mod pdf_text;
