#![doc(html_root_url = "https://docs.rs/turbolinks-form/0.1.0")]
#![warn(clippy::pedantic)]
//! Targeted DOM patches for asynchronous form submissions.
//!
//! A form that fails validation usually re-renders itself, but a `POST` response is not a navigation.
//! This crate delivers such responses as a small script instead, which names a DOM action, a CSS selector and
//! an HTML fragment. The client side then patches only that subtree while replaying the same lifecycle events
//! and script execution a full page load would have produced.
//!
//! - Server side: [`encoder::decide`] and [`encoder::ResponseEncoder`] produce [`PatchInstruction`] payloads.
//! - Client side: [`interpreter::PatchInterpreter`] applies them to any [`document::Document`],
//!   such as the browser DOM (`web`, on `wasm32`) or the in-memory `headless::HeadlessDocument`.

pub use http;

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod action;
pub mod document;
pub mod encoder;
pub mod error;
pub mod events;
pub mod fragment;
#[cfg(feature = "headless")]
pub mod headless;
pub mod instruction;
pub mod interpreter;
pub mod request;

#[cfg(target_arch = "wasm32")]
mod closure_map;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use action::PatchAction;
pub use encoder::{decide, PatchPlan, PatchResponse, RenderDecision, RenderOptions, RenderTarget, Rendered, ResponseEncoder, TargetLocationPolicy, TemplateRenderer};
pub use error::{ConfigError, EncodeError, WireError};
pub use events::{LifecycleEvent, LifecycleEvents};
pub use instruction::PatchInstruction;
pub use interpreter::{PatchInterpreter, PatchOutcome};
pub use request::RequestContext;
