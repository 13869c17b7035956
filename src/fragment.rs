//! Parsing a response fragment and pulling its scripts out before it touches the live document.
//!
//! Script elements that arrive through subtree assignment aren't reliably executed (and on some engines are),
//! so they are stripped here and re-created afterwards by the interpreter.

use crate::document::Document;
use thiserror::Error;
use tracing::{trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unable to parse the response fragment with either the DOM parser or a detached document")]
pub struct ParseError;

/// A fragment parsed into a detached document, scripts still in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFragment<N> {
	body: N,
}

impl<N> ParsedFragment<N> {
	#[must_use]
	pub fn body(&self) -> &N {
		&self.body
	}
}

/// The detached body of a [`ParsedFragment`] after [`extract_scripts`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptFreeBody<N>(N);

impl<N> ScriptFreeBody<N> {
	#[must_use]
	pub fn node(&self) -> &N {
		&self.0
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRecord {
	pub text: String,
	/// Index among the fragment's scripts, in document order.
	pub position: usize,
}

/// Parses `html` with the engine's DOM parser, falling back to a detached document.
///
/// # Errors
///
/// Iff neither strategy produces a body.
pub fn parse<D: Document + ?Sized>(document: &mut D, html: &str) -> Result<ParsedFragment<D::Node>, ParseError> {
	if let Some(body) = document.parse_with_dom_parser(html) {
		return Ok(ParsedFragment { body });
	}
	warn!("DOM parser unavailable; parsing through a detached document.");
	document.parse_with_detached_document(html).map(|body| ParsedFragment { body }).ok_or(ParseError)
}

/// Records and removes every `<script>` in `parsed`, in document order.
pub fn extract_scripts<D: Document + ?Sized>(document: &mut D, parsed: ParsedFragment<D::Node>) -> (ScriptFreeBody<D::Node>, Vec<ScriptRecord>) {
	let scripts = document.script_elements(&parsed.body);
	let records = scripts
		.iter()
		.enumerate()
		.map(|(position, script)| {
			let text = document.text_content(script);
			document.detach(script);
			ScriptRecord { text, position }
		})
		.collect::<Vec<_>>();

	trace!("Extracted {} script(s) from the fragment.", records.len());
	if cfg!(feature = "dangerous-logging") {
		for record in &records {
			trace!("Script #{}: {:?}", record.position, record.text);
		}
	}

	(ScriptFreeBody(parsed.body), records)
}
