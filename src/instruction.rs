//! The wire contract between [`ResponseEncoder`](`crate::ResponseEncoder`) and the client-side dispatcher.
//!
//! A payload is a self-invoking script statement:
//!
//! ```text
//! (function(){
//!   TurbolinksForm.dispatch('replace', '#errors', '<div id=\"errors\">Email invalid<\/div>');
//! })();
//! ```

use crate::{action::PatchAction, error::WireError};
use core::str::CharIndices;
use tracing::trace;

/// Client-side entry point named by payloads unless configured otherwise.
pub const DEFAULT_DISPATCHER: &str = "TurbolinksForm.dispatch";

pub const DEFAULT_SELECTOR: &str = "body";

/// One targeted DOM patch. Created per intercepted response, serialised once, never retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchInstruction {
	pub action: PatchAction,
	/// CSS selector of the single target element.
	pub selector: String,
	/// Raw (unescaped) HTML.
	pub fragment: String,
}

impl Default for PatchInstruction {
	fn default() -> Self {
		Self {
			action: PatchAction::default(),
			selector: DEFAULT_SELECTOR.to_owned(),
			fragment: String::new(),
		}
	}
}

impl PatchInstruction {
	#[must_use]
	pub fn new(action: PatchAction, selector: impl Into<String>, fragment: impl Into<String>) -> Self {
		Self {
			action,
			selector: selector.into(),
			fragment: fragment.into(),
		}
	}

	/// Encodes this instruction as a script payload calling `dispatcher`.
	#[must_use]
	pub fn to_script(&self, dispatcher: &str) -> String {
		format!(
			"(function(){{\n  {}('{}', '{}', '{}');\n}})();\n",
			dispatcher,
			self.action,
			escape_javascript(&self.selector),
			escape_javascript(&self.fragment),
		)
	}

	/// Decodes a payload produced by [`to_script`](`PatchInstruction::to_script`) with the same `dispatcher`.
	///
	/// # Errors
	///
	/// Iff the payload doesn't contain a well-formed `dispatcher('action', 'selector', 'fragment')` call
	/// or names an unsupported action.
	pub fn from_script(script: &str, dispatcher: &str) -> Result<Self, WireError> {
		let call = format!("{}(", dispatcher);
		let start = script.find(&call).ok_or_else(|| WireError::MissingDispatch(dispatcher.to_owned()))? + call.len();

		let mut cursor = Cursor { script, at: start };
		let action = cursor.literal()?;
		cursor.expect(',')?;
		let selector = cursor.literal()?;
		cursor.expect(',')?;
		let fragment = cursor.literal()?;
		cursor.expect(')')?;

		trace!("Decoded `{}` patch for {:?} ({} byte fragment).", action, selector, fragment.len());
		Ok(Self {
			action: action.parse()?,
			selector,
			fragment,
		})
	}
}

/// Escapes `s` for inclusion in a single- or double-quoted (or template) JavaScript string literal.
///
/// `</` is broken up so the payload can also be inlined into a `<script>` element.
#[must_use]
pub fn escape_javascript(s: &str) -> String {
	let mut escaped = String::with_capacity(s.len() + s.len() / 8);
	let mut chars = s.chars().peekable();
	while let Some(c) = chars.next() {
		match c {
			'\\' => escaped.push_str("\\\\"),
			'\'' => escaped.push_str("\\'"),
			'"' => escaped.push_str("\\\""),
			'`' => escaped.push_str("\\`"),
			'$' => escaped.push_str("\\$"),
			'\n' => escaped.push_str("\\n"),
			'\r' => escaped.push_str("\\r"),
			'\u{2028}' => escaped.push_str("\\u2028"),
			'\u{2029}' => escaped.push_str("\\u2029"),
			'<' if chars.peek() == Some(&'/') => {
				chars.next();
				escaped.push_str("<\\/");
			}
			c => escaped.push(c),
		}
	}
	escaped
}

/// Reverses [`escape_javascript`] (and the other common single-character escapes).
///
/// # Errors
///
/// Iff `s` ends in a lone backslash or contains a malformed `\u` escape.
pub fn unescape_javascript(s: &str) -> Result<String, WireError> {
	unescape_at(s, 0)
}

fn unescape_at(s: &str, offset: usize) -> Result<String, WireError> {
	let mut unescaped = String::with_capacity(s.len());
	let mut chars = s.char_indices();
	while let Some((i, c)) = chars.next() {
		if c != '\\' {
			unescaped.push(c);
			continue;
		}
		match chars.next() {
			Some((_, 'n')) => unescaped.push('\n'),
			Some((_, 'r')) => unescaped.push('\r'),
			Some((_, 't')) => unescaped.push('\t'),
			Some((_, 'u')) => {
				let decoded = match code_unit(&mut chars) {
					// Astral characters arrive as `\uD83D\uDE00` from escapers that work in UTF-16.
					Some(high @ 0xD800..=0xDBFF) => {
						let mut lookahead = chars.clone();
						match (lookahead.next(), lookahead.next(), code_unit(&mut lookahead)) {
							(Some((_, '\\')), Some((_, 'u')), Some(low @ 0xDC00..=0xDFFF)) => {
								chars = lookahead;
								char::from_u32(0x1_0000 + ((high - 0xD800) << 10) + (low - 0xDC00))
							}
							_ => None,
						}
					}
					Some(unit) => char::from_u32(unit),
					None => None,
				};
				unescaped.push(decoded.ok_or(WireError::InvalidEscape(offset + i))?);
			}
			Some((_, other)) => unescaped.push(other),
			None => return Err(WireError::InvalidEscape(offset + i)),
		}
	}
	Ok(unescaped)
}

/// The four hex digits of a `\u` escape.
fn code_unit(chars: &mut CharIndices<'_>) -> Option<u32> {
	let hex: String = chars.by_ref().take(4).map(|(_, c)| c).collect();
	if hex.len() == 4 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
		u32::from_str_radix(&hex, 16).ok()
	} else {
		None
	}
}

struct Cursor<'a> {
	script: &'a str,
	at: usize,
}

impl Cursor<'_> {
	fn skip_whitespace(&mut self) {
		let rest = &self.script[self.at..];
		self.at += rest.len() - rest.trim_start().len();
	}

	fn expect(&mut self, expected: char) -> Result<(), WireError> {
		self.skip_whitespace();
		if self.script[self.at..].starts_with(expected) {
			self.at += expected.len_utf8();
			Ok(())
		} else {
			Err(WireError::Expected { expected, at: self.at })
		}
	}

	fn literal(&mut self) -> Result<String, WireError> {
		self.skip_whitespace();
		let start = self.at;
		if !self.script[start..].starts_with('\'') {
			return Err(WireError::ExpectedLiteral(start));
		}

		let body_start = start + 1;
		let mut escaped = false;
		for (i, c) in self.script[body_start..].char_indices() {
			match c {
				_ if escaped => escaped = false,
				'\\' => escaped = true,
				'\'' => {
					let end = body_start + i;
					self.at = end + 1;
					return unescape_at(&self.script[body_start..end], body_start);
				}
				_ => (),
			}
		}
		Err(WireError::UnterminatedLiteral(start))
	}
}
