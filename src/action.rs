//! The closed set of DOM mutations a patch can request.

use crate::error::ConfigError;
use core::{fmt, str::FromStr};

/// How a [`PatchInstruction`](`crate::PatchInstruction`)'s fragment is applied to its target element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchAction {
	/// Moves the fragment's top-level nodes to the end of the target's children.
	Append,
	/// Detaches the target. The fragment is not inserted.
	Remove,
	/// Replaces the target's children with the fragment's top-level nodes.
	///
	/// If the target is the document body, the body element itself is swapped.
	Render,
	/// Replaces the target element itself with the fragment's first top-level element.
	Replace,
}

impl PatchAction {
	pub const ALL: [PatchAction; 4] = [PatchAction::Append, PatchAction::Remove, PatchAction::Render, PatchAction::Replace];

	#[must_use]
	pub fn as_str(self) -> &'static str {
		match self {
			PatchAction::Append => "append",
			PatchAction::Remove => "remove",
			PatchAction::Render => "render",
			PatchAction::Replace => "replace",
		}
	}
}

impl Default for PatchAction {
	fn default() -> Self {
		PatchAction::Render
	}
}

impl fmt::Display for PatchAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for PatchAction {
	type Err = ConfigError;

	/// Parses an action name. Names are case-sensitive, matching what the dispatcher exposes.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		PatchAction::ALL
			.iter()
			.copied()
			.find(|action| action.as_str() == s)
			.ok_or_else(|| ConfigError::UnsupportedAction(s.to_owned()))
	}
}
