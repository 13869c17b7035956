use thiserror::Error;

/// Misuse of the render options, raised before any response body is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
	#[error("`{0}` action is not allowed (expected one of append, remove, render, replace)")]
	UnsupportedAction(String),
	/// Only raised under [`TargetLocationPolicy::RequireFallbackLocation`](`crate::TargetLocationPolicy::RequireFallbackLocation`).
	#[error("using `target` without fallback `location` is not allowed")]
	TargetWithoutLocation,
}

/// Failure to produce a patch response.
#[derive(Debug, Error)]
pub enum EncodeError {
	#[error(transparent)]
	Config(#[from] ConfigError),
	#[error("failed to render the patch fragment: {0}")]
	Render(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

/// A script payload that doesn't follow the dispatch call layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
	#[error("dispatch call `{0}(` not found in payload")]
	MissingDispatch(String),
	#[error("expected a single-quoted string literal at byte {0}")]
	ExpectedLiteral(usize),
	#[error("unterminated string literal starting at byte {0}")]
	UnterminatedLiteral(usize),
	#[error("expected `{expected}` at byte {at}")]
	Expected { expected: char, at: usize },
	#[error("invalid escape sequence at byte {0}")]
	InvalidEscape(usize),
	#[error(transparent)]
	Action(#[from] ConfigError),
}
