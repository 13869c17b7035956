//! Client side: applying a [`PatchInstruction`] to a live [`Document`].

use crate::{
	action::PatchAction,
	document::Document,
	events::LifecycleEvents,
	fragment::{self, ScriptFreeBody, ScriptRecord},
	instruction::PatchInstruction,
};
use tracing::{debug, error, instrument, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
	Applied,
	/// The selector matched nothing. The document is unchanged and no events fired.
	TargetNotFound,
	/// The fragment couldn't be parsed. The document is unchanged and no events fired.
	ParseFailed,
}

/// Applies patches to `document`, announcing them on `events`.
///
/// Each call runs to completion synchronously. The caller owns the document for its duration.
pub struct PatchInterpreter<'a, D: Document, R = ()> {
	document: &'a mut D,
	events: &'a LifecycleEvents<D::Node, R>,
}

impl<'a, D: Document, R> PatchInterpreter<'a, D, R> {
	#[must_use]
	pub fn new(document: &'a mut D, events: &'a LifecycleEvents<D::Node, R>) -> Self {
		Self { document, events }
	}

	pub fn apply(&mut self, instruction: &PatchInstruction) -> PatchOutcome {
		self.interpret(instruction.action, &instruction.selector, &instruction.fragment)
	}

	/// Resolves the target, parses `fragment`, emits `before-render`, mutates, emits `render`,
	/// replays scripts, emits `load` and finally scrolls the surviving target into view.
	#[instrument(skip(self, fragment), fields(fragment_len = fragment.len()))]
	pub fn interpret(&mut self, action: PatchAction, selector: &str, fragment: &str) -> PatchOutcome {
		let target = match self.document.query_selector(selector) {
			Some(target) => target,
			None => {
				debug!("No element matches {:?}. Ignoring patch.", selector);
				return PatchOutcome::TargetNotFound;
			}
		};

		let parsed = match fragment::parse(&mut *self.document, fragment) {
			Ok(parsed) => parsed,
			Err(parse_error) => {
				error!("{}", parse_error);
				if cfg!(feature = "dangerous-logging") {
					error!("Unparsable fragment: {:?}", fragment);
				}
				return PatchOutcome::ParseFailed;
			}
		};
		let (new_body, scripts) = fragment::extract_scripts(&mut *self.document, parsed);

		self.events.before_render(new_body.node());
		let target = self.mutate(action, target, &new_body);
		self.events.render();

		// Removed targets take the fragment, scripts included, with them.
		if action != PatchAction::Remove {
			self.replay(&scripts);
		}
		self.events.load();

		if let Some(target) = target {
			if self.document.is_connected(&target) {
				self.document.scroll_into_view(&target);
			}
		}
		PatchOutcome::Applied
	}

	/// Returns the element that now stands for the target, if any.
	fn mutate(&mut self, action: PatchAction, target: D::Node, new_body: &ScriptFreeBody<D::Node>) -> Option<D::Node> {
		match action {
			PatchAction::Append => {
				self.move_children(new_body, &target);
				Some(target)
			}
			PatchAction::Remove => {
				self.document.detach(&target);
				None
			}
			PatchAction::Render => {
				if self.document.body().as_ref() == Some(&target) {
					trace!("Swapping the document body.");
					self.document.replace_body(new_body.node())
				} else {
					for child in self.document.child_nodes(&target) {
						self.document.detach(&child);
					}
					self.move_children(new_body, &target);
					Some(target)
				}
			}
			PatchAction::Replace => {
				let replacement = self
					.document
					.child_nodes(new_body.node())
					.into_iter()
					.find(|child| self.document.is_element(child));
				match replacement {
					Some(replacement) => {
						self.document.replace_node(&target, &replacement);
						Some(replacement)
					}
					None => {
						warn!("Replacement fragment contains no element. Removing the target.");
						self.document.detach(&target);
						None
					}
				}
			}
		}
	}

	fn move_children(&mut self, from: &ScriptFreeBody<D::Node>, to: &D::Node) {
		for child in self.document.child_nodes(from.node()) {
			self.document.append_child(to, &child);
		}
	}

	/// Re-creates each script as a fresh element at the end of the body, which executes it.
	/// Without a body, the scripts go to the end of the root element instead.
	fn replay(&mut self, scripts: &[ScriptRecord]) {
		if scripts.is_empty() {
			return;
		}
		let container = match self.document.body() {
			Some(body) => body,
			None => match self.document.document_element() {
				Some(root) => {
					debug!("No document body. Replaying {} script(s) into the root element.", scripts.len());
					root
				}
				None => return error!("No document element to replay {} script(s) into.", scripts.len()),
			},
		};
		for record in scripts {
			match self.document.create_script(&record.text) {
				Some(script) => self.document.append_child(&container, &script),
				None => error!("Failed to create script #{}. Skipping it.", record.position),
			}
		}
	}
}
