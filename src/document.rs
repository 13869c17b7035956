//! The DOM operations [`PatchInterpreter`](`crate::PatchInterpreter`) needs from a live document.
//!
//! Nodes are handles: cloning one must not clone the underlying DOM node.
//! Implementations report failed DOM calls through [`tracing`] instead of returning them,
//! since the interpreter can't meaningfully recover from a half-applied mutation either way.

use core::fmt::Debug;

pub trait Document {
	type Node: Clone + PartialEq + Debug;

	/// The first connected element matching `selector`, if any. Invalid selectors match nothing.
	fn query_selector(&self, selector: &str) -> Option<Self::Node>;

	/// The live document's root content container.
	fn body(&self) -> Option<Self::Node>;

	/// The live document's root element, usually `<html>`.
	fn document_element(&self) -> Option<Self::Node>;

	/// Parses `html` as a whole document using the engine's native parser and returns its detached body.
	///
	/// [`None`] if the engine doesn't support this.
	fn parse_with_dom_parser(&mut self, html: &str) -> Option<Self::Node>;

	/// Parses `html` by assigning it to the root element of a fresh detached document and returns that document's body.
	fn parse_with_detached_document(&mut self, html: &str) -> Option<Self::Node>;

	/// All `<script>` elements within `root`, in document order.
	fn script_elements(&self, root: &Self::Node) -> Vec<Self::Node>;

	fn text_content(&self, node: &Self::Node) -> String;

	fn child_nodes(&self, node: &Self::Node) -> Vec<Self::Node>;

	fn is_element(&self, node: &Self::Node) -> bool;

	/// Moves `child` (detaching it from wherever it is) to the end of `parent`'s children.
	fn append_child(&mut self, parent: &Self::Node, child: &Self::Node);

	/// Removes `node` from its parent, if it has one.
	fn detach(&mut self, node: &Self::Node);

	/// Puts `replacement` into `old`'s place in its parent's child list, detaching `old`.
	fn replace_node(&mut self, old: &Self::Node, replacement: &Self::Node);

	/// Swaps the live body for `new_body`, returning the body that is now live.
	fn replace_body(&mut self, new_body: &Self::Node) -> Option<Self::Node>;

	/// Creates a detached script element that will execute once inserted into the document.
	fn create_script(&mut self, text: &str) -> Option<Self::Node>;

	fn is_connected(&self, node: &Self::Node) -> bool;

	fn scroll_into_view(&mut self, node: &Self::Node);
}
