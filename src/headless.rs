//! An in-memory [`Document`] for servers, tests and other non-browser clients.
//!
//! Scripts are never interpreted. Instead, a script element created through [`Document::create_script`]
//! "executes" the first time it is inserted under the document root, which is reported as a [`HeadlessEffect`].
//! Scripts that arrive through parsing stay inert, like they do in browsers.
//!
//! The underlying arena never frees nodes: parsed fragments, swapped-out bodies and removed targets stay allocated
//! until [`HeadlessDocument::compact`] rebuilds the tree. Long-lived documents should compact between patches.

use crate::document::Document;
use core::fmt;
use ego_tree::{NodeId, NodeRef, Tree};
use hashbrown::HashSet;
use scraper::{node::Text, ElementRef, Html, Node, Selector};
use tracing::{error, trace, warn};

/// Which fragment parsing strategies the simulated engine offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserSupport {
	pub dom_parser: bool,
	pub detached_document: bool,
}

impl Default for ParserSupport {
	fn default() -> Self {
		Self {
			dom_parser: true,
			detached_document: true,
		}
	}
}

/// Observable side effects of a [`HeadlessDocument`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadlessEffect {
	/// The script's text.
	ScriptExecuted(String),
	/// The element's outer HTML.
	ScrolledIntoView(String),
}

pub struct HeadlessDocument {
	html: Html,
	support: ParserSupport,
	executable: HashSet<NodeId>,
	observer: Option<Box<dyn FnMut(&HeadlessEffect)>>,
}

impl fmt::Debug for HeadlessDocument {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HeadlessDocument")
			.field("html", &self.html())
			.field("support", &self.support)
			.field("executable", &self.executable.len())
			.finish()
	}
}

impl HeadlessDocument {
	#[must_use]
	pub fn parse(html: &str) -> Self {
		Self {
			html: Html::parse_document(html),
			support: ParserSupport::default(),
			executable: HashSet::new(),
			observer: None,
		}
	}

	#[must_use]
	pub fn with_parser_support(mut self, support: ParserSupport) -> Self {
		self.support = support;
		self
	}

	/// Replaces the effect observer.
	pub fn observe(&mut self, observer: impl FnMut(&HeadlessEffect) + 'static) {
		self.observer = Some(Box::new(observer));
	}

	/// Nodes held in memory, detached ones included.
	#[must_use]
	pub fn node_count(&self) -> usize {
		self.html.tree.values().count()
	}

	/// Rebuilds the tree from the connected document, releasing everything patches detached.
	///
	/// Node handles taken before this call are invalidated, and scripts created but never inserted are forgotten.
	pub fn compact(&mut self) {
		let before = self.node_count();
		self.html = Html::parse_document(&self.html());
		self.executable.clear();
		trace!("Compacted {} nodes to {}.", before, self.node_count());
	}

	/// Serialises the whole connected document.
	#[must_use]
	pub fn html(&self) -> String {
		self.html.root_element().html()
	}

	#[must_use]
	pub fn body_html(&self) -> Option<String> {
		self.body().and_then(|body| self.element(body)).map(|body| body.inner_html())
	}

	#[must_use]
	pub fn outer_html(&self, node: NodeId) -> Option<String> {
		self.element(node).map(|element| element.html())
	}

	/// Outer HTML of the first connected element matching `selector`.
	#[must_use]
	pub fn select_html(&self, selector: &str) -> Option<String> {
		self.query_selector(selector).and_then(|node| self.outer_html(node))
	}

	/// Number of connected elements matching `selector`.
	#[must_use]
	pub fn count(&self, selector: &str) -> usize {
		Selector::parse(selector).map_or(0, |selector| self.connected_matches(&selector).count())
	}

	/// Connected elements matching `selector` in document order, starting with the root element itself.
	fn connected_matches<'s>(&'s self, selector: &'s Selector) -> impl Iterator<Item = ElementRef<'s>> + 's {
		let root = self.html.root_element();
		// `Html::select` would also visit detached nodes, and `ElementRef::select` skips `root`.
		Some(root).filter(|root| selector.matches(root)).into_iter().chain(root.select(selector))
	}

	fn element(&self, node: NodeId) -> Option<ElementRef<'_>> {
		self.html.tree.get(node).and_then(ElementRef::wrap)
	}

	fn emit(&mut self, effect: &HeadlessEffect) {
		if let Some(observer) = self.observer.as_mut() {
			observer(effect);
		}
	}

	fn execute_if_pending(&mut self, node: NodeId) {
		if !self.executable.contains(&node) || !self.is_connected(&node) {
			return;
		}
		self.executable.remove(&node);
		let text = self.text_content(&node);
		trace!("Executing script ({} bytes).", text.len());
		self.emit(&HeadlessEffect::ScriptExecuted(text));
	}
}

/// Deep-copies `source` (from another tree) into `tree` as an orphan subtree.
fn import(tree: &mut Tree<Node>, source: NodeRef<'_, Node>) -> NodeId {
	let id = tree.orphan(source.value().clone()).id();
	for child in source.children() {
		let child_id = import(tree, child);
		if let Some(mut parent) = tree.get_mut(id) {
			parent.append_id(child_id);
		}
	}
	id
}

/// An attribute-less element named `tag`, as the parser would create it.
fn blank_element(tag: &str) -> Option<Node> {
	let shell = Html::parse_document(&format!("<{0}></{0}>", tag));
	let selector = Selector::parse(tag).ok()?;
	let element = shell.select(&selector).next()?;
	Some(Node::Element(element.value().clone()))
}

fn is_script(node: &Node) -> bool {
	matches!(node, Node::Element(element) if element.name().eq_ignore_ascii_case("script"))
}

impl Document for HeadlessDocument {
	type Node = NodeId;

	fn query_selector(&self, selector: &str) -> Option<NodeId> {
		match Selector::parse(selector) {
			Ok(parsed) => self.connected_matches(&parsed).next().map(|element| element.id()),
			Err(selector_error) => {
				warn!("Invalid selector {:?}: {:?}", selector, selector_error);
				None
			}
		}
	}

	fn body(&self) -> Option<NodeId> {
		self.query_selector("body")
	}

	fn document_element(&self) -> Option<NodeId> {
		Some(self.html.root_element().id())
	}

	fn parse_with_dom_parser(&mut self, html: &str) -> Option<NodeId> {
		if !self.support.dom_parser {
			return None;
		}
		let parsed = Html::parse_document(html);
		let selector = Selector::parse("body").ok()?;
		let body = parsed.select(&selector).next()?;
		Some(import(&mut self.html.tree, *body))
	}

	fn parse_with_detached_document(&mut self, html: &str) -> Option<NodeId> {
		if !self.support.detached_document {
			return None;
		}
		let parsed = Html::parse_fragment(html);
		let body = self.html.tree.orphan(blank_element("body")?).id();
		for child in parsed.root_element().children() {
			let child_id = import(&mut self.html.tree, child);
			self.html.tree.get_mut(body)?.append_id(child_id);
		}
		Some(body)
	}

	fn script_elements(&self, root: &NodeId) -> Vec<NodeId> {
		self.html.tree.get(*root).map_or_else(Vec::new, |root| {
			root.descendants().filter(|node| is_script(node.value())).map(|node| node.id()).collect()
		})
	}

	fn text_content(&self, node: &NodeId) -> String {
		let mut content = String::new();
		if let Some(node) = self.html.tree.get(*node) {
			for descendant in node.descendants() {
				if let Node::Text(text) = descendant.value() {
					content.push_str(text);
				}
			}
		}
		content
	}

	fn child_nodes(&self, node: &NodeId) -> Vec<NodeId> {
		self.html.tree.get(*node).map_or_else(Vec::new, |node| node.children().map(|child| child.id()).collect())
	}

	fn is_element(&self, node: &NodeId) -> bool {
		self.html.tree.get(*node).map_or(false, |node| matches!(node.value(), Node::Element(_)))
	}

	fn append_child(&mut self, parent: &NodeId, child: &NodeId) {
		if parent == child {
			return error!("Can't append a node to itself.");
		}
		self.detach(child);
		match self.html.tree.get_mut(*parent) {
			Some(mut parent) => {
				parent.append_id(*child);
			}
			None => return error!("Parent node {:?} not found.", parent),
		}
		self.execute_if_pending(*child);
	}

	fn detach(&mut self, node: &NodeId) {
		if let Some(mut node) = self.html.tree.get_mut(*node) {
			node.detach();
		}
	}

	fn replace_node(&mut self, old: &NodeId, replacement: &NodeId) {
		if self.html.tree.get(*old).and_then(|old| old.parent()).is_none() {
			return warn!("Node to replace has no parent. Ignoring.");
		}
		self.detach(replacement);
		if let Some(mut old) = self.html.tree.get_mut(*old) {
			old.insert_id_before(*replacement);
			old.detach();
		}
		self.execute_if_pending(*replacement);
	}

	fn replace_body(&mut self, new_body: &NodeId) -> Option<NodeId> {
		let old_body = self.body()?;
		self.replace_node(&old_body, new_body);
		Some(*new_body)
	}

	fn create_script(&mut self, text: &str) -> Option<NodeId> {
		let script = self.html.tree.orphan(blank_element("script")?).id();
		let text = self.html.tree.orphan(Node::Text(Text { text: text.into() })).id();
		self.html.tree.get_mut(script)?.append_id(text);
		self.executable.insert(script);
		Some(script)
	}

	fn is_connected(&self, node: &NodeId) -> bool {
		let root = self.html.tree.root().id();
		self.html.tree.get(*node).map_or(false, |node| node.ancestors().last().map_or(node.id() == root, |ancestor| ancestor.id() == root))
	}

	fn scroll_into_view(&mut self, node: &NodeId) {
		let html = self.outer_html(*node).unwrap_or_default();
		trace!("Scrolling {} byte element into view.", html.len());
		self.emit(&HeadlessEffect::ScrolledIntoView(html));
	}
}
