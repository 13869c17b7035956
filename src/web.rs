//! Browser bindings: the DOM as a [`Document`], the `TurbolinksForm` global that patch payloads call,
//! submission tagging for `[data-turbolinks-form]` forms, and forwarding of lifecycle events to `Turbolinks.dispatch`.

use crate::{
	action::PatchAction,
	closure_map,
	document::Document,
	events::{LifecycleEvent, LifecycleEvents},
	interpreter::{PatchInterpreter, PatchOutcome},
	request::{should_tag, FORM_SUBMIT_HEADER, MARKER_ATTRIBUTE},
};
use js_sys::{Array, Function, Object, Reflect};
use std::cell::RefCell;
use tracing::{debug, error, trace, warn};
use wasm_bindgen::{prelude::*, JsCast};
use web_sys::{CustomEvent, DomParser, Element, HtmlElement, HtmlScriptElement, Node, SupportedType, Window, XmlHttpRequest};

/// Name of the global object patch payloads call into.
pub const GLOBAL_NAME: &str = "TurbolinksForm";

const DISPATCH_KEY: &str = "dispatch";
const BEFORE_SEND_EVENT: &str = "ajax:beforeSend";

thread_local! {
	static EVENTS: RefCell<LifecycleEvents<Node, XmlHttpRequest>> = RefCell::new(LifecycleEvents::new());
}

#[wasm_bindgen]
extern "C" {
	#[wasm_bindgen(catch, js_namespace = Turbolinks, js_name = dispatch)]
	fn turbolinks_dispatch(name: &str, options: &JsValue) -> Result<JsValue, JsValue>;
}

/// The browser's live document.
#[derive(Debug, Clone)]
pub struct WebDocument {
	document: web_sys::Document,
}

impl WebDocument {
	#[must_use]
	pub fn new(document: web_sys::Document) -> Self {
		Self { document }
	}

	#[must_use]
	pub fn current() -> Option<Self> {
		web_sys::window()?.document().map(Self::new)
	}
}

impl Document for WebDocument {
	type Node = Node;

	fn query_selector(&self, selector: &str) -> Option<Node> {
		match self.document.query_selector(selector) {
			Ok(element) => element.map(Into::into),
			Err(selector_error) => {
				warn!("Invalid selector {:?}: {:?}", selector, selector_error);
				None
			}
		}
	}

	fn body(&self) -> Option<Node> {
		self.document.body().map(Into::into)
	}

	fn document_element(&self) -> Option<Node> {
		self.document.document_element().map(Into::into)
	}

	fn parse_with_dom_parser(&mut self, html: &str) -> Option<Node> {
		let parser = DomParser::new().ok()?;
		let parsed = parser.parse_from_string(html, SupportedType::TextHtml).ok()?;
		parsed.body().map(Into::into)
	}

	fn parse_with_detached_document(&mut self, html: &str) -> Option<Node> {
		let detached = self.document.implementation().ok()?.create_html_document_with_title("document").ok()?;
		detached.document_element()?.set_inner_html(html);
		detached.body().map(Into::into)
	}

	fn script_elements(&self, root: &Node) -> Vec<Node> {
		let root = match root.dyn_ref::<Element>() {
			Some(root) => root,
			None => return Vec::new(),
		};
		// Live collection: snapshot it before anything is detached.
		let scripts = root.get_elements_by_tag_name("script");
		(0..scripts.length()).filter_map(|i| scripts.item(i)).map(Into::into).collect()
	}

	fn text_content(&self, node: &Node) -> String {
		node.text_content().unwrap_or_default()
	}

	fn child_nodes(&self, node: &Node) -> Vec<Node> {
		let child_nodes = node.child_nodes();
		(0..child_nodes.length()).filter_map(|i| child_nodes.item(i)).collect()
	}

	fn is_element(&self, node: &Node) -> bool {
		node.node_type() == Node::ELEMENT_NODE
	}

	fn append_child(&mut self, parent: &Node, child: &Node) {
		if let Err(error) = parent.append_child(child) {
			error!("Failed to append the node: {:?}", error);
		}
	}

	fn detach(&mut self, node: &Node) {
		if let Some(parent) = node.parent_node() {
			if let Err(error) = parent.remove_child(node) {
				error!("Failed to remove the node: {:?}", error);
			}
		}
	}

	fn replace_node(&mut self, old: &Node, replacement: &Node) {
		match old.parent_node() {
			Some(parent) => {
				if let Err(error) = parent.replace_child(replacement, old) {
					error!("Failed to replace the node: {:?}", error);
				}
			}
			None => warn!("Could not find parent node of node to replace. Ignoring."),
		}
	}

	fn replace_body(&mut self, new_body: &Node) -> Option<Node> {
		let new_body = new_body.dyn_ref::<HtmlElement>()?;
		if let Err(error) = self.document.set_body(Some(new_body)) {
			error!("Failed to replace the document body: {:?}", error);
		}
		self.body()
	}

	fn create_script(&mut self, text: &str) -> Option<Node> {
		let script = self.document.create_element("script").ok()?.dyn_into::<HtmlScriptElement>().ok()?;
		if let Err(error) = script.set_text(text) {
			error!("Failed to set script text: {:?}", error);
			return None;
		}
		Some(script.into())
	}

	fn is_connected(&self, node: &Node) -> bool {
		node.is_connected()
	}

	fn scroll_into_view(&mut self, node: &Node) {
		if let Some(element) = node.dyn_ref::<Element>() {
			element.scroll_into_view();
		}
	}
}

/// Registers lifecycle listeners.
///
/// # Errors
///
/// Iff called from within a lifecycle listener.
pub fn with_events<T>(f: impl FnOnce(&mut LifecycleEvents<Node, XmlHttpRequest>) -> T) -> Result<T, JsValue> {
	EVENTS.with(|events| match events.try_borrow_mut() {
		Ok(mut events) => Ok(f(&mut events)),
		Err(_) => Err(JsValue::from_str("turbolinks-form: lifecycle listeners can't be changed during dispatch")),
	})
}

/// Applies a patch to the current document.
///
/// [`None`] if there is no document, or if called while listeners are being registered.
pub fn interpret(action: PatchAction, selector: &str, fragment: &str) -> Option<PatchOutcome> {
	let mut document = WebDocument::current()?;
	EVENTS.with(|events| match events.try_borrow() {
		Ok(events) => Some(PatchInterpreter::new(&mut document, &*events).interpret(action, selector, fragment)),
		Err(_) => {
			error!("Lifecycle listeners are being modified. Dropping patch.");
			None
		}
	})
}

/// The entry point patch payloads call as `TurbolinksForm.dispatch(action, selector, fragment)`.
#[wasm_bindgen(js_name = dispatchPatch)]
pub fn dispatch(action: &str, selector: &str, fragment: &str) {
	match action.parse::<PatchAction>() {
		Ok(action) => {
			let outcome = interpret(action, selector, fragment);
			trace!("Patch outcome: {:?}", outcome);
		}
		Err(config_error) => error!("{}", config_error),
	}
}

/// Installs `window.TurbolinksForm`, the `ajax:beforeSend` tagging listener and the `Turbolinks.dispatch` bridge.
///
/// Calling this again while installed does nothing.
///
/// # Errors
///
/// Iff there is no window or document, or the global can't be assigned.
#[wasm_bindgen(js_name = installTurbolinksForm)]
pub fn install() -> Result<(), JsValue> {
	let window = web_sys::window().ok_or_else(|| JsValue::from_str("turbolinks-form: no window"))?;
	let document = window.document().ok_or_else(|| JsValue::from_str("turbolinks-form: no document"))?;

	let dispatch_function = match closure_map::publish(DISPATCH_KEY, |action, selector, fragment| {
		match (action.as_string(), selector.as_string(), fragment.as_string()) {
			(Some(action), Some(selector), Some(fragment)) => dispatch(&action, &selector, &fragment),
			_ => error!("{}.dispatch expects three strings.", GLOBAL_NAME),
		}
	}) {
		Some(function) => function,
		None => {
			debug!("Already installed.");
			return Ok(());
		}
	};

	if let Err(error) = assign_global(&window, &dispatch_function) {
		unpublish_global();
		return Err(error);
	}

	if let Some(listener) = closure_map::publish(BEFORE_SEND_EVENT, |event, _, _| match event.dyn_into::<CustomEvent>() {
		Ok(event) => tag_submission(&event),
		Err(event) => warn!("Expected CustomEvent for {} but received {:?}.", BEFORE_SEND_EVENT, event),
	}) {
		if let Err(error) = document.add_event_listener_with_callback(BEFORE_SEND_EVENT, &listener) {
			closure_map::unpublish(BEFORE_SEND_EVENT);
			unpublish_global();
			Reflect::delete_property(&window, &GLOBAL_NAME.into())?;
			return Err(error);
		}
	}

	with_events(|events| {
		events
			.on_before_render(|new_body| forward(LifecycleEvent::BeforeRender, Some(("newBody", AsRef::<JsValue>::as_ref(new_body)))))
			.on_render(|| forward(LifecycleEvent::Render, None))
			.on_load(|| forward(LifecycleEvent::Load, None))
			.on_request_start(|xhr| forward(LifecycleEvent::RequestStart, Some(("xhr", AsRef::<JsValue>::as_ref(xhr)))));
	})
}

/// Reverts [`install`]. This also drops all lifecycle listeners registered through [`with_events`].
///
/// # Errors
///
/// Iff there is no window or document, or called from within a lifecycle listener.
#[wasm_bindgen(js_name = uninstallTurbolinksForm)]
pub fn uninstall() -> Result<(), JsValue> {
	let window = web_sys::window().ok_or_else(|| JsValue::from_str("turbolinks-form: no window"))?;
	let document = window.document().ok_or_else(|| JsValue::from_str("turbolinks-form: no document"))?;

	if let Some(listener) = closure_map::function(BEFORE_SEND_EVENT) {
		document.remove_event_listener_with_callback(BEFORE_SEND_EVENT, &listener)?;
	}
	Reflect::delete_property(&window, &GLOBAL_NAME.into())?;
	with_events(|events| *events = LifecycleEvents::new())?;

	closure_map::unpublish(BEFORE_SEND_EVENT);
	unpublish_global();
	Ok(())
}

/// Builds `window.TurbolinksForm` around `dispatch_function`, publishing a shorthand per action.
fn assign_global(window: &Window, dispatch_function: &Function) -> Result<(), JsValue> {
	let global = Object::new();
	Reflect::set(&global, &DISPATCH_KEY.into(), dispatch_function)?;
	for action in PatchAction::ALL.iter().copied() {
		// `TurbolinksForm.render(selector, fragment)` and friends.
		let shorthand = closure_map::publish(action.as_str(), move |selector, fragment, _| match (selector.as_string(), fragment.as_string()) {
			(Some(selector), Some(fragment)) => {
				interpret(action, &selector, &fragment);
			}
			_ => error!("{}.{} expects two strings.", GLOBAL_NAME, action),
		});
		if let Some(shorthand) = shorthand {
			Reflect::set(&global, &action.as_str().into(), &shorthand)?;
		}
	}
	if Reflect::set(window, &GLOBAL_NAME.into(), &global)? {
		Ok(())
	} else {
		Err(JsValue::from_str("turbolinks-form: window.TurbolinksForm is read-only"))
	}
}

/// Drops the closures behind `window.TurbolinksForm`, so that a later [`install`] starts over.
fn unpublish_global() {
	closure_map::unpublish(DISPATCH_KEY);
	for action in PatchAction::ALL.iter().copied() {
		closure_map::unpublish(action.as_str());
	}
}

/// Adds [`FORM_SUBMIT_HEADER`] to rails-ujs requests sent by marked forms. The event's detail is `[xhr, options]`.
fn tag_submission(event: &CustomEvent) {
	let form = event
		.target()
		.and_then(|target| target.dyn_into::<Element>().ok())
		.and_then(|element| element.closest(&format!("[{}]", MARKER_ATTRIBUTE)).ok().flatten());

	let detail = Array::from(&event.detail());
	let method = Reflect::get(&detail.get(1), &"type".into())
		.ok()
		.and_then(|method| method.as_string())
		.or_else(|| form.as_ref().and_then(|form| form.get_attribute("method")))
		.unwrap_or_else(|| "GET".to_owned());

	if !should_tag(&method, form.is_some()) {
		return trace!("Not tagging {} request.", method);
	}

	let xhr = match detail.get(0).dyn_into::<XmlHttpRequest>() {
		Ok(xhr) => xhr,
		Err(_) => return warn!("{} without an XMLHttpRequest. Not tagging.", BEFORE_SEND_EVENT),
	};
	if let Err(error) = xhr.set_request_header(FORM_SUBMIT_HEADER, "1") {
		return error!("Failed to set {} header: {:?}", FORM_SUBMIT_HEADER, error);
	}

	EVENTS.with(|events| match events.try_borrow() {
		Ok(events) => events.request_start(&xhr),
		Err(_) => error!("Lifecycle listeners are being modified. Dropping {}.", LifecycleEvent::RequestStart),
	});
}

/// Re-dispatches `event` through `Turbolinks.dispatch(name, {data: {key: value}})`, if Turbolinks is loaded.
fn forward(event: LifecycleEvent, data: Option<(&str, &JsValue)>) {
	let options = Object::new();
	if let Some((key, value)) = data {
		let payload = Object::new();
		if Reflect::set(&payload, &key.into(), value).and_then(|_| Reflect::set(&options, &"data".into(), &payload)).is_err() {
			return error!("Failed to build {} payload.", event);
		}
	}
	if let Err(error) = turbolinks_dispatch(event.name(), &options) {
		debug!("Turbolinks.dispatch unavailable for {}: {:?}", event, error);
	}
}
