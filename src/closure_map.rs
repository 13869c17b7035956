//! Keeps the JS-facing closures of [`crate::web`] alive for as long as they are installed.

use hashbrown::{hash_map::Entry, HashMap};
use js_sys::Function;
use std::cell::RefCell;
use tracing::trace;
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

/// Every published handler takes three arguments. Event listeners only look at the first.
pub(crate) type Handler = dyn Fn(JsValue, JsValue, JsValue);

thread_local! {
	static CLOSURE_MAP: RefCell<HashMap<&'static str, Closure<Handler>>> = RefCell::new(HashMap::new());
}

/// Publishes `handler` under `key` and returns it as a JS function.
///
/// Returns [`None`] if `key` is already published.
pub(crate) fn publish(key: &'static str, handler: impl Fn(JsValue, JsValue, JsValue) + 'static) -> Option<Function> {
	CLOSURE_MAP.with(move |closure_map| match closure_map.borrow_mut().entry(key) {
		Entry::Occupied(_) => None,
		Entry::Vacant(vacant) => {
			let closure = vacant.insert(Closure::wrap(Box::new(handler) as Box<Handler>));
			trace!("Created Closure {:?}.", key);
			Some(closure.as_ref().unchecked_ref::<Function>().clone())
		}
	})
}

pub(crate) fn function(key: &'static str) -> Option<Function> {
	CLOSURE_MAP.with(|closure_map| {
		closure_map
			.borrow()
			.get(key)
			.map(|closure| closure.as_ref().unchecked_ref::<Function>().clone())
	})
}

/// Drops the closure published under `key`. JS references to it start throwing afterwards.
pub(crate) fn unpublish(key: &'static str) -> bool {
	let removed = CLOSURE_MAP.with(|closure_map| closure_map.borrow_mut().remove(key)).is_some();
	if removed {
		trace!("Destroyed Closure {:?}.", key);
	}
	removed
}
