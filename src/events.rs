//! The lifecycle events a patch emits, mirroring those of a full navigation.

use core::fmt;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
	/// Before the DOM is mutated. Carries the new (script-free) body.
	BeforeRender,
	/// Right after the mutation, before scripts are replayed.
	Render,
	/// After script replay, before the target is scrolled into view.
	Load,
	/// A tagged submission was sent. Carries the in-flight request.
	RequestStart,
}

impl LifecycleEvent {
	/// The event name used on the navigation library's bus.
	#[must_use]
	pub fn name(self) -> &'static str {
		match self {
			LifecycleEvent::BeforeRender => "turbolinks:before-render",
			LifecycleEvent::Render => "turbolinks:render",
			LifecycleEvent::Load => "turbolinks:load",
			LifecycleEvent::RequestStart => "turbolinks:request-start",
		}
	}
}

impl fmt::Display for LifecycleEvent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Typed listeners for each [`LifecycleEvent`], over document nodes `N` and in-flight requests `R`.
///
/// Listeners are called synchronously in registration order.
/// Dispatch only needs `&self`, so a listener may safely trigger a nested patch.
pub struct LifecycleEvents<N, R = ()> {
	before_render: Vec<Box<dyn Fn(&N)>>,
	render: Vec<Box<dyn Fn()>>,
	load: Vec<Box<dyn Fn()>>,
	request_start: Vec<Box<dyn Fn(&R)>>,
}

impl<N, R> Default for LifecycleEvents<N, R> {
	fn default() -> Self {
		Self {
			before_render: Vec::new(),
			render: Vec::new(),
			load: Vec::new(),
			request_start: Vec::new(),
		}
	}
}

impl<N, R> fmt::Debug for LifecycleEvents<N, R> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LifecycleEvents")
			.field("before_render", &self.before_render.len())
			.field("render", &self.render.len())
			.field("load", &self.load.len())
			.field("request_start", &self.request_start.len())
			.finish()
	}
}

impl<N, R> LifecycleEvents<N, R> {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn on_before_render(&mut self, listener: impl Fn(&N) + 'static) -> &mut Self {
		self.before_render.push(Box::new(listener));
		self
	}

	pub fn on_render(&mut self, listener: impl Fn() + 'static) -> &mut Self {
		self.render.push(Box::new(listener));
		self
	}

	pub fn on_load(&mut self, listener: impl Fn() + 'static) -> &mut Self {
		self.load.push(Box::new(listener));
		self
	}

	pub fn on_request_start(&mut self, listener: impl Fn(&R) + 'static) -> &mut Self {
		self.request_start.push(Box::new(listener));
		self
	}

	#[must_use]
	pub fn listener_count(&self, event: LifecycleEvent) -> usize {
		match event {
			LifecycleEvent::BeforeRender => self.before_render.len(),
			LifecycleEvent::Render => self.render.len(),
			LifecycleEvent::Load => self.load.len(),
			LifecycleEvent::RequestStart => self.request_start.len(),
		}
	}

	pub fn before_render(&self, new_body: &N) {
		trace!("Dispatching {} to {} listener(s).", LifecycleEvent::BeforeRender, self.before_render.len());
		for listener in &self.before_render {
			listener(new_body);
		}
	}

	pub fn render(&self) {
		trace!("Dispatching {} to {} listener(s).", LifecycleEvent::Render, self.render.len());
		for listener in &self.render {
			listener();
		}
	}

	pub fn load(&self) {
		trace!("Dispatching {} to {} listener(s).", LifecycleEvent::Load, self.load.len());
		for listener in &self.load {
			listener();
		}
	}

	pub fn request_start(&self, request: &R) {
		trace!("Dispatching {} to {} listener(s).", LifecycleEvent::RequestStart, self.request_start.len());
		for listener in &self.request_start {
			listener(request);
		}
	}
}
