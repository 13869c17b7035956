use std::{cell::RefCell, rc::Rc};
use turbolinks_form::{LifecycleEvent, LifecycleEvents};

type Journal = Rc<RefCell<Vec<String>>>;

#[test]
fn event_names() {
	assert_eq!(LifecycleEvent::BeforeRender.name(), "turbolinks:before-render");
	assert_eq!(LifecycleEvent::Render.name(), "turbolinks:render");
	assert_eq!(LifecycleEvent::Load.name(), "turbolinks:load");
	assert_eq!(LifecycleEvent::RequestStart.to_string(), "turbolinks:request-start");
}

#[test]
fn request_start_delivers_the_request_in_registration_order() {
	let journal = Journal::default();
	let mut events = LifecycleEvents::<(), String>::new();
	{
		let (first, second) = (Rc::clone(&journal), Rc::clone(&journal));
		events
			.on_request_start(move |request| first.borrow_mut().push(format!("first:{}", request)))
			.on_request_start(move |request| second.borrow_mut().push(format!("second:{}", request)));
	}
	assert_eq!(events.listener_count(LifecycleEvent::RequestStart), 2);
	assert_eq!(events.listener_count(LifecycleEvent::Load), 0);

	events.request_start(&"POST /users".to_owned());

	assert_eq!(*journal.borrow(), ["first:POST /users", "second:POST /users"]);
}

#[test]
fn request_start_is_independent_of_the_render_cycle() {
	let journal = Journal::default();
	let mut events = LifecycleEvents::<u32, &'static str>::new();
	{
		let (before_render, render, load, request_start) = (Rc::clone(&journal), Rc::clone(&journal), Rc::clone(&journal), Rc::clone(&journal));
		events
			.on_before_render(move |body| before_render.borrow_mut().push(format!("before-render:{}", body)))
			.on_render(move || render.borrow_mut().push("render".to_owned()))
			.on_load(move || load.borrow_mut().push("load".to_owned()))
			.on_request_start(move |request| request_start.borrow_mut().push(format!("request-start:{}", request)));
	}

	events.request_start(&"xhr");
	assert_eq!(*journal.borrow(), ["request-start:xhr"]);

	events.before_render(&7);
	events.render();
	events.load();
	assert_eq!(*journal.borrow(), ["request-start:xhr", "before-render:7", "render", "load"]);
}

#[test]
fn dispatch_without_listeners_is_a_no_op() {
	let events = LifecycleEvents::<(), ()>::new();
	events.request_start(&());
	events.load();
	assert_eq!(events.listener_count(LifecycleEvent::BeforeRender), 0);
}
