#![cfg(feature = "headless")]

use std::{cell::RefCell, io, rc::Rc};
use turbolinks_form::{
	document::Document,
	headless::{HeadlessDocument, HeadlessEffect, ParserSupport},
	instruction::DEFAULT_DISPATCHER,
	LifecycleEvents, PatchAction, PatchInstruction, PatchInterpreter, PatchOutcome, RenderOptions, RenderTarget, Rendered, RequestContext, ResponseEncoder,
};

type Journal = Rc<RefCell<Vec<String>>>;
type Events = LifecycleEvents<<HeadlessDocument as Document>::Node>;

fn harness(html: &str) -> (HeadlessDocument, Events, Journal) {
	let journal = Journal::default();

	let mut document = HeadlessDocument::parse(html);
	{
		let journal = Rc::clone(&journal);
		document.observe(move |effect| {
			journal.borrow_mut().push(match effect {
				HeadlessEffect::ScriptExecuted(text) => format!("script:{}", text),
				HeadlessEffect::ScrolledIntoView(html) => format!("scroll:{}", html),
			})
		});
	}

	let mut events = Events::new();
	let (before_render, render, load) = (Rc::clone(&journal), Rc::clone(&journal), Rc::clone(&journal));
	events
		.on_before_render(move |_| before_render.borrow_mut().push("before-render".to_owned()))
		.on_render(move || render.borrow_mut().push("render".to_owned()))
		.on_load(move || load.borrow_mut().push("load".to_owned()));

	(document, events, journal)
}

fn apply(document: &mut HeadlessDocument, events: &Events, action: PatchAction, selector: &str, fragment: &str) -> PatchOutcome {
	PatchInterpreter::new(document, events).apply(&PatchInstruction::new(action, selector, fragment))
}

fn entries(journal: &Journal) -> Vec<String> {
	journal.borrow().clone()
}

#[test]
fn replace_swaps_the_error_placeholder() {
	let (mut document, events, journal) = harness(r#"<html><head></head><body><form><span id="errors"></span><input name="email"></form></body></html>"#);

	let outcome = apply(&mut document, &events, PatchAction::Replace, "#errors", r#"<div id="errors">Email invalid</div>"#);

	assert_eq!(outcome, PatchOutcome::Applied);
	assert_eq!(document.body_html().as_deref(), Some(r#"<form><div id="errors">Email invalid</div><input name="email"></form>"#));
	assert_eq!(document.count("span"), 0);
	assert_eq!(
		entries(&journal),
		["before-render", "render", "load", r#"scroll:<div id="errors">Email invalid</div>"#]
	);
}

#[test]
fn missing_target_is_a_silent_no_op() {
	for action in PatchAction::ALL.iter().copied() {
		let (mut document, events, journal) = harness("<p class=\"present\">Hi</p>");
		let before = document.html();

		assert_eq!(apply(&mut document, &events, action, ".missing", "<p>new</p><script>run()</script>"), PatchOutcome::TargetNotFound);
		assert_eq!(document.html(), before);
		assert!(entries(&journal).is_empty(), "{} fired events", action);
	}
}

#[test]
fn invalid_selector_matches_nothing() {
	let (mut document, events, journal) = harness("<p>Hi</p>");
	assert_eq!(apply(&mut document, &events, PatchAction::Render, "##", "<p>new</p>"), PatchOutcome::TargetNotFound);
	assert!(entries(&journal).is_empty());
}

#[test]
fn append_keeps_existing_children() {
	let (mut document, events, journal) = harness(r#"<ul id="list"><li>a</li></ul>"#);

	assert_eq!(apply(&mut document, &events, PatchAction::Append, "#list", "<li>b</li><li>c</li>"), PatchOutcome::Applied);

	assert_eq!(document.count("#list > li"), 3);
	assert_eq!(document.select_html("#list").as_deref(), Some(r#"<ul id="list"><li>a</li><li>b</li><li>c</li></ul>"#));
	assert_eq!(entries(&journal).last().map(String::as_str), Some(r#"scroll:<ul id="list"><li>a</li><li>b</li><li>c</li></ul>"#));
}

#[test]
fn render_replaces_the_targets_children() {
	let (mut document, events, _) = harness(r#"<div id="panel"><p>old</p><p>older</p></div><footer>kept</footer>"#);

	assert_eq!(apply(&mut document, &events, PatchAction::Render, "#panel", "<p>new</p><p><em>more</em></p>"), PatchOutcome::Applied);

	assert_eq!(
		document.body_html().as_deref(),
		Some(r#"<div id="panel"><p>new</p><p><em>more</em></p></div><footer>kept</footer>"#)
	);
}

#[test]
fn render_on_body_swaps_the_whole_container() {
	let (mut document, events, journal) = harness(r#"<html><head><title>T</title></head><body class="old"><p>gone</p></body></html>"#);

	let outcome = PatchInterpreter::new(&mut document, &events).apply(&PatchInstruction {
		fragment: "<main><h1>Title</h1><p>Text <b>bold</b></p></main>".to_owned(),
		..PatchInstruction::default()
	});

	assert_eq!(outcome, PatchOutcome::Applied);
	assert_eq!(document.count("body"), 1);
	assert_eq!(document.count("body.old"), 0);
	assert_eq!(document.body_html().as_deref(), Some("<main><h1>Title</h1><p>Text <b>bold</b></p></main>"));
	assert_eq!(document.select_html("title").as_deref(), Some("<title>T</title>"));
	assert_eq!(
		entries(&journal),
		["before-render", "render", "load", "scroll:<body><main><h1>Title</h1><p>Text <b>bold</b></p></main></body>"]
	);
}

#[test]
fn root_element_is_a_valid_target() {
	let (mut document, events, journal) = harness("<p>x</p>");

	assert_eq!(document.count("html"), 1);
	assert_eq!(apply(&mut document, &events, PatchAction::Render, "html", "<div>y</div>"), PatchOutcome::Applied);

	assert_eq!(document.html(), "<html><div>y</div></html>");
	assert_eq!(document.count("html"), 1);
	assert_eq!(entries(&journal), ["before-render", "render", "load", "scroll:<html><div>y</div></html>"]);
}

#[test]
fn scripts_survive_replacing_the_body() {
	let (mut document, events, journal) = harness(r#"<div id="form"></div>"#);

	let outcome = apply(&mut document, &events, PatchAction::Replace, "body", r#"<div id="page">y</div><script>s()</script>"#);

	assert_eq!(outcome, PatchOutcome::Applied);
	assert_eq!(document.count("body"), 0);
	assert_eq!(document.count("html > div#page"), 1);
	assert_eq!(document.count("html > script"), 1);
	assert_eq!(
		entries(&journal),
		["before-render", "render", "script:s()", "load", r#"scroll:<div id="page">y</div>"#]
	);
}

#[test]
fn compact_releases_detached_nodes() {
	let (mut document, events, journal) = harness(r#"<div id="panel"><p>0</p></div>"#);
	let initial = document.node_count();

	for i in 1..=5 {
		let fragment = format!("<p>{}</p><script>tick({})</script>", i, i);
		assert_eq!(apply(&mut document, &events, PatchAction::Render, "#panel", &fragment), PatchOutcome::Applied);
	}
	let grown = document.node_count();
	assert!(grown > initial);
	let before = document.html();

	document.compact();

	assert!(document.node_count() < grown);
	assert_eq!(document.html(), before);

	journal.borrow_mut().clear();
	assert_eq!(apply(&mut document, &events, PatchAction::Render, "#panel", "<p>6</p><script>tick(6)</script>"), PatchOutcome::Applied);
	assert_eq!(document.select_html("#panel").as_deref(), Some("<div id=\"panel\"><p>6</p></div>"));
	assert_eq!(entries(&journal)[..4], ["before-render", "render", "script:tick(6)", "load"]);
}

#[test]
fn replace_keeps_only_the_first_element() {
	let (mut document, events, _) = harness(r#"<section><i id="target"></i><hr></section>"#);

	assert_eq!(apply(&mut document, &events, PatchAction::Replace, "#target", r#"<p id="a">A</p><p id="b">B</p>"#), PatchOutcome::Applied);

	assert_eq!(document.select_html("section").as_deref(), Some(r#"<section><p id="a">A</p><hr></section>"#));
	assert_eq!(document.count("#b"), 0);
}

#[test]
fn remove_detaches_without_replay_or_scroll() {
	let (mut document, events, journal) = harness(r#"<div id="flash">Saved</div><p>rest</p>"#);

	assert_eq!(apply(&mut document, &events, PatchAction::Remove, "#flash", "<script>track()</script>"), PatchOutcome::Applied);

	assert_eq!(document.body_html().as_deref(), Some("<p>rest</p>"));
	assert_eq!(entries(&journal), ["before-render", "render", "load"]);

	// A later patch for the same target has nothing to resolve.
	assert_eq!(apply(&mut document, &events, PatchAction::Replace, "#flash", "<div id=\"flash\">Again</div>"), PatchOutcome::TargetNotFound);
	assert_eq!(entries(&journal), ["before-render", "render", "load"]);
}

#[test]
fn scripts_replay_in_order_between_render_and_load() {
	let (mut document, events, journal) = harness(r#"<div id="form"></div>"#);

	let fragment = "<p>x</p><script>first()</script><div><script>second()</script></div>";
	assert_eq!(apply(&mut document, &events, PatchAction::Render, "#form", fragment), PatchOutcome::Applied);

	assert_eq!(document.count("#form script"), 0);
	assert_eq!(document.count("body > script"), 2);
	let entries = entries(&journal);
	assert_eq!(entries[..5], ["before-render", "render", "script:first()", "script:second()", "load"]);
	assert_eq!(entries[5], r#"scroll:<div id="form"><p>x</p><div></div></div>"#);
	assert_eq!(entries.len(), 6);
}

#[test]
fn parsed_scripts_never_execute_by_themselves() {
	let (mut document, events, journal) = harness(r#"<script>inline()</script><div id="target"></div>"#);
	assert!(entries(&journal).is_empty());

	apply(&mut document, &events, PatchAction::Append, "#target", "<span>1</span>");
	assert!(!entries(&journal).iter().any(|entry| entry.starts_with("script:")));
}

#[test]
fn unparsable_fragment_aborts_before_any_event() {
	let (document, events, journal) = harness(r#"<div id="target"><p>old</p></div>"#);
	let mut document = document.with_parser_support(ParserSupport {
		dom_parser: false,
		detached_document: false,
	});
	let before = document.html();

	assert_eq!(apply(&mut document, &events, PatchAction::Render, "#target", "<p>new</p>"), PatchOutcome::ParseFailed);
	assert_eq!(document.html(), before);
	assert!(entries(&journal).is_empty());
}

#[test]
fn detached_document_fallback() {
	let (document, events, journal) = harness(r#"<ul id="list"><li>a</li></ul>"#);
	let mut document = document.with_parser_support(ParserSupport {
		dom_parser: false,
		detached_document: true,
	});

	assert_eq!(apply(&mut document, &events, PatchAction::Append, "#list", "<li>b</li><script>done()</script>"), PatchOutcome::Applied);
	assert_eq!(document.select_html("#list").as_deref(), Some(r#"<ul id="list"><li>a</li><li>b</li></ul>"#));
	assert_eq!(entries(&journal)[..4], ["before-render", "render", "script:done()", "load"]);
}

#[test]
fn encoded_response_patches_the_document() {
	let encoder = ResponseEncoder::new(|template: Option<&str>, _: bool| -> Result<String, io::Error> {
		assert_eq!(template, Some("edit"));
		Ok("<div id=\"errors\">Name can't be blank\n</div><script>highlight('name')</script>".to_owned())
	});
	let context = RequestContext {
		method: http::Method::PATCH,
		xhr: true,
		form_submit: true,
		action_name: Some("update".to_owned()),
	};
	let options = RenderOptions::new()
		.target(RenderTarget::new().action("replace").selector("#errors"))
		.location("/users/1");

	let payload = match encoder.respond(&context, &options) {
		Ok(Rendered::Patch(patch)) => patch.body,
		other => panic!("unexpected result: {:?}", other),
	};
	let instruction = PatchInstruction::from_script(&payload, DEFAULT_DISPATCHER).unwrap();

	let (mut document, events, journal) = harness(r#"<form><span id="errors"></span></form>"#);
	assert_eq!(PatchInterpreter::new(&mut document, &events).apply(&instruction), PatchOutcome::Applied);

	assert_eq!(document.select_html("#errors").as_deref(), Some("<div id=\"errors\">Name can't be blank\n</div>"));
	assert_eq!(
		entries(&journal),
		[
			"before-render",
			"render",
			"script:highlight('name')",
			"load",
			"scroll:<div id=\"errors\">Name can't be blank\n</div>",
		]
	);
}
