//! Recognising which submissions go through the patch path.

use http::{HeaderMap, Method};

/// Request header the client attaches to tagged submissions.
pub const FORM_SUBMIT_HEADER: &str = "turbolinks-form-submit";

/// Response header marking a patch payload.
pub const FORM_RENDER_HEADER: &str = "turbolinks-form-render";

/// Attribute opting a form into tagged submissions.
pub const MARKER_ATTRIBUTE: &str = "data-turbolinks-form";

/// Header rails-ujs (and most other AJAX helpers) set on asynchronous requests.
pub const REQUESTED_WITH_HEADER: &str = "x-requested-with";

/// Whether a submission of a form (`marked` with [`MARKER_ATTRIBUTE`]) should carry [`FORM_SUBMIT_HEADER`].
///
/// Safe reads are never tagged; they are handled as regular navigations.
#[must_use]
pub fn should_tag(method: &str, marked: bool) -> bool {
	marked && !method.eq_ignore_ascii_case("GET") && !method.eq_ignore_ascii_case("HEAD")
}

/// The request facts the render decision depends on, captured once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
	pub method: Method,
	/// Asynchronous (non-navigation) request.
	pub xhr: bool,
	/// [`FORM_SUBMIT_HEADER`] present.
	pub form_submit: bool,
	/// Name of the handling controller action, such as `"create"`, used to infer the template.
	pub action_name: Option<String>,
}

impl RequestContext {
	#[must_use]
	pub fn from_parts(method: &Method, headers: &HeaderMap, action_name: Option<&str>) -> Self {
		let xhr = headers
			.get(REQUESTED_WITH_HEADER)
			.and_then(|value| value.to_str().ok())
			.map_or(false, |value| value.eq_ignore_ascii_case("XMLHttpRequest"));
		Self {
			method: method.clone(),
			xhr,
			form_submit: headers.contains_key(FORM_SUBMIT_HEADER),
			action_name: action_name.map(str::to_owned),
		}
	}

	/// Asynchronous, non-GET, and tagged.
	#[must_use]
	pub fn is_form_submission(&self) -> bool {
		self.xhr && self.method != Method::GET && self.form_submit
	}
}
