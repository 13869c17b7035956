//! Server side: deciding when to answer with a patch, and producing it.

use crate::{
	action::PatchAction,
	error::{ConfigError, EncodeError},
	instruction::{PatchInstruction, DEFAULT_DISPATCHER, DEFAULT_SELECTOR},
	request::{RequestContext, FORM_RENDER_HEADER},
};
use http::{
	header::{CACHE_CONTROL, CONTENT_TYPE},
	HeaderValue, Response, StatusCode,
};
use tracing::{debug, instrument, trace, warn};

pub const JAVASCRIPT_CONTENT_TYPE: &str = "text/javascript; charset=utf-8";

/// Where and how the rendered fragment lands in the client document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderTarget {
	/// Name of a [`PatchAction`]; validated by [`decide`]. Defaults to `render`.
	pub action: Option<String>,
	/// Defaults to `body`.
	pub selector: Option<String>,
}

impl RenderTarget {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn action(mut self, action: impl Into<String>) -> Self {
		self.action = Some(action.into());
		self
	}

	#[must_use]
	pub fn selector(mut self, selector: impl Into<String>) -> Self {
		self.selector = Some(selector.into());
		self
	}
}

/// The arguments a handler passes to its render step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
	pub template: Option<String>,
	pub layout: bool,
	pub target: Option<RenderTarget>,
	/// Redirect destination for clients that don't take the patch path.
	pub location: Option<String>,
}

impl Default for RenderOptions {
	fn default() -> Self {
		Self {
			template: None,
			layout: true,
			target: None,
			location: None,
		}
	}
}

impl RenderOptions {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn template(mut self, template: impl Into<String>) -> Self {
		self.template = Some(template.into());
		self
	}

	#[must_use]
	pub fn layout(mut self, layout: bool) -> Self {
		self.layout = layout;
		self
	}

	#[must_use]
	pub fn target(mut self, target: RenderTarget) -> Self {
		self.target = Some(target);
		self
	}

	#[must_use]
	pub fn location(mut self, location: impl Into<String>) -> Self {
		self.location = Some(location.into());
		self
	}
}

/// Whether a [`RenderTarget`] must come with a fallback `location`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetLocationPolicy {
	/// A target without `location` is a [`ConfigError::TargetWithoutLocation`].
	/// Untagged requests are then redirected to `location` instead of receiving the full-page render.
	RequireFallbackLocation,
	/// A target may be given alone. Untagged requests fall through to the default render.
	Permissive,
}

impl Default for TargetLocationPolicy {
	fn default() -> Self {
		TargetLocationPolicy::RequireFallbackLocation
	}
}

/// A resolved patch, waiting for its fragment to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchPlan {
	pub action: PatchAction,
	pub selector: String,
	/// `None` leaves the choice to the renderer.
	pub template: Option<String>,
	pub layout: bool,
}

impl PatchPlan {
	#[must_use]
	pub fn into_instruction(self, fragment: String) -> PatchInstruction {
		PatchInstruction {
			action: self.action,
			selector: self.selector,
			fragment,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderDecision {
	UseDefaultRender,
	Redirect(String),
	UseTargetedPatch(PatchPlan),
}

/// Decides how to answer a request given the handler's render options.
///
/// # Errors
///
/// - [`ConfigError::UnsupportedAction`] if the target names an unknown action, regardless of the request.
/// - [`ConfigError::TargetWithoutLocation`] under [`TargetLocationPolicy::RequireFallbackLocation`].
pub fn decide(context: &RequestContext, options: &RenderOptions, policy: TargetLocationPolicy) -> Result<RenderDecision, ConfigError> {
	let action = match &options.target {
		Some(target) => target.action.as_deref().map_or(Ok(PatchAction::default()), str::parse::<PatchAction>)?,
		None => PatchAction::default(),
	};

	let has_target = options.target.is_some();
	if policy == TargetLocationPolicy::RequireFallbackLocation && has_target && options.location.is_none() {
		return Err(ConfigError::TargetWithoutLocation);
	}

	if context.is_form_submission() {
		if options.location.is_some() && !has_target {
			// A plain redirect answer, which the client follows itself.
			return Ok(RenderDecision::UseDefaultRender);
		}
		return Ok(RenderDecision::UseTargetedPatch(plan(context, options, action)));
	}

	match (&options.location, has_target, policy) {
		(Some(location), true, TargetLocationPolicy::RequireFallbackLocation) => Ok(RenderDecision::Redirect(location.clone())),
		_ => Ok(RenderDecision::UseDefaultRender),
	}
}

fn plan(context: &RequestContext, options: &RenderOptions, action: PatchAction) -> PatchPlan {
	let target = options.target.as_ref();
	PatchPlan {
		action,
		selector: target
			.and_then(|target| target.selector.clone())
			.unwrap_or_else(|| DEFAULT_SELECTOR.to_owned()),
		template: options
			.template
			.clone()
			.or_else(|| context.action_name.as_deref().map(infer_template).map(str::to_owned)),
		// A layout wraps the whole document, which a subtree patch never replaces.
		layout: options.layout && target.is_none(),
	}
}

/// Failed submissions re-render the form that produced them.
fn infer_template(action_name: &str) -> &str {
	match action_name {
		"create" => "new",
		"update" => "edit",
		other => other,
	}
}

/// Renders a template to HTML. Implemented for any matching closure.
pub trait TemplateRenderer {
	type Error: std::error::Error + Send + Sync + 'static;

	/// # Errors
	///
	/// Whenever the template can't be rendered.
	fn render_to_string(&self, template: Option<&str>, layout: bool) -> Result<String, Self::Error>;
}

impl<F, E> TemplateRenderer for F
where
	F: Fn(Option<&str>, bool) -> Result<String, E>,
	E: std::error::Error + Send + Sync + 'static,
{
	type Error = E;

	fn render_to_string(&self, template: Option<&str>, layout: bool) -> Result<String, E> {
		self(template, layout)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
	/// Client-side function the payload calls.
	pub dispatcher: String,
	pub location_policy: TargetLocationPolicy,
	/// `Cache-Control` of patch responses, which must never be cached as the resource's representation.
	pub cache_control: String,
}

impl Default for EncoderConfig {
	fn default() -> Self {
		Self {
			dispatcher: DEFAULT_DISPATCHER.to_owned(),
			location_policy: TargetLocationPolicy::default(),
			cache_control: "no-store".to_owned(),
		}
	}
}

#[derive(Debug)]
pub enum Rendered {
	/// Proceed with the framework's normal rendering.
	Default,
	Redirect(String),
	Patch(PatchResponse),
}

/// A finished patch response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchResponse {
	pub instruction: PatchInstruction,
	/// The script payload.
	pub body: String,
	cache_control: String,
}

impl PatchResponse {
	#[must_use]
	pub fn into_response(self) -> Response<String> {
		let mut response = Response::new(self.body);
		*response.status_mut() = StatusCode::OK;
		let headers = response.headers_mut();
		headers.insert(CONTENT_TYPE, HeaderValue::from_static(JAVASCRIPT_CONTENT_TYPE));
		headers.insert(FORM_RENDER_HEADER, HeaderValue::from_static("1"));
		match HeaderValue::from_str(&self.cache_control) {
			Ok(value) => {
				headers.insert(CACHE_CONTROL, value);
			}
			Err(_) => {
				warn!("Invalid Cache-Control value {:?}; falling back to `no-store`.", self.cache_control);
				headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
			}
		}
		response
	}
}

impl From<PatchResponse> for Response<String> {
	fn from(patch: PatchResponse) -> Self {
		patch.into_response()
	}
}

/// Intercepts render steps of tagged form submissions and answers them with patch payloads.
pub struct ResponseEncoder<R> {
	renderer: R,
	config: EncoderConfig,
}

impl<R: TemplateRenderer> ResponseEncoder<R> {
	#[must_use]
	pub fn new(renderer: R) -> Self {
		Self::with_config(renderer, EncoderConfig::default())
	}

	#[must_use]
	pub fn with_config(renderer: R, config: EncoderConfig) -> Self {
		Self { renderer, config }
	}

	#[must_use]
	pub fn config(&self) -> &EncoderConfig {
		&self.config
	}

	/// # Errors
	///
	/// Configuration errors from [`decide`] and failures of the renderer.
	#[instrument(skip(self, options))]
	pub fn respond(&self, context: &RequestContext, options: &RenderOptions) -> Result<Rendered, EncodeError> {
		match decide(context, options, self.config.location_policy)? {
			RenderDecision::UseDefaultRender => {
				trace!("Deferring to the default render.");
				Ok(Rendered::Default)
			}
			RenderDecision::Redirect(location) => {
				debug!("Redirecting untagged request to {:?}.", location);
				Ok(Rendered::Redirect(location))
			}
			RenderDecision::UseTargetedPatch(plan) => self.encode(plan).map(Rendered::Patch),
		}
	}

	/// Renders `plan` and wraps it into a payload.
	///
	/// # Errors
	///
	/// Iff the renderer fails.
	pub fn encode(&self, plan: PatchPlan) -> Result<PatchResponse, EncodeError> {
		let html = self
			.renderer
			.render_to_string(plan.template.as_deref(), plan.layout)
			.map_err(|error| EncodeError::Render(Box::new(error)))?;

		let instruction = plan.into_instruction(html);
		let body = instruction.to_script(&self.config.dispatcher);
		debug!(
			"Encoded `{}` patch for {:?} ({} byte fragment, {} byte payload).",
			instruction.action,
			instruction.selector,
			instruction.fragment.len(),
			body.len()
		);
		if cfg!(feature = "dangerous-logging") {
			trace!("Fragment: {:?}", instruction.fragment);
		}

		Ok(PatchResponse {
			instruction,
			body,
			cache_control: self.config.cache_control.clone(),
		})
	}
}
