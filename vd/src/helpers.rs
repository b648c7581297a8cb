//! View helpers
//!
//! URL, CSRF and method-spoofing helpers. Each is a plain function and is
//! also registered under the same name as a handlebars helper.

use handlebars::{
    Context, Handlebars, Helper, HelperResult, Output, RenderContext, RenderErrorReason, html_escape,
};
use rand::Rng;
use serde_json::{Map, Value};
use tracing::debug;

/// Default form field name for the CSRF token
pub const CSRF_FIELD_NAME: &str = "__token__";

/// Context key the `csrf_field` helper reads the token from
pub const CSRF_CONTEXT_KEY: &str = "csrf_token";

/// Build a URL: `[scheme://domain]/url[.suffix][?key=value&...]`
pub fn route(url: &str, vars: &Map<String, Value>, suffix: Option<&str>, domain: Option<&str>) -> String {
    debug!(%url, ?suffix, ?domain, "route: called");
    let mut out = String::new();

    if let Some(domain) = domain.filter(|d| !d.is_empty()) {
        if domain.contains("://") {
            out.push_str(domain.trim_end_matches('/'));
        } else {
            out.push_str("http://");
            out.push_str(domain.trim_end_matches('/'));
        }
    }

    let path = url.trim_matches('/');
    out.push('/');
    out.push_str(path);

    let suffix = suffix.map(|s| s.trim_start_matches('.')).filter(|s| !s.is_empty());
    if let Some(suffix) = suffix {
        if !path.is_empty() {
            out.push('.');
            out.push_str(suffix);
        }
    }

    if !vars.is_empty() {
        let query: Vec<String> = vars
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(key),
                    urlencoding::encode(&value_to_string(value))
                )
            })
            .collect();
        out.push('?');
        out.push_str(&query.join("&"));
    }

    out
}

/// Fresh random token, 32 hex characters, for hosts minting a session token
pub fn csrf_token() -> String {
    format!("{:032x}", rand::rng().random::<u128>())
}

/// Hidden form field carrying a CSRF token
pub fn csrf_field(name: &str, token: &str) -> String {
    format!(
        r#"<input type="hidden" name="{}" value="{}">"#,
        html_escape(name),
        html_escape(token)
    )
}

/// Hidden `_method` field for spoofing PUT/PATCH/DELETE; empty for an empty name
pub fn method_field(name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    format!(r#"<input type="hidden" name="_method" value="{}">"#, html_escape(name))
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn str_param<'a>(h: &'a Helper, index: usize) -> Option<&'a str> {
    h.param(index).and_then(|p| p.value().as_str())
}

/// `{{route "user/show" id=5 _suffix="html" _domain="example.com"}}`
fn route_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _rc: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let url = str_param(h, 0).unwrap_or("");
    let mut vars = Map::new();
    let mut suffix = None;
    let mut domain = None;

    for (key, param) in h.hash() {
        match *key {
            "_suffix" => suffix = param.value().as_str(),
            "_domain" => domain = param.value().as_str(),
            _ => {
                vars.insert(key.to_string(), param.value().clone());
            }
        }
    }

    out.write(&route(url, &vars, suffix, domain))?;
    Ok(())
}

/// `{{csrf_field}}` or `{{csrf_field "_csrf"}}`
///
/// The token must come from the render context; a token made up here could
/// never be checked by the host.
fn csrf_field_helper(
    h: &Helper,
    _: &Handlebars,
    ctx: &Context,
    _rc: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let name = str_param(h, 0).unwrap_or(CSRF_FIELD_NAME);
    let token = ctx
        .data()
        .get(CSRF_CONTEXT_KEY)
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| RenderErrorReason::MissingVariable(Some(CSRF_CONTEXT_KEY.to_string())))?;

    out.write(&csrf_field(name, token))?;
    Ok(())
}

/// `{{method_field "PUT"}}`
fn method_field_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _rc: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    out.write(&method_field(str_param(h, 0).unwrap_or("")))?;
    Ok(())
}

/// Register `route`, `csrf_field` and `method_field` on a registry
pub fn register_helpers(hbs: &mut Handlebars) {
    debug!("register_helpers: called");
    hbs.register_helper("route", Box::new(route_helper));
    hbs.register_helper("csrf_field", Box::new(csrf_field_helper));
    hbs.register_helper("method_field", Box::new(method_field_helper));
}
