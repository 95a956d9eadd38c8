//! Path templates.
//!
//! A destination is described by an ordered list of template strings, one per
//! path component. Each string is compiled once into a [`Template`]; rendering
//! substitutes `{{ var }}` expressions from a [`ContextView`]. Components are
//! rendered and sanitised independently so a value containing `/` can never
//! add path components.
//!
//! Expression syntax:
//!
//! ```text
//! {{ name }}                 plain substitution
//! {{ info.title }}           key of a map field
//! {{ e | pad:2 }}            filters, applied left to right
//! {{ t | default:Unknown }}
//! ```

mod filters;

pub use filters::Filter;

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use reelname_common::paths::{is_unusable_component, sanitize_component};
use reelname_common::MediaKind;
use thiserror::Error;

use crate::context::{ContextView, Field, Value, ValueKind};

/// Errors raised while compiling a template.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template list is empty")]
    NoSegments,

    #[error("unterminated expression in template {template:?}")]
    Unterminated { template: String },

    #[error("empty expression in template {template:?}")]
    EmptyExpression { template: String },

    #[error("unknown variable `{name}` in template {template:?}")]
    UnknownVariable { template: String, name: String },

    #[error("`{name}` is not a map and has no key `{key}` (template {template:?})")]
    NotAMap {
        template: String,
        name: String,
        key: String,
    },

    #[error("unknown filter `{filter}` in template {template:?}")]
    UnknownFilter { template: String, filter: String },

    #[error("invalid argument for filter `{filter}` in template {template:?}: {message}")]
    InvalidFilterArgument {
        template: String,
        filter: String,
        message: String,
    },
}

/// Errors raised while turning a rendered template into a path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("every path component rendered empty")]
    EmptyPath,
}

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Literal(String),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
struct Expr {
    field: Field,
    key: Option<String>,
    filters: Vec<Filter>,
}

/// A single compiled path-component template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    source: String,
    parts: Vec<Part>,
}

impl Template {
    /// Compile a template string.
    ///
    /// Unknown variables and filters are rejected here, so rendering a
    /// compiled template cannot fail.
    pub fn compile(source: &str) -> Result<Self, TemplateError> {
        let mut parts = Vec::new();
        let mut rest = source;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                parts.push(Part::Literal(rest[..start].to_string()));
            }
            let after_open = &rest[start + 2..];
            let end = after_open
                .find("}}")
                .ok_or_else(|| TemplateError::Unterminated {
                    template: source.to_string(),
                })?;
            parts.push(Part::Expr(parse_expr(source, &after_open[..end])?));
            rest = &after_open[end + 2..];
        }
        if !rest.is_empty() {
            parts.push(Part::Literal(rest.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            parts,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Fields referenced by this template.
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.parts.iter().filter_map(|part| match part {
            Part::Expr(expr) => Some(expr.field),
            Part::Literal(_) => None,
        })
    }

    /// Substitute every expression. Unset fields render empty.
    pub fn render(&self, view: &ContextView) -> String {
        let mut out = String::with_capacity(self.source.len());
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Expr(expr) => {
                    let mut value = view.get(expr.field).clone();
                    if let Some(key) = &expr.key {
                        value = match value {
                            Value::Map(map) => {
                                Value::Text(map.get(key).cloned().unwrap_or_default())
                            }
                            _ => Value::Text(String::new()),
                        };
                    }
                    for filter in &expr.filters {
                        value = filter.apply(value);
                    }
                    out.push_str(&value.to_string());
                }
            }
        }
        out
    }
}

fn parse_expr(template: &str, raw: &str) -> Result<Expr, TemplateError> {
    let mut pieces = raw.split('|').map(str::trim);
    let head = pieces.next().unwrap_or_default();
    if head.is_empty() {
        return Err(TemplateError::EmptyExpression {
            template: template.to_string(),
        });
    }

    let (name, key) = match head.split_once('.') {
        Some((name, key)) => (name.trim(), Some(key.trim().to_string())),
        None => (head, None),
    };

    let field = Field::from_name(name).ok_or_else(|| TemplateError::UnknownVariable {
        template: template.to_string(),
        name: name.to_string(),
    })?;

    if let Some(key) = &key {
        if field.kind() != ValueKind::Map {
            return Err(TemplateError::NotAMap {
                template: template.to_string(),
                name: name.to_string(),
                key: key.clone(),
            });
        }
    }

    let filters = pieces
        .map(|spec| Filter::parse(template, spec))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Expr {
        field,
        key,
        filters,
    })
}

/// Ordered per-component templates for one media kind.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateSet {
    segments: Vec<Template>,
}

impl TemplateSet {
    /// Compile a list of per-component template strings.
    pub fn compile<S: AsRef<str>>(segments: &[S]) -> Result<Self, TemplateError> {
        if segments.is_empty() {
            return Err(TemplateError::NoSegments);
        }
        let segments = segments
            .iter()
            .map(|s| Template::compile(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Template] {
        &self.segments
    }

    /// Build a destination path under `base_dir`.
    ///
    /// Each component is rendered, stripped of filesystem-illegal characters
    /// and dropped when nothing usable remains. `suffix` (including its dot)
    /// is appended byte for byte to the final component.
    pub fn render_destination(
        &self,
        view: &ContextView,
        base_dir: &Path,
        suffix: impl AsRef<OsStr>,
    ) -> Result<PathBuf, RenderError> {
        let mut components: Vec<String> = self
            .segments
            .iter()
            .map(|segment| sanitize_component(&segment.render(view)))
            .filter(|component| !is_unusable_component(component))
            .collect();

        let mut file_name = OsString::from(components.pop().ok_or(RenderError::EmptyPath)?);
        file_name.push(suffix);

        let mut path = base_dir.to_path_buf();
        path.extend(components);
        path.push(file_name);
        Ok(path)
    }
}

/// Compiled templates for every media kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Templates {
    pub series: TemplateSet,
    pub movie: TemplateSet,
}

impl Templates {
    pub fn for_kind(&self, kind: MediaKind) -> &TemplateSet {
        match kind {
            MediaKind::Series => &self.series,
            MediaKind::Movie => &self.movie,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use assert_matches::assert_matches;

    fn episode_context() -> Context {
        let mut ctx = Context::new();
        ctx.set(Field::Name, "Show");
        ctx.set(Field::Year, 2020);
        ctx.set(Field::Season, 1u32);
        ctx.set(Field::Episode, 2u32);
        ctx.set(Field::Title, "Second");
        ctx
    }

    #[test]
    fn test_compile_literal_only() {
        let t = Template::compile("Specials").unwrap();
        assert_eq!(t.render(&Context::new().render_view()), "Specials");
        assert_eq!(t.fields().count(), 0);
    }

    #[test]
    fn test_render_with_whitespace_in_braces() {
        let t = Template::compile("{{ n }} ({{y}})").unwrap();
        assert_eq!(t.render(&episode_context().render_view()), "Show (2020)");
    }

    #[test]
    fn test_unset_fields_render_empty() {
        let t = Template::compile("{{n}}{{t}}").unwrap();
        assert_eq!(t.render(&Context::new().render_view()), "");
    }

    #[test]
    fn test_unknown_variable() {
        let err = Template::compile("{{ nope }}").unwrap_err();
        assert_matches!(err, TemplateError::UnknownVariable { name, .. } if name == "nope");
    }

    #[test]
    fn test_unterminated() {
        assert_matches!(
            Template::compile("{{ n }").unwrap_err(),
            TemplateError::Unterminated { .. }
        );
    }

    #[test]
    fn test_empty_expression() {
        assert_matches!(
            Template::compile("a {{  }} b").unwrap_err(),
            TemplateError::EmptyExpression { .. }
        );
    }

    #[test]
    fn test_map_key_access() {
        let mut ctx = Context::new();
        ctx.set(
            Field::Info,
            std::collections::BTreeMap::from([("kind".to_string(), "series".to_string())]),
        );
        let t = Template::compile("{{ info.kind }}|{{ info.missing }}").unwrap();
        assert_eq!(t.render(&ctx.render_view()), "series|");
    }

    #[test]
    fn test_key_on_non_map_is_rejected() {
        assert_matches!(
            Template::compile("{{ n.first }}").unwrap_err(),
            TemplateError::NotAMap { .. }
        );
    }

    #[test]
    fn test_render_destination_joins_segments() {
        let set = TemplateSet::compile(&["{{n}} ({{y}})", "S{{s}}E{{e}} - {{t}}"]).unwrap();
        let path = set
            .render_destination(&episode_context().render_view(), Path::new("/media"), ".mkv")
            .unwrap();
        assert_eq!(path, PathBuf::from("/media/Show (2020)/S1E2 - Second.mkv"));
    }

    #[test]
    fn test_slash_in_value_does_not_add_components() {
        let mut ctx = episode_context();
        ctx.set(Field::Title, "Before/After: Part 1");
        let set = TemplateSet::compile(&["{{n}}", "{{t}}"]).unwrap();
        let path = set
            .render_destination(&ctx.render_view(), Path::new("/base"), ".mkv")
            .unwrap();
        assert_eq!(path, PathBuf::from("/base/Show/BeforeAfter Part 1.mkv"));
    }

    #[test]
    fn test_empty_components_are_dropped() {
        let set = TemplateSet::compile(&["{{n}}", "{{vs}}", "{{t}}"]).unwrap();
        let path = set
            .render_destination(&episode_context().render_view(), Path::new("/b"), ".mkv")
            .unwrap();
        assert_eq!(path, PathBuf::from("/b/Show/Second.mkv"));
    }

    #[test]
    fn test_dot_components_are_dropped() {
        let set = TemplateSet::compile(&["..", "{{n}}"]).unwrap();
        let path = set
            .render_destination(&episode_context().render_view(), Path::new("/b"), ".mkv")
            .unwrap();
        assert_eq!(path, PathBuf::from("/b/Show.mkv"));
    }

    #[test]
    fn test_all_components_empty() {
        let set = TemplateSet::compile(&["{{vs}}", "{{group}}"]).unwrap();
        let err = set
            .render_destination(&Context::new().render_view(), Path::new("/b"), ".mkv")
            .unwrap_err();
        assert_eq!(err, RenderError::EmptyPath);
    }

    #[test]
    fn test_suffix_is_appended_not_substituted() {
        let mut ctx = Context::new();
        ctx.set(Field::Name, "Mr. Robot v1.0");
        let set = TemplateSet::compile(&["{{n}}"]).unwrap();
        let path = set
            .render_destination(&ctx.render_view(), Path::new("/b"), ".mkv")
            .unwrap();
        assert_eq!(path, PathBuf::from("/b/Mr. Robot v1.0.mkv"));
    }

    #[test]
    fn test_no_segments() {
        let empty: [&str; 0] = [];
        assert_eq!(
            TemplateSet::compile(&empty).unwrap_err(),
            TemplateError::NoSegments
        );
    }
}
