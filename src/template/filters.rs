//! Expression filters.

use crate::context::Value;

use super::TemplateError;

/// Widest `pad` accepted; no filesystem allows a longer path component.
pub const MAX_PAD_WIDTH: usize = 255;

/// A transformation applied to an expression value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Upper,
    Lower,
    /// Zero-pad to a minimum width.
    Pad(usize),
    /// Replacement used when the value renders empty.
    Default(String),
    /// First element of a list.
    First,
    /// Join a list with a separator.
    Join(String),
}

impl Filter {
    /// Parse `name` or `name:arg`.
    pub(super) fn parse(template: &str, spec: &str) -> Result<Self, TemplateError> {
        let (name, arg) = match spec.split_once(':') {
            Some((name, arg)) => (name.trim(), Some(arg)),
            None => (spec.trim(), None),
        };

        let missing_arg = || TemplateError::InvalidFilterArgument {
            template: template.to_string(),
            filter: name.to_string(),
            message: "argument required".to_string(),
        };

        match name {
            "upper" => Ok(Filter::Upper),
            "lower" => Ok(Filter::Lower),
            "first" => Ok(Filter::First),
            "pad" => {
                let arg = arg.ok_or_else(missing_arg)?;
                let width: usize = arg
                    .trim()
                    .parse()
                    .map_err(|_| TemplateError::InvalidFilterArgument {
                        template: template.to_string(),
                        filter: name.to_string(),
                        message: format!("expected a width, got {arg:?}"),
                    })?;
                if width > MAX_PAD_WIDTH {
                    return Err(TemplateError::InvalidFilterArgument {
                        template: template.to_string(),
                        filter: name.to_string(),
                        message: format!("width {width} exceeds {MAX_PAD_WIDTH}"),
                    });
                }
                Ok(Filter::Pad(width))
            }
            "default" => Ok(Filter::Default(arg.ok_or_else(missing_arg)?.trim().to_string())),
            "join" => Ok(Filter::Join(arg.ok_or_else(missing_arg)?.trim().to_string())),
            _ => Err(TemplateError::UnknownFilter {
                template: template.to_string(),
                filter: name.to_string(),
            }),
        }
    }

    pub(super) fn apply(&self, value: Value) -> Value {
        match self {
            Filter::Upper => Value::Text(value.to_string().to_uppercase()),
            Filter::Lower => Value::Text(value.to_string().to_lowercase()),
            Filter::Pad(width) => {
                let width = *width;
                match value {
                    Value::Integer(n) if n < 0 => {
                        Value::Text(format!("-{:0>width$}", n.unsigned_abs()))
                    }
                    Value::Integer(n) => Value::Text(format!("{n:0>width$}")),
                    other if other.is_empty() => other,
                    other => Value::Text(format!("{:0>width$}", other.to_string())),
                }
            }
            Filter::Default(text) if value.is_empty() => Value::Text(text.clone()),
            Filter::Default(_) => value,
            Filter::First => match value {
                Value::List(items) => Value::Text(items.into_iter().next().unwrap_or_default()),
                other => other,
            },
            Filter::Join(sep) => match value {
                Value::List(items) => Value::Text(items.join(sep)),
                other => other,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Context, Field};
    use crate::template::Template;

    fn render(template: &str, ctx: &Context) -> String {
        Template::compile(template).unwrap().render(&ctx.render_view())
    }

    #[test]
    fn test_pad_integer() {
        let mut ctx = Context::new();
        ctx.set(Field::Episode, 7u32);
        assert_eq!(render("{{ e | pad:2 }}", &ctx), "07");
        assert_eq!(render("{{ e | pad:3 }}", &ctx), "007");
        ctx.set(Field::Episode, 123u32);
        assert_eq!(render("{{ e | pad:2 }}", &ctx), "123");
    }

    #[test]
    fn test_pad_unset_stays_empty() {
        assert_eq!(render("{{ e | pad:2 }}", &Context::new()), "");
    }

    #[test]
    fn test_default_and_case() {
        let mut ctx = Context::new();
        assert_eq!(render("{{ t | default:TBA }}", &ctx), "TBA");
        ctx.set(Field::Title, "Pilot");
        assert_eq!(render("{{ t | default:TBA | upper }}", &ctx), "PILOT");
        assert_eq!(render("{{ t | lower }}", &ctx), "pilot");
    }

    #[test]
    fn test_list_filters() {
        let mut ctx = Context::new();
        ctx.set(
            Field::AudioLanguages,
            vec!["eng".to_string(), "jpn".to_string()],
        );
        assert_eq!(render("{{ audioLanguages }}", &ctx), "eng, jpn");
        assert_eq!(render("{{ audioLanguages | first }}", &ctx), "eng");
        assert_eq!(render("{{ audioLanguages | join:+ }}", &ctx), "eng+jpn");
        assert_eq!(render("{{ textLanguages | first }}", &ctx), "");
    }

    #[test]
    fn test_unknown_filter() {
        let err = Template::compile("{{ n | shout }}").unwrap_err();
        assert!(matches!(err, TemplateError::UnknownFilter { filter, .. } if filter == "shout"));
    }

    #[test]
    fn test_bad_pad_argument() {
        assert!(matches!(
            Template::compile("{{ e | pad:x }}").unwrap_err(),
            TemplateError::InvalidFilterArgument { .. }
        ));
        assert!(matches!(
            Template::compile("{{ e | pad }}").unwrap_err(),
            TemplateError::InvalidFilterArgument { .. }
        ));
    }

    #[test]
    fn test_pad_width_is_capped() {
        assert!(matches!(
            Template::compile("{{ e | pad:70000 }}").unwrap_err(),
            TemplateError::InvalidFilterArgument { message, .. } if message.contains("70000")
        ));

        let mut ctx = Context::new();
        ctx.set(Field::Episode, 7u32);
        let widest = format!("{{{{ e | pad:{MAX_PAD_WIDTH} }}}}");
        assert_eq!(render(&widest, &ctx).len(), MAX_PAD_WIDTH);
    }
}
