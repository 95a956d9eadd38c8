//! Per-file template variables.
//!
//! A [`Context`] is a sparse bag of named values. Every variable a template may
//! reference is a [`Field`]; each field has a fixed value type and is written
//! by exactly one analysis step (its [`Origin`]). Templates never see the
//! sparse map directly: [`Context::render_view`] produces a dense
//! [`ContextView`] in which every unset field is an empty sentinel.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

/// Which analysis step owns a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Derived from the file name at construction.
    Filename,
    /// Derived from a structural probe of the file.
    Media,
    /// Derived from the assigned metadata match.
    Match,
}

/// Value type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Integer,
    Date,
    List,
    Map,
}

macro_rules! fields {
    ($( $(#[$doc:meta])* $variant:ident => $name:literal, $kind:ident, $origin:ident; )*) => {
        /// A template variable identifier.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Field {
            $( $(#[$doc])* $variant, )*
        }

        impl Field {
            /// Every field, in declaration order.
            pub const ALL: &'static [Field] = &[$(Field::$variant,)*];

            /// Name used in templates.
            pub fn name(self) -> &'static str {
                match self {
                    $(Field::$variant => $name,)*
                }
            }

            pub fn kind(self) -> ValueKind {
                match self {
                    $(Field::$variant => ValueKind::$kind,)*
                }
            }

            pub fn origin(self) -> Origin {
                match self {
                    $(Field::$variant => Origin::$origin,)*
                }
            }

            /// Look up a field by its template name.
            pub fn from_name(name: &str) -> Option<Field> {
                match name {
                    $($name => Some(Field::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

fields! {
    /// Series or movie name (`Dark Angel`)
    Name => "n", Text, Match;
    /// Series or movie year (`2009`)
    Year => "y", Integer, Match;
    /// Name and year (`Avatar (2009)`)
    NameYear => "ny", Text, Match;
    /// Season number (`3`)
    Season => "s", Integer, Match;
    /// Episode number (`1`)
    Episode => "e", Integer, Match;
    /// `1x01`
    SxE => "sxe", Text, Match;
    /// `S01E01`
    S00E00 => "s00e00", Text, Match;
    /// Episode title (`Labyrinth`)
    Title => "t", Text, Match;
    /// Air date
    AirDate => "d", Date, Match;
    /// Episode numbers (`[1]`)
    EpisodeNumbers => "es", List, Match;
    /// Source reference id
    Id => "id", Text, Match;
    /// `Episode` or `Movie`
    ItemType => "type", Text, Match;
    /// `Firefly - 1x01 - Serenity`
    EpisodeLabel => "episode", Text, Match;
    /// Sort collection letter (`A`)
    SortLetter => "az", Text, Match;
    /// Movie decade (`1970`)
    Decade => "decade", Integer, Match;
    /// Match properties
    Info => "info", Map, Match;

    /// File name without extension
    FileName => "fn", Text, Filename;
    /// File extension as found on disk
    Extension => "ext", Text, Filename;
    /// Container format (`mkv`)
    ContainerFormat => "cf", Text, Filename;
    /// Source class (`BluRay`)
    SourceClass => "vs", Text, Filename;
    /// Source token as written in the name (`BDRip`)
    SourceMatch => "source", Text, Filename;
    /// Release group (`ALLiANCE`)
    Group => "group", Text, Filename;

    /// Video compression format (`HEVC`)
    VideoFormat => "vcf", Text, Media;
    /// Video codec library (`x264`)
    VideoCodec => "vc", Text, Media;
    /// Audio codec (`AC-3`)
    AudioCodec => "ac", Text, Media;
    /// Channel layout (`5.1`)
    Channels => "channels", Text, Media;
    /// Channel count (`6ch`)
    AudioChannelCount => "af", Text, Media;
    /// `3840x2160`
    Resolution => "resolution", Text, Media;
    Width => "width", Integer, Media;
    Height => "height", Integer, Media;
    BitDepth => "bitdepth", Integer, Media;
    Hdr => "hdr", Text, Media;
    DolbyVision => "dovi", Text, Media;
    /// Standard video format (`1080p`)
    VideoStandard => "vf", Text, Media;
    /// Definition class (`UHD`)
    Definition => "hd", Text, Media;
    /// `23.976 fps`
    FrameRate => "fps", Text, Media;
    /// `48 kHz`
    SampleRate => "khz", Text, Media;
    Seconds => "seconds", Integer, Media;
    Minutes => "minutes", Integer, Media;
    /// `H:MM`
    Hours => "hours", Text, Media;
    /// `356 MB`
    Megabytes => "megabytes", Text, Media;
    /// `0.4 GB`
    Gigabytes => "gigabytes", Text, Media;
    AudioLanguages => "audioLanguages", List, Media;
    TextLanguages => "textLanguages", List, Media;
    /// Container properties
    MediaProperties => "media", Map, Media;
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed context value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Integer(i64),
    Date(NaiveDate),
    List(Vec<String>),
    Map(BTreeMap<String, String>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Text(_) => ValueKind::Text,
            Value::Integer(_) => ValueKind::Integer,
            Value::Date(_) => ValueKind::Date,
            Value::List(_) => ValueKind::List,
            Value::Map(_) => ValueKind::Map,
        }
    }

    /// Whether the value renders as nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Text(s) => s.is_empty(),
            Value::Integer(_) | Value::Date(_) => false,
            Value::List(items) => items.is_empty(),
            Value::Map(map) => map.is_empty(),
        }
    }

    fn sentinel(kind: ValueKind) -> Value {
        match kind {
            ValueKind::List => Value::List(Vec::new()),
            _ => Value::Text(String::new()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::List(items) => f.write_str(&items.join(", ")),
            Value::Map(map) => {
                let pairs: Vec<String> = map.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                f.write_str(&pairs.join(", "))
            }
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

impl From<BTreeMap<String, String>> for Value {
    fn from(map: BTreeMap<String, String>) -> Self {
        Value::Map(map)
    }
}

/// Sparse mapping of fields to values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: BTreeMap<Field, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a field.
    ///
    /// Collections replace the previous value wholesale. A value whose type
    /// does not match the field is dropped with a warning.
    pub fn set(&mut self, field: Field, value: impl Into<Value>) {
        let value = value.into();
        if value.kind() != field.kind() {
            tracing::warn!(
                field = field.name(),
                expected = ?field.kind(),
                actual = ?value.kind(),
                "ignoring context value of the wrong type"
            );
            return;
        }
        self.values.insert(field, value);
    }

    /// Set a field when `value` is present, leave it untouched otherwise.
    pub fn set_opt<V: Into<Value>>(&mut self, field: Field, value: Option<V>) {
        if let Some(value) = value {
            self.set(field, value);
        }
    }

    pub fn get(&self, field: Field) -> Option<&Value> {
        self.values.get(&field)
    }

    pub fn unset(&mut self, field: Field) {
        self.values.remove(&field);
    }

    /// Remove every field written by `origin`.
    pub fn clear_origin(&mut self, origin: Origin) {
        self.values.retain(|field, _| field.origin() != origin);
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Dense snapshot for template evaluation.
    pub fn render_view(&self) -> ContextView {
        let values = Field::ALL
            .iter()
            .map(|&field| {
                let value = self
                    .values
                    .get(&field)
                    .cloned()
                    .unwrap_or_else(|| Value::sentinel(field.kind()));
                (field, value)
            })
            .collect();
        ContextView { values }
    }
}

/// Immutable, dense mapping of every field to a value.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextView {
    values: BTreeMap<Field, Value>,
}

impl ContextView {
    pub fn get(&self, field: Field) -> &Value {
        // Every field is inserted by render_view; the fallback is unreachable
        // but keeps the accessor total.
        static EMPTY: Value = Value::Text(String::new());
        self.values.get(&field).unwrap_or(&EMPTY)
    }

    /// Look up by template name. `None` only for unknown identifiers.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        Field::from_name(name).map(|field| self.get(field))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &Value)> {
        self.values.iter().map(|(field, value)| (*field, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_are_unique() {
        let mut names: Vec<&str> = Field::ALL.iter().map(|f| f.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Field::ALL.len());
    }

    #[test]
    fn test_from_name_round_trips() {
        for field in Field::ALL {
            assert_eq!(Field::from_name(field.name()), Some(*field));
        }
        assert_eq!(Field::from_name("nope"), None);
    }

    #[test]
    fn test_set_overwrites_collections() {
        let mut ctx = Context::new();
        ctx.set(Field::EpisodeNumbers, vec!["1".to_string(), "2".to_string()]);
        ctx.set(Field::EpisodeNumbers, vec!["3".to_string()]);
        assert_eq!(
            ctx.get(Field::EpisodeNumbers),
            Some(&Value::List(vec!["3".to_string()]))
        );
    }

    #[test]
    fn test_set_rejects_wrong_type() {
        let mut ctx = Context::new();
        ctx.set(Field::Season, "one");
        assert_eq!(ctx.get(Field::Season), None);
    }

    #[test]
    fn test_render_view_is_dense() {
        let mut ctx = Context::new();
        ctx.set(Field::Name, "Show");
        let view = ctx.render_view();

        assert_eq!(view.iter().count(), Field::ALL.len());
        assert_eq!(view.get(Field::Name), &Value::Text("Show".into()));
        assert_eq!(view.get(Field::Season), &Value::Text(String::new()));
        assert_eq!(view.get(Field::AudioLanguages), &Value::List(vec![]));
        assert!(view.lookup("missing").is_none());
    }

    #[test]
    fn test_clear_origin_keeps_other_fields() {
        let mut ctx = Context::new();
        ctx.set(Field::Name, "Show");
        ctx.set(Field::Season, 1u32);
        ctx.set(Field::SourceClass, "BluRay");
        ctx.set(Field::Width, 1920u32);

        ctx.clear_origin(Origin::Match);

        assert!(ctx.get(Field::Name).is_none());
        assert!(ctx.get(Field::Season).is_none());
        assert!(ctx.get(Field::SourceClass).is_some());
        assert!(ctx.get(Field::Width).is_some());
    }

    #[test]
    fn test_value_display() {
        let date = NaiveDate::from_ymd_opt(2009, 6, 1).unwrap();
        assert_eq!(Value::Date(date).to_string(), "2009-06-01");
        assert_eq!(
            Value::List(vec!["eng".into(), "jpn".into()]).to_string(),
            "eng, jpn"
        );
        let map: BTreeMap<String, String> =
            [("a".to_string(), "1".to_string()), ("b".to_string(), "2".to_string())].into();
        assert_eq!(Value::Map(map).to_string(), "a: 1, b: 2");
    }
}
