//! Argument canonicalization.
//!
//! A memoized call is keyed by a canonical JSON document
//! `[function_name, additional_fields, {param: value, ...}]` streamed
//! straight into the key hasher. Object keys are always emitted in sorted
//! order and set members in the order of their own encodings, so equal
//! logical arguments always produce identical bytes.
//!
//! Pixel buffers never enter the document: they are reduced to
//! `[shape, content_hash]` as they are encoded.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::BuildHasher;

use pixcache_common::{BufferView, DebugLogger, Frame, LooseVersion, MatchParameters};
use serde::Serialize;

use crate::key::KeyHasher;

/// Why a call cannot be served from or written to the cache.
///
/// This is an expected outcome, not a failure: the call simply runs
/// uncached.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotCachable {
    /// A debug logger argument is enabled; its side effects cannot be
    /// replayed from a stored result.
    #[error("debug image logging is active")]
    DebugLoggingActive,

    /// A floating-point argument is NaN or infinite.
    #[error("non-finite float argument")]
    NonFiniteFloat,

    /// An argument has no canonical form.
    #[error("unsupported argument type: {0}")]
    Unsupported(&'static str),
}

/// The closed set of argument kinds the canonicalizer understands.
#[derive(Debug, Clone)]
pub enum ArgValue<'a> {
    /// JSON `null`.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// An unsigned integer.
    UInt(u64),
    /// A float; must be finite.
    Float(f64),
    /// A string.
    Str(Cow<'a, str>),
    /// An ordered sequence.
    List(Vec<ArgValue<'a>>),
    /// An unordered collection; encoded sorted and deduplicated.
    Set(Vec<ArgValue<'a>>),
    /// A string-keyed mapping; encoded with sorted keys.
    Map(Vec<(Cow<'a, str>, ArgValue<'a>)>),
    /// A shaped binary buffer; encoded as `[shape, content_hash]`.
    Buffer(BufferView<'a>),
    /// A version; encoded as its string form.
    Version(Cow<'a, str>),
    /// A structured parameter bundle; encoded field by field.
    Bundle(Vec<(&'static str, ArgValue<'a>)>),
    /// A debug logger; `null` when disabled, not cachable when enabled.
    DebugLogger {
        /// Whether the logger would perform side effects.
        enabled: bool,
    },
    /// A value with no canonical form.
    Unsupported(&'static str),
}

/// Conversion of a caller type into a canonical argument.
pub trait CacheArg {
    /// Describes `self` as one of the supported argument kinds.
    fn to_arg(&self) -> ArgValue<'_>;
}

impl<T: CacheArg + ?Sized> CacheArg for &T {
    fn to_arg(&self) -> ArgValue<'_> {
        (**self).to_arg()
    }
}

impl CacheArg for () {
    fn to_arg(&self) -> ArgValue<'_> {
        ArgValue::Null
    }
}

impl CacheArg for bool {
    fn to_arg(&self) -> ArgValue<'_> {
        ArgValue::Bool(*self)
    }
}

macro_rules! int_args {
    ($variant:ident as $wide:ty: $($t:ty),*) => {
        $(
            impl CacheArg for $t {
                fn to_arg(&self) -> ArgValue<'_> {
                    ArgValue::$variant(*self as $wide)
                }
            }
        )*
    };
}

int_args!(Int as i64: i8, i16, i32, i64, isize);
int_args!(UInt as u64: u8, u16, u32, u64, usize);

impl CacheArg for f32 {
    fn to_arg(&self) -> ArgValue<'_> {
        ArgValue::Float(f64::from(*self))
    }
}

impl CacheArg for f64 {
    fn to_arg(&self) -> ArgValue<'_> {
        ArgValue::Float(*self)
    }
}

impl CacheArg for str {
    fn to_arg(&self) -> ArgValue<'_> {
        ArgValue::Str(Cow::Borrowed(self))
    }
}

impl CacheArg for String {
    fn to_arg(&self) -> ArgValue<'_> {
        ArgValue::Str(Cow::Borrowed(self))
    }
}

impl CacheArg for char {
    fn to_arg(&self) -> ArgValue<'_> {
        ArgValue::Str(Cow::Owned(self.to_string()))
    }
}

impl<T: CacheArg> CacheArg for Option<T> {
    fn to_arg(&self) -> ArgValue<'_> {
        match self {
            Some(v) => v.to_arg(),
            None => ArgValue::Null,
        }
    }
}

impl<T: CacheArg> CacheArg for [T] {
    fn to_arg(&self) -> ArgValue<'_> {
        ArgValue::List(self.iter().map(CacheArg::to_arg).collect())
    }
}

impl<T: CacheArg, const N: usize> CacheArg for [T; N] {
    fn to_arg(&self) -> ArgValue<'_> {
        self.as_slice().to_arg()
    }
}

impl<T: CacheArg> CacheArg for Vec<T> {
    fn to_arg(&self) -> ArgValue<'_> {
        self.as_slice().to_arg()
    }
}

impl<A: CacheArg, B: CacheArg> CacheArg for (A, B) {
    fn to_arg(&self) -> ArgValue<'_> {
        ArgValue::List(vec![self.0.to_arg(), self.1.to_arg()])
    }
}

impl<A: CacheArg, B: CacheArg, C: CacheArg> CacheArg for (A, B, C) {
    fn to_arg(&self) -> ArgValue<'_> {
        ArgValue::List(vec![self.0.to_arg(), self.1.to_arg(), self.2.to_arg()])
    }
}

impl<T: CacheArg> CacheArg for BTreeSet<T> {
    fn to_arg(&self) -> ArgValue<'_> {
        ArgValue::Set(self.iter().map(CacheArg::to_arg).collect())
    }
}

impl<T: CacheArg, S: BuildHasher> CacheArg for HashSet<T, S> {
    fn to_arg(&self) -> ArgValue<'_> {
        ArgValue::Set(self.iter().map(CacheArg::to_arg).collect())
    }
}

impl<K: AsRef<str>, V: CacheArg> CacheArg for BTreeMap<K, V> {
    fn to_arg(&self) -> ArgValue<'_> {
        ArgValue::Map(
            self.iter()
                .map(|(k, v)| (Cow::Borrowed(k.as_ref()), v.to_arg()))
                .collect(),
        )
    }
}

impl<K: AsRef<str>, V: CacheArg, S: BuildHasher> CacheArg for HashMap<K, V, S> {
    fn to_arg(&self) -> ArgValue<'_> {
        ArgValue::Map(
            self.iter()
                .map(|(k, v)| (Cow::Borrowed(k.as_ref()), v.to_arg()))
                .collect(),
        )
    }
}

impl CacheArg for serde_json::Value {
    fn to_arg(&self) -> ArgValue<'_> {
        use serde_json::Value;
        match self {
            Value::Null => ArgValue::Null,
            Value::Bool(b) => ArgValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ArgValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    ArgValue::UInt(u)
                } else {
                    n.as_f64()
                        .map(ArgValue::Float)
                        .unwrap_or(ArgValue::Unsupported("json number"))
                }
            }
            Value::String(s) => ArgValue::Str(Cow::Borrowed(s)),
            Value::Array(items) => ArgValue::List(items.iter().map(CacheArg::to_arg).collect()),
            Value::Object(map) => ArgValue::Map(
                map.iter()
                    .map(|(k, v)| (Cow::Borrowed(k.as_str()), v.to_arg()))
                    .collect(),
            ),
        }
    }
}

impl CacheArg for Frame {
    fn to_arg(&self) -> ArgValue<'_> {
        ArgValue::Buffer(self.view())
    }
}

impl CacheArg for BufferView<'_> {
    fn to_arg(&self) -> ArgValue<'_> {
        ArgValue::Buffer(self.clone())
    }
}

impl CacheArg for LooseVersion {
    fn to_arg(&self) -> ArgValue<'_> {
        ArgValue::Version(Cow::Borrowed(self.as_str()))
    }
}

impl CacheArg for MatchParameters {
    fn to_arg(&self) -> ArgValue<'_> {
        ArgValue::Bundle(vec![
            (
                "match_method",
                ArgValue::Str(Cow::Borrowed(self.match_method.value())),
            ),
            ("match_threshold", ArgValue::Float(self.match_threshold)),
            (
                "confirm_method",
                ArgValue::Str(Cow::Borrowed(self.confirm_method.value())),
            ),
            ("confirm_threshold", ArgValue::Float(self.confirm_threshold)),
            ("erode_passes", ArgValue::UInt(u64::from(self.erode_passes))),
        ])
    }
}

impl CacheArg for DebugLogger {
    fn to_arg(&self) -> ArgValue<'_> {
        ArgValue::DebugLogger {
            enabled: self.enabled(),
        }
    }
}

/// The resolved arguments of one call, by parameter name.
///
/// Names are kept sorted, so the order in which arguments are added does
/// not affect the key. Values are borrowed and only canonicalized when a
/// store is open.
#[derive(Default)]
pub struct CallArgs<'a> {
    args: BTreeMap<&'static str, &'a dyn CacheArg>,
}

impl<'a> CallArgs<'a> {
    /// Creates an empty argument set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to `value`, replacing any earlier binding.
    pub fn insert(&mut self, name: &'static str, value: &'a dyn CacheArg) {
        self.args.insert(name, value);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn arg(mut self, name: &'static str, value: &'a dyn CacheArg) -> Self {
        self.insert(name, value);
        self
    }

    /// Number of bound parameters.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Returns `true` if no parameters are bound.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

impl std::fmt::Debug for CallArgs<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.args.keys()).finish()
    }
}

/// Builds [`CallArgs`] from local bindings, using each identifier as the
/// parameter name.
///
/// ```
/// use pixcache_memo::call_args;
///
/// let lang = "eng";
/// let upsample = true;
/// let args = call_args!(lang, upsample);
/// assert_eq!(args.len(), 2);
/// ```
#[macro_export]
macro_rules! call_args {
    ($($name:ident),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut args = $crate::CallArgs::new();
        $( args.insert(stringify!($name), &$name); )*
        args
    }};
}

/// Destination for canonical bytes.
pub trait CanonicalSink {
    /// Appends bytes to the canonical stream.
    fn write_bytes(&mut self, bytes: &[u8]);
}

impl CanonicalSink for Vec<u8> {
    fn write_bytes(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

impl CanonicalSink for KeyHasher {
    fn write_bytes(&mut self, bytes: &[u8]) {
        self.update(bytes);
    }
}

/// Writes the function prefix `[name,fields,` of a canonical document.
pub fn write_prefix<S: CanonicalSink>(
    sink: &mut S,
    name: &str,
    fields: &serde_json::Value,
) -> Result<(), NotCachable> {
    sink.write_bytes(b"[");
    write_json(sink, name)?;
    sink.write_bytes(b",");
    write_value(sink, &fields.to_arg())?;
    sink.write_bytes(b",");
    Ok(())
}

/// Writes the argument object and closing bracket of a canonical document.
pub fn write_args<S: CanonicalSink>(sink: &mut S, args: &CallArgs<'_>) -> Result<(), NotCachable> {
    sink.write_bytes(b"{");
    for (i, (name, value)) in args.args.iter().enumerate() {
        if i > 0 {
            sink.write_bytes(b",");
        }
        write_json(sink, *name)?;
        sink.write_bytes(b":");
        write_value(sink, &value.to_arg())?;
    }
    sink.write_bytes(b"}]");
    Ok(())
}

/// Returns the full canonical document for a call.
pub fn canonical_bytes(
    name: &str,
    fields: &serde_json::Value,
    args: &CallArgs<'_>,
) -> Result<Vec<u8>, NotCachable> {
    let mut out = Vec::new();
    write_prefix(&mut out, name, fields)?;
    write_args(&mut out, args)?;
    Ok(out)
}

/// Writes one argument value.
pub fn write_value<S: CanonicalSink>(sink: &mut S, value: &ArgValue<'_>) -> Result<(), NotCachable> {
    match value {
        ArgValue::Null => sink.write_bytes(b"null"),
        ArgValue::Bool(true) => sink.write_bytes(b"true"),
        ArgValue::Bool(false) => sink.write_bytes(b"false"),
        ArgValue::Int(i) => sink.write_bytes(i.to_string().as_bytes()),
        ArgValue::UInt(u) => sink.write_bytes(u.to_string().as_bytes()),
        ArgValue::Float(f) => {
            if !f.is_finite() {
                return Err(NotCachable::NonFiniteFloat);
            }
            write_json(sink, f)?;
        }
        ArgValue::Str(s) | ArgValue::Version(s) => write_json(sink, s.as_ref())?,
        ArgValue::List(items) => {
            sink.write_bytes(b"[");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    sink.write_bytes(b",");
                }
                write_value(sink, item)?;
            }
            sink.write_bytes(b"]");
        }
        ArgValue::Set(items) => {
            let mut encoded = items
                .iter()
                .map(|item| {
                    let mut buf = Vec::new();
                    write_value(&mut buf, item)?;
                    Ok(buf)
                })
                .collect::<Result<Vec<_>, NotCachable>>()?;
            encoded.sort();
            encoded.dedup();
            sink.write_bytes(b"[");
            for (i, item) in encoded.iter().enumerate() {
                if i > 0 {
                    sink.write_bytes(b",");
                }
                sink.write_bytes(item);
            }
            sink.write_bytes(b"]");
        }
        ArgValue::Map(entries) => {
            write_object(sink, entries.iter().map(|(k, v)| (k.as_ref(), v)))?;
        }
        ArgValue::Bundle(fields) => {
            write_object(sink, fields.iter().map(|(k, v)| (*k, v)))?;
        }
        ArgValue::Buffer(view) => {
            sink.write_bytes(b"[");
            write_json(sink, view.shape())?;
            sink.write_bytes(b",");
            write_json(sink, &view.content_hash().to_string())?;
            sink.write_bytes(b"]");
        }
        ArgValue::DebugLogger { enabled: true } => return Err(NotCachable::DebugLoggingActive),
        ArgValue::DebugLogger { enabled: false } => sink.write_bytes(b"null"),
        ArgValue::Unsupported(what) => return Err(NotCachable::Unsupported(what)),
    }
    Ok(())
}

fn write_object<'e, 'a: 'e, S: CanonicalSink>(
    sink: &mut S,
    entries: impl Iterator<Item = (&'e str, &'e ArgValue<'a>)>,
) -> Result<(), NotCachable> {
    let mut entries: Vec<_> = entries.collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    sink.write_bytes(b"{");
    for (i, (key, value)) in entries.into_iter().enumerate() {
        if i > 0 {
            sink.write_bytes(b",");
        }
        write_json(sink, key)?;
        sink.write_bytes(b":");
        write_value(sink, value)?;
    }
    sink.write_bytes(b"}");
    Ok(())
}

fn write_json<S: CanonicalSink, T: Serialize + ?Sized>(
    sink: &mut S,
    value: &T,
) -> Result<(), NotCachable> {
    let bytes = serde_json::to_vec(value).map_err(|_| NotCachable::Unsupported("json"))?;
    sink.write_bytes(&bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixcache_common::{ConfirmMethod, MatchMethod};
    use serde_json::json;

    fn doc(args: &CallArgs<'_>) -> String {
        let bytes = canonical_bytes("f", &serde_json::Value::Null, args).unwrap();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn primitives() {
        let a = 1i32;
        let b = "text";
        let c = true;
        let d = 0.5f64;
        let e: Option<u8> = None;
        let args = call_args!(e, d, c, b, a);
        assert_eq!(
            doc(&args),
            r#"["f",null,{"a":1,"b":"text","c":true,"d":0.5,"e":null}]"#
        );
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let x = 1u32;
        let y = "y";
        let one = CallArgs::new().arg("x", &x).arg("y", &y);
        let two = CallArgs::new().arg("y", &y).arg("x", &x);
        assert_eq!(doc(&one), doc(&two));
    }

    #[test]
    fn map_keys_sorted() {
        let mut config = HashMap::new();
        config.insert("zeta".to_string(), 1);
        config.insert("alpha".to_string(), 2);
        config.insert("mid".to_string(), 3);
        let args = call_args!(config);
        assert_eq!(
            doc(&args),
            r#"["f",null,{"config":{"alpha":2,"mid":3,"zeta":1}}]"#
        );
    }

    #[test]
    fn json_value_keys_sorted() {
        let fields = json!({"version": "30", "algo": {"z": 1, "a": [1, 2.5]}});
        let bytes = canonical_bytes("ocr", &fields, &CallArgs::new()).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"["ocr",{"algo":{"a":[1,2.5],"z":1},"version":"30"},{}]"#
        );
    }

    #[test]
    fn sets_are_sorted_and_deduplicated() {
        let words: HashSet<&str> = ["banana", "apple", "cherry"].into_iter().collect();
        let args = call_args!(words);
        assert_eq!(
            doc(&args),
            r#"["f",null,{"words":["apple","banana","cherry"]}]"#
        );
    }

    #[test]
    fn set_order_follows_encoding() {
        let ids: BTreeSet<i32> = [10, 9, -1].into_iter().collect();
        let args = call_args!(ids);
        // "-1" < "10" < "9" bytewise
        assert_eq!(doc(&args), r#"["f",null,{"ids":[-1,10,9]}]"#);
    }

    #[test]
    fn version_is_string() {
        let tesseract_version = LooseVersion::new("4.1.1");
        let args = call_args!(tesseract_version);
        assert_eq!(doc(&args), r#"["f",null,{"tesseract_version":"4.1.1"}]"#);
    }

    #[test]
    fn match_parameters_field_by_field() {
        let params = MatchParameters {
            match_method: MatchMethod::SqdiffNormed,
            match_threshold: 0.9,
            confirm_method: ConfirmMethod::NormedAbsdiff,
            confirm_threshold: 0.3,
            erode_passes: 2,
        };
        let args = call_args!(params);
        assert_eq!(
            doc(&args),
            concat!(
                r#"["f",null,{"params":{"confirm_method":"normed-absdiff","#,
                r#""confirm_threshold":0.3,"erode_passes":2,"#,
                r#""match_method":"sqdiff-normed","match_threshold":0.9}}]"#
            )
        );
    }

    #[test]
    fn buffer_reduced_to_shape_and_hash() {
        let frame = Frame::zeros(720, 1280, 3);
        let args = call_args!(frame);
        let text = doc(&args);
        let hash = frame.view().content_hash().to_string();
        assert_eq!(
            text,
            format!(r#"["f",null,{{"frame":[[720,1280,3],"{hash}"]}}]"#)
        );
        assert!(text.len() < 100);
    }

    #[test]
    fn disabled_debug_logger_is_null() {
        let imglog = DebugLogger::disabled("ocr");
        let args = call_args!(imglog);
        assert_eq!(doc(&args), r#"["f",null,{"imglog":null}]"#);
    }

    #[test]
    fn enabled_debug_logger_is_not_cachable() {
        let imglog = DebugLogger::new("ocr", 2);
        let args = call_args!(imglog);
        let err = canonical_bytes("f", &serde_json::Value::Null, &args).unwrap_err();
        assert_eq!(err, NotCachable::DebugLoggingActive);
    }

    #[test]
    fn nested_debug_logger_is_not_cachable() {
        let loggers = vec![DebugLogger::disabled("a"), DebugLogger::new("b", 3)];
        let args = call_args!(loggers);
        let err = canonical_bytes("f", &serde_json::Value::Null, &args).unwrap_err();
        assert_eq!(err, NotCachable::DebugLoggingActive);
    }

    #[test]
    fn non_finite_float_is_not_cachable() {
        let threshold = f64::NAN;
        let args = call_args!(threshold);
        let err = canonical_bytes("f", &serde_json::Value::Null, &args).unwrap_err();
        assert_eq!(err, NotCachable::NonFiniteFloat);
    }

    struct Opaque;

    impl CacheArg for Opaque {
        fn to_arg(&self) -> ArgValue<'_> {
            ArgValue::Unsupported("Opaque")
        }
    }

    #[test]
    fn unsupported_is_not_cachable() {
        let handle = Opaque;
        let args = call_args!(handle);
        let err = canonical_bytes("f", &serde_json::Value::Null, &args).unwrap_err();
        assert_eq!(err, NotCachable::Unsupported("Opaque"));
    }

    #[test]
    fn int_and_float_differ() {
        let x = 1i64;
        let a = doc(&call_args!(x));
        let x = 1.0f64;
        let b = doc(&call_args!(x));
        assert_ne!(a, b);
    }

    #[test]
    fn strings_are_escaped() {
        let s = "quote \" and \\ backslash";
        let args = call_args!(s);
        assert_eq!(
            doc(&args),
            r#"["f",null,{"s":"quote \" and \\ backslash"}]"#
        );
    }

    #[test]
    fn tuples_and_arrays_are_lists() {
        let color = (255u8, 0u8, 10u8);
        let shape = [2usize, 3];
        let args = call_args!(color, shape);
        assert_eq!(
            doc(&args),
            r#"["f",null,{"color":[255,0,10],"shape":[2,3]}]"#
        );
    }
}
