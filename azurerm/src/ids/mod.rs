//! Azure Resource Manager resource IDs
//!
//! Every ID type is described by an [`IdTemplate`]: an ordered list of
//! `key/value` segments where the value is either fixed (the provider
//! namespace) or captured into a struct field. Parsing walks the template
//! positionally, matching keys case-sensitively, and fails closed on any
//! missing, empty, mismatched or left-over segment.
//!
//! A few Azure APIs echo IDs back with a lower-cased collection key. Those
//! segments list the exact alternate spelling they accept; nothing else is
//! tolerated.

use std::fmt;

mod automation;
mod compute;
mod keyvault;
mod loganalytics;
mod storage;

pub use automation::AutomationAccountId;
pub use compute::ManagedDiskId;
pub use keyvault::KeyVaultKeyId;
pub use loganalytics::{
    LogAnalyticsClusterId, LogAnalyticsDataExportId, LogAnalyticsDataSourceId,
    LogAnalyticsLinkedServiceId, LogAnalyticsLinkedStorageAccountId, LogAnalyticsSavedSearchId,
    LogAnalyticsStorageInsightsId, LogAnalyticsWorkspaceId,
};
pub use storage::StorageAccountId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentValue {
    /// Must match exactly, e.g. the `Microsoft.Compute` namespace
    Fixed(&'static str),
    /// Captured into the ID; the string is the placeholder used in messages
    Captured(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub key: &'static str,
    pub alternate_keys: &'static [&'static str],
    pub value: SegmentValue,
}

impl Segment {
    pub const fn fixed(key: &'static str, value: &'static str) -> Self {
        Self {
            key,
            alternate_keys: &[],
            value: SegmentValue::Fixed(value),
        }
    }

    pub const fn captured(key: &'static str, placeholder: &'static str) -> Self {
        Self {
            key,
            alternate_keys: &[],
            value: SegmentValue::Captured(placeholder),
        }
    }

    /// Accept `alternates` as well as `key` when parsing; formatting always
    /// emits `key`
    pub const fn or_key(mut self, alternates: &'static [&'static str]) -> Self {
        self.alternate_keys = alternates;
        self
    }

    fn accepts_key(&self, key: &str) -> bool {
        self.key == key || self.alternate_keys.contains(&key)
    }

    fn expected(&self) -> String {
        match self.value {
            SegmentValue::Fixed(v) => format!("{}/{}", self.key, v),
            SegmentValue::Captured(p) => format!("{}/{{{}}}", self.key, p),
        }
    }
}

pub const SUBSCRIPTION: Segment = Segment::captured("subscriptions", "subscriptionId");
pub const RESOURCE_GROUP: Segment = Segment::captured("resourceGroups", "resourceGroupName");

pub const fn provider(namespace: &'static str) -> Segment {
    Segment::fixed("providers", namespace)
}

#[derive(Debug)]
pub struct IdTemplate {
    pub description: &'static str,
    pub segments: &'static [Segment],
}

impl IdTemplate {
    /// Captured values in template order
    pub fn parse(&self, input: &str) -> Result<Vec<String>, ParseIdError> {
        let fail = |kind| ParseIdError {
            description: self.description,
            input: input.to_string(),
            kind,
        };

        if input.is_empty() {
            return Err(fail(ParseIdErrorKind::Empty));
        }
        let Some(path) = input.strip_prefix('/') else {
            return Err(fail(ParseIdErrorKind::NotAbsolute));
        };
        let path = path.strip_suffix('/').unwrap_or(path);

        let parts: Vec<&str> = path.split('/').collect();
        if let Some(position) = parts.iter().position(|p| p.is_empty()) {
            return Err(fail(ParseIdErrorKind::EmptySegment { position }));
        }
        if parts.len() % 2 != 0 {
            return Err(fail(ParseIdErrorKind::MissingValue {
                key: parts[parts.len() - 1].to_string(),
            }));
        }

        let pairs: Vec<(&str, &str)> = parts.chunks(2).map(|c| (c[0], c[1])).collect();
        let mut values = Vec::new();

        for (idx, segment) in self.segments.iter().enumerate() {
            let Some(&(key, value)) = pairs.get(idx) else {
                return Err(fail(ParseIdErrorKind::MissingSegment {
                    expected: segment.expected(),
                }));
            };
            let matches = segment.accepts_key(key)
                && match segment.value {
                    SegmentValue::Fixed(fixed) => value == fixed,
                    SegmentValue::Captured(_) => true,
                };
            if !matches {
                return Err(fail(ParseIdErrorKind::UnexpectedSegment {
                    expected: segment.expected(),
                    found: format!("{}/{}", key, value),
                }));
            }
            if let SegmentValue::Captured(_) = segment.value {
                values.push(value.to_string());
            }
        }

        if pairs.len() > self.segments.len() {
            let remaining: Vec<String> = pairs[self.segments.len()..]
                .iter()
                .map(|(k, v)| format!("{}/{}", k, v))
                .collect();
            return Err(fail(ParseIdErrorKind::TrailingSegments {
                remaining: remaining.join("/"),
            }));
        }

        Ok(values)
    }

    /// Inverse of [`IdTemplate::parse`], always using canonical keys
    pub fn format(&self, values: &[&str]) -> String {
        let mut captured = values.iter();
        let mut out = String::new();
        for segment in self.segments {
            let value = match segment.value {
                SegmentValue::Fixed(v) => v,
                SegmentValue::Captured(_) => captured.next().copied().unwrap_or_default(),
            };
            out.push('/');
            out.push_str(segment.key);
            out.push('/');
            out.push_str(value);
        }
        out
    }

    /// Placeholder form, e.g. `/subscriptions/{subscriptionId}/...`
    pub fn example(&self) -> String {
        self.segments
            .iter()
            .map(|s| format!("/{}", s.expected()))
            .collect()
    }

    /// Human-readable form used in errors and logs
    pub fn describe(&self, values: &[&str]) -> String {
        let placeholders = self.segments.iter().filter_map(|s| match s.value {
            SegmentValue::Captured(p) => Some(p),
            SegmentValue::Fixed(_) => None,
        });
        let fields: Vec<String> = placeholders
            .zip(values.iter())
            .map(|(p, v)| format!("{}: {:?}", p, v))
            .collect();
        format!("{} ({})", self.description, fields.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parsing {description} ID {input:?}: {kind}")]
pub struct ParseIdError {
    pub description: &'static str,
    pub input: String,
    pub kind: ParseIdErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseIdErrorKind {
    #[error("ID was empty")]
    Empty,
    #[error("expected an absolute path starting with \"/\"")]
    NotAbsolute,
    #[error("segment {position} is empty")]
    EmptySegment { position: usize },
    #[error("key {key:?} has no value")]
    MissingValue { key: String },
    #[error("expected {expected:?}, found {found:?}")]
    UnexpectedSegment { expected: String, found: String },
    #[error("missing {expected:?}")]
    MissingSegment { expected: String },
    #[error("unexpected trailing segments {remaining:?}")]
    TrailingSegments { remaining: String },
}

/// Typed resource ID backed by a static template
pub trait ResourceId: Sized + Clone + PartialEq + fmt::Display {
    const TEMPLATE: &'static IdTemplate;

    fn from_values(values: Vec<String>) -> Self;

    fn values(&self) -> Vec<&str>;

    fn parse(input: &str) -> Result<Self, ParseIdError> {
        Self::TEMPLATE.parse(input).map(Self::from_values)
    }

    fn id(&self) -> String {
        Self::TEMPLATE.format(&self.values())
    }

    fn describe(&self) -> String {
        Self::TEMPLATE.describe(&self.values())
    }
}

/// Declares an ID struct with one `String` field per captured segment, in
/// template order.
macro_rules! resource_id {
    (
        $(#[$meta:meta])*
        $name:ident, $description:literal,
        segments: [ $( $segment:expr ),+ $(,)? ],
        fields: [ $( $field:ident ),+ $(,)? ] $(,)?
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name {
            $( pub $field: String, )+
        }

        impl $name {
            #[allow(clippy::too_many_arguments)]
            pub fn new($( $field: impl Into<String> ),+) -> Self {
                Self { $( $field: $field.into(), )+ }
            }
        }

        impl $crate::ids::ResourceId for $name {
            const TEMPLATE: &'static $crate::ids::IdTemplate = &$crate::ids::IdTemplate {
                description: $description,
                segments: &[ $( $segment ),+ ],
            };

            fn from_values(values: Vec<String>) -> Self {
                let mut values = values.into_iter();
                Self { $( $field: values.next().unwrap_or_default(), )+ }
            }

            fn values(&self) -> Vec<&str> {
                vec![ $( self.$field.as_str() ),+ ]
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::ids::ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <Self as $crate::ids::ResourceId>::parse(s)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&<Self as $crate::ids::ResourceId>::id(self))
            }
        }
    };
}

pub(crate) use resource_id;

/// Loose check for free-form ARM IDs (destinations, sources) whose type is
/// not known in advance: absolute, even segment count, no empty segments,
/// starting with a subscription.
pub fn validate_resource_id(input: &str) -> Result<(), String> {
    if input.is_empty() {
        return Err("resource ID cannot be empty".to_string());
    }
    let Some(path) = input.strip_prefix('/') else {
        return Err(format!("{:?} is not an absolute resource ID", input));
    };
    let parts: Vec<&str> = path.split('/').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(format!("{:?} contains an empty segment", input));
    }
    if parts.len() % 2 != 0 {
        return Err(format!("{:?} has a key without a value", input));
    }
    if parts[0] != "subscriptions" {
        return Err(format!("{:?} does not start with /subscriptions/", input));
    }
    Ok(())
}
