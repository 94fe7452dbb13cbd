//! Schema types and builders for tfplug
//!
//! Besides describing attributes to Terraform, a [`Schema`] can check a
//! configuration against its own required flags and validators, and run its
//! plan modifiers over a proposed new state.

use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::collections::HashMap;

/// AttributeType defines the type system for Terraform attributes
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number,
    Bool,
    List(Box<AttributeType>),
    Set(Box<AttributeType>),
    Map(Box<AttributeType>),
    Object(HashMap<String, AttributeType>),
}

/// Version is used for state migration
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64,
    pub block: Block,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub version: i64,
    pub attributes: Vec<Attribute>,
    pub block_types: Vec<NestedBlock>,
    pub description: String,
    pub description_kind: StringKind,
    pub deprecated: bool,
}

pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub validators: Vec<Box<dyn Validator>>,
    pub plan_modifiers: Vec<Box<dyn PlanModifier>>,
    pub deprecated: bool,
}

// validators/modifiers are trait objects, so Debug is written by hand
impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field("validators", &self.validators.len())
            .field("plan_modifiers", &self.plan_modifiers.len())
            .field("deprecated", &self.deprecated)
            .finish()
    }
}

// Clones drop validators and modifiers; rebuild the schema when behaviour is needed.
impl Clone for Attribute {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            r#type: self.r#type.clone(),
            description: self.description.clone(),
            required: self.required,
            optional: self.optional,
            computed: self.computed,
            sensitive: self.sensitive,
            validators: vec![],
            plan_modifiers: vec![],
            deprecated: self.deprecated,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NestedBlock {
    pub type_name: String,
    pub block: Block,
    pub nesting: NestingMode,
    pub min_items: i64,
    pub max_items: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NestingMode {
    Invalid,
    Single,
    List,
    Set,
    Map,
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StringKind {
    Plain,
    Markdown,
}

/// Validator performs validation on attribute values during planning
pub trait Validator: Send + Sync {
    fn description(&self) -> String;
    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse;
}

pub struct ValidatorRequest {
    pub config_value: DynamicValue,
    pub path: AttributePath,
}

pub struct ValidatorResponse {
    pub diagnostics: Vec<Diagnostic>,
}

/// PlanModifier modifies planned values during planning
pub trait PlanModifier: Send + Sync {
    fn description(&self) -> String;
    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse;
}

pub struct PlanModifierRequest {
    pub config_value: DynamicValue,
    pub state_value: DynamicValue,
    pub plan_value: DynamicValue,
    pub path: AttributePath,
}

pub struct PlanModifierResponse {
    pub plan_value: DynamicValue,
    pub requires_replace: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Outcome of [`Schema::plan_change`]
#[derive(Debug, Clone)]
pub struct PlannedChange {
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.block.attributes.iter().find(|a| a.name == name)
    }

    /// Checks required attributes, computed-only attributes, nested block
    /// item counts and every attached validator. Unknown values are skipped.
    pub fn validate_config(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        validate_block(&self.block, &config.value, &AttributePath::root(), &mut diagnostics);
        diagnostics
    }

    /// Runs top-level plan modifiers over `proposed`.
    ///
    /// On create (null prior state) computed attributes the configuration
    /// leaves unset become unknown before modifiers run.
    pub fn plan_change(
        &self,
        prior_state: &DynamicValue,
        proposed: &DynamicValue,
        config: &DynamicValue,
    ) -> PlannedChange {
        let mut planned_state = proposed.clone();
        let mut requires_replace = Vec::new();
        let mut diagnostics = Vec::new();

        if proposed.is_null() {
            return PlannedChange {
                planned_state,
                requires_replace,
                diagnostics,
            };
        }

        let creating = prior_state.is_null();

        for attr in &self.block.attributes {
            let path = AttributePath::new(&attr.name);
            let config_value = value_at(config, &path);

            if creating && attr.computed && config_value.is_null() {
                // set_value on an object root cannot fail
                let _ = planned_state.mark_unknown(&path);
            }

            for modifier in &attr.plan_modifiers {
                let response = modifier.modify(PlanModifierRequest {
                    config_value: config_value.clone(),
                    state_value: value_at(prior_state, &path),
                    plan_value: value_at(&planned_state, &path),
                    path: path.clone(),
                });
                diagnostics.extend(response.diagnostics);
                if response.requires_replace && !requires_replace.contains(&path) {
                    requires_replace.push(path.clone());
                }
                if let Err(e) = planned_state.set_dynamic(&path, response.plan_value.value) {
                    diagnostics.push(
                        Diagnostic::error("Failed to apply plan modifier", e.to_string())
                            .with_attribute(path.clone()),
                    );
                }
            }
        }

        PlannedChange {
            planned_state,
            requires_replace,
            diagnostics,
        }
    }
}

fn value_at(value: &DynamicValue, path: &AttributePath) -> DynamicValue {
    DynamicValue::new(value.get_value(path).cloned().unwrap_or(Dynamic::Null))
}

fn validate_block(
    block: &Block,
    value: &Dynamic,
    prefix: &AttributePath,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for attr in &block.attributes {
        let path = prefix.clone().attribute(&attr.name);
        let attr_value = value.get(&attr.name).unwrap_or(&Dynamic::Null);

        if attr_value.is_null() {
            if attr.required {
                diagnostics.push(
                    Diagnostic::error(
                        "Missing required argument",
                        format!("The argument \"{}\" is required, but no definition was found.", attr.name),
                    )
                    .with_attribute(path),
                );
            }
            continue;
        }

        if attr.computed && !attr.optional && !attr.required {
            diagnostics.push(
                Diagnostic::error(
                    "Invalid configuration",
                    format!("\"{}\" is computed and cannot be set in configuration", attr.name),
                )
                .with_attribute(path),
            );
            continue;
        }

        if attr_value.is_unknown() {
            continue;
        }

        for validator in &attr.validators {
            let response = validator.validate(ValidatorRequest {
                config_value: DynamicValue::new(attr_value.clone()),
                path: path.clone(),
            });
            diagnostics.extend(response.diagnostics);
        }
    }

    for nested in &block.block_types {
        let path = prefix.clone().attribute(&nested.type_name);
        let items: Vec<&Dynamic> = match value.get(&nested.type_name) {
            None | Some(Dynamic::Null) => Vec::new(),
            Some(Dynamic::List(items)) => items.iter().collect(),
            Some(Dynamic::Unknown) => continue,
            Some(single) => vec![single],
        };

        let count = items.len() as i64;
        if count < nested.min_items {
            diagnostics.push(
                Diagnostic::error(
                    "Insufficient blocks",
                    format!(
                        "At least {} \"{}\" blocks are required.",
                        nested.min_items, nested.type_name
                    ),
                )
                .with_attribute(path.clone()),
            );
        }
        if nested.max_items > 0 && count > nested.max_items {
            diagnostics.push(
                Diagnostic::error(
                    "Too many blocks",
                    format!(
                        "No more than {} \"{}\" blocks are allowed.",
                        nested.max_items, nested.type_name
                    ),
                )
                .with_attribute(path.clone()),
            );
        }

        for (idx, item) in items.into_iter().enumerate() {
            validate_block(&nested.block, item, &path.clone().index(idx as i64), diagnostics);
        }
    }
}

/// AttributeBuilder provides fluent API for building attributes
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                validators: Vec::new(),
                plan_modifiers: Vec::new(),
                deprecated: false,
            },
        }
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.attribute.deprecated = true;
        self
    }

    pub fn validator(mut self, validator: Box<dyn Validator>) -> Self {
        self.attribute.validators.push(validator);
        self
    }

    pub fn plan_modifier(mut self, modifier: Box<dyn PlanModifier>) -> Self {
        self.attribute.plan_modifiers.push(modifier);
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// SchemaBuilder provides fluent API for building schemas
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                block: Block {
                    version: 0,
                    attributes: Vec::new(),
                    block_types: Vec::new(),
                    description: String::new(),
                    description_kind: StringKind::Plain,
                    deprecated: false,
                },
            },
        }
    }

    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self.schema.block.version = version;
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.block.attributes.push(attr);
        self
    }

    pub fn attributes(mut self, attrs: impl IntoIterator<Item = Attribute>) -> Self {
        self.schema.block.attributes.extend(attrs);
        self
    }

    pub fn block(mut self, block: NestedBlock) -> Self {
        self.schema.block.block_types.push(block);
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.schema.block.description = desc.to_string();
        self
    }

    pub fn description_kind(mut self, kind: StringKind) -> Self {
        self.schema.block.description_kind = kind;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.schema.block.deprecated = true;
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a nested block from a list of attributes
pub fn nested_block(
    type_name: &str,
    nesting: NestingMode,
    min_items: i64,
    max_items: i64,
    attributes: Vec<Attribute>,
) -> NestedBlock {
    NestedBlock {
        type_name: type_name.to_string(),
        block: Block {
            version: 0,
            attributes,
            block_types: Vec::new(),
            description: String::new(),
            description_kind: StringKind::Plain,
            deprecated: false,
        },
        nesting,
        min_items,
        max_items,
    }
}
