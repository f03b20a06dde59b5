// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON schemas for test suites and custom executors.
//!
//! Schema resolution happens in two steps, each keyed by a schema identity URI:
//!
//! 1. [`SchemaComposer::resolve`] maps a resource path to the identity URI of the schema that
//!    applies to it, if any.
//! 2. [`SchemaComposer::content`] maps an identity URI to the schema document.
//!
//! The test suite schema is composed per workspace: each custom executor of the workspace adds
//! one branch to the step union and one step definition.

use crate::{
    config::TestSuiteMatcher,
    errors::{DisplayErrorChain, SchemaLoadError, SchemaUriParseError},
    helpers::is_inside_dir,
    workspace::{CustomExecutorDefinition, WorkspaceContext, WorkspaceState},
};
use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Map, Value, json};
use std::{borrow::Cow, collections::HashSet, fmt};
use tracing::{debug, info, warn};
use url::form_urlencoded;

/// The scheme of test suite schema identity URIs.
pub const TEST_SUITE_SCHEME: &str = "VSCODE_VENOM_TEST_SUITE_SCHEMA";

/// The scheme of custom executor schema identity URIs.
pub const CUSTOM_EXECUTOR_SCHEME: &str = "VSCODE_VENOM_CUSTOM_EXECUTOR_SCHEMA";

const WORKSPACE_PARAM: &str = "workspace";
const CUSTOM_EXECUTOR_PREFIX: &str = "custom_executor_";

/// Step properties every custom executor step accepts, on top of its inputs.
const STEP_PROPERTIES: &[&str] = &[
    "info",
    "assertions",
    "skip",
    "vars",
    "retry",
    "retry_if",
    "delay",
    "timeout",
    "range",
];

/// The kinds of schemas that can be resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    /// The schema of test suite files.
    TestSuite,
    /// The schema of custom executor files.
    CustomExecutor,
}

impl SchemaKind {
    /// All schema kinds, in resolution order.
    pub const ALL: [Self; 2] = [Self::TestSuite, Self::CustomExecutor];

    /// Returns the scheme of identity URIs for this kind.
    pub fn scheme(self) -> &'static str {
        match self {
            Self::TestSuite => TEST_SUITE_SCHEME,
            Self::CustomExecutor => CUSTOM_EXECUTOR_SCHEME,
        }
    }

    /// Returns the file name of the base schema for this kind.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::TestSuite => "venom.schema.json",
            Self::CustomExecutor => "venom-custom-executor.schema.json",
        }
    }

    /// Returns the kind matching `scheme`, if any.
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.scheme() == scheme)
    }

    fn embedded(self) -> &'static str {
        match self {
            Self::TestSuite => include_str!("../schema/venom.schema.json"),
            Self::CustomExecutor => include_str!("../schema/venom-custom-executor.schema.json"),
        }
    }
}

/// A parsed schema identity URI: `<scheme>://schema/<file name>[?workspace=<root>]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaUri {
    scheme: String,
    path: String,
    workspace: Option<Utf8PathBuf>,
}

impl SchemaUri {
    /// Creates the identity URI of a schema kind.
    pub fn new(kind: SchemaKind, workspace: Option<&Utf8Path>) -> Self {
        Self {
            scheme: kind.scheme().to_owned(),
            path: format!("schema/{}", kind.file_name()),
            workspace: workspace.map(ToOwned::to_owned),
        }
    }

    /// Parses an identity URI.
    ///
    /// Unknown schemes are accepted: [`Self::kind`] returns `None` for them.
    pub fn parse(uri: &str) -> Result<Self, SchemaUriParseError> {
        let (scheme, rest) = uri
            .split_once("://")
            .filter(|(scheme, _)| !scheme.is_empty())
            .ok_or_else(|| SchemaUriParseError::new(uri))?;
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };

        // The first value wins if the parameter is repeated.
        let workspace = query.and_then(|query| {
            form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key == WORKSPACE_PARAM)
                .map(|(_, value)| Utf8PathBuf::from(value.into_owned()))
        });

        Ok(Self {
            scheme: scheme.to_owned(),
            path: path.to_owned(),
            workspace,
        })
    }

    /// Returns the kind of schema this URI identifies, if its scheme is known.
    pub fn kind(&self) -> Option<SchemaKind> {
        SchemaKind::from_scheme(&self.scheme)
    }

    /// Returns the scheme.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Returns the path part of the URI.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the decoded `workspace` query parameter, if present.
    pub fn workspace(&self) -> Option<&Utf8Path> {
        self.workspace.as_deref()
    }
}

impl fmt::Display for SchemaUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.path)?;
        if let Some(workspace) = &self.workspace {
            let encoded: String = form_urlencoded::byte_serialize(workspace.as_str().as_bytes())
                .collect();
            write!(f, "?{WORKSPACE_PARAM}={encoded}")?;
        }
        Ok(())
    }
}

/// The base schema documents.
#[derive(Clone, Debug)]
pub struct BaseSchemas {
    test_suite: Cow<'static, str>,
    custom_executor: Cow<'static, str>,
}

impl BaseSchemas {
    /// Returns the schemas bundled with this crate.
    pub fn embedded() -> Self {
        Self {
            test_suite: Cow::Borrowed(SchemaKind::TestSuite.embedded()),
            custom_executor: Cow::Borrowed(SchemaKind::CustomExecutor.embedded()),
        }
    }

    /// Loads the schemas from `dir`, falling back to the bundled schemas.
    ///
    /// A schema that can't be read from `dir` is logged and replaced by its bundled version.
    pub fn load(dir: Option<&Utf8Path>) -> Self {
        let mut schemas = Self::embedded();
        let Some(dir) = dir else {
            return schemas;
        };

        for kind in SchemaKind::ALL {
            match Self::read(dir, kind) {
                Ok(text) => {
                    info!("loaded {} from {dir}", kind.file_name());
                    *schemas.slot_mut(kind) = Cow::Owned(text);
                }
                Err(err) => {
                    warn!("{}, using the bundled schema", DisplayErrorChain::new(&err));
                }
            }
        }
        schemas
    }

    fn read(dir: &Utf8Path, kind: SchemaKind) -> Result<String, SchemaLoadError> {
        let path = dir.join(kind.file_name());
        std::fs::read_to_string(&path).map_err(|err| SchemaLoadError::new(path, err))
    }

    /// Returns the base schema of `kind`.
    pub fn get(&self, kind: SchemaKind) -> &str {
        match kind {
            SchemaKind::TestSuite => &self.test_suite,
            SchemaKind::CustomExecutor => &self.custom_executor,
        }
    }

    fn slot_mut(&mut self, kind: SchemaKind) -> &mut Cow<'static, str> {
        match kind {
            SchemaKind::TestSuite => &mut self.test_suite,
            SchemaKind::CustomExecutor => &mut self.custom_executor,
        }
    }
}

impl Default for BaseSchemas {
    fn default() -> Self {
        Self::embedded()
    }
}

/// Answers schema requests for the files of open workspaces.
#[derive(Clone, Copy, Debug)]
pub struct SchemaComposer<'a> {
    base: &'a BaseSchemas,
    context: &'a WorkspaceContext,
    test_suite_matcher: &'a TestSuiteMatcher,
}

impl<'a> SchemaComposer<'a> {
    /// Creates a new composer.
    pub fn new(
        base: &'a BaseSchemas,
        context: &'a WorkspaceContext,
        test_suite_matcher: &'a TestSuiteMatcher,
    ) -> Self {
        Self {
            base,
            context,
            test_suite_matcher,
        }
    }

    /// Returns the identity URI of the first schema kind that applies to `resource`.
    pub fn resolve_any(&self, resource: &Utf8Path) -> Option<SchemaUri> {
        SchemaKind::ALL
            .into_iter()
            .find_map(|kind| self.resolve(kind, resource))
    }

    /// Returns the identity URI of the `kind` schema if it applies to `resource`.
    ///
    /// * Test suite files resolve to the test suite schema, parameterized by their workspace.
    /// * Files inside the library directory of their workspace resolve to the custom executor
    ///   schema.
    pub fn resolve(&self, kind: SchemaKind, resource: &Utf8Path) -> Option<SchemaUri> {
        debug!("schema request for {resource}");
        let workspace = self.context.owning_workspace(resource);
        match kind {
            SchemaKind::TestSuite => self
                .context
                .is_test_suite(self.test_suite_matcher, resource)
                .then(|| SchemaUri::new(kind, workspace.map(WorkspaceState::root))),
            SchemaKind::CustomExecutor => {
                let lib_dir = workspace?.lib_dir();
                is_inside_dir(resource, &lib_dir).then(|| SchemaUri::new(kind, None))
            }
        }
    }

    /// Returns the schema document identified by `uri`.
    ///
    /// Returns `Ok(None)` if the scheme is not one of this composer's.
    pub fn content(&self, uri: &str) -> Result<Option<Cow<'a, str>>, SchemaUriParseError> {
        let uri = SchemaUri::parse(uri)?;
        let Some(kind) = uri.kind() else {
            debug!("ignoring schema content request for unknown scheme `{}`", uri.scheme());
            return Ok(None);
        };
        debug!("schema content request for {uri}");

        let base = self.base.get(kind);
        if kind == SchemaKind::CustomExecutor {
            return Ok(Some(Cow::Borrowed(base)));
        }

        let Some(workspace) = uri.workspace().and_then(|root| self.context.get(root)) else {
            return Ok(Some(Cow::Borrowed(base)));
        };
        if workspace.custom_executors().len() == 0 {
            return Ok(Some(Cow::Borrowed(base)));
        }

        match compose_test_suite_schema(base, workspace.custom_executors()) {
            Ok(composed) => Ok(Some(Cow::Owned(composed))),
            Err(reason) => {
                warn!(
                    "cannot add custom executors of {} to the test suite schema: {reason}",
                    workspace.root()
                );
                Ok(Some(Cow::Borrowed(base)))
            }
        }
    }
}

/// Adds a step definition per custom executor to the test suite schema `base`.
///
/// Executors are added in iteration order. If two executors share a name, the first one wins.
fn compose_test_suite_schema<'e>(
    base: &str,
    executors: impl IntoIterator<Item = &'e CustomExecutorDefinition>,
) -> Result<String, String> {
    let mut schema: Value =
        serde_json::from_str(base).map_err(|err| format!("base schema is invalid: {err}"))?;
    let definitions = schema
        .get_mut("definitions")
        .and_then(Value::as_object_mut)
        .ok_or("base schema has no `definitions` object")?;

    let mut seen = HashSet::new();
    let mut new_definitions = Vec::new();
    for executor in executors {
        if !seen.insert(executor.executor.as_str()) {
            warn!(
                "custom executor `{}` is declared more than once, ignoring duplicate",
                executor.executor
            );
            continue;
        }
        debug!("adding custom executor `{}` to the test suite schema", executor.executor);
        new_definitions.push((
            format!("{CUSTOM_EXECUTOR_PREFIX}{}", executor.executor),
            custom_executor_definition(executor),
        ));
    }

    let one_of = definitions
        .get_mut("step")
        .and_then(|step| step.get_mut("oneOf"))
        .and_then(Value::as_array_mut)
        .ok_or("base schema has no `definitions.step.oneOf` array")?;
    for (name, _) in &new_definitions {
        one_of.push(json!({ "$ref": format!("#/definitions/{name}") }));
    }
    for (name, definition) in new_definitions {
        definitions.insert(name, definition);
    }

    serde_json::to_string(&schema).map_err(|err| format!("cannot serialize schema: {err}"))
}

fn custom_executor_definition(executor: &CustomExecutorDefinition) -> Value {
    let mut properties = Map::new();
    for property in STEP_PROPERTIES {
        properties.insert((*property).to_owned(), Value::Bool(true));
    }
    properties.insert(
        "type".to_owned(),
        json!({ "type": "string", "const": executor.executor }),
    );
    for key in executor.input.keys() {
        properties.insert(key.clone(), json!({ "type": "string" }));
    }

    json!({
        "type": "object",
        "allOf": [{ "$ref": "#/definitions/step_base" }],
        "additionalProperties": false,
        "properties": properties,
    })
}
