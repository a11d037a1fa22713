use std::str::FromStr;

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use super::error::{GraphError, NodeError, NodeErrorKind};
use super::planner::topo_levels;
use super::{Graph, Node};
use crate::attrs::Attrs;
use crate::env::parse_flag;
use crate::registry::SchemaRegistry;
use crate::schema::{AttrDefault, ParamOption, SchemaDescriptor};
use crate::threading::thread_pool;
use nmdefs_shape_inference::{ElementType, InferShapesError, InferenceContext, ValueInfo};

/// Specifies what happens when inference fails for a node.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ErrorPolicy {
    /// Stop and return the first node error.
    #[default]
    Abort,

    /// Record the error, treat the node's outputs as unknown and continue
    /// with the rest of the graph.
    Continue,
}

impl FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "continue" => Ok(Self::Continue),
            _ => Err(format!("unknown error policy \"{}\"", s)),
        }
    }
}

/// Options that control graph shape inference.
#[derive(Clone, Debug, PartialEq)]
pub struct InferOptions {
    pub policy: ErrorPolicy,

    /// Whether independent nodes are evaluated concurrently using the
    /// thread pool returned by [`thread_pool`](crate::thread_pool).
    pub parallel: bool,
}

impl Default for InferOptions {
    fn default() -> Self {
        Self {
            policy: ErrorPolicy::Abort,
            parallel: true,
        }
    }
}

impl InferOptions {
    /// Read options from the environment.
    ///
    /// `NMDEFS_PARALLEL` is a boolean flag and `NMDEFS_ERROR_POLICY` is
    /// either "abort" or "continue". Unset or invalid values use the
    /// defaults.
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Read options using `get_var` to look up variables by name.
    fn from_vars(get_var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let policy = match get_var("NMDEFS_ERROR_POLICY") {
            Some(value) => value.parse().unwrap_or_else(|err| {
                log::warn!("{}, using {:?}", err, defaults.policy);
                defaults.policy
            }),
            None => defaults.policy,
        };
        let parallel = parse_flag(
            "NMDEFS_PARALLEL",
            get_var("NMDEFS_PARALLEL").as_deref(),
            defaults.parallel,
        );
        Self { policy, parallel }
    }
}

/// Types and shapes inferred for the values in a graph.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InferenceResult {
    /// Inferred type and shape of each graph input and node output.
    pub values: FxHashMap<String, ValueInfo>,

    /// Errors for nodes that failed under [`ErrorPolicy::Continue`].
    pub errors: Vec<NodeError>,
}

impl InferenceResult {
    pub fn value(&self, name: &str) -> Option<&ValueInfo> {
        self.values.get(name)
    }

    /// Iterate over values in name order.
    pub fn sorted_values(&self) -> Vec<(&str, &ValueInfo)> {
        let mut values: Vec<_> = self
            .values
            .iter()
            .map(|(name, info)| (name.as_str(), info))
            .collect();
        values.sort_by_key(|(name, _)| *name);
        values
    }
}

/// Infer the element types and shapes of all values in a graph.
///
/// Nodes are evaluated in dependency order. Each node is validated against
/// the schema registered for its operator at the graph's opset version, and
/// the schema's inference routine is run with a fresh [`InferenceContext`].
/// Inferred outputs and graph inputs which are also graph outputs are
/// merged with the graph's declaration of them.
///
/// Structural problems with the graph are always returned as errors. Node
/// errors are handled according to `options.policy`.
pub fn infer_shapes(
    graph: &Graph,
    registry: &SchemaRegistry,
    options: &InferOptions,
) -> Result<InferenceResult, GraphError> {
    let levels = topo_levels(graph)?;
    log::debug!(
        "Inferring shapes for graph \"{}\" with {} nodes in {} levels",
        graph.name,
        graph.nodes.len(),
        levels.len()
    );

    let mut result = InferenceResult::default();
    for input in &graph.inputs {
        result.values.insert(input.name.clone(), input.info());
    }
    for output in &graph.outputs {
        if let Some(info) = result.values.get_mut(output.name.as_str()) {
            let declared = output.info();
            *info = declared.merge(info).map_err(|error| GraphError::OutputConflict {
                output: output.name.clone(),
                error,
            })?;
        }
    }

    let declared_outputs: FxHashMap<&str, ValueInfo> = graph
        .outputs
        .iter()
        .map(|output| (output.name.as_str(), output.info()))
        .collect();

    for level in levels {
        let values = &result.values;
        let infer = |&node_idx: &usize| {
            infer_node(graph, node_idx, registry, values, &declared_outputs)
        };

        let level_outputs: Vec<_> = if options.parallel && level.len() > 1 {
            thread_pool().run(|| level.par_iter().map(infer).collect())
        } else {
            level.iter().map(infer).collect()
        };

        for (&node_idx, outputs) in level.iter().zip(level_outputs) {
            let node = &graph.nodes[node_idx];
            let outputs = match outputs {
                Ok(outputs) => outputs,
                Err(err) if options.policy == ErrorPolicy::Continue => {
                    log::warn!("Skipping node: {}", err);
                    result.errors.push(err);
                    node.present_outputs()
                        .map(|name| (name.to_string(), ValueInfo::unknown()))
                        .collect()
                }
                Err(err) => return Err(err.into()),
            };
            result.values.extend(outputs);
        }
    }

    Ok(result)
}

/// Validate a node against its schema and infer its outputs.
///
/// Returns the inferred information for each output which the node uses.
fn infer_node(
    graph: &Graph,
    node_idx: usize,
    registry: &SchemaRegistry,
    values: &FxHashMap<String, ValueInfo>,
    declared_outputs: &FxHashMap<&str, ValueInfo>,
) -> Result<Vec<(String, ValueInfo)>, NodeError> {
    let node = &graph.nodes[node_idx];
    let node_error = |kind| NodeError {
        node: graph.node_name(node_idx),
        op_type: node.op_type.clone(),
        kind,
    };

    let schema = registry
        .get(&node.domain, &node.op_type, graph.opset_version)
        .ok_or_else(|| {
            node_error(NodeErrorKind::UnknownOperator {
                domain: node.domain.clone(),
                opset: graph.opset_version,
            })
        })?;

    check_arity(schema, node).map_err(node_error)?;
    let attrs = resolve_attrs(schema, &node.attrs).map_err(node_error)?;
    log::trace!(
        "Node \"{}\" attributes {:?}",
        graph.node_name(node_idx),
        attrs.iter().collect::<Vec<_>>()
    );

    let inputs: Vec<Option<ValueInfo>> = node
        .inputs
        .iter()
        .map(|name| {
            if name.is_empty() {
                None
            } else {
                Some(values.get(name).cloned().unwrap_or_else(ValueInfo::unknown))
            }
        })
        .collect();
    check_input_types(schema, &inputs).map_err(node_error)?;

    let mut ctx = InferenceContext::new(&inputs, node.outputs.len());
    schema.infer(&attrs, &mut ctx).map_err(|error| {
        let input = match &error {
            InferShapesError::IncorrectRank { input, .. } => {
                schema.input(*input).map(|slot| slot.name)
            }
            _ => None,
        };
        node_error(NodeErrorKind::ShapeInference { error, input })
    })?;

    let mut outputs = Vec::new();
    for (name, info) in node.outputs.iter().zip(ctx.into_outputs()) {
        if name.is_empty() {
            continue;
        }
        let mut info = info.unwrap_or_else(ValueInfo::unknown);
        if let Some(declared) = declared_outputs.get(name.as_str()) {
            info = declared.merge(&info).map_err(|error| {
                node_error(NodeErrorKind::OutputConflict {
                    output: name.clone(),
                    error,
                })
            })?;
        }
        log::trace!("Output \"{}\" is {}", name, info);
        outputs.push((name.clone(), info));
    }
    log::debug!(
        "Inferred {} outputs of node \"{}\" ({})",
        outputs.len(),
        graph.node_name(node_idx),
        node.op_type
    );

    Ok(outputs)
}

/// Check the number of inputs and outputs a node supplies against the
/// schema.
fn check_arity(schema: &SchemaDescriptor, node: &Node) -> Result<(), NodeErrorKind> {
    let num_inputs = node
        .inputs
        .iter()
        .rposition(|name| !name.is_empty())
        .map(|pos| pos + 1)
        .unwrap_or(0);
    if num_inputs > schema.max_inputs() {
        return Err(NodeErrorKind::TooManyInputs {
            max: schema.max_inputs(),
            actual: num_inputs,
        });
    }

    for slot in schema.inputs() {
        let present = node
            .inputs
            .get(slot.index)
            .is_some_and(|name| !name.is_empty());
        if slot.option == ParamOption::Single && !present {
            return Err(NodeErrorKind::MissingInput {
                index: slot.index,
                name: slot.name,
            });
        }
    }

    let num_outputs = node.outputs.len();
    if num_outputs < schema.min_outputs() || num_outputs > schema.max_outputs() {
        return Err(NodeErrorKind::OutputCount {
            min: schema.min_outputs(),
            max: schema.max_outputs(),
            actual: num_outputs,
        });
    }

    Ok(())
}

/// Validate a node's attributes and apply the schema's defaults.
fn resolve_attrs(schema: &SchemaDescriptor, attrs: &Attrs) -> Result<Attrs, NodeErrorKind> {
    let mut resolved = Attrs::new();

    for (name, value) in attrs.iter() {
        let decl = schema
            .attribute(name)
            .ok_or_else(|| NodeErrorKind::UnknownAttribute(name.to_string()))?;
        let value = value
            .coerce_to(decl.kind)
            .ok_or(NodeErrorKind::AttributeKind {
                name: decl.name,
                expected: decl.kind,
                actual: value.kind(),
            })?;
        resolved.insert(name, value);
    }

    for decl in schema.attributes() {
        if resolved.contains(decl.name) {
            continue;
        }
        match &decl.default {
            AttrDefault::Required => return Err(NodeErrorKind::MissingAttribute(decl.name)),
            AttrDefault::Optional => {}
            AttrDefault::Value(value) => resolved.insert(decl.name, value.clone()),
        }
    }

    Ok(resolved)
}

/// Check the element types of inputs against the schema's type constraints.
///
/// Inputs whose type is unknown are not checked.
fn check_input_types(
    schema: &SchemaDescriptor,
    inputs: &[Option<ValueInfo>],
) -> Result<(), NodeErrorKind> {
    let mut bound: Vec<(&'static str, ElementType)> = Vec::new();

    for (index, input) in inputs.iter().enumerate() {
        let (Some(slot), Some(elem_type)) = (
            schema.input(index),
            input.as_ref().and_then(|info| info.elem_type),
        ) else {
            continue;
        };

        if let Some(constraint) = schema.type_constraint(slot.type_param) {
            if !constraint.allows(elem_type) {
                return Err(NodeErrorKind::TypeConstraint {
                    input: index,
                    name: slot.name,
                    type_param: slot.type_param,
                    elem_type,
                });
            }
        }

        match bound.iter().find(|(param, _)| *param == slot.type_param) {
            Some(&(_, expected)) if expected != elem_type => {
                return Err(NodeErrorKind::TypeParamMismatch {
                    type_param: slot.type_param,
                    expected,
                    actual: elem_type,
                });
            }
            Some(_) => {}
            None => bound.push((slot.type_param, elem_type)),
        }
    }

    Ok(())
}
