use std::collections::{BTreeMap, VecDeque};
use std::error::Error;
use std::fs;

use nmdefs::{
    infer_shapes, ErrorPolicy, Graph, InferOptions, InferenceResult, SchemaRegistry,
    DEFAULT_OPSET_VERSION,
};

struct Args {
    /// Graph description to infer shapes for.
    graph: Option<String>,

    /// List the registered schemas.
    list: bool,

    /// Print the reference for one operator.
    schema: Option<String>,

    /// Output JSON instead of text.
    json: bool,

    /// Keep going after a node fails.
    keep_going: bool,

    /// Infer nodes on the current thread only.
    serial: bool,

    /// Opset version, overriding the one in the graph.
    opset: Option<u32>,

    /// Enable verbose logging.
    verbose: bool,
}

fn parse_args() -> Result<Args, lexopt::Error> {
    use lexopt::prelude::*;

    let mut values = VecDeque::new();
    let mut list = false;
    let mut schema = None;
    let mut json = false;
    let mut keep_going = false;
    let mut serial = false;
    let mut opset = None;
    let mut verbose = false;

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Value(val) => values.push_back(val.string()?),
            Short('l') | Long("list") => list = true,
            Short('s') | Long("schema") => schema = Some(parser.value()?.string()?),
            Long("json") => json = true,
            Short('c') | Long("continue") => keep_going = true,
            Long("serial") => serial = true,
            Long("opset") => opset = Some(parser.value()?.parse()?),
            Short('v') | Long("verbose") => verbose = true,
            Short('h') | Long("help") => {
                println!(
                    "List neuromorphic operator schemas and infer shapes for graphs.

Usage: {bin_name} [OPTIONS] [graph]

Args:

  <graph>
    JSON graph description to infer shapes for.

Options:

  -l, --list          List registered operator schemas
  -s, --schema <op>   Print the reference for an operator
  --json              Output JSON
  -c, --continue      Continue after node errors
  --serial            Do not infer independent nodes in parallel
  --opset <version>   Opset version to use. Defaults to the graph's version
                      or {default_opset} when listing schemas.
  -v, --verbose       Enable verbose logging
  -h, --help          Print help

Environment:

  NMDEFS_NUM_THREADS    Number of threads used for inference
  NMDEFS_PARALLEL       Set to 0 to disable parallel inference
  NMDEFS_ERROR_POLICY   \"abort\" or \"continue\"
",
                    bin_name = parser.bin_name().unwrap_or("nmdefs"),
                    default_opset = DEFAULT_OPSET_VERSION,
                );
                std::process::exit(0);
            }
            _ => return Err(arg.unexpected()),
        }
    }

    let graph = values.pop_front();
    if graph.is_none() && !list && schema.is_none() {
        return Err("expected `<graph>`, `--list` or `--schema`".into());
    }

    Ok(Args {
        graph,
        list,
        schema,
        json,
        keep_going,
        serial,
        opset,
        verbose,
    })
}

fn list_schemas(registry: &SchemaRegistry, json: bool) -> Result<(), Box<dyn Error>> {
    let schemas = registry.schemas();
    if json {
        println!("{}", serde_json::to_string_pretty(&schemas)?);
        return Ok(());
    }

    for schema in schemas {
        let domain = if schema.domain().is_empty() {
            "ai.onnx"
        } else {
            schema.domain()
        };
        println!(
            "{:<12} {:<10} since {:<3} inputs {}-{} outputs {}-{}",
            schema.name(),
            domain,
            schema.since_version(),
            schema.min_inputs(),
            schema.max_inputs(),
            schema.min_outputs(),
            schema.max_outputs(),
        );
    }
    Ok(())
}

fn print_schema(
    registry: &SchemaRegistry,
    name: &str,
    opset: u32,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let schema = registry
        .get("", name, opset)
        .ok_or_else(|| format!("no schema for \"{}\" at opset {}", name, opset))?;
    if json {
        println!("{}", serde_json::to_string_pretty(schema)?);
    } else {
        print!("{}", schema);
    }
    Ok(())
}

/// Format inferred values as a table with one value per line, in name
/// order.
fn format_values(result: &InferenceResult) -> String {
    let values = result.sorted_values();
    let width = values.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    values
        .iter()
        .map(|(name, info)| format!("{:<width$}  {}\n", name, info, width = width))
        .collect()
}

fn format_json(result: &InferenceResult) -> Result<String, serde_json::Error> {
    let values: BTreeMap<_, _> = result.values.iter().collect();
    let errors: Vec<_> = result.errors.iter().map(|err| err.to_string()).collect();
    serde_json::to_string_pretty(&serde_json::json!({
        "values": values,
        "errors": errors,
    }))
}

/// Tool for inspecting the neuromorphic operator schemas and checking the
/// shapes of graphs that use them.
///
/// ```
/// cargo run -p nmdefs-cli -- --list
/// cargo run -p nmdefs-cli -- --schema LIFCell
/// cargo run -p nmdefs-cli -- graph.json
/// ```
fn main() -> Result<(), Box<dyn Error>> {
    let args = parse_args()?;

    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let registry = SchemaRegistry::global();

    if args.list {
        list_schemas(registry, args.json)?;
    }

    if let Some(name) = &args.schema {
        let opset = args.opset.unwrap_or(DEFAULT_OPSET_VERSION);
        print_schema(registry, name, opset, args.json)?;
    }

    let Some(path) = &args.graph else {
        return Ok(());
    };

    let json = fs::read_to_string(path)?;
    let mut graph = Graph::from_json(&json)?;
    if let Some(opset) = args.opset {
        graph.opset_version = opset;
    }

    let mut options = InferOptions::from_env();
    if args.keep_going {
        options.policy = ErrorPolicy::Continue;
    }
    if args.serial {
        options.parallel = false;
    }
    log::debug!("Inference options {:?}", options);

    let result = infer_shapes(&graph, registry, &options)?;

    if args.json {
        println!("{}", format_json(&result)?);
    } else {
        print!("{}", format_values(&result));
        for err in &result.errors {
            eprintln!("error: {}", err);
        }
    }

    if !result.errors.is_empty() {
        return Err(format!("inference failed for {} nodes", result.errors.len()).into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use nmdefs::{
        ElementType, InferenceResult, NodeError, NodeErrorKind, TensorShape, ValueInfo,
    };

    use super::{format_json, format_values};

    fn result() -> InferenceResult {
        let mut result = InferenceResult::default();
        result.values.insert(
            "y_h".to_string(),
            ValueInfo::new(Some(ElementType::Float32), TensorShape::from_fixed(&[2, 4, 8])),
        );
        result.values.insert("x".to_string(), ValueInfo::unknown());
        result.errors.push(NodeError {
            node: "cell".to_string(),
            op_type: "LIFCell".to_string(),
            kind: NodeErrorKind::MissingAttribute("hidden_size"),
        });
        result
    }

    #[test]
    fn test_format_values() {
        assert_eq!(format_values(&result()), "x    ? [...]\ny_h  f32 [2, 4, 8]\n");
    }

    #[test]
    fn test_format_json() {
        let json = format_json(&result()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(json["values"]["y_h"]["type"], "float");
        assert_eq!(json["values"]["y_h"]["shape"], serde_json::json!([2, 4, 8]));
        assert_eq!(json["values"]["x"]["shape"], serde_json::Value::Null);
        assert_eq!(
            json["errors"][0],
            "node \"cell\" (LIFCell): required attribute \"hidden_size\" is missing"
        );
    }
}
