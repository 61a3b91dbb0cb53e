//! Sandboxed evaluation of user-supplied response scripts.

use parking_lot::Mutex;
use rhai::{Dynamic, Engine, EvalAltResult, Scope};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::model::RequestRecord;


#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// The script failed to parse or raised at runtime. Reported to the
    /// caller; a basket script must never take the service down with it.
    #[error("script evaluation failed: {0}")]
    Eval(String),
    #[error("script exceeded its evaluation budget")]
    Timeout,
}

/// Deterministic, side-effect-free script evaluator.
///
/// Scripts see the captured request as a read-only `request` map and the
/// basket name as `basket`; whatever they print is collected and returned.
/// The engine has no filesystem, network or process access, and every run
/// is bounded by an operation limit and a wall-clock deadline.
pub struct ScriptSandbox {
    max_operations: u64,
    timeout: Duration,
}

impl ScriptSandbox {
    pub fn new(max_operations: u64, timeout: Duration) -> Self {
        Self {
            max_operations,
            timeout,
        }
    }

    /// Runs a script against a captured request and returns the printed
    /// output, lines joined with newlines.
    pub fn eval(
        &self,
        basket: &str,
        script: &str,
        record: &RequestRecord,
    ) -> Result<String, ScriptError> {
        let mut engine = Engine::new();
        engine.set_max_operations(self.max_operations);

        let deadline = Instant::now() + self.timeout;
        engine.on_progress(move |_ops| {
            if Instant::now() >= deadline {
                Some(Dynamic::UNIT)
            } else {
                None
            }
        });

        let printed: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = printed.clone();
        engine.on_print(move |text| {
            sink.lock().push(text.to_string());
        });

        let mut scope = Scope::new();
        scope.push_constant("basket", basket.to_string());
        scope.push_constant("request", request_map(record));

        match engine.run_with_scope(&mut scope, script) {
            Ok(()) => Ok(printed.lock().join("\n")),
            Err(e) => Err(classify(*e)),
        }
    }
}

fn classify(error: EvalAltResult) -> ScriptError {
    match error {
        EvalAltResult::ErrorTooManyOperations(_) | EvalAltResult::ErrorTerminated(_, _) => {
            ScriptError::Timeout
        }
        other => ScriptError::Eval(other.to_string()),
    }
}

/// Builds the read-only `request` mapping exposed to scripts.
fn request_map(record: &RequestRecord) -> rhai::Map {
    let mut headers = rhai::Map::new();
    for (name, values) in &record.headers {
        let list: rhai::Array = values
            .iter()
            .map(|v| Dynamic::from(v.clone()))
            .collect();
        headers.insert(name.as_str().into(), Dynamic::from_array(list));
    }

    let mut map = rhai::Map::new();
    map.insert("Date".into(), Dynamic::from(record.date));
    map.insert(
        "ContentLength".into(),
        Dynamic::from(record.content_length),
    );
    map.insert("Headers".into(), Dynamic::from_map(headers));
    map.insert("Body".into(), Dynamic::from(record.body.clone()));
    map.insert("Method".into(), Dynamic::from(record.method.clone()));
    map.insert("Path".into(), Dynamic::from(record.path.clone()));
    map.insert("Query".into(), Dynamic::from(record.query.clone()));
    map
}
