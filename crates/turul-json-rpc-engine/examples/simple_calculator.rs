//! Simple Calculator JSON-RPC Example
//!
//! Registers a few calculator procedures and runs single requests, a
//! notification and a mixed batch through the dispatcher, printing whatever
//! would be written back to the transport.
//!
//! Run with `RUST_LOG=debug` to see the dispatcher's tracing output.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use serde_json::{Value, json};
use turul_json_rpc_engine::prelude::*;

fn number(params: &RequestParams, name: &str, index: usize) -> Result<f64, ProcedureError> {
    params
        .get(name)
        .or_else(|| params.get_index(index))
        .and_then(Value::as_f64)
        .ok_or_else(|| format!("Parameter '{}' is required and must be a number", name).into())
}

fn calculator(events: Arc<AtomicUsize>) -> ProcedureTable {
    let mut procedures = ProcedureTable::new();
    procedures
        .register_fn("add", |params| {
            Ok(json!(number(params, "a", 0)? + number(params, "b", 1)?))
        })
        .register_fn("subtract", |params| {
            Ok(json!(number(params, "a", 0)? - number(params, "b", 1)?))
        })
        .register_responder("divide", |request: &JsonRpcRequest| {
            let params = request.params();
            match (number(params, "a", 0), number(params, "b", 1)) {
                (Ok(_), Ok(b)) if b == 0.0 => JsonRpcResponse::error(
                    None,
                    JsonRpcError::server_error(-32001, Some("Division by zero".into()), None),
                ),
                (Ok(a), Ok(b)) => JsonRpcResponse::success(None, json!(a / b)),
                _ => JsonRpcResponse::error(None, JsonRpcError::invalid_params("a and b are required")),
            }
        })
        .register_fn("log", move |params| {
            events.fetch_add(1, Ordering::SeqCst);
            tracing::info!("log event: {}", params.to_value());
            Ok(Value::Null)
        })
        .register("multiply", Procedure::Unbound);
    procedures
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("🧮 Simple Calculator JSON-RPC Example");
    println!("=====================================");

    let events = Arc::new(AtomicUsize::new(0));
    let dispatcher = Dispatcher::with_config(
        calculator(events.clone()),
        DispatcherConfig::new().with_max_batch_size(16),
    );

    let payloads = [
        r#"{"jsonrpc": "2.0", "method": "add", "params": {"a": 5, "b": 3}, "id": 1}"#,
        r#"{"jsonrpc": "2.0", "method": "subtract", "params": [10, 4], "id": 2}"#,
        r#"{"jsonrpc": "2.0", "method": "divide", "params": [1, 0], "id": 3}"#,
        r#"{"jsonrpc": "2.0", "method": "multiply", "params": [2, 3], "id": 4}"#,
        r#"{"jsonrpc": "2.0", "method": "power", "params": [2, 3], "id": 5}"#,
        r#"{"jsonrpc": "2.0", "method": "add", "params": {"a": "x", "b": 5}, "id": 6}"#,
        r#"{"jsonrpc": "2.0", "method": "rpc.discover", "id": 7}"#,
        r#"{"jsonrpc": "2.0", "method": "log", "params": ["hello"]}"#,
        r#"{"jsonrpc": "2.0", "method": "add", "params": [1, 2"#,
        r#"[
            {"jsonrpc": "2.0", "method": "add", "params": [1, 2], "id": "a"},
            {"jsonrpc": "2.0", "method": "log", "params": ["batched"]},
            {"foo": "boo"},
            [1]
        ]"#,
        r#"[{"jsonrpc": "2.0", "method": "log", "params": ["quiet"]}]"#,
    ];

    for (i, payload) in payloads.iter().enumerate() {
        println!("\n--- Test {} ---", i + 1);
        println!("Request: {}", payload);
        match dispatcher.handle_str(payload)?.to_json_string() {
            Some(body) => println!("Response: {}", body),
            None => println!("📢 No response (notification)"),
        }
    }

    println!("\n--- Async dispatcher ---");
    let mut async_dispatcher = AsyncDispatcher::new();
    async_dispatcher.register_method(
        "add",
        FunctionHandler::new(|params: RequestParams| async move {
            Ok::<Value, ProcedureError>(json!(number(&params, "a", 0)? + number(&params, "b", 1)?))
        }),
    );
    let outcome = async_dispatcher
        .handle_bytes(
            br#"[{"jsonrpc":"2.0","method":"add","params":[1,1],"id":1},{"jsonrpc":"2.0","method":"add","params":[2,2],"id":2}]"#,
        )
        .await?;
    if let Some(body) = outcome.to_json_string() {
        println!("Response: {}", body);
    }

    println!("\n🎉 Calculator example completed ({} log events)", events.load(Ordering::SeqCst));
    Ok(())
}
