use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::registry::Operation;

/// Echoes its parameters and resolved dependency results back as its
/// result. Used by integration tests and as a harmless smoke-test
/// operation in deployments.
pub struct TestOperation;

#[async_trait]
impl Operation for TestOperation {
    async fn run(
        &self,
        parameters: Value,
        dependencies: HashMap<String, Value>,
        _cancel: CancellationToken,
    ) -> anyhow::Result<Value> {
        Ok(json!({ "parameters": parameters, "dependencies": dependencies }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_parameters_and_dependencies() {
        let op = TestOperation;
        let mut deps = HashMap::new();
        deps.insert("upstream".to_owned(), json!(42));
        let result = op
            .run(json!({"greeting": "hi"}), deps, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result["parameters"]["greeting"], "hi");
        assert_eq!(result["dependencies"]["upstream"], 42);
    }
}
