pub mod stream;
pub mod test_op;

use std::sync::Arc;

use crate::clients::Clients;
use crate::config::Config;

use super::OperationRegistry;

/// Builds the registry of every `Operation` type the scheduler knows
/// how to run.
pub fn build(config: &Config, clients: Arc<Clients>) -> OperationRegistry {
    let mut registry = OperationRegistry::new();
    registry.register("test", Arc::new(test_op::TestOperation));
    registry.register(
        "stream",
        Arc::new(stream::StreamOperation::new(
            clients,
            config.emistream_srt.clone(),
            config.operations.stream.window,
            config.operations.stream.timeout,
        )),
    );
    registry
}
