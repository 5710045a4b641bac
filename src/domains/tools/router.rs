//! Tool Router - builds the rmcp ToolRouter from the registry.
//!
//! Every descriptor becomes one dynamic route. The route forwards the raw
//! argument map to [`ToolRegistry::dispatch`], so validation, execution kind
//! and error shaping stay in one place for every transport.

use std::sync::Arc;

use futures::FutureExt;
use rmcp::{
    handler::server::tool::{ToolCallContext, ToolRoute, ToolRouter},
    model::{CallToolResult, Content, Tool},
};

use super::handlers::{Invocation, ToolOutput};
use super::registry::ToolRegistry;
use super::schema::ToolDescriptor;

/// Build the tool router with all registered tools.
pub fn build_tool_router<S>(registry: Arc<ToolRegistry>) -> ToolRouter<S>
where
    S: Send + Sync + 'static,
{
    registry
        .descriptors()
        .iter()
        .fold(ToolRouter::new(), |router, descriptor| {
            router.with_route(create_route(descriptor, registry.clone()))
        })
}

/// Create a Tool model for a descriptor (metadata).
pub fn to_tool(descriptor: &ToolDescriptor) -> Tool {
    Tool {
        name: descriptor.name.into(),
        description: Some(descriptor.description.into()),
        input_schema: Arc::new(descriptor.input_schema()),
        annotations: None,
        output_schema: descriptor.output_schema.clone(),
        icons: None,
        meta: None,
        title: None,
    }
}

/// Convert the envelope into an MCP tool result.
///
/// Success carries the payload as structured content (with its JSON text as
/// the content block); failure carries the error message with `is_error` set.
pub fn to_call_result(output: ToolOutput) -> CallToolResult {
    match (output.success, output.payload, output.error) {
        (true, Some(payload), _) => CallToolResult::structured(payload),
        (_, _, Some(error)) => CallToolResult::error(vec![Content::text(error)]),
        _ => CallToolResult::success(vec![]),
    }
}

fn create_route<S>(descriptor: &ToolDescriptor, registry: Arc<ToolRegistry>) -> ToolRoute<S>
where
    S: Send + Sync + 'static,
{
    let name = descriptor.name;
    ToolRoute::new_dyn(to_tool(descriptor), move |ctx: ToolCallContext<'_, S>| {
        let args = ctx.arguments.clone().unwrap_or_default();
        let registry = registry.clone();
        async move {
            let output = registry.dispatch(Invocation::new(name, args)).await;
            Ok(to_call_result(output))
        }
        .boxed()
    })
}
