//! System info tool definition.

use rmcp::handler::server::tool::schema_for_type;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sysinfo::System;
use tracing::{info, instrument};

use crate::domains::ops::fs::format_size;
use crate::domains::tools::{
    Arguments, BlockingHandler, ExecutionKind, InvocationContext, ToolDescriptor, ToolResult,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemInfoParams {}

#[derive(Debug, Serialize, JsonSchema)]
pub struct SystemInfo {
    pub os_name: String,
    pub os_version: String,
    pub kernel_version: String,
    pub hostname: String,
    pub arch: String,
    pub cpu_count: usize,
    pub total_memory: u64,
    pub available_memory: u64,
    pub uptime_secs: u64,
    /// Human-readable memory summary.
    pub memory_summary: String,
}

/// system_info tool - host facts for the machine running the server.
pub struct SystemInfoTool;

impl SystemInfoTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "system_info";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Report operating system, architecture, CPU count and memory of the host running the server.";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, ExecutionKind::Offloaded)
            .output_schema(schema_for_type::<SystemInfo>().into())
    }

    #[instrument(skip_all)]
    pub fn execute(_ctx: &InvocationContext, _params: SystemInfoParams) -> ToolResult<SystemInfo> {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_cpu_all();

        let cpu_count = match sys.cpus().len() {
            0 => std::thread::available_parallelism().map_or(1, |n| n.get()),
            n => n,
        };
        let unknown = || "unknown".to_string();
        let report = SystemInfo {
            os_name: System::name().unwrap_or_else(unknown),
            os_version: System::os_version().unwrap_or_else(unknown),
            kernel_version: System::kernel_version().unwrap_or_else(unknown),
            hostname: System::host_name().unwrap_or_else(unknown),
            arch: std::env::consts::ARCH.to_string(),
            cpu_count,
            total_memory: sys.total_memory(),
            available_memory: sys.available_memory(),
            uptime_secs: System::uptime(),
            memory_summary: format!(
                "{} available of {}",
                format_size(sys.available_memory()),
                format_size(sys.total_memory())
            ),
        };
        info!(
            "{} {} ({}), {} CPUs",
            report.os_name, report.os_version, report.arch, report.cpu_count
        );
        Ok(report)
    }
}

impl BlockingHandler for SystemInfoTool {
    fn call(&self, ctx: &InvocationContext, args: Arguments) -> ToolResult<Value> {
        Ok(serde_json::to_value(Self::execute(ctx, args.parse()?)?)?)
    }
}
