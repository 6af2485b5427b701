//! HTTP 传输实现
//!
//! 对接远程命令后端的 `/connections/*` 接口。响应解析拆成独立的纯函数，
//! 便于脱离网络测试。

use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use netterm_core::models::{
    BatchOutput, CommandOutput, CommandResultItem, ConnectionTestOutput, Credentials,
    DeviceTarget, HealthOutput, HealthStatus,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{Transport, TransportError, TransportResult};

/// 默认后端地址
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// 默认请求超时（秒）
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// 基于 reqwest 的后端客户端
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> TransportResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::Network(format!("创建 HTTP 客户端失败: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str, target: &DeviceTarget) -> String {
        format!("{}/connections/{}/{}", self.base_url, path, target.id)
    }

    async fn post_json(&self, url: String, body: Value) -> TransportResult<Value> {
        tracing::debug!("[HttpTransport] POST {}", url);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(response).await
    }

    async fn get_json(&self, url: String) -> TransportResult<Value> {
        tracing::debug!("[HttpTransport] GET {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(response).await
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(e.to_string())
    }
}

async fn read_json(response: reqwest::Response) -> TransportResult<Value> {
    let status = response.status();
    let body = response.text().await.map_err(map_reqwest_error)?;

    if !status.is_success() {
        return Err(TransportError::Http {
            status: status.as_u16(),
            detail: extract_detail(&body),
        });
    }

    serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))
}

/// 错误响应优先取 `detail` 字段，否则原样返回响应体
fn extract_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                "无法读取响应体".to_string()
            } else {
                body.to_string()
            }
        })
}

/// 后端要求数字形式的设备 ID，非数字 ID 原样发送
fn device_id_value(target: &DeviceTarget) -> Value {
    target
        .id
        .parse::<u64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(target.id.clone()))
}

fn connection_body(target: &DeviceTarget, credentials: &Credentials) -> Value {
    json!({
        "device_id": device_id_value(target),
        "username": credentials.username,
        "password": credentials.password,
        "port": credentials.port,
    })
}

fn decode<T: for<'de> Deserialize<'de>>(value: Value) -> TransportResult<T> {
    serde_json::from_value(value).map_err(|e| TransportError::Decode(e.to_string()))
}

fn rejection(status: &str, detail: Option<String>, message: Option<String>) -> TransportError {
    TransportError::Rejected(
        detail
            .or(message)
            .unwrap_or_else(|| format!("unexpected status: {}", status)),
    )
}

#[derive(Deserialize)]
struct ExecuteResponse {
    status: String,
    result: Option<ExecuteResult>,
    detail: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct ExecuteResult {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    stderr: String,
    #[serde(default)]
    execution_time: f64,
}

pub(crate) fn parse_execute_response(value: Value) -> TransportResult<CommandOutput> {
    let response: ExecuteResponse = decode(value)?;
    if response.status != "completed" {
        return Err(rejection(&response.status, response.detail, response.message));
    }
    let result = response
        .result
        .ok_or_else(|| TransportError::Decode("缺少 result 字段".to_string()))?;

    Ok(CommandOutput {
        stdout: result.stdout,
        stderr: result.stderr,
        success: result.success,
        execution_time_secs: result.execution_time,
    })
}

#[derive(Deserialize)]
struct BatchResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    results: Vec<CommandResultItem>,
    #[serde(default)]
    total_execution_time: f64,
    detail: Option<String>,
    message: Option<String>,
}

pub(crate) fn parse_batch_response(value: Value) -> TransportResult<BatchOutput> {
    let response: BatchResponse = decode(value)?;
    if let Some(status) = response.status.as_deref() {
        if status != "completed" {
            return Err(rejection(status, response.detail, response.message));
        }
    }

    Ok(BatchOutput {
        results: response.results,
        total_execution_time_secs: response.total_execution_time,
    })
}

#[derive(Deserialize)]
struct TestResponse {
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    test_results: Option<TestResults>,
}

#[derive(Deserialize)]
struct TestResults {
    #[serde(default)]
    total_tests: usize,
    #[serde(default)]
    successful_tests: usize,
}

pub(crate) fn parse_test_response(value: Value) -> TransportResult<ConnectionTestOutput> {
    let response: TestResponse = decode(value)?;
    let (total_tests, successful_tests) = response
        .test_results
        .map(|t| (t.total_tests, t.successful_tests))
        .unwrap_or((0, 0));

    Ok(ConnectionTestOutput {
        success: response.status == "success",
        message: response.message,
        total_tests,
        successful_tests,
    })
}

#[derive(Deserialize)]
struct HealthResponse {
    status: String,
    #[serde(default)]
    health_score: f64,
    #[serde(default)]
    commands_executed: usize,
    #[serde(default)]
    successful_commands: usize,
    #[serde(default)]
    details: Vec<CommandResultItem>,
    error: Option<String>,
}

pub(crate) fn parse_health_response(value: Value) -> TransportResult<HealthOutput> {
    let response: HealthResponse = decode(value)?;
    let status = response
        .status
        .parse::<HealthStatus>()
        .unwrap_or_else(|_| HealthStatus::from_score(response.health_score));

    Ok(HealthOutput {
        status,
        health_score: response.health_score,
        commands_executed: response.commands_executed,
        successful_commands: response.successful_commands,
        details: response.details,
        error: response.error,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AvailableCommands {
    Named(IndexMap<String, String>),
    Plain(Vec<String>),
}

#[derive(Deserialize)]
struct AvailableCommandsResponse {
    available_commands: AvailableCommands,
}

pub(crate) fn parse_available_commands(value: Value) -> TransportResult<Vec<String>> {
    let response: AvailableCommandsResponse = decode(value)?;
    let commands = match response.available_commands {
        AvailableCommands::Named(map) => map.into_values().collect(),
        AvailableCommands::Plain(list) => list,
    };
    Ok(commands)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute_command(
        &self,
        target: &DeviceTarget,
        credentials: &Credentials,
        command: &str,
    ) -> TransportResult<CommandOutput> {
        let mut body = connection_body(target, credentials);
        body["command"] = Value::from(command);
        let value = self.post_json(self.url("execute", target), body).await?;
        parse_execute_response(value)
    }

    async fn execute_commands(
        &self,
        target: &DeviceTarget,
        credentials: &Credentials,
        commands: &[String],
        delay: Duration,
    ) -> TransportResult<BatchOutput> {
        let mut body = connection_body(target, credentials);
        body["commands"] = json!(commands);
        body["delay"] = Value::from(delay.as_secs_f64());
        let value = self
            .post_json(self.url("execute-multiple", target), body)
            .await?;
        parse_batch_response(value)
    }

    async fn test_connection(
        &self,
        target: &DeviceTarget,
        credentials: &Credentials,
    ) -> TransportResult<ConnectionTestOutput> {
        let body = connection_body(target, credentials);
        let value = self.post_json(self.url("test", target), body).await?;
        parse_test_response(value)
    }

    async fn health_check(
        &self,
        target: &DeviceTarget,
        credentials: &Credentials,
    ) -> TransportResult<HealthOutput> {
        let body = connection_body(target, credentials);
        let value = self
            .post_json(self.url("health-check", target), body)
            .await?;
        parse_health_response(value)
    }

    async fn list_available_commands(
        &self,
        target: &DeviceTarget,
    ) -> TransportResult<Vec<String>> {
        let value = self
            .get_json(self.url("available-commands", target))
            .await?;
        parse_available_commands(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> DeviceTarget {
        DeviceTarget::new("12", "edge-r1", "192.168.1.1", "mikrotik")
    }

    #[test]
    fn test_url_building() {
        let transport = HttpTransport::new(HttpTransportConfig {
            base_url: "http://backend:8000/".to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        assert_eq!(
            transport.url("execute", &target()),
            "http://backend:8000/connections/execute/12"
        );
    }

    #[test]
    fn test_connection_body_uses_numeric_id() {
        let body = connection_body(&target(), &Credentials::new("admin", "pw", 2222));
        assert_eq!(body["device_id"], json!(12));
        assert_eq!(body["port"], json!(2222));

        let named = DeviceTarget::new("lab-a", "a", "10.0.0.1", "ubuntu");
        let body = connection_body(&named, &Credentials::new("admin", "pw", 22));
        assert_eq!(body["device_id"], json!("lab-a"));
    }

    #[test]
    fn test_parse_execute_completed() {
        let output = parse_execute_response(json!({
            "status": "completed",
            "command": "/system resource print",
            "result": {
                "success": true,
                "stdout": "uptime: 3d",
                "stderr": "",
                "execution_time": 0.82,
                "timestamp": "2026-01-01T00:00:00"
            }
        }))
        .unwrap();
        assert!(output.success);
        assert_eq!(output.stdout, "uptime: 3d");
        assert_eq!(output.execution_time_secs, 0.82);
    }

    #[test]
    fn test_parse_execute_rejected() {
        let err = parse_execute_response(json!({
            "status": "failed",
            "detail": "device busy"
        }))
        .unwrap_err();
        assert_eq!(err, TransportError::Rejected("device busy".to_string()));
    }

    #[test]
    fn test_parse_execute_missing_result() {
        let err = parse_execute_response(json!({ "status": "completed" })).unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
    }

    #[test]
    fn test_parse_batch() {
        let output = parse_batch_response(json!({
            "status": "completed",
            "total_execution_time": 3.5,
            "results": [
                { "command": "ls", "success": true, "stdout": "a b" },
                { "command": "bogus", "success": false, "stderr": "not found" }
            ]
        }))
        .unwrap();
        assert_eq!(output.results.len(), 2);
        assert_eq!(output.results[1].stderr, "not found");
        assert_eq!(output.total_execution_time_secs, 3.5);
    }

    #[test]
    fn test_parse_test_response() {
        let ok = parse_test_response(json!({
            "status": "success",
            "message": "SSH connection successful - 3/3 tests passed",
            "test_results": { "total_tests": 3, "successful_tests": 3, "commands": [] }
        }))
        .unwrap();
        assert!(ok.success);
        assert_eq!(ok.successful_tests, 3);

        let failed = parse_test_response(json!({
            "status": "error",
            "message": "SSH connection failed: timed out"
        }))
        .unwrap();
        assert!(!failed.success);
        assert_eq!(failed.total_tests, 0);
    }

    #[test]
    fn test_parse_health_unreachable() {
        let output = parse_health_response(json!({
            "status": "unhealthy",
            "connection_status": "failed",
            "error": "Authentication failed",
            "health_score": 0
        }))
        .unwrap();
        assert_eq!(output.status, HealthStatus::Unhealthy);
        assert_eq!(output.error.as_deref(), Some("Authentication failed"));
        assert!(output.details.is_empty());
    }

    #[test]
    fn test_parse_health_unknown_status_uses_score() {
        let output = parse_health_response(json!({
            "status": "partial",
            "health_score": 66.67,
            "commands_executed": 3,
            "successful_commands": 2
        }))
        .unwrap();
        assert_eq!(output.status, HealthStatus::Degraded);
    }

    #[test]
    fn test_parse_available_commands_keeps_order() {
        let commands = parse_available_commands(json!({
            "device_type": "cisco_ios",
            "available_commands": {
                "version": "show version",
                "interfaces": "show ip int brief",
                "config": "show running-config"
            },
            "commands_count": 3
        }))
        .unwrap();
        assert_eq!(
            commands,
            vec!["show version", "show ip int brief", "show running-config"]
        );
    }

    #[test]
    fn test_extract_detail() {
        assert_eq!(
            extract_detail(r#"{"detail":"Device not found"}"#),
            "Device not found"
        );
        assert_eq!(extract_detail("Bad Gateway"), "Bad Gateway");
        assert_eq!(extract_detail(""), "无法读取响应体");
    }
}
