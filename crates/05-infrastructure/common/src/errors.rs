//! 错误类型定义

use thiserror::Error;

/// 配置错误类型
///
/// 键不存在不属于错误：读取 API 以 `None` 表示缺失。
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 值存在但没有转换器能转换为目标类型
    #[error("配置类型转换失败: key={key}, value={value}, 目标类型={target_type}")]
    ConversionFailed {
        /// 配置键
        key: String,
        /// 原始值
        value: String,
        /// 目标类型名称
        target_type: String,
    },

    /// 构建配置上下文失败
    #[error("配置上下文构建失败: {message}")]
    ContextBuildFailed {
        /// 失败原因
        message: String,
    },

    /// 属性源变更后未能切换配置上下文
    #[error("配置上下文切换失败: {message}")]
    ReconfigurationFailed {
        /// 失败原因
        message: String,
    },

    /// 新旧值同时为空的变更条目
    #[error("无效的变更条目: {key}, 新旧值不能同时为空")]
    InvalidChangeEntry {
        /// 配置键
        key: String,
    },

    /// 事件监听器返回错误或发生 panic
    #[error("事件监听器 {listener} 处理失败: {message}")]
    ListenerFailed {
        /// 监听器名称
        listener: String,
        /// 失败信息
        message: String,
    },

    /// 文件读取失败
    #[error("配置文件读取失败: {source}")]
    FileReadError {
        /// 底层 I/O 错误
        #[from]
        source: std::io::Error,
    },

    /// 配置文档解析失败
    #[error("配置解析失败: {source}")]
    ParseError {
        /// 底层解析错误
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// 序列化或反序列化失败
    #[error("配置序列化失败: {source}")]
    SerializationError {
        /// 底层 serde_json 错误
        #[from]
        source: serde_json::Error,
    },

    /// 属性源名称表达式无效
    #[error("无效的名称表达式: {source}")]
    InvalidPattern {
        /// 底层正则错误
        #[from]
        source: regex::Error,
    },
}

impl ConfigError {
    /// 创建类型转换错误
    pub fn conversion_failed(
        key: impl Into<String>,
        value: impl Into<String>,
        target_type: impl Into<String>,
    ) -> Self {
        Self::ConversionFailed {
            key: key.into(),
            value: value.into(),
            target_type: target_type.into(),
        }
    }

    /// 创建上下文构建错误
    pub fn context_build_failed(message: impl Into<String>) -> Self {
        Self::ContextBuildFailed {
            message: message.into(),
        }
    }

    /// 创建上下文切换错误
    pub fn reconfiguration_failed(message: impl Into<String>) -> Self {
        Self::ReconfigurationFailed {
            message: message.into(),
        }
    }

    /// 创建监听器错误
    pub fn listener_failed(listener: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ListenerFailed {
            listener: listener.into(),
            message: message.into(),
        }
    }

    /// 包装解析错误
    pub fn parse<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ParseError {
            source: Box::new(source),
        }
    }
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_failed_names_key_value_and_type() {
        let err = ConfigError::conversion_failed("server.port", "eighty", "u16");
        let message = err.to_string();
        assert!(message.contains("server.port"));
        assert!(message.contains("eighty"));
        assert!(message.contains("u16"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ConfigError = io.into();
        assert!(matches!(err, ConfigError::FileReadError { .. }));
    }
}
