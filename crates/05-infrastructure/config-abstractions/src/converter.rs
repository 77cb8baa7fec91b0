//! 属性类型转换器抽象接口

/// 属性类型转换器 trait
///
/// 必须是输入字符串的纯函数。返回 `None` 表示"无法转换"，
/// 只有当目标类型的所有转换器都失败时才构成错误。
pub trait PropertyConverter<T>: Send + Sync {
    /// 转换原始字符串
    fn convert(&self, raw: &str) -> Option<T>;
}

impl<T, F> PropertyConverter<T> for F
where
    F: Fn(&str) -> Option<T> + Send + Sync,
{
    fn convert(&self, raw: &str) -> Option<T> {
        self(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Celsius;

    impl PropertyConverter<f64> for Celsius {
        fn convert(&self, raw: &str) -> Option<f64> {
            raw.trim().strip_suffix("°C")?.trim().parse().ok()
        }
    }

    #[test]
    fn test_struct_converter() {
        assert_eq!(Celsius.convert("21.5 °C"), Some(21.5));
        assert_eq!(Celsius.convert("21.5"), None);
    }

    #[test]
    fn test_closure_converter() {
        let doubled = |raw: &str| raw.parse::<i32>().ok().map(|v| v * 2);
        assert_eq!(PropertyConverter::<i32>::convert(&doubled, "4"), Some(8));
    }
}
