/// Nesting depth accepted by the default configuration.
pub const DEFAULT_MAX_DEPTH: u32 = 2048;

/// Tunables for structural validation.
///
/// # Example
///
/// ```
/// use lazy_bson::{Element, Value, ValidateConfig};
///
/// let element = Element::from_key_and_value("x", &Value::int32(7)).unwrap();
/// let shallow = ValidateConfig { max_depth: 1 };
/// assert_eq!(element.validate_with(&shallow).unwrap(), 7);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidateConfig {
    /// Maximum number of nested documents, arrays and scopes below the
    /// element being validated.
    pub max_depth: u32,
}

impl Default for ValidateConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}
