use std::fmt;

use serde_json::{Number, Value};

/// Leaf value of a flattened document.
///
/// Dates, GUIDs and URIs travel as JSON strings and are kept verbatim in
/// [`ScalarValue::String`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarValue {
	Null,
	Bool(bool),
	Number(Number),
	String(String),
}

impl ScalarValue {
	/// Converts a JSON leaf. Objects and arrays are not scalars.
	pub fn from_json(value: &Value) -> Option<Self> {
		match value {
			Value::Null => Some(Self::Null),
			Value::Bool(b) => Some(Self::Bool(*b)),
			Value::Number(n) => Some(Self::Number(n.clone())),
			Value::String(s) => Some(Self::String(s.clone())),
			Value::Array(_) | Value::Object(_) => None,
		}
	}

	/// Configuration string form: `null` renders empty, booleans and numbers
	/// in their JSON spelling, strings verbatim.
	pub fn render(&self) -> String {
		match self {
			Self::Null => String::new(),
			Self::Bool(b) => b.to_string(),
			Self::Number(n) => n.to_string(),
			Self::String(s) => s.clone(),
		}
	}

	/// Back to JSON.
	pub fn to_json(&self) -> Value {
		match self {
			Self::Null => Value::Null,
			Self::Bool(b) => Value::Bool(*b),
			Self::Number(n) => Value::Number(n.clone()),
			Self::String(s) => Value::String(s.clone()),
		}
	}

	pub const fn is_null(&self) -> bool {
		matches!(self, Self::Null)
	}
}

impl fmt::Display for ScalarValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Null => Ok(()),
			Self::Bool(b) => write!(f, "{b}"),
			Self::Number(n) => write!(f, "{n}"),
			Self::String(s) => f.write_str(s),
		}
	}
}

impl From<&str> for ScalarValue {
	fn from(value: &str) -> Self {
		Self::String(value.to_string())
	}
}

impl From<String> for ScalarValue {
	fn from(value: String) -> Self {
		Self::String(value)
	}
}

impl From<bool> for ScalarValue {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl From<i64> for ScalarValue {
	fn from(value: i64) -> Self {
		Self::Number(value.into())
	}
}
