//! Typed-tree JSON facade wrapping [`serde_json::Value`].
//!
//! Mirrors the source's build/parse/traverse surface (object, array, string, number, bool,
//! null) while delegating storage and serialization to `serde_json`.

// crates.io
use serde_json::{Map, Number, Value};
// self
use crate::_prelude::*;

/// A node in the typed JSON tree.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JsonValue(Value);
impl JsonValue {
	/// Creates an empty object node.
	pub fn object() -> Self {
		Self(Value::Object(Map::new()))
	}

	/// Creates an empty array node.
	pub fn array() -> Self {
		Self(Value::Array(Vec::new()))
	}

	/// Creates a string node.
	pub fn string(value: impl Into<String>) -> Self {
		Self(Value::String(value.into()))
	}

	/// Creates an unsigned integer node.
	pub fn uint(value: u64) -> Self {
		Self(Value::Number(Number::from(value)))
	}

	/// Creates a double-precision number node.
	pub fn double(value: f64) -> Self {
		Number::from_f64(value).map(|n| Self(Value::Number(n))).unwrap_or(Self(Value::Null))
	}

	/// Creates a boolean node.
	pub fn bool(value: bool) -> Self {
		Self(Value::Bool(value))
	}

	/// Creates a null node.
	pub fn null() -> Self {
		Self(Value::Null)
	}

	/// Starts a named object child under this (object) node, returning the new child.
	///
	/// The child is not attached to `self` until passed to [`JsonValue::add_object`].
	pub fn start_object(&self) -> Self {
		let _ = self;

		Self::object()
	}

	/// Starts a named array child, returning the new child.
	pub fn start_array(&self) -> Self {
		let _ = self;

		Self::array()
	}

	/// Adds a string field to this object node.
	pub fn add_string(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
		self.insert(name, Value::String(value.into()))
	}

	/// Adds an unsigned integer field to this object node.
	pub fn add_uint(&mut self, name: impl Into<String>, value: u64) -> Result<()> {
		self.insert(name, Value::Number(Number::from(value)))
	}

	/// Adds a double field to this object node.
	pub fn add_double(&mut self, name: impl Into<String>, value: f64) -> Result<()> {
		let number = Number::from_f64(value)
			.ok_or_else(|| Error::invalid_parameter("double value is NaN or infinite"))?;

		self.insert(name, Value::Number(number))
	}

	/// Adds a boolean field to this object node.
	pub fn add_bool(&mut self, name: impl Into<String>, value: bool) -> Result<()> {
		self.insert(name, Value::Bool(value))
	}

	/// Adds a null field to this object node.
	pub fn add_null(&mut self, name: impl Into<String>) -> Result<()> {
		self.insert(name, Value::Null)
	}

	/// Adds `child`, taking ownership of it, as a named field of this object node.
	pub fn add_object(&mut self, name: impl Into<String>, child: JsonValue) -> Result<()> {
		self.insert(name, child.0)
	}

	/// Appends `item` to this array node.
	pub fn add_item_to_array(&mut self, item: JsonValue) -> Result<()> {
		match &mut self.0 {
			Value::Array(items) => {
				items.push(item.0);

				Ok(())
			},
			_ => Err(JsonError::TypeMismatch { expected: "array" }.into()),
		}
	}

	/// Looks up a field by name on this object node.
	pub fn get_object_item(&self, name: &str) -> Option<JsonValue> {
		self.0.as_object()?.get(name).cloned().map(JsonValue)
	}

	/// Returns `true` if this object node has a field named `name`.
	pub fn has_child(&self, name: &str) -> bool {
		self.0.as_object().is_some_and(|obj| obj.contains_key(name))
	}

	/// Returns the item at `index` on this array node.
	pub fn get_array_item(&self, index: i64) -> Result<JsonValue> {
		let items = self.0.as_array().ok_or(JsonError::TypeMismatch { expected: "array" })?;
		let index =
			usize::try_from(index).map_err(|_| Error::invalid_parameter("negative array index"))?;

		items
			.get(index)
			.cloned()
			.map(JsonValue)
			.ok_or_else(|| Error::invalid_parameter("array index out of range"))
	}

	/// Returns the length of this array node.
	pub fn get_array_size(&self) -> Result<usize> {
		self.0.as_array().map(Vec::len).ok_or(JsonError::TypeMismatch { expected: "array" }.into())
	}

	/// Returns the string value of this node.
	pub fn get_string(&self) -> Result<&str> {
		self.0.as_str().ok_or(JsonError::TypeMismatch { expected: "string" }.into())
	}

	/// Returns the unsigned integer value of this node.
	pub fn get_number(&self) -> Result<u64> {
		self.0.as_u64().ok_or(JsonError::TypeMismatch { expected: "number" }.into())
	}

	/// Returns the double value of this node.
	pub fn get_double(&self) -> Result<f64> {
		self.0.as_f64().ok_or(JsonError::TypeMismatch { expected: "number" }.into())
	}

	/// Returns the boolean value of this node.
	pub fn get_bool(&self) -> Result<bool> {
		self.0.as_bool().ok_or(JsonError::TypeMismatch { expected: "bool" }.into())
	}

	/// Serializes this node to its unformatted (compact) JSON string representation.
	pub fn to_json_string(&self) -> String {
		// `serde_json::Value` serialization cannot fail for values built through this facade.
		serde_json::to_string(&self.0).expect("JsonValue must always serialize.")
	}

	/// Parses `buffer` into a [`JsonValue`] tree.
	pub fn parse(buffer: &str) -> Result<Self> {
		serde_json::from_str(buffer).map(Self).map_err(|e| JsonError::from(e).into())
	}

	/// Returns a deep clone of this node and its descendants.
	pub fn duplicate(&self) -> Self {
		self.clone()
	}

	fn insert(&mut self, name: impl Into<String>, value: Value) -> Result<()> {
		let name = name.into();
		let obj = self.0.as_object_mut().ok_or(JsonError::TypeMismatch { expected: "object" })?;

		if obj.contains_key(&name) {
			return Err(JsonError::NameDuplication { key: name }.into());
		}

		obj.insert(name, value);

		Ok(())
	}
}
impl From<Value> for JsonValue {
	fn from(value: Value) -> Self {
		Self(value)
	}
}
impl From<JsonValue> for Value {
	fn from(value: JsonValue) -> Self {
		value.0
	}
}
impl AsRef<Value> for JsonValue {
	fn as_ref(&self) -> &Value {
		&self.0
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn object_round_trips_through_parse_and_to_string() {
		let mut root = JsonValue::object();

		root.add_string("path", "C/A").expect("add_string should succeed.");
		root.add_uint("size", 42).expect("add_uint should succeed.");
		root.add_bool("flag", true).expect("add_bool should succeed.");

		let text = root.to_json_string();
		let parsed = JsonValue::parse(&text).expect("Serialized JSON must re-parse.");

		assert_eq!(root, parsed);
		assert_eq!(parsed.get_object_item("path").unwrap().get_string().unwrap(), "C/A");
		assert_eq!(parsed.get_object_item("size").unwrap().get_number().unwrap(), 42);
		assert!(parsed.get_object_item("flag").unwrap().get_bool().unwrap());
	}

	#[test]
	fn duplicate_key_rejected() {
		let mut root = JsonValue::object();

		root.add_string("client_id", "C").expect("First insert should succeed.");

		let err = root.add_string("client_id", "D").unwrap_err();

		assert!(matches!(err, Error::Json(JsonError::NameDuplication { .. })));
	}

	#[test]
	fn type_mismatch_on_accessor() {
		let node = JsonValue::string("not-a-number");

		assert!(matches!(node.get_number(), Err(Error::Json(JsonError::TypeMismatch { .. }))));
	}

	#[test]
	fn array_index_out_of_range_is_invalid_parameter() {
		let mut array = JsonValue::array();

		array.add_item_to_array(JsonValue::uint(1)).unwrap();

		assert!(matches!(array.get_array_item(-1), Err(Error::InvalidParameter { .. })));
		assert!(matches!(array.get_array_item(5), Err(Error::InvalidParameter { .. })));
		assert!(array.get_array_item(0).is_ok());
	}

	#[test]
	fn nested_object_ownership_transfers_on_add_object() {
		let mut root = JsonValue::object();
		let mut keys = JsonValue::object();

		keys.add_string("kty", "RSA").unwrap();

		let mut array = JsonValue::array();

		array.add_item_to_array(keys).unwrap();

		let mut jwks = JsonValue::object();

		jwks.add_object("keys", array).unwrap();
		root.add_object("jwks", jwks).unwrap();

		let keys_node =
			root.get_object_item("jwks").unwrap().get_object_item("keys").unwrap();

		assert_eq!(keys_node.get_array_size().unwrap(), 1);
	}
}
