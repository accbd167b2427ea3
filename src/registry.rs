//! Named registries of capability instances.
//!
//! A [`Registry`] maps wire-protocol names to shared instances of a capability trait:
//! signature algorithms, key encryption algorithms, serializers, and so on.
//! The registry a caller hands to a builder, verifier or loader doubles as the
//! allow-list for that operation: anything not registered is refused.
//!
//! Registration order is preserved and is the trial order wherever candidates are
//! tried in sequence (serializer detection, for example).

use std::sync::Arc;

/// An insertion-ordered mapping from names to shared capability instances.
pub struct Registry<T: ?Sized> {
	entries: Vec<(String, Arc<T>)>,
}

impl<T: ?Sized> Registry<T> {
	pub fn new() -> Self {
		Self { entries: Vec::new() }
	}

	/// Register an instance under a name.
	///
	/// Registering a name twice replaces the earlier instance and moves the name
	/// to the end of the trial order.
	pub fn register(&mut self, name: impl Into<String>, instance: Arc<T>) -> &mut Self {
		let name = name.into();
		self.entries.retain(|(existing, _)| existing != &name);
		self.entries.push((name, instance));
		self
	}

	/// Look an instance up by its exact name.
	///
	/// Matching is exact: no case folding, no aliases.
	pub fn get(&self, name: &str) -> Option<&Arc<T>> {
		self.entries
			.iter()
			.find(|(existing, _)| existing == name)
			.map(|(_, instance)| instance)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.get(name).is_some()
	}

	/// The registered names, in registration order.
	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.entries.iter().map(|(name, _)| name.as_str())
	}

	/// Iterate over entries in registration order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<T>)> {
		self.entries.iter().map(|(name, instance)| (name.as_str(), instance))
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl<T: ?Sized> Default for Registry<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: ?Sized> Clone for Registry<T> {
	fn clone(&self) -> Self {
		Self { entries: self.entries.clone() }
	}
}

impl<T: ?Sized> std::fmt::Debug for Registry<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		f.debug_list().entries(self.names()).finish()
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use assert2::assert;

	#[test]
	fn test_registration_order_is_preserved() {
		let mut registry: Registry<str> = Registry::new();
		registry.register("b", Arc::from("B"));
		registry.register("a", Arc::from("A"));
		registry.register("c", Arc::from("C"));

		let names: Vec<_> = registry.names().collect();
		assert!(names == ["b", "a", "c"]);
	}

	#[test]
	fn test_lookup_is_exact() {
		let mut registry: Registry<str> = Registry::new();
		registry.register("HS256", Arc::from("x"));

		assert!(registry.contains("HS256"));
		assert!(!registry.contains("hs256"));
		assert!(!registry.contains("HS256 "));
	}

	#[test]
	fn test_reregistration_replaces() {
		let mut registry: Registry<str> = Registry::new();
		registry.register("a", Arc::from("old"));
		registry.register("b", Arc::from("B"));
		registry.register("a", Arc::from("new"));

		assert!(registry.len() == 2);
		assert!(&**registry.get("a").unwrap() == "new");
		let names: Vec<_> = registry.names().collect();
		assert!(names == ["b", "a"]);
	}
}
