//! Pluggable validation of header parameters and claims.
//!
//! A [`HeaderChecker`] validates one header parameter, a [`ClaimChecker`] validates
//! one claim of the decoded payload.
//! The caller decides which checkers run by handing a set of them to a
//! [`HeaderCheckerManager`] or [`ClaimCheckerManager`].
//!
//! Handling of the `crit` header parameter is not optional: every name listed in a
//! token's `crit` must have run through a registered checker, or the token is
//! rejected with [`Error::UnsupportedCriticalHeader`] no matter how valid its
//! signature is.
//!
//! Claim checkers run only after successful verification or decryption, over the
//! payload interpreted as a JSON claims object.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{Error, JsonObject, JsonValue, Result};

/// A validator for one header parameter.
pub trait HeaderChecker: Send + Sync {
	/// The header parameter this checker handles.
	fn supported_header(&self) -> &str;

	/// Whether the parameter is only acceptable in the protected header.
	fn protected_header_only(&self) -> bool {
		false
	}

	/// Validate the parameter value.
	fn check(&self, value: &JsonValue) -> Result<()>;
}

/// A validator for one claim.
pub trait ClaimChecker: Send + Sync {
	/// The claim this checker handles.
	fn supported_claim(&self) -> &str;

	/// Validate the claim value.
	fn check(&self, value: &JsonValue) -> Result<()>;
}

/// Runs a set of header checkers over a token's headers and enforces `crit`.
pub struct HeaderCheckerManager {
	checkers: Vec<Arc<dyn HeaderChecker>>,
}

impl HeaderCheckerManager {
	pub fn new(checkers: Vec<Arc<dyn HeaderChecker>>) -> Self {
		Self { checkers }
	}

	/// A manager without any checkers.
	///
	/// This still enforces `crit`: any token carrying a `crit` entry is rejected.
	pub fn empty() -> Self {
		Self::new(Vec::new())
	}

	/// Check one protected header and any number of unprotected header sources.
	///
	/// Every checker whose parameter is present runs once.
	/// A parameter found only in an unprotected header while its checker demands
	/// protection is rejected.
	/// Afterwards every `crit` entry must name a parameter that a checker has
	/// actually validated.
	pub fn check(&self, protected: Option<&JsonObject>, unprotected: &[Option<&JsonObject>]) -> Result<()> {
		for source in unprotected {
			if let Some(header) = source {
				if header.contains_key("crit") {
					return Err(Error::header_check_failed(
						"the \"crit\" parameter must be in the protected header",
					));
				}
			}
		}

		let mut checked: Vec<&str> = Vec::new();
		for checker in &self.checkers {
			let name = checker.supported_header();
			if let Some(value) = protected.and_then(|header| header.get(name)) {
				checker.check(value)?;
				checked.push(name);
				continue;
			}
			for source in unprotected {
				if let Some(value) = source.and_then(|header| header.get(name)) {
					if checker.protected_header_only() {
						return Err(Error::header_check_failed(format!(
							"the {:?} parameter must be in the protected header",
							name
						)));
					}
					checker.check(value)?;
					checked.push(name);
					break;
				}
			}
		}

		self.check_crit(protected, &checked)
	}

	/// Enforce RFC 7515 section 4.1.11: every `crit` entry must be understood.
	fn check_crit(&self, protected: Option<&JsonObject>, checked: &[&str]) -> Result<()> {
		let crit = match protected.and_then(|header| header.get("crit")) {
			None => return Ok(()),
			Some(crit) => crit,
		};
		let crit = crit
			.as_array()
			.filter(|entries| !entries.is_empty())
			.ok_or_else(|| {
				Error::header_check_failed("the \"crit\" parameter must be a non-empty array of strings")
			})?;
		for entry in crit {
			let name = entry.as_str().ok_or_else(|| {
				Error::header_check_failed("the \"crit\" parameter must be a non-empty array of strings")
			})?;
			if !checked.contains(&name) {
				return Err(Error::unsupported_critical_header(name));
			}
		}
		Ok(())
	}
}

/// Runs a set of claim checkers over a decoded claims object.
pub struct ClaimCheckerManager {
	checkers: Vec<Arc<dyn ClaimChecker>>,
}

impl ClaimCheckerManager {
	pub fn new(checkers: Vec<Arc<dyn ClaimChecker>>) -> Self {
		Self { checkers }
	}

	/// Check all claims a checker is registered for.
	///
	/// Claims listed in `mandatory` must be present, whether or not a checker
	/// handles them.
	pub fn check(&self, claims: &JsonObject, mandatory: &[&str]) -> Result<()> {
		for name in mandatory {
			if !claims.contains_key(*name) {
				return Err(Error::claim_check_failed(format!("missing mandatory claim {:?}", name)));
			}
		}
		for checker in &self.checkers {
			if let Some(value) = claims.get(checker.supported_claim()) {
				checker.check(value)?;
			}
		}
		Ok(())
	}

	/// Interpret a payload as a JSON claims object and check it.
	pub fn check_payload(&self, payload: &[u8], mandatory: &[&str]) -> Result<JsonObject> {
		let claims: JsonObject = serde_json::from_slice(payload)
			.map_err(|_| Error::malformed_input("the payload is not a JSON claims object"))?;
		self.check(&claims, mandatory)?;
		Ok(claims)
	}
}

/// Seconds since the Unix epoch, as the JOSE numeric date type.
fn now() -> f64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|elapsed| elapsed.as_secs_f64())
		.unwrap_or(0.0)
}

fn numeric_date(name: &str, value: &JsonValue) -> Result<f64> {
	value
		.as_f64()
		.ok_or_else(|| Error::claim_check_failed(format!("the {:?} claim must be a number", name)))
}

/// Checks that the `alg` header parameter is in an allowed set.
pub struct AlgorithmChecker {
	allowed: Vec<String>,
	protected_only: bool,
}

impl AlgorithmChecker {
	pub fn new(allowed: &[&str], protected_only: bool) -> Self {
		Self {
			allowed: allowed.iter().map(|name| (*name).to_string()).collect(),
			protected_only,
		}
	}
}

impl HeaderChecker for AlgorithmChecker {
	fn supported_header(&self) -> &str {
		"alg"
	}

	fn protected_header_only(&self) -> bool {
		self.protected_only
	}

	fn check(&self, value: &JsonValue) -> Result<()> {
		let name = value
			.as_str()
			.ok_or_else(|| Error::header_check_failed("the \"alg\" parameter must be a string"))?;
		if self.allowed.iter().any(|allowed| allowed == name) {
			Ok(())
		} else {
			Err(Error::header_check_failed(format!("algorithm {:?} is not allowed", name)))
		}
	}
}

/// Checks the `exp` claim: the token must not be expired.
pub struct ExpirationTimeChecker {
	allowed_drift: u64,
}

impl ExpirationTimeChecker {
	/// Allow the given clock drift in seconds.
	pub fn new(allowed_drift: u64) -> Self {
		Self { allowed_drift }
	}
}

impl ClaimChecker for ExpirationTimeChecker {
	fn supported_claim(&self) -> &str {
		"exp"
	}

	fn check(&self, value: &JsonValue) -> Result<()> {
		let expires = numeric_date("exp", value)?;
		if now() > expires + self.allowed_drift as f64 {
			Err(Error::claim_check_failed("the token expired"))
		} else {
			Ok(())
		}
	}
}

/// Checks the `nbf` claim: the token must not be used before its validity start.
pub struct NotBeforeChecker {
	allowed_drift: u64,
}

impl NotBeforeChecker {
	pub fn new(allowed_drift: u64) -> Self {
		Self { allowed_drift }
	}
}

impl ClaimChecker for NotBeforeChecker {
	fn supported_claim(&self) -> &str {
		"nbf"
	}

	fn check(&self, value: &JsonValue) -> Result<()> {
		let not_before = numeric_date("nbf", value)?;
		if not_before > now() + self.allowed_drift as f64 {
			Err(Error::claim_check_failed("the token can not be used yet"))
		} else {
			Ok(())
		}
	}
}

/// Checks the `iat` claim: the token must not be issued in the future.
pub struct IssuedAtChecker {
	allowed_drift: u64,
}

impl IssuedAtChecker {
	pub fn new(allowed_drift: u64) -> Self {
		Self { allowed_drift }
	}
}

impl ClaimChecker for IssuedAtChecker {
	fn supported_claim(&self) -> &str {
		"iat"
	}

	fn check(&self, value: &JsonValue) -> Result<()> {
		let issued_at = numeric_date("iat", value)?;
		if issued_at > now() + self.allowed_drift as f64 {
			Err(Error::claim_check_failed("the token was issued in the future"))
		} else {
			Ok(())
		}
	}
}

/// Checks the `aud` claim or header parameter against one expected audience.
pub struct AudienceChecker {
	audience: String,
}

impl AudienceChecker {
	pub fn new(audience: impl Into<String>) -> Self {
		Self { audience: audience.into() }
	}

	fn check_value(&self, value: &JsonValue) -> Result<()> {
		let matches = match value {
			JsonValue::String(audience) => audience == &self.audience,
			JsonValue::Array(audiences) => audiences
				.iter()
				.any(|audience| audience.as_str() == Some(self.audience.as_str())),
			_ => false,
		};
		if matches {
			Ok(())
		} else {
			Err(Error::claim_check_failed(format!(
				"the token is not for audience {:?}",
				self.audience
			)))
		}
	}
}

impl ClaimChecker for AudienceChecker {
	fn supported_claim(&self) -> &str {
		"aud"
	}

	fn check(&self, value: &JsonValue) -> Result<()> {
		self.check_value(value)
	}
}

impl HeaderChecker for AudienceChecker {
	fn supported_header(&self) -> &str {
		"aud"
	}

	fn check(&self, value: &JsonValue) -> Result<()> {
		self.check_value(value)
	}
}

/// Checks the `iss` claim against a set of trusted issuers.
pub struct IssuerChecker {
	issuers: Vec<String>,
}

impl IssuerChecker {
	pub fn new(issuers: &[&str]) -> Self {
		Self {
			issuers: issuers.iter().map(|issuer| (*issuer).to_string()).collect(),
		}
	}
}

impl ClaimChecker for IssuerChecker {
	fn supported_claim(&self) -> &str {
		"iss"
	}

	fn check(&self, value: &JsonValue) -> Result<()> {
		let issuer = value
			.as_str()
			.ok_or_else(|| Error::claim_check_failed("the \"iss\" claim must be a string"))?;
		if self.issuers.iter().any(|trusted| trusted == issuer) {
			Ok(())
		} else {
			Err(Error::claim_check_failed(format!("issuer {:?} is not trusted", issuer)))
		}
	}
}
