//! Immutable service-account credential record and its loaders.
//!
//! A credential is decoded from the JSON key record issued for a service account. Loading
//! succeeds only when the record carries a non-empty `private_key` and `private_key_id`;
//! every other field is taken as-is and validated by the component that consumes it.

// crates.io
use tokio::io::{AsyncRead, AsyncReadExt};
// self
use crate::{_prelude::*, error::CredentialError};

/// Kind of key material carried by a credential record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyType {
	/// Non-interactive service account authenticated by a private key.
	#[default]
	ServiceAccount,
	/// Any key type this client does not know about.
	#[serde(other)]
	Unknown,
}

/// Wire shape of the key record. Every field is optional so validation can report missing
/// values precisely instead of surfacing a generic parse failure.
#[derive(Deserialize)]
struct ServiceAccountRecord {
	#[serde(rename = "type", default)]
	key_type: Option<KeyType>,
	client_email: Option<String>,
	private_key_id: Option<String>,
	private_key: Option<String>,
	project_id: Option<String>,
	token_uri: Option<String>,
	api_endpoint: Option<String>,
}

/// Service-account material owned by a single dispatcher.
#[derive(Clone)]
pub struct Credential {
	key_type: KeyType,
	account_email: Option<String>,
	key_id: String,
	private_key: String,
	project_id: String,
	token_uri: String,
	api_endpoint: String,
}
impl Credential {
	/// Builds a credential from an already-parsed JSON object.
	pub fn from_value(value: Value) -> Result<Self, CredentialError> {
		let record: ServiceAccountRecord = serde_path_to_error::deserialize(value)
			.map_err(|source| CredentialError::Parse { source })?;

		Self::from_record(record)
	}

	/// Builds a credential from JSON text.
	pub fn from_json_str(raw: &str) -> Result<Self, CredentialError> {
		let mut de = serde_json::Deserializer::from_str(raw);
		let record: ServiceAccountRecord = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| CredentialError::Parse { source })?;

		Self::from_record(record)
	}

	/// Reads the whole stream, decodes it as UTF-8 JSON, and builds a credential.
	pub async fn from_reader<R>(mut reader: R) -> Result<Self, CredentialError>
	where
		R: AsyncRead + Unpin,
	{
		let mut bytes = Vec::new();

		reader
			.read_to_end(&mut bytes)
			.await
			.map_err(|source| CredentialError::Io { path: None, source })?;

		Self::from_json_str(&String::from_utf8(bytes)?)
	}

	/// Opens a key file and builds a credential from its content.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, CredentialError> {
		let path = path.as_ref();
		let file = tokio::fs::File::open(path)
			.await
			.map_err(|source| CredentialError::Io { path: Some(path.to_owned()), source })?;

		Self::from_reader(file).await.map_err(|err| match err {
			CredentialError::Io { path: None, source } =>
				CredentialError::Io { path: Some(path.to_owned()), source },
			other => other,
		})
	}

	fn from_record(record: ServiceAccountRecord) -> Result<Self, CredentialError> {
		let private_key = record
			.private_key
			.filter(|key| !key.is_empty())
			.ok_or(CredentialError::MissingPrivateKey)?;
		let key_id = record
			.private_key_id
			.filter(|id| !id.is_empty())
			.ok_or(CredentialError::MissingKeyId)?;

		Ok(Self {
			key_type: record.key_type.unwrap_or_default(),
			account_email: record.client_email,
			key_id,
			private_key,
			project_id: record.project_id.unwrap_or_default(),
			token_uri: record.token_uri.unwrap_or_default(),
			api_endpoint: record.api_endpoint.unwrap_or_default(),
		})
	}

	/// Replaces the project identifier with a caller-supplied override.
	pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
		self.project_id = project_id.into();

		self
	}

	/// Key type declared by the record.
	pub fn key_type(&self) -> KeyType {
		self.key_type
	}

	/// Service-account email, when the record carries one.
	pub fn account_email(&self) -> Option<&str> {
		self.account_email.as_deref()
	}

	/// Identifier of the signing key, sent with every token exchange.
	pub fn key_id(&self) -> &str {
		&self.key_id
	}

	/// PEM-encoded private key. Callers must avoid logging this string.
	pub fn private_key(&self) -> &str {
		&self.private_key
	}

	/// Project the service account belongs to.
	pub fn project_id(&self) -> &str {
		&self.project_id
	}

	/// Token endpoint URL as written in the record.
	pub fn token_uri(&self) -> &str {
		&self.token_uri
	}

	/// Business API base URL as written in the record.
	pub fn api_endpoint(&self) -> &str {
		&self.api_endpoint
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("key_type", &self.key_type)
			.field("account_email", &self.account_email)
			.field("key_id", &self.key_id)
			.field("private_key", &"<redacted>")
			.field("project_id", &self.project_id)
			.field("token_uri", &self.token_uri)
			.field("api_endpoint", &self.api_endpoint)
			.finish()
	}
}
