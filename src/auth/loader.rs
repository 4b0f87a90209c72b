//! Credential sources and the memoizing dispatcher builder.

// self
use crate::{
	_prelude::*,
	auth::Credential,
	dispatch::{Dispatcher, RetryPolicy},
	error::ConfigError,
	http::HttpTransport,
	sign::{self, SignerFactory},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// Where service-account material comes from and how the dispatcher is tuned.
#[derive(Clone, Debug, Default)]
pub struct AuthOptions {
	/// Path to a JSON key file; relative paths resolve against [`AuthOptions::base_dir`].
	pub key_file: Option<PathBuf>,
	/// Inline key record.
	pub credentials: Option<Value>,
	/// Directory relative key-file paths resolve against (process working directory if unset).
	pub base_dir: Option<PathBuf>,
	/// Overrides the record's `project_id` when set.
	pub project_id: Option<String>,
	/// Retry policy handed to the dispatcher.
	pub retry: RetryPolicy,
}
impl AuthOptions {
	/// Loads the key record from `path`. Takes precedence over inline credentials.
	pub fn with_key_file(mut self, path: impl Into<PathBuf>) -> Self {
		self.key_file = Some(path.into());

		self
	}

	/// Uses an inline key record.
	pub fn with_credentials(mut self, credentials: Value) -> Self {
		self.credentials = Some(credentials);

		self
	}

	/// Sets the directory relative key-file paths resolve against.
	pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.base_dir = Some(dir.into());

		self
	}

	/// Overrides the record's project identifier.
	pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
		self.project_id = Some(project_id.into());

		self
	}

	/// Overrides the retry policy (defaults to [`RetryPolicy::default`]).
	pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
		self.retry = policy;

		self
	}

	/// Resolved key-file path, if one is configured.
	pub fn key_file_path(&self) -> Option<PathBuf> {
		let key_file = self.key_file.as_ref()?;

		Some(match &self.base_dir {
			Some(base) => base.join(key_file),
			None => key_file.clone(),
		})
	}
}

/// Loads the configured credential once and memoizes the dispatcher built from it.
pub struct CredentialStore<T>
where
	T: ?Sized + HttpTransport,
{
	options: AuthOptions,
	transport: Arc<T>,
	signer_factory: SignerFactory,
	cached: OnceCell<Arc<Dispatcher<T>>>,
}
impl<T> CredentialStore<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a store that builds dispatchers over the caller-provided transport.
	pub fn with_transport(options: AuthOptions, transport: impl Into<Arc<T>>) -> Self {
		Self {
			options,
			transport: transport.into(),
			signer_factory: sign::default_signer_factory(),
			cached: OnceCell::new(),
		}
	}

	/// Replaces the signer factory (defaults to software RSA/SHA-256 with hex output).
	pub fn with_signer_factory(mut self, factory: SignerFactory) -> Self {
		self.signer_factory = factory;

		self
	}

	/// Options this store was configured with.
	pub fn options(&self) -> &AuthOptions {
		&self.options
	}

	/// Loads the credential from the key file, or the inline record when no file is set.
	pub async fn load_credential(&self) -> Result<Credential> {
		let credential = match (self.options.key_file_path(), &self.options.credentials) {
			(Some(path), _) => Credential::from_file(path).await?,
			(None, Some(inline)) => Credential::from_value(inline.clone())?,
			(None, None) => return Err(ConfigError::MissingCredentials.into()),
		};

		Ok(match &self.options.project_id {
			Some(project_id) => credential.with_project_id(project_id.clone()),
			None => credential,
		})
	}

	/// Returns the cached dispatcher, building it on first use.
	///
	/// Concurrent first calls wait for a single build; a failed build is not cached.
	pub async fn dispatcher(&self) -> Result<Arc<Dispatcher<T>>> {
		self.cached
			.get_or_try_init(|| async {
				let credential = self.load_credential().await?;
				let signer = (self.signer_factory)(&credential)?;
				let dispatcher =
					Dispatcher::<T>::with_transport(credential, self.transport.clone(), signer)?
						.with_retry_policy(self.options.retry);

				Ok::<_, Error>(Arc::new(dispatcher))
			})
			.await
			.cloned()
	}

	/// Returns the dispatcher if it has already been built.
	pub fn cached(&self) -> Option<Arc<Dispatcher<T>>> {
		self.cached.get().cloned()
	}
}
#[cfg(feature = "reqwest")]
impl CredentialStore<ReqwestTransport> {
	/// Creates a store backed by the default reqwest transport.
	pub fn new(options: AuthOptions) -> Self {
		Self::with_transport(options, ReqwestTransport::default())
	}
}
impl<T> Debug for CredentialStore<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialStore")
			.field("key_file", &self.options.key_file_path())
			.field("inline_credentials", &self.options.credentials.is_some())
			.field("cached", &self.cached.get().is_some())
			.finish()
	}
}
