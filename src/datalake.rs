//! Signed-URL batch minting and streaming object upload against the tenant's data lake.
//!
//! [`DataLake`] borrows a [`Core`] by Rust lifetime rather than holding an `Arc`/`Weak` pair,
//! since every call here runs to completion before returning — there is no background task
//! that could outlive the borrow.

// self
use crate::{
	_prelude::*,
	config::ConfigError,
	core::Core,
	crypto::{CryptoProvider, DefaultCryptoProvider},
	error::{HttpSuccess, map_http_status},
	http::{HttpMethod, HttpRequest, HttpTransport, RequestBody, UploadSource},
	json::JsonValue,
	obs::{FlowKind, FlowOutcome, FlowSpan, record_flow_outcome},
};

const GENERATE_UPLOAD_URLS_PATH: &str = "/api/datalake/v3/generateUploadObjectUrls";
const AZURE_BLOB_HOST_SUFFIX: &str = "blob.core.windows.net";
const AZURE_BLOB_TYPE_HEADER: &str = "x-ms-blob-type";
const AZURE_BLOCK_BLOB: &str = "BlockBlob";

/// Validated configuration for a [`DataLake`] handle: the upload-URL-generation endpoint and
/// an optional subtenant scope.
#[derive(Clone)]
pub struct DataLakeConfiguration {
	upload_url_generation_url: Url,
	subtenant_id: Option<String>,
}
impl DataLakeConfiguration {
	/// Starts building a configuration for `host` (scheme + authority, no path).
	pub fn builder(host: impl AsRef<str>) -> DataLakeConfigurationBuilder {
		DataLakeConfigurationBuilder { host: host.as_ref().to_owned(), subtenant_id: None }
	}

	/// Returns the cached `POST /api/datalake/v3/generateUploadObjectUrls` endpoint URL.
	pub fn upload_url_generation_url(&self) -> &Url {
		&self.upload_url_generation_url
	}

	/// Returns the configured subtenant scope, if any.
	pub fn subtenant_id(&self) -> Option<&str> {
		self.subtenant_id.as_deref()
	}
}

/// Builder for [`DataLakeConfiguration`].
pub struct DataLakeConfigurationBuilder {
	host: String,
	subtenant_id: Option<String>,
}
impl DataLakeConfigurationBuilder {
	/// Namespaces every upload under `subtenant_id`.
	pub fn subtenant_id(mut self, subtenant_id: impl Into<String>) -> Self {
		self.subtenant_id = Some(subtenant_id.into());

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<DataLakeConfiguration, ConfigError> {
		let host = Url::parse(&self.host)
			.map_err(|e| ConfigError::InvalidHost { reason: e.to_string() })?;
		let upload_url_generation_url = host
			.join(GENERATE_UPLOAD_URLS_PATH)
			.map_err(|e| ConfigError::InvalidHost { reason: e.to_string() })?;

		Ok(DataLakeConfiguration { upload_url_generation_url, subtenant_id: self.subtenant_id })
	}
}

/// A single blob destined for the tenant's data lake.
///
/// Lifecycle: created empty, `path` set by the caller, `signed_url` populated by
/// [`DataLake::generate_upload_url`]/[`DataLake::generate_upload_urls`], then consumed by
/// [`DataLake::upload`]. The declared upload size is the attached [`UploadSource::size`] — this
/// crate folds the source's own size bookkeeping into one field rather than tracking it twice.
pub struct DataLakeObject {
	path: Option<String>,
	signed_url: Option<String>,
	upload_source: Option<Box<dyn UploadSource>>,
}
impl DataLakeObject {
	/// Creates an object with no path, signed URL, or upload source set.
	pub fn new() -> Self {
		Self { path: None, signed_url: None, upload_source: None }
	}

	/// Sets the client-relative object key.
	pub fn with_path(mut self, path: impl Into<String>) -> Self {
		self.path = Some(path.into());

		self
	}

	/// Attaches the declared-size body producer consumed by [`DataLake::upload`].
	pub fn with_upload_source(mut self, source: Box<dyn UploadSource>) -> Self {
		self.upload_source = Some(source);

		self
	}

	/// Returns the client-relative object key, if set.
	pub fn path(&self) -> Option<&str> {
		self.path.as_deref()
	}

	/// Returns the signed upload URL, if one has been minted.
	pub fn signed_url(&self) -> Option<&str> {
		self.signed_url.as_deref()
	}

	/// Returns the declared upload size of the attached source, if any.
	pub fn size(&self) -> Option<u64> {
		self.upload_source.as_ref().map(|source| source.size())
	}

	fn clear_signed_url(&mut self) {
		self.signed_url = None;
	}
}
impl Default for DataLakeObject {
	fn default() -> Self {
		Self::new()
	}
}
impl Debug for DataLakeObject {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DataLakeObject")
			.field("path", &self.path)
			.field("signed_url_set", &self.signed_url.is_some())
			.field("size", &self.size())
			.finish()
	}
}

/// Handle for signed-URL minting and streaming upload, borrowing a [`Core`]'s transport,
/// identity, and access token for the lifetime of each call.
pub struct DataLake<'a, T, C = DefaultCryptoProvider>
where
	T: HttpTransport,
	C: CryptoProvider,
{
	core: &'a Core<T, C>,
	configuration: DataLakeConfiguration,
}
impl<'a, T, C> DataLake<'a, T, C>
where
	T: HttpTransport,
	C: CryptoProvider,
{
	/// Builds a handle borrowing `core` for the given data-lake configuration.
	pub fn new(core: &'a Core<T, C>, configuration: DataLakeConfiguration) -> Self {
		Self { core, configuration }
	}

	/// Mints a signed upload URL for a single object.
	pub fn generate_upload_url(&self, object: &mut DataLakeObject) -> Result<()> {
		self.generate_upload_urls(std::slice::from_mut(object))
	}

	/// Mints signed upload URLs for every object in `objects` that has a `path` set.
	///
	/// Every object's cached `signed_url` is cleared first. Objects with no `path` are silently
	/// skipped; if none remain, fails with [`Error::InvalidParameter`] without issuing a request.
	/// If any path-bearing object is left without a `signed_url` after matching the response,
	/// fails with [`Error::SignedUrlGenerationFail`] — matched URLs on other objects are kept.
	pub fn generate_upload_urls(&self, objects: &mut [DataLakeObject]) -> Result<()> {
		for object in objects.iter_mut() {
			object.clear_signed_url();
		}

		let identity = self.core.identity().filter(|i| i.is_onboarded()).ok_or(Error::NotOnboarded)?;
		let client_id =
			identity.client_id().expect("is_onboarded guarantees client_id is set.").as_ref().to_owned();
		let access_token = self.core.access_token().ok_or(Error::NoAccessTokenExists)?;
		let mut paths = JsonValue::array();
		let mut valid_count = 0_usize;

		for object in objects.iter() {
			if let Some(path) = object.path() {
				let mut entry = JsonValue::object();

				entry.add_string("path", format!("{client_id}/{path}"))?;
				paths.add_item_to_array(entry)?;

				valid_count += 1;
			}
		}

		if valid_count == 0 {
			return Err(Error::invalid_parameter("no data-lake object has a path set"));
		}

		let mut root = JsonValue::object();

		root.add_object("paths", paths)?;

		if let Some(subtenant_id) = self.configuration.subtenant_id() {
			root.add_string("subtenantId", subtenant_id)?;
		}

		let correlation_id = self.core.security().generate_correlation_id();
		let span = FlowSpan::new(FlowKind::GenerateSignedUrls, "start", &correlation_id).entered();

		record_flow_outcome(FlowKind::GenerateSignedUrls, FlowOutcome::Attempt);

		let mut request =
			HttpRequest::new(HttpMethod::Post, self.configuration.upload_url_generation_url().clone());

		request.headers.insert("Content-Type", "application/json");
		request.headers.insert("Authorization", format!("Bearer {}", access_token.expose()));
		request.headers.insert("Correlation-ID", correlation_id.clone());
		request.body = RequestBody::Bytes(root.to_json_string().into_bytes());

		let result = self.core.transport().send(request).map_err(Error::from).and_then(|response| {
			if map_http_status(response.status)? != HttpSuccess::Created {
				return Err(Error::invalid_parameter(
					"generate-upload-urls did not return 201 Created",
				));
			}

			let payload = JsonValue::parse(
				std::str::from_utf8(&response.body)
					.map_err(|_| Error::invalid_parameter("signed-url response was not UTF-8"))?,
			)?;

			match_signed_urls(&payload, objects, &client_id)
		});

		drop(span);

		match result {
			Ok(()) => {
				record_flow_outcome(FlowKind::GenerateSignedUrls, FlowOutcome::Success);

				Ok(())
			},
			Err(e) => {
				record_flow_outcome(FlowKind::GenerateSignedUrls, FlowOutcome::Failure);

				Err(e)
			},
		}
	}

	/// Streams `object`'s attached upload source to its signed URL via `PUT`.
	///
	/// Requires `path`, `signed_url`, and an upload source to all be set; consumes the upload
	/// source on success or failure alike, since a partially-read stream cannot be replayed.
	pub fn upload(&self, object: &mut DataLakeObject) -> Result<()> {
		if object.path.is_none() {
			return Err(Error::invalid_parameter("object has no path set"));
		}

		let signed_url = object.signed_url.clone().ok_or_else(|| {
			Error::invalid_parameter("object has no signed_url; call generate_upload_url(s) first")
		})?;
		let source = object
			.upload_source
			.take()
			.ok_or_else(|| Error::invalid_parameter("object has no upload source set"))?;

		if source.size() == 0 {
			return Err(Error::invalid_parameter("object's upload source declares a size of zero"));
		}

		let url = Url::parse(&signed_url)
			.map_err(|e| Error::invalid_parameter(format!("invalid signed_url: {e}")))?;
		let is_azure = is_azure_blob_storage(&url);
		let correlation_id = self.core.security().generate_correlation_id();
		let span = FlowSpan::new(FlowKind::Upload, "start", &correlation_id).entered();

		record_flow_outcome(FlowKind::Upload, FlowOutcome::Attempt);

		let mut request = HttpRequest::new(HttpMethod::Put, url).with_streaming_body(source);

		request.headers.insert("Correlation-ID", correlation_id);

		if is_azure {
			request.headers.insert(AZURE_BLOB_TYPE_HEADER, AZURE_BLOCK_BLOB);
		}

		let result = self.core.transport().send(request).map_err(Error::from).and_then(|response| {
			match map_http_status(response.status)? {
				HttpSuccess::Ok | HttpSuccess::Created => Ok(()),
				_ => Err(Error::invalid_parameter("upload did not return 200 OK or 201 Created")),
			}
		});

		drop(span);

		match result {
			Ok(()) => {
				record_flow_outcome(FlowKind::Upload, FlowOutcome::Success);

				Ok(())
			},
			Err(e) => {
				record_flow_outcome(FlowKind::Upload, FlowOutcome::Failure);

				Err(e)
			},
		}
	}
}
impl<T, C> Debug for DataLake<'_, T, C>
where
	T: HttpTransport,
	C: CryptoProvider,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DataLake")
			.field("upload_url_generation_url", &self.configuration.upload_url_generation_url.as_str())
			.field("subtenant_id", &self.configuration.subtenant_id)
			.finish()
	}
}

fn match_signed_urls(
	payload: &JsonValue,
	objects: &mut [DataLakeObject],
	client_id: &str,
) -> Result<()> {
	let object_urls = payload
		.get_object_item("objectUrls")
		.ok_or_else(|| Error::invalid_parameter("response missing `objectUrls`"))?;
	let count = object_urls.get_array_size()?;
	let prefix = format!("{client_id}/");

	for index in 0..count {
		let item = object_urls.get_array_item(index as i64)?;
		let path_node = item
			.get_object_item("path")
			.ok_or_else(|| Error::invalid_parameter("objectUrls item missing `path`"))?;
		let path = path_node.get_string()?;
		let Some(remainder) = path.strip_prefix(&prefix) else { continue };
		let signed_url_node = item
			.get_object_item("signedUrl")
			.ok_or_else(|| Error::invalid_parameter("objectUrls item missing `signedUrl`"))?;
		let signed_url = signed_url_node.get_string()?.to_owned();

		if let Some(object) =
			objects.iter_mut().find(|o| o.signed_url.is_none() && o.path.as_deref() == Some(remainder))
		{
			object.signed_url = Some(signed_url);
		}
	}

	if objects.iter().any(|o| o.path.is_some() && o.signed_url.is_none()) {
		return Err(Error::SignedUrlGenerationFail);
	}

	Ok(())
}

fn is_azure_blob_storage(url: &Url) -> bool {
	let Some(host) = url.host_str() else { return false };

	match host.split_once('.') {
		Some((_, rest)) => rest == AZURE_BLOB_HOST_SUFFIX,
		None => false,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		auth::{credential::SecurityProfile, id::TenantId, identity::AgentIdentity},
		config::CoreConfiguration,
		crypto::DefaultCryptoProvider,
		http::{HeaderList, HttpResponse},
		security::SecurityHandler,
	};

	struct ScriptedTransport {
		status: u16,
		body: Vec<u8>,
	}
	impl HttpTransport for ScriptedTransport {
		fn send(&self, _request: HttpRequest) -> Result<HttpResponse, crate::error::TransportError> {
			Ok(HttpResponse { status: self.status, headers: HeaderList::new(), body: self.body.clone() })
		}
	}

	struct FixedSource(Vec<u8>);
	impl UploadSource for FixedSource {
		fn size(&self) -> u64 {
			self.0.len() as u64
		}

		fn next_chunk(&mut self, max_len: usize) -> Result<Vec<u8>> {
			let take = max_len.min(self.0.len());

			Ok(self.0.drain(..take).collect())
		}
	}

	fn onboarded_core(transport: ScriptedTransport) -> Core<ScriptedTransport> {
		let security = SecurityHandler::<DefaultCryptoProvider>::default();

		security.set_identity(AgentIdentity::unregistered(
			TenantId::new("tenant-1").unwrap(),
			SecurityProfile::SharedSecret,
		));
		security.set_client_id(crate::auth::id::ClientId::new("agent-1").unwrap()).unwrap();
		security.record_token(crate::auth::secret::Secret::new("at-1"), None);

		let configuration = CoreConfiguration::builder("https://host.example.com", TenantId::new("tenant-1").unwrap())
			.user_agent("agent/1.0")
			.build()
			.unwrap();

		Core::with_transport(configuration, transport, security)
	}

	#[test]
	fn is_azure_blob_storage_matches_first_label_suffix() {
		let azure = Url::parse("https://myaccount.blob.core.windows.net/container/blob").unwrap();
		let other = Url::parse("https://example.s3.amazonaws.com/bucket/key").unwrap();

		assert!(is_azure_blob_storage(&azure));
		assert!(!is_azure_blob_storage(&other));
	}

	#[test]
	fn generate_upload_urls_rejects_when_no_path_is_set() {
		let core = onboarded_core(ScriptedTransport { status: 201, body: Vec::new() });
		let data_lake =
			DataLake::new(&core, DataLakeConfiguration::builder("https://host.example.com").build().unwrap());
		let mut objects = [DataLakeObject::new()];

		assert!(matches!(
			data_lake.generate_upload_urls(&mut objects),
			Err(Error::InvalidParameter { .. })
		));
	}

	#[test]
	fn generate_upload_urls_matches_by_client_id_stripped_path() {
		let body = br#"{"objectUrls":[{"path":"agent-1/data/1.csv","signedUrl":"https://store.example.com/1.csv?sig=a"}]}"#;
		let core = onboarded_core(ScriptedTransport { status: 201, body: body.to_vec() });
		let data_lake =
			DataLake::new(&core, DataLakeConfiguration::builder("https://host.example.com").build().unwrap());
		let mut objects = [DataLakeObject::new().with_path("data/1.csv")];

		data_lake.generate_upload_urls(&mut objects).expect("Matching response should succeed.");

		assert_eq!(objects[0].signed_url(), Some("https://store.example.com/1.csv?sig=a"));
	}

	#[test]
	fn generate_upload_urls_fails_when_an_object_is_left_unmatched() {
		let body = br#"{"objectUrls":[{"path":"agent-1/data/1.csv","signedUrl":"https://store.example.com/1.csv"}]}"#;
		let core = onboarded_core(ScriptedTransport { status: 201, body: body.to_vec() });
		let data_lake =
			DataLake::new(&core, DataLakeConfiguration::builder("https://host.example.com").build().unwrap());
		let mut objects =
			[DataLakeObject::new().with_path("data/1.csv"), DataLakeObject::new().with_path("data/2.csv")];

		assert!(matches!(
			data_lake.generate_upload_urls(&mut objects),
			Err(Error::SignedUrlGenerationFail)
		));
		assert!(objects[0].signed_url().is_some());
		assert!(objects[1].signed_url().is_none());
	}

	#[test]
	fn upload_requires_signed_url_and_source() {
		let core = onboarded_core(ScriptedTransport { status: 200, body: Vec::new() });
		let data_lake =
			DataLake::new(&core, DataLakeConfiguration::builder("https://host.example.com").build().unwrap());
		let mut object = DataLakeObject::new().with_path("data/1.csv");

		assert!(matches!(data_lake.upload(&mut object), Err(Error::InvalidParameter { .. })));
	}

	#[test]
	fn upload_rejects_a_zero_size_source() {
		let core = onboarded_core(ScriptedTransport { status: 200, body: Vec::new() });
		let data_lake =
			DataLake::new(&core, DataLakeConfiguration::builder("https://host.example.com").build().unwrap());
		let mut object =
			DataLakeObject::new().with_path("data/1.csv").with_upload_source(Box::new(FixedSource(Vec::new())));

		object.signed_url = Some("https://store.example.com/1.csv?sig=a".to_owned());

		assert!(matches!(data_lake.upload(&mut object), Err(Error::InvalidParameter { .. })));
	}

	#[test]
	fn upload_adds_azure_header_and_succeeds_on_201() {
		let core = onboarded_core(ScriptedTransport { status: 201, body: Vec::new() });
		let data_lake =
			DataLake::new(&core, DataLakeConfiguration::builder("https://host.example.com").build().unwrap());
		let mut object = DataLakeObject::new().with_path("data/1.csv").with_upload_source(Box::new(FixedSource(
			b"payload".to_vec(),
		)));

		object.signed_url =
			Some("https://myaccount.blob.core.windows.net/container/1.csv?sig=a".to_owned());

		data_lake.upload(&mut object).expect("Upload should succeed on 201 Created.");
	}
}
