//! Blocking HTTP abstraction: header list, request/response types, declared-size streaming
//! upload contract, and the `HttpTransport` trait seam with a `reqwest`-backed default impl.

// std
use std::io::Read;
// self
use crate::{_prelude::*, error::TransportError};

/// HTTP method used by an outbound request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
	/// GET.
	Get,
	/// POST.
	Post,
	/// PUT.
	Put,
	/// DELETE.
	Delete,
}
impl HttpMethod {
	fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
			Self::Put => "PUT",
			Self::Delete => "DELETE",
		}
	}
}

/// Ordered list of HTTP headers with case-insensitive lookup (ASCII fold only).
#[derive(Clone, Debug, Default)]
pub struct HeaderList(Vec<(String, String)>);
impl HeaderList {
	/// Creates an empty header list.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a header, preserving any existing header of the same name.
	pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
		self.0.push((name.into(), value.into()));

		self
	}

	/// Returns the value of the first header matching `name`, case-insensitively.
	///
	/// A leading space after `:` in the stored value, if present, is already trimmed.
	pub fn get(&self, name: &str) -> Option<&str> {
		self.0
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.trim_start_matches(' '))
	}

	/// Iterates over `(name, value)` pairs in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}
}

/// Producer for a streaming request body of known total size.
///
/// The transport calls [`UploadSource::next_chunk`] repeatedly with transport-chosen chunk
/// sizes until exactly [`UploadSource::size`] bytes have been consumed; returning fewer bytes
/// than requested from a call signals end-of-data, matching the declared-size contract so the
/// transport never falls back to `Transfer-Encoding: chunked`.
pub trait UploadSource
where
	Self: Send,
{
	/// Total number of bytes this source will ever produce.
	fn size(&self) -> u64;

	/// Produces up to `max_len` bytes. An empty return signals end-of-data.
	fn next_chunk(&mut self, max_len: usize) -> Result<Vec<u8>>;
}

/// Request body: absent, an in-memory buffer, or a declared-size streaming producer.
pub enum RequestBody {
	/// No body.
	Empty,
	/// A complete, in-memory body.
	Bytes(Vec<u8>),
	/// A streaming body of declared size.
	Streaming(Box<dyn UploadSource>),
}
impl Default for RequestBody {
	fn default() -> Self {
		Self::Empty
	}
}

/// An outbound HTTP request.
pub struct HttpRequest {
	/// HTTP method.
	pub method: HttpMethod,
	/// Target URL.
	pub url: Url,
	/// Request headers.
	pub headers: HeaderList,
	/// Request body.
	pub body: RequestBody,
}
impl HttpRequest {
	/// Creates a request with no headers and an empty body.
	pub fn new(method: HttpMethod, url: Url) -> Self {
		Self { method, url, headers: HeaderList::new(), body: RequestBody::Empty }
	}

	/// Sets an in-memory body.
	pub fn with_bytes_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = RequestBody::Bytes(body.into());

		self
	}

	/// Sets a streaming body of declared size.
	pub fn with_streaming_body(mut self, source: Box<dyn UploadSource>) -> Self {
		self.body = RequestBody::Streaming(source);

		self
	}
}

/// A received HTTP response.
#[derive(Clone, Debug)]
pub struct HttpResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers.
	pub headers: HeaderList,
	/// Response body.
	pub body: Vec<u8>,
}

/// Abstraction over the blocking HTTP transport used for every outbound call.
///
/// Exactly one network round trip per call; blocks until the declared body size is sent and a
/// response is received or the configured timeout elapses. Implementors must be `Send + Sync`
/// so a single instance can be shared by a [`Core`](crate::core::Core) across the borrowed
/// lifetime of a [`DataLake`](crate::datalake::DataLake) handle.
pub trait HttpTransport
where
	Self: Send + Sync,
{
	/// Performs one blocking request/response round trip.
	fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

struct UploadSourceReader(Box<dyn UploadSource>);
impl Read for UploadSourceReader {
	fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
		let chunk = self
			.0
			.next_chunk(buf.len())
			.map_err(|e| std::io::Error::other(e.to_string()))?;

		buf[..chunk.len()].copy_from_slice(&chunk);

		Ok(chunk.len())
	}
}

/// Default [`HttpTransport`] backed by `reqwest::blocking::Client`.
///
/// Configured once per [`Core`](crate::core::Core) from its [`CoreConfiguration`](crate::config::CoreConfiguration)
/// (proxy, certificate, timeout) and reused for every request, so connections are pooled by
/// `reqwest` exactly as a hand-rolled client would pool sockets.
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestHttpTransport(ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpTransport {
	/// Wraps an existing blocking reqwest client.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a transport from a [`CoreConfiguration`](crate::config::CoreConfiguration)'s
	/// timeout, proxy, and certificate settings.
	pub fn from_configuration(
		configuration: &crate::config::CoreConfiguration,
	) -> Result<Self, TransportError> {
		let mut builder =
			ReqwestClient::builder().timeout(configuration.http_request_timeout());

		if let Some(proxy) = configuration.proxy() {
			let proxy_url = format!(
				"{}://{}:{}",
				match proxy.proxy_type {
					crate::config::ProxyType::Http => "http",
					crate::config::ProxyType::Https => "https",
					crate::config::ProxyType::Socks4 | crate::config::ProxyType::Socks5 =>
						"socks5",
				},
				proxy.host,
				proxy.port
			);
			let mut reqwest_proxy = reqwest::Proxy::all(&proxy_url)
				.map_err(|_| TransportError::CouldNotResolveProxy)?;

			if let (Some(user), Some(password)) = (&proxy.user, &proxy.password) {
				reqwest_proxy = reqwest_proxy.basic_auth(user, password);
			}

			builder = builder.proxy(reqwest_proxy);
		}

		if let Some(cert_source) = configuration.certificate() {
			let pem = match cert_source {
				crate::config::CertificateSource::Pem(pem) => pem.clone(),
				crate::config::CertificateSource::File(path) => std::fs::read_to_string(path)
					.map_err(|_| TransportError::ImproperCertificate)?,
			};
			let cert = reqwest::Certificate::from_pem(pem.as_bytes())
				.map_err(|_| TransportError::ImproperCertificate)?;

			builder = builder.add_root_certificate(cert);
		}

		let client = builder.build().map_err(TransportError::other)?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestHttpTransport {
	fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
		let mut builder = self.0.request(
			reqwest::Method::from_bytes(request.method.as_str().as_bytes())
				.expect("HttpMethod::as_str always yields a valid method token."),
			request.url,
		);

		for (name, value) in request.headers.iter() {
			builder = builder.header(name, value);
		}

		builder = match request.body {
			RequestBody::Empty => builder,
			RequestBody::Bytes(bytes) => builder.body(bytes),
			RequestBody::Streaming(source) => {
				let size = source.size();
				let reader = UploadSourceReader(source);

				builder.body(reqwest::blocking::Body::sized(reader, size))
			},
		};

		let response = builder.send().map_err(map_reqwest_error)?;
		let status = response.status().as_u16();
		let mut headers = HeaderList::new();

		for (name, value) in response.headers() {
			if let Ok(value) = value.to_str() {
				headers.insert(name.as_str(), value);
			}
		}

		let body = response.bytes().map_err(map_reqwest_error)?.to_vec();

		Ok(HttpResponse { status, headers, body })
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(e: reqwest::Error) -> TransportError {
	if e.is_timeout() {
		TransportError::RequestTimeout
	} else if e.is_connect() {
		TransportError::CouldNotConnect
	} else {
		TransportError::other(e)
	}
}
