//! The HTTP transport shared by every service.

use crate::{config::Config, endpoints::EndpointError, DEFAULT_USER_AGENT};
use reqwest::{
    header::{HeaderMap, USER_AGENT},
    Request, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::{Debug, Write as _};
use url::Url;

/// The header LastPass reads the provisioning hash from.
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// A handle to the provisioning API for one company.
///
/// Every command is sent to the same endpoint, wrapped in an envelope
/// carrying the company ID and provisioning hash.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    endpoint: Url,
    company_id: String,
    secret: String,
    verbose: bool,
}

impl Client {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;

        Ok(Client::with_http_client(http, config))
    }

    pub fn with_http_client(http: reqwest::Client, config: &Config) -> Self {
        Client {
            http,
            endpoint: config.endpoint.clone(),
            company_id: config.company_id.clone(),
            secret: config.secret.clone(),
            verbose: false,
        }
    }

    /// Dump every request and response. These include the provisioning
    /// hash, so this should only be turned on when explicitly asked for.
    pub fn verbose(self, verbose: bool) -> Self { Client { verbose, ..self } }

    pub fn endpoint(&self) -> &Url { &self.endpoint }

    /// Send a command to LastPass, returning the raw response.
    ///
    /// A non-2xx status is an error, but the body is kept because LastPass
    /// sometimes explains what went wrong.
    pub async fn send<D>(
        &self,
        command: &str,
        payload: Option<&D>,
    ) -> Result<RawResponse, EndpointError>
    where
        D: Serialize + ?Sized,
    {
        let envelope = Envelope {
            cid: &self.company_id,
            provhash: &self.secret,
            cmd: command,
            data: payload,
        };

        log::debug!("Sending \"{}\" to {}", command, self.endpoint);
        let request = self
            .http
            .post(self.endpoint.clone())
            .header(USER_AGENT, DEFAULT_USER_AGENT)
            .header(API_KEY_HEADER, &self.secret)
            .json(&envelope)
            .build()?;

        if self.verbose {
            log::info!("{}", dump_request(&request));
        }

        let response = self.http.execute(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        // LastPass says the body is text/xml, but it's always JSON
        let body = response.text().await?;

        if self.verbose {
            log::info!("{}", dump_response(status, &headers, &body));
        }

        if !status.is_success() {
            return Err(EndpointError::BadStatus { status, body });
        }

        Ok(RawResponse { status, body })
    }

    /// Send a command and decode the response body as JSON.
    pub async fn request<D, T>(
        &self,
        command: &str,
        payload: Option<&D>,
    ) -> Result<T, EndpointError>
    where
        D: Serialize + ?Sized,
        T: DeserializeOwned + Debug,
    {
        let response = self.send(command, payload).await?;
        let decoded = response.json(command)?;
        log::trace!("Parsed \"{}\" response: {:#?}", command, decoded);

        Ok(decoded)
    }
}

impl Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint.as_str())
            .field("company_id", &self.company_id)
            .field("verbose", &self.verbose)
            .finish()
    }
}

/// What the server sent back.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

impl RawResponse {
    pub fn json<T: DeserializeOwned>(
        &self,
        command: &str,
    ) -> Result<T, EndpointError> {
        serde_json::from_str(&self.body).map_err(|inner| {
            EndpointError::Decode {
                command: command.to_string(),
                body: self.body.clone(),
                inner,
            }
        })
    }
}

#[derive(serde_derive::Serialize)]
struct Envelope<'a, D: ?Sized> {
    cid: &'a str,
    provhash: &'a str,
    cmd: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a D>,
}

fn dump_request(request: &Request) -> String {
    let mut dump = format!("{} {}\n", request.method(), request.url());
    write_headers(&mut dump, request.headers());

    if let Some(body) = request.body().and_then(|b| b.as_bytes()) {
        dump.push('\n');
        dump.push_str(&String::from_utf8_lossy(body));
    }

    dump
}

fn dump_response(
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
) -> String {
    let mut dump = format!("{}\n", status);
    write_headers(&mut dump, headers);
    dump.push('\n');
    dump.push_str(body);

    dump
}

fn write_headers(dump: &mut String, headers: &HeaderMap) {
    for (name, value) in headers {
        let _ = writeln!(
            dump,
            "{}: {}",
            name,
            String::from_utf8_lossy(value.as_bytes())
        );
    }
}
