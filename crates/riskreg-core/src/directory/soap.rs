//! Client for the EGAT SOAP authentication service.
//!
//! The service exposes a single RPC operation (by default `validate_user`)
//! taking `username` and `password` and answering with a boolean `return`
//! element. Each call is one HTTP POST bounded by the configured timeout.

use std::time::Duration;

use async_trait::async_trait;

use super::{CredentialVerifier, VerifierError};
use crate::config::SoapConfig;

pub struct SoapVerifier {
    client: reqwest::Client,
    endpoint: String,
    namespace: String,
    operation: String,
    timeout: Duration,
}

impl SoapVerifier {
    pub fn new(config: &SoapConfig) -> Result<Self, VerifierError> {
        if config.endpoint.is_empty() {
            return Err(VerifierError::Config("SOAP endpoint is empty".to_string()));
        }
        if !is_xml_name(&config.operation) {
            return Err(VerifierError::Config(format!(
                "SOAP operation {:?} is not a valid element name",
                config.operation
            )));
        }
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VerifierError::Config(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            namespace: config.namespace.clone(),
            operation: config.operation.clone(),
            timeout,
        })
    }

    fn envelope(&self, identity: &str, secret: &str) -> String {
        format!(
            concat!(
                r#"<?xml version="1.0" encoding="utf-8"?>"#,
                r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">"#,
                "<soap:Body>",
                r#"<{op} xmlns="{ns}">"#,
                "<username>{user}</username>",
                "<password>{pass}</password>",
                "</{op}>",
                "</soap:Body>",
                "</soap:Envelope>"
            ),
            op = self.operation,
            ns = xml_escape(&self.namespace),
            user = xml_escape(identity),
            pass = xml_escape(secret),
        )
    }
}

#[async_trait]
impl CredentialVerifier for SoapVerifier {
    async fn verify(&self, identity: &str, secret: &str) -> Result<bool, VerifierError> {
        let soap_action = format!("{}#{}", self.namespace, self.operation);
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", soap_action)
            .body(self.envelope(identity, secret))
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_transport(e))?;

        // SOAP 1.1 reports faults with HTTP 500, so look for one before the status.
        if let Some(fault) = fault_string(&body) {
            tracing::warn!("SOAP directory fault: {fault}");
            return Err(VerifierError::Fault(fault.to_string()));
        }
        if !status.is_success() {
            return Err(VerifierError::Status(status.as_u16()));
        }

        let value = element_text(&body, "return")
            .ok_or_else(|| VerifierError::Malformed("missing return element".to_string()))?;
        parse_bool(value)
    }

    fn name(&self) -> &'static str {
        "soap"
    }
}

impl SoapVerifier {
    fn map_transport(&self, e: reqwest::Error) -> VerifierError {
        if e.is_timeout() {
            VerifierError::Timeout(self.timeout.as_secs())
        } else {
            VerifierError::Transport(e.to_string())
        }
    }
}

fn parse_bool(value: &str) -> Result<bool, VerifierError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        other => Err(VerifierError::Malformed(format!(
            "unexpected return value {other:?}"
        ))),
    }
}

fn fault_string(xml: &str) -> Option<&str> {
    element_text(xml, "Fault")?;
    Some(element_text(xml, "faultstring").unwrap_or("unknown fault"))
}

/// Text content of the first element whose local name is `local`, namespace prefix ignored.
fn element_text<'a>(xml: &'a str, local: &str) -> Option<&'a str> {
    let mut from = 0;
    while let Some(pos) = xml[from..].find(local) {
        let start = from + pos;
        let name_end = start + local.len();
        from = name_end;

        let Some(tag_open) = xml[..start].rfind('<') else {
            continue;
        };
        let prefix = &xml[tag_open + 1..start];
        let prefixed_ok = prefix.is_empty()
            || (prefix.ends_with(':')
                && prefix[..prefix.len() - 1]
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.'));
        let bounded = xml[name_end..]
            .chars()
            .next()
            .is_some_and(|c| c == '>' || c == '/' || c.is_whitespace());
        if !prefixed_ok || !bounded {
            continue;
        }

        let gt = name_end + xml[name_end..].find('>')?;
        if xml[..gt].ends_with('/') {
            return Some("");
        }
        let content_start = gt + 1;
        let content_end = content_start + xml[content_start..].find("</")?;
        return Some(xml[content_start..content_end].trim());
    }
    None
}

/// Plain element name: letter or underscore, then letters, digits, `_`, `-` or `.`.
fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
