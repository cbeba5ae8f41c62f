//! Session configuration and connect-URL construction.

use serde::{Deserialize, Serialize};
use urlencoding::encode;

use crate::Result;

/// Well-known endpoint appended behind the filter prefix.
const ENDPOINT: &str = "/wicket/websocket";

/// Identifies the server-side target of the connection.
///
/// Exactly one of page or resource identifies the target; the variant
/// chosen decides which query parameter the connect URL carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionTarget {
    /// A page-scoped connection.
    #[serde(rename_all = "camelCase")]
    Page {
        /// Identifier of the page instance on the server.
        page_id: String,
    },
    /// A connection to a shared server-side resource.
    #[serde(rename_all = "camelCase")]
    Resource {
        /// Registered resource name.
        name: String,
        /// Optional token distinguishing connections to the same resource.
        #[serde(default)]
        connection_token: Option<String>,
    },
}

/// Connection parameters resolved once at initialization time and never
/// mutated thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Server hostname.
    pub hostname: String,
    /// Port used from insecure pages; empty means "use the page's port".
    #[serde(default)]
    pub plain_port: String,
    /// Port used from secure pages; empty means "use the page's port".
    #[serde(default)]
    pub secure_port: String,
    /// Servlet context path, with leading slash or empty.
    #[serde(default)]
    pub context_path: String,
    /// Filter prefix mounted under the context path.
    #[serde(default)]
    pub filter_prefix: String,
    /// HTTP session identifier, appended as a path parameter.
    pub session_id: String,
    /// The server-side target of this connection.
    pub target: ConnectionTarget,
    /// Optional application-defined context value.
    #[serde(default)]
    pub context: Option<String>,
    /// Base URL the server uses to resolve relative Ajax URLs.
    pub base_url: String,
    /// Application name on the server.
    pub app_name: String,
}

/// Scheme and port of the page context hosting the connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageLocation {
    /// Whether the page was served over a secure scheme.
    pub secure: bool,
    /// The page's current port; may be empty.
    #[serde(default)]
    pub port: String,
}

impl PageLocation {
    /// An insecure page at the given port.
    pub fn insecure(port: impl Into<String>) -> Self {
        Self {
            secure: false,
            port: port.into(),
        }
    }

    /// A secure page at the given port.
    pub fn secure(port: impl Into<String>) -> Self {
        Self {
            secure: true,
            port: port.into(),
        }
    }
}

impl SessionConfig {
    /// Parse a configuration from its JSON representation.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Map the page scheme to the socket scheme.
    ///
    /// Secure page context maps to the secure socket scheme; there are no
    /// other branches.
    pub fn scheme(page: &PageLocation) -> &'static str {
        if page.secure {
            "wss:"
        } else {
            "ws:"
        }
    }

    /// Build the canonical connect URL.
    ///
    /// Parameter ordering is wire-relevant: the server parses this literal
    /// query-string shape, so segments are concatenated in a fixed order.
    pub fn connect_url(&self, page: &PageLocation) -> String {
        let scheme = Self::scheme(page);

        let configured = if page.secure {
            &self.secure_port
        } else {
            &self.plain_port
        };
        let resolved = if configured.is_empty() {
            &page.port
        } else {
            configured
        };
        let port = if resolved.is_empty() {
            String::new()
        } else {
            format!(":{resolved}")
        };

        let mut url = format!(
            "{scheme}//{host}{port}{context_path}{filter_prefix}{ENDPOINT}",
            host = self.hostname,
            context_path = self.context_path,
            filter_prefix = self.filter_prefix,
        );

        url.push_str(";jsessionid=");
        url.push_str(&encode(&self.session_id));

        match &self.target {
            ConnectionTarget::Page { page_id } => {
                url.push_str("?pageId=");
                url.push_str(&encode(page_id));
            }
            ConnectionTarget::Resource {
                name,
                connection_token,
            } => {
                url.push_str("?resourceName=");
                url.push_str(&encode(name));
                if let Some(token) = connection_token {
                    url.push_str("&connectionToken=");
                    url.push_str(&encode(token));
                }
            }
        }

        if let Some(context) = &self.context {
            url.push_str("&context=");
            url.push_str(&encode(context));
        }

        url.push_str("&wicket-ajax-baseurl=");
        url.push_str(&encode(&self.base_url));
        url.push_str("&wicket-app-name=");
        url.push_str(&encode(&self.app_name));

        url
    }
}
