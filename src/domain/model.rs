use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// 帶命名空間的名稱，以 Clark 表示法 `{namespace}local` 顯示
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QName {
    pub namespace: String,
    pub local: String,
}

impl QName {
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local: local.into(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.local)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local)
        }
    }
}

impl FromStr for QName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix('{') {
            Some(rest) => {
                let (namespace, local) = rest
                    .split_once('}')
                    .ok_or_else(|| format!("Unterminated namespace in '{}'", s))?;
                if local.is_empty() {
                    return Err(format!("Missing local part in '{}'", s));
                }
                Ok(QName::new(namespace, local))
            }
            None if s.is_empty() => Err("Empty qualified name".to_string()),
            None => Ok(QName::new("", s)),
        }
    }
}

/// A partner service simulated by the test framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partner {
    pub name: String,
    pub simulated_url: Option<String>,
}

impl Partner {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            simulated_url: None,
        }
    }

    pub fn with_simulated_url(mut self, url: impl Into<String>) -> Self {
        self.simulated_url = Some(url.into());
        self
    }
}

/// 受測流程：名稱、相對路徑的基準目錄與宣告的夥伴
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessUnderTest {
    name: String,
    base_dir: PathBuf,
    partners: Vec<Partner>,
}

impl ProcessUnderTest {
    pub fn new(name: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            base_dir: base_dir.into(),
            partners: Vec::new(),
        }
    }

    pub fn with_partner(mut self, partner: Partner) -> Self {
        self.partners.push(partner);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn partners(&self) -> &[Partner] {
        &self.partners
    }

    pub fn partner(&self, name: &str) -> Option<&Partner> {
        self.partners.iter().find(|p| p.name == name)
    }

    /// The only mutation allowed after loading: assigning a simulated endpoint.
    pub fn assign_simulated_url(&mut self, partner: &str, url: impl Into<String>) -> bool {
        match self.partners.iter_mut().find(|p| p.name == partner) {
            Some(p) => {
                p.simulated_url = Some(url.into());
                true
            }
            None => false,
        }
    }
}

/// Concrete endpoint data of the port a partner link was resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedEndpoint {
    pub binding: QName,
    pub address: Option<String>,
    pub style: Option<String>,
}

impl ResolvedEndpoint {
    pub fn is_document_style(&self) -> bool {
        self.style.as_deref() == Some("document")
    }
}

/// 夥伴連結：對應到具體的 (service, port)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerLink {
    pub name: String,
    pub service: QName,
    pub port: Option<String>,
    pub endpoint: Option<ResolvedEndpoint>,
    pub partner_link_type: Option<QName>,
    pub my_role: Option<String>,
    pub partner_role: Option<String>,
}

impl PartnerLink {
    pub fn new(name: impl Into<String>, service: QName, port: Option<String>) -> Self {
        Self {
            name: name.into(),
            service,
            port,
            endpoint: None,
            partner_link_type: None,
            my_role: None,
            partner_role: None,
        }
    }

    pub fn is_inbound(&self) -> bool {
        self.my_role.is_some()
    }

    pub fn is_outbound(&self) -> bool {
        self.partner_role.is_some()
    }

    pub fn port_address(&self) -> Option<&str> {
        self.endpoint.as_ref().and_then(|e| e.address.as_deref())
    }
}

/// Role name -> port type, as declared by a `plnk:partnerLinkType` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerLinkType {
    pub name: QName,
    pub roles: BTreeMap<String, QName>,
}

impl PartnerLinkType {
    pub fn port_type_for(&self, role: &str) -> Option<&QName> {
        self.roles.get(role)
    }
}

/// HTTP status plus raw body of one engine call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCallResult {
    pub status: u16,
    pub body: String,
}

impl RemoteCallResult {
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// What the deployer remembers about a successful deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub process_name: String,
    pub archive_name: String,
    pub remote_path: PathBuf,
    pub deployed_at: chrono::DateTime<chrono::Utc>,
}
