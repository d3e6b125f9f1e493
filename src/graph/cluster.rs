//! AKS cluster resource graph
//!
//! Declares the resource group, service principal credentials, SSH key and
//! managed cluster for a single AKS deployment. Every resource is named
//! `<cluster-name>-aksctl-<kind>`.

use super::{GraphError, PropertyValue, ResourceDeclaration, ResourceGraph};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Location used for the managed cluster unless one is given explicitly
///
/// Independent of the resource group region.
pub const DEFAULT_CLUSTER_LOCATION: &str = "WestUS";
pub const DEFAULT_REGION: &str = "westus";
pub const DEFAULT_KUBERNETES_VERSION: &str = "1.19.0";

const RESOURCE_GROUP_TYPE: &str = "azure-nextgen:resources/latest:ResourceGroup";
const RANDOM_PASSWORD_TYPE: &str = "random:index/randomPassword:RandomPassword";
const APPLICATION_TYPE: &str = "azuread:index/application:Application";
const SERVICE_PRINCIPAL_TYPE: &str = "azuread:index/servicePrincipal:ServicePrincipal";
const SERVICE_PRINCIPAL_PASSWORD_TYPE: &str =
    "azuread:index/servicePrincipalPassword:ServicePrincipalPassword";
const PRIVATE_KEY_TYPE: &str = "tls:index/privateKey:PrivateKey";
const MANAGED_CLUSTER_TYPE: &str = "azure-nextgen:containerservice/latest:ManagedCluster";

const PASSWORD_LENGTH: i64 = 20;
const SSH_KEY_ALGORITHM: &str = "RSA";
const SSH_KEY_BITS: i64 = 4096;

const AGENT_POOL_MODE: &str = "System";
const AGENT_POOL_DISK_GB: i64 = 30;
const AGENT_POOL_COUNT: i64 = 3;
const AGENT_POOL_VM_SIZE: &str = "Standard_DS2_v2";
const AGENT_POOL_OS: &str = "Linux";

/// Kinds of resource in the cluster graph, one per naming suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    ResourceGroup,
    Password,
    Application,
    ServicePrincipal,
    SshKey,
    Cluster,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::ResourceGroup,
        ResourceKind::Password,
        ResourceKind::Application,
        ResourceKind::ServicePrincipal,
        ResourceKind::SshKey,
        ResourceKind::Cluster,
    ];

    pub fn suffix(&self) -> &'static str {
        match self {
            ResourceKind::ResourceGroup => "resourceGroup",
            ResourceKind::Password => "password",
            ResourceKind::Application => "application",
            ResourceKind::ServicePrincipal => "servicePrincipal",
            ResourceKind::SshKey => "sshKey",
            ResourceKind::Cluster => "cluster",
        }
    }
}

/// Inputs for the cluster graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSpec {
    pub name: String,
    /// Region of the resource group
    pub region: String,
    pub stack: String,
    pub kubernetes_version: String,
    /// Location of the managed cluster itself
    pub cluster_location: String,
}

impl ClusterSpec {
    pub fn new(name: impl Into<String>, stack: impl Into<String>) -> Self {
        ClusterSpec {
            name: name.into(),
            region: DEFAULT_REGION.to_string(),
            stack: stack.into(),
            kubernetes_version: DEFAULT_KUBERNETES_VERSION.to_string(),
            cluster_location: DEFAULT_CLUSTER_LOCATION.to_string(),
        }
    }

    /// `<name>-aksctl-<kind>`
    pub fn resource_name(&self, kind: ResourceKind) -> String {
        format!("{}-aksctl-{}", self.name, kind.suffix())
    }

    /// `<name>-<stack>-kube`
    pub fn dns_prefix(&self) -> String {
        format!("{}-{}-kube", self.name, self.stack)
    }

    fn validate(&self) -> Result<(), GraphError> {
        let fields = [
            ("name", &self.name),
            ("region", &self.region),
            ("stack", &self.stack),
            ("kubernetesVersion", &self.kubernetes_version),
            ("clusterLocation", &self.cluster_location),
        ];
        match fields.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(GraphError::InvalidProperty {
                resource: "cluster".to_string(),
                property: field.to_string(),
                reason: "must not be empty".to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Expiry stamped on the service principal password
pub fn credential_end_date() -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(2099, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Build the resource graph for one AKS cluster
///
/// Pure: nothing is created until the engine executes the returned graph.
pub fn build_cluster_graph(spec: &ClusterSpec) -> Result<ResourceGraph, GraphError> {
    spec.validate()?;

    let mut graph = ResourceGraph::new();

    let resource_group = graph.register(
        ResourceDeclaration::new(
            "resourceGroup",
            RESOURCE_GROUP_TYPE,
            spec.resource_name(ResourceKind::ResourceGroup),
        )
        .property("resourceGroupName", spec.name.as_str())
        .property("location", spec.region.as_str()),
    )?;

    let password = graph.register(
        ResourceDeclaration::new(
            "password",
            RANDOM_PASSWORD_TYPE,
            spec.resource_name(ResourceKind::Password),
        )
        .property("length", PASSWORD_LENGTH)
        .property("special", true),
    )?;

    let application = graph.register(
        ResourceDeclaration::new(
            "application",
            APPLICATION_TYPE,
            spec.resource_name(ResourceKind::Application),
        )
        .property("name", spec.name.as_str()),
    )?;

    let service_principal = graph.register(
        ResourceDeclaration::new(
            "servicePrincipal",
            SERVICE_PRINCIPAL_TYPE,
            spec.resource_name(ResourceKind::ServicePrincipal),
        )
        .property(
            "applicationId",
            PropertyValue::reference(&application, "applicationId"),
        ),
    )?;

    let end_date = credential_end_date()
        .ok_or_else(|| GraphError::InvalidProperty {
            resource: "servicePrincipalPassword".to_string(),
            property: "endDate".to_string(),
            reason: "expiry date out of range".to_string(),
        })?
        .to_rfc3339_opts(SecondsFormat::Secs, true);

    // Shares its name with the principal; the type keeps them distinct
    let sp_password = graph.register(
        ResourceDeclaration::new(
            "servicePrincipalPassword",
            SERVICE_PRINCIPAL_PASSWORD_TYPE,
            spec.resource_name(ResourceKind::ServicePrincipal),
        )
        .property(
            "servicePrincipalId",
            PropertyValue::reference(&service_principal, "id"),
        )
        .property("value", PropertyValue::reference(&password, "result"))
        .property("endDate", end_date),
    )?;

    let ssh_key = graph.register(
        ResourceDeclaration::new(
            "sshKey",
            PRIVATE_KEY_TYPE,
            spec.resource_name(ResourceKind::SshKey),
        )
        .property("algorithm", SSH_KEY_ALGORITHM)
        .property("rsaBits", SSH_KEY_BITS),
    )?;

    let agent_pool = PropertyValue::object([
        ("name", PropertyValue::string(&spec.name)),
        ("mode", AGENT_POOL_MODE.into()),
        ("osDiskSizeGB", AGENT_POOL_DISK_GB.into()),
        ("count", AGENT_POOL_COUNT.into()),
        ("vmSize", AGENT_POOL_VM_SIZE.into()),
        ("osType", AGENT_POOL_OS.into()),
    ]);

    let linux_profile = PropertyValue::object([
        ("adminUsername", PropertyValue::string(&spec.name)),
        (
            "ssh",
            PropertyValue::object([(
                "publicKeys",
                PropertyValue::List(vec![PropertyValue::object([(
                    "keyData",
                    PropertyValue::reference(&ssh_key, "publicKeyOpenssh"),
                )])]),
            )]),
        ),
    ]);

    let service_principal_profile = PropertyValue::object([
        (
            "clientId",
            PropertyValue::reference(&application, "applicationId"),
        ),
        ("secret", PropertyValue::reference(&sp_password, "value")),
    ]);

    graph.register(
        ResourceDeclaration::new(
            "cluster",
            MANAGED_CLUSTER_TYPE,
            spec.resource_name(ResourceKind::Cluster),
        )
        .property("resourceName", spec.name.as_str())
        .property("location", spec.cluster_location.as_str())
        .property("dnsPrefix", spec.dns_prefix())
        .property(
            "resourceGroupName",
            PropertyValue::reference(&resource_group, "name"),
        )
        .property("agentPoolProfiles", PropertyValue::List(vec![agent_pool]))
        .property("linuxProfile", linux_profile)
        .property("servicePrincipalProfile", service_principal_profile)
        .property("kubernetesVersion", spec.kubernetes_version.as_str()),
    )?;

    Ok(graph)
}

#[cfg(test)]
#[path = "cluster_test.rs"]
mod tests;
