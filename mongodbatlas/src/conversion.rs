//! Shared mapping rules between Atlas API payloads and Terraform values

use crate::api::clusters::ProviderSettings;
use crate::api::containers::Container;
use crate::api::Label;
use tfplug::Dynamic;

pub const DEFAULT_LABEL_KEY: &str = "Infrastructure Tool";
pub const DEFAULT_LABEL_VALUE: &str = "MongoDB Atlas Terraform Provider";

pub const TENANT_PROVIDER: &str = "TENANT";
pub const GCP_PROVIDER: &str = "GCP";
pub const AZURE_PROVIDER: &str = "AZURE";

/// Label the provider attaches to everything it creates
pub fn default_label() -> Label {
    Label::new(DEFAULT_LABEL_KEY, DEFAULT_LABEL_VALUE)
}

/// Empty and absent strings both become null
pub fn string_null_if_empty<S: AsRef<str>>(value: Option<S>) -> Dynamic {
    match value {
        Some(s) if !s.as_ref().is_empty() => Dynamic::String(s.as_ref().to_string()),
        _ => Dynamic::Null,
    }
}

pub fn int_or_null(value: Option<i64>) -> Dynamic {
    value.map(Dynamic::from).unwrap_or(Dynamic::Null)
}

pub fn remove_default_label(labels: Vec<Label>) -> Vec<Label> {
    let default = default_label();
    labels.into_iter().filter(|l| *l != default).collect()
}

pub fn append_default_label(mut labels: Vec<Label>) -> Vec<Label> {
    let default = default_label();
    if !labels.contains(&default) {
        labels.push(default);
    }
    labels
}

pub fn labels_to_dynamic(labels: &[Label]) -> Dynamic {
    Dynamic::List(
        labels
            .iter()
            .map(|l| {
                Dynamic::object([
                    ("key", Dynamic::from(l.key.as_str())),
                    ("value", Dynamic::from(l.value.as_str())),
                ])
            })
            .collect(),
    )
}

/// Fields that only exist for one class of cloud provider
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderKind {
    /// Shared-tier cluster hosted on another provider's hardware
    Tenant { backing_provider_name: Option<String> },
    Dedicated {
        disk_iops: Option<i64>,
        encrypt_ebs_volume: Option<bool>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettingsModel {
    pub provider_name: Option<String>,
    pub instance_size_name: Option<String>,
    pub region_name: Option<String>,
    pub disk_type_name: Option<String>,
    pub volume_type: Option<String>,
    pub compute_min_instance_size: Option<String>,
    pub compute_max_instance_size: Option<String>,
    pub kind: ProviderKind,
}

impl ProviderSettingsModel {
    pub fn from_api(settings: &ProviderSettings) -> Self {
        let kind = if settings.provider_name.as_deref() == Some(TENANT_PROVIDER) {
            ProviderKind::Tenant {
                backing_provider_name: settings.backing_provider_name.clone(),
            }
        } else {
            ProviderKind::Dedicated {
                disk_iops: settings.disk_iops.filter(|iops| *iops != 0),
                encrypt_ebs_volume: settings.encrypt_ebs_volume,
            }
        };
        let compute = settings
            .auto_scaling
            .as_ref()
            .and_then(|a| a.compute.as_ref());

        Self {
            provider_name: settings.provider_name.clone(),
            instance_size_name: settings.instance_size_name.clone(),
            region_name: settings.region_name.clone(),
            disk_type_name: settings.disk_type_name.clone(),
            volume_type: settings.volume_type.clone(),
            compute_min_instance_size: compute.and_then(|c| c.min_instance_size.clone()),
            compute_max_instance_size: compute.and_then(|c| c.max_instance_size.clone()),
            kind,
        }
    }

    pub fn is_tenant(&self) -> bool {
        matches!(self.kind, ProviderKind::Tenant { .. })
    }

    /// Flattened `provider_*` attributes of the cluster schema
    pub fn attributes(&self) -> Vec<(&'static str, Dynamic)> {
        let (backing, iops, encrypt) = match &self.kind {
            ProviderKind::Tenant {
                backing_provider_name,
            } => (
                string_null_if_empty(backing_provider_name.as_ref()),
                Dynamic::Null,
                Dynamic::Null,
            ),
            ProviderKind::Dedicated {
                disk_iops,
                encrypt_ebs_volume,
            } => (
                Dynamic::Null,
                int_or_null(*disk_iops),
                Dynamic::from(*encrypt_ebs_volume),
            ),
        };

        vec![
            ("provider_name", string_null_if_empty(self.provider_name.as_ref())),
            ("backing_provider_name", backing),
            ("provider_disk_iops", iops),
            ("provider_encrypt_ebs_volume", encrypt.clone()),
            ("provider_encrypt_ebs_volume_flag", encrypt),
            ("provider_disk_type_name", string_null_if_empty(self.disk_type_name.as_ref())),
            ("provider_instance_size_name", string_null_if_empty(self.instance_size_name.as_ref())),
            ("provider_region_name", string_null_if_empty(self.region_name.as_ref())),
            ("provider_volume_type", string_null_if_empty(self.volume_type.as_ref())),
            (
                "provider_auto_scaling_compute_min_instance_size",
                string_null_if_empty(self.compute_min_instance_size.as_ref()),
            ),
            (
                "provider_auto_scaling_compute_max_instance_size",
                string_null_if_empty(self.compute_max_instance_size.as_ref()),
            ),
        ]
    }
}

/// Network peering container serving a cluster's provider and region
///
/// GCP containers span all regions so the first one wins. AWS containers are
/// matched on `regionName`, Azure containers on `region`.
pub fn container_id_for(
    provider_name: &str,
    region_name: &str,
    containers: &[Container],
) -> Option<String> {
    if provider_name == GCP_PROVIDER {
        return containers.first().and_then(|c| c.id.clone());
    }

    containers
        .iter()
        .find(|c| {
            let region = if provider_name == AZURE_PROVIDER {
                c.region.as_deref()
            } else {
                c.region_name.as_deref()
            };
            c.provider_name.as_deref() == Some(provider_name) && region == Some(region_name)
        })
        .and_then(|c| c.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::clusters::{InstanceSizeRange, ProviderAutoScaling};

    fn container(
        id: &str,
        provider: &str,
        region_name: Option<&str>,
        region: Option<&str>,
    ) -> Container {
        Container {
            id: Some(id.into()),
            provider_name: Some(provider.into()),
            region_name: region_name.map(String::from),
            region: region.map(String::from),
            atlas_cidr_block: None,
        }
    }

    fn attr<'a>(attrs: &'a [(&'static str, Dynamic)], name: &str) -> &'a Dynamic {
        &attrs.iter().find(|(k, _)| *k == name).unwrap().1
    }

    #[test]
    fn empty_strings_become_null() {
        assert_eq!(string_null_if_empty(Some("")), Dynamic::Null);
        assert_eq!(string_null_if_empty(None::<&str>), Dynamic::Null);
        assert_eq!(string_null_if_empty(Some("x")), Dynamic::String("x".into()));
    }

    #[test]
    fn default_label_is_stripped_and_appended_once() {
        let labels = vec![Label::new("team", "core"), default_label()];
        let stripped = remove_default_label(labels.clone());
        assert_eq!(stripped, vec![Label::new("team", "core")]);

        let appended = append_default_label(append_default_label(stripped));
        assert_eq!(appended.len(), 2);
        assert_eq!(appended[1], default_label());
    }

    #[test]
    fn label_with_default_key_but_other_value_is_kept() {
        let labels = vec![Label::new(DEFAULT_LABEL_KEY, "something else")];
        assert_eq!(remove_default_label(labels.clone()), labels);
    }

    #[test]
    fn tenant_settings_hide_dedicated_fields() {
        let settings = ProviderSettings {
            provider_name: Some("TENANT".into()),
            backing_provider_name: Some("AWS".into()),
            disk_iops: Some(100),
            encrypt_ebs_volume: Some(true),
            instance_size_name: Some("M0".into()),
            ..Default::default()
        };
        let model = ProviderSettingsModel::from_api(&settings);
        assert!(model.is_tenant());

        let attrs = model.attributes();
        assert_eq!(attr(&attrs, "backing_provider_name"), &Dynamic::from("AWS"));
        assert!(attr(&attrs, "provider_disk_iops").is_null());
        assert!(attr(&attrs, "provider_encrypt_ebs_volume").is_null());
        assert!(attr(&attrs, "provider_encrypt_ebs_volume_flag").is_null());
    }

    #[test]
    fn dedicated_settings_hide_backing_provider() {
        let settings = ProviderSettings {
            provider_name: Some("AWS".into()),
            backing_provider_name: Some("AWS".into()),
            disk_iops: Some(3000),
            encrypt_ebs_volume: Some(false),
            auto_scaling: Some(ProviderAutoScaling {
                compute: Some(InstanceSizeRange {
                    min_instance_size: Some("M10".into()),
                    max_instance_size: Some("M40".into()),
                }),
            }),
            ..Default::default()
        };
        let attrs = ProviderSettingsModel::from_api(&settings).attributes();
        assert!(attr(&attrs, "backing_provider_name").is_null());
        assert_eq!(attr(&attrs, "provider_disk_iops"), &Dynamic::Number(3000.0));
        assert_eq!(attr(&attrs, "provider_encrypt_ebs_volume_flag"), &Dynamic::Bool(false));
        assert_eq!(
            attr(&attrs, "provider_auto_scaling_compute_max_instance_size"),
            &Dynamic::from("M40")
        );
    }

    #[test]
    fn zero_iops_is_null() {
        let settings = ProviderSettings {
            provider_name: Some("AZURE".into()),
            disk_iops: Some(0),
            ..Default::default()
        };
        let attrs = ProviderSettingsModel::from_api(&settings).attributes();
        assert!(attr(&attrs, "provider_disk_iops").is_null());
        assert!(attr(&attrs, "provider_encrypt_ebs_volume").is_null());
    }

    #[test]
    fn container_lookup_per_provider() {
        let containers = vec![
            container("aws-west", "AWS", Some("US_WEST_2"), None),
            container("aws-east", "AWS", Some("US_EAST_1"), None),
            container("azure-eu", "AZURE", None, Some("EUROPE_NORTH")),
        ];
        assert_eq!(
            container_id_for("AWS", "US_EAST_1", &containers).as_deref(),
            Some("aws-east")
        );
        assert_eq!(
            container_id_for("AZURE", "EUROPE_NORTH", &containers).as_deref(),
            Some("azure-eu")
        );
        assert_eq!(container_id_for("AWS", "EU_WEST_1", &containers), None);
        assert_eq!(
            container_id_for("GCP", "anything", &containers).as_deref(),
            Some("aws-west")
        );
        assert_eq!(container_id_for("GCP", "anything", &[]), None);
    }
}
