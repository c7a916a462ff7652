use agolvault_core::ids::{ItemId, LayerId, OrgId};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub username: String,
    #[serde(rename = "orgId")]
    pub org_id: OrgId,
    #[serde(rename = "fullName", default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ContentItem {
    pub id: ItemId,
    #[serde(rename = "type")]
    pub item_type: String,
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(rename = "typeKeywords", default)]
    pub type_keywords: Vec<String>,
}

impl ContentItem {
    pub fn is_hosted_feature_service(&self) -> bool {
        self.item_type == "Feature Service"
            && self.type_keywords.iter().any(|keyword| keyword == "Hosted Service")
    }

    /// REST service name as published, recovered from the item url. The url
    /// ends in `.../rest/services/{name}/FeatureServer`, so the name is the
    /// second-to-last path segment.
    pub fn service_name(&self) -> Option<&str> {
        let url = self.url.as_deref()?.trim_end_matches('/');
        let mut segments = url.rsplit('/');
        segments.next()?;
        segments.next().filter(|segment| !segment.is_empty())
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct ContentListing {
    #[serde(default)]
    pub items: Vec<ContentItem>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct LayerInfo {
    pub id: LayerId,
    pub name: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct ServiceMetadata {
    #[serde(default)]
    pub layers: Vec<LayerInfo>,
}
