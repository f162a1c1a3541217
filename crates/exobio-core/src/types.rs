use serde::{Deserialize, Serialize};

/// A space-biology research publication.
///
/// Field names serialize in the camelCase form used by the publication feed
/// (`experimentType`, `abstract`), so records exported by the upstream store
/// deserialize without a translation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publication {
    pub id: i64,
    pub title: String,
    pub authors: Vec<String>,
    pub year: i32,
    pub mission: String,
    pub organism: String,
    pub experiment_type: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub keywords: Vec<String>,
    pub connections: Vec<String>,
}

/// The slice of a publication the vector search core reads.
///
/// Only the identifier, title, and abstract participate in embedding; the
/// rest of the publication record never crosses into the index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDocument {
    pub id: i64,
    pub title: String,
    pub abstract_text: String,
}

impl IndexDocument {
    /// The text that gets embedded: title and abstract joined by one space.
    pub fn embedding_text(&self) -> String {
        format!("{} {}", self.title, self.abstract_text)
    }
}

impl From<&Publication> for IndexDocument {
    fn from(publication: &Publication) -> Self {
        Self {
            id: publication.id,
            title: publication.title.clone(),
            abstract_text: publication.abstract_text.clone(),
        }
    }
}

/// One entry in the experiment timeline, derived from a publication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub year: i32,
    pub title: String,
    pub mission: String,
    pub experiment_type: String,
    pub id: i64,
}

impl From<&Publication> for TimelineEntry {
    fn from(publication: &Publication) -> Self {
        Self {
            year: publication.year,
            title: publication.title.clone(),
            mission: publication.mission.clone(),
            experiment_type: publication.experiment_type.clone(),
            id: publication.id,
        }
    }
}

/// Optional filters applied to publication searches.
///
/// String filters match case-insensitively as substrings; year is exact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicationFilters {
    pub organism: Option<String>,
    pub experiment_type: Option<String>,
    pub mission: Option<String>,
    pub year: Option<i32>,
}

impl PublicationFilters {
    /// True when no filter is set.
    pub fn is_empty(&self) -> bool {
        self.organism.is_none()
            && self.experiment_type.is_none()
            && self.mission.is_none()
            && self.year.is_none()
    }
}
