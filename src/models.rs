use serde::Deserialize;
use serde_json::{Map, Value};

// --- Upstream payload ---

/// One page of `GET /api/public/jobs`. Fields we don't read are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPage {
    pub page_count: u32,
    #[serde(default)]
    pub results: Vec<RawJob>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJob {
    pub id: Option<i64>,
    pub contents: Option<String>,
    #[serde(rename = "type")]
    pub job_type: Option<String>,
    pub publication_date: Option<String>,
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub model_type: Option<String>,
    #[serde(default)]
    pub locations: Option<Vec<RawNamed>>,
    #[serde(default)]
    pub categories: Option<Vec<RawNamed>>,
    #[serde(default)]
    pub levels: Option<Vec<RawLevel>>,
    pub refs: Option<Map<String, Value>>,
    pub company: Option<RawCompany>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawNamed {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawLevel {
    pub name: Option<String>,
    pub short_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCompany {
    pub id: Option<i64>,
    pub short_name: Option<String>,
    pub name: Option<String>,
}

// --- Normalized entities ---

#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub job_id: i64,
    pub description: Option<String>,
    pub job_type: Option<String>,
    pub publication_at: Option<String>,
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub model_type: Option<String>,
    pub locations: Vec<String>, // sentinel removed
    pub is_remote_eligible: bool,
    pub categories: Vec<String>,
    pub landing_page: String,
    pub company_id: i64,
    pub level: Option<String>,
    pub level_short_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Company {
    pub company_id: i64,
    pub short_name: Option<String>,
    pub name: Option<String>,
}
