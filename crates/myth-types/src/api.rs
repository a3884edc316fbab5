use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{
    Comment, Evidence, EvidenceType, Myth, MythStatus, ResearchRequest, ResearchStatus,
    Tally, User, Vote,
};
use crate::workflow::VoteOutcome;

// -- JWT Claims --

/// JWT claims issued at login and checked by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub password2: String,
    #[serde(default)]
    pub is_farmer: bool,
    #[serde(default)]
    pub is_researcher: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_farmer: Option<bool>,
    pub is_researcher: Option<bool>,
    pub phone_number: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub preferred_language: Option<String>,
}

// -- Categories --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
}

// -- Myths --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateMythRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub origin: String,
    pub category_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateMythRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub origin: Option<String>,
    /// `null` clears the category; leaving the field out keeps it.
    #[serde(default, deserialize_with = "nullable")]
    pub category_id: Option<Option<i64>>,
    pub status: Option<MythStatus>,
    pub is_featured: Option<bool>,
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn nullable<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// A myth with everything attached to it.
#[derive(Debug, Serialize)]
pub struct MythDetail {
    #[serde(flatten)]
    pub myth: Myth,
    pub evidence: Vec<Evidence>,
    pub comments: Vec<Comment>,
    pub votes: Vec<Vote>,
    pub research_requests: Vec<ResearchRequest>,
}

// -- Evidence --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateEvidenceRequest {
    pub myth_id: i64,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub evidence_type: EvidenceType,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub source_citation: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateEvidenceRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub evidence_type: Option<EvidenceType>,
    pub source_url: Option<String>,
    pub source_citation: Option<String>,
    pub is_approved: Option<bool>,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub myth_id: i64,
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCommentRequest {
    pub content: Option<String>,
    pub is_approved: Option<bool>,
}

// -- Votes --

/// Body of the polymorphic vote endpoints. Fields are loose strings so that
/// missing or unknown values surface as argument errors, not decode errors.
#[derive(Debug, Default, Deserialize)]
pub struct VoteRequest {
    pub content_type: Option<String>,
    pub object_id: Option<i64>,
    pub vote_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub status: &'static str,
    pub outcome: VoteOutcome,
    #[serde(flatten)]
    pub tally: Tally,
}

// -- Research requests --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateResearchRequest {
    pub myth_id: i64,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateResearchRequest {
    pub description: Option<String>,
    pub status: Option<ResearchStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteResearchRequest {
    #[serde(default)]
    pub findings: String,
}

#[derive(Debug, Serialize)]
pub struct CompleteResearchResponse {
    pub status: &'static str,
    pub myth_status: MythStatus,
}

// -- Notifications --

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub status: &'static str,
    pub count: usize,
}

// -- Generic --

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn new(status: impl Into<String>) -> Self {
        Self { status: status.into() }
    }
}
